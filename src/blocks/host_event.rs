use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

use super::{
    ng_block_parser, NgBlockParser, MIN_SYSDIG_EVENT_SIZE, MIN_SYSDIG_EVENT_V2_SIZE,
    SYSDIG_EVENT_MAGIC, SYSDIG_EVENT_V2_MAGIC,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEventVersion {
    V1,
    V2,
}

/// A host event block (sysdig system-call trace).
///
/// The fixed header is packed on the wire: `cpu_id:u16, ts:u64, tid:u64,
/// event_len:u32, event_type:u16`, with a trailing `nparams:u32` in the v2
/// shape. The timestamp is nanoseconds since the epoch and is never scaled
/// by an interface's time units. The rest of the block is the opaque event
/// payload.
#[derive(Debug)]
pub struct HostEventBlock<'a> {
    pub block_len: u32,
    pub version: HostEventVersion,
    pub cpu_id: u16,
    /// Nanoseconds since the epoch
    pub ts: u64,
    pub thread_id: u64,
    pub event_len: u32,
    pub event_type: u16,
    /// Number of parameters; only present in v2 blocks
    pub nparams: Option<u32>,
    /// Opaque event payload, with padding
    pub data: &'a [u8],
}

fn parse_host_event_body<'a, En: PcapEndianness>(
    version: HostEventVersion,
    block_len: u32,
    body: &'a [u8],
) -> IResult<&'a [u8], HostEventBlock<'a>, PcapError> {
    let (i, cpu_id) = En::parse_u16(body)?;
    let (i, ts) = En::parse_u64(i)?;
    let (i, thread_id) = En::parse_u64(i)?;
    let (i, event_len) = En::parse_u32(i)?;
    let (i, event_type) = En::parse_u16(i)?;
    let (i, nparams) = match version {
        HostEventVersion::V1 => (i, None),
        HostEventVersion::V2 => {
            let (i, n) = En::parse_u32(i)?;
            (i, Some(n))
        }
    };
    let block = HostEventBlock {
        block_len,
        version,
        cpu_id,
        ts,
        thread_id,
        event_len,
        event_type,
        nparams,
        data: i,
    };
    Ok((i, block))
}

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, HostEventBlock<'a>> for HostEventBlock<'a> {
    const BLOCK_TYPE: u32 = SYSDIG_EVENT_MAGIC;
    const MIN_SIZE: u32 = MIN_SYSDIG_EVENT_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], HostEventBlock<'a>, PcapError> {
        parse_host_event_body::<En>(HostEventVersion::V1, block_len, body)
    }
}

pub(crate) struct HostEventV2Parser;

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, HostEventBlock<'a>> for HostEventV2Parser {
    const BLOCK_TYPE: u32 = SYSDIG_EVENT_V2_MAGIC;
    const MIN_SIZE: u32 = MIN_SYSDIG_EVENT_V2_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], HostEventBlock<'a>, PcapError> {
        parse_host_event_body::<En>(HostEventVersion::V2, block_len, body)
    }
}

/// Parse a v1 host event block (little-endian)
pub fn parse_host_event_block_le(i: &[u8]) -> IResult<&[u8], HostEventBlock, PcapError> {
    ng_block_parser::<HostEventBlock, PcapLE, _>()(i)
}

/// Parse a v1 host event block (big-endian)
pub fn parse_host_event_block_be(i: &[u8]) -> IResult<&[u8], HostEventBlock, PcapError> {
    ng_block_parser::<HostEventBlock, PcapBE, _>()(i)
}

/// Parse a v2 host event block (little-endian)
pub fn parse_host_event_v2_block_le(i: &[u8]) -> IResult<&[u8], HostEventBlock, PcapError> {
    ng_block_parser::<HostEventV2Parser, PcapLE, _>()(i)
}

/// Parse a v2 host event block (big-endian)
pub fn parse_host_event_v2_block_be(i: &[u8]) -> IResult<&[u8], HostEventBlock, PcapError> {
    ng_block_parser::<HostEventV2Parser, PcapBE, _>()(i)
}
