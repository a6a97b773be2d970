use nom::bytes::streaming::take;
use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

use super::{ng_block_parser, NgBlockParser, MIN_SPB_SIZE, SPB_MAGIC};

/// A Simple Packet Block (SPB), the lightweight packet container.
///
/// There is no interface identifier (interface 0 is implied), no timestamp,
/// and no options. The captured length is not stored either: it is the
/// packet length limited by interface 0's snap length, which only the
/// section state knows.
#[derive(Debug)]
pub struct SimplePacketBlock<'a> {
    pub block_len: u32,
    /// Original packet length
    pub origlen: u32,
    /// Block payload, with padding
    pub data: &'a [u8],
}

impl<'a> SimplePacketBlock<'a> {
    /// The captured bytes, limited by `snaplen` (0 meaning no limit)
    pub fn packet_data(&self, snaplen: u32) -> &[u8] {
        let mut caplen = self.origlen as usize;
        if snaplen != 0 {
            caplen = caplen.min(snaplen as usize);
        }
        if caplen < self.data.len() {
            &self.data[..caplen]
        } else {
            self.data
        }
    }
}

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, SimplePacketBlock<'a>>
    for SimplePacketBlock<'a>
{
    const BLOCK_TYPE: u32 = SPB_MAGIC;
    const MIN_SIZE: u32 = MIN_SPB_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], SimplePacketBlock<'a>, PcapError> {
        let (i, origlen) = En::parse_u32(body)?;
        let (i, data) = take(block_len - MIN_SPB_SIZE)(i)?;
        let block = SimplePacketBlock {
            block_len,
            origlen,
            data,
        };
        Ok((i, block))
    }
}

/// Parse a Simple Packet Block (little-endian)
pub fn parse_simple_packet_block_le(i: &[u8]) -> IResult<&[u8], SimplePacketBlock, PcapError> {
    ng_block_parser::<SimplePacketBlock, PcapLE, _>()(i)
}

/// Parse a Simple Packet Block (big-endian)
pub fn parse_simple_packet_block_be(i: &[u8]) -> IResult<&[u8], SimplePacketBlock, PcapError> {
    ng_block_parser::<SimplePacketBlock, PcapBE, _>()(i)
}
