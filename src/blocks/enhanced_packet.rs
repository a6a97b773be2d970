use nom::{Err, IResult};
use rusticata_macros::align32;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

use super::option::{opt_parse_options, BlockOption};
use super::{ng_block_parser, NgBlockParser, EPB_MAGIC, MIN_EPB_SIZE};

/// An Enhanced Packet Block (EPB) is the standard container for a captured
/// network packet.
///
/// The `data` field keeps the wire padding; use
/// [`packet_data`](EnhancedPacketBlock::packet_data) for the captured bytes.
/// The timestamp is a 64-bit tick count split in two halves; the tick rate
/// belongs to the referenced interface and is not known at this layer.
#[derive(Debug)]
pub struct EnhancedPacketBlock<'a> {
    pub block_len: u32,
    /// Index into the interface table of the enclosing section
    pub if_id: u32,
    pub ts_high: u32,
    pub ts_low: u32,
    /// Captured packet length
    pub caplen: u32,
    /// Original packet length
    pub origlen: u32,
    /// Captured bytes, with padding
    pub data: &'a [u8],
    pub options: Vec<BlockOption<'a>>,
}

impl<'a> EnhancedPacketBlock<'a> {
    /// The 64-bit timestamp in interface time units
    #[inline]
    pub fn timestamp_ticks(&self) -> u64 {
        (u64::from(self.ts_high) << 32) | u64::from(self.ts_low)
    }

    /// Returns true if the capture was truncated
    #[inline]
    pub fn truncated(&self) -> bool {
        self.caplen != self.origlen
    }

    /// The captured bytes without padding
    pub fn packet_data(&self) -> &[u8] {
        let caplen = self.caplen as usize;
        if caplen < self.data.len() {
            &self.data[..caplen]
        } else {
            self.data
        }
    }
}

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, EnhancedPacketBlock<'a>>
    for EnhancedPacketBlock<'a>
{
    const BLOCK_TYPE: u32 = EPB_MAGIC;
    const MIN_SIZE: u32 = MIN_EPB_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], EnhancedPacketBlock<'a>, PcapError> {
        let (i, if_id) = En::parse_u32(body)?;
        let (i, ts_high) = En::parse_u32(i)?;
        let (i, ts_low) = En::parse_u32(i)?;
        let (i, caplen) = En::parse_u32(i)?;
        let (i, origlen) = En::parse_u32(i)?;
        // align32 would overflow above this
        if caplen >= u32::MAX - 4 {
            return Err(Err::Error(PcapError::bad_file(format!(
                "captured length {} is impossible",
                caplen
            ))));
        }
        let padded_len = align32!(caplen) as usize;
        if padded_len > i.len() {
            return Err(Err::Error(PcapError::bad_file(format!(
                "captured length {} does not fit in a block of {} bytes",
                caplen, block_len
            ))));
        }
        let (data, i) = i.split_at(padded_len);
        let opt_offset = MIN_EPB_SIZE as usize + padded_len;
        let (i, options) = opt_parse_options::<En>(i, block_len as usize, opt_offset)?;
        let block = EnhancedPacketBlock {
            block_len,
            if_id,
            ts_high,
            ts_low,
            caplen,
            origlen,
            data,
            options,
        };
        Ok((i, block))
    }
}

/// Parse an Enhanced Packet Block (little-endian)
pub fn parse_enhanced_packet_block_le(
    i: &[u8],
) -> IResult<&[u8], EnhancedPacketBlock, PcapError> {
    ng_block_parser::<EnhancedPacketBlock, PcapLE, _>()(i)
}

/// Parse an Enhanced Packet Block (big-endian)
pub fn parse_enhanced_packet_block_be(
    i: &[u8],
) -> IResult<&[u8], EnhancedPacketBlock, PcapError> {
    ng_block_parser::<EnhancedPacketBlock, PcapBE, _>()(i)
}
