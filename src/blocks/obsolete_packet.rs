use nom::{Err, IResult};
use rusticata_macros::align32;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

use super::option::{opt_parse_options, BlockOption};
use super::{ng_block_parser, NgBlockParser, MIN_PB_SIZE, PB_MAGIC};

/// The obsolete Packet Block (PB), superseded by the Enhanced Packet Block.
///
/// Same shape as the EPB except that the interface identifier is 16 bits,
/// followed by a 16-bit drop counter (`0xFFFF` meaning unknown).
#[derive(Debug)]
pub struct ObsoletePacketBlock<'a> {
    pub block_len: u32,
    pub if_id: u16,
    /// Packets dropped between this packet and the previous one;
    /// `0xFFFF` if unknown
    pub drops: u16,
    pub ts_high: u32,
    pub ts_low: u32,
    pub caplen: u32,
    pub origlen: u32,
    /// Captured bytes, with padding
    pub data: &'a [u8],
    pub options: Vec<BlockOption<'a>>,
}

impl<'a> ObsoletePacketBlock<'a> {
    /// The 64-bit timestamp in interface time units
    #[inline]
    pub fn timestamp_ticks(&self) -> u64 {
        (u64::from(self.ts_high) << 32) | u64::from(self.ts_low)
    }

    /// The drop counter, if known
    pub fn drops_count(&self) -> Option<u16> {
        if self.drops == 0xFFFF {
            None
        } else {
            Some(self.drops)
        }
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

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, ObsoletePacketBlock<'a>>
    for ObsoletePacketBlock<'a>
{
    const BLOCK_TYPE: u32 = PB_MAGIC;
    const MIN_SIZE: u32 = MIN_PB_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], ObsoletePacketBlock<'a>, PcapError> {
        let (i, if_id) = En::parse_u16(body)?;
        let (i, drops) = En::parse_u16(i)?;
        let (i, ts_high) = En::parse_u32(i)?;
        let (i, ts_low) = En::parse_u32(i)?;
        let (i, caplen) = En::parse_u32(i)?;
        let (i, origlen) = En::parse_u32(i)?;
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
        let opt_offset = MIN_PB_SIZE as usize + padded_len;
        let (i, options) = opt_parse_options::<En>(i, block_len as usize, opt_offset)?;
        let block = ObsoletePacketBlock {
            block_len,
            if_id,
            drops,
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

/// Parse an obsolete Packet Block (little-endian)
pub fn parse_obsolete_packet_block_le(
    i: &[u8],
) -> IResult<&[u8], ObsoletePacketBlock, PcapError> {
    ng_block_parser::<ObsoletePacketBlock, PcapLE, _>()(i)
}

/// Parse an obsolete Packet Block (big-endian)
pub fn parse_obsolete_packet_block_be(
    i: &[u8],
) -> IResult<&[u8], ObsoletePacketBlock, PcapError> {
    ng_block_parser::<ObsoletePacketBlock, PcapBE, _>()(i)
}
