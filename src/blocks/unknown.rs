use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

use super::{ng_block_parser, NgBlockParser, MIN_BLOCK_SIZE};

/// A block whose type is not handled natively.
///
/// The frame is still validated; the body is kept opaque so a registered
/// handler can claim it, or the reader can skip it.
#[derive(Debug)]
pub struct UnknownBlock<'a> {
    /// Native block type value
    pub block_type: u32,
    pub block_len: u32,
    pub data: &'a [u8],
}

impl<'a> UnknownBlock<'a> {
    /// Returns true for local block types (bit 31 set), which only a
    /// registered handler may interpret
    pub fn is_local_type(&self) -> bool {
        self.block_type & 0x8000_0000 != 0
    }
}

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, UnknownBlock<'a>> for UnknownBlock<'a> {
    const BLOCK_TYPE: u32 = 0;
    const MIN_SIZE: u32 = MIN_BLOCK_SIZE;

    fn inner_parse(
        block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], UnknownBlock<'a>, PcapError> {
        let block = UnknownBlock {
            block_type,
            block_len,
            data: body,
        };
        Ok((body, block))
    }
}

/// Parse an unknown block (little-endian)
pub fn parse_unknown_block_le(i: &[u8]) -> IResult<&[u8], UnknownBlock, PcapError> {
    ng_block_parser::<UnknownBlock, PcapLE, _>()(i)
}

/// Parse an unknown block (big-endian)
pub fn parse_unknown_block_be(i: &[u8]) -> IResult<&[u8], UnknownBlock, PcapError> {
    ng_block_parser::<UnknownBlock, PcapBE, _>()(i)
}
