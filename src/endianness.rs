use nom::number::streaming::{be_i64, be_u16, be_u32, be_u64, le_i64, le_u16, le_u32, le_u64};
use nom::IResult;

use crate::error::PcapError;

/// Big-endian section marker
pub(crate) struct PcapBE;
/// Little-endian section marker
pub(crate) struct PcapLE;

/// Endian-conditional integer decoding.
///
/// The byte order of every multi-byte field is fixed by the Section Header
/// Block that opened the current section. Block parsers are generic over this
/// trait so the swap decision is made once, at the section boundary.
pub(crate) trait PcapEndianness {
    const BIG_ENDIAN: bool;

    /// Convert a value read as little-endian to its native value
    fn native_u32(n: u32) -> u32;

    fn parse_u16(i: &[u8]) -> IResult<&[u8], u16, PcapError>;
    fn parse_u32(i: &[u8]) -> IResult<&[u8], u32, PcapError>;
    fn parse_u64(i: &[u8]) -> IResult<&[u8], u64, PcapError>;
    fn parse_i64(i: &[u8]) -> IResult<&[u8], i64, PcapError>;
}

impl PcapEndianness for PcapBE {
    const BIG_ENDIAN: bool = true;

    #[inline]
    fn native_u32(n: u32) -> u32 {
        n.swap_bytes()
    }

    #[inline]
    fn parse_u16(i: &[u8]) -> IResult<&[u8], u16, PcapError> {
        be_u16(i)
    }

    #[inline]
    fn parse_u32(i: &[u8]) -> IResult<&[u8], u32, PcapError> {
        be_u32(i)
    }

    #[inline]
    fn parse_u64(i: &[u8]) -> IResult<&[u8], u64, PcapError> {
        be_u64(i)
    }

    #[inline]
    fn parse_i64(i: &[u8]) -> IResult<&[u8], i64, PcapError> {
        be_i64(i)
    }
}

impl PcapEndianness for PcapLE {
    const BIG_ENDIAN: bool = false;

    #[inline]
    fn native_u32(n: u32) -> u32 {
        n
    }

    #[inline]
    fn parse_u16(i: &[u8]) -> IResult<&[u8], u16, PcapError> {
        le_u16(i)
    }

    #[inline]
    fn parse_u32(i: &[u8]) -> IResult<&[u8], u32, PcapError> {
        le_u32(i)
    }

    #[inline]
    fn parse_u64(i: &[u8]) -> IResult<&[u8], u64, PcapError> {
        le_u64(i)
    }

    #[inline]
    fn parse_i64(i: &[u8]) -> IResult<&[u8], i64, PcapError> {
        le_i64(i)
    }
}

/// Read a `u16` from raw option or record bytes, honoring the section order
#[inline]
pub(crate) fn read_u16_e(b: [u8; 2], big_endian: bool) -> u16 {
    if big_endian {
        u16::from_be_bytes(b)
    } else {
        u16::from_le_bytes(b)
    }
}

/// Read a `u32` from raw option or record bytes, honoring the section order
#[inline]
pub(crate) fn read_u32_e(b: [u8; 4], big_endian: bool) -> u32 {
    if big_endian {
        u32::from_be_bytes(b)
    } else {
        u32::from_le_bytes(b)
    }
}

/// Read a `u64` from raw option or record bytes, honoring the section order
#[inline]
pub(crate) fn read_u64_e(b: [u8; 8], big_endian: bool) -> u64 {
    if big_endian {
        u64::from_be_bytes(b)
    } else {
        u64::from_le_bytes(b)
    }
}
