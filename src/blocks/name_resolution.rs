use std::net::{Ipv4Addr, Ipv6Addr};

use nom::{Err, IResult};
use rusticata_macros::align32;
use tracing::trace;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

use super::option::{opt_parse_options, BlockOption};
use super::{ng_block_parser, NgBlockParser, MIN_NRB_SIZE, NRB_MAGIC};

pub const NAME_RECORD_END: u16 = 0;
pub const NAME_RECORD_IPV4: u16 = 1;
pub const NAME_RECORD_IPV6: u16 = 2;

/// One record of a Name Resolution Block.
///
/// Addresses are stored in network order on the wire regardless of the
/// section byte order. Each name is NUL-terminated; a record whose last
/// name is not terminated is a structural error.
#[derive(Debug, PartialEq, Eq)]
pub enum NameRecord<'a> {
    Ipv4 { addr: Ipv4Addr, names: Vec<&'a [u8]> },
    Ipv6 { addr: Ipv6Addr, names: Vec<&'a [u8]> },
    /// A record type this implementation does not interpret
    Other { record_type: u16, value: &'a [u8] },
}

/// A Name Resolution Block (NRB) maps addresses to host names.
///
/// The record list is terminated by an end record; options follow it.
#[derive(Debug)]
pub struct NameResolutionBlock<'a> {
    pub block_len: u32,
    pub records: Vec<NameRecord<'a>>,
    pub options: Vec<BlockOption<'a>>,
}

fn split_names(mut b: &[u8]) -> Result<Vec<&[u8]>, Err<PcapError>> {
    let mut names = Vec::new();
    while !b.is_empty() {
        match b.iter().position(|&c| c == 0) {
            Some(pos) => {
                names.push(&b[..pos]);
                b = &b[pos + 1..];
            }
            None => {
                return Err(Err::Error(PcapError::bad_file(
                    "name resolution record name is not NUL terminated",
                )))
            }
        }
    }
    Ok(names)
}

fn parse_name_records<'a, En: PcapEndianness>(
    mut i: &'a [u8],
) -> IResult<&'a [u8], Vec<NameRecord<'a>>, PcapError> {
    let mut records = Vec::new();
    loop {
        if i.len() < 4 {
            return Err(Err::Error(PcapError::bad_file(
                "name resolution block has no end record",
            )));
        }
        let (rem, record_type) = En::parse_u16(i)?;
        let (rem, record_len) = En::parse_u16(rem)?;
        if record_type == NAME_RECORD_END {
            if record_len != 0 {
                return Err(Err::Error(PcapError::bad_file(
                    "name resolution end record has a non-zero length",
                )));
            }
            return Ok((rem, records));
        }
        let padded_len = align32!(u32::from(record_len)) as usize;
        if padded_len > rem.len() {
            return Err(Err::Error(PcapError::bad_file(
                "name resolution record runs past the end of the block",
            )));
        }
        let value = &rem[..usize::from(record_len)];
        i = &rem[padded_len..];
        let record = match record_type {
            NAME_RECORD_IPV4 => {
                if record_len < 4 {
                    return Err(Err::Error(PcapError::bad_file(format!(
                        "IPv4 name record length {} < minimum 4",
                        record_len
                    ))));
                }
                let addr = Ipv4Addr::from([value[0], value[1], value[2], value[3]]);
                let names = split_names(&value[4..])?;
                NameRecord::Ipv4 { addr, names }
            }
            NAME_RECORD_IPV6 => {
                if record_len < 16 {
                    return Err(Err::Error(PcapError::bad_file(format!(
                        "IPv6 name record length {} < minimum 16",
                        record_len
                    ))));
                }
                let mut b = [0u8; 16];
                b.copy_from_slice(&value[..16]);
                let addr = Ipv6Addr::from(b);
                let names = split_names(&value[16..])?;
                NameRecord::Ipv6 { addr, names }
            }
            _ => {
                trace!("skipping unknown name record type {:#06x}", record_type);
                NameRecord::Other {
                    record_type,
                    value,
                }
            }
        };
        records.push(record);
    }
}

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, NameResolutionBlock<'a>>
    for NameResolutionBlock<'a>
{
    const BLOCK_TYPE: u32 = NRB_MAGIC;
    const MIN_SIZE: u32 = MIN_NRB_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], NameResolutionBlock<'a>, PcapError> {
        let (i, records) = parse_name_records::<En>(body)?;
        let opt_offset = 12 + body.len() - i.len();
        let (i, options) = opt_parse_options::<En>(i, block_len as usize, opt_offset)?;
        let block = NameResolutionBlock {
            block_len,
            records,
            options,
        };
        Ok((i, block))
    }
}

/// Parse a Name Resolution Block (little-endian)
pub fn parse_name_resolution_block_le(
    i: &[u8],
) -> IResult<&[u8], NameResolutionBlock, PcapError> {
    ng_block_parser::<NameResolutionBlock, PcapLE, _>()(i)
}

/// Parse a Name Resolution Block (big-endian)
pub fn parse_name_resolution_block_be(
    i: &[u8],
) -> IResult<&[u8], NameResolutionBlock, PcapError> {
    ng_block_parser::<NameResolutionBlock, PcapBE, _>()(i)
}
