use nom::IResult;
use tracing::debug;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;
use crate::linktype::Linktype;

use super::option::{opt_parse_options, options_get_string, BlockOption, OptionCode};
use super::{ng_block_parser, NgBlockParser, IDB_MAGIC, MIN_IDB_SIZE};

/// An Interface Description Block (IDB) describes an interface on which
/// packet data was captured.
///
/// The position of an IDB within its section assigns the interface
/// identifier used by packet blocks: the first IDB is interface 0.
#[derive(Debug)]
pub struct InterfaceDescriptionBlock<'a> {
    pub block_len: u32,
    pub linktype: Linktype,
    pub reserved: u16,
    /// Maximum captured bytes per packet; 0 means no limit
    pub snaplen: u32,
    pub options: Vec<BlockOption<'a>>,
    /// The raw `if_tsresol` option value (default 6: microseconds)
    pub if_tsresol: u8,
    /// The `if_tsoffset` option value in seconds (default 0)
    pub if_tsoffset: i64,
}

impl<'a> InterfaceDescriptionBlock<'a> {
    /// The `if_name` option, if present and valid UTF-8
    pub fn name(&self) -> Option<String> {
        options_get_string(&self.options, OptionCode::IfName)
    }

    /// The `if_description` option, if present and valid UTF-8
    pub fn description(&self) -> Option<String> {
        options_get_string(&self.options, OptionCode::IfDescription)
    }

    /// The `if_os` option, if present and valid UTF-8
    pub fn os(&self) -> Option<String> {
        options_get_string(&self.options, OptionCode::IfOs)
    }

    /// The `if_fcslen` option, if present
    pub fn fcslen(&self) -> Option<u8> {
        self.options
            .iter()
            .find(|o| o.code == OptionCode::IfFcslen)
            .and_then(|o| o.as_u8().ok())
    }
}

fn extract_tsresol_and_tsoffset(options: &[BlockOption], big_endian: bool) -> (u8, i64) {
    let mut if_tsresol: u8 = 6;
    let mut if_tsoffset: i64 = 0;
    for opt in options {
        match opt.code {
            OptionCode::IfTsresol => match opt.as_u8() {
                Ok(v) => if_tsresol = v,
                Err(_) => debug!("if_tsresol length {} is not 1, ignoring", opt.len),
            },
            OptionCode::IfTsoffset => match opt.as_i64(big_endian) {
                Ok(v) => if_tsoffset = v,
                Err(_) => debug!("if_tsoffset length {} is not 8, ignoring", opt.len),
            },
            _ => (),
        }
    }
    (if_tsresol, if_tsoffset)
}

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, InterfaceDescriptionBlock<'a>>
    for InterfaceDescriptionBlock<'a>
{
    const BLOCK_TYPE: u32 = IDB_MAGIC;
    const MIN_SIZE: u32 = MIN_IDB_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], InterfaceDescriptionBlock<'a>, PcapError> {
        let (i, linktype) = En::parse_u16(body)?;
        let (i, reserved) = En::parse_u16(i)?;
        let (i, snaplen) = En::parse_u32(i)?;
        let (i, options) = opt_parse_options::<En>(i, block_len as usize, MIN_IDB_SIZE as usize)?;
        let (if_tsresol, if_tsoffset) = extract_tsresol_and_tsoffset(&options, En::BIG_ENDIAN);
        let block = InterfaceDescriptionBlock {
            block_len,
            linktype: Linktype(i32::from(linktype)),
            reserved,
            snaplen,
            options,
            if_tsresol,
            if_tsoffset,
        };
        Ok((i, block))
    }
}

/// Parse an Interface Description Block (little-endian)
pub fn parse_interface_description_block_le(
    i: &[u8],
) -> IResult<&[u8], InterfaceDescriptionBlock, PcapError> {
    ng_block_parser::<InterfaceDescriptionBlock, PcapLE, _>()(i)
}

/// Parse an Interface Description Block (big-endian)
pub fn parse_interface_description_block_be(
    i: &[u8],
) -> IResult<&[u8], InterfaceDescriptionBlock, PcapError> {
    ng_block_parser::<InterfaceDescriptionBlock, PcapBE, _>()(i)
}
