use nom::number::streaming::le_u32;
use nom::{Err, IResult, Needed};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

use super::option::{opt_parse_options, options_get_string, BlockOption, OptionCode};
use super::{ng_block_parser, NgBlockParser, BOM_MAGIC, MIN_SHB_SIZE, SHB_MAGIC};

/// The Section Header Block (SHB) starts a section of the capture file.
///
/// Every block until the next SHB (or the end of the file) belongs to this
/// section and is encoded with the byte order declared by the byte-order
/// magic in this block.
#[derive(Debug)]
pub struct SectionHeaderBlock<'a> {
    pub block_len: u32,
    /// Byte-order magic, as read little-endian
    pub bom: u32,
    pub major_version: u16,
    pub minor_version: u16,
    /// Declared section length in bytes, or -1 if not specified
    pub section_len: i64,
    pub options: Vec<BlockOption<'a>>,
}

impl<'a> SectionHeaderBlock<'a> {
    /// Returns true if the section is encoded big-endian
    pub fn big_endian(&self) -> bool {
        self.bom != BOM_MAGIC
    }

    /// The `shb_hardware` option, if present and valid UTF-8
    pub fn hardware(&self) -> Option<String> {
        options_get_string(&self.options, OptionCode::ShbHardware)
    }

    /// The `shb_os` option, if present and valid UTF-8
    pub fn os(&self) -> Option<String> {
        options_get_string(&self.options, OptionCode::ShbOs)
    }

    /// The `shb_userappl` option, if present and valid UTF-8
    pub fn user_application(&self) -> Option<String> {
        options_get_string(&self.options, OptionCode::ShbUserAppl)
    }

    /// The `opt_comment` option, if present and valid UTF-8
    pub fn comment(&self) -> Option<String> {
        options_get_string(&self.options, OptionCode::Comment)
    }
}

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, SectionHeaderBlock<'a>>
    for SectionHeaderBlock<'a>
{
    const BLOCK_TYPE: u32 = SHB_MAGIC;
    const MIN_SIZE: u32 = MIN_SHB_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], SectionHeaderBlock<'a>, PcapError> {
        // the byte-order magic is always read as-is, its value tells the order
        let (i, bom) = le_u32(body)?;
        let (i, major_version) = En::parse_u16(i)?;
        let (i, minor_version) = En::parse_u16(i)?;
        let (i, section_len) = En::parse_i64(i)?;
        // only 1.0 and 1.2 exist; 1.2 is identical to 1.0
        if !(major_version == 1 && (minor_version == 0 || minor_version == 2)) {
            return Err(Err::Error(PcapError::bad_file(format!(
                "unknown section version {}.{}",
                major_version, minor_version
            ))));
        }
        let (i, options) = opt_parse_options::<En>(i, block_len as usize, MIN_SHB_SIZE as usize)?;
        let block = SectionHeaderBlock {
            block_len,
            bom,
            major_version,
            minor_version,
            section_len,
            options,
        };
        Ok((i, block))
    }
}

/// Parse a Section Header Block, determining its byte order from the
/// byte-order magic.
///
/// Any other value of the byte-order magic means the stream is not pcapng
/// (the probe signal).
pub fn parse_section_header_block(i: &[u8]) -> IResult<&[u8], SectionHeaderBlock, PcapError> {
    if i.len() < 12 {
        return Err(Err::Incomplete(Needed::new(12 - i.len())));
    }
    let bom = u32::from_le_bytes([i[8], i[9], i[10], i[11]]);
    if bom == BOM_MAGIC {
        ng_block_parser::<SectionHeaderBlock, PcapLE, _>()(i)
    } else if bom == BOM_MAGIC.swap_bytes() {
        ng_block_parser::<SectionHeaderBlock, PcapBE, _>()(i)
    } else {
        Err(Err::Error(PcapError::NotOurFormat))
    }
}
