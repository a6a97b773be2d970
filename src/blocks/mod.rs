//! PCAPNG block layer
//!
//! One module per block kind, all sharing the outer frame discipline:
//! a 4-byte type, a 4-byte total length, the body, and the total length
//! repeated as a trailer. The framer enforces the length invariants
//! (multiple of 4, within `12..=MAX_BLOCK_SIZE`, trailer equal to header)
//! for every block kind before the body parser runs.
//!
//! Block parsers are zero-copy: the returned structures borrow from the
//! input slice. Multi-byte fields are decoded with the byte order of the
//! enclosing section, which the caller selects through [`parse_block_le`]
//! and [`parse_block_be`].

use nom::bytes::streaming::take;
use nom::combinator::map;
use nom::number::streaming::{be_u32, le_u32};
use nom::{Err, IResult, Needed};

use crate::endianness::PcapEndianness;
use crate::error::PcapError;
use crate::linktype::MAX_PACKET_SIZE_DBUS;

pub mod option;

mod decryption_secrets;
mod enhanced_packet;
mod host_event;
mod interface_description;
mod interface_statistics;
mod journal;
mod name_resolution;
mod obsolete_packet;
mod section_header;
mod simple_packet;
mod unknown;

pub use decryption_secrets::*;
pub use enhanced_packet::*;
pub use host_event::*;
pub use interface_description::*;
pub use interface_statistics::*;
pub use journal::*;
pub use name_resolution::*;
pub use obsolete_packet::*;
pub use option::*;
pub use section_header::*;
pub use simple_packet::*;
pub use unknown::*;

/// Section Header Block type
pub const SHB_MAGIC: u32 = 0x0A0D_0D0A;
/// Interface Description Block type
pub const IDB_MAGIC: u32 = 0x0000_0001;
/// Packet Block type (obsolete, superseded by the Enhanced Packet Block)
pub const PB_MAGIC: u32 = 0x0000_0002;
/// Simple Packet Block type
pub const SPB_MAGIC: u32 = 0x0000_0003;
/// Name Resolution Block type
pub const NRB_MAGIC: u32 = 0x0000_0004;
/// Interface Statistics Block type
pub const ISB_MAGIC: u32 = 0x0000_0005;
/// Enhanced Packet Block type
pub const EPB_MAGIC: u32 = 0x0000_0006;
/// systemd Journal Export Block type
pub const JOURNAL_MAGIC: u32 = 0x0000_0009;
/// Decryption Secrets Block type
pub const DSB_MAGIC: u32 = 0x0000_000A;
/// Sysdig Event Block type
pub const SYSDIG_EVENT_MAGIC: u32 = 0x0000_0204;
/// Sysdig Event Block v2 type
pub const SYSDIG_EVENT_V2_MAGIC: u32 = 0x0000_0216;

/// Byte Order magic
pub const BOM_MAGIC: u32 = 0x1A2B_3C4D;

/// Smallest possible block: type, total length, trailer
pub const MIN_BLOCK_SIZE: u32 = 12;
/// Minimum Section Header Block size (16-byte fixed body)
pub const MIN_SHB_SIZE: u32 = MIN_BLOCK_SIZE + 16;
pub(crate) const MIN_IDB_SIZE: u32 = MIN_BLOCK_SIZE + 8;
pub(crate) const MIN_EPB_SIZE: u32 = MIN_BLOCK_SIZE + 20;
pub(crate) const MIN_PB_SIZE: u32 = MIN_BLOCK_SIZE + 20;
pub(crate) const MIN_SPB_SIZE: u32 = MIN_BLOCK_SIZE + 4;
pub(crate) const MIN_NRB_SIZE: u32 = MIN_BLOCK_SIZE + 4;
pub(crate) const MIN_ISB_SIZE: u32 = MIN_BLOCK_SIZE + 12;
pub(crate) const MIN_DSB_SIZE: u32 = MIN_BLOCK_SIZE + 8;
pub(crate) const MIN_SYSDIG_EVENT_SIZE: u32 = MIN_BLOCK_SIZE + 24;
pub(crate) const MIN_SYSDIG_EVENT_V2_SIZE: u32 = MIN_BLOCK_SIZE + 28;
// "__REALTIME_TIMESTAMP=0\n" is the shortest admissible journal entry
pub(crate) const MIN_JOURNAL_SIZE: u32 = MIN_BLOCK_SIZE + 23;

/// Largest decryption secrets payload accepted
pub const SECRETS_MAX_SIZE: u32 = 1024 * 1024 * 1024;

/// Ceiling on the accepted block total length.
///
/// Bounds allocations when reading hostile input: the largest snapshot
/// length of any link type, plus slack for the frame and options.
pub const MAX_BLOCK_SIZE: u32 = MIN_EPB_SIZE + MAX_PACKET_SIZE_DBUS + 131_072;

/// A block from a pcapng capture
#[derive(Debug)]
pub enum Block<'a> {
    SectionHeader(SectionHeaderBlock<'a>),
    InterfaceDescription(InterfaceDescriptionBlock<'a>),
    EnhancedPacket(EnhancedPacketBlock<'a>),
    ObsoletePacket(ObsoletePacketBlock<'a>),
    SimplePacket(SimplePacketBlock<'a>),
    NameResolution(NameResolutionBlock<'a>),
    InterfaceStatistics(InterfaceStatisticsBlock<'a>),
    DecryptionSecrets(DecryptionSecretsBlock<'a>),
    HostEvent(HostEventBlock<'a>),
    Journal(JournalBlock<'a>),
    Unknown(UnknownBlock<'a>),
}

impl<'a> Block<'a> {
    /// Returns true if the block yields a record to the caller
    /// (as opposed to updating reader state)
    pub fn is_record_block(&self) -> bool {
        matches!(
            self,
            Block::EnhancedPacket(_)
                | Block::ObsoletePacket(_)
                | Block::SimplePacket(_)
                | Block::HostEvent(_)
                | Block::Journal(_)
        )
    }

    /// The native block type value
    pub fn block_type(&self) -> u32 {
        match self {
            Block::SectionHeader(_) => SHB_MAGIC,
            Block::InterfaceDescription(_) => IDB_MAGIC,
            Block::EnhancedPacket(_) => EPB_MAGIC,
            Block::ObsoletePacket(_) => PB_MAGIC,
            Block::SimplePacket(_) => SPB_MAGIC,
            Block::NameResolution(_) => NRB_MAGIC,
            Block::InterfaceStatistics(_) => ISB_MAGIC,
            Block::DecryptionSecrets(_) => DSB_MAGIC,
            Block::HostEvent(heb) => match heb.version {
                HostEventVersion::V1 => SYSDIG_EVENT_MAGIC,
                HostEventVersion::V2 => SYSDIG_EVENT_V2_MAGIC,
            },
            Block::Journal(_) => JOURNAL_MAGIC,
            Block::Unknown(ub) => ub.block_type,
        }
    }
}

/// Body parser for one block kind.
///
/// The framer has already validated the type, the length invariants and the
/// trailer; `inner_parse` only decodes the body.
pub(crate) trait NgBlockParser<'a, En: PcapEndianness, O: 'a> {
    /// Native block type; 0 accepts any type
    const BLOCK_TYPE: u32;
    /// Minimum total block length
    const MIN_SIZE: u32;

    fn inner_parse(block_type: u32, block_len: u32, body: &'a [u8])
        -> IResult<&'a [u8], O, PcapError>;
}

fn check_block_length(block_len: u32, min: u32) -> Result<(), Err<PcapError>> {
    if block_len < min {
        return Err(Err::Error(PcapError::bad_file(format!(
            "total block length {} is less than the minimum {}",
            block_len, min
        ))));
    }
    if block_len % 4 != 0 {
        return Err(Err::Error(PcapError::bad_file(format!(
            "total block length {} is not a multiple of 4",
            block_len
        ))));
    }
    if block_len > MAX_BLOCK_SIZE {
        return Err(Err::Error(PcapError::bad_file(format!(
            "total block length {} is too large (> {})",
            block_len, MAX_BLOCK_SIZE
        ))));
    }
    Ok(())
}

/// Build the framed parser for one block kind and byte order
pub(crate) fn ng_block_parser<'a, P, En, O>() -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], O, PcapError>
where
    P: NgBlockParser<'a, En, O>,
    En: PcapEndianness,
    O: 'a,
{
    move |i: &'a [u8]| {
        if i.len() < MIN_BLOCK_SIZE as usize {
            return Err(Err::Incomplete(Needed::new(MIN_BLOCK_SIZE as usize - i.len())));
        }
        let (i, raw_type) = le_u32(i)?;
        let block_type = En::native_u32(raw_type);
        if P::BLOCK_TYPE != 0 && block_type != P::BLOCK_TYPE {
            return Err(Err::Error(PcapError::bad_file(format!(
                "unexpected block type {:#010x}",
                block_type
            ))));
        }
        let (i, block_len) = En::parse_u32(i)?;
        check_block_length(block_len, P::MIN_SIZE)?;
        let (i, body) = take(block_len - MIN_BLOCK_SIZE)(i)?;
        let (rem, trailer) = En::parse_u32(i)?;
        if trailer != block_len {
            return Err(Err::Error(PcapError::bad_file(format!(
                "trailer length {} does not match header length {}",
                trailer, block_len
            ))));
        }
        let (_, block) = P::inner_parse(block_type, block_len, body)?;
        Ok((rem, block))
    }
}

/// Parse any block of a little-endian section.
///
/// A Section Header Block declares its own byte order and is accepted by
/// both variants of this function.
pub fn parse_block_le(i: &[u8]) -> IResult<&[u8], Block, PcapError> {
    match le_u32::<_, PcapError>(i) {
        Ok((_, block_type)) => match block_type {
            SHB_MAGIC => map(parse_section_header_block, Block::SectionHeader)(i),
            IDB_MAGIC => map(
                parse_interface_description_block_le,
                Block::InterfaceDescription,
            )(i),
            EPB_MAGIC => map(parse_enhanced_packet_block_le, Block::EnhancedPacket)(i),
            PB_MAGIC => map(parse_obsolete_packet_block_le, Block::ObsoletePacket)(i),
            SPB_MAGIC => map(parse_simple_packet_block_le, Block::SimplePacket)(i),
            NRB_MAGIC => map(parse_name_resolution_block_le, Block::NameResolution)(i),
            ISB_MAGIC => map(
                parse_interface_statistics_block_le,
                Block::InterfaceStatistics,
            )(i),
            DSB_MAGIC => map(parse_decryption_secrets_block_le, Block::DecryptionSecrets)(i),
            SYSDIG_EVENT_MAGIC => map(parse_host_event_block_le, Block::HostEvent)(i),
            SYSDIG_EVENT_V2_MAGIC => map(parse_host_event_v2_block_le, Block::HostEvent)(i),
            JOURNAL_MAGIC => map(parse_journal_block_le, Block::Journal)(i),
            _ => map(parse_unknown_block_le, Block::Unknown)(i),
        },
        Err(e) => Err(e),
    }
}

/// Parse any block of a big-endian section
pub fn parse_block_be(i: &[u8]) -> IResult<&[u8], Block, PcapError> {
    match be_u32::<_, PcapError>(i) {
        Ok((_, block_type)) => match block_type {
            SHB_MAGIC => map(parse_section_header_block, Block::SectionHeader)(i),
            IDB_MAGIC => map(
                parse_interface_description_block_be,
                Block::InterfaceDescription,
            )(i),
            EPB_MAGIC => map(parse_enhanced_packet_block_be, Block::EnhancedPacket)(i),
            PB_MAGIC => map(parse_obsolete_packet_block_be, Block::ObsoletePacket)(i),
            SPB_MAGIC => map(parse_simple_packet_block_be, Block::SimplePacket)(i),
            NRB_MAGIC => map(parse_name_resolution_block_be, Block::NameResolution)(i),
            ISB_MAGIC => map(
                parse_interface_statistics_block_be,
                Block::InterfaceStatistics,
            )(i),
            DSB_MAGIC => map(parse_decryption_secrets_block_be, Block::DecryptionSecrets)(i),
            SYSDIG_EVENT_MAGIC => map(parse_host_event_block_be, Block::HostEvent)(i),
            SYSDIG_EVENT_V2_MAGIC => map(parse_host_event_v2_block_be, Block::HostEvent)(i),
            JOURNAL_MAGIC => map(parse_journal_block_be, Block::Journal)(i),
            _ => map(parse_unknown_block_be, Block::Unknown)(i),
        },
        Err(e) => Err(e),
    }
}
