//! Block serialization.
//!
//! Every block implements [ToVec]: `fix()` recomputes the total length and
//! normalizes the option list (the sizer pass), `to_vec_raw()` emits the
//! framed bytes. Output is always little-endian; readers accept both
//! orders.

use std::borrow::Cow;
use std::io::Write;

use cookie_factory::bytes::{le_i64, le_u16, le_u32, le_u64};
use cookie_factory::combinator::{cond, slice};
use cookie_factory::multi::many_ref;
use cookie_factory::sequence::tuple;
use cookie_factory::{gen, GenError, SerializeFn};
use rusticata_macros::align32;
use tracing::warn;

use crate::blocks::*;

/// Common trait for all serialization functions
pub trait ToVec {
    /// Serialize to bytes (little-endian), fixing lengths and options first
    fn to_vec(&mut self) -> Result<Vec<u8>, GenError> {
        self.fix();
        self.to_vec_raw()
    }

    /// Recompute length fields and normalize the option list
    fn fix(&mut self) {}

    /// Serialize to bytes (little-endian) without checking or fixing values
    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError>;
}

fn padding_for<'a, W: Write + 'a>(unaligned_len: usize) -> impl SerializeFn<W> + 'a {
    let pad = align32!(unaligned_len) - unaligned_len;
    slice(&[0u8, 0, 0, 0][..pad])
}

fn block_option_le<'a, 'b: 'a, W: Write + 'a>(o: &'b BlockOption) -> impl SerializeFn<W> + 'a {
    tuple((
        le_u16(o.code.0),
        le_u16(o.len),
        slice(o.raw_value()),
        padding_for(o.raw_value().len()),
    ))
}

fn options_length(options: &[BlockOption]) -> usize {
    options.iter().map(|o| 4 + align32!(o.raw_value().len())).sum()
}

/// Normalize an option list before sizing: remove stray end-of-options
/// entries, drop unrepresentable values, and terminate a non-empty list.
fn fix_options(options: &mut Vec<BlockOption>) {
    options.retain(|o| {
        if o.code == OptionCode::EndOfOpt {
            return false;
        }
        if o.raw_value().len() > usize::from(u16::MAX) {
            warn!("dropping option {:?}: value does not fit a 16-bit length", o.code);
            return false;
        }
        true
    });
    if !options.is_empty() {
        options.push(BlockOption {
            code: OptionCode::EndOfOpt,
            len: 0,
            value: Cow::Borrowed(&[]),
        });
    }
}

impl<'a> ToVec for SectionHeaderBlock<'a> {
    fn fix(&mut self) {
        self.bom = BOM_MAGIC;
        self.major_version = 1;
        self.minor_version = 0;
        fix_options(&mut self.options);
        self.block_len = (MIN_SHB_SIZE as usize + options_length(&self.options)) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(SHB_MAGIC),
                le_u32(self.block_len),
                le_u32(self.bom),
                le_u16(self.major_version),
                le_u16(self.minor_version),
                le_i64(self.section_len),
                many_ref(&self.options, block_option_le),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for InterfaceDescriptionBlock<'a> {
    fn fix(&mut self) {
        self.reserved = 0;
        if !self.options.iter().any(|o| o.code == OptionCode::IfTsresol) {
            self.options.push(BlockOption::new(
                OptionCode::IfTsresol,
                vec![self.if_tsresol],
            ));
        }
        if self.if_tsoffset != 0
            && !self.options.iter().any(|o| o.code == OptionCode::IfTsoffset)
        {
            self.options.push(BlockOption::new(
                OptionCode::IfTsoffset,
                self.if_tsoffset.to_le_bytes().to_vec(),
            ));
        }
        fix_options(&mut self.options);
        self.block_len = (20 + options_length(&self.options)) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(IDB_MAGIC),
                le_u32(self.block_len),
                le_u16(self.linktype.0 as u16),
                le_u16(self.reserved),
                le_u32(self.snaplen),
                many_ref(&self.options, block_option_le),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for EnhancedPacketBlock<'a> {
    fn fix(&mut self) {
        fix_options(&mut self.options);
        self.block_len =
            (32 + align32!(self.data.len()) + options_length(&self.options)) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(EPB_MAGIC),
                le_u32(self.block_len),
                le_u32(self.if_id),
                le_u32(self.ts_high),
                le_u32(self.ts_low),
                le_u32(self.caplen),
                le_u32(self.origlen),
                slice(self.data),
                padding_for(self.data.len()),
                many_ref(&self.options, block_option_le),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for ObsoletePacketBlock<'a> {
    fn fix(&mut self) {
        fix_options(&mut self.options);
        self.block_len =
            (32 + align32!(self.data.len()) + options_length(&self.options)) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(PB_MAGIC),
                le_u32(self.block_len),
                le_u16(self.if_id),
                le_u16(self.drops),
                le_u32(self.ts_high),
                le_u32(self.ts_low),
                le_u32(self.caplen),
                le_u32(self.origlen),
                slice(self.data),
                padding_for(self.data.len()),
                many_ref(&self.options, block_option_le),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for SimplePacketBlock<'a> {
    fn fix(&mut self) {
        self.block_len = (16 + align32!(self.data.len())) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(SPB_MAGIC),
                le_u32(self.block_len),
                le_u32(self.origlen),
                slice(self.data),
                padding_for(self.data.len()),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

fn name_record_wire(r: &NameRecord) -> (u16, Vec<u8>) {
    match r {
        NameRecord::Ipv4 { addr, names } => {
            let mut value = addr.octets().to_vec();
            for name in names {
                value.extend_from_slice(name);
                value.push(0);
            }
            (NAME_RECORD_IPV4, value)
        }
        NameRecord::Ipv6 { addr, names } => {
            let mut value = addr.octets().to_vec();
            for name in names {
                value.extend_from_slice(name);
                value.push(0);
            }
            (NAME_RECORD_IPV6, value)
        }
        NameRecord::Other { record_type, value } => (*record_type, value.to_vec()),
    }
}

fn name_record_le<'a, 'b: 'a, W: Write + 'a>(r: &'b NameRecord) -> impl SerializeFn<W> + 'a {
    move |out: cookie_factory::WriteContext<W>| {
        let (record_type, value) = name_record_wire(r);
        let result = tuple((
            le_u16(record_type),
            le_u16(value.len() as u16),
            slice(&value),
            padding_for(value.len()),
        ))(out);
        result
    }
}

fn name_records_length(records: &[NameRecord]) -> usize {
    // 4 trailing bytes for the end record
    records
        .iter()
        .map(|r| 4 + align32!(name_record_wire(r).1.len()))
        .sum::<usize>()
        + 4
}

impl<'a> ToVec for NameResolutionBlock<'a> {
    fn fix(&mut self) {
        fix_options(&mut self.options);
        self.block_len =
            (12 + name_records_length(&self.records) + options_length(&self.options)) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(NRB_MAGIC),
                le_u32(self.block_len),
                many_ref(&self.records, name_record_le),
                le_u16(NAME_RECORD_END),
                le_u16(0),
                many_ref(&self.options, block_option_le),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for InterfaceStatisticsBlock<'a> {
    fn fix(&mut self) {
        fix_options(&mut self.options);
        self.block_len = (24 + options_length(&self.options)) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(ISB_MAGIC),
                le_u32(self.block_len),
                le_u32(self.if_id),
                le_u32(self.ts_high),
                le_u32(self.ts_low),
                many_ref(&self.options, block_option_le),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for DecryptionSecretsBlock<'a> {
    fn fix(&mut self) {
        fix_options(&mut self.options);
        self.block_len =
            (20 + align32!(self.data.len()) + options_length(&self.options)) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(DSB_MAGIC),
                le_u32(self.block_len),
                le_u32(self.secrets_type.0),
                le_u32(self.secrets_len),
                slice(self.data),
                padding_for(self.data.len()),
                many_ref(&self.options, block_option_le),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for HostEventBlock<'a> {
    fn fix(&mut self) {
        let header_len = match self.version {
            HostEventVersion::V1 => 24,
            HostEventVersion::V2 => 28,
        };
        self.block_len = (12 + header_len + align32!(self.data.len())) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let block_type = match self.version {
            HostEventVersion::V1 => SYSDIG_EVENT_MAGIC,
            HostEventVersion::V2 => SYSDIG_EVENT_V2_MAGIC,
        };
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(block_type),
                le_u32(self.block_len),
                le_u16(self.cpu_id),
                le_u64(self.ts),
                le_u64(self.thread_id),
                le_u32(self.event_len),
                le_u16(self.event_type),
                cond(
                    self.version == HostEventVersion::V2,
                    le_u32(self.nparams.unwrap_or(0)),
                ),
                slice(self.data),
                padding_for(self.data.len()),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for JournalBlock<'a> {
    fn fix(&mut self) {
        self.block_len = (12 + align32!(self.data.len())) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(JOURNAL_MAGIC),
                le_u32(self.block_len),
                slice(self.data),
                padding_for(self.data.len()),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for UnknownBlock<'a> {
    fn fix(&mut self) {
        // the type stays untouched, it is not ours
        self.block_len = (12 + align32!(self.data.len())) as u32;
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        let mut v = Vec::with_capacity(self.block_len as usize);
        gen(
            tuple((
                le_u32(self.block_type),
                le_u32(self.block_len),
                slice(self.data),
                padding_for(self.data.len()),
                le_u32(self.block_len),
            )),
            &mut v,
        )
        .map(|res| res.0.to_vec())
    }
}

impl<'a> ToVec for Block<'a> {
    fn fix(&mut self) {
        match self {
            Block::SectionHeader(b) => b.fix(),
            Block::InterfaceDescription(b) => b.fix(),
            Block::EnhancedPacket(b) => b.fix(),
            Block::ObsoletePacket(b) => b.fix(),
            Block::SimplePacket(b) => b.fix(),
            Block::NameResolution(b) => b.fix(),
            Block::InterfaceStatistics(b) => b.fix(),
            Block::DecryptionSecrets(b) => b.fix(),
            Block::HostEvent(b) => b.fix(),
            Block::Journal(b) => b.fix(),
            Block::Unknown(b) => b.fix(),
        }
    }

    fn to_vec_raw(&self) -> Result<Vec<u8>, GenError> {
        match self {
            Block::SectionHeader(b) => b.to_vec_raw(),
            Block::InterfaceDescription(b) => b.to_vec_raw(),
            Block::EnhancedPacket(b) => b.to_vec_raw(),
            Block::ObsoletePacket(b) => b.to_vec_raw(),
            Block::SimplePacket(b) => b.to_vec_raw(),
            Block::NameResolution(b) => b.to_vec_raw(),
            Block::InterfaceStatistics(b) => b.to_vec_raw(),
            Block::DecryptionSecrets(b) => b.to_vec_raw(),
            Block::HostEvent(b) => b.to_vec_raw(),
            Block::Journal(b) => b.to_vec_raw(),
            Block::Unknown(b) => b.to_vec_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{
        parse_enhanced_packet_block_le, parse_interface_description_block_le,
        parse_name_resolution_block_le, parse_section_header_block,
    };
    use crate::linktype::Linktype;
    use std::borrow::Cow;
    use std::net::Ipv4Addr;

    #[test]
    fn serialize_shb() {
        let mut shb = SectionHeaderBlock {
            block_len: 0,
            bom: 0,
            major_version: 0,
            minor_version: 0,
            section_len: -1,
            options: vec![BlockOption::new(
                OptionCode::ShbUserAppl,
                b"meows".to_vec(),
            )],
        };
        let v = shb.to_vec().expect("serialize");
        assert_eq!(v.len() % 4, 0);
        let (rem, parsed) = parse_section_header_block(&v).expect("reparse");
        assert!(rem.is_empty());
        assert!(!parsed.big_endian());
        assert_eq!(parsed.user_application().as_deref(), Some("meows"));
    }

    #[test]
    fn serialize_idb_adds_tsresol() {
        let mut idb = InterfaceDescriptionBlock {
            block_len: 0,
            linktype: Linktype::RAW,
            reserved: 0,
            snaplen: 65535,
            options: Vec::new(),
            if_tsresol: 9,
            if_tsoffset: 0,
        };
        let v = idb.to_vec().expect("serialize");
        let (rem, parsed) = parse_interface_description_block_le(&v).expect("reparse");
        assert!(rem.is_empty());
        assert_eq!(parsed.if_tsresol, 9);
        assert_eq!(parsed.snaplen, 65535);
    }

    #[test]
    fn serialize_epb_pads_data() {
        let data = [0xde, 0xad, 0xbe, 0xef, 0x00];
        let mut epb = EnhancedPacketBlock {
            block_len: 0,
            if_id: 0,
            ts_high: 0,
            ts_low: 1,
            caplen: data.len() as u32,
            origlen: data.len() as u32,
            data: &data,
            options: Vec::new(),
        };
        let v = epb.to_vec().expect("serialize");
        assert_eq!(v.len(), 32 + 8);
        let (rem, parsed) = parse_enhanced_packet_block_le(&v).expect("reparse");
        assert!(rem.is_empty());
        assert_eq!(parsed.packet_data(), &data);
        assert_eq!(parsed.block_len as usize, v.len());
    }

    #[test]
    fn serialize_nrb_round_trip() {
        let names: Vec<&[u8]> = vec![b"a.example"];
        let mut nrb = NameResolutionBlock {
            block_len: 0,
            records: vec![NameRecord::Ipv4 {
                addr: Ipv4Addr::new(192, 0, 2, 1),
                names,
            }],
            options: Vec::new(),
        };
        let v = nrb.to_vec().expect("serialize");
        let (rem, parsed) = parse_name_resolution_block_le(&v).expect("reparse");
        assert!(rem.is_empty());
        assert_eq!(parsed.records.len(), 1);
        match &parsed.records[0] {
            NameRecord::Ipv4 { addr, names } => {
                assert_eq!(*addr, Ipv4Addr::new(192, 0, 2, 1));
                assert_eq!(names, &[&b"a.example"[..]]);
            }
            r => panic!("unexpected record {:?}", r),
        }
    }

    #[test]
    fn oversized_option_is_dropped() {
        let mut shb = SectionHeaderBlock {
            block_len: 0,
            bom: BOM_MAGIC,
            major_version: 1,
            minor_version: 0,
            section_len: -1,
            options: vec![BlockOption {
                code: OptionCode::ShbOs,
                len: u16::MAX,
                value: Cow::Owned(vec![b'x'; usize::from(u16::MAX) + 1]),
            }],
        };
        let v = shb.to_vec().expect("serialize");
        assert_eq!(v.len(), MIN_SHB_SIZE as usize);
    }
}
