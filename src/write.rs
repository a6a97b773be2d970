//! Capture writer: a session that emits a section header, interface
//! descriptions, records, and on [CaptureWriter::finish] the queued
//! name-resolution and interface-statistics blocks.
//!
//! Every block is sized before emission and written with a single
//! `write_all`, so no partial block ever reaches the sink on error.
//! Output is little-endian.

use std::io::Write;
use std::net::{Ipv4Addr, Ipv6Addr};

use rusticata_macros::align32;
use tracing::warn;

use crate::blocks::{
    BlockOption, DecryptionSecretsBlock, EnhancedPacketBlock, HostEventBlock, HostEventVersion,
    InterfaceDescriptionBlock, InterfaceFilter, InterfaceStatisticsBlock, JournalBlock,
    NameRecord, NameResolutionBlock, ObsoletePacketBlock, OptionCode, SectionHeaderBlock,
    UnknownBlock, Verdict, BOM_MAGIC, FILTER_KIND_BPF, FILTER_KIND_LIBPCAP, SECRETS_MAX_SIZE,
    VERDICT_TYPE_HW, VERDICT_TYPE_TC, VERDICT_TYPE_XDP,
};
use crate::error::PcapError;
use crate::linktype::Linktype;
use crate::records::{
    HostEventRecord, InterfaceRecord, JournalRecord, PacketRecord, Record, SecretsRecord,
    SectionRecord,
};
use crate::registry;
use crate::section::{join_timestamp, ts_units_from_tsresol, InterfaceStats};
use crate::serialize::ToVec;

// journal entries shorter than "__REALTIME_TIMESTAMP=0\n" are refused on read
const MIN_JOURNAL_ENTRY_LEN: usize = 23;

// name resolution entries are packed into blocks no larger than this
const NRB_BLOCK_LIMIT: usize = 65536;

struct WriterInterface {
    linktype: Linktype,
    units_per_second: u64,
    tsoffset: i64,
}

/// A pcapng write session over any `Write` sink.
///
/// Interfaces must be added before the packets that reference them.
/// Name-resolution entries and interface statistics are queued and flushed
/// by [finish](CaptureWriter::finish).
pub struct CaptureWriter<W: Write> {
    sink: W,
    bytes_written: u64,
    interfaces: Vec<WriterInterface>,
    v4_names: Vec<(Ipv4Addr, String)>,
    v6_names: Vec<(Ipv6Addr, String)>,
    stats: Vec<(u32, InterfaceStats)>,
}

impl<W: Write> CaptureWriter<W> {
    /// Start a write session: emit the section header, the initial
    /// interfaces, and any initial decryption secrets.
    pub fn create(
        sink: W,
        section: &SectionRecord,
        interfaces: &[InterfaceRecord],
        secrets: Option<&SecretsRecord>,
    ) -> Result<CaptureWriter<W>, PcapError> {
        let mut writer = CaptureWriter {
            sink,
            bytes_written: 0,
            interfaces: Vec::new(),
            v4_names: Vec::new(),
            v6_names: Vec::new(),
            stats: Vec::new(),
        };
        let mut shb = SectionHeaderBlock {
            block_len: 0,
            bom: BOM_MAGIC,
            major_version: 1,
            minor_version: 0,
            // streamed output, total size unknown in advance
            section_len: -1,
            options: section_block_options(section),
        };
        let v = shb.to_vec()?;
        writer.emit(shb.block_len, v)?;
        for rec in interfaces {
            writer.add_interface(rec)?;
        }
        if let Some(s) = secrets {
            writer.write_secrets(s)?;
        }
        Ok(writer)
    }

    /// Total bytes emitted so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Emit an Interface Description Block and return the interface
    /// identifier packets should reference.
    pub fn add_interface(&mut self, rec: &InterfaceRecord) -> Result<u32, PcapError> {
        if !rec.linktype.has_wire_mapping() {
            return Err(PcapError::UnsupportedEncap(rec.linktype));
        }
        let (units_per_second, inaccurate) = ts_units_from_tsresol(rec.tsresol);
        if inaccurate {
            return Err(PcapError::bad_file(format!(
                "interface time resolution {:#04x} is not representable",
                rec.tsresol
            )));
        }
        let mut idb = InterfaceDescriptionBlock {
            block_len: 0,
            linktype: rec.linktype,
            reserved: 0,
            snaplen: rec.snaplen,
            options: interface_block_options(rec),
            if_tsresol: rec.tsresol,
            if_tsoffset: rec.tsoffset,
        };
        let v = idb.to_vec()?;
        self.emit(idb.block_len, v)?;
        let id = self.interfaces.len() as u32;
        self.interfaces.push(WriterInterface {
            linktype: rec.linktype,
            units_per_second,
            tsoffset: rec.tsoffset,
        });
        Ok(id)
    }

    /// Write one record, selecting the block kind from its shape
    pub fn write_record(&mut self, record: &Record) -> Result<(), PcapError> {
        match record {
            Record::Packet(rec) => self.write_packet(rec),
            Record::HostEvent(rec) => self.write_host_event(rec),
            Record::Journal(rec) => self.write_journal(rec),
        }
    }

    /// Write a packet record.
    ///
    /// Emits an Enhanced Packet Block, or the obsolete Packet Block shape
    /// when the record carries the legacy per-packet drop counter.
    pub fn write_packet(&mut self, rec: &PacketRecord) -> Result<(), PcapError> {
        let iface = self
            .interfaces
            .get(rec.interface_id as usize)
            .ok_or_else(|| {
                PcapError::bad_file(format!(
                    "packet references interface {} but the writer has {}",
                    rec.interface_id,
                    self.interfaces.len()
                ))
            })?;
        let caplen = rec.caplen();
        if caplen > rec.origlen {
            return Err(PcapError::bad_file(format!(
                "captured length {} exceeds the packet length {}",
                caplen, rec.origlen
            )));
        }
        let max = iface.linktype.max_snap_len();
        if caplen > max {
            return Err(PcapError::PacketTooLarge { caplen, max });
        }
        let ticks = join_timestamp(
            rec.ts_secs,
            rec.ts_nanos,
            iface.units_per_second,
            iface.tsoffset,
        )?;
        let ts_high = (ticks >> 32) as u32;
        let ts_low = ticks as u32;
        let options = packet_block_options(rec);
        if let Some(drops) = rec.drops {
            if rec.interface_id > u32::from(u16::MAX) {
                return Err(PcapError::bad_file(format!(
                    "interface {} does not fit the obsolete packet block shape",
                    rec.interface_id
                )));
            }
            let mut pb = ObsoletePacketBlock {
                block_len: 0,
                if_id: rec.interface_id as u16,
                drops,
                ts_high,
                ts_low,
                caplen,
                origlen: rec.origlen,
                data: &rec.data,
                options,
            };
            let v = pb.to_vec()?;
            self.emit(pb.block_len, v)
        } else {
            let mut epb = EnhancedPacketBlock {
                block_len: 0,
                if_id: rec.interface_id,
                ts_high,
                ts_low,
                caplen,
                origlen: rec.origlen,
                data: &rec.data,
                options,
            };
            let v = epb.to_vec()?;
            self.emit(epb.block_len, v)
        }
    }

    /// Write a host event record (sysdig v1 or v2, selected by the
    /// presence of `nparams`)
    pub fn write_host_event(&mut self, rec: &HostEventRecord) -> Result<(), PcapError> {
        let version = if rec.nparams.is_some() {
            HostEventVersion::V2
        } else {
            HostEventVersion::V1
        };
        let mut heb = HostEventBlock {
            block_len: 0,
            version,
            cpu_id: rec.cpu_id,
            ts: rec.ts,
            thread_id: rec.thread_id,
            event_len: rec.event_len,
            event_type: rec.event_type,
            nparams: rec.nparams,
            data: &rec.data,
        };
        let v = heb.to_vec()?;
        self.emit(heb.block_len, v)
    }

    /// Write a journal entry record
    pub fn write_journal(&mut self, rec: &JournalRecord) -> Result<(), PcapError> {
        if rec.entry.len() < MIN_JOURNAL_ENTRY_LEN {
            return Err(PcapError::bad_file(format!(
                "journal entry of {} bytes is shorter than the minimum {}",
                rec.entry.len(),
                MIN_JOURNAL_ENTRY_LEN
            )));
        }
        let mut jb = JournalBlock {
            block_len: 0,
            data: &rec.entry,
        };
        let v = jb.to_vec()?;
        self.emit(jb.block_len, v)
    }

    /// Write a Decryption Secrets Block
    pub fn write_secrets(&mut self, rec: &SecretsRecord) -> Result<(), PcapError> {
        if rec.data.len() > SECRETS_MAX_SIZE as usize {
            return Err(PcapError::bad_file(format!(
                "secrets length {} is too large (> {})",
                rec.data.len(),
                SECRETS_MAX_SIZE
            )));
        }
        let mut dsb = DecryptionSecretsBlock {
            block_len: 0,
            secrets_type: rec.secrets_type,
            secrets_len: rec.data.len() as u32,
            data: &rec.data,
            options: Vec::new(),
        };
        let v = dsb.to_vec()?;
        self.emit(dsb.block_len, v)
    }

    /// Write a block through a registered handler
    pub fn write_custom(&mut self, block_type: u32, body: &[u8]) -> Result<(), PcapError> {
        let handler = registry::lookup_block_handler(block_type)
            .ok_or(PcapError::UnwritableRecordType(block_type))?;
        let body = (handler.write)(block_type, body)?;
        let mut ub = UnknownBlock {
            block_type,
            block_len: 0,
            data: &body,
        };
        let v = ub.to_vec()?;
        self.emit(ub.block_len, v)
    }

    /// Queue an IPv4 name resolution entry; flushed by `finish`
    pub fn add_ipv4_name(&mut self, addr: Ipv4Addr, name: &str) {
        self.v4_names.push((addr, name.to_owned()));
    }

    /// Queue an IPv6 name resolution entry; flushed by `finish`
    pub fn add_ipv6_name(&mut self, addr: Ipv6Addr, name: &str) {
        self.v6_names.push((addr, name.to_owned()));
    }

    /// Queue statistics for an interface; flushed by `finish`
    pub fn write_stats(&mut self, interface_id: u32, stats: InterfaceStats) -> Result<(), PcapError> {
        if interface_id as usize >= self.interfaces.len() {
            return Err(PcapError::bad_file(format!(
                "statistics reference interface {} but the writer has {}",
                interface_id,
                self.interfaces.len()
            )));
        }
        self.stats.push((interface_id, stats));
        Ok(())
    }

    /// Flush queued name-resolution and statistics blocks, flush the sink,
    /// and return it
    pub fn finish(mut self) -> Result<W, PcapError> {
        self.flush_name_records()?;
        self.flush_stats()?;
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn flush_name_records(&mut self) -> Result<(), PcapError> {
        let v4 = std::mem::take(&mut self.v4_names);
        let v6 = std::mem::take(&mut self.v6_names);
        if v4.is_empty() && v6.is_empty() {
            return Ok(());
        }
        let mut pending: Vec<NameRecord> = Vec::new();
        // frame, fixed body, end record
        let mut size = 16;
        for (addr, name) in &v4 {
            let value_len = 4 + name.len() + 1;
            if let Some(footprint) = record_footprint(value_len) {
                if size + footprint > NRB_BLOCK_LIMIT && !pending.is_empty() {
                    self.emit_name_block(std::mem::take(&mut pending))?;
                    size = 16;
                }
                pending.push(NameRecord::Ipv4 {
                    addr: *addr,
                    names: vec![name.as_bytes()],
                });
                size += footprint;
            }
        }
        for (addr, name) in &v6 {
            let value_len = 16 + name.len() + 1;
            if let Some(footprint) = record_footprint(value_len) {
                if size + footprint > NRB_BLOCK_LIMIT && !pending.is_empty() {
                    self.emit_name_block(std::mem::take(&mut pending))?;
                    size = 16;
                }
                pending.push(NameRecord::Ipv6 {
                    addr: *addr,
                    names: vec![name.as_bytes()],
                });
                size += footprint;
            }
        }
        if !pending.is_empty() {
            self.emit_name_block(pending)?;
        }
        Ok(())
    }

    fn emit_name_block(&mut self, records: Vec<NameRecord>) -> Result<(), PcapError> {
        let mut nrb = NameResolutionBlock {
            block_len: 0,
            records,
            options: Vec::new(),
        };
        let v = nrb.to_vec()?;
        self.emit(nrb.block_len, v)
    }

    fn flush_stats(&mut self) -> Result<(), PcapError> {
        let stats = std::mem::take(&mut self.stats);
        for (if_id, s) in stats {
            let mut options = Vec::new();
            let counters = [
                (OptionCode::IsbStartTime, s.start_time),
                (OptionCode::IsbEndTime, s.end_time),
                (OptionCode::IsbIfRecv, s.received),
                (OptionCode::IsbIfDrop, s.dropped),
                (OptionCode::IsbFilterAccept, s.filter_accepted),
                (OptionCode::IsbOsDrop, s.os_dropped),
                (OptionCode::IsbUsrDeliv, s.delivered),
            ];
            for (code, value) in counters {
                if let Some(v) = value {
                    options.push(BlockOption::new(code, v.to_le_bytes().to_vec()));
                }
            }
            let mut isb = InterfaceStatisticsBlock {
                block_len: 0,
                if_id,
                ts_high: (s.ts >> 32) as u32,
                ts_low: s.ts as u32,
                options,
            };
            let v = isb.to_vec()?;
            self.emit(isb.block_len, v)?;
        }
        Ok(())
    }

    fn emit(&mut self, expected_len: u32, bytes: Vec<u8>) -> Result<(), PcapError> {
        if bytes.len() != expected_len as usize {
            return Err(PcapError::Gen);
        }
        self.sink.write_all(&bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

fn record_footprint(value_len: usize) -> Option<usize> {
    if value_len > usize::from(u16::MAX) {
        warn!("dropping name resolution entry: record value does not fit 16 bits");
        return None;
    }
    Some(4 + align32!(value_len))
}

fn push_string_option(options: &mut Vec<BlockOption<'static>>, code: OptionCode, value: &str) {
    options.push(BlockOption::new(code, value.as_bytes().to_vec()));
}

fn section_block_options(section: &SectionRecord) -> Vec<BlockOption<'static>> {
    let mut options = Vec::new();
    if let Some(s) = &section.comment {
        push_string_option(&mut options, OptionCode::Comment, s);
    }
    if let Some(s) = &section.hardware {
        push_string_option(&mut options, OptionCode::ShbHardware, s);
    }
    if let Some(s) = &section.os {
        push_string_option(&mut options, OptionCode::ShbOs, s);
    }
    if let Some(s) = &section.user_application {
        push_string_option(&mut options, OptionCode::ShbUserAppl, s);
    }
    options
}

fn interface_block_options(rec: &InterfaceRecord) -> Vec<BlockOption<'static>> {
    let mut options = Vec::new();
    if let Some(s) = &rec.comment {
        push_string_option(&mut options, OptionCode::Comment, s);
    }
    if let Some(s) = &rec.name {
        push_string_option(&mut options, OptionCode::IfName, s);
    }
    if let Some(s) = &rec.description {
        push_string_option(&mut options, OptionCode::IfDescription, s);
    }
    if let Some(s) = &rec.os {
        push_string_option(&mut options, OptionCode::IfOs, s);
    }
    if let Some(s) = &rec.hardware {
        push_string_option(&mut options, OptionCode::IfHardware, s);
    }
    if let Some(speed) = rec.speed {
        options.push(BlockOption::new(
            OptionCode::IfSpeed,
            speed.to_le_bytes().to_vec(),
        ));
    }
    if let Some(fcslen) = rec.fcslen {
        options.push(BlockOption::new(OptionCode::IfFcslen, vec![fcslen]));
    }
    if let Some(filter) = &rec.filter {
        options.push(BlockOption::new(OptionCode::IfFilter, filter_wire(filter)));
    }
    options
}

fn filter_wire(filter: &InterfaceFilter) -> Vec<u8> {
    match filter {
        InterfaceFilter::Libpcap(expr) => {
            let mut v = vec![FILTER_KIND_LIBPCAP];
            v.extend_from_slice(expr.as_bytes());
            v
        }
        InterfaceFilter::Bpf(insns) => {
            let mut v = Vec::with_capacity(1 + insns.len() * 8);
            v.push(FILTER_KIND_BPF);
            for insn in insns {
                v.extend_from_slice(&insn.code.to_le_bytes());
                v.push(insn.jt);
                v.push(insn.jf);
                v.extend_from_slice(&insn.k.to_le_bytes());
            }
            v
        }
    }
}

fn packet_block_options(rec: &PacketRecord) -> Vec<BlockOption<'static>> {
    let mut options = Vec::new();
    if let Some(s) = &rec.comment {
        push_string_option(&mut options, OptionCode::Comment, s);
    }
    if let Some(flags) = rec.flags {
        options.push(BlockOption::new(
            OptionCode::EpbFlags,
            flags.0.to_le_bytes().to_vec(),
        ));
    }
    if let Some(v) = rec.drop_count {
        options.push(BlockOption::new(
            OptionCode::EpbDropCount,
            v.to_le_bytes().to_vec(),
        ));
    }
    if let Some(v) = rec.packet_id {
        options.push(BlockOption::new(
            OptionCode::EpbPacketId,
            v.to_le_bytes().to_vec(),
        ));
    }
    if let Some(v) = rec.queue {
        options.push(BlockOption::new(
            OptionCode::EpbQueue,
            v.to_le_bytes().to_vec(),
        ));
    }
    for verdict in &rec.verdicts {
        options.push(BlockOption::new(OptionCode::EpbVerdict, verdict_wire(verdict)));
    }
    options
}

fn verdict_wire(verdict: &Verdict) -> Vec<u8> {
    match verdict {
        Verdict::Hardware(bytes) => {
            let mut v = vec![VERDICT_TYPE_HW];
            v.extend_from_slice(bytes);
            v
        }
        Verdict::LinuxTc(raw) => {
            let mut v = vec![VERDICT_TYPE_TC];
            v.extend_from_slice(&raw.to_le_bytes());
            v
        }
        Verdict::LinuxXdp(raw) => {
            let mut v = vec![VERDICT_TYPE_XDP];
            v.extend_from_slice(&raw.to_le_bytes());
            v
        }
    }
}
