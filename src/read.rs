//! Capture reader: probe, sequential reading, and random access.
//!
//! The reader is a streaming state machine over a circular buffer, so
//! memory usage stays bounded regardless of file size. Blocks that carry a
//! record (packets, host events, journal entries) are returned to the
//! caller as owned values; all other blocks update reader state and are
//! consumed silently.

use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::net::{Ipv4Addr, Ipv6Addr};

use circular::Buffer;
use nom::{Needed, Offset};
use tracing::{debug, trace};

use crate::blocks::{
    parse_block_be, parse_block_le, parse_section_header_block, parse_verdict, Block, BlockOption,
    EnhancedPacketBlock, HostEventBlock, JournalBlock, NameRecord, NameResolutionBlock,
    ObsoletePacketBlock, OptionCode, PacketFlags, SimplePacketBlock, BOM_MAGIC, MAX_BLOCK_SIZE,
    MIN_BLOCK_SIZE, SHB_MAGIC,
};
use crate::endianness::read_u32_e;
use crate::error::PcapError;
use crate::linktype::Linktype;
use crate::records::{HostEventRecord, JournalRecord, PacketRecord};
use crate::registry::{self, BlockKind};
use crate::section::{InterfaceInfo, SectionInfo, Summary, TsPrecision};

/// Result of probing a stream for the pcapng format
#[derive(Debug)]
pub enum ProbeResult {
    /// The stream starts with a well-formed section header
    Pcapng,
    /// The stream is something else
    NotPcapng,
    /// The stream could not be read
    Error(PcapError),
}

/// Decide whether a stream is pcapng without committing to parsing it.
///
/// Reads the first 12 bytes; a Section Header Block type followed by a
/// valid byte-order magic is the probe signal. A short read here means
/// "not our format", not an error.
pub fn probe<R: Read>(reader: &mut R) -> ProbeResult {
    let mut hdr = [0u8; 12];
    let mut done = 0;
    while done < hdr.len() {
        match reader.read(&mut hdr[done..]) {
            Ok(0) => return ProbeResult::NotPcapng,
            Ok(n) => done += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return ProbeResult::Error(PcapError::Io(e)),
        }
    }
    let block_type = u32::from_le_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]);
    let bom = u32::from_le_bytes([hdr[8], hdr[9], hdr[10], hdr[11]]);
    if block_type == SHB_MAGIC && (bom == BOM_MAGIC || bom == BOM_MAGIC.swap_bytes()) {
        ProbeResult::Pcapng
    } else {
        ProbeResult::NotPcapng
    }
}

/// A record produced by [CaptureReader::read_next]
#[derive(Debug, PartialEq)]
pub enum Event {
    Packet(PacketRecord),
    HostEvent(HostEventRecord),
    Journal(JournalRecord),
    EndOfFile,
}

/// Callback invoked for every IPv4 address/name pair of a Name Resolution
/// Block
pub type Ipv4NameSink = Box<dyn FnMut(Ipv4Addr, &str)>;
/// Callback invoked for every IPv6 address/name pair of a Name Resolution
/// Block
pub type Ipv6NameSink = Box<dyn FnMut(Ipv6Addr, &str)>;

const DEFAULT_BUFFER_CAPACITY: usize = 65536;

/// Configures and opens a [CaptureReader]
pub struct CaptureReaderBuilder {
    capacity: usize,
    v4_sink: Option<Ipv4NameSink>,
    v6_sink: Option<Ipv6NameSink>,
}

impl Default for CaptureReaderBuilder {
    fn default() -> Self {
        CaptureReaderBuilder {
            capacity: DEFAULT_BUFFER_CAPACITY,
            v4_sink: None,
            v6_sink: None,
        }
    }
}

impl CaptureReaderBuilder {
    /// Initial buffer capacity; the buffer grows on demand up to the
    /// maximum block size
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(MIN_BLOCK_SIZE as usize);
        self
    }

    /// Receive IPv4 name resolution entries as they are read
    pub fn ipv4_name_sink<F>(mut self, sink: F) -> Self
    where
        F: FnMut(Ipv4Addr, &str) + 'static,
    {
        self.v4_sink = Some(Box::new(sink));
        self
    }

    /// Receive IPv6 name resolution entries as they are read
    pub fn ipv6_name_sink<F>(mut self, sink: F) -> Self
    where
        F: FnMut(Ipv6Addr, &str) + 'static,
    {
        self.v6_sink = Some(Box::new(sink));
        self
    }

    /// Open the reader, verifying that the stream starts with a section
    /// header
    pub fn open<R: Read>(self, reader: R) -> Result<CaptureReader<R>, PcapError> {
        let mut reader = CaptureReader {
            reader,
            buffer: Buffer::with_capacity(self.capacity),
            consumed: 0,
            reader_exhausted: false,
            started: false,
            sections: Vec::new(),
            file_encap: Summary::Unset,
            file_tsprec: Summary::Unset,
            v4_sink: self.v4_sink,
            v6_sink: self.v6_sink,
        };
        reader.refill()?;
        loop {
            match parse_section_header_block(reader.buffer.data()) {
                Ok(_) => return Ok(reader),
                Err(nom::Err::Incomplete(n)) => {
                    if reader.reader_exhausted {
                        return Err(PcapError::NotOurFormat);
                    }
                    reader.ensure(n)?;
                }
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                    return Err(match e {
                        PcapError::NotOurFormat => PcapError::NotOurFormat,
                        other => other,
                    })
                }
            }
        }
    }
}

/// Sequential (and, for seekable streams, random-access) pcapng reader.
///
/// Section state is tracked as the file is read: each Section Header Block
/// archives the previous section and opens a new one, Interface Description
/// Blocks grow the current interface table, and packet blocks are decoded
/// against it.
pub struct CaptureReader<R: Read> {
    reader: R,
    buffer: Buffer,
    consumed: u64,
    reader_exhausted: bool,
    started: bool,
    sections: Vec<SectionInfo>,
    file_encap: Summary<Linktype>,
    file_tsprec: Summary<TsPrecision>,
    v4_sink: Option<Ipv4NameSink>,
    v6_sink: Option<Ipv6NameSink>,
}

impl<R: Read> std::fmt::Debug for CaptureReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureReader")
            .field("consumed", &self.consumed)
            .field("reader_exhausted", &self.reader_exhausted)
            .field("started", &self.started)
            .field("sections", &self.sections)
            .field("file_encap", &self.file_encap)
            .field("file_tsprec", &self.file_tsprec)
            .finish()
    }
}

impl<R: Read> CaptureReader<R> {
    /// Open a reader with default settings
    pub fn open(reader: R) -> Result<CaptureReader<R>, PcapError> {
        CaptureReaderBuilder::default().open(reader)
    }

    /// Configure buffer capacity and name sinks before opening
    pub fn builder() -> CaptureReaderBuilder {
        CaptureReaderBuilder::default()
    }

    /// All sections read so far, in file order; the last one is current
    pub fn sections(&self) -> &[SectionInfo] {
        &self.sections
    }

    /// The section currently being read
    pub fn current_section(&self) -> Option<&SectionInfo> {
        self.sections.last()
    }

    /// The file-wide link type, if all interfaces agree
    pub fn file_encap(&self) -> Summary<Linktype> {
        self.file_encap
    }

    /// The file-wide timestamp precision, if all interfaces agree
    pub fn file_ts_precision(&self) -> Summary<TsPrecision> {
        self.file_tsprec
    }

    /// Absolute offset of the next unparsed byte
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Read the next record, consuming internal blocks along the way.
    ///
    /// Returns [Event::EndOfFile] at a clean end of stream; a stream that
    /// ends inside a block is an error.
    pub fn read_next(&mut self) -> Result<Event, PcapError> {
        loop {
            let data = self.buffer.data();
            let big_endian = self.sections.last().map(|s| s.big_endian).unwrap_or(false);
            let parsed = if !self.started {
                parse_section_header_block(data)
                    .map(|(rem, shb)| (rem, Block::SectionHeader(shb)))
            } else if big_endian {
                parse_block_be(data)
            } else {
                parse_block_le(data)
            };
            match parsed {
                Ok((rem, block)) => {
                    let offset = data.offset(rem);
                    let event = Self::handle_block(
                        &mut self.sections,
                        &mut self.file_encap,
                        &mut self.file_tsprec,
                        &mut self.v4_sink,
                        &mut self.v6_sink,
                        block,
                        self.consumed,
                    )?;
                    self.started = true;
                    self.consumed += offset as u64;
                    self.buffer.consume(offset);
                    if let Some(event) = event {
                        return Ok(event);
                    }
                }
                Err(nom::Err::Incomplete(n)) => {
                    if self.reader_exhausted {
                        if !self.started {
                            return Err(PcapError::NotOurFormat);
                        }
                        if self.buffer.available_data() == 0 {
                            return Ok(Event::EndOfFile);
                        }
                        return Err(PcapError::UnexpectedEof);
                    }
                    self.ensure(n)?;
                }
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                    if self.started && matches!(e, PcapError::NotOurFormat) {
                        // a confirmed capture with a garbled later section
                        // header is malformed, not foreign
                        return Err(PcapError::bad_file(
                            "unknown byte-order magic in section header",
                        ));
                    }
                    return Err(e);
                }
            }
        }
    }

    fn handle_block(
        sections: &mut Vec<SectionInfo>,
        file_encap: &mut Summary<Linktype>,
        file_tsprec: &mut Summary<TsPrecision>,
        v4_sink: &mut Option<Ipv4NameSink>,
        v6_sink: &mut Option<Ipv6NameSink>,
        block: Block<'_>,
        block_offset: u64,
    ) -> Result<Option<Event>, PcapError> {
        match block {
            Block::SectionHeader(shb) => {
                dispatch_plugin_options(BlockKind::SectionHeader, &shb.options, shb.big_endian())?;
                // previous section (if any) is frozen from here on
                sections.push(SectionInfo::from_block(&shb, block_offset));
                Ok(None)
            }
            Block::InterfaceDescription(idb) => {
                let section = current_section_mut(sections)?;
                dispatch_plugin_options(
                    BlockKind::InterfaceDescription,
                    &idb.options,
                    section.big_endian,
                )?;
                let iface = InterfaceInfo::from_block(&idb, section.big_endian)?;
                file_encap.record(iface.linktype);
                file_tsprec.record(iface.tsprec);
                section.interfaces.push(iface);
                Ok(None)
            }
            Block::EnhancedPacket(epb) => {
                let section = current_section(sections)?;
                packet_record_from_epb(section, &epb).map(|r| Some(Event::Packet(r)))
            }
            Block::ObsoletePacket(pb) => {
                let section = current_section(sections)?;
                packet_record_from_pb(section, &pb).map(|r| Some(Event::Packet(r)))
            }
            Block::SimplePacket(spb) => {
                let section = current_section(sections)?;
                packet_record_from_spb(section, &spb).map(|r| Some(Event::Packet(r)))
            }
            Block::NameResolution(nrb) => {
                let big_endian = sections.last().map(|s| s.big_endian).unwrap_or(false);
                dispatch_plugin_options(BlockKind::NameResolution, &nrb.options, big_endian)?;
                deliver_names(&nrb, v4_sink, v6_sink);
                Ok(None)
            }
            Block::InterfaceStatistics(isb) => {
                let section = current_section_mut(sections)?;
                dispatch_plugin_options(
                    BlockKind::InterfaceStatistics,
                    &isb.options,
                    section.big_endian,
                )?;
                let stats = isb.stats(section.big_endian)?;
                let n_interfaces = section.interfaces.len();
                let iface = section
                    .interfaces
                    .get_mut(isb.if_id as usize)
                    .ok_or_else(|| {
                        PcapError::bad_file(format!(
                            "interface statistics reference interface {} but the section has {}",
                            isb.if_id, n_interfaces
                        ))
                    })?;
                iface.stats = Some(stats);
                Ok(None)
            }
            Block::DecryptionSecrets(dsb) => {
                let section = current_section_mut(sections)?;
                dispatch_plugin_options(
                    BlockKind::DecryptionSecrets,
                    &dsb.options,
                    section.big_endian,
                )?;
                section
                    .secrets
                    .push((dsb.secrets_type.0, dsb.secrets_data().to_vec()));
                Ok(None)
            }
            Block::HostEvent(heb) => Ok(Some(Event::HostEvent(host_event_record(&heb)))),
            Block::Journal(jb) => Ok(Some(Event::Journal(journal_record(&jb)))),
            Block::Unknown(ub) => {
                let big_endian = sections.last().map(|s| s.big_endian).unwrap_or(false);
                match registry::lookup_block_handler(ub.block_type) {
                    Some(handler) => (handler.read)(big_endian, ub.block_type, ub.data)?,
                    None => trace!(
                        "skipping unknown block type {:#010x} ({} bytes)",
                        ub.block_type,
                        ub.block_len
                    ),
                }
                Ok(None)
            }
        }
    }

    fn ensure(&mut self, needed: Needed) -> Result<(), PcapError> {
        if let Needed::Size(n) = needed {
            let wanted = self.buffer.available_data() + n.get();
            if wanted > self.buffer.capacity() {
                let new_size = wanted.next_power_of_two();
                if new_size > (MAX_BLOCK_SIZE as usize).next_power_of_two() {
                    return Err(PcapError::BufferTooSmall);
                }
                self.buffer.grow(new_size);
            }
        }
        self.refill()
    }

    fn refill(&mut self) -> Result<(), PcapError> {
        self.buffer.shift();
        let space = self.buffer.space();
        if space.is_empty() {
            return Ok(());
        }
        let sz = self.reader.read(space)?;
        self.reader_exhausted = sz == 0;
        self.buffer.fill(sz);
        Ok(())
    }
}

impl<R: Read + Seek> CaptureReader<R> {
    /// Read one record block at an absolute file offset.
    ///
    /// The owning section is selected from the sections read sequentially
    /// so far (the one with the largest `shb_offset` at or before the
    /// target); its byte order and interface table decode the block. The
    /// stream position is restored afterwards, so sequential reading can
    /// continue.
    pub fn seek_read(&mut self, offset: u64) -> Result<Event, PcapError> {
        let section = self
            .sections
            .iter()
            .filter(|s| s.shb_offset <= offset)
            .max_by_key(|s| s.shb_offset)
            .cloned()
            .ok_or_else(|| {
                PcapError::bad_file("offset is before any section header read so far")
            })?;
        let saved = self.reader.stream_position()?;
        let result = self.read_record_at(offset, &section);
        self.reader.seek(SeekFrom::Start(saved))?;
        result
    }

    fn read_record_at(&mut self, offset: u64, section: &SectionInfo) -> Result<Event, PcapError> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut hdr = [0u8; 8];
        read_exact_or_eof(&mut self.reader, &mut hdr)?;
        let block_len = read_u32_e([hdr[4], hdr[5], hdr[6], hdr[7]], section.big_endian);
        if block_len < MIN_BLOCK_SIZE || block_len > MAX_BLOCK_SIZE || block_len % 4 != 0 {
            return Err(PcapError::bad_file(format!(
                "impossible block length {} at offset {}",
                block_len, offset
            )));
        }
        let mut buf = vec![0u8; block_len as usize];
        buf[..8].copy_from_slice(&hdr);
        read_exact_or_eof(&mut self.reader, &mut buf[8..])?;
        let parsed = if section.big_endian {
            parse_block_be(&buf)
        } else {
            parse_block_le(&buf)
        };
        let (_, block) = parsed.map_err(|e| match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
            nom::Err::Incomplete(_) => PcapError::UnexpectedEof,
        })?;
        match &block {
            Block::EnhancedPacket(epb) => packet_record_from_epb(section, epb).map(Event::Packet),
            Block::ObsoletePacket(pb) => packet_record_from_pb(section, pb).map(Event::Packet),
            Block::SimplePacket(spb) => packet_record_from_spb(section, spb).map(Event::Packet),
            Block::HostEvent(heb) => Ok(Event::HostEvent(host_event_record(heb))),
            Block::Journal(jb) => Ok(Event::Journal(journal_record(jb))),
            _ => Err(PcapError::bad_file(format!(
                "block at offset {} is not a record block",
                offset
            ))),
        }
    }
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), PcapError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            PcapError::UnexpectedEof
        } else {
            PcapError::Io(e)
        }
    })
}

// registered handlers see the option codes the core does not parse itself;
// registration of standardized codes is refused, so a plain lookup suffices
fn dispatch_plugin_options(
    kind: BlockKind,
    options: &[BlockOption],
    big_endian: bool,
) -> Result<(), PcapError> {
    for opt in options {
        if let Some(handler) = registry::lookup_option_handler(kind, opt.code.0) {
            (handler.parse)(big_endian, opt.code.0, opt.as_bytes().unwrap_or(&[]))?;
        }
    }
    Ok(())
}

fn current_section(sections: &[SectionInfo]) -> Result<&SectionInfo, PcapError> {
    sections
        .last()
        .ok_or_else(|| PcapError::bad_file("block before any section header"))
}

fn current_section_mut(sections: &mut [SectionInfo]) -> Result<&mut SectionInfo, PcapError> {
    sections
        .last_mut()
        .ok_or_else(|| PcapError::bad_file("block before any section header"))
}

fn check_caplen(caplen: u32, linktype: Linktype) -> Result<(), PcapError> {
    let max = linktype.max_snap_len();
    if caplen > max {
        return Err(PcapError::bad_file(format!(
            "captured length {} exceeds the {} ceiling for {}",
            caplen, max, linktype
        )));
    }
    Ok(())
}

fn lookup_interface<'s>(
    section: &'s SectionInfo,
    if_id: u32,
) -> Result<&'s InterfaceInfo, PcapError> {
    section.interface(if_id).ok_or_else(|| {
        PcapError::bad_file(format!(
            "packet references interface {} but the section has {}",
            if_id,
            section.interfaces.len()
        ))
    })
}

#[derive(Default)]
struct PacketDecorations {
    flags: Option<PacketFlags>,
    drop_count: Option<u64>,
    packet_id: Option<u64>,
    queue: Option<u32>,
    verdicts: Vec<crate::blocks::Verdict>,
    comment: Option<String>,
}

fn bad_option_len(what: &str, len: u16, expected: usize) -> PcapError {
    PcapError::bad_file(format!(
        "packet {} option length {} is not {}",
        what, len, expected
    ))
}

fn decode_packet_options(
    options: &[BlockOption],
    big_endian: bool,
) -> Result<PacketDecorations, PcapError> {
    let mut decor = PacketDecorations::default();
    for opt in options {
        match opt.code {
            OptionCode::EndOfOpt => (),
            OptionCode::Comment => {
                if let Ok(s) = opt.as_str() {
                    decor.comment = Some(s.to_owned());
                }
            }
            OptionCode::EpbFlags => {
                let v = opt
                    .as_u32(big_endian)
                    .map_err(|_| bad_option_len("flags", opt.len, 4))?;
                decor.flags = Some(PacketFlags(v));
            }
            // hash values are carried opaque, nothing to decode
            OptionCode::EpbHash => (),
            OptionCode::EpbDropCount => {
                let v = opt
                    .as_u64(big_endian)
                    .map_err(|_| bad_option_len("drop count", opt.len, 8))?;
                decor.drop_count = Some(v);
            }
            OptionCode::EpbPacketId => {
                let v = opt
                    .as_u64(big_endian)
                    .map_err(|_| bad_option_len("packet id", opt.len, 8))?;
                decor.packet_id = Some(v);
            }
            OptionCode::EpbQueue => {
                let v = opt
                    .as_u32(big_endian)
                    .map_err(|_| bad_option_len("queue", opt.len, 4))?;
                decor.queue = Some(v);
            }
            OptionCode::EpbVerdict => {
                let value = opt
                    .as_bytes()
                    .map_err(|_| bad_option_len("verdict", opt.len, 1))?;
                if let Some(v) = parse_verdict(value, big_endian)? {
                    decor.verdicts.push(v);
                }
            }
            OptionCode(code) => {
                match registry::lookup_option_handler(BlockKind::Packet, code) {
                    Some(handler) => {
                        (handler.parse)(big_endian, code, opt.as_bytes().unwrap_or(&[]))?
                    }
                    None => trace!("ignoring unknown packet option {}", code),
                }
            }
        }
    }
    Ok(decor)
}

fn packet_record_from_epb(
    section: &SectionInfo,
    epb: &EnhancedPacketBlock,
) -> Result<PacketRecord, PcapError> {
    let iface = lookup_interface(section, epb.if_id)?;
    check_caplen(epb.caplen, iface.linktype)?;
    let (ts_secs, ts_nanos) = iface.split_ts(epb.timestamp_ticks());
    let decor = decode_packet_options(&epb.options, section.big_endian)?;
    Ok(PacketRecord {
        interface_id: epb.if_id,
        ts_secs,
        ts_nanos,
        tsprec: iface.tsprec,
        origlen: epb.origlen,
        data: epb.packet_data().to_vec(),
        flags: decor.flags,
        drops: None,
        drop_count: decor.drop_count,
        packet_id: decor.packet_id,
        queue: decor.queue,
        verdicts: decor.verdicts,
        comment: decor.comment,
    })
}

fn packet_record_from_pb(
    section: &SectionInfo,
    pb: &ObsoletePacketBlock,
) -> Result<PacketRecord, PcapError> {
    let iface = lookup_interface(section, u32::from(pb.if_id))?;
    check_caplen(pb.caplen, iface.linktype)?;
    let (ts_secs, ts_nanos) = iface.split_ts(pb.timestamp_ticks());
    let decor = decode_packet_options(&pb.options, section.big_endian)?;
    Ok(PacketRecord {
        interface_id: u32::from(pb.if_id),
        ts_secs,
        ts_nanos,
        tsprec: iface.tsprec,
        origlen: pb.origlen,
        data: pb.packet_data().to_vec(),
        flags: decor.flags,
        drops: pb.drops_count(),
        drop_count: decor.drop_count,
        packet_id: decor.packet_id,
        queue: decor.queue,
        verdicts: decor.verdicts,
        comment: decor.comment,
    })
}

fn packet_record_from_spb(
    section: &SectionInfo,
    spb: &SimplePacketBlock,
) -> Result<PacketRecord, PcapError> {
    let iface = section.interface(0).ok_or_else(|| {
        PcapError::bad_file("simple packet block appeared before any interface description")
    })?;
    let data = spb.packet_data(iface.snaplen);
    check_caplen(data.len() as u32, iface.linktype)?;
    let mut record = PacketRecord::new(0, 0, 0, spb.origlen, data.to_vec());
    record.tsprec = iface.tsprec;
    Ok(record)
}

fn host_event_record(heb: &HostEventBlock) -> HostEventRecord {
    // the block payload keeps the frame padding, the event length bounds
    // the real payload
    let mut data = heb.data;
    if (heb.event_len as usize) < data.len() {
        data = &data[..heb.event_len as usize];
    }
    HostEventRecord {
        cpu_id: heb.cpu_id,
        ts: heb.ts,
        thread_id: heb.thread_id,
        event_len: heb.event_len,
        event_type: heb.event_type,
        nparams: heb.nparams,
        data: data.to_vec(),
    }
}

fn journal_record(jb: &JournalBlock) -> JournalRecord {
    JournalRecord {
        entry: jb.entry_data().to_vec(),
        ts_usecs: jb.realtime_usecs(),
    }
}

fn deliver_names(
    nrb: &NameResolutionBlock,
    v4_sink: &mut Option<Ipv4NameSink>,
    v6_sink: &mut Option<Ipv6NameSink>,
) {
    for record in &nrb.records {
        match record {
            NameRecord::Ipv4 { addr, names } => {
                if let Some(sink) = v4_sink {
                    for name in names {
                        match std::str::from_utf8(name) {
                            Ok(s) => sink(*addr, s),
                            Err(_) => debug!("skipping non-UTF-8 name for {}", addr),
                        }
                    }
                }
            }
            NameRecord::Ipv6 { addr, names } => {
                if let Some(sink) = v6_sink {
                    for name in names {
                        match std::str::from_utf8(name) {
                            Ok(s) => sink(*addr, s),
                            Err(_) => debug!("skipping non-UTF-8 name for {}", addr),
                        }
                    }
                }
            }
            NameRecord::Other { record_type, .. } => {
                trace!("ignoring name record type {:#06x}", record_type)
            }
        }
    }
}
