use std::io::Cursor;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex};

use hex_literal::hex;
use pcapng_io::blocks::{PacketFlags, Verdict, MAX_BLOCK_SIZE};
use pcapng_io::{
    probe, CaptureReader, CaptureWriter, Event, HostEventRecord, InterfaceRecord, JournalRecord,
    Linktype, PacketRecord, PcapError, ProbeResult, Record, SectionRecord, TsPrecision,
};

const SHB_LE: &[u8] = &hex!(
    "
0a 0d 0d 0a 1c 00 00 00 4d 3c 2b 1a 01 00 00 00
ff ff ff ff ff ff ff ff 1c 00 00 00"
);
const IDB_LE: &[u8] = &hex!(
    "
01 00 00 00 14 00 00 00 01 00 00 00 ff ff 00 00
14 00 00 00"
);
const EPB_LE: &[u8] = &hex!(
    "
06 00 00 00 24 00 00 00 00 00 00 00 00 00 00 00
40 42 0f 00 04 00 00 00 04 00 00 00 de ad be ef
24 00 00 00"
);
const SHB_BE: &[u8] = &hex!(
    "
0a 0d 0d 0a 00 00 00 1c 1a 2b 3c 4d 00 01 00 00
ff ff ff ff ff ff ff ff 00 00 00 1c"
);
const IDB_BE: &[u8] = &hex!(
    "
00 00 00 01 00 00 00 14 00 01 00 00 00 00 ff ff
00 00 00 14"
);
const EPB_BE: &[u8] = &hex!(
    "
00 00 00 06 00 00 00 24 00 00 00 00 00 00 00 00
00 0f 42 40 00 00 00 04 00 00 00 04 de ad be ef
00 00 00 24"
);

fn file_of(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

fn read_all(bytes: &[u8]) -> Result<Vec<Event>, PcapError> {
    let mut reader = CaptureReader::open(Cursor::new(bytes.to_vec()))?;
    let mut events = Vec::new();
    loop {
        match reader.read_next()? {
            Event::EndOfFile => return Ok(events),
            ev => events.push(ev),
        }
    }
}

// scenario: probing 8 unrelated bytes must not claim the stream
#[test]
fn probe_negative() {
    let mut input = Cursor::new(hex!("de ad be ef 00 00 00 10").to_vec());
    assert!(matches!(probe(&mut input), ProbeResult::NotPcapng));
}

#[test]
fn probe_positive_both_orders() {
    let mut input = Cursor::new(SHB_LE.to_vec());
    assert!(matches!(probe(&mut input), ProbeResult::Pcapng));
    let mut input = Cursor::new(SHB_BE.to_vec());
    assert!(matches!(probe(&mut input), ProbeResult::Pcapng));
}

// scenario: a file holding a single SHB reads as an immediate end of file
#[test]
fn minimal_file() {
    let events = read_all(SHB_LE).unwrap();
    assert!(events.is_empty());
}

// scenario: one interface, one enhanced packet
#[test]
fn one_interface_one_packet() {
    let file = file_of(&[SHB_LE, IDB_LE, EPB_LE]);
    let events = read_all(&file).unwrap();
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Packet(pkt) => {
            assert_eq!(pkt.interface_id, 0);
            assert_eq!(pkt.ts_secs, 1);
            assert_eq!(pkt.ts_nanos, 0);
            assert_eq!(pkt.tsprec, TsPrecision::Microsecond);
            assert_eq!(pkt.origlen, 4);
            assert_eq!(pkt.data, vec![0xde, 0xad, 0xbe, 0xef]);
        }
        ev => panic!("unexpected event {:?}", ev),
    }
}

// scenario: the same capture written big-endian decodes identically
#[test]
fn byte_swapped_section_is_equivalent() {
    let le = read_all(&file_of(&[SHB_LE, IDB_LE, EPB_LE])).unwrap();
    let be = read_all(&file_of(&[SHB_BE, IDB_BE, EPB_BE])).unwrap();
    assert_eq!(le, be);
}

// scenario: a packet referencing an undeclared interface is malformed
#[test]
fn interface_id_out_of_range() {
    let mut epb = EPB_LE.to_vec();
    epb[8..12].copy_from_slice(&7u32.to_le_bytes());
    let file = file_of(&[SHB_LE, IDB_LE, &epb[..]]);
    let mut reader = CaptureReader::open(Cursor::new(file)).unwrap();
    let err = reader.read_next().unwrap_err();
    assert!(matches!(err, PcapError::BadFile(_)));
}

// scenario: name resolution entries round-trip through write and read
#[test]
fn name_resolution_round_trip() {
    let mut writer = CaptureWriter::create(
        Vec::new(),
        &SectionRecord::default(),
        &[InterfaceRecord::default()],
        None,
    )
    .unwrap();
    writer.add_ipv4_name(Ipv4Addr::new(192, 0, 2, 1), "a.example");
    writer.add_ipv6_name("2001:db8::1".parse().unwrap(), "b.example");
    let bytes = writer.finish().unwrap();

    let v4_seen = Arc::new(Mutex::new(Vec::new()));
    let v6_seen = Arc::new(Mutex::new(Vec::new()));
    let v4 = Arc::clone(&v4_seen);
    let v6 = Arc::clone(&v6_seen);
    let mut reader = CaptureReader::<Cursor<Vec<u8>>>::builder()
        .ipv4_name_sink(move |addr: Ipv4Addr, name: &str| {
            v4.lock().unwrap().push((addr, name.to_owned()));
        })
        .ipv6_name_sink(move |addr: Ipv6Addr, name: &str| {
            v6.lock().unwrap().push((addr, name.to_owned()));
        })
        .open(Cursor::new(bytes))
        .unwrap();
    assert_eq!(reader.read_next().unwrap(), Event::EndOfFile);
    assert_eq!(
        v4_seen.lock().unwrap().as_slice(),
        &[(Ipv4Addr::new(192, 0, 2, 1), "a.example".to_owned())]
    );
    assert_eq!(
        v6_seen.lock().unwrap().as_slice(),
        &[("2001:db8::1".parse::<Ipv6Addr>().unwrap(), "b.example".to_owned())]
    );
}

// read ∘ write is the identity on the structured record set
#[test]
fn read_write_identity() {
    let iface = InterfaceRecord {
        linktype: Linktype::ETHERNET,
        snaplen: 65535,
        tsresol: 9,
        ..InterfaceRecord::default()
    };
    let mut packet = PacketRecord::new(0, 1_600_000_000, 123_456_789, 6, vec![1, 2, 3, 4, 5, 6]);
    packet.tsprec = TsPrecision::Nanosecond;
    packet.flags = Some(PacketFlags(0x0000_0001));
    packet.drop_count = Some(7);
    packet.packet_id = Some(0xdead_beef_cafe_f00d);
    packet.queue = Some(3);
    packet.verdicts = vec![Verdict::LinuxTc(2), Verdict::Hardware(vec![9, 9])];
    packet.comment = Some("first packet".to_owned());
    let host_event = HostEventRecord {
        cpu_id: 2,
        ts: 1_000_000_001,
        thread_id: 77,
        event_len: 4,
        event_type: 12,
        nparams: Some(3),
        data: vec![1, 2, 3, 4],
    };
    let journal = JournalRecord {
        entry: b"__REALTIME_TIMESTAMP=1234567\nMESSAGE=hello\n".to_vec(),
        ts_usecs: Some(1234567),
    };
    let records = vec![
        Record::Packet(packet),
        Record::HostEvent(host_event),
        Record::Journal(journal),
    ];

    let mut writer =
        CaptureWriter::create(Vec::new(), &SectionRecord::default(), &[iface], None).unwrap();
    for record in &records {
        writer.write_record(record).unwrap();
    }
    let bytes = writer.finish().unwrap();

    let events = read_all(&bytes).unwrap();
    let read_back: Vec<Record> = events
        .into_iter()
        .map(|ev| match ev {
            Event::Packet(p) => Record::Packet(p),
            Event::HostEvent(h) => Record::HostEvent(h),
            Event::Journal(j) => Record::Journal(j),
            Event::EndOfFile => unreachable!(),
        })
        .collect();
    assert_eq!(read_back, records);
}

// write ∘ read preserves the structured content of a conformant file
#[test]
fn write_read_preserves_content() {
    let file = file_of(&[SHB_LE, IDB_LE, EPB_LE]);
    let first = read_all(&file).unwrap();

    let iface = InterfaceRecord {
        linktype: Linktype::ETHERNET,
        snaplen: 65535,
        ..InterfaceRecord::default()
    };
    let mut writer =
        CaptureWriter::create(Vec::new(), &SectionRecord::default(), &[iface], None).unwrap();
    for ev in &first {
        match ev {
            Event::Packet(p) => writer.write_packet(p).unwrap(),
            _ => unreachable!(),
        }
    }
    let bytes = writer.finish().unwrap();
    let second = read_all(&bytes).unwrap();
    assert_eq!(first, second);
}

// obsolete packet records keep their drop counter through a round trip
#[test]
fn obsolete_packet_round_trip() {
    let iface = InterfaceRecord {
        snaplen: 65535,
        ..InterfaceRecord::default()
    };
    let mut packet = PacketRecord::new(0, 10, 0, 4, vec![1, 2, 3, 4]);
    packet.drops = Some(2);
    let mut writer =
        CaptureWriter::create(Vec::new(), &SectionRecord::default(), &[iface], None).unwrap();
    writer.write_packet(&packet).unwrap();
    let bytes = writer.finish().unwrap();
    let events = read_all(&bytes).unwrap();
    match &events[0] {
        Event::Packet(p) => {
            assert_eq!(p.drops, Some(2));
            assert_eq!(p.data, packet.data);
        }
        ev => panic!("unexpected event {:?}", ev),
    }
}

// a 65535-byte option reads back intact
#[test]
fn maximum_option_length_round_trips() {
    let description = "x".repeat(65535);
    let iface = InterfaceRecord {
        description: Some(description.clone()),
        ..InterfaceRecord::default()
    };
    let mut writer =
        CaptureWriter::create(Vec::new(), &SectionRecord::default(), &[iface], None).unwrap();
    writer
        .write_packet(&PacketRecord::new(0, 0, 0, 1, vec![0xff]))
        .unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = CaptureReader::open(Cursor::new(bytes)).unwrap();
    assert!(matches!(reader.read_next().unwrap(), Event::Packet(_)));
    let section = reader.current_section().unwrap();
    assert_eq!(
        section.interfaces[0].description.as_deref(),
        Some(description.as_str())
    );
}

// a block declared above the ceiling is malformed
#[test]
fn oversized_block_is_rejected() {
    let mut file = SHB_LE.to_vec();
    file.extend_from_slice(&6u32.to_le_bytes());
    file.extend_from_slice(&(MAX_BLOCK_SIZE + 4).to_le_bytes());
    file.extend_from_slice(&[0u8; 4]);
    let mut reader = CaptureReader::open(Cursor::new(file)).unwrap();
    let err = reader.read_next().unwrap_err();
    assert!(matches!(err, PcapError::BadFile(_)));
}

// a simple packet against an unlimited snap length keeps its full data
#[test]
fn simple_packet_with_unlimited_snaplen() {
    // IDB with snaplen 0, then an SPB of 5 bytes
    let idb = hex!(
        "
01 00 00 00 14 00 00 00 01 00 00 00 00 00 00 00
14 00 00 00"
    );
    let spb = hex!(
        "
03 00 00 00 18 00 00 00 05 00 00 00 aa bb cc dd
ee 00 00 00 18 00 00 00"
    );
    let file = file_of(&[SHB_LE, &idb[..], &spb[..]]);
    let events = read_all(&file).unwrap();
    match &events[0] {
        Event::Packet(p) => {
            assert_eq!(p.interface_id, 0);
            assert_eq!(p.origlen, 5);
            assert_eq!(p.data, vec![0xaa, 0xbb, 0xcc, 0xdd, 0xee]);
            assert_eq!((p.ts_secs, p.ts_nanos), (0, 0));
        }
        ev => panic!("unexpected event {:?}", ev),
    }
}

// writer refuses records no reader would accept
#[test]
fn writer_validations() {
    let iface = InterfaceRecord {
        snaplen: 65535,
        ..InterfaceRecord::default()
    };
    let mut writer =
        CaptureWriter::create(Vec::new(), &SectionRecord::default(), &[iface], None).unwrap();

    // unknown interface
    let packet = PacketRecord::new(3, 0, 0, 1, vec![0]);
    assert!(matches!(
        writer.write_packet(&packet),
        Err(PcapError::BadFile(_))
    ));

    // captured length above the link type ceiling
    let oversized = PacketRecord::new(
        0,
        0,
        0,
        u32::MAX,
        vec![0; (Linktype::ETHERNET.max_snap_len() + 1) as usize],
    );
    assert!(matches!(
        writer.write_packet(&oversized),
        Err(PcapError::PacketTooLarge { .. })
    ));

    // captured length above the packet length
    let inconsistent = PacketRecord::new(0, 0, 0, 1, vec![0, 1, 2, 3]);
    assert!(matches!(
        writer.write_packet(&inconsistent),
        Err(PcapError::BadFile(_))
    ));

    // link type with no 16-bit wire mapping
    assert!(matches!(
        writer.add_interface(&InterfaceRecord {
            linktype: Linktype(0x1_0000),
            ..InterfaceRecord::default()
        }),
        Err(PcapError::UnsupportedEncap(_))
    ));
}
