use hex_literal::hex;
use pcapng_io::blocks::*;
use pcapng_io::{Linktype, PcapError};

// minimal section header, little-endian, section_length unspecified
const SHB_LE: &[u8] = &hex!(
    "
0a 0d 0d 0a 1c 00 00 00 4d 3c 2b 1a 01 00 00 00
ff ff ff ff ff ff ff ff 1c 00 00 00"
);
const SHB_BE: &[u8] = &hex!(
    "
0a 0d 0d 0a 00 00 00 1c 1a 2b 3c 4d 00 01 00 00
ff ff ff ff ff ff ff ff 00 00 00 1c"
);
// section header with an shb_os option ("linux")
const SHB_LE_OS: &[u8] = &hex!(
    "
0a 0d 0d 0a 2c 00 00 00 4d 3c 2b 1a 01 00 00 00
ff ff ff ff ff ff ff ff 03 00 05 00 6c 69 6e 75
78 00 00 00 00 00 00 00 2c 00 00 00"
);
// interface description, ethernet, snaplen 65535, if_tsresol 9
const IDB_LE: &[u8] = &hex!(
    "
01 00 00 00 20 00 00 00 01 00 00 00 ff ff 00 00
09 00 01 00 09 00 00 00 00 00 00 00 20 00 00 00"
);
const IDB_BE: &[u8] = &hex!(
    "
00 00 00 01 00 00 00 20 00 01 00 00 00 00 ff ff
00 09 00 01 09 00 00 00 00 00 00 00 00 00 00 20"
);
// enhanced packet, interface 0, ts 1000000 ticks, 4 bytes
const EPB_LE: &[u8] = &hex!(
    "
06 00 00 00 24 00 00 00 00 00 00 00 00 00 00 00
40 42 0f 00 04 00 00 00 04 00 00 00 de ad be ef
24 00 00 00"
);
const EPB_BE: &[u8] = &hex!(
    "
00 00 00 06 00 00 00 24 00 00 00 00 00 00 00 00
00 0f 42 40 00 00 00 04 00 00 00 04 de ad be ef
00 00 00 24"
);
// enhanced packet with flags, drop count and a TC verdict
const EPB_LE_OPTIONS: &[u8] = &hex!(
    "
06 00 00 00 4c 00 00 00 00 00 00 00 00 00 00 00
40 42 0f 00 04 00 00 00 04 00 00 00 de ad be ef
02 00 04 00 01 00 00 00
04 00 08 00 02 00 00 00 00 00 00 00
07 00 09 00 01 03 00 00 00 00 00 00 00 00 00 00
00 00 00 00
4c 00 00 00"
);
// obsolete packet block, interface 0, 2 drops
const PB_LE: &[u8] = &hex!(
    "
02 00 00 00 24 00 00 00 00 00 02 00 00 00 00 00
40 42 0f 00 04 00 00 00 04 00 00 00 de ad be ef
24 00 00 00"
);
// simple packet, 5 bytes original length
const SPB_LE: &[u8] = &hex!(
    "
03 00 00 00 18 00 00 00 05 00 00 00 aa bb cc dd
ee 00 00 00 18 00 00 00"
);
// name resolution: 192.0.2.1 -> "a.example", end record
const NRB_LE: &[u8] = &hex!(
    "
04 00 00 00 24 00 00 00 01 00 0e 00 c0 00 02 01
61 2e 65 78 61 6d 70 6c 65 00 00 00 00 00 00 00
24 00 00 00"
);
// same, but the name is not NUL terminated
const NRB_LE_NO_NUL: &[u8] = &hex!(
    "
04 00 00 00 24 00 00 00 01 00 0e 00 c0 00 02 01
61 2e 65 78 61 6d 70 6c 65 65 00 00 00 00 00 00
24 00 00 00"
);
// interface statistics: isb_ifrecv 10, isb_ifdrop 2
const ISB_LE: &[u8] = &hex!(
    "
05 00 00 00 34 00 00 00 00 00 00 00 00 00 00 00
00 00 00 00 04 00 08 00 0a 00 00 00 00 00 00 00
05 00 08 00 02 00 00 00 00 00 00 00 00 00 00 00
34 00 00 00"
);
// decryption secrets, TLS key log, 8 payload bytes
const DSB_LE: &[u8] = &hex!(
    "
0a 00 00 00 1c 00 00 00 4b 53 4c 54 08 00 00 00
01 02 03 04 05 06 07 08 1c 00 00 00"
);
// sysdig event v1: cpu 1, ts 1e9 ns, tid 42, event type 16
const SYSDIG_V1_LE: &[u8] = &hex!(
    "
04 02 00 00 28 00 00 00 01 00 00 ca 9a 3b 00 00
00 00 2a 00 00 00 00 00 00 00 04 00 00 00 10 00
de ad be ef 28 00 00 00"
);
// journal entry "__REALTIME_TIMESTAMP=1234567\n"
const JOURNAL_LE: &[u8] = &hex!(
    "
09 00 00 00 2c 00 00 00 5f 5f 52 45 41 4c 54 49
4d 45 5f 54 49 4d 45 53 54 41 4d 50 3d 31 32 33
34 35 36 37 0a 00 00 00 2c 00 00 00"
);
const UNKNOWN_LE: &[u8] = &hex!("12 34 56 78 10 00 00 00 12 34 56 78 10 00 00 00");

fn is_bad_file(e: nom::Err<PcapError>) -> bool {
    matches!(e, nom::Err::Error(PcapError::BadFile(_)))
}

#[test]
fn shb_le() {
    let (rem, shb) = parse_section_header_block(SHB_LE).unwrap();
    assert!(rem.is_empty());
    assert!(!shb.big_endian());
    assert_eq!(shb.major_version, 1);
    assert_eq!(shb.minor_version, 0);
    assert_eq!(shb.section_len, -1);
    assert!(shb.options.is_empty());
}

#[test]
fn shb_be() {
    let (rem, shb) = parse_section_header_block(SHB_BE).unwrap();
    assert!(rem.is_empty());
    assert!(shb.big_endian());
    assert_eq!(shb.major_version, 1);
    assert_eq!(shb.minor_version, 0);
}

#[test]
fn shb_string_option() {
    let (_, shb) = parse_section_header_block(SHB_LE_OS).unwrap();
    assert_eq!(shb.os().as_deref(), Some("linux"));
    assert_eq!(shb.hardware(), None);
}

#[test]
fn shb_bad_bom_is_not_ours() {
    let mut raw = SHB_LE.to_vec();
    raw[8..12].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
    let err = parse_section_header_block(&raw).unwrap_err();
    assert!(matches!(err, nom::Err::Error(PcapError::NotOurFormat)));
}

#[test]
fn shb_unsupported_version() {
    let mut raw = SHB_LE.to_vec();
    raw[14] = 3; // minor version 3
    let err = parse_section_header_block(&raw).unwrap_err();
    assert!(is_bad_file(err));
}

#[test]
fn idb_le() {
    let (rem, idb) = parse_interface_description_block_le(IDB_LE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(idb.linktype, Linktype::ETHERNET);
    assert_eq!(idb.snaplen, 65535);
    assert_eq!(idb.if_tsresol, 9);
    assert_eq!(idb.if_tsoffset, 0);
}

#[test]
fn idb_be() {
    let (rem, idb) = parse_interface_description_block_be(IDB_BE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(idb.linktype, Linktype::ETHERNET);
    assert_eq!(idb.snaplen, 65535);
    assert_eq!(idb.if_tsresol, 9);
}

#[test]
fn epb_le() {
    let (rem, epb) = parse_enhanced_packet_block_le(EPB_LE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(epb.if_id, 0);
    assert_eq!(epb.timestamp_ticks(), 1_000_000);
    assert_eq!(epb.caplen, 4);
    assert_eq!(epb.origlen, 4);
    assert_eq!(epb.packet_data(), &[0xde, 0xad, 0xbe, 0xef]);
    assert!(!epb.truncated());
}

#[test]
fn epb_be() {
    let (rem, epb) = parse_enhanced_packet_block_be(EPB_BE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(epb.timestamp_ticks(), 1_000_000);
    assert_eq!(epb.packet_data(), &[0xde, 0xad, 0xbe, 0xef]);
}

#[test]
fn epb_options() {
    let (_, epb) = parse_enhanced_packet_block_le(EPB_LE_OPTIONS).unwrap();
    // flags, drop count, verdict, end-of-options
    assert_eq!(epb.options.len(), 4);
    let flags = epb
        .options
        .iter()
        .find(|o| o.code == OptionCode::EpbFlags)
        .unwrap();
    assert_eq!(flags.as_u32(false), Ok(1));
    let verdict = epb
        .options
        .iter()
        .find(|o| o.code == OptionCode::EpbVerdict)
        .unwrap();
    let parsed = parse_verdict_bytes(verdict.as_bytes().unwrap());
    assert_eq!(parsed, Some(3));
}

// decode a TC verdict payload for the test above
fn parse_verdict_bytes(value: &[u8]) -> Option<u64> {
    if value.first() == Some(&1) && value.len() == 9 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&value[1..9]);
        Some(u64::from_le_bytes(b))
    } else {
        None
    }
}

#[test]
fn epb_trailer_mismatch() {
    let mut raw = EPB_LE.to_vec();
    let len = raw.len();
    raw[len - 4..].copy_from_slice(&[0x28, 0, 0, 0]);
    let err = parse_enhanced_packet_block_le(&raw).unwrap_err();
    assert!(is_bad_file(err));
}

#[test]
fn epb_caplen_past_block_end() {
    let mut raw = EPB_LE.to_vec();
    // declare more captured bytes than the block holds
    raw[20..24].copy_from_slice(&1000u32.to_le_bytes());
    let err = parse_enhanced_packet_block_le(&raw).unwrap_err();
    assert!(is_bad_file(err));
}

#[test]
fn block_len_not_multiple_of_4() {
    let mut raw = EPB_LE.to_vec();
    raw[4..8].copy_from_slice(&0x25u32.to_le_bytes());
    raw[32..36].copy_from_slice(&0x25u32.to_le_bytes());
    let err = parse_enhanced_packet_block_le(&raw).unwrap_err();
    assert!(is_bad_file(err));
}

#[test]
fn pb_le() {
    let (rem, pb) = parse_obsolete_packet_block_le(PB_LE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(pb.if_id, 0);
    assert_eq!(pb.drops_count(), Some(2));
    assert_eq!(pb.packet_data(), &[0xde, 0xad, 0xbe, 0xef]);
}

#[test]
fn spb_le() {
    let (rem, spb) = parse_simple_packet_block_le(SPB_LE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(spb.origlen, 5);
    // snaplen 0 means unlimited
    assert_eq!(spb.packet_data(0), &[0xaa, 0xbb, 0xcc, 0xdd, 0xee]);
    assert_eq!(spb.packet_data(3), &[0xaa, 0xbb, 0xcc]);
}

#[test]
fn nrb_le() {
    let (rem, nrb) = parse_name_resolution_block_le(NRB_LE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(nrb.records.len(), 1);
    match &nrb.records[0] {
        NameRecord::Ipv4 { addr, names } => {
            assert_eq!(addr.octets(), [192, 0, 2, 1]);
            assert_eq!(names, &[&b"a.example"[..]]);
        }
        r => panic!("unexpected record {:?}", r),
    }
}

#[test]
fn nrb_missing_nul() {
    let err = parse_name_resolution_block_le(NRB_LE_NO_NUL).unwrap_err();
    assert!(is_bad_file(err));
}

#[test]
fn isb_le() {
    let (rem, isb) = parse_interface_statistics_block_le(ISB_LE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(isb.if_id, 0);
    let stats = isb.stats(false).unwrap();
    assert_eq!(stats.received, Some(10));
    assert_eq!(stats.dropped, Some(2));
    assert_eq!(stats.delivered, None);
}

#[test]
fn isb_bad_counter_length() {
    let mut raw = ISB_LE.to_vec();
    // isb_ifrecv declared length 4 instead of 8
    raw[22] = 4;
    let (_, isb) = parse_interface_statistics_block_le(&raw).unwrap();
    assert!(isb.stats(false).is_err());
}

#[test]
fn dsb_le() {
    let (rem, dsb) = parse_decryption_secrets_block_le(DSB_LE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(dsb.secrets_type, SecretsType::TlsKeyLog);
    assert_eq!(dsb.secrets_len, 8);
    assert_eq!(dsb.secrets_data(), &[1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn sysdig_v1_le() {
    let (rem, heb) = parse_host_event_block_le(SYSDIG_V1_LE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(heb.version, HostEventVersion::V1);
    assert_eq!(heb.cpu_id, 1);
    assert_eq!(heb.ts, 1_000_000_000);
    assert_eq!(heb.thread_id, 42);
    assert_eq!(heb.event_len, 4);
    assert_eq!(heb.event_type, 16);
    assert_eq!(heb.nparams, None);
    assert_eq!(heb.data, &[0xde, 0xad, 0xbe, 0xef]);
}

#[test]
fn journal_le() {
    let (rem, jb) = parse_journal_block_le(JOURNAL_LE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(jb.entry_data(), b"__REALTIME_TIMESTAMP=1234567\n");
    assert_eq!(jb.realtime_usecs(), Some(1234567));
}

#[test]
fn unknown_le() {
    let (rem, ub) = parse_unknown_block_le(UNKNOWN_LE).unwrap();
    assert!(rem.is_empty());
    assert_eq!(ub.block_type, 0x78563412);
    assert_eq!(ub.block_len, 16);
}

#[test]
fn minimum_size_block() {
    // 12 bytes: type, total length, trailer, empty body
    let raw = hex!("12 34 56 78 0c 00 00 00 0c 00 00 00");
    let (rem, ub) = parse_unknown_block_le(&raw).unwrap();
    assert!(rem.is_empty());
    assert_eq!(ub.block_len, 12);
    assert!(ub.data.is_empty());
}

#[test]
fn block_dispatch() {
    let (_, block) = parse_block_le(EPB_LE).unwrap();
    assert!(block.is_record_block());
    assert_eq!(block.block_type(), EPB_MAGIC);
    let (_, block) = parse_block_le(IDB_LE).unwrap();
    assert!(!block.is_record_block());
    assert_eq!(block.block_type(), IDB_MAGIC);
}

#[test]
fn incomplete_block_is_incomplete() {
    let err = parse_enhanced_packet_block_le(&EPB_LE[..20]).unwrap_err();
    assert!(matches!(err, nom::Err::Incomplete(_)));
}
