//! Owned record types handed to the caller by the reader and accepted by
//! the writer.

use crate::blocks::{PacketFlags, SecretsType, Verdict};
use crate::linktype::Linktype;
use crate::section::TsPrecision;

/// A captured packet, decoded against its section's interface table.
///
/// Produced per packet block read; transient, owned by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketRecord {
    /// Interface the packet was captured on
    pub interface_id: u32,
    /// Seconds since the epoch (interface time offset applied)
    pub ts_secs: i64,
    /// Nanoseconds within the second
    pub ts_nanos: u32,
    /// Timestamp precision of the capturing interface
    pub tsprec: TsPrecision,
    /// Original packet length on the wire
    pub origlen: u32,
    /// Captured bytes; the captured length is `data.len()`
    pub data: Vec<u8>,
    pub flags: Option<PacketFlags>,
    /// Packets dropped since the previous one, from the obsolete Packet
    /// Block's counter field
    pub drops: Option<u16>,
    /// Accumulated drop count from the `epb_dropcount` option
    pub drop_count: Option<u64>,
    /// Globally unique packet identifier
    pub packet_id: Option<u64>,
    /// Interface queue the packet was received on
    pub queue: Option<u32>,
    pub verdicts: Vec<Verdict>,
    pub comment: Option<String>,
}

impl PacketRecord {
    /// A record with the given interface, timestamp and payload, and no
    /// decorations
    pub fn new(interface_id: u32, ts_secs: i64, ts_nanos: u32, origlen: u32, data: Vec<u8>) -> Self {
        PacketRecord {
            interface_id,
            ts_secs,
            ts_nanos,
            tsprec: TsPrecision::Microsecond,
            origlen,
            data,
            flags: None,
            drops: None,
            drop_count: None,
            packet_id: None,
            queue: None,
            verdicts: Vec::new(),
            comment: None,
        }
    }

    /// The captured length
    #[inline]
    pub fn caplen(&self) -> u32 {
        self.data.len() as u32
    }
}

/// A host event (system-call trace) record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostEventRecord {
    pub cpu_id: u16,
    /// Nanoseconds since the epoch
    pub ts: u64,
    pub thread_id: u64,
    pub event_len: u32,
    pub event_type: u16,
    /// Present for v2 events only
    pub nparams: Option<u32>,
    /// Opaque event payload
    pub data: Vec<u8>,
}

/// A journal entry record in journal export format
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JournalRecord {
    pub entry: Vec<u8>,
    /// The entry's `__REALTIME_TIMESTAMP`, in microseconds since the epoch
    pub ts_usecs: Option<u64>,
}

/// A record to be written, selecting the block kind to emit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Packet(PacketRecord),
    HostEvent(HostEventRecord),
    Journal(JournalRecord),
}

/// Section-level description used when opening a writer
#[derive(Clone, Debug, Default)]
pub struct SectionRecord {
    pub hardware: Option<String>,
    pub os: Option<String>,
    pub user_application: Option<String>,
    pub comment: Option<String>,
}

/// Interface description used when opening a writer or adding an interface
#[derive(Clone, Debug)]
pub struct InterfaceRecord {
    pub linktype: Linktype,
    /// Maximum captured bytes per packet; 0 means no limit
    pub snaplen: u32,
    /// Raw `if_tsresol` byte; defaults to 6 (microseconds)
    pub tsresol: u8,
    /// Seconds subtracted from every timestamp before encoding
    pub tsoffset: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub os: Option<String>,
    pub hardware: Option<String>,
    pub comment: Option<String>,
    /// Interface speed in bits per second
    pub speed: Option<u64>,
    pub fcslen: Option<u8>,
    pub filter: Option<crate::blocks::InterfaceFilter>,
}

impl Default for InterfaceRecord {
    fn default() -> Self {
        InterfaceRecord {
            linktype: Linktype::ETHERNET,
            snaplen: 0,
            tsresol: 6,
            tsoffset: 0,
            name: None,
            description: None,
            os: None,
            hardware: None,
            comment: None,
            speed: None,
            fcslen: None,
            filter: None,
        }
    }
}

/// Decryption secrets supplied to the writer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretsRecord {
    pub secrets_type: SecretsType,
    pub data: Vec<u8>,
}
