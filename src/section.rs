//! Per-section reader state: byte order, interface table, time scaling.

use tracing::{debug, warn};

use crate::blocks::{
    parse_if_filter, InterfaceDescriptionBlock, InterfaceFilter, OptionCode, SectionHeaderBlock,
};
use crate::error::PcapError;
use crate::linktype::Linktype;

/// Coarse timestamp precision category, derived from an interface's time
/// units per second
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TsPrecision {
    Second,
    Decisecond,
    Centisecond,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TsPrecision {
    pub fn from_units(units_per_second: u64) -> Self {
        if units_per_second >= 1_000_000_000 {
            TsPrecision::Nanosecond
        } else if units_per_second >= 1_000_000 {
            TsPrecision::Microsecond
        } else if units_per_second >= 1_000 {
            TsPrecision::Millisecond
        } else if units_per_second >= 100 {
            TsPrecision::Centisecond
        } else if units_per_second >= 10 {
            TsPrecision::Decisecond
        } else {
            TsPrecision::Second
        }
    }
}

/// Decode an `if_tsresol` byte into time units per second.
///
/// Bit 7 selects the base (0: powers of 10, 1: powers of 2), the low seven
/// bits the exponent. Exponents whose value does not fit a `u64`
/// (base-10 >= 20, base-2 >= 64) saturate to `u64::MAX`; the second return
/// value flags that the conversion is inaccurate.
pub fn ts_units_from_tsresol(tsresol: u8) -> (u64, bool) {
    let exponent = tsresol & 0x7f;
    let units = if tsresol & 0x80 != 0 {
        if exponent < 64 {
            1u64 << exponent
        } else {
            warn!("if_tsresol 2^{} out of range, time conversion will be inaccurate", exponent);
            return (u64::MAX, true);
        }
    } else if exponent < 20 {
        10u64.pow(u32::from(exponent))
    } else {
        warn!("if_tsresol 10^{} out of range, time conversion will be inaccurate", exponent);
        return (u64::MAX, true);
    };
    (units, false)
}

/// Split a 64-bit tick count into seconds and nanoseconds.
///
/// `tsoffset` (seconds) is added to the seconds part, per the `if_tsoffset`
/// semantics.
pub fn split_timestamp(ticks: u64, units_per_second: u64, tsoffset: i64) -> (i64, u32) {
    let units = units_per_second.max(1);
    let secs = (ticks / units) as i64 + tsoffset;
    let frac = ticks % units;
    let nanos = ((u128::from(frac) * 1_000_000_000) / u128::from(units)) as u32;
    (secs, nanos)
}

/// Rebuild a tick count from seconds and nanoseconds.
pub fn join_timestamp(
    secs: i64,
    nanos: u32,
    units_per_second: u64,
    tsoffset: i64,
) -> Result<u64, PcapError> {
    let units = units_per_second.max(1);
    let rel = secs
        .checked_sub(tsoffset)
        .filter(|&s| s >= 0)
        .ok_or_else(|| PcapError::bad_file("timestamp before the interface time offset"))?;
    let whole = (rel as u64)
        .checked_mul(units)
        .ok_or_else(|| PcapError::bad_file("timestamp not representable in interface units"))?;
    let frac = ((u128::from(nanos) * u128::from(units)) / 1_000_000_000) as u64;
    whole
        .checked_add(frac)
        .ok_or_else(|| PcapError::bad_file("timestamp not representable in interface units"))
}

/// Capture counters from an Interface Statistics Block.
///
/// Timestamps are raw ticks in the interface's time units.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceStats {
    pub ts: u64,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub received: Option<u64>,
    pub dropped: Option<u64>,
    pub filter_accepted: Option<u64>,
    pub os_dropped: Option<u64>,
    pub delivered: Option<u64>,
}

/// One entry of a section's interface table
#[derive(Clone, Debug)]
pub struct InterfaceInfo {
    pub linktype: Linktype,
    /// Maximum captured bytes per packet; 0 means no limit
    pub snaplen: u32,
    /// Timestamp tick rate; fixed at interface creation, never revised
    pub units_per_second: u64,
    pub tsprec: TsPrecision,
    /// Seconds added to every timestamp of this interface
    pub tsoffset: i64,
    /// Declared FCS length in bytes, if any
    pub fcslen: Option<u8>,
    /// Set when the declared resolution saturated the tick rate
    pub inaccurate_ts: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Interface speed in bits per second
    pub speed: Option<u64>,
    pub filter: Option<InterfaceFilter>,
    /// Statistics attached by a later ISB
    pub stats: Option<InterfaceStats>,
}

impl InterfaceInfo {
    pub(crate) fn from_block(
        idb: &InterfaceDescriptionBlock,
        big_endian: bool,
    ) -> Result<InterfaceInfo, PcapError> {
        let (units_per_second, inaccurate_ts) = ts_units_from_tsresol(idb.if_tsresol);
        if u64::from(idb.snaplen) > u64::from(idb.linktype.max_snap_len()) {
            debug!(
                "interface snaplen {} larger than the {} ceiling for {}",
                idb.snaplen,
                idb.linktype.max_snap_len(),
                idb.linktype
            );
        }
        let mut filter = None;
        let mut speed = None;
        for opt in &idb.options {
            match opt.code {
                OptionCode::IfFilter => {
                    filter = parse_if_filter(opt.as_bytes().unwrap_or(&[]), big_endian)?;
                }
                OptionCode::IfSpeed => speed = opt.as_u64(big_endian).ok(),
                _ => (),
            }
        }
        Ok(InterfaceInfo {
            linktype: idb.linktype,
            snaplen: idb.snaplen,
            units_per_second,
            tsprec: TsPrecision::from_units(units_per_second),
            tsoffset: idb.if_tsoffset,
            fcslen: idb.fcslen(),
            inaccurate_ts,
            name: idb.name(),
            description: idb.description(),
            speed,
            filter,
            stats: None,
        })
    }

    /// Split a tick count of this interface into seconds and nanoseconds
    #[inline]
    pub fn split_ts(&self, ticks: u64) -> (i64, u32) {
        split_timestamp(ticks, self.units_per_second, self.tsoffset)
    }
}

/// The reader state of one section: byte order, version, and the interface
/// table that packet blocks index into.
///
/// Created when a Section Header Block is read; frozen when the next
/// section starts (or the file ends). `shb_offset` keys the section index
/// used for random reads.
#[derive(Clone, Debug)]
pub struct SectionInfo {
    pub big_endian: bool,
    pub version_major: u16,
    pub version_minor: u16,
    /// Absolute file offset of the section header block
    pub shb_offset: u64,
    /// Declared section length, or -1
    pub section_len: i64,
    pub hardware: Option<String>,
    pub os: Option<String>,
    pub user_application: Option<String>,
    pub comment: Option<String>,
    /// Interfaces in declaration order; the index is the interface id
    pub interfaces: Vec<InterfaceInfo>,
    /// Decryption secrets seen in this section (type, payload)
    pub secrets: Vec<(u32, Vec<u8>)>,
}

impl SectionInfo {
    pub(crate) fn from_block(shb: &SectionHeaderBlock, shb_offset: u64) -> SectionInfo {
        SectionInfo {
            big_endian: shb.big_endian(),
            version_major: shb.major_version,
            version_minor: shb.minor_version,
            shb_offset,
            section_len: shb.section_len,
            hardware: shb.hardware(),
            os: shb.os(),
            user_application: shb.user_application(),
            comment: shb.comment(),
            interfaces: Vec::new(),
            secrets: Vec::new(),
        }
    }

    /// Look up an interface by identifier
    pub fn interface(&self, if_id: u32) -> Option<&InterfaceInfo> {
        self.interfaces.get(if_id as usize)
    }
}

/// A per-file summary of a value that is uniform until proven otherwise.
///
/// The first interface fixes the file-wide value; any later interface that
/// disagrees demotes it to `PerRecord`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Summary<T> {
    Unset,
    Uniform(T),
    PerRecord,
}

impl<T: PartialEq> Summary<T> {
    pub(crate) fn record(&mut self, value: T) {
        match self {
            Summary::Unset => *self = Summary::Uniform(value),
            Summary::Uniform(v) if *v == value => (),
            Summary::Uniform(_) => *self = Summary::PerRecord,
            Summary::PerRecord => (),
        }
    }
}
