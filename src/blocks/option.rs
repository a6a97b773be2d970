use std::borrow::Cow;

use nom::bytes::streaming::take;
use nom::{Err, IResult};
use rusticata_macros::{align32, newtype_enum};
use thiserror::Error;
use tracing::debug;

use crate::endianness::{read_u16_e, read_u32_e, read_u64_e, PcapEndianness};
use crate::error::PcapError;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct OptionCode(pub u16);

newtype_enum! {
impl debug OptionCode {
    EndOfOpt = 0,
    Comment = 1,
    ShbHardware = 2,
    IfName = 2,
    NsDnsName = 2,
    EpbFlags = 2,
    IsbStartTime = 2,
    ShbOs = 3,
    IfDescription = 3,
    NsDnsIp4Addr = 3,
    EpbHash = 3,
    IsbEndTime = 3,
    ShbUserAppl = 4,
    IfIpv4Addr = 4,
    NsDnsIp6Addr = 4,
    EpbDropCount = 4,
    IsbIfRecv = 4,
    IfIpv6Addr = 5,
    EpbPacketId = 5,
    IsbIfDrop = 5,
    IfMacAddr = 6,
    EpbQueue = 6,
    IsbFilterAccept = 6,
    IfEuiAddr = 7,
    EpbVerdict = 7,
    IsbOsDrop = 7,
    IfSpeed = 8,
    IsbUsrDeliv = 8,
    IfTsresol = 9,
    IfTzone = 10,
    IfFilter = 11,
    IfOs = 12,
    IfFcslen = 13,
    IfTsoffset = 14,
    IfHardware = 15,
}
}

/// The error type which is returned when interpreting a [BlockOption] value
#[derive(Debug, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("invalid option length")]
    InvalidLength,
    #[error("invalid UTF-8 string")]
    Utf8Error,
}

/// A `(code, length, value)` triple attached after a block's fixed body
///
/// The stored `value` keeps the wire padding; `len` is the declared,
/// unpadded length. Writer-built options store the exact value with
/// `len == value.len()`.
#[derive(Clone, Debug)]
pub struct BlockOption<'a> {
    pub code: OptionCode,
    pub len: u16,
    pub value: Cow<'a, [u8]>,
}

impl<'a> BlockOption<'a> {
    /// Build an owned option from exact value bytes
    pub fn new<V: Into<Cow<'a, [u8]>>>(code: OptionCode, value: V) -> Self {
        let value = value.into();
        let len = value.len().min(usize::from(u16::MAX)) as u16;
        BlockOption { code, len, value }
    }

    /// Raw value bytes, including any wire padding
    #[inline]
    pub fn raw_value(&self) -> &[u8] {
        self.value.as_ref()
    }

    /// The value limited to the declared length
    pub fn as_bytes(&self) -> Result<&[u8], OptionError> {
        let len = usize::from(self.len);
        if len <= self.value.len() {
            Ok(&self.value[..len])
        } else {
            Err(OptionError::InvalidLength)
        }
    }

    /// The value interpreted as an UTF-8 string
    pub fn as_str(&self) -> Result<&str, OptionError> {
        self.as_bytes()
            .and_then(|b| std::str::from_utf8(b).or(Err(OptionError::Utf8Error)))
    }

    /// The value interpreted as a single byte; the length must be exactly 1
    pub fn as_u8(&self) -> Result<u8, OptionError> {
        match (self.len, self.value.first()) {
            (1, Some(&b)) => Ok(b),
            _ => Err(OptionError::InvalidLength),
        }
    }

    /// The value interpreted as a `u32` in the section byte order;
    /// the length must be exactly 4
    pub fn as_u32(&self, big_endian: bool) -> Result<u32, OptionError> {
        if self.len != 4 {
            return Err(OptionError::InvalidLength);
        }
        <[u8; 4]>::try_from(self.as_bytes()?)
            .map(|b| read_u32_e(b, big_endian))
            .or(Err(OptionError::InvalidLength))
    }

    /// The value interpreted as a `u64` in the section byte order;
    /// the length must be exactly 8
    pub fn as_u64(&self, big_endian: bool) -> Result<u64, OptionError> {
        if self.len != 8 {
            return Err(OptionError::InvalidLength);
        }
        <[u8; 8]>::try_from(self.as_bytes()?)
            .map(|b| read_u64_e(b, big_endian))
            .or(Err(OptionError::InvalidLength))
    }

    /// The value interpreted as an `i64` in the section byte order;
    /// the length must be exactly 8
    pub fn as_i64(&self, big_endian: bool) -> Result<i64, OptionError> {
        self.as_u64(big_endian).map(|v| v as i64)
    }
}

pub(crate) fn parse_option<'i, En: PcapEndianness>(
    i: &'i [u8],
) -> IResult<&'i [u8], BlockOption<'i>, PcapError> {
    let (i, code) = En::parse_u16(i)?;
    let (i, len) = En::parse_u16(i)?;
    let (i, value) = take(align32!(u32::from(len)))(i)?;
    let option = BlockOption {
        code: OptionCode(code),
        len,
        value: Cow::Borrowed(value),
    };
    Ok((i, option))
}

/// Parse the option list occupying `block_len - opt_offset` bytes of `i`.
///
/// Every option must start 4-aligned; a list that cannot be carved into
/// well-formed options is a structural error.
pub(crate) fn opt_parse_options<'i, En: PcapEndianness>(
    i: &'i [u8],
    block_len: usize,
    opt_offset: usize,
) -> IResult<&'i [u8], Vec<BlockOption<'i>>, PcapError> {
    if block_len <= opt_offset {
        return Ok((i, Vec::new()));
    }
    let opt_len = block_len - opt_offset;
    if i.len() < opt_len {
        return Err(Err::Error(PcapError::bad_file(
            "options run past the end of the block",
        )));
    }
    let (mut b, rem) = i.split_at(opt_len);
    let mut options = Vec::new();
    while !b.is_empty() {
        match parse_option::<En>(b) {
            Ok((r, option)) => {
                b = r;
                options.push(option);
            }
            Err(_) => {
                return Err(Err::Error(PcapError::bad_file(
                    "misaligned or truncated option",
                )))
            }
        }
    }
    Ok((rem, options))
}

/// Return the first option with `code` as an owned string, skipping values
/// that are not valid UTF-8
pub(crate) fn options_get_string(options: &[BlockOption], code: OptionCode) -> Option<String> {
    options.iter().find_map(|o| {
        if o.code != code {
            return None;
        }
        match o.as_str() {
            Ok(s) => Some(s.to_owned()),
            Err(e) => {
                debug!("ignoring option {:?}: {}", code, e);
                None
            }
        }
    })
}

/// The per-packet flags word
///
/// Bits 0-1 hold the direction, 2-4 the reception type, 5-8 the FCS length
/// in octets, and 16-31 link-layer dependent error flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketFlags(pub u32);

impl PacketFlags {
    pub fn direction(self) -> u32 {
        self.0 & 0b11
    }

    pub fn reception_type(self) -> u32 {
        (self.0 >> 2) & 0b111
    }

    /// FCS length in octets, if declared
    pub fn fcs_len(self) -> Option<u8> {
        match ((self.0 >> 5) & 0x0f) as u8 {
            0 => None,
            n => Some(n),
        }
    }

    /// Link-layer dependent error mask
    pub fn errors(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

/// A per-packet verdict annotation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Hardware verdict, opaque bytes
    Hardware(Vec<u8>),
    /// Linux TC verdict (64-bit)
    LinuxTc(u64),
    /// Linux XDP verdict (64-bit)
    LinuxXdp(u64),
}

pub(crate) const VERDICT_TYPE_HW: u8 = 0;
pub(crate) const VERDICT_TYPE_TC: u8 = 1;
pub(crate) const VERDICT_TYPE_XDP: u8 = 2;

/// Decode one `epb_verdict` option value.
///
/// Returns `None` for verdict types this implementation does not know;
/// those are skipped, not errors.
pub(crate) fn parse_verdict(value: &[u8], big_endian: bool) -> Result<Option<Verdict>, PcapError> {
    let ty = *value
        .first()
        .ok_or_else(|| PcapError::bad_file("packet verdict option is empty"))?;
    match ty {
        VERDICT_TYPE_HW => Ok(Some(Verdict::Hardware(value[1..].to_vec()))),
        VERDICT_TYPE_TC | VERDICT_TYPE_XDP => {
            if value.len() != 9 {
                return Err(PcapError::bad_file(format!(
                    "packet verdict option length {} is not 9",
                    value.len()
                )));
            }
            let mut b = [0u8; 8];
            b.copy_from_slice(&value[1..9]);
            let raw = read_u64_e(b, big_endian);
            if ty == VERDICT_TYPE_TC {
                Ok(Some(Verdict::LinuxTc(raw)))
            } else {
                Ok(Some(Verdict::LinuxXdp(raw)))
            }
        }
        _ => {
            debug!("skipping unknown verdict type {}", ty);
            Ok(None)
        }
    }
}

/// A capture filter attached to an interface description
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterfaceFilter {
    /// A libpcap filter expression
    Libpcap(String),
    /// A compiled BPF program
    Bpf(Vec<BpfInsn>),
}

/// One 8-byte BPF instruction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BpfInsn {
    pub code: u16,
    pub jt: u8,
    pub jf: u8,
    pub k: u32,
}

pub(crate) const FILTER_KIND_LIBPCAP: u8 = 0;
pub(crate) const FILTER_KIND_BPF: u8 = 1;

/// Decode one `if_filter` option value.
///
/// Returns `None` for filter kinds this implementation does not know.
pub(crate) fn parse_if_filter(
    value: &[u8],
    big_endian: bool,
) -> Result<Option<InterfaceFilter>, PcapError> {
    let kind = *value
        .first()
        .ok_or_else(|| PcapError::bad_file("interface filter option is empty"))?;
    match kind {
        FILTER_KIND_LIBPCAP => match std::str::from_utf8(&value[1..]) {
            Ok(s) => Ok(Some(InterfaceFilter::Libpcap(s.to_owned()))),
            Err(_) => {
                debug!("ignoring non-UTF-8 libpcap filter string");
                Ok(None)
            }
        },
        FILTER_KIND_BPF => {
            let prog = &value[1..];
            if prog.len() % 8 != 0 {
                return Err(PcapError::bad_file(
                    "BPF filter program length is not a multiple of 8",
                ));
            }
            let insns = prog
                .chunks_exact(8)
                .map(|c| BpfInsn {
                    code: read_u16_e([c[0], c[1]], big_endian),
                    jt: c[2],
                    jf: c[3],
                    k: read_u32_e([c[4], c[5], c[6], c[7]], big_endian),
                })
                .collect();
            Ok(Some(InterfaceFilter::Bpf(insns)))
        }
        _ => {
            debug!("skipping unknown interface filter kind {}", kind);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_accessors() {
        let opt = BlockOption::new(OptionCode::EpbFlags, &[1u8, 0, 0, 0][..]);
        assert_eq!(opt.as_u32(false), Ok(1));
        assert_eq!(opt.as_u32(true), Ok(0x0100_0000));
        assert_eq!(opt.as_u64(false), Err(OptionError::InvalidLength));
    }

    #[test]
    fn verdict_lengths() {
        // TC verdict must carry exactly 8 payload bytes
        assert!(parse_verdict(&[1, 0, 0], false).is_err());
        let v = parse_verdict(&[1, 2, 0, 0, 0, 0, 0, 0, 0], false).unwrap();
        assert_eq!(v, Some(Verdict::LinuxTc(2)));
        // unknown verdict types are skipped
        let v = parse_verdict(&[9, 1, 2], false).unwrap();
        assert_eq!(v, None);
    }

    #[test]
    fn bpf_filter_alignment() {
        assert!(parse_if_filter(&[1, 0, 0, 0], false).is_err());
        let raw = [1u8, 0x15, 0x00, 2, 3, 0xde, 0xad, 0xbe, 0xef];
        let f = parse_if_filter(&raw, true).unwrap();
        assert_eq!(
            f,
            Some(InterfaceFilter::Bpf(vec![BpfInsn {
                code: 0x1500,
                jt: 2,
                jf: 3,
                k: 0xdead_beef,
            }]))
        );
    }

    #[test]
    fn packet_flags_fields() {
        let f = PacketFlags(0x0001_0065);
        assert_eq!(f.direction(), 1);
        assert_eq!(f.reception_type(), 1);
        assert_eq!(f.fcs_len(), Some(3));
        assert_eq!(f.errors(), 1);
    }
}
