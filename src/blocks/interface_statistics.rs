use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;
use crate::section::InterfaceStats;

use super::option::{opt_parse_options, BlockOption, OptionCode};
use super::{ng_block_parser, NgBlockParser, ISB_MAGIC, MIN_ISB_SIZE};

/// An Interface Statistics Block (ISB) carries capture counters for one
/// interface.
///
/// The timestamp and the start/end time options use the referenced
/// interface's time units.
#[derive(Debug)]
pub struct InterfaceStatisticsBlock<'a> {
    pub block_len: u32,
    pub if_id: u32,
    pub ts_high: u32,
    pub ts_low: u32,
    pub options: Vec<BlockOption<'a>>,
}

impl<'a> InterfaceStatisticsBlock<'a> {
    /// The capture timestamp in interface time units
    #[inline]
    pub fn timestamp_ticks(&self) -> u64 {
        (u64::from(self.ts_high) << 32) | u64::from(self.ts_low)
    }

    /// Collect the counter options into an [InterfaceStats] value.
    ///
    /// Counter options must be exactly 8 bytes; any other length is a
    /// structural error.
    pub fn stats(&self, big_endian: bool) -> Result<InterfaceStats, PcapError> {
        let mut stats = InterfaceStats {
            ts: self.timestamp_ticks(),
            ..InterfaceStats::default()
        };
        for opt in &self.options {
            let target = match opt.code {
                OptionCode::IsbStartTime => &mut stats.start_time,
                OptionCode::IsbEndTime => &mut stats.end_time,
                OptionCode::IsbIfRecv => &mut stats.received,
                OptionCode::IsbIfDrop => &mut stats.dropped,
                OptionCode::IsbFilterAccept => &mut stats.filter_accepted,
                OptionCode::IsbOsDrop => &mut stats.os_dropped,
                OptionCode::IsbUsrDeliv => &mut stats.delivered,
                _ => continue,
            };
            let v = opt.as_u64(big_endian).map_err(|_| {
                PcapError::bad_file(format!(
                    "interface statistics option {:?} length {} is not 8",
                    opt.code, opt.len
                ))
            })?;
            *target = Some(v);
        }
        Ok(stats)
    }
}

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, InterfaceStatisticsBlock<'a>>
    for InterfaceStatisticsBlock<'a>
{
    const BLOCK_TYPE: u32 = ISB_MAGIC;
    const MIN_SIZE: u32 = MIN_ISB_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], InterfaceStatisticsBlock<'a>, PcapError> {
        let (i, if_id) = En::parse_u32(body)?;
        let (i, ts_high) = En::parse_u32(i)?;
        let (i, ts_low) = En::parse_u32(i)?;
        let (i, options) = opt_parse_options::<En>(i, block_len as usize, MIN_ISB_SIZE as usize)?;
        let block = InterfaceStatisticsBlock {
            block_len,
            if_id,
            ts_high,
            ts_low,
            options,
        };
        Ok((i, block))
    }
}

/// Parse an Interface Statistics Block (little-endian)
pub fn parse_interface_statistics_block_le(
    i: &[u8],
) -> IResult<&[u8], InterfaceStatisticsBlock, PcapError> {
    ng_block_parser::<InterfaceStatisticsBlock, PcapLE, _>()(i)
}

/// Parse an Interface Statistics Block (big-endian)
pub fn parse_interface_statistics_block_be(
    i: &[u8],
) -> IResult<&[u8], InterfaceStatisticsBlock, PcapError> {
    ng_block_parser::<InterfaceStatisticsBlock, PcapBE, _>()(i)
}
