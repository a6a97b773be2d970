use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

use super::{ng_block_parser, NgBlockParser, JOURNAL_MAGIC, MIN_JOURNAL_SIZE};

const REALTIME_TIMESTAMP_FIELD: &[u8] = b"__REALTIME_TIMESTAMP=";

/// A systemd Journal Export Block carries one journal entry in export
/// format. The entry text is opaque to this layer, except for the
/// `__REALTIME_TIMESTAMP=` field used as the record timestamp.
#[derive(Debug)]
pub struct JournalBlock<'a> {
    pub block_len: u32,
    /// Entry in journal export format, with padding
    pub data: &'a [u8],
}

impl<'a> JournalBlock<'a> {
    /// The journal entry without trailing padding
    pub fn entry_data(&self) -> &[u8] {
        let mut end = self.data.len();
        while end > 0 && self.data[end - 1] == 0 {
            end -= 1;
        }
        &self.data[..end]
    }

    /// The `__REALTIME_TIMESTAMP` field of the entry, in microseconds
    /// since the epoch
    pub fn realtime_usecs(&self) -> Option<u64> {
        for line in self.entry_data().split(|&c| c == b'\n') {
            if let Some(v) = line.strip_prefix(REALTIME_TIMESTAMP_FIELD) {
                let s = std::str::from_utf8(v).ok()?;
                return s.parse().ok();
            }
        }
        None
    }
}

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, JournalBlock<'a>> for JournalBlock<'a> {
    const BLOCK_TYPE: u32 = JOURNAL_MAGIC;
    const MIN_SIZE: u32 = MIN_JOURNAL_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], JournalBlock<'a>, PcapError> {
        let block = JournalBlock {
            block_len,
            data: body,
        };
        Ok((body, block))
    }
}

/// Parse a systemd Journal Export Block (little-endian)
pub fn parse_journal_block_le(i: &[u8]) -> IResult<&[u8], JournalBlock, PcapError> {
    ng_block_parser::<JournalBlock, PcapLE, _>()(i)
}

/// Parse a systemd Journal Export Block (big-endian)
pub fn parse_journal_block_be(i: &[u8]) -> IResult<&[u8], JournalBlock, PcapError> {
    ng_block_parser::<JournalBlock, PcapBE, _>()(i)
}
