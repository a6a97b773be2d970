use nom::{Err, IResult};
use rusticata_macros::{align32, newtype_enum};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

use super::option::{opt_parse_options, BlockOption};
use super::{ng_block_parser, NgBlockParser, DSB_MAGIC, MIN_DSB_SIZE, SECRETS_MAX_SIZE};

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct SecretsType(pub u32);

newtype_enum! {
    impl debug SecretsType {
        TlsKeyLog = 0x544c_534b, // TLSK
        WireguardKeyLog = 0x5747_4b4c,
    }
}

/// A Decryption Secrets Block (DSB) carries an opaque secrets payload,
/// typically key material for the packets of the section.
#[derive(Debug)]
pub struct DecryptionSecretsBlock<'a> {
    pub block_len: u32,
    pub secrets_type: SecretsType,
    pub secrets_len: u32,
    /// Secrets payload, with padding
    pub data: &'a [u8],
    pub options: Vec<BlockOption<'a>>,
}

impl<'a> DecryptionSecretsBlock<'a> {
    /// The secrets payload without padding
    pub fn secrets_data(&self) -> &[u8] {
        let len = self.secrets_len as usize;
        if len < self.data.len() {
            &self.data[..len]
        } else {
            self.data
        }
    }
}

impl<'a, En: PcapEndianness> NgBlockParser<'a, En, DecryptionSecretsBlock<'a>>
    for DecryptionSecretsBlock<'a>
{
    const BLOCK_TYPE: u32 = DSB_MAGIC;
    const MIN_SIZE: u32 = MIN_DSB_SIZE;

    fn inner_parse(
        _block_type: u32,
        block_len: u32,
        body: &'a [u8],
    ) -> IResult<&'a [u8], DecryptionSecretsBlock<'a>, PcapError> {
        let (i, secrets_type) = En::parse_u32(body)?;
        let (i, secrets_len) = En::parse_u32(i)?;
        if secrets_len > SECRETS_MAX_SIZE {
            return Err(Err::Error(PcapError::bad_file(format!(
                "secrets length {} is too large (> {})",
                secrets_len, SECRETS_MAX_SIZE
            ))));
        }
        let padded_len = align32!(secrets_len) as usize;
        if padded_len > i.len() {
            return Err(Err::Error(PcapError::bad_file(format!(
                "secrets length {} does not fit in a block of {} bytes",
                secrets_len, block_len
            ))));
        }
        let (data, i) = i.split_at(padded_len);
        let opt_offset = MIN_DSB_SIZE as usize + padded_len;
        let (i, options) = opt_parse_options::<En>(i, block_len as usize, opt_offset)?;
        let block = DecryptionSecretsBlock {
            block_len,
            secrets_type: SecretsType(secrets_type),
            secrets_len,
            data,
            options,
        };
        Ok((i, block))
    }
}

/// Parse a Decryption Secrets Block (little-endian)
pub fn parse_decryption_secrets_block_le(
    i: &[u8],
) -> IResult<&[u8], DecryptionSecretsBlock, PcapError> {
    ng_block_parser::<DecryptionSecretsBlock, PcapLE, _>()(i)
}

/// Parse a Decryption Secrets Block (big-endian)
pub fn parse_decryption_secrets_block_be(
    i: &[u8],
) -> IResult<&[u8], DecryptionSecretsBlock, PcapError> {
    ng_block_parser::<DecryptionSecretsBlock, PcapBE, _>()(i)
}
