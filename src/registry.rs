//! Process-wide registries for plugin block and option handlers.
//!
//! Both tables are meant to be filled during initialization, before any
//! reader or writer is opened, and are read-only afterwards. Lookups take
//! the read lock only.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::blocks::{
    DSB_MAGIC, EPB_MAGIC, IDB_MAGIC, ISB_MAGIC, JOURNAL_MAGIC, NRB_MAGIC, PB_MAGIC, SHB_MAGIC,
    SPB_MAGIC, SYSDIG_EVENT_MAGIC, SYSDIG_EVENT_V2_MAGIC,
};
use crate::error::PcapError;

/// Reader side of a block handler: receives the section byte order, the
/// native block type, and the block body (after the 8-byte header, without
/// the trailer).
pub type BlockReadFn = fn(big_endian: bool, block_type: u32, body: &[u8]) -> Result<(), PcapError>;

/// Writer side of a block handler: produces the block body to be framed.
pub type BlockWriteFn = fn(block_type: u32, body: &[u8]) -> Result<Vec<u8>, PcapError>;

#[derive(Clone, Copy)]
pub struct BlockHandler {
    pub read: BlockReadFn,
    pub write: BlockWriteFn,
}

/// Option parser for codes outside the standardized set.
pub type OptionParseFn = fn(big_endian: bool, code: u16, value: &[u8]) -> Result<(), PcapError>;
/// Computes the unpadded value length an option writer will emit.
pub type OptionSizeFn = fn(code: u16, value: &[u8]) -> u16;
/// Produces the option value bytes to be written.
pub type OptionWriteFn = fn(code: u16, value: &[u8]) -> Result<Vec<u8>, PcapError>;

#[derive(Clone, Copy)]
pub struct OptionHandler {
    pub parse: OptionParseFn,
    pub size: OptionSizeFn,
    pub write: OptionWriteFn,
}

/// Block kinds sharing an option namespace. All packet block variants
/// collapse to [BlockKind::Packet].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    SectionHeader,
    InterfaceDescription,
    Packet,
    NameResolution,
    InterfaceStatistics,
    HostEvent,
    DecryptionSecrets,
}

impl BlockKind {
    /// The option namespace of a native block type
    pub fn from_block_type(block_type: u32) -> Option<BlockKind> {
        match block_type {
            SHB_MAGIC => Some(BlockKind::SectionHeader),
            IDB_MAGIC => Some(BlockKind::InterfaceDescription),
            EPB_MAGIC | PB_MAGIC | SPB_MAGIC => Some(BlockKind::Packet),
            NRB_MAGIC => Some(BlockKind::NameResolution),
            ISB_MAGIC => Some(BlockKind::InterfaceStatistics),
            SYSDIG_EVENT_MAGIC | SYSDIG_EVENT_V2_MAGIC => Some(BlockKind::HostEvent),
            DSB_MAGIC => Some(BlockKind::DecryptionSecrets),
            _ => None,
        }
    }
}

fn is_core_block_type(block_type: u32) -> bool {
    matches!(
        block_type,
        SHB_MAGIC
            | IDB_MAGIC
            | PB_MAGIC
            | SPB_MAGIC
            | NRB_MAGIC
            | ISB_MAGIC
            | EPB_MAGIC
            | JOURNAL_MAGIC
            | DSB_MAGIC
            | SYSDIG_EVENT_MAGIC
            | SYSDIG_EVENT_V2_MAGIC
    )
}

fn is_builtin_option(kind: BlockKind, code: u16) -> bool {
    if code <= 1 {
        // end-of-options and comment belong to every block kind
        return true;
    }
    let max_known = match kind {
        BlockKind::SectionHeader => 4,
        BlockKind::InterfaceDescription => 15,
        BlockKind::Packet => 7,
        BlockKind::NameResolution => 4,
        BlockKind::InterfaceStatistics => 8,
        BlockKind::HostEvent | BlockKind::DecryptionSecrets => 1,
    };
    code <= max_known
}

static BLOCK_HANDLERS: OnceLock<RwLock<HashMap<u32, BlockHandler>>> = OnceLock::new();
static OPTION_HANDLERS: OnceLock<RwLock<HashMap<(BlockKind, u16), OptionHandler>>> =
    OnceLock::new();

fn block_handlers() -> &'static RwLock<HashMap<u32, BlockHandler>> {
    BLOCK_HANDLERS.get_or_init(|| RwLock::new(HashMap::new()))
}

fn option_handlers() -> &'static RwLock<HashMap<(BlockKind, u16), OptionHandler>> {
    OPTION_HANDLERS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a handler for a local block type.
///
/// Core block types cannot be claimed, and neither can reserved,
/// non-local types (bit 31 clear). Re-registering the same type replaces
/// the previous handler.
pub fn register_block_handler(block_type: u32, handler: BlockHandler) -> Result<(), PcapError> {
    if is_core_block_type(block_type) {
        return Err(PcapError::Registration(
            "core block types cannot be overridden",
        ));
    }
    if block_type & 0x8000_0000 == 0 {
        return Err(PcapError::Registration(
            "only local block types (bit 31 set) can be registered",
        ));
    }
    let mut handlers = block_handlers().write().map_err(|_| {
        PcapError::Registration("block handler table is poisoned")
    })?;
    handlers.insert(block_type, handler);
    Ok(())
}

/// Register a handler for an option code of a block kind.
///
/// Standardized codes (end-of-options, comment, and the per-kind codes the
/// core parses itself) are refused.
pub fn register_option_handler(
    kind: BlockKind,
    code: u16,
    handler: OptionHandler,
) -> Result<(), PcapError> {
    if is_builtin_option(kind, code) {
        return Err(PcapError::Registration(
            "standardized option codes cannot be overridden",
        ));
    }
    let mut handlers = option_handlers().write().map_err(|_| {
        PcapError::Registration("option handler table is poisoned")
    })?;
    handlers.insert((kind, code), handler);
    Ok(())
}

pub(crate) fn lookup_block_handler(block_type: u32) -> Option<BlockHandler> {
    block_handlers().read().ok()?.get(&block_type).copied()
}

pub(crate) fn lookup_option_handler(kind: BlockKind, code: u16) -> Option<OptionHandler> {
    option_handlers().read().ok()?.get(&(kind, code)).copied()
}
