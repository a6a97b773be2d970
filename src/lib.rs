//! # PCAPNG capture file codec
//!
//! A reader and writer for the [pcapng](https://github.com/pcapng/pcapng)
//! capture file format: block-structured, option-rich, with multiple
//! sections per file and per-section byte order.
//!
//! The crate is organized in two layers:
//!
//! - the **block layer** ([`blocks`]) parses and serializes individual
//!   blocks zero-copy, with the byte order of the enclosing section;
//! - the **capture layer** ([`read`], [`write`]) drives the block layer:
//!   it maintains per-section interface tables, scales timestamps with each
//!   interface's declared resolution, and exposes records as owned values.
//!
//! ## Reading
//!
//! ```rust,no_run
//! use pcapng_io::{CaptureReader, Event};
//! use std::fs::File;
//!
//! # fn main() -> Result<(), pcapng_io::PcapError> {
//! let file = File::open("capture.pcapng")?;
//! let mut reader = CaptureReader::open(file)?;
//! loop {
//!     match reader.read_next()? {
//!         Event::Packet(pkt) => println!(
//!             "if {} ts {}.{:09} {} bytes",
//!             pkt.interface_id, pkt.ts_secs, pkt.ts_nanos, pkt.data.len()
//!         ),
//!         Event::EndOfFile => break,
//!         _ => (),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Writing
//!
//! ```rust,no_run
//! use pcapng_io::{CaptureWriter, InterfaceRecord, PacketRecord, SectionRecord};
//!
//! # fn main() -> Result<(), pcapng_io::PcapError> {
//! let iface = InterfaceRecord::default();
//! let mut writer =
//!     CaptureWriter::create(Vec::new(), &SectionRecord::default(), &[iface], None)?;
//! writer.write_packet(&PacketRecord::new(0, 0, 0, 4, vec![0xde, 0xad, 0xbe, 0xef]))?;
//! let bytes = writer.finish()?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```
//!
//! Both byte orders are accepted on read; output is little-endian.
//! Unknown block types and option codes are skipped, or dispatched to
//! handlers registered through [`registry`].

mod endianness;
mod error;
mod linktype;
mod records;
mod section;

pub mod blocks;
pub mod read;
pub mod registry;
pub mod write;

mod serialize;

pub use blocks::Block;
pub use error::PcapError;
pub use linktype::{Linktype, MAX_PACKET_SIZE_DBUS, MAX_PACKET_SIZE_STANDARD};
pub use read::{probe, CaptureReader, CaptureReaderBuilder, Event, ProbeResult};
pub use records::*;
pub use section::{
    split_timestamp, ts_units_from_tsresol, InterfaceInfo, InterfaceStats, SectionInfo, Summary,
    TsPrecision,
};
pub use serialize::ToVec;
pub use write::CaptureWriter;
