//! Codec for Ninja's `.ninja_deps` dependency database.
//!
//! The file is an append-only log: a 16-byte header (magic + schema version
//! 3 or 4), then path records (which intern path strings as dense ids) and
//! dependency records (target id, build mtime, dependency ids). Later
//! dependency records for the same target supersede earlier ones.
//!
//! Three ways in:
//! - [`read_file`] materializes the whole log into a [`DepsSnapshot`] for
//!   "what does target X currently depend on?" queries;
//! - [`for_each_record`] streams raw [`Record`]s to a callback, for tools
//!   that want to see the log as written;
//! - [`DepsWriter`] appends new facts to an existing log ([`create_empty`]
//!   makes a fresh one).
//!
//! Single-writer, exclusive access: nothing here locks the file, callers
//! serialize sessions externally.

pub mod decode;
pub mod encode;
pub mod error;
pub mod logging;
pub mod read;
pub mod strings;
pub mod visit;

pub use decode::Record;
pub use encode::{DepsWriter, create_empty};
pub use error::DepsError;
pub use read::{DepsSnapshot, TargetDeps, read_file};
pub use strings::StringTable;
pub use visit::for_each_record;
