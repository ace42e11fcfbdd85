use thiserror::Error;

/// Errors produced while decoding or querying a `.ninja_deps` file.
///
/// Format errors mean the bytes themselves are wrong; callers typically treat
/// them as "no usable deps log" and fall back to a full rebuild.
/// `UndeclaredTarget` is different: the file is fine, the caller asked about
/// a path that was interned but never recorded as a build output.
#[derive(Debug, Error)]
pub enum DepsError {
    #[error("bad magic, not a ninja deps log")]
    BadMagic,

    #[error("truncated header: {len} bytes, need {need}")]
    TruncatedHeader { len: usize, need: usize },

    #[error("unsupported deps log version {version} (expected 3 or 4)")]
    UnsupportedVersion { version: u32 },

    #[error("truncated record at offset {offset}: need {need} bytes, {avail} left")]
    TruncatedRecord {
        offset: usize,
        need: usize,
        avail: usize,
    },

    #[error("path record at offset {offset}: invalid UTF-8")]
    InvalidPath { offset: usize },

    #[error("path record at offset {offset}: checksum {found:#010x} does not match id {id}")]
    BadChecksum { offset: usize, id: u32, found: u32 },

    #[error("dependency record at offset {offset}: payload too short for target id and mtime")]
    MalformedDeps { offset: usize },

    #[error("target {target:?} was interned but never declared as a build output")]
    UndeclaredTarget { target: String },

    #[error("record references path id {id}, which has no path record")]
    UnknownPathId { id: u32 },

    #[error("mtime {mtime} does not fit the 4-byte timestamp of a version-3 deps log")]
    MtimeTooLarge { mtime: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
