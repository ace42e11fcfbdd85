use crate::decode::{DEPS_RECORD_FLAG, MAGIC, mtime_to_wire, mtime_width};
use crate::error::DepsError;
use crate::read::read_file;
use crate::strings::StringTable;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a brand-new deps log containing only the 16-byte header.
///
/// Used by build setup before the first compile; appending to an existing
/// log goes through [`DepsWriter::open`] instead.
pub fn create_empty(path: &Path, version: u32) -> Result<()> {
    if version != 3 && version != 4 {
        return Err(DepsError::UnsupportedVersion { version }.into());
    }

    let mut f = File::create(path)
        .map_err(DepsError::Io)
        .with_context(|| format!("create deps log {}", path.display()))?;
    f.write_all(MAGIC)
        .and_then(|_| f.write_all(&version.to_le_bytes()))
        .map_err(DepsError::Io)
        .with_context(|| format!("write header to {}", path.display()))?;
    f.sync_all()
        .map_err(DepsError::Io)
        .with_context(|| format!("sync {}", path.display()))?;

    tracing::debug!(path = %path.display(), version, "created empty deps log");
    Ok(())
}

/// Encode one path record: size word (high bit clear), UTF-8 bytes, NUL pad
/// to a 4-byte boundary, then the one's complement of the assigned id.
fn encode_path_record(path: &str, id: u32) -> Vec<u8> {
    let bytes = path.as_bytes();
    let pad = (4 - bytes.len() % 4) % 4;
    let size = (bytes.len() + pad + 4) as u32;

    let mut out = Vec::with_capacity(4 + size as usize);
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(bytes);
    out.resize(out.len() + pad, 0);
    out.extend_from_slice(&(!id).to_le_bytes());
    out
}

/// Encode one dependency record. All referenced ids must already have path
/// records in the file, and on v3 the wire mtime must fit 4 bytes;
/// [`DepsWriter`] guarantees both.
fn encode_deps_record(version: u32, target: u32, mtime: Option<u64>, deps: &[u32]) -> Vec<u8> {
    let tw = mtime_width(version);
    let size = (4 + tw + 4 * deps.len()) as u32;

    let mut out = Vec::with_capacity(4 + size as usize);
    out.extend_from_slice(&(size | DEPS_RECORD_FLAG).to_le_bytes());
    out.extend_from_slice(&target.to_le_bytes());

    let raw = mtime_to_wire(mtime);
    if tw == 8 {
        out.extend_from_slice(&raw.to_le_bytes());
    } else {
        out.extend_from_slice(&(raw as u32).to_le_bytes());
    }
    for &id in deps {
        out.extend_from_slice(&id.to_le_bytes());
    }
    out
}

/// Appender for an existing deps log.
///
/// Opening rebuilds the string table from a full read of the file, so ids
/// assigned during this session continue the on-disk numbering. The writer
/// assumes exclusive access; nothing else may read or append the file until
/// [`DepsWriter::close`] returns.
pub struct DepsWriter {
    out: BufWriter<File>,
    strings: StringTable,
    version: u32,
}

impl DepsWriter {
    pub fn open(path: &Path) -> Result<Self> {
        let snapshot = read_file(path)?;
        let (version, strings, _) = snapshot.into_parts();

        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(DepsError::Io)
            .with_context(|| format!("open {} for append", path.display()))?;

        tracing::debug!(
            path = %path.display(),
            version,
            known_paths = strings.len(),
            "deps log opened for append"
        );

        Ok(Self {
            out: BufWriter::new(file),
            strings,
            version,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Record that `target` was built at `mtime` (None = does not exist) and
    /// depends on `deps`.
    ///
    /// Paths seen for the first time in this session get a path record
    /// emitted before the dependency record that references them.
    pub fn write_target(&mut self, target: &str, mtime: Option<u64>, deps: &[&str]) -> Result<()> {
        // A v3 log has only 4 bytes for the timestamp. Truncating would let
        // large values alias the 0/1 wire sentinels on read, so refuse them
        // before any path records are emitted.
        if mtime_width(self.version) == 4 {
            let raw = mtime_to_wire(mtime);
            if raw > u32::MAX as u64 {
                return Err(DepsError::MtimeTooLarge { mtime: raw }.into());
            }
        }

        let target_id = self.intern(target)?;
        let mut dep_ids = Vec::with_capacity(deps.len());
        for dep in deps {
            dep_ids.push(self.intern(dep)?);
        }

        self.out
            .write_all(&encode_deps_record(
                self.version,
                target_id,
                mtime,
                &dep_ids,
            ))
            .map_err(DepsError::Io)
            .with_context(|| format!("append dependency record for {target}"))?;

        tracing::trace!(target, target_id, deps = dep_ids.len(), "recorded target");
        Ok(())
    }

    fn intern(&mut self, path: &str) -> Result<u32> {
        let (id, was_new) = self.strings.intern(path);
        if was_new {
            self.out
                .write_all(&encode_path_record(path, id))
                .map_err(DepsError::Io)
                .with_context(|| format!("append path record for {path}"))?;
        }
        Ok(id)
    }

    /// Flush and close. Buffered bytes are on disk when this returns Ok.
    pub fn close(mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(DepsError::Io)
            .context("flush deps log")?;
        self.out
            .get_ref()
            .sync_all()
            .map_err(DepsError::Io)
            .context("sync deps log")?;
        Ok(())
    }
}
