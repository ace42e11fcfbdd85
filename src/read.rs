use crate::decode::Record;
use crate::error::DepsError;
use crate::strings::StringTable;
use crate::visit::for_each_record;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

/// Resolved answer for one target: its recorded build mtime (`None` means
/// the target did not exist) and its dependency paths in record order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDeps {
    pub mtime: Option<u64>,
    pub deps: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct DepsEntry {
    mtime: Option<u64>,
    deps: Vec<u32>,
}

/// Immutable in-memory model of one full read of a deps log.
///
/// Repeated dependency records for the same target are folded down to the
/// last one in file order; superseded records are gone by the time the
/// snapshot exists. A fresh read produces a fresh snapshot.
#[derive(Debug)]
pub struct DepsSnapshot {
    version: u32,
    strings: StringTable,
    entries: HashMap<u32, DepsEntry>,
}

/// Read and fold an entire deps log.
///
/// Any decode error aborts the read; a corrupt file never yields a partial
/// snapshot.
pub fn read_file(path: &Path) -> Result<DepsSnapshot> {
    let mut version = 0u32;
    let mut strings = StringTable::new();
    let mut entries: HashMap<u32, DepsEntry> = HashMap::new();

    for_each_record(path, |record| {
        match record {
            Record::Version(v) => version = v,
            Record::Path { path, .. } => {
                // Interning in file order reproduces the ids the writer
                // assigned, so ids are consistent across restarts.
                strings.intern(&path);
            }
            Record::Deps {
                target,
                mtime,
                deps,
            } => {
                // Last write per target wins.
                entries.insert(target, DepsEntry { mtime, deps });
            }
        }
        Ok(())
    })?;

    tracing::debug!(
        path = %path.display(),
        version,
        paths = strings.len(),
        targets = entries.len(),
        "deps log loaded"
    );

    Ok(DepsSnapshot {
        version,
        strings,
        entries,
    })
}

impl DepsSnapshot {
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Look up the current record for `target`.
    ///
    /// `Ok(None)` when the path never appears in the file at all. A path
    /// that was interned but never declared as a build output is a caller
    /// contract violation and yields `DepsError::UndeclaredTarget` — not an
    /// empty list, which would mean "declared with zero dependencies".
    pub fn lookup(&self, target: &str) -> Result<Option<TargetDeps>, DepsError> {
        let Some(id) = self.strings.id_of(target) else {
            return Ok(None);
        };
        let entry = self
            .entries
            .get(&id)
            .ok_or_else(|| DepsError::UndeclaredTarget {
                target: target.to_string(),
            })?;

        let mut deps = Vec::with_capacity(entry.deps.len());
        for &dep_id in &entry.deps {
            deps.push(self.resolve(dep_id)?.to_string());
        }
        Ok(Some(TargetDeps {
            mtime: entry.mtime,
            deps,
        }))
    }

    /// Dependency paths of `target`, if it appears in the file.
    pub fn dependencies(&self, target: &str) -> Result<Option<Vec<String>>, DepsError> {
        Ok(self.lookup(target)?.map(|t| t.deps))
    }

    /// All targets with a dependency record, in id order.
    pub fn targets(&self) -> Result<Vec<&str>, DepsError> {
        let mut ids: Vec<u32> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| self.resolve(id)).collect()
    }

    fn resolve(&self, id: u32) -> Result<&str, DepsError> {
        self.strings
            .lookup(id)
            .ok_or(DepsError::UnknownPathId { id })
    }

    pub(crate) fn into_parts(self) -> (u32, StringTable, HashMap<u32, DepsEntry>) {
        (self.version, self.strings, self.entries)
    }
}
