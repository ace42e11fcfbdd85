use std::collections::HashMap;

/// Bidirectional interned-path table.
///
/// Ids are dense, 0-based, assigned in first-seen order and stable for the
/// lifetime of the table. The table only ever grows: path records are
/// append-only on disk, so there is nothing to delete here either.
///
/// Rebuilt from the file's Path records on every open; never persisted
/// itself.
#[derive(Debug, Default)]
pub struct StringTable {
    by_id: Vec<String>,
    by_path: HashMap<String, u32>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the id for `path`.
    ///
    /// Returns `(id, was_new)`; `was_new` is true exactly once per distinct
    /// path, which is the encoder's cue to emit a path record for it.
    pub fn intern(&mut self, path: &str) -> (u32, bool) {
        if let Some(&id) = self.by_path.get(path) {
            return (id, false);
        }
        let id = self.by_id.len() as u32;
        self.by_id.push(path.to_string());
        self.by_path.insert(path.to_string(), id);
        (id, true)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn id_of(&self, path: &str) -> Option<u32> {
        self.by_path.get(path).copied()
    }

    pub fn lookup(&self, id: u32) -> Option<&str> {
        self.by_id.get(id as usize).map(|s| s.as_str())
    }

    /// Number of interned paths; also the id the next new path will receive.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
