use crate::error::DepsError;

pub const MAGIC: &[u8; 12] = b"# ninjadeps\n";
pub const HEADER_LEN: usize = 16;

/// High bit of the type-and-size word marks a dependency record.
/// It is a discriminator, not part of the size.
pub const DEPS_RECORD_FLAG: u32 = 1 << 31;

/// One decoded wire unit.
///
/// `Version` is synthesized from the header and appears exactly once, first.
/// End-of-stream is `Ok(None)` from [`Decoder::next_record`], so consumers
/// never see an explicit EOF value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Version(u32),
    /// Declares a new interned path. The id is implicit: paths are numbered
    /// 0, 1, 2, ... in file order. `checksum` is the one's complement of
    /// that id.
    Path { path: String, checksum: u32 },
    /// Current dependency list for one target, by path id.
    /// `mtime` is `None` when the target did not exist at record time.
    Deps {
        target: u32,
        mtime: Option<u64>,
        deps: Vec<u32>,
    },
}

/// Wire-to-logical timestamp remap.
///
/// Ninja reserves raw 0 as "does not exist" and stores a legitimate zero
/// mtime as raw 1. Everything else passes through unchanged.
pub fn mtime_from_wire(raw: u64) -> Option<u64> {
    match raw {
        0 => None,
        1 => Some(0),
        v => Some(v),
    }
}

/// Inverse of [`mtime_from_wire`].
pub fn mtime_to_wire(mtime: Option<u64>) -> u64 {
    match mtime {
        None => 0,
        Some(0) => 1,
        Some(v) => v,
    }
}

/// Width in bytes of the on-disk timestamp for a given schema version.
pub fn mtime_width(version: u32) -> usize {
    if version >= 4 { 8 } else { 4 }
}

/// Cursor over a complete `.ninja_deps` byte buffer.
///
/// The buffer is usually a memory map (see `visit.rs`), but any contiguous
/// slice works; reads are sequential and bounds-checked.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    version: u32,
    /// Path records decoded so far; the next one gets this id.
    paths_seen: u32,
    version_emitted: bool,
}

impl<'a> Decoder<'a> {
    /// Validate the 16-byte header and position the cursor after it.
    ///
    /// Magic mismatch and any version other than 3 or 4 are hard format
    /// errors. The upstream tool only asserts on the version; a wrong
    /// timestamp width would misparse every record after it, so we fail
    /// the open instead.
    pub fn new(buf: &'a [u8]) -> Result<Self, DepsError> {
        if buf.len() < HEADER_LEN {
            return Err(DepsError::TruncatedHeader {
                len: buf.len(),
                need: HEADER_LEN,
            });
        }
        if &buf[..MAGIC.len()] != MAGIC {
            return Err(DepsError::BadMagic);
        }

        let mut v = [0u8; 4];
        v.copy_from_slice(&buf[12..16]);
        let version = u32::from_le_bytes(v);
        if version != 3 && version != 4 {
            return Err(DepsError::UnsupportedVersion { version });
        }

        Ok(Self {
            buf,
            pos: HEADER_LEN,
            version,
            paths_seen: 0,
            version_emitted: false,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Byte offset of the next unread record (diagnostics).
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Decode the next record, or `None` at end of buffer.
    pub fn next_record(&mut self) -> Result<Option<Record>, DepsError> {
        if !self.version_emitted {
            self.version_emitted = true;
            return Ok(Some(Record::Version(self.version)));
        }

        if self.pos == self.buf.len() {
            return Ok(None);
        }

        let offset = self.pos;
        let word = self.read_u32(offset)?;
        self.pos += 4;

        if word & DEPS_RECORD_FLAG != 0 {
            let size = (word & !DEPS_RECORD_FLAG) as usize;
            self.decode_deps(offset, size).map(Some)
        } else {
            self.decode_path(offset, word as usize).map(Some)
        }
    }

    fn decode_path(&mut self, offset: usize, size: usize) -> Result<Record, DepsError> {
        // Payload is the UTF-8 path, 0-3 NUL pad bytes to a 4-byte boundary,
        // then a 4-byte checksum.
        if size < 4 {
            return Err(DepsError::TruncatedRecord {
                offset,
                need: 4,
                avail: size,
            });
        }
        self.ensure(offset, size)?;

        let padded = &self.buf[self.pos..self.pos + size - 4];
        let end = padded.iter().position(|&b| b == 0).unwrap_or(padded.len());
        let path = std::str::from_utf8(&padded[..end])
            .map_err(|_| DepsError::InvalidPath { offset })?
            .to_string();

        let checksum = self.read_u32(self.pos + size - 4)?;

        let id = self.paths_seen;
        if checksum != !id {
            return Err(DepsError::BadChecksum {
                offset,
                id,
                found: checksum,
            });
        }
        self.paths_seen += 1;
        self.pos += size;

        Ok(Record::Path { path, checksum })
    }

    fn decode_deps(&mut self, offset: usize, size: usize) -> Result<Record, DepsError> {
        let tw = mtime_width(self.version);
        if size < 4 + tw || (size - 4 - tw) % 4 != 0 {
            return Err(DepsError::MalformedDeps { offset });
        }
        self.ensure(offset, size)?;

        let target = self.read_u32(self.pos)?;

        let raw_mtime = if tw == 8 {
            let mut a = [0u8; 8];
            a.copy_from_slice(&self.buf[self.pos + 4..self.pos + 12]);
            u64::from_le_bytes(a)
        } else {
            self.read_u32(self.pos + 4)? as u64
        };

        let mut deps = Vec::with_capacity((size - 4 - tw) / 4);
        let mut at = self.pos + 4 + tw;
        while at < self.pos + size {
            deps.push(self.read_u32(at)?);
            at += 4;
        }
        self.pos += size;

        Ok(Record::Deps {
            target,
            mtime: mtime_from_wire(raw_mtime),
            deps,
        })
    }

    /// Check that `size` payload bytes remain for the record starting at
    /// `offset`. Truncation is fatal; we never hand back a partial
    /// dependency list.
    fn ensure(&self, offset: usize, size: usize) -> Result<(), DepsError> {
        let avail = self.buf.len() - self.pos;
        if size > avail {
            return Err(DepsError::TruncatedRecord {
                offset,
                need: size,
                avail,
            });
        }
        Ok(())
    }

    fn read_u32(&self, at: usize) -> Result<u32, DepsError> {
        if at + 4 > self.buf.len() {
            return Err(DepsError::TruncatedRecord {
                offset: at,
                need: 4,
                avail: self.buf.len().saturating_sub(at),
            });
        }
        let mut a = [0u8; 4];
        a.copy_from_slice(&self.buf[at..at + 4]);
        Ok(u32::from_le_bytes(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&version.to_le_bytes());
        buf
    }

    fn path_record(buf: &mut Vec<u8>, path: &str, id: u32) {
        let pad = (4 - path.len() % 4) % 4;
        let size = (path.len() + pad + 4) as u32;
        buf.extend_from_slice(&size.to_le_bytes());
        buf.extend_from_slice(path.as_bytes());
        buf.extend_from_slice(&vec![0u8; pad]);
        buf.extend_from_slice(&(!id).to_le_bytes());
    }

    #[test]
    fn mtime_remap_both_directions() {
        assert_eq!(mtime_from_wire(0), None);
        assert_eq!(mtime_from_wire(1), Some(0));
        assert_eq!(mtime_from_wire(12345), Some(12345));
        assert_eq!(mtime_to_wire(None), 0);
        assert_eq!(mtime_to_wire(Some(0)), 1);
        assert_eq!(mtime_to_wire(Some(12345)), 12345);
    }

    #[test]
    fn header_only_yields_version_then_eof() {
        let buf = header(4);
        let mut d = Decoder::new(&buf).unwrap();
        assert_eq!(d.next_record().unwrap(), Some(Record::Version(4)));
        assert_eq!(d.next_record().unwrap(), None);
    }

    #[test]
    fn bad_magic_is_fatal() {
        let mut buf = header(4);
        buf[0] = b'!';
        assert!(matches!(Decoder::new(&buf), Err(DepsError::BadMagic)));
    }

    #[test]
    fn version_5_is_rejected() {
        let buf = header(5);
        assert!(matches!(
            Decoder::new(&buf),
            Err(DepsError::UnsupportedVersion { version: 5 })
        ));
    }

    #[test]
    fn short_header_is_rejected() {
        assert!(matches!(
            Decoder::new(&MAGIC[..]),
            Err(DepsError::TruncatedHeader { .. })
        ));
    }

    #[test]
    fn path_record_strips_nul_padding() {
        let mut buf = header(4);
        path_record(&mut buf, "a.h", 0); // 3 bytes + 1 NUL pad

        let mut d = Decoder::new(&buf).unwrap();
        d.next_record().unwrap(); // version
        assert_eq!(
            d.next_record().unwrap(),
            Some(Record::Path {
                path: "a.h".to_string(),
                checksum: !0u32,
            })
        );
        assert_eq!(d.next_record().unwrap(), None);
    }

    #[test]
    fn checksum_mismatch_is_fatal() {
        let mut buf = header(4);
        path_record(&mut buf, "a.h", 7); // wrong id for the first record

        let mut d = Decoder::new(&buf).unwrap();
        d.next_record().unwrap();
        assert!(matches!(
            d.next_record(),
            Err(DepsError::BadChecksum { id: 0, .. })
        ));
    }

    #[test]
    fn deps_record_v4() {
        let mut buf = header(4);
        path_record(&mut buf, "out/a.o", 0);
        path_record(&mut buf, "a.cpp", 1);

        let size: u32 = 4 + 8 + 4;
        buf.extend_from_slice(&(size | DEPS_RECORD_FLAG).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // target id
        buf.extend_from_slice(&1000u64.to_le_bytes()); // mtime
        buf.extend_from_slice(&1u32.to_le_bytes()); // dep id

        let mut d = Decoder::new(&buf).unwrap();
        d.next_record().unwrap();
        d.next_record().unwrap();
        d.next_record().unwrap();
        assert_eq!(
            d.next_record().unwrap(),
            Some(Record::Deps {
                target: 0,
                mtime: Some(1000),
                deps: vec![1],
            })
        );
    }

    #[test]
    fn deps_record_v3_uses_four_byte_mtime() {
        let mut buf = header(3);
        path_record(&mut buf, "out/a.o", 0);

        let size: u32 = 4 + 4;
        buf.extend_from_slice(&(size | DEPS_RECORD_FLAG).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes()); // wire 1 -> logical 0

        let mut d = Decoder::new(&buf).unwrap();
        d.next_record().unwrap();
        d.next_record().unwrap();
        assert_eq!(
            d.next_record().unwrap(),
            Some(Record::Deps {
                target: 0,
                mtime: Some(0),
                deps: vec![],
            })
        );
    }

    #[test]
    fn truncated_deps_record_reports_offset() {
        let mut buf = header(4);
        let offset = buf.len();
        let size: u32 = 4 + 8 + 4;
        buf.extend_from_slice(&(size | DEPS_RECORD_FLAG).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // then the file ends

        let mut d = Decoder::new(&buf).unwrap();
        d.next_record().unwrap();
        match d.next_record() {
            Err(DepsError::TruncatedRecord {
                offset: o,
                need,
                avail,
            }) => {
                assert_eq!(o, offset);
                assert_eq!(need, 16);
                assert_eq!(avail, 4);
            }
            other => panic!("expected truncation error, got {other:?}"),
        }
    }
}
