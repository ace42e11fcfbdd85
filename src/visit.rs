use crate::decode::{Decoder, HEADER_LEN, Record};
use crate::error::DepsError;
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Stream every record of a deps log, in file order, through `consumer`.
///
/// One forward pass over a memory map of the whole file. The consumer sees
/// the synthesized `Version` record first and never sees end-of-stream; the
/// loop stops when the decoder runs out of bytes. The file handle and map
/// are dropped on every exit path, including consumer errors.
pub fn for_each_record<F>(path: &Path, mut consumer: F) -> Result<()>
where
    F: FnMut(Record) -> Result<()>,
{
    let file = File::open(path)
        .map_err(DepsError::Io)
        .with_context(|| format!("open {}", path.display()))?;

    let len = file
        .metadata()
        .map_err(DepsError::Io)
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    if len == 0 {
        // Mapping a zero-length file fails with EINVAL; report it as the
        // format problem it is.
        return Err(DepsError::TruncatedHeader {
            len: 0,
            need: HEADER_LEN,
        })
        .with_context(|| format!("read deps log {}", path.display()));
    }

    let mmap = unsafe { Mmap::map(&file) }
        .map_err(DepsError::Io)
        .with_context(|| format!("mmap {}", path.display()))?;
    madvise_sequential(&mmap);

    let mut decoder =
        Decoder::new(&mmap).with_context(|| format!("read deps log {}", path.display()))?;

    while let Some(record) = decoder
        .next_record()
        .with_context(|| format!("read deps log {}", path.display()))?
    {
        consumer(record)?;
    }

    Ok(())
}

fn madvise_sequential(mmap: &Mmap) {
    unsafe {
        let _ = libc::madvise(
            mmap.as_ptr() as *mut libc::c_void,
            mmap.len(),
            libc::MADV_SEQUENTIAL,
        );
    }
}
