//! Build UUID extraction from Mach-O symbol files.
//!
//! Every Mach-O image (and every slice of a universal binary) carries an
//! `LC_UUID` load command. A dSYM's DWARF file carries the same UUID as the
//! binary it was produced from, which is what makes matching safe.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use object::read::macho::{FatArch, MachOFatFile32, MachOFatFile64};
use object::{FileKind, Object};
use uuid::Uuid;

use crate::domain::SymbolFileError;

/// Reads the build UUIDs embedded in a symbol file.
pub trait UuidReader {
    /// All UUIDs in the file: one for a thin image, one per slice for a fat one.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or carries no UUID.
    fn read_uuids(&self, path: &Path) -> Result<Vec<Uuid>, SymbolFileError>;
}

/// `UuidReader` that parses Mach-O load commands with the `object` crate.
#[derive(Debug, Default)]
pub struct MachOUuidReader;

impl UuidReader for MachOUuidReader {
    fn read_uuids(&self, path: &Path) -> Result<Vec<Uuid>, SymbolFileError> {
        let file = File::open(path).map_err(|source| SymbolFileError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: the mapping is read-only and dropped before returning. Symbol
        // files in Xcode's caches are not rewritten while we read them.
        #[allow(unsafe_code)]
        let data = unsafe { Mmap::map(&file) }.map_err(|source| SymbolFileError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let uuids = uuids_from_bytes(&data)
            .map_err(|reason| SymbolFileError::NotMachO { path: path.to_path_buf(), reason })?;

        if uuids.is_empty() {
            return Err(SymbolFileError::NoUuid(path.to_path_buf()));
        }
        Ok(uuids)
    }
}

/// Parse the UUIDs of a thin or universal Mach-O image held in memory.
///
/// # Errors
/// Returns a description of the problem if the data is not a Mach-O image.
pub fn uuids_from_bytes(data: &[u8]) -> Result<Vec<Uuid>, String> {
    let kind = FileKind::parse(data).map_err(|e| e.to_string())?;

    let slices: Vec<&[u8]> = match kind {
        FileKind::MachO32 | FileKind::MachO64 => vec![data],
        FileKind::MachOFat32 => {
            let fat = MachOFatFile32::parse(data).map_err(|e| e.to_string())?;
            fat.arches().iter().filter_map(|arch| arch.data(data).ok()).collect()
        }
        FileKind::MachOFat64 => {
            let fat = MachOFatFile64::parse(data).map_err(|e| e.to_string())?;
            fat.arches().iter().filter_map(|arch| arch.data(data).ok()).collect()
        }
        other => return Err(format!("unsupported file kind {other:?}")),
    };

    let mut uuids = Vec::new();
    for slice in slices {
        let image = object::File::parse(slice).map_err(|e| e.to_string())?;
        if let Some(bytes) = image.mach_uuid().map_err(|e| e.to_string())? {
            uuids.push(Uuid::from_bytes(bytes));
        }
    }
    Ok(uuids)
}

/// Memoises another reader per path for the lifetime of one run.
///
/// Failures are cached too, so a broken candidate is only opened once.
pub struct CachingUuidReader<R> {
    inner: R,
    cache: std::cell::RefCell<HashMap<PathBuf, Result<Vec<Uuid>, String>>>,
}

impl<R: UuidReader> CachingUuidReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, cache: std::cell::RefCell::new(HashMap::new()) }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Cached UUIDs for `path`, reading the file on first use.
    ///
    /// # Errors
    /// Returns the (cached) description of a failed read.
    pub fn uuids(&self, path: &Path) -> Result<Vec<Uuid>, String> {
        if let Some(cached) = self.cache.borrow().get(path) {
            return cached.clone();
        }

        let result = self.inner.read_uuids(path).map_err(|e| e.to_string());
        self.cache.borrow_mut().insert(path.to_path_buf(), result.clone());
        result
    }
}
