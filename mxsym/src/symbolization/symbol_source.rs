//! Symbol files handed to the address translator.

use std::path::{Path, PathBuf};

use log::info;
use uuid::Uuid;

use super::uuid_reader::UuidReader;
use crate::domain::{format_uuid, SymbolFileError};

/// A verified symbol file for one binary image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSource {
    pub path: PathBuf,
    /// UUID embedded in `path`; equal to the UUID the report asked for.
    pub uuid: Uuid,
    /// Architecture slice to translate against (`arm64`, `arm64e`).
    pub arch: String,
}

/// The application's own symbols, resolved from the path given by the user.
#[derive(Debug, Clone)]
pub struct AppSymbols {
    /// Binary name as it appears in the report's frames.
    pub name: String,
    /// The DWARF file itself, after unwrapping any bundle.
    pub path: PathBuf,
    pub uuids: Vec<Uuid>,
    pub arch: String,
}

impl AppSymbols {
    /// Resolve a direct DWARF file, a `.dSYM` bundle or an `.xcarchive`.
    ///
    /// Without an explicit `binary_name` the name is the file name up to the
    /// first `.` (`MyApp.app.dSYM` → `MyApp`).
    ///
    /// # Errors
    /// Fails if the name cannot be inferred, the file does not exist, or no
    /// UUID can be read from it.
    pub fn resolve(
        path: &Path,
        binary_name: Option<&str>,
        arch: &str,
        reader: &impl UuidReader,
    ) -> Result<Self, SymbolFileError> {
        let name = match binary_name {
            Some(name) => name.to_string(),
            None => infer_binary_name(path)?,
        };

        let dwarf = dwarf_path(path, &name);
        if !dwarf.is_file() {
            return Err(SymbolFileError::NotFound(dwarf));
        }

        let uuids = reader.read_uuids(&dwarf)?;
        let listed: Vec<String> = uuids.iter().map(format_uuid).collect();
        info!("App symbols for {name}: {} [{}]", dwarf.display(), listed.join(", "));

        Ok(Self { name, path: dwarf, uuids, arch: arch.to_string() })
    }

    /// Source for frames of the app with build UUID `uuid`, if the file matches.
    #[must_use]
    pub fn source_for(&self, uuid: Uuid) -> Option<SymbolSource> {
        self.uuids.contains(&uuid).then(|| SymbolSource {
            path: self.path.clone(),
            uuid,
            arch: self.arch.clone(),
        })
    }
}

fn infer_binary_name(path: &Path) -> Result<String, SymbolFileError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SymbolFileError::NoBinaryName(path.to_path_buf()))
}

/// Location of the DWARF file inside whatever the user pointed at.
fn dwarf_path(path: &Path, name: &str) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xcarchive") => path
            .join("dSYMs")
            .join(format!("{name}.app.dSYM"))
            .join("Contents/Resources/DWARF")
            .join(name),
        Some("dSYM") => path.join("Contents/Resources/DWARF").join(name),
        _ => path.to_path_buf(),
    }
}
