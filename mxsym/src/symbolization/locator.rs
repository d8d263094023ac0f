//! Finding the symbol file of an OS binary inside a device-support directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use uuid::Uuid;

use super::uuid_reader::{CachingUuidReader, UuidReader};
use crate::domain::{format_uuid, LocateError};

/// One entry of the candidate path table.
///
/// Templates are relative to `<device dir>/Symbols/`; `{name}` is replaced by
/// the binary name from the report.
pub struct PathRule {
    pub description: &'static str,
    pub matches: fn(&str) -> bool,
    pub templates: &'static [&'static str],
}

/// Binaries shipped inside `FontServices.framework` rather than at their own path.
const FONT_SERVICES: &[&str] = &[
    "libFontParser.dylib",
    "libGSFontCache.dylib",
    "libGSFont.dylib",
    "libhvf.dylib",
    "libTrueTypeScaler.dylib",
    "FontServices",
];

/// Specific rules. Every matching rule contributes its templates, in order.
pub const PATH_RULES: &[PathRule] = &[
    PathRule {
        description: "dynamic library",
        matches: |name| name.starts_with("lib") && name.ends_with(".dylib"),
        templates: &["usr/lib/system/{name}", "usr/lib/{name}"],
    },
    PathRule {
        description: "swift runtime",
        matches: |name| name.starts_with("libswift"),
        templates: &["usr/lib/swift/{name}"],
    },
    PathRule {
        description: "dynamic linker",
        matches: |name| name == "dyld",
        templates: &["usr/lib/dyld"],
    },
    PathRule {
        description: "font services",
        matches: |name| FONT_SERVICES.contains(&name),
        templates: &["System/Library/PrivateFrameworks/FontServices.framework/{name}"],
    },
];

/// Used only when no rule of `PATH_RULES` matched.
pub const FALLBACK_TEMPLATES: &[&str] = &[
    "System/Library/Frameworks/{name}.framework/{name}",
    "System/Library/Frameworks/{name}.framework/Versions/A/{name}",
    "System/Library/PrivateFrameworks/{name}.framework/{name}",
    "System/Library/AccessibilityBundles/{name}.axbundle/{name}",
    "System/Library/AccessibilityBundles/{name}.bundle/{name}",
];

/// Relative candidate paths for `name`, deduplicated, in search order.
#[must_use]
pub fn candidate_paths(name: &str) -> Vec<String> {
    let mut templates: Vec<&str> = Vec::new();
    for rule in PATH_RULES.iter().filter(|rule| (rule.matches)(name)) {
        debug!("{name}: matched path rule '{}'", rule.description);
        templates.extend(rule.templates);
    }
    if templates.is_empty() {
        templates.extend(FALLBACK_TEMPLATES);
    }

    let mut paths: Vec<String> = Vec::with_capacity(templates.len());
    for template in templates {
        let path = template.replace("{name}", name);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

/// Resolves (name, UUID) of OS binaries to verified symbol files.
///
/// Both the lookups and the UUIDs read from candidate files are memoised for
/// the lifetime of the locator.
pub struct SystemSymbolLocator<R> {
    symbols_dir: Option<PathBuf>,
    reader: CachingUuidReader<R>,
    resolved: HashMap<(String, Uuid), Result<PathBuf, LocateError>>,
}

impl<R: UuidReader> SystemSymbolLocator<R> {
    /// `device_dir` is the selected device-support directory, or `None` when
    /// no directory matched the report; every lookup then fails.
    pub fn new(device_dir: Option<&Path>, reader: R) -> Self {
        Self {
            symbols_dir: device_dir.map(|dir| dir.join("Symbols")),
            reader: CachingUuidReader::new(reader),
            resolved: HashMap::new(),
        }
    }

    pub fn reader(&self) -> &R {
        self.reader.inner()
    }

    /// Path of the symbol file for `name` whose embedded UUID equals `uuid`.
    ///
    /// # Errors
    /// `LocateError::NotFound` if no candidate exists, `LocateError::UuidMismatch`
    /// if candidates exist but none carries the requested UUID.
    pub fn locate(&mut self, name: &str, uuid: Uuid) -> Result<PathBuf, LocateError> {
        let key = (name.to_string(), uuid);
        if let Some(cached) = self.resolved.get(&key) {
            return cached.clone();
        }

        let result = self.search(name, uuid);
        match &result {
            Ok(path) => info!("{name} <{}>: {}", format_uuid(&uuid), path.display()),
            Err(e) => warn!("{name} <{}>: {e}", format_uuid(&uuid)),
        }
        self.resolved.insert(key, result.clone());
        result
    }

    fn search(&self, name: &str, uuid: Uuid) -> Result<PathBuf, LocateError> {
        let Some(symbols_dir) = &self.symbols_dir else {
            return Err(LocateError::NotFound);
        };

        let mut mismatched = Vec::new();
        for relative in candidate_paths(name) {
            let path = symbols_dir.join(&relative);
            if !path.is_file() {
                continue;
            }
            match self.reader.uuids(&path) {
                Ok(found) if found.contains(&uuid) => return Ok(path),
                Ok(found) => {
                    debug!("{} has UUID(s) {found:?}", path.display());
                    mismatched.push((path, found));
                }
                Err(e) => {
                    warn!("Skipping unreadable candidate {}: {e}", path.display());
                    mismatched.push((path, Vec::new()));
                }
            }
        }

        if mismatched.is_empty() {
            Err(LocateError::NotFound)
        } else {
            Err(LocateError::UuidMismatch { candidates: mismatched })
        }
    }
}
