//! Picking the device-support directory that matches a report.
//!
//! Xcode keeps one directory of OS symbols per device + OS version + build,
//! named like `iPad13,16 17.1 (21B5045h)` or `17.1 (21B80) arm64e`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, warn};

use crate::domain::{LocateError, OsVersion};

/// Why a directory was chosen among the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// Only one directory carries the report's OS version.
    OnlyMatch,
    /// The directory name carries the report's exact build number.
    BuildMatch,
    /// The directory belongs to the same device family (iPhone, iPad).
    DeviceFamily,
    /// Several directories remained; the most recently modified one won.
    MostRecent,
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SelectionReason::OnlyMatch => "only directory for this OS version",
            SelectionReason::BuildMatch => "exact build match",
            SelectionReason::DeviceFamily => "same device family",
            SelectionReason::MostRecent => "most recently modified",
        })
    }
}

/// The device-support directory used for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSupport {
    pub dir: PathBuf,
    pub reason: SelectionReason,
}

/// A subdirectory of the device-support root considered for selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub name: String,
    pub modified: SystemTime,
}

impl DeviceSupport {
    /// Select the directory under `root` matching `os` (and `device`, if known).
    ///
    /// # Errors
    /// Returns `LocateError::NoDeviceSupport` if the root cannot be listed or
    /// no subdirectory carries the report's OS version.
    pub fn select(
        root: &Path,
        os: &OsVersion,
        device: Option<&str>,
    ) -> Result<Self, LocateError> {
        let entries = std::fs::read_dir(root).map_err(|e| {
            warn!("Cannot list device support directory {}: {e}", root.display());
            LocateError::NoDeviceSupport
        })?;

        let candidates: Vec<Candidate> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .map(|entry| Candidate {
                path: entry.path(),
                name: entry.file_name().to_string_lossy().into_owned(),
                modified: entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH),
            })
            .collect();

        debug!("{} device support directories under {}", candidates.len(), root.display());

        choose(candidates, os, device).ok_or(LocateError::NoDeviceSupport)
    }
}

/// Apply the version filter and tie-break rules to a list of candidates.
#[must_use]
pub fn choose(
    candidates: Vec<Candidate>,
    os: &OsVersion,
    device: Option<&str>,
) -> Option<DeviceSupport> {
    let mut matching: Vec<Candidate> =
        candidates.into_iter().filter(|c| has_token(&c.name, &os.version)).collect();

    // Deterministic order before the tie-breaks: newest first, then by name.
    matching.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));

    match matching.len() {
        0 => return None,
        1 => {
            let only = matching.swap_remove(0);
            return Some(DeviceSupport { dir: only.path, reason: SelectionReason::OnlyMatch });
        }
        _ => {}
    }

    if let Some(build) = &os.build {
        let tag = format!("({build})");
        if let Some(hit) = matching.iter().find(|c| has_token(&c.name, &tag)) {
            return Some(DeviceSupport {
                dir: hit.path.clone(),
                reason: SelectionReason::BuildMatch,
            });
        }
    }

    if let Some(family) = device.map(device_family).filter(|f| !f.is_empty()) {
        if let Some(hit) = matching.iter().find(|c| device_family(&c.name) == family) {
            return Some(DeviceSupport {
                dir: hit.path.clone(),
                reason: SelectionReason::DeviceFamily,
            });
        }
    }

    let newest = matching.swap_remove(0);
    Some(DeviceSupport { dir: newest.path, reason: SelectionReason::MostRecent })
}

fn has_token(name: &str, token: &str) -> bool {
    name.split_whitespace().any(|t| t == token)
}

/// Leading letters of a device identifier: `iPhone15,2` → `iPhone`.
fn device_family(name: &str) -> &str {
    let end = name.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(name.len());
    &name[..end]
}
