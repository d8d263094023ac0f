//! Newtypes shared by the report model, the locator and the renderer.

use std::fmt;

use uuid::Uuid;

/// Identity of one binary image as it appears in a report.
///
/// Two frames belong to the same image only if both name and UUID agree; the
/// same framework name can show up with different UUIDs inside a single report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinaryKey {
    pub name: String,
    pub uuid: Uuid,
}

impl BinaryKey {
    #[must_use]
    pub fn new(name: impl Into<String>, uuid: Uuid) -> Self {
        Self { name: name.into(), uuid }
    }
}

impl fmt::Display for BinaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, format_uuid(&self.uuid))
    }
}

/// Uppercase hyphenated form, the way Apple tooling prints build UUIDs.
#[must_use]
pub fn format_uuid(uuid: &Uuid) -> String {
    uuid.hyphenated().encode_upper(&mut Uuid::encode_buffer()).to_string()
}

/// An OS version as declared by a report, e.g. `iPhone OS 17.1 (21B80)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsVersion {
    /// Dotted version number (`17.1`, `16.4.1`).
    pub version: String,
    /// Build identifier (`21B80`), when the string carries one.
    pub build: Option<String>,
}

impl OsVersion {
    /// Extract the version number and optional `(build)` suffix.
    ///
    /// Returns `None` if the string contains no dotted number.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let version = raw
            .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
            .find(|token| is_dotted_version(token))?
            .to_string();

        let build = raw.find('(').and_then(|open| {
            let rest = &raw[open + 1..];
            let close = rest.find(')')?;
            let build = rest[..close].trim();
            (!build.is_empty() && build.chars().all(|c| c.is_ascii_alphanumeric()))
                .then(|| build.to_string())
        });

        Some(Self { version, build })
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.build {
            Some(build) => write!(f, "{} ({build})", self.version),
            None => f.write_str(&self.version),
        }
    }
}

fn is_dotted_version(token: &str) -> bool {
    let mut parts = 0;
    for part in token.split('.') {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    parts >= 2
}
