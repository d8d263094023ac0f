//! Address → symbol translation through an external utility.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::domain::TranslateError;

/// Default bound on one utility invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One batch of addresses inside one loaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub path: PathBuf,
    pub arch: String,
    pub load_address: u64,
    pub addresses: Vec<u64>,
}

/// Turns runtime addresses into symbol descriptions.
#[async_trait]
pub trait AddressTranslator {
    /// One output line per requested address, in request order.
    ///
    /// Implementations return whatever the utility printed; the caller checks
    /// the line count.
    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, TranslateError>;
}

/// Runs `atos` (or a compatible program) as a subprocess.
#[derive(Debug, Clone)]
pub struct AtosTranslator {
    pub program: String,
    pub timeout: Duration,
}

impl Default for AtosTranslator {
    fn default() -> Self {
        Self { program: "atos".to_string(), timeout: DEFAULT_TIMEOUT }
    }
}

impl AtosTranslator {
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }

    /// Command-line arguments for one request.
    #[must_use]
    pub fn arguments(request: &TranslationRequest) -> Vec<String> {
        let mut args = vec![
            "-arch".to_string(),
            request.arch.clone(),
            "-o".to_string(),
            request.path.to_string_lossy().into_owned(),
            "-l".to_string(),
            format!("{:#x}", request.load_address),
        ];
        args.extend(request.addresses.iter().map(|addr| format!("{addr:#x}")));
        args
    }
}

#[async_trait]
impl AddressTranslator for AtosTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, TranslateError> {
        let args = Self::arguments(request);
        debug!("Running {} {}", self.program, args.join(" "));

        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TranslateError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        // Dropping the output future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| TranslateError::Timeout {
                program: self.program.clone(),
                timeout: self.timeout,
            })?
            .map_err(|e| TranslateError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(TranslateError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| TranslateError::InvalidOutput { program: self.program.clone() })?;

        Ok(stdout.lines().map(|line| line.trim_end().to_string()).collect())
    }
}

/// Whether an output line is only the address echoed back (atos' "no symbol").
#[must_use]
pub fn is_unsymbolicated(line: &str) -> bool {
    let line = line.trim();
    line.strip_prefix("0x")
        .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
