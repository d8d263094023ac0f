//! Run configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::render::ModeOverride;
use crate::symbolization::DEFAULT_TIMEOUT;

/// Everything one symbolication run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicateOptions {
    pub report_path: PathBuf,
    pub symbols_path: PathBuf,
    pub binary_name: Option<String>,
    pub device_support: PathBuf,
    pub mode: ModeOverride,
    pub app_arch: String,
    pub system_arch: String,
    pub atos: String,
    pub timeout: Duration,
    pub quiet: bool,
    pub show_envelope: bool,
}

impl Default for SymbolicateOptions {
    fn default() -> Self {
        Self {
            report_path: PathBuf::new(),
            symbols_path: PathBuf::new(),
            binary_name: None,
            device_support: default_device_support(),
            mode: ModeOverride::Auto,
            app_arch: "arm64".to_string(),
            system_arch: "arm64e".to_string(),
            atos: "atos".to_string(),
            timeout: DEFAULT_TIMEOUT,
            quiet: false,
            show_envelope: false,
        }
    }
}

impl From<Args> for SymbolicateOptions {
    fn from(args: Args) -> Self {
        Self {
            report_path: args.report_path,
            symbols_path: args.symbols_path,
            binary_name: args.binary_name,
            device_support: args.device_support.unwrap_or_else(default_device_support),
            mode: args.mode,
            app_arch: args.app_arch,
            system_arch: args.system_arch,
            atos: args.atos,
            timeout: Duration::from_secs(args.timeout),
            quiet: args.quiet,
            show_envelope: args.show_envelope,
        }
    }
}

/// `~/Library/Developer/Xcode/iOS DeviceSupport`.
#[must_use]
pub fn default_device_support() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join("Library/Developer/Xcode/iOS DeviceSupport")
}
