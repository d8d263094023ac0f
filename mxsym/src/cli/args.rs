//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::render::ModeOverride;

#[derive(Parser, Debug)]
#[command(
    name = "mxsym",
    version,
    about = "Symbolicate MetricKit diagnostic reports",
    after_help = "\
EXAMPLES:
    mxsym --report-path crash.json --symbols-path MyApp.xcarchive
    mxsym --report-path cpu.json --symbols-path MyApp.app.dSYM --mode aggregated
    RUST_LOG=debug mxsym --report-path hang.json --symbols-path build/MyApp"
)]
pub struct Args {
    /// MetricKit report, bare payload or wrapped in an envelope
    #[arg(long, value_name = "FILE")]
    pub report_path: PathBuf,

    /// App symbols: DWARF file, .dSYM bundle or .xcarchive
    #[arg(long, value_name = "PATH")]
    pub symbols_path: PathBuf,

    /// App binary name as it appears in the report (default: inferred from --symbols-path)
    #[arg(long, value_name = "NAME")]
    pub binary_name: Option<String>,

    /// Root of the Xcode device support directories
    #[arg(long, value_name = "DIR", env = "MXSYM_DEVICE_SUPPORT")]
    pub device_support: Option<PathBuf>,

    /// Call stack layout
    #[arg(long, value_enum, default_value_t = ModeOverride::Auto)]
    pub mode: ModeOverride,

    /// Architecture of the app binary
    #[arg(long, default_value = "arm64")]
    pub app_arch: String,

    /// Architecture of system binaries
    #[arg(long, default_value = "arm64e")]
    pub system_arch: String,

    /// Address translation program
    #[arg(long, value_name = "PROGRAM", env = "MXSYM_ATOS", default_value = "atos")]
    pub atos: String,

    /// Timeout for one translation run, in seconds
    #[arg(long, value_name = "SECS", default_value = "30")]
    pub timeout: u64,

    /// Suppress the preamble (symbol files, device support directory)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the envelope's customer, date and device before the diagnostics
    #[arg(long)]
    pub show_envelope: bool,
}
