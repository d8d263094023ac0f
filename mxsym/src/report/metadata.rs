//! `diagnosticMetaData` and the lookup tables used to describe crashes.

use serde::Deserialize;
use serde_json::Value;

/// Metadata attached to one diagnostic.
///
/// Values are kept as raw JSON because MetricKit mixes numbers and
/// pre-formatted strings (`"8 sec"`, `"1,024 KB"`) across OS releases; they are
/// displayed, never computed with.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagnosticMetadata {
    pub bundle_identifier: Option<String>,
    pub app_version: Option<String>,
    pub app_build_version: Option<String>,
    pub os_version: Option<String>,
    pub device_type: Option<String>,
    pub platform_architecture: Option<String>,

    // crash
    pub exception_type: Option<Value>,
    pub exception_code: Option<Value>,
    pub signal: Option<Value>,
    pub termination_reason: Option<Value>,
    pub virtual_memory_region_info: Option<Value>,

    // hang
    pub hang_duration: Option<Value>,

    // cpu exception
    #[serde(rename = "totalCPUTime")]
    pub total_cpu_time: Option<Value>,
    pub total_sampled_time: Option<Value>,

    // disk write exception
    pub writes_caused: Option<Value>,

    // app launch
    pub launch_duration: Option<Value>,
}

/// Render a metadata value the way it reads in the report: strings without
/// quotes, everything else as JSON, absent values as `unknown`.
#[must_use]
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Mach exception names, from `mach/exception_types.h`.
const EXCEPTION_TYPES: &[(i64, &str)] = &[
    (1, "EXC_BAD_ACCESS"),
    (2, "EXC_BAD_INSTRUCTION"),
    (3, "EXC_ARITHMETIC"),
    (4, "EXC_EMULATION"),
    (5, "EXC_SOFTWARE"),
    (6, "EXC_BREAKPOINT"),
    (7, "EXC_SYSCALL"),
    (8, "EXC_MACH_SYSCALL"),
    (9, "EXC_RPC_ALERT"),
    (10, "EXC_CRASH"),
    (11, "EXC_RESOURCE"),
    (12, "EXC_GUARD"),
    (13, "EXC_CORPSE_NOTIFY"),
];

/// BSD signal names, from `sys/signal.h`.
const SIGNALS: &[(i64, &str)] = &[
    (1, "SIGHUP"),
    (2, "SIGINT"),
    (3, "SIGQUIT"),
    (4, "SIGILL"),
    (5, "SIGTRAP"),
    (6, "SIGABRT"),
    (7, "SIGEMT"),
    (8, "SIGFPE"),
    (9, "SIGKILL"),
    (10, "SIGBUS"),
    (11, "SIGSEGV"),
    (12, "SIGSYS"),
    (13, "SIGPIPE"),
    (14, "SIGALRM"),
    (15, "SIGTERM"),
    (16, "SIGURG"),
    (17, "SIGSTOP"),
    (18, "SIGTSTP"),
    (19, "SIGCONT"),
    (20, "SIGCHLD"),
    (21, "SIGTTIN"),
    (22, "SIGTTOU"),
    (23, "SIGIO"),
    (24, "SIGXCPU"),
    (25, "SIGXFSZ"),
    (26, "SIGVTALRM"),
    (27, "SIGPROF"),
    (28, "SIGWINCH"),
    (29, "SIGINFO"),
    (30, "SIGUSR1"),
    (31, "SIGUSR2"),
];

/// Name of a Mach exception type, or `unknown`.
#[must_use]
pub fn exception_name(value: Option<&Value>) -> &'static str {
    lookup(EXCEPTION_TYPES, value)
}

/// Name of a signal number, or `unknown`.
#[must_use]
pub fn signal_name(value: Option<&Value>) -> &'static str {
    lookup(SIGNALS, value)
}

fn lookup(table: &[(i64, &'static str)], value: Option<&Value>) -> &'static str {
    value
        .and_then(Value::as_i64)
        .and_then(|code| table.iter().find(|(c, _)| *c == code))
        .map_or("unknown", |(_, name)| name)
}
