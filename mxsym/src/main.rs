//! # mxsym - Main Entry Point
//!
//! Reads a MetricKit report, resolves every frame against the app's dSYM and
//! the local device-support symbols, and prints readable call stacks.

use anyhow::Result;
use clap::Parser;
use log::info;
use std::io::{BufWriter, Write};

use mxsym::cli::Args;
use mxsym::options::SymbolicateOptions;
use mxsym::pipeline;
use mxsym::symbolization::AtosTranslator;

// Exit codes (usage errors exit with 2 from clap itself)
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

#[tokio::main(flavor = "current_thread")]
async fn run() -> Result<()> {
    let args = Args::parse();
    let options = SymbolicateOptions::from(args);
    let translator = AtosTranslator::new(options.atos.clone(), options.timeout);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = pipeline::symbolicate(&options, translator, &mut out).await?;
    out.flush()?;

    info!(
        "Symbolicated {} diagnostic(s), {} binary image(s) unresolved",
        summary.diagnostics, summary.unresolved_binaries
    );
    Ok(())
}
