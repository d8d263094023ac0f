mod common;

use common::{app_dsym, device_support, fixture, RecordingTranslator, APP_UUID, FOUNDATION_UUID};
use mxsym::options::SymbolicateOptions;
use mxsym::pipeline;
use mxsym::render::ModeOverride;
use serde_json::{json, Value};
use std::path::Path;

fn options(report: &str, root: &Path) -> SymbolicateOptions {
    SymbolicateOptions {
        report_path: fixture(report),
        symbols_path: app_dsym(root),
        device_support: device_support(root),
        quiet: true,
        ..SymbolicateOptions::default()
    }
}

async fn run(options: &SymbolicateOptions, translator: RecordingTranslator) -> String {
    let mut out = Vec::new();
    pipeline::symbolicate(options, translator, &mut out).await.expect("run succeeds");
    String::from_utf8(out).expect("utf-8 output")
}

#[tokio::test]
async fn test_crash_report_linear_output() {
    let root = tempfile::tempdir().unwrap();
    let translator = RecordingTranslator::default();
    let output = run(&options("crash_bare.json", root.path()), translator.clone()).await;

    println!("{output}");

    let expected = format!(
        "Symbolicating crash report from com.example.MyApp 2.3.117\n\
         Exception type: 1, EXC_BAD_ACCESS\n\
         Exception code: 0\n\
         Signal: 11, SIGSEGV\n\
         Virtual memory region: 0 is not in any region.\n\
         \n\
         Attributed: Call stack 0:\n\
         0   libsystem_kernel.dylib 0x00000001e5a01234 sym_1234 (in libsystem_kernel.dylib)\n\
         1   MyApp                  0x0000000100005000 sym_5000 (in MyApp)\n\
         2   Foundation             0x00000001a0000080 0x1a0000000 + 128 [symbols not found]\n\
         3   MyApp                  0x0000000100004000 sym_4000 (in MyApp)\n\
         \n\
         Call stack 1:\n\
         0   libsystem_kernel.dylib 0x00000001e5a02000 sym_2000 (in libsystem_kernel.dylib)\n\
         1   <missing information in frame>\n\
         \n\
         Unresolved binaries:\n  \
         Foundation <{FOUNDATION_UUID}>: symbols not found\n"
    );
    assert_eq!(output, expected);

    // One batch per (binary, load address); Foundation never reaches the translator.
    let requests = translator.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].arch, "arm64");
    assert_eq!(requests[0].addresses, [0x1_0000_4000, 0x1_0000_5000]);
    assert_eq!(requests[1].arch, "arm64e");
    assert!(requests[1].path.ends_with("usr/lib/system/libsystem_kernel.dylib"));
}

#[tokio::test]
async fn test_envelope_and_bare_render_identically() {
    let root = tempfile::tempdir().unwrap();
    let bare = run(&options("crash_bare.json", root.path()), RecordingTranslator::default()).await;
    let wrapped =
        run(&options("crash_envelope.json", root.path()), RecordingTranslator::default()).await;

    assert_eq!(wrapped, bare);
}

#[tokio::test]
async fn test_envelope_header_on_request() {
    let root = tempfile::tempdir().unwrap();
    let bare = run(&options("crash_bare.json", root.path()), RecordingTranslator::default()).await;
    let mut opts = options("crash_envelope.json", root.path());
    opts.show_envelope = true;
    let wrapped = run(&opts, RecordingTranslator::default()).await;

    let header = "Customer ID: cust-001\n\
                  Date of report on device: 2023-11-14T22:13:20Z\n\
                  Device: iPhone15,2, iPhone OS 17.1 (21B80)\n\
                  \n";
    assert!(wrapped.starts_with(header), "unexpected header:\n{wrapped}");
    assert_eq!(&wrapped[header.len()..], bare);
}

#[tokio::test]
async fn test_sampled_tree_is_aggregated() {
    let root = tempfile::tempdir().unwrap();
    let translator = RecordingTranslator::default();
    let output = run(&options("cpu_bare.json", root.path()), translator.clone()).await;

    assert_eq!(
        output,
        "Symbolicating CPU exception diagnostic from com.example.MyApp 2.3.117\n\
         Total time: 20 sec of 3 min\n\
         \n\
         Call stack 0:\n\
         4 (100.0%) MyApp sym_a0 (in MyApp)\n\
         |  4 (100.0%) MyApp sym_b0 (in MyApp)\n\
         |  |  3 (75.0%) MyApp sym_c0 (in MyApp)\n\
         |  |  1 (25.0%) MyApp sym_d0 (in MyApp)\n\
         \n"
    );
    // Repeated addresses across roots are translated once.
    assert_eq!(translator.request_count(), 1);
    assert_eq!(translator.requests.lock().unwrap()[0].addresses.len(), 4);
}

#[tokio::test]
async fn test_mode_override() {
    let root = tempfile::tempdir().unwrap();
    let mut opts = options("crash_bare.json", root.path());
    opts.mode = ModeOverride::Aggregated;
    let output = run(&opts, RecordingTranslator::default()).await;

    assert!(output.contains("Attributed: Call stack 0:\n1 (100.0%) libsystem_kernel.dylib sym_1234"));
    assert!(output.contains("|  |  1 (100.0%) Foundation 0x1a0000000 + 128 [symbols not found]"));
}

#[tokio::test]
async fn test_missing_device_support_still_completes() {
    let root = tempfile::tempdir().unwrap();
    let mut opts = options("crash_bare.json", root.path());
    opts.device_support = root.path().join("does-not-exist");
    opts.quiet = false;

    let translator = RecordingTranslator::default();
    let output = run(&opts, translator.clone()).await;

    assert!(output.starts_with("Binary name: MyApp\n"));
    assert!(output.contains("Warning: failed to find system library path for 17.1 (21B80) iPhone15,2"));
    assert!(output.contains("0x1e5a00000 + 4660 [symbols not found]"));
    assert!(output.contains("sym_5000 (in MyApp)"));
    assert!(output.contains("  libsystem_kernel.dylib <"));
    // Only the app batch ran.
    assert_eq!(translator.request_count(), 1);
}

#[tokio::test]
async fn test_preamble_names_selected_directory() {
    let root = tempfile::tempdir().unwrap();
    let mut opts = options("crash_bare.json", root.path());
    opts.quiet = false;
    let output = run(&opts, RecordingTranslator::default()).await;

    assert!(output.contains("UUID of app symbols: 8E3F4A1B-2C5D-4E6F-8A9B-0C1D2E3F4A5B\n"));
    assert!(output.contains("iPhone15,2 17.1 (21B80) (only directory for this OS version)"));
}

#[tokio::test]
async fn test_wrong_app_uuid_is_unresolved() {
    let root = tempfile::tempdir().unwrap();
    let mut opts = options("crash_bare.json", root.path());
    let other = root.path().join("Other");
    common::write_macho(&other, uuid::Uuid::nil());
    opts.symbols_path = other;
    opts.binary_name = Some("MyApp".to_string());

    let output = run(&opts, RecordingTranslator::default()).await;
    assert!(output.contains("0x100000000 + 20480 [UUID mismatch]"));
    assert!(output.contains("  MyApp <8E3F4A1B-2C5D-4E6F-8A9B-0C1D2E3F4A5B>: UUID mismatch\n"));
}

#[tokio::test]
async fn test_missing_app_symbols_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let mut opts = options("crash_bare.json", root.path());
    opts.symbols_path = root.path().join("Missing.app.dSYM");

    let mut out = Vec::new();
    let err = pipeline::symbolicate(&opts, RecordingTranslator::default(), &mut out)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("does not exist"));
}

fn app_frame(address: u64) -> Value {
    json!({
        "binaryName": "MyApp",
        "binaryUUID": APP_UUID,
        "offsetIntoBinaryTextSegment": 0x1_0000_0000_u64,
        "address": address,
        "sampleCount": 1
    })
}

#[tokio::test]
async fn test_stack_overflow_depth_is_listed() {
    let root = tempfile::tempdir().unwrap();
    let mut chain = app_frame(0x1_0000_0000);
    for depth in 1..512_u64 {
        let mut parent = app_frame(0x1_0000_0000 + depth * 0x10);
        parent["subFrames"] = json!([chain]);
        chain = parent;
    }
    let report = json!({
        "crashDiagnostics": [{
            "diagnosticMetaData": {
                "osVersion": "iPhone OS 17.1 (21B80)",
                "deviceType": "iPhone15,2",
                "signal": 11
            },
            "callStackTree": {
                "callStackPerThread": true,
                "callStacks": [{ "threadAttributed": true, "callStackRootFrames": [chain] }]
            }
        }]
    });
    let report_path = root.path().join("overflow.json");
    std::fs::write(&report_path, report.to_string()).unwrap();

    let mut opts = options("crash_bare.json", root.path());
    opts.report_path = report_path;
    let translator = RecordingTranslator::default();
    let output = run(&opts, translator.clone()).await;

    assert!(output.contains("Attributed: Call stack 0:\n0   MyApp 0x0000000100001ff0 sym_1ff0 (in MyApp)\n"));
    assert!(output.contains("\n511 MyApp 0x0000000100000000 sym_0 (in MyApp)\n"));
    assert_eq!(translator.request_count(), 1);
    assert_eq!(translator.requests.lock().unwrap()[0].addresses.len(), 512);
}

#[tokio::test]
async fn test_repeated_address_across_diagnostics_translated_once() {
    let root = tempfile::tempdir().unwrap();
    let diagnostic = json!({
        "callStackTree": { "callStacks": [{ "callStackRootFrames": [app_frame(0x1_0000_4000)] }] }
    });
    let report = json!({
        "hangDiagnostics": [diagnostic.clone(), diagnostic.clone()],
        "cpuExceptionDiagnostics": [diagnostic]
    });
    let report_path = root.path().join("repeated.json");
    std::fs::write(&report_path, report.to_string()).unwrap();

    let mut opts = options("crash_bare.json", root.path());
    opts.report_path = report_path;
    let translator = RecordingTranslator::default();
    let output = run(&opts, translator.clone()).await;

    assert_eq!(output.matches("sym_4000 (in MyApp)").count(), 3);
    assert_eq!(translator.request_count(), 1);
    assert_eq!(translator.requests.lock().unwrap()[0].addresses, [0x1_0000_4000]);
}
