#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mxsym::domain::TranslateError;
use mxsym::symbolization::{AddressTranslator, TranslationRequest};
use uuid::Uuid;

pub const APP_UUID: &str = "8E3F4A1B-2C5D-4E6F-8A9B-0C1D2E3F4A5B";
pub const KERNEL_UUID: &str = "1B2C3D4E-5F60-4718-9A2B-3C4D5E6F7081";
pub const FOUNDATION_UUID: &str = "C0FFEE00-1111-4222-8333-444455556666";

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

pub fn uuid(text: &str) -> Uuid {
    Uuid::parse_str(text).expect("valid test UUID")
}

/// Smallest little-endian 64-bit Mach-O image carrying one `LC_UUID`.
pub fn macho_with_uuid(uuid: Uuid) -> Vec<u8> {
    let mut out = Vec::new();
    // magic, cputype (arm64), cpusubtype, filetype (dSYM), ncmds, sizeofcmds, flags, reserved
    for word in [0xfeed_facf_u32, 0x0100_000c, 0, 0xa, 1, 24, 0, 0] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.extend_from_slice(&0x1b_u32.to_le_bytes());
    out.extend_from_slice(&24_u32.to_le_bytes());
    out.extend_from_slice(uuid.as_bytes());
    out
}

pub fn write_macho(path: &Path, uuid: Uuid) {
    std::fs::create_dir_all(path.parent().expect("has parent")).expect("create dirs");
    std::fs::write(path, macho_with_uuid(uuid)).expect("write Mach-O");
}

/// `MyApp.app.dSYM` bundle with the app UUID.
pub fn app_dsym(root: &Path) -> PathBuf {
    let bundle = root.join("MyApp.app.dSYM");
    write_macho(&bundle.join("Contents/Resources/DWARF/MyApp"), uuid(APP_UUID));
    bundle
}

/// Device support root with one 17.1 directory holding `libsystem_kernel.dylib`.
pub fn device_support(root: &Path) -> PathBuf {
    let ds = root.join("iOS DeviceSupport");
    let dir = ds.join("iPhone15,2 17.1 (21B80)");
    write_macho(
        &dir.join("Symbols/usr/lib/system/libsystem_kernel.dylib"),
        uuid(KERNEL_UUID),
    );
    std::fs::create_dir_all(ds.join("iPhone15,2 16.6 (20G75)")).expect("create dir");
    ds
}

/// Answers `sym_<offset> (in <file>)` and records every request.
#[derive(Clone, Default)]
pub struct RecordingTranslator {
    pub requests: Arc<Mutex<Vec<TranslationRequest>>>,
}

impl RecordingTranslator {
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }
}

#[async_trait]
impl AddressTranslator for RecordingTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, TranslateError> {
        self.requests.lock().expect("lock").push(request.clone());
        let file = request
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(request
            .addresses
            .iter()
            .map(|addr| format!("sym_{:x} (in {file})", addr - request.load_address))
            .collect())
    }
}
