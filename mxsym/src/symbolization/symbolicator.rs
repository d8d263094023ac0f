//! Batched symbolication of every frame in a report.
//!
//! Frames are grouped by binary image and then by load address, so the
//! translator runs once per (image, load address) with only the addresses not
//! already known. Failures never leave this module as errors: they become
//! per-frame unresolved reasons plus an entry in the unresolved-binaries list.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use log::{debug, info, warn};
use uuid::Uuid;

use super::locator::SystemSymbolLocator;
use super::symbol_source::{AppSymbols, SymbolSource};
use super::translator::{is_unsymbolicated, AddressTranslator, TranslationRequest};
use super::uuid_reader::UuidReader;
use crate::domain::{BinaryKey, LocateError, TranslateError};
use crate::report::{CallStack, Diagnostic, DiagnosticReport, Frame};

/// Why a frame has no symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    MissingFrameInfo,
    SymbolsNotFound,
    UuidMismatch,
    TranslationFailed(String),
    NoMatch,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::MissingFrameInfo => f.write_str("missing information in frame"),
            UnresolvedReason::SymbolsNotFound => f.write_str("symbols not found"),
            UnresolvedReason::UuidMismatch => f.write_str("UUID mismatch"),
            UnresolvedReason::TranslationFailed(msg) => write!(f, "translation failed: {msg}"),
            UnresolvedReason::NoMatch => f.write_str("no match"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Symbol(String),
    Unresolved(UnresolvedReason),
}

impl Resolution {
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Resolution::Symbol(s) => Some(s),
            Resolution::Unresolved(_) => None,
        }
    }
}

/// A report frame with its resolution, mirroring the report's tree.
#[derive(Debug, Clone)]
pub struct SymbolizedFrame<'a> {
    pub frame: &'a Frame,
    pub resolution: Resolution,
    pub sub_frames: Vec<SymbolizedFrame<'a>>,
}

#[derive(Debug, Clone)]
pub struct SymbolizedStack<'a> {
    pub stack: &'a CallStack,
    pub roots: Vec<SymbolizedFrame<'a>>,
}

#[derive(Debug, Clone)]
pub struct SymbolizedDiagnostic<'a> {
    pub diagnostic: &'a Diagnostic,
    pub call_stacks: Vec<SymbolizedStack<'a>>,
}

/// (UUID, load address, address). The load address is part of the key because
/// the same image can be loaded at different slides in one report.
type CacheKey = (Uuid, u64, u64);

pub struct Symbolicator<T, R> {
    translator: T,
    app: AppSymbols,
    locator: SystemSymbolLocator<R>,
    system_arch: String,
    sources: HashMap<BinaryKey, Result<SymbolSource, UnresolvedReason>>,
    cache: HashMap<CacheKey, Resolution>,
    unresolved: BTreeMap<BinaryKey, String>,
    invocations: usize,
}

impl<T: AddressTranslator, R: UuidReader> Symbolicator<T, R> {
    pub fn new(
        translator: T,
        app: AppSymbols,
        locator: SystemSymbolLocator<R>,
        system_arch: impl Into<String>,
    ) -> Self {
        Self {
            translator,
            app,
            locator,
            system_arch: system_arch.into(),
            sources: HashMap::new(),
            cache: HashMap::new(),
            unresolved: BTreeMap::new(),
            invocations: 0,
        }
    }

    /// Resolve every frame of `report`.
    pub async fn symbolicate<'a>(
        &mut self,
        report: &'a DiagnosticReport,
    ) -> Vec<SymbolizedDiagnostic<'a>> {
        // binary -> load address -> distinct addresses
        let mut batches: BTreeMap<BinaryKey, BTreeMap<u64, BTreeSet<u64>>> = BTreeMap::new();
        for image in report.frames().filter_map(Frame::image) {
            batches
                .entry(image.binary)
                .or_default()
                .entry(image.load_address)
                .or_default()
                .insert(image.address);
        }

        debug!("{} binary images referenced", batches.len());

        for (binary, loads) in batches {
            match self.source(&binary) {
                Ok(source) => {
                    for (load_address, addresses) in loads {
                        self.translate_batch(&binary, &source, load_address, addresses).await;
                    }
                }
                Err(reason) => {
                    for (load_address, addresses) in loads {
                        for address in addresses {
                            self.cache.insert(
                                (binary.uuid, load_address, address),
                                Resolution::Unresolved(reason.clone()),
                            );
                        }
                    }
                }
            }
        }

        report
            .diagnostics
            .iter()
            .map(|diagnostic| SymbolizedDiagnostic {
                diagnostic,
                call_stacks: diagnostic
                    .call_stack_tree
                    .call_stacks
                    .iter()
                    .map(|stack| SymbolizedStack {
                        stack,
                        roots: stack.root_frames.iter().map(|f| self.build(f)).collect(),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Binaries with at least one unresolved batch, with the first reason seen.
    #[must_use]
    pub fn unresolved_binaries(&self) -> Vec<(BinaryKey, String)> {
        self.unresolved.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Number of translator invocations so far.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    fn source(&mut self, binary: &BinaryKey) -> Result<SymbolSource, UnresolvedReason> {
        if let Some(known) = self.sources.get(binary) {
            return known.clone();
        }

        let source = if binary.name == self.app.name {
            self.app.source_for(binary.uuid).ok_or_else(|| {
                warn!("{binary}: does not match the app symbol file {}", self.app.path.display());
                UnresolvedReason::UuidMismatch
            })
        } else {
            match self.locator.locate(&binary.name, binary.uuid) {
                Ok(path) => Ok(SymbolSource {
                    path,
                    uuid: binary.uuid,
                    arch: self.system_arch.clone(),
                }),
                Err(LocateError::UuidMismatch { .. }) => Err(UnresolvedReason::UuidMismatch),
                Err(LocateError::NotFound | LocateError::NoDeviceSupport) => {
                    Err(UnresolvedReason::SymbolsNotFound)
                }
            }
        };

        if let Err(reason) = &source {
            self.unresolved.entry(binary.clone()).or_insert_with(|| reason.to_string());
        }
        self.sources.insert(binary.clone(), source.clone());
        source
    }

    async fn translate_batch(
        &mut self,
        binary: &BinaryKey,
        source: &SymbolSource,
        load_address: u64,
        addresses: BTreeSet<u64>,
    ) {
        let pending: Vec<u64> = addresses
            .into_iter()
            .filter(|addr| !self.cache.contains_key(&(binary.uuid, load_address, *addr)))
            .collect();

        if pending.is_empty() {
            debug!("{binary} @ {load_address:#x}: all addresses cached");
            return;
        }

        let request = TranslationRequest {
            path: source.path.clone(),
            arch: source.arch.clone(),
            load_address,
            addresses: pending,
        };

        self.invocations += 1;
        let outcome = match self.translator.translate(&request).await {
            Ok(lines) if lines.len() == request.addresses.len() => Ok(lines),
            Ok(lines) => Err(TranslateError::LineCountMismatch {
                expected: request.addresses.len(),
                actual: lines.len(),
            }),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(lines) => {
                info!("{binary}: resolved {} address(es) @ {load_address:#x}", lines.len());
                for (address, line) in request.addresses.iter().zip(lines) {
                    let resolution = if is_unsymbolicated(&line) {
                        Resolution::Unresolved(UnresolvedReason::NoMatch)
                    } else {
                        Resolution::Symbol(line)
                    };
                    self.cache.insert((binary.uuid, load_address, *address), resolution);
                }
            }
            Err(e) => {
                warn!("{binary}: {e}");
                self.unresolved.entry(binary.clone()).or_insert_with(|| e.to_string());
                let reason = UnresolvedReason::TranslationFailed(e.to_string());
                for address in &request.addresses {
                    self.cache.insert(
                        (binary.uuid, load_address, *address),
                        Resolution::Unresolved(reason.clone()),
                    );
                }
            }
        }
    }

    fn build<'a>(&self, frame: &'a Frame) -> SymbolizedFrame<'a> {
        let resolution = match frame.image() {
            None => Resolution::Unresolved(UnresolvedReason::MissingFrameInfo),
            Some(image) => self
                .cache
                .get(&(image.binary.uuid, image.load_address, image.address))
                .cloned()
                .unwrap_or(Resolution::Unresolved(UnresolvedReason::SymbolsNotFound)),
        };

        SymbolizedFrame {
            frame,
            resolution,
            sub_frames: frame.sub_frames.iter().map(|child| self.build(child)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SymbolFileError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    const APP_UUID: &str = "11111111-2222-3333-4444-555555555555";

    /// Answers `sym_<offset>` for every address; offsets ending in 0xfff are unknown.
    #[derive(Default)]
    struct FakeTranslator {
        requests: Mutex<Vec<TranslationRequest>>,
    }

    #[async_trait]
    impl AddressTranslator for FakeTranslator {
        async fn translate(
            &self,
            request: &TranslationRequest,
        ) -> Result<Vec<String>, TranslateError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(request
                .addresses
                .iter()
                .map(|addr| {
                    let offset = addr - request.load_address;
                    if offset & 0xfff == 0xfff {
                        format!("{addr:#x}")
                    } else {
                        format!("sym_{offset:x}")
                    }
                })
                .collect())
        }
    }

    struct NoFiles;

    impl UuidReader for NoFiles {
        fn read_uuids(&self, path: &Path) -> Result<Vec<Uuid>, SymbolFileError> {
            Err(SymbolFileError::NotFound(path.to_path_buf()))
        }
    }

    fn app() -> AppSymbols {
        AppSymbols {
            name: "MyApp".to_string(),
            path: PathBuf::from("/dsym/MyApp"),
            uuids: vec![Uuid::parse_str(APP_UUID).unwrap()],
            arch: "arm64".to_string(),
        }
    }

    fn symbolicator() -> Symbolicator<FakeTranslator, NoFiles> {
        Symbolicator::new(
            FakeTranslator::default(),
            app(),
            SystemSymbolLocator::new(None, NoFiles),
            "arm64e",
        )
    }

    fn app_frame(address: u64, children: Vec<serde_json::Value>) -> serde_json::Value {
        json!({
            "binaryName": "MyApp",
            "binaryUUID": APP_UUID,
            "offsetIntoBinaryTextSegment": 0x1000_0000,
            "address": address,
            "subFrames": children
        })
    }

    fn report(roots: Vec<serde_json::Value>) -> DiagnosticReport {
        DiagnosticReport::from_value(&json!({
            "hangDiagnostics": [{
                "callStackTree": { "callStacks": [{ "callStackRootFrames": roots }] }
            }]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_same_address_translated_once() {
        let report = report(vec![
            app_frame(0x1000_0010, vec![app_frame(0x1000_0020, vec![])]),
            app_frame(0x1000_0010, vec![app_frame(0x1000_0030, vec![])]),
        ]);

        let mut sym = symbolicator();
        let first = sym.symbolicate(&report).await;
        let _ = sym.symbolicate(&report).await;

        let requests = sym.translator.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].addresses, [0x1000_0010, 0x1000_0020, 0x1000_0030]);
        assert_eq!(requests[0].arch, "arm64");
        assert_eq!(sym.invocations(), 1);

        let root = &first[0].call_stacks[0].roots[0];
        assert_eq!(root.resolution.symbol(), Some("sym_10"));
        assert_eq!(root.sub_frames[0].resolution.symbol(), Some("sym_20"));
    }

    #[tokio::test]
    async fn test_no_match_only_affects_that_frame() {
        let report = report(vec![app_frame(0x1000_0fff, vec![app_frame(0x1000_0040, vec![])])]);

        let mut sym = symbolicator();
        let out = sym.symbolicate(&report).await;
        let root = &out[0].call_stacks[0].roots[0];
        assert_eq!(root.resolution, Resolution::Unresolved(UnresolvedReason::NoMatch));
        assert_eq!(root.sub_frames[0].resolution.symbol(), Some("sym_40"));
        assert!(sym.unresolved_binaries().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_system_binary_skips_translator() {
        let report = report(vec![json!({
            "binaryName": "libsystem_kernel.dylib",
            "binaryUUID": "AAAAAAAA-2222-3333-4444-555555555555",
            "offsetIntoBinaryTextSegment": 0x1_d000_0000_u64,
            "address": 0x1_d000_1234_u64,
            "subFrames": [app_frame(0x1000_0050, vec![]), { "binaryName": "???" }]
        })]);

        let mut sym = symbolicator();
        let out = sym.symbolicate(&report).await;
        let root = &out[0].call_stacks[0].roots[0];

        assert_eq!(root.resolution, Resolution::Unresolved(UnresolvedReason::SymbolsNotFound));
        assert_eq!(root.sub_frames[0].resolution.symbol(), Some("sym_50"));
        assert_eq!(
            root.sub_frames[1].resolution,
            Resolution::Unresolved(UnresolvedReason::MissingFrameInfo)
        );
        assert_eq!(sym.invocations(), 1);

        let unresolved = sym.unresolved_binaries();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].0.name, "libsystem_kernel.dylib");
        assert_eq!(unresolved[0].1, "symbols not found");
    }

    #[tokio::test]
    async fn test_app_uuid_mismatch() {
        let report = report(vec![json!({
            "binaryName": "MyApp",
            "binaryUUID": "99999999-2222-3333-4444-555555555555",
            "offsetIntoBinaryTextSegment": 0x1000_0000,
            "address": 0x1000_0010
        })]);

        let mut sym = symbolicator();
        let out = sym.symbolicate(&report).await;
        assert_eq!(
            out[0].call_stacks[0].roots[0].resolution,
            Resolution::Unresolved(UnresolvedReason::UuidMismatch)
        );
        assert_eq!(sym.invocations(), 0);
    }

    struct ShortTranslator;

    #[async_trait]
    impl AddressTranslator for ShortTranslator {
        async fn translate(
            &self,
            _request: &TranslationRequest,
        ) -> Result<Vec<String>, TranslateError> {
            Ok(vec!["only one line".to_string()])
        }
    }

    #[tokio::test]
    async fn test_line_count_mismatch_fails_batch() {
        let report = report(vec![app_frame(0x1000_0010, vec![app_frame(0x1000_0020, vec![])])]);

        let mut sym =
            Symbolicator::new(ShortTranslator, app(), SystemSymbolLocator::new(None, NoFiles), "arm64e");
        let out = sym.symbolicate(&report).await;
        let root = &out[0].call_stacks[0].roots[0];
        assert!(matches!(
            root.resolution,
            Resolution::Unresolved(UnresolvedReason::TranslationFailed(_))
        ));
        assert_eq!(sym.unresolved_binaries()[0].1, "expected 2 output lines, got 1");
    }

    /// Times out for system libraries, answers for everything else.
    struct KernelTimesOut;

    #[async_trait]
    impl AddressTranslator for KernelTimesOut {
        async fn translate(
            &self,
            request: &TranslationRequest,
        ) -> Result<Vec<String>, TranslateError> {
            if request.path.ends_with("libsystem_kernel.dylib") {
                return Err(TranslateError::Timeout {
                    program: "atos".to_string(),
                    timeout: std::time::Duration::from_secs(30),
                });
            }
            Ok(request.addresses.iter().map(|addr| format!("app_{addr:x}")).collect())
        }
    }

    /// Every existing file carries the same UUID.
    struct FixedUuid(Uuid);

    impl UuidReader for FixedUuid {
        fn read_uuids(&self, _path: &Path) -> Result<Vec<Uuid>, SymbolFileError> {
            Ok(vec![self.0])
        }
    }

    #[tokio::test]
    async fn test_failed_batch_only_affects_its_binary() {
        let kernel_uuid = Uuid::parse_str("AAAAAAAA-2222-3333-4444-555555555555").unwrap();
        let device = tempfile::tempdir().unwrap();
        let dylib = device.path().join("Symbols/usr/lib/system/libsystem_kernel.dylib");
        std::fs::create_dir_all(dylib.parent().unwrap()).unwrap();
        std::fs::write(&dylib, b"").unwrap();

        let report = report(vec![json!({
            "binaryName": "libsystem_kernel.dylib",
            "binaryUUID": "AAAAAAAA-2222-3333-4444-555555555555",
            "offsetIntoBinaryTextSegment": 0x1_d000_0000_u64,
            "address": 0x1_d000_1234_u64,
            "subFrames": [app_frame(0x1000_0050, vec![app_frame(0x1000_0060, vec![])])]
        })]);

        let mut sym = Symbolicator::new(
            KernelTimesOut,
            app(),
            SystemSymbolLocator::new(Some(device.path()), FixedUuid(kernel_uuid)),
            "arm64e",
        );
        let out = sym.symbolicate(&report).await;
        let root = &out[0].call_stacks[0].roots[0];

        assert!(matches!(
            &root.resolution,
            Resolution::Unresolved(UnresolvedReason::TranslationFailed(msg)) if msg.contains("timed out")
        ));
        assert_eq!(root.sub_frames[0].resolution.symbol(), Some("app_10000050"));
        assert_eq!(root.sub_frames[0].sub_frames[0].resolution.symbol(), Some("app_10000060"));
        assert_eq!(sym.invocations(), 2);

        let unresolved = sym.unresolved_binaries();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].0.name, "libsystem_kernel.dylib");
    }
}
