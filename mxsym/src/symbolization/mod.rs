//! # Symbol Location and Address Translation
//!
//! Turns the raw `(binary, UUID, load address, address)` tuples of a MetricKit
//! report into symbol names.
//!
//! ## Finding Symbol Files
//!
//! - **The app**: the user passes a DWARF file, a `.dSYM` bundle or an
//!   `.xcarchive` ([`AppSymbols`]).
//! - **OS binaries**: Xcode copies the symbols of every OS build it has seen
//!   from a device into `~/Library/Developer/Xcode/iOS DeviceSupport`. The
//!   directory matching the report's OS version is chosen first
//!   ([`DeviceSupport`]), then each binary is looked up inside its `Symbols/`
//!   tree through the [`PATH_RULES`] table ([`SystemSymbolLocator`]).
//!
//! A symbol file is only ever used if its embedded `LC_UUID` equals the UUID
//! the report recorded. Name matches alone are rejected: a library of the same
//! name from another build gives plausible but wrong symbols.
//!
//! ## Address Arithmetic
//!
//! ```text
//! offsetIntoBinaryTextSegment = 0x1a2b3c000   (load address, ASLR slide included)
//! address                     = 0x1a2b3d234   (instruction pointer)
//! atos -arch arm64e -o <file> -l 0x1a2b3c000 0x1a2b3d234
//! ```
//!
//! `atos` does the slide arithmetic itself when given the load address; the
//! [`Symbolicator`] only groups addresses so each (image, load address) pair
//! costs one subprocess.

pub mod device_support;
pub mod locator;
pub mod symbol_source;
pub mod symbolicator;
pub mod translator;
pub mod uuid_reader;

pub use device_support::{DeviceSupport, SelectionReason};
pub use locator::{candidate_paths, SystemSymbolLocator, PATH_RULES};
pub use symbol_source::{AppSymbols, SymbolSource};
pub use symbolicator::{
    Resolution, SymbolizedDiagnostic, SymbolizedFrame, SymbolizedStack, Symbolicator,
    UnresolvedReason,
};
pub use translator::{AddressTranslator, AtosTranslator, TranslationRequest, DEFAULT_TIMEOUT};
pub use uuid_reader::{MachOUuidReader, UuidReader};
