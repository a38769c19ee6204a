//! MemeFill Assets - overlay library
//!
//! Loads overlay files from a folder-per-category tree and draws random
//! samples from the categories a user selected.

pub mod library;

pub use library::{AssetKind, AssetLibrary, SUPPORTED_EXTENSIONS};
