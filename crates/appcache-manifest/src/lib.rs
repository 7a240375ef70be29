//! HTML5 application cache manifest documents and their text format.
//!
//! This crate is the pure data half of the appcache workspace: it knows the
//! shape of a manifest (fingerprint comment, NETWORK / FALLBACK / CACHE
//! sections) and how to render it byte-for-byte, and nothing about digesting,
//! change detection, or the filesystem. Those live in `appcache-compiler`.

mod document;

pub use document::{ManifestDocument, MANIFEST_HEADER};
