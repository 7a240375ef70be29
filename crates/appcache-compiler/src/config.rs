use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CompilerError;

/// Options for [`AppcacheCompiler`](crate::AppcacheCompiler).
///
/// Every field has a default, so an empty config deserializes to a working
/// setup. Field names are snake_case; the camelCase spellings used by older
/// configs are accepted as serde aliases. Loading and merging config files
/// is the host's job, this is only the typed surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppcacheConfig {
    /// Regex pattern; paths it matches are kept out of the CACHE section.
    /// The default skips any path segment starting with `.`.
    #[serde(default = "default_ignore")]
    pub ignore: String,

    /// Extra CACHE lines appended verbatim after the cacheable paths, for
    /// resources the build does not produce (CDN assets, sibling apps).
    #[serde(default, alias = "externalCacheEntries")]
    pub external_cache_entries: Vec<String>,

    /// NETWORK section entries. The default `*` whitelists everything not
    /// cached, which is what nearly every deployment wants.
    #[serde(default = "default_network")]
    pub network: Vec<String>,

    /// FALLBACK section: namespace prefix to the URL served when offline.
    #[serde(default)]
    pub fallback: BTreeMap<String, String>,

    /// Prefix joined onto every cache path in the rendered manifest.
    #[serde(default = "default_static_root", alias = "staticRoot")]
    pub static_root: String,

    /// Manifest file name, written inside the host's public directory.
    #[serde(default = "default_manifest_file", alias = "manifestFile")]
    pub manifest_file: String,
}

fn default_ignore() -> String {
    r"(^|[\\/])\.".to_string()
}

fn default_network() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_static_root() -> String {
    ".".to_string()
}

fn default_manifest_file() -> String {
    "appcache.appcache".to_string()
}

impl Default for AppcacheConfig {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
            external_cache_entries: Vec::new(),
            network: default_network(),
            fallback: BTreeMap::new(),
            static_root: default_static_root(),
            manifest_file: default_manifest_file(),
        }
    }
}

impl AppcacheConfig {
    /// Compiles the ignore pattern. Called once at compiler construction so
    /// a bad pattern fails fast instead of on the first file.
    pub fn ignore_matcher(&self) -> crate::Result<Regex> {
        Regex::new(&self.ignore).map_err(|source| CompilerError::InvalidIgnorePattern {
            pattern: self.ignore.clone(),
            source,
        })
    }

    /// Suffix that identifies the manifest itself, derived from
    /// [`manifest_file`](Self::manifest_file)'s extension. The manifest must
    /// never list itself: a cached manifest pins clients to a stale cache.
    pub fn manifest_suffix(&self) -> String {
        match Path::new(&self.manifest_file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(ext) if !ext.is_empty() => format!(".{ext}"),
            _ => ".appcache".to_string(),
        }
    }
}
