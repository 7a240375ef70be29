use std::collections::BTreeMap;
use std::fmt;

/// First line of every application cache manifest.
pub const MANIFEST_HEADER: &str = "CACHE MANIFEST";

/// One application cache manifest, ready to render.
///
/// The document is plain data: the compiler fills it from its batch result
/// and configuration, and [`render`](Self::render) turns it into the exact
/// bytes browsers parse. Rendering is pure; equal documents render equal
/// text.
///
/// Section layout (all line endings are `\n`):
///
/// ```text
/// CACHE MANIFEST
/// # <fingerprint>
///
/// NETWORK:
/// <one entry per line, in configured order>
///
/// FALLBACK:
/// <"<namespace> <url>" per pair, sorted by namespace>
///
/// CACHE:
/// <"<static_root>/<path>" per path, sorted by path>
/// <external entries, one per line, in configured order>
/// ```
///
/// An empty section contributes a single empty line. With no external
/// entries the document ends with exactly one newline after the last cache
/// line; external entries follow it and the last one ends the document
/// without a trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    /// Hex digest written on the `#` comment line. Clients re-fetch cached
    /// resources whenever this line changes, so it must change exactly when
    /// the cached content does.
    pub fingerprint: String,
    /// NETWORK section entries, rendered verbatim.
    pub network: Vec<String>,
    /// FALLBACK section: namespace prefix to fallback URL.
    pub fallback: BTreeMap<String, String>,
    /// Prefix joined (with `/`) onto every cache path at render time.
    pub static_root: String,
    /// Cacheable output paths, relative to the static root.
    pub cache_paths: Vec<String>,
    /// Extra CACHE section lines appended verbatim after the paths.
    pub external_entries: Vec<String>,
}

impl Default for ManifestDocument {
    fn default() -> Self {
        Self {
            fingerprint: String::new(),
            network: Vec::new(),
            fallback: BTreeMap::new(),
            static_root: ".".to_string(),
            cache_paths: Vec::new(),
            external_entries: Vec::new(),
        }
    }
}

impl ManifestDocument {
    /// Document with the given fingerprint and otherwise empty sections.
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            ..Self::default()
        }
    }

    /// Renders the manifest text.
    ///
    /// The CACHE section is sorted here even if `cache_paths` arrives
    /// unsorted, so the output format holds regardless of the caller;
    /// NETWORK and external entries keep their configured order.
    pub fn render(&self) -> String {
        let mut cache_paths = self.cache_paths.clone();
        cache_paths.sort();

        let network = self.network.join("\n");
        let fallback = self
            .fallback
            .iter()
            .map(|(namespace, url)| format!("{namespace} {url}"))
            .collect::<Vec<_>>()
            .join("\n");
        let cache = cache_paths
            .iter()
            .map(|path| format!("{}/{path}", self.static_root))
            .collect::<Vec<_>>()
            .join("\n");
        let external = self.external_entries.join("\n");

        format!(
            "{MANIFEST_HEADER}\n# {}\n\nNETWORK:\n{network}\n\nFALLBACK:\n{fallback}\n\nCACHE:\n{cache}\n{external}",
            self.fingerprint
        )
    }
}

impl fmt::Display for ManifestDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
