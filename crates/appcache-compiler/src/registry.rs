use regex::Regex;

/// Deduplicated, always-sorted collection of cacheable output paths.
///
/// Paths are pipeline-relative, forward-slash strings destined for the
/// manifest's CACHE section; they are manifest text, not filesystem paths.
/// The registry outlives batches: entries accumulate for the lifetime of
/// the compiler and are never removed here.
#[derive(Debug)]
pub struct PathRegistry {
    ignore: Regex,
    manifest_suffix: String,
    paths: Vec<String>,
}

impl PathRegistry {
    pub fn new(ignore: Regex, manifest_suffix: impl Into<String>) -> Self {
        Self {
            ignore,
            manifest_suffix: manifest_suffix.into(),
            paths: Vec::new(),
        }
    }

    /// Offers a path to the registry.
    ///
    /// The path is included iff it is not the manifest itself (suffix
    /// match), the ignore pattern finds no match in it, and it is not
    /// already present. Insertion keeps the list sorted. Returns whether
    /// *this* call inserted the path.
    pub fn consider(&mut self, path: &str) -> bool {
        if path.ends_with(&self.manifest_suffix) {
            return false;
        }
        if self.ignore.is_match(path) {
            return false;
        }
        match self
            .paths
            .binary_search_by(|existing| existing.as_str().cmp(path))
        {
            Ok(_) => false,
            Err(index) => {
                self.paths.insert(index, path.to_string());
                true
            }
        }
    }

    /// Current entries, lexicographically sorted.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Owned copy of the current entries, for bundling into a batch result.
    pub fn snapshot(&self) -> Vec<String> {
        self.paths.clone()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
