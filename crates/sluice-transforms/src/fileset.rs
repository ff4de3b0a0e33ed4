//! In-memory file sets flowing through a pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A single file in a [`FileSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Raw file contents
    pub contents: Vec<u8>,

    /// Absolute path the file was read from, if it came from disk
    pub origin: Option<PathBuf>,
}

impl FileEntry {
    /// Create an entry with no on-disk origin.
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: contents.into(),
            origin: None,
        }
    }

    /// Create an entry that remembers where it was read from.
    pub fn with_origin(contents: impl Into<Vec<u8>>, origin: impl Into<PathBuf>) -> Self {
        Self {
            contents: contents.into(),
            origin: Some(origin.into()),
        }
    }

    /// Contents as UTF-8 text, if valid.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}

/// A collection of files keyed by logical path.
///
/// Logical paths are relative and always use `/` as separator. Iteration is
/// sorted by logical path, so anything derived from a set is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeMap<String, FileEntry>,
}

impl FileSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, replacing any previous entry at the same logical path.
    pub fn insert(&mut self, path: impl AsRef<str>, entry: FileEntry) -> Option<FileEntry> {
        self.files.insert(normalize_logical(path.as_ref()), entry)
    }

    /// Look up a file by logical path.
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.files.get(&normalize_logical(path))
    }

    /// Remove a file by logical path.
    pub fn remove(&mut self, path: &str) -> Option<FileEntry> {
        self.files.remove(&normalize_logical(path))
    }

    /// Whether a logical path is present.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_logical(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Logical paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileEntry)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for FileSet {
    type Item = (String, FileEntry);
    type IntoIter = std::collections::btree_map::IntoIter<String, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<S: AsRef<str>> FromIterator<(S, FileEntry)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (S, FileEntry)>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for (path, entry) in iter {
            set.insert(path, entry);
        }
        set
    }
}

/// Convert a relative filesystem path into a logical path.
pub fn logical_path(relative: &Path) -> String {
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    normalize_logical(&joined)
}

/// Replace the extension of a logical path.
pub fn with_extension(path: &str, ext: &str) -> String {
    let (dir, file) = match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    };
    let stem = match file.rfind('.') {
        Some(0) | None => file,
        Some(idx) => &file[..idx],
    };
    format!("{}{}.{}", dir, stem, ext)
}

/// Extension of a logical path, lowercased.
pub fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn normalize_logical(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_logical_paths() {
        let mut set = FileSet::new();
        set.insert("./css//spaces.css", FileEntry::new("a"));

        assert!(set.contains("css/spaces.css"));
        assert_eq!(set.paths().collect::<Vec<_>>(), vec!["css/spaces.css"]);
    }

    #[test]
    fn iterates_in_sorted_order() {
        let set: FileSet = [
            ("b.html", FileEntry::new("b")),
            ("a/z.html", FileEntry::new("z")),
            ("a.html", FileEntry::new("a")),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            set.paths().collect::<Vec<_>>(),
            vec!["a.html", "a/z.html", "b.html"]
        );
    }

    #[test]
    fn replaces_extensions() {
        assert_eq!(with_extension("spaces.scss", "css"), "spaces.css");
        assert_eq!(with_extension("spaces/grid.v2.scss", "css"), "spaces/grid.v2.css");
        assert_eq!(with_extension("dir.d/README", "md"), "dir.d/README.md");
        assert_eq!(with_extension(".hidden", "css"), ".hidden.css");
    }

    #[test]
    fn builds_logical_path_from_relative_path() {
        let rel = Path::new("spaces").join("_grid.scss");
        assert_eq!(logical_path(&rel), "spaces/_grid.scss");
    }
}
