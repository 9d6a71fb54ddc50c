//! Helpers for mapping between directory paths and object key prefixes
pub const SEPARATOR: char = '/';

/// Joins path segments into a listing prefix.
///
/// The result ends with the separator unless it is the root (empty) prefix.
/// Segments are folder names as the store reported them and are kept
/// verbatim, separators included, since `a/` and `a//` are different
/// prefixes. Empty segments are skipped.
pub fn normalize_prefix<S: AsRef<str>>(segments: &[S]) -> String {
    let mut prefix = String::new();
    for segment in segments.iter().map(AsRef::as_ref) {
        if segment.is_empty() {
            continue;
        }
        prefix.push_str(segment);
        prefix.push(SEPARATOR);
    }
    prefix
}

/// Makes sure a non-empty prefix ends with the separator
pub fn ensure_trailing_separator(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with(SEPARATOR) {
        prefix.to_owned()
    } else {
        format!("{}{}", prefix, SEPARATOR)
    }
}

/// Returns the part of `key` below `prefix`, if `key` lives under it
pub fn strip_prefix<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)
}

/// Ordered path segments of the directory being browsed; empty is the root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DirectoryPath {
    segments: Vec<String>,
}

impl DirectoryPath {
    pub fn root() -> DirectoryPath {
        DirectoryPath::default()
    }

    pub fn from_segments<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> DirectoryPath {
        DirectoryPath {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Path one level deeper; `segment` is a folder name taken verbatim
    pub fn child(&self, segment: &str) -> DirectoryPath {
        let mut segments = self.segments.clone();
        if !segment.is_empty() {
            segments.push(segment.to_owned());
        }
        DirectoryPath { segments }
    }

    /// Path one level up; the root is its own parent
    pub fn parent(&self) -> DirectoryPath {
        let mut segments = self.segments.clone();
        segments.pop();
        DirectoryPath { segments }
    }

    pub fn prefix(&self) -> String {
        normalize_prefix(&self.segments)
    }

    /// Header text: "My Files" at the root, segments joined by " / " below it
    pub fn display(&self) -> String {
        if self.is_root() {
            String::from("My Files")
        } else {
            self.segments.join(" / ")
        }
    }
}
