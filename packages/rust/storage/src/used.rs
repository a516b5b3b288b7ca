//! Set of keywords that already produced at least one download.

use std::collections::BTreeSet;

use reelminer_shared::Keyword;

/// Used-keyword set.
///
/// Membership is on the normalized keyword. The trimmed lines read from disk
/// are kept verbatim and written back as they were, so lines that do not
/// normalize (or normalize to something else, like `Gato,`) survive a
/// load/save cycle. Entries are sorted so the file is written deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedKeywords {
    keys: BTreeSet<Keyword>,
    entries: BTreeSet<String>,
}

impl UsedKeywords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, keyword: &Keyword) -> bool {
        self.keys.contains(keyword)
    }

    /// Add `keyword`. Returns `true` if it was not present before.
    pub fn insert(&mut self, keyword: Keyword) -> bool {
        if self.keys.contains(&keyword) {
            return false;
        }
        self.entries.insert(keyword.as_str().to_string());
        self.keys.insert(keyword)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.entries.clear();
    }

    /// Number of stored lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized keywords, sorted.
    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.keys.iter()
    }

    /// Stored lines as they appear in the file, sorted.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Parse the newline-delimited file format. Lines are trimmed and blank
    /// lines are ignored.
    pub fn parse(text: &str) -> Self {
        let mut used = Self::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            used.entries.insert(line.to_string());
            if let Some(keyword) = Keyword::parse(line) {
                used.keys.insert(keyword);
            }
        }
        used
    }

    /// Render the newline-delimited file format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out
    }
}

impl FromIterator<Keyword> for UsedKeywords {
    fn from_iter<I: IntoIterator<Item = Keyword>>(iter: I) -> Self {
        let mut used = Self::new();
        for keyword in iter {
            used.insert(keyword);
        }
        used
    }
}
