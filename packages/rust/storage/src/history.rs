//! Per-document keyword history.
//!
//! On disk this is a JSON object `{ "<document>": ["KW", ...] }`. In memory it
//! is an ordered list of records so "most recent" never depends on map
//! iteration order: the last record is the latest extraction.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use reelminer_shared::Keyword;

/// Keywords extracted from one document on its latest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub document: String,
    pub keywords: Vec<Keyword>,
}

/// Ordered document → keywords history. Document names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordHistory {
    records: Vec<HistoryRecord>,
}

impl KeywordHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `document` and make it the most recent record.
    pub fn record(&mut self, document: impl Into<String>, keywords: Vec<Keyword>) {
        let document = document.into();
        self.records.retain(|r| r.document != document);
        self.records.push(HistoryRecord { document, keywords });
    }

    /// Keywords stored for `document`, if any.
    pub fn get(&self, document: &str) -> Option<&[Keyword]> {
        self.records
            .iter()
            .find(|r| r.document == document)
            .map(|r| r.keywords.as_slice())
    }

    /// The most recently recorded document.
    pub fn latest(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// How many times `keyword` appears across every stored keyword list.
    pub fn occurrences(&self, keyword: &Keyword) -> usize {
        self.records
            .iter()
            .flat_map(|r| r.keywords.iter())
            .filter(|k| *k == keyword)
            .count()
    }
}

impl Serialize for KeywordHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(&record.document, &record.keywords)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for KeywordHistory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(HistoryVisitor)
    }
}

struct HistoryVisitor;

impl<'de> Visitor<'de> for HistoryVisitor {
    type Value = KeywordHistory;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of document names to keyword lists")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut history = KeywordHistory::new();
        while let Some((document, raw)) = access.next_entry::<String, Vec<String>>()? {
            // Hand-edited files may hold unnormalized words.
            let keywords = raw.iter().filter_map(|w| Keyword::parse(w)).collect();
            history.record(document, keywords);
        }
        Ok(history)
    }
}
