//! Candidate keyword extraction from raw document text.

use reelminer_shared::{Keyword, KeywordsConfig};

/// Extraction knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Marker line (matched case-insensitively on the trimmed line).
    pub marker: String,
    /// Trailing tokens taken when the marker is absent.
    pub tail_len: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            marker: "KEYWORDS".into(),
            tail_len: 10,
        }
    }
}

impl From<&KeywordsConfig> for ExtractOptions {
    fn from(config: &KeywordsConfig) -> Self {
        Self {
            marker: config.marker.clone(),
            tail_len: config.tail_len,
        }
    }
}

/// Extract ordered candidate keywords from `text`.
///
/// If a line equal to the marker exists, every token after the first such
/// line is a candidate. Otherwise the last `tail_len` tokens are. Tokens that
/// normalize to nothing are dropped; duplicates are kept.
pub fn extract_keywords(text: &str, opts: &ExtractOptions) -> Vec<Keyword> {
    let tokens: Vec<&str> = match after_marker(text, &opts.marker) {
        Some(rest) => rest.split_whitespace().collect(),
        None => {
            let all: Vec<&str> = text.split_whitespace().collect();
            let start = all.len().saturating_sub(opts.tail_len);
            all[start..].to_vec()
        }
    };

    tokens.into_iter().filter_map(Keyword::parse).collect()
}

/// Text following the first marker line, or `None` if there is no marker.
fn after_marker<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let marker = marker.trim();
    if marker.is_empty() {
        return None;
    }

    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offset += line.len();
        if line.trim().eq_ignore_ascii_case(marker) {
            return Some(&text[offset..]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(keywords: &[Keyword]) -> Vec<&str> {
        keywords.iter().map(Keyword::as_str).collect()
    }

    #[test]
    fn marker_line_takes_everything_after_it() {
        let text = "intro line\nKEYWORDS\nGato Perro, Gato!";
        let got = extract_keywords(text, &ExtractOptions::default());
        assert_eq!(words(&got), vec!["GATO", "PERRO", "GATO"]);
    }

    #[test]
    fn marker_is_case_insensitive_and_ignores_tail_rule() {
        let mut text = String::new();
        for i in 0..30 {
            text.push_str(&format!("palabra{i} "));
        }
        text.push_str("\n  keywords \r\n");
        for i in 0..12 {
            text.push_str(&format!("clave{i}\n"));
        }

        let got = extract_keywords(&text, &ExtractOptions::default());
        assert_eq!(got.len(), 12);
        assert_eq!(got[0].as_str(), "CLAVE0");
        assert_eq!(got[11].as_str(), "CLAVE11");
    }

    #[test]
    fn marker_inside_a_line_does_not_count() {
        let text = "these are KEYWORDS for you\nuno dos";
        let got = extract_keywords(text, &ExtractOptions::default());
        assert_eq!(words(&got), vec!["THESE", "ARE", "KEYWORDS", "FOR", "YOU", "UNO", "DOS"]);
    }

    #[test]
    fn marker_with_nothing_after_yields_nothing() {
        let text = "uno dos tres\nKEYWORDS\n";
        assert!(extract_keywords(text, &ExtractOptions::default()).is_empty());
    }

    #[test]
    fn without_marker_takes_last_ten() {
        let text = (1..=25).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let got = extract_keywords(&text, &ExtractOptions::default());
        assert_eq!(got.len(), 10);
        assert_eq!(got[0].as_str(), "W16");
        assert_eq!(got[9].as_str(), "W25");
    }

    #[test]
    fn short_documents_return_every_token_in_order() {
        for n in 0..10 {
            let text = (0..n).map(|i| format!("tok{i}")).collect::<Vec<_>>().join("\n ");
            let got = extract_keywords(&text, &ExtractOptions::default());
            assert_eq!(got.len(), n);
            for (i, kw) in got.iter().enumerate() {
                assert_eq!(kw.as_str(), format!("TOK{i}"));
            }
        }
    }

    #[test]
    fn tokens_that_normalize_to_nothing_are_dropped() {
        let text = "árbol — ¿? canción";
        let got = extract_keywords(text, &ExtractOptions::default());
        assert_eq!(words(&got), vec!["ARBOL", "CANCION"]);
    }

    #[test]
    fn custom_marker_and_tail() {
        let opts = ExtractOptions {
            marker: "TAGS:".into(),
            tail_len: 2,
        };
        assert_eq!(words(&extract_keywords("a b c d", &opts)), vec!["C", "D"]);
        assert_eq!(words(&extract_keywords("a\ntags:\nmar", &opts)), vec!["MAR"]);
    }
}
