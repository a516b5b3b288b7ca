//! Built-in stopword lists.
//!
//! Lists are stored as written and normalized once on first use, so lookups
//! compare against the same accent-free lowercase form keywords produce.

use std::collections::HashSet;
use std::sync::LazyLock;

use reelminer_shared::{Keyword, ReelMinerError, Result};

const SPANISH: &[&str] = &[
    "a", "al", "algo", "algunas", "algunos", "ante", "antes", "aquel", "aquella", "aquellas",
    "aquellos", "aqui", "así", "aunque", "bien", "cada", "casi", "como", "con", "contra",
    "cual", "cuales", "cuando", "de", "del", "desde", "donde", "dos", "durante", "e", "el",
    "él", "ella", "ellas", "ellos", "en", "entre", "era", "eran", "es", "esa", "esas", "ese",
    "eso", "esos", "esta", "está", "estaba", "estado", "estan", "están", "estar", "estas",
    "este", "esto", "estos", "fue", "fueron", "ha", "había", "habia", "han", "hasta", "hay",
    "la", "las", "le", "les", "lo", "los", "más", "me", "mi", "mis", "mucho", "muy", "nada",
    "ni", "no", "nos", "nosotros", "nuestra", "nuestro", "o", "os", "otra", "otras", "otro",
    "otros", "para", "pero", "poco", "por", "porque", "que", "qué", "quien", "quienes", "se",
    "sea", "ser", "si", "sí", "sin", "sobre", "son", "su", "sus", "también", "tan", "tanto",
    "te", "tiene", "tienen", "todo", "todos", "tu", "tus", "un", "una", "unas", "uno", "unos",
    "usted", "ustedes", "y", "ya", "yo",
];

const ENGLISH: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "but", "by", "can", "could", "did", "do", "does", "for", "from", "had",
    "has", "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "just", "me", "more", "my", "no", "not", "of", "on", "or", "our", "out", "she", "so",
    "some", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "to", "up", "was", "we", "were", "what", "when", "which", "who", "will", "with", "would",
    "you", "your",
];

static SPANISH_SET: LazyLock<Stopwords> = LazyLock::new(|| Stopwords::from_words(SPANISH.iter().copied()));
static ENGLISH_SET: LazyLock<Stopwords> = LazyLock::new(|| Stopwords::from_words(ENGLISH.iter().copied()));

/// A set of lowercase, accent-free stopwords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// Build a set from arbitrary words; each is normalized like a keyword.
    pub fn from_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            words: words
                .into_iter()
                .filter_map(Keyword::parse)
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// The built-in list for a language code (`es`, `en`).
    pub fn for_language(code: &str) -> Result<Self> {
        match code.to_ascii_lowercase().as_str() {
            "es" | "spanish" => Ok(SPANISH_SET.clone()),
            "en" | "english" => Ok(ENGLISH_SET.clone()),
            other => Err(ReelMinerError::config(format!(
                "unsupported stopword language '{other}': expected 'es' or 'en'"
            ))),
        }
    }

    /// Whether `keyword`'s lowercase form is a stopword.
    pub fn contains(&self, keyword: &Keyword) -> bool {
        self.words.contains(&keyword.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
