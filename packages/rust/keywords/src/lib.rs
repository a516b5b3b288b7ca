//! Keyword extraction and filtering.
//!
//! - [`extract_keywords`] turns document text into ordered candidates
//! - [`KeywordFilter`] drops stopwords, used keywords, over-frequent keywords
//!   and in-run repeats, reporting each removal with its reason
//! - [`Stopwords`] holds the built-in language lists

mod extract;
mod filter;
mod stopwords;

pub use extract::{ExtractOptions, extract_keywords};
pub use filter::{FilterOutcome, KeywordFilter, Removal, RemovalReason};
pub use stopwords::Stopwords;

use reelminer_shared::{KeywordsConfig, Result};

/// Build the filter described by the `[keywords]` config section.
pub fn filter_from_config(config: &KeywordsConfig) -> Result<KeywordFilter> {
    let stopwords = Stopwords::for_language(&config.language)?;
    Ok(KeywordFilter::new(stopwords, config.frequency_cap))
}
