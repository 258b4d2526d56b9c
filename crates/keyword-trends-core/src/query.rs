//! Keyword to full-text search expression translation.
//!
//! A keyword is looked up (lowercased) in a curated table of hand-tuned
//! `tsquery` expressions first. Curated entries disambiguate short or
//! overloaded words: `rust` must co-occur with a programming term and not
//! with `corrosion`, `go` must be adjacent to `lang` or close to a
//! programming term, and so on.
//!
//! Anything else is sanitized: quote characters and `tsquery` operator
//! characters become separators so user input cannot break out of the query
//! syntax, and multi-word input becomes a conjunction
//! (`machine learning` → `machine & learning`).
//!
//! # Example
//!
//! ```rust
//! use keyword_trends_core::query::QueryTranslator;
//!
//! let translator = QueryTranslator::with_defaults();
//! assert_eq!(translator.resolve("Python").as_str(), "python");
//! assert_eq!(translator.resolve("large language model").as_str(), "large & language & model");
//! ```

use std::collections::BTreeMap;

use crate::models::SearchExpression;

/// Built-in curated expressions, keyed by lowercase keyword.
pub const DEFAULT_QUERIES: &[(&str, &str)] = &[
    ("go", "golang | (go <-> lang) | (go <2> (programming | language | goroutine | channel | concurrency))"),
    ("rust", "rust & (programming | language | cargo | rustc | crate) & !corrosion & !metal"),
    ("c", "((c <-> programming) | (c <-> language) | (c <-> code)) & !vitamin & !temperature"),
    ("r", "(r <-> (language | programming | statistical | ggplot | dplyr | cran))"),
    ("scala", "scala & (programming | language | jvm | akka) & !opera"),
    ("dart", "dart & (flutter | programming | language | google) & !game & !arrow"),
    ("python", "python"),
    ("javascript", "javascript | js"),
    ("typescript", "typescript"),
    ("kotlin", "kotlin"),
    ("swift", "swift & (programming | ios | apple | language)"),
    ("java", "java & programming"),
    ("ruby", "ruby & (programming | rails | gem)"),
    ("php", "php"),
    ("haskell", "haskell"),
    ("elixir", "elixir & (programming | erlang | phoenix)"),
    ("clojure", "clojure"),
    ("julia", "julia & (programming | language | scientific)"),
    ("react", "react & (javascript | component | jsx | hook)"),
    ("vue", "vue & (javascript | vuejs | framework)"),
    ("angular", "angular & (javascript | typescript | framework)"),
    ("django", "django"),
    ("flask", "flask & python"),
    ("rails", "rails & ruby"),
    ("spring", "spring & java"),
    ("spark", "spark & (apache | hadoop | data | scala)"),
    ("beam", "beam & (apache | dataflow | pipeline)"),
];

/// Characters removed from free-form input before it reaches the backend.
const QUOTE_CHARS: &[char] = &['\'', '"', '`', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}'];

/// `tsquery` operators and grouping, also treated as separators.
const OPERATOR_CHARS: &[char] = &['&', '|', '!', '(', ')', '<', '>', ':', '*', '\\'];

/// Conjunction operator of the `tsquery` syntax.
const AND: &str = " & ";

/// Translates keywords into search expressions.
///
/// The curated table is plain data: start from [`QueryTranslator::with_defaults`]
/// or [`QueryTranslator::new`] and [`insert`](QueryTranslator::insert) entries
/// from configuration.
#[derive(Debug, Clone, Default)]
pub struct QueryTranslator {
    table: BTreeMap<String, String>,
}

impl QueryTranslator {
    /// A translator with an empty curated table (sanitization only).
    pub fn new() -> Self {
        Self::default()
    }

    /// A translator seeded with [`DEFAULT_QUERIES`].
    pub fn with_defaults() -> Self {
        let mut translator = Self::new();
        translator.extend(DEFAULT_QUERIES.iter().copied());
        translator
    }

    /// Add or replace a curated entry. The keyword is normalized the same way
    /// lookups are (trimmed, lowercased).
    pub fn insert(&mut self, keyword: &str, expression: impl Into<String>) {
        self.table.insert(normalize_key(keyword), expression.into());
    }

    pub fn extend<K, V>(&mut self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (keyword, expression) in entries {
            self.insert(keyword.as_ref(), expression);
        }
    }

    /// Curated expression for a keyword, if any.
    pub fn lookup(&self, keyword: &str) -> Option<&str> {
        self.table.get(&normalize_key(keyword)).map(String::as_str)
    }

    /// Resolve a keyword to the expression sent to the backend.
    ///
    /// Never fails. Whitespace-only input yields an empty expression.
    pub fn resolve(&self, keyword: &str) -> SearchExpression {
        let key = normalize_key(keyword);
        match self.table.get(&key) {
            Some(expression) => SearchExpression::new(expression.clone()),
            None => sanitize(&key),
        }
    }

    /// Curated keywords, sorted.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Curated `(keyword, expression)` pairs, sorted by keyword.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.table.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Turn free-form input into a conjunctive expression without quotes or
/// operators, so `to_tsquery` always accepts it.
///
/// Token order is preserved. Case is left untouched; [`QueryTranslator::resolve`]
/// lowercases before calling this.
pub fn sanitize(input: &str) -> SearchExpression {
    let unquoted: String = input
        .chars()
        .map(|c| {
            if QUOTE_CHARS.contains(&c) || OPERATOR_CHARS.contains(&c) {
                ' '
            } else {
                c
            }
        })
        .collect();
    let tokens: Vec<&str> = unquoted.split_whitespace().collect();
    SearchExpression::new(tokens.join(AND))
}

fn normalize_key(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}
