//! Build fuzzy name patterns from partial user input.
//!
//! A [`FuzzyPattern`] matches any name that contains the title-cased query's
//! characters in order, with arbitrary text between them. `"mon"` becomes the
//! regular expression `M.*?o.*?n`, which matches `"Montreal"` but not
//! `"Edmonton"`: matching is case-sensitive and the first character is
//! title-cased.

use regex::Regex;

/// Filler inserted between consecutive query characters.
const FILLER: &str = ".*?";

/// Fuzzy matcher derived from a partial city name.
///
/// The builder is infallible; compiling the expression is deferred to the
/// catalog that evaluates it, see [`FuzzyPattern::compile`].
///
/// # Examples
///
/// ```
/// use cityscout_core::FuzzyPattern;
///
/// let pattern = FuzzyPattern::build("mon");
/// assert_eq!(pattern.title_cased(), "Mon");
/// assert_eq!(pattern.as_str(), "M.*?o.*?n");
///
/// let regex = pattern.compile()?;
/// assert!(regex.is_match("Montreal"));
/// assert!(!regex.is_match("Edmonton"));
/// # Ok::<(), regex::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyPattern {
    title_cased: String,
    source: String,
}

impl FuzzyPattern {
    /// Title-case `query` and join its characters with lazy filler.
    ///
    /// Every character is escaped, so punctuation in the query (`.`, `(`,
    /// `*`) is matched literally.
    #[must_use]
    pub fn build(query: &str) -> Self {
        let title_cased = title_case(query);
        let source = title_cased
            .chars()
            .map(|ch| regex::escape(ch.encode_utf8(&mut [0_u8; 4])))
            .collect::<Vec<_>>()
            .join(FILLER);
        Self {
            title_cased,
            source,
        }
    }

    /// The query after title-casing.
    #[must_use]
    pub fn title_cased(&self) -> &str {
        &self.title_cased
    }

    /// Regular-expression source, suitable for SQL `REGEXP` operators.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `name` contains the title-cased query's characters in order.
    ///
    /// Agrees with the compiled expression for single-line names without
    /// building a [`Regex`], which suits in-memory catalogs.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        let mut remaining = name.chars();
        self.title_cased
            .chars()
            .all(|wanted| remaining.any(|ch| ch == wanted))
    }

    /// Compile the pattern into a [`Regex`].
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] when the expression exceeds the regex size
    /// limits, which only happens for extremely long queries.
    pub fn compile(&self) -> Result<Regex, regex::Error> {
        Regex::new(&self.source)
    }
}

/// Title-case a string.
///
/// A cased character is uppercased when it follows an uncased character (or
/// starts the string) and lowercased otherwise. Word boundaries are therefore
/// any non-letter, not only whitespace: `"saint-jean"` becomes `"Saint-Jean"`.
#[must_use]
pub fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut previous_cased = false;
    for ch in input.chars() {
        let cased = ch.is_uppercase() || ch.is_lowercase();
        if previous_cased {
            output.extend(ch.to_lowercase());
        } else {
            output.extend(ch.to_uppercase());
        }
        previous_cased = cased;
    }
    output
}
