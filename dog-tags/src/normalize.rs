//! # Name normalization
//!
//! Every equality or ordering decision on tag names goes through
//! [`normalize`], which turns a raw name into a comparison key under the
//! current [`CaseSensitivity`]. The policy itself lives in a shared
//! [`CasePolicy`] handle so it can be flipped at runtime; callers read it
//! at each decision point instead of caching the answer.
//!
//! ```rust
//! use dog_tags::normalize::{normalize, CaseSensitivity};
//!
//! assert_eq!(normalize("Ruby", CaseSensitivity::CaseInsensitive), "ruby");
//! assert_eq!(normalize("Ruby", CaseSensitivity::StrictCaseMatch), "Ruby");
//! ```

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::TagError;

/// Escape character used in generated `LIKE` patterns
pub const LIKE_ESCAPE: char = '!';

/// How tag names are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CaseSensitivity {
    /// Byte-exact comparison, no folding
    StrictCaseMatch,
    /// Unicode-aware lowercase comparison
    #[default]
    CaseInsensitive,
}

impl CaseSensitivity {
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::StrictCaseMatch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrictCaseMatch => "strict",
            Self::CaseInsensitive => "insensitive",
        }
    }
}

impl FromStr for CaseSensitivity {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" | "strict_case_match" | "true" => Ok(Self::StrictCaseMatch),
            "insensitive" | "case_insensitive" | "false" => Ok(Self::CaseInsensitive),
            other => Err(TagError::InvalidConfig(format!(
                "unknown case sensitivity: {}",
                other
            ))),
        }
    }
}

/// Process-wide, runtime-mutable case sensitivity setting.
///
/// Cloning yields another handle to the same setting.
#[derive(Debug, Clone, Default)]
pub struct CasePolicy {
    current: Arc<RwLock<CaseSensitivity>>,
}

impl CasePolicy {
    pub fn new(initial: CaseSensitivity) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial)),
        }
    }

    /// Read the policy as it is right now
    pub fn get(&self) -> CaseSensitivity {
        *self.current.read()
    }

    pub fn set(&self, sensitivity: CaseSensitivity) {
        *self.current.write() = sensitivity;
    }

    pub fn is_strict(&self) -> bool {
        self.get().is_strict()
    }
}

/// Map a raw tag name to its comparison key.
///
/// Total for any input; blank names pass through untouched.
pub fn normalize(raw: &str, sensitivity: CaseSensitivity) -> Cow<'_, str> {
    match sensitivity {
        CaseSensitivity::StrictCaseMatch => Cow::Borrowed(raw),
        CaseSensitivity::CaseInsensitive => Cow::Owned(fold_case(raw)),
    }
}

/// Per-character lowercase mapping.
///
/// Unlike `str::to_lowercase` this has no final-sigma rule, so the key of a
/// name never depends on where a character sits in it.
fn fold_case(raw: &str) -> String {
    raw.chars().flat_map(char::to_lowercase).collect()
}

/// Escape `LIKE` metacharacters so `fragment` matches literally.
pub fn like_escape(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// A case-insensitive `LIKE ... ESCAPE '!'` pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikePattern {
    pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    Literal(char),
    AnyOne,
    AnyMany,
}

impl LikePattern {
    /// Pattern matching any name that contains `fragment` literally
    pub fn contains(fragment: &str) -> Self {
        Self {
            pattern: format!("%{}%", like_escape(fragment)),
        }
    }

    /// Wrap an already-escaped pattern
    pub fn from_raw(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn escape_char(&self) -> char {
        LIKE_ESCAPE
    }

    /// Evaluate the pattern the way an `ILIKE` would.
    pub fn matches(&self, text: &str) -> bool {
        let tokens = tokenize(&fold_case(&self.pattern));
        let text: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
        wildcard_match(&tokens, &text)
    }
}

fn tokenize(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            LIKE_ESCAPE => LikeToken::Literal(chars.next().unwrap_or(LIKE_ESCAPE)),
            '%' => LikeToken::AnyMany,
            '_' => LikeToken::AnyOne,
            other => LikeToken::Literal(other),
        };
        tokens.push(token);
    }
    tokens
}

fn wildcard_match(tokens: &[LikeToken], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    // (token index of the last '%', text index it was tried at)
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(LikeToken::Literal(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            Some(LikeToken::AnyOne) => {
                p += 1;
                t += 1;
            }
            Some(LikeToken::AnyMany) => {
                backtrack = Some((p, t));
                p += 1;
            }
            _ => match backtrack {
                Some((star, from)) => {
                    p = star + 1;
                    t = from + 1;
                    backtrack = Some((star, from + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|token| *token == LikeToken::AnyMany)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strict_keeps_bytes() {
        assert_eq!(normalize("RuBy", CaseSensitivity::StrictCaseMatch), "RuBy");
        assert!(matches!(
            normalize("RuBy", CaseSensitivity::StrictCaseMatch),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn insensitive_folds_unicode() {
        let policy = CaseSensitivity::CaseInsensitive;
        assert_eq!(normalize("ÄPFEL", policy), "äpfel");
        assert_eq!(normalize("STRASSE", policy), "strasse");
        assert_eq!(normalize("\u{130}stanbul", policy), "i\u{307}stanbul");
    }

    #[test]
    fn insensitive_ignores_sigma_position() {
        let policy = CaseSensitivity::CaseInsensitive;
        assert_eq!(normalize("ΣΑΣ", policy), "σασ");
        assert_eq!(normalize("ΣΑΣ", policy), normalize("σασ", policy));
        assert!(LikePattern::contains("σασ").matches("ΣΑΣ"));
    }

    #[test]
    fn blank_passes_through() {
        assert_eq!(normalize("", CaseSensitivity::CaseInsensitive), "");
        assert_eq!(normalize("   ", CaseSensitivity::StrictCaseMatch), "   ");
    }

    #[test]
    fn escape_handles_all_metacharacters() {
        assert_eq!(like_escape("50% off"), "50!% off");
        assert_eq!(like_escape("snake_case"), "snake!_case");
        assert_eq!(like_escape("wow!"), "wow!!");
        assert_eq!(like_escape("!%"), "!!!%");
    }

    #[test]
    fn contains_pattern_is_literal() {
        let pattern = LikePattern::contains("50% off");
        assert_eq!(pattern.as_str(), "%50!% off%");
        assert!(pattern.matches("Get 50% OFF today"));
        assert!(!pattern.matches("500 things off"));
        assert!(!pattern.matches("50 off"));
    }

    #[test]
    fn underscore_is_literal_after_escape() {
        let pattern = LikePattern::contains("a_b");
        assert!(pattern.matches("xa_by"));
        assert!(!pattern.matches("axb"));
    }

    #[test]
    fn raw_wildcards_still_work() {
        assert!(LikePattern::from_raw("r_by%").matches("Ruby on Rails"));
        assert!(LikePattern::from_raw("%rails").matches("Ruby on Rails"));
        assert!(!LikePattern::from_raw("rails").matches("Ruby on Rails"));
        assert!(LikePattern::from_raw("%").matches(""));
    }

    #[test]
    fn policy_handle_is_shared() {
        let policy = CasePolicy::new(CaseSensitivity::CaseInsensitive);
        let other = policy.clone();
        other.set(CaseSensitivity::StrictCaseMatch);
        assert!(policy.is_strict());
    }

    #[test]
    fn parses_sensitivity() {
        assert_eq!(
            "strict".parse::<CaseSensitivity>().unwrap(),
            CaseSensitivity::StrictCaseMatch
        );
        assert_eq!(
            " Insensitive ".parse::<CaseSensitivity>().unwrap(),
            CaseSensitivity::CaseInsensitive
        );
        assert!("loud".parse::<CaseSensitivity>().is_err());
    }

    proptest! {
        #[test]
        fn contains_matches_any_embedding(
            prefix in "[a-zA-Z0-9 ]{0,8}",
            fragment in "[a-zA-Z0-9 %_!]{0,12}",
            suffix in "[a-zA-Z0-9 ]{0,8}",
        ) {
            let haystack = format!("{}{}{}", prefix, fragment, suffix);
            prop_assert!(LikePattern::contains(&fragment).matches(&haystack));
        }

        #[test]
        fn insensitive_is_idempotent(name in "[a-zA-Z0-9À-ÖØ-öø-ÿΑ-Ωα-ω ]{0,24}") {
            let once = normalize(&name, CaseSensitivity::CaseInsensitive).into_owned();
            let twice = normalize(&once, CaseSensitivity::CaseInsensitive).into_owned();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn insensitive_key_ignores_case_variant(name in "[a-zA-Z0-9À-ÖØ-Þà-öø-þΑ-Ωα-ρσ-ω ]{0,24}") {
            let upper = name.to_uppercase();
            prop_assert_eq!(
                normalize(&name, CaseSensitivity::CaseInsensitive),
                normalize(&upper, CaseSensitivity::CaseInsensitive)
            );
        }
    }
}
