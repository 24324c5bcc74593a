//! Line weight heuristics.
//!
//! A line's weight approximates how much information it carries. It is used
//! both for the weighted average of a developer's knowledge and for sizing
//! how far reading knowledge spreads around an edit.

use std::fmt;
use std::sync::Arc;

use kenning_core::WeightPolicy;

/// Measures the information content of one line of text.
pub trait LineWeightCalculator: fmt::Debug + Send + Sync {
    /// Weight of `text`; blank lines weigh 0.
    fn weight(&self, text: &str) -> u32;
}

/// Build the weight calculator selected by `policy`.
///
/// # Examples
///
/// ```
/// use kenning_core::WeightPolicy;
/// use kenning_knowledge::weight::weigher_for;
///
/// let weigher = weigher_for(WeightPolicy::Words);
/// assert_eq!(weigher.weight("let total = a + b;"), 7);
/// ```
pub fn weigher_for(policy: WeightPolicy) -> Arc<dyn LineWeightCalculator> {
    match policy {
        WeightPolicy::Words => Arc::new(WordCountWeight),
        WeightPolicy::Length => Arc::new(LengthWeight),
    }
}

/// Counts words, splitting identifiers into their parts.
///
/// Whitespace and underscores separate tokens. Inside a token every maximal
/// run of letters, digits, or other symbols is a word, and letter runs are
/// further split at camelCase humps: `vcsFileRevision` is three words,
/// `XMLParser` is two, `CAPSLOCK` is one.
///
/// # Examples
///
/// ```
/// use kenning_knowledge::{LineWeightCalculator, WordCountWeight};
///
/// assert_eq!(WordCountWeight.weight("hello my dear friend"), 4);
/// assert_eq!(WordCountWeight.weight("make_next_state"), 3);
/// assert_eq!(WordCountWeight.weight("   "), 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountWeight;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Separator,
    Letter,
    Digit,
    Other,
}

fn classify(c: char) -> CharClass {
    if c.is_whitespace() || c == '_' {
        CharClass::Separator
    } else if c.is_alphabetic() {
        CharClass::Letter
    } else if c.is_numeric() {
        CharClass::Digit
    } else {
        CharClass::Other
    }
}

/// Whether the letter at `i` opens a new camelCase word.
fn is_hump(chars: &[char], i: usize) -> bool {
    let (prev, cur) = (chars[i - 1], chars[i]);
    if !cur.is_uppercase() {
        return false;
    }
    if prev.is_lowercase() {
        return true;
    }
    // The last capital of an acronym belongs to the following word.
    prev.is_uppercase() && chars.get(i + 1).is_some_and(|next| next.is_lowercase())
}

impl LineWeightCalculator for WordCountWeight {
    fn weight(&self, text: &str) -> u32 {
        let chars: Vec<char> = text.chars().collect();
        let mut words = 0u32;
        let mut prev = CharClass::Separator;

        for (i, &c) in chars.iter().enumerate() {
            let class = classify(c);
            let starts_word = match class {
                CharClass::Separator => false,
                _ if class != prev => true,
                CharClass::Letter => is_hump(&chars, i),
                _ => false,
            };
            if starts_word {
                words += 1;
            }
            prev = class;
        }

        words
    }
}

/// Counts characters, ignoring surrounding whitespace.
///
/// # Examples
///
/// ```
/// use kenning_knowledge::{LengthWeight, LineWeightCalculator};
///
/// assert_eq!(LengthWeight.weight("    return x;"), 9);
/// assert_eq!(LengthWeight.weight(""), 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthWeight;

impl LineWeightCalculator for LengthWeight {
    fn weight(&self, text: &str) -> u32 {
        let len = text.trim().chars().count();
        u32::try_from(len).unwrap_or(u32::MAX)
    }
}
