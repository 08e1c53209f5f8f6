//! Splitting raw text into document units before import.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_LEN: usize = 500;

const SENTENCE_ENDS: &[char] = &['。', '．', '.', '！', '？', '!', '?'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// The whole text is one document
    AsIs,
    /// Blank-line separated paragraphs
    Paragraph,
    #[default]
    Sentence,
    /// Fixed-size chunks of this many characters (0 means the default)
    Length(usize),
}

impl SplitStrategy {
    /// Build from a strategy name plus the configured chunk length
    pub fn from_name(name: &str, fixed_length: usize) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "as_is" | "as-is" | "none" => Some(SplitStrategy::AsIs),
            "paragraph" => Some(SplitStrategy::Paragraph),
            "sentence" => Some(SplitStrategy::Sentence),
            "length" => Some(SplitStrategy::Length(fixed_length)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SplitStrategy::AsIs => "as_is",
            SplitStrategy::Paragraph => "paragraph",
            SplitStrategy::Sentence => "sentence",
            SplitStrategy::Length(_) => "length",
        }
    }
}

impl fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitStrategy::Length(n) => write!(f, "length({n})"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for SplitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SplitStrategy::from_name(s, DEFAULT_CHUNK_LEN)
            .ok_or_else(|| format!("unknown split strategy '{s}' (as_is, paragraph, sentence, length)"))
    }
}

/// Split `text` into document units. Line endings are normalised to `\n`
/// and empty units are dropped.
pub fn split_text(text: &str, strategy: SplitStrategy) -> Vec<String> {
    let text = text.replace("\r\n", "\n");
    match strategy {
        SplitStrategy::AsIs => {
            if text.trim().is_empty() {
                Vec::new()
            } else {
                vec![text]
            }
        }
        SplitStrategy::Paragraph => text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect(),
        SplitStrategy::Sentence => split_sentences(&text),
        SplitStrategy::Length(n) => {
            let n = if n == 0 { DEFAULT_CHUNK_LEN } else { n };
            let chars: Vec<char> = text.chars().collect();
            chars
                .chunks(n)
                .map(|chunk| chunk.iter().collect::<String>())
                .filter(|chunk| !chunk.trim().is_empty())
                .collect()
        }
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if SENTENCE_ENDS.contains(&ch) {
            let sentence = current.trim();
            if !sentence.is_empty() {
                out.push(sentence.to_string());
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_is() {
        assert_eq!(split_text("one\r\ntwo", SplitStrategy::AsIs), vec!["one\ntwo"]);
        assert!(split_text("  \n", SplitStrategy::AsIs).is_empty());
    }

    #[test]
    fn test_paragraphs() {
        let text = "First para.\nstill first\r\n\r\n\r\nSecond.\n\n  \n\nThird";
        assert_eq!(
            split_text(text, SplitStrategy::Paragraph),
            vec!["First para.\nstill first", "Second.", "Third"]
        );
    }

    #[test]
    fn test_sentences() {
        let text = "Mike lives in America. Is he happy? Yes!  trailing";
        assert_eq!(
            split_text(text, SplitStrategy::Sentence),
            vec!["Mike lives in America.", "Is he happy?", "Yes!", "trailing"]
        );
        assert_eq!(
            split_text("他住在美国。她呢？", SplitStrategy::Sentence),
            vec!["他住在美国。", "她呢？"]
        );
    }

    #[test]
    fn test_fixed_length() {
        assert_eq!(
            split_text("abcdefgh", SplitStrategy::Length(3)),
            vec!["abc", "def", "gh"]
        );
        assert_eq!(split_text("ab   cd", SplitStrategy::Length(2)), vec!["ab", " c", "d"]);
        let long = "x".repeat(1200);
        assert_eq!(split_text(&long, SplitStrategy::Length(0)).len(), 3);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("paragraph".parse::<SplitStrategy>(), Ok(SplitStrategy::Paragraph));
        assert_eq!("Length".parse::<SplitStrategy>(), Ok(SplitStrategy::Length(DEFAULT_CHUNK_LEN)));
        assert_eq!(SplitStrategy::from_name("length", 40), Some(SplitStrategy::Length(40)));
        assert!("words".parse::<SplitStrategy>().is_err());
    }
}
