//! Code fence metadata parsing.
//!
//! Parses the part of a fence info string that follows the language tag:
//!
//! ````text
//! ```drawio src="./flow.drawio" alt='Boot flow' width=640 inline
//! ````
//!
//! Keys are `[A-Za-z0-9_-]+`. A key without `=` is a flag. Values are either
//! bare (up to the next whitespace) or quoted with `"` or `'`, where a
//! backslash escapes the following character.

use std::collections::BTreeMap;

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    /// Bare key without a value.
    Flag,
    /// `key=value`.
    Text(String),
}

/// Parsed fence metadata. Later duplicates override earlier ones.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FenceMeta {
    attrs: BTreeMap<String, MetaValue>,
}

/// Metadata syntax error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetaError {
    #[error("invalid fence metadata near \"{near}\"")]
    InvalidKey { near: String },
    #[error("missing value for \"{key}\" in fence metadata")]
    MissingValue { key: String },
    #[error("unterminated quoted value for \"{key}\" in fence metadata")]
    UnterminatedQuote { key: String },
}

impl FenceMeta {
    /// Parse a metadata string.
    pub fn parse(input: &str) -> Result<Self, MetaError> {
        let mut meta = Self::default();
        let chars: Vec<char> = input.trim().chars().collect();
        let mut idx = 0;

        while idx < chars.len() {
            skip_whitespace(&chars, &mut idx);
            if idx >= chars.len() {
                break;
            }

            let key_start = idx;
            while idx < chars.len() && is_key_char(chars[idx]) {
                idx += 1;
            }
            if idx == key_start {
                let near: String = chars[idx..].iter().take(20).collect();
                return Err(MetaError::InvalidKey { near });
            }
            let key: String = chars[key_start..idx].iter().collect();

            skip_whitespace(&chars, &mut idx);
            if chars.get(idx) != Some(&'=') {
                meta.attrs.insert(key, MetaValue::Flag);
                continue;
            }

            idx += 1;
            skip_whitespace(&chars, &mut idx);
            let Some(&first) = chars.get(idx) else {
                return Err(MetaError::MissingValue { key });
            };

            let value = if first == '"' || first == '\'' {
                idx += 1;
                read_quoted(&chars, &mut idx, first).ok_or_else(|| MetaError::UnterminatedQuote {
                    key: key.clone(),
                })?
            } else {
                let value_start = idx;
                while idx < chars.len() && !chars[idx].is_whitespace() {
                    idx += 1;
                }
                chars[value_start..idx].iter().collect()
            };
            meta.attrs.insert(key, MetaValue::Text(value));
        }

        Ok(meta)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.attrs.get(key)
    }

    /// Value of `key` if it was given as `key=value`.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.attrs.get(key) {
            Some(MetaValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// All keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn skip_whitespace(chars: &[char], idx: &mut usize) {
    while *idx < chars.len() && chars[*idx].is_whitespace() {
        *idx += 1;
    }
}

/// Read up to the closing `quote`, consuming it. Returns None if unterminated.
fn read_quoted(chars: &[char], idx: &mut usize, quote: char) -> Option<String> {
    let mut value = String::new();
    while *idx < chars.len() {
        let c = chars[*idx];
        if c == '\\' && *idx + 1 < chars.len() {
            value.push(chars[*idx + 1]);
            *idx += 2;
            continue;
        }
        *idx += 1;
        if c == quote {
            return Some(value);
        }
        value.push(c);
    }
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty() {
        let meta = FenceMeta::parse("   ").unwrap();
        assert!(meta.is_empty());
    }

    #[test]
    fn test_mixed_forms() {
        let meta =
            FenceMeta::parse(r#"src="./a b.drawio" alt='Boot flow' width=640 inline"#).unwrap();

        assert_eq!(meta.text("src"), Some("./a b.drawio"));
        assert_eq!(meta.text("alt"), Some("Boot flow"));
        assert_eq!(meta.text("width"), Some("640"));
        assert_eq!(meta.get("inline"), Some(&MetaValue::Flag));
        assert_eq!(meta.text("inline"), None);
        assert_eq!(
            meta.keys().collect::<Vec<_>>(),
            vec!["alt", "inline", "src", "width"]
        );
    }

    #[test]
    fn test_whitespace_around_equals() {
        let meta = FenceMeta::parse(r#"src = "x.drawio""#).unwrap();
        assert_eq!(meta.text("src"), Some("x.drawio"));
    }

    #[test]
    fn test_escapes_in_quotes() {
        let meta = FenceMeta::parse(r#"alt="say \"hi\" \\ ok""#).unwrap();
        assert_eq!(meta.text("alt"), Some(r#"say "hi" \ ok"#));
    }

    #[test]
    fn test_other_quote_inside_value() {
        let meta = FenceMeta::parse(r#"alt="it's fine""#).unwrap();
        assert_eq!(meta.text("alt"), Some("it's fine"));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let meta = FenceMeta::parse("alt=one alt=two").unwrap();
        assert_eq!(meta.text("alt"), Some("two"));
    }

    #[test]
    fn test_errors() {
        let cases = [
            (
                "src=x.drawio =oops",
                MetaError::InvalidKey {
                    near: "=oops".to_owned(),
                },
            ),
            (
                "alt=",
                MetaError::MissingValue {
                    key: "alt".to_owned(),
                },
            ),
            (
                r#"alt="open"#,
                MetaError::UnterminatedQuote {
                    key: "alt".to_owned(),
                },
            ),
            (
                r#"alt="trailing escape\""#,
                MetaError::UnterminatedQuote {
                    key: "alt".to_owned(),
                },
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(FenceMeta::parse(input), Err(expected), "input: {input}");
        }
    }

    #[test]
    fn test_error_messages() {
        let err = FenceMeta::parse("alt=").unwrap_err();
        assert_eq!(err.to_string(), "missing value for \"alt\" in fence metadata");
    }
}
