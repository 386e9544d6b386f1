#![forbid(unsafe_code)]

//! Surface lookup selectors.
//!
//! Trigger keys come straight from markup and are untrusted. Before a key
//! is substituted into the attribute-selector template it is escaped so
//! that quotes, backslashes and line breaks stay inside the quoted value:
//!
//! ```
//! use terms_modal::selector::{escape_attribute_value, surface_selector};
//!
//! assert_eq!(escape_attribute_value(r#"O'Brien"s"#), r#"O\'Brien\"s"#);
//! assert_eq!(
//!     surface_selector("[data-kc-terms-modal='%PREFIX%']", r#"O'Brien"s"#),
//!     r#"[data-kc-terms-modal='O\'Brien\"s']"#,
//! );
//! ```
//!
//! The module also carries a parser for the compound selectors this crate
//! produces (`tag`, `.class`, `[attr]`, `[attr=value]`). It is used to
//! validate configuration and by hosts without a native selector engine.
//!
//! # Invariants
//!
//! - `CompoundSelector::parse(&surface_selector(t, k))` succeeds for every
//!   key `k` when `t` is a valid single-attribute template, and the parsed
//!   value equals `k` exactly (NUL excepted, which CSS cannot express).
//! - Substitution replaces only the first placeholder and never interprets
//!   the key (no `$&`-style expansion).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Selector lists / combinators | `,` or whitespace between compounds | `SelectorError::Unsupported` |
//! | Unterminated string | Missing closing quote | `SelectorError::UnterminatedString` |
//! | Empty input | Blank selector | `SelectorError::Empty` |

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

/// Placeholder substituted by [`surface_selector`].
pub const KEY_PLACEHOLDER: &str = "%PREFIX%";

/// Escape a value for use inside a quoted CSS attribute value.
///
/// Quotes and backslashes get a preceding backslash. Control characters
/// become hex escapes terminated by a space (`"\n"` becomes `\a `), since a
/// raw newline ends a CSS string. NUL has no CSS spelling: it is escaped
/// like any other control character and decodes to U+FFFD.
#[must_use]
pub fn escape_attribute_value(value: &str) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        if ch.is_control() {
            let _ = write!(out, "\\{:x} ", u32::from(ch));
            continue;
        }
        if matches!(ch, '\'' | '"' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Substitute the escaped `key` into `template` at [`KEY_PLACEHOLDER`].
#[must_use]
pub fn surface_selector(template: &str, key: &str) -> String {
    template.replacen(KEY_PLACEHOLDER, &escape_attribute_value(key), 1)
}

/// Selector parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector was empty or whitespace only.
    Empty,
    /// Input ended in the middle of a component.
    UnexpectedEnd,
    /// A character that cannot start or continue the current component.
    UnexpectedChar { position: usize, found: char },
    /// A quoted value without its closing quote.
    UnterminatedString { position: usize },
    /// Valid CSS this parser deliberately does not handle.
    Unsupported(&'static str),
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty selector"),
            Self::UnexpectedEnd => write!(f, "unexpected end of selector"),
            Self::UnexpectedChar { position, found } => {
                write!(f, "unexpected '{found}' at offset {position}")
            }
            Self::UnterminatedString { position } => {
                write!(f, "unterminated string starting at offset {position}")
            }
            Self::Unsupported(what) => write!(f, "unsupported selector syntax: {what}"),
        }
    }
}

impl std::error::Error for SelectorError {}

/// `[name]` or `[name=value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatcher {
    pub name: String,
    pub value: Option<String>,
}

/// A single compound selector: optional tag, classes and attribute tests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeMatcher>,
}

impl CompoundSelector {
    /// Parse a compound selector.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }
        let offset = input.len() - input.trim_start().len();
        Parser {
            chars: trimmed.char_indices().peekable(),
            offset,
        }
        .compound()
    }

    /// Test an element described by its tag name and an attribute lookup.
    ///
    /// Tag names and attribute names compare ASCII case-insensitively;
    /// values compare exactly.
    pub fn matches<F>(&self, tag: &str, attribute: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(expected) = &self.tag
            && !expected.eq_ignore_ascii_case(tag)
        {
            return false;
        }

        if !self.classes.is_empty() {
            let class_attr = attribute("class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|class| class_attr.split_ascii_whitespace().any(|c| c == class))
            {
                return false;
            }
        }

        self.attributes.iter().all(|matcher| {
            match (attribute(&matcher.name), &matcher.value) {
                (Some(actual), Some(expected)) => actual == *expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

struct Parser<'a> {
    chars: Peekable<CharIndices<'a>>,
    offset: usize,
}

impl Parser<'_> {
    fn compound(mut self) -> Result<CompoundSelector, SelectorError> {
        let mut selector = CompoundSelector::default();

        if let Some(&(_, ch)) = self.chars.peek()
            && is_ident_char(ch)
        {
            selector.tag = Some(self.ident()?.to_ascii_lowercase());
        }

        while let Some((pos, ch)) = self.chars.next() {
            match ch {
                '.' => selector.classes.push(self.ident()?),
                '[' => selector.attributes.push(self.attribute()?),
                '#' => {
                    let id = self.ident()?;
                    selector.attributes.push(AttributeMatcher {
                        name: "id".into(),
                        value: Some(id),
                    });
                }
                ',' => return Err(SelectorError::Unsupported("selector lists")),
                c if c.is_whitespace() || matches!(c, '>' | '+' | '~') => {
                    return Err(SelectorError::Unsupported("combinators"));
                }
                ':' => return Err(SelectorError::Unsupported("pseudo-classes")),
                found => {
                    return Err(SelectorError::UnexpectedChar {
                        position: self.offset + pos,
                        found,
                    });
                }
            }
        }

        Ok(selector)
    }

    fn attribute(&mut self) -> Result<AttributeMatcher, SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let value = match self.chars.next() {
            Some((_, ']')) => return Ok(AttributeMatcher { name, value: None }),
            Some((_, '=')) => {
                self.skip_whitespace();
                let value = match self.chars.peek() {
                    Some(&(pos, quote @ ('\'' | '"'))) => {
                        self.chars.next();
                        self.string(quote, pos)?
                    }
                    Some(_) => self.ident()?,
                    None => return Err(SelectorError::UnexpectedEnd),
                };
                self.skip_whitespace();
                value
            }
            Some((_, '~' | '|' | '^' | '$' | '*')) => {
                return Err(SelectorError::Unsupported("attribute operators other than '='"));
            }
            Some((position, found)) => {
                return Err(SelectorError::UnexpectedChar {
                    position: self.offset + position,
                    found,
                });
            }
            None => return Err(SelectorError::UnexpectedEnd),
        };

        match self.chars.next() {
            Some((_, ']')) => Ok(AttributeMatcher {
                name,
                value: Some(value),
            }),
            Some((position, found)) => Err(SelectorError::UnexpectedChar {
                position: self.offset + position,
                found,
            }),
            None => Err(SelectorError::UnexpectedEnd),
        }
    }

    fn string(&mut self, quote: char, start: usize) -> Result<String, SelectorError> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => return Ok(out),
                Some((_, '\\')) => {
                    if let Some(ch) = self.escape()? {
                        out.push(ch);
                    }
                }
                Some((_, '\n')) | None => {
                    return Err(SelectorError::UnterminatedString {
                        position: self.offset + start,
                    });
                }
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch == '\\' {
                self.chars.next();
                if let Some(escaped) = self.escape()? {
                    out.push(escaped);
                }
            } else if is_ident_char(ch) {
                out.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }

        if out.is_empty() {
            return match self.chars.peek() {
                Some(&(position, found)) => Err(SelectorError::UnexpectedChar {
                    position: self.offset + position,
                    found,
                }),
                None => Err(SelectorError::UnexpectedEnd),
            };
        }
        Ok(out)
    }

    /// Consume the remainder of an escape sequence (after the backslash).
    ///
    /// Returns `None` for an escaped newline inside a string, which CSS
    /// treats as a line continuation.
    fn escape(&mut self) -> Result<Option<char>, SelectorError> {
        let Some((_, first)) = self.chars.next() else {
            return Err(SelectorError::UnexpectedEnd);
        };

        if first == '\n' {
            return Ok(None);
        }

        if !first.is_ascii_hexdigit() {
            return Ok(Some(first));
        }

        let mut code = first.to_digit(16).unwrap_or(0);
        let mut digits = 1;
        while digits < 6 {
            match self.chars.peek() {
                Some(&(_, c)) if c.is_ascii_hexdigit() => {
                    code = code * 16 + c.to_digit(16).unwrap_or(0);
                    digits += 1;
                    self.chars.next();
                }
                _ => break,
            }
        }
        if let Some(&(_, c)) = self.chars.peek()
            && c.is_whitespace()
        {
            self.chars.next();
        }

        Ok(Some(
            char::from_u32(code)
                .filter(|&c| c != '\0')
                .unwrap_or(char::REPLACEMENT_CHARACTER),
        ))
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.chars.next();
        }
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') || !ch.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = "[data-kc-terms-modal='%PREFIX%']";

    fn attrs<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name: &str| {
            pairs
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn escape_plain_key_is_unchanged() {
        assert_eq!(escape_attribute_value("terms"), "terms");
        assert_eq!(escape_attribute_value(""), "");
    }

    #[test]
    fn escape_quotes_and_backslash() {
        assert_eq!(escape_attribute_value("a'b"), "a\\'b");
        assert_eq!(escape_attribute_value("a\"b"), "a\\\"b");
        assert_eq!(escape_attribute_value("a\\b"), "a\\\\b");
    }

    #[test]
    fn obrien_selector_fragment() {
        let selector = surface_selector(TEMPLATE, "O'Brien\"s");
        assert!(selector.contains("\\'"));
        assert!(selector.contains("\\\""));
        assert_eq!(selector, "[data-kc-terms-modal='O\\'Brien\\\"s']");
    }

    #[test]
    fn substitution_is_literal() {
        assert_eq!(
            surface_selector(TEMPLATE, "$&"),
            "[data-kc-terms-modal='$&']"
        );
        assert_eq!(
            surface_selector("[a='%PREFIX%'][b='%PREFIX%']", "x"),
            "[a='x'][b='%PREFIX%']"
        );
    }

    #[test]
    fn parse_tag_class_and_attributes() {
        let sel = CompoundSelector::parse("div.backdrop[data-x][data-y=\"v\"]").unwrap();
        assert_eq!(sel.tag.as_deref(), Some("div"));
        assert_eq!(sel.classes, vec!["backdrop".to_string()]);
        assert_eq!(
            sel.attributes,
            vec![
                AttributeMatcher {
                    name: "data-x".into(),
                    value: None,
                },
                AttributeMatcher {
                    name: "data-y".into(),
                    value: Some("v".into()),
                },
            ]
        );
    }

    #[test]
    fn parse_unquoted_and_spaced_value() {
        let sel = CompoundSelector::parse("[ data-kc-terms-modal = terms ]").unwrap();
        assert_eq!(sel.attributes[0].value.as_deref(), Some("terms"));
    }

    #[test]
    fn parse_id_shorthand() {
        let sel = CompoundSelector::parse("#main").unwrap();
        assert!(sel.matches("div", attrs(&[("id", "main")])));
        assert!(!sel.matches("div", attrs(&[("id", "other")])));
    }

    #[test]
    fn escaped_key_round_trips() {
        for key in ["O'Brien\"s", "\\", "'", "\"\"", "a\\'b", "x]y", "新しい"] {
            let sel = CompoundSelector::parse(&surface_selector(TEMPLATE, key)).unwrap();
            assert_eq!(sel.attributes[0].value.as_deref(), Some(key), "key {key:?}");
        }
    }

    #[test]
    fn control_characters_become_hex_escapes() {
        assert_eq!(escape_attribute_value("a\nb"), "a\\a b");
        assert_eq!(escape_attribute_value("\r\t"), "\\d \\9 ");
        assert_eq!(escape_attribute_value("\u{7f}1"), "\\7f 1");
        assert_eq!(
            surface_selector(TEMPLATE, "a\nb"),
            "[data-kc-terms-modal='a\\a b']"
        );
    }

    #[test]
    fn control_characters_round_trip() {
        for key in ["a\nb", "\r\n", "tab\there", "\u{1b}[0m", "\u{85}f", "x\n 1"] {
            let sel = CompoundSelector::parse(&surface_selector(TEMPLATE, key)).unwrap();
            assert_eq!(sel.attributes[0].value.as_deref(), Some(key), "key {key:?}");
        }
    }

    #[test]
    fn nul_decodes_to_replacement_character() {
        let sel = CompoundSelector::parse(&surface_selector(TEMPLATE, "a\0b")).unwrap();
        assert_eq!(sel.attributes[0].value.as_deref(), Some("a\u{fffd}b"));
    }

    #[test]
    fn hex_escapes() {
        let sel = CompoundSelector::parse("[data-a='\\41 B']").unwrap();
        assert_eq!(sel.attributes[0].value.as_deref(), Some("AB"));
    }

    #[test]
    fn unescaped_quote_breaks_the_selector() {
        let raw = TEMPLATE.replacen(KEY_PLACEHOLDER, "O'Brien", 1);
        assert!(CompoundSelector::parse(&raw).is_err());
    }

    #[test]
    fn parse_errors() {
        assert_eq!(CompoundSelector::parse("   "), Err(SelectorError::Empty));
        assert_eq!(
            CompoundSelector::parse("[a='b"),
            Err(SelectorError::UnterminatedString { position: 3 })
        );
        assert_eq!(CompoundSelector::parse("[a"), Err(SelectorError::UnexpectedEnd));
        assert_eq!(
            CompoundSelector::parse("a, b"),
            Err(SelectorError::Unsupported("selector lists"))
        );
        assert_eq!(
            CompoundSelector::parse("div span"),
            Err(SelectorError::Unsupported("combinators"))
        );
        assert!(matches!(
            CompoundSelector::parse("[a^=b]"),
            Err(SelectorError::Unsupported(_))
        ));
        assert!(matches!(
            CompoundSelector::parse("[a='b' x]"),
            Err(SelectorError::UnexpectedChar { found: 'x', .. })
        ));
    }

    #[test]
    fn matches_attribute_presence_and_value() {
        let presence = CompoundSelector::parse("[data-kc-terms-trigger]").unwrap();
        assert!(presence.matches("a", attrs(&[("data-kc-terms-trigger", "")])));
        assert!(!presence.matches("a", attrs(&[])));

        let exact = CompoundSelector::parse(&surface_selector(TEMPLATE, "terms")).unwrap();
        assert!(exact.matches("dialog", attrs(&[("data-kc-terms-modal", "terms")])));
        assert!(!exact.matches("dialog", attrs(&[("data-kc-terms-modal", "privacy")])));
    }

    #[test]
    fn matches_classes_and_tag_case_insensitively() {
        let sel = CompoundSelector::parse("DIV.a.b").unwrap();
        assert!(sel.matches("div", attrs(&[("class", "b  a c")])));
        assert!(!sel.matches("div", attrs(&[("class", "a")])));
        assert!(!sel.matches("span", attrs(&[("class", "a b")])));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            SelectorError::UnexpectedChar {
                position: 2,
                found: '!'
            }
            .to_string(),
            "unexpected '!' at offset 2"
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_key_yields_parseable_selector(key in "[^\\x00]{0,24}") {
                let selector = surface_selector(TEMPLATE, &key);
                let parsed = CompoundSelector::parse(&selector);
                prop_assert!(parsed.is_ok(), "{selector:?}: {parsed:?}");
                let parsed = parsed.unwrap();
                prop_assert_eq!(parsed.attributes.len(), 1);
                prop_assert_eq!(parsed.attributes[0].value.as_deref(), Some(key.as_str()));
            }
        }
    }
}
