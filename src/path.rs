//! Dotted path parsing, validation, and the lexical resolution rules used by
//! `get`/`set`/`delete`/`extends`/interpolation.

use crate::error::KeyValueError;

/// How a path's first segment anchors relative to the struct it is resolved
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `@root.a.b` — resolved from the tree root.
    Absolute,
    /// `.a`, `..a`, `...a` — `up` counts the leading dots (0 means "current
    /// struct", 1 means "parent", and so on).
    Relative { up: usize },
    /// `a.b` — looked up lexically, ascending containers until found.
    Bare,
}

/// A parsed, already-validated path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub anchor: Anchor,
    pub segments: Vec<String>,
}

impl Path {
    /// The special `@root` path with no further segments.
    pub fn root() -> Self {
        Path { anchor: Anchor::Absolute, segments: Vec::new() }
    }

    /// Parses a path as produced by the lexer's `Path` token text. Assumes
    /// the lexer already rejected invalid characters; this only interprets
    /// the leading anchor.
    pub fn parse(text: &str) -> Result<Self, KeyValueError> {
        if text == "@root" {
            return Ok(Path::root());
        }
        if let Some(rest) = text.strip_prefix("@root.") {
            let segments = split_segments(rest)?;
            return Ok(Path { anchor: Anchor::Absolute, segments });
        }
        if let Some(stripped) = text.strip_prefix('.') {
            let mut up = 1;
            let mut rest = stripped;
            while let Some(s) = rest.strip_prefix('.') {
                up += 1;
                rest = s;
            }
            let segments = split_segments(rest)?;
            return Ok(Path { anchor: Anchor::Relative { up: up - 1 }, segments });
        }
        let segments = split_segments(text)?;
        if segments.is_empty() {
            return Err(KeyValueError::new(text));
        }
        Ok(Path { anchor: Anchor::Bare, segments })
    }

    /// A path with exactly one bare segment: a plain key.
    pub fn single(key: &str) -> Result<Self, KeyValueError> {
        validate_key(key)?;
        Ok(Path { anchor: Anchor::Bare, segments: vec![key.to_string()] })
    }

    pub fn is_single_key(&self) -> bool {
        matches!(self.anchor, Anchor::Bare) && self.segments.len() == 1
    }

    /// Canonical string form, e.g. `@root.a.b`, `..a`, `a.b`.
    pub fn to_canonical_string(&self) -> String {
        match self.anchor {
            Anchor::Absolute => {
                if self.segments.is_empty() {
                    "@root".to_string()
                } else {
                    format!("@root.{}", self.segments.join("."))
                }
            }
            Anchor::Relative { up } => {
                format!("{}{}", ".".repeat(up + 1), self.segments.join("."))
            }
            Anchor::Bare => self.segments.join("."),
        }
    }
}

fn is_key_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-'
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn split_segments(text: &str) -> Result<Vec<String>, KeyValueError> {
    if text.is_empty() {
        return Err(KeyValueError::new(text));
    }
    let mut segments = Vec::new();
    for part in text.split('.') {
        validate_key(part)?;
        segments.push(part.to_string());
    }
    Ok(segments)
}

/// True iff `s` is a legal single key: non-empty, first character a letter,
/// underscore, or hyphen, remaining characters alphanumeric/underscore/hyphen.
pub fn is_valid_key(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_key_start(c) => {}
        _ => return false,
    }
    chars.all(is_key_char)
}

/// Validates a single key (no dots allowed), raising `KeyValueError` for
/// things like `"first#"` or the empty string.
pub fn validate_key(s: &str) -> Result<(), KeyValueError> {
    if is_valid_key(s) {
        Ok(())
    } else {
        Err(KeyValueError::new(s))
    }
}

/// True iff `s` is a legal path: `@root`, a relative form, or a dotted
/// sequence of valid keys. Unlike `is_valid_key`, a path may validly be a
/// single key too (a path is a superset).
pub fn is_valid_path(s: &str) -> bool {
    if s == "@root" {
        return true;
    }
    if let Some(rest) = s.strip_prefix("@root.") {
        return !rest.is_empty() && rest.split('.').all(is_valid_key);
    }
    if let Some(stripped) = s.strip_prefix('.') {
        let rest = stripped.trim_start_matches('.');
        return !rest.is_empty() && rest.split('.').all(is_valid_key);
    }
    !s.is_empty() && s.split('.').all(is_valid_key)
}

/// Validates a path (see `is_valid_path`), raising `KeyValueError` with the
/// offending string.
pub fn validate_path(s: &str) -> Result<(), KeyValueError> {
    if is_valid_path(s) {
        Ok(())
    } else {
        Err(KeyValueError::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("foo").is_ok());
        assert!(validate_key("foo.bar").is_err());
        assert!(validate_key("@root").is_err());
        assert!(validate_key("#blah").is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("foo").is_ok());
        assert!(validate_path("foo.bar").is_ok());
        assert!(validate_path("@root").is_ok());
        assert!(validate_path("@root.foo.bar").is_ok());
        assert!(validate_path("..foo").is_ok());
        assert!(validate_path("#blah").is_err());
        assert!(validate_path("first..second").is_err());
        assert!(validate_path("first#").is_err());
    }

    #[test]
    fn test_parse_absolute() {
        let p = Path::parse("@root.foo.bar").unwrap();
        assert_eq!(p.anchor, Anchor::Absolute);
        assert_eq!(p.segments, vec!["foo", "bar"]);
    }

    #[test]
    fn test_parse_relative() {
        let p = Path::parse("..a").unwrap();
        assert_eq!(p.anchor, Anchor::Relative { up: 1 });
        assert_eq!(p.segments, vec!["a"]);

        let p = Path::parse(".a").unwrap();
        assert_eq!(p.anchor, Anchor::Relative { up: 0 });
    }

    #[test]
    fn test_parse_bare() {
        let p = Path::parse("a.b.c").unwrap();
        assert_eq!(p.anchor, Anchor::Bare);
        assert_eq!(p.segments, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_roundtrip_canonical() {
        for s in ["@root", "@root.a.b", "..a", ".a", "a.b.c"] {
            let p = Path::parse(s).unwrap();
            assert_eq!(p.to_canonical_string(), s);
        }
    }
}
