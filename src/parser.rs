//! Recursive-descent parser. Consumes the flat token stream from
//! [`crate::lex`] and builds an owned [`RawStruct`] tree directly — no
//! intermediate concrete syntax tree, since nothing downstream needs to
//! round-trip comments or whitespace.

use crate::error::ParseError;
use crate::lex::{Lexer, Tok};
use crate::path::{Anchor, Path};
use crate::raw::{ExtendsSource, RawStruct, RawValue};

/// Parses a complete source file into a raw (pre-evaluation) struct tree.
pub(crate) fn parse_source(text: &str) -> Result<RawStruct, ParseError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser::new(tokens);
    let root = parser.parse_struct_body()?;
    parser.expect_eof()?;
    Ok(root)
}

struct Parser {
    /// Reversed so `pop()` yields the next token, mirroring the token-buffer
    /// convention used by hand-rolled parsers in this family.
    tokens: Vec<Tok>,
}

impl Parser {
    fn new(mut tokens: Vec<Tok>) -> Self {
        tokens.reverse();
        Parser { tokens }
    }

    fn peek(&self) -> &Tok {
        self.tokens.last().unwrap_or(&Tok::Eof)
    }

    fn bump(&mut self) -> Tok {
        self.tokens.pop().unwrap_or(Tok::Eof)
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        match self.bump() {
            Tok::Eof => Ok(()),
            other => Err(ParseError::new(format!("unexpected trailing token {:?}", other))),
        }
    }

    fn expect(&mut self, want: &Tok) -> Result<(), ParseError> {
        let got = self.bump();
        if &got == want {
            Ok(())
        } else {
            Err(ParseError::new(format!("expected {:?}, found {:?}", want, got)))
        }
    }

    /// Parses entries until `}` or end-of-input. Does not consume the
    /// closing brace; callers of the nested-struct form do that themselves.
    fn parse_struct_body(&mut self) -> Result<RawStruct, ParseError> {
        let mut out = RawStruct::new();
        loop {
            match self.peek() {
                Tok::Eof | Tok::RBrace => break,
                Tok::Tilde => {
                    self.bump();
                    let path = self.parse_path_token()?;
                    out.deletions.push(path);
                }
                Tok::AtWord(word) => {
                    let word = word.clone();
                    self.bump();
                    self.expect(&Tok::Colon)?;
                    match word.as_str() {
                        "extends" => {
                            let targets = self.parse_extends_target()?;
                            out.extends.push(ExtendsSource::Paths(targets));
                        }
                        "file" => {
                            let (path, subkey) = self.parse_file_target()?;
                            out.extends.push(ExtendsSource::File { path, subkey });
                        }
                        "package" => {
                            let spec = self.parse_string()?;
                            let (package, resource) = split_package_spec(&spec)?;
                            out.extends.push(ExtendsSource::Package { package, resource });
                        }
                        other => {
                            return Err(ParseError::new(format!(
                                "unknown directive '@{}'",
                                other
                            )))
                        }
                    }
                }
                Tok::Path(_) => {
                    let (segments, value) = self.parse_key_value()?;
                    insert_dotted(&mut out, &segments, value)?;
                }
                other => {
                    return Err(ParseError::new(format!(
                        "expected a key, '~', or directive, found {:?}",
                        other
                    )))
                }
            }
        }
        Ok(out)
    }

    fn parse_path_token(&mut self) -> Result<Path, ParseError> {
        match self.bump() {
            Tok::Path(text) => Path::parse(&text).map_err(|e| ParseError::new(e.to_string())),
            other => Err(ParseError::new(format!("expected a path, found {:?}", other))),
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        match self.bump() {
            Tok::Str(s) => Ok(s),
            other => Err(ParseError::new(format!("expected a string, found {:?}", other))),
        }
    }

    /// `PATH | '[' PATH+ ']' | PATH (',' PATH)+`
    fn parse_extends_target(&mut self) -> Result<Vec<Path>, ParseError> {
        if matches!(self.peek(), Tok::LBrack) {
            self.bump();
            let mut paths = Vec::new();
            while !matches!(self.peek(), Tok::RBrack) {
                paths.push(self.parse_path_token()?);
            }
            self.bump();
            if paths.is_empty() {
                return Err(ParseError::new("@extends list must not be empty"));
            }
            return Ok(paths);
        }
        let mut paths = vec![self.parse_path_token()?];
        while matches!(self.peek(), Tok::Comma) {
            self.bump();
            paths.push(self.parse_path_token()?);
        }
        Ok(paths)
    }

    /// `STRING | '[' STRING STRING ']'`
    fn parse_file_target(&mut self) -> Result<(String, Option<String>), ParseError> {
        if matches!(self.peek(), Tok::LBrack) {
            self.bump();
            let path = self.parse_string()?;
            let subkey = self.parse_string()?;
            self.expect(&Tok::RBrack)?;
            Ok((path, Some(subkey)))
        } else {
            Ok((self.parse_string()?, None))
        }
    }

    /// `PATH ':' value`. The key `PATH` may be a dotted sequence
    /// (`a.b.c: V`), which the caller expands into nested structs.
    fn parse_key_value(&mut self) -> Result<(Vec<String>, RawValue), ParseError> {
        let key_path = self.parse_path_token()?;
        if key_path.anchor != Anchor::Bare {
            return Err(ParseError::new("a key must be a plain dotted name, not @root or a relative path"));
        }
        self.expect(&Tok::Colon)?;
        let value = self.parse_value()?;
        Ok((key_path.segments, value))
    }

    fn parse_value(&mut self) -> Result<RawValue, ParseError> {
        match self.peek().clone() {
            Tok::Int(n) => {
                self.bump();
                Ok(RawValue::Integer(n))
            }
            Tok::Float(n) => {
                self.bump();
                Ok(RawValue::Float(n))
            }
            Tok::Str(s) => {
                self.bump();
                Ok(RawValue::String(s))
            }
            Tok::Eq => {
                self.bump();
                let path = self.parse_path_token()?;
                reject_bare_root(&path)?;
                Ok(RawValue::Link(path))
            }
            Tok::LBrace => {
                self.bump();
                let body = self.parse_struct_body()?;
                self.expect(&Tok::RBrace)?;
                Ok(RawValue::Struct(body))
            }
            Tok::LBrack => self.parse_list(),
            Tok::Path(text) => {
                if let Some(lit) = reserved_literal(&text) {
                    self.bump();
                    return Ok(lit);
                }
                let first = self.parse_path_token()?;
                if !matches!(self.peek(), Tok::Comma | Tok::LBrace) {
                    reject_bare_root(&first)?;
                }
                match self.peek() {
                    Tok::Comma => {
                        let mut donors = vec![first];
                        // A trailing comma right before the body is allowed
                        // (`a: b, {}`), so this doesn't force another donor.
                        while matches!(self.peek(), Tok::Comma) {
                            self.bump();
                            if matches!(self.peek(), Tok::LBrace) {
                                break;
                            }
                            donors.push(self.parse_path_token()?);
                        }
                        self.expect(&Tok::LBrace)?;
                        let mut body = self.parse_struct_body()?;
                        self.expect(&Tok::RBrace)?;
                        body.extends.insert(0, ExtendsSource::Paths(donors));
                        Ok(RawValue::Struct(body))
                    }
                    Tok::LBrace => {
                        self.bump();
                        let mut body = self.parse_struct_body()?;
                        self.expect(&Tok::RBrace)?;
                        body.extends.insert(0, ExtendsSource::Paths(vec![first]));
                        Ok(RawValue::Struct(body))
                    }
                    _ => Ok(RawValue::Reference(first)),
                }
            }
            other => Err(ParseError::new(format!("expected a value, found {:?}", other))),
        }
    }

    /// `'[' ( scalar | list )* ']'` — structs are never valid list elements.
    fn parse_list(&mut self) -> Result<RawValue, ParseError> {
        self.expect(&Tok::LBrack)?;
        let mut items = Vec::new();
        loop {
            match self.peek().clone() {
                Tok::RBrack => {
                    self.bump();
                    break;
                }
                Tok::Int(n) => {
                    self.bump();
                    items.push(RawValue::Integer(n));
                }
                Tok::Float(n) => {
                    self.bump();
                    items.push(RawValue::Float(n));
                }
                Tok::Str(s) => {
                    self.bump();
                    items.push(RawValue::String(s));
                }
                Tok::LBrack => {
                    items.push(self.parse_list()?);
                }
                Tok::Path(text) if reserved_literal(&text).is_some() => {
                    self.bump();
                    items.push(reserved_literal(&text).unwrap());
                }
                Tok::LBrace => {
                    return Err(ParseError::new("a list may not contain a struct literal"))
                }
                other => {
                    return Err(ParseError::new(format!(
                        "expected a list element or ']', found {:?}",
                        other
                    )))
                }
            }
        }
        Ok(RawValue::List(items))
    }
}

/// `a.b.c: V` is sugar for `a: { b: { c: V } }`; intermediate structs are
/// autovivified, or merged into if already present.
fn insert_dotted(target: &mut RawStruct, segments: &[String], value: RawValue) -> Result<(), ParseError> {
    if segments.len() == 1 {
        target.entries.push((segments[0].clone(), value));
        return Ok(());
    }
    let head = &segments[0];
    if let Some((_, existing)) = target.entries.iter_mut().find(|(k, _)| k == head) {
        match existing {
            RawValue::Struct(s) => return insert_dotted(s, &segments[1..], value),
            _ => {
                return Err(ParseError::new(format!(
                    "cannot extend '{}' as a struct: it already holds a scalar value",
                    head
                )))
            }
        }
    }
    let mut nested = RawStruct::new();
    insert_dotted(&mut nested, &segments[1..], value)?;
    target.entries.push((head.clone(), RawValue::Struct(nested)));
    Ok(())
}

/// `@root` alone has no segment to resolve to (`Struct::get` requires at
/// least one), so it's rejected here as a value rather than accepted and
/// left to fail only once something tries to resolve it.
fn reject_bare_root(path: &Path) -> Result<(), ParseError> {
    if path.anchor == Anchor::Absolute && path.segments.is_empty() {
        Err(ParseError::new("'@root' is not a valid value; use a path under it"))
    } else {
        Ok(())
    }
}

fn reserved_literal(text: &str) -> Option<RawValue> {
    match text {
        "True" => Some(RawValue::Bool(true)),
        "False" => Some(RawValue::Bool(false)),
        "None" => Some(RawValue::Null),
        _ => None,
    }
}

fn split_package_spec(spec: &str) -> Result<(String, String), ParseError> {
    match spec.split_once(':') {
        Some((pkg, res)) if !pkg.is_empty() && !res.is_empty() => {
            Ok((pkg.to_string(), res.to_string()))
        }
        _ => Err(ParseError::new(format!(
            "@package expects \"pkg:resource\", found {:?}",
            spec
        ))),
    }
}
