//! Hand-rolled lexer. Scans the source text into a flat token stream; the
//! parser decides what each token means in context (a `Path` token can be a
//! key, an extends target, a link, or a bare-word literal like `True`).

use std::iter::Peekable;
use std::str::Chars;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    /// A dotted path: `foo`, `foo.bar`, `.foo`, `..foo`, `@root.foo`.
    Path(String),
    Int(i64),
    Float(f64),
    Str(String),
    LBrace,
    RBrace,
    LBrack,
    RBrack,
    Colon,
    Comma,
    Tilde,
    Eq,
    AtWord(String),
    Eof,
}

fn is_key_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { chars: input.chars().peekable() }
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    /// Tokenize the whole input eagerly. The parser consumes this `Vec` with
    /// `pop()` from a reversed copy.
    pub fn tokenize(mut self) -> Result<Vec<Tok>, ParseError> {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok == Tok::Eof;
            out.push(tok);
            if done {
                break;
            }
        }
        Ok(out)
    }

    fn next_token(&mut self) -> Result<Tok, ParseError> {
        self.skip_ws_and_comments();
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Tok::Eof),
        };

        match c {
            '{' => {
                self.bump();
                Ok(Tok::LBrace)
            }
            '}' => {
                self.bump();
                Ok(Tok::RBrace)
            }
            '[' => {
                self.bump();
                Ok(Tok::LBrack)
            }
            ']' => {
                self.bump();
                Ok(Tok::RBrack)
            }
            ':' => {
                self.bump();
                Ok(Tok::Colon)
            }
            ',' => {
                self.bump();
                Ok(Tok::Comma)
            }
            '~' => {
                self.bump();
                Ok(Tok::Tilde)
            }
            '=' => {
                self.bump();
                Ok(Tok::Eq)
            }
            '@' => {
                self.bump();
                let mut word = String::new();
                while let Some(c) = self.peek() {
                    if is_key_char(c) {
                        word.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                if word.is_empty() {
                    return Err(ParseError::new("expected a word after '@'"));
                }
                if word == "root" {
                    // `@root` is only meaningful as the head of a path; fold
                    // any following dotted segments into the same token.
                    let rest = self.read_path_tail()?;
                    Ok(Tok::Path(format!("@root{}", rest)))
                } else {
                    Ok(Tok::AtWord(word))
                }
            }
            '\'' | '"' => self.read_string(c),
            '.' => {
                let text = self.read_path_from_dots()?;
                Ok(Tok::Path(text))
            }
            c if c.is_ascii_digit() || (c == '-' && self.looks_like_number()) => {
                self.read_number()
            }
            c if is_key_start(c) || c == '-' => {
                let text = self.read_path_from_ident()?;
                Ok(Tok::Path(text))
            }
            other => Err(ParseError::new(format!("unexpected character {:?}", other))),
        }
    }

    fn looks_like_number(&mut self) -> bool {
        let mut clone = self.chars.clone();
        clone.next();
        matches!(clone.peek(), Some(c) if c.is_ascii_digit())
    }

    fn read_number(&mut self) -> Result<Tok, ParseError> {
        let mut text = String::new();
        if self.peek() == Some('-') || self.peek() == Some('+') {
            text.push(self.bump().unwrap());
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.peek() == Some('.') {
            let mut clone = self.chars.clone();
            clone.next();
            if matches!(clone.peek(), Some(c) if c.is_ascii_digit()) {
                is_float = true;
                text.push(self.bump().unwrap());
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        // Reject trailing garbage glued to the literal, e.g. `12c`, `12.c3`.
        if let Some(c) = self.peek() {
            if c.is_alphabetic() || c == '_' {
                return Err(ParseError::new(format!("invalid numeric literal near {:?}", text)));
            }
        }
        if is_float {
            text.parse::<f64>()
                .map(Tok::Float)
                .map_err(|_| ParseError::new(format!("invalid float literal {:?}", text)))
        } else {
            text.parse::<i64>()
                .map(Tok::Int)
                .map_err(|_| ParseError::new(format!("invalid integer literal {:?}", text)))
        }
    }

    /// Reads a run of leading dots followed by one or more `.segment` groups,
    /// e.g. `.foo`, `..foo.bar`. Called when the current char is `.`.
    fn read_path_from_dots(&mut self) -> Result<String, ParseError> {
        let mut text = String::new();
        while self.peek() == Some('.') {
            text.push('.');
            self.bump();
        }
        text.push_str(&self.read_segment()?);
        text.push_str(&self.read_path_tail()?);
        Ok(text)
    }

    /// Reads an identifier-led path, e.g. `foo`, `foo.bar`, `-moo`.
    fn read_path_from_ident(&mut self) -> Result<String, ParseError> {
        let mut text = self.read_segment()?;
        text.push_str(&self.read_path_tail()?);
        Ok(text)
    }

    fn read_segment(&mut self) -> Result<String, ParseError> {
        let mut seg = String::new();
        match self.peek() {
            Some(c) if is_key_start(c) || c == '-' => {
                seg.push(c);
                self.bump();
            }
            _ => return Err(ParseError::new("expected an identifier")),
        }
        while let Some(c) = self.peek() {
            if is_key_char(c) {
                seg.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(seg)
    }

    /// Reads zero or more `.segment` groups following an initial segment.
    fn read_path_tail(&mut self) -> Result<String, ParseError> {
        let mut text = String::new();
        while self.peek() == Some('.') {
            let mut clone = self.chars.clone();
            clone.next();
            if !matches!(clone.peek(), Some(c) if is_key_start(c)) {
                break;
            }
            text.push('.');
            self.bump();
            text.push_str(&self.read_segment()?);
        }
        Ok(text)
    }

    fn read_string(&mut self, quote: char) -> Result<Tok, ParseError> {
        self.bump();
        let triple = self.peek() == Some(quote) && {
            let mut clone = self.chars.clone();
            clone.next();
            clone.peek() == Some(&quote)
        };
        if triple {
            self.bump();
            self.bump();
            let mut s = String::new();
            loop {
                match self.bump() {
                    None => return Err(ParseError::new("unterminated triple-quoted string")),
                    Some(c) if c == quote => {
                        if self.peek() == Some(quote) {
                            let mut clone = self.chars.clone();
                            clone.next();
                            if clone.peek() == Some(&quote) {
                                self.bump();
                                self.bump();
                                return Ok(Tok::Str(s));
                            }
                        }
                        s.push(c);
                    }
                    Some('\\') => s.push(self.read_escape()?),
                    Some(c) => s.push(c),
                }
            }
        } else {
            let mut s = String::new();
            loop {
                match self.bump() {
                    None => return Err(ParseError::new("unterminated string")),
                    Some(c) if c == quote => return Ok(Tok::Str(s)),
                    Some('\n') => return Err(ParseError::new("unterminated string")),
                    Some('\\') => s.push(self.read_escape()?),
                    Some(c) => s.push(c),
                }
            }
        }
    }

    fn read_escape(&mut self) -> Result<char, ParseError> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('\\') => Ok('\\'),
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some(c) => Ok(c),
            None => Err(ParseError::new("unterminated escape sequence")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<Tok> {
        Lexer::new(s).tokenize().unwrap()
    }

    #[test]
    fn test_empty() {
        assert_eq!(toks(""), vec![Tok::Eof]);
    }

    #[test]
    fn test_simple_entry() {
        assert_eq!(
            toks("this: \"that\""),
            vec![Tok::Path("this".into()), Tok::Colon, Tok::Str("that".into()), Tok::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(toks("1"), vec![Tok::Int(1), Tok::Eof]);
        assert_eq!(toks("2.0"), vec![Tok::Float(2.0), Tok::Eof]);
        assert_eq!(toks("-5"), vec![Tok::Int(-5), Tok::Eof]);
    }

    #[test]
    fn test_bad_number_suffix() {
        assert!(Lexer::new("12c").tokenize().is_err());
        assert!(Lexer::new("12.c3").tokenize().is_err());
    }

    #[test]
    fn test_relative_paths() {
        assert_eq!(toks("..a"), vec![Tok::Path("..a".into()), Tok::Eof]);
        assert_eq!(toks("@root.foo.bar"), vec![Tok::Path("@root.foo.bar".into()), Tok::Eof]);
    }

    #[test]
    fn test_comment_before_close_bracket() {
        assert_eq!(toks("[12 #hello\n]"), vec![Tok::LBrack, Tok::Int(12), Tok::RBrack, Tok::Eof]);
    }

    #[test]
    fn test_directive_word() {
        assert_eq!(toks("@extends"), vec![Tok::AtWord("extends".into()), Tok::Eof]);
    }

    #[test]
    fn test_leading_hyphen_key() {
        assert_eq!(toks("-moo: 1"), vec![
            Tok::Path("-moo".into()),
            Tok::Colon,
            Tok::Int(1),
            Tok::Eof
        ]);
    }
}
