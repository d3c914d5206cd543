//! Error types returned by the parser and evaluator.

use std::fmt;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CoilError>;

/// Any error this crate can produce.
#[derive(Debug)]
pub enum CoilError {
    /// A syntactic problem: unterminated strings, bad numbers, unmatched
    /// braces, misused directives, stray tokens.
    Parse(ParseError),
    /// A path resolved to no such key.
    KeyMissing(KeyMissingError),
    /// A key or path was syntactically malformed (`first#`, `first..second`).
    KeyValue(KeyValueError),
    /// A structural evaluation failure: circular extends, circular
    /// expansion, a failing include, a list containing a struct.
    Struct(StructError),
    /// Failure from the underlying filesystem, surfaced through the
    /// default include resolver.
    Io(std::io::Error),
}

/// A syntactic error encountered while lexing or parsing.
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub path: Option<String>,
}

/// `get`/`set`/`delete` referenced a path with no such entry.
#[derive(Debug)]
pub struct KeyMissingError {
    pub path: String,
}

/// A key or path string was not well-formed.
#[derive(Debug)]
pub struct KeyValueError {
    pub key: String,
}

/// An evaluation-time structural failure.
#[derive(Debug)]
pub struct StructError {
    pub message: String,
    pub path: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError { message: message.into(), path: None }
    }

    pub fn at(message: impl Into<String>, path: impl Into<String>) -> Self {
        ParseError { message: message.into(), path: Some(path.into()) }
    }
}

impl StructError {
    pub fn new(message: impl Into<String>) -> Self {
        StructError { message: message.into(), path: None }
    }

    pub fn at(message: impl Into<String>, path: impl Into<String>) -> Self {
        StructError { message: message.into(), path: Some(path.into()) }
    }
}

impl KeyMissingError {
    pub fn new(path: impl Into<String>) -> Self {
        KeyMissingError { path: path.into() }
    }
}

impl KeyValueError {
    pub fn new(key: impl Into<String>) -> Self {
        KeyValueError { key: key.into() }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{}: {}", p, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl fmt::Display for KeyMissingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no such key: {}", self.path)
    }
}

impl fmt::Display for KeyValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a valid key or path: {:?}", self.key)
    }
}

impl fmt::Display for StructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{}: {}", p, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl fmt::Display for CoilError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoilError::Parse(e) => write!(f, "{}", e),
            CoilError::KeyMissing(e) => write!(f, "{}", e),
            CoilError::KeyValue(e) => write!(f, "{}", e),
            CoilError::Struct(e) => write!(f, "{}", e),
            CoilError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for CoilError {}

impl From<std::io::Error> for CoilError {
    fn from(e: std::io::Error) -> Self {
        CoilError::Io(e)
    }
}

impl From<ParseError> for CoilError {
    fn from(e: ParseError) -> Self {
        CoilError::Parse(e)
    }
}

impl From<KeyMissingError> for CoilError {
    fn from(e: KeyMissingError) -> Self {
        CoilError::KeyMissing(e)
    }
}

impl From<KeyValueError> for CoilError {
    fn from(e: KeyValueError) -> Self {
        CoilError::KeyValue(e)
    }
}

impl From<StructError> for CoilError {
    fn from(e: StructError) -> Self {
        CoilError::Struct(e)
    }
}
