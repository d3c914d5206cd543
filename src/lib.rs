#![allow(clippy::type_complexity)]
//! Coil: a textual, hierarchical configuration language with
//! prototype-style inheritance, path references, string interpolation, and
//! structural composition.
//!
//! This crate is the core: [`parse`]/[`parse_file`] turn source text into a
//! fully evaluated [`Struct`] tree, with `@extends` resolved, `~` deletions
//! applied, and `${...}` interpolation and `=path` links resolved lazily on
//! every [`Struct::get`] (or baked in place with [`Struct::expand`]).
//!
//! # Example
//!
//! ```rust
//! use coil::Value;
//!
//! let root = coil::parse(r#"
//!     A: { a: 'a' b: 'b' c: 'c' }
//!     B: A { e: ['one' 2 'three'] ~c }
//! "#).unwrap();
//!
//! assert_eq!(root.get("B.a").unwrap(), Value::String("a".to_string()));
//! assert!(root.get("B.c").is_err());
//! assert_eq!(root.get_value("B").unwrap().as_struct().unwrap().len(), 3);
//! ```

mod error;
mod eval;
mod fmt;
mod include;
mod lex;
mod parser;
mod path;
mod raw;
mod tree;
mod value;

pub use error::{CoilError, KeyMissingError, KeyValueError, ParseError, Result, StructError};
pub use include::{FsIncludeResolver, IncludeResolver, NullIncludeResolver};
pub use path::{is_valid_key, is_valid_path, validate_key, validate_path};
pub use tree::{ExpandOptions, Struct};
pub use value::Value;

/// Parses and fully evaluates `text`. Any `@file`/`@package` directive
/// fails (there is no filesystem context to resolve it against); use
/// [`parse_file`] or [`parse_with_resolver`] when includes are needed.
pub fn parse(text: &str) -> Result<Struct> {
    eval::evaluate_source(text, &NullIncludeResolver)
}

/// Parses and fully evaluates `text`, using `resolver` for any `@file`/
/// `@package` directives encountered.
pub fn parse_with_resolver(text: &str, resolver: &dyn IncludeResolver) -> Result<Struct> {
    eval::evaluate_source(text, resolver)
}

/// Reads and evaluates the file at `path`. `@file` directives are resolved
/// relative to the file's own parent directory.
pub fn parse_file(path: impl AsRef<std::path::Path>) -> Result<Struct> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let resolver = FsIncludeResolver::new(base_dir);
    parse_with_resolver(&text, &resolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_resolves_relative_includes() {
        let dir = std::env::temp_dir().join(format!("coil-lib-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("base.coil"), "x: 'x value'\ny.z: 'z value'").unwrap();
        std::fs::write(dir.join("main.coil"), "@file: \"base.coil\"").unwrap();

        let root = parse_file(dir.join("main.coil")).unwrap();
        assert_eq!(root.get("x").unwrap(), Value::String("x value".to_string()));
        assert_eq!(root.get("y.z").unwrap(), Value::String("z value".to_string()));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_parse_without_resolver_rejects_file_directive() {
        assert!(parse(r#"@file: "whatever""#).is_err());
    }

    #[test]
    fn test_validators_reexported() {
        assert!(validate_key("foo").is_ok());
        assert!(validate_path("@root.foo").is_ok());
    }
}
