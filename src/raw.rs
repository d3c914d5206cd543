//! The tree the parser produces, before inheritance, deletions, includes,
//! and string interpolation have been applied. Never exposed publicly —
//! the evaluator consumes it and produces a [`crate::Struct`].

use crate::path::Path;

#[derive(Debug, Clone)]
pub(crate) enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// May still contain `${...}` interpolation placeholders.
    String(String),
    List(Vec<RawValue>),
    Struct(RawStruct),
    /// `=path` — an explicit link; dereferenced lazily, forever, on read.
    Link(Path),
    /// A bare path used where a value was expected (`c: ..a`), as opposed
    /// to an explicit `=path` link. The parser keeps the two syntactic
    /// forms distinct only so error messages can name which one was used;
    /// the evaluator erases the distinction (both become `Value::Link` —
    /// see `eval::build_value`), since a path value dereferences the same
    /// way on read regardless of which marker introduced it.
    Reference(Path),
}

/// One donor for an `@extends`/sugar-extends directive.
#[derive(Debug, Clone)]
pub(crate) enum ExtendsSource {
    Paths(Vec<Path>),
    File { path: String, subkey: Option<String> },
    Package { package: String, resource: String },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RawStruct {
    /// Local key/value bindings, in textual order. Local bindings always
    /// win over anything brought in by `extends`.
    pub(crate) entries: Vec<(String, RawValue)>,
    /// `@extends`/`@file`/`@package` donors, in the textual order they were
    /// declared. Applied before `deletions`.
    pub(crate) extends: Vec<ExtendsSource>,
    /// `~path` deletions, in textual order. Applied after `extends`.
    pub(crate) deletions: Vec<Path>,
}

impl RawStruct {
    pub(crate) fn new() -> Self {
        RawStruct::default()
    }
}
