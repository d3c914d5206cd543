//! Turns a parser-produced [`RawStruct`] into a fully materialized
//! [`Struct`]: applies `@extends` (including `@file`/`@package` donors),
//! applies `~` deletions, and leaves string interpolation and explicit
//! `Link`s for `Struct::get`/`Struct::expand` to resolve.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::error::{Result, StructError};
use crate::include::IncludeResolver;
use crate::parser::parse_source;
use crate::raw::{ExtendsSource, RawStruct, RawValue};
use crate::tree::Struct;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Expanding,
    Expanded,
}

pub(crate) struct Evaluator<'a> {
    resolver: &'a dyn IncludeResolver,
    state: RefCell<HashMap<usize, State>>,
    pending_extends: RefCell<HashMap<usize, Vec<ExtendsSource>>>,
    pending_deletions: RefCell<HashMap<usize, Vec<crate::path::Path>>>,
    /// Resolved include sources currently on the inclusion stack, for
    /// `@file`/`@package` cycle detection (a file may not include itself,
    /// directly or transitively).
    include_stack: RefCell<Vec<String>>,
}

/// Parses and fully evaluates `text`, using `resolver` for any `@file`/
/// `@package` directives encountered.
pub(crate) fn evaluate_source(text: &str, resolver: &dyn IncludeResolver) -> Result<Struct> {
    let raw = parse_source(text)?;
    let ctx = Evaluator::new(resolver);
    let root = ctx.build_struct(raw)?;
    ctx.ensure_struct(&root)?;
    Ok(root)
}

impl<'a> Evaluator<'a> {
    fn new(resolver: &'a dyn IncludeResolver) -> Self {
        Evaluator {
            resolver,
            state: RefCell::new(HashMap::new()),
            pending_extends: RefCell::new(HashMap::new()),
            pending_deletions: RefCell::new(HashMap::new()),
            include_stack: RefCell::new(Vec::new()),
        }
    }

    /// Builds the owned tree shape (local entries, nested structs with
    /// `container` already wired up by `set_local`) without applying any
    /// `@extends`/`~` yet; those are recorded in `pending_*` keyed by the
    /// new struct's identity for `ensure_struct` to consume on demand.
    fn build_struct(&self, raw: RawStruct) -> Result<Struct> {
        let s = Struct::new();
        for (key, value) in raw.entries {
            let v = self.build_value(value)?;
            s.set_local(key, v);
        }
        if !raw.extends.is_empty() {
            self.pending_extends.borrow_mut().insert(s.ptr(), raw.extends);
        }
        if !raw.deletions.is_empty() {
            self.pending_deletions.borrow_mut().insert(s.ptr(), raw.deletions);
        }
        Ok(s)
    }

    fn build_value(&self, raw: RawValue) -> Result<Value> {
        Ok(match raw {
            RawValue::Null => Value::Null,
            RawValue::Bool(b) => Value::Bool(b),
            RawValue::Integer(n) => Value::Integer(n),
            RawValue::Float(f) => Value::Float(f),
            RawValue::String(s) => Value::String(s),
            RawValue::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.build_value(item)?);
                }
                Value::List(out)
            }
            RawValue::Struct(inner) => Value::Struct(self.build_struct(inner)?),
            // The grammar treats a bare path in value position as sugar for
            // an explicit link (`link := '=' PATH | PATH`): both forms
            // dereference transparently through `Struct::get`.
            RawValue::Link(p) | RawValue::Reference(p) => Value::Link(p),
        })
    }

    /// Applies `s`'s own `@extends`/`~` (if not already done), then
    /// recurses into its children. Re-entry while `s` is mid-expansion is a
    /// circular-extends `StructError`.
    fn ensure_struct(&self, s: &Struct) -> Result<()> {
        let ptr = s.ptr();
        match self.state.borrow().get(&ptr) {
            Some(State::Expanded) => return Ok(()),
            Some(State::Expanding) => {
                return Err(StructError::at("circular extends", s.path()).into())
            }
            None => {}
        }
        self.state.borrow_mut().insert(ptr, State::Expanding);

        // Local bindings always win, regardless of the order extends are
        // declared versus donor keys — captured once, before any donor
        // entries are inserted.
        let local_keys: HashSet<String> = s.keys().into_iter().collect();
        let extends = self.pending_extends.borrow_mut().remove(&ptr).unwrap_or_default();
        for source in extends {
            self.apply_extends_source(s, &local_keys, source)?;
        }

        let deletions = self.pending_deletions.borrow_mut().remove(&ptr).unwrap_or_default();
        for path in deletions {
            s.delete(&path.to_canonical_string())?;
        }

        self.state.borrow_mut().insert(ptr, State::Expanded);

        for (_, value) in s.items() {
            if let Value::Struct(child) = value {
                self.ensure_struct(&child)?;
            }
        }
        Ok(())
    }

    fn apply_extends_source(
        &self,
        s: &Struct,
        local_keys: &HashSet<String>,
        source: ExtendsSource,
    ) -> Result<()> {
        match source {
            ExtendsSource::Paths(paths) => {
                for path in paths {
                    let donor = self.resolve_donor(s, &path)?;
                    self.merge_donor(s, local_keys, &donor)?;
                }
            }
            ExtendsSource::File { path, subkey } => {
                let donor = self.load_include(&format!("file:{}", path), || {
                    self.resolver.resolve_file(&path)
                })?;
                let donor = match subkey {
                    Some(key) => self.require_struct(&donor, &key)?,
                    None => donor,
                };
                self.merge_donor(s, local_keys, &donor)?;
            }
            ExtendsSource::Package { package, resource } => {
                let id = format!("package:{}:{}", package, resource);
                let donor = self.load_include(&id, || {
                    self.resolver.resolve_package(&package, &resource)
                })?;
                self.merge_donor(s, local_keys, &donor)?;
            }
        }
        Ok(())
    }

    /// Resolves an `@extends` donor path. The path's own relative-dot
    /// count is taken from `s` (the struct the directive is declared in),
    /// which already lands one level up per dot — the conventional
    /// single-leading-dot form (`..a`) resolves from `s`'s container.
    fn resolve_donor(&self, s: &Struct, path: &crate::path::Path) -> Result<Struct> {
        let value = s.get(&path.to_canonical_string())?;
        let donor = match value {
            Value::Struct(d) => d,
            _ => {
                return Err(StructError::at(
                    format!("cannot extend '{}': not a struct", path.to_canonical_string()),
                    s.path(),
                )
                .into())
            }
        };
        if donor.ptr() == s.ptr() {
            return Err(StructError::at("cannot extend self", s.path()).into());
        }
        if self.is_ancestor_of(&donor, s) {
            return Err(StructError::at(
                format!("cannot extend '{}': it is an ancestor of self", path.to_canonical_string()),
                s.path(),
            )
            .into());
        }
        self.ensure_struct(&donor)?;
        Ok(donor)
    }

    fn is_ancestor_of(&self, maybe_ancestor: &Struct, s: &Struct) -> bool {
        let mut cur = s.container();
        while let Some(c) = cur {
            if c.ptr() == maybe_ancestor.ptr() {
                return true;
            }
            cur = c.container();
        }
        false
    }

    /// Merges `donor`'s entries into `s`. A key `s` doesn't have yet is
    /// copied in (unless it was already contributed by an earlier donor in
    /// this same `@extends` list and `s` has no true local binding for it,
    /// in which case a later donor overwrites the earlier one). When both
    /// `s` and `donor` hold a struct at the same key, the donor's struct is
    /// merged recursively — filling any keys missing at every nested level —
    /// rather than the whole donor struct being skipped outright, so a local
    /// override of a nested key doesn't shadow inherited siblings next to it.
    fn merge_donor(&self, s: &Struct, local_keys: &HashSet<String>, donor: &Struct) -> Result<()> {
        for (key, value) in donor.items() {
            match (s.get_value(&key), &value) {
                (Ok(Value::Struct(existing)), Value::Struct(donor_child)) => {
                    fill_struct_gaps(&existing, donor_child);
                }
                (Ok(_), _) if local_keys.contains(&key) => {}
                _ => s.set_local(key, deep_copy_value(&value)),
            }
        }
        Ok(())
    }

    fn require_struct(&self, donor: &Struct, subkey: &str) -> Result<Struct> {
        match donor.get_value(subkey)? {
            Value::Struct(s) => Ok(s),
            _ => Err(StructError::new(format!("'{}' is not a struct", subkey)).into()),
        }
    }

    /// Loads, parses, and fully evaluates an `@file`/`@package` donor,
    /// guarding against an include cycle via `id` (a normalized
    /// `"file:path"`/`"package:pkg:resource"` token).
    fn load_include(&self, id: &str, fetch: impl FnOnce() -> Result<String>) -> Result<Struct> {
        if self.include_stack.borrow().iter().any(|s| s == id) {
            return Err(StructError::new(format!("circular include: '{}'", id)).into());
        }
        self.include_stack.borrow_mut().push(id.to_string());
        let result = (|| {
            let text = fetch()?;
            let raw = parse_source(&text)?;
            let root = self.build_struct(raw)?;
            self.ensure_struct(&root)?;
            Ok(root)
        })();
        self.include_stack.borrow_mut().pop();
        result
    }
}

fn deep_copy_value(v: &Value) -> Value {
    match v {
        Value::Struct(s) => Value::Struct(s.copy()),
        other => other.clone(),
    }
}

/// Copies any key present in `donor` but missing from `receiver`, recursing
/// when both sides hold a struct at the same key. Never overwrites a key
/// `receiver` already has, at any depth — existing values, local or
/// already-inherited, always win.
fn fill_struct_gaps(receiver: &Struct, donor: &Struct) {
    for (key, value) in donor.items() {
        match (receiver.get_value(&key), &value) {
            (Ok(Value::Struct(existing)), Value::Struct(donor_child)) => {
                fill_struct_gaps(&existing, donor_child);
            }
            (Ok(_), _) => {}
            (Err(_), _) => receiver.set_local(key, deep_copy_value(&value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include::NullIncludeResolver;

    fn eval(s: &str) -> Result<Struct> {
        evaluate_source(s, &NullIncludeResolver)
    }

    #[test]
    fn test_simple_entries() {
        let root = eval(r#"this: "that" int: 1 float: 2.0"#).unwrap();
        assert_eq!(root.len(), 3);
        assert_eq!(root.get("int").unwrap(), Value::Integer(1));
        assert_eq!(root.get("float").unwrap(), Value::Float(2.0));
    }

    #[test]
    fn test_extends_and_delete() {
        let root = eval(r#"a: { x: "x" } b: a { ~x y: 1 }"#).unwrap();
        assert_eq!(root.get("b.y").unwrap(), Value::Integer(1));
        assert!(root.get("b.x").is_err());
        assert_eq!(root.get_value("b").unwrap().as_struct().unwrap().len(), 1);
    }

    #[test]
    fn test_references_and_links() {
        let root = eval(r#"a:"a" b:a x:{ c:..a d:=..a }"#).unwrap();
        assert_eq!(root.get("b").unwrap(), Value::String("a".to_string()));
        assert_eq!(root.get("x.c").unwrap(), Value::String("a".to_string()));
        assert_eq!(root.get("x.d").unwrap(), Value::String("a".to_string()));
    }

    #[test]
    fn test_interpolation_after_evaluate() {
        let root = eval(r#"foo:"bbq" bar:"omgwtf${foo}""#).unwrap();
        assert_eq!(root.get("bar").unwrap(), Value::String("omgwtfbbq".to_string()));
    }

    #[test]
    fn test_extends_composition() {
        let root =
            eval(r#"A:{a:1 b:2 c:3} B: A { ~c e:["one" 2 "three"] } D: B {}"#).unwrap();
        assert_eq!(root.get("D.a").unwrap(), Value::Integer(1));
        assert_eq!(root.get("D.b").unwrap(), Value::Integer(2));
        assert!(root.get("D.c").is_err());
        assert_eq!(
            root.get("D.e").unwrap(),
            Value::List(vec![
                Value::String("one".to_string()),
                Value::Integer(2),
                Value::String("three".to_string())
            ])
        );
        assert_eq!(root.get_value("D").unwrap().as_struct().unwrap().len(), 3);
    }

    #[test]
    fn test_multi_extends_later_wins() {
        let root = eval(r#"a: { x: 1 y: 1 } z: { x: 2 } c: a, z { }"#).unwrap();
        assert_eq!(root.get("c.x").unwrap(), Value::Integer(2));
        assert_eq!(root.get("c.y").unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_local_wins_over_inherited() {
        let root = eval(r#"a: { x: 1 } b: a { x: 2 }"#).unwrap();
        assert_eq!(root.get("b.x").unwrap(), Value::Integer(2));
    }

    #[test]
    fn test_circular_extends_is_struct_error() {
        let err = eval("a: { @extends: ..a }").unwrap_err();
        assert!(matches!(err, crate::error::CoilError::Struct(_)));
    }

    #[test]
    fn test_circular_interpolation_is_struct_error() {
        let root = eval(r#"a: "${b}" b: "${a}""#).unwrap();
        assert!(matches!(root.get("a"), Err(crate::error::CoilError::Struct(_))));
    }

    #[test]
    fn test_extends_ancestor_of_self_rejected() {
        let err = eval("a: { b: { @extends: @root.a } }").unwrap_err();
        assert!(matches!(err, crate::error::CoilError::Struct(_)));
    }

    #[test]
    fn test_nested_forward_extends() {
        let root = eval(
            r#"
            F.G.H: { a:1 b:2 c:3 }
            F.G.I: { @extends: ..H }
            "#,
        )
        .unwrap();
        assert_eq!(root.get("F.G.I.a").unwrap(), Value::Integer(1));
        assert_eq!(root.get("F.G.I.c").unwrap(), Value::Integer(3));
    }

    #[test]
    fn test_extends_via_bare_reference_to_struct() {
        let root = eval(r#"a.x: 1 b: a c: b { y: 2 }"#).unwrap();
        assert_eq!(root.get("a.x").unwrap(), Value::Integer(1));
        assert_eq!(root.get("c.x").unwrap(), Value::Integer(1));
        assert_eq!(root.get("c.y").unwrap(), Value::Integer(2));
        assert_eq!(root.get_value("a").unwrap().as_struct().unwrap().len(), 1);
    }

    /// A locally-declared nested struct still receives inherited siblings
    /// from the donor's struct at the same key, recursively, rather than
    /// the donor's entire contribution at that key being discarded.
    #[test]
    fn test_extends_merges_nested_struct_gaps() {
        let root = eval(
            r#"
            test: base { a.b: { y: 2 z: 3 } }
            base: { a.b.x: 1 }
            "#,
        )
        .unwrap();
        assert_eq!(root.get("test.a.b.x").unwrap(), Value::Integer(1));
        assert_eq!(root.get("test.a.b.y").unwrap(), Value::Integer(2));
        assert_eq!(root.get("test.a.b.z").unwrap(), Value::Integer(3));
        assert_eq!(root.get("base.a.b.x").unwrap(), Value::Integer(1));
    }
}
