//! The `Struct` tree model: ordered key/value storage, container
//! back-references, path resolution, and the live (eager-on-read)
//! expansion used by `get`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{CoilError, KeyMissingError, KeyValueError, Result, StructError};
use crate::path::{Anchor, Path};
use crate::value::Value;

pub(crate) struct Inner {
    pub(crate) entries: Vec<(String, Value)>,
    pub(crate) container: Option<Weak<RefCell<Inner>>>,
}

/// A node in the configuration tree.
///
/// `Struct` is a cheap handle (an `Rc<RefCell<_>>` under the hood): cloning
/// the handle (internally, via `handle()`) aliases the same node, while the
/// public [`Clone`] impl performs a full [`Struct::copy`] — independent data,
/// re-rooted, matching the semantics a caller expects from "copying a value".
pub struct Struct(pub(crate) Rc<RefCell<Inner>>);

/// Options controlling `Struct::expand_with` (and, implicitly, the default
/// policy used by `Struct::get`).
#[derive(Debug, Clone)]
pub struct ExpandOptions {
    /// When a `${path}` cannot be resolved, leave it in place instead of
    /// raising `KeyMissingError`.
    pub ignore_missing: bool,
    /// Stringify `Null` as the empty string rather than the literal `None`.
    pub null_as_empty_string: bool,
    /// Fallback values consulted, by the literal text inside `${...}`, when
    /// a reference cannot otherwise be resolved.
    pub defaults: HashMap<String, Value>,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        ExpandOptions { ignore_missing: false, null_as_empty_string: true, defaults: HashMap::new() }
    }
}

impl ExpandOptions {
    pub fn new() -> Self {
        ExpandOptions::default()
    }
}

impl Struct {
    /// A new, empty, detached struct — its own root.
    pub fn new() -> Self {
        Struct(Rc::new(RefCell::new(Inner { entries: Vec::new(), container: None })))
    }

    /// Builds a struct from `(dotted.path, value)` pairs, autovivifying
    /// intermediate structs exactly like repeated `set` calls.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Value)>) -> Result<Struct> {
        let s = Struct::new();
        for (k, v) in pairs {
            s.set(&k, v)?;
        }
        Ok(s)
    }

    /// A cheap, aliasing clone of this handle (same underlying node).
    pub(crate) fn handle(&self) -> Struct {
        Struct(Rc::clone(&self.0))
    }

    pub(crate) fn ptr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// This node's immediate container, or `None` if it is a root.
    pub fn container(&self) -> Option<Struct> {
        self.0.borrow().container.as_ref().and_then(|w| w.upgrade()).map(Struct)
    }

    /// The root of the tree this node currently belongs to. A detached node
    /// is its own root.
    pub fn root(&self) -> Struct {
        let mut cur = self.handle();
        loop {
            match cur.container() {
                Some(parent) => cur = parent,
                None => return cur,
            }
        }
    }

    /// The dotted path from the root to this node, e.g. `@root.a.b`.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut cur = self.handle();
        loop {
            match cur.container() {
                Some(parent) => {
                    segments.push(parent.key_of(&cur).unwrap_or_default());
                    cur = parent;
                }
                None => break,
            }
        }
        segments.reverse();
        if segments.is_empty() {
            "@root".to_string()
        } else {
            format!("@root.{}", segments.join("."))
        }
    }

    fn key_of(&self, child: &Struct) -> Option<String> {
        self.0.borrow().entries.iter().find_map(|(k, v)| match v {
            Value::Struct(s) if Rc::ptr_eq(&s.0, &child.0) => Some(k.clone()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.0.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.borrow().entries.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn items(&self) -> Vec<(String, Value)> {
        self.0.borrow().entries.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (String, Value)> {
        self.items().into_iter()
    }

    fn entry_value(&self, key: &str) -> Option<Value> {
        self.0.borrow().entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    /// `contains`/`in`: true iff the path resolves to *some* stored value,
    /// without attempting interpolation.
    pub fn contains(&self, path: &str) -> bool {
        self.get_value(path).is_ok()
    }

    /// Direct mutable access to the list stored at `path`: `f` receives the
    /// actual `Vec<Value>` in place, so `push`/`insert`/`clear`/`dedup` (or
    /// any other `Vec` method) mutate the struct itself, matching how a
    /// list read back from a struct behaves elsewhere in this API.
    pub fn with_list_mut<R>(&self, path: &str, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R> {
        let p = Path::parse(path)?;
        let (owner, last) = self.walk(&p)?;
        let mut inner = owner.0.borrow_mut();
        let slot = inner
            .entries
            .iter_mut()
            .find(|(k, _)| k == &last)
            .ok_or_else(|| KeyMissingError::new(path))?;
        match &mut slot.1 {
            Value::List(list) => Ok(f(list)),
            _ => Err(StructError::new(format!("'{}' is not a list", path)).into()),
        }
    }

    /// The length of the list at `path`, or `None` if it is missing or not
    /// a list.
    pub fn list_len(&self, path: &str) -> Option<usize> {
        match self.get_value(path) {
            Ok(Value::List(items)) => Some(items.len()),
            _ => None,
        }
    }

    /// The element at `index` in the list at `path`.
    pub fn list_get(&self, path: &str, index: usize) -> Option<Value> {
        match self.get_value(path) {
            Ok(Value::List(items)) => items.get(index).cloned(),
            _ => None,
        }
    }

    fn ascend(&self, up: usize) -> Result<Struct> {
        let mut cur = self.handle();
        for _ in 0..up {
            cur = cur.container().ok_or_else(|| KeyMissingError::new(".".repeat(up)))?;
        }
        Ok(cur)
    }

    fn find_bare_container(&self, key: &str) -> Result<Struct> {
        let mut cur = self.handle();
        loop {
            if cur.entry_value(key).is_some() {
                return Ok(cur);
            }
            match cur.container() {
                Some(parent) => cur = parent,
                None => return Err(KeyMissingError::new(key).into()),
            }
        }
    }

    /// Walks to the struct that owns the path's *last* segment, dereferencing
    /// `Link`s encountered along intermediate segments, without fetching or
    /// resolving the final value itself.
    fn walk(&self, p: &Path) -> Result<(Struct, String)> {
        let last = p.segments.last().cloned().ok_or_else(|| KeyValueError::new("@root"))?;
        let mut cur = match p.anchor {
            Anchor::Absolute => self.root(),
            Anchor::Relative { up } => self.ascend(up)?,
            Anchor::Bare => self.find_bare_container(&p.segments[0])?,
        };
        for seg in &p.segments[..p.segments.len() - 1] {
            let v = cur.entry_value(seg).ok_or_else(|| KeyMissingError::new(seg.clone()))?;
            cur = match v {
                Value::Struct(s) => s,
                Value::Link(target) => match cur.get_value(&target.to_canonical_string())? {
                    Value::Struct(s) => s,
                    _ => return Err(KeyMissingError::new(seg.clone()).into()),
                },
                _ => return Err(KeyMissingError::new(seg.clone()).into()),
            };
        }
        Ok((cur, last))
    }

    /// Like `walk`, but autovivifies missing intermediate structs. Used by
    /// `set`. A `Bare` path autovivifies within `self`, not an ancestor.
    fn walk_autoviv(&self, p: &Path) -> Result<(Struct, String)> {
        let last = p.segments.last().cloned().ok_or_else(|| KeyValueError::new("@root"))?;
        let mut cur = match p.anchor {
            Anchor::Absolute => self.root(),
            Anchor::Relative { up } => self.ascend(up)?,
            Anchor::Bare => self.handle(),
        };
        for seg in &p.segments[..p.segments.len() - 1] {
            let existing = cur.entry_value(seg);
            cur = match existing {
                Some(Value::Struct(s)) => s,
                Some(_) => {
                    return Err(StructError::new(format!(
                        "cannot descend through '{}': not a struct",
                        seg
                    ))
                    .into())
                }
                None => {
                    let child = Struct::new();
                    cur.set_local(seg.clone(), Value::Struct(child.handle()));
                    child
                }
            };
        }
        Ok((cur, last))
    }

    /// The raw value stored at `path`: `Link`s along the way are followed so
    /// traversal can continue through them, but the leaf itself is returned
    /// exactly as stored (a `Link` stays a `Link`, a `"${...}"` string keeps
    /// its placeholder). Used internally, and directly by callers who need
    /// to distinguish a link from the value it points to.
    pub fn get_value(&self, path: &str) -> Result<Value> {
        self.get_value_ctx(path).map(|(_, v)| v)
    }

    fn get_value_ctx(&self, path: &str) -> Result<(Struct, Value)> {
        let p = Path::parse(path)?;
        if p.segments.is_empty() {
            let root = self.root();
            return Ok((root.clone_handle_pair()));
        }
        let (owner, last) = self.walk(&p)?;
        let value = owner.entry_value(&last).ok_or_else(|| KeyMissingError::new(path))?;
        Ok((owner, value))
    }

    fn clone_handle_pair(&self) -> (Struct, Value) {
        (self.handle(), Value::Struct(self.handle()))
    }

    /// Fully resolves `path`: dereferences any `Link` (including chains) and
    /// expands `${...}` interpolation against the live tree, using the
    /// default [`ExpandOptions`] (`null_as_empty_string = true`,
    /// `ignore_missing = false`). This is performed fresh on every call —
    /// nothing is memoized, so changing a referenced sibling changes what a
    /// subsequent `get` observes.
    pub fn get(&self, path: &str) -> Result<Value> {
        let opts = ExpandOptions::default();
        let (ctx, raw) = self.get_value_ctx(path)?;
        let mut seen = Vec::new();
        resolve_in(&ctx, raw, &mut seen, &opts)
    }

    /// `get`, falling back to `default` when the path is missing. Unlike
    /// `get`, a missing intermediate struct also yields `default` rather
    /// than propagating `KeyMissingError`.
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get(path).unwrap_or(default)
    }

    /// Sets `path` to `value`, autovivifying intermediate structs. If
    /// `value` wraps a `Struct` already attached elsewhere, it is
    /// re-parented here (detached from its previous container).
    pub fn set(&self, path: &str, value: Value) -> Result<()> {
        let p = Path::parse(path)?;
        if p.segments.is_empty() {
            return Err(KeyValueError::new("@root").into());
        }
        let (owner, last) = self.walk_autoviv(&p)?;
        owner.set_local(last, value);
        Ok(())
    }

    pub(crate) fn set_local(&self, key: String, value: Value) {
        if let Value::Struct(ref child) = value {
            child.reparent_to(self);
        }
        let mut inner = self.0.borrow_mut();
        match inner.entries.iter_mut().find(|(k, _)| k == &key) {
            Some(slot) => slot.1 = value,
            None => inner.entries.push((key, value)),
        }
    }

    fn reparent_to(&self, new_container: &Struct) {
        if let Some(old) = self.container() {
            if !Rc::ptr_eq(&old.0, &new_container.0) {
                let mut old_inner = old.0.borrow_mut();
                old_inner
                    .entries
                    .retain(|(_, v)| !matches!(v, Value::Struct(s) if Rc::ptr_eq(&s.0, &self.0)));
            }
        }
        self.0.borrow_mut().container = Some(Rc::downgrade(&new_container.0));
    }

    /// Removes and detaches the node at `path`. The removed struct (if any)
    /// becomes its own root.
    pub fn delete(&self, path: &str) -> Result<()> {
        let p = Path::parse(path)?;
        if p.segments.is_empty() {
            return Err(StructError::new("cannot delete @root").into());
        }
        let (owner, last) = self.walk(&p)?;
        let removed = {
            let mut inner = owner.0.borrow_mut();
            let idx = inner.entries.iter().position(|(k, _)| k == &last);
            idx.map(|i| inner.entries.remove(i))
        };
        match removed {
            Some((_, Value::Struct(child))) => {
                child.0.borrow_mut().container = None;
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(KeyMissingError::new(path).into()),
        }
    }

    /// A deep, detached copy: nested structs are copied recursively and
    /// re-rooted under the copy; lists are copied element-wise; links are
    /// preserved as paths (not rewritten) and continue to resolve relative
    /// to the copy's own ancestry.
    pub fn copy(&self) -> Struct {
        let new = Struct::new();
        for (k, v) in self.0.borrow().entries.iter() {
            let v2 = match v {
                Value::Struct(s) => Value::Struct(s.copy()),
                other => other.clone(),
            };
            new.set_local(k.clone(), v2);
        }
        new
    }

    /// Recursively merges `other` into `self`. Where both sides hold a
    /// struct at the same key, merges recursively; otherwise `other`'s
    /// value (deep-copied) replaces `self`'s.
    pub fn merge(&self, other: &Struct) {
        for (k, v) in other.0.borrow().entries.iter() {
            if let Value::Struct(other_child) = v {
                if let Some(Value::Struct(self_child)) = self.entry_value(k) {
                    self_child.merge(other_child);
                    continue;
                }
            }
            let v2 = match v {
                Value::Struct(s) => Value::Struct(s.copy()),
                other => other.clone(),
            };
            self.set_local(k.clone(), v2);
        }
    }

    /// Materializes this struct (and its descendants) as a container-free
    /// `serde_json::Value`, with `Link`s and interpolation resolved via
    /// `get`-equivalent live expansion.
    #[cfg(feature = "serde")]
    pub fn dict(&self) -> Result<serde_json::Value> {
        use serde_json::Value as J;
        let mut map = serde_json::Map::new();
        for (k, _) in self.0.borrow().entries.iter() {
            let resolved = self.get(k)?;
            map.insert(k.clone(), value_to_json(&resolved)?);
        }
        Ok(J::Object(map))
    }

    /// Permanently bakes `${...}` interpolation and `Link` targets into the
    /// tree, using the default options (equivalent to
    /// `expand_with(&ExpandOptions::default())`).
    pub fn expand(&self) -> Result<()> {
        self.expand_with(&ExpandOptions::default())
    }

    /// Like `expand`, but with caller-supplied leniency and fallback values.
    pub fn expand_with(&self, opts: &ExpandOptions) -> Result<()> {
        let entries = self.0.borrow().entries.clone();
        let mut new_entries = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            new_entries.push((k, self.expand_value(v, opts)?));
        }
        self.0.borrow_mut().entries = new_entries;
        let children: Vec<Struct> = self
            .0
            .borrow()
            .entries
            .iter()
            .filter_map(|(_, v)| if let Value::Struct(s) = v { Some(s.handle()) } else { None })
            .collect();
        for child in children {
            child.expand_with(opts)?;
        }
        Ok(())
    }

    fn expand_value(&self, v: Value, opts: &ExpandOptions) -> Result<Value> {
        match v {
            Value::Link(p) => {
                let mut seen = Vec::new();
                let (ctx, raw) = self.get_value_ctx(&p.to_canonical_string())?;
                let resolved = resolve_in(&ctx, raw, &mut seen, opts)?;
                Ok(match resolved {
                    Value::Struct(s) => Value::Struct(s.copy()),
                    other => other,
                })
            }
            Value::String(s) if s.contains("${") => {
                let mut seen = Vec::new();
                Ok(Value::String(self.interpolate(&s, &mut seen, opts)?))
            }
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for it in items {
                    out.push(self.expand_value(it, opts)?);
                }
                Ok(Value::List(out))
            }
            other => Ok(other),
        }
    }

    fn interpolate(
        &self,
        text: &str,
        seen: &mut Vec<(usize, String)>,
        opts: &ExpandOptions,
    ) -> Result<String> {
        let mut out = String::new();
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| crate::error::ParseError::new("unterminated '${' in string"))?;
            let path_str = after[..end].trim().to_string();
            let key = (self.ptr(), path_str.clone());
            if seen.contains(&key) {
                return Err(StructError::new(format!("cyclic reference to '{}'", path_str)).into());
            }
            let lookup = self.get_value_ctx(&path_str);
            match lookup {
                Ok((vctx, raw)) => {
                    seen.push(key);
                    let resolved = resolve_in(&vctx, raw, seen, opts);
                    seen.pop();
                    out.push_str(&stringify_for_interpolation(&resolved?, opts));
                }
                Err(CoilError::KeyMissing(_)) => {
                    if let Some(default) = opts.defaults.get(&path_str) {
                        out.push_str(&stringify_for_interpolation(default, opts));
                    } else if opts.ignore_missing {
                        out.push_str(&format!("${{{}}}", path_str));
                    } else {
                        return Err(KeyMissingError::new(path_str).into());
                    }
                }
                Err(e) => return Err(e),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

impl Default for Struct {
    fn default() -> Self {
        Struct::new()
    }
}

impl Clone for Struct {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl fmt::Debug for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Struct").field("path", &self.path()).field("len", &self.len()).finish()
    }
}

impl PartialEq for Struct {
    fn eq(&self, other: &Self) -> bool {
        let a = self.0.borrow();
        let b = other.0.borrow();
        if a.entries.len() != b.entries.len() {
            return false;
        }
        a.entries.iter().all(|(k, v)| {
            b.entries.iter().find(|(k2, _)| k2 == k).map(|(_, v2)| v == v2).unwrap_or(false)
        })
    }
}

/// A struct compares equal to a plain JSON-shaped mapping iff `dict()`
/// would produce the same nested shape — lets a caller assert against a
/// `serde_json::json!({...})` literal without going through `Struct` at all.
#[cfg(feature = "serde")]
impl PartialEq<serde_json::Value> for Struct {
    fn eq(&self, other: &serde_json::Value) -> bool {
        matches!(self.dict(), Ok(d) if &d == other)
    }
}

fn resolve_in(
    ctx: &Struct,
    v: Value,
    seen: &mut Vec<(usize, String)>,
    opts: &ExpandOptions,
) -> Result<Value> {
    match v {
        Value::Link(p) => {
            let key = (ctx.ptr(), p.to_canonical_string());
            if seen.contains(&key) {
                return Err(StructError::new(format!(
                    "cyclic reference to '{}'",
                    p.to_canonical_string()
                ))
                .into());
            }
            seen.push(key);
            let (new_ctx, raw) = ctx.get_value_ctx(&p.to_canonical_string())?;
            let result = resolve_in(&new_ctx, raw, seen, opts);
            seen.pop();
            result
        }
        Value::String(s) if s.contains("${") => Ok(Value::String(ctx.interpolate(&s, seen, opts)?)),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for it in items {
                out.push(resolve_in(ctx, it, seen, opts)?);
            }
            Ok(Value::List(out))
        }
        other => Ok(other),
    }
}

pub(crate) fn stringify_for_interpolation(v: &Value, opts: &ExpandOptions) -> String {
    match v {
        Value::Null => {
            if opts.null_as_empty_string {
                String::new()
            } else {
                "None".to_string()
            }
        }
        Value::String(s) => s.clone(),
        Value::Bool(b) => {
            if *b {
                "True".to_string()
            } else {
                "False".to_string()
            }
        }
        Value::Integer(n) => n.to_string(),
        Value::Float(f) => crate::fmt::format_float(*f),
        Value::List(_) | Value::Struct(_) => v.to_string(),
        Value::Link(_) => String::new(),
    }
}

#[cfg(feature = "serde")]
fn value_to_json(v: &Value) -> Result<serde_json::Value> {
    use serde_json::Value as J;
    Ok(match v {
        Value::Null => J::Null,
        Value::Bool(b) => J::Bool(*b),
        Value::Integer(n) => J::from(*n),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(J::Number).unwrap_or(J::Null),
        Value::String(s) => J::String(s.clone()),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for it in items {
                out.push(value_to_json(it)?);
            }
            J::Array(out)
        }
        Value::Struct(s) => s.dict()?,
        Value::Link(_) => J::Null,
    })
}
