//! Canonical textual rendering of [`crate::Value`] and [`crate::Struct`],
//! written so that `parse(&s.to_string())` reproduces an equivalent tree.

use std::fmt;

use crate::value::Value;
use crate::Struct;

/// Renders a float the way the parser accepts it back: always with a decimal
/// point, even for whole numbers, so `2.0` never prints as `2`.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_infinite() || f.is_nan() {
        return f.to_string();
    }
    let s = format!("{}", f);
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{}.0", s)
    }
}

fn quote_string(s: &str) -> String {
    // The lexer treats '\' as an escape introducer in both quoting styles,
    // so it must be escaped here regardless of which form is chosen below.
    let escaped = s.replace('\\', "\\\\");
    if s.contains('\'') || s.contains('\n') {
        format!("'''{}'''", escaped)
    } else {
        format!("'{}'", escaped)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::String(s) => write!(f, "{}", quote_string(s)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Struct(s) => write_struct_body(f, s, 0, true),
            Value::Link(p) => write!(f, "={}", p.to_canonical_string()),
        }
    }
}

impl fmt::Display for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_struct_body(f, self, 0, false)
    }
}

fn write_struct_body(f: &mut fmt::Formatter<'_>, s: &Struct, indent: usize, braced: bool) -> fmt::Result {
    let inner_indent = indent + 1;
    if braced {
        writeln!(f, "{{")?;
    }
    for (key, value) in s.items() {
        write!(f, "{}{}: ", "    ".repeat(inner_indent), key)?;
        match &value {
            Value::Struct(child) => {
                write_struct_body(f, child, inner_indent, true)?;
                writeln!(f)?;
            }
            other => writeln!(f, "{}", other)?,
        }
    }
    if braced {
        write!(f, "{}}}", "    ".repeat(indent))?;
    }
    Ok(())
}
