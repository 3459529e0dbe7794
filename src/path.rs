use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt::{self, Write};
use std::sync::LazyLock;

/// Loop data variable holding the 0-based iteration index
pub const INDEX_VARIABLE: &str = "@index";

/// Leading segment referring to the current scope value, unless it has a `this` key
pub const THIS_SEGMENT: &str = "this";

static PATH_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.]+$").expect("path pattern is valid"));

/// A validated, non-empty sequence of path segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpr {
    segments: Vec<String>,
}

impl PathExpr {
    /// Parses a raw path expression, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the expression is empty, contains
    /// characters outside `[A-Za-z0-9_.]`, or has an empty segment.
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("empty path expression".to_string());
        }

        if trimmed == INDEX_VARIABLE {
            return Ok(Self {
                segments: vec![INDEX_VARIABLE.to_string()],
            });
        }

        if !PATH_CHARS.is_match(trimmed) {
            let bad = trimmed
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '.'))
                .unwrap_or('?');
            return Err(format!("invalid character {bad:?} in path '{trimmed}'"));
        }

        let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(format!("empty segment in path '{trimmed}'"));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// The data visible to a directive: the current root value and, inside
/// `{{#each}}`, the iteration index.
///
/// Iteration scopes see only the current element; there is no fallback to
/// the enclosing scope.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    value: &'a Value,
    index: Option<usize>,
}

impl<'a> Scope<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self { value, index: None }
    }

    pub fn iteration(element: &'a Value, index: usize) -> Self {
        Self {
            value: element,
            index: Some(index),
        }
    }

    /// Resolves a path in this scope, returning `None` when anything along the way is absent.
    pub fn resolve(&self, path: &PathExpr) -> Option<Cow<'a, Value>> {
        let mut segments = path.segments().iter();
        let first = segments.next()?;

        let mut current = match first.as_str() {
            INDEX_VARIABLE => return self.index.map(|i| Cow::Owned(Value::from(i))),
            THIS_SEGMENT => lookup(self.value, THIS_SEGMENT).unwrap_or(self.value),
            key => lookup(self.value, key)?,
        };

        for segment in segments {
            current = lookup(current, segment)?;
        }

        Some(Cow::Borrowed(current))
    }
}

fn lookup<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Loose truthiness: absent, `null`, `false`, `0`, `""` and `[]` are falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(_)) => true,
    }
}

/// Appends the display form of a value; absent and `null` append nothing.
pub fn write_value(out: &mut String, value: Option<&Value>) {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => out.push_str(s),
        Some(Value::Bool(b)) => {
            let _ = write!(out, "{b}");
        }
        // f64 Display drops the fraction of whole numbers: 25.0 prints as 25
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() => {
                let _ = write!(out, "{f}");
            }
            _ => {
                let _ = write!(out, "{n}");
            }
        },
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, Some(item));
            }
        }
        Some(object @ Value::Object(_)) => {
            let _ = write!(out, "{object}");
        }
    }
}

/// Display form of a value as an owned string.
pub fn stringify(value: Option<&Value>) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}
