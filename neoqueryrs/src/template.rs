//! Dashboard variable substitution.
//!
//! Compiled SQL may reference dashboard variables (`$host`, `${host}`,
//! `${host:raw}`, `[[host]]`). The compiler does not resolve them itself; it
//! hands the finished text to a [`TemplateSubstitution`] passed in by the
//! caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value of a single variable; multi-value variables carry every selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Single(String),
    Multi(Vec<String>),
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for VariableValue {
    fn from(values: Vec<&str>) -> Self {
        VariableValue::Multi(values.into_iter().map(str::to_string).collect())
    }
}

pub type ScopedVars = BTreeMap<String, VariableValue>;

/// Formatting applied to substituted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableFormat {
    /// Single-quote each value, doubling embedded quotes; join with `,`.
    SqlString,
    /// Insert values verbatim, joined with `,`.
    Raw,
}

impl VariableFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "raw" => Some(VariableFormat::Raw),
            "sqlstring" => Some(VariableFormat::SqlString),
            _ => None,
        }
    }

    fn apply(&self, value: &VariableValue) -> String {
        let values: Vec<&str> = match value {
            VariableValue::Single(v) => vec![v.as_str()],
            VariableValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        };
        match self {
            VariableFormat::Raw => values.join(","),
            VariableFormat::SqlString => values
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "''")))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

pub trait TemplateSubstitution: Send + Sync {
    fn substitute(&self, text: &str, scoped_vars: &ScopedVars, format: VariableFormat) -> String;
}

/// Leaves text untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSubstitution;

impl TemplateSubstitution for NoSubstitution {
    fn substitute(&self, text: &str, _scoped_vars: &ScopedVars, _format: VariableFormat) -> String {
        text.to_string()
    }
}

/// Replaces known variables; scoped variables shadow dashboard variables and
/// unknown references are left as written.
#[derive(Debug, Default, Clone)]
pub struct VariableInterpolator {
    variables: ScopedVars,
}

impl VariableInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: VariableValue) {
        self.variables.insert(name.into(), value);
    }

    fn lookup<'a>(&'a self, name: &str, scoped_vars: &'a ScopedVars) -> Option<&'a VariableValue> {
        scoped_vars.get(name).or_else(|| self.variables.get(name))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A variable reference found in the text: byte span, name and optional format.
struct Reference<'t> {
    len: usize,
    name: &'t str,
    format: Option<&'t str>,
}

fn parse_reference(rest: &str) -> Option<Reference<'_>> {
    if let Some(body) = rest.strip_prefix("${") {
        let end = body.find('}')?;
        let inner = &body[..end];
        let (name, format) = match inner.split_once(':') {
            Some((name, format)) => (name, Some(format)),
            None => (inner, None),
        };
        if name.is_empty() || !name.chars().all(is_name_char) {
            return None;
        }
        return Some(Reference {
            len: end + 3,
            name,
            format,
        });
    }
    if let Some(body) = rest.strip_prefix("[[") {
        let end = body.find("]]")?;
        let name = &body[..end];
        if name.is_empty() || !name.chars().all(is_name_char) {
            return None;
        }
        return Some(Reference {
            len: end + 4,
            name,
            format: None,
        });
    }
    let body = rest.strip_prefix('$')?;
    let end = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
    if end == 0 {
        return None;
    }
    Some(Reference {
        len: end + 1,
        name: &body[..end],
        format: None,
    })
}

impl TemplateSubstitution for VariableInterpolator {
    fn substitute(&self, text: &str, scoped_vars: &ScopedVars, format: VariableFormat) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find(['$', '[']) {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];
            let replaced = parse_reference(rest).and_then(|reference| {
                let value = self.lookup(reference.name, scoped_vars)?;
                let fmt = reference
                    .format
                    .and_then(VariableFormat::from_name)
                    .unwrap_or(format);
                Some((reference.len, fmt.apply(value)))
            });
            match replaced {
                Some((len, value)) => {
                    out.push_str(&value);
                    rest = &rest[len..];
                }
                None => {
                    // Both trigger characters are one byte wide.
                    out.push_str(&rest[..1]);
                    rest = &rest[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}
