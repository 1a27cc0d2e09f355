//! Parsing of `${name}` placeholders.
//!
//! A placeholder starts at `${` and ends at the first `}` that follows.
//! Names are never nested: `${a${b}}` yields the name `a${b`.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

/// A `${...}` occurrence inside a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// The referenced name, without `${` and `}`.
    pub name: String,
    /// Byte range of the whole placeholder in the template.
    pub span: Range<usize>,
}

impl Placeholder {
    /// Splits `kind:body` names. Returns `None` for bare names.
    pub fn prefix(&self) -> Option<(&str, &str)> {
        split_prefix(&self.name)
    }
}

/// Splits a referenced name into `(prefix, body)` if it has the `kind:body` form.
///
/// Both parts must be non-empty.
pub fn split_prefix(name: &str) -> Option<(&str, &str)> {
    let (prefix, body) = name.split_once(':')?;
    if prefix.is_empty() || body.is_empty() {
        return None;
    }
    Some((prefix, body))
}

/// Returns every placeholder in `template`, in order of appearance.
pub fn parse_placeholders(template: &str) -> Vec<Placeholder> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(Placeholder {
                name: name.as_str().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Formats a name back into its literal placeholder text.
pub fn literal(name: &str) -> String {
    format!("${{{name}}}")
}

/// Rebuilds `template`, replacing each placeholder with `lookup(name)`.
///
/// Placeholders for which `lookup` returns `None` are kept verbatim.
/// Substituted text is never re-scanned.
pub fn substitute<'a, F>(template: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len());
    let mut last_end = 0;

    for placeholder in parse_placeholders(template) {
        out.push_str(&template[last_end..placeholder.span.start]);
        match lookup(&placeholder.name) {
            Some(value) => out.push_str(value),
            None => out.push_str(&template[placeholder.span.clone()]),
        }
        last_end = placeholder.span.end;
    }

    out.push_str(&template[last_end..]);
    out
}
