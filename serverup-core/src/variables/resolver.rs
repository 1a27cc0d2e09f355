//! Fixed-point resolution of `${...}` references between named values.
//!
//! Every value may reference other entries of the same mapping by bare name,
//! environment variables as `${env:NAME}`, and computed values such as
//! `${workspaceFolder}`. Resolution never fails: anything that cannot be
//! expanded is left as literal text.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

use super::environment::EnvironmentProvider;
use super::placeholder::{literal, parse_placeholders, split_prefix, substitute};
use crate::logging::LogContext;

/// Prefix that routes a reference to the process environment.
const ENV_PREFIX: &str = "env";

/// Working record for one referenced name.
#[derive(Debug, Clone)]
struct ResolutionEntry {
    value: String,
    dependencies: HashSet<String>,
    resolved: bool,
}

impl ResolutionEntry {
    fn pending(raw: &str) -> Self {
        let dependencies = parse_placeholders(raw)
            .into_iter()
            .map(|p| p.name)
            .collect();
        Self {
            value: raw.to_string(),
            dependencies,
            resolved: false,
        }
    }

    fn external(value: String) -> Self {
        Self {
            value,
            dependencies: HashSet::new(),
            resolved: true,
        }
    }
}

/// Outcome of a resolution with diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Resolved value for every input key.
    pub values: HashMap<String, String>,
    /// Input keys that could not be resolved (cycles), sorted.
    pub unresolved: Vec<String>,
    /// Number of passes the fixed-point loop ran.
    pub passes: usize,
}

impl ResolutionReport {
    /// Returns true if every input key was fully resolved.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Expands `${...}` references in a mapping of named templates.
pub struct VariableResolver<E> {
    env: E,
    log: LogContext,
}

impl<E: EnvironmentProvider> VariableResolver<E> {
    /// Creates a resolver backed by the given environment.
    pub fn new(env: E) -> Self {
        Self::with_log(env, LogContext::disabled())
    }

    /// Creates a resolver that logs inside the given context.
    pub fn with_log(env: E, log: LogContext) -> Self {
        Self { env, log }
    }

    /// Resolves every value of `input`.
    pub fn resolve(&self, input: &HashMap<String, String>) -> HashMap<String, String> {
        self.resolve_with_report(input).values
    }

    /// Resolves a JSON object, coercing scalar values to strings first.
    ///
    /// `null` becomes the empty string. Arrays and objects cannot be templates
    /// and are dropped.
    pub fn resolve_json(&self, input: &serde_json::Map<String, Value>) -> HashMap<String, String> {
        let mut strings = HashMap::with_capacity(input.len());
        for (name, value) in input {
            let raw = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    self.log.in_scope(|| {
                        warn!(variable = %name, "Skipping non-scalar variable value");
                    });
                    continue;
                }
            };
            strings.insert(name.clone(), raw);
        }
        self.resolve(&strings)
    }

    /// Resolves every value of `input` and reports what could not be resolved.
    pub fn resolve_with_report(&self, input: &HashMap<String, String>) -> ResolutionReport {
        self.log.in_scope(|| self.run(input))
    }

    fn run(&self, input: &HashMap<String, String>) -> ResolutionReport {
        let mut entries: HashMap<String, ResolutionEntry> = input
            .iter()
            .map(|(name, raw)| (name.clone(), ResolutionEntry::pending(raw)))
            .collect();

        let external: BTreeSet<String> = entries
            .values()
            .flat_map(|e| e.dependencies.iter())
            .filter(|dep| !input.contains_key(*dep))
            .cloned()
            .collect();

        for name in external {
            let value = self.external_value(&name);
            entries.insert(name, ResolutionEntry::external(value));
        }

        let mut pending: Vec<String> = input.keys().cloned().collect();
        let mut passes = 0;

        while !pending.is_empty() {
            passes += 1;
            let before = pending.len();
            let mut blocked = Vec::with_capacity(before);

            for name in pending {
                let Some(entry) = entries.get(&name) else {
                    continue;
                };
                let ready = entry
                    .dependencies
                    .iter()
                    .all(|dep| entries.get(dep).is_some_and(|e| e.resolved));

                if !ready {
                    blocked.push(name);
                    continue;
                }

                let expanded = substitute(&entry.value, |dep| {
                    entries.get(dep).map(|e| e.value.as_str())
                });
                if let Some(entry) = entries.get_mut(&name) {
                    entry.value = expanded;
                    entry.resolved = true;
                }
            }

            pending = blocked;
            if pending.len() == before {
                break;
            }
        }

        let mut unresolved = pending;
        unresolved.sort();

        debug!(
            variables = input.len(),
            passes,
            unresolved = unresolved.len(),
            "Resolved variables"
        );
        if !unresolved.is_empty() {
            warn!(names = ?unresolved, "Cyclic variable references left unexpanded");
        }

        let values = input
            .keys()
            .map(|name| {
                let value = entries
                    .get(name)
                    .map(|e| e.value.clone())
                    .unwrap_or_default();
                (name.clone(), value)
            })
            .collect();

        ResolutionReport {
            values,
            unresolved,
            passes,
        }
    }

    /// Value for a name that is not a key of the input mapping.
    fn external_value(&self, name: &str) -> String {
        match split_prefix(name) {
            Some((ENV_PREFIX, body)) => self.env.lookup(body),
            Some(_) => literal(name),
            None => self.env.computed(name).unwrap_or_else(|| literal(name)),
        }
    }
}
