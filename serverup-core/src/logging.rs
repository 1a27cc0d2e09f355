//! Logging context handed to components at construction.
//!
//! Each component gets its own named `tracing` span instead of reaching for a
//! process-wide channel. The owner tears the context down explicitly with
//! [`LogContext::close`] when the component is no longer used.

use tracing::{debug, Span};

/// A named logging scope.
///
/// Cloning is cheap; clones share the same span.
#[derive(Debug, Clone)]
pub struct LogContext {
    name: String,
    span: Span,
}

impl LogContext {
    /// Creates a root context.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let span = tracing::info_span!("serverup", channel = %name);
        debug!(parent: &span, "log context opened");
        Self { name, span }
    }

    /// A context that records nothing (for tests and embedding without a subscriber).
    pub fn disabled() -> Self {
        Self {
            name: String::new(),
            span: Span::none(),
        }
    }

    /// Creates a child context for a component, nested under this one.
    pub fn child(&self, component: &str) -> Self {
        let span = tracing::info_span!(parent: &self.span, "component", name = component);
        let name = if self.name.is_empty() {
            component.to_string()
        } else {
            format!("{}.{}", self.name, component)
        };
        Self { name, span }
    }

    /// Dotted name of this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying span, for `in_scope` or `Instrument::instrument`.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Runs a closure inside this context's span.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.span.in_scope(f)
    }

    /// Tears the context down.
    pub fn close(self) {
        debug!(parent: &self.span, channel = %self.name, "log context closed");
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_names_are_dotted() {
        let root = LogContext::new("serverup");
        let child = root.child("acquisition");
        assert_eq!(child.name(), "serverup.acquisition");
        child.close();
        root.close();
    }

    #[test]
    fn test_disabled_child_has_plain_name() {
        let ctx = LogContext::disabled().child("variables");
        assert_eq!(ctx.name(), "variables");
    }

    #[test]
    fn test_in_scope_returns_value() {
        let ctx = LogContext::new("test");
        assert_eq!(ctx.in_scope(|| 41 + 1), 42);
    }
}
