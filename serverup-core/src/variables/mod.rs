//! `${...}` variable expansion.
//!
//! - [`placeholder`] - finding and substituting `${name}` occurrences
//! - [`environment`] - environment variables and computed values
//! - [`resolver`] - fixed-point resolution over a whole mapping

pub mod environment;
pub mod placeholder;
pub mod resolver;

pub use environment::{ComputedVariable, EnvironmentProvider, FixedEnvironment, HostEnvironment};
pub use placeholder::{parse_placeholders, Placeholder};
pub use resolver::{ResolutionReport, VariableResolver};
