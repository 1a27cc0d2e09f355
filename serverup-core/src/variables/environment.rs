//! Host environment access for variable resolution.
//!
//! Two kinds of external values are available to templates:
//!
//! - environment variables, referenced as `${env:NAME}`
//! - a fixed set of computed values, referenced by bare name
//!   (`${workspaceFolder}`, `${cwd}`, ...)

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Source of environment variables and computed values.
pub trait EnvironmentProvider: Send + Sync {
    /// Returns the value of an environment variable, or an empty string if unset.
    fn lookup(&self, name: &str) -> String;

    /// Returns the value of a computed variable.
    ///
    /// `None` means the name is not a recognized computed variable; the caller
    /// keeps the placeholder text in that case.
    fn computed(&self, name: &str) -> Option<String>;
}

// ============================================================================
// Computed Variables
// ============================================================================

/// The recognized computed variable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputedVariable {
    /// Path of the first workspace root.
    WorkspaceFolder,
    /// Base name of the first workspace root.
    WorkspaceFolderBasename,
    /// Current working directory of the process.
    Cwd,
    /// Path of the running executable.
    ExecPath,
    /// Platform path separator (`/` or `\`).
    PathSeparator,
    /// Home directory of the current user.
    UserHome,
}

impl ComputedVariable {
    /// Returns all computed variables.
    pub fn all() -> &'static [ComputedVariable] {
        &[
            Self::WorkspaceFolder,
            Self::WorkspaceFolderBasename,
            Self::Cwd,
            Self::ExecPath,
            Self::PathSeparator,
            Self::UserHome,
        ]
    }

    /// Returns the placeholder name for this variable.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkspaceFolder => "workspaceFolder",
            Self::WorkspaceFolderBasename => "workspaceFolderBasename",
            Self::Cwd => "cwd",
            Self::ExecPath => "execPath",
            Self::PathSeparator => "pathSeparator",
            Self::UserHome => "userHome",
        }
    }
}

impl fmt::Display for ComputedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ComputedVariable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("Unknown computed variable: {}", s))
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ============================================================================
// Host Environment
// ============================================================================

/// Reads the real process environment.
///
/// Workspace roots are supplied by the caller in declaration order; the first
/// one backs `${workspaceFolder}` and `${workspaceFolderBasename}`.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    workspace_roots: Vec<PathBuf>,
}

impl HostEnvironment {
    /// Creates a host environment with no workspace roots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host environment with the given workspace roots.
    pub fn with_workspace_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            workspace_roots: roots.into_iter().collect(),
        }
    }

    fn primary_root(&self) -> Option<&Path> {
        self.workspace_roots.first().map(PathBuf::as_path)
    }
}

impl EnvironmentProvider for HostEnvironment {
    fn lookup(&self, name: &str) -> String {
        std::env::var(name).unwrap_or_default()
    }

    fn computed(&self, name: &str) -> Option<String> {
        let var: ComputedVariable = name.parse().ok()?;
        let value = match var {
            ComputedVariable::WorkspaceFolder => {
                self.primary_root().map(path_string).unwrap_or_default()
            }
            ComputedVariable::WorkspaceFolderBasename => self
                .primary_root()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            ComputedVariable::Cwd => std::env::current_dir()
                .map(|p| path_string(&p))
                .unwrap_or_default(),
            ComputedVariable::ExecPath => std::env::current_exe()
                .map(|p| path_string(&p))
                .unwrap_or_default(),
            ComputedVariable::PathSeparator => std::path::MAIN_SEPARATOR_STR.to_string(),
            ComputedVariable::UserHome => {
                dirs::home_dir().map(|p| path_string(&p)).unwrap_or_default()
            }
        };
        Some(value)
    }
}

// ============================================================================
// Fixed Environment
// ============================================================================

/// An in-memory environment with explicitly set values.
///
/// Computed names that were not set fall back to an empty string if they are
/// recognized, so the recognized set is the same as [`HostEnvironment`].
#[derive(Debug, Clone, Default)]
pub struct FixedEnvironment {
    vars: HashMap<String, String>,
    computed: HashMap<ComputedVariable, String>,
}

impl FixedEnvironment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an environment variable.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Sets a computed value.
    pub fn with_computed(mut self, var: ComputedVariable, value: impl Into<String>) -> Self {
        self.computed.insert(var, value.into());
        self
    }
}

impl EnvironmentProvider for FixedEnvironment {
    fn lookup(&self, name: &str) -> String {
        self.vars.get(name).cloned().unwrap_or_default()
    }

    fn computed(&self, name: &str) -> Option<String> {
        let var: ComputedVariable = name.parse().ok()?;
        Some(self.computed.get(&var).cloned().unwrap_or_default())
    }
}
