//! Resolution against the real host environment.

use serverup_core::variables::{HostEnvironment, VariableResolver};
use std::collections::HashMap;
use std::path::PathBuf;

fn input(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_host_environment_variables() {
    std::env::set_var("SERVERUP_IT_TOOLCHAIN", "nightly");

    let resolver = VariableResolver::new(HostEnvironment::new());
    let out = resolver.resolve(&input(&[
        ("TOOLCHAIN", "${env:SERVERUP_IT_TOOLCHAIN}"),
        ("ARGS", "+${TOOLCHAIN} ${env:SERVERUP_IT_NEVER_SET}"),
    ]));

    assert_eq!(out["TOOLCHAIN"], "nightly");
    assert_eq!(out["ARGS"], "+nightly ");
}

#[test]
fn test_workspace_values_follow_first_root() {
    let root = std::env::temp_dir().join("serverup-it").join("project");
    let resolver = VariableResolver::new(HostEnvironment::with_workspace_roots(vec![
        root.clone(),
        PathBuf::from("ignored"),
    ]));

    let out = resolver.resolve(&input(&[
        ("TARGET", "${workspaceFolder}${pathSeparator}target"),
        ("NAME", "${workspaceFolderBasename}"),
    ]));

    assert_eq!(PathBuf::from(&out["TARGET"]), root.join("target"));
    assert_eq!(out["NAME"], "project");
}

#[test]
fn test_cycles_and_unknowns_degrade_to_text() {
    let resolver = VariableResolver::new(HostEnvironment::new());
    let report = resolver.resolve_with_report(&input(&[
        ("A", "${B}"),
        ("B", "${A}"),
        ("C", "${config:rune.server}"),
        ("D", "${notComputed}"),
    ]));

    assert_eq!(report.values["A"], "${B}");
    assert_eq!(report.values["B"], "${A}");
    assert_eq!(report.values["C"], "${config:rune.server}");
    assert_eq!(report.values["D"], "${notComputed}");
    assert_eq!(report.unresolved, vec!["A", "B"]);
}
