//! End-to-end configuration merging from on-disk fragments

use release_hooks::config::{
    merge, ConfigLayers, ConfigNode, ConfigOrigin, EffectiveConfig, FormatRegistry, Scalar,
};
use release_hooks::{Environment, ReleaseError, ReleasePipeline, RunKind};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_override_fragment_wins_and_keeps_unset_fields() {
    let dir = TempDir::new().unwrap();
    let base = write(
        &dir,
        "base.toml",
        r#"
[[hooks.before]]
name = "build"
cmd = "echo base"
timeout = 30
"#,
    );
    let override_ = write(
        &dir,
        "override.json",
        r#"{"hooks": {"before": [{"name": "build", "cmd": "echo override"}]}}"#,
    );

    let layers = ConfigLayers {
        files: vec![
            (ConfigOrigin::Repo, base),
            (ConfigOrigin::Cli, override_),
        ],
        cli_overrides: None,
    };
    let pipeline = ReleasePipeline::load(
        &layers,
        &FormatRegistry::builtin(),
        None,
        &Environment::default(),
    )
    .unwrap();

    let hooks = &pipeline.hooks().before;
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].cmd, "echo override");
    assert_eq!(hooks[0].timeout, Some(Duration::from_secs(30)));
}

#[test]
fn test_hooks_without_shared_name_are_unioned_in_order() {
    let dir = TempDir::new().unwrap();
    let host = write(
        &dir,
        "host.yaml",
        "hooks:\n  before:\n    - name: lint\n      cmd: cargo clippy\n",
    );
    let repo = write(
        &dir,
        "repo.toml",
        "[[hooks.before]]\nname = \"test\"\ncmd = \"cargo test\"\n",
    );

    let layers = ConfigLayers {
        files: vec![(ConfigOrigin::Repo, repo), (ConfigOrigin::Host, host)],
        cli_overrides: None,
    };
    let pipeline = ReleasePipeline::load(
        &layers,
        &FormatRegistry::builtin(),
        None,
        &Environment::default(),
    )
    .unwrap();

    let names: Vec<_> = pipeline
        .hooks()
        .before
        .iter()
        .map(|h| h.name.as_str())
        .collect();
    assert_eq!(names, vec!["lint", "test"]);
}

#[test]
fn test_shape_conflict_aborts_before_hooks_load() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.toml", "[release]\nkind = \"release\"\n");
    let b = write(&dir, "b.json", r#"{"release": "oops"}"#);

    let layers = ConfigLayers {
        files: vec![(ConfigOrigin::Repo, a), (ConfigOrigin::Cli, b)],
        cli_overrides: None,
    };
    let err = ReleasePipeline::load(
        &layers,
        &FormatRegistry::builtin(),
        None,
        &Environment::default(),
    )
    .unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert!(matches!(err, ReleaseError::Config(_)));
    assert!(err.to_string().contains("release"));
}

#[test]
fn test_distributions_merge_recursively() {
    let dir = TempDir::new().unwrap();
    let a = write(
        &dir,
        "a.toml",
        "[distributions.app]\nplatform = \"linux-x86_64\"\n[distributions.docs]\n",
    );
    let b = write(
        &dir,
        "b.toml",
        "[distributions.app]\nformat = \"tar\"\n[distributions.cli]\nplatform = \"osx-aarch_64\"\n",
    );

    let config = EffectiveConfig::load(
        &ConfigLayers {
            files: vec![(ConfigOrigin::Repo, a), (ConfigOrigin::Repo, b)],
            cli_overrides: None,
        },
        &FormatRegistry::builtin(),
    )
    .unwrap();

    let pipeline = ReleasePipeline::prepare(config, Some(RunKind::Release), &Environment::default())
        .unwrap();
    let targets = pipeline.targets();
    let names: Vec<_> = targets.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["app", "docs", "cli"]);
    assert_eq!(targets[0].platform.as_deref(), Some("linux-x86_64"));

    let view = pipeline.config().projection().view();
    let app = view.entries("distributions")[0].1;
    assert_eq!(app.get_str("format"), Some("tar"));
}

#[test]
fn test_merge_laws() {
    let a = ConfigNode::new()
        .with("cmd", Scalar::from("echo base"))
        .with("timeout", Scalar::from(30_i64));

    assert_eq!(merge(a.clone(), ConfigNode::new()).unwrap(), a);
    assert_eq!(merge(a.clone(), a.clone()).unwrap(), a);
}

#[test]
fn test_frozen_projection_is_shared() {
    let config = EffectiveConfig::build(Vec::new()).unwrap();
    let copy = config.clone();
    assert!(config.projection().ptr_eq(copy.projection()));

    let mut mutable = config.projection().to_mutable();
    mutable.set("release", Scalar::from("changed"));
    assert_eq!(config.get_str("release.kind"), Some("release"));
}
