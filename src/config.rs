use crate::fixture::Encoding;
use crate::session::{AnalyzerCommand, PREPARATION_TIMEOUT};
use crate::t_args;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "harness.yaml";
pub const DEFAULT_ANALYZER: &str = "java";
pub const DEFAULT_ANALYZER_ARGS: [&str; 2] = ["-jar", "target/TreeSitter-1.0-SNAPSHOT.jar"];
pub const DEFAULT_SOURCES_DIR: &str = "simple/simple_sources";
pub const DEFAULT_TESTS_DIR: &str = "simple/simple_tests";
pub const DEFAULT_BREADCRUMB: &str = "test_output.txt";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AnalyzerCfg {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    /// Seconds
    pub preparation_timeout: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FixturesCfg {
    pub sources: Option<String>,
    pub tests: Option<String>,
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct RawConfig {
    pub analyzer: Option<AnalyzerCfg>,
    pub fixtures: Option<FixturesCfg>,
    pub breadcrumb: Option<String>,
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub analyzer: Option<String>,
    pub analyzer_args: Vec<String>,
    pub sources: Option<PathBuf>,
    pub tests: Option<PathBuf>,
    pub timeout: Option<f64>,
    pub encoding: Option<Encoding>,
    pub breadcrumb: Option<PathBuf>,
    pub no_breadcrumb: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub analyzer: AnalyzerCommand,
    pub sources_dir: PathBuf,
    pub tests_dir: PathBuf,
    pub encoding: Encoding,
    pub breadcrumb: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<RawConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| t_args!("config-failed-to-read", "file" => path.display()))?;
    let raw: RawConfig = serde_yaml::from_str(&content)
        .with_context(|| t_args!("config-yaml-error", "file" => path.display()))?;
    Ok(raw)
}

/// Loads the explicit config file, or `harness.yaml` if it exists; no file means defaults.
pub fn load_settings(explicit: Option<&Path>, overrides: &Overrides) -> Result<Settings> {
    let (raw, base) = match explicit {
        Some(path) => (load_config(path)?, path.parent().map(Path::to_path_buf)),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                (load_config(default)?, None)
            } else {
                (RawConfig::default(), None)
            }
        }
    };
    resolve(&raw, base.as_deref(), overrides)
}

fn resolve_path_relative_to(path: &str, base: Option<&Path>) -> PathBuf {
    let path = Path::new(path.trim());
    match base {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

fn seconds(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| t_args!("config-bad-timeout", "value" => value))
}

pub fn resolve(raw: &RawConfig, base: Option<&Path>, overrides: &Overrides) -> Result<Settings> {
    let analyzer_cfg = raw.analyzer.clone().unwrap_or_default();
    let fixtures_cfg = raw.fixtures.clone().unwrap_or_default();

    let program = overrides
        .analyzer
        .clone()
        .or(analyzer_cfg.command)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| DEFAULT_ANALYZER.to_string());
    let args = if !overrides.analyzer_args.is_empty() {
        overrides.analyzer_args.clone()
    } else if let Some(args) = analyzer_cfg.args {
        args
    } else if overrides.analyzer.is_some() {
        Vec::new()
    } else {
        DEFAULT_ANALYZER_ARGS.iter().map(|s| s.to_string()).collect()
    };
    let preparation_timeout = match overrides.timeout.or(analyzer_cfg.preparation_timeout) {
        Some(secs) => seconds(secs)?,
        None => PREPARATION_TIMEOUT,
    };

    let sources_dir = overrides.sources.clone().unwrap_or_else(|| {
        resolve_path_relative_to(
            fixtures_cfg.sources.as_deref().unwrap_or(DEFAULT_SOURCES_DIR),
            base,
        )
    });
    let tests_dir = overrides.tests.clone().unwrap_or_else(|| {
        resolve_path_relative_to(
            fixtures_cfg.tests.as_deref().unwrap_or(DEFAULT_TESTS_DIR),
            base,
        )
    });

    let breadcrumb = if overrides.no_breadcrumb {
        None
    } else {
        Some(overrides.breadcrumb.clone().unwrap_or_else(|| {
            PathBuf::from(raw.breadcrumb.as_deref().unwrap_or(DEFAULT_BREADCRUMB))
        }))
    };

    Ok(Settings {
        analyzer: AnalyzerCommand {
            program,
            args,
            preparation_timeout,
        },
        sources_dir,
        tests_dir,
        encoding: overrides
            .encoding
            .or(fixtures_cfg.encoding)
            .unwrap_or_default(),
        breadcrumb,
    })
}
