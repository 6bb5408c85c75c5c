use anyhow::Result;
use clap::{Parser, ValueEnum};
use colored::control::set_override as set_color_override;
use query_harness::config::{Overrides, Settings, load_settings};
use query_harness::discover::discover;
use query_harness::engine::{FixtureEvent, RunOptions, run_fixtures};
use query_harness::fixture::Encoding;
use query_harness::i18n;
use query_harness::report::{
    OutputKind, exit_code, print_fixture, print_scoreboard, print_skipped,
};
use query_harness::types::FixturePlan;
use query_harness::{t, t_args};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Normal,
    Compact,
    Terse,
    Final,
}

impl From<OutputFormat> for OutputKind {
    fn from(v: OutputFormat) -> Self {
        match v {
            OutputFormat::Normal => OutputKind::Normal,
            OutputFormat::Compact => OutputKind::Compact,
            OutputFormat::Terse => OutputKind::Terse,
            OutputFormat::Final => OutputKind::Final,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum EncodingOpt {
    Ibm852,
    #[value(name = "utf-8", alias = "utf8")]
    Utf8,
}

impl From<EncodingOpt> for Encoding {
    fn from(v: EncodingOpt) -> Self {
        match v {
            EncodingOpt::Ibm852 => Encoding::Ibm852,
            EncodingOpt::Utf8 => Encoding::Utf8,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(version, author, about = t!("cli-about"))]
struct Cli {
    // Defaults to ./harness.yaml when present
    #[arg(short = 'C', long, value_name = "FILE", help = t!("cli-config"))]
    config: Option<PathBuf>,

    #[arg(long, value_name = "CMD", help = t!("cli-analyzer"))]
    analyzer: Option<String>,

    #[arg(
        long = "analyzer-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        help = t!("cli-analyzer-arg")
    )]
    analyzer_args: Vec<String>,

    #[arg(long, value_name = "DIR", help = t!("cli-sources"))]
    sources: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = t!("cli-tests"))]
    tests: Option<PathBuf>,

    #[arg(long, value_name = "SECS", help = t!("cli-timeout"))]
    timeout: Option<f64>,

    #[arg(long, value_enum, help = t!("cli-encoding"))]
    encoding: Option<EncodingOpt>,

    #[arg(
        long,
        value_name = "FILE",
        conflicts_with = "no_breadcrumb",
        help = t!("cli-breadcrumb")
    )]
    breadcrumb: Option<PathBuf>,

    #[arg(long = "no-breadcrumb", help = t!("cli-no-breadcrumb"))]
    no_breadcrumb: bool,

    // -t/--test: fixture name or file name. Special: list prints all fixtures and exits.
    #[arg(short = 't', long = "test", value_name = "TEST", help = t!("cli-test"))]
    test: Option<String>,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "normal",
        help = t!("cli-output")
    )]
    output: OutputFormat,

    #[arg(short = 'q', long = "silent", help = t!("cli-silent"))]
    silent: bool,

    #[arg(long = "no-color", help = t!("cli-no-color"))]
    no_color: bool,

    #[arg(short = 'v', long = "verbose", help = t!("cli-verbose"))]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            analyzer: self.analyzer.clone(),
            analyzer_args: self.analyzer_args.clone(),
            sources: self.sources.clone(),
            tests: self.tests.clone(),
            timeout: self.timeout,
            encoding: self.encoding.map(Encoding::from),
            breadcrumb: self.breadcrumb.clone(),
            no_breadcrumb: self.no_breadcrumb,
        }
    }
}

fn display_path(path: &Path) -> String {
    match std::fs::canonicalize(path) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => path.display().to_string(),
    }
}

fn resolve_analyzer_path(cmd: &str) -> String {
    if cmd.contains(std::path::MAIN_SEPARATOR) || cmd.starts_with("./") {
        return display_path(Path::new(cmd));
    }
    match which::which(cmd) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => cmd.to_string(),
    }
}

fn print_test_list(plans: &[FixturePlan], to_stderr: bool) {
    let heading = t!("available-tests");
    let lines = plans.iter().enumerate().map(|(idx, p)| {
        let status = if p.source_path.is_file() {
            t!("source-present")
        } else {
            t!("source-missing")
        };
        t_args!("test-list-item",
            "index" => (idx + 1),
            "fixture" => p.file_name(),
            "source" => p.source_path.display(),
            "status" => status
        )
    });
    if to_stderr {
        eprintln!("{heading}");
        lines.for_each(|l| eprintln!("{l}"));
    } else {
        println!("{heading}");
        lines.for_each(|l| println!("{l}"));
    }
}

fn log_settings(settings: &Settings) {
    info!(
        "{}",
        t_args!("info-version",
            "name" => env!("CARGO_PKG_NAME"),
            "version" => env!("CARGO_PKG_VERSION")
        )
    );
    info!(
        "{}",
        t_args!("info-analyzer",
            "path" => resolve_analyzer_path(&settings.analyzer.program),
            "args" => settings.analyzer.args.join(" ")
        )
    );
    info!("{}", t_args!("info-sources", "path" => display_path(&settings.sources_dir)));
    info!("{}", t_args!("info-tests", "path" => display_path(&settings.tests_dir)));
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize localization first, the help text depends on it
    i18n::init();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        // With -v, show INFO and above, but allow RUST_LOG to override for debug/trace
        std::env::var("RUST_LOG").unwrap_or_else(|_| "query_harness=info".to_string())
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "query_harness=warn".to_string())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    set_color_override(!cli.no_color);

    let settings = load_settings(cli.config.as_deref(), &cli.overrides())?;
    if cli.verbose {
        log_settings(&settings);
    }

    let mut plans = discover(&settings.tests_dir, &settings.sources_dir)?;

    if let Some(sel) = &cli.test {
        let trimmed = sel.trim();
        if trimmed.eq_ignore_ascii_case("list") {
            print_test_list(&plans, false);
            return Ok(());
        }
        plans.retain(|p| p.test_name == trimmed || p.file_name() == trimmed);
        if plans.is_empty() {
            error!("{}", t_args!("error-test-not-found", "test" => trimmed));
            print_test_list(
                &discover(&settings.tests_dir, &settings.sources_dir)?,
                true,
            );
            std::process::exit(2);
        }
    }
    if plans.is_empty() {
        warn!(
            "{}",
            t_args!("warn-no-fixtures", "dir" => settings.tests_dir.display())
        );
    }

    let options = RunOptions {
        encoding: settings.encoding,
        breadcrumb: settings.breadcrumb.clone(),
    };
    let kind = OutputKind::from(cli.output);
    let board = run_fixtures(&settings.analyzer, &plans, &options, |event| {
        if cli.silent {
            return;
        }
        match event {
            FixtureEvent::Skipped(plan) => print_skipped(plan, kind),
            FixtureEvent::Finished(file) => print_fixture(file, kind),
        }
    })
    .await?;

    print_scoreboard(&board);
    info!(
        "{}",
        t_args!("info-all-finished",
            "fixtures" => board.fixtures_run,
            "passed" => board.total_passed,
            "failed" => board.total_failed
        )
    );

    let code = exit_code(&board);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
