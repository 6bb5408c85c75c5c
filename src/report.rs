use crate::compare::normalize_pair;
use crate::types::{CaseResult, FileScoreboard, FixturePlan, Outcome, RunScoreboard};
use crate::{t, t_args};
use colored::Colorize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputKind {
    /// Failing cases in full, one confirmation line for clean fixtures.
    #[default]
    Normal,
    /// One line per fixture.
    Compact,
    /// One character per case.
    Terse,
    /// Only the scoreboard.
    Final,
}

fn header(plan: &FixturePlan) -> String {
    let source = plan
        .source_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{0} {1} ({2}) {0}", "=".repeat(20), plan.file_name(), source)
        .cyan()
        .to_string()
}

pub fn render_skipped(plan: &FixturePlan, kind: OutputKind) -> String {
    if kind == OutputKind::Final {
        return String::new();
    }
    let msg = t_args!("report-skipped",
        "fixture" => plan.file_name(),
        "source" => plan.source_path.display()
    );
    format!("{}\n", msg.yellow())
}

pub fn render_fixture(file: &FileScoreboard, kind: OutputKind) -> String {
    match kind {
        OutputKind::Normal => render_normal(file),
        OutputKind::Compact => {
            let failed = file.failed();
            let line = t_args!("report-compact",
                "fixture" => file.plan.file_name(),
                "passed" => file.passed(),
                "failed" => failed
            );
            if failed > 0 {
                format!("{}\n", line.red())
            } else {
                format!("{}\n", line.green())
            }
        }
        OutputKind::Terse => {
            let marks: String = file
                .results
                .iter()
                .map(|r| match r.outcome {
                    Outcome::Passed => ".".green().to_string(),
                    Outcome::Mismatch => "F".red().bold().to_string(),
                    Outcome::Malformed => "M".yellow().bold().to_string(),
                    Outcome::BrokenChannel | Outcome::NotAsked => "B".red().to_string(),
                })
                .collect();
            format!("{}: {}\n", file.plan.file_name(), marks)
        }
        OutputKind::Final => String::new(),
    }
}

fn render_normal(file: &FileScoreboard) -> String {
    let mut out = String::new();
    out.push_str(&header(&file.plan));
    out.push('\n');

    if file.failed() == 0 {
        let msg = t_args!("report-all-passed", "count" => file.results.len());
        out.push_str(&format!("{} {}\n", "[OK]".green().bold(), msg.green()));
        return out;
    }

    for (idx, r) in file.results.iter().enumerate().filter(|(_, r)| !r.passed) {
        let title = t_args!("report-case", "index" => idx + 1, "line" => r.case.line);
        out.push_str(&format!("{} {}\n", "[FAIL]".red().bold(), title.red().bold()));
        render_failure(&mut out, r);
    }
    out
}

fn field(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!("  {} {}\n", format!("{label:<13}").bold(), value));
}

fn render_failure(out: &mut String, r: &CaseResult) {
    match r.outcome {
        Outcome::Malformed => {
            out.push_str(&format!("  {}\n", t!("report-malformed").yellow()));
            for line in [&r.case.declarations, &r.case.query] {
                if !line.is_empty() {
                    out.push_str(&format!("  {}\n", line.dimmed()));
                }
            }
        }
        Outcome::NotAsked => {
            field(out, &t!("label-query"), &r.case.query);
            out.push_str(&format!("  {}\n", t!("report-not-asked").yellow()));
        }
        Outcome::BrokenChannel | Outcome::Mismatch | Outcome::Passed => {
            field(out, &t!("label-declarations"), &r.case.declarations);
            field(out, &t!("label-query"), &r.case.query);
            let (expected, actual) = normalize_pair(&r.case.expected, &r.actual);
            field(out, &t!("label-expected"), &expected.join(", ").green().to_string());
            if r.outcome == Outcome::BrokenChannel {
                field(out, &t!("label-actual"), &r.actual.red().to_string());
                out.push_str(&format!("  {}\n", t!("report-broken-channel").yellow()));
            } else {
                field(out, &t!("label-actual"), &actual.join(", ").red().to_string());
            }
        }
    }
}

pub fn render_scoreboard(board: &RunScoreboard) -> String {
    let failed = if board.total_failed > 0 {
        board.total_failed.to_string().red().bold().to_string()
    } else {
        board.total_failed.to_string().green().to_string()
    };
    let mut out = t_args!("scoreboard",
        "passed" => board.total_passed.to_string().green(),
        "failed" => failed
    );
    out.push('\n');
    if board.fixtures_skipped > 0 {
        let skipped = t_args!("scoreboard-skipped", "count" => board.fixtures_skipped);
        out.push_str(&format!("{}\n", skipped.yellow()));
    }
    out
}

/// Process exit status for a finished run: any failed case makes it non-zero.
pub fn exit_code(board: &RunScoreboard) -> i32 {
    if board.total_failed == 0 { 0 } else { 1 }
}

pub fn print_fixture(file: &FileScoreboard, kind: OutputKind) {
    print!("{}", render_fixture(file, kind));
}

pub fn print_skipped(plan: &FixturePlan, kind: OutputKind) {
    print!("{}", render_skipped(plan, kind));
}

pub fn print_scoreboard(board: &RunScoreboard) {
    print!("{}", render_scoreboard(board));
}
