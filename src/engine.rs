use crate::compare::answers_match;
use crate::error::Result;
use crate::fixture::{Encoding, load_fixture};
use crate::session::{Answer, Launcher, Session};
use crate::types::{
    CaseResult, FileScoreboard, FixturePlan, MalformedTail, NO_ANSWER, Outcome, RunScoreboard,
    TestCase, TestFixture,
};
use crate::{t, t_args};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub encoding: Encoding,
    /// File overwritten with the last query and its answer after every case.
    pub breadcrumb: Option<PathBuf>,
}

/// Progress reported to the caller as each fixture is dealt with.
#[derive(Debug)]
pub enum FixtureEvent<'a> {
    Skipped(&'a FixturePlan),
    Finished(&'a FileScoreboard),
}

/// Runs every fixture against a fresh analyzer, one at a time.
///
/// A fixture whose source file does not exist is skipped. A fixture that cannot be
/// read, or an analyzer that fails to start or to get ready, ends the whole run with
/// an error and no scoreboard.
pub async fn run_fixtures<L, F>(
    launcher: &L,
    plans: &[FixturePlan],
    options: &RunOptions,
    mut on_event: F,
) -> Result<RunScoreboard>
where
    L: Launcher,
    F: FnMut(FixtureEvent<'_>),
{
    let mut board = RunScoreboard::default();
    for plan in plans {
        if !plan.source_path.is_file() {
            warn!(
                "{}",
                t_args!("warn-missing-source",
                    "fixture" => plan.test_path.display(),
                    "source" => plan.source_path.display()
                )
            );
            board.fixtures_skipped += 1;
            on_event(FixtureEvent::Skipped(plan));
            continue;
        }

        let fixture = load_fixture(plan, options.encoding)?;
        info!(
            "{}",
            t_args!("info-fixture-start",
                "fixture" => plan.file_name(),
                "source" => plan.source_path.display(),
                "count" => fixture.cases.len()
            )
        );

        let mut session = match launcher.start(&plan.source_path).await {
            Ok(session) => session,
            Err(e) => {
                if e.is_handshake_failure() {
                    error!("{}", t!("error-preparation"));
                }
                return Err(e);
            }
        };
        let results = replay(&mut session, &fixture, options.breadcrumb.as_deref()).await;
        session.close().await;

        let file = FileScoreboard {
            plan: plan.clone(),
            results,
        };
        info!(
            "{}",
            t_args!("info-fixture-finished",
                "fixture" => plan.file_name(),
                "passed" => file.passed(),
                "failed" => file.failed()
            )
        );
        board.add(&file);
        on_event(FixtureEvent::Finished(&file));
    }
    Ok(board)
}

/// Asks every case of `fixture` in file order and scores the answers.
///
/// Once the analyzer stops answering, the remaining cases are failed without being
/// sent. A malformed tail always adds one failure at the end.
pub async fn replay<S: Session>(
    session: &mut S,
    fixture: &TestFixture,
    breadcrumb: Option<&Path>,
) -> Vec<CaseResult> {
    let mut results = Vec::with_capacity(fixture.cases.len() + 1);
    let mut broken = false;

    for case in &fixture.cases {
        if broken {
            results.push(CaseResult::new(
                case.clone(),
                NO_ANSWER.to_string(),
                Outcome::NotAsked,
            ));
            continue;
        }
        let result = match session.ask(&case.declarations, &case.query).await {
            Answer::Line(actual) => {
                let outcome = if answers_match(&case.expected, &actual) {
                    Outcome::Passed
                } else {
                    Outcome::Mismatch
                };
                CaseResult::new(case.clone(), actual, outcome)
            }
            Answer::BrokenChannel => {
                warn!(
                    "{}",
                    t_args!("warn-broken-channel",
                        "fixture" => fixture.path.display(),
                        "line" => case.line
                    )
                );
                broken = true;
                CaseResult::new(case.clone(), NO_ANSWER.to_string(), Outcome::BrokenChannel)
            }
        };
        if let Some(path) = breadcrumb {
            write_breadcrumb(path, &case.query, &result.actual);
        }
        results.push(result);
    }

    if let Some(tail) = &fixture.malformed {
        warn!(
            "{}",
            t_args!("warn-malformed",
                "fixture" => fixture.path.display(),
                "line" => tail.line
            )
        );
        results.push(malformed_result(tail));
    }
    results
}

fn malformed_result(tail: &MalformedTail) -> CaseResult {
    let field = |i: usize| tail.lines.get(i).cloned().unwrap_or_default();
    let case = TestCase {
        declarations: field(0),
        query: field(1),
        expected: String::new(),
        line: tail.line,
    };
    CaseResult::new(case, String::new(), Outcome::Malformed)
}

fn write_breadcrumb(path: &Path, query: &str, answer: &str) {
    if let Err(e) = fs::write(path, format!("For query {query}: {answer}\n")) {
        warn!(
            "{}",
            t_args!("warn-breadcrumb", "file" => path.display(), "error" => e)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use std::collections::HashMap;

    /// Answers `value <name>` with the last `<name>=<n>;` seen in this session.
    #[derive(Default)]
    struct Recall {
        vars: HashMap<String, String>,
        asked: usize,
        dies_after: Option<usize>,
    }

    impl Session for Recall {
        async fn ask(&mut self, declarations: &str, query: &str) -> Answer {
            if self.dies_after == Some(self.asked) {
                return Answer::BrokenChannel;
            }
            self.asked += 1;
            if let Some((name, value)) = declarations.trim_end_matches(';').split_once('=') {
                self.vars.insert(name.to_string(), value.to_string());
            }
            let name = query.trim_start_matches("value ");
            Answer::Line(self.vars.get(name).cloned().unwrap_or_else(|| "none".into()))
        }

        async fn close(&mut self) {
            self.dies_after = Some(self.asked);
        }
    }

    fn case(declarations: &str, query: &str, expected: &str) -> TestCase {
        TestCase {
            declarations: declarations.into(),
            query: query.into(),
            expected: expected.into(),
            line: 1,
        }
    }

    fn fixture(cases: Vec<TestCase>, malformed: Option<MalformedTail>) -> TestFixture {
        TestFixture {
            test_name: "recall".into(),
            source_number: "1".into(),
            path: PathBuf::from("test_recall_source1.txt"),
            cases,
            malformed,
        }
    }

    #[tokio::test]
    async fn scores_cases_in_order() {
        let mut session = Recall::default();
        let fx = fixture(
            vec![
                case("x=1;", "value x", "1"),
                case("y=2;", "value x", "1"),
                case("z=3;", "value y", "3"),
            ],
            None,
        );
        let results = replay(&mut session, &fx, None).await;
        let outcomes: Vec<_> = results.iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![Outcome::Passed, Outcome::Passed, Outcome::Mismatch]
        );
        assert_eq!(results[2].actual, "2");
    }

    #[tokio::test]
    async fn broken_channel_stops_sending() {
        let mut session = Recall {
            dies_after: Some(1),
            ..Recall::default()
        };
        let fx = fixture(
            vec![
                case("x=1;", "value x", "1"),
                case("y=2;", "value y", "2"),
                case("z=3;", "value z", "3"),
            ],
            None,
        );
        let results = replay(&mut session, &fx, None).await;
        assert_eq!(session.asked, 1);
        let outcomes: Vec<_> = results.iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![Outcome::Passed, Outcome::BrokenChannel, Outcome::NotAsked]
        );
        assert!(results[1..].iter().all(|r| r.actual == NO_ANSWER && !r.passed));
    }

    #[tokio::test]
    async fn malformed_tail_adds_one_failure_without_asking() {
        let mut session = Recall::default();
        let tail = MalformedTail {
            line: 4,
            lines: vec!["extra".into()],
        };
        let fx = fixture(vec![case("x=1;", "value x", "1")], Some(tail));
        let results = replay(&mut session, &fx, None).await;
        assert_eq!(session.asked, 1);
        assert_eq!(results.len(), 2);
        assert!(results[0].passed);
        assert_eq!(results[1].outcome, Outcome::Malformed);
        assert_eq!(results[1].case.declarations, "extra");
    }

    #[tokio::test]
    async fn breadcrumb_holds_the_last_case() {
        let dir = tempfile::tempdir().unwrap();
        let crumb = dir.path().join("test_output.txt");
        let mut session = Recall::default();
        let fx = fixture(
            vec![case("x=1;", "value x", "1"), case("y=2;", "value y", "2")],
            None,
        );
        replay(&mut session, &fx, Some(&crumb)).await;
        assert_eq!(fs::read_to_string(&crumb).unwrap(), "For query value y: 2\n");
    }

    struct FailingLauncher;

    impl Launcher for FailingLauncher {
        type Session = Recall;

        async fn start(&self, source: &Path) -> Result<Self::Session> {
            Err(HarnessError::PreparationCrash {
                source_file: source.to_path_buf(),
            })
        }
    }

    #[tokio::test]
    async fn skips_missing_sources_before_starting_anything() {
        let plans = vec![FixturePlan {
            test_name: "x".into(),
            source_number: "9".into(),
            test_path: PathBuf::from("/nowhere/test_x_source9.txt"),
            source_path: PathBuf::from("/nowhere/source9.txt"),
        }];
        let mut skipped = 0;
        let board = run_fixtures(&FailingLauncher, &plans, &RunOptions::default(), |ev| {
            if let FixtureEvent::Skipped(_) = ev {
                skipped += 1;
            }
        })
        .await
        .unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(board.total_passed + board.total_failed, 0);
        assert_eq!(board.fixtures_skipped, 1);
    }
}
