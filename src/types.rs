use std::path::PathBuf;

/// Answer recorded when the analyzer can no longer be reached.
pub const NO_ANSWER: &str = "<no answer>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub declarations: String,
    pub query: String,
    pub expected: String,
    /// 1-based line of `declarations` in the fixture file.
    pub line: usize,
}

/// Lines left over at the end of a fixture that do not make up a full case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedTail {
    pub line: usize,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TestFixture {
    pub test_name: String,
    pub source_number: String,
    pub path: PathBuf,
    pub cases: Vec<TestCase>,
    pub malformed: Option<MalformedTail>,
}

/// One fixture file paired with the source file the analyzer must load for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixturePlan {
    pub test_name: String,
    pub source_number: String,
    pub test_path: PathBuf,
    pub source_path: PathBuf,
}

impl FixturePlan {
    pub fn file_name(&self) -> String {
        self.test_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.test_name.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Mismatch,
    /// The analyzer went away before answering.
    BrokenChannel,
    /// Not sent because an earlier case in the same fixture hit a broken channel.
    NotAsked,
    Malformed,
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub case: TestCase,
    pub actual: String,
    pub outcome: Outcome,
    pub passed: bool,
}

impl CaseResult {
    pub fn new(case: TestCase, actual: String, outcome: Outcome) -> Self {
        Self {
            passed: outcome == Outcome::Passed,
            case,
            actual,
            outcome,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileScoreboard {
    pub plan: FixturePlan,
    pub results: Vec<CaseResult>,
}

impl FileScoreboard {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunScoreboard {
    pub total_passed: usize,
    pub total_failed: usize,
    pub fixtures_run: usize,
    pub fixtures_skipped: usize,
}

impl RunScoreboard {
    pub fn add(&mut self, file: &FileScoreboard) {
        self.total_passed += file.passed();
        self.total_failed += file.failed();
        self.fixtures_run += 1;
    }
}
