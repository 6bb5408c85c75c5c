use crate::types::FixturePlan;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;

static FIXTURE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^test_(?P<name>.+)_source(?P<n>\d+)\.(?P<ext>[^.]+)$")
        .expect("fixture name pattern is valid")
});

/// Parses `test_<name>_source<N>.<ext>` into the plan for that fixture.
pub fn plan_for(file_name: &str, tests_dir: &Path, sources_dir: &Path) -> Option<FixturePlan> {
    let caps = FIXTURE_NAME.captures(file_name)?;
    let number = &caps["n"];
    let ext = &caps["ext"];
    Some(FixturePlan {
        test_name: caps["name"].to_string(),
        source_number: number.to_string(),
        test_path: tests_dir.join(file_name),
        source_path: sources_dir.join(format!("source{number}.{ext}")),
    })
}

/// Lists the fixtures in `tests_dir` ordered by source number, then file name.
/// Paired sources are not checked here; a missing one is a skip at run time.
pub fn discover(tests_dir: &Path, sources_dir: &Path) -> Result<Vec<FixturePlan>> {
    let mut plans = Vec::new();
    for entry in WalkDir::new(tests_dir).min_depth(1).max_depth(1) {
        let entry = entry
            .with_context(|| format!("cannot list fixtures in {}", tests_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if let Some(plan) = plan_for(&file_name, tests_dir, sources_dir) {
            plans.push(plan);
        }
    }
    plans.sort_by(|a, b| {
        let na = a.source_number.trim_start_matches('0');
        let nb = b.source_number.trim_start_matches('0');
        na.len()
            .cmp(&nb.len())
            .then_with(|| na.cmp(nb))
            .then_with(|| a.test_path.cmp(&b.test_path))
    });
    Ok(plans)
}
