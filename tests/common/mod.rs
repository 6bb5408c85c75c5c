#![allow(dead_code)]

use query_harness::session::AnalyzerCommand;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Answers `value <name>` with the value of the latest `<name>=<n>;` declaration it has
/// been sent in this session, or `none`.
pub const RECALL: &str = r#"
[ -f "$1" ] || { echo "no source $1" >&2; exit 1; }
echo "loading $1"
echo "Ready"
vars=""
while IFS= read -r decl && IFS= read -r query; do
  vars="$vars
$decl"
  name="${query#value }"
  answer=$(printf '%s\n' "$vars" | sed -n "s/^${name}=\([0-9]*\);\$/\1/p" | tail -n 1)
  [ -n "$answer" ] || answer=none
  echo "$answer"
done
"#;

/// Replies with the query minus its `echo ` prefix.
pub const ECHO: &str = r#"
echo "Ready"
while IFS= read -r decl && IFS= read -r query; do
  echo "${query#echo }"
done
"#;

/// Never gets ready.
pub const SLEEPY: &str = r#"
echo "loading, please wait"
exec sleep 5
"#;

/// Dies while loading.
pub const CRASHING: &str = r#"
echo "loading"
echo "parse error in $1" >&2
exit 3
"#;

/// Answers one request, then exits.
pub const ONE_SHOT: &str = r#"
echo "Ready"
IFS= read -r decl
IFS= read -r query
echo 1
"#;

/// Dies after one answer when loading `source1.txt`, echoes like [`ECHO`] otherwise.
pub const FRAGILE_ON_FIRST_SOURCE: &str = r#"
echo "Ready"
case "$1" in
  *source1.txt)
    IFS= read -r decl
    IFS= read -r query
    echo 1
    exit 0
    ;;
esac
while IFS= read -r decl && IFS= read -r query; do
  echo "${query#echo }"
done
"#;

/// Runs `script` through `/bin/sh`, so the file never has to be executable.
pub fn stub(dir: &Path, name: &str, script: &str) -> AnalyzerCommand {
    let path = dir.join(name);
    fs::write(&path, script).expect("write stub");
    let mut command = AnalyzerCommand::new("/bin/sh");
    command.args = vec![path.to_string_lossy().into_owned()];
    command.preparation_timeout = Duration::from_secs(5);
    command
}
