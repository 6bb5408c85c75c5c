use crate::error::{HarnessError, Result};
use crate::types::{FixturePlan, MalformedTail, TestCase, TestFixture};
use oem_cp::code_table::DECODING_TABLE_CP852;
use oem_cp::decode_string_complete_table;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Text encoding of fixture files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Encoding {
    /// DOS Central European (code page 852). Fixtures are written in it.
    #[default]
    #[serde(alias = "ibm852", alias = "cp852", alias = "IBM852")]
    Ibm852,
    #[serde(alias = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
}

impl Encoding {
    /// Decodes raw fixture bytes. Code page 852 maps every byte, so only UTF-8 can fail.
    pub fn decode(self, bytes: &[u8]) -> std::result::Result<String, String> {
        match self {
            Encoding::Ibm852 => Ok(decode_string_complete_table(
                bytes,
                &DECODING_TABLE_CP852,
            )),
            Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string()),
        }
    }
}

/// Groups fixture text into `(declarations, query, expected)` triples.
///
/// Empty lines are ignored and line terminators are stripped; everything else in a
/// line is kept verbatim. Fewer than three lines at the end become a [`MalformedTail`].
pub fn parse_cases(text: &str) -> (Vec<TestCase>, Option<MalformedTail>) {
    let lines: Vec<(usize, &str)> = text
        .split('\n')
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    let mut cases = Vec::with_capacity(lines.len() / 3);
    let mut chunks = lines.chunks(3);
    for chunk in chunks.by_ref() {
        if let [(line, declarations), (_, query), (_, expected)] = chunk {
            cases.push(TestCase {
                declarations: declarations.to_string(),
                query: query.to_string(),
                expected: expected.to_string(),
                line: *line,
            });
        } else {
            let tail = MalformedTail {
                line: chunk[0].0,
                lines: chunk.iter().map(|(_, l)| l.to_string()).collect(),
            };
            return (cases, Some(tail));
        }
    }
    (cases, None)
}

pub fn load_fixture(plan: &FixturePlan, encoding: Encoding) -> Result<TestFixture> {
    let path = &plan.test_path;
    let bytes = fs::read(path).map_err(|e| read_error(path, e.to_string()))?;
    let text = encoding.decode(&bytes).map_err(|e| read_error(path, e))?;
    let (cases, malformed) = parse_cases(&text);
    debug!(
        fixture = %path.display(),
        cases = cases.len(),
        malformed = malformed.is_some(),
        "parsed fixture"
    );
    Ok(TestFixture {
        test_name: plan.test_name.clone(),
        source_number: plan.source_number.clone(),
        path: path.clone(),
        cases,
        malformed,
    })
}

fn read_error(path: &Path, reason: String) -> HarnessError {
    HarnessError::FixtureRead {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_lines_into_triples_in_order() {
        let (cases, tail) = parse_cases("x=1;\nvalue x\n1\ny=2;\nvalue y\n2\n");
        assert!(tail.is_none());
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].declarations, "x=1;");
        assert_eq!(cases[0].query, "value x");
        assert_eq!(cases[0].expected, "1");
        assert_eq!(cases[1].line, 4);
    }

    #[test]
    fn keeps_inner_spaces_and_strips_crlf() {
        let (cases, _) = parse_cases("stmt s; \r\n Select s\r\n 1, 2 \r\n");
        assert_eq!(cases[0].declarations, "stmt s; ");
        assert_eq!(cases[0].query, " Select s");
        assert_eq!(cases[0].expected, " 1, 2 ");
    }

    #[test]
    fn skips_blank_lines() {
        let (cases, tail) = parse_cases("a;\n\nq\n\n1\n\n");
        assert!(tail.is_none());
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].expected, "1");
    }

    #[test]
    fn trailing_partial_group_is_malformed() {
        let (cases, tail) = parse_cases("a;\nq\n1\nleftover\n");
        assert_eq!(cases.len(), 1);
        let tail = tail.expect("tail");
        assert_eq!(tail.line, 4);
        assert_eq!(tail.lines, vec!["leftover"]);
    }

    #[test]
    fn decodes_code_page_852() {
        // 0xA5 = ą, 0x88 = ł, 0x98 = Ś
        let text = Encoding::Ibm852.decode(b"z\xA5b \x88 \x98").unwrap();
        assert_eq!(text, "ząb ł Ś");
        assert!(Encoding::Utf8.decode(b"\xA5").is_err());
    }
}
