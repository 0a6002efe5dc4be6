//! Gate between query synthesis output and the warehouse.
//!
//! Only text starting with the literal `SELECT` is ever executed. The
//! [`StatementGuard::ReadOnly`] mode additionally refuses multi-statement
//! text and write or DDL keywords, since the statement comes straight from a
//! model completion.
//!
//! Quoted literals are read twice: once as standard SQL, where only a doubled
//! quote escapes, and once with Snowflake's backslash escapes. A violation
//! under either reading rejects the statement.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EXECUTABLE_PREFIX: &str = "SELECT";

const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "DROP", "ALTER", "CREATE", "TRUNCATE", "GRANT",
    "REVOKE", "CALL", "COPY", "PUT", "REMOVE", "USE", "ATTACH", "DETACH", "PRAGMA",
];

/// Case-sensitive prefix check; nothing else about the text is inspected.
pub fn is_executable(text: &str) -> bool {
    text.starts_with(EXECUTABLE_PREFIX)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementGuard {
    PrefixOnly,
    #[default]
    ReadOnly,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GuardViolation {
    #[error("statement does not start with SELECT")]
    NotSelect,
    #[error("statement contains more than one statement")]
    MultipleStatements,
    #[error("statement contains forbidden keyword `{0}`")]
    ForbiddenKeyword(String),
}

impl StatementGuard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrefixOnly => "prefix_only",
            Self::ReadOnly => "read_only",
        }
    }

    pub fn check(&self, statement: &str) -> Result<(), GuardViolation> {
        if !is_executable(statement) {
            return Err(GuardViolation::NotSelect);
        }

        if *self == Self::PrefixOnly {
            return Ok(());
        }

        for backslash_escapes in [false, true] {
            scan_code(&strip_literals_and_comments(statement, backslash_escapes))?;
        }
        Ok(())
    }
}

fn scan_code(code: &str) -> Result<(), GuardViolation> {
    if let Some((_, rest)) = code.split_once(';') {
        if !rest.trim().is_empty() {
            return Err(GuardViolation::MultipleStatements);
        }
    }

    let forbidden = code
        .split(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_uppercase)
        .find(|word| WRITE_KEYWORDS.contains(&word.as_str()));

    match forbidden {
        Some(keyword) => Err(GuardViolation::ForbiddenKeyword(keyword)),
        None => Ok(()),
    }
}

impl std::str::FromStr for StatementGuard {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prefix_only" | "prefix-only" => Ok(Self::PrefixOnly),
            "read_only" | "read-only" => Ok(Self::ReadOnly),
            other => Err(format!(
                "unsupported statement guard `{other}` (expected prefix_only|read_only)"
            )),
        }
    }
}

/// Replaces quoted literals, quoted identifiers and comments with spaces so
/// keyword and separator scanning only sees executable SQL text.
fn strip_literals_and_comments(statement: &str, backslash_escapes: bool) -> String {
    let mut output = String::with_capacity(statement.len());
    let mut chars = statement.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => {
                let quote = ch;
                while let Some(next) = chars.next() {
                    if backslash_escapes && quote == '\'' && next == '\\' {
                        chars.next();
                        continue;
                    }
                    if next == quote {
                        // doubled quote is an escaped quote inside the literal
                        if chars.peek() == Some(&quote) {
                            chars.next();
                            continue;
                        }
                        break;
                    }
                }
                output.push(' ');
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
                output.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
                output.push(' ');
            }
            other => output.push(other),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::{is_executable, GuardViolation, StatementGuard};

    const SLEEP_QUERY: &str = "SELECT TITLE, VIDEO_URL FROM VIDEO_CATALOG WHERE LOWER(TITLE) LIKE '%sleep%' OR LOWER(TOPIC) LIKE '%sleep%' LIMIT 10";

    #[test]
    fn prefix_check_is_case_sensitive() {
        assert!(is_executable(SLEEP_QUERY));
        assert!(!is_executable("select * from video_catalog"));
        assert!(!is_executable(" SELECT 1"));
        assert!(!is_executable("I can only answer questions about the video catalog."));
    }

    #[test]
    fn read_only_accepts_plain_select_with_trailing_semicolon() {
        let guard = StatementGuard::ReadOnly;
        assert_eq!(guard.check(SLEEP_QUERY), Ok(()));
        assert_eq!(guard.check(&format!("{SLEEP_QUERY};")), Ok(()));
    }

    #[test]
    fn read_only_ignores_keywords_inside_literals() {
        let guard = StatementGuard::ReadOnly;
        let statement = "SELECT * FROM VIDEO_CATALOG WHERE LOWER(TITLE) LIKE '%drop; delete everything%' LIMIT 10";
        assert_eq!(guard.check(statement), Ok(()));
    }

    #[test]
    fn read_only_allows_identifiers_that_contain_keywords() {
        let guard = StatementGuard::ReadOnly;
        let statement = "SELECT CREATED_AT, UPDATE_COUNT FROM VIDEO_CATALOG LIMIT 10";
        assert_eq!(guard.check(statement), Ok(()));
    }

    #[test]
    fn read_only_rejects_stacked_statements() {
        let guard = StatementGuard::ReadOnly;
        let statement = "SELECT 1; DROP TABLE VIDEO_CATALOG";
        assert_eq!(guard.check(statement), Err(GuardViolation::MultipleStatements));
    }

    #[test]
    fn read_only_rejects_write_keywords() {
        let guard = StatementGuard::ReadOnly;
        let statement = "SELECT * FROM VIDEO_CATALOG WHERE ID IN (DELETE FROM VIDEO_CATALOG)";
        assert_eq!(
            guard.check(statement),
            Err(GuardViolation::ForbiddenKeyword("DELETE".to_string()))
        );
    }

    #[test]
    fn comments_cannot_hide_a_second_statement_from_the_separator_scan() {
        let guard = StatementGuard::ReadOnly;
        let statement = "SELECT 1 /* harmless */; -- trailing\nUPDATE VIDEO_CATALOG SET TITLE = 'x'";
        assert_eq!(guard.check(statement), Err(GuardViolation::MultipleStatements));
    }

    #[test]
    fn read_only_accepts_backslash_escaped_quote_in_literal() {
        let guard = StatementGuard::ReadOnly;
        let statement = r"SELECT * FROM VIDEO_CATALOG WHERE LOWER(TITLE) LIKE '%it\'s%' LIMIT 10";
        assert_eq!(guard.check(statement), Ok(()));
    }

    #[test]
    fn backslash_escape_cannot_hide_a_second_statement() {
        let guard = StatementGuard::ReadOnly;
        let statement = r"SELECT 'a\'' ; DROP TABLE VIDEO_CATALOG; --'";
        assert_eq!(guard.check(statement), Err(GuardViolation::MultipleStatements));
    }

    #[test]
    fn literal_ending_in_backslash_cannot_hide_a_second_statement() {
        let guard = StatementGuard::ReadOnly;
        let statement = r"SELECT 'a\' ; DROP TABLE VIDEO_CATALOG; --'";
        assert_eq!(guard.check(statement), Err(GuardViolation::MultipleStatements));
    }

    #[test]
    fn prefix_only_keeps_source_behaviour() {
        let guard = StatementGuard::PrefixOnly;
        assert_eq!(guard.check("SELECT 1; DROP TABLE VIDEO_CATALOG"), Ok(()));
        assert_eq!(guard.check("DROP TABLE VIDEO_CATALOG"), Err(GuardViolation::NotSelect));
    }

    #[test]
    fn guard_parses_from_config_strings() {
        assert_eq!("prefix_only".parse::<StatementGuard>(), Ok(StatementGuard::PrefixOnly));
        assert_eq!("READ-ONLY".parse::<StatementGuard>(), Ok(StatementGuard::ReadOnly));
        assert!("none".parse::<StatementGuard>().is_err());
    }
}
