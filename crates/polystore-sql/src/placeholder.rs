//! Parameter placeholder handling
//!
//! The portable statement syntax uses `?` placeholders. SQLite takes them
//! natively; PostgreSQL needs `$1..$n`. The rewrite is quote-aware so a `?`
//! inside a string literal or quoted identifier is left alone.

/// Rewrite `?` placeholders to `$1..$n` for PostgreSQL.
pub fn to_dollar_placeholders(statement: &str) -> String {
    let mut out = String::with_capacity(statement.len() + 8);
    let mut index = 0usize;
    let mut in_single = false;
    let mut in_double = false;

    for ch in statement.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                out.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push(ch);
            }
            '?' if !in_single && !in_double => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Count the `?` placeholders outside of quotes.
pub fn count_placeholders(statement: &str) -> usize {
    let mut count = 0usize;
    let mut in_single = false;
    let mut in_double = false;

    for ch in statement.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '?' if !in_single && !in_double => count += 1,
            _ => {}
        }
    }

    count
}

/// Quote an identifier, doubling embedded quotes.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_in_order() {
        assert_eq!(
            to_dollar_placeholders("SELECT * FROM t WHERE a = ? AND b = ?"),
            "SELECT * FROM t WHERE a = $1 AND b = $2"
        );
    }

    #[test]
    fn leaves_quoted_question_marks_alone() {
        assert_eq!(
            to_dollar_placeholders("INSERT INTO t (q) VALUES ('why?')"),
            "INSERT INTO t (q) VALUES ('why?')"
        );
        assert_eq!(
            to_dollar_placeholders(r#"SELECT "odd?col" FROM t WHERE x = ?"#),
            r#"SELECT "odd?col" FROM t WHERE x = $1"#
        );
    }

    #[test]
    fn handles_escaped_single_quotes() {
        // 'it''s ?' stays a literal; the trailing ? is a placeholder
        assert_eq!(
            to_dollar_placeholders("SELECT 'it''s ?' WHERE a = ?"),
            "SELECT 'it''s ?' WHERE a = $1"
        );
    }

    #[test]
    fn counts_match_rewrites() {
        let statement = "UPDATE t SET a = ?, b = '?' WHERE c = ?";
        assert_eq!(count_placeholders(statement), 2);
        assert!(to_dollar_placeholders(statement).contains("$2"));
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(count_placeholders("SELECT 1"), 0);
        assert_eq!(to_dollar_placeholders("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn quoting_identifiers() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
