//! Row values as read from Target and their SQL literal form.
//!
//! Values travel as the database's own text rendering. Nothing is ever
//! parsed into a float, so 64-bit identifiers survive byte for byte.

/// Largest integer a double can hold exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// How a column's values are rendered, derived from its Postgres type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Rendered unquoted when the text is a plain numeric literal.
    Numeric,
    /// `int8`: unquoted while within the safe range, quoted text beyond it.
    LargeInteger,
    Binary,
    Temporal,
    Text,
}

impl ValueKind {
    /// Classify by `pg_type.typname` (e.g. `int4`, `_text`, `timestamptz`).
    pub fn from_pg_type(udt_name: &str) -> Self {
        match udt_name {
            "int2" | "int4" | "float4" | "float8" | "oid" | "numeric" => ValueKind::Numeric,
            "int8" => ValueKind::LargeInteger,
            "bytea" => ValueKind::Binary,
            "date" | "time" | "timetz" | "timestamp" | "timestamptz" | "interval" => {
                ValueKind::Temporal
            }
            _ => ValueKind::Text,
        }
    }
}

/// A single value ready to be rendered into an insert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Number(String),
    Binary(String),
    Temporal(String),
    Text(String),
}

impl SqlValue {
    /// Build a value from the text the database returned for a column.
    pub fn from_db_text(kind: ValueKind, raw: Option<String>) -> Self {
        let Some(raw) = raw else {
            return SqlValue::Null;
        };

        match kind {
            ValueKind::Numeric if is_numeric_literal(&raw) => SqlValue::Number(raw),
            ValueKind::LargeInteger if is_safe_integer(&raw) => SqlValue::Number(raw),
            ValueKind::Binary => SqlValue::Binary(raw),
            ValueKind::Temporal => SqlValue::Temporal(raw),
            _ => SqlValue::Text(raw),
        }
    }

    /// Render as a Postgres literal.
    ///
    /// Quoted forms assume `standard_conforming_strings = on`, which the
    /// merge section sets explicitly.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Number(raw) => raw.clone(),
            SqlValue::Binary(raw) | SqlValue::Temporal(raw) | SqlValue::Text(raw) => {
                quote_literal(raw)
            }
        }
    }
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote an identifier, doubling embedded double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"schema"."table"`.
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn is_safe_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    digits
        .parse::<u64>()
        .map(|magnitude| magnitude <= MAX_SAFE_INTEGER)
        .unwrap_or(false)
}

fn is_numeric_literal(raw: &str) -> bool {
    let body = raw.strip_prefix('-').unwrap_or(raw);
    let mut saw_digit = false;
    let mut saw_dot = false;
    let mut saw_exp = false;
    let mut prev = '\0';

    for ch in body.chars() {
        match ch {
            '0'..='9' => saw_digit = true,
            '.' if !saw_dot && !saw_exp => saw_dot = true,
            'e' | 'E' if saw_digit && !saw_exp => saw_exp = true,
            '+' | '-' if prev == 'e' || prev == 'E' => {}
            _ => return false,
        }
        prev = ch;
    }

    saw_digit && !matches!(prev, 'e' | 'E' | '+' | '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_renders_as_keyword() {
        assert_eq!(SqlValue::from_db_text(ValueKind::Text, None).to_literal(), "NULL");
        assert_eq!(
            SqlValue::from_db_text(ValueKind::Numeric, None).to_literal(),
            "NULL"
        );
    }

    #[test]
    fn small_numbers_are_unquoted() {
        let value = SqlValue::from_db_text(ValueKind::Numeric, Some("42".to_string()));
        assert_eq!(value.to_literal(), "42");
        let value = SqlValue::from_db_text(ValueKind::Numeric, Some("-1.5e-3".to_string()));
        assert_eq!(value.to_literal(), "-1.5e-3");
    }

    #[test]
    fn exact_decimals_are_unquoted_without_loss() {
        let kind = ValueKind::from_pg_type("numeric");
        let raw = "12345678901234567890.000000000000000001";
        let value = SqlValue::from_db_text(kind, Some(raw.to_string()));
        assert_eq!(value.to_literal(), raw);

        let nan = SqlValue::from_db_text(kind, Some("NaN".to_string()));
        assert_eq!(nan.to_literal(), "'NaN'");
    }

    #[test]
    fn special_floats_are_quoted() {
        for raw in ["NaN", "Infinity", "-Infinity"] {
            let value = SqlValue::from_db_text(ValueKind::Numeric, Some(raw.to_string()));
            assert_eq!(value.to_literal(), format!("'{raw}'"));
        }
    }

    #[test]
    fn large_integers_stay_text() {
        let safe = SqlValue::from_db_text(ValueKind::LargeInteger, Some("9007199254740991".into()));
        assert_eq!(safe.to_literal(), "9007199254740991");

        // 2^53 + 1 collides with 2^53 once it passes through a double.
        let big = SqlValue::from_db_text(ValueKind::LargeInteger, Some("9007199254740993".into()));
        assert_eq!(big, SqlValue::Text("9007199254740993".to_string()));
        assert_eq!(big.to_literal(), "'9007199254740993'");

        let negative =
            SqlValue::from_db_text(ValueKind::LargeInteger, Some("-9223372036854775808".into()));
        assert_eq!(negative.to_literal(), "'-9223372036854775808'");
    }

    #[test]
    fn text_binary_and_dates_are_escaped() {
        let text = SqlValue::from_db_text(ValueKind::Text, Some("O'Brien".into()));
        assert_eq!(text.to_literal(), "'O''Brien'");

        let bytes = SqlValue::from_db_text(ValueKind::Binary, Some("\\xdeadbeef".into()));
        assert_eq!(bytes.to_literal(), "'\\xdeadbeef'");

        let ts = SqlValue::from_db_text(ValueKind::Temporal, Some("2024-01-02 03:04:05+00".into()));
        assert_eq!(ts.to_literal(), "'2024-01-02 03:04:05+00'");
    }

    #[test]
    fn classifies_pg_types() {
        assert_eq!(ValueKind::from_pg_type("int4"), ValueKind::Numeric);
        assert_eq!(ValueKind::from_pg_type("int8"), ValueKind::LargeInteger);
        assert_eq!(ValueKind::from_pg_type("numeric"), ValueKind::Numeric);
        assert_eq!(ValueKind::from_pg_type("bytea"), ValueKind::Binary);
        assert_eq!(ValueKind::from_pg_type("timestamptz"), ValueKind::Temporal);
        assert_eq!(ValueKind::from_pg_type("jsonb"), ValueKind::Text);
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("user_roles"), "\"user_roles\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
        assert_eq!(qualified_name("public", "users"), "\"public\".\"users\"");
    }
}
