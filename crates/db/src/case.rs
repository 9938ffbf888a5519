//! Key casing between application code (camelCase) and storage (snake_case).
//!
//! Conversion walks objects and arrays recursively and only ever touches
//! object keys. Keys that look like numbers are left alone.

use serde_json::Value;

use crate::models::Row;
use crate::options::QueryOpts;

const SEPARATOR: char = '_';

/// `first_name` -> `firstName`.
///
/// Every run of `-`, `_` or whitespace is dropped and the character that
/// follows it is upper-cased; the first character is then lower-cased.
pub fn camelize_key(key: &str) -> String {
    if is_numerical(key) {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        if is_word_break(c) {
            while chars.peek().is_some_and(|&next| is_word_break(next)) {
                chars.next();
            }
            if let Some(next) = chars.next() {
                out.extend(next.to_uppercase());
            }
        } else {
            out.push(c);
        }
    }

    let mut rest = out.chars();
    match rest.next() {
        Some(first) => first.to_lowercase().chain(rest).collect(),
        None => out,
    }
}

/// `firstName` -> `first_name`.
pub fn decamelize_key(key: &str) -> String {
    if is_numerical(key) {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push(SEPARATOR);
        }
        out.push(c);
    }
    out.to_lowercase()
}

/// Camelize every key of a row, an array of rows, or any nested JSON value.
pub fn camelize(value: Value) -> Value {
    process_keys(value, &camelize_key)
}

/// Snake-case every key of a row, an array of rows, or any nested JSON value.
pub fn decamelize(value: Value) -> Value {
    process_keys(value, &decamelize_key)
}

pub fn camelize_row(row: Row) -> Row {
    process_row(row, &camelize_key)
}

pub fn decamelize_row(row: Row) -> Row {
    process_row(row, &decamelize_key)
}

/// Rows come back from storage in snake_case; camelize them unless the
/// caller asked to keep storage naming.
pub fn convert_case(row: Row, opts: &QueryOpts) -> Row {
    if opts.snake_case {
        row
    } else {
        camelize_row(row)
    }
}

/// First row converted per `opts`, or `None` when nothing came back.
pub fn convert_case_first(rows: Vec<Row>, opts: &QueryOpts) -> Option<Row> {
    rows.into_iter().next().map(|row| convert_case(row, opts))
}

fn process_keys(value: Value, convert: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(process_row(map, convert)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| process_keys(item, convert))
                .collect(),
        ),
        other => other,
    }
}

fn process_row(row: Row, convert: &dyn Fn(&str) -> String) -> Row {
    row.into_iter()
        .map(|(key, value)| (convert(&key), process_keys(value, convert)))
        .collect()
}

fn is_word_break(c: char) -> bool {
    c == '-' || c == '_' || c.is_whitespace()
}

/// Keys that coerce to a number (`key - 0` is not NaN in JS terms): blank
/// strings, `Infinity` with an optional sign, unsigned `0x`/`0o`/`0b`
/// literals, and decimal literals with optional sign, fraction and exponent.
fn is_numerical(key: &str) -> bool {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return true;
    }
    if matches!(trimmed, "Infinity" | "+Infinity" | "-Infinity") {
        return true;
    }

    let radix_digits = |prefix: [&str; 2], radix: u32| {
        prefix
            .iter()
            .find_map(|p| trimmed.strip_prefix(*p))
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix)))
    };
    if radix_digits(["0x", "0X"], 16) || radix_digits(["0o", "0O"], 8) || radix_digits(["0b", "0B"], 2) {
        return true;
    }

    trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
        && trimmed.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn camelizes_snake_case_keys() {
        assert_eq!(camelize_key("first_name"), "firstName");
        assert_eq!(camelize_key("campaign_contact_id"), "campaignContactId");
        assert_eq!(camelize_key("id"), "id");
    }

    #[test]
    fn camelize_collapses_separator_runs_and_lowers_first_char() {
        assert_eq!(camelize_key("zip__code"), "zipCode");
        assert_eq!(camelize_key("Some-key name"), "someKeyName");
        assert_eq!(camelize_key("trailing_"), "trailing");
        assert_eq!(camelize_key("_leading"), "leading");
    }

    #[test]
    fn decamelizes_camel_case_keys() {
        assert_eq!(decamelize_key("firstName"), "first_name");
        assert_eq!(decamelize_key("FirstName"), "first_name");
        assert_eq!(decamelize_key("userID"), "user_i_d");
        assert_eq!(decamelize_key("already_snake"), "already_snake");
    }

    #[test]
    fn numeric_keys_are_untouched() {
        assert_eq!(camelize_key("-1"), "-1");
        assert_eq!(decamelize_key("1E5"), "1E5");
        assert_eq!(camelize_key(""), "");
    }

    #[test]
    fn number_like_keys_follow_js_coercion() {
        for key in ["0x1F", "0b101", "0o17", "Infinity", "-Infinity", " 42 ", "1e-3", ".5"] {
            assert!(is_numerical(key), "{key}");
            assert_eq!(decamelize_key(key), key);
        }
        for key in ["0x", "0xZZ", "-0x1F", "inf", "NaN", "e5", "1_000", "zipCode"] {
            assert!(!is_numerical(key), "{key}");
        }
        assert_eq!(decamelize_key("0xAB"), "0xAB");
    }

    #[test]
    fn conversion_recurses_into_nested_values() {
        let value = json!([
            { "first_name": "A", "custom_fields": { "zip_code": "10001" } },
            { "tags": [{ "tag_id": 1 }], "is_opted_out": false }
        ]);
        assert_eq!(
            camelize(value),
            json!([
                { "firstName": "A", "customFields": { "zipCode": "10001" } },
                { "tags": [{ "tagId": 1 }], "isOptedOut": false }
            ])
        );
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(camelize(json!("first_name")), json!("first_name"));
        assert_eq!(decamelize(json!(null)), json!(null));
    }

    #[test]
    fn convert_case_respects_snake_case_option() {
        let row = json!({ "first_name": "A" }).as_object().cloned().unwrap();

        let camel = convert_case(row.clone(), &QueryOpts::default());
        assert_eq!(Value::Object(camel), json!({ "firstName": "A" }));

        let kept = convert_case(row, &QueryOpts::default().snake_case());
        assert_eq!(Value::Object(kept), json!({ "first_name": "A" }));
    }

    #[test]
    fn convert_case_first_of_empty_is_none() {
        assert!(convert_case_first(Vec::new(), &QueryOpts::default()).is_none());
    }

    fn snake_key() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,6}(_[a-z][a-z0-9]{0,6}){0,3}"
    }

    proptest! {
        /// Property: snake_case rows survive a camelize/decamelize round trip.
        #[test]
        fn prop_decamelize_inverts_camelize(
            entries in prop::collection::btree_map(snake_key(), any::<i64>(), 0..8)
        ) {
            let row: Row = entries
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect();
            let original = Value::Object(row);
            prop_assert_eq!(decamelize(camelize(original.clone())), original);
        }
    }
}
