//! Boundary clean-up for outgoing records.
//!
//! Decimals travel as strings through storage and conversion. Before a record
//! reaches a client, every string field holding a decimal number (with a
//! decimal point) becomes a JSON number. Anything else is left alone, so an
//! integer-like string such as `"2024"` stays a string.

use serde_json::{Map, Number, Value};

/// Normalizes a single record or a sequence of records, keeping the shape.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Array(records) => Value::Array(records.into_iter().map(normalize_record).collect()),
        other => normalize_record(other),
    }
}

fn normalize_record(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, field)| (key, normalize_field(field)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

fn normalize_field(value: Value) -> Value {
    match value {
        Value::String(s) => match parse_decimal(&s) {
            Some(number) => Value::Number(number),
            None => Value::String(s),
        },
        other => other,
    }
}

fn parse_decimal(s: &str) -> Option<Number> {
    if !s.contains('.') {
        return None;
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decimal_strings_become_numbers() {
        let record = json!({
            "finalBudgetUsd": "123.40",
            "projectName": "abc",
            "year": "2024",
            "budgetUsd": "-0.5"
        });

        let normalized = normalize(record);
        assert_eq!(normalized["finalBudgetUsd"], json!(123.4));
        assert_eq!(normalized["projectName"], json!("abc"));
        assert_eq!(normalized["year"], json!("2024"));
        assert_eq!(normalized["budgetUsd"], json!(-0.5));
    }

    #[test]
    fn test_non_numeric_strings_with_dots_are_kept() {
        let record = json!({
            "version": "1.2.3",
            "host": "example.com",
            "dot": ".",
            "nan": "NaN.",
        });

        assert_eq!(normalize(record.clone()), record);
    }

    #[test]
    fn test_other_values_pass_through() {
        let record = json!({
            "year": 2024,
            "rate": 6.8,
            "flag": true,
            "nothing": null,
            "nested": {"amount": "1.50"}
        });

        assert_eq!(normalize(record.clone()), record);
        assert_eq!(normalize(json!("1.50")), json!("1.50"));
        assert_eq!(normalize(Value::Null), Value::Null);
    }

    #[test]
    fn test_keeps_shape() {
        let single = normalize(json!({"amount": "6720.00"}));
        assert!(single.is_object());
        assert_eq!(single["amount"], json!(6720.0));

        let many = normalize(json!([
            {"amount": "1.10"},
            {"amount": "2"},
            {"amount": "3.30"}
        ]));
        assert_eq!(
            many,
            json!([{"amount": 1.1}, {"amount": "2"}, {"amount": 3.3}])
        );

        assert_eq!(normalize(json!([])), json!([]));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            json!({"a": "123.40", "b": "abc", "c": "2024", "d": 5}),
            json!([{"a": "0.10"}, {"b": "x.y"}]),
            json!({}),
        ];

        for input in inputs {
            let once = normalize(input);
            let twice = normalize(once.clone());
            assert_eq!(once, twice);
        }
    }
}
