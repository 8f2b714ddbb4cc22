//! Coarse column-type metadata and value succession strategies.
//!
//! Matchers that need a "different" scope value derive one from the column
//! type: numeric and datetime columns increment, UUID columns get a fresh
//! identifier, and everything else falls back to string succession.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::value::Value;

const ONE_DAY_MICROS: i64 = 86_400_000_000;

/// Coarse column type tags reported by the model layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Text column.
    Text,
    /// Date/time column.
    DateTime,
    /// UUID column.
    Uuid,
    /// Numeric column (integer or float).
    Numeric,
}

impl ColumnType {
    /// The type-appropriate starting value when no persisted value exists.
    pub fn zero_value(&self) -> Value {
        match self {
            ColumnType::Text => Value::Str(String::new()),
            ColumnType::DateTime => Value::Timestamp(Utc::now().timestamp_micros()),
            ColumnType::Uuid => Value::Uuid(generate_uuid()),
            ColumnType::Numeric => Value::Int(0),
        }
    }

    /// The successor of `current` under this column type.
    pub fn next_value(&self, current: &Value) -> Value {
        match (self, current) {
            (ColumnType::Numeric, Value::Int(i)) => Value::Int(i + 1),
            (ColumnType::Numeric, Value::Float(x)) => Value::Float(x + 1.0),
            (ColumnType::DateTime, Value::Timestamp(micros)) => {
                Value::Timestamp(micros + ONE_DAY_MICROS)
            }
            (ColumnType::Uuid, _) => Value::Uuid(generate_uuid()),
            (_, Value::Null) => self.zero_value(),
            (_, Value::Str(s)) => Value::Str(string_succ(s)),
            (_, other) => Value::Str(string_succ(&other.to_string())),
        }
    }
}

/// Generate a fresh random 128-bit identifier (RFC 4122 v4 layout).
pub fn generate_uuid() -> [u8; 16] {
    let mut bytes: [u8; 16] = rand::random();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    bytes
}

/// Ruby-style string succession.
///
/// Increments the rightmost alphanumeric character, carrying leftward:
/// `"a"` -> `"b"`, `"az"` -> `"ba"`, `"zz"` -> `"aaa"`, `"99"` -> `"100"`.
/// Strings with no alphanumeric characters increment the final character by
/// code point; the empty string becomes `"a"`.
pub fn string_succ(s: &str) -> String {
    if s.is_empty() {
        return "a".to_string();
    }

    let mut chars: Vec<char> = s.chars().collect();
    let alnum: Vec<usize> = (0..chars.len())
        .filter(|&i| chars[i].is_ascii_alphanumeric())
        .collect();

    if alnum.is_empty() {
        if let Some(last) = chars.last_mut() {
            *last = char::from_u32(*last as u32 + 1).unwrap_or(*last);
        }
        return chars.into_iter().collect();
    }

    let mut carry = true;
    let mut leftmost = alnum[0];
    for &i in alnum.iter().rev() {
        if !carry {
            break;
        }
        let (next, next_carry) = succ_char(chars[i]);
        chars[i] = next;
        carry = next_carry;
        leftmost = i;
    }

    if carry {
        let prepend = match chars[leftmost] {
            '0'..='9' => '1',
            'a'..='z' => 'a',
            _ => 'A',
        };
        chars.insert(leftmost, prepend);
    }

    chars.into_iter().collect()
}

fn succ_char(c: char) -> (char, bool) {
    match c {
        'z' => ('a', true),
        'Z' => ('A', true),
        '9' => ('0', true),
        _ => (char::from_u32(c as u32 + 1).unwrap_or(c), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert_eq!(ColumnType::Text.zero_value(), Value::Str(String::new()));
        assert_eq!(ColumnType::Numeric.zero_value(), Value::Int(0));

        match ColumnType::DateTime.zero_value() {
            Value::Timestamp(micros) => assert!(micros > 0),
            other => panic!("Expected Timestamp, got {:?}", other),
        }

        match ColumnType::Uuid.zero_value() {
            Value::Uuid(bytes) => {
                assert_eq!(bytes[6] & 0xf0, 0x40);
                assert_eq!(bytes[8] & 0xc0, 0x80);
            }
            other => panic!("Expected Uuid, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_succession() {
        assert_eq!(
            ColumnType::Numeric.next_value(&Value::Int(1)),
            Value::Int(2)
        );
        assert_eq!(
            ColumnType::Numeric.next_value(&Value::Float(1.5)),
            Value::Float(2.5)
        );
    }

    #[test]
    fn test_datetime_succession() {
        assert_eq!(
            ColumnType::DateTime.next_value(&Value::Timestamp(100)),
            Value::Timestamp(100 + ONE_DAY_MICROS)
        );
    }

    #[test]
    fn test_uuid_succession_is_fresh() {
        let current = Value::Uuid([0u8; 16]);
        let next = ColumnType::Uuid.next_value(&current);
        assert_ne!(next, current);
    }

    #[test]
    fn test_null_succession_uses_zero_value() {
        assert_eq!(ColumnType::Numeric.next_value(&Value::Null), Value::Int(0));
        assert_eq!(
            ColumnType::Text.next_value(&Value::Null),
            Value::Str(String::new())
        );
    }

    #[test]
    fn test_string_fallback_succession() {
        assert_eq!(
            ColumnType::Text.next_value(&Value::Str("journal".into())),
            Value::Str("journam".into())
        );
        // Non-text column holding a string still falls back to succession.
        assert_eq!(
            ColumnType::Numeric.next_value(&Value::Str("x".into())),
            Value::Str("y".into())
        );
    }

    #[test]
    fn test_string_succ() {
        assert_eq!(string_succ(""), "a");
        assert_eq!(string_succ("a"), "b");
        assert_eq!(string_succ("az"), "ba");
        assert_eq!(string_succ("zz"), "aaa");
        assert_eq!(string_succ("Zz"), "AAa");
        assert_eq!(string_succ("a9"), "b0");
        assert_eq!(string_succ("99"), "100");
        assert_eq!(string_succ("x-9"), "y-0");
        assert_eq!(string_succ("---"), "--.");
    }

    #[test]
    fn test_generate_uuid_unique() {
        assert_ne!(generate_uuid(), generate_uuid());
    }
}
