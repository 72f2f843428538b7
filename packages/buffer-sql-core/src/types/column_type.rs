use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// Declared type of a column, carrying its fixed byte width.
///
/// Every variant knows how to turn literal text into a [`Value`], how to lay
/// that value out in its fixed-width slot, and how to read it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnType {
    /// Little-endian unsigned integer of 1, 2 or 4 bytes
    Int { width: usize },
    /// UTF-8 text, zero-padded to `length` bytes
    Varchar { length: usize },
}

/// A decoded column value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(u32),
    Text(String),
}

/// Literal from a WHERE clause, compared against decoded column values.
///
/// Unlike a [`Value`] it need not be storable: an int column compares
/// numerically against any finite number.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparand {
    Number(f64),
    Text(String),
}

impl Comparand {
    /// Orders `value` relative to this literal; `None` for mismatched kinds.
    pub fn compare(&self, value: &Value) -> Option<Ordering> {
        match (value, self) {
            (Value::Int(n), Comparand::Number(x)) => f64::from(*n).partial_cmp(x),
            (Value::Text(s), Comparand::Text(t)) => Some(s.as_str().cmp(t.as_str())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl ColumnType {
    pub const DEFAULT_INT_WIDTH: usize = 4;
    pub const DEFAULT_VARCHAR_LENGTH: usize = 255;

    /// Resolves a declared type name and optional size parameter.
    ///
    /// Type names are case-insensitive. `int` accepts widths 1, 2 and 4;
    /// `varchar` accepts any non-zero length.
    pub fn from_declaration(type_name: &str, size: Option<&str>) -> Result<Self> {
        let lowered = type_name.trim().to_ascii_lowercase();
        let unsupported = || DbError::UnsupportedColumnType {
            declared: match size {
                Some(s) => format!("{}({})", type_name.trim(), s.trim()),
                None => type_name.trim().to_string(),
            },
        };

        let size = match size.map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => Some(text.parse::<usize>().map_err(|_| unsupported())?),
            None => None,
        };

        match lowered.as_str() {
            "int" | "integer" => {
                let width = size.unwrap_or(Self::DEFAULT_INT_WIDTH);
                match width {
                    1 | 2 | 4 => Ok(ColumnType::Int { width }),
                    _ => Err(unsupported()),
                }
            }
            "varchar" => {
                let length = size.unwrap_or(Self::DEFAULT_VARCHAR_LENGTH);
                if length == 0 {
                    return Err(unsupported());
                }
                Ok(ColumnType::Varchar { length })
            }
            _ => Err(unsupported()),
        }
    }

    /// Byte width of the column's slot within a row.
    pub fn width(&self) -> usize {
        match *self {
            ColumnType::Int { width } => width,
            ColumnType::Varchar { length } => length,
        }
    }

    /// Lowercase type name as written in DDL.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int { .. } => "int",
            ColumnType::Varchar { .. } => "varchar",
        }
    }

    /// Value an unwritten (all-zero) slot decodes to.
    pub fn default_value(&self) -> Value {
        match self {
            ColumnType::Int { .. } => Value::Int(0),
            ColumnType::Varchar { .. } => Value::Text(String::new()),
        }
    }

    /// Largest integer representable in an int slot of this width.
    fn int_max(width: usize) -> u64 {
        (1u64 << (8 * width as u32)) - 1
    }

    /// Parses literal text into a value of this type.
    ///
    /// `column` is only used for error reporting.
    pub fn parse(&self, column: &str, text: &str) -> Result<Value> {
        let invalid = |reason: &str| DbError::InvalidLiteral {
            column: column.to_string(),
            literal: text.to_string(),
            reason: reason.to_string(),
        };

        match *self {
            ColumnType::Int { width } => {
                let unquoted = unquote(text.trim());
                let digits = unquoted.trim();
                if digits.is_empty() {
                    return Err(invalid("empty integer literal"));
                }
                let number = match digits.parse::<u64>() {
                    Ok(n) => n,
                    Err(_) => {
                        let float = digits
                            .parse::<f64>()
                            .map_err(|_| invalid("not a number"))?;
                        if !float.is_finite() || float.fract() != 0.0 || float < 0.0 {
                            return Err(invalid("not an unsigned integer"));
                        }
                        if float > u64::MAX as f64 {
                            return Err(invalid("out of range"));
                        }
                        float as u64
                    }
                };
                if number > Self::int_max(width) {
                    return Err(invalid(&format!("does not fit in {} bytes", width)));
                }
                Ok(Value::Int(number as u32))
            }
            ColumnType::Varchar { length } => {
                let text = unquote(text.trim());
                if text.contains('\0') {
                    return Err(invalid("NUL characters are not allowed in varchar"));
                }
                Ok(Value::Text(truncate_utf8(&text, length).to_string()))
            }
        }
    }

    /// Parses a WHERE-clause literal for comparison with this column.
    ///
    /// Int columns accept any finite number, including negative, fractional
    /// and out-of-width values. Text is unquoted but not truncated.
    pub fn parse_comparand(&self, column: &str, text: &str) -> Result<Comparand> {
        let unquoted = unquote(text.trim());
        match self {
            ColumnType::Int { .. } => unquoted
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Comparand::Number)
                .ok_or_else(|| DbError::InvalidLiteral {
                    column: column.to_string(),
                    literal: text.to_string(),
                    reason: "not a number".to_string(),
                }),
            ColumnType::Varchar { .. } => Ok(Comparand::Text(unquoted.into_owned())),
        }
    }

    /// Encodes a value into exactly [`width`](Self::width) bytes.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        match (*self, value) {
            (ColumnType::Int { width }, Value::Int(n)) => {
                if u64::from(*n) > Self::int_max(width) {
                    return Err(DbError::TypeMismatch {
                        expected: format!("int({})", width),
                        got: n.to_string(),
                    });
                }
                Ok(n.to_le_bytes()[..width].to_vec())
            }
            (ColumnType::Varchar { length }, Value::Text(s)) => {
                if s.contains('\0') {
                    return Err(DbError::TypeMismatch {
                        expected: format!("varchar({}) without NUL", length),
                        got: format!("{:?}", s),
                    });
                }
                let mut bytes = vec![0u8; length];
                let text = truncate_utf8(s, length);
                bytes[..text.len()].copy_from_slice(text.as_bytes());
                Ok(bytes)
            }
            (expected, got) => Err(DbError::TypeMismatch {
                expected: expected.to_string(),
                got: got.to_string(),
            }),
        }
    }

    /// Decodes a value from its slot bytes.
    pub fn decode(&self, bytes: &[u8]) -> Value {
        match *self {
            ColumnType::Int { width } => {
                let mut le = [0u8; 4];
                let n = width.min(bytes.len());
                le[..n].copy_from_slice(&bytes[..n]);
                Value::Int(u32::from_le_bytes(le))
            }
            ColumnType::Varchar { length } => {
                let slot = &bytes[..length.min(bytes.len())];
                let end = slot.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Value::Text(String::from_utf8_lossy(&slot[..end]).into_owned())
            }
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.width())
    }
}

/// Strips one pair of matching surrounding quote characters.
///
/// Inside the quotes a doubled quote character stands for one literal quote
/// (`'O''Brien'` is `O'Brien`).
pub(crate) fn unquote(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'\'' || first == b'"') && bytes[bytes.len() - 1] == first {
            let inner = &text[1..text.len() - 1];
            let (doubled, single) = if first == b'\'' { ("''", "'") } else { ("\"\"", "\"") };
            if inner.contains(doubled) {
                return Cow::Owned(inner.replace(doubled, single));
            }
            return Cow::Borrowed(inner);
        }
    }
    Cow::Borrowed(text)
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a char.
fn truncate_utf8(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
