//! Typed accessors over untrusted JSON, reporting failures with their path.

use serde_json::{Map, Value as Json};

use crate::{datetime::UtcDateTime, error::ValidationError, path::Path};

pub type Object = Map<String, Json>;

pub fn json_type(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(n) if n.is_i64() => "integer",
        // above i64::MAX
        Json::Number(n) if n.is_u64() => "unsigned integer out of range",
        Json::Number(_) => "double",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

pub fn object<'v>(value: &'v Json, path: &Path) -> Result<&'v Object, ValidationError> {
    value.as_object().ok_or_else(|| ValidationError::NotAnObject {
        key: path.last_key(),
        path: path.to_trail(),
    })
}

pub fn require<'v>(obj: &'v Object, key: &str, path: &Path) -> Result<&'v Json, ValidationError> {
    obj.get(key).ok_or_else(|| ValidationError::UndefinedKey {
        key: key.to_owned(),
        path: path.to_trail(),
    })
}

pub fn require_array<'v>(
    obj: &'v Object,
    key: &str,
    path: &Path,
) -> Result<&'v Vec<Json>, ValidationError> {
    require(obj, key, path)?
        .as_array()
        .ok_or_else(|| ValidationError::NotAnArray {
            key: key.to_owned(),
            path: path.key(key).to_trail(),
        })
}

pub fn require_object<'v>(obj: &'v Object, key: &str, path: &Path) -> Result<&'v Object, ValidationError> {
    object(require(obj, key, path)?, &path.key(key))
}

fn wrong_type(value: &Json, key: &str, expected: &'static str, path: &Path) -> ValidationError {
    ValidationError::WrongType {
        key: key.to_owned(),
        expected,
        found: json_type(value),
        path: path.key(key).to_trail(),
    }
}

pub fn expect_i64(value: &Json, key: &str, path: &Path) -> Result<i64, ValidationError> {
    value
        .as_i64()
        .ok_or_else(|| wrong_type(value, key, "integer", path))
}

pub fn expect_str<'v>(value: &'v Json, key: &str, path: &Path) -> Result<&'v str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| wrong_type(value, key, "string", path))
}

pub fn expect_bool(value: &Json, key: &str, path: &Path) -> Result<bool, ValidationError> {
    value
        .as_bool()
        .ok_or_else(|| wrong_type(value, key, "boolean", path))
}

pub fn expect_date_time(value: &Json, key: &str, path: &Path) -> Result<UtcDateTime, ValidationError> {
    expect_str(value, key, path)?
        .parse()
        .map_err(|source| ValidationError::InvalidDateTime {
            source,
            path: path.key(key).to_trail(),
        })
}

/// Fails with `OutOfRange` unless `value` is at least `min`.
pub fn expect_at_least(value: i64, min: i64, key: &str, path: &Path) -> Result<i64, ValidationError> {
    if value < min {
        return Err(ValidationError::OutOfRange {
            key: key.to_owned(),
            expected: format!("{} or higher", min),
            found: value.to_string(),
            path: path.key(key).to_trail(),
        });
    }
    Ok(value)
}

/// Fails with `OutOfRange` unless `value` is one of `options`.
pub fn expect_one_of<'v>(
    value: &'v str,
    options: &[&str],
    key: &str,
    path: &Path,
) -> Result<&'v str, ValidationError> {
    if !options.contains(&value) {
        return Err(ValidationError::OutOfRange {
            key: key.to_owned(),
            expected: format!("one of {{{}}}", options.join(", ")),
            found: format!("{:?}", value),
            path: path.key(key).to_trail(),
        });
    }
    Ok(value)
}

pub fn require_i64(obj: &Object, key: &str, path: &Path) -> Result<i64, ValidationError> {
    expect_i64(require(obj, key, path)?, key, path)
}

pub fn require_str<'v>(obj: &'v Object, key: &str, path: &Path) -> Result<&'v str, ValidationError> {
    expect_str(require(obj, key, path)?, key, path)
}

pub fn require_bool(obj: &Object, key: &str, path: &Path) -> Result<bool, ValidationError> {
    expect_bool(require(obj, key, path)?, key, path)
}
