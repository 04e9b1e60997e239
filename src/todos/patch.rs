//! Partial-update decoding.
//!
//! A patch body is decoded into a raw JSON map first so that a key that is
//! missing, a key set to `null` and a key set to a value stay distinguishable.
//! A `null` resets the column to its zero value; a missing key leaves it alone.

use serde_json::{Map, Value};

use crate::error::PatchError;

/// One field of a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PatchField<T> {
    /// Key not present in the body. The stored value is left untouched.
    #[default]
    Absent,
    /// Key present with `null`. The stored value is reset to `T::default()`.
    Null,
    /// Key present with a value.
    Value(T),
}

impl<T: Default> PatchField<T> {
    /// The value to write, or `None` when the field must not be touched.
    pub fn into_update(self) -> Option<T> {
        match self {
            PatchField::Absent => None,
            PatchField::Null => Some(T::default()),
            PatchField::Value(v) => Some(v),
        }
    }
}

impl<T> PatchField<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, PatchField::Absent)
    }
}

/// Sparse update for a single todo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub id: i64,
    pub title: PatchField<String>,
    pub description: PatchField<String>,
    pub completed: PatchField<bool>,
}

impl TodoPatch {
    /// Decode a patch from a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, PatchError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }

    /// Decode a patch from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, PatchError> {
        match value {
            Value::Object(map) => Self::from_map(&map),
            _ => Err(PatchError::NotAnObject),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self, PatchError> {
        Ok(Self {
            id: decode_id(map.get("id"))?,
            title: decode_string(map, "title")?,
            description: decode_string(map, "description")?,
            completed: decode_bool(map, "completed")?,
        })
    }

    /// True when none of the updatable keys appeared in the body.
    pub fn is_empty(&self) -> bool {
        self.title.is_absent() && self.description.is_absent() && self.completed.is_absent()
    }
}

fn decode_id(raw: Option<&Value>) -> Result<i64, PatchError> {
    let number = match raw {
        None | Some(Value::Null) => return Err(PatchError::MissingId),
        Some(Value::Number(n)) => n,
        Some(_) => return Err(PatchError::IdNotNumber),
    };

    if let Some(id) = number.as_i64() {
        return Ok(id);
    }

    // Integral floats such as `1.0` are accepted; fractions are rejected.
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(PatchError::IdNotInteger(number.to_string())),
    }
}

fn decode_string(
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<PatchField<String>, PatchError> {
    match map.get(field) {
        None => Ok(PatchField::Absent),
        Some(Value::Null) => Ok(PatchField::Null),
        Some(Value::String(s)) => Ok(PatchField::Value(s.clone())),
        Some(_) => Err(PatchError::NotAString { field }),
    }
}

fn decode_bool(
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<PatchField<bool>, PatchError> {
    match map.get(field) {
        None => Ok(PatchField::Absent),
        Some(Value::Null) => Ok(PatchField::Null),
        Some(Value::Bool(b)) => Ok(PatchField::Value(*b)),
        Some(_) => Err(PatchError::NotABoolean { field }),
    }
}
