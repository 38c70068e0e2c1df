use serde_json::{Number, Value};
use thiserror::Error;

/// Declared scalar type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Float,
    Int,
    Str,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::Int => "int",
            FieldType::Str => "str",
        }
    }

    /// Parse `raw` into this type. `None` when it cannot be represented.
    ///
    /// Strings are parsed (`"42"` is a valid int), numbers are converted
    /// between int and float (floats truncate toward zero), and booleans map
    /// to `0`/`1`. Null, arrays and objects never coerce.
    pub fn coerce(&self, raw: &Value) -> Option<Value> {
        match self {
            FieldType::Str => match raw {
                Value::String(s) => Some(Value::String(s.clone())),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            },
            FieldType::Int => match raw {
                Value::Number(n) => int_from_number(n),
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
                Value::Bool(b) => Some(Value::from(i64::from(*b))),
                _ => None,
            },
            FieldType::Float => {
                let f = match raw {
                    Value::Number(n) => n.as_f64()?,
                    Value::String(s) => s.trim().parse::<f64>().ok()?,
                    Value::Bool(b) => f64::from(u8::from(*b)),
                    _ => return None,
                };
                Number::from_f64(f).map(Value::Number)
            }
            FieldType::Bool => match raw {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
                    "false" | "0" | "no" | "off" | "" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
        }
    }
}

fn int_from_number(n: &Number) -> Option<Value> {
    if n.is_i64() || n.is_u64() {
        return Some(Value::Number(n.clone()));
    }
    let f = n.as_f64()?.trunc();
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        None
    }
}

/// Compile-time default for a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Float(f64),
    Int(i64),
    Str(&'static str),
}

impl Scalar {
    pub fn to_value(self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            Scalar::Int(i) => Value::from(i),
            Scalar::Str(s) => Value::from(s),
        }
    }
}

/// Declaration of one entity field.
///
/// - `default` is used when the field holds no value.
/// - `required` is advisory only: an absent required field is reported as
///   [`FieldError::Missing`] exactly like an optional one, and is left out of
///   writes rather than failing them.
/// - `primary` marks the external key used for idempotent creation.
/// - `hidden` marks a transient field: it shows up in `as_dict`/`as_form` but
///   is never written to the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub default: Option<Scalar>,
    pub required: bool,
    pub primary: bool,
    pub hidden: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            default: None,
            required: false,
            primary: false,
            hidden: false,
        }
    }

    pub const fn default_value(self, default: Scalar) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn primary(self) -> Self {
        Self {
            primary: true,
            ..self
        }
    }

    pub const fn hidden(self) -> Self {
        Self {
            hidden: true,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("{field}: expected {expected}, got {value}")]
    Coercion {
        field: &'static str,
        expected: &'static str,
        value: Value,
    },
    #[error("{field}: no value")]
    Missing { field: &'static str },
}

impl FieldError {
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::Coercion { field, .. } | FieldError::Missing { field } => field,
        }
    }
}

/// A declared field and its current raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    spec: &'static FieldSpec,
    value: Option<Value>,
}

impl Field {
    pub fn new(spec: &'static FieldSpec) -> Self {
        Self { spec, value: None }
    }

    pub fn with_value(spec: &'static FieldSpec, value: Value) -> Self {
        Self {
            spec,
            value: Some(value),
        }
    }

    pub fn spec(&self) -> &'static FieldSpec {
        self.spec
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// The value as last assigned, before any coercion.
    pub fn raw(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: Value) {
        self.value = Some(value);
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    /// The value coerced to the declared type, without touching the field.
    /// An unset or null value falls back to the default.
    pub fn coerced(&self) -> Result<Value, FieldError> {
        let raw = match &self.value {
            Some(Value::Null) | None => match self.spec.default {
                Some(default) => default.to_value(),
                None => return Err(FieldError::Missing { field: self.name() }),
            },
            Some(v) => v.clone(),
        };

        self.spec
            .ty
            .coerce(&raw)
            .ok_or_else(|| FieldError::Coercion {
                field: self.name(),
                expected: self.spec.ty.as_str(),
                value: raw,
            })
    }

    /// Coerce in place: on success the stored value becomes the coerced one.
    /// On failure the raw value is kept so the caller can inspect it.
    pub fn validate(&mut self) -> Result<&Value, FieldError> {
        let value = self.coerced()?;
        Ok(&*self.value.insert(value))
    }

    pub fn is_valid(&self) -> bool {
        self.coerced().is_ok()
    }
}
