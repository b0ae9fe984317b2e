//! Tile params validation.
//!
//! Each tile implementation supplies a [`Validator`] that turns a raw JSON
//! payload into [`ValidatedParams`]: the hydrated, default-filled params
//! object that builders and URL generation consume.
//!
//! Most tiles describe their params as a serde struct and use
//! [`JsonValidator`]:
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//! use tileboard::validator::{JsonValidator, Validator};
//!
//! #[derive(Serialize, Deserialize)]
//! #[serde(deny_unknown_fields)]
//! struct PingParams {
//!     hostname: String,
//! }
//!
//! let validator = JsonValidator::<PingParams>::new();
//! let params = validator.validate(&json!({ "hostname": "example.com" })).unwrap();
//! assert_eq!(params.get("hostname"), Some(&json!("example.com")));
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Reasons a params payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Params must be a JSON object.
    #[error("params must be a JSON object")]
    NotAnObject,

    /// The payload does not match the tile's params shape.
    #[error("invalid params: {0}")]
    Malformed(String),

    /// A field is present but its value is not acceptable.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidField`].
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Params accepted by a validator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedParams(Map<String, Value>);

impl ValidatedParams {
    /// Wrap an already-validated params object.
    pub fn new(params: Map<String, Value>) -> Self {
        Self(params)
    }

    /// Look up a single param.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterate params in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The params as a JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Deserialize the params into a typed config.
    pub fn hydrate<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Stable SHA-256 fingerprint of the params.
    ///
    /// Object keys are sorted at every depth, so two payloads that differ
    /// only in key order share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut canonical = String::new();
        write_canonical(&mut canonical, &Value::Object(self.0.clone()));

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(out, value);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Validates a raw params payload.
///
/// Implementations must be thread-safe: validators are shared by every
/// request once registration is over.
pub trait Validator: Send + Sync {
    /// Check `raw` and return the hydrated params.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when the payload is malformed or unsupported.
    fn validate(&self, raw: &Value) -> Result<ValidatedParams, ValidationError>;
}

type Check<T> = Box<dyn Fn(&T) -> Result<(), ValidationError> + Send + Sync>;

/// Validator backed by a serde params type.
///
/// The payload is deserialized into `T`, checked by the optional semantic
/// check, then serialized back so defaults filled in by serde are part of
/// the validated params.
pub struct JsonValidator<T> {
    check: Option<Check<T>>,
    _params: PhantomData<fn() -> T>,
}

impl<T> JsonValidator<T>
where
    T: DeserializeOwned + Serialize,
{
    /// Create a validator that only checks the payload shape.
    pub fn new() -> Self {
        Self {
            check: None,
            _params: PhantomData,
        }
    }

    /// Add a semantic check run after deserialization.
    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&T) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.check = Some(Box::new(check));
        self
    }
}

impl<T> Default for JsonValidator<T>
where
    T: DeserializeOwned + Serialize,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonValidator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonValidator")
            .field("params", &std::any::type_name::<T>())
            .field("has_check", &self.check.is_some())
            .finish()
    }
}

impl<T> Validator for JsonValidator<T>
where
    T: DeserializeOwned + Serialize,
{
    fn validate(&self, raw: &Value) -> Result<ValidatedParams, ValidationError> {
        if !raw.is_object() {
            return Err(ValidationError::NotAnObject);
        }

        let typed: T = serde_json::from_value(raw.clone())
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;

        if let Some(check) = &self.check {
            check(&typed)?;
        }

        match serde_json::to_value(&typed) {
            Ok(Value::Object(map)) => Ok(ValidatedParams(map)),
            Ok(_) => Err(ValidationError::NotAnObject),
            Err(e) => Err(ValidationError::Malformed(e.to_string())),
        }
    }
}
