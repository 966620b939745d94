//! Field codec - typed attribute values to and from SQLite primitives
//!
//! Built-in codecs cover text, booleans, signed integers and floats.
//! Enumerations are stored by symbolic name through [`EnumField`]
//! (`#[derive(ModelEnum)]`), and anything serde can handle is stored as
//! JSON text through [`Json`] or a `#[model(json)]` attribute.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::field::StorageType;

pub use rusqlite::types::{Type, Value, ValueRef};

/// Why a single value could not be converted.
#[derive(Debug, thiserror::Error)]
pub enum Reject {
    #[error("cannot decode a stored {found} value as {expected}")]
    Type { expected: StorageType, found: Type },

    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CodecResult<T> = std::result::Result<T, Reject>;

/// Numeric text left behind when a column's declared type drifted to TEXT.
fn parse_integer(text: &[u8]) -> Option<i64> {
    let text = std::str::from_utf8(text).ok()?.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(|r| r as i64))
}

fn parse_real(text: &[u8]) -> Option<f64> {
    std::str::from_utf8(text).ok()?.trim().parse().ok()
}

fn mismatch(expected: StorageType, found: ValueRef<'_>) -> Reject {
    Reject::Type {
        expected,
        found: found.data_type(),
    }
}

/// Conversion capability of an attribute type.
pub trait FieldCodec: Sized {
    /// Column type used when the attribute gets a column
    const STORAGE: StorageType;

    /// `Ok(None)` omits the attribute from the written values.
    fn encode(&self) -> CodecResult<Option<Value>>;

    fn decode(value: ValueRef<'_>) -> CodecResult<Self>;

    /// Decoding for `Option<Self>` attributes.
    fn decode_optional(value: ValueRef<'_>) -> CodecResult<Option<Self>> {
        match value {
            ValueRef::Null => Ok(None),
            other => Self::decode(other).map(Some),
        }
    }

    /// What an `Option<Self>` holding `None` writes.
    fn encode_none() -> Option<Value> {
        Some(Value::Null)
    }
}

impl FieldCodec for String {
    const STORAGE: StorageType = StorageType::Text;

    fn encode(&self) -> CodecResult<Option<Value>> {
        Ok(Some(Value::Text(self.clone())))
    }

    fn decode(value: ValueRef<'_>) -> CodecResult<Self> {
        match value {
            ValueRef::Text(text) => Ok(String::from_utf8_lossy(text).into_owned()),
            ValueRef::Integer(i) => Ok(i.to_string()),
            ValueRef::Real(r) => Ok(r.to_string()),
            ValueRef::Null => Ok(String::new()),
            other => Err(mismatch(Self::STORAGE, other)),
        }
    }
}

impl FieldCodec for bool {
    const STORAGE: StorageType = StorageType::Boolean;

    fn encode(&self) -> CodecResult<Option<Value>> {
        Ok(Some(Value::Integer(i64::from(*self))))
    }

    fn decode(value: ValueRef<'_>) -> CodecResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(i == 1),
            ValueRef::Text(text) => parse_integer(text)
                .map(|i| i == 1)
                .ok_or_else(|| mismatch(Self::STORAGE, value)),
            ValueRef::Null => Ok(false),
            other => Err(mismatch(Self::STORAGE, other)),
        }
    }
}

// Narrowing follows `as`: the low bits are kept, no range check.
macro_rules! integer_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldCodec for $ty {
                const STORAGE: StorageType = StorageType::Integer;

                fn encode(&self) -> CodecResult<Option<Value>> {
                    Ok(Some(Value::Integer(i64::from(*self))))
                }

                fn decode(value: ValueRef<'_>) -> CodecResult<Self> {
                    match value {
                        ValueRef::Integer(i) => Ok(i as $ty),
                        ValueRef::Real(r) => Ok(r as i64 as $ty),
                        ValueRef::Text(text) => parse_integer(text)
                            .map(|i| i as $ty)
                            .ok_or_else(|| mismatch(Self::STORAGE, value)),
                        ValueRef::Null => Ok(0),
                        other => Err(mismatch(Self::STORAGE, other)),
                    }
                }
            }
        )*
    };
}

integer_codec!(i8, i16, i32, i64);

macro_rules! real_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldCodec for $ty {
                const STORAGE: StorageType = StorageType::Real;

                fn encode(&self) -> CodecResult<Option<Value>> {
                    Ok(Some(Value::Real(f64::from(*self))))
                }

                fn decode(value: ValueRef<'_>) -> CodecResult<Self> {
                    match value {
                        ValueRef::Real(r) => Ok(r as $ty),
                        ValueRef::Integer(i) => Ok(i as $ty),
                        ValueRef::Text(text) => parse_real(text)
                            .map(|r| r as $ty)
                            .ok_or_else(|| mismatch(Self::STORAGE, value)),
                        ValueRef::Null => Ok(0.0),
                        other => Err(mismatch(Self::STORAGE, other)),
                    }
                }
            }
        )*
    };
}

real_codec!(f32, f64);

impl<T: FieldCodec> FieldCodec for Option<T> {
    const STORAGE: StorageType = T::STORAGE;

    fn encode(&self) -> CodecResult<Option<Value>> {
        match self {
            Some(value) => value.encode(),
            None => Ok(T::encode_none()),
        }
    }

    fn decode(value: ValueRef<'_>) -> CodecResult<Self> {
        T::decode_optional(value)
    }
}

/// A fieldless enum stored by the symbolic name of its variants.
pub trait EnumField: Sized {
    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self>;
}

pub fn encode_enum<E: EnumField>(value: &E) -> CodecResult<Option<Value>> {
    Ok(Some(Value::Text(value.name().to_string())))
}

/// An empty or unknown name decodes to `None`, never an error.
pub fn decode_enum<E: EnumField>(value: ValueRef<'_>) -> CodecResult<Option<E>> {
    match value {
        ValueRef::Null => Ok(None),
        ValueRef::Text(text) => Ok(std::str::from_utf8(text).ok().and_then(E::from_name)),
        other => Err(mismatch(StorageType::Text, other)),
    }
}

pub fn encode_json<T: Serialize>(value: &T) -> CodecResult<Option<Value>> {
    Ok(Some(Value::Text(serde_json::to_string(value)?)))
}

/// NULL decodes to `T::default()`, so columns added after a row was written
/// still load.
pub fn decode_json<T: DeserializeOwned + Default>(value: ValueRef<'_>) -> CodecResult<T> {
    match value {
        ValueRef::Null => Ok(T::default()),
        ValueRef::Text(text) => Ok(serde_json::from_slice(text)?),
        other => Err(mismatch(StorageType::Text, other)),
    }
}

/// Opaque attribute stored as JSON text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> std::ops::DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> FieldCodec for Json<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    const STORAGE: StorageType = StorageType::Text;

    fn encode(&self) -> CodecResult<Option<Value>> {
        encode_json(&self.0)
    }

    fn decode(value: ValueRef<'_>) -> CodecResult<Self> {
        decode_json(value).map(Json)
    }
}
