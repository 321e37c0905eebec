//! Typed variables
//!
//! A [`CgVar`] is the unit of data the engine moves around: a value extracted from a matched command
//! line, a range bound declared in a grammar, a callback argument. It carries a [`VarType`] tag, an
//! optional name, a keyword flag and a [`Value`] payload that always fits the tag.
//!
//! Lifecycle: created with a type (or as an uninitialised `error` variable), optionally named, given a
//! value once matched, and reset back to the uninitialised state with [`CgVar::reset`].

pub mod types;
pub mod value;

pub use types::VarType;
pub use value::{Value, DEFAULT_FRACTION_DIGITS, MAX_FRACTION_DIGITS};

use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

/// Errors produced when setting, reading or validating a variable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarError {
    #[error("invalid {ty} value `{text}`: {reason}")]
    InvalidFormat {
        ty: VarType,
        text: String,
        reason: String,
    },
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: VarType, found: VarType },
    #[error("{ty} variable has no value")]
    NoValue { ty: VarType },
    #[error("`{value}` is out of range {allowed}")]
    RangeViolation { value: String, allowed: String },
    #[error("`{value}` does not match pattern `{pattern}`")]
    PatternMismatch { value: String, pattern: String },
    #[error("`{value}` is not one of {choices}")]
    NotAChoice { value: String, choices: String },
    #[error("fraction-digits must be between 1 and {}, got {0}", MAX_FRACTION_DIGITS)]
    FractionDigits(u8),
}

/// A typed, optionally named value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgVar {
    name: Option<String>,
    keyword: bool,
    ty: VarType,
    fraction_digits: u8,
    value: Option<Value>,
}

impl Default for CgVar {
    fn default() -> Self {
        Self::new(VarType::Error)
    }
}

macro_rules! scalar_accessors {
    ($($get:ident, $set:ident, $variant:ident, $t:ty;)*) => {
        $(
            pub fn $get(&self) -> Result<$t, VarError> {
                match &self.value {
                    Some(Value::$variant(v)) => Ok(*v),
                    _ => Err(self.mismatch(VarType::$variant)),
                }
            }

            pub fn $set(&mut self, v: $t) -> Result<(), VarError> {
                self.set_value(Value::$variant(v))
            }
        )*
    };
}

impl CgVar {
    /// An unnamed variable of type `ty` without a value.
    pub fn new(ty: VarType) -> Self {
        Self {
            name: None,
            keyword: false,
            ty,
            fraction_digits: DEFAULT_FRACTION_DIGITS,
            value: None,
        }
    }

    pub fn named(name: impl Into<String>, ty: VarType) -> Self {
        let mut var = Self::new(ty);
        var.name = Some(name.into());
        var
    }

    /// A keyword entry: a `string` variable whose name and value are both the keyword text.
    pub fn keyword(text: &str) -> Self {
        Self {
            name: Some(text.to_string()),
            keyword: true,
            ty: VarType::String,
            fraction_digits: DEFAULT_FRACTION_DIGITS,
            value: Some(Value::Str(text.to_string())),
        }
    }

    /// A `string` variable holding `text`.
    pub fn string(name: Option<&str>, text: &str) -> Self {
        Self {
            name: name.map(str::to_string),
            keyword: false,
            ty: VarType::String,
            fraction_digits: DEFAULT_FRACTION_DIGITS,
            value: Some(Value::Str(text.to_string())),
        }
    }

    /// A `rest` variable holding `text`.
    pub fn rest(name: Option<&str>, text: &str) -> Self {
        Self {
            ty: VarType::Rest,
            ..Self::string(name, text)
        }
    }

    pub fn ty(&self) -> VarType {
        self.ty
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(str::to_string);
    }

    pub fn is_keyword(&self) -> bool {
        self.keyword
    }

    pub fn set_keyword(&mut self, keyword: bool) {
        self.keyword = keyword;
    }

    pub fn fraction_digits(&self) -> u8 {
        self.fraction_digits
    }

    pub fn set_fraction_digits(&mut self, digits: u8) -> Result<(), VarError> {
        if digits == 0 || digits > MAX_FRACTION_DIGITS {
            return Err(VarError::FractionDigits(digits));
        }
        self.fraction_digits = digits;
        Ok(())
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Store a native value. Fails with [`VarError::TypeMismatch`] when the payload does not fit the tag,
    /// and with [`VarError::FractionDigits`] for a `decimal64` outside 1..=18 digits.
    pub fn set_value(&mut self, value: Value) -> Result<(), VarError> {
        if !value.fits(self.ty) {
            return Err(VarError::TypeMismatch {
                expected: self.ty,
                found: payload_type(&value),
            });
        }
        if let Value::Decimal64 { fraction_digits, .. } = value {
            self.set_fraction_digits(fraction_digits)?;
        }
        self.value = Some(value);
        Ok(())
    }

    /// Set the value from text, using the parser of the variable's own type.
    ///
    /// On failure the previous value is kept.
    pub fn parse(&mut self, text: &str) -> Result<(), VarError> {
        let value = Value::parse(self.ty, text, self.fraction_digits)?;
        self.value = Some(value);
        Ok(())
    }

    /// Canonical text of the value; empty when unset.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    scalar_accessors! {
        int8, set_int8, Int8, i8;
        int16, set_int16, Int16, i16;
        int32, set_int32, Int32, i32;
        int64, set_int64, Int64, i64;
        uint8, set_uint8, Uint8, u8;
        uint16, set_uint16, Uint16, u16;
        uint32, set_uint32, Uint32, u32;
        uint64, set_uint64, Uint64, u64;
        boolean, set_boolean, Bool, bool;
    }

    /// Raw fixed-point value and its fraction digits.
    pub fn decimal64(&self) -> Result<(i64, u8), VarError> {
        match &self.value {
            Some(Value::Decimal64 { value, fraction_digits }) => Ok((*value, *fraction_digits)),
            _ => Err(self.mismatch(VarType::Decimal64)),
        }
    }

    /// Text of a `string`, `rest` or `interface` variable.
    pub fn string_value(&self) -> Result<&str, VarError> {
        match &self.value {
            Some(Value::Str(s)) => Ok(s),
            _ => Err(self.mismatch(VarType::String)),
        }
    }

    pub fn set_string(&mut self, text: &str) -> Result<(), VarError> {
        self.set_value(Value::Str(text.to_string()))
    }

    pub fn ipv4(&self) -> Result<(Ipv4Addr, Option<u8>), VarError> {
        match &self.value {
            Some(Value::Ipv4 { addr, prefix_len }) => Ok((*addr, *prefix_len)),
            _ => Err(self.mismatch(VarType::Ipv4Addr)),
        }
    }

    pub fn ipv6(&self) -> Result<(Ipv6Addr, Option<u8>), VarError> {
        match &self.value {
            Some(Value::Ipv6 { addr, prefix_len }) => Ok((*addr, *prefix_len)),
            _ => Err(self.mismatch(VarType::Ipv6Addr)),
        }
    }

    pub fn mac(&self) -> Result<[u8; 6], VarError> {
        match &self.value {
            Some(Value::Mac(octets)) => Ok(*octets),
            _ => Err(self.mismatch(VarType::MacAddr)),
        }
    }

    pub fn url(&self) -> Result<&url::Url, VarError> {
        match &self.value {
            Some(Value::Url(u)) => Ok(u),
            _ => Err(self.mismatch(VarType::Url)),
        }
    }

    pub fn uuid(&self) -> Result<uuid::Uuid, VarError> {
        match &self.value {
            Some(Value::Uuid(u)) => Ok(*u),
            _ => Err(self.mismatch(VarType::Uuid)),
        }
    }

    pub fn time(&self) -> Result<NaiveDateTime, VarError> {
        match &self.value {
            Some(Value::Time(t)) => Ok(*t),
            _ => Err(self.mismatch(VarType::Time)),
        }
    }

    /// Order two variables of the same type.
    pub fn compare(&self, other: &CgVar) -> Result<Ordering, VarError> {
        if self.ty != other.ty {
            return Err(VarError::TypeMismatch {
                expected: self.ty,
                found: other.ty,
            });
        }
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => a.compare(b).ok_or(VarError::TypeMismatch {
                expected: self.ty,
                found: other.ty,
            }),
            (None, None) => Ok(Ordering::Equal),
            (None, Some(_)) => Ok(Ordering::Less),
            (Some(_), None) => Ok(Ordering::Greater),
        }
    }

    /// Approximate memory footprint in bytes, including owned heap data.
    pub fn size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.name.as_ref().map_or(0, |n| n.capacity())
            + self.value.as_ref().map_or(0, Value::heap_size)
    }

    /// Drop name and payload, returning to the uninitialised `error` state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn mismatch(&self, expected: VarType) -> VarError {
        if self.value.is_none() && (self.ty == expected || (expected.is_string() && self.ty.is_string())) {
            VarError::NoValue { ty: self.ty }
        } else {
            VarError::TypeMismatch {
                expected,
                found: self.ty,
            }
        }
    }
}

impl fmt::Display for CgVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}", value),
            None => Ok(()),
        }
    }
}

/// The type a payload naturally belongs to; used for error messages only.
fn payload_type(value: &Value) -> VarType {
    match value {
        Value::Int8(_) => VarType::Int8,
        Value::Int16(_) => VarType::Int16,
        Value::Int32(_) => VarType::Int32,
        Value::Int64(_) => VarType::Int64,
        Value::Uint8(_) => VarType::Uint8,
        Value::Uint16(_) => VarType::Uint16,
        Value::Uint32(_) => VarType::Uint32,
        Value::Uint64(_) => VarType::Uint64,
        Value::Decimal64 { .. } => VarType::Decimal64,
        Value::Bool(_) => VarType::Bool,
        Value::Str(_) => VarType::String,
        Value::Ipv4 { prefix_len: Some(_), .. } => VarType::Ipv4Prefix,
        Value::Ipv4 { .. } => VarType::Ipv4Addr,
        Value::Ipv6 { prefix_len: Some(_), .. } => VarType::Ipv6Prefix,
        Value::Ipv6 { .. } => VarType::Ipv6Addr,
        Value::Mac(_) => VarType::MacAddr,
        Value::Url(_) => VarType::Url,
        Value::Uuid(_) => VarType::Uuid,
        Value::Time(_) => VarType::Time,
    }
}
