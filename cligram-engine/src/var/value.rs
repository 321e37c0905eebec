//! Value payloads and their text formats.
//!
//! Parsing is strict: the whole text must be consumed and numeric literals must fit the width of the
//! declared type. Formatting is canonical, so `parse(format(v)) == v` for every parsed value. Times
//! keep microseconds: finer digits in the input are dropped when parsing.

use super::types::VarType;
use super::VarError;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Six hex octets separated by `:` or `-`.
static MAC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{1,2}([:-][0-9A-Fa-f]{1,2}){5}$").unwrap());

static INTERFACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:/-]+$").unwrap());

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Largest number of fraction digits a `decimal64` can carry.
pub const MAX_FRACTION_DIGITS: u8 = 18;

/// Fraction digits used when a grammar does not say otherwise.
pub const DEFAULT_FRACTION_DIGITS: u8 = 2;

/// Payload of a variable. Several type tags share one payload shape (`string`, `rest` and
/// `interface` all hold [`Value::Str`]); see [`Value::fits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    /// Fixed point number: `value / 10^fraction_digits`.
    Decimal64 { value: i64, fraction_digits: u8 },
    Bool(bool),
    Str(String),
    Ipv4 { addr: Ipv4Addr, prefix_len: Option<u8> },
    Ipv6 { addr: Ipv6Addr, prefix_len: Option<u8> },
    Mac([u8; 6]),
    Url(url::Url),
    Uuid(uuid::Uuid),
    Time(NaiveDateTime),
}

impl Value {
    /// Whether this payload is meaningful for a variable tagged `ty`.
    pub fn fits(&self, ty: VarType) -> bool {
        match self {
            Value::Int8(_) => ty == VarType::Int8,
            Value::Int16(_) => ty == VarType::Int16,
            Value::Int32(_) => ty == VarType::Int32,
            Value::Int64(_) => ty == VarType::Int64,
            Value::Uint8(_) => ty == VarType::Uint8,
            Value::Uint16(_) => ty == VarType::Uint16,
            Value::Uint32(_) => ty == VarType::Uint32,
            Value::Uint64(_) => ty == VarType::Uint64,
            Value::Decimal64 { .. } => ty == VarType::Decimal64,
            Value::Bool(_) => ty == VarType::Bool,
            Value::Str(_) => ty.is_string(),
            Value::Ipv4 { prefix_len, .. } => match prefix_len {
                Some(_) => ty == VarType::Ipv4Prefix,
                None => ty == VarType::Ipv4Addr,
            },
            Value::Ipv6 { prefix_len, .. } => match prefix_len {
                Some(_) => ty == VarType::Ipv6Prefix,
                None => ty == VarType::Ipv6Addr,
            },
            Value::Mac(_) => ty == VarType::MacAddr,
            Value::Url(_) => ty == VarType::Url,
            Value::Uuid(_) => ty == VarType::Uuid,
            Value::Time(_) => ty == VarType::Time,
        }
    }

    /// Parse `text` as a value of type `ty`.
    ///
    /// `fraction_digits` is only consulted for `decimal64`. `Error` and `Empty` never parse.
    pub fn parse(ty: VarType, text: &str, fraction_digits: u8) -> Result<Value, VarError> {
        let invalid = |reason: &str| VarError::InvalidFormat {
            ty,
            text: text.to_string(),
            reason: reason.to_string(),
        };
        match ty {
            VarType::Int8 => parse_int(text).and_then(narrow).map(Value::Int8),
            VarType::Int16 => parse_int(text).and_then(narrow).map(Value::Int16),
            VarType::Int32 => parse_int(text).and_then(narrow).map(Value::Int32),
            VarType::Int64 => parse_int(text).and_then(narrow).map(Value::Int64),
            VarType::Uint8 => parse_int(text).and_then(narrow).map(Value::Uint8),
            VarType::Uint16 => parse_int(text).and_then(narrow).map(Value::Uint16),
            VarType::Uint32 => parse_int(text).and_then(narrow).map(Value::Uint32),
            VarType::Uint64 => parse_int(text).and_then(narrow).map(Value::Uint64),
            VarType::Decimal64 => parse_decimal(text, fraction_digits)
                .map(|value| Value::Decimal64 { value, fraction_digits }),
            VarType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "on" | "enable" | "yes" => Ok(Value::Bool(true)),
                "false" | "off" | "disable" | "no" => Ok(Value::Bool(false)),
                _ => Err("expected true or false".to_string()),
            },
            VarType::String | VarType::Rest => Ok(Value::Str(text.to_string())),
            VarType::Interface => {
                if INTERFACE_REGEX.is_match(text) {
                    Ok(Value::Str(text.to_string()))
                } else {
                    Err("not an interface name".to_string())
                }
            }
            VarType::Ipv4Addr => text
                .parse::<Ipv4Addr>()
                .map(|addr| Value::Ipv4 { addr, prefix_len: None })
                .map_err(|e| e.to_string()),
            VarType::Ipv4Prefix => parse_prefix::<Ipv4Addr>(text, 32)
                .map(|(addr, len)| Value::Ipv4 { addr, prefix_len: Some(len) }),
            VarType::Ipv6Addr => text
                .parse::<Ipv6Addr>()
                .map(|addr| Value::Ipv6 { addr, prefix_len: None })
                .map_err(|e| e.to_string()),
            VarType::Ipv6Prefix => parse_prefix::<Ipv6Addr>(text, 128)
                .map(|(addr, len)| Value::Ipv6 { addr, prefix_len: Some(len) }),
            VarType::MacAddr => parse_mac(text).map(Value::Mac),
            VarType::Url => url::Url::parse(text).map(Value::Url).map_err(|e| e.to_string()),
            VarType::Uuid => uuid::Uuid::parse_str(text)
                .map(Value::Uuid)
                .map_err(|e| e.to_string()),
            VarType::Time => parse_time(text).map(Value::Time),
            VarType::Error | VarType::Empty => Err(format!("{} variables carry no value", ty)),
        }
        .map_err(|reason| invalid(&reason))
    }

    /// Order two values of the same shape. `None` when the shapes differ.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Int8(a), Int8(b)) => Some(a.cmp(b)),
            (Int16(a), Int16(b)) => Some(a.cmp(b)),
            (Int32(a), Int32(b)) => Some(a.cmp(b)),
            (Int64(a), Int64(b)) => Some(a.cmp(b)),
            (Uint8(a), Uint8(b)) => Some(a.cmp(b)),
            (Uint16(a), Uint16(b)) => Some(a.cmp(b)),
            (Uint32(a), Uint32(b)) => Some(a.cmp(b)),
            (Uint64(a), Uint64(b)) => Some(a.cmp(b)),
            (
                Decimal64 { value: a, fraction_digits: da },
                Decimal64 { value: b, fraction_digits: db },
            ) => {
                let digits = (*da).max(*db);
                let scale = |v: i64, d: u8| v as i128 * 10i128.pow(u32::from(digits - d));
                Some(scale(*a, *da).cmp(&scale(*b, *db)))
            }
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Str(a), Str(b)) => Some(a.cmp(b)),
            (Ipv4 { addr: a, prefix_len: pa }, Ipv4 { addr: b, prefix_len: pb }) => {
                Some((a, pa).cmp(&(b, pb)))
            }
            (Ipv6 { addr: a, prefix_len: pa }, Ipv6 { addr: b, prefix_len: pb }) => {
                Some((a, pa).cmp(&(b, pb)))
            }
            (Mac(a), Mac(b)) => Some(a.cmp(b)),
            (Url(a), Url(b)) => Some(a.cmp(b)),
            (Uuid(a), Uuid(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Bytes owned on the heap by this payload.
    pub fn heap_size(&self) -> usize {
        match self {
            Value::Str(s) => s.capacity(),
            Value::Url(u) => u.as_str().len(),
            _ => 0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Uint8(v) => write!(f, "{}", v),
            Value::Uint16(v) => write!(f, "{}", v),
            Value::Uint32(v) => write!(f, "{}", v),
            Value::Uint64(v) => write!(f, "{}", v),
            Value::Decimal64 { value, fraction_digits } => {
                let scale = 10u128.pow(u32::from(*fraction_digits));
                let magnitude = (*value as i128).unsigned_abs();
                let sign = if *value < 0 { "-" } else { "" };
                write!(
                    f,
                    "{}{}.{:0width$}",
                    sign,
                    magnitude / scale,
                    magnitude % scale,
                    width = *fraction_digits as usize
                )
            }
            Value::Bool(v) => write!(f, "{}", v),
            Value::Str(s) => f.write_str(s),
            Value::Ipv4 { addr, prefix_len: Some(len) } => write!(f, "{}/{}", addr, len),
            Value::Ipv4 { addr, prefix_len: None } => write!(f, "{}", addr),
            Value::Ipv6 { addr, prefix_len: Some(len) } => write!(f, "{}/{}", addr, len),
            Value::Ipv6 { addr, prefix_len: None } => write!(f, "{}", addr),
            Value::Mac(octets) => {
                let parts: Vec<String> = octets.iter().map(|o| format!("{:02x}", o)).collect();
                f.write_str(&parts.join(":"))
            }
            Value::Url(u) => f.write_str(u.as_str()),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
        }
    }
}

/// Parse an integer literal: optional sign, then decimal digits or `0x` hex digits.
fn parse_int(text: &str) -> Result<i128, String> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, body),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err("not a number".to_string());
    }
    let magnitude = i128::from_str_radix(digits, radix).map_err(|_| "out of range".to_string())?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn narrow<T: TryFrom<i128>>(n: i128) -> Result<T, String> {
    T::try_from(n).map_err(|_| "out of range".to_string())
}

fn parse_decimal(text: &str, fraction_digits: u8) -> Result<i64, String> {
    if fraction_digits == 0 || fraction_digits > MAX_FRACTION_DIGITS {
        return Err(format!("unsupported fraction-digits {}", fraction_digits));
    }
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) if !f.is_empty() => (i, f),
        Some(_) => return Err("missing fraction digits after '.'".to_string()),
        None => (body, ""),
    };
    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return Err("not a decimal number".to_string());
    }
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err("not a decimal number".to_string());
    }
    if frac_part.len() > fraction_digits as usize {
        return Err(format!("more than {} fraction digits", fraction_digits));
    }
    let mut value: i128 = int_part.parse().map_err(|_| "out of range".to_string())?;
    let padded = format!("{:0<width$}", frac_part, width = fraction_digits as usize);
    for digit in padded.chars() {
        let d = i128::from(digit as u8 - b'0');
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(d))
            .ok_or_else(|| "out of range".to_string())?;
    }
    let value = if negative { -value } else { value };
    i64::try_from(value).map_err(|_| "out of range".to_string())
}

fn parse_prefix<A: std::str::FromStr>(text: &str, max_len: u8) -> Result<(A, u8), String> {
    let (addr, len) = text
        .split_once('/')
        .ok_or_else(|| "expected address/length".to_string())?;
    let addr = addr.parse::<A>().map_err(|_| "invalid address".to_string())?;
    let len: u8 = len.parse().map_err(|_| "invalid prefix length".to_string())?;
    if len > max_len {
        return Err(format!("prefix length exceeds {}", max_len));
    }
    Ok((addr, len))
}

fn parse_mac(text: &str) -> Result<[u8; 6], String> {
    if !MAC_REGEX.is_match(text) {
        return Err("expected six hex octets".to_string());
    }
    let mut octets = [0u8; 6];
    for (slot, part) in octets.iter_mut().zip(text.split([':', '-'])) {
        *slot = u8::from_str_radix(part, 16).map_err(|e| e.to_string())?;
    }
    Ok(octets)
}

/// ISO-8601 (`2008-09-21T18:57:21.003456Z`, `T` or space separated) or seconds since the epoch,
/// truncated to the microsecond.
fn parse_time(text: &str) -> Result<NaiveDateTime, String> {
    let time = parse_time_exact(text)?;
    time.with_nanosecond(time.nanosecond() / 1000 * 1000)
        .ok_or_else(|| "time out of range".to_string())
}

fn parse_time_exact(text: &str) -> Result<NaiveDateTime, String> {
    let trimmed = text.strip_suffix('Z').unwrap_or(text);
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
        let (secs, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if frac.len() > 9 || secs.is_empty() {
            return Err("invalid epoch time".to_string());
        }
        let secs: i64 = secs.parse().map_err(|_| "invalid epoch time".to_string())?;
        let nanos: u32 = if frac.is_empty() {
            0
        } else {
            format!("{:0<9}", frac)
                .parse()
                .map_err(|_| "invalid epoch time".to_string())?
        };
        return DateTime::<Utc>::from_timestamp(secs, nanos)
            .map(|t| t.naive_utc())
            .ok_or_else(|| "time out of range".to_string());
    }
    let normalized = trimmed.replacen(' ', "T", 1);
    let format = if normalized.contains('.') {
        "%Y-%m-%dT%H:%M:%S%.f"
    } else {
        "%Y-%m-%dT%H:%M:%S"
    };
    NaiveDateTime::parse_from_str(&normalized, format).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(ty: VarType, s: &str) -> String {
        Value::parse(ty, s, DEFAULT_FRACTION_DIGITS)
            .unwrap_or_else(|e| panic!("{}: {}", s, e))
            .to_string()
    }

    #[test]
    fn test_integer_widths() {
        assert_eq!(text(VarType::Int8, "-128"), "-128");
        assert!(Value::parse(VarType::Int8, "128", 2).is_err());
        assert!(Value::parse(VarType::Uint8, "-1", 2).is_err());
        assert_eq!(text(VarType::Uint16, "0x1F"), "31");
        assert_eq!(text(VarType::Int64, "+42"), "42");
        assert!(Value::parse(VarType::Int32, "--5", 2).is_err());
        assert!(Value::parse(VarType::Int32, "", 2).is_err());
        assert!(Value::parse(VarType::Int32, "12a", 2).is_err());
    }

    #[test]
    fn test_decimal() {
        assert_eq!(text(VarType::Decimal64, "3.14"), "3.14");
        assert_eq!(text(VarType::Decimal64, "3"), "3.00");
        assert_eq!(text(VarType::Decimal64, "-0.5"), "-0.50");
        assert!(Value::parse(VarType::Decimal64, "3.141", 2).is_err());
        assert!(Value::parse(VarType::Decimal64, "3.", 2).is_err());
        assert_eq!(
            Value::parse(VarType::Decimal64, "1.5", 3).unwrap(),
            Value::Decimal64 { value: 1500, fraction_digits: 3 }
        );
    }

    #[test]
    fn test_decimal_compare_across_digits() {
        let a = Value::Decimal64 { value: 150, fraction_digits: 2 };
        let b = Value::Decimal64 { value: 1500, fraction_digits: 3 };
        assert_eq!(a.compare(&b), Some(Ordering::Equal));
    }

    #[test]
    fn test_addresses() {
        assert_eq!(text(VarType::Ipv4Addr, "10.0.0.1"), "10.0.0.1");
        assert_eq!(text(VarType::Ipv4Prefix, "10.0.0.0/8"), "10.0.0.0/8");
        assert!(Value::parse(VarType::Ipv4Prefix, "10.0.0.0/33", 2).is_err());
        assert!(Value::parse(VarType::Ipv4Addr, "10.0.0.256", 2).is_err());
        assert_eq!(text(VarType::Ipv6Prefix, "2001:db8::/32"), "2001:db8::/32");
        assert_eq!(text(VarType::MacAddr, "00-1A-2b-3c-4d-5e"), "00:1a:2b:3c:4d:5e");
        assert!(Value::parse(VarType::MacAddr, "00:1a:2b:3c:4d", 2).is_err());
    }

    #[test]
    fn test_bool_and_interface() {
        assert_eq!(text(VarType::Bool, "On"), "true");
        assert_eq!(text(VarType::Bool, "disable"), "false");
        assert!(Value::parse(VarType::Bool, "maybe", 2).is_err());
        assert_eq!(text(VarType::Interface, "eth0/1.100"), "eth0/1.100");
        assert!(Value::parse(VarType::Interface, "eth 0", 2).is_err());
    }

    #[test]
    fn test_uuid_url_time() {
        assert_eq!(
            text(VarType::Uuid, "550E8400-E29B-41D4-A716-446655440000"),
            "550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(text(VarType::Url, "http://example.com/a"), "http://example.com/a");
        assert_eq!(
            text(VarType::Time, "2008-09-21T18:57:21.003456"),
            "2008-09-21T18:57:21.003456Z"
        );
        assert_eq!(text(VarType::Time, "2008-09-21 18:57:21Z"), "2008-09-21T18:57:21.000000Z");
        assert_eq!(text(VarType::Time, "0.5"), "1970-01-01T00:00:00.500000Z");
        let fine = Value::parse(VarType::Time, "2008-09-21T18:57:21.003456789", 2).unwrap();
        assert_eq!(fine.to_string(), "2008-09-21T18:57:21.003456Z");
        assert_eq!(Value::parse(VarType::Time, &fine.to_string(), 2), Ok(fine));
        assert_eq!(text(VarType::Time, "1.123456789"), "1970-01-01T00:00:01.123456Z");
        assert!(Value::parse(VarType::Time, "yesterday", 2).is_err());
    }

    #[test]
    fn test_fits() {
        assert!(Value::Str("x".into()).fits(VarType::Rest));
        assert!(!Value::Str("x".into()).fits(VarType::Int8));
        let prefix = Value::Ipv4 { addr: Ipv4Addr::LOCALHOST, prefix_len: Some(8) };
        assert!(prefix.fits(VarType::Ipv4Prefix));
        assert!(!prefix.fits(VarType::Ipv4Addr));
    }

    #[test]
    fn test_empty_never_parses() {
        assert!(Value::parse(VarType::Empty, "", 2).is_err());
        assert!(Value::parse(VarType::Error, "1", 2).is_err());
    }
}
