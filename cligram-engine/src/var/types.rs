//! The closed set of variable types.

use std::fmt;

/// Type tag of a [`CgVar`](crate::var::CgVar).
///
/// The tag decides which [`Value`](crate::var::Value) payload is meaningful. `Error` is the tag of an
/// uninitialised variable and `Empty` marks "no value on purpose" (for example a missing lower range
/// bound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum VarType {
    #[default]
    Error,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal64,
    Bool,
    String,
    Rest,
    Interface,
    Ipv4Addr,
    Ipv4Prefix,
    Ipv6Addr,
    Ipv6Prefix,
    MacAddr,
    Url,
    Uuid,
    Time,
    Empty,
}

impl VarType {
    /// Every type a grammar can name. `Error` is deliberately absent.
    pub const BUILTIN: &'static [VarType] = &[
        VarType::Int8,
        VarType::Int16,
        VarType::Int32,
        VarType::Int64,
        VarType::Uint8,
        VarType::Uint16,
        VarType::Uint32,
        VarType::Uint64,
        VarType::Decimal64,
        VarType::Bool,
        VarType::String,
        VarType::Rest,
        VarType::Interface,
        VarType::Ipv4Addr,
        VarType::Ipv4Prefix,
        VarType::Ipv6Addr,
        VarType::Ipv6Prefix,
        VarType::MacAddr,
        VarType::Url,
        VarType::Uuid,
        VarType::Time,
        VarType::Empty,
    ];

    /// Name used in grammar text, e.g. `<x:int32>`.
    pub fn name(self) -> &'static str {
        match self {
            VarType::Error => "error",
            VarType::Int8 => "int8",
            VarType::Int16 => "int16",
            VarType::Int32 => "int32",
            VarType::Int64 => "int64",
            VarType::Uint8 => "uint8",
            VarType::Uint16 => "uint16",
            VarType::Uint32 => "uint32",
            VarType::Uint64 => "uint64",
            VarType::Decimal64 => "decimal64",
            VarType::Bool => "bool",
            VarType::String => "string",
            VarType::Rest => "rest",
            VarType::Interface => "interface",
            VarType::Ipv4Addr => "ipv4addr",
            VarType::Ipv4Prefix => "ipv4prefix",
            VarType::Ipv6Addr => "ipv6addr",
            VarType::Ipv6Prefix => "ipv6prefix",
            VarType::MacAddr => "macaddr",
            VarType::Url => "url",
            VarType::Uuid => "uuid",
            VarType::Time => "time",
            VarType::Empty => "empty",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::BUILTIN.iter().copied().find(|ty| ty.name() == name)
    }

    pub fn is_int(self) -> bool {
        matches!(
            self,
            VarType::Int8
                | VarType::Int16
                | VarType::Int32
                | VarType::Int64
                | VarType::Uint8
                | VarType::Uint16
                | VarType::Uint32
                | VarType::Uint64
        )
    }

    /// Types that take `range[..]` constraints.
    pub fn is_numeric(self) -> bool {
        self.is_int() || self == VarType::Decimal64
    }

    /// Types that hold free text and take `length[..]` constraints.
    pub fn is_string(self) -> bool {
        matches!(self, VarType::String | VarType::Rest | VarType::Interface)
    }

    /// How narrowly the type constrains its input.
    ///
    /// Used by the matcher to prefer `<n:int32>` over `<s:string>` when both accept a token.
    pub fn specificity(self) -> u8 {
        match self {
            VarType::Rest => 0,
            VarType::String => 1,
            VarType::Interface => 2,
            _ => 3,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
