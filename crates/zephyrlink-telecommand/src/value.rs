use std::fmt;

use crate::schema::ParamType;

/// One decoded telecommand parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I16(i16),
    I32(i32),
    F32(f32),
}

impl ParamValue {
    /// The wire type this value was decoded as.
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::U8(_) => ParamType::U8,
            Self::U16(_) => ParamType::U16,
            Self::U32(_) => ParamType::U32,
            Self::I8(_) => ParamType::I8,
            Self::I16(_) => ParamType::I16,
            Self::I32(_) => ParamType::I32,
            Self::F32(_) => ParamType::F32,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::U16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I8(v) => Some(i32::from(*v)),
            Self::I16(v) => Some(i32::from(*v)),
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
        }
    }
}

/// A telecommand id with its parameters, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTelecommand {
    pub id: u8,
    pub params: Vec<ParamValue>,
}

impl DecodedTelecommand {
    pub fn new(id: u8, params: Vec<ParamValue>) -> Self {
        Self { id, params }
    }

    /// A command that carries no parameters.
    pub fn bare(id: u8) -> Self {
        Self::new(id, Vec::new())
    }

    pub fn param(&self, index: usize) -> Option<&ParamValue> {
        self.params.get(index)
    }
}

/// Formats the command back into its `id,param,...;` statement form.
impl fmt::Display for DecodedTelecommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        for param in &self.params {
            write!(f, ",{param}")?;
        }
        f.write_str(";")
    }
}
