//! Field type tags for Dido schemas.
//!
//! Every schema field carries one of these tags; record construction checks
//! values against them.

use core::fmt;

/// The type of a schema field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float64,
    String,
}

impl DataType {
    /// Returns the short name used when rendering schemas.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Int32 => "int",
            DataType::Int64 => "long",
            DataType::Float64 => "double",
            DataType::String => "String",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_data_type_display() {
        assert_eq!(DataType::String.to_string(), "String");
        assert_eq!(DataType::Float64.to_string(), "double");
        assert_eq!(DataType::Int32.to_string(), "int");
        assert_eq!(DataType::Int64.to_string(), "long");
        assert_eq!(DataType::Boolean.to_string(), "boolean");
    }
}
