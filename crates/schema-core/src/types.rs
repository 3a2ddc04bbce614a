use std::fmt;

use serde_json::Value;

/// The runtime type of a document node.
///
/// `Integer` is distinguished from `Number` so that keywords can require
/// integral values, but any [`TypeSet`] accepting `Number` also accepts
/// `Integer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl NodeType {
    #[must_use]
    pub fn of(value: &Value) -> NodeType {
        match value {
            Value::Null => NodeType::Null,
            Value::Bool(_) => NodeType::Boolean,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    NodeType::Integer
                } else {
                    NodeType::Number
                }
            }
            Value::String(_) => NodeType::String,
            Value::Array(_) => NodeType::Array,
            Value::Object(_) => NodeType::Object,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Array => "array",
            NodeType::Boolean => "boolean",
            NodeType::Integer => "integer",
            NodeType::Null => "null",
            NodeType::Number => "number",
            NodeType::Object => "object",
            NodeType::String => "string",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            NodeType::Array => 1,
            NodeType::Boolean => 1 << 1,
            NodeType::Integer => 1 << 2,
            NodeType::Null => 1 << 3,
            NodeType::Number => 1 << 4,
            NodeType::Object => 1 << 5,
            NodeType::String => 1 << 6,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of [`NodeType`]s, used as the per-keyword value type whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSet(u8);

impl TypeSet {
    #[must_use]
    pub const fn empty() -> TypeSet {
        TypeSet(0)
    }

    #[must_use]
    pub const fn any() -> TypeSet {
        TypeSet(0x7f)
    }

    #[must_use]
    pub const fn of(ty: NodeType) -> TypeSet {
        TypeSet(ty.bit())
    }

    #[must_use]
    pub const fn and(self, ty: NodeType) -> TypeSet {
        TypeSet(self.0 | ty.bit())
    }

    /// Whether the set accepts the given type. A set accepting `Number`
    /// also accepts `Integer`.
    #[must_use]
    pub const fn contains(self, ty: NodeType) -> bool {
        if self.0 & ty.bit() != 0 {
            return true;
        }
        matches!(ty, NodeType::Integer) && self.0 & NodeType::Number.bit() != 0
    }

    /// The accepted type names, in display order.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        const ALL: [NodeType; 7] = [
            NodeType::Array,
            NodeType::Boolean,
            NodeType::Integer,
            NodeType::Null,
            NodeType::Number,
            NodeType::Object,
            NodeType::String,
        ];
        ALL.iter()
            .filter(|ty| self.0 & ty.bit() != 0)
            .map(|ty| ty.as_str())
            .collect()
    }
}
