//! Expression classification
//!
//! A node is an intrinsic expression iff it is a mapping with exactly one key
//! and that key names a supported intrinsic function.

use std::fmt;

use serde_json::{Map, Value};

/// The closed set of supported intrinsic functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Ref,
    GetAtt,
    FindInMap,
    Join,
    Split,
    Select,
    Sub,
    Base64,
    ImportValue,
    GetAZs,
    ToJsonString,
    Not,
    And,
    Or,
    Equals,
    If,
    Contains,
}

impl Intrinsic {
    pub const ALL: [Intrinsic; 17] = [
        Intrinsic::Ref,
        Intrinsic::GetAtt,
        Intrinsic::FindInMap,
        Intrinsic::Join,
        Intrinsic::Split,
        Intrinsic::Select,
        Intrinsic::Sub,
        Intrinsic::Base64,
        Intrinsic::ImportValue,
        Intrinsic::GetAZs,
        Intrinsic::ToJsonString,
        Intrinsic::Not,
        Intrinsic::And,
        Intrinsic::Or,
        Intrinsic::Equals,
        Intrinsic::If,
        Intrinsic::Contains,
    ];

    /// The mapping key that introduces this function
    pub fn key(self) -> &'static str {
        match self {
            Intrinsic::Ref => "Ref",
            Intrinsic::GetAtt => "Fn::GetAtt",
            Intrinsic::FindInMap => "Fn::FindInMap",
            Intrinsic::Join => "Fn::Join",
            Intrinsic::Split => "Fn::Split",
            Intrinsic::Select => "Fn::Select",
            Intrinsic::Sub => "Fn::Sub",
            Intrinsic::Base64 => "Fn::Base64",
            Intrinsic::ImportValue => "Fn::ImportValue",
            Intrinsic::GetAZs => "Fn::GetAZs",
            Intrinsic::ToJsonString => "Fn::ToJsonString",
            Intrinsic::Not => "Fn::Not",
            Intrinsic::And => "Fn::And",
            Intrinsic::Or => "Fn::Or",
            Intrinsic::Equals => "Fn::Equals",
            Intrinsic::If => "Fn::If",
            Intrinsic::Contains => "Fn::Contains",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.key() == key)
    }

    /// Classify a mapping, returning the function and its operand
    pub fn classify_map(map: &Map<String, Value>) -> Option<(Intrinsic, &Value)> {
        if map.len() != 1 {
            return None;
        }
        let (key, operand) = map.iter().next()?;
        Self::from_key(key).map(|intrinsic| (intrinsic, operand))
    }

    /// Classify any node
    pub fn classify(node: &Value) -> Option<(Intrinsic, &Value)> {
        match node {
            Value::Object(map) => Self::classify_map(map),
            _ => None,
        }
    }

    pub fn is_expression(node: &Value) -> bool {
        Self::classify(node).is_some()
    }

    /// Whether any node in the tree is an intrinsic expression
    pub fn contains_expression(node: &Value) -> bool {
        match node {
            Value::Array(items) => items.iter().any(Self::contains_expression),
            Value::Object(map) => {
                Self::classify_map(map).is_some() || map.values().any(Self::contains_expression)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
