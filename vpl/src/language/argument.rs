use std::fmt;

use serde::Deserialize;

/// The declared type of a statement argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
    Bool,
    Num,
    Str,
    /// Free-form expression source, kept as text.
    Expr,
    /// Name of a device the statement is bound to.
    Device,
    /// Reference to an invocable device function.
    Invoke,
    #[serde(other)]
    Unknown,
}

impl ArgumentType {
    pub fn name(&self) -> &'static str {
        match self {
            ArgumentType::Bool => "bool",
            ArgumentType::Num => "num",
            ArgumentType::Str => "str",
            ArgumentType::Expr => "expr",
            ArgumentType::Device => "device",
            ArgumentType::Invoke => "invoke",
            ArgumentType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete argument value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl ArgumentValue {
    /// The value a freshly placed argument gets when the schema declares no default.
    pub fn default_for(ty: ArgumentType) -> Self {
        match ty {
            ArgumentType::Bool => ArgumentValue::Boolean(false),
            ArgumentType::Num => ArgumentValue::Number(0.0),
            _ => ArgumentValue::String(String::new()),
        }
    }

    /// Whether this value may be stored in an argument of type `ty`.
    pub fn fits(&self, ty: ArgumentType) -> bool {
        match (ty, self) {
            (ArgumentType::Bool, ArgumentValue::Boolean(_)) => true,
            (ArgumentType::Num, ArgumentValue::Number(_)) => true,
            (ArgumentType::Bool | ArgumentType::Num, _) => false,
            (_, ArgumentValue::String(_)) => true,
            (ArgumentType::Unknown, _) => true,
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ArgumentValue::Boolean(_) => "boolean",
            ArgumentValue::Number(_) => "number",
            ArgumentValue::String(_) => "string",
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Boolean(b) => write!(f, "{}", b),
            ArgumentValue::Number(n) => {
                if n.is_finite() && *n == n.floor() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            ArgumentValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// Schema-side description of one argument slot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArgumentSpec {
    #[serde(rename = "type")]
    pub ty: ArgumentType,
    #[serde(default)]
    pub label: Option<String>,
    /// Default value placed into new statements.
    #[serde(default)]
    pub value: Option<ArgumentValue>,
    /// Enumerated choices offered by the argument's dropdown.
    #[serde(default)]
    pub options: Option<Vec<ArgumentValue>>,
}

impl ArgumentSpec {
    pub fn new(ty: ArgumentType) -> Self {
        ArgumentSpec {
            ty,
            label: None,
            value: None,
            options: None,
        }
    }

    pub fn with_default(mut self, value: ArgumentValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn instantiate(&self) -> Argument {
        Argument {
            ty: self.ty,
            value: self
                .value
                .clone()
                .unwrap_or_else(|| ArgumentValue::default_for(self.ty)),
        }
    }
}

/// An argument slot of a placed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub ty: ArgumentType,
    pub value: ArgumentValue,
}

impl Argument {
    pub fn new(ty: ArgumentType, value: ArgumentValue) -> Self {
        Argument { ty, value }
    }
}
