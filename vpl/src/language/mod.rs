pub mod argument;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::language::argument::ArgumentSpec;

/// Statement ids starting with this marker are internal and never user-addable.
pub const PRIVATE_PREFIX: char = '_';

/// Internal statement that selects the device type a procedure operates on.
pub const DEVICE_TYPE_STATEMENT: &str = "_deviceType";

/// How a statement is shaped in a program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    #[default]
    Unit,
    /// Owns a nested block.
    Compound,
    /// Bound to a device named by `deviceName`.
    Device,
}

/// Schema entry describing one statement kind and its structural constraints.
///
/// Structural relations (`parents`, `predecessors`, `successors`,
/// `nestedStatements`) refer to statement ids, never to placed instances.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementDefinition {
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: StatementKind,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
    /// Compound statements that may directly contain this statement.
    pub parents: Option<Vec<String>>,
    /// Statements that must appear earlier in the same block.
    pub predecessors: Option<Vec<String>>,
    /// Statements that must appear later in the same block.
    pub successors: Option<Vec<String>>,
    /// Whitelist of statements allowed inside this compound statement.
    pub nested_statements: Option<Vec<String>>,
    #[serde(default)]
    pub is_user_procedure: bool,
    pub device_name: Option<String>,
}

fn lists(ids: &Option<Vec<String>>, id: &str) -> bool {
    ids.as_ref().is_some_and(|ids| ids.iter().any(|i| i == id))
}

fn to_ids<I, S>(ids: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Some(ids.into_iter().map(Into::into).collect())
}

impl StatementDefinition {
    pub fn new(label: impl Into<String>, kind: StatementKind) -> Self {
        StatementDefinition {
            label: label.into(),
            kind,
            arguments: Vec::new(),
            parents: None,
            predecessors: None,
            successors: None,
            nested_statements: None,
            is_user_procedure: false,
            device_name: None,
        }
    }

    pub fn unit(label: impl Into<String>) -> Self {
        Self::new(label, StatementKind::Unit)
    }

    pub fn compound(label: impl Into<String>) -> Self {
        Self::new(label, StatementKind::Compound)
    }

    pub fn device(label: impl Into<String>, device_name: impl Into<String>) -> Self {
        let mut def = Self::new(label, StatementKind::Device);
        def.device_name = Some(device_name.into());
        def
    }

    pub fn user_procedure(label: impl Into<String>) -> Self {
        let mut def = Self::unit(label);
        def.is_user_procedure = true;
        def
    }

    pub fn with_arguments(mut self, arguments: Vec<ArgumentSpec>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_parents<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ids: I) -> Self {
        self.parents = to_ids(ids);
        self
    }

    pub fn with_predecessors<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ids: I) -> Self {
        self.predecessors = to_ids(ids);
        self
    }

    pub fn with_successors<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ids: I) -> Self {
        self.successors = to_ids(ids);
        self
    }

    pub fn with_nested_statements<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        ids: I,
    ) -> Self {
        self.nested_statements = to_ids(ids);
        self
    }

    pub fn is_compound(&self) -> bool {
        self.kind == StatementKind::Compound
    }

    pub fn lists_parent(&self, id: &str) -> bool {
        lists(&self.parents, id)
    }

    pub fn lists_predecessor(&self, id: &str) -> bool {
        lists(&self.predecessors, id)
    }

    pub fn lists_successor(&self, id: &str) -> bool {
        lists(&self.successors, id)
    }

    /// True when `id` is required earlier in the same block (predecessor or parent).
    pub fn depends_on(&self, id: &str) -> bool {
        self.lists_predecessor(id) || self.lists_parent(id)
    }

    /// True if a parent whitelist exists and admits `id`, or no whitelist exists.
    pub fn admits_nested(&self, id: &str) -> bool {
        match &self.nested_statements {
            Some(ids) => ids.iter().any(|i| i == id),
            None => true,
        }
    }
}

/// A language schema: every statement definition, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    #[serde(default)]
    pub statements: IndexMap<String, StatementDefinition>,
    /// Devices offered by the add-statement dialog, first one preselected.
    #[serde(default)]
    pub device_list: Vec<String>,
}

impl Language {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statement(mut self, id: impl Into<String>, def: StatementDefinition) -> Self {
        self.statements.insert(id.into(), def);
        self
    }

    pub fn with_devices<I: IntoIterator<Item = S>, S: Into<String>>(mut self, devices: I) -> Self {
        self.device_list = devices.into_iter().map(Into::into).collect();
        self
    }

    pub fn get(&self, id: &str) -> Option<&StatementDefinition> {
        self.statements.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StatementDefinition)> {
        self.statements.iter().map(|(id, def)| (id.as_str(), def))
    }

    pub fn default_device(&self) -> Option<&str> {
        self.device_list.first().map(String::as_str)
    }

    pub fn is_private(id: &str) -> bool {
        id.starts_with(PRIVATE_PREFIX)
    }
}
