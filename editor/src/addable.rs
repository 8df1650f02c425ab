use indexmap::IndexMap;

use vpl::Program;
use vpl::block::reference::BlockRef;
use vpl::language::{Language, StatementDefinition};

use crate::error::EditorError;

/// Where a new statement would be inserted, plus the dialog's search text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddableContext {
    /// Id of the compound statement owning the target block, if any.
    pub parent: Option<String>,
    pub inside_procedure_body: bool,
    pub query: String,
}

impl AddableContext {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn nested_in(parent: impl Into<String>) -> Self {
        AddableContext {
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    pub fn in_procedure_body(mut self) -> Self {
        self.inside_procedure_body = true;
        self
    }

    pub fn matching(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Derive the context for inserting into `target`.
    pub fn for_block(
        program: &Program,
        target: &BlockRef,
        query: impl Into<String>,
    ) -> Result<Self, EditorError> {
        let parent = match target {
            BlockRef::Nested(owner) => Some(
                program
                    .statement(*owner)
                    .ok_or_else(|| EditorError::UnknownBlock(target.clone()))?
                    .id
                    .clone(),
            ),
            BlockRef::Root | BlockRef::Procedure(_) => None,
        };
        Ok(AddableContext {
            parent,
            inside_procedure_body: program.in_procedure_template(target),
            query: query.into(),
        })
    }
}

/// Statement definitions insertable in some context, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct AddableStatements<'l> {
    entries: IndexMap<&'l str, &'l StatementDefinition>,
}

impl<'l> AddableStatements<'l> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&'l StatementDefinition> {
        self.entries.get(id).copied()
    }

    pub fn ids(&self) -> Vec<&'l str> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'l str, &'l StatementDefinition)> + '_ {
        self.entries.iter().map(|(id, def)| (*id, *def))
    }

    /// Entries for the "basic statements" tab: everything not bound to a device.
    pub fn basic(&self) -> AddableStatements<'l> {
        self.retain(|def| def.device_name.is_none())
    }

    /// Entries for the "device statements" tab of the given device.
    pub fn for_device(&self, device: &str) -> AddableStatements<'l> {
        self.retain(|def| def.device_name.as_deref() == Some(device))
    }

    fn retain(&self, keep: impl Fn(&StatementDefinition) -> bool) -> AddableStatements<'l> {
        AddableStatements {
            entries: self
                .entries
                .iter()
                .filter(|(_, def)| keep(def))
                .map(|(id, def)| (*id, *def))
                .collect(),
        }
    }
}

/// Compute the statements a user may add in `context`.
///
/// Private ids never qualify, and user procedures are hidden inside procedure
/// bodies. Under a parent, a candidate must list the parent among its
/// `parents` (when it declares any) and pass the parent's `nestedStatements`
/// whitelist (when it declares one). At the root, candidates declaring
/// `parents` are excluded. A non-empty query keeps labels containing it,
/// ignoring case.
pub fn compute_addable_statements<'l>(
    language: &'l Language,
    context: &AddableContext,
) -> Result<AddableStatements<'l>, EditorError> {
    let parent = match &context.parent {
        Some(id) => Some((
            id.as_str(),
            language
                .get(id)
                .ok_or_else(|| EditorError::UnknownStatement(id.clone()))?,
        )),
        None => None,
    };
    let query = context.query.to_lowercase();

    let entries = language
        .iter()
        .filter(|(id, def)| {
            if Language::is_private(id) {
                return false;
            }
            if context.inside_procedure_body && def.is_user_procedure {
                return false;
            }
            match parent {
                Some((parent_id, parent_def)) => {
                    if def.parents.is_some() && !def.lists_parent(parent_id) {
                        return false;
                    }
                    if !parent_def.admits_nested(id) {
                        return false;
                    }
                }
                None => {
                    if def.parents.is_some() {
                        return false;
                    }
                }
            }
            query.is_empty() || def.label.to_lowercase().contains(&query)
        })
        .collect();

    Ok(AddableStatements { entries })
}
