pub mod block;
pub mod language;
pub mod procedure;
pub mod schema;
pub mod selection;
pub mod statement;

use indexmap::IndexMap;

use crate::block::Block;
use crate::block::reference::BlockRef;
use crate::procedure::InitializedProcedure;
use crate::selection::SkeletonSelection;
use crate::statement::ProgramStatement;
use crate::statement::identity::InstanceId;

/// A visual program being edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    /// The top-level block.
    pub block: Block,
    /// User procedure templates, by procedure id.
    pub user_procedures: IndexMap<String, Block>,
    /// One entry per placed procedure invocation.
    pub initialized_procedures: Vec<InitializedProcedure>,
    pub skeleton_selection: SkeletonSelection,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a block address.
    pub fn block(&self, target: &BlockRef) -> Option<&Block> {
        match target {
            BlockRef::Root => Some(&self.block),
            BlockRef::Procedure(name) => self.user_procedures.get(name),
            BlockRef::Nested(owner) => self.block.find_nested(*owner).or_else(|| {
                self.user_procedures
                    .values()
                    .find_map(|template| template.find_nested(*owner))
            }),
        }
    }

    pub fn block_mut(&mut self, target: &BlockRef) -> Option<&mut Block> {
        match target {
            BlockRef::Root => Some(&mut self.block),
            BlockRef::Procedure(name) => self.user_procedures.get_mut(name),
            BlockRef::Nested(owner) => {
                let in_root = self.block.find_nested(*owner).is_some();
                if in_root {
                    self.block.find_nested_mut(*owner)
                } else {
                    self.user_procedures
                        .values_mut()
                        .find_map(|template| template.find_nested_mut(*owner))
                }
            }
        }
    }

    /// True if the addressed block lives inside a user procedure template.
    pub fn in_procedure_template(&self, target: &BlockRef) -> bool {
        match target {
            BlockRef::Root => false,
            BlockRef::Procedure(_) => true,
            BlockRef::Nested(owner) => {
                self.block.find_statement(*owner).is_none()
                    && self
                        .user_procedures
                        .values()
                        .any(|template| template.find_statement(*owner).is_some())
            }
        }
    }

    /// Find a statement in the program body or any procedure template.
    pub fn statement(&self, identity: InstanceId) -> Option<&ProgramStatement> {
        self.block.find_statement(identity).or_else(|| {
            self.user_procedures
                .values()
                .find_map(|template| template.find_statement(identity))
        })
    }

    pub fn contains_identity(&self, identity: InstanceId) -> bool {
        self.statement(identity).is_some()
    }

    /// Every identity in the program body and the procedure templates, in pre-order.
    pub fn identities(&self) -> Vec<InstanceId> {
        let mut out = self.block.identities();
        for template in self.user_procedures.values() {
            out.extend(template.identities());
        }
        out
    }

    pub fn initialized_procedure(&self, identity: InstanceId) -> Option<&InitializedProcedure> {
        self.initialized_procedures
            .iter()
            .find(|entry| entry.identity == identity)
    }
}
