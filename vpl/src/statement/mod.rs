pub mod identity;

use crate::block::Block;
use crate::language::argument::Argument;
use crate::statement::identity::InstanceId;

/// A placed occurrence of a statement definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramStatement {
    /// Id of the statement definition in the language schema.
    pub id: String,
    pub identity: InstanceId,
    pub arguments: Vec<Argument>,
    pub body: StatementBody,
}

/// Shape-specific part of a placed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementBody {
    Unit,
    /// Owns its nested block exclusively.
    Compound { block: Block },
    Device { device_name: String },
    /// Invocation of a user procedure, carrying the instantiated copy of its template.
    ProcedureInvocation { procedure: String, body: Block },
}

impl ProgramStatement {
    pub fn new(id: impl Into<String>, arguments: Vec<Argument>, body: StatementBody) -> Self {
        ProgramStatement {
            id: id.into(),
            identity: InstanceId::new(),
            arguments,
            body,
        }
    }

    pub fn unit(id: impl Into<String>) -> Self {
        Self::new(id, Vec::new(), StatementBody::Unit)
    }

    pub fn compound(id: impl Into<String>, block: Block) -> Self {
        Self::new(id, Vec::new(), StatementBody::Compound { block })
    }

    /// The nested block of a compound statement.
    pub fn nested_block(&self) -> Option<&Block> {
        match &self.body {
            StatementBody::Compound { block } => Some(block),
            _ => None,
        }
    }

    pub fn nested_block_mut(&mut self) -> Option<&mut Block> {
        match &mut self.body {
            StatementBody::Compound { block } => Some(block),
            _ => None,
        }
    }

    /// Any block owned by this statement: a compound's nested block or
    /// the body of an instantiated procedure.
    pub fn inner_block(&self) -> Option<&Block> {
        match &self.body {
            StatementBody::Compound { block } => Some(block),
            StatementBody::ProcedureInvocation { body, .. } => Some(body),
            StatementBody::Unit | StatementBody::Device { .. } => None,
        }
    }

    pub fn inner_block_mut(&mut self) -> Option<&mut Block> {
        match &mut self.body {
            StatementBody::Compound { block } => Some(block),
            StatementBody::ProcedureInvocation { body, .. } => Some(body),
            StatementBody::Unit | StatementBody::Device { .. } => None,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.body, StatementBody::Compound { .. })
    }

    /// Name of the invoked user procedure, if this statement is an invocation.
    pub fn invoked_procedure(&self) -> Option<&str> {
        match &self.body {
            StatementBody::ProcedureInvocation { procedure, .. } => Some(procedure),
            _ => None,
        }
    }

    /// Give this statement and everything it owns fresh identities.
    pub fn reassign_identities(&mut self) {
        self.identity = InstanceId::new();
        if let Some(block) = self.inner_block_mut() {
            block.reassign_identities();
        }
    }
}
