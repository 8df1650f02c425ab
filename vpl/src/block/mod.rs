pub mod reference;

use crate::statement::ProgramStatement;
use crate::statement::identity::InstanceId;

/// An ordered sequence of statements.
/// Order is significant: it encodes predecessor/successor relations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    statements: Vec<ProgramStatement>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_statements(statements: Vec<ProgramStatement>) -> Self {
        Block { statements }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[ProgramStatement] {
        &self.statements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProgramStatement> {
        self.statements.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ProgramStatement> {
        self.statements.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ProgramStatement> {
        self.statements.get_mut(index)
    }

    /// Index of the statement with `identity` in this block (not searching nested blocks).
    pub fn position_of(&self, identity: InstanceId) -> Option<usize> {
        self.statements.iter().position(|s| s.identity == identity)
    }

    pub fn push(&mut self, statement: ProgramStatement) {
        self.statements.push(statement);
    }

    pub fn remove(&mut self, index: usize) -> Option<ProgramStatement> {
        if index < self.statements.len() {
            Some(self.statements.remove(index))
        } else {
            None
        }
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.statements.swap(a, b);
    }

    /// Visit every statement in pre-order, descending into nested blocks and
    /// instantiated procedure bodies.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ProgramStatement)) {
        for statement in &self.statements {
            visit(statement);
            if let Some(inner) = statement.inner_block() {
                inner.walk(visit);
            }
        }
    }

    /// Identities of every statement in this block and below, in pre-order.
    pub fn identities(&self) -> Vec<InstanceId> {
        let mut out = Vec::new();
        self.walk(&mut |s| out.push(s.identity));
        out
    }

    /// Find a statement anywhere in this block or below.
    pub fn find_statement(&self, identity: InstanceId) -> Option<&ProgramStatement> {
        for statement in &self.statements {
            if statement.identity == identity {
                return Some(statement);
            }
            if let Some(found) = statement
                .inner_block()
                .and_then(|inner| inner.find_statement(identity))
            {
                return Some(found);
            }
        }
        None
    }

    /// Find the nested block owned by the compound statement `owner`.
    pub fn find_nested(&self, owner: InstanceId) -> Option<&Block> {
        for statement in &self.statements {
            if statement.identity == owner {
                return statement.nested_block();
            }
            if let Some(found) = statement
                .inner_block()
                .and_then(|inner| inner.find_nested(owner))
            {
                return Some(found);
            }
        }
        None
    }

    pub fn find_nested_mut(&mut self, owner: InstanceId) -> Option<&mut Block> {
        for statement in &mut self.statements {
            if statement.identity == owner {
                return statement.nested_block_mut();
            }
            if let Some(inner) = statement.inner_block_mut() {
                if let Some(found) = inner.find_nested_mut(owner) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn reassign_identities(&mut self) {
        for statement in &mut self.statements {
            statement.reassign_identities();
        }
    }
}
