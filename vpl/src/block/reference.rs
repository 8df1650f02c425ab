use std::fmt;

use crate::statement::identity::InstanceId;

/// A stable address of a block inside a program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockRef {
    /// The program's top-level block.
    Root,
    /// The template body of a user procedure.
    Procedure(String),
    /// The nested block of the compound statement with this identity.
    Nested(InstanceId),
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockRef::Root => write!(f, "root"),
            BlockRef::Procedure(name) => write!(f, "procedure:{}", name),
            BlockRef::Nested(owner) => write!(f, "nested:{}", owner),
        }
    }
}
