use thiserror::Error;

use vpl::block::reference::BlockRef;
use vpl::language::argument::ArgumentType;
use vpl::statement::identity::InstanceId;

/// Structural-integrity failures. Rejected gestures are not errors; these
/// mean the caller referred to something that does not exist or does not fit.
#[derive(Debug, Error, PartialEq)]
pub enum EditorError {
    #[error("unknown statement: {0}")]
    UnknownStatement(String),

    #[error("unknown user procedure: {0}")]
    UnknownProcedure(String),

    #[error("user procedure '{0}' cannot be placed inside a procedure body")]
    NestedProcedure(String),

    #[error("no statement with identity {identity} in {block}")]
    UnknownIdentity { identity: InstanceId, block: BlockRef },

    #[error("no block at {0}")]
    UnknownBlock(BlockRef),

    #[error("index {index} out of bounds for block of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("argument index {index} out of bounds for statement '{statement}'")]
    ArgumentOutOfBounds { statement: String, index: usize },

    #[error("type error: argument of type {expected} cannot hold a {got}")]
    ArgumentTypeMismatch { expected: ArgumentType, got: &'static str },
}
