pub mod addable;
pub mod error;
pub mod event;
pub mod mutation;
pub mod selection;
pub mod session;

pub use addable::{AddableContext, AddableStatements, compute_addable_statements};
pub use error::EditorError;
pub use event::{EditorEvent, EditorMode, GestureAction, StatementGesture};
pub use mutation::{MoveDirection, ProcedureDefinition, Removal};
pub use selection::ToggleOutcome;
pub use session::EditorSession;
