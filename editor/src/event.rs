use vpl::block::reference::BlockRef;
use vpl::statement::identity::InstanceId;

/// Notification delivered to session subscribers after an operation completes.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ProgramUpdated,
    SelectionChanged { selected: Vec<InstanceId> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditorMode {
    #[default]
    Normal,
    /// Statement clicks toggle the skeleton selection.
    Skeletonize,
}

/// A user gesture on a placed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementGesture {
    pub block: BlockRef,
    pub index: usize,
    pub identity: InstanceId,
    /// The gesture hit the statement's container rather than a nested element.
    pub parent_click: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    Click,
    Remove,
    MoveUp,
    MoveDown,
}
