use tracing::debug;

use vpl::Program;
use vpl::block::Block;
use vpl::block::reference::BlockRef;
use vpl::language::Language;
use vpl::language::argument::ArgumentValue;
use vpl::statement::ProgramStatement;
use vpl::statement::identity::InstanceId;

use crate::addable::{AddableContext, AddableStatements, compute_addable_statements};
use crate::error::EditorError;
use crate::event::{EditorEvent, EditorMode, GestureAction, StatementGesture};
use crate::mutation::{self, MoveDirection, ProcedureDefinition};
use crate::selection::{self, ToggleOutcome};

type Subscriber = Box<dyn FnMut(&EditorEvent)>;

/// The active editing session: the single owner of a program being edited.
///
/// Every entry point runs to completion before subscribers are notified.
pub struct EditorSession {
    language: Language,
    program: Program,
    mode: EditorMode,
    subscribers: Vec<Subscriber>,
}

impl EditorSession {
    pub fn new(language: Language) -> Self {
        Self::with_program(language, Program::new())
    }

    pub fn with_program(language: Language, program: Program) -> Self {
        EditorSession {
            language,
            program,
            mode: EditorMode::Normal,
            subscribers: Vec::new(),
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn block(&self, target: &BlockRef) -> Option<&Block> {
        self.program.block(target)
    }

    /// Selected identities in selection order.
    pub fn selection(&self) -> Vec<InstanceId> {
        self.program.skeleton_selection.to_vec()
    }

    pub fn is_selected(&self, identity: InstanceId) -> bool {
        self.program.skeleton_selection.contains(identity)
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    /// Register an observer for program and selection notifications.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&EditorEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// End the session, handing the program back to its owner.
    pub fn into_program(self) -> Program {
        self.program
    }

    fn emit(&mut self, event: EditorEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }
    }

    fn emit_selection(&mut self) {
        let selected = self.selection();
        self.emit(EditorEvent::SelectionChanged { selected });
    }

    /// Switch modes. Leaving skeletonize mode clears the selection.
    pub fn set_mode(&mut self, mode: EditorMode) {
        let previous = std::mem::replace(&mut self.mode, mode);
        debug!(?previous, ?mode, "editor mode changed");
        if previous == EditorMode::Skeletonize && mode == EditorMode::Normal {
            self.clear_selection();
        }
    }

    pub fn insert_statement(
        &mut self,
        target: &BlockRef,
        statement_id: &str,
        argument_values: Option<Vec<ArgumentValue>>,
    ) -> Result<ProgramStatement, EditorError> {
        let statement = mutation::insert_statement(
            &self.language,
            &mut self.program,
            target,
            statement_id,
            argument_values,
        )?;
        self.emit(EditorEvent::ProgramUpdated);
        Ok(statement)
    }

    pub fn remove_statement(
        &mut self,
        target: &BlockRef,
        index: usize,
    ) -> Result<ProgramStatement, EditorError> {
        let removal = mutation::remove_statement(&mut self.program, target, index)?;
        self.emit(EditorEvent::ProgramUpdated);
        if !removal.deselected.is_empty() {
            self.emit_selection();
        }
        Ok(removal.statement)
    }

    /// Returns false, without notifying, when the move hits a block boundary.
    pub fn move_statement(
        &mut self,
        target: &BlockRef,
        index: usize,
        direction: MoveDirection,
    ) -> Result<bool, EditorError> {
        let moved = mutation::move_statement(&mut self.program, target, index, direction)?;
        if moved {
            self.emit(EditorEvent::ProgramUpdated);
        }
        Ok(moved)
    }

    pub fn set_argument(
        &mut self,
        target: &BlockRef,
        index: usize,
        argument: usize,
        value: ArgumentValue,
    ) -> Result<(), EditorError> {
        mutation::set_argument(&mut self.program, target, index, argument, value)?;
        self.emit(EditorEvent::ProgramUpdated);
        Ok(())
    }

    pub fn define_procedure(
        &mut self,
        procedure: &str,
        template: Block,
    ) -> Result<ProcedureDefinition, EditorError> {
        let definition =
            mutation::define_procedure(&self.language, &mut self.program, procedure, template)?;
        self.emit(EditorEvent::ProgramUpdated);
        if !definition.deselected.is_empty() {
            self.emit_selection();
        }
        Ok(definition)
    }

    /// Toggle a statement's selection. Outside skeletonize mode nothing happens.
    ///
    /// `SelectionChanged` is emitted only when identities were added or removed.
    pub fn toggle_selection(
        &mut self,
        target: &BlockRef,
        identity: InstanceId,
        cascade_into_nested: bool,
    ) -> Result<ToggleOutcome, EditorError> {
        self.change_selection(identity, |language, program| {
            selection::toggle_selection(language, program, target, identity, cascade_into_nested)
        })
    }

    /// Select a statement and its dependencies. `Unchanged` if already selected.
    pub fn select_statement(
        &mut self,
        target: &BlockRef,
        identity: InstanceId,
        cascade_into_nested: bool,
    ) -> Result<ToggleOutcome, EditorError> {
        self.change_selection(identity, |language, program| {
            selection::select_statement(language, program, target, identity, cascade_into_nested)
        })
    }

    /// Deselect a statement and its dependents. `Unchanged` if not selected.
    pub fn deselect_statement(
        &mut self,
        target: &BlockRef,
        identity: InstanceId,
        cascade_into_nested: bool,
    ) -> Result<ToggleOutcome, EditorError> {
        self.change_selection(identity, |language, program| {
            selection::deselect_statement(language, program, target, identity, cascade_into_nested)
        })
    }

    fn change_selection(
        &mut self,
        identity: InstanceId,
        change: impl FnOnce(&Language, &mut Program) -> Result<ToggleOutcome, EditorError>,
    ) -> Result<ToggleOutcome, EditorError> {
        if self.mode != EditorMode::Skeletonize {
            debug!(instance = %identity, "selection ignored outside skeletonize mode");
            return Ok(ToggleOutcome::Unchanged);
        }
        let outcome = change(&self.language, &mut self.program)?;
        if outcome.changed() {
            self.emit_selection();
        }
        Ok(outcome)
    }

    /// Empty the selection, notifying only if something was selected.
    pub fn clear_selection(&mut self) {
        if !selection::clear_selection(&mut self.program).is_empty() {
            self.emit_selection();
        }
    }

    /// Dispatch a statement gesture. Returns whether anything changed.
    pub fn handle_gesture(
        &mut self,
        gesture: &StatementGesture,
        action: GestureAction,
    ) -> Result<bool, EditorError> {
        match action {
            GestureAction::Click => self
                .toggle_selection(&gesture.block, gesture.identity, gesture.parent_click)
                .map(|outcome| outcome.changed()),
            GestureAction::Remove => self
                .remove_statement(&gesture.block, gesture.index)
                .map(|_| true),
            GestureAction::MoveUp => {
                self.move_statement(&gesture.block, gesture.index, MoveDirection::Up)
            }
            GestureAction::MoveDown => {
                self.move_statement(&gesture.block, gesture.index, MoveDirection::Down)
            }
        }
    }

    pub fn addable_statements(
        &self,
        context: &AddableContext,
    ) -> Result<AddableStatements<'_>, EditorError> {
        compute_addable_statements(&self.language, context)
    }

    /// Addable statements for inserting into `target`, with the context derived from the block.
    pub fn addable_statements_for(
        &self,
        target: &BlockRef,
        query: &str,
    ) -> Result<AddableStatements<'_>, EditorError> {
        let context = AddableContext::for_block(&self.program, target, query)?;
        compute_addable_statements(&self.language, &context)
    }
}
