use std::collections::HashSet;

use tracing::{debug, warn};

use vpl::Program;
use vpl::block::Block;
use vpl::block::reference::BlockRef;
use vpl::language::{Language, StatementDefinition};
use vpl::selection::SkeletonSelection;
use vpl::statement::identity::InstanceId;

use crate::error::EditorError;

/// What a selection request did.
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// Identities added, in the order they were appended.
    Selected(Vec<InstanceId>),
    /// Identities removed.
    Deselected(Vec<InstanceId>),
    /// The target has an unselected dependency earlier in its block.
    Rejected,
    /// Nothing to do.
    Unchanged,
}

impl ToggleOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, ToggleOutcome::Selected(_) | ToggleOutcome::Deselected(_))
    }
}

/// Toggle the selection of `identity`, a statement of block `target`.
///
/// Selecting pulls in every earlier statement the target depends on;
/// deselecting drops every later statement that depends on the target.
/// With `cascade_into_nested`, a compound target takes its whole nested
/// block along.
pub fn toggle_selection(
    language: &Language,
    program: &mut Program,
    target: &BlockRef,
    identity: InstanceId,
    cascade_into_nested: bool,
) -> Result<ToggleOutcome, EditorError> {
    if program.skeleton_selection.contains(identity) {
        deselect_statement(language, program, target, identity, cascade_into_nested)
    } else {
        select_statement(language, program, target, identity, cascade_into_nested)
    }
}

/// Select `identity` and its dependency closure. No-op if already selected.
pub fn select_statement(
    language: &Language,
    program: &mut Program,
    target: &BlockRef,
    identity: InstanceId,
    cascade_into_nested: bool,
) -> Result<ToggleOutcome, EditorError> {
    let (block, index) = locate(program, target, identity)?;
    if program.skeleton_selection.contains(identity) {
        return Ok(ToggleOutcome::Unchanged);
    }
    if !is_selectable(language, block, index, &program.skeleton_selection)? {
        warn!(instance = %identity, block = %target, "selection rejected: unselected dependency");
        return Ok(ToggleOutcome::Rejected);
    }

    let closure = select_closure(language, block, index, cascade_into_nested)?;
    let added: Vec<InstanceId> = closure
        .into_iter()
        .filter(|id| program.skeleton_selection.insert(*id))
        .collect();
    debug!(instance = %identity, added = added.len(), "statement selected");
    Ok(ToggleOutcome::Selected(added))
}

/// Deselect `identity` and everything depending on it. No-op if not selected.
pub fn deselect_statement(
    language: &Language,
    program: &mut Program,
    target: &BlockRef,
    identity: InstanceId,
    cascade_into_nested: bool,
) -> Result<ToggleOutcome, EditorError> {
    let (block, index) = locate(program, target, identity)?;
    if !program.skeleton_selection.contains(identity) {
        return Ok(ToggleOutcome::Unchanged);
    }

    let closure = deselect_closure(language, block, index, cascade_into_nested)?;
    let removed: Vec<InstanceId> = closure
        .into_iter()
        .filter(|id| program.skeleton_selection.remove(*id))
        .collect();
    debug!(instance = %identity, removed = removed.len(), "statement deselected");
    Ok(ToggleOutcome::Deselected(removed))
}

/// Empty the skeleton selection. Returns the identities that were selected.
pub fn clear_selection(program: &mut Program) -> Vec<InstanceId> {
    let cleared = program.skeleton_selection.to_vec();
    program.skeleton_selection.clear();
    if !cleared.is_empty() {
        debug!(cleared = cleared.len(), "selection cleared");
    }
    cleared
}

/// A statement is selectable when every earlier statement of its block named
/// in its `predecessors` or `parents` is already selected.
pub fn is_selectable(
    language: &Language,
    block: &Block,
    index: usize,
    selection: &SkeletonSelection,
) -> Result<bool, EditorError> {
    let statements = block.statements();
    let def = definition(language, &statements[index].id)?;
    Ok(statements[..index]
        .iter()
        .filter(|earlier| def.depends_on(&earlier.id))
        .all(|earlier| selection.contains(earlier.identity)))
}

fn locate<'p>(
    program: &'p Program,
    target: &BlockRef,
    identity: InstanceId,
) -> Result<(&'p Block, usize), EditorError> {
    let block = program
        .block(target)
        .ok_or_else(|| EditorError::UnknownBlock(target.clone()))?;
    let index = block
        .position_of(identity)
        .ok_or_else(|| EditorError::UnknownIdentity {
            identity,
            block: target.clone(),
        })?;
    Ok((block, index))
}

fn definition<'l>(language: &'l Language, id: &str) -> Result<&'l StatementDefinition, EditorError> {
    language
        .get(id)
        .ok_or_else(|| EditorError::UnknownStatement(id.to_string()))
}

/// Identities to select for the statement at `index`, target first, then its
/// dependencies depth-first walking backwards (predecessors before parents).
fn select_closure(
    language: &Language,
    block: &Block,
    index: usize,
    cascade_into_nested: bool,
) -> Result<Vec<InstanceId>, EditorError> {
    let statements = block.statements();
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![index];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let statement = &statements[current];
        order.push(statement.identity);

        let def = definition(language, &statement.id)?;
        let earlier = (0..current).rev();
        let mut dependencies: Vec<usize> = earlier
            .clone()
            .filter(|&i| def.lists_predecessor(&statements[i].id))
            .collect();
        dependencies.extend(earlier.filter(|&i| def.lists_parent(&statements[i].id)));
        stack.extend(dependencies.into_iter().rev());
    }

    if cascade_into_nested {
        if let Some(nested) = statements[index].nested_block() {
            order.extend(nested.identities());
        }
    }
    Ok(order)
}

/// Identities to deselect for the statement at `index`: the target and every
/// later statement tied to it, transitively.
fn deselect_closure(
    language: &Language,
    block: &Block,
    index: usize,
    cascade_into_nested: bool,
) -> Result<Vec<InstanceId>, EditorError> {
    let statements = block.statements();
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![index];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let statement = &statements[current];
        order.push(statement.identity);

        let def = definition(language, &statement.id)?;
        let mut dependents = Vec::new();
        for (later_index, later) in statements.iter().enumerate().skip(current + 1) {
            let later_def = definition(language, &later.id)?;
            if def.lists_successor(&later.id)
                || later_def.depends_on(&statement.id)
                || later_def.lists_successor(&statement.id)
            {
                dependents.push(later_index);
            }
        }
        stack.extend(dependents.into_iter().rev());
    }

    if cascade_into_nested {
        if let Some(nested) = statements[index].nested_block() {
            order.extend(nested.identities());
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpl::statement::ProgramStatement;

    fn language() -> Language {
        Language::new()
            .with_statement("a", StatementDefinition::unit("A"))
            .with_statement("b", StatementDefinition::unit("B").with_predecessors(["a"]))
            .with_statement("c", StatementDefinition::unit("C").with_predecessors(["b"]))
            .with_statement("loop", StatementDefinition::compound("Loop"))
            .with_statement("end", StatementDefinition::unit("End").with_parents(["loop"]))
            .with_statement("open", StatementDefinition::unit("Open").with_successors(["close"]))
            .with_statement("close", StatementDefinition::unit("Close"))
    }

    fn setup(ids: &[&str]) -> (Program, Vec<InstanceId>) {
        let statements: Vec<ProgramStatement> = ids
            .iter()
            .map(|id| {
                if *id == "loop" {
                    let inner = Block::from_statements(vec![
                        ProgramStatement::unit("a"),
                        ProgramStatement::unit("b"),
                    ]);
                    ProgramStatement::compound("loop", inner)
                } else {
                    ProgramStatement::unit(*id)
                }
            })
            .collect();
        let identities = statements.iter().map(|s| s.identity).collect();
        let mut program = Program::new();
        program.block = Block::from_statements(statements);
        (program, identities)
    }

    #[test]
    fn dependent_before_dependency_is_rejected() {
        let lang = language();
        let (mut program, ids) = setup(&["a", "b"]);
        let outcome = toggle_selection(&lang, &mut program, &BlockRef::Root, ids[1], false).unwrap();
        assert_eq!(outcome, ToggleOutcome::Rejected);
        assert!(program.skeleton_selection.is_empty());
    }

    #[test]
    fn select_then_cascade_deselect() {
        let lang = language();
        let (mut program, ids) = setup(&["a", "b"]);
        toggle_selection(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap();
        let outcome = toggle_selection(&lang, &mut program, &BlockRef::Root, ids[1], false).unwrap();
        assert_eq!(outcome, ToggleOutcome::Selected(vec![ids[1]]));
        assert_eq!(program.skeleton_selection.to_vec(), &[ids[0], ids[1]]);

        let outcome = toggle_selection(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap();
        assert_eq!(outcome, ToggleOutcome::Deselected(vec![ids[0], ids[1]]));
        assert!(program.skeleton_selection.is_empty());
    }

    #[test]
    fn deselect_is_transitive() {
        let lang = language();
        let (mut program, ids) = setup(&["a", "b", "c", "a"]);
        for id in &ids {
            toggle_selection(&lang, &mut program, &BlockRef::Root, *id, false).unwrap();
        }
        assert_eq!(program.skeleton_selection.len(), 4);

        toggle_selection(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap();
        assert_eq!(program.skeleton_selection.to_vec(), &[ids[3]]);
    }

    #[test]
    fn successors_of_target_are_deselected() {
        let lang = language();
        let (mut program, ids) = setup(&["open", "close"]);
        toggle_selection(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap();
        toggle_selection(&lang, &mut program, &BlockRef::Root, ids[1], false).unwrap();
        toggle_selection(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap();
        assert!(program.skeleton_selection.is_empty());
    }

    #[test]
    fn select_closure_walks_backwards() {
        let lang = language();
        let (program, _) = setup(&["a", "b", "c"]);
        let order = select_closure(&lang, &program.block, 2, false).unwrap();
        assert_eq!(order, program.block.identities().into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn parents_count_as_dependencies() {
        let lang = language();
        let (mut program, ids) = setup(&["loop", "end"]);
        assert!(!is_selectable(&lang, &program.block, 1, &program.skeleton_selection).unwrap());
        toggle_selection(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap();
        assert!(is_selectable(&lang, &program.block, 1, &program.skeleton_selection).unwrap());
    }

    #[test]
    fn cascade_into_nested_block() {
        let lang = language();
        let (mut program, ids) = setup(&["loop"]);
        let nested = program.block.get(0).unwrap().nested_block().unwrap().identities();

        let outcome = toggle_selection(&lang, &mut program, &BlockRef::Root, ids[0], true).unwrap();
        assert_eq!(outcome, ToggleOutcome::Selected(vec![ids[0], nested[0], nested[1]]));

        let outcome = toggle_selection(&lang, &mut program, &BlockRef::Root, ids[0], true).unwrap();
        assert_eq!(outcome, ToggleOutcome::Deselected(vec![ids[0], nested[0], nested[1]]));
        assert!(program.skeleton_selection.is_empty());
    }

    #[test]
    fn nested_statements_toggle_in_their_own_block() {
        let lang = language();
        let (mut program, ids) = setup(&["loop"]);
        let inner = BlockRef::Nested(ids[0]);
        let nested = program.block(&inner).unwrap().identities();

        assert_eq!(
            toggle_selection(&lang, &mut program, &inner, nested[1], false).unwrap(),
            ToggleOutcome::Rejected
        );
        toggle_selection(&lang, &mut program, &inner, nested[0], false).unwrap();
        toggle_selection(&lang, &mut program, &inner, nested[1], false).unwrap();
        assert_eq!(program.skeleton_selection.to_vec(), &[nested[0], nested[1]]);
    }

    #[test]
    fn select_and_deselect_are_idempotent() {
        let lang = language();
        let (mut program, ids) = setup(&["a"]);
        select_statement(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap();
        assert_eq!(
            select_statement(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap(),
            ToggleOutcome::Unchanged
        );
        deselect_statement(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap();
        assert_eq!(
            deselect_statement(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap(),
            ToggleOutcome::Unchanged
        );
        assert!(program.skeleton_selection.is_empty());
    }

    #[test]
    fn unknown_identity_fails_fast() {
        let lang = language();
        let (mut program, _) = setup(&["a"]);
        let ghost = InstanceId::new();
        assert_eq!(
            toggle_selection(&lang, &mut program, &BlockRef::Root, ghost, false).unwrap_err(),
            EditorError::UnknownIdentity {
                identity: ghost,
                block: BlockRef::Root
            }
        );
    }

    #[test]
    fn clear_returns_previous_selection() {
        let lang = language();
        let (mut program, ids) = setup(&["a", "b"]);
        toggle_selection(&lang, &mut program, &BlockRef::Root, ids[0], false).unwrap();
        assert_eq!(clear_selection(&mut program), vec![ids[0]]);
        assert!(program.skeleton_selection.is_empty());
    }
}
