use std::collections::HashSet;

use tracing::debug;

use vpl::Program;
use vpl::block::Block;
use vpl::block::reference::BlockRef;
use vpl::language::argument::{Argument, ArgumentSpec, ArgumentType, ArgumentValue};
use vpl::language::{DEVICE_TYPE_STATEMENT, Language, StatementKind};
use vpl::procedure::{DeviceBinding, InitializedProcedure};
use vpl::statement::identity::InstanceId;
use vpl::statement::{ProgramStatement, StatementBody};

use crate::error::EditorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Result of removing a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub statement: ProgramStatement,
    /// Identities dropped from the skeleton selection along with the statement.
    pub deselected: Vec<InstanceId>,
}

/// Create a statement with a fresh identity and append it to `target`.
///
/// Supplied `argument_values` are typed by the definition's argument specs;
/// missing trailing values take the schema defaults. Without them every
/// argument takes its schema default.
/// Inserting a user procedure instantiates its template and registers an
/// `initialized_procedures` entry keyed by the new statement's identity.
pub fn insert_statement(
    language: &Language,
    program: &mut Program,
    target: &BlockRef,
    statement_id: &str,
    argument_values: Option<Vec<ArgumentValue>>,
) -> Result<ProgramStatement, EditorError> {
    let def = language
        .get(statement_id)
        .ok_or_else(|| EditorError::UnknownStatement(statement_id.to_string()))?;
    if program.block(target).is_none() {
        return Err(EditorError::UnknownBlock(target.clone()));
    }

    let arguments = match argument_values {
        Some(values) => typed_arguments(statement_id, &def.arguments, values)?,
        None => def.arguments.iter().map(ArgumentSpec::instantiate).collect(),
    };

    let body = if def.is_user_procedure {
        if program.in_procedure_template(target) {
            return Err(EditorError::NestedProcedure(statement_id.to_string()));
        }
        StatementBody::ProcedureInvocation {
            procedure: statement_id.to_string(),
            body: instantiate_procedure(program, statement_id)?,
        }
    } else {
        match def.kind {
            StatementKind::Unit => StatementBody::Unit,
            StatementKind::Compound => StatementBody::Compound { block: Block::new() },
            StatementKind::Device => StatementBody::Device {
                device_name: def.device_name.clone().unwrap_or_default(),
            },
        }
    };

    let statement = ProgramStatement::new(statement_id, arguments, body);
    let registration = match &statement.body {
        StatementBody::ProcedureInvocation { procedure, body } => Some(InitializedProcedure {
            identity: statement.identity,
            procedure: procedure.clone(),
            devices: collect_devices(body),
        }),
        _ => None,
    };

    program
        .block_mut(target)
        .ok_or_else(|| EditorError::UnknownBlock(target.clone()))?
        .push(statement.clone());

    if let Some(entry) = registration {
        debug!(
            procedure = %entry.procedure,
            instance = %entry.identity,
            devices = entry.devices.len(),
            "procedure initialized"
        );
        program.initialized_procedures.push(entry);
    }

    debug!(statement = statement_id, instance = %statement.identity, block = %target, "statement inserted");
    Ok(statement)
}

fn typed_arguments(
    statement_id: &str,
    specs: &[ArgumentSpec],
    values: Vec<ArgumentValue>,
) -> Result<Vec<Argument>, EditorError> {
    if values.len() > specs.len() {
        return Err(EditorError::ArgumentOutOfBounds {
            statement: statement_id.to_string(),
            index: specs.len(),
        });
    }
    let mut values = values.into_iter();
    specs
        .iter()
        .map(|spec| match values.next() {
            Some(value) if value.fits(spec.ty) => Ok(Argument::new(spec.ty, value)),
            Some(value) => Err(EditorError::ArgumentTypeMismatch {
                expected: spec.ty,
                got: value.kind_name(),
            }),
            None => Ok(spec.instantiate()),
        })
        .collect()
}

/// Copy a procedure template, giving every statement in the copy a new identity.
fn instantiate_procedure(program: &Program, procedure: &str) -> Result<Block, EditorError> {
    let mut body = program
        .user_procedures
        .get(procedure)
        .cloned()
        .ok_or_else(|| EditorError::UnknownProcedure(procedure.to_string()))?;
    body.reassign_identities();
    Ok(body)
}

/// Values bound by the statements of an instantiated procedure body, in pre-order.
///
/// Device-type selectors bind their device argument; any other statement
/// with arguments binds its first argument.
pub fn collect_devices(body: &Block) -> Vec<DeviceBinding> {
    let mut devices = Vec::new();
    body.walk(&mut |statement| {
        let bound = if statement.id == DEVICE_TYPE_STATEMENT {
            statement
                .arguments
                .iter()
                .find(|arg| arg.ty == ArgumentType::Device)
                .or_else(|| statement.arguments.first())
        } else {
            statement.arguments.first()
        };
        if let Some(arg) = bound {
            devices.push(DeviceBinding {
                statement: statement.identity,
                value: arg.value.clone(),
            });
        }
    });
    devices
}

/// Delete the statement at `index` of `target`.
///
/// Procedure bookkeeping for the statement and anything nested in it is
/// dropped by identity, and the removed identities leave the skeleton selection.
pub fn remove_statement(
    program: &mut Program,
    target: &BlockRef,
    index: usize,
) -> Result<Removal, EditorError> {
    let block = program
        .block_mut(target)
        .ok_or_else(|| EditorError::UnknownBlock(target.clone()))?;
    let len = block.len();
    let statement = block
        .remove(index)
        .ok_or(EditorError::IndexOutOfBounds { index, len })?;

    let mut removed: HashSet<InstanceId> = HashSet::from([statement.identity]);
    if let Some(inner) = statement.inner_block() {
        removed.extend(inner.identities());
    }

    program
        .initialized_procedures
        .retain(|entry| !removed.contains(&entry.identity));

    let deselected = program
        .skeleton_selection
        .remove_where(|identity| removed.contains(&identity));

    debug!(
        statement = %statement.id,
        instance = %statement.identity,
        block = %target,
        index,
        "statement removed"
    );
    Ok(Removal {
        statement,
        deselected,
    })
}

/// Swap the statement at `index` with its neighbour. Returns false at a block boundary.
///
/// Predecessor/successor constraints are not re-validated.
pub fn move_statement(
    program: &mut Program,
    target: &BlockRef,
    index: usize,
    direction: MoveDirection,
) -> Result<bool, EditorError> {
    let block = program
        .block_mut(target)
        .ok_or_else(|| EditorError::UnknownBlock(target.clone()))?;
    let len = block.len();
    if index >= len {
        return Err(EditorError::IndexOutOfBounds { index, len });
    }

    let neighbour = match direction {
        MoveDirection::Up if index > 0 => index - 1,
        MoveDirection::Down if index + 1 < len => index + 1,
        _ => return Ok(false),
    };
    block.swap(index, neighbour);
    debug!(block = %target, from = index, to = neighbour, "statement moved");
    Ok(true)
}

/// Replace the value of one argument of the statement at `index`.
pub fn set_argument(
    program: &mut Program,
    target: &BlockRef,
    index: usize,
    argument: usize,
    value: ArgumentValue,
) -> Result<(), EditorError> {
    let block = program
        .block_mut(target)
        .ok_or_else(|| EditorError::UnknownBlock(target.clone()))?;
    let len = block.len();
    let statement = block
        .get_mut(index)
        .ok_or(EditorError::IndexOutOfBounds { index, len })?;

    if argument >= statement.arguments.len() {
        return Err(EditorError::ArgumentOutOfBounds {
            statement: statement.id.clone(),
            index: argument,
        });
    }
    let slot = &mut statement.arguments[argument];
    if !value.fits(slot.ty) {
        return Err(EditorError::ArgumentTypeMismatch {
            expected: slot.ty,
            got: value.kind_name(),
        });
    }
    slot.value = value;
    Ok(())
}

/// Result of registering a procedure template.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDefinition {
    /// The template that was replaced, if any.
    pub previous: Option<Block>,
    /// Identities of the replaced template dropped from the skeleton selection.
    pub deselected: Vec<InstanceId>,
}

/// Register or replace the template of a user procedure declared in the schema.
///
/// The template gets fresh identities. Templates may not contain procedure
/// invocations. Identities of a replaced template leave the skeleton selection.
pub fn define_procedure(
    language: &Language,
    program: &mut Program,
    procedure: &str,
    mut template: Block,
) -> Result<ProcedureDefinition, EditorError> {
    match language.get(procedure) {
        Some(def) if def.is_user_procedure => {}
        _ => return Err(EditorError::UnknownProcedure(procedure.to_string())),
    }
    let mut invoked: Option<String> = None;
    template.walk(&mut |statement| {
        if invoked.is_none() {
            invoked = statement.invoked_procedure().map(str::to_string);
        }
    });
    if let Some(invoked) = invoked {
        return Err(EditorError::NestedProcedure(invoked));
    }
    template.reassign_identities();

    debug!(procedure, statements = template.len(), "procedure defined");
    let previous = program
        .user_procedures
        .insert(procedure.to_string(), template);
    let deselected = match &previous {
        Some(old) => {
            let replaced: HashSet<InstanceId> = old.identities().into_iter().collect();
            program
                .skeleton_selection
                .remove_where(|identity| replaced.contains(&identity))
        }
        None => Vec::new(),
    };
    Ok(ProcedureDefinition {
        previous,
        deselected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpl::language::StatementDefinition;

    fn language() -> Language {
        Language::new()
            .with_statement("moveForward", StatementDefinition::unit("Move forward"))
            .with_statement(
                "wait",
                StatementDefinition::unit("Wait").with_arguments(vec![
                    ArgumentSpec::new(ArgumentType::Num).with_default(ArgumentValue::Number(1.0)),
                ]),
            )
            .with_statement("repeat", StatementDefinition::compound("Repeat"))
            .with_statement("lampOn", StatementDefinition::device("Lamp on", "lamp"))
            .with_statement(
                DEVICE_TYPE_STATEMENT,
                StatementDefinition::unit("Device type").with_arguments(vec![
                    ArgumentSpec::new(ArgumentType::Str),
                    ArgumentSpec::new(ArgumentType::Device),
                ]),
            )
            .with_statement("blink", StatementDefinition::user_procedure("Blink"))
    }

    #[test]
    fn insert_appends_with_schema_defaults() {
        let lang = language();
        let mut program = Program::new();
        insert_statement(&lang, &mut program, &BlockRef::Root, "moveForward", None).unwrap();
        let wait = insert_statement(&lang, &mut program, &BlockRef::Root, "wait", None).unwrap();
        assert_eq!(program.block.len(), 2);
        assert_eq!(program.block.get(1).map(|s| s.identity), Some(wait.identity));
        assert_eq!(wait.arguments[0].value, ArgumentValue::Number(1.0));
    }

    #[test]
    fn insert_shapes_body_from_kind() {
        let lang = language();
        let mut program = Program::new();
        let repeat = insert_statement(&lang, &mut program, &BlockRef::Root, "repeat", None).unwrap();
        assert!(repeat.is_compound());
        let lamp = insert_statement(
            &lang,
            &mut program,
            &BlockRef::Nested(repeat.identity),
            "lampOn",
            None,
        )
        .unwrap();
        assert_eq!(
            lamp.body,
            StatementBody::Device {
                device_name: "lamp".into()
            }
        );
        assert_eq!(program.block.get(0).and_then(|s| s.nested_block()).map(Block::len), Some(1));
    }

    #[test]
    fn insert_rejects_unknown_ids() {
        let lang = language();
        let mut program = Program::new();
        assert_eq!(
            insert_statement(&lang, &mut program, &BlockRef::Root, "fly", None).unwrap_err(),
            EditorError::UnknownStatement("fly".into())
        );
        assert_eq!(
            insert_statement(&lang, &mut program, &BlockRef::Root, "blink", None).unwrap_err(),
            EditorError::UnknownProcedure("blink".into())
        );
        let ghost = BlockRef::Nested(InstanceId::new());
        assert_eq!(
            insert_statement(&lang, &mut program, &ghost, "wait", None).unwrap_err(),
            EditorError::UnknownBlock(ghost)
        );
        assert!(program.block.is_empty());
    }

    #[test]
    fn procedure_instantiation_collects_devices() {
        let lang = language();
        let mut program = Program::new();
        define_procedure(&lang, &mut program, "blink", Block::new()).unwrap();
        let body = BlockRef::Procedure("blink".into());
        let selector =
            insert_statement(&lang, &mut program, &body, DEVICE_TYPE_STATEMENT, None).unwrap();
        set_argument(
            &mut program,
            &body,
            0,
            1,
            ArgumentValue::String("lamp".into()),
        )
        .unwrap();
        insert_statement(&lang, &mut program, &body, "moveForward", None).unwrap();
        insert_statement(&lang, &mut program, &body, "wait", None).unwrap();

        let call = insert_statement(&lang, &mut program, &BlockRef::Root, "blink", None).unwrap();
        let entry = program.initialized_procedure(call.identity).expect("registered");
        assert_eq!(entry.procedure, "blink");
        assert_eq!(entry.devices.len(), 2);
        assert_eq!(entry.devices[0].value, ArgumentValue::String("lamp".into()));
        assert_eq!(entry.devices[1].value, ArgumentValue::Number(1.0));

        let copy = call.inner_block().unwrap();
        assert_eq!(copy.len(), 3);
        assert_ne!(copy.get(0).unwrap().identity, selector.identity);
        assert_eq!(entry.devices[0].statement, copy.get(0).unwrap().identity);
    }

    #[test]
    fn procedures_cannot_nest_in_procedure_bodies() {
        let lang = language();
        let mut program = Program::new();
        define_procedure(&lang, &mut program, "blink", Block::new()).unwrap();
        let err = insert_statement(
            &lang,
            &mut program,
            &BlockRef::Procedure("blink".into()),
            "blink",
            None,
        )
        .unwrap_err();
        assert_eq!(err, EditorError::NestedProcedure("blink".into()));
    }

    #[test]
    fn remove_drops_procedure_entry_by_identity() {
        let lang = language();
        let mut program = Program::new();
        define_procedure(&lang, &mut program, "blink", Block::new()).unwrap();
        let first = insert_statement(&lang, &mut program, &BlockRef::Root, "blink", None).unwrap();
        let second = insert_statement(&lang, &mut program, &BlockRef::Root, "blink", None).unwrap();
        program.initialized_procedures.reverse();

        let removal = remove_statement(&mut program, &BlockRef::Root, 0).unwrap();
        assert_eq!(removal.statement.identity, first.identity);
        assert_eq!(program.initialized_procedures.len(), 1);
        assert_eq!(program.initialized_procedures[0].identity, second.identity);
    }

    #[test]
    fn remove_cleans_selection_of_whole_subtree() {
        let lang = language();
        let mut program = Program::new();
        let repeat = insert_statement(&lang, &mut program, &BlockRef::Root, "repeat", None).unwrap();
        let inner = insert_statement(
            &lang,
            &mut program,
            &BlockRef::Nested(repeat.identity),
            "wait",
            None,
        )
        .unwrap();
        let other = insert_statement(&lang, &mut program, &BlockRef::Root, "wait", None).unwrap();
        program.skeleton_selection.insert(inner.identity);
        program.skeleton_selection.insert(other.identity);
        program.skeleton_selection.insert(repeat.identity);

        let removal = remove_statement(&mut program, &BlockRef::Root, 0).unwrap();
        assert_eq!(removal.deselected, vec![inner.identity, repeat.identity]);
        assert_eq!(program.skeleton_selection.to_vec(), &[other.identity]);
    }

    #[test]
    fn remove_out_of_bounds_is_an_error() {
        let mut program = Program::new();
        assert_eq!(
            remove_statement(&mut program, &BlockRef::Root, 0).unwrap_err(),
            EditorError::IndexOutOfBounds { index: 0, len: 0 }
        );
    }

    #[test]
    fn move_swaps_and_stops_at_boundaries() {
        let lang = language();
        let mut program = Program::new();
        let ids: Vec<InstanceId> = ["moveForward", "wait", "repeat"]
            .iter()
            .map(|id| {
                insert_statement(&lang, &mut program, &BlockRef::Root, id, None)
                    .unwrap()
                    .identity
            })
            .collect();

        assert!(!move_statement(&mut program, &BlockRef::Root, 0, MoveDirection::Up).unwrap());
        assert!(!move_statement(&mut program, &BlockRef::Root, 2, MoveDirection::Down).unwrap());
        assert_eq!(program.block.identities(), ids);

        assert!(move_statement(&mut program, &BlockRef::Root, 0, MoveDirection::Down).unwrap());
        assert_eq!(program.block.identities(), vec![ids[1], ids[0], ids[2]]);
        assert!(move_statement(&mut program, &BlockRef::Root, 2, MoveDirection::Up).unwrap());
        assert_eq!(program.block.identities(), vec![ids[1], ids[2], ids[0]]);
    }

    #[test]
    fn set_argument_checks_type_and_bounds() {
        let lang = language();
        let mut program = Program::new();
        insert_statement(&lang, &mut program, &BlockRef::Root, "wait", None).unwrap();

        set_argument(&mut program, &BlockRef::Root, 0, 0, ArgumentValue::Number(4.0)).unwrap();
        assert_eq!(
            program.block.get(0).unwrap().arguments[0].value,
            ArgumentValue::Number(4.0)
        );
        assert_eq!(
            set_argument(&mut program, &BlockRef::Root, 0, 0, ArgumentValue::Boolean(true))
                .unwrap_err(),
            EditorError::ArgumentTypeMismatch {
                expected: ArgumentType::Num,
                got: "boolean"
            }
        );
        assert!(matches!(
            set_argument(&mut program, &BlockRef::Root, 0, 3, ArgumentValue::Number(1.0)),
            Err(EditorError::ArgumentOutOfBounds { index: 3, .. })
        ));
    }

    #[test]
    fn define_procedure_requires_procedure_definition() {
        let lang = language();
        let mut program = Program::new();
        assert_eq!(
            define_procedure(&lang, &mut program, "wait", Block::new()).unwrap_err(),
            EditorError::UnknownProcedure("wait".into())
        );
        assert!(define_procedure(&lang, &mut program, "blink", Block::new())
            .unwrap()
            .previous
            .is_none());
    }

    #[test]
    fn redefining_a_procedure_prunes_its_selection() {
        let lang = language();
        let mut program = Program::new();
        define_procedure(&lang, &mut program, "blink", Block::new()).unwrap();
        let body = BlockRef::Procedure("blink".into());
        let inner = insert_statement(&lang, &mut program, &body, "moveForward", None).unwrap();
        let outer = insert_statement(&lang, &mut program, &BlockRef::Root, "wait", None).unwrap();
        program.skeleton_selection.insert(inner.identity);
        program.skeleton_selection.insert(outer.identity);

        let definition = define_procedure(&lang, &mut program, "blink", Block::new()).unwrap();
        assert_eq!(definition.deselected, vec![inner.identity]);
        assert_eq!(definition.previous.map(|b| b.len()), Some(1));
        assert_eq!(program.skeleton_selection.to_vec(), &[outer.identity]);
    }

    #[test]
    fn templates_get_fresh_identities() {
        let lang = language();
        let mut program = Program::new();
        insert_statement(&lang, &mut program, &BlockRef::Root, "repeat", None).unwrap();
        insert_statement(&lang, &mut program, &BlockRef::Root, "wait", None).unwrap();

        let copied = program.block.clone();
        define_procedure(&lang, &mut program, "blink", copied).unwrap();
        let identities = program.identities();
        let unique: HashSet<_> = identities.iter().collect();
        assert_eq!(identities.len(), 4);
        assert_eq!(unique.len(), identities.len());
    }

    #[test]
    fn templates_cannot_hold_invocations() {
        let lang = language();
        let mut program = Program::new();
        define_procedure(&lang, &mut program, "blink", Block::new()).unwrap();
        let call = insert_statement(&lang, &mut program, &BlockRef::Root, "blink", None).unwrap();
        let repeat = ProgramStatement::compound("repeat", Block::from_statements(vec![call]));

        assert_eq!(
            define_procedure(&lang, &mut program, "blink", Block::from_statements(vec![repeat]))
                .unwrap_err(),
            EditorError::NestedProcedure("blink".into())
        );
        assert!(program.user_procedures["blink"].is_empty());
    }

    #[test]
    fn supplied_arguments_are_typed_by_the_schema() {
        let lang = language();
        let mut program = Program::new();
        let wait = insert_statement(
            &lang,
            &mut program,
            &BlockRef::Root,
            "wait",
            Some(vec![ArgumentValue::Number(2.0)]),
        )
        .unwrap();
        assert_eq!(
            wait.arguments,
            vec![Argument::new(ArgumentType::Num, ArgumentValue::Number(2.0))]
        );

        assert_eq!(
            insert_statement(
                &lang,
                &mut program,
                &BlockRef::Root,
                "wait",
                Some(vec![ArgumentValue::String("x".into())]),
            )
            .unwrap_err(),
            EditorError::ArgumentTypeMismatch {
                expected: ArgumentType::Num,
                got: "string"
            }
        );
        assert_eq!(
            insert_statement(
                &lang,
                &mut program,
                &BlockRef::Root,
                "wait",
                Some(vec![ArgumentValue::Number(1.0), ArgumentValue::Number(1.0)]),
            )
            .unwrap_err(),
            EditorError::ArgumentOutOfBounds {
                statement: "wait".into(),
                index: 1
            }
        );

        let selector = insert_statement(
            &lang,
            &mut program,
            &BlockRef::Root,
            DEVICE_TYPE_STATEMENT,
            Some(vec![ArgumentValue::String("lamp".into())]),
        )
        .unwrap();
        assert_eq!(selector.arguments[0].ty, ArgumentType::Str);
        assert_eq!(selector.arguments[1].ty, ArgumentType::Device);
        assert_eq!(program.block.len(), 2);
    }
}
