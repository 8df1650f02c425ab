use crate::language::{Language, StatementDefinition, StatementKind};
use crate::schema::error::{SchemaError, SchemaProblem};

/// Report dangling references and shape mismatches in a language schema.
/// Results carry the offending statement id but no source location.
pub(crate) fn check_language(language: &Language) -> Vec<SchemaError> {
    let mut warnings = Vec::new();

    for (id, def) in language.iter() {
        let mut report = |problem| warnings.push(SchemaError::in_statement(id, problem));

        for (relation, ids) in relations(def) {
            for target in ids.iter().filter(|target| !language.contains(target)) {
                report(SchemaProblem::UnknownReference {
                    relation,
                    target: target.clone(),
                });
            }
        }

        for parent in def.parents.iter().flatten() {
            if language.get(parent).is_some_and(|p| !p.is_compound()) {
                report(SchemaProblem::ParentNotCompound {
                    parent: parent.clone(),
                });
            }
        }

        if def.nested_statements.is_some() && !def.is_compound() {
            report(SchemaProblem::NestedOnNonCompound);
        }

        for (argument, spec) in def.arguments.iter().enumerate() {
            if let (Some(value), Some(options)) = (&spec.value, &spec.options) {
                if !options.contains(value) {
                    report(SchemaProblem::DefaultNotAnOption {
                        argument,
                        value: value.clone(),
                    });
                }
            }
        }

        if def.kind == StatementKind::Device {
            match &def.device_name {
                None => report(SchemaProblem::MissingDeviceName),
                Some(device)
                    if !language.device_list.is_empty()
                        && !language.device_list.contains(device) =>
                {
                    report(SchemaProblem::UnlistedDevice {
                        device: device.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    warnings
}

fn relations(def: &StatementDefinition) -> Vec<(&'static str, &[String])> {
    [
        ("parent", &def.parents),
        ("predecessor", &def.predecessors),
        ("successor", &def.successors),
        ("nested statement", &def.nested_statements),
    ]
    .into_iter()
    .filter_map(|(relation, ids)| ids.as_deref().map(|ids| (relation, ids)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::argument::{ArgumentSpec, ArgumentType, ArgumentValue};

    fn problems(language: &Language) -> Vec<(String, SchemaProblem)> {
        check_language(language)
            .into_iter()
            .map(|w| (w.statement.unwrap_or_default(), w.problem))
            .collect()
    }

    #[test]
    fn reports_unknown_references() {
        let language = Language::new()
            .with_statement("else", StatementDefinition::unit("Else").with_predecessors(["if"]));
        let warnings = check_language(&language);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].is_warning());
        assert_eq!(warnings[0].statement.as_deref(), Some("else"));
        assert_eq!(
            warnings[0].problem,
            SchemaProblem::UnknownReference {
                relation: "predecessor",
                target: "if".into()
            }
        );
    }

    #[test]
    fn reports_shape_mismatches() {
        let language = Language::new()
            .with_devices(["lamp"])
            .with_statement("wait", StatementDefinition::unit("Wait").with_nested_statements(["wait"]))
            .with_statement("inner", StatementDefinition::unit("Inner").with_parents(["wait"]))
            .with_statement("fanOn", StatementDefinition::device("Fan on", "fan"));
        assert_eq!(
            problems(&language),
            vec![
                ("wait".to_string(), SchemaProblem::NestedOnNonCompound),
                (
                    "inner".to_string(),
                    SchemaProblem::ParentNotCompound {
                        parent: "wait".into()
                    }
                ),
                (
                    "fanOn".to_string(),
                    SchemaProblem::UnlistedDevice {
                        device: "fan".into()
                    }
                ),
            ]
        );
    }

    #[test]
    fn default_must_be_an_option() {
        let mut direction = ArgumentSpec::new(ArgumentType::Str)
            .with_default(ArgumentValue::String("up".into()));
        direction.options = Some(vec![
            ArgumentValue::String("left".into()),
            ArgumentValue::String("right".into()),
        ]);
        let language = Language::new().with_statement(
            "turn",
            StatementDefinition::unit("Turn").with_arguments(vec![direction]),
        );
        let warnings = check_language(&language);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].to_string().contains("'up'"));
    }
}
