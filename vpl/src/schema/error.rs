use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

use crate::language::argument::ArgumentValue;

/// What is wrong with a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaProblem {
    /// The source could not be deserialized.
    Syntax(String),
    /// A relation names a statement id the schema does not define.
    UnknownReference {
        relation: &'static str,
        target: String,
    },
    ParentNotCompound { parent: String },
    NestedOnNonCompound,
    MissingDeviceName,
    UnlistedDevice { device: String },
    DefaultNotAnOption { argument: usize, value: ArgumentValue },
}

impl SchemaProblem {
    /// Syntax problems stop loading; everything else is a warning.
    pub fn severity(&self) -> Severity {
        match self {
            SchemaProblem::Syntax(_) => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

/// A problem found while loading or checking a language schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    pub problem: SchemaProblem,
    /// Id of the offending statement definition.
    pub statement: Option<String>,
    pub span: Range<usize>,
    pub file_id: usize,
}

impl SchemaError {
    pub fn syntax(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        SchemaError {
            problem: SchemaProblem::Syntax(message.into()),
            statement: None,
            span,
            file_id,
        }
    }

    /// A problem with one statement definition, not yet located in a source file.
    pub fn in_statement(statement: impl Into<String>, problem: SchemaProblem) -> Self {
        SchemaError {
            problem,
            statement: Some(statement.into()),
            span: 0..0,
            file_id: 0,
        }
    }

    pub fn located(mut self, span: Range<usize>, file_id: usize) -> Self {
        self.span = span;
        self.file_id = file_id;
        self
    }

    pub fn is_warning(&self) -> bool {
        self.problem.severity() == Severity::Warning
    }

    fn notes(&self) -> Vec<String> {
        match &self.problem {
            SchemaProblem::UnknownReference { target, .. } => {
                vec![format!("'{}' is not defined in this schema", target)]
            }
            SchemaProblem::UnlistedDevice { .. } => {
                vec!["add the device to deviceList to make it selectable".to_string()]
            }
            _ => Vec::new(),
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.problem.severity())
            .with_message(self.to_string())
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes())
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.statement.as_deref().unwrap_or("?");
        match &self.problem {
            SchemaProblem::Syntax(message) => f.write_str(message),
            SchemaProblem::UnknownReference { relation, target } => {
                write!(f, "statement '{}' lists unknown {} '{}'", id, relation, target)
            }
            SchemaProblem::ParentNotCompound { parent } => write!(
                f,
                "statement '{}' lists parent '{}', which is not compound",
                id, parent
            ),
            SchemaProblem::NestedOnNonCompound => write!(
                f,
                "statement '{}' declares nestedStatements but is not compound",
                id
            ),
            SchemaProblem::MissingDeviceName => {
                write!(f, "device statement '{}' has no deviceName", id)
            }
            SchemaProblem::UnlistedDevice { device } => {
                write!(f, "statement '{}' targets unlisted device '{}'", id, device)
            }
            SchemaProblem::DefaultNotAnOption { argument, value } => write!(
                f,
                "default '{}' of argument {} of '{}' is not one of its options",
                value, argument, id
            ),
        }
    }
}

impl std::error::Error for SchemaError {}
