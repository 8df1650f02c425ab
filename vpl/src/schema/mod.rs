pub mod error;
mod validate;

use std::ops::Range;
use std::path::Path;

pub use error::{SchemaError, SchemaProblem};

use crate::language::Language;

/// Source format of a language schema file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Toml,
    Json,
}

impl SchemaFormat {
    /// Pick the format from a file extension (`.toml` or `.json`).
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(SchemaFormat::Toml),
            "json" => Some(SchemaFormat::Json),
            _ => None,
        }
    }
}

/// Loads a language schema from source text.
pub struct SchemaLoader {
    source: String,
    file_id: usize,
    format: SchemaFormat,
}

impl SchemaLoader {
    pub fn new(source: String, file_id: usize, format: SchemaFormat) -> Self {
        SchemaLoader {
            source,
            file_id,
            format,
        }
    }

    /// Deserialize the schema. Structural checks are not run; see [`SchemaLoader::check`].
    pub fn load(&self) -> Result<Language, Vec<SchemaError>> {
        let language = match self.format {
            SchemaFormat::Toml => toml::from_str::<Language>(&self.source).map_err(|e| {
                let span = e.span().unwrap_or(0..0);
                vec![SchemaError::syntax(e.message(), span, self.file_id)]
            })?,
            SchemaFormat::Json => serde_json::from_str::<Language>(&self.source).map_err(|e| {
                let offset = line_column_to_offset(&self.source, e.line(), e.column());
                vec![SchemaError::syntax(e.to_string(), offset..offset, self.file_id)]
            })?,
        };
        tracing::debug!(statements = language.statements.len(), "schema loaded");
        Ok(language)
    }

    /// Check structural references of a loaded schema.
    /// Returns warnings; an empty list means the schema is consistent.
    pub fn check(&self, language: &Language) -> Vec<SchemaError> {
        validate::check_language(language)
            .into_iter()
            .map(|warning| {
                let span = warning.statement.as_deref().map_or(0..0, |id| self.span_of(id));
                warning.located(span, self.file_id)
            })
            .collect()
    }

    /// Load and check in one step. Errors abort; warnings are returned alongside.
    pub fn load_checked(&self) -> Result<(Language, Vec<SchemaError>), Vec<SchemaError>> {
        let language = self.load()?;
        let warnings = self.check(&language);
        Ok((language, warnings))
    }

    /// Best-effort source location of a statement id, for labelling diagnostics.
    fn span_of(&self, id: &str) -> Range<usize> {
        let quoted = format!("\"{}\"", id);
        let dotted = format!("statements.{}", id);
        [dotted.as_str(), quoted.as_str(), id]
            .iter()
            .find_map(|pattern| {
                self.source
                    .find(pattern)
                    .map(|start| start..start + pattern.len())
            })
            .unwrap_or(0..0)
    }
}

/// Convert a 1-based line/column pair to a byte offset in `source`.
fn line_column_to_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::StatementKind;
    use crate::language::argument::{ArgumentType, ArgumentValue};

    const TOML_SCHEMA: &str = r#"
deviceList = ["lamp", "fan"]

[statements.repeat]
label = "Repeat"
type = "compound"
arguments = [{ type = "num", value = 3 }]

[statements.moveForward]
label = "Move forward"

[statements.lampOn]
label = "Lamp on"
type = "device"
deviceName = "lamp"
parents = ["repeat"]
"#;

    #[test]
    fn loads_toml_in_declaration_order() {
        let loader = SchemaLoader::new(TOML_SCHEMA.to_string(), 0, SchemaFormat::Toml);
        let language = loader.load().expect("schema should load");
        let ids: Vec<&str> = language.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["repeat", "moveForward", "lampOn"]);

        let repeat = language.get("repeat").unwrap();
        assert_eq!(repeat.kind, StatementKind::Compound);
        assert_eq!(repeat.arguments[0].ty, ArgumentType::Num);
        assert_eq!(repeat.arguments[0].value, Some(ArgumentValue::Number(3.0)));

        let lamp = language.get("lampOn").unwrap();
        assert_eq!(lamp.device_name.as_deref(), Some("lamp"));
        assert!(lamp.lists_parent("repeat"));
        assert_eq!(language.default_device(), Some("lamp"));
        assert!(loader.check(&language).is_empty());
    }

    #[test]
    fn loads_json() {
        let source = r#"{
  "statements": {
    "if": { "label": "If", "type": "compound", "nestedStatements": ["wait"] },
    "wait": { "label": "Wait", "arguments": [{ "type": "num" }] }
  }
}"#;
        let loader = SchemaLoader::new(source.to_string(), 0, SchemaFormat::Json);
        let language = loader.load().expect("schema should load");
        assert!(language.get("if").unwrap().admits_nested("wait"));
        assert_eq!(language.get("wait").unwrap().kind, StatementKind::Unit);
    }

    #[test]
    fn syntax_errors_carry_a_span() {
        let source = "{\n  \"statements\": {\n    \"if\": { \"label\": 3 }\n  }\n}";
        let loader = SchemaLoader::new(source.to_string(), 7, SchemaFormat::Json);
        let errors = loader.load().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file_id, 7);
        assert!(!errors[0].is_warning());
        assert!(errors[0].span.start > 0);
    }

    #[test]
    fn check_labels_the_offending_statement() {
        let source = "[statements.else]\nlabel = \"Else\"\npredecessors = [\"if\"]\n";
        let loader = SchemaLoader::new(source.to_string(), 3, SchemaFormat::Toml);
        let (_, warnings) = loader.load_checked().expect("schema should load");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].statement.as_deref(), Some("else"));
        assert!(matches!(
            warnings[0].problem,
            SchemaProblem::UnknownReference { relation: "predecessor", .. }
        ));
        assert_eq!(warnings[0].file_id, 3);
        assert_eq!(&source[warnings[0].span.clone()], "statements.else");
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            SchemaFormat::from_path(Path::new("lang.toml")),
            Some(SchemaFormat::Toml)
        );
        assert_eq!(
            SchemaFormat::from_path(Path::new("a/b/lang.json")),
            Some(SchemaFormat::Json)
        );
        assert_eq!(SchemaFormat::from_path(Path::new("lang.yaml")), None);
    }

    #[test]
    fn line_column_offsets() {
        let source = "ab\ncde\nf";
        assert_eq!(line_column_to_offset(source, 1, 1), 0);
        assert_eq!(line_column_to_offset(source, 2, 2), 4);
        assert_eq!(line_column_to_offset(source, 3, 1), 7);
    }
}
