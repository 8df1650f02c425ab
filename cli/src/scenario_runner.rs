use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use vpl::block::Block;
use vpl::block::reference::BlockRef;
use vpl::language::Language;
use vpl::language::argument::ArgumentValue;
use vpl::statement::identity::InstanceId;
use vpl_editor::{EditorMode, EditorSession, MoveDirection, ToggleOutcome};

const SCENARIO_SUFFIX: &str = ".scenario.toml";

#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Human-readable scenario description.
    #[serde(default)]
    pub description: Option<String>,

    /// The language schema the session starts with.
    pub schema: Language,

    #[serde(default, rename = "step")]
    pub steps: Vec<StepEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StepEntry {
    #[serde(flatten)]
    pub step: Step,

    /// The step must fail with an error whose message contains this substring.
    #[serde(default)]
    pub expect_error: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Normal,
    Skeletonize,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedToggle {
    Selected,
    Deselected,
    Rejected,
    Unchanged,
}

/// One operation of a scenario. Blocks are written as `root`,
/// `procedure:<id>`, or the alias of a compound statement.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Step {
    Insert {
        statement: String,
        #[serde(default)]
        block: Option<String>,
        #[serde(default)]
        alias: Option<String>,
        #[serde(default)]
        arguments: Option<Vec<toml::Value>>,
    },
    Remove {
        #[serde(default)]
        block: Option<String>,
        index: usize,
    },
    Move {
        #[serde(default)]
        block: Option<String>,
        index: usize,
        direction: Direction,
        #[serde(default)]
        expect_moved: Option<bool>,
    },
    SetArgument {
        #[serde(default)]
        block: Option<String>,
        index: usize,
        argument: usize,
        value: toml::Value,
    },
    DefineProcedure {
        procedure: String,
    },
    Mode {
        mode: Mode,
    },
    Toggle {
        #[serde(default)]
        block: Option<String>,
        target: String,
        #[serde(default)]
        parent_click: bool,
        #[serde(default)]
        expect: Option<ExpectedToggle>,
    },
    Clear,
    ExpectSelected {
        targets: Vec<String>,
    },
    ExpectBlock {
        #[serde(default)]
        block: Option<String>,
        statements: Vec<String>,
    },
    ExpectAddable {
        #[serde(default)]
        block: Option<String>,
        #[serde(default)]
        query: String,
        #[serde(default)]
        device: Option<String>,
        statements: Vec<String>,
    },
    ExpectProcedures {
        count: usize,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Insert { .. } => "insert",
            Step::Remove { .. } => "remove",
            Step::Move { .. } => "move",
            Step::SetArgument { .. } => "set-argument",
            Step::DefineProcedure { .. } => "define-procedure",
            Step::Mode { .. } => "mode",
            Step::Toggle { .. } => "toggle",
            Step::Clear => "clear",
            Step::ExpectSelected { .. } => "expect-selected",
            Step::ExpectBlock { .. } => "expect-block",
            Step::ExpectAddable { .. } => "expect-addable",
            Step::ExpectProcedures { .. } => "expect-procedures",
        }
    }
}

fn toml_to_argument_value(val: &toml::Value) -> ArgumentValue {
    match val {
        toml::Value::Integer(n) => ArgumentValue::Number(*n as f64),
        toml::Value::Float(f) => ArgumentValue::Number(*f),
        toml::Value::Boolean(b) => ArgumentValue::Boolean(*b),
        toml::Value::String(s) => ArgumentValue::String(s.clone()),
        other => ArgumentValue::String(other.to_string()),
    }
}

/// Drives an editor session through the steps of one scenario.
struct ScenarioRun {
    session: EditorSession,
    aliases: HashMap<String, InstanceId>,
}

impl ScenarioRun {
    fn new(schema: Language) -> Self {
        ScenarioRun {
            session: EditorSession::new(schema),
            aliases: HashMap::new(),
        }
    }

    fn identity(&self, alias: &str) -> Result<InstanceId, String> {
        self.aliases
            .get(alias)
            .copied()
            .ok_or_else(|| format!("unknown alias '{}'", alias))
    }

    fn block_ref(&self, block: Option<&str>) -> Result<BlockRef, String> {
        match block {
            None | Some("root") => Ok(BlockRef::Root),
            Some(name) => match name.strip_prefix("procedure:") {
                Some(procedure) => Ok(BlockRef::Procedure(procedure.to_string())),
                None => self.identity(name).map(BlockRef::Nested),
            },
        }
    }

    fn block_ids(&self, target: &BlockRef) -> Result<Vec<String>, String> {
        let block = self
            .session
            .block(target)
            .ok_or_else(|| format!("no block at {}", target))?;
        Ok(block.iter().map(|s| s.id.clone()).collect())
    }

    fn run_step(&mut self, step: &Step) -> Result<(), String> {
        match step {
            Step::Insert {
                statement,
                block,
                alias,
                arguments,
            } => {
                let target = self.block_ref(block.as_deref())?;
                let arguments = arguments
                    .as_ref()
                    .map(|values| values.iter().map(toml_to_argument_value).collect());
                let placed = self
                    .session
                    .insert_statement(&target, statement, arguments)
                    .map_err(|e| e.to_string())?;
                if let Some(alias) = alias {
                    self.aliases.insert(alias.clone(), placed.identity);
                }
            }
            Step::Remove { block, index } => {
                let target = self.block_ref(block.as_deref())?;
                self.session
                    .remove_statement(&target, *index)
                    .map_err(|e| e.to_string())?;
            }
            Step::Move {
                block,
                index,
                direction,
                expect_moved,
            } => {
                let target = self.block_ref(block.as_deref())?;
                let direction = match direction {
                    Direction::Up => MoveDirection::Up,
                    Direction::Down => MoveDirection::Down,
                };
                let moved = self
                    .session
                    .move_statement(&target, *index, direction)
                    .map_err(|e| e.to_string())?;
                if let Some(expected) = expect_moved {
                    if moved != *expected {
                        return Err(format!("expected moved = {}, got {}", expected, moved));
                    }
                }
            }
            Step::SetArgument {
                block,
                index,
                argument,
                value,
            } => {
                let target = self.block_ref(block.as_deref())?;
                self.session
                    .set_argument(&target, *index, *argument, toml_to_argument_value(value))
                    .map_err(|e| e.to_string())?;
            }
            Step::DefineProcedure { procedure } => {
                self.session
                    .define_procedure(procedure, Block::new())
                    .map_err(|e| e.to_string())?;
            }
            Step::Mode { mode } => self.session.set_mode(match mode {
                Mode::Normal => EditorMode::Normal,
                Mode::Skeletonize => EditorMode::Skeletonize,
            }),
            Step::Toggle {
                block,
                target,
                parent_click,
                expect,
            } => {
                let block = self.block_ref(block.as_deref())?;
                let identity = self.identity(target)?;
                let outcome = self
                    .session
                    .toggle_selection(&block, identity, *parent_click)
                    .map_err(|e| e.to_string())?;
                let actual = match outcome {
                    ToggleOutcome::Selected(_) => ExpectedToggle::Selected,
                    ToggleOutcome::Deselected(_) => ExpectedToggle::Deselected,
                    ToggleOutcome::Rejected => ExpectedToggle::Rejected,
                    ToggleOutcome::Unchanged => ExpectedToggle::Unchanged,
                };
                if let Some(expected) = expect {
                    if *expected != actual {
                        return Err(format!(
                            "toggle of '{}': expected {:?}, got {:?}",
                            target, expected, actual
                        ));
                    }
                }
            }
            Step::Clear => self.session.clear_selection(),
            Step::ExpectSelected { targets } => {
                let expected = targets
                    .iter()
                    .map(|alias| self.identity(alias))
                    .collect::<Result<Vec<_>, _>>()?;
                if self.session.selection() != expected.as_slice() {
                    return Err(format!(
                        "selection mismatch\n  expected: {}\n  actual:   {}",
                        targets.join(", "),
                        self.describe_selection()
                    ));
                }
            }
            Step::ExpectBlock { block, statements } => {
                let target = self.block_ref(block.as_deref())?;
                let actual = self.block_ids(&target)?;
                if &actual != statements {
                    return Err(format!(
                        "block {} mismatch\n  expected: {}\n  actual:   {}",
                        target,
                        statements.join(", "),
                        actual.join(", ")
                    ));
                }
            }
            Step::ExpectAddable {
                block,
                query,
                device,
                statements,
            } => {
                let target = self.block_ref(block.as_deref())?;
                let addable = self
                    .session
                    .addable_statements_for(&target, query)
                    .map_err(|e| e.to_string())?;
                let addable = match device {
                    Some(device) => addable.for_device(device),
                    None => addable,
                };
                let actual = addable.ids();
                if actual != *statements {
                    return Err(format!(
                        "addable mismatch\n  expected: {}\n  actual:   {}",
                        statements.join(", "),
                        actual.join(", ")
                    ));
                }
            }
            Step::ExpectProcedures { count } => {
                let actual = self.session.program().initialized_procedures.len();
                if actual != *count {
                    return Err(format!(
                        "expected {} initialized procedure(s), got {}",
                        count, actual
                    ));
                }
            }
        }
        Ok(())
    }

    /// Render the selection with aliases where known.
    fn describe_selection(&self) -> String {
        self.session
            .selection()
            .iter()
            .map(|identity| {
                self.aliases
                    .iter()
                    .find(|(_, id)| *id == identity)
                    .map(|(alias, _)| alias.clone())
                    .unwrap_or_else(|| identity.to_string())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Run every step of a parsed scenario. Returns `Some(reason)` on failure.
fn run_scenario(scenario: Scenario) -> Option<String> {
    let mut run = ScenarioRun::new(scenario.schema);

    for (i, entry) in scenario.steps.iter().enumerate() {
        let result = run.run_step(&entry.step);
        debug!(step = i + 1, op = entry.step.name(), ok = result.is_ok(), "scenario step");
        match (&entry.expect_error, result) {
            (None, Ok(())) => {}
            (None, Err(reason)) => {
                return Some(format!("step {} ({}): {}", i + 1, entry.step.name(), reason));
            }
            (Some(expected), Err(message)) => {
                if !message.contains(expected.as_str()) {
                    return Some(format!(
                        "step {} ({}): expected error containing \"{}\", got: {}",
                        i + 1,
                        entry.step.name(),
                        expected,
                        message
                    ));
                }
            }
            (Some(expected), Ok(())) => {
                return Some(format!(
                    "step {} ({}): expected error containing \"{}\", but the step succeeded",
                    i + 1,
                    entry.step.name(),
                    expected
                ));
            }
        }
    }

    None
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    let scenario: Scenario = match toml::from_str(&content) {
        Ok(s) => s,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("TOML parse error: {}", e)),
            };
        }
    };

    let description = scenario.description.clone();
    let outcome = match run_scenario(scenario) {
        None => TestOutcome::Pass,
        Some(reason) => TestOutcome::Fail(reason),
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Discover scenario files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_scenarios(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_scenarios(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_scenarios(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(SCENARIO_SUFFIX) {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given scenario path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", SCENARIO_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} scenarios)", label, files.len());
    }
}

fn paint(text: &str, code: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }
}

fn label_for(result: &TestResult) -> String {
    result.description.clone().unwrap_or_else(|| {
        result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| s.trim_end_matches(SCENARIO_SUFFIX).to_string())
            .unwrap_or_else(|| "?".to_string())
    })
}

/// Run all scenario files under `path` (or a single file).
/// If `categories` is non-empty, only run scenarios in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let run_categories: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all_categories = discover_categorized(path);
        if all_categories.is_empty() {
            eprintln!("no {} files found in {}", SCENARIO_SUFFIX, path.display());
            return 1;
        }
        if categories.is_empty() {
            all_categories
        } else {
            filter_categories(all_categories, categories)
        }
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        if !path.is_file() {
            let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
            eprintln!();
            eprintln!("{}", paint(header, "1", no_color));
        }

        for file in files {
            let result = run_single_test(file);
            let label = label_for(&result);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            paint("ok", "32", no_color),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failed,
            passed + failed
        );
        1
    }
}

fn filter_categories(
    all_categories: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let matching: Vec<&String> = all_categories
            .keys()
            .filter(|cat| *cat == req || cat.starts_with(&format!("{}/", req)))
            .collect();
        if matching.is_empty() {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all_categories
                    .keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        for cat in matching {
            filtered.insert(cat.clone(), all_categories[cat].clone());
        }
    }
    filtered
}
