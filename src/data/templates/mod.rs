// ============================================================
// Layer 4 — Prompt Templates and Tasks
// ============================================================
// A task is a family of text templates that need the same
// fields from an example. Rendering an example:
//
//   1. check the task's required fields are present
//   2. pick one template (uniformly, or the forced one)
//   3. pick a separator for multi-item history (" , " or " ; ")
//   4. substitute {user_id}, {history}, {categories}, {target}
//
// Each task's template table is a `&'static` slice and is never
// mutated. Forcing a template stores the chosen id on the
// TaskInstance, so re-forcing always validates against the full
// table.
//
// Tasks are looked up by name through an explicit registry
// (case-insensitive), which lets configuration pick tasks by
// string.

pub mod tasks;

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::error::RecError;
use crate::domain::example::{PromptArgs, PromptField};
use crate::domain::prompt::PromptTarget;

use tasks::{PersonalizedSequentialTask, SequentialSideInfoTask, SequentialTask};

/// Separators used to join multi-item history into one string.
pub const SEPARATORS: [&str; 2] = [" , ", " ; "];

/// One (input, target) template pair with a stable id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id:     usize,
    pub input:  &'static str,
    pub target: &'static str,
}

/// Behaviour shared by every task variant.
pub trait Task: Send + Sync + fmt::Debug {
    /// Registry name, also used in error messages.
    fn name(&self) -> &'static str;

    /// The canonical template table.
    fn templates(&self) -> &'static [Template];

    /// Fields `render` refuses to work without.
    fn required_fields(&self) -> &'static [PromptField];

    /// Placeholder values for one render. Only called once the
    /// required fields have been validated.
    fn placeholders(&self, args: &PromptArgs, separator: &str) -> Vec<(&'static str, String)>;
}

/// A task plus an optional forced template.
#[derive(Debug)]
pub struct TaskInstance {
    task:   Box<dyn Task>,
    forced: Option<usize>,
}

impl TaskInstance {
    pub fn new(task: Box<dyn Task>) -> Self {
        Self { task, forced: None }
    }

    pub fn name(&self) -> &'static str {
        self.task.name()
    }

    pub fn forced_template(&self) -> Option<usize> {
        self.forced
    }

    /// Pin every future render to template `id`.
    ///
    /// # Errors
    /// `UnknownTemplate` listing the valid ids.
    pub fn force_template(mut self, id: usize) -> Result<Self, RecError> {
        let all = self.task.templates();
        if !all.iter().any(|t| t.id == id) {
            return Err(RecError::UnknownTemplate {
                id,
                task:      self.task.name(),
                available: all.iter().map(|t| t.id).collect(),
            });
        }
        self.forced = Some(id);
        Ok(self)
    }

    /// Templates a render can currently pick from.
    pub fn active_templates(&self) -> Vec<&'static Template> {
        self.task
            .templates()
            .iter()
            .filter(|t| self.forced.map_or(true, |id| t.id == id))
            .collect()
    }

    /// All templates of the task, regardless of forcing.
    pub fn all_templates(&self) -> &'static [Template] {
        self.task.templates()
    }

    /// Fail with the first required field `args` lacks.
    pub fn validate(&self, args: &PromptArgs) -> Result<(), RecError> {
        match self.task.required_fields().iter().find(|f| !args.has(**f)) {
            Some(field) => Err(RecError::MissingArgument {
                field: field.name(),
                task:  self.task.name(),
            }),
            None => Ok(()),
        }
    }

    /// Render `args` through a randomly chosen template.
    pub fn render<R: Rng + ?Sized>(&self, args: &PromptArgs, rng: &mut R) -> Result<PromptTarget, RecError> {
        self.validate(args)?;

        let active = self.active_templates();
        let template = if self.forced.is_some() {
            active.first().copied()
        } else {
            active.choose(rng).copied()
        };
        let Some(template) = template else {
            return Err(RecError::UnknownTemplate {
                id:        self.forced.unwrap_or_default(),
                task:      self.task.name(),
                available: self.task.templates().iter().map(|t| t.id).collect(),
            });
        };

        let separator = SEPARATORS.choose(rng).copied().unwrap_or(SEPARATORS[0]);
        let values = self.task.placeholders(args, separator);

        Ok(PromptTarget::new(
            fill(template.input, &values),
            fill(template.target, &values),
        ))
    }
}

impl fmt::Display for TaskInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.task.name())
    }
}

/// Replace every `{name}` in `pattern` with its value.
///
/// One left-to-right pass: inserted values are never scanned again,
/// so metadata containing `{target}` stays literal. Unknown names
/// are copied unchanged.
pub fn fill(pattern: &str, values: &[(&'static str, String)]) -> String {
    let mut out  = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let found = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, value)| (value, close))
        });
        match found {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// ─── Registry ─────────────────────────────────────────────────────────────────

type TaskFactory = fn() -> Box<dyn Task>;

fn sequential() -> Box<dyn Task> {
    Box::new(SequentialTask)
}

fn sequential_side_info() -> Box<dyn Task> {
    Box::new(SequentialSideInfoTask)
}

fn personalized_sequential() -> Box<dyn Task> {
    Box::new(PersonalizedSequentialTask)
}

const REGISTRY: &[(&str, TaskFactory)] = &[
    ("SequentialTask", sequential as TaskFactory),
    ("SequentialSideInfoTask", sequential_side_info as TaskFactory),
    ("PersonalizedSequentialTask", personalized_sequential as TaskFactory),
];

/// Name → constructor lookup for task variants.
pub struct TaskRegistry;

impl TaskRegistry {
    pub fn names() -> Vec<&'static str> {
        REGISTRY.iter().map(|(name, _)| *name).collect()
    }

    /// Instantiate a task from its alias, ignoring case.
    pub fn create(alias: &str) -> Result<TaskInstance, RecError> {
        REGISTRY
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(alias.trim()))
            .map(|(_, factory)| TaskInstance::new(factory()))
            .ok_or_else(|| RecError::UnknownTask {
                alias:     alias.to_string(),
                available: Self::names(),
            })
    }

    /// Instantiate several tasks at once; fails on the first bad alias.
    pub fn create_all<S: AsRef<str>>(aliases: &[S]) -> Result<Vec<TaskInstance>, RecError> {
        aliases.iter().map(|a| Self::create(a.as_ref())).collect()
    }
}

// ─── TaskSet ──────────────────────────────────────────────────────────────────

/// The tasks a training run renders every sampled example with.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: Vec<TaskInstance>,
}

impl TaskSet {
    pub fn from_aliases<S: AsRef<str>>(aliases: &[S]) -> Result<Self, RecError> {
        Ok(Self { tasks: TaskRegistry::create_all(aliases)? })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskInstance> {
        self.tasks.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(TaskInstance::name).collect()
    }

    /// One rendering of `args` per task, in task order.
    pub fn render_all<R: Rng + ?Sized>(&self, args: &PromptArgs, rng: &mut R) -> Result<Vec<PromptTarget>, RecError> {
        self.tasks.iter().map(|t| t.render(args, rng)).collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn args() -> PromptArgs {
        PromptArgs {
            user_id:              Some("user_7".into()),
            input_item_seq:       Some(vec!["item_1".into(), "item_2".into(), "item_3".into()]),
            input_title_seq:      Some(vec!["Lego".into(), "Ball".into(), "Doll".into()]),
            input_categories_seq: Some(vec![vec!["Toys".into()], vec!["Toys".into(), "Sport".into()], vec![]]),
            target_item:          Some("item_4".into()),
        }
    }

    #[test]
    fn test_registry_is_case_insensitive() {
        assert_eq!(TaskRegistry::create("sequentialtask").unwrap().name(), "SequentialTask");
        assert_eq!(TaskRegistry::create("SEQUENTIALSIDEINFOTASK").unwrap().name(), "SequentialSideInfoTask");
    }

    #[test]
    fn test_unknown_alias() {
        let err = TaskRegistry::create("DirectTask").unwrap_err();
        match err {
            RecError::UnknownTask { alias, available } => {
                assert_eq!(alias, "DirectTask");
                assert_eq!(available.len(), 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(TaskRegistry::create_all(&["SequentialTask", "nope"]).is_err());
    }

    #[test]
    fn test_render_fills_every_placeholder() {
        let task = TaskRegistry::create("SequentialTask").unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..50 {
            let out = task.render(&args(), &mut rng).unwrap();
            assert!(out.input_text.starts_with("sequential_rec for user_7:"));
            assert!(out.input_text.contains("item_1 , item_2 , item_3") || out.input_text.contains("item_1 ; item_2 ; item_3"));
            assert!(!out.input_text.contains('{'));
            assert_eq!(out.target_text, "item_4");
        }
    }

    #[test]
    fn test_missing_argument_names_field_and_task() {
        let task = TaskRegistry::create("SequentialTask").unwrap();
        let mut a = args();
        a.target_item = None;
        let err = task.render(&a, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert_eq!(err, RecError::MissingArgument { field: "target_item", task: "SequentialTask" });
    }

    #[test]
    fn test_same_seed_same_render() {
        for name in TaskRegistry::names() {
            let task = TaskRegistry::create(name).unwrap();
            let a = task.render(&args(), &mut StdRng::seed_from_u64(99)).unwrap();
            let b = task.render(&args(), &mut StdRng::seed_from_u64(99)).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_forced_template_is_always_used() {
        let task = TaskRegistry::create("SequentialTask").unwrap().force_template(4).unwrap();
        let expected = fill(task.all_templates()[4].input, &[("user_id", "user_7".to_string())]);
        let prefix = expected.split("{history}").next().unwrap().to_string();

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let out = task.render(&args(), &mut rng).unwrap();
            assert!(out.input_text.starts_with(&prefix));
            assert!(out.input_text.ends_with("Recommend the next element that the user will buy"));
        }
    }

    #[test]
    fn test_reforcing_uses_canonical_set() {
        let task = TaskRegistry::create("SequentialTask").unwrap().force_template(0).unwrap();
        assert_eq!(task.active_templates().len(), 1);
        // the canonical table is still complete
        let task = task.force_template(5).unwrap();
        assert_eq!(task.forced_template(), Some(5));
        assert_eq!(task.all_templates().len(), 6);
    }

    #[test]
    fn test_force_unknown_template() {
        let err = TaskRegistry::create("SequentialTask").unwrap().force_template(42).unwrap_err();
        assert_eq!(
            err,
            RecError::UnknownTemplate { id: 42, task: "SequentialTask", available: vec![0, 1, 2, 3, 4, 5] }
        );
    }

    #[test]
    fn test_all_random_choices_are_reachable() {
        let task = TaskRegistry::create("SequentialTask").unwrap();
        let mut rng = StdRng::seed_from_u64(2024);
        let mut inputs = std::collections::HashSet::new();
        for _ in 0..500 {
            inputs.insert(task.render(&args(), &mut rng).unwrap().input_text);
        }
        // 6 templates x 2 separators
        assert_eq!(inputs.len(), 12);
    }

    #[test]
    fn test_task_set_renders_once_per_task() {
        let set = TaskSet::from_aliases(&["SequentialTask", "personalizedsequentialtask"]).unwrap();
        assert_eq!(set.names(), vec!["SequentialTask", "PersonalizedSequentialTask"]);
        let out = set.render_all(&args(), &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| p.target_text == "item_4"));
        assert!(TaskSet::from_aliases(&["Nope"]).is_err());
    }

    #[test]
    fn test_fill() {
        let out = fill("{a} and {b} and {a}", &[("a", "x".into()), ("b", "y".into())]);
        assert_eq!(out, "x and y and x");
    }

    #[test]
    fn test_fill_never_rescans_inserted_values() {
        let values = [
            ("history", "Mug {target} edition".to_string()),
            ("target", "item_9".to_string()),
        ];
        assert_eq!(fill("{history} | {nope} {", &values), "Mug {target} edition | {nope} {");
    }

    #[test]
    fn test_title_with_placeholder_does_not_leak_target() {
        let task = TaskRegistry::create("SequentialSideInfoTask").unwrap().force_template(0).unwrap();
        let mut a = args();
        a.input_title_seq = Some(vec!["Mug {target} edition".into(), "Ball".into(), "{user_id}".into()]);
        a.target_item = Some("SECRET_ITEM".into());

        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let out = task.render(&a, &mut rng).unwrap();
            assert!(!out.input_text.contains("SECRET_ITEM"));
            assert!(out.input_text.contains("item_1: Mug {target} edition"));
            assert!(out.input_text.contains("item_3: {user_id}"));
            assert_eq!(out.target_text, "SECRET_ITEM");
        }
    }
}
