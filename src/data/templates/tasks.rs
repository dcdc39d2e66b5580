// ============================================================
// Layer 4 — Task Variants
// ============================================================
// The concrete tasks and their template tables.
//
//   SequentialTask             item ids only
//   SequentialSideInfoTask     item ids annotated with titles
//   PersonalizedSequentialTask item ids plus the user's recent
//                              categories
//
// Every target template is "{target}": the model always has to
// produce the id of the next item, whatever the input looks like.

use crate::data::templates::{Task, Template};
use crate::domain::example::{PromptArgs, PromptField};

// ─── SequentialTask ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialTask;

const SEQUENTIAL_TEMPLATES: &[Template] = &[
    Template {
        id:     0,
        input:  "sequential_rec for {user_id}: \n\nPredict for the user the next element of the following sequence -> \n{history}",
        target: "{target}",
    },
    Template {
        id:     1,
        input:  "sequential_rec for {user_id}: \n\nPredict the next element which the user will buy given the following order history -> \n{history}",
        target: "{target}",
    },
    Template {
        id:     2,
        input:  "sequential_rec for {user_id}: \n\nWhat is the element that should be recommended to the user knowing that it has bought -> \n{history}",
        target: "{target}",
    },
    Template {
        id:     3,
        input:  "sequential_rec for {user_id}: \n\nRecommend to the user an item from the catalog given its order history -> \n{history}",
        target: "{target}",
    },
    Template {
        id:     4,
        input:  "sequential_rec for {user_id}: \n\nThis is the order history of the user -> \n{history} \nRecommend the next element that the user will buy",
        target: "{target}",
    },
    Template {
        id:     5,
        input:  "sequential_rec for {user_id}: \n\nPlease predict what item is best to recommend to the user given its order history -> \n{history}",
        target: "{target}",
    },
];

impl Task for SequentialTask {
    fn name(&self) -> &'static str {
        "SequentialTask"
    }

    fn templates(&self) -> &'static [Template] {
        SEQUENTIAL_TEMPLATES
    }

    fn required_fields(&self) -> &'static [PromptField] {
        &[PromptField::UserId, PromptField::InputItemSeq, PromptField::TargetItem]
    }

    fn placeholders(&self, args: &PromptArgs, separator: &str) -> Vec<(&'static str, String)> {
        vec![
            ("user_id", args.user_id().to_string()),
            ("history", args.items().join(separator)),
            ("target", args.target_item().to_string()),
        ]
    }
}

// ─── SequentialSideInfoTask ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialSideInfoTask;

const SIDE_INFO_TEMPLATES: &[Template] = &[
    Template {
        id:     0,
        input:  "sequential_rec for {user_id}: \n\nPredict for the user the next element of the following sequence, each item is followed by its title -> \n{history}",
        target: "{target}",
    },
    Template {
        id:     1,
        input:  "sequential_rec for {user_id}: \n\nPredict the next element which the user will buy given the following order history with product titles -> \n{history}",
        target: "{target}",
    },
    Template {
        id:     2,
        input:  "sequential_rec for {user_id}: \n\nThe user bought these products (id: title) -> \n{history} \nWhat should be recommended next?",
        target: "{target}",
    },
    Template {
        id:     3,
        input:  "sequential_rec for {user_id}: \n\nRecommend to the user an item from the catalog given its order history and the product names -> \n{history}",
        target: "{target}",
    },
];

impl Task for SequentialSideInfoTask {
    fn name(&self) -> &'static str {
        "SequentialSideInfoTask"
    }

    fn templates(&self) -> &'static [Template] {
        SIDE_INFO_TEMPLATES
    }

    fn required_fields(&self) -> &'static [PromptField] {
        &[
            PromptField::UserId,
            PromptField::InputItemSeq,
            PromptField::InputTitleSeq,
            PromptField::TargetItem,
        ]
    }

    fn placeholders(&self, args: &PromptArgs, separator: &str) -> Vec<(&'static str, String)> {
        let history: Vec<String> = args
            .items()
            .iter()
            .enumerate()
            .map(|(i, item)| match args.titles().get(i).filter(|t| !t.is_empty()) {
                Some(title) => format!("{item}: {title}"),
                None        => item.clone(),
            })
            .collect();

        vec![
            ("user_id", args.user_id().to_string()),
            ("history", history.join(separator)),
            ("target", args.target_item().to_string()),
        ]
    }
}

// ─── PersonalizedSequentialTask ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct PersonalizedSequentialTask;

const PERSONALIZED_TEMPLATES: &[Template] = &[
    Template {
        id:     0,
        input:  "sequential_rec for {user_id}: \n\n{user_id} usually buys products of these categories -> {categories} \nPredict the next element of its order history -> \n{history}",
        target: "{target}",
    },
    Template {
        id:     1,
        input:  "sequential_rec for {user_id}: \n\nGiven the order history of {user_id} -> \n{history} \nand its favourite categories -> {categories} \nrecommend the next item",
        target: "{target}",
    },
    Template {
        id:     2,
        input:  "sequential_rec for {user_id}: \n\nWhich item will {user_id} buy next? Order history -> \n{history} \nCategories -> {categories}",
        target: "{target}",
    },
];

/// Distinct categories of the history, most recent purchase first.
fn recent_categories(categories: &[Vec<String>]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    categories
        .iter()
        .rev()
        .flatten()
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}

impl Task for PersonalizedSequentialTask {
    fn name(&self) -> &'static str {
        "PersonalizedSequentialTask"
    }

    fn templates(&self) -> &'static [Template] {
        PERSONALIZED_TEMPLATES
    }

    fn required_fields(&self) -> &'static [PromptField] {
        &[
            PromptField::UserId,
            PromptField::InputItemSeq,
            PromptField::InputCategoriesSeq,
            PromptField::TargetItem,
        ]
    }

    fn placeholders(&self, args: &PromptArgs, separator: &str) -> Vec<(&'static str, String)> {
        vec![
            ("user_id", args.user_id().to_string()),
            ("history", args.items().join(separator)),
            ("categories", recent_categories(args.categories()).join(separator)),
            ("target", args.target_item().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::templates::{fill, TaskInstance};
    use rand::{rngs::StdRng, SeedableRng};

    fn args() -> PromptArgs {
        PromptArgs {
            user_id:              Some("u9".into()),
            input_item_seq:       Some(vec!["a".into(), "b".into()]),
            input_title_seq:      Some(vec!["Alpha".into(), String::new()]),
            input_categories_seq: Some(vec![vec!["Toys".into(), "Games".into()], vec!["Toys".into(), "Puzzles".into()]]),
            target_item:          Some("c".into()),
        }
    }

    #[test]
    fn test_template_ids_are_dense() {
        for table in [SEQUENTIAL_TEMPLATES, SIDE_INFO_TEMPLATES, PERSONALIZED_TEMPLATES] {
            for (i, t) in table.iter().enumerate() {
                assert_eq!(t.id, i);
                assert_eq!(t.target, "{target}");
            }
        }
    }

    #[test]
    fn test_side_info_history_includes_titles() {
        let values = SequentialSideInfoTask.placeholders(&args(), " ; ");
        assert_eq!(values[1], ("history", "a: Alpha ; b".to_string()));
    }

    #[test]
    fn test_side_info_requires_titles() {
        let task = TaskInstance::new(Box::new(SequentialSideInfoTask));
        let mut a = args();
        a.input_title_seq = None;
        assert!(task.validate(&a).is_err());
        assert!(TaskInstance::new(Box::new(SequentialTask)).validate(&a).is_ok());
    }

    #[test]
    fn test_recent_categories_dedup_most_recent_first() {
        let cats = recent_categories(args().categories());
        assert_eq!(cats, vec!["Toys", "Puzzles", "Games"]);
    }

    #[test]
    fn test_personalized_render() {
        let task = TaskInstance::new(Box::new(PersonalizedSequentialTask)).force_template(2).unwrap();
        let out = task.render(&args(), &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(out.input_text.contains("Which item will u9 buy next?"));
        assert!(out.input_text.contains("Toys"));
        assert_eq!(out.target_text, "c");
    }

    #[test]
    fn test_personalized_category_with_placeholder_stays_literal() {
        let mut a = args();
        a.input_categories_seq = Some(vec![vec!["{history}".into()], vec!["{target}".into()]]);
        a.target_item = Some("SECRET_ITEM".into());
        for id in 0..PERSONALIZED_TEMPLATES.len() {
            let task = TaskInstance::new(Box::new(PersonalizedSequentialTask)).force_template(id).unwrap();
            let out = task.render(&a, &mut StdRng::seed_from_u64(id as u64)).unwrap();
            assert!(out.input_text.contains("{target} , {history}") || out.input_text.contains("{target} ; {history}"));
            assert!(!out.input_text.contains("SECRET_ITEM"));
            assert_eq!(out.input_text.matches("a , b").count() + out.input_text.matches("a ; b").count(), 1);
        }
    }

    #[test]
    fn test_empty_history_renders() {
        let mut a = args();
        a.input_item_seq = Some(vec![]);
        let values = SequentialTask.placeholders(&a, " , ");
        let text = fill(SEQUENTIAL_TEMPLATES[0].input, &values);
        assert!(text.ends_with("-> \n"));
    }
}
