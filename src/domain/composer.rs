use crate::domain::models::{Question, TestQuestion};
use std::collections::{HashMap, HashSet};

/// Builds the association rows for a full replace of a test's question set.
///
/// Each element of `question_ids` becomes one row whose `order_index` is its
/// zero-based position. Repeated ids are kept as separate rows.
pub fn assignments(test_id: i64, question_ids: &[i64]) -> Vec<TestQuestion> {
    question_ids
        .iter()
        .enumerate()
        .map(|(idx, &question_id)| TestQuestion {
            test_id,
            question_id,
            order_index: idx as i32,
        })
        .collect()
}

/// Resolves association rows into questions, ordered by `order_index` ascending.
///
/// Rows whose question is missing from `questions` are skipped.
pub fn order_questions(rows: &[TestQuestion], questions: Vec<Question>) -> Vec<Question> {
    let mut rows: Vec<&TestQuestion> = rows.iter().collect();
    rows.sort_by_key(|row| row.order_index);

    let by_id: HashMap<i64, Question> = questions.into_iter().map(|q| (q.id, q)).collect();
    rows.into_iter()
        .filter_map(|row| by_id.get(&row.question_id).cloned())
        .collect()
}

/// Ids from `requested` that are absent from `known`, first occurrence order, no repeats.
pub fn unknown_question_ids(requested: &[i64], known: &[Question]) -> Vec<i64> {
    let known: HashSet<i64> = known.iter().map(|q| q.id).collect();
    let mut seen = HashSet::new();
    requested
        .iter()
        .copied()
        .filter(|id| !known.contains(id) && seen.insert(*id))
        .collect()
}
