use crate::domain::models::{Category, InterviewScore, Interviewer, Question};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryAverage {
    pub category_id: i64,
    pub category_name: String,
    pub average: f64,
    pub score_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InterviewerScore {
    pub interviewer_id: i64,
    pub score: Option<i16>,
}

/// One row of the score table: a question at its position in the test.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuestionScores {
    pub position: usize,
    pub question_id: i64,
    pub category_id: i64,
    pub scores: Vec<InterviewerScore>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreSummary {
    pub overall_average: Option<f64>,
    pub score_count: usize,
    pub category_averages: Vec<CategoryAverage>,
    pub grid: Vec<QuestionScores>,
}

fn mean(values: &[i16]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().map(|&v| i64::from(v)).sum();
    Some(sum as f64 / values.len() as f64)
}

/// Score values grouped by the category of the question they were given for.
///
/// Only categories present in `categories` are kept. Scores whose question is not
/// in `questions` are ignored.
fn category_buckets(
    questions: &[Question],
    scores: &[InterviewScore],
    categories: &[Category],
) -> BTreeMap<i64, Vec<i16>> {
    let category_of: HashMap<i64, i64> = questions.iter().map(|q| (q.id, q.category_id)).collect();

    let mut buckets: BTreeMap<i64, Vec<i16>> = BTreeMap::new();
    for score in scores {
        if let Some(&category_id) = category_of.get(&score.question_id) {
            buckets.entry(category_id).or_default().push(score.score);
        }
    }
    buckets.retain(|category_id, _| categories.iter().any(|c| c.id == *category_id));
    buckets
}

/// Mean score per category, interviewers pooled.
///
/// A category with no recorded scores has no entry at all (not a zero).
pub fn category_averages(
    questions: &[Question],
    scores: &[InterviewScore],
    categories: &[Category],
) -> BTreeMap<i64, f64> {
    category_buckets(questions, scores, categories)
        .into_iter()
        .filter_map(|(category_id, values)| mean(&values).map(|avg| (category_id, avg)))
        .collect()
}

/// Flat mean over every score row. This is not the mean of the category averages.
pub fn overall_average(scores: &[InterviewScore]) -> Option<f64> {
    let values: Vec<i16> = scores.iter().map(|s| s.score).collect();
    mean(&values)
}

/// The score one interviewer gave one question.
///
/// Rows are unique per (interview, interviewer, question); should duplicates ever
/// appear, the first one in `scores` wins.
pub fn score_for(scores: &[InterviewScore], interviewer_id: i64, question_id: i64) -> Option<i16> {
    scores
        .iter()
        .find(|s| s.interviewer_id == interviewer_id && s.question_id == question_id)
        .map(|s| s.score)
}

pub fn summarize(
    categories: &[Category],
    questions: &[Question],
    interviewers: &[Interviewer],
    scores: &[InterviewScore],
) -> ScoreSummary {
    let names: HashMap<i64, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();

    let buckets = category_buckets(questions, scores, categories);

    let category_averages = category_averages(questions, scores, categories)
        .into_iter()
        .map(|(category_id, average)| CategoryAverage {
            category_id,
            category_name: names.get(&category_id).copied().unwrap_or_default().to_string(),
            average,
            score_count: buckets.get(&category_id).map_or(0, Vec::len),
        })
        .collect();

    let grid = questions
        .iter()
        .enumerate()
        .map(|(position, question)| QuestionScores {
            position,
            question_id: question.id,
            category_id: question.category_id,
            scores: interviewers
                .iter()
                .map(|interviewer| InterviewerScore {
                    interviewer_id: interviewer.id,
                    score: score_for(scores, interviewer.id, question.id),
                })
                .collect(),
        })
        .collect();

    ScoreSummary {
        overall_average: overall_average(scores),
        score_count: scores.len(),
        category_averages,
        grid,
    }
}
