use quest_core::model::{
    AnswerMap, Difficulty, Grade, GradeLevel, Question, QuestionId, TopicCategory,
};
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn id_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn grade_from_i64(v: Option<i64>) -> Result<Option<Grade>, StorageError> {
    v.map(|raw| {
        let narrow = u8::try_from(raw)
            .map_err(|_| StorageError::Serialization(format!("invalid grade: {raw}")))?;
        Grade::new(narrow).map_err(ser)
    })
    .transpose()
}

pub(crate) fn grade_to_i64(grade: Option<Grade>) -> Option<i64> {
    grade.map(|g| i64::from(g.value()))
}

pub(crate) fn level_from_i64(v: Option<i64>) -> Result<GradeLevel, StorageError> {
    Ok(GradeLevel::from(grade_from_i64(v)?))
}

//
// ─── JSON COLUMNS ──────────────────────────────────────────────────────────────
//

#[derive(Serialize, Deserialize)]
struct AnswerRow {
    question: u64,
    choice: usize,
}

pub(crate) fn answers_to_json(answers: &AnswerMap) -> Result<String, StorageError> {
    let rows: Vec<AnswerRow> = answers
        .iter()
        .map(|(q, c)| AnswerRow {
            question: q.value(),
            choice: *c,
        })
        .collect();
    serde_json::to_string(&rows).map_err(ser)
}

pub(crate) fn answers_from_json(raw: &str) -> Result<AnswerMap, StorageError> {
    let rows: Vec<AnswerRow> = serde_json::from_str(raw).map_err(ser)?;
    Ok(rows
        .into_iter()
        .map(|r| (QuestionId::new(r.question), r.choice))
        .collect())
}

#[derive(Serialize, Deserialize)]
struct QuestionRow {
    id: u64,
    prompt: String,
    options: Vec<String>,
    correct: usize,
    difficulty: Difficulty,
    category: TopicCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

pub(crate) fn questions_to_json(questions: &[Question]) -> Result<String, StorageError> {
    let rows: Vec<QuestionRow> = questions
        .iter()
        .map(|q| QuestionRow {
            id: q.id().value(),
            prompt: q.prompt().to_owned(),
            options: q.options().to_vec(),
            correct: q.correct(),
            difficulty: q.difficulty(),
            category: q.category(),
            explanation: q.explanation().map(str::to_owned),
        })
        .collect();
    serde_json::to_string(&rows).map_err(ser)
}

/// Rebuilds questions through `Question::new` so stored rows are re-validated.
pub(crate) fn questions_from_json(raw: &str) -> Result<Vec<Question>, StorageError> {
    let rows: Vec<QuestionRow> = serde_json::from_str(raw).map_err(ser)?;
    rows.into_iter()
        .map(|r| {
            Question::new(
                QuestionId::new(r.id),
                r.prompt,
                r.options,
                r.correct,
                r.difficulty,
                r.category,
                r.explanation,
            )
            .map_err(ser)
        })
        .collect()
}
