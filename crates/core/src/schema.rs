//! Structured records exchanged with the model during a reflexion run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;
use crate::chain::StructuredOutput;

/// The most search queries a draft may carry.
pub const MAX_SEARCH_QUERIES: usize = 3;

/// Self-critique attached to every answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Reflection {
    /// Critique of what is missing.
    pub missing: String,
    /// Critique of what is superfluous.
    pub superfluous: String,
}

/// The first answer to a question, together with the searches that would
/// improve it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerQuestion {
    /// ~250 word detailed answer to the question.
    pub answer: String,
    /// Your reflection on the initial answer.
    pub reflection: Reflection,
    /// 1-3 search queries for researching improvements to address the
    /// critique of your current answer.
    #[schemars(length(min = 1, max = 3))]
    pub search_queries: Vec<String>,
}

impl StructuredOutput for AnswerQuestion {
    const NAME: &'static str = "AnswerQuestion";
    const DESCRIPTION: &'static str = "Answer the question.";

    fn validate(&self) -> Result<(), String> {
        let count = self.search_queries.len();
        if !(1..=MAX_SEARCH_QUERIES).contains(&count) {
            return Err(format!(
                "expected 1 to {MAX_SEARCH_QUERIES} search queries, got {count}"
            ));
        }
        Ok(())
    }
}

/// A revised answer backed by citations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReviseAnswer {
    /// ~250 word detailed answer to the question.
    pub answer: String,
    /// Your reflection on the initial answer.
    pub reflection: Reflection,
    /// Further search queries. Must be left empty.
    #[serde(default)]
    pub search_queries: Vec<String>,
    /// Citations motivating your updated answer.
    pub references: Vec<String>,
}

impl StructuredOutput for ReviseAnswer {
    const NAME: &'static str = "ReviseAnswer";
    const DESCRIPTION: &'static str =
        "Revise your original answer to your question.";
}

/// A decoded AI payload, tagged with the record it matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnswerRecord {
    /// The payload is a draft.
    Draft(AnswerQuestion),
    /// The payload is a revision.
    Revision(ReviseAnswer),
}

impl AnswerRecord {
    /// Returns the answer text.
    pub fn answer(&self) -> &str {
        match self {
            AnswerRecord::Draft(draft) => &draft.answer,
            AnswerRecord::Revision(revision) => &revision.answer,
        }
    }
}

/// Decides which record a payload holds.
///
/// Tries [`ReviseAnswer`] first, since only a revision carries
/// `references`. Unknown fields are ignored by both records.
pub fn classify(payload: &Value) -> Result<AnswerRecord, Error> {
    if let Ok(revision) = ReviseAnswer::deserialize(payload) {
        return Ok(AnswerRecord::Revision(revision));
    }
    match AnswerQuestion::deserialize(payload) {
        Ok(draft) => Ok(AnswerRecord::Draft(draft)),
        Err(err) => Err(Error::schema_mismatch(
            "AnswerQuestion | ReviseAnswer",
            err.to_string(),
        )),
    }
}
