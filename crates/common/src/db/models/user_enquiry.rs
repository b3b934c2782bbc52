//! User enquiry entity
//!
//! Mirrors the consolidated `userenquiries` table: the question, the answer
//! synthesized for it, and the bookkeeping that lets a stored answer be
//! reused instead of recomputed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `source_of_answer` tag recorded when no answer could be produced
pub const NO_INFORMATION_FOUND: &str = "no_information_found";

/// Where an enquiry is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerState {
    Pending,
    Answered,
    NoInformationFound,
}

impl From<AnswerState> for String {
    fn from(state: AnswerState) -> Self {
        match state {
            AnswerState::Pending => "pending".to_string(),
            AnswerState::Answered => "answered".to_string(),
            AnswerState::NoInformationFound => NO_INFORMATION_FOUND.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "userenquiries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub question_text: String,

    /// Normalized search terms, GIN-indexed
    pub keywords: Option<Vec<String>>,

    pub timestamp_asked: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text", nullable)]
    pub ai_generated_information: Option<String>,

    pub ai_identified_urls: Option<Vec<String>>,

    #[sea_orm(column_type = "Text", nullable)]
    pub fetched_content_summary: Option<String>,

    pub is_verified: bool,

    /// Times the stored answer was served again
    pub usage_count: i32,

    #[sea_orm(column_type = "String(StringLen::N(100))", nullable)]
    pub source_of_answer: Option<String>,
}

impl Model {
    /// Derive the lifecycle state from the answer columns
    pub fn answer_state(&self) -> AnswerState {
        let answered = self
            .ai_generated_information
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty());

        if answered {
            AnswerState::Answered
        } else if self.source_of_answer.as_deref() == Some(NO_INFORMATION_FOUND) {
            AnswerState::NoInformationFound
        } else {
            AnswerState::Pending
        }
    }

    /// Whether this row may be served in place of a fresh answer
    pub fn is_reusable(&self) -> bool {
        self.is_verified && self.answer_state() == AnswerState::Answered
    }

    pub fn keyword_list(&self) -> &[String] {
        self.keywords.as_deref().unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn enquiry() -> Model {
        Model {
            id: 1,
            question_text: "What are the current income tax bands?".into(),
            keywords: Some(vec!["income tax".into(), "tax bands".into()]),
            timestamp_asked: chrono::Utc::now().into(),
            ai_generated_information: None,
            ai_identified_urls: None,
            fetched_content_summary: None,
            is_verified: false,
            usage_count: 0,
            source_of_answer: None,
        }
    }

    #[test]
    fn test_answer_state() {
        let mut e = enquiry();
        assert_eq!(e.answer_state(), AnswerState::Pending);

        e.source_of_answer = Some(NO_INFORMATION_FOUND.into());
        assert_eq!(e.answer_state(), AnswerState::NoInformationFound);

        e.ai_generated_information = Some("   ".into());
        assert_eq!(e.answer_state(), AnswerState::NoInformationFound);

        e.ai_generated_information = Some("The basic rate is 20%.".into());
        assert_eq!(e.answer_state(), AnswerState::Answered);
        assert_eq!(String::from(e.answer_state()), "answered");
    }

    #[test]
    fn test_reusable_requires_verification() {
        let mut e = enquiry();
        e.ai_generated_information = Some("The basic rate is 20%.".into());
        assert!(!e.is_reusable());

        e.is_verified = true;
        assert!(e.is_reusable());
        assert_eq!(e.keyword_list().len(), 2);
    }
}
