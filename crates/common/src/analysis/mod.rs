//! Typed view of the analysis payload stored with a detected change
//!
//! `detectedchanges.raw_ai_analysis_result` is free-form JSONB. Analysers
//! agree on a handful of keys; anything else they emit is carried along in
//! `extra` so nothing is lost on a round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How strongly a change is expected to affect readers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeAnalysis {
    /// e.g. "Tax Code Adjustment", "Regulatory Guidance", "Generic Update"
    pub change_type: String,

    #[serde(default)]
    pub impact_level: ImpactLevel,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_entities: Vec<String>,

    pub summary_of_change: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text_snippet: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChangeAnalysis {
    pub fn new(change_type: impl Into<String>, summary_of_change: impl Into<String>) -> Self {
        Self {
            change_type: change_type.into(),
            summary_of_change: summary_of_change.into(),
            ..Default::default()
        }
    }

    pub fn with_impact(mut self, impact_level: ImpactLevel) -> Self {
        self.impact_level = impact_level;
        self
    }

    pub fn with_affected_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_entities = entities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.full_text_snippet = Some(snippet.into());
        self
    }

    /// Serialize for the JSONB column
    pub fn to_json(&self) -> Value {
        // A struct of strings and a string map cannot fail to serialize
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Parse a stored payload. Payloads of another shape yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_analyser_payload() {
        let payload = json!({
            "change_type": "Tax Code Adjustment",
            "impact_level": "High",
            "affected_entities": ["Individuals", "Businesses"],
            "summary_of_change": "Potential changes to income tax bands identified.",
            "full_text_snippet": "Details on income tax bands adjusted.",
            "confidence": 0.82
        });

        let analysis = ChangeAnalysis::from_json(&payload).unwrap();
        assert_eq!(analysis.impact_level, ImpactLevel::High);
        assert_eq!(analysis.affected_entities.len(), 2);
        assert_eq!(analysis.extra.get("confidence"), Some(&json!(0.82)));

        // Unknown keys survive a round trip
        assert_eq!(analysis.to_json(), payload);
    }

    #[test]
    fn test_unrecognised_impact_level() {
        let payload = json!({
            "change_type": "Generic Update",
            "impact_level": "Catastrophic",
            "summary_of_change": "Content changed."
        });
        let analysis = ChangeAnalysis::from_json(&payload).unwrap();
        assert_eq!(analysis.impact_level, ImpactLevel::Unknown);
    }

    #[test]
    fn test_foreign_payload_is_none() {
        assert!(ChangeAnalysis::from_json(&json!({"diff": [1, 2, 3]})).is_none());
        assert!(ChangeAnalysis::from_json(&json!("plain text")).is_none());
    }

    #[test]
    fn test_builder() {
        let analysis = ChangeAnalysis::new("Regulatory Guidance", "New guidance on consumer credit.")
            .with_impact(ImpactLevel::Medium)
            .with_affected_entities(["Financial Institutions", "Consumers"])
            .with_snippet("New guidance on consumer credit published.");

        let value = analysis.to_json();
        assert_eq!(value["impact_level"], "Medium");
        assert_eq!(value["affected_entities"][1], "Consumers");
    }
}
