use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dimensions::Dimension;

/// Shown in place of a dimension whose analysis failed.
pub const UNAVAILABLE_PLACEHOLDER: &str = "No analysis available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DimensionOutcome {
    Success { text: String },
    Failure { reason: String },
}

impl DimensionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DimensionOutcome::Success { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            DimensionOutcome::Success { .. } => "success",
            DimensionOutcome::Failure { .. } => "failure",
        }
    }

    /// User-facing text. Failures never leak their internal reason here, and
    /// a blank success reads the same as a failure.
    pub fn display_text(&self) -> &str {
        match self {
            DimensionOutcome::Success { text } if !text.trim().is_empty() => text,
            _ => UNAVAILABLE_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionEntry {
    pub dimension: Dimension,
    #[serde(default, skip_deserializing)]
    pub label: String,
    #[serde(default, skip_deserializing)]
    pub codename: String,
    pub outcome: DimensionOutcome,
}

impl DimensionEntry {
    pub fn new(dimension: Dimension, outcome: DimensionOutcome) -> Self {
        Self {
            dimension,
            label: dimension.label().to_string(),
            codename: dimension.codename().to_string(),
            outcome,
        }
    }
}

/// Exactly one outcome per dimension, held in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DimensionEntry>", into = "Vec<DimensionEntry>")]
pub struct DimensionResults {
    outcomes: [DimensionOutcome; 6],
}

impl DimensionResults {
    /// Places each outcome in its dimension's slot, whatever order they
    /// arrive in. Fails if a dimension is missing or repeated.
    pub fn from_outcomes<I>(outcomes: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (Dimension, DimensionOutcome)>,
    {
        let mut slots: [Option<DimensionOutcome>; 6] = Default::default();

        for (dimension, outcome) in outcomes {
            let slot = &mut slots[dimension.index()];
            if slot.is_some() {
                return Err(format!("duplicate outcome for dimension {dimension}"));
            }
            *slot = Some(outcome);
        }

        let missing: Vec<&str> = Dimension::ALL
            .iter()
            .filter(|d| slots[d.index()].is_none())
            .map(|d| d.key())
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing outcomes for: {}", missing.join(", ")));
        }

        let outcomes: Vec<DimensionOutcome> = slots.into_iter().flatten().collect();
        let outcomes: [DimensionOutcome; 6] = outcomes
            .try_into()
            .map_err(|_| "expected exactly six outcomes".to_string())?;
        Ok(Self::new(outcomes))
    }

    /// Outcomes indexed by declaration order.
    pub fn new(outcomes: [DimensionOutcome; 6]) -> Self {
        Self { outcomes }
    }

    pub fn get(&self, dimension: Dimension) -> &DimensionOutcome {
        &self.outcomes[dimension.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &DimensionOutcome)> {
        Dimension::ALL.into_iter().zip(self.outcomes.iter())
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }
}

impl TryFrom<Vec<DimensionEntry>> for DimensionResults {
    type Error = String;

    fn try_from(entries: Vec<DimensionEntry>) -> Result<Self, Self::Error> {
        Self::from_outcomes(entries.into_iter().map(|e| (e.dimension, e.outcome)))
    }
}

impl From<DimensionResults> for Vec<DimensionEntry> {
    fn from(results: DimensionResults) -> Self {
        Dimension::ALL
            .into_iter()
            .zip(results.outcomes)
            .map(|(dimension, outcome)| DimensionEntry::new(dimension, outcome))
            .collect()
    }
}

/// Aggregate of one analysis run, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBundle {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub submission: String,
    pub dimensions: DimensionResults,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(text: &str) -> DimensionOutcome {
        DimensionOutcome::Success {
            text: text.to_string(),
        }
    }

    fn failure(reason: &str) -> DimensionOutcome {
        DimensionOutcome::Failure {
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_from_outcomes_orders_by_declaration() {
        let reversed = Dimension::ALL
            .iter()
            .rev()
            .map(|d| (*d, success(d.key())))
            .collect::<Vec<_>>();

        let results = DimensionResults::from_outcomes(reversed).unwrap();
        let order: Vec<Dimension> = results.iter().map(|(d, _)| d).collect();
        assert_eq!(order, Dimension::ALL.to_vec());

        for (dimension, outcome) in results.iter() {
            assert_eq!(outcome.display_text(), dimension.key());
        }
    }

    #[test]
    fn test_from_outcomes_rejects_missing() {
        let partial = Dimension::ALL[..5]
            .iter()
            .map(|d| (*d, success("ok")))
            .collect::<Vec<_>>();

        let err = DimensionResults::from_outcomes(partial).unwrap_err();
        assert!(err.contains("manipulability"));
    }

    #[test]
    fn test_from_outcomes_rejects_duplicates() {
        let mut outcomes = Dimension::ALL
            .iter()
            .map(|d| (*d, success("ok")))
            .collect::<Vec<_>>();
        outcomes.push((Dimension::Exposure, success("again")));

        let err = DimensionResults::from_outcomes(outcomes).unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn test_blank_success_displays_placeholder() {
        assert_eq!(success("").display_text(), UNAVAILABLE_PLACEHOLDER);
        assert_eq!(success("  \n ").display_text(), UNAVAILABLE_PLACEHOLDER);
        assert_eq!(success(" ok ").display_text(), " ok ");
    }

    #[test]
    fn test_failure_displays_placeholder() {
        let outcome = failure("503 service unavailable");
        assert_eq!(outcome.display_text(), UNAVAILABLE_PLACEHOLDER);
        assert_eq!(outcome.status(), "failure");
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_counts() {
        let outcomes = Dimension::ALL.iter().map(|d| {
            let outcome = if *d == Dimension::Platforms {
                failure("boom")
            } else {
                success("fine")
            };
            (*d, outcome)
        });
        let results = DimensionResults::from_outcomes(outcomes).unwrap();
        assert_eq!(results.success_count(), 5);
        assert_eq!(results.failure_count(), 1);
        assert!(!results.get(Dimension::Platforms).is_success());
    }

    #[test]
    fn test_serializes_as_ordered_entries() {
        let results =
            DimensionResults::from_outcomes(Dimension::ALL.iter().map(|d| (*d, success("x"))))
                .unwrap();
        let value = serde_json::to_value(&results).unwrap();
        let entries = value.as_array().unwrap();

        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0]["dimension"], "exposure");
        assert_eq!(entries[2]["label"], "Audience & Consequences");
        assert_eq!(entries[5]["codename"], "Manipulability Watch");
        assert_eq!(entries[1]["outcome"]["status"], "success");
        assert_eq!(entries[1]["outcome"]["text"], "x");
    }

    #[test]
    fn test_bundle_deserializes_and_validates() {
        let json = serde_json::json!({
            "submission": "hello",
            "dimensions": [
                {"dimension": "manipulability", "outcome": {"status": "success", "text": "m"}},
                {"dimension": "exposure", "outcome": {"status": "failure", "reason": "timeout"}},
                {"dimension": "inference", "outcome": {"status": "success", "text": "i"}},
                {"dimension": "audience", "outcome": {"status": "success", "text": "a"}},
                {"dimension": "platforms", "outcome": {"status": "success", "text": "p"}},
                {"dimension": "amplification", "outcome": {"status": "success", "text": "am"}}
            ]
        });

        let bundle: ResultBundle = serde_json::from_value(json).unwrap();
        assert_eq!(bundle.submission, "hello");
        assert!(bundle.summary.is_none());
        assert_eq!(
            bundle.dimensions.get(Dimension::Exposure),
            &failure("timeout")
        );
        assert_eq!(
            bundle.dimensions.iter().last().map(|(d, _)| d),
            Some(Dimension::Manipulability)
        );
    }

    #[test]
    fn test_bundle_with_five_dimensions_rejected() {
        let json = serde_json::json!({
            "submission": "hello",
            "dimensions": [
                {"dimension": "exposure", "outcome": {"status": "success", "text": "e"}}
            ]
        });

        assert!(serde_json::from_value::<ResultBundle>(json).is_err());
    }
}
