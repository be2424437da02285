//! Loss and status extraction from result documents.
//!
//! The experiment driver keeps one result document per trial. The ledger
//! only needs two fields of it, `loss` and `status`, to build the parallel
//! `outcomes` and `statuses` slices that
//! [`Suggester::suggest`](crate::Suggester::suggest) takes.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::TrialStatus;

/// The two fields of a result document the ledger reads.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrialResult {
    /// How bad the trial was; lower is better.
    #[cfg_attr(feature = "serde", serde(default))]
    pub loss: Option<f64>,
    /// What happened to the trial.
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: Option<TrialStatus>,
}

impl TrialResult {
    /// A finished trial with the given loss.
    #[must_use]
    pub fn ok(loss: f64) -> Self {
        Self {
            loss: Some(loss),
            status: Some(TrialStatus::Ok),
        }
    }

    /// A trial whose evaluation failed.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            loss: None,
            status: Some(TrialStatus::Fail),
        }
    }

    /// Reads `loss` and `status` from a JSON result document.
    ///
    /// Missing or ill-typed fields come back as `None`; other fields are
    /// ignored.
    #[cfg(feature = "serde")]
    #[must_use]
    pub fn from_json(result: &serde_json::Value) -> Self {
        Self {
            loss: loss(result),
            status: status(result),
        }
    }
}

/// Extracts the scalar loss from a JSON result document.
#[cfg(feature = "serde")]
#[must_use]
pub fn loss(result: &serde_json::Value) -> Option<f64> {
    result.get("loss").and_then(serde_json::Value::as_f64)
}

/// Extracts the trial status from a JSON result document.
#[cfg(feature = "serde")]
#[must_use]
pub fn status(result: &serde_json::Value) -> Option<TrialStatus> {
    result
        .get("status")
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.parse().ok())
}

/// Splits results into the `outcomes` and `statuses` slices `suggest` takes.
///
/// A result without a status counts as [`TrialStatus::New`].
#[must_use]
pub fn split(results: &[TrialResult]) -> (Vec<Option<f64>>, Vec<TrialStatus>) {
    results
        .iter()
        .map(|r| (r.loss, r.status.unwrap_or(TrialStatus::New)))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "serde")]
    #[test]
    fn reads_loss_and_status_fields() {
        let doc = serde_json::json!({ "loss": 0.25, "status": "ok", "extra": [1, 2] });
        assert_eq!(TrialResult::from_json(&doc), TrialResult::ok(0.25));

        let partial = serde_json::json!({ "status": "running" });
        assert_eq!(loss(&partial), None);
        assert_eq!(status(&partial), Some(TrialStatus::Running));

        let garbage = serde_json::json!({ "loss": "high", "status": "exploded" });
        assert_eq!(TrialResult::from_json(&garbage), TrialResult::default());
    }

    #[test]
    fn split_defaults_missing_status_to_new() {
        let results = [TrialResult::ok(1.0), TrialResult::default(), TrialResult::failed()];
        let (outcomes, statuses) = split(&results);
        assert_eq!(outcomes, vec![Some(1.0), None, None]);
        assert_eq!(
            statuses,
            vec![TrialStatus::Ok, TrialStatus::New, TrialStatus::Fail]
        );
    }
}
