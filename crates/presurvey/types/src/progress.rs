use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which completion percentage is recorded
pub const PROGRESS_KEY: &str = "progress";

/// A historical participant data point, e.g. completion percentage of a survey
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub key: String,
    pub survey_ordinal: u32,
    /// Stored loosely upstream; numbers and numeric strings both occur
    pub value: Value,
}

impl ProgressRecord {
    pub fn progress(survey_ordinal: u32, value: impl Into<Value>) -> Self {
        Self {
            key: PROGRESS_KEY.to_string(),
            survey_ordinal,
            value: value.into(),
        }
    }

    /// Completion percentage, if the value is a number in `0..=100`
    pub fn percent(&self) -> Option<f64> {
        let pct = match &self.value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (0.0..=100.0).contains(&pct).then_some(pct)
    }

    /// Whether this record shows survey `ordinal` fully completed.
    ///
    /// Malformed or out-of-range values count as not completed.
    pub fn shows_completed(&self, ordinal: u32) -> bool {
        self.key == PROGRESS_KEY
            && self.survey_ordinal == ordinal
            && self.percent().map_or(false, |pct| pct >= 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_string_values() {
        assert!(ProgressRecord::progress(1, 100).shows_completed(1));
        assert!(ProgressRecord::progress(1, "100").shows_completed(1));
        assert!(ProgressRecord::progress(1, json!(100.0)).shows_completed(1));
        assert!(!ProgressRecord::progress(1, 99).shows_completed(1));
        assert!(!ProgressRecord::progress(2, 100).shows_completed(1));
    }

    #[test]
    fn malformed_values_are_not_completed() {
        assert!(!ProgressRecord::progress(1, "done").shows_completed(1));
        assert!(!ProgressRecord::progress(1, 150).shows_completed(1));
        assert!(!ProgressRecord::progress(1, -5).shows_completed(1));
        assert!(!ProgressRecord::progress(1, Value::Null).shows_completed(1));
        assert!(!ProgressRecord::progress(1, json!([100])).shows_completed(1));
    }

    #[test]
    fn other_keys_are_ignored() {
        let record = ProgressRecord {
            key: "condition".into(),
            survey_ordinal: 1,
            value: json!(100),
        };
        assert!(!record.shows_completed(1));
    }
}
