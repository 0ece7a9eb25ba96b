//! Progress values reported by the server for display.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A progress value as the server renders it: `"42%"`, `"3 / 10"`, a bare
/// number, or a placeholder such as `"-"`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressValue {
    Percent(f64),
    Fraction { done: u64, total: u64 },
    Text(String),
}

impl ProgressValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(number) = trimmed.strip_suffix('%')
            && let Ok(percent) = number.trim().parse::<f64>()
        {
            return ProgressValue::Percent(percent);
        }
        if let Some((done, total)) = trimmed.split_once('/')
            && let (Ok(done), Ok(total)) =
                (done.trim().parse::<u64>(), total.trim().parse::<u64>())
        {
            return ProgressValue::Fraction { done, total };
        }
        if let Ok(percent) = trimmed.parse::<f64>() {
            return ProgressValue::Percent(percent);
        }
        ProgressValue::Text(raw.to_string())
    }

    /// Completion in percent, clamped to `0..=100`. Placeholder text has no
    /// percentage.
    pub fn as_percent(&self) -> Option<f64> {
        let percent = match self {
            ProgressValue::Percent(p) => *p,
            ProgressValue::Fraction { done, total } if *total > 0 => {
                *done as f64 * 100.0 / *total as f64
            }
            ProgressValue::Fraction { .. } => 0.0,
            ProgressValue::Text(_) => return None,
        };
        percent.is_finite().then(|| percent.clamp(0.0, 100.0))
    }
}

impl Default for ProgressValue {
    fn default() -> Self {
        ProgressValue::Text("-".to_string())
    }
}

impl fmt::Display for ProgressValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressValue::Percent(p) => write!(f, "{p:.0}%"),
            ProgressValue::Fraction { done, total } => write!(f, "{done} / {total}"),
            ProgressValue::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProgress {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for ProgressValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawProgress::deserialize(deserializer)? {
            RawProgress::Number(n) => ProgressValue::Percent(n),
            RawProgress::Text(text) => ProgressValue::parse(&text),
        })
    }
}

impl Serialize for ProgressValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Body of `GET /check_storage_progress` (inside the data envelope).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub progress: ProgressValue,
}
