use std::io::prelude::*;

use anyhow::Context;
use rustc_hash::FxHashMap;

/// A loosely-typed attribute value, for fields a data source attaches
/// to its features beyond the ones [`Feature`] has accessors for.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Text(s) => s.trim().parse().ok(),
            FeatureValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FeatureValue::Bool(b) => Some(*b),
            FeatureValue::Number(n) => Some(*n != 0.0),
            FeatureValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(n: f64) -> Self {
        FeatureValue::Number(n)
    }
}

impl From<bool> for FeatureValue {
    fn from(b: bool) -> Self {
        FeatureValue::Bool(b)
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        FeatureValue::Text(s.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(s: String) -> Self {
        FeatureValue::Text(s)
    }
}

/// A located feature with an optional score.
///
/// Only `start`, `end`, and `get` are required; the other accessors
/// fall back to `get` with the conventional field names (`score`,
/// `summary`, `minScore`, `maxScore`).
pub trait Feature {
    fn start(&self) -> i64;
    fn end(&self) -> i64;

    fn get(&self, field: &str) -> Option<FeatureValue>;

    fn score(&self) -> Option<f64> {
        self.get("score").and_then(|v| v.as_f64())
    }

    /// Summary features stand in for several underlying features and
    /// carry their score range in `min_score`/`max_score`.
    fn summary(&self) -> bool {
        self.get("summary")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn min_score(&self) -> Option<f64> {
        self.get("minScore").and_then(|v| v.as_f64())
    }

    fn max_score(&self) -> Option<f64> {
        self.get("maxScore").and_then(|v| v.as_f64())
    }
}

impl<T: Feature + ?Sized> Feature for &T {
    fn start(&self) -> i64 {
        (**self).start()
    }

    fn end(&self) -> i64 {
        (**self).end()
    }

    fn get(&self, field: &str) -> Option<FeatureValue> {
        (**self).get(field)
    }

    fn score(&self) -> Option<f64> {
        (**self).score()
    }

    fn summary(&self) -> bool {
        (**self).summary()
    }

    fn min_score(&self) -> Option<f64> {
        (**self).min_score()
    }

    fn max_score(&self) -> Option<f64> {
        (**self).max_score()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleFeature {
    pub ref_name: String,
    pub start: i64,
    pub end: i64,
    pub score: Option<f64>,

    fields: FxHashMap<String, FeatureValue>,
}

impl SimpleFeature {
    pub fn new(ref_name: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            ref_name: ref_name.into(),
            start,
            end,
            ..Default::default()
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Marks the feature as a summary over scores in `min..=max`
    pub fn into_summary(self, min: f64, max: f64) -> Self {
        self.with_field("summary", true)
            .with_field("minScore", min)
            .with_field("maxScore", max)
    }
}

impl Feature for SimpleFeature {
    fn start(&self) -> i64 {
        self.start
    }

    fn end(&self) -> i64 {
        self.end
    }

    fn get(&self, field: &str) -> Option<FeatureValue> {
        match field {
            "start" => Some(FeatureValue::Number(self.start as f64)),
            "end" => Some(FeatureValue::Number(self.end as f64)),
            "refName" => Some(FeatureValue::Text(self.ref_name.clone())),
            "score" => self.score.map(FeatureValue::Number),
            _ => self.fields.get(field).cloned(),
        }
    }

    fn score(&self) -> Option<f64> {
        self.score
    }
}

/// Reads `ref<TAB>start<TAB>end<TAB>score` lines (0-based, half-open),
/// skipping `track`, `browser` and `#` lines.
pub fn read_bedgraph(reader: impl BufRead) -> anyhow::Result<Vec<SimpleFeature>> {
    let mut features = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with("track")
            || trimmed.starts_with("browser")
        {
            continue;
        }

        let fields = trimmed.split_whitespace().collect::<Vec<_>>();
        let [ref_name, start, end, score, ..] = fields[..] else {
            anyhow::bail!("Line {}: expected 4 columns, found {}", i + 1, fields.len());
        };

        let start = start
            .parse::<i64>()
            .with_context(|| format!("Line {}: invalid start `{start}`", i + 1))?;
        let end = end
            .parse::<i64>()
            .with_context(|| format!("Line {}: invalid end `{end}`", i + 1))?;
        let score = score
            .parse::<f64>()
            .with_context(|| format!("Line {}: invalid score `{score}`", i + 1))?;

        features.push(SimpleFeature::new(ref_name, start, end).with_score(score));
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_fall_back_to_fields() {
        let feature = SimpleFeature::new("chr1", 10, 20)
            .with_score(2.5)
            .with_field("name", "gene1")
            .with_field("strand", -1.0);

        assert_eq!(feature.score(), Some(2.5));
        assert!(!feature.summary());
        assert_eq!(
            feature.get("name").as_ref().and_then(|v| v.as_str()),
            Some("gene1")
        );
        assert_eq!(feature.get("strand"), Some(FeatureValue::Number(-1.0)));
        assert_eq!(feature.get("start"), Some(FeatureValue::Number(10.0)));
        assert_eq!(feature.get("missing"), None);

        let summary = SimpleFeature::new("chr1", 0, 100)
            .with_score(3.0)
            .into_summary(1.0, 7.0);
        assert!(summary.summary());
        assert_eq!(summary.min_score(), Some(1.0));
        assert_eq!(summary.max_score(), Some(7.0));
    }

    #[test]
    fn bedgraph_lines() {
        let text = "track type=bedGraph\n# comment\nchr1\t0\t10\t1.5\nchr1 10 20 -2\n\n";
        let features = read_bedgraph(std::io::Cursor::new(text)).unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].ref_name, "chr1");
        assert_eq!((features[0].start, features[0].end), (0, 10));
        assert_eq!(features[0].score, Some(1.5));
        assert_eq!(features[1].score, Some(-2.0));

        let err = read_bedgraph(std::io::Cursor::new("chr1\t0\tten\t1\n")).unwrap_err();
        assert!(err.to_string().contains("Line 1"));
        assert!(read_bedgraph(std::io::Cursor::new("chr1\t0\n")).is_err());
    }

    #[test]
    fn text_scores_parse() {
        let feature = SimpleFeature::new("chr1", 0, 1).with_field("minScore", " 4.5 ");
        assert_eq!(feature.min_score(), Some(4.5));
        assert_eq!(FeatureValue::from("x").as_f64(), None);
    }
}
