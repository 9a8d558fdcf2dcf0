//! Summary statistics over feature scores.

use crate::feature::Feature;
use crate::region::Region;

/// Raw accumulated sums, before means and deviations are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnrectifiedFeatureStats {
    pub score_min: Option<f64>,
    pub score_max: Option<f64>,
    pub score_sum: Option<f64>,
    pub score_sum_squares: Option<f64>,
    pub feature_count: Option<f64>,
    pub bases_covered: Option<f64>,
}

/// Derived statistics; never contains NaN, missing values are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureStats {
    pub score_min: Option<f64>,
    pub score_max: Option<f64>,
    pub score_sum: Option<f64>,
    pub score_sum_squares: Option<f64>,
    pub feature_count: Option<f64>,
    pub bases_covered: Option<f64>,
    pub score_mean: Option<f64>,
    pub score_std_dev: Option<f64>,
    pub feature_density: Option<f64>,
}

// JS-style truthiness for an optional count
fn nonzero(x: Option<f64>) -> Option<f64> {
    x.filter(|v| *v != 0.0 && !v.is_nan())
}

fn not_nan(x: Option<f64>) -> Option<f64> {
    x.filter(|v| !v.is_nan())
}

/// Standard deviation from the sum and sum of squares of `n` values.
///
/// Uses the sample (`n - 1`) correction unless `population` is set.
/// Returns 0 when `n` is missing or not positive, and when rounding
/// makes the variance negative.
pub fn calc_std_from_sums(
    sum: Option<f64>,
    sum_squares: Option<f64>,
    n: Option<f64>,
    population: bool,
) -> f64 {
    let n = match n {
        Some(n) if n > 0.0 => n,
        _ => return 0.0,
    };
    let sum = sum.unwrap_or(0.0);
    let sum_squares = sum_squares.unwrap_or(0.0);

    let variance = if population {
        sum_squares / n - (sum * sum) / (n * n)
    } else {
        let v = sum_squares - (sum * sum) / n;
        if n > 1.0 {
            v / (n - 1.0)
        } else {
            v
        }
    };

    if variance < 0.0 {
        0.0
    } else {
        variance.sqrt()
    }
}

pub fn rectify_stats(s: UnrectifiedFeatureStats) -> FeatureStats {
    let divisor = nonzero(s.feature_count).or(nonzero(s.bases_covered));

    let score_mean = match (nonzero(s.score_sum), divisor) {
        (Some(sum), Some(n)) => Some(sum / n),
        _ => None,
    };

    let score_std_dev = calc_std_from_sums(s.score_sum, s.score_sum_squares, divisor, false);

    let feature_density =
        nonzero(s.feature_count).unwrap_or(1.0) / nonzero(s.bases_covered).unwrap_or(1.0);

    FeatureStats {
        score_min: not_nan(s.score_min),
        score_max: not_nan(s.score_max),
        score_sum: not_nan(s.score_sum),
        score_sum_squares: not_nan(Some(s.score_sum_squares.unwrap_or(0.0))),
        feature_count: not_nan(s.feature_count),
        bases_covered: not_nan(Some(s.bases_covered.unwrap_or(0.0))),
        score_mean: not_nan(score_mean),
        score_std_dev: not_nan(Some(score_std_dev)),
        feature_density: not_nan(Some(feature_density)),
    }
}

/// Baseline stats used before any data has loaded
pub fn blank_stats() -> FeatureStats {
    FeatureStats {
        feature_count: Some(0.0),
        feature_density: Some(0.0),
        bases_covered: Some(0.0),
        ..Default::default()
    }
}

/// Accumulates score statistics over `features` in a single pass.
///
/// Summary features contribute their `min_score`/`max_score` to the
/// range instead of their score. Features without a score are counted
/// but add nothing to the sums.
pub fn scores_to_stats<F: Feature>(
    region: &Region,
    features: impl IntoIterator<Item = F>,
) -> FeatureStats {
    let mut score_min: Option<f64> = None;
    let mut score_max: Option<f64> = None;
    let mut score_sum = 0.0;
    let mut score_sum_squares = 0.0;
    let mut feature_count = 0usize;

    for feature in features {
        let score = feature.score();

        let (lo, hi) = if feature.summary() {
            (
                feature.min_score().or(score),
                feature.max_score().or(score),
            )
        } else {
            (score, score)
        };

        if let Some(lo) = lo {
            score_min = Some(score_min.map_or(lo, |m| m.min(lo)));
        }
        if let Some(hi) = hi {
            score_max = Some(score_max.map_or(hi, |m| m.max(hi)));
        }

        if let Some(score) = score {
            score_sum += score;
            score_sum_squares += score * score;
        }
        feature_count += 1;
    }

    rectify_stats(UnrectifiedFeatureStats {
        score_min,
        score_max,
        score_sum: Some(score_sum),
        score_sum_squares: Some(score_sum_squares),
        feature_count: Some(feature_count as f64),
        bases_covered: Some((region.end - region.start + 1) as f64),
    })
}

/// Per-base scores across `region.start..region.end`, 0 where no
/// feature covers a base.
pub fn calc_per_base_stats<F: Feature>(region: &Region, features: &[F]) -> Vec<f64> {
    let mut sorted = features.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|f| f.start());

    let len = region.len().max(0) as usize;
    let mut scores = Vec::with_capacity(len);

    let mut current = 0;
    for pos in region.start..region.end {
        while current < sorted.len() && pos >= sorted[current].end() {
            current += 1;
        }

        let score = match sorted.get(current) {
            Some(f) if pos >= f.start() && pos < f.end() => f.score().unwrap_or(0.0),
            _ => 0.0,
        };
        scores.push(score);
    }

    scores
}
