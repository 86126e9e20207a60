use std::collections::BTreeMap;

use log::debug;

use crate::dataset::{Dataset, Values, Variable};
use crate::error::ScoreError;
use crate::histogram::{rank_counts, RankCounts};

pub const DEFAULT_RANK_DIM: &str = "rank";

fn entr(p: f64) -> f64 {
    if p.is_nan() {
        f64::NAN
    } else if p > 0.0 {
        -p * p.ln()
    } else if p == 0.0 {
        0.0
    } else {
        f64::NEG_INFINITY
    }
}

/// Natural-log Shannon entropy of `weights` after normalizing them to sum
/// to one. Zero weights contribute nothing; an all-zero input is NaN.
pub fn shannon_entropy<I>(weights: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let weights: Vec<f64> = weights.into_iter().collect();
    let total: f64 = weights.iter().sum();
    weights.iter().map(|&w| entr(w / total)).sum()
}

pub fn max_entropy(n_members: usize) -> f64 {
    ((n_members + 1) as f64).ln()
}

pub fn entropy_of_rank_counts(counts: &RankCounts) -> Result<BTreeMap<String, f64>, ScoreError> {
    let mut scores = BTreeMap::new();
    for (variable, values) in counts {
        let Values::I64(hist) = values else {
            return Err(ScoreError::NonIntegerCounts {
                variable: variable.clone(),
                dtype: values.dtype(),
            });
        };
        scores.insert(
            variable.clone(),
            shannon_entropy(hist.iter().map(|&c| c as f64)),
        );
    }
    Ok(scores)
}

pub fn entropy_of_distributions(
    distributions: &Dataset,
    rank_dim: &str,
) -> Result<Dataset, ScoreError> {
    let mut out = Dataset::new();
    for (dim, labels) in distributions.coords() {
        if dim != rank_dim {
            out = out.with_coord(dim, labels.iter().cloned())?;
        }
    }

    for (name, var) in distributions.vars() {
        let axis = var.axis_of(rank_dim).ok_or_else(|| ScoreError::MissingDimension {
            variable: name.to_string(),
            dim: rank_dim.to_string(),
        })?;
        let reduced = var
            .values()
            .to_f64()
            .map_axis(axis, |lane| shannon_entropy(lane.iter().copied()));
        let dims: Vec<&str> = var
            .dims()
            .iter()
            .map(String::as_str)
            .filter(|d| *d != rank_dim)
            .collect();
        out = out.with_var(name, Variable::new(dims, reduced)?)?;
    }
    Ok(out)
}

pub fn rank_histogram_entropy(
    ground_truth: &Dataset,
    ensemble_data: &Dataset,
) -> Result<BTreeMap<String, f64>, ScoreError> {
    let counts = rank_counts(ground_truth, ensemble_data)?;
    let scores = entropy_of_rank_counts(&counts)?;
    debug!("rank histogram entropy for {} variables", scores.len());
    Ok(scores)
}
