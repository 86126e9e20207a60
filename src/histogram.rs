use std::collections::BTreeMap;

use log::{trace, warn};
use ndarray::{Array1, ArrayBase, Data, Dimension};
use rayon::prelude::*;

use crate::dataset::{Dataset, Values, Variable};
use crate::error::ScoreError;
use crate::rank::{compute_ranks_with, RankConfig};

pub type RankCounts = BTreeMap<String, Values>;

/// Counts ranks into the `n_members + 1` bins of the canonical range
/// `1..=n_members + 1`. Bin edges sit at `k ± 0.5`, so a half-integer tie
/// rank lands in the upper bin. NaN ranks are skipped.
///
/// Ties therefore lean upward: if the truth equals every member (e.g. all
/// zero precipitation) the rank is `(n_members + 2) / 2`; for odd
/// `n_members` that is a half rank between the two middle bins and it is
/// always counted in the upper one.
pub fn bin_ranks<S, D>(ranks: &ArrayBase<S, D>, n_members: usize) -> Array1<i64>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let mut counts = Array1::<i64>::zeros(n_members + 1);
    for &rank in ranks.iter() {
        if rank.is_nan() {
            continue;
        }
        let bin = (rank + 0.5).floor() - 1.0;
        if bin < 0.0 || bin > n_members as f64 {
            warn!("rank {rank} outside 1..={}, skipped", n_members + 1);
            continue;
        }
        counts[bin as usize] += 1;
    }
    counts
}

pub fn rank_counts(
    ground_truth: &Dataset,
    ensemble_data: &Dataset,
) -> Result<RankCounts, ScoreError> {
    rank_counts_with(ground_truth, ensemble_data, &RankConfig::default())
}

pub fn rank_counts_with(
    ground_truth: &Dataset,
    ensemble_data: &Dataset,
    config: &RankConfig,
) -> Result<RankCounts, ScoreError> {
    let ranks = compute_ranks_with(ground_truth, ensemble_data, config)?;
    let n_members = ensemble_data
        .len_of(&config.member_dim)
        .ok_or_else(|| ScoreError::MissingCoordinate {
            dim: config.member_dim.clone(),
        })?;

    let vars: Vec<(&str, &Variable)> = ranks.vars().collect();
    let counts: RankCounts = vars
        .par_iter()
        .map(|(name, var)| {
            let binned = bin_ranks(&var.values().to_f64(), n_members);
            trace!("rank counts for '{name}': {binned}");
            (name.to_string(), Values::from(binned))
        })
        .collect();
    Ok(counts)
}
