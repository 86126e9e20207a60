use std::collections::BTreeSet;

use log::debug;
use ndarray::{Array1, ArrayBase, Data, Ix1};

use crate::dataset::{Dataset, Label};
use crate::error::ScoreError;

pub const MEMBER_DIM: &str = "ensemble_member";
pub const TIME_DIM: &str = "init_time";
pub const TRUTH_SENTINEL: i64 = -1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankConfig {
    pub member_dim: String,
    pub time_dim: String,
    pub sentinel: i64,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            member_dim: MEMBER_DIM.to_string(),
            time_dim: TIME_DIM.to_string(),
            sentinel: TRUTH_SENTINEL,
        }
    }
}

/// 1-based ranks with ties sharing the average of their positions.
/// NaN entries keep a NaN rank and do not take part in the ordering.
pub fn rank_data<S>(data: &ArrayBase<S, Ix1>) -> Array1<f64>
where
    S: Data<Elem = f64>,
{
    let mut indexed_data: Vec<(usize, f64)> = data
        .iter()
        .cloned()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .collect();
    indexed_data.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ranks = Array1::from_elem(data.len(), f64::NAN);
    let n = indexed_data.len();
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && indexed_data[j].1 == indexed_data[j + 1].1 {
            j += 1;
        }
        let rank = (i + 1..=j + 1).sum::<usize>() as f64 / (j - i + 1) as f64;
        for &(idx, _) in &indexed_data[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

fn owned(set: &BTreeSet<&str>) -> Vec<String> {
    set.iter().map(|d| d.to_string()).collect()
}

fn check_dims(which: &str, dataset: &Dataset, expected: &BTreeSet<&str>) -> Result<(), ScoreError> {
    let dims = dataset.dims();
    if dims != *expected {
        return Err(ScoreError::DimensionMismatch {
            dataset: which.to_string(),
            expected: owned(expected),
            found: owned(&dims),
        });
    }
    for (name, var) in dataset.vars() {
        let found: BTreeSet<&str> = var.dims().iter().map(String::as_str).collect();
        if found != *expected {
            return Err(ScoreError::DimensionMismatch {
                dataset: format!("{which} variable '{name}'"),
                expected: owned(expected),
                found: owned(&found),
            });
        }
    }
    Ok(())
}

pub fn compute_ranks(
    ground_truth: &Dataset,
    ensemble_data: &Dataset,
) -> Result<Dataset, ScoreError> {
    compute_ranks_with(ground_truth, ensemble_data, &RankConfig::default())
}

pub fn compute_ranks_with(
    ground_truth: &Dataset,
    ensemble_data: &Dataset,
    config: &RankConfig,
) -> Result<Dataset, ScoreError> {
    let expected: BTreeSet<&str> = [config.member_dim.as_str(), config.time_dim.as_str()]
        .into_iter()
        .collect();
    check_dims("ground truth", ground_truth, &expected)?;
    check_dims("ensemble", ensemble_data, &expected)?;

    let truth = ground_truth.assign_coord(&config.member_dim, [config.sentinel])?;
    let combined = Dataset::concat(&[&truth, ensemble_data], &config.member_dim)?;
    debug!(
        "ranking truth among {} ensemble members for {} variables",
        ensemble_data.len_of(&config.member_dim).unwrap_or(0),
        combined.var_names().len()
    );

    combined
        .rank(&config.member_dim)?
        .sel(&config.member_dim, &Label::Int(config.sentinel))
}
