pub mod dataset;
pub mod entropy;
pub mod error;
pub mod histogram;
pub mod rank;

pub use dataset::{DType, Dataset, Label, Values, Variable};
pub use entropy::{
    entropy_of_distributions, entropy_of_rank_counts, max_entropy, rank_histogram_entropy,
    shannon_entropy,
};
pub use error::ScoreError;
pub use histogram::{rank_counts, RankCounts};
pub use rank::{compute_ranks, rank_data, RankConfig};
