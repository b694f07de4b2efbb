pub mod artifact;
pub mod build;
pub mod detail;
pub mod stats;
pub mod store;
pub mod types;

pub use build::{Baseline, BuildOptions, build_snapshot};
pub use detail::{ActionDetail, get_action_detail};
pub use stats::{GroupStats, StatsResult, get_statistics};
pub use store::IndexStore;
pub use types::*;
