//! # skilldex - Skill Document Index
//!
//! skilldex flattens a directory of skill-definition documents (JSON files
//! describing game abilities as tracks of timed actions) into an in-memory
//! index of action records, and answers small filter queries over it.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Corpus scanning, flattening, snapshots, statistics and detail lookup
//! - [`query`] - Query parsing, evaluation and the result cache
//! - [`engine`] - The [`SkillIndex`] facade tying them together
//! - [`output`] - Result formatting for the CLI
//! - [`utils`] - Configuration and application data directories
//!
//! ## Quick Start
//!
//! ```no_run
//! use skilldex::{AppConfig, SkillIndex};
//!
//! let index = SkillIndex::new("/path/to/skills", AppConfig::default());
//! let stats = index.build_index(false).unwrap();
//! println!("{} actions in {} files", stats.total_actions, stats.indexed_files);
//!
//! let result = index.query("DamageAction where baseDamage > 100", 20).unwrap();
//! for record in &result.results {
//!     println!("{}:{} {}", record.skill_file, record.json_path, record.summary);
//! }
//! ```
//!
//! ## Snapshots
//!
//! Every build produces an immutable [`IndexSnapshot`]. Queries run against
//! whichever snapshot was active when they started; a rebuild swaps in the
//! next one and clears the result cache. Unchanged files are carried over
//! from the previous snapshot, or from the on-disk artifact on a fresh start.

pub mod engine;
pub mod error;
pub mod index;
pub mod output;
pub mod query;
pub mod utils;

pub use engine::SkillIndex;
pub use error::{IndexError, QuerySyntaxError};
pub use index::{ActionDetail, ActionRecord, IndexBuildStats, IndexSnapshot, StatsResult};
pub use query::{CacheStats, QueryResult, parse_query};
pub use utils::AppConfig;
