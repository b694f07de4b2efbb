pub mod cache;
pub mod executor;
pub mod parser;

pub use cache::{CacheKey, CacheStats, ResultCache};
pub use executor::{QueryExecutor, QueryResult, evaluate};
pub use parser::{Literal, Operator, Predicate, QueryAst, parse_query};
