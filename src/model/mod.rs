//! Data model shared by every component: attribute names, pools and rows.

mod field;
mod pool;
mod row;

pub use field::Field;
pub use pool::{PoolCatalogue, PoolItem};
pub use row::{Diagnostics, QuotaMeta, QuotaNeed, Rail, Row, RuleHit, SimilarityKey};
