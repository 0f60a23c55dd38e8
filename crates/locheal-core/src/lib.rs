#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod attributes;
pub mod captures;
pub mod chunker;
pub mod config;
pub mod error;
pub mod page;
pub mod traits;
pub mod types;

pub use attributes::HealTargets;
pub use config::{Config, HealerConfig, RetrievalConfig, RetrievalStrategy};
pub use error::{Error, Result};
pub use types::{AutomationType, Chunk, ContextStats, HealResult, LocatorAttributes, MatchedNode, PageAnalysis, ParseMode, ScoredChunk};
