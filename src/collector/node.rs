//! Node collectors for measuring latency between cluster nodes.
//!
//! - [`NodeCollector`]: runs every configured probe against every known node

mod collector;

pub use collector::NodeCollector;
