//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: lifecycle of a crawl run (init, running, checkpointing, done)
//! - `DomainState`: per-host request bookkeeping
//! - `DomainPacing`: shared, lock-guarded per-host spacing used by the fetcher

mod crawl_phase;
mod domain_state;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use domain_state::{DomainPacing, DomainState};
