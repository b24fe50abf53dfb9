//! Collector module
//!
//! The heart of the pipeline: change events from the watch stream are
//! merged into per-second buckets, finalized buckets move to the history
//! store on a timer, and a periodic report summarizes what is stored.

mod collector;
mod event;
mod scheduler;

#[cfg(test)]
mod collector_test;

pub use collector::*;
pub use event::*;
pub use scheduler::*;
