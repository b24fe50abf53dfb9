mod collector;
mod config;
mod errors;
mod reader;
mod service;
mod shutdown;
mod storage;
mod watch;
pub mod utils;

pub use collector::*;
pub use config::*;
pub use errors::*;
pub use reader::*;
pub use service::*;
pub use shutdown::*;
pub use storage::*;
pub use watch::*;

//-----------------------------------------------------------
// Test modules

#[cfg(test)]
mod service_test;
