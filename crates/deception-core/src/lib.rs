pub mod config;
pub mod entropy;
pub mod error;
pub mod event;
pub mod metrics;
pub mod probe;
#[cfg(test)]
mod tests;

pub use config::*;
pub use entropy::*;
pub use error::*;
pub use event::*;
pub use metrics::*;
pub use probe::*;
