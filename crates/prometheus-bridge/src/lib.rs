pub mod metrics;
pub mod sink;
#[cfg(test)]
mod tests;

pub use metrics::{encode_text, LoopMetrics};
pub use sink::PrometheusSink;
