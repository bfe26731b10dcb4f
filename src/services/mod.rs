pub mod dunning;
pub mod processor;

pub use processor::{PledgeProcessor, ProcessReport};
