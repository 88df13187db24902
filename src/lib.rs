pub mod archive;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod policy;
pub mod report;
pub mod reshape;
pub mod synth;
pub mod util;

pub use error::{Error, Result};
pub use handler::ReportHandler;
pub use report::{Observation, Report};
