//! Create, list and terminate Spark clusters on AWS EMR by name, and submit
//! Spark jobs to them.
//!
//! A job submission uploads the jar to S3 and appends a `spark-submit` step
//! to the active cluster with the configured name. When no such cluster is
//! active, a new one is created with the step as its first step and it
//! terminates once the step is done.

pub mod cluster;
pub mod cmd;
pub mod emr;
pub mod error;
pub mod provision;
pub mod remote_config;
pub mod resource;
pub mod s3;
pub mod settings;
pub mod submit;

#[cfg(test)]
mod testing;

pub use cluster::SparkEmr;
pub use error::{Error, Result};
pub use settings::Settings;
