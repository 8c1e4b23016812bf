//! cogpack - Dockerfile generation for machine-learning model servers
//!
//! This library turns a declarative build configuration into the container
//! build instructions (a Dockerfile and its `.dockerignore`) for a
//! reproducible image that serves a model over HTTP.
//!
//! # Core Concepts
//!
//! - **Build plan**: Dockerfile text assembled from per-concern fragments in
//!   a fixed order (base image, init process, package installs, user steps)
//! - **Weight isolation**: large model-weight paths can be split into their
//!   own build stage/image so the build engine caches and distributes them
//!   independently of application code changes
//! - **Staging**: ephemeral build inputs (the embedded server wheel, the
//!   rendered requirements file) are written under `.cog/tmp` inside the
//!   build context and removed by an explicit cleanup call
//!
//! # Example Usage
//!
//! ```no_run
//! use cogpack::{BuildConfig, Generator};
//!
//! fn generate(config: &BuildConfig) -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = Generator::new(config, ".")?;
//!     let result = generator.generate_without_separate_weights();
//!     // cleanup runs unconditionally, whether generation succeeded or not
//!     generator.cleanup()?;
//!     let dockerfile = result?;
//!     std::fs::write("Dockerfile", dockerfile)?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod dockerfile;
pub mod error;
pub mod util;

pub use config::{BuildConfig, ConfigError, RunItem, RunMount};
pub use dockerfile::{
    Generator, StaticWeights, WeightClassifier, WeightSet, WeightsBuildPlan,
};
pub use error::{GenerateError, Result};

/// Crate version, exposed for the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
