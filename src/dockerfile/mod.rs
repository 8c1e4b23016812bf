//! Dockerfile and `.dockerignore` generation.
//!
//! The pieces compose one way: fragment builders and the plan assembler live
//! in [`generator`], ephemeral build inputs go through [`staging`], model
//! weight isolation is handled by [`weights`], and [`ignorefile`] derives the
//! matching context exclusions.

mod generator;
mod ignorefile;
mod staging;
mod weights;

pub use generator::{Generator, WeightsBuildPlan};
pub use ignorefile::{dockerignore_for_weights, DOCKERIGNORE_HEADER};
pub use staging::TempStaging;
pub use weights::{StaticWeights, WeightClassifier, WeightSet};

/// BuildKit frontend directive emitted at the top of every plan.
pub(crate) const SYNTAX_DIRECTIVE: &str = "#syntax=docker/dockerfile:1.4";

/// Root inside the image where the build context and weights land.
pub const SOURCE_ROOT: &str = "/src";

/// Maps a context-relative path to its location under the image source root.
pub(crate) fn source_path(relative: &str) -> String {
    format!("{SOURCE_ROOT}/{}", relative.trim_start_matches('/'))
}
