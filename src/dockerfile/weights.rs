//! Model weight partitioning.
//!
//! Large weight artifacts are split into their own build stage so the build
//! engine can cache and distribute them independently of application code
//! changes. Which paths count as weights is decided by an external detection
//! algorithm consumed here behind the [`WeightClassifier`] seam.

use crate::dockerfile::{source_path, SYNTAX_DIRECTIVE};

/// Ordered sets of context-relative paths classified as model weights.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightSet {
    /// Weight directories, copied recursively
    pub directories: Vec<String>,
    /// Individual weight files
    pub files: Vec<String>,
}

impl WeightSet {
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    /// All classified paths, directories first, in classification order.
    pub fn iter_paths(&self) -> impl Iterator<Item = &str> {
        self.directories
            .iter()
            .chain(self.files.iter())
            .map(String::as_str)
    }
}

/// Abstraction over the weight-detection algorithm for testability and so the
/// filesystem walk stays outside the generator.
pub trait WeightClassifier {
    /// Classifies the build context into weight directories and files.
    fn classify(&self) -> std::io::Result<WeightSet>;
}

/// Classifier backed by explicit path lists, used by the CLI flags and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticWeights {
    set: WeightSet,
}

impl StaticWeights {
    pub fn new(directories: Vec<String>, files: Vec<String>) -> Self {
        Self {
            set: WeightSet { directories, files },
        }
    }
}

impl WeightClassifier for StaticWeights {
    fn classify(&self) -> std::io::Result<WeightSet> {
        Ok(self.set.clone())
    }
}

/// Builds the minimal Dockerfile that holds only the classified weights.
///
/// The stage starts from an empty image and places every path at its own
/// relative location under the image source root, so the main plan can copy
/// each one back by reference.
pub(crate) fn weights_dockerfile(set: &WeightSet) -> String {
    let mut contents = format!("{SYNTAX_DIRECTIVE}\nFROM scratch\n");
    for path in set.iter_paths() {
        contents.push_str(&format!("\nCOPY {path} {}", source_path(path)));
    }
    contents
}
