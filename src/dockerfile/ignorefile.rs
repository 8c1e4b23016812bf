//! `.dockerignore` synthesis for isolated-weights builds.

use crate::dockerfile::weights::WeightSet;

/// Fixed exclusions for python tooling artifacts and VCS metadata.
pub const DOCKERIGNORE_HEADER: &str = "# generated by cogpack
__pycache__
*.pyc
*.pyo
*.pyd
.Python
env
pip-log.txt
pip-delete-this-directory.txt
.tox
.coverage
.coverage.*
.cache
nosetests.xml
coverage.xml
*.cover
*.log
.git
.mypy_cache
.pytest_cache
.hypothesis
";

/// Derives the `.dockerignore` contents for a classified weight set.
///
/// Weights already live in their own stage, so the main build excludes them
/// from its context: the fixed header, then each weight directory (itself and
/// all nested contents) and each weight file, in classification order.
pub fn dockerignore_for_weights(set: &WeightSet) -> String {
    let mut contents = String::from(DOCKERIGNORE_HEADER);
    for path in &set.directories {
        contents.push_str(&format!("{path}\n{path}/**/*\n"));
    }
    for path in &set.files {
        contents.push_str(&format!("{path}\n"));
    }
    contents
}
