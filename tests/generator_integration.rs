//! End-to-end Dockerfile generation tests
//!
//! These tests exercise the public API the way the CLI does: load a YAML
//! configuration, generate plans against a real working directory, and clean
//! up the staging area afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use cogpack::dockerfile::DOCKERIGNORE_HEADER;
use cogpack::{BuildConfig, Generator, StaticWeights};
use yare::parameterized;

/// Finds the staging directory a generator session allocated under the
/// project's scratch root.
fn staging_dirs(project_dir: &Path) -> Vec<PathBuf> {
    let root = project_dir.join(".cog/tmp");
    if !root.is_dir() {
        return Vec::new();
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    dirs.sort();
    dirs
}

#[parameterized(
    python_3_8 = { "3.8" },
    python_3_10 = { "3.10" },
    python_3_11 = { "3.11" },
)]
fn test_base_image_follows_python_version(version: &str) {
    let config = BuildConfig::from_yaml(&format!(
        "build:\n  python_version: \"{version}\"\n"
    ))
    .unwrap();
    let project = tempfile::tempdir().unwrap();

    let generator = Generator::new(&config, project.path()).unwrap();
    let dockerfile = generator.generate_without_separate_weights().unwrap();
    generator.cleanup().unwrap();

    assert!(dockerfile.contains(&format!("\nFROM python:{version}\n")));
}

#[test]
fn test_full_configuration_inline_plan() {
    let yaml = r#"
build:
  gpu: false
  python_version: "3.10"
  system_packages:
    - ffmpeg
  python_packages:
    - pillow==10.0.0
  run:
    - echo hello
    - command: curl -s https://example.com/setup.sh | sh
      mounts:
        - type: secret
          id: setup-token
          target: /run/secrets/setup-token
  pre_install:
    - echo legacy
"#;
    let config = BuildConfig::from_yaml(yaml).unwrap();
    let project = tempfile::tempdir().unwrap();

    let generator = Generator::new(&config, project.path())
        .unwrap()
        .with_target("linux", "x86_64");
    let dockerfile = generator.generate_without_separate_weights().unwrap();

    // staged inputs exist on disk while the session is alive
    let staged = &staging_dirs(project.path())[0];
    assert!(staged.join("cog-0.0.1.dev-py3-none-any.whl").is_file());
    assert_eq!(
        fs::read_to_string(staged.join("requirements.txt")).unwrap(),
        "pillow==10.0.0"
    );

    // fragment order: apt before pip, pip before user run steps
    let apt = dockerfile.find("apt-get install -qqy ffmpeg").unwrap();
    let pip = dockerfile.find("pip install -r /tmp/requirements.txt").unwrap();
    let run = dockerfile.find("RUN echo hello").unwrap();
    assert!(apt < pip && pip < run);

    assert!(dockerfile.contains(
        "RUN --mount=type=secret,id=setup-token,target=/run/secrets/setup-token \
         curl -s https://example.com/setup.sh | sh"
    ));
    assert!(dockerfile.contains("RUN echo legacy"));
    assert!(dockerfile.ends_with("COPY . /src"));

    generator.cleanup().unwrap();
    assert!(staging_dirs(project.path()).is_empty());
}

#[test]
fn test_separate_weights_plan_documents() {
    let config = BuildConfig::from_yaml("build:\n  python_version: \"3.10\"\n").unwrap();
    let project = tempfile::tempdir().unwrap();

    let generator = Generator::new(&config, project.path())
        .unwrap()
        .with_target("linux", "x86_64")
        .with_classifier(StaticWeights::new(
            vec!["weights".to_string()],
            vec!["model.bin".to_string()],
        ));

    let plan = generator.generate("registry.example.com/llama").unwrap();
    generator.cleanup().unwrap();

    assert_eq!(
        plan.weights_dockerfile,
        "#syntax=docker/dockerfile:1.4\nFROM scratch\n\
         \nCOPY weights /src/weights\nCOPY model.bin /src/model.bin"
    );
    assert_eq!(
        plan.dockerignore,
        format!("{DOCKERIGNORE_HEADER}weights\nweights/**/*\nmodel.bin\n")
    );

    let copy_back_count = plan
        .dockerfile
        .lines()
        .filter(|line| line.starts_with("COPY --from=weights --link"))
        .count();
    assert_eq!(copy_back_count, 2);
    assert!(plan
        .dockerfile
        .starts_with("#syntax=docker/dockerfile:1.4\nFROM registry.example.com/llama-weights AS weights\n"));
}

#[test]
fn test_failed_generation_leaves_staging_for_explicit_cleanup() {
    let config =
        BuildConfig::from_yaml("build:\n  run:\n    - \"echo one\\necho two\"\n").unwrap();
    let project = tempfile::tempdir().unwrap();

    let generator = Generator::new(&config, project.path()).unwrap();
    let err = generator.generate_without_separate_weights().unwrap_err();
    assert!(err.to_string().contains("echo one"));

    // no implicit removal on failure; cleanup stays the caller's job
    assert_eq!(staging_dirs(project.path()).len(), 1);
    generator.cleanup().unwrap();
    assert!(staging_dirs(project.path()).is_empty());
}

#[test]
fn test_concurrent_sessions_get_private_staging() {
    let config = BuildConfig::default();
    let project = tempfile::tempdir().unwrap();

    let first = Generator::new(&config, project.path()).unwrap();
    let second = Generator::new(&config, project.path()).unwrap();
    assert_eq!(staging_dirs(project.path()).len(), 2);

    first.cleanup().unwrap();
    assert_eq!(staging_dirs(project.path()).len(), 1);
    second.cleanup().unwrap();
    assert!(staging_dirs(project.path()).is_empty());
}
