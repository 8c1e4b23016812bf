//! Command handlers for the cogpack CLI.
//!
//! Handlers return process exit codes; all fallible work goes through
//! `anyhow` so error chains print with full context.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::cli::commands::{DockerfileArgs, OutputFormatArg};
use crate::config::BuildConfig;
use crate::dockerfile::{Generator, StaticWeights};

/// The documents one generation run produced.
#[derive(Debug, Serialize)]
struct GeneratedFiles {
    dockerfile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    weights_dockerfile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dockerignore: Option<String>,
}

/// Handles the `dockerfile` command.
pub fn handle_dockerfile(args: &DockerfileArgs) -> i32 {
    match run_dockerfile(args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}

fn run_dockerfile(args: &DockerfileArgs) -> Result<()> {
    let project_dir = args
        .project_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_dir.join("cog.yaml"));

    debug!(config = %config_path.display(), "loading build configuration");
    let contents = fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let config = BuildConfig::from_yaml(&contents)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;

    let generator = Generator::new(&config, &project_dir)?.with_classifier(StaticWeights::new(
        args.weight_dirs.clone(),
        args.weight_files.clone(),
    ));

    // Generation may fail; the staging directory is removed either way.
    let generated = generate_files(&generator, args);
    let cleanup = generator.cleanup();
    let files = generated?;
    cleanup.context("failed to remove staging directory")?;

    emit(args, &files)
}

fn generate_files(generator: &Generator<'_>, args: &DockerfileArgs) -> Result<GeneratedFiles> {
    match &args.separate_weights {
        Some(image_name) => {
            let plan = generator.generate(image_name)?;
            Ok(GeneratedFiles {
                dockerfile: plan.dockerfile,
                weights_dockerfile: Some(plan.weights_dockerfile),
                dockerignore: Some(plan.dockerignore),
            })
        }
        None => Ok(GeneratedFiles {
            dockerfile: generator.generate_without_separate_weights()?,
            weights_dockerfile: None,
            dockerignore: None,
        }),
    }
}

fn emit(args: &DockerfileArgs, files: &GeneratedFiles) -> Result<()> {
    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        fs::write(dir.join("Dockerfile"), &files.dockerfile)
            .with_context(|| format!("failed to write {}", dir.join("Dockerfile").display()))?;
        if let Some(weights) = &files.weights_dockerfile {
            fs::write(dir.join("Dockerfile.weights"), weights).with_context(|| {
                format!("failed to write {}", dir.join("Dockerfile.weights").display())
            })?;
        }
        if let Some(ignore) = &files.dockerignore {
            fs::write(dir.join(".dockerignore"), ignore).with_context(|| {
                format!("failed to write {}", dir.join(".dockerignore").display())
            })?;
        }
        info!(dir = %dir.display(), "wrote build files");
        return Ok(());
    }

    match args.format {
        OutputFormatArg::Json => {
            println!("{}", serde_json::to_string_pretty(files)?);
        }
        OutputFormatArg::Text => {
            if let Some(weights) = &files.weights_dockerfile {
                println!("=== Dockerfile.weights ===");
                println!("{weights}");
                println!("=== Dockerfile ===");
            }
            println!("{}", files.dockerfile);
            if let Some(ignore) = &files.dockerignore {
                println!("=== .dockerignore ===");
                print!("{ignore}");
            }
        }
    }
    Ok(())
}
