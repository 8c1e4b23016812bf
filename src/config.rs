//! Build configuration model for cogpack
//!
//! This module defines the declarative configuration a model author ships with
//! their project. The generator treats a loaded [`BuildConfig`] as read-only
//! input; validation of the surrounding project layout happens elsewhere.
//!
//! # Example
//!
//! ```yaml
//! build:
//!   gpu: true
//!   python_version: "3.10"
//!   cuda: "11.8"
//!   system_packages:
//!     - libgl1-mesa-glx
//!   python_packages:
//!     - torch==2.0.1
//!   run:
//!     - echo hello
//!     - command: pip config set global.index-url $MIRROR
//!       mounts:
//!         - type: secret
//!           id: mirror
//!           target: /run/secrets/mirror
//! ```
//!
//! A `run` step deserializes from either a bare string or a map with an
//! explicit `command` and optional `mounts`.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

/// Interpreter version used when the configuration does not pin one.
const DEFAULT_PYTHON_VERSION: &str = "3.8";

/// Known CUDA release lines and the Ubuntu LTS their published devel images
/// are built on. Resolution matches on the configured version prefix.
const CUDA_UBUNTU_RELEASES: &[(&str, &str)] = &[
    ("12.1", "22.04"),
    ("12.0", "22.04"),
    ("11.8", "22.04"),
    ("11.7", "22.04"),
    ("11.6", "20.04"),
    ("11.3", "20.04"),
    ("11.2", "20.04"),
    ("11.1", "20.04"),
    ("11.0", "20.04"),
    ("10.2", "18.04"),
    ("10.1", "18.04"),
];

/// cuDNN major version assumed when the configuration does not pin one.
const DEFAULT_CUDNN_VERSION: &str = "8";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// GPU build requested without a CUDA pin to resolve an image from
    #[error("GPU builds require a CUDA version; set build.cuda")]
    MissingCudaVersion,

    /// No published base image for the pinned CUDA/cuDNN combination
    #[error("no known base image for CUDA {cuda} with cuDNN {cudnn}")]
    UnsupportedCudaVersion { cuda: String, cudnn: String },

    /// A declared python package cannot be rendered into a requirements file
    #[error("invalid python package specifier: {package:?}")]
    InvalidPythonPackage { package: String },
}

/// Top-level project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Build environment description
    #[serde(default)]
    pub build: BuildSection,

    /// Image name the project is published under, if declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Reference to the predictor entrypoint, if declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predict: Option<String>,
}

/// The `build` section: everything needed to assemble the serving image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Build for an accelerator (CUDA) runtime
    #[serde(default)]
    pub gpu: bool,

    /// Python interpreter version, e.g. "3.10"
    #[serde(default = "default_python_version")]
    pub python_version: String,

    /// CUDA toolkit version pin, required for GPU builds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuda: Option<String>,

    /// cuDNN major version pin; defaults to 8 when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cudnn: Option<String>,

    /// Apt packages installed into the image
    #[serde(default)]
    pub system_packages: Vec<String>,

    /// Python package requirements installed with pip
    #[serde(default)]
    pub python_packages: Vec<String>,

    /// Ordered shell steps run while building the image
    #[serde(default)]
    pub run: Vec<RunItem>,

    /// Legacy pre-install commands, kept for older configurations; appended
    /// after `run` as plain steps
    #[serde(default)]
    pub pre_install: Vec<String>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            gpu: false,
            python_version: default_python_version(),
            cuda: None,
            cudnn: None,
            system_packages: Vec::new(),
            python_packages: Vec::new(),
            run: Vec::new(),
            pre_install: Vec::new(),
        }
    }
}

fn default_python_version() -> String {
    DEFAULT_PYTHON_VERSION.to_string()
}

/// One build-time shell step, optionally with build mounts.
#[derive(Debug, Clone, Serialize)]
pub struct RunItem {
    /// Shell command executed by the build engine
    pub command: String,

    /// Build mounts exposed to this command
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<RunMount>,
}

impl RunItem {
    /// A plain step with no mounts.
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            mounts: Vec::new(),
        }
    }
}

impl<'de> Deserialize<'de> for RunItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Command(String),
            Full {
                command: String,
                #[serde(default)]
                mounts: Vec<RunMount>,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Command(command) => RunItem {
                command,
                mounts: Vec::new(),
            },
            Raw::Full { command, mounts } => RunItem { command, mounts },
        })
    }
}

/// A build mount attached to a run step. Only `secret` mounts are rendered
/// into the build plan; other types pass through unrendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMount {
    /// Mount type, e.g. "secret"
    #[serde(rename = "type")]
    pub mount_type: String,

    /// Identifier the build engine resolves the mount contents from
    pub id: String,

    /// Path the mount appears at inside the build step
    pub target: String,
}

impl BuildConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Resolves the tagged CUDA base image for a GPU build.
    ///
    /// The configured CUDA version is matched by prefix against the known
    /// release lines so a pin like `"11.8"` or `"11.8.0"` both resolve.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when no CUDA version is configured or the
    /// CUDA/cuDNN combination has no published image.
    pub fn cuda_base_image_tag(&self) -> Result<String, ConfigError> {
        let cuda = self
            .build
            .cuda
            .as_deref()
            .ok_or(ConfigError::MissingCudaVersion)?;
        let cudnn = self
            .build
            .cudnn
            .as_deref()
            .unwrap_or(DEFAULT_CUDNN_VERSION);

        let ubuntu = CUDA_UBUNTU_RELEASES
            .iter()
            .find(|(release, _)| cuda.starts_with(release))
            .map(|(_, ubuntu)| *ubuntu)
            .ok_or_else(|| ConfigError::UnsupportedCudaVersion {
                cuda: cuda.to_string(),
                cudnn: cudnn.to_string(),
            })?;

        // Published devel tags carry a patch component
        let cuda_tag = if cuda.matches('.').count() >= 2 {
            cuda.to_string()
        } else {
            format!("{cuda}.0")
        };

        Ok(format!(
            "nvidia/cuda:{cuda_tag}-cudnn{cudnn}-devel-ubuntu{ubuntu}"
        ))
    }

    /// Renders the python requirements file contents for a target platform.
    ///
    /// OS and architecture are supplied independently by the caller; they are
    /// the seam for platform-specific requirement pinning. A blank result
    /// means there is nothing to install.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a declared package specifier cannot be
    /// written as a single requirements line.
    pub fn python_requirements_for_arch(
        &self,
        os: &str,
        arch: &str,
    ) -> Result<String, ConfigError> {
        debug!(os, arch, "resolving python requirements");

        for package in &self.build.python_packages {
            if package.trim().is_empty() || package.contains('\n') {
                return Err(ConfigError::InvalidPythonPackage {
                    package: package.clone(),
                });
            }
        }

        Ok(self.build.python_packages.join("\n"))
    }
}
