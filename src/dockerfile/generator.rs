//! Build plan assembly.
//!
//! [`Generator`] turns a [`BuildConfig`] into Dockerfile text. Each concern
//! (base image, init process, package installs, user run steps) is produced
//! as one fragment; assembly concatenates the non-empty fragments in a fixed
//! order. Two plan shapes exist: an inline plan that copies the whole context
//! in at the end, and a separate-weights plan that keeps model weights in
//! their own stage and copies them back by reference.

use std::path::PathBuf;

use tracing::debug;

use crate::config::{BuildConfig, RunItem};
use crate::dockerfile::ignorefile::dockerignore_for_weights;
use crate::dockerfile::staging::TempStaging;
use crate::dockerfile::weights::{weights_dockerfile, StaticWeights, WeightClassifier, WeightSet};
use crate::dockerfile::{source_path, SOURCE_ROOT, SYNTAX_DIRECTIVE};
use crate::error::{GenerateError, Result};

/// The server wheel baked into every image.
const COG_WHEEL: &[u8] = include_bytes!("../../embed/cog-0.0.1.dev-py3-none-any.whl");

/// Wheel name must be the full wheel format, pip refuses to install it
/// otherwise.
const COG_WHEEL_FILENAME: &str = "cog-0.0.1.dev-py3-none-any.whl";

/// Pinned init binary release fetched by the downloader stage.
const TINI_VERSION: &str = "0.19.0";

/// Stage name the main plan copies weights from.
const WEIGHTS_STAGE: &str = "weights";

/// Output of a separate-weights generation.
///
/// The weights Dockerfile is built and pushed by the caller first; the main
/// Dockerfile expects that image to exist under `<image>-weights`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightsBuildPlan {
    /// Dockerfile holding only the classified weight paths
    pub weights_dockerfile: String,
    /// Main Dockerfile, referencing the weights stage by name
    pub dockerfile: String,
    /// `.dockerignore` excluding the isolated weight paths
    pub dockerignore: String,
}

/// Dockerfile generator for one project directory.
///
/// A generator is bound to a configuration and a working directory and owns a
/// private staging area for ephemeral build inputs. It can produce plans any
/// number of times; callers must invoke [`Generator::cleanup`] exactly once
/// when the session ends, whether generation succeeded or not.
pub struct Generator<'a> {
    config: &'a BuildConfig,
    dir: PathBuf,

    // target platform for requirement resolution, overridable for tests
    os: String,
    arch: String,

    staging: TempStaging,
    classifier: Box<dyn WeightClassifier>,
}

impl<'a> Generator<'a> {
    /// Creates a generator and eagerly allocates its staging directory under
    /// `<dir>/.cog/tmp`.
    pub fn new(config: &'a BuildConfig, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let staging = TempStaging::create(&dir)?;
        Ok(Self {
            config,
            dir,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            staging,
            classifier: Box::new(StaticWeights::default()),
        })
    }

    /// Replaces the weight classifier used by separate-weights generation.
    pub fn with_classifier(mut self, classifier: impl WeightClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Overrides the target platform used for requirement resolution.
    pub fn with_target(mut self, os: impl Into<String>, arch: impl Into<String>) -> Self {
        self.os = os.into();
        self.arch = arch.into();
        self
    }

    /// The working directory this generator is bound to.
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Generates the shared plan body: every fragment except the final
    /// context copy, in the fixed assembly order.
    pub fn generate_base(&self) -> Result<String> {
        let base_image = self.base_image()?;
        let install_python = if self.config.build.gpu {
            self.install_python_cuda()
        } else {
            String::new()
        };
        let install_cog = self.install_cog()?;
        let apt_installs = self.apt_installs();
        let pip_installs = self.pip_installs()?;
        let run_commands = self.run_commands()?;

        Ok(join_fragments(vec![
            SYNTAX_DIRECTIVE.to_string(),
            self.tini_stage(),
            format!("FROM {base_image}"),
            self.preamble().to_string(),
            self.install_tini(),
            install_python,
            install_cog,
            apt_installs,
            pip_installs,
            run_commands,
            format!("WORKDIR {SOURCE_ROOT}"),
            "EXPOSE 5000".to_string(),
            r#"CMD ["python", "-m", "cog.server.http"]"#.to_string(),
        ]))
    }

    /// Generates a single inline Dockerfile with model weights left in the
    /// build context.
    pub fn generate_without_separate_weights(&self) -> Result<String> {
        let base = self.generate_base()?;
        Ok(join_fragments(vec![
            base,
            format!("COPY . {SOURCE_ROOT}"),
        ]))
    }

    /// Generates the separate-weights plan pair plus its `.dockerignore`.
    ///
    /// `image_name` is where the caller will tag and push the weights image;
    /// the main Dockerfile references it as `<image_name>-weights`.
    pub fn generate(&self, image_name: &str) -> Result<WeightsBuildPlan> {
        let (weights_dockerfile, weights) = self.generate_for_weights()?;

        let base_image = self.base_image()?;
        let install_python = if self.config.build.gpu {
            self.install_python_cuda()
        } else {
            String::new()
        };
        let install_cog = self.install_cog()?;
        let apt_installs = self.apt_installs();
        let pip_installs = self.pip_installs()?;
        let run_commands = self.run_commands()?;

        let mut fragments = vec![
            SYNTAX_DIRECTIVE.to_string(),
            format!("FROM {image_name}-weights AS {WEIGHTS_STAGE}"),
            self.tini_stage(),
            format!("FROM {base_image}"),
            self.preamble().to_string(),
            self.install_tini(),
            install_python,
            install_cog,
            apt_installs,
            pip_installs,
            run_commands,
        ];

        // one copy-by-reference per classified path, directories first
        for path in weights.iter_paths() {
            let dest = source_path(path);
            fragments.push(format!(
                "COPY --from={WEIGHTS_STAGE} --link {dest} {dest}"
            ));
        }

        fragments.extend([
            format!("WORKDIR {SOURCE_ROOT}"),
            "EXPOSE 5000".to_string(),
            r#"CMD ["python", "-m", "cog.server.http"]"#.to_string(),
            format!("COPY . {SOURCE_ROOT}"),
        ]);

        Ok(WeightsBuildPlan {
            weights_dockerfile,
            dockerfile: join_fragments(fragments),
            dockerignore: dockerignore_for_weights(&weights),
        })
    }

    /// Classifies the context once and builds the weights-only Dockerfile.
    /// The returned set is reused for copy-back and ignore synthesis so both
    /// see identical paths in identical order.
    fn generate_for_weights(&self) -> Result<(String, WeightSet)> {
        let weights = self.classifier.classify().map_err(|e| {
            GenerateError::io("failed to generate Dockerfile for model weights files", e)
        })?;
        debug!(
            directories = weights.directories.len(),
            files = weights.files.len(),
            "classified model weights"
        );
        Ok((weights_dockerfile(&weights), weights))
    }

    /// Removes the staging directory. Explicit and unconditional: run this on
    /// success and failure paths alike, exactly once.
    pub fn cleanup(&self) -> Result<()> {
        self.staging.cleanup()
    }

    #[cfg(test)]
    pub(crate) fn staging(&self) -> &TempStaging {
        &self.staging
    }

    fn base_image(&self) -> Result<String> {
        if self.config.build.gpu {
            self.config
                .cuda_base_image_tag()
                .map_err(|e| GenerateError::config("failed to resolve CUDA base image", e))
        } else {
            Ok(format!("python:{}", self.config.build.python_version))
        }
    }

    fn preamble(&self) -> &'static str {
        "ENV DEBIAN_FRONTEND=noninteractive\n\
         ENV PYTHONUNBUFFERED=1\n\
         ENV LD_LIBRARY_PATH=$LD_LIBRARY_PATH:/usr/lib/x86_64-linux-gnu:/usr/local/nvidia/lib64:/usr/local/nvidia/bin"
    }

    fn tini_stage(&self) -> String {
        [
            "FROM curlimages/curl AS downloader".to_string(),
            format!("ARG TINI_VERSION={TINI_VERSION}"),
            "WORKDIR /tmp".to_string(),
            r#"RUN curl -fsSL -O "https://github.com/krallin/tini/releases/download/v${TINI_VERSION}/tini-amd64" && chmod +x tini"#
                .to_string(),
        ]
        .join("\n")
    }

    fn install_tini(&self) -> String {
        // tini is the image entrypoint so the model server gets signal
        // handling and zombie reaping appropriate for PID 1
        [
            "COPY --link --from=downloader /tmp/tini /sbin/tini",
            r#"ENTRYPOINT ["/sbin/tini", "--"]"#,
        ]
        .join("\n")
    }

    fn install_python_cuda(&self) -> String {
        // Version validity is the build's problem, not generation's: pyenv
        // resolves the pin at build time.
        let py = &self.config.build.python_version;
        format!(
            r#"ENV PATH="/root/.pyenv/shims:/root/.pyenv/bin:$PATH"
RUN --mount=type=cache,target=/var/cache/apt apt-get update -qq && apt-get install -qqy --no-install-recommends \
	make \
	build-essential \
	libssl-dev \
	zlib1g-dev \
	libbz2-dev \
	libreadline-dev \
	libsqlite3-dev \
	wget \
	curl \
	llvm \
	libncurses5-dev \
	libncursesw5-dev \
	xz-utils \
	tk-dev \
	libffi-dev \
	liblzma-dev \
	git \
	ca-certificates \
	&& rm -rf /var/lib/apt/lists/*
RUN curl -s -S -L https://raw.githubusercontent.com/pyenv/pyenv-installer/master/bin/pyenv-installer | bash && \
	git clone https://github.com/momo-lab/pyenv-install-latest.git "$(pyenv root)"/plugins/pyenv-install-latest && \
	pyenv install-latest "{py}" && \
	pyenv global $(pyenv install-latest --print "{py}") && \
	pip install "wheel<1""#
        )
    }

    fn apt_installs(&self) -> String {
        let packages = &self.config.build.system_packages;
        if packages.is_empty() {
            return String::new();
        }
        format!(
            "RUN --mount=type=cache,target=/var/cache/apt apt-get update -qq && apt-get install -qqy {} && rm -rf /var/lib/apt/lists/*",
            packages.join(" ")
        )
    }

    fn install_cog(&self) -> Result<String> {
        let (copy_line, container_path) = self.staging.write(COG_WHEEL_FILENAME, COG_WHEEL)?;
        Ok([
            copy_line,
            format!("RUN --mount=type=cache,target=/root/.cache/pip pip install {container_path}"),
        ]
        .join("\n"))
    }

    fn pip_installs(&self) -> Result<String> {
        let requirements = self
            .config
            .python_requirements_for_arch(&self.os, &self.arch)
            .map_err(|e| GenerateError::config("failed to resolve python requirements", e))?;
        if requirements.trim().is_empty() {
            return Ok(String::new());
        }

        let (copy_line, container_path) =
            self.staging.write("requirements.txt", requirements.as_bytes())?;
        Ok([
            copy_line,
            format!(
                "RUN --mount=type=cache,target=/root/.cache/pip pip install -r {container_path}"
            ),
        ]
        .join("\n"))
    }

    fn run_commands(&self) -> Result<String> {
        let mut steps = self.config.build.run.clone();
        // older configurations declare pre_install instead of run
        for command in &self.config.build.pre_install {
            steps.push(RunItem::command(command.clone()));
        }

        let mut lines = Vec::with_capacity(steps.len());
        for step in &steps {
            let command = step.command.trim();
            if command.contains('\n') {
                return Err(GenerateError::Validation(format!(
                    "one of the commands in 'run' contains a new line, which won't work; \
                     declare a separate list item per command. \
                     This is the offending command: {command}"
                )));
            }

            let mounts: Vec<String> = step
                .mounts
                .iter()
                .filter(|mount| mount.mount_type == "secret")
                .map(|mount| {
                    format!("--mount=type=secret,id={},target={}", mount.id, mount.target)
                })
                .collect();

            if mounts.is_empty() {
                lines.push(format!("RUN {command}"));
            } else {
                lines.push(format!("RUN {} {command}", mounts.join(" ")));
            }
        }
        Ok(lines.join("\n"))
    }
}

/// Joins fragments with newlines, dropping the empty ones so omitted concerns
/// leave no stray separators.
fn join_fragments(fragments: Vec<String>) -> String {
    fragments
        .into_iter()
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
