use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Dockerfile generation for machine-learning model serving containers
#[derive(Parser, Debug)]
#[command(
    name = "cogpack",
    about = "Dockerfile generation for machine-learning model serving containers",
    version,
    long_about = "cogpack reads a declarative build configuration and produces the container \
                  build instructions for a reproducible image that serves a model over HTTP. \
                  Model weights can optionally be isolated into their own image so the build \
                  engine caches them independently of code changes."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate the Dockerfile for a model project",
        long_about = "Generates the Dockerfile (and, with --separate-weights, the weights-image \
                      Dockerfile and .dockerignore) for a model project.\n\n\
                      Examples:\n  \
                      cogpack dockerfile\n  \
                      cogpack dockerfile /path/to/project\n  \
                      cogpack dockerfile --separate-weights registry.example.com/llama \\\n      \
                      --weight-dir weights --weight-file model.bin -o build/"
    )]
    Dockerfile(DockerfileArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct DockerfileArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the project directory (defaults to current directory)"
    )]
    pub project_dir: Option<PathBuf>,

    #[arg(
        short = 'c',
        long,
        value_name = "FILE",
        help = "Configuration file (defaults to cog.yaml in the project directory)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "IMAGE",
        help = "Isolate model weights into their own image; IMAGE is where the caller will push it"
    )]
    pub separate_weights: Option<String>,

    #[arg(
        long = "weight-dir",
        value_name = "PATH",
        help = "Context-relative directory holding model weights (repeatable)"
    )]
    pub weight_dirs: Vec<String>,

    #[arg(
        long = "weight-file",
        value_name = "PATH",
        help = "Context-relative model weight file (repeatable)"
    )]
    pub weight_files: Vec<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Write the generated files into DIR instead of printing them"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "text",
        help = "Output format when printing to stdout"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormatArg {
    Text,
    Json,
}
