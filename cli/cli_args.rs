use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .xtools/xpack/xpack.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config_file",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub disable_config_file: bool,

    #[arg(
        long,
        help = "Label shown as the source in the summary (default: directory path or URL).",
        value_name = "LABEL",
        help_heading = "Project Setup"
    )]
    pub display_name: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterOpts {
    #[arg(
        short = 'i',
        long,
        value_name = "CSV",
        action = clap::ArgAction::Append,
        help = "Comma-separated glob patterns; only matching files are packed.",
        help_heading = "Filtering"
    )]
    pub include: Vec<String>,

    #[arg(
        long,
        value_name = "CSV",
        action = clap::ArgAction::Append,
        help = "Comma-separated glob patterns to ignore.",
        help_heading = "Filtering"
    )]
    pub ignore: Vec<String>,

    #[arg(
        long,
        help = "Do not apply the built-in ignore patterns (e.g. node_modules/, *.lock).",
        help_heading = "Filtering"
    )]
    pub no_default_patterns: bool,

    #[arg(
        long,
        help = "Do not read .gitignore / .xpackignore files while scanning.",
        help_heading = "Filtering"
    )]
    pub no_rule_files: bool,

    #[arg(
        long,
        value_name = "SIZE",
        help = "Skip files larger than SIZE at scan time (e.g. '512KiB') [default: 1MiB].",
        help_heading = "Filtering"
    )]
    pub max_file_size: Option<String>,

    #[arg(
        long,
        value_name = "SIZE",
        help = "Refuse to read files larger than SIZE [default: 5MiB].",
        help_heading = "Filtering"
    )]
    pub max_read_size: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "xpack",
    author,
    version,
    about = "Pack a source tree into a single document for AI models.",
    long_about = "xpack walks a local directory or a shallow clone of a remote repository, \napplies default, caller and per-directory ignore rules, and writes every surviving \ntext file into one XML, Markdown, plain text or JSON document.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  xpack pack . -f markdown -o context.md\n  xpack pack --remote owner/repo --stdout\n  xpack metrics src\n  xpack debug -i '*.rs'",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv, -vvv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(visible_alias = "p", about = "Pack a directory or remote repository.")]
    Pack(PackArgs),

    #[command(
        visible_alias = "m",
        about = "Show per-file lines, sizes and estimated tokens."
    )]
    Metrics(MetricsArgs),

    #[command(
        visible_alias = "d",
        about = "Show the effective request, ignore patterns and files that would be packed."
    )]
    Debug(DebugArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    #[arg(
        value_name = "DIR",
        conflicts_with = "remote",
        help = "Directory to pack (default: current dir)."
    )]
    pub dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "URL",
        help = "Shallow-clone and pack a remote repository (URL or owner/repo).",
        help_heading = "Source"
    )]
    pub remote: Option<String>,

    #[arg(
        long,
        value_name = "REF",
        requires = "remote",
        help = "Branch or tag to clone with --remote.",
        help_heading = "Source"
    )]
    pub remote_branch: Option<String>,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,

    #[arg(short = 'f', long, value_name = "FORMAT", value_parser = ["xml", "markdown", "plain", "json"], help = "Set the output format [default: xml].", help_heading = "Output")]
    pub format: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the document to FILE.",
        help_heading = "Output"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Print the document to standard output even if an output file is configured.",
        conflicts_with = "output",
        help_heading = "Output"
    )]
    pub stdout: bool,

    #[arg(
        long,
        help = "Also copy the document to the system clipboard.",
        help_heading = "Output"
    )]
    pub copy: bool,

    #[arg(
        long,
        help = "Strip comments from files with a known language.",
        help_heading = "Content"
    )]
    pub remove_comments: bool,

    #[arg(long, help = "Drop whitespace-only lines.", help_heading = "Content")]
    pub remove_empty_lines: bool,

    #[arg(
        long,
        help = "Omit the file summary section.",
        help_heading = "Content"
    )]
    pub no_summary: bool,

    #[arg(
        long,
        help = "Omit the directory structure section.",
        help_heading = "Content"
    )]
    pub no_directory_structure: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    #[arg(value_name = "DIR", help = "Directory to measure (default: current dir).")]
    pub dir: Option<PathBuf>,
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
    #[arg(long, help = "Print JSON instead of a table.")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DebugArgs {
    #[arg(value_name = "DIR", help = "Directory to inspect (default: current dir).")]
    pub dir: Option<PathBuf>,
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
    #[arg(long, help = "Print JSON instead of pretty text.")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(value_name = "DIR", help = "Project directory used with --save (default: current dir).")]
    pub dir: Option<PathBuf>,
    #[arg(
        long,
        help = "Save the default config to .xtools/xpack/xpack.toml (prompts overwrite)."
    )]
    pub save: bool,
}
