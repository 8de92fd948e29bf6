use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "arbor",
    about = "Arbor: build, inspect and drive a node tree",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with layers and demo states
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the layer roots and print the tree
    Show,
    /// Advance the demo state machine and print every transition
    Progress(ProgressArgs),
    /// Print the relative path between two nodes of a layer
    Path(PathArgs),
}

#[derive(Args)]
pub struct ProgressArgs {
    #[arg(short = 'n', long, default_value = "1")]
    pub steps: usize,
    #[arg(long, allow_hyphen_values = true)]
    pub start: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    pub end: Option<i64>,
}

#[derive(Args)]
pub struct PathArgs {
    /// Full path of the starting node ("" is the layer root)
    pub from: String,
    /// Full path of the target node
    pub to: String,
    /// Layer to resolve in; the first layer by default
    #[arg(long)]
    pub layer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_with_negative_margin() {
        let cli = Cli::parse_from(["arbor", "progress", "--steps", "3", "--end", "-1"]);
        match cli.command {
            Command::Progress(args) => {
                assert_eq!(args.steps, 3);
                assert_eq!(args.start, None);
                assert_eq!(args.end, Some(-1));
            }
            _ => panic!("expected progress"),
        }
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["arbor", "show", "--format", "json", "-v", "--config", "a.toml"]);
        assert!(matches!(cli.command, Command::Show));
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
    }

    #[test]
    fn parses_path_arguments() {
        let cli = Cli::parse_from(["arbor", "path", "fsm/states/idle", "counter", "--layer", "view"]);
        match cli.command {
            Command::Path(args) => {
                assert_eq!(args.from, "fsm/states/idle");
                assert_eq!(args.to, "counter");
                assert_eq!(args.layer.as_deref(), Some("view"));
            }
            _ => panic!("expected path"),
        }
    }
}
