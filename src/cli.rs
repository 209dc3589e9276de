use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding config.yaml, the phrase data and cached models.
    /// Defaults to $PHRASECHECK_DIR or ~/.phrasecheck
    #[clap(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[clap(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TopicArgs {
    /// Topic to select, may be repeated
    #[clap(short, long = "topic")]
    pub topics: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up a phrase: semantic and exact matches
    Search {
        /// Text to look up
        #[clap(allow_hyphen_values = true)]
        query: String,

        #[clap(flatten)]
        topic_args: TopicArgs,

        /// Search only within the selected topics
        #[clap(long, default_value = "false")]
        only_selected: bool,

        /// Override the minimum similarity score
        #[clap(long, allow_hyphen_values = true)]
        min_score: Option<f32>,

        /// Override the number of nearest neighbors fetched
        #[clap(long)]
        top_k: Option<usize>,
    },
    /// List all topics
    Topics {},
    /// List phrases belonging to the selected topics
    List {
        #[clap(flatten)]
        topic_args: TopicArgs,
    },
}
