use anyhow::Context;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use phrasecheck::config::Config;
use phrasecheck::semantic::EmbeddingModel;
use phrasecheck::{CorpusStore, PhraseSearchService, QueryRequest, SearchEngine};

mod cli;

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(default_level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    let base_path = match args.base_dir {
        Some(dir) => dir,
        None => Config::default_base_path()?,
    };
    let config = Config::load_with(&base_path)
        .with_context(|| format!("failed to load config from {}", base_path.display()))?;

    let settings = match &args.command {
        cli::Command::Search {
            min_score, top_k, ..
        } => config
            .search_settings_with(*min_score, *top_k)
            .context("invalid search options")?,
        _ => config.search_settings(),
    };

    let model = EmbeddingModel::shared(&config.model_options())
        .context("failed to load embedding model")?;
    let engine = SearchEngine::new(model, settings);
    let service = PhraseSearchService::new(CorpusStore::new(config.source_settings()), engine);

    let corpus = service
        .initialize()
        .context("failed to build phrase corpus")?;

    match args.command {
        cli::Command::Topics {} => {
            println!("{}", serde_json::to_string_pretty(&corpus.topics())?);
            Ok(())
        }

        cli::Command::List { topic_args } => {
            let records = corpus.records_with_topics(&topic_args.topics);
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }

        cli::Command::Search {
            query,
            topic_args,
            only_selected,
            ..
        } => {
            let request = QueryRequest {
                query,
                topics: topic_args.topics,
                restrict_to_topics: only_selected,
            };

            match service.handle_query(&request) {
                Ok(response) => {
                    if response.empty_scope {
                        log::warn!("No phrases to search in the selected topics");
                    }
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                Err(err) => {
                    log::error!("query failed: {err}");
                    println!("{}", serde_json::json!({ "error": err.to_string() }));
                }
            }
            Ok(())
        }
    }
}
