//! # Manager CLI (`manager`)
//!
//! Talks to the artist-manager assistant and maintains its knowledge bases.
//!
//! ```bash
//! # Ask a question as user 42, with earlier turns from a JSON array file
//! manager --config ./manager.toml chat "How should I plan my next release?" \
//!     --user-id 42 --history ./history.json
//!
//! # Add a document to a user's personal knowledge base
//! manager ingest ./press-kit.pdf --document-id 17 --user-id 42
//!
//! # Add shared industry material
//! manager ingest ./sync-licensing.docx --document-id 18 --global
//!
//! # Remove a document again
//! manager delete 17 --knowledge-base personal
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use manager_ingestion::{DocumentSource, Ingestor, TokenChunker};
use manager_retrieval::{Agent, RagConfig};
use manager_vector_store::{KnowledgeBase, VectorStore};

#[derive(Debug, Parser)]
#[command(name = "manager", version, about = "Personal music-career manager assistant")]
struct Cli {
    /// TOML configuration file. Without one, defaults plus environment
    /// variables are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Answer one message.
    Chat {
        message: String,

        /// Numeric id of the user; enables the personal knowledge base.
        #[arg(long)]
        user_id: Option<i64>,

        /// JSON file holding earlier turns as an array of strings, oldest
        /// first, starting with a user turn.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the intent and retrieved passages to stderr.
        #[arg(long)]
        show_context: bool,
    },

    /// Extract, chunk, embed, and store a txt, pdf, or docx document.
    Ingest {
        path: PathBuf,

        #[arg(long)]
        document_id: String,

        /// Owner of a personal document.
        #[arg(long, conflicts_with = "global", required_unless_present = "global")]
        user_id: Option<i64>,

        /// Store in the global knowledge base instead.
        #[arg(long)]
        global: bool,

        /// Title stored with each chunk; defaults to the file name.
        #[arg(long)]
        title: Option<String>,
    },

    /// Remove every chunk of a document from a knowledge base.
    Delete {
        document_id: String,

        #[arg(long, value_enum)]
        knowledge_base: KnowledgeBaseArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KnowledgeBaseArg {
    Global,
    Personal,
}

impl From<KnowledgeBaseArg> for KnowledgeBase {
    fn from(arg: KnowledgeBaseArg) -> Self {
        match arg {
            KnowledgeBaseArg::Global => KnowledgeBase::Global,
            KnowledgeBaseArg::Personal => KnowledgeBase::Personal,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Chat {
            message,
            user_id,
            history,
            show_context,
        } => chat(&config, &message, user_id, history.as_deref(), show_context).await,
        Command::Ingest {
            path,
            document_id,
            user_id,
            global,
            title,
        } => {
            let knowledge_base = if global {
                KnowledgeBase::Global
            } else {
                KnowledgeBase::Personal
            };
            let mut document =
                DocumentSource::from_path(&path, document_id, knowledge_base, user_id).await?;
            if let Some(title) = title {
                document = document.with_title(title);
            }
            let report = ingestor(&config)?.ingest(&document).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Delete {
            document_id,
            knowledge_base,
        } => {
            let touched = ingestor(&config)?
                .delete_document(&document_id, knowledge_base.into())
                .await?;
            for collection in touched {
                println!("{collection}");
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RagConfig> {
    let config = match path {
        Some(path) => RagConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => {
            let config = RagConfig::from_env();
            config.validate()?;
            config
        }
    };
    debug!(
        "Using {} embedding channel(s), vector store at {}",
        config.embedding_channels.len(),
        config.vector_store.url
    );
    Ok(config)
}

fn ingestor(config: &RagConfig) -> Result<Ingestor> {
    let store: Arc<dyn VectorStore> = Arc::new(config.vector_store());
    Ok(Ingestor::new(config.embedding_gateway(), store)?
        .with_collections(config.collection_names())
        .with_chunker(TokenChunker::new(config.chunking)?))
}

async fn chat(
    config: &RagConfig,
    message: &str,
    user_id: Option<i64>,
    history: Option<&Path>,
    show_context: bool,
) -> Result<()> {
    let history = match history {
        Some(path) => read_history(path).await?,
        None => Vec::new(),
    };
    let agent = Agent::from_config(config)?;
    info!("Answering with {} turns of history", history.len());

    if show_context {
        match agent.run(message, &history, user_id).await {
            Ok((response, trace)) => {
                eprintln!(
                    "intent: {} (via {:?})",
                    trace.classification.intent, trace.classification.path
                );
                for chunk in trace.context.global.iter().chain(&trace.context.personal) {
                    eprintln!("[{}] {:.3} {}", chunk.source, chunk.score, chunk.text);
                }
                println!("{response}");
            }
            Err(e) => {
                eprintln!("error: {e}");
                println!("{}", manager_retrieval::fallback_response(message));
            }
        }
    } else {
        println!("{}", agent.generate_response(message, &history, user_id).await);
    }
    Ok(())
}

async fn read_history(path: &Path) -> Result<Vec<String>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading history from {}", path.display()))?;
    parse_history(&raw)
}

fn parse_history(raw: &str) -> Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Array(turns) => turns
            .into_iter()
            .enumerate()
            .map(|(index, turn)| match turn {
                serde_json::Value::String(text) => Ok(text),
                other => bail!("history turn {index} is not a string: {other}"),
            })
            .collect(),
        _ => bail!("history must be a JSON array of strings"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_history() {
        assert_eq!(
            parse_history(r#"["hi", "hello!"]"#).unwrap(),
            vec!["hi", "hello!"]
        );
        assert!(parse_history("  \n").unwrap().is_empty());
        assert!(parse_history(r#"["hi", 3]"#).is_err());
        assert!(parse_history(r#"{"turns": []}"#).is_err());
    }

    #[test]
    fn test_ingest_requires_owner_or_global() {
        let missing = Cli::try_parse_from(["manager", "ingest", "a.txt", "--document-id", "1"]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "manager",
            "ingest",
            "a.txt",
            "--document-id",
            "1",
            "--user-id",
            "4",
            "--global",
        ]);
        assert!(both.is_err());

        let cli = Cli::try_parse_from([
            "manager",
            "--config",
            "m.toml",
            "ingest",
            "a.txt",
            "--document-id",
            "1",
            "--global",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("m.toml")));
        assert!(matches!(cli.command, Command::Ingest { global: true, .. }));
    }

    #[test]
    fn test_delete_knowledge_base() {
        let cli = Cli::try_parse_from([
            "manager",
            "delete",
            "17",
            "--knowledge-base",
            "personal",
        ])
        .unwrap();
        match cli.command {
            Command::Delete {
                document_id,
                knowledge_base,
            } => {
                assert_eq!(document_id, "17");
                assert_eq!(KnowledgeBase::from(knowledge_base), KnowledgeBase::Personal);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
