//! Summarize Wikidata entities or answer questions about them.
//!
//! Reads the Azure OpenAI deployment from `AZURE_OPENAI_ENDPOINT`,
//! `AZURE_OPENAI_DEPLOYMENT_NAME`, and `AZURE_OPENAI_API_KEY`.
//!
//! # Examples
//!
//! ```sh
//! # Alignment summary for Douglas Adams
//! qalign summarize Q42
//!
//! # Tighter token budget, verbose progress
//! qalign summarize Q42 --token-max 500 -vv
//!
//! # Free-form question over the capability set
//! qalign ask "What is the capital of Hungary according to Wikidata?"
//! ```

use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use qalign_rs::AzureChatClient;
use qalign_rs::agent::{AskAgent, AskConfig};
use qalign_rs::config::AlignConfig;
use qalign_rs::error::AlignError;
use qalign_rs::size::WordCount;
use qalign_rs::summary::{ChatSummarizer, SummaryPipeline};
use qalign_rs::tools::wikidata::wikidata_tool_set;
use qalign_rs::wikidata::WikidataClient;

/// Summarize Wikidata entities or answer questions about them.
#[derive(Parser)]
#[command(name = "qalign")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch an entity's statements and produce an alignment summary
    Summarize {
        /// Wikidata entity id, e.g. Q42
        entity_id: String,

        /// Token budget for a single summarization call
        #[arg(long)]
        token_max: Option<usize>,
    },

    /// Answer a question about Wikidata entities using the capability set
    Ask {
        /// The question to answer
        question: String,

        /// Maximum capability round-trips
        #[arg(long, default_value_t = 10)]
        max_rounds: u32,
    },
}

async fn run(cli: &Cli) -> Result<String, AlignError> {
    let mut config = AlignConfig::from_env()?;

    match &cli.command {
        Command::Summarize {
            entity_id,
            token_max,
        } => {
            if let Some(token_max) = token_max {
                config = config.with_token_max(*token_max);
                config.validate()?;
            }

            let chat = AzureChatClient::from_config(&config)?;
            let wikidata = WikidataClient::from_config(&config)?;

            let statements = wikidata.entity_statements(entity_id).await?;
            let summarizer = ChatSummarizer::new(&chat, &config);
            SummaryPipeline::new(&summarizer, &WordCount)
                .with_token_max(config.token_max)
                .run(&statements)
                .await
        }

        Command::Ask {
            question,
            max_rounds,
        } => {
            let chat = AzureChatClient::from_config(&config)?;
            let wikidata = Arc::new(WikidataClient::from_config(&config)?);

            let tools = wikidata_tool_set(wikidata, Arc::new(chat.clone()), config.clone());
            let ask_config = AskConfig {
                max_rounds: *max_rounds,
                max_tokens: config.max_tokens,
                temperature: config.temperature,
                ..Default::default()
            };
            AskAgent::new(&chat, &tools, ask_config).run(question).await
        }
    }
}

fn init_tracing(verbosity: u8) {
    use tracing::Level;
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
