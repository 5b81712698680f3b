//! CLI tool to exercise the model providers and the knowledge base
//!
//! Usage:
//!   cargo run --bin llm_probe -- ollama-models
//!   cargo run --bin llm_probe -- ollama-help llama2:latest "How to use this model?"
//!   cargo run --bin llm_probe -- bedrock-models
//!   cargo run --bin llm_probe -- bedrock-invoke amazon.titan-text-express-v1 "What is the capital of Italy?"
//!   cargo run --bin llm_probe -- gemini-check
//!   cargo run --bin llm_probe -- kb-search "arch relation"

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use neurograph::{
    config::{
        build_aws_config, create_agent_runtime_client, create_bedrock_client,
        create_bedrock_runtime_client, Settings,
    },
    db::SqliteStore,
    logging,
    retry::{presets, Executor},
    services::{
        knowledge_base::DEFAULT_MAX_RESULTS, BedrockService, GeminiConfig, GeminiService,
        KnowledgeBaseService, OllamaService,
    },
};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "llm_probe")]
#[command(about = "List and invoke models, check provider setup, search the knowledge base")]
struct Args {
    /// Record Ollama and Gemini responses in the SQLite database
    #[arg(long, global = true)]
    record: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the models installed in the local Ollama daemon
    OllamaModels,

    /// Ask an Ollama model a question
    OllamaHelp {
        model: String,
        query: String,
        #[arg(default_value = "")]
        system_prompt: String,
    },

    /// List Bedrock foundation models
    BedrockModels,

    /// Invoke a Bedrock text model
    BedrockInvoke {
        model_id: String,
        prompt: String,
        #[arg(long, default_value = "")]
        system_prompt: String,
    },

    /// Send a greeting to Gemini to verify the API key
    GeminiCheck,

    /// Search the Bedrock knowledge base
    KbSearch {
        query: String,
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load()?;
    logging::init_cli(&settings.log_level);

    let executor = Executor::new(settings.retry.policy());
    let response_log = if args.record {
        Some(SqliteStore::connect(&settings.database_url).await?)
    } else {
        None
    };

    match args.command {
        Command::OllamaModels | Command::OllamaHelp { .. } => {
            let mut ollama = OllamaService::new(
                settings.ollama_base_url.clone(),
                settings.request_timeout(),
                executor,
            )?
            .with_listing_policy(presets::ollama_listing());
            if let Some(store) = response_log {
                ollama = ollama.with_response_log(store);
            }

            if !ollama.is_running().await {
                bail!("Ollama server is not running or not accessible at {}", ollama.base_url());
            }

            match args.command {
                Command::OllamaHelp {
                    model,
                    query,
                    system_prompt,
                } => {
                    let help = ollama.generate(&model, &query, &system_prompt).await?;
                    println!("{}", json!({ "help": help }));
                }
                _ => {
                    let models = ollama.list_models().await?;
                    println!("{}", json!(models));
                }
            }
        }

        Command::BedrockModels => {
            let bedrock = bedrock_service(&settings, executor).await;
            for model in bedrock.list_models().await? {
                println!("{}", model);
            }
        }

        Command::BedrockInvoke {
            model_id,
            prompt,
            system_prompt,
        } => {
            let bedrock = bedrock_service(&settings, executor).await;
            println!("{}", bedrock.invoke_model(&model_id, &prompt, &system_prompt).await?);
        }

        Command::GeminiCheck => {
            let Some(api_key) = settings.gemini_api_key.clone() else {
                bail!("GOOGLE_AI_API_KEY is not set");
            };
            let mut config = GeminiConfig::new(api_key, settings.gemini_model.clone())
                .with_timeout(settings.request_timeout_seconds);
            if let Some(base_url) = &settings.gemini_base_url {
                config = config.with_base_url(base_url.clone());
            }

            let mut gemini = GeminiService::new(config, executor)?;
            if let Some(store) = response_log {
                gemini = gemini.with_response_log(store);
            }

            let text = gemini.check_setup().await?;
            println!("Gemini setup successful. Response received:");
            println!("{}", text);
        }

        Command::KbSearch { query, max_results } => {
            let sdk_config = build_aws_config(&settings).await;
            let knowledge_base = KnowledgeBaseService::new(
                create_agent_runtime_client(&sdk_config),
                settings.knowledge_base_id.clone(),
                executor,
            );
            let records = knowledge_base.search(&query, max_results).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    if args.record {
        tracing::info!(database = %settings.database_url, "Responses recorded");
    }

    Ok(())
}

async fn bedrock_service(settings: &Settings, executor: Executor) -> BedrockService {
    let sdk_config = build_aws_config(settings).await;
    BedrockService::new(
        create_bedrock_runtime_client(settings, &sdk_config),
        create_bedrock_client(&sdk_config),
        executor,
        settings.enrichment_model_id.clone(),
    )
}
