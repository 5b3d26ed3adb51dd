//! CLI entry point for the assetgraph question-answering agent.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use assetgraph_agent::{AgentLoop, AnthropicClient, LoopConfig, ModelConfig};
use assetgraph_graph::{GraphClient, GraphConfig};
use assetgraph_tools::{Registry, RegistryConfig, ToolDispatch};

#[derive(Parser)]
#[command(name = "assetgraph")]
#[command(about = "Natural-language question answering over the asset knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: assetgraph).
    #[arg(short, long, default_value = "assetgraph", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one natural-language question.
    Ask {
        question: String,
        /// Print the full outcome (answer plus tool-call audit trail) as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the tool schemas offered to the model.
    Tools,
    /// Invoke one tool directly (reads JSON arguments from stdin).
    Invoke {
        /// Tool name, e.g. find_node.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let settings = load_settings(&cli.config);

    match cli.command {
        Command::Ask { question, json } => {
            let registry = connect_registry(&settings).await?;
            let model = AnthropicClient::new(model_config(&settings)?)?;
            let agent = AgentLoop::new(model, registry, LoopConfig::default());
            let outcome = agent.run(&question).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", outcome.answer);
            }
        }
        Command::Tools => {
            let registry = connect_registry(&settings).await?;
            println!("{}", serde_json::to_string_pretty(&registry.tool_schemas())?);
        }
        Command::Invoke { name } => {
            let registry = connect_registry(&settings).await?;
            let input = std::io::read_to_string(std::io::stdin())?;
            let input = if input.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&input)?
            };
            match registry.invoke(&name, input).await {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(e) => {
                    println!("{}", serde_json::to_string_pretty(&e.to_value())?);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

async fn connect_registry(settings: &Option<config::Config>) -> anyhow::Result<Registry> {
    let graph_config = graph_config(settings);
    let client = GraphClient::connect(&graph_config).await?;
    Ok(Registry::new(client, RegistryConfig::default()))
}

fn load_settings(file_prefix: &str) -> Option<config::Config> {
    config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("ASSETGRAPH")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .ok()
}

fn graph_config(settings: &Option<config::Config>) -> GraphConfig {
    match settings {
        Some(c) => GraphConfig {
            uri: c
                .get_string("neo4j.uri")
                .unwrap_or_else(|_| "bolt://localhost:7687".to_string()),
            user: c
                .get_string("neo4j.user")
                .unwrap_or_else(|_| "neo4j".to_string()),
            password: c
                .get_string("neo4j.password")
                .unwrap_or_else(|_| "neo4j".to_string()),
            ..Default::default()
        },
        None => GraphConfig::default(),
    }
}

fn model_config(settings: &Option<config::Config>) -> anyhow::Result<ModelConfig> {
    let api_key = settings
        .as_ref()
        .and_then(|c| c.get_string("anthropic.api_key").ok())
        .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
        .ok_or_else(|| {
            anyhow::anyhow!("set anthropic.api_key in config or the ANTHROPIC_API_KEY env var")
        })?;

    let mut config = ModelConfig {
        api_key,
        model: String::new(),
        base_url: String::new(),
        max_tokens: 4096,
        timeout_secs: 60,
    };
    if let Some(c) = settings {
        config.model = c.get_string("anthropic.model").unwrap_or_default();
        config.base_url = c.get_string("anthropic.base_url").unwrap_or_default();
        if let Ok(v) = c.get_int("anthropic.max_tokens") {
            config.max_tokens = v as u32;
        }
        if let Ok(v) = c.get_int("anthropic.timeout_secs") {
            config.timeout_secs = v as u64;
        }
    }
    if config.model.is_empty() {
        config.model = "claude-sonnet-4-20250514".to_string();
    }
    if config.base_url.is_empty() {
        config.base_url = "https://api.anthropic.com".to_string();
    }
    Ok(config)
}
