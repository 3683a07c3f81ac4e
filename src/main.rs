use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dialoq_agent::registry::{build_evaluator, build_user_simulator};
use dialoq_agent::{
    AgentContext, AgentHandle, AgentKind, AgentRegistry, DialogueSession, GraphGenerator,
    TaskGraph,
};
use dialoq_core::config::AppConfig;
use dialoq_core::traits::LlmClient;

#[derive(Parser)]
#[command(name = "dialoq", version, about = "Task-graph dialogue orchestration")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "dialoq.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a dialogue session for a task
    Run {
        /// Task description (overrides the configured task)
        #[arg(trailing_var_arg = true)]
        task: Vec<String>,
    },
    /// Parse a flow description file and print its structure
    Flow {
        /// Path to the flow description file
        file: PathBuf,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Flow { file } => {
            let text = std::fs::read_to_string(&file)?;
            let graph = TaskGraph::parse(&text)?;
            print!("{}", graph.describe());
            Ok(())
        }
        Commands::Config => {
            let config = AppConfig::load(&cli.config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Run { task } => run_dialogue(&cli.config, task).await,
    }
}

async fn run_dialogue(config_path: &Path, task_args: Vec<String>) -> anyhow::Result<()> {
    let mut config = AppConfig::load(config_path)?;
    if !task_args.is_empty() {
        config.roles.task = task_args.join(" ");
    }
    let task = config.roles.task.clone();

    let llm: Arc<dyn LlmClient> = Arc::from(dialoq_llm::build_client(&config));
    let registry = AgentRegistry::builtin();
    let mut ctx = AgentContext {
        llm,
        config: config.clone(),
        graph: None,
    };

    // Obtain the flow description: a pre-generated file, or decompose the
    // task now.
    let flow_text = match &config.dialogue.flow_file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let AgentHandle::GraphGenerator(generator) =
                registry.create(AgentKind::GraphGenerator, &ctx)?
            else {
                anyhow::bail!("registry returned wrong agent kind");
            };
            let flow = generator.generate(&task).await?;
            let saved =
                GraphGenerator::save_to_file(&flow, Path::new(&config.dialogue.output_dir))?;
            info!(path = %saved.display(), "Saved generated flow");
            flow
        }
    };

    let graph = Arc::new(TaskGraph::parse(&flow_text)?);
    info!(nodes = graph.node_count(), "Parsed task flow");
    ctx.graph = Some(graph);

    let AgentHandle::StatePlanner(planner) = registry.create(AgentKind::StatePlanner, &ctx)? else {
        anyhow::bail!("registry returned wrong agent kind");
    };
    let AgentHandle::ChatResponder(responder) = registry.create(AgentKind::ChatResponder, &ctx)?
    else {
        anyhow::bail!("registry returned wrong agent kind");
    };
    let AgentHandle::DecisionMaker(decider) = registry.create(AgentKind::DecisionMaker, &ctx)?
    else {
        anyhow::bail!("registry returned wrong agent kind");
    };
    let simulator = build_user_simulator(&ctx);
    let evaluator = config.evaluation.enabled.then(|| build_evaluator(&ctx));

    let mut session = DialogueSession::new(
        planner,
        responder,
        simulator,
        decider,
        evaluator,
        task,
        &config.dialogue,
    );
    info!(session = %session.session_id(), "Starting dialogue session");

    let record = session.run().await?;
    let path = record.save(Path::new(&config.dialogue.output_dir))?;

    println!("Session complete.");
    println!("  visited: {}", record.visited.join(" -> "));
    println!("  progress: {:.0}%", record.progress * 100.0);
    if let Some(eval) = &record.evaluation {
        println!("  evaluation: {:.1}/10 — {}", eval.overall, eval.assessment);
    }
    println!("  record: {}", path.display());

    Ok(())
}
