//! deeptree-echo - drive the DeepTreeEcho engine from the command line
//!
//! Usage:
//!   deeptree-echo                         → full walkthrough against the current directory
//!   deeptree-echo --root ./src            → walkthrough against another tree
//!   deeptree-echo introspect ./src        → salience scan only
//!   deeptree-echo config                  → print the default config as TOML
//!   deeptree-echo version                 → show version

use anyhow::Context;
use clap::{Parser, Subcommand};
use deeptree::cognition::{DeepTreeEchoState, DiagnosticResult, IntrospectionResult};
use deeptree::{AgentType, Engine, EngineConfig, ErrorKind, ParamValue, Task, TaskType};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "deeptree-echo",
    about = "DeepTreeEcho agent orchestration engine",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the engine config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tree to introspect (default: current directory)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[arg(long, default_value_t = 0.6, global = true)]
    coherence_weight: f64,

    #[arg(long, default_value_t = 0.4, global = true)]
    novelty_weight: f64,

    /// Print results as JSON instead of a summary
    #[arg(long, default_value_t = false, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a directory tree and fold it into the memory graph
    Introspect {
        /// Tree to scan (overrides --root)
        path: Option<PathBuf>,
    },
    /// Print the default configuration
    Config,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Version) => {
            println!("deeptree-echo v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(Commands::Config) => {
            print!("{}", EngineConfig::default().to_toml());
            return Ok(());
        }
        _ => {}
    }

    init_tracing();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::default(),
    };
    let engine = Engine::new(config).context("invalid engine config")?;
    let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("."));

    match &cli.command {
        Some(Commands::Introspect { path }) => {
            let target = path.as_deref().unwrap_or(root.as_path());
            let result = engine
                .perform_introspection(target, cli.coherence_weight, cli.novelty_weight)
                .await?;
            print_introspection(&result, cli.json)?;
        }
        _ => run_walkthrough(&engine, &root, &cli).await?,
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deeptree=info,deeptree_agent=info,deeptree_cognition=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Register capabilities, wake the cognitive core, run a reflection and a
/// plugin task on fresh agents, then report the resulting state.
async fn run_walkthrough(engine: &Engine, root: &Path, cli: &Cli) -> anyhow::Result<()> {
    engine.register_default_tools(root).await?;
    engine.register_default_plugins().await?;

    report_degraded("start", engine.initialize_deep_tree_echo().await)?;
    print_state("initial state", &engine.deep_tree_echo().await, cli.json)?;
    print_diagnostics(&engine.run_diagnostics().await, cli.json)?;

    let introspection = engine
        .perform_introspection(root, cli.coherence_weight, cli.novelty_weight)
        .await?;
    print_introspection(&introspection, cli.json)?;

    let reflective = engine.create_specialized_agent(AgentType::Reflective, "introspector");
    let orchestrator = engine.create_specialized_agent(AgentType::Orchestrator, "conductor");
    let specialist = engine.create_specialized_agent(AgentType::Specialist, "analyst");
    println!(
        "\nagents: {}, {}, {}",
        reflective.name, orchestrator.name, specialist.name
    );

    let summary = introspection
        .cognitive_snapshot
        .salient_files
        .iter()
        .take(5)
        .map(|f| f.path.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut reflect = Task::generated(
        TaskType::Reflect,
        format!("Reflect on the most salient parts of this tree: {}.", summary),
        reflective.id.clone(),
    )
    .with_param("depth_level", "deep");
    let result = engine.execute_task(&mut reflect, &reflective).await;
    print_task("reflect", &result)?;

    let mut analysis = Task::generated(
        TaskType::Plugin,
        "Agents share memories. Memories form hyperedges. Hyperedges connect agents.",
        specialist.id.clone(),
    )
    .with_param("plugin_name", "data_analysis")
    .with_param("type", "hypergraph_analysis")
    .with_param("cognitive_integration", ParamValue::from("deep_tree_echo"));
    let result = engine.execute_task(&mut analysis, &specialist).await;
    print_task("hypergraph_analysis", &result)?;

    report_degraded("refresh", engine.refresh_deep_tree_echo_status().await)?;
    print_state("state after tasks", &engine.deep_tree_echo().await, cli.json)?;

    for agent in engine.list_agents().await {
        println!(
            "\n{} ({}): {} context items, {} memories",
            agent.name,
            agent.agent_type,
            agent.state.context.len(),
            agent.state.memory.len()
        );
        for entry in &agent.state.memory {
            println!("  - {}", entry.summary);
        }
    }
    Ok(())
}

/// A missing required capability leaves the engine running degraded; any
/// other failure ends the run.
fn report_degraded(step: &str, result: deeptree::Result<()>) -> anyhow::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CapabilityUnavailable => {
            println!("⚠ DeepTreeEcho {} degraded: {}", step, e);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("DeepTreeEcho {} failed", step)),
    }
}

fn print_task(label: &str, result: &deeptree::TaskResult) -> anyhow::Result<()> {
    println!("\n── task: {} [{}] ──", label, result.status);
    match &result.error {
        Some(failure) => println!("error: {}", failure.message),
        None => println!("{}", result.output),
    }
    Ok(())
}

fn print_state(label: &str, state: &DeepTreeEchoState, json: bool) -> anyhow::Result<()> {
    println!("\n── {} ──", label);
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }
    println!("health:      {}", state.system_health);
    println!("core:        {}", state.core_status);
    println!("stage:       {}", state.evolution_timeline.current_stage);
    println!("thoughts:    {}", state.thought_count);
    println!("depth:       {}", state.recursive_depth);
    println!("coherence:   {:.3}", state.identity_coherence.overall_coherence);
    println!(
        "memory:      {} nodes, {} connections, {} hyperedges",
        state.memory_resonance.memory_nodes,
        state.memory_resonance.connections,
        state.memory_resonance.hyperedges
    );
    for (name, integration) in &state.integrations {
        println!("integration: {} {} ({})", name, integration.status, integration.health);
    }
    Ok(())
}

fn print_diagnostics(result: &DiagnosticResult, json: bool) -> anyhow::Result<()> {
    println!("\n── diagnostics: {} ──", result.overall_health);
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    for check in &result.tests {
        println!("[{}] {}: {}", check.status, check.name, check.message);
    }
    Ok(())
}

fn print_introspection(result: &IntrospectionResult, json: bool) -> anyhow::Result<()> {
    let snapshot = &result.cognitive_snapshot;
    println!("\n── introspection: {} ──", snapshot.root.display());
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    println!(
        "processed {} files, {} below threshold {:.3}, {} skipped",
        snapshot.processed_files,
        snapshot.filtered_files,
        snapshot.attention_threshold,
        snapshot.skipped.len()
    );
    for file in snapshot.salient_files.iter().take(10) {
        println!("  {:.3}  {}", file.salience, file.path);
    }
    println!(
        "echo integration: {} nodes, {} edges, depth {}",
        result.echo_integration.nodes_created,
        result.echo_integration.edges_created,
        result.echo_integration.tree_depth
    );
    Ok(())
}
