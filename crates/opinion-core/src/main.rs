//! Opinion Simulation CLI
//!
//! Generates a population, announces a policy, lets agents talk it over in
//! pairs and prints how they vote.

use clap::Parser;
use opinion_core::{
    tally_by_religion, ConversationOrder, FailurePolicy, GenerationService, HttpGenerationService,
    MemoryScope, ScriptedGenerator, SimConfig, SimError, SimulationRunner, TraitSampler,
    TransitionPolicy,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "opinion_sim")]
#[command(about = "Simulates how a synthetic population talks about and votes on a policy")]
struct Args {
    /// Number of agents to generate (overrides the config file)
    #[arg(long)]
    agents: Option<usize>,

    /// Random seed for trait sampling (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Policy text the agents discuss and vote on
    #[arg(long)]
    policy: Option<String>,

    /// Path to a TOML config file (default: opinion.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the generation service; the offline generator is used when absent
    #[arg(long)]
    service_url: Option<String>,

    /// Run conversations one pair at a time
    #[arg(long)]
    sequential: bool,

    /// Keep successful results when some service calls fail
    #[arg(long)]
    collect_partial: bool,

    /// Allow stages to be set out of order
    #[arg(long)]
    permissive_stages: bool,

    /// Every agent hears every conversation, not only the participants
    #[arg(long)]
    everyone_hears: bool,

    /// Distribution override as group.field=value (repeatable)
    #[arg(long = "set", value_name = "GROUP.FIELD=VALUE")]
    overrides: Vec<String>,

    /// Print sampled traits without running a simulation
    #[arg(long)]
    sample_only: bool,

    /// Print the final state as JSON
    #[arg(long)]
    json: bool,

    /// Print every conversation line after the run
    #[arg(long)]
    transcript: bool,

    /// Write the conversation transcript as JSONL
    #[arg(long, value_name = "PATH")]
    transcript_file: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<SimConfig, SimError> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::load_or_default(),
    };

    if let Some(agents) = args.agents {
        config.simulation.agent_count = agents;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(url) = &args.service_url {
        config.service.base_url = Some(url.clone());
    }
    if args.sequential {
        config.simulation.conversation_order = ConversationOrder::Sequential;
    }
    if args.collect_partial {
        config.simulation.failure_policy = FailurePolicy::CollectPartial;
    }
    if args.permissive_stages {
        config.simulation.transition_policy = TransitionPolicy::Permissive;
    }
    if args.everyone_hears {
        config.simulation.memory_scope = MemoryScope::Everyone;
    }
    for spec in &args.overrides {
        config.distribution.apply_override(spec)?;
    }

    Ok(config)
}

fn build_service(config: &SimConfig) -> Result<Box<dyn GenerationService>, SimError> {
    match &config.service.base_url {
        Some(url) => {
            info!(url = %url, "Using HTTP generation service");
            let timeout = Duration::from_secs(config.service.timeout_secs);
            Ok(Box::new(HttpGenerationService::new(url, timeout)?))
        }
        None => {
            info!("Using offline generator");
            Ok(Box::new(ScriptedGenerator::new()))
        }
    }
}

fn print_samples(config: &SimConfig) {
    config.distribution.log_warnings();
    let mut sampler = TraitSampler::seeded(config.simulation.seed);
    let samples = sampler.sample_many(&config.distribution, config.simulation.agent_count);

    println!(
        "{:<6} {:<12} {:>6} {:>8} {:>7} {:>6}",
        "#", "religion", "anger", "persuade", "gullib", "income"
    );
    for (i, traits) in samples.iter().enumerate() {
        println!(
            "{:<6} {:<12} {:>6.3} {:>8.3} {:>7.3} {:>6.3}",
            i, traits.religion, traits.anger, traits.persuasiveness, traits.gullibility, traits.income
        );
    }
}

async fn run(args: &Args, config: SimConfig) -> Result<(), SimError> {
    let policy = match &args.policy {
        Some(policy) => policy.clone(),
        None => return Err(SimError::MissingPolicy),
    };

    let service = build_service(&config)?;
    let mut runner = SimulationRunner::from_config(service, &config);
    let report = runner.run(config.simulation.agent_count, &policy).await?;

    if !report.is_clean() {
        for failure in report
            .agents
            .failures
            .iter()
            .chain(&report.conversations.failures)
            .chain(&report.votes.failures)
        {
            error!(subject = %failure.subject, error = %failure.error, "Skipped after failure");
        }
    }

    if args.transcript {
        for entry in runner.transcript().entries() {
            println!("[{}] {}: {}", entry.pair_id, entry.speaker_name, entry.text);
        }
        println!();
    }
    if let Some(path) = &args.transcript_file {
        runner.transcript().save(path)?;
        info!(path = %path.display(), "Transcript written");
    }

    if args.json {
        let json = runner
            .state()
            .snapshot()
            .to_json()
            .map_err(std::io::Error::from)?;
        println!("{}", json);
        return Ok(());
    }

    println!("Policy: {}", policy);
    println!();
    for agent in runner.state().agents() {
        let vote = match agent.vote {
            Some(true) => "SUPPORT",
            Some(false) => "OPPOSE",
            None => "-",
        };
        println!(
            "{:<9} {:<22} {:<12} {:<8} {}",
            agent.id,
            agent.name,
            agent.traits.religion,
            vote,
            agent.vote_reason.as_deref().unwrap_or("")
        );
    }

    println!();
    println!("By religion:");
    for (religion, result) in tally_by_religion(runner.state().agents()) {
        println!(
            "  {:<12} {} support / {} oppose of {}",
            religion, result.yes, result.no, result.total
        );
    }

    let results = report.results;
    println!();
    println!("Support: {}% ({} votes)", results.yes_percent(), results.yes);
    println!("Oppose:  {}% ({} votes)", results.no_percent(), results.no);
    if !results.is_complete() {
        println!("Provisional: {} agents did not vote", results.pending());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.sample_only {
        print_samples(&config);
        return ExitCode::SUCCESS;
    }

    match run(&args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
