#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shiftplan::{io, ConfigurationError, Engine, EngineConfig, ProposalResponse, SolverPool};
use std::time::Duration;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de proposition de plannings d'équipes
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    cmd: Commands,
}

/// Réglages du moteur, surchargés par l'environnement
#[derive(Args, Debug)]
struct EngineArgs {
    /// Fuseau IANA utilisé quand la requête n'en précise pas
    #[arg(long, global = true, env = "SCHEDULER_DEFAULT_TIMEZONE", default_value = "UTC")]
    default_timezone: String,

    /// Horizon maximal en jours
    #[arg(long, global = true, env = "SCHEDULER_PLANNER_MAX_DAYS", default_value_t = 28)]
    max_days: u32,

    /// Granularité par défaut des slots (minutes)
    #[arg(long, global = true, env = "SCHEDULER_GRANULARITY_MINUTES", default_value_t = 60)]
    granularity_minutes: u32,

    /// Budget de résolution par défaut (secondes)
    #[arg(long, global = true, env = "SCHEDULER_TIME_BUDGET_SECONDS", default_value_t = 2.0)]
    time_budget_seconds: f64,

    /// Plafond de variables personne × slot par requête
    #[arg(long, global = true, env = "SCHEDULER_MAX_VARIABLES", default_value_t = 500_000)]
    max_variables: u64,

    /// Plafond de décisions (résolution reproductible)
    #[arg(long, global = true, env = "SCHEDULER_MAX_DECISIONS")]
    max_decisions: Option<u64>,
}

impl EngineArgs {
    fn config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig {
            default_timezone: self.default_timezone.clone(),
            max_horizon_days: self.max_days,
            granularity_minutes: self.granularity_minutes,
            max_variables: self.max_variables,
            ..EngineConfig::default()
        };
        config.max_slots = (self.max_days as usize) * 24 * 4;
        config.solver.time_budget = Duration::try_from_secs_f64(self.time_budget_seconds)
            .map_err(|_| ConfigurationError::InvalidTimeBudget)?;
        config.solver.max_decisions = self.max_decisions;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Proposer un planning pour une requête JSON
    Propose {
        #[arg(long)]
        request: String,
        /// Export JSON de la réponse complète
        #[arg(long)]
        out: Option<String>,
        /// Export CSV du roster
        #[arg(long)]
        csv: Option<String>,
    },

    /// Résoudre plusieurs requêtes en parallèle
    Batch {
        #[arg(long = "request", required = true, num_args = 1..)]
        requests: Vec<String>,
        /// Nombre de résolutions simultanées
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Afficher la grille de slots d'une requête
    Timeline {
        #[arg(long)]
        request: String,
    },
}

fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init();
    }

    let config = cli.engine.config()?;

    let code = match cli.cmd {
        Commands::Propose { request, out, csv } => {
            let req = io::load_request(&request)?;
            let response = Engine::new(config).propose(&req)?;
            if let Some(path) = out {
                io::export_response_json(path, &response)?;
            }
            if let Some(path) = csv {
                io::export_roster_csv(path, &response)?;
            }
            print!("{}", io::render_roster(&response));
            exit_code(&response)
        }
        Commands::Batch { requests, workers } => {
            let pool = match workers {
                Some(n) => SolverPool::with_workers(config, n),
                None => SolverPool::new(config),
            };
            let mut loaded = Vec::with_capacity(requests.len());
            for path in &requests {
                loaded.push(io::load_request(path)?);
            }
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("starting tokio runtime")?;
            let results = runtime.block_on(async {
                let jobs: Vec<_> = loaded
                    .into_iter()
                    .map(|req| {
                        let pool = pool.clone();
                        tokio::spawn(async move { pool.propose(req).await })
                    })
                    .collect();
                let mut out = Vec::with_capacity(jobs.len());
                for job in jobs {
                    out.push(job.await);
                }
                out
            });

            let mut code = 0;
            for (path, result) in requests.iter().zip(results) {
                match result.context("batch task panicked")? {
                    Ok(response) => {
                        println!(
                            "{} | {} | {} span(s) | {:.3}s",
                            path,
                            response.solver.status,
                            response.roster.len(),
                            response.solver.elapsed_seconds
                        );
                        code = code.max(exit_code(&response));
                    }
                    Err(e) => {
                        eprintln!("{path} | error: {e}");
                        code = code.max(1);
                    }
                }
            }
            code
        }
        Commands::Timeline { request } => {
            let req = io::load_request(&request)?;
            let engine = Engine::new(config);
            let timeline = engine.timeline(&req)?;
            for slot in timeline.slots() {
                println!(
                    "{:>4} | {} → {} |{}",
                    slot.index,
                    timeline.local(slot.start).to_rfc3339(),
                    timeline.local(slot.end).to_rfc3339(),
                    if slot.quiet { " quiet" } else { "" }
                );
            }
            0
        }
    };

    std::process::exit(code);
}

/// `.env` chargé uniquement en environnement de développement (défaut).
fn load_dotenv() {
    let env = std::env::var("ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .to_lowercase();
    if matches!(env.as_str(), "development" | "local") {
        let _ = dotenvy::dotenv();
    }
}

// Code 2 = WARNING/INCOMPLETE
fn exit_code(response: &ProposalResponse) -> i32 {
    if response.solver.status.is_satisfying() {
        0
    } else {
        2
    }
}
