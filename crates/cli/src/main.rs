use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use drift_core::LiveSource;
use drift_sync::{FaultPolicy, PassOptions, PassOutcome, RunState, SyncPlanBuilder};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod render;

#[derive(Parser, Debug)]
#[command(name = "driftctl", version, about = "Diff rendered manifests against live state and plan hook-aware syncs")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Namespace applied to manifests that do not set one
    #[arg(long = "ns", global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Directory of rendered manifests (YAML/JSON, searched recursively)
    desired: PathBuf,

    /// Directory of live snapshots; reads the current kube context when omitted
    #[arg(long = "live")]
    live: Option<PathBuf>,

    /// Resources diffed concurrently
    #[arg(long = "workers", env = "DRIFT_DIFF_WORKERS", default_value_t = 16)]
    workers: usize,

    /// Leave resources whose live state cannot be read out of the plan instead of failing
    #[arg(long = "exclude-faults", action = ArgAction::SetTrue)]
    exclude_faults: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which resources drifted from their manifests
    Diff {
        #[command(flatten)]
        src: SourceArgs,
        /// Also list resources that are in sync
        #[arg(long = "all", action = ArgAction::SetTrue)]
        all: bool,
        /// Print a unified diff per out-of-sync resource
        #[arg(long = "patch", action = ArgAction::SetTrue)]
        patch: bool,
    },
    /// Print the staged sync plan (phases, waves, members)
    Plan {
        #[command(flatten)]
        src: SourceArgs,
    },
    /// Walk the plan stage by stage without applying anything
    Sync {
        #[command(flatten)]
        src: SourceArgs,
    },
}

fn init_tracing() {
    let env = std::env::var("DRIFT_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("DRIFT_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid DRIFT_METRICS_ADDR; expected host:port");
        }
    }
}

async fn live_source(src: &SourceArgs) -> Result<Arc<dyn LiveSource>> {
    match &src.live {
        Some(dir) => {
            let snap = drift_kubehub::SnapshotDir::load(dir).with_context(|| format!("loading live snapshots from {}", dir.display()))?;
            info!(objects = snap.len(), dir = %dir.display(), "live snapshots loaded");
            Ok(Arc::new(snap))
        }
        None => Ok(Arc::new(drift_kubehub::KubeLive::connect().await?)),
    }
}

async fn reconcile(src: &SourceArgs, namespace: Option<&str>) -> Result<PassOutcome> {
    let desired = drift_kubehub::ManifestDir::new(&src.desired).with_default_namespace(namespace.map(|s| s.to_string()));
    let live = live_source(src).await?;
    let opts = PassOptions {
        workers: src.workers,
        faults: if src.exclude_faults { FaultPolicy::Exclude } else { FaultPolicy::FailPass },
    };
    let out = drift_sync::run_pass(&desired, live, &SyncPlanBuilder::default(), &opts).await?;
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let ns = cli.namespace.as_deref();

    match cli.command {
        Commands::Diff { src, all, patch } => {
            info!(desired = %src.desired.display(), live = ?src.live, "diff invoked");
            let out = reconcile(&src, ns).await?;
            match cli.output {
                Output::Human => {
                    if out.verdicts.is_empty() { println!("no resources"); }
                    for r in out.resources.iter().filter(|r| all || !r.verdict.in_sync) {
                        println!("{}", render::verdict_line(&r.desired, &r.verdict));
                        if patch && !r.verdict.in_sync {
                            print!("{}", render::unified_patch(&r.desired, &r.verdict)?);
                        }
                    }
                    for f in out.faults.iter() {
                        println!("{:<10} {}  {}", "Excluded", f.id, f.message);
                    }
                }
                Output::Json => {
                    let report = serde_json::json!({ "verdicts": out.verdicts, "faults": out.faults });
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }
        Commands::Plan { src } => {
            info!(desired = %src.desired.display(), live = ?src.live, "plan invoked");
            let out = reconcile(&src, ns).await?;
            match cli.output {
                Output::Human => print!("{}", render::plan_table(&out.plan)),
                Output::Json => println!("{}", serde_json::to_string_pretty(&out.plan)?),
            }
        }
        Commands::Sync { src } => {
            info!(desired = %src.desired.display(), live = ?src.live, "sync (dry run) invoked");
            let out = reconcile(&src, ns).await?;
            let cancel = CancellationToken::new();
            let ctrl_c = tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if signal::ctrl_c().await.is_ok() {
                        info!("Ctrl-C received; cancelling sync");
                        cancel.cancel();
                    }
                }
            });
            let run = drift_sync::drive(out.plan, &drift_sync::DryRunExecutor, cancel).await;
            ctrl_c.abort();
            match cli.output {
                Output::Human => match run.state() {
                    RunState::Succeeded => println!("sync succeeded ({} stages)", run.plan().len()),
                    RunState::Failed { message } => {
                        warn!(%message, "sync failed");
                        println!("sync failed: {}", message);
                    }
                    other => println!("sync stopped in state {:?}", other),
                },
                Output::Json => println!("{}", serde_json::to_string_pretty(run.state())?),
            }
        }
    }

    Ok(())
}
