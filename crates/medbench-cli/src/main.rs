//! MedBench CLI
//!
//! The `medbench` command runs benchmarks on local datasets and tests
//! candidate models and datasets against a benchmark.
//!
//! ## Commands
//!
//! - `result create`: Execute a benchmark and submit its results
//! - `result submit`: Upload results of a previous execution
//! - `result ls`: List results in local storage
//! - `test`: Run a compatibility test in test mode
//!
//! Settings come from `MEDBENCH_*` environment variables; `--storage`
//! overrides the storage root.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

use medbench_core::{Comms, FsArtifactStore, MedbenchConfig, RestComms};
use medbench_exec::{
    BenchmarkExecution, CompatibilityTestExecution, CompatibilityTestRequest, ExecutionContext,
    ExecutionRequest, ProcessCubeRunner, ResultSubmission, ResultsList,
};

#[derive(Parser)]
#[command(name = "medbench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark execution and compatibility testing for medical ML models", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Storage root (default: $MEDBENCH_STORAGE or .medbench)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage benchmark results
    Result {
        #[command(subcommand)]
        action: ResultAction,
    },

    /// Test a dataset, model or local cube against a benchmark
    ///
    /// Exactly one of the three may be given. Without a dataset, the
    /// benchmark's demo data is prepared and used.
    Test {
        /// Benchmark UID
        #[arg(short, long)]
        benchmark: u64,

        /// Prepared dataset UID
        #[arg(short = 'd', long = "data_uid")]
        data_uid: Option<String>,

        /// Model cube UID
        #[arg(short = 'm', long = "model_uid")]
        model_uid: Option<String>,

        /// Local cube directory to test as the model
        #[arg(long)]
        cube_path: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ResultAction {
    /// Run a benchmark execution on a prepared dataset
    Create {
        /// Benchmark UID
        #[arg(short, long)]
        benchmark: u64,

        /// Prepared dataset UID
        #[arg(short = 'd', long = "data_uid")]
        data_uid: String,

        /// Model cube UID
        #[arg(short = 'm', long = "model_uid")]
        model_uid: String,

        /// Keep results local
        #[arg(long)]
        no_submit: bool,
    },
    /// Upload results of a previous execution
    Submit {
        /// Benchmark UID
        #[arg(short, long)]
        benchmark: u64,

        /// Prepared dataset UID
        #[arg(short = 'd', long = "data_uid")]
        data_uid: String,

        /// Model cube UID
        #[arg(short = 'm', long = "model_uid")]
        model_uid: String,
    },
    /// List results in local storage
    Ls,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    medbench_core::init_tracing(cli.json, level);

    let cfg = build_config(cli.storage.as_deref());

    match cli.command {
        Commands::Result { action } => match action {
            ResultAction::Create {
                benchmark,
                data_uid,
                model_uid,
                no_submit,
            } => cmd_result_create(cfg, benchmark, &data_uid, &model_uid, no_submit).await,
            ResultAction::Submit {
                benchmark,
                data_uid,
                model_uid,
            } => cmd_result_submit(cfg, benchmark, &data_uid, &model_uid).await,
            ResultAction::Ls => cmd_result_ls(&cfg),
        },
        Commands::Test {
            benchmark,
            data_uid,
            model_uid,
            cube_path,
        } => {
            let request = CompatibilityTestRequest {
                benchmark_uid: benchmark,
                data_uid,
                model_uid,
                cube_path,
            };
            cmd_test(cfg, &request).await
        }
    }
}

fn build_config(storage: Option<&std::path::Path>) -> MedbenchConfig {
    let cfg = MedbenchConfig::from_env();
    match storage {
        Some(root) => cfg.with_storage_root(root),
        None => cfg,
    }
}

fn connect(cfg: &MedbenchConfig) -> Result<Option<Arc<dyn Comms>>> {
    let comms = RestComms::from_config(cfg).context("Failed to create server client")?;
    Ok(comms.map(|c| Arc::new(c) as Arc<dyn Comms>))
}

fn execution_context(cfg: MedbenchConfig, comms: Option<Arc<dyn Comms>>) -> Result<ExecutionContext> {
    let mut store = FsArtifactStore::new(cfg.clone()).context("Failed to open local storage")?;
    if let Some(comms) = comms {
        store = store.with_comms(comms);
    }
    let runner = ProcessCubeRunner::from_config(&cfg);
    Ok(ExecutionContext::new(Arc::new(store), Arc::new(runner), cfg))
}

/// Execute a benchmark and optionally submit the results
async fn cmd_result_create(
    cfg: MedbenchConfig,
    benchmark: u64,
    data_uid: &str,
    model_uid: &str,
    no_submit: bool,
) -> Result<()> {
    let comms = connect(&cfg)?;
    if !no_submit && comms.is_none() {
        anyhow::bail!("No benchmark server configured: set MEDBENCH_SERVER or pass --no-submit");
    }

    let ctx = execution_context(cfg, comms.clone())?;
    let request = ExecutionRequest::new(benchmark, data_uid, model_uid);
    let result = BenchmarkExecution::execute(ctx.clone(), request)
        .await
        .context("Benchmark execution failed")?;

    println!("✓ Execution complete");
    println!("  Benchmark:   {}", result.benchmark_uid);
    println!("  Model:       {}", result.model_uid);
    println!("  Dataset:     {}", result.dataset_uid);
    println!("  Results:     {}", result.results_path.display());

    if let Some(comms) = comms.filter(|_| !no_submit) {
        let id = ResultSubmission::new(ctx.cfg.clone(), comms)
            .run(benchmark, data_uid, model_uid)
            .await
            .context("Result submission failed")?;
        println!("  Submitted:   {}", id);
    }
    Ok(())
}

/// Upload results of a previous execution
async fn cmd_result_submit(
    cfg: MedbenchConfig,
    benchmark: u64,
    data_uid: &str,
    model_uid: &str,
) -> Result<()> {
    let Some(comms) = connect(&cfg)? else {
        anyhow::bail!("No benchmark server configured: set MEDBENCH_SERVER");
    };
    let id = ResultSubmission::new(Arc::new(cfg), comms)
        .run(benchmark, data_uid, model_uid)
        .await
        .context("Result submission failed")?;
    println!("✓ Results submitted: {}", id);
    Ok(())
}

/// List results in local storage
fn cmd_result_ls(cfg: &MedbenchConfig) -> Result<()> {
    let entries = ResultsList::run(cfg).context("Failed to list results")?;
    if entries.is_empty() {
        println!("No results in {}", cfg.results_root().display());
        return Ok(());
    }

    println!(
        "{:<10} {:<36} {:<66} {}",
        "BENCHMARK", "MODEL", "DATASET", "SUBMITTED"
    );
    for entry in &entries {
        println!(
            "{:<10} {:<36} {:<66} {}",
            entry.benchmark_uid,
            entry.model_uid,
            entry.dataset_uid,
            if entry.submitted { "yes" } else { "no" }
        );
    }
    Ok(())
}

/// Run a compatibility test
async fn cmd_test(cfg: MedbenchConfig, request: &CompatibilityTestRequest) -> Result<()> {
    let comms = connect(&cfg)?;
    let ctx = execution_context(cfg, comms)?;
    info!(benchmark = request.benchmark_uid, "starting compatibility test");

    let outcome = CompatibilityTestExecution::with_defaults(ctx)
        .run(request)
        .await
        .context("Compatibility test failed")?;

    println!("✓ Compatibility test passed");
    println!("  Benchmark:   {}", outcome.benchmark_uid);
    println!("  Model:       {}", outcome.model_uid);
    println!("  Dataset:     {}", outcome.data_uid);
    if outcome.ephemeral_dataset.is_some() {
        println!("  (dataset prepared from demo data, not registered)");
    }
    println!("  Results:     {}", outcome.result.results_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbench_core::MedbenchError;

    #[test]
    fn test_parse_result_create() {
        let cli = Cli::try_parse_from([
            "medbench", "result", "create", "-b", "1", "-d", "d1", "-m", "101", "--no-submit",
        ])
        .expect("parse failed");
        match cli.command {
            Commands::Result {
                action:
                    ResultAction::Create {
                        benchmark,
                        data_uid,
                        model_uid,
                        no_submit,
                    },
            } => {
                assert_eq!(benchmark, 1);
                assert_eq!(data_uid, "d1");
                assert_eq!(model_uid, "101");
                assert!(no_submit);
            }
            _ => panic!("expected result create"),
        }
    }

    #[test]
    fn test_parse_test_with_global_flags() {
        let cli = Cli::try_parse_from([
            "medbench",
            "test",
            "-b",
            "1",
            "--cube-path",
            "/tmp/cube",
            "--storage",
            "/tmp/store",
            "--verbose",
        ])
        .expect("parse failed");
        assert!(cli.verbose);
        assert_eq!(cli.storage, Some(PathBuf::from("/tmp/store")));
        match cli.command {
            Commands::Test {
                benchmark,
                data_uid,
                model_uid,
                cube_path,
            } => {
                assert_eq!(benchmark, 1);
                assert!(data_uid.is_none());
                assert!(model_uid.is_none());
                assert_eq!(cube_path, Some(PathBuf::from("/tmp/cube")));
            }
            _ => panic!("expected test"),
        }
    }

    #[test]
    fn test_result_create_requires_model() {
        assert!(Cli::try_parse_from(["medbench", "result", "create", "-b", "1", "-d", "d1"]).is_err());
    }

    #[test]
    fn test_storage_flag_overrides_root() {
        let cfg = build_config(Some(std::path::Path::new("/tmp/medbench-store")));
        assert_eq!(cfg.storage_root, PathBuf::from("/tmp/medbench-store"));
        assert_eq!(
            cfg.results_path(1, "101", "d1"),
            PathBuf::from("/tmp/medbench-store/results/1/101/d1/results.json")
        );
    }

    #[test]
    fn test_result_ls_on_empty_storage() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = MedbenchConfig::default().with_storage_root(dir.path());
        cmd_result_ls(&cfg).expect("ls failed");
    }

    #[tokio::test]
    async fn test_compatibility_test_error_reaches_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = MedbenchConfig::default().with_storage_root(dir.path());
        cfg.server_url = None;

        let request = CompatibilityTestRequest::new(1);
        let err = cmd_test(cfg, &request).await.unwrap_err();
        let cause = err
            .downcast_ref::<MedbenchError>()
            .expect("expected a MedbenchError cause");
        assert!(matches!(cause, MedbenchError::NotFound { kind: "benchmark", .. }));
    }
}
