mod problem;
mod provenance;

use anyhow::{Context, Result};
use boxrelax::encode::{PrecisionVector, Strategy};
use boxrelax::oracle::{AnnealingOracle, ExhaustiveOracle};
use boxrelax::relax::{relax, solve_potok, PotokReport, RunRecord, RunReport};
use boxrelax::{QuadraticForm, RelaxConfig};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

use crate::problem::{load_config, ProblemFile};
use crate::provenance::Payload;

#[derive(Parser)]
#[command(name = "boxrelax-cli")]
#[command(about = "Trust-region QUBO relaxation runner")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Solve one problem file and write the run record next to a provenance sidecar
    Run {
        #[arg(long)]
        input: PathBuf,
        /// naive | optimized | sparse
        #[arg(long, default_value_t = Strategy::Sparse)]
        strategy: Strategy,
        #[arg(long, value_enum, default_value_t = OracleKind::Exhaustive)]
        oracle: OracleKind,
        /// JSON run config; missing keys take their defaults
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },
    /// One-shot fixed-point solve with a `(¼, ½, …, K/4)` precision vector
    Potok {
        #[arg(long)]
        input: PathBuf,
        /// Bits per coordinate (K)
        #[arg(long, default_value_t = 4)]
        bits: usize,
        #[arg(long, value_enum, default_value_t = OracleKind::Exhaustive)]
        oracle: OracleKind,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print a small provenance JSON block
    Report,
}

#[derive(Clone, Copy, Debug, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum OracleKind {
    /// Exact enumeration; small dimensions only
    Exhaustive,
    /// Seeded simulated annealing
    Anneal,
}

/// Result file layout: the flat record plus the final estimate.
#[derive(Serialize)]
struct RunOutput<'a> {
    #[serde(flatten)]
    record: RunRecord,
    best_energy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_scale: Option<f64>,
    retries: usize,
    center: &'a [f64],
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    SubscriberBuilder::default()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Run {
            input,
            strategy,
            oracle,
            config,
            out,
        } => run(&input, strategy, oracle, config.as_deref(), &out),
        Action::Potok {
            input,
            bits,
            oracle,
            config,
            out,
        } => potok(&input, bits, oracle, config.as_deref(), &out),
        Action::Report => report(),
    }
}

fn solve(
    form: &QuadraticForm,
    strategy: Strategy,
    oracle: OracleKind,
    cfg: RelaxConfig,
) -> Result<RunReport> {
    let report = match oracle {
        OracleKind::Exhaustive => relax(form, strategy, ExhaustiveOracle::default(), cfg)?,
        OracleKind::Anneal => relax(form, strategy, AnnealingOracle::default(), cfg)?,
    };
    Ok(report)
}

fn solve_one_shot(
    form: &QuadraticForm,
    precision: PrecisionVector,
    oracle: OracleKind,
    cfg: RelaxConfig,
) -> Result<PotokReport> {
    let report = match oracle {
        OracleKind::Exhaustive => solve_potok(form, precision, ExhaustiveOracle::default(), cfg)?,
        OracleKind::Anneal => solve_potok(form, precision, AnnealingOracle::default(), cfg)?,
    };
    Ok(report)
}

/// Write `output` to `out` and its provenance sidecar next to it.
fn write_result(out: &Path, output: &RunOutput<'_>, params: serde_json::Value) -> Result<()> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    std::fs::write(out, serde_json::to_vec_pretty(output)?)
        .with_context(|| format!("writing {}", out.display()))?;

    let record = &output.record;
    let payload = Payload::new(params).with_summary(serde_json::json!({
        "mode": record.mode,
        "status": record.status,
        "iterations": record.iterations,
        "error": record.error,
    }));
    let sidecar = provenance::write_sidecar(out, payload)?;
    tracing::info!(
        out = %out.display(),
        sidecar = %sidecar.display(),
        status = %record.status,
        "wrote run record"
    );
    Ok(())
}

fn run(
    input: &Path,
    strategy: Strategy,
    oracle: OracleKind,
    config: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let cfg = load_config(config, strategy)?;
    let form = ProblemFile::from_path(input)?.into_form(strategy)?;
    tracing::info!(
        input = %input.display(),
        %strategy,
        ?oracle,
        dim = form.dim(),
        "run"
    );

    let report = solve(&form, strategy, oracle, cfg)?;
    let output = RunOutput {
        record: report.record(),
        best_energy: report.best_energy,
        final_scale: Some(report.final_scale),
        retries: report.retry.retries,
        center: report.center.as_slice(),
    };
    let params = serde_json::json!({
        "input": input.to_string_lossy(),
        "strategy": strategy,
        "oracle": oracle,
        "config": cfg,
    });
    write_result(out, &output, params)
}

fn potok(
    input: &Path,
    bits: usize,
    oracle: OracleKind,
    config: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let cfg = load_config(config, Strategy::default())?;
    let precision = PrecisionVector::quarters(bits)?;
    let form = ProblemFile::from_path(input)?.into_form(Strategy::default())?;
    tracing::info!(input = %input.display(), bits, ?oracle, dim = form.dim(), "potok");

    let report = solve_one_shot(&form, precision.clone(), oracle, cfg)?;
    let output = RunOutput {
        record: report.record(),
        best_energy: report.energy,
        final_scale: None,
        retries: report.retry.retries,
        center: report.center.as_slice(),
    };
    let params = serde_json::json!({
        "input": input.to_string_lossy(),
        "precision": precision.levels(),
        "oracle": oracle,
        "config": cfg,
    });
    write_result(out, &output, params)
}

fn report() -> Result<()> {
    let mut block = provenance::header();
    block["strategies"] = serde_json::json!(Strategy::ALL);
    println!("{}", serde_json::to_string_pretty(&block)?);
    Ok(())
}
