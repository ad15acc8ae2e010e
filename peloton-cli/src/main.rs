//! Peloton CLI: score competitions and pick a pool team.
//!
//! Commands:
//! - `keys`: list the classifications available in a results document
//! - `score`: score competitions with a template into a ledger CSV
//! - `select`: pick the best affordable team from a ledger and a price list
//! - `pool`: score and select in one go, JSON report on stdout
//! - `compare`: top-N agreement between a predicted and an actual ledger
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); results go to stdout.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use peloton_core::{score_season, Competition, Ledger, ResultsTree, ScoreTemplate, ScoringOptions};
use peloton_runner::export::{
    export_ledger_csv, export_selection_json, format_selection, read_ledger_csv, write_ledger_csv,
};
use peloton_runner::{
    classify_ledgers, join_prices, run_pool, select_team, PoolConfig, PriceList,
};

#[derive(Parser)]
#[command(
    name = "peloton",
    about = "Peloton CLI: rule-driven race scoring and pool team selection"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the keys of a results document, optionally below a path.
    Keys {
        /// Results JSON document (one event's results tree).
        results: PathBuf,

        /// Keys to walk before listing (e.g. Stage General).
        path: Vec<String>,
    },
    /// Score competitions into a ledger.
    Score {
        /// Score template TOML.
        #[arg(long, env = "SCORE_TEMPLATE")]
        template: PathBuf,

        /// Competition JSON documents.
        #[arg(long = "results", required = true, num_args = 1..)]
        results: Vec<PathBuf>,

        /// Apply competition rules only.
        #[arg(long, default_value_t = false)]
        no_events: bool,

        /// Write the ledger CSV here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Pick the best team from a ledger CSV and a price list.
    Select {
        /// Ledger CSV written by `score`.
        #[arg(long)]
        ledger: PathBuf,

        #[command(flatten)]
        pool: PoolArgs,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Score competitions and pick the best team.
    Pool {
        /// Score template TOML.
        #[arg(long, env = "SCORE_TEMPLATE")]
        template: PathBuf,

        /// Competition JSON documents.
        #[arg(long = "results", required = true, num_args = 1..)]
        results: Vec<PathBuf>,

        /// Apply competition rules only.
        #[arg(long, default_value_t = false)]
        no_events: bool,

        #[command(flatten)]
        pool: PoolArgs,
    },
    /// Compare a predicted ledger with the actual one.
    Compare {
        /// Ledger CSV of actual scores.
        #[arg(long)]
        actual: PathBuf,

        /// Ledger CSV of predicted scores.
        #[arg(long)]
        predicted: PathBuf,

        /// Size of the top group.
        #[arg(long, default_value_t = 15)]
        top: usize,

        /// F-score beta.
        #[arg(long, default_value_t = 1.0)]
        beta: f64,
    },
}

/// Price list and team options shared by `select` and `pool`.
#[derive(clap::Args)]
struct PoolArgs {
    /// Price list CSV (`Rider` and `Price` columns).
    #[arg(long)]
    prices: PathBuf,

    /// Pool config TOML. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Team size.
    #[arg(long)]
    size: Option<usize>,

    /// Team budget.
    #[arg(long)]
    budget: Option<f64>,

    /// Solver time limit in milliseconds (0 disables it).
    #[arg(long)]
    time_limit_ms: Option<u64>,
}

impl PoolArgs {
    fn load_config(&self) -> Result<PoolConfig> {
        let mut config = match &self.config {
            Some(path) => PoolConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => PoolConfig::default(),
        };
        if let Some(size) = self.size {
            config.team.size = size;
        }
        if let Some(budget) = self.budget {
            config.team.budget = budget;
        }
        if let Some(ms) = self.time_limit_ms {
            config.solver.time_limit_ms = ms;
        }
        Ok(config)
    }

    fn load_prices(&self, config: &PoolConfig) -> Result<PriceList> {
        PriceList::from_path(&self.prices, config.delimiter()?)
            .with_context(|| format!("failed to load prices {}", self.prices.display()))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keys { results, path } => run_keys(&results, &path),
        Commands::Score {
            template,
            results,
            no_events,
            out,
        } => run_score(&template, &results, no_events, out.as_deref()),
        Commands::Select { ledger, pool, json } => run_select(&ledger, &pool, json),
        Commands::Pool {
            template,
            results,
            no_events,
            pool,
        } => run_pool_cmd(&template, &results, no_events, &pool),
        Commands::Compare {
            actual,
            predicted,
            top,
            beta,
        } => run_compare(&actual, &predicted, top, beta),
    }
}

fn run_keys(results: &Path, path: &[String]) -> Result<()> {
    let tree = ResultsTree::from_file(results)
        .with_context(|| format!("failed to load results {}", results.display()))?;
    let node = match tree.resolve(path) {
        Ok(node) => node,
        Err(missing) => bail!("key '{missing}' not found"),
    };
    match node.as_table() {
        Some(df) => println!("table: {} rows, columns {:?}", df.height(), df.get_column_names()),
        None => {
            for key in node.keys() {
                println!("{key}");
            }
        }
    }
    Ok(())
}

fn load_inputs(template: &Path, results: &[PathBuf]) -> Result<(ScoreTemplate, Vec<Competition>)> {
    let template = ScoreTemplate::from_file(template)
        .with_context(|| format!("failed to load template {}", template.display()))?;
    let competitions = results
        .iter()
        .map(|path| {
            Competition::from_file(path)
                .with_context(|| format!("failed to load competition {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    info!(
        rules = template.rule_count(),
        competitions = competitions.len(),
        fingerprint = %template.fingerprint(),
        "inputs loaded"
    );
    Ok((template, competitions))
}

fn options(no_events: bool) -> ScoringOptions {
    ScoringOptions {
        score_events: !no_events,
    }
}

fn run_score(
    template: &Path,
    results: &[PathBuf],
    no_events: bool,
    out: Option<&Path>,
) -> Result<()> {
    let (template, competitions) = load_inputs(template, results)?;
    let Some(ledger) = score_season(&competitions, &template, options(no_events))? else {
        bail!("no rule applied to any competition");
    };

    match out {
        Some(path) => {
            write_ledger_csv(&ledger, path)?;
            info!(competitors = ledger.len(), path = %path.display(), "ledger written");
        }
        None => print!("{}", export_ledger_csv(&ledger)?),
    }
    Ok(())
}

fn run_select(ledger: &Path, pool: &PoolArgs, json: bool) -> Result<()> {
    let config = pool.load_config()?;
    let ledger: Ledger = read_ledger_csv(ledger)?;
    let prices = pool.load_prices(&config)?;

    let candidates = join_prices(&ledger, &prices);
    let selection = select_team(
        &candidates,
        config.team.size,
        config.team.budget,
        &config.limits(),
    )?;

    if json {
        println!("{}", export_selection_json(&selection)?);
    } else {
        print!("{}", format_selection(&selection));
    }
    Ok(())
}

fn run_pool_cmd(template: &Path, results: &[PathBuf], no_events: bool, pool: &PoolArgs) -> Result<()> {
    let config = pool.load_config()?;
    let (template, competitions) = load_inputs(template, results)?;
    let prices = pool.load_prices(&config)?;

    let report = run_pool(&competitions, &template, &prices, &config, options(no_events))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_compare(actual: &Path, predicted: &Path, top: usize, beta: f64) -> Result<()> {
    let actual = read_ledger_csv(actual)?;
    let predicted = read_ledger_csv(predicted)?;
    let c = classify_ledgers(&actual, &predicted, top)?;

    println!("{}", c.confusion_matrix());
    println!("F{beta} = {:.3}", c.f_score(beta));
    Ok(())
}
