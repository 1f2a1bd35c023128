//! annals-status: 数据访问层状态查看与探测工具
//!
//! Usage:
//!   annals-status [--config <path>] [--data <path>] status        Print the status snapshot
//!   annals-status [--config <path>] [--data <path>] probe [<name>] Probe one or all collections
//!   annals-status help                                             Show help

use annals_data::config::DataLayerConfig;
use annals_data::services::{DataServices, Entity, EntityService, ListQuery, LocalData, Wired};
use anyhow::{bail, Context};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const COLLECTIONS: &[&str] = &["events", "persons", "places", "dynasties", "emperors"];

struct Options {
    config: Option<PathBuf>,
    data: Option<PathBuf>,
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let opts = parse_args(std::env::args().skip(1).collect())?;
    match opts.command.first().map(String::as_str) {
        None | Some("status") => {
            let services = load(&opts)?;
            print_status(&services)
        }
        Some("probe") => {
            let services = load(&opts)?;
            cmd_probe(&services, opts.command.get(1).map(String::as_str)).await?;
            print_status(&services)
        }
        Some("version") | Some("--version") | Some("-V") => {
            println!("annals-status {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            print_usage();
            bail!("unknown command: {other}")
        }
    }
}

fn print_usage() {
    println!(
        r#"annals-status: 数据访问层状态工具

USAGE:
    annals-status [OPTIONS] <COMMAND>

OPTIONS:
    --config <path>     YAML configuration file (defaults + ANNALS_* env otherwise)
    --data <path>       JSON seed file for the local fallback catalogs

COMMANDS:
    status              Print breaker and fallback status as JSON
    probe [<name>]      List one collection (or all) once, then print status
    version             Show version information
    help                Show this help message

ENVIRONMENT:
    ANNALS_BASE_URL, ANNALS_DATA_SOURCE, ... override configuration fields
    RUST_LOG            Log filter (default: info)"#
    );
}

fn parse_args(args: Vec<String>) -> anyhow::Result<Options> {
    let mut opts = Options {
        config: None,
        data: None,
        command: Vec::new(),
    };
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config requires a path")?;
                opts.config = Some(PathBuf::from(path));
            }
            "--data" => {
                let path = iter.next().context("--data requires a path")?;
                opts.data = Some(PathBuf::from(path));
            }
            _ => opts.command.push(arg),
        }
    }
    Ok(opts)
}

fn load(opts: &Options) -> anyhow::Result<DataServices> {
    let config = match opts.config {
        Some(ref path) => {
            let mut cfg = DataLayerConfig::from_path(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            cfg.apply_env_overrides()?;
            cfg
        }
        None => DataLayerConfig::from_env()?,
    };
    let local = match opts.data {
        Some(ref path) => LocalData::from_path(path)
            .with_context(|| format!("failed to load seed data {}", path.display()))?,
        None => LocalData::default(),
    };
    Ok(DataServices::from_config(&config, local)?)
}

async fn cmd_probe(services: &DataServices, name: Option<&str>) -> anyhow::Result<()> {
    let names: Vec<&str> = match name {
        Some(n) if COLLECTIONS.contains(&n) => vec![n],
        Some(n) => bail!("unknown collection '{n}', expected one of {}", COLLECTIONS.join(", ")),
        None => COLLECTIONS.to_vec(),
    };

    let probes: Vec<BoxFuture<'_, (&str, annals_data::Result<usize>)>> = names
        .into_iter()
        .map(|n| match n {
            "events" => probe(&services.events).boxed(),
            "persons" => probe(&services.persons).boxed(),
            "places" => probe(&services.places).boxed(),
            "dynasties" => probe(&services.dynasties).boxed(),
            _ => probe(&services.emperors).boxed(),
        })
        .collect();

    for (collection, outcome) in join_all(probes).await {
        match outcome {
            Ok(total) => eprintln!("✓ {collection}: {total} item(s)"),
            Err(e) => eprintln!("✗ {collection}: {e}"),
        }
    }
    Ok(())
}

async fn probe<E: Entity>(service: &Wired<E>) -> (&'static str, annals_data::Result<usize>) {
    let outcome = service
        .list(&ListQuery::new().with_page(0, 1))
        .await
        .map(|page| page.total);
    (E::COLLECTION, outcome)
}

fn print_status(services: &DataServices) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&services.status())?;
    println!("{json}");
    Ok(())
}
