//! reach: inspect endpoint resolution
//!
//! Builds the routing table from a config file (or the built-in production
//! data), resolves it for a country code and circumvention preference, and
//! prints the chosen endpoint set as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use reach_net::{
    CircumventionPreference, CountryCode, FixedEnvironment, InterceptorChain, NetworkAccess, NetworkAccessConfig,
    RoutingTable,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "reach", about = "Resolve censorship-circumvention endpoints")]
struct Args {
    /// Network access config (.toml or .json); built-in data when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calling code of the local number, e.g. 98 or +98
    #[arg(long, short = 'c')]
    country_code: Option<CountryCode>,

    /// enabled, disabled or default
    #[arg(long, short = 'p', default_value = "default")]
    preference: CircumventionPreference,

    /// Resolve as if no number were registered
    #[arg(long, default_value_t = false)]
    no_number: bool,

    /// Print every hostname the client may contact and exit
    #[arg(long, default_value_t = false)]
    hostnames: bool,

    /// Print the built-in config as TOML and exit
    #[arg(long, default_value_t = false)]
    print_default_config: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();

    if args.print_default_config {
        print!("{}", NetworkAccessConfig::default_config().to_toml()?);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => NetworkAccessConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => NetworkAccessConfig::default_config(),
    };

    let table = RoutingTable::build(&config, InterceptorChain::empty()).context("Failed to build routing table")?;

    if args.hostnames {
        for host in table.hostnames() {
            println!("{}", host);
        }
        return Ok(());
    }

    let environment = match (args.no_number, args.country_code) {
        (false, Some(code)) => FixedEnvironment::registered(code, args.preference),
        _ => FixedEnvironment::unregistered(args.preference),
    };
    let country_code = environment.country_code;

    info!(
        "Resolving for {} with preference {}",
        country_code.map_or_else(|| "no number".to_string(), |c| c.to_string()),
        args.preference
    );

    let access = NetworkAccess::new(table, Arc::new(environment));
    let resolution = access.resolve();
    let set = resolution.set();

    let report = json!({
        "country_code": country_code,
        "preference": args.preference,
        "censored": resolution.is_censored(),
        "censored_by_default": country_code.is_some_and(|c| access.is_country_code_censored_by_default(c)),
        "supports_websockets": resolution.supports_websockets(),
        "trust_anchor": set.trust_anchor(),
        "endpoints": &**set,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
