use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use proxy_tester::{
    proxy::{probe::DEFAULT_TARGET_URL, HttpProbe, PoolConfig, ProbeSettings, ProxyListParser, ProxyPool},
    report::{self, SaveOutcome},
};
use std::io::{self, IsTerminal};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

const USAGE_EXAMPLES: &str = "\
Examples:
  proxy-tester -l proxies.txt
  cat proxies.txt | proxy-tester
  proxy-tester -l proxies.txt -w 20 -t 10

Proxy format: ipOrDomain:port (one per line), optionally prefixed with
http://, https:// or socks5://";

/// A concurrent proxy tester
#[derive(Parser)]
#[command(name = "proxy-tester", version, disable_version_flag = true)]
#[command(about = "Test proxies concurrently by fetching your IP through each one")]
#[command(after_help = USAGE_EXAMPLES)]
struct Cli {
    /// Load proxies from file (reads piped stdin when omitted)
    #[arg(short = 'l', long = "list", value_name = "FILE")]
    list: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long, default_value = "10")]
    workers: NonZeroUsize,

    /// Timeout in seconds per proxy
    #[arg(short, long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// File to save working proxies to
    #[arg(short, long, default_value = "working_proxies.txt")]
    output: PathBuf,

    /// URL that echoes the caller's IP as plain text
    #[arg(long, default_value = DEFAULT_TARGET_URL)]
    test_url: String,

    /// Skip duplicate proxies in the input
    #[arg(short, long)]
    unique: bool,

    /// Print results as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version, value_parser = clap::value_parser!(bool))]
    version: (),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if !cli.json {
        println!("Concurrent Proxy Tester");
        println!("=======================");
    }

    let mut proxies = if let Some(path) = &cli.list {
        status(&cli, format!("Loading proxies from file: {}", path.display()));
        ProxyListParser::parse_file(path)?
    } else if !io::stdin().is_terminal() {
        status(&cli, "Reading proxies from stdin...".to_string());
        ProxyListParser::parse_reader(io::stdin().lock())?
    } else {
        bail!("No proxy input provided.\n\n{}", USAGE_EXAMPLES);
    };

    if cli.unique {
        let before = proxies.len();
        proxies = ProxyListParser::dedup(proxies);
        info!("Removed {} duplicate proxies", before - proxies.len());
    }

    if proxies.is_empty() {
        bail!("No proxies to test!");
    }

    status(
        &cli,
        format!(
            "Testing {} proxies with {} workers (timeout: {}s)...",
            proxies.len(),
            cli.workers,
            cli.timeout
        ),
    );

    let probe = HttpProbe::with_settings(ProbeSettings::new().with_target_url(cli.test_url.as_str()));
    let config = PoolConfig::new()
        .with_workers(cli.workers)
        .with_timeout(Duration::from_secs(cli.timeout));
    let pool = ProxyPool::with_probe(probe, config);

    let results = pool.test_all(proxies).await?;

    if cli.json {
        println!("{}", report::render_json(&results)?);
    } else {
        print!("\n{}", report::render_table(&results));
    }

    match report::save_working(&results, &cli.output)? {
        SaveOutcome::Saved { count } => status(
            &cli,
            format!("\n{} working proxies saved to: {}", count, cli.output.display()),
        ),
        SaveOutcome::NothingToSave => {
            info!("No working proxies, {} not written", cli.output.display())
        }
    }

    Ok(())
}

/// Progress output goes to stderr in JSON mode so stdout stays parseable
fn status(cli: &Cli, message: String) {
    if cli.json {
        eprintln!("{}", message);
    } else {
        println!("{}", message);
    }
}
