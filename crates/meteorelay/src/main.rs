// # meteorelay - Forecast Reconciliation Relay
//
// One-shot command: fetch the short-range and long-range forecast
// feeds, reconcile them into a single fact-anchored series, and relay
// it to a carbon daemon's TCP line receiver.
//
// This binary is a thin integration layer. All extraction, validation
// and delivery logic lives in the library crates; what happens here is
// argument parsing, logging setup, component wiring and exit codes.
//
// ## Example
//
// ```bash
// meteorelay graphite.lan:2003 \
//     --inform-url 'https://feeds.example.net/inform/4517.xml' \
//     --daily-url 'https://feeds.example.net/daily/4517/' \
//     -t Asia/Yekaterinburg \
//     -p weather.ekb.
// ```

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use meteo_core::traits::MetricSink;
use meteo_core::{RelayEngine, RetryPolicy, Series, Zone};
use meteo_sink_carbon::CarbonSink;
use meteo_source_daily::DailySource;
use meteo_source_inform::InformSource;

mod fetch;

use fetch::HttpFetcher;

/// Exit codes for different termination scenarios
///
/// These codes follow the usual daemon conventions:
/// - 0: Successful run
/// - 1: Configuration or usage error
/// - 2: Runtime error (extraction, reconciliation or delivery)
#[derive(Debug, Clone, Copy)]
enum RelayExitCode {
    /// Series extracted and delivered (or dumped)
    CleanRun = 0,
    /// Bad arguments or unusable configuration
    ConfigError = 1,
    /// The run aborted on a fatal error
    RuntimeError = 2,
}

impl From<RelayExitCode> for ExitCode {
    fn from(code: RelayExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Reconcile two forecast feeds and relay the series to carbon.
#[derive(Debug, Parser)]
#[command(name = "meteorelay", version)]
struct Cli {
    /// Carbon daemon address, host:port of its TCP line receiver.
    carbon: String,

    /// URL of the short-range XML feed.
    #[arg(long)]
    inform_url: String,

    /// URL of the long-range daily forecast page.
    #[arg(long)]
    daily_url: String,

    /// Timezone the feeds' wall-clock values are expressed in: an IANA
    /// name, or "local" for the host's own zone. Should be the local
    /// zone of the forecast location.
    #[arg(short, long, default_value = "local")]
    timezone: String,

    /// Prefix for every metric name (include the trailing dot, if
    /// necessary).
    #[arg(short = 'p', long)]
    metric_prefix: Option<String>,

    /// Carbon reconnect policy, attempts:min_delay:max_delay:multiplier.
    /// Applied to the initial connection only; a send failure after
    /// connecting is fatal.
    #[arg(short = 'r', long, default_value = "100:1:60:2")]
    reconnect: String,

    /// Print the merged series as JSON instead of delivering it.
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    /// Validate the arguments before anything runs.
    fn validate(&self) -> Result<()> {
        host_port(&self.carbon)?;

        self.timezone
            .parse::<Zone>()
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        self.reconnect
            .parse::<RetryPolicy>()
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        for (flag, url) in [("--inform-url", &self.inform_url), ("--daily-url", &self.daily_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{flag} must be an HTTP or HTTPS URL. Got: {url}");
            }
        }

        if let Some(prefix) = &self.metric_prefix
            && !prefix.is_empty()
            && !prefix.ends_with('.')
        {
            eprintln!(
                "WARNING: metric prefix {prefix:?} has no trailing dot; \
                metric names will run into it."
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "log level '{other}' is not valid. Valid levels: trace, debug, info, warn, error"
            ),
        }

        Ok(())
    }
}

/// Split a `host:port` destination string.
fn host_port(dest: &str) -> Result<(String, u16)> {
    let Some((host, port)) = dest.rsplit_once(':') else {
        anyhow::bail!("carbon destination {dest:?} must be host:port");
    };
    if host.is_empty() {
        anyhow::bail!("carbon destination {dest:?} has an empty host");
    }
    let port: u16 = port
        .parse()
        .map_err(|_| anyhow::anyhow!("bad carbon port in {dest:?}"))?;
    Ok((host.to_string(), port))
}

/// Sink for `--dry-run`: the merged series, pretty-printed to stdout.
struct JsonDumpSink;

#[async_trait]
impl MetricSink for JsonDumpSink {
    async fn deliver(&self, series: &Series) -> meteo_core::Result<()> {
        let json = serde_json::to_string_pretty(series)
            .map_err(|e| meteo_core::Error::Other(e.to_string()))?;
        println!("{json}");
        Ok(())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("Configuration error: {e}");
        return RelayExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return RelayExitCode::ConfigError.into();
    }

    // One run is one linear pipeline; a single-threaded runtime is all
    // the concurrency this process needs.
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return RelayExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run(cli).await {
            Ok(()) => RelayExitCode::CleanRun,
            Err(e) => {
                error!("Run aborted: {e:#}");
                eprintln!("meteorelay: {e:#}");
                RelayExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the components and run the pipeline once.
async fn run(cli: Cli) -> Result<()> {
    // Already checked by validate()
    let zone: Zone = cli.timezone.parse()?;
    let policy: RetryPolicy = cli.reconnect.parse()?;
    let (host, port) = host_port(&cli.carbon)?;

    let fetcher = HttpFetcher::new();
    let short = InformSource::new(Box::new(fetcher.clone()), &cli.inform_url, zone);
    let long = DailySource::new(Box::new(fetcher), &cli.daily_url, zone);

    let sink: Box<dyn MetricSink> = if cli.dry_run {
        info!("dry run: merged series goes to stdout");
        Box::new(JsonDumpSink)
    } else {
        Box::new(CarbonSink::new(
            host,
            port,
            policy,
            cli.metric_prefix.clone().unwrap_or_default(),
        ))
    };

    let engine = RelayEngine::new(Box::new(short), Box::new(long), sink);
    let merged = engine.run().await?;
    info!("run finished: {} metrics", merged.len());
    Ok(())
}
