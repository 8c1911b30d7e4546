//! Respite CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse arguments**: service, method, call arguments, and explicit
//!    connection overrides.
//! 2. **Wire observability**: configure `tracing-subscriber` with an
//!    `EnvFilter` and a text or JSON formatter on stderr. All `tracing` spans
//!    and events emitted by every crate in the workspace flow through it.
//! 3. **Construct infrastructure**: load [`settings::SharedSettings`], build a
//!    [`transport::HttpsTransport`], and inject both into
//!    [`respite::RespiteClient`].
//! 4. **Invoke**: call the method once and print the response as JSON on
//!    stdout. A response carrying `error` exits with status 2.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use respite::{Args, Brand, ClientConfig, Namespace, Pass, RespiteClient, ServiceName};
use serde_json::Value;
use settings::SharedSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use transport::{HttpsTransport, TransportConfig};

/// Log filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "respite=info";

/// Invoke a method on a Respite service.
#[derive(Parser, Debug)]
#[command(name = "respite", version, about)]
struct Cli {
    /// Service name (looked up as `<name>_service`, then `<name>`)
    service: String,

    /// Remote method name
    method: String,

    /// Call argument as `key=value`; values parse as JSON, falling back to a string
    #[arg(short, long = "arg", value_name = "KEY=VALUE")]
    args: Vec<String>,

    /// Call arguments as a JSON object, merged under any `--arg` values
    #[arg(long, value_name = "JSON")]
    json: Option<String>,

    /// Shared configuration file (defaults to $RESPITE_CONFIG or ./respite.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    path: Option<String>,

    #[arg(long)]
    brand: Option<String>,

    #[arg(long)]
    namespace: Option<String>,

    /// Use plain HTTP
    #[arg(long)]
    no_ssl: bool,

    /// Omit the `_c` caller trace
    #[arg(long)]
    no_trace: bool,

    /// Shared secret used for signing
    #[arg(long, env = "RESPITE_PASS", hide_env_values = true)]
    pass: Option<String>,

    /// Log outgoing URL and headers before sending
    #[arg(long)]
    debug_http: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs, cli.debug_http || respite::diagnostics_from_env());

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("respite: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool, wire: bool) {
    let registry = tracing_subscriber::registry().with(log_filter(
        std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        wire,
    ));
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Builds the log filter from a `RUST_LOG`-style value, defaulting to
/// `respite=info`. When wire diagnostics are on, their target is always
/// admitted so the toggle is not silently undone by a stricter filter.
fn log_filter(directives: Option<&str>, wire: bool) -> EnvFilter {
    let filter = directives
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));
    if !wire {
        return filter;
    }
    match format!("{}=info", respite::DIAGNOSTICS_TARGET).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let store = match &cli.config {
        Some(path) => SharedSettings::load(path)?,
        None => SharedSettings::discover()?,
    };
    let transport = HttpsTransport::with_config(&TransportConfig {
        timeout: Duration::from_secs(cli.timeout),
        ..TransportConfig::default()
    })?;

    let config = client_config(&cli)?;
    let args = call_args(&cli)?;
    let client = RespiteClient::new(config, Arc::new(store), Arc::new(transport));

    let response = client.invoke(&cli.method, args)?;
    let is_error = response.is_error();
    let output = serde_json::to_string_pretty(response.as_map())?;
    println!("{output}");

    Ok(if is_error {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let service =
        ServiceName::new(cli.service.as_str()).context("service name must not be empty")?;
    let mut config = ClientConfig::new(service);
    config.host = cli.host.clone();
    config.port = cli.port;
    config.path = cli.path.clone();
    config.brand = cli.brand.clone().and_then(Brand::new);
    config.namespace = cli.namespace.clone().and_then(Namespace::new);
    config.pass = cli.pass.clone().map(Pass::new);
    if cli.no_ssl {
        config.use_ssl = Some(false);
    }
    if cli.no_trace {
        config.trace = Some(false);
    }
    if cli.debug_http {
        config.diagnostics = Some(true);
    }
    Ok(config)
}

fn call_args(cli: &Cli) -> Result<Args> {
    let mut args = match &cli.json {
        Some(text) => {
            let value: Value = serde_json::from_str(text).context("--json is not valid JSON")?;
            respite::args_from_value(value)?
        }
        None => Args::new(),
    };
    for pair in &cli.args {
        let (key, value) = parse_arg(pair)?;
        args.insert(key, value);
    }
    Ok(args)
}

fn parse_arg(pair: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = pair.split_once('=') else {
        bail!("argument '{pair}' is not in KEY=VALUE form");
    };
    if key.is_empty() {
        bail!("argument '{pair}' has an empty key");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
