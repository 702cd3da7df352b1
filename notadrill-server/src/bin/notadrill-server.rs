use anyhow::{bail, Context, Result};
use log::info;
use notadrill_server::config::Config;
use notadrill_server::file_server::FileServer;
use notadrill_server::selector::AssetSelector;
use notadrill_server::server::run;
use rusoto_core::Region;
use std::io::Read;
use std::net::TcpListener;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "notadrill-server",
    about = "Pick a random asset from an S3 bucket and tell where it lives"
)]
struct Opt {
    /// Bucket holding the assets
    #[structopt(short, long, default_value = "notdrills", env = "NOTADRILL_BUCKET")]
    bucket: String,
    /// Bucket region, used both to reach S3 and to build the public urls
    #[structopt(short, long, default_value = "eu-west-2", env = "NOTADRILL_REGION")]
    region: String,
    /// Custom S3-compatible endpoint (e.g. localstack or minio)
    #[structopt(long, env = "NOTADRILL_S3_ENDPOINT")]
    s3_endpoint: Option<String>,
    /// Stop listing the bucket after this many keys
    #[structopt(long, env = "NOTADRILL_MAX_KEYS")]
    max_keys: Option<usize>,
    /// Value of the Access-Control-Allow-Origin header
    #[structopt(long, default_value = "*", env = "NOTADRILL_CORS_ORIGIN")]
    cors_origin: String,
    /// Time allowed to a single invocation, in milliseconds
    #[structopt(long, default_value = "3000", env = "NOTADRILL_TIMEOUT_MS")]
    timeout_ms: u64,
    /// Time allowed to a single listing call before it is retried, in milliseconds
    #[structopt(long, default_value = "1000", env = "NOTADRILL_ATTEMPT_TIMEOUT_MS")]
    attempt_timeout_ms: u64,
    /// Wait this long before retrying a failed listing call, in milliseconds
    #[structopt(long, default_value = "100", env = "NOTADRILL_RETRY_BACKOFF_MS")]
    retry_backoff_ms: u64,
    /// Report storage failures to this Sentry DSN
    #[structopt(long, env = "NOTADRILL_SENTRY_DSN")]
    sentry_dsn: Option<String>,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Handle a single event and print the response envelope
    #[structopt(name = "invoke")]
    Invoke {
        /// Read the event from <file> instead of stdin
        #[structopt(short, long, name = "file", parse(from_os_str))]
        event: Option<PathBuf>,
    },
    /// Serve the handler over HTTP
    #[structopt(name = "serve")]
    Serve {
        /// Server host
        #[structopt(short = "H", default_value = "localhost", env = "NOTADRILL_HOST")]
        host: String,
        /// Server port
        #[structopt(short = "P", default_value = "8080", env = "NOTADRILL_PORT")]
        port: u16,
    },
}

impl Opt {
    fn to_config(&self) -> Result<Config> {
        let region = match &self.s3_endpoint {
            Some(endpoint) => Region::Custom {
                name: self.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => Region::from_str(&self.region)
                .with_context(|| format!("invalid region {:?}", self.region))?,
        };

        if self.max_keys == Some(0) {
            bail!("--max-keys must be greater than zero");
        }

        Ok(Config {
            max_keys: self.max_keys,
            cors_origin: self.cors_origin.clone(),
            invocation_timeout: Duration::from_millis(self.timeout_ms),
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            ..Config::new(self.bucket.clone(), region)
        })
    }
}

fn read_event(path: Option<&PathBuf>) -> Result<serde_json::Value> {
    let mut content = String::new();

    match path {
        Some(path) => {
            content = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read event from {}", path.display()))?
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut content)
                .context("cannot read event from stdin")?;
        }
    }

    if content.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }

    serde_json::from_str(&content).context("the event is not valid JSON")
}

#[actix_web::main]
async fn main() -> Result<()> {
    color_backtrace::install();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("notadrill_server=info,actix_web=info"),
    )
    .init();

    let opt = Opt::from_args();

    let _sentry = opt
        .sentry_dsn
        .as_deref()
        .map(|dsn| sentry::init((dsn, sentry::ClientOptions::default())));

    let config = opt.to_config()?;
    let file_server = FileServer::new(&config)?;
    let selector = AssetSelector::new(&config, file_server);

    match &opt.cmd {
        Command::Invoke { event } => {
            let event = read_event(event.as_ref())?;
            let envelope = selector.handle(&event).await;
            println!("{}", serde_json::to_string(&envelope)?);
        }
        Command::Serve { host, port } => {
            let listener = TcpListener::bind((host.as_str(), *port))?;
            info!(
                "serving random assets from {} on {}",
                config.bucket,
                listener.local_addr()?
            );
            run(listener, selector)?.await?;
        }
    }

    Ok(())
}
