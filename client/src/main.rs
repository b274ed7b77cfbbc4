mod config;
mod driver;
mod session;

use bootprobe::NodeId;
use clap::Parser;
use config::Config;
use driver::Driver;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Send RUN_NODE and STOP_NODE requests to a Bootstrap service and dump the replies", long_about = None)]
struct Args {
    /// Bootstrap host
    #[arg(default_value = config::DEFAULT_HOST)]
    host: String,

    /// Bootstrap UDP port
    #[arg(default_value_t = bootprobe::PORT)]
    port: u16,

    /// Node to start and then stop (0-255)
    #[arg(default_value_t = config::DEFAULT_NODE)]
    node: NodeId,

    /// How long to wait for each reply, in milliseconds
    #[arg(long, default_value_t = config::DEFAULT_DEADLINE_MS)]
    deadline_ms: u64,

    /// Pause between the RUN and STOP requests, in milliseconds
    #[arg(long, default_value_t = config::DEFAULT_PAUSE_MS)]
    pause_ms: u64,

    /// Ignore replies that do not come from the Bootstrap address
    #[arg(long)]
    verify_source: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            node: args.node,
            deadline: Duration::from_millis(args.deadline_ms),
            pause: Duration::from_millis(args.pause_ms),
            verify_source: args.verify_source,
        }
    }
}

fn init_logging() {
    const LOG_ENV: &str = "RUST_LOG";
    use std::str::FromStr;
    use tracing::Level;
    use tracing_subscriber::EnvFilter;

    let filter = std::env::var(LOG_ENV)
        .map(|env| {
            EnvFilter::from_str(env.as_str())
                .unwrap_or_else(|err| panic!("invalid `{}` environment variable {}", LOG_ENV, err))
        })
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::WARN.into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let config = Config::from(Args::parse());
    tracing::debug!(?config, "Starting probe");

    let driver = Driver::new(config).colored(console::colors_enabled());
    driver.run(std::io::stdout()).await?;
    Ok(())
}
