// dmstream-probe: send one payload to a device endpoint and dump the reply
use anyhow::{bail, Context, Result};
use clap::Parser;
use dmstream::StreamConfig;
use dmstream_probe::{hex_dump, init_tracing, parse_hex, ProbeClient, Target};
use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dmstream-probe")]
#[command(about = "Send a payload to a device endpoint and read the reply", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// TCP endpoint
    #[arg(long, value_name = "HOST:PORT", conflicts_with = "unix", required_unless_present = "unix")]
    tcp: Option<String>,

    /// Unix socket endpoint
    #[arg(long, value_name = "PATH")]
    unix: Option<PathBuf>,

    /// Payload to send (read from stdin when omitted)
    payload: Option<String>,

    /// Treat the payload as hex digits
    #[arg(long)]
    hex: bool,

    /// Number of reply bytes to read
    #[arg(short = 'n', long, value_name = "BYTES")]
    expect: Option<usize>,

    /// Readiness wait window per poll
    #[arg(long, value_name = "MS")]
    poll_timeout_ms: Option<u64>,

    /// Bound on the whole reply read
    #[arg(long, value_name = "MS")]
    read_deadline_ms: Option<u64>,

    #[arg(long, value_name = "MS", default_value_t = 5000)]
    connect_timeout_ms: u64,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "info" });

    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let target = match (cli.tcp, cli.unix) {
        (Some(addr), _) => Target::Tcp(addr),
        (None, Some(path)) => Target::Unix(path),
        (None, None) => bail!("one of --tcp or --unix is required"),
    };

    let mut config = StreamConfig::global().clone();
    if let Some(ms) = cli.poll_timeout_ms {
        config = config.with_poll_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = cli.read_deadline_ms {
        config = config.with_read_deadline(Duration::from_millis(ms));
    }

    let raw = match cli.payload {
        Some(text) => text.into_bytes(),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).context("reading payload from stdin")?;
            buf
        }
    };
    let payload = if cli.hex {
        parse_hex(&String::from_utf8_lossy(&raw))?
    } else {
        raw
    };

    let mut client = ProbeClient::connect(target, config, Duration::from_millis(cli.connect_timeout_ms))?;
    let reply = client.exchange(&payload, cli.expect)?;
    client.close()?;

    if let Some(reply) = reply {
        let stamp = chrono::Local::now().format("%Y/%m/%d %H:%M:%S%.6f");
        println!("{}  {} bytes", stamp, reply.len());
        print!("{}", hex_dump(&reply));
    }
    Ok(())
}
