// dmstream-bench: Stream Throughput Benchmark Suite
// Moves bytes through pipes, Unix socket pairs and TCP loopback
mod throughput;

use clap::{Parser, Subcommand};
use std::process;

#[derive(Parser)]
#[command(name = "dmstream-bench")]
#[command(about = "Stream Throughput Benchmark Suite", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run all benchmark cases
    #[arg(short, long)]
    all: bool,

    /// Run specific case (shorthand for 'case' subcommand)
    #[arg(short = 'c', long = "case", value_name = "NAME")]
    case: Option<String>,

    /// MiB moved per case
    #[arg(short = 'm', long, value_name = "MIB", default_value_t = 64,
          value_parser = clap::value_parser!(u64).range(1..=1024 * 1024))]
    mib: u64,

    /// Bytes per read/write call
    #[arg(short = 'k', long, value_name = "BYTES", default_value_t = 64 * 1024)]
    chunk: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Run specific benchmark case
    Case {
        /// Case name to run
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// List all available benchmark cases
    List,
}

fn print_banner() {
    println!("╔═══════════════════════════════════════════════════════════════════════════╗");
    println!("║                                                                           ║");
    println!("║                   STREAM THROUGHPUT BENCHMARK SUITE                       ║");
    println!("║                                                                           ║");
    println!("║  Testing: exact reads, retrying writes, pipe / unix / tcp transports      ║");
    println!("║                                                                           ║");
    println!("╚═══════════════════════════════════════════════════════════════════════════╝");
}

fn list_cases() {
    println!("\n=== Available Benchmark Cases ===\n");

    println!("TRANSPORTS:");
    println!("  pipe                - Anonymous pipe (writes capped at PIPE_BUF)");
    println!("  unix                - Unix socket pair");
    println!("  unix-small-sndbuf   - Unix socket pair with 4 KiB send buffer");
    println!("  tcp                 - TCP loopback");
    println!("  transport-all       - Compare all transports");
    println!();

    println!("CHUNKING:");
    println!("  chunk-sizes         - Unix socket pair at 64 B, 1 KiB, 16 KiB, 256 KiB");
    println!();

    println!("Usage:");
    println!("  dmstream-bench -a                   # Run all benchmarks");
    println!("  dmstream-bench -c transport-all     # Compare transports");
    println!("  dmstream-bench case tcp -m 256      # 256 MiB over TCP loopback");
    println!("  dmstream-bench list                 # Show this list");
}

fn run_case(name: &str, total: usize, chunk: usize) -> bool {
    let results = match name {
        "pipe" => vec![throughput::bench_pipe(total, chunk)],
        "unix" => vec![throughput::bench_unix(total, chunk)],
        "unix-small-sndbuf" => vec![throughput::bench_unix_small_sndbuf(total, chunk)],
        "tcp" => vec![throughput::bench_tcp(total, chunk)],
        "transport-all" => vec![
            throughput::bench_pipe(total, chunk),
            throughput::bench_unix(total, chunk),
            throughput::bench_unix_small_sndbuf(total, chunk),
            throughput::bench_tcp(total, chunk),
        ],
        "chunk-sizes" => throughput::bench_chunk_sizes(total),
        _ => {
            eprintln!("Unknown case: {}", name);
            list_cases();
            return false;
        }
    };

    throughput::print_throughput_results(&results);
    results.iter().all(|r| r.is_ok())
}

fn main() {
    let cli = Cli::parse();
    let total = (cli.mib * 1024 * 1024) as usize;
    let chunk = cli.chunk.max(1);

    let ok = match (&cli.command, &cli.case, cli.all) {
        (Some(Commands::List), _, _) => {
            list_cases();
            true
        }
        (Some(Commands::Case { name }), _, _) | (None, Some(name), _) => {
            print_banner();
            run_case(name, total, chunk)
        }
        (None, None, true) => {
            print_banner();
            let transports = run_case("transport-all", total, chunk);
            let chunking = run_case("chunk-sizes", total, chunk);
            transports && chunking
        }
        (None, None, false) => {
            list_cases();
            true
        }
    };

    if !ok {
        process::exit(1);
    }
}
