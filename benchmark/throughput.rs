// throughput.rs - Transfer rate through a pair of Streams per transport kind
use crossbeam::channel::bounded;
use dmstream::{
    PipeTransport, Stream, StreamConfig, StreamError, TcpTransport, Transport, UnixSocketTransport,
};
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

pub type BenchResult = Result<ThroughputResult, String>;

pub struct ThroughputResult {
    pub case_name: String,
    pub total_bytes: usize,
    pub chunk_size: usize,
    pub duration: Duration,
    pub writer_duration: Duration,
    pub mib_per_sec: f64,
}

// Writer thread pushes `total` bytes in `chunk` sized writes while the
// calling thread reads them back in `chunk` sized reads.
fn transfer<R, W>(case_name: &str, reader: R, writer: W, total: usize, chunk: usize) -> BenchResult
where
    R: Transport + 'static,
    W: Transport + 'static,
{
    let config = StreamConfig::global().clone();
    let mut rx = Stream::with_config(reader, config.clone()).map_err(|e| e.to_string())?;
    let mut tx = Stream::with_config(writer, config).map_err(|e| e.to_string())?;

    let payload: Vec<u8> = (0..chunk).map(|i| (i % 251) as u8).collect();
    let (done_tx, done_rx) = bounded::<Result<Duration, StreamError>>(1);

    let start = Instant::now();
    let handle = thread::spawn(move || {
        let begin = Instant::now();
        let mut sent = 0;
        let outcome = loop {
            if sent >= total {
                break tx.close().map(|_| begin.elapsed());
            }
            let n = chunk.min(total - sent);
            if let Err(e) = tx.write(&payload, Some(n)) {
                break Err(e);
            }
            sent += n;
        };
        let _ = done_tx.send(outcome);
    });

    let mut received = 0;
    while received < total {
        let n = chunk.min(total - received);
        let got = rx.read(n).map_err(|e| format!("read after {} bytes: {}", received, e))?;
        received += got.len();
    }
    let duration = start.elapsed();
    rx.close().map_err(|e| e.to_string())?;

    let writer_duration = done_rx
        .recv()
        .map_err(|_| "writer thread exited without reporting".to_string())?
        .map_err(|e| format!("writer: {}", e))?;
    let _ = handle.join();

    Ok(ThroughputResult {
        case_name: case_name.to_string(),
        total_bytes: total,
        chunk_size: chunk,
        duration,
        writer_duration,
        mib_per_sec: total as f64 / (1024.0 * 1024.0) / duration.as_secs_f64(),
    })
}

pub fn bench_pipe(total: usize, chunk: usize) -> BenchResult {
    println!("\n=== Benchmarking Pipe ({} byte chunks) ===", chunk);
    let (reader, writer) = PipeTransport::pair().map_err(|e| e.to_string())?;
    transfer("Pipe", reader, writer, total, chunk)
}

pub fn bench_unix(total: usize, chunk: usize) -> BenchResult {
    println!("\n=== Benchmarking Unix Socket Pair ({} byte chunks) ===", chunk);
    let (a, b) = UnixSocketTransport::pair().map_err(|e| e.to_string())?;
    transfer("Unix socket", a, b, total, chunk)
}

/// Tiny send buffer: most writes are partial and the retry loop does the work.
pub fn bench_unix_small_sndbuf(total: usize, chunk: usize) -> BenchResult {
    println!("\n=== Benchmarking Unix Socket Pair, 4 KiB SO_SNDBUF ({} byte chunks) ===", chunk);
    let (a, b) = UnixSocketTransport::pair().map_err(|e| e.to_string())?;
    b.set_send_buffer_size(4096).map_err(|e| e.to_string())?;
    transfer("Unix socket (small sndbuf)", a, b, total, chunk)
}

pub fn bench_tcp(total: usize, chunk: usize) -> BenchResult {
    println!("\n=== Benchmarking TCP Loopback ({} byte chunks) ===", chunk);
    let listener = TcpListener::bind("127.0.0.1:0").map_err(|e| e.to_string())?;
    let addr = listener.local_addr().map_err(|e| e.to_string())?;
    let client = TcpTransport::connect(addr).map_err(|e| e.to_string())?;
    let (server, _) = listener.accept().map_err(|e| e.to_string())?;
    transfer("TCP loopback", TcpTransport::new(server), client, total, chunk)
}

/// Same transport, different chunk sizes: per-call overhead vs bulk.
pub fn bench_chunk_sizes(total: usize) -> Vec<BenchResult> {
    println!("\n=== Benchmarking Chunk Sizes over Unix Socket Pair ===");
    [64, 1024, 16 * 1024, 256 * 1024]
        .iter()
        .map(|&chunk| bench_unix(total, chunk))
        .collect()
}

pub fn print_throughput_results(results: &[BenchResult]) {
    println!("\n{:<30} {:>12} {:>10} {:>12} {:>12} {:>10}",
        "Case", "Bytes", "Chunk", "Read (ms)", "Write (ms)", "MiB/s");
    println!("{}", "-".repeat(92));

    for result in results {
        match result {
            Ok(r) => println!("{:<30} {:>12} {:>10} {:>12.2} {:>12.2} {:>10.1}",
                r.case_name,
                r.total_bytes,
                r.chunk_size,
                r.duration.as_secs_f64() * 1000.0,
                r.writer_duration.as_secs_f64() * 1000.0,
                r.mib_per_sec,
            ),
            Err(e) => println!("{:<30} failed: {}", "-", e),
        }
    }
}
