//! Load generator for the URL shortener.
//!
//! Shortens a batch of URLs and resolves every returned code, counting how
//! many requests succeed, are rate limited or fail. The stress test endpoint
//! runs it against an isolated server and streams its output.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin loadgen -- --target http://127.0.0.1:8090 --requests 5000 --concurrency 16
//!
//! # Target taken from the environment, as the stress harness does
//! STRESS_TARGET_URL=http://127.0.0.1:8090 cargo run --bin loadgen
//! ```
//!
//! # Exit Status
//!
//! Non-zero only when the target could not be reached by any request.

use anyhow::{Result, bail};
use clap::Parser;
use rate_limited_shortener::api::dto::shorten::ShortenResponse;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use ureq::Agent;

/// Fires shorten and redirect requests at a running server.
#[derive(Parser, Debug)]
#[command(name = "loadgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the server under test
    #[arg(short, long, env = "STRESS_TARGET_URL")]
    target: String,

    /// Number of URLs to shorten
    #[arg(short = 'n', long, default_value_t = 1000)]
    requests: usize,

    /// Worker threads issuing requests
    #[arg(short, long, default_value_t = 8)]
    concurrency: usize,

    /// Print a progress line after this many completed requests
    #[arg(long, default_value_t = 100)]
    report_every: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,
}

/// Result of shortening one URL and resolving its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ok,
    Limited,
    Failed,
    Unreachable,
}

#[derive(Default)]
struct Tally {
    done: AtomicUsize,
    ok: AtomicUsize,
    limited: AtomicUsize,
    failed: AtomicUsize,
    unreachable: AtomicUsize,
}

impl Tally {
    /// Records an outcome and returns the number of completed requests.
    fn record(&self, outcome: Outcome) -> usize {
        let counter = match outcome {
            Outcome::Ok => &self.ok,
            Outcome::Limited => &self.limited,
            Outcome::Failed => &self.failed,
            Outcome::Unreachable => &self.unreachable,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.done.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn line(&self) -> String {
        format!(
            "ok={} limited={} failed={}",
            self.ok.load(Ordering::Relaxed),
            self.limited.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed) + self.unreachable.load(Ordering::Relaxed),
        )
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.concurrency == 0 {
        bail!("--concurrency must be greater than 0");
    }
    if cli.report_every == 0 {
        bail!("--report-every must be greater than 0");
    }

    let target = cli.target.trim_end_matches('/').to_string();
    let agent: Agent = Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(cli.timeout)))
        .http_status_as_error(false)
        .max_redirects(0)
        .max_redirects_will_error(false)
        .build()
        .into();

    println!(
        "Sending {} requests to {} from {} workers",
        cli.requests, target, cli.concurrency
    );

    let next = Arc::new(AtomicUsize::new(0));
    let tally = Arc::new(Tally::default());
    let started = Instant::now();

    let workers: Vec<_> = (0..cli.concurrency)
        .map(|_| {
            let agent = agent.clone();
            let target = target.clone();
            let next = next.clone();
            let tally = tally.clone();
            let (total, report_every) = (cli.requests, cli.report_every);

            thread::spawn(move || {
                loop {
                    let n = next.fetch_add(1, Ordering::Relaxed);
                    if n >= total {
                        break;
                    }

                    let done = tally.record(shorten_and_resolve(&agent, &target, n));
                    if done % report_every == 0 || done == total {
                        println!("[{done:>6}/{total}] {}", tally.line());
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        if worker.join().is_err() {
            eprintln!("A worker thread panicked");
        }
    }

    let elapsed = started.elapsed();
    let rate = cli.requests as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    println!(
        "Finished {} requests in {:.2}s ({:.1} req/s): {}",
        cli.requests,
        elapsed.as_secs_f64(),
        rate,
        tally.line()
    );

    let unreachable = tally.unreachable.load(Ordering::Relaxed);
    if cli.requests > 0 && unreachable == cli.requests {
        eprintln!("Target {target} was unreachable");
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

/// Shortens a unique URL, then resolves the code without following the
/// redirect.
fn shorten_and_resolve(agent: &Agent, target: &str, n: usize) -> Outcome {
    let body = serde_json::json!({ "original": format!("https://example.com/loadgen/{n}") });

    let mut response = match agent.post(format!("{target}/api/shorten")).send_json(&body) {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };
    match response.status().as_u16() {
        201 => {}
        429 => return Outcome::Limited,
        _ => return Outcome::Failed,
    }

    let created: ShortenResponse = match response.body_mut().read_json() {
        Ok(created) => created,
        Err(_) => return Outcome::Failed,
    };

    match agent.get(format!("{target}/{}", created.short_code)).call() {
        Ok(response) => match response.status().as_u16() {
            307 => Outcome::Ok,
            429 => Outcome::Limited,
            _ => Outcome::Failed,
        },
        Err(e) => classify_error(&e),
    }
}

fn classify_error(error: &ureq::Error) -> Outcome {
    match error {
        ureq::Error::Io(_) | ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
            Outcome::Unreachable
        }
        _ => Outcome::Failed,
    }
}
