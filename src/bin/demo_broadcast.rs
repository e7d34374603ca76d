// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Broadcast demo.
//
// Usage:
//   demo_broadcast [consumers] [messages]
//
// One producer writes `messages` numbers to a write-only broadcast channel and
// closes it. Each of the `consumers` threads holds its own subscribed handle,
// drains it to end of stream, and reports how many items and what sum it saw.
// Set TMCHAN_DEMO_VERBOSE=1 to see channel lifecycle events.

use std::thread;
use std::time::Instant;

use tmchan::{BroadcastChannel, Config};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONSUMERS: usize = 4;
const DEFAULT_MESSAGES: u64 = 100_000;

fn parse_arg<T: std::str::FromStr>(arg: Option<String>, default: T, what: &str) -> T {
    match arg {
        None => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            eprintln!("invalid {what}: {s:?}");
            std::process::exit(2);
        }),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let verbose = std::env::var_os("TMCHAN_DEMO_VERBOSE").is_some();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::TRACE } else { Level::INFO })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let consumers = parse_arg(args.next(), DEFAULT_CONSUMERS, "consumer count");
    let messages = parse_arg(args.next(), DEFAULT_MESSAGES, "message count");

    let config = Config::from_env()?;
    let producer: BroadcastChannel<u64> = BroadcastChannel::with_config(&config);

    let workers: Vec<_> = (0..consumers)
        .map(|id| {
            let rx = producer.subscribe();
            thread::spawn(move || {
                let mut count = 0u64;
                let mut sum = 0u64;
                for v in &rx {
                    count += 1;
                    sum = sum.wrapping_add(v);
                }
                (id, count, sum)
            })
        })
        .collect();

    let start = Instant::now();
    for i in 0..messages {
        producer.write(i);
    }
    producer.close();
    tracing::info!(messages, consumers, "producer done");

    for w in workers {
        match w.join() {
            Ok((id, count, sum)) => println!("consumer {id}: {count} items, sum {sum}"),
            Err(_) => eprintln!("consumer panicked"),
        }
    }

    let elapsed = start.elapsed();
    println!(
        "{messages} msgs to {consumers} consumers in {:.1}ms",
        elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}
