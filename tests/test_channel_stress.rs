// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Stress tests with varying writer/reader counts and high message volumes.
// Checks total order across handles, drain-before-terminal under races, and
// monotonicity of the closed flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use tmchan::{BroadcastChannel, Channel, Config, TryRead};

// Single writer, single reader, many messages.
#[test]
fn one_writer_one_reader_throughput() {
    let msg_count = 100_000u64;
    let c = Channel::new();
    let reader = c.duplicate();

    let t = thread::spawn(move || {
        let mut expected = 0u64;
        for v in &reader {
            assert_eq!(v, expected);
            expected += 1;
        }
        expected
    });

    let start = Instant::now();
    for i in 0..msg_count {
        c.write(i);
    }
    c.close();
    let received = t.join().unwrap();
    let elapsed = start.elapsed();

    assert_eq!(received, msg_count);
    eprintln!(
        "1v1: {msg_count} msgs in {:.1}ms ({:.0} msg/s)",
        elapsed.as_secs_f64() * 1000.0,
        msg_count as f64 / elapsed.as_secs_f64()
    );
}

// Several racing writers, several broadcast readers: every reader sees every
// item exactly once and all readers agree on the relative order.
#[test]
fn many_writers_many_readers_agree_on_order() {
    const WRITERS: u64 = 4;
    const READERS: usize = 4;
    const PER_WRITER: u64 = 5_000;

    let root = BroadcastChannel::with_config(&Config::new().with_spin_count(4));
    let readers: Vec<Channel<u64>> = (0..READERS).map(|_| root.subscribe()).collect();

    let handles: Vec<_> = readers
        .into_iter()
        .map(|r| thread::spawn(move || r.iter().collect::<Vec<u64>>()))
        .collect();

    let start = Arc::new(Barrier::new(WRITERS as usize));
    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let tx = root.clone();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for i in 0..PER_WRITER {
                    tx.write(w * PER_WRITER + i);
                }
            })
        })
        .collect();

    for w in writers {
        w.join().unwrap();
    }
    root.close();

    let logs: Vec<Vec<u64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for log in &logs {
        assert_eq!(log.len() as u64, WRITERS * PER_WRITER);
        assert_eq!(log, &logs[0], "readers observed different orders");
    }

    // Per-writer order is preserved within the total order.
    let mut last = vec![None::<u64>; WRITERS as usize];
    for &v in &logs[0] {
        let w = (v / PER_WRITER) as usize;
        if let Some(prev) = last[w] {
            assert!(v > prev);
        }
        last[w] = Some(v);
    }
}

// Close races with writes: each reader gets exactly the items committed
// before the close, then end of stream.
#[test]
fn close_racing_writers() {
    for _ in 0..20 {
        let c = Channel::new();
        let r1 = c.duplicate();
        let r2 = c.duplicate();
        let stop = Arc::new(AtomicBool::new(false));

        let writers: Vec<_> = (0..3)
            .map(|_| {
                let tx = c.duplicate();
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    let mut i = 0u64;
                    while !stop.load(Ordering::Relaxed) {
                        tx.write(i);
                        i += 1;
                    }
                    // Anything written after the close must not show up.
                    tx.write(u64::MAX);
                })
            })
            .collect();

        thread::sleep(std::time::Duration::from_millis(2));
        c.close();
        stop.store(true, Ordering::Relaxed);
        for w in writers {
            w.join().unwrap();
        }

        let got1: Vec<u64> = r1.iter().collect();
        let got2: Vec<u64> = r2.iter().collect();
        assert_eq!(got1, got2);
        assert!(!got1.contains(&u64::MAX));
        assert_eq!(r1.try_read(), TryRead::Closed);
        assert_eq!(r2.try_read(), TryRead::Closed);
    }
}

// Once any observer sees the flag set, no later observation on any handle
// sees it cleared.
#[test]
fn closed_flag_is_monotonic() {
    let c: Channel<u32> = Channel::new();

    let observers: Vec<_> = (0..4)
        .map(|_| {
            let h = c.duplicate();
            thread::spawn(move || {
                let mut was_closed = false;
                for _ in 0..50_000 {
                    let now = h.is_closed();
                    assert!(!(was_closed && !now), "closed flag reverted");
                    was_closed = now;
                }
            })
        })
        .collect();

    c.close();
    for o in observers {
        o.join().unwrap();
    }
    assert!(c.is_closed());
}

// Blocked readers on a shared handle all terminate when the channel closes,
// and together consume exactly what was written.
#[test]
fn blocked_readers_drain_then_terminate() {
    let c = Arc::new(Channel::new());
    let consumed = Arc::new(AtomicU64::new(0));

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let c = Arc::clone(&c);
            let consumed = Arc::clone(&consumed);
            thread::spawn(move || {
                while c.read().is_some() {
                    consumed.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for i in 0..10_000u32 {
        c.write(i);
    }
    c.close();
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(consumed.load(Ordering::Relaxed), 10_000);
}
