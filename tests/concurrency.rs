//! Concurrency Suite
//!
//! UI callbacks and load callbacks hit one engine from many threads. All
//! mutations are serialized behind the engine lock, so counters must add up
//! exactly and invariants must hold at every observed snapshot.

use promo_admission::admission::{FixedInterval, ManualClock, PlaybackFlag, StaticEntitlement};
use promo_admission::{AdmissionConfig, AdmissionEngine, Channel, Reason, ScopeKey};
use std::sync::Arc;
use std::thread;

fn shared_engine() -> Arc<AdmissionEngine> {
    Arc::new(
        AdmissionEngine::new(
            AdmissionConfig::default(),
            Arc::new(StaticEntitlement(false)),
            Arc::new(PlaybackFlag::new(false)),
        )
        .unwrap()
        .with_clock(Arc::new(ManualClock::new(0)))
        .with_interval_source(FixedInterval(60_000)),
    )
}

#[test]
fn test_parallel_impressions_are_counted_exactly() {
    let engine = shared_engine();
    let threads = 8;
    let per_thread = 250;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let engine = engine.clone();
            thread::spawn(move || {
                for i in 0..per_thread {
                    // Half the keys collide across threads
                    let key = ScopeKey::new(format!("group-{}", (t * per_thread + i) % 500));
                    engine.record_impression(Channel::Native, Some(key));
                    let _ = engine.evaluate_native(&ScopeKey::new("group-idle"), 50, true);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.native.impression_count, (threads * per_thread) as u32);
    assert_eq!(snapshot.native.shown_for_key.len(), 500);
    assert!(engine.is_upsell_pending());
}

#[test]
fn test_interstitial_cap_holds_under_contention() {
    let engine = shared_engine();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let snapshot = engine.snapshot();
                    assert!(snapshot.interstitial.shown_count <= 2);
                    let _ = engine.evaluate_interstitial();
                }
            })
        })
        .collect();

    let writer = {
        let engine = engine.clone();
        thread::spawn(move || {
            for _ in 0..100 {
                engine.record_success(Channel::Interstitial, 120);
                if engine.evaluate_interstitial().permit {
                    engine.record_impression(Channel::Interstitial, None);
                }
            }
        })
    };

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    // Clock never moves, so only the first show fits the minimum interval
    assert_eq!(engine.snapshot().interstitial.shown_count, 1);
}

fn engine_without_interstitial_spacing() -> Arc<AdmissionEngine> {
    let mut config = AdmissionConfig::default();
    config.interstitial.min_interval_ms = 0;
    Arc::new(
        AdmissionEngine::new(
            config,
            Arc::new(StaticEntitlement(false)),
            Arc::new(PlaybackFlag::new(false)),
        )
        .unwrap()
        .with_clock(Arc::new(ManualClock::new(0))),
    )
}

#[test]
fn test_racing_admissions_share_the_last_slot() {
    let engine = engine_without_interstitial_spacing();
    engine.record_success(Channel::Interstitial, 100);
    assert!(engine.admit_interstitial().permit);

    let callers: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut permits = 0;
                for _ in 0..50 {
                    engine.record_success(Channel::Interstitial, 100);
                    if engine.admit_interstitial().permit {
                        permits += 1;
                    }
                }
                permits
            })
        })
        .collect();

    let permits: u32 = callers.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(permits, 1);
    assert_eq!(engine.snapshot().interstitial.shown_count, 2);
    assert_eq!(engine.admit_interstitial().reason, Reason::SessionCapReached);
}

#[test]
fn test_concurrent_writers_never_push_past_cap() {
    let engine = engine_without_interstitial_spacing();

    let writers: Vec<_> = (0..2)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    engine.record_success(Channel::Interstitial, 100);
                    if engine.evaluate_interstitial().permit {
                        engine.record_impression(Channel::Interstitial, None);
                    }
                    assert!(engine.snapshot().interstitial.shown_count <= 2);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    // Late records past the cap are dropped, not counted
    engine.record_impression(Channel::Interstitial, None);
    assert_eq!(engine.snapshot().interstitial.shown_count, 2);
}

#[test]
fn test_failures_and_successes_interleave() {
    let engine = shared_engine();

    let failing: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    engine.record_failure(Channel::Banner, 1, "no fill");
                }
            })
        })
        .collect();
    for handle in failing {
        handle.join().unwrap();
    }
    assert_eq!(engine.snapshot().banner.consecutive_failures, 400);

    engine.record_success(Channel::Banner, 90);
    assert_eq!(engine.snapshot().banner.consecutive_failures, 0);
}

#[tokio::test]
async fn test_upsell_observed_from_another_task() {
    let engine = shared_engine();
    let mut rx = engine.upsell_signal();

    let watcher = tokio::spawn(async move {
        rx.changed().await.unwrap();
        let raised = *rx.borrow_and_update();
        raised
    });

    let writer = engine.clone();
    tokio::task::spawn_blocking(move || {
        writer.record_impression(Channel::Native, Some(ScopeKey::new("a")));
        writer.record_impression(Channel::Native, Some(ScopeKey::new("b")));
    })
    .await
    .unwrap();

    assert!(watcher.await.unwrap());
}
