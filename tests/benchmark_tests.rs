//! Performance benchmarks for critical game systems

use client::level::default_level;
use serde_json::json;
use server::config::RelayConfig;
use server::relay::Relay;
use shared::{detect_collision_side, Rect, AVATAR_SIZE};
use std::time::Instant;
use tokio::sync::mpsc;

/// Benchmarks collision side detection
#[test]
fn benchmark_collision_side_detection() {
    let platform = Rect::new(200.0, 300.0, 100.0, 80.0);
    let movers: Vec<Rect> = (0..100)
        .map(|i| Rect::new(180.0 + i as f32, 290.0 + (i % 7) as f32, AVATAR_SIZE, AVATAR_SIZE))
        .collect();

    let iterations = 1_000;
    let start = Instant::now();

    let mut hits = 0;
    for _ in 0..iterations {
        for mover in &movers {
            if detect_collision_side(mover, &platform).is_some() {
                hits += 1;
            }
        }
    }

    let duration = start.elapsed();
    println!(
        "Collision side detection: {} checks in {:?} ({:.2} ns/check)",
        iterations * movers.len(),
        duration,
        duration.as_nanos() as f64 / (iterations * movers.len()) as f64
    );

    assert!(hits > 0);
    // Should complete in under half a second for 100k checks
    assert!(duration.as_millis() < 500);
}

/// Benchmarks full world steps with many avatars on the default level
#[test]
fn benchmark_world_step() {
    let mut world = default_level();
    for i in 0..20 {
        world.spawn_avatar(20.0 + i as f32 * 35.0, 100.0);
    }

    let frames = 2_000u64;
    let start = Instant::now();

    for frame in 1..=frames {
        world.step(frame * 16);
    }

    let duration = start.elapsed();
    println!(
        "World step: {} frames x 20 avatars in {:?} ({:.2} μs/frame)",
        frames,
        duration,
        duration.as_micros() as f64 / frames as f64
    );

    assert_eq!(world.avatars().count(), 20);
    assert!(duration.as_secs() < 5);
}

/// Benchmarks relay fan-out of position updates in a crowded room
#[test]
fn benchmark_relay_broadcast() {
    let mut relay = Relay::new(RelayConfig::default());
    let mut receivers = Vec::new();
    let mut sessions = Vec::new();

    for i in 0..32 {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = relay.accept(tx);
        let join = json!({"type": "join_room", "roomId": "crowd", "clientId": format!("p{}", i)});
        relay.handle_text(session, &join.to_string());
        sessions.push(session);
        receivers.push(rx);
    }

    let updates = 500;
    let start = Instant::now();

    for n in 0..updates {
        let session = sessions[n % sessions.len()];
        let update = json!({"type": "player_update", "state": {"x": n, "y": 100}});
        relay.handle_text(session, &update.to_string());
    }

    let duration = start.elapsed();

    let mut delivered = 0;
    for rx in &mut receivers {
        while rx.try_recv().is_ok() {
            delivered += 1;
        }
    }

    println!(
        "Relay broadcast: {} updates to {} peers in {:?} ({} frames delivered)",
        updates,
        sessions.len() - 1,
        duration,
        delivered
    );

    // Joins: one snapshot each plus one notice per earlier member.
    let join_frames = 32 + (32 * 31) / 2;
    assert_eq!(delivered, join_frames + updates * 31);
    assert!(duration.as_secs() < 5);
}
