// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic note-mirror usage example.
//!
//! Demonstrates:
//! 1. Configuring and starting a mirror against the in-memory destination
//! 2. Feeding a burst of edits (collapsed by the debounce coalescer)
//! 3. Editing an already-mirrored note (upsert updates in place)
//! 4. Simulating an external deletion (create-fallback self-healing)
//! 5. Displaying metrics (OTEL-compatible)
//! 6. Clean shutdown
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use tokio::time::sleep;

use note_mirror::{InMemoryDestination, Mirror, MirrorConfig, NoteSnapshot, SyncState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures all metrics for OTEL export)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    // Simple logging (no filter for simplicity)
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\nnote-mirror: basic usage example\n");

    // 1. Configure and start the mirror
    let state_path = "./note_mirror_demo_state.json".to_string();
    let config = MirrorConfig {
        // Short windows so the demo finishes quickly
        debounce_ms: 300,
        queue_pause_ms: 50,
        parent_ref: "page-demo-root".into(),
        state_path: state_path.clone(),
        tags_property: Some("Tags".into()),
        ..Default::default()
    };

    let destination = Arc::new(InMemoryDestination::new());
    let mirror = Mirror::new(config, destination.clone());

    println!("Starting mirror... state: {}", mirror.state());
    let schema = mirror.start().await?;
    println!("   title property: {}\n", schema.title_property);

    // 2. A burst of edits to one note collapses into a single sync
    println!("Feeding a 4-edit burst for note-1...");
    for i in 1..=4 {
        mirror.on_change(
            "note-1",
            NoteSnapshot::new(format!("Groceries v{i}\nmilk\neggs"), vec!["home".into()]),
        );
        sleep(Duration::from_millis(50)).await;
    }
    wait_for_records(&destination, 1).await;
    println!("   records: {}, creates: {} (burst collapsed)\n", destination.len(), destination.creates());

    // 3. A later edit updates the mapped record in place
    println!("Editing note-1 again after the window closed...");
    mirror.on_change("note-1", NoteSnapshot::new("Groceries final\nmilk, eggs, bread", vec!["home".into()]));
    wait_for_updates(&destination, 1).await;
    println!("   records: {}, creates: {}, updates: {}\n", destination.len(), destination.creates(), destination.updates());

    // 4. Delete the destination record out-of-band; next sync self-heals
    let state: SyncState = serde_json::from_slice(&std::fs::read(&state_path)?)?;
    let mapped_id = state.destination_ids["note-1"].clone();
    println!("Deleting destination record {mapped_id} out-of-band...");
    destination.delete_record(&mapped_id);

    mirror.on_change("note-1", NoteSnapshot::new("Groceries recovered\nmilk", vec![]));
    wait_for_creates(&destination, 2).await;
    println!("   records: {}, creates: {} (mapping repaired)\n", destination.len(), destination.creates());

    // 5. Dump raw metrics (OTEL export format)
    println!("Raw metrics:");
    dump_metrics(&snapshotter);

    // 6. Clean shutdown drains the queue, then persists state
    println!("\nShutting down...");
    mirror.shutdown().await;
    println!("   state: {}", mirror.state());

    let _ = std::fs::remove_file(&state_path);
    println!("\nExample complete.");
    Ok(())
}

async fn wait_for_records(destination: &InMemoryDestination, n: usize) {
    while destination.len() < n {
        sleep(Duration::from_millis(20)).await;
    }
}

async fn wait_for_creates(destination: &InMemoryDestination, n: u64) {
    while destination.creates() < n {
        sleep(Duration::from_millis(20)).await;
    }
}

async fn wait_for_updates(destination: &InMemoryDestination, n: u64) {
    while destination.updates() < n {
        sleep(Duration::from_millis(20)).await;
    }
}

/// Dump all captured metrics in OTEL-compatible format
fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut lines: Vec<String> = Vec::new();
    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_kind, key) = composite_key.into_parts();
        let name = key.name().to_string();
        let labels: Vec<_> = key
            .labels()
            .map(|l| format!("{}={}", l.key(), l.value()))
            .collect();
        let label_str = if labels.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", labels.join(","))
        };

        match value {
            DebugValue::Counter(v) => lines.push(format!("   {name}{label_str} = {v}")),
            DebugValue::Gauge(v) => lines.push(format!("   {name}{label_str} = {:.2}", v.into_inner())),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                lines.push(format!("   {name}{label_str} count={count} sum={sum:.4}"));
            }
        }
    }
    lines.sort();
    for line in &lines {
        println!("{line}");
    }
    if lines.is_empty() {
        println!("   (no metrics recorded)");
    }
}
