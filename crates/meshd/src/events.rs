use std::io::Write;

use mesh_protocol::{LinkLayer, NodeId};
use serde::Serialize;

/// Emit a JSONL event to stdout (flushed immediately for piped output).
pub fn emit<T: Serialize>(event: &T) {
    if let Ok(json) = serde_json::to_string(event) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = writeln!(lock, "{json}");
        let _ = lock.flush();
    }
}

// ── Session events ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventStarted {
    pub event: &'static str,
    pub id: NodeId,
    pub listen: String,
    pub peers: Vec<String>,
}

// ── Probe results ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventEcho {
    pub event: &'static str,
    pub target: NodeId,
    pub rtt_ms: f64,
}

#[derive(Serialize)]
pub struct EventPath {
    pub event: &'static str,
    pub target: NodeId,
    pub hop_budget: u8,
    pub hops: u8,
}

#[derive(Serialize)]
pub struct EventLinks {
    pub event: &'static str,
    pub target: NodeId,
    pub link_layers: Vec<LinkLayer>,
}

// ── Failures ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventTimeout {
    pub event: &'static str,
    pub probe: &'static str,
    pub target: NodeId,
    pub timeout_ms: u64,
}

#[derive(Serialize)]
pub struct EventError {
    pub event: &'static str,
    pub probe: &'static str,
    pub target: NodeId,
    pub error: String,
}
