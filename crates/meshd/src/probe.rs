use std::sync::Arc;
use std::time::Duration;

use mesh_protocol::{ControlMessageController, MeshError, NodeId};

use crate::events::{emit, EventEcho, EventError, EventLinks, EventPath, EventTimeout};

/// One control-message probe requested on the command line.
#[derive(Debug, Clone, Copy)]
pub enum Probe {
    Echo,
    Path { hop_budget: u8 },
    Links,
}

impl Probe {
    fn name(self) -> &'static str {
        match self {
            Probe::Echo => "echo",
            Probe::Path { .. } => "path",
            Probe::Links => "links",
        }
    }
}

/// Run one probe and emit its outcome as a JSON line.
pub async fn run(
    control: Arc<ControlMessageController>,
    probe: Probe,
    target: NodeId,
    timeout: Duration,
) {
    let outcome = match probe {
        Probe::Echo => control.echo(target, timeout).await.map(|rtt| {
            emit(&EventEcho {
                event: "echo",
                target,
                rtt_ms: rtt.as_secs_f64() * 1000.0,
            })
        }),
        Probe::Path { hop_budget } => control.path(target, hop_budget, timeout).await.map(|hops| {
            emit(&EventPath {
                event: "path",
                target,
                hop_budget,
                hops,
            })
        }),
        Probe::Links => control.link_layers(target, timeout).await.map(|layers| {
            emit(&EventLinks {
                event: "links",
                target,
                link_layers: layers.into_iter().collect(),
            })
        }),
    };

    match outcome {
        Ok(()) => {}
        Err(MeshError::Timeout { after, .. }) => emit(&EventTimeout {
            event: "timeout",
            probe: probe.name(),
            target,
            timeout_ms: millis(after),
        }),
        Err(e) => {
            tracing::warn!("{} probe to {target} failed: {e}", probe.name());
            emit(&EventError {
                event: "error",
                probe: probe.name(),
                target,
                error: e.to_string(),
            })
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
