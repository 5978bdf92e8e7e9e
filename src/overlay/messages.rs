use crate::overlay::OverlayError;
use serde_json::Value;

/// Messages travelling from the host process into the overlay worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostToOverlay {
    Show,
    UpdateContent {
        target_id: String,
        warnings_json: String,
    },
    Dismiss,
}

/// Messages travelling from the overlay worker back to the host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayToHost {
    WindowReady,
    WindowFailed { error: OverlayError },
    Intent(OverlayIntent),
}

/// User decision made inside the overlay. The worker never launches anything
/// itself; it only reports the intent and the manager acts on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayIntent {
    Allow { target_id: String },
    Close,
}

/// Parse the warning payload handed over by the host. The payload is expected
/// to be a JSON array of strings; anything else (bad JSON, non-array,
/// non-string entries) yields an empty set rather than an error so the overlay
/// falls back to its empty view.
pub fn parse_warning_payload(payload: &str) -> Vec<String> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(items)) => {
            let mut warnings = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(text) => warnings.push(text),
                    other => {
                        tracing::warn!(?other, "dropping non-string warning entry");
                    }
                }
            }
            warnings
        }
        Ok(other) => {
            tracing::warn!(?other, "warning payload is not a JSON array");
            Vec::new()
        }
        Err(err) => {
            tracing::warn!(%err, "malformed warning payload");
            Vec::new()
        }
    }
}
