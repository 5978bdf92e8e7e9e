use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Warning text is capped so a single entry always fits on one overlay page.
pub const MAX_WARNING_TEXT_LEN: usize = 200;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WarningEntry {
    pub id: String,
    pub text: String,
}

/// One protected app: identity, the command/path/URI the OS launcher resolves,
/// and the ordered warning list shown before it opens.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProtectedApp {
    pub id: String,
    pub name: String,
    pub launch: String,
    #[serde(default)]
    pub warnings: Vec<WarningEntry>,
}

/// Load the protected-app list. A missing or empty file is a fresh install,
/// not an error.
pub fn load_protected_apps(path: &str) -> anyhow::Result<Vec<ProtectedApp>> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    if content.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}

pub fn save_protected_apps(path: &str, apps: &[ProtectedApp]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(apps)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Append a warning to the app. Rejects blank text and anything over the
/// per-entry cap; insertion order is display order.
pub fn add_warning(app: &mut ProtectedApp, text: &str) -> anyhow::Result<()> {
    let text = text.trim();
    if text.is_empty() {
        bail!("warning text is empty");
    }
    if text.chars().count() > MAX_WARNING_TEXT_LEN {
        bail!("warning text exceeds {MAX_WARNING_TEXT_LEN} characters");
    }
    app.warnings.push(WarningEntry {
        id: next_warning_id(),
        text: text.to_string(),
    });
    Ok(())
}

/// Remove a warning by entry id; returns whether anything was removed.
pub fn remove_warning(app: &mut ProtectedApp, id: &str) -> bool {
    let before = app.warnings.len();
    app.warnings.retain(|w| w.id != id);
    app.warnings.len() != before
}

/// Flatten an app's warnings to the plain-string payload the overlay takes.
pub fn warning_texts(app: &ProtectedApp) -> Vec<String> {
    app.warnings.iter().map(|w| w.text.clone()).collect()
}

fn next_warning_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:x}")
}
