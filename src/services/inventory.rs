//! Report of uploaded files and the storage they use.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::models::file::RemoteFile;
use crate::services::backend::FileStore;
use crate::services::gemini::GeminiError;

const NAME_WIDTH: usize = 28;
const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRow {
    pub name: String,
    pub size: String,
    pub state: String,
    pub expires_in: String,
}

#[derive(Debug, Default)]
pub struct Inventory {
    pub rows: Vec<InventoryRow>,
    pub total_files: usize,
    pub total_bytes: u64,
}

/// `1536 -> "1.50 KB"`. Zero is `"0 B"`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} TB")
}

/// Whole hours and minutes until `expiration`.
pub fn expires_in(expiration: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(expiration) = expiration else {
        return "N/A".to_string();
    };

    let remaining = (expiration - now).num_seconds();
    if remaining <= 0 {
        return "Expired".to_string();
    }
    format!("{}h {}m", remaining / 3600, (remaining % 3600) / 60)
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() <= NAME_WIDTH {
        return name.to_string();
    }
    let head: String = name.chars().take(NAME_WIDTH - 3).collect();
    format!("{head}...")
}

pub fn build_inventory(files: &[RemoteFile], now: DateTime<Utc>) -> Inventory {
    let rows = files
        .iter()
        .map(|f| InventoryRow {
            name: truncate_name(f.display_name.as_deref().unwrap_or(&f.name)),
            size: format_size(f.size_bytes.unwrap_or(0)),
            state: f.state.to_string(),
            expires_in: expires_in(f.expiration_time, now),
        })
        .collect();

    Inventory {
        rows,
        total_files: files.len(),
        total_bytes: files.iter().filter_map(|f| f.size_bytes).sum(),
    }
}

pub async fn fetch_inventory<B: FileStore>(backend: &B) -> Result<Inventory, GeminiError> {
    let files = backend.list_files().await?;
    tracing::debug!(files = files.len(), "Listed uploaded files");
    Ok(build_inventory(&files, Utc::now()))
}

pub fn render_inventory(inventory: &Inventory) -> String {
    let mut out = String::new();
    let rule = "-".repeat(RULE_WIDTH);

    if inventory.rows.is_empty() {
        let _ = writeln!(out, "No files found in storage.");
        return out;
    }

    let _ = writeln!(out, "{:<30} | {:<10} | {:<10} | Expires In", "Display Name", "Size", "State");
    let _ = writeln!(out, "{rule}");
    for row in &inventory.rows {
        let _ = writeln!(
            out,
            "{:<30} | {:<10} | {:<10} | {}",
            row.name, row.size, row.state, row.expires_in
        );
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Total Files: {}", inventory.total_files);
    let _ = writeln!(out, "Total Storage Used: {}", format_size(inventory.total_bytes));
    let _ = writeln!(out, "\nNote: Files automatically expire after 48 hours.");

    out
}
