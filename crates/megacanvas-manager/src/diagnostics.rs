//! Read-only diagnostics for debug overlays and the CLI.

use std::fmt;

use serde::{Deserialize, Serialize};

use megacanvas_pool::PoolStats;

/// Format a byte count the way the debug overlay shows it.
pub fn human_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        b if b >= GB => format!("{:.3} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.3} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.3} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDiagnostics {
    pub name: String,
    /// Overlay label, e.g. `MAIN` or `MSAA`.
    pub label: String,
    pub multisampled: bool,
    pub stats: PoolStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerDiagnostics {
    pub frame: u64,
    pub pools: Vec<PoolDiagnostics>,
}

impl ManagerDiagnostics {
    pub fn total_bytes(&self) -> u64 {
        self.pools.iter().map(|p| p.stats.total_bytes).sum()
    }

    pub fn used_bytes(&self) -> u64 {
        self.pools.iter().map(|p| p.stats.used_bytes).sum()
    }

    pub fn pool(&self, label: &str) -> Option<&PoolDiagnostics> {
        self.pools.iter().find(|p| p.label == label)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PoolDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        writeln!(f, "Pool {} Available: {}", self.label, s.idle)?;
        writeln!(f, "Pool {} Used: {}", self.label, s.used)?;
        write!(
            f,
            "Pool {} Memory: {} / {}",
            self.label,
            human_bytes(s.used_bytes),
            human_bytes(s.total_bytes)
        )
    }
}

impl fmt::Display for ManagerDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Frame: {}", self.frame)?;
        for pool in &self.pools {
            writeln!(f, "{pool}")?;
        }
        Ok(())
    }
}
