use std::fmt::Write;

use filehub_client::StorageStats;

use crate::format::format_bytes;

pub const PLACEHOLDER: &str = "Storage statistics unavailable";

/// Text block for the aggregate storage statistics.
pub struct StatsPanel;

impl StatsPanel {
    pub fn render(stats: Option<&StorageStats>) -> String {
        let stats = match stats {
            Some(stats) => stats,
            None => return format!("Storage Statistics\n  {}\n", PLACEHOLDER),
        };

        let mut out = String::from("Storage Statistics\n");
        let rows = [
            ("Total Files", stats.total_files.to_string()),
            ("Unique Files", stats.unique_files.to_string()),
            ("Duplicate Files", stats.duplicate_files.to_string()),
            ("Total Storage", format_bytes(stats.total_size_bytes)),
            ("Unique Storage", format_bytes(stats.unique_size_bytes)),
            (
                "Storage Savings",
                format!(
                    "{} ({:.1}% saved)",
                    format_bytes(stats.storage_savings_bytes),
                    stats.storage_savings_percentage
                ),
            ),
        ];
        for (label, value) in rows {
            // writing into a String cannot fail
            let _ = writeln!(out, "  {:<16} {}", label, value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_without_stats() {
        let out = StatsPanel::render(None);
        assert!(out.contains(PLACEHOLDER));
        assert!(!out.contains("Total Files"));
    }

    #[test]
    fn renders_all_values() {
        let stats = StorageStats {
            total_files: 4,
            unique_files: 3,
            duplicate_files: 1,
            total_size_bytes: 4096,
            unique_size_bytes: 3072,
            storage_savings_bytes: 1024,
            storage_savings_percentage: 25.0,
        };
        let out = StatsPanel::render(Some(&stats));
        assert!(out.contains("Total Files      4"));
        assert!(out.contains("Duplicate Files  1"));
        assert!(out.contains("Total Storage    4 KB"));
        assert!(out.contains("Unique Storage   3 KB"));
        assert!(out.contains("Storage Savings  1 KB (25.0% saved)"));
    }
}
