//! State of the interactive client.
//!
//! Worker tasks never touch `DashboardState` directly: they send `UiEvent`s
//! over a channel and the single coordinating loop applies them in order.

use crate::store::UploadedDataset;
use crate::summary::DisplayMean;

/// Result of a background request, delivered to the coordinating loop
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Latest dataset fetched; `None` when the server has none
    Summary(Option<UploadedDataset>),
    /// History fetched, most recent first
    History(Vec<UploadedDataset>),
    /// Short status text, including every error
    Status(String),
}

/// Everything the client currently displays
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub latest: Option<UploadedDataset>,
    pub history: Vec<UploadedDataset>,
    pub status: String,
}

impl DashboardState {
    /// Apply one event
    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Summary(latest) => {
                self.status = match &latest {
                    Some(d) => format!("Loaded dataset {}", d.id),
                    None => "No dataset uploaded yet".to_string(),
                };
                self.latest = latest;
            }
            UiEvent::History(history) => {
                self.history = history;
            }
            UiEvent::Status(status) => {
                self.status = status;
            }
        }
    }

    /// Id of the displayed dataset, used for report downloads
    pub fn latest_id(&self) -> Option<u64> {
        self.latest.as_ref().map(|d| d.id)
    }

    /// Plain-text rendering of the KPIs, distribution and history
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Chemical Equipment Visualizer ===\n");

        match &self.latest {
            Some(dataset) => {
                let summary = &dataset.summary;
                out.push_str(&format!(
                    "Dataset {} ({})\n",
                    dataset.id,
                    dataset.uploaded_at.format("%Y-%m-%d %H:%M:%S")
                ));
                out.push_str(&format!("  Total equipment : {}\n", summary.total_count));
                for (column, mean) in &summary.averages {
                    out.push_str(&format!("  Avg {:<12}: {}\n", column, DisplayMean(*mean)));
                }
                out.push_str("  Type distribution:\n");
                for (kind, count) in &summary.type_distribution {
                    let label = if kind.is_empty() { "(blank)" } else { kind.as_str() };
                    out.push_str(&format!("    {:<14} {}\n", label, count));
                }
            }
            None => out.push_str("No data loaded\n"),
        }

        out.push_str("Upload history:\n");
        if self.history.is_empty() {
            out.push_str("  (empty)\n");
        }
        for dataset in &self.history {
            out.push_str(&format!(
                "  #{:<4} {}  {} rows  {}\n",
                dataset.id,
                dataset.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
                dataset.row_count,
                dataset.original_name
            ));
        }

        out.push_str(&format!("Status: {}\n", self.status));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::Summary;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn dataset(id: u64) -> UploadedDataset {
        UploadedDataset {
            id,
            file: format!("datasets/{}_x.csv", id),
            original_name: "x.csv".to_string(),
            uploaded_at: Utc::now(),
            uploaded_by: None,
            summary: Summary {
                total_count: 2,
                averages: BTreeMap::from([
                    ("Flowrate".to_string(), Some(15.0)),
                    ("Pressure".to_string(), None),
                    ("Temperature".to_string(), Some(75.0)),
                ]),
                type_distribution: BTreeMap::from([("Pump".to_string(), 2)]),
            },
            row_count: 2,
        }
    }

    #[test]
    fn events_update_state_in_order() {
        let mut state = DashboardState::default();
        state.apply(UiEvent::History(vec![dataset(2), dataset(1)]));
        state.apply(UiEvent::Summary(Some(dataset(2))));
        assert_eq!(state.latest_id(), Some(2));
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.status, "Loaded dataset 2");

        state.apply(UiEvent::Status("Upload failed".to_string()));
        assert_eq!(state.status, "Upload failed");
        assert_eq!(state.latest_id(), Some(2));
    }

    #[test]
    fn render_shows_na_for_undefined_means() {
        let mut state = DashboardState::default();
        state.apply(UiEvent::Summary(Some(dataset(1))));
        let text = state.render();
        assert!(text.contains("Total equipment : 2"));
        assert!(text.contains("N/A"));
        assert!(text.contains("15.00"));
    }

    #[test]
    fn empty_state_renders_placeholders() {
        let mut state = DashboardState::default();
        state.apply(UiEvent::Summary(None));
        let text = state.render();
        assert!(text.contains("No data loaded"));
        assert!(text.contains("(empty)"));
        assert!(text.contains("No dataset uploaded yet"));
    }
}
