use crate::ingest::{NUMERIC_COLUMNS, ParsedTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Summary statistics of one upload
///
/// `averages` always carries exactly the three numeric columns. A column
/// without any valid value has an undefined mean, stored as `None` and
/// serialized as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_count: usize,
    pub averages: BTreeMap<String, Option<f64>>,
    pub type_distribution: BTreeMap<String, u64>,
}

impl Summary {
    /// Compute the summary of a parsed upload
    ///
    /// # Arguments
    /// * `table` - Validated rows from `ingest::parse_upload`
    ///
    /// # Returns
    /// * `Summary` - Row count, per-column means and type counts
    pub fn from_table(table: &ParsedTable) -> Self {
        let averages = NUMERIC_COLUMNS
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_string(), mean(table.column(idx))))
            .collect();

        let mut type_distribution = BTreeMap::new();
        for row in &table.rows {
            *type_distribution
                .entry(row.equipment_type.clone())
                .or_insert(0) += 1;
        }

        Summary {
            total_count: table.row_count(),
            averages,
            type_distribution,
        }
    }

    /// Mean of a numeric column, `None` when undefined or unknown
    pub fn average(&self, column: &str) -> Option<f64> {
        self.averages.get(column).copied().flatten()
    }

    /// One `key: value` line per summary entry, nested maps flattened
    ///
    /// Undefined means are shown as `N/A`.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("total_count: {}", self.total_count)];
        for (column, value) in &self.averages {
            lines.push(format!("averages.{}: {}", column, DisplayMean(*value)));
        }
        for (kind, count) in &self.type_distribution {
            let label = if kind.is_empty() { "(blank)" } else { kind.as_str() };
            lines.push(format!("type_distribution.{}: {}", label, count));
        }
        lines
    }
}

/// Arithmetic mean over the present values only
fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0_f64, 0_usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Formats a possibly undefined mean with two decimals, or `N/A`
#[derive(Debug, Clone, Copy)]
pub struct DisplayMean(pub Option<f64>);

impl fmt::Display for DisplayMean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{:.2}", v),
            None => f.write_str("N/A"),
        }
    }
}
