use crate::domain::model::{ReportRow, SummaryCount};

/// Flat, append-only collection of rows from every device.
#[derive(Debug, Default)]
pub struct Aggregator {
    rows: Vec<ReportRow>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, rows: Vec<ReportRow>) {
        self.rows.extend(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<ReportRow> {
        self.rows
    }
}

pub fn summarize(rows: &[ReportRow]) -> SummaryCount {
    let mut summary = SummaryCount::default();
    for row in rows {
        summary.increment(row.label());
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Dot1xConfigured;

    fn row(device: &str, iface: &str, configured: bool) -> ReportRow {
        ReportRow {
            device_name: device.to_string(),
            device_id: format!("{}-id", device),
            interface_name: iface.to_string(),
            configured,
        }
    }

    #[test]
    fn test_aggregator_preserves_order_and_duplicates() {
        let mut aggregator = Aggregator::new();
        aggregator.extend(vec![row("sw1", "Gi1/0/1", true), row("sw1", "Gi1/0/1", true)]);
        aggregator.extend(Vec::new());
        aggregator.extend(vec![row("sw2", "Gi1/0/7", false)]);

        assert_eq!(aggregator.len(), 3);
        let rows = aggregator.into_rows();
        assert_eq!(rows[0].device_name, "sw1");
        assert_eq!(rows[1].interface_name, "Gi1/0/1");
        assert_eq!(rows[2].device_name, "sw2");
    }

    #[test]
    fn test_summarize_counts_both_labels() {
        let rows = vec![
            row("sw1", "Gi1/0/1", true),
            row("sw1", "Gi1/0/2", false),
            row("sw1", "Gi1/0/3", false),
        ];

        let summary = summarize(&rows);
        assert_eq!(summary.get(Dot1xConfigured::Yes), Some(1));
        assert_eq!(summary.get(Dot1xConfigured::No), Some(2));
    }

    #[test]
    fn test_summarize_omits_empty_label() {
        let summary = summarize(&[row("sw1", "Gi1/0/1", true)]);
        assert_eq!(summary.get(Dot1xConfigured::Yes), Some(1));
        assert_eq!(summary.get(Dot1xConfigured::No), None);

        assert!(summarize(&[]).is_empty());
    }
}
