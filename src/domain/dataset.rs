use super::period::{CaptureTime, Period};
use serde::{Deserialize, Serialize};

/// One period of the upstream table: a value per tracked query term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub period: Period,
    pub values: Vec<f64>,
    /// Upstream marks the still-accumulating latest period as partial.
    #[serde(default)]
    pub partial: bool,
}

impl ObservationRow {
    pub fn new(period: Period, values: Vec<f64>) -> Self {
        Self {
            period,
            values,
            partial: false,
        }
    }
}

/// Result of one successful fetch, before it is stamped with a capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendTable {
    pub terms: Vec<String>,
    pub rows: Vec<ObservationRow>,
}

impl TrendTable {
    pub fn partial_rows(&self) -> usize {
        self.rows.iter().filter(|row| row.partial).count()
    }

    pub fn period_range(&self) -> Option<(Period, Period)> {
        let first = self.rows.iter().map(|row| row.period).min()?;
        let last = self.rows.iter().map(|row| row.period).max()?;
        Some((first, last))
    }
}

/// An observation row tagged with the time its batch was pulled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRecord {
    pub period: Period,
    pub values: Vec<f64>,
    pub pulled_at: CaptureTime,
}

/// Rows from a single fetch, all sharing one capture time. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    terms: Vec<String>,
    rows: Vec<PullRecord>,
    captured_at: CaptureTime,
}

impl Batch {
    /// Returns `None` for a table with no rows; an empty fetch never becomes a batch.
    pub fn stamp(table: TrendTable, captured_at: CaptureTime) -> Option<Self> {
        if table.rows.is_empty() {
            return None;
        }
        let rows = table
            .rows
            .into_iter()
            .map(|row| PullRecord {
                period: row.period,
                values: row.values,
                pulled_at: captured_at,
            })
            .collect();
        Some(Self {
            terms: table.terms,
            rows,
            captured_at,
        })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn rows(&self) -> &[PullRecord] {
        &self.rows
    }

    pub fn captured_at(&self) -> CaptureTime {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The persisted history: column header plus rows.
///
/// Datasets produced by the merger hold at most one row per period and are
/// sorted ascending by period. Datasets read back from storage are taken as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    terms: Vec<String>,
    rows: Vec<PullRecord>,
}

impl Dataset {
    pub fn new(terms: Vec<String>, rows: Vec<PullRecord>) -> Self {
        Self { terms, rows }
    }

    pub fn empty(terms: Vec<String>) -> Self {
        Self::new(terms, Vec::new())
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn rows(&self) -> &[PullRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when periods are strictly ascending, which implies uniqueness.
    pub fn is_canonical(&self) -> bool {
        self.rows.windows(2).all(|pair| pair[0].period < pair[1].period)
    }

    pub fn period_range(&self) -> Option<(Period, Period)> {
        let first = self.rows.iter().map(|row| row.period).min()?;
        let last = self.rows.iter().map(|row| row.period).max()?;
        Some((first, last))
    }
}

impl From<Batch> for Dataset {
    fn from(batch: Batch) -> Self {
        Self::new(batch.terms, batch.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn capture() -> CaptureTime {
        CaptureTime::from_datetime(
            NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
                .unwrap(),
        )
    }

    fn table(months: &[u32]) -> TrendTable {
        TrendTable {
            terms: vec!["a".into()],
            rows: months
                .iter()
                .map(|m| ObservationRow::new(Period::from_ymd(2024, *m).unwrap(), vec![1.0]))
                .collect(),
        }
    }

    #[test]
    fn stamp_rejects_empty_table() {
        assert!(Batch::stamp(table(&[]), capture()).is_none());
    }

    #[test]
    fn stamp_applies_one_capture_time_to_every_row() {
        let batch = Batch::stamp(table(&[1, 2, 3]), capture()).unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.rows().iter().all(|row| row.pulled_at == capture()));
        assert_eq!(batch.captured_at(), capture());
    }

    #[test]
    fn canonical_requires_strictly_ascending_periods() {
        let sorted = Dataset::from(Batch::stamp(table(&[1, 2]), capture()).unwrap());
        assert!(sorted.is_canonical());

        let duplicated = Dataset::from(Batch::stamp(table(&[2, 2]), capture()).unwrap());
        assert!(!duplicated.is_canonical());

        let reversed = Dataset::from(Batch::stamp(table(&[3, 1]), capture()).unwrap());
        assert!(!reversed.is_canonical());
    }

    #[test]
    fn period_range_spans_min_to_max() {
        let t = table(&[5, 2, 9]);
        let (first, last) = t.period_range().unwrap();
        assert_eq!(first.to_string(), "2024-02-01");
        assert_eq!(last.to_string(), "2024-09-01");
    }
}
