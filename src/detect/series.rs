//! Per-category daily cost series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

/// One billed amount for a resource category on a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRecord {
    pub category: String,
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostPoint {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Daily costs of a single resource category, ascending by date.
///
/// Never empty: series are only built from at least one record.
#[derive(Debug, Clone, PartialEq)]
pub struct CostSeries {
    category: String,
    points: Vec<CostPoint>,
}

impl CostSeries {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn points(&self) -> &[CostPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The latest-dated point.
    pub fn last(&self) -> Option<&CostPoint> {
        self.points.last()
    }
}

/// Partition records into one series per category, each sorted by date.
///
/// Series come out ordered by category name. Records sharing a day are all
/// kept in their input order, so the latest point of such a day is the one
/// returned last by the billing source.
pub fn group_by_category(records: impl IntoIterator<Item = CostRecord>) -> Vec<CostSeries> {
    let mut groups: BTreeMap<String, Vec<CostPoint>> = BTreeMap::new();
    for record in records {
        groups.entry(record.category).or_default().push(CostPoint {
            date: record.date,
            amount: record.amount,
        });
    }

    groups
        .into_iter()
        .map(|(category, mut points)| {
            // stable: same-day points keep their input order
            points.sort_by_key(|p| p.date);
            CostSeries { category, points }
        })
        .collect()
}
