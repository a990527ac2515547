use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occurrence count per calendar date.
///
/// Backed by an ordered map so iteration is chronological, which makes the
/// majority tie-break reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateTally {
    counts: BTreeMap<NaiveDate, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub date: NaiveDate,
    pub count: usize,
    pub total: usize,
    pub confidence: f64,
}

impl DateTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, date: NaiveDate) {
        *self.counts.entry(date).or_insert(0) += 1;
    }

    pub fn get(&self, date: NaiveDate) -> usize {
        self.counts.get(&date).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, usize)> + '_ {
        self.counts.iter().map(|(date, count)| (*date, *count))
    }

    /// `2023-01-01:3 | 2023-01-02:1`
    pub fn distribution(&self) -> String {
        self.iter()
            .map(|(date, count)| format!("{}:{}", date.format("%Y-%m-%d"), count))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl FromIterator<NaiveDate> for DateTally {
    fn from_iter<T: IntoIterator<Item = NaiveDate>>(iter: T) -> Self {
        let mut tally = DateTally::new();
        for date in iter {
            tally.add(date);
        }
        tally
    }
}

/// Majority vote over the tally.
///
/// Ties go to the earliest date. Returns `None` for an empty tally so the
/// caller never divides by zero.
pub fn aggregate(tally: &DateTally) -> Option<Aggregate> {
    let total = tally.total();
    if total == 0 {
        return None;
    }

    let mut best: Option<(NaiveDate, usize)> = None;
    for (date, count) in tally.iter() {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((date, count)),
        }
    }

    best.map(|(date, count)| Aggregate {
        date,
        count,
        total,
        confidence: count as f64 / total as f64,
    })
}
