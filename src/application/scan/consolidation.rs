//! Cross-timeframe consolidation.
//!
//! Results are grouped by symbol and reduced to one representative each,
//! chosen by timeframe priority (1w > 1d > 4h > 1h > 30m > 15m > 5m). For
//! directional scans a symbol whose timeframes disagree is dropped. Output
//! is sorted by symbol so it never depends on completion order.

use crate::domain::scan::{ScanResult, ScanType};
use crate::domain::signal::Direction;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolidationFilter;

impl ConsolidationFilter {
    pub fn new() -> Self {
        Self
    }

    pub fn consolidate(&self, results: Vec<ScanResult>, scan_type: ScanType) -> Vec<ScanResult> {
        let mut by_symbol: BTreeMap<String, Vec<ScanResult>> = BTreeMap::new();
        for result in results {
            by_symbol.entry(result.symbol.clone()).or_default().push(result);
        }

        by_symbol
            .into_iter()
            .filter_map(|(symbol, group)| {
                let representative = select_representative(group, scan_type);
                if representative.is_none() {
                    debug!("ConsolidationFilter: {} excluded for {} scan", symbol, scan_type);
                }
                representative
            })
            .collect()
    }
}

fn select_representative(group: Vec<ScanResult>, scan_type: ScanType) -> Option<ScanResult> {
    let Some(wanted) = scan_type.required_direction() else {
        return highest_priority(group);
    };

    let opposite = match wanted {
        Direction::Long => Direction::Short,
        Direction::Short => Direction::Long,
        Direction::Neutral => return None,
    };

    let directions = group.iter().map(|r| r.final_signal.direction());
    let (mut any_wanted, mut any_opposite) = (false, false);
    for direction in directions {
        any_wanted |= direction == wanted;
        any_opposite |= direction == opposite;
    }
    if !any_wanted || any_opposite {
        return None;
    }

    // The top timeframe represents the symbol; a neutral one excludes it
    highest_priority(group).filter(|r| r.final_signal.direction() == wanted)
}

/// Highest timeframe priority wins; duplicates on one timeframe break ties by
/// label then price so the choice is a total order.
fn highest_priority(group: Vec<ScanResult>) -> Option<ScanResult> {
    group.into_iter().max_by(|a, b| {
        a.timeframe
            .priority()
            .cmp(&b.timeframe.priority())
            .then_with(|| b.final_signal.as_str().cmp(a.final_signal.as_str()))
            .then_with(|| a.price.total_cmp(&b.price))
            .then_with(|| b.synthetic.cmp(&a.synthetic))
    })
}
