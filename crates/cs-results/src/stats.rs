//! Per-kind element statistics over a dataset.

use std::collections::BTreeMap;

use cs_netlist::{NetKind, Netlist};
use serde::{Deserialize, Serialize};

/// Distribution of one element kind's count per circuit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementStats {
    pub mean: f64,
    pub std: f64,
    pub min: usize,
    pub max: usize,
}

/// Count statistics for every kind that appears in at least one netlist.
///
/// Circuits lacking a kind contribute a zero count to that kind.
pub fn element_stats<'a, I>(netlists: I) -> BTreeMap<NetKind, ElementStats>
where
    I: IntoIterator<Item = &'a Netlist>,
{
    let netlists: Vec<&Netlist> = netlists.into_iter().collect();
    let mut counts: BTreeMap<NetKind, Vec<usize>> = BTreeMap::new();
    for n in &netlists {
        for e in &n.elements {
            counts.entry(e.kind).or_default();
        }
    }
    for (kind, samples) in counts.iter_mut() {
        samples.extend(netlists.iter().map(|n| n.count(*kind)));
    }

    counts
        .into_iter()
        .map(|(kind, samples)| {
            let len = samples.len() as f64;
            let mean = samples.iter().sum::<usize>() as f64 / len;
            let var = samples
                .iter()
                .map(|&c| (c as f64 - mean).powi(2))
                .sum::<f64>()
                / len;
            let stats = ElementStats {
                mean,
                std: var.sqrt(),
                min: samples.iter().copied().min().unwrap_or(0),
                max: samples.iter().copied().max().unwrap_or(0),
            };
            (kind, stats)
        })
        .collect()
}
