//! Statistics accumulator, per §4.7.
//!
//! Mirrors `utils.calculate_mean` / `utils.calculate_standard_deviation`
//! from the original implementation: population (not sample) variance,
//! zero for empty sample sets.

use crate::wire::SearchMode;

#[derive(Debug, Default, Clone)]
pub struct ModeStats {
    pub messages_seen: u64,
    pub hop_counts: Vec<u32>,
}

#[derive(Debug, Default)]
pub struct Statistics {
    modes: [ModeStats; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeSnapshot {
    pub messages_seen: u64,
    pub mean_hop_count: f64,
    pub stddev_hop_count: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub flooding: ModeSnapshot,
    pub random_walk: ModeSnapshot,
    pub depth_first: ModeSnapshot,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the per-mode "messages seen" counter. Called once per
    /// SEARCH handled, regardless of disposition (hit, forward, or drop).
    pub fn record_seen(&mut self, mode: SearchMode) {
        self.modes[mode.index()].messages_seen += 1;
    }

    /// Append a hop-count sample for a VAL that arrived at this node for a
    /// search it originated.
    pub fn record_hop_count(&mut self, mode: SearchMode, hop_count: u32) {
        self.modes[mode.index()].hop_counts.push(hop_count);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            flooding: snapshot_mode(&self.modes[SearchMode::Flooding.index()]),
            random_walk: snapshot_mode(&self.modes[SearchMode::RandomWalk.index()]),
            depth_first: snapshot_mode(&self.modes[SearchMode::DepthFirst.index()]),
        }
    }
}

fn snapshot_mode(mode: &ModeStats) -> ModeSnapshot {
    ModeSnapshot {
        messages_seen: mode.messages_seen,
        mean_hop_count: mean(&mode.hop_counts),
        stddev_hop_count: population_stddev(&mode.hop_counts),
    }
}

fn mean(samples: &[u32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&n| n as f64).sum::<f64>() / samples.len() as f64
}

fn population_stddev(samples: &[u32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let m = mean(samples);
    let variance = samples
        .iter()
        .map(|&n| {
            let d = n as f64 - m;
            d * d
        })
        .sum::<f64>()
        / samples.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_samples_report_zero() {
        let stats = Statistics::new();
        let snap = stats.snapshot();
        assert_eq!(snap.flooding.mean_hop_count, 0.0);
        assert_eq!(snap.flooding.stddev_hop_count, 0.0);
    }

    #[test]
    fn mean_and_stddev_match_the_population_formula() {
        let mut stats = Statistics::new();
        for h in [2, 4, 4, 4, 5, 5, 7, 9] {
            stats.record_hop_count(SearchMode::Flooding, h);
        }
        let snap = stats.snapshot();
        assert_eq!(snap.flooding.mean_hop_count, 5.0);
        assert!((snap.flooding.stddev_hop_count - 2.0).abs() < 1e-9);
    }

    #[test]
    fn counters_are_independent_per_mode() {
        let mut stats = Statistics::new();
        stats.record_seen(SearchMode::Flooding);
        stats.record_seen(SearchMode::Flooding);
        stats.record_seen(SearchMode::RandomWalk);
        let snap = stats.snapshot();
        assert_eq!(snap.flooding.messages_seen, 2);
        assert_eq!(snap.random_walk.messages_seen, 1);
        assert_eq!(snap.depth_first.messages_seen, 0);
    }
}
