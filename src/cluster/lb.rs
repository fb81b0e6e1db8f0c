//! Gateway selection strategies.
//!
//! Implement [`Selector`] to plug a different strategy into the
//! dispatcher; [`Weighted`] is the production one.

use rand::Rng;

use crate::config::GatewayConfig;

/// Picks the gateway index for an attempt.
///
/// # Example
///
/// ```ignore
/// struct AlwaysFirst;
///
/// impl Selector for AlwaysFirst {
///     fn name(&self) -> &'static str {
///         "always_first"
///     }
///
///     fn select(&self, _exclude: Option<usize>) -> usize {
///         0
///     }
/// }
/// ```
pub trait Selector: Send + Sync {
    /// Returns the name of this selection strategy.
    fn name(&self) -> &'static str;

    /// Select a gateway index, avoiding `exclude` when another exists.
    fn select(&self, exclude: Option<usize>) -> usize;
}

/// Capacity-weighted random selection.
///
/// Gateway `i` owns the half-open draw range `[boundary[i-1], boundary[i])`.
/// Gateways whose capacity is missing, unparsable or zero keep their index
/// but own an empty range, so they are never selected, neither first nor
/// as a failover target.
#[derive(Debug, Clone)]
pub struct Weighted {
    /// (exclusive upper boundary, gateway index), boundaries strictly increasing
    ranges: Vec<(u64, usize)>,
    total_weight: u64,
}

impl Weighted {
    /// Build from per-gateway capacities in gateway order.
    pub fn new(capacities: &[Option<u32>]) -> Self {
        let mut ranges = Vec::with_capacity(capacities.len());
        let mut total_weight = 0u64;

        for (index, capacity) in capacities.iter().enumerate() {
            match capacity {
                Some(weight) if *weight > 0 => {
                    total_weight += u64::from(*weight);
                    ranges.push((total_weight, index));
                }
                _ => {}
            }
        }

        Self {
            ranges,
            total_weight,
        }
    }

    /// Build from gateway config, parsing `number_of_sims`.
    pub fn from_configs(gateways: &[GatewayConfig]) -> Self {
        let capacities: Vec<Option<u32>> = gateways.iter().map(|g| g.capacity()).collect();
        Self::new(&capacities)
    }

    /// Sum of all usable capacities.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Exclusive upper boundaries in gateway order.
    pub fn boundaries(&self) -> Vec<u64> {
        self.ranges.iter().map(|(boundary, _)| *boundary).collect()
    }

    /// Indices of gateways that can be selected.
    pub fn selectable(&self) -> Vec<usize> {
        self.ranges.iter().map(|(_, index)| *index).collect()
    }

    /// Deterministic selection for a given draw. Draws past the total weight wrap.
    pub fn select_with_draw(&self, draw: u64, exclude: Option<usize>) -> usize {
        if self.total_weight == 0 {
            return 0;
        }

        let draw = draw % self.total_weight;
        let position = self
            .ranges
            .iter()
            .position(|(boundary, _)| *boundary > draw)
            .unwrap_or(0);

        let selected = self.ranges[position].1;
        if exclude != Some(selected) {
            return selected;
        }

        if position + 1 < self.ranges.len() {
            self.ranges[position + 1].1
        } else if position == 0 {
            // Single usable gateway, nothing else to offer
            selected
        } else {
            self.ranges[position - 1].1
        }
    }
}

impl Selector for Weighted {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn select(&self, exclude: Option<usize>) -> usize {
        if self.total_weight == 0 {
            return 0;
        }

        let draw = rand::thread_rng().gen_range(0..self.total_weight);
        self.select_with_draw(draw, exclude)
    }
}
