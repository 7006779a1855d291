//! Frequency-plan management: a pool of channels assigned to nodes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::radio::channel::Channel;

/// How channels are handed out to nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelDistribution {
    /// Cycle through the plan in order.
    RoundRobin,
    /// Uniform random pick per assignment.
    Random,
}

/// Owns the channel plan and assigns channels by index.
///
/// Other components never hold a `Channel` directly; they keep the index
/// returned by [`MultiChannel::select`] and resolve it through the plan.
#[derive(Debug, Clone)]
pub struct MultiChannel {
    pub channels: Vec<Channel>,
    distribution: ChannelDistribution,
    rr_index: usize,
}

impl MultiChannel {
    pub fn new(
        channels: Vec<Channel>,
        distribution: ChannelDistribution,
    ) -> Result<Self, SimError> {
        if channels.is_empty() {
            return Err(SimError::InvalidConfig(
                "channel list must not be empty".into(),
            ));
        }
        Ok(Self {
            channels,
            distribution,
            rr_index: 0,
        })
    }

    /// Build a plan from raw carrier frequencies with default propagation.
    pub fn from_frequencies(
        frequencies_hz: &[f64],
        distribution: ChannelDistribution,
    ) -> Result<Self, SimError> {
        let channels = frequencies_hz
            .iter()
            .map(|&f| Channel::with_frequency(f))
            .collect();
        Self::new(channels, distribution)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, index: usize) -> &Channel {
        &self.channels[index]
    }

    /// Next channel index according to the configured distribution.
    pub fn select<R: Rng>(&mut self, rng: &mut R) -> usize {
        match self.distribution {
            ChannelDistribution::Random => rng.gen_range(0..self.channels.len()),
            ChannelDistribution::RoundRobin => {
                let index = self.rr_index % self.channels.len();
                self.rr_index += 1;
                index
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_empty_plan_rejected() {
        let err = MultiChannel::new(Vec::new(), ChannelDistribution::RoundRobin);
        assert!(matches!(err, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_round_robin_cycles() {
        let mut plan = MultiChannel::from_frequencies(
            &[868.1e6, 868.3e6, 868.5e6],
            ChannelDistribution::RoundRobin,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let picks: Vec<usize> = (0..6).map(|_| plan.select(&mut rng)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_random_stays_in_range() {
        let mut plan =
            MultiChannel::from_frequencies(&[868.1e6, 868.3e6], ChannelDistribution::Random)
                .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            assert!(plan.select(&mut rng) < plan.len());
        }
    }
}
