//! Multi-field weight carrying distance and travel time next to the cost

use serde::{Deserialize, Serialize};

use super::WeightHandler;
use crate::error::{ChError, Result};
use crate::network::Factor;

/// Weight tracking distance and time alongside the routing cost `value`.
/// Only `value` decides which path is shorter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AugmentedWeight {
    pub distance: f32,
    pub time: f32,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AugmentedWeightHandler;

impl WeightHandler for AugmentedWeightHandler {
    type Weight = AugmentedWeight;

    fn zero(&self) -> AugmentedWeight {
        AugmentedWeight::default()
    }

    fn infinite(&self) -> AugmentedWeight {
        AugmentedWeight {
            distance: f32::MAX,
            time: f32::MAX,
            value: f32::MAX,
        }
    }

    fn add(&self, a: AugmentedWeight, b: AugmentedWeight) -> AugmentedWeight {
        AugmentedWeight {
            distance: a.distance + b.distance,
            time: a.time + b.time,
            value: a.value + b.value,
        }
    }

    fn subtract(&self, a: AugmentedWeight, b: AugmentedWeight) -> AugmentedWeight {
        AugmentedWeight {
            distance: a.distance - b.distance,
            time: a.time - b.time,
            value: a.value - b.value,
        }
    }

    fn metric(&self, weight: AugmentedWeight) -> f32 {
        weight.value
    }

    fn scale(&self, weight: AugmentedWeight, fraction: f32) -> AugmentedWeight {
        AugmentedWeight {
            distance: weight.distance * fraction,
            time: weight.time * fraction,
            value: weight.value * fraction,
        }
    }

    fn calculate(&self, factor: &Factor, distance: f32) -> (AugmentedWeight, Option<bool>) {
        let time = if factor.speed > 0.0 {
            distance / factor.speed
        } else {
            0.0
        };
        let weight = AugmentedWeight {
            distance,
            time,
            value: distance * factor.value,
        };
        (weight, factor.direction)
    }

    fn size(&self) -> usize {
        3
    }

    fn encode(&self, weight: AugmentedWeight, words: &mut [u32]) {
        words[0] = weight.distance.to_bits();
        words[1] = weight.time.to_bits();
        words[2] = weight.value.to_bits();
    }

    fn decode(&self, words: &[u32]) -> AugmentedWeight {
        AugmentedWeight {
            distance: f32::from_bits(words[0]),
            time: f32::from_bits(words[1]),
            value: f32::from_bits(words[2]),
        }
    }

    fn validate(&self, weight: AugmentedWeight) -> Result<()> {
        for field in [weight.distance, weight.time, weight.value] {
            if !field.is_finite() || field == f32::MAX {
                return Err(ChError::InvalidWeight(field));
            }
            if field < 0.0 {
                return Err(ChError::NegativeWeight(field));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NO_VERTEX;

    #[test]
    fn test_calculate_fills_all_fields() {
        let h = AugmentedWeightHandler;
        let factor = Factor {
            value: 0.5,
            speed: 10.0,
            direction: None,
        };
        let (w, direction) = h.calculate(&factor, 100.0);
        assert_eq!(
            w,
            AugmentedWeight {
                distance: 100.0,
                time: 10.0,
                value: 50.0
            }
        );
        assert_eq!(direction, None);
    }

    #[test]
    fn test_encoded_edge_round_trips() {
        let h = AugmentedWeightHandler;
        let mut graph = h.create_graph();
        let w = AugmentedWeight {
            distance: 12.5,
            time: 0.3,
            value: 7.25,
        };
        h.add_edge(&mut graph, 2, 0, w, Some(true), NO_VERTEX).unwrap();

        let edge = graph.edges(2).next().unwrap();
        assert_eq!(h.get_edge_weight(&edge), (w, Some(true)));
    }

    #[test]
    fn test_ranking_uses_value_only() {
        let h = AugmentedWeightHandler;
        let short_slow = AugmentedWeight {
            distance: 1.0,
            time: 100.0,
            value: 5.0,
        };
        let long_fast = AugmentedWeight {
            distance: 100.0,
            time: 1.0,
            value: 4.0,
        };
        assert!(h.is_smaller(long_fast, short_slow));
        assert_eq!(h.subtract(h.add(short_slow, long_fast), long_fast), short_slow);
    }
}
