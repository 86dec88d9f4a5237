//! Independent bit-flip channel
//!
//! Each bit is flipped with probability `p`, independently of every other
//! bit (a binary symmetric channel). There is no burst model and no state
//! carried between transmissions. Randomness always comes from the caller so
//! a seeded generator reproduces a run exactly.

use crate::{ChannelError, Result};
use bitlink_core::Bits;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChannelConfig")]
pub struct ChannelConfig {
    error_rate: f64,
}

/// Unchecked wire form of [`ChannelConfig`]
#[derive(Deserialize)]
struct RawChannelConfig {
    error_rate: f64,
}

impl TryFrom<RawChannelConfig> for ChannelConfig {
    type Error = ChannelError;

    fn try_from(raw: RawChannelConfig) -> Result<Self> {
        ChannelConfig::new(raw.error_rate)
    }
}

impl ChannelConfig {
    /// Create a configuration with per-bit flip probability `error_rate`
    ///
    /// Values outside `[0, 1]` (and NaN) are rejected, never clamped.
    pub fn new(error_rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&error_rate) {
            return Err(ChannelError::InvalidErrorRate { rate: error_rate });
        }
        Ok(Self { error_rate })
    }

    /// A channel that never flips anything
    pub fn noiseless() -> Self {
        Self { error_rate: 0.0 }
    }

    /// Per-bit flip probability
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }
}

/// Frame after crossing the channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transmission {
    pub frame: Bits,
    /// 0-indexed positions that were flipped, ascending
    pub flipped: Vec<usize>,
}

impl Transmission {
    pub fn flip_count(&self) -> usize {
        self.flipped.len()
    }

    /// Fraction of the frame that was flipped
    pub fn observed_error_rate(&self) -> f64 {
        if self.frame.is_empty() {
            return 0.0;
        }
        self.flipped.len() as f64 / self.frame.len() as f64
    }
}

/// Binary symmetric channel simulator
#[derive(Debug, Clone, Copy)]
pub struct NoisyChannel {
    config: ChannelConfig,
}

impl NoisyChannel {
    pub fn new(config: ChannelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Send `frame` through the channel
    ///
    /// Draws one uniform sample in `[0, 1)` per bit and flips the bit when
    /// the sample is strictly below the error rate.
    pub fn transmit<R: Rng + ?Sized>(&self, frame: &Bits, rng: &mut R) -> Transmission {
        let p = self.config.error_rate;
        let mut noisy = Bits::with_capacity(frame.len());
        let mut flipped = Vec::new();

        for (position, bit) in frame.iter().enumerate() {
            let sample: f64 = rng.gen();
            if sample < p {
                noisy.push(bit == 0);
                flipped.push(position);
            } else {
                noisy.push(bit == 1);
            }
        }

        debug!(
            "Channel p={} flipped {} of {} bits",
            p,
            flipped.len(),
            frame.len()
        );
        Transmission {
            frame: noisy,
            flipped,
        }
    }
}

/// Flip an explicit set of 0-indexed positions
///
/// Deterministic counterpart of [`NoisyChannel::transmit`] for fault
/// injection. Repeated positions are flipped once.
pub fn inject_errors(frame: &Bits, positions: &[usize]) -> Result<Transmission> {
    let mut flipped = positions.to_vec();
    flipped.sort_unstable();
    flipped.dedup();

    let mut noisy = frame.clone();
    for &position in &flipped {
        noisy.flip(position)?;
    }
    Ok(Transmission {
        frame: noisy,
        flipped,
    })
}

/// Reproducible random source for simulations
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Random source seeded from the operating system
pub fn entropy_rng() -> ChaCha8Rng {
    ChaCha8Rng::from_entropy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_config_validation() {
        assert!(ChannelConfig::new(0.0).is_ok());
        assert!(ChannelConfig::new(1.0).is_ok());
        assert_eq!(
            ChannelConfig::new(1.5).unwrap_err(),
            ChannelError::InvalidErrorRate { rate: 1.5 }
        );
        assert!(ChannelConfig::new(-0.01).is_err());
        assert!(ChannelConfig::new(f64::NAN).is_err());
    }

    #[test]
    fn test_deserialize_validates_rate() {
        let config: ChannelConfig = serde_json::from_str(r#"{"error_rate": 0.25}"#).unwrap();
        assert_eq!(config.error_rate(), 0.25);

        let err = serde_json::from_str::<ChannelConfig>(r#"{"error_rate": 7.5}"#).unwrap_err();
        assert!(err.to_string().contains("7.5"), "got {}", err);
        assert!(serde_json::from_str::<ChannelConfig>(r#"{"error_rate": -0.1}"#).is_err());
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let channel = NoisyChannel::new(ChannelConfig::new(0.3).unwrap());
        let frame = Bits::from_bytes(b"repeatable");
        let a = channel.transmit(&frame, &mut seeded_rng(42));
        let b = channel.transmit(&frame, &mut seeded_rng(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_flipped_positions_match_frame_difference() {
        let channel = NoisyChannel::new(ChannelConfig::new(0.2).unwrap());
        let frame = Bits::from_bytes(b"difference");
        let sent = channel.transmit(&frame, &mut seeded_rng(7));
        let differing: Vec<usize> = (0..frame.len())
            .filter(|&i| frame[i] != sent.frame[i])
            .collect();
        assert_eq!(sent.flipped, differing);
        assert_eq!(sent.flip_count(), differing.len());
    }

    #[test]
    fn test_error_rate_is_roughly_honoured() {
        let channel = NoisyChannel::new(ChannelConfig::new(0.1).unwrap());
        let frame = Bits::zeros(20_000);
        let sent = channel.transmit(&frame, &mut seeded_rng(1));
        let observed = sent.observed_error_rate();
        assert!((0.08..0.12).contains(&observed), "observed {}", observed);
    }

    #[test]
    fn test_inject_errors() {
        let frame = Bits::parse("0000").unwrap();
        let sent = inject_errors(&frame, &[3, 1, 3]).unwrap();
        assert_eq!(sent.frame.to_string(), "0101");
        assert_eq!(sent.flipped, vec![1, 3]);
        assert!(inject_errors(&frame, &[4]).is_err());
    }

    #[quickcheck]
    fn prop_zero_rate_is_identity(bytes: Vec<u8>, seed: u64) -> bool {
        let channel = NoisyChannel::new(ChannelConfig::noiseless());
        let frame = Bits::from_bytes(&bytes);
        let sent = channel.transmit(&frame, &mut seeded_rng(seed));
        sent.frame == frame && sent.flipped.is_empty()
    }

    #[quickcheck]
    fn prop_unit_rate_flips_everything(bytes: Vec<u8>, seed: u64) -> bool {
        let channel = NoisyChannel::new(ChannelConfig::new(1.0).unwrap());
        let frame = Bits::from_bytes(&bytes);
        let sent = channel.transmit(&frame, &mut seeded_rng(seed));
        sent.flip_count() == frame.len()
            && (0..frame.len()).all(|i| sent.frame[i] != frame[i])
    }
}
