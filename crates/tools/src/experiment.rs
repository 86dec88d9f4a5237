//! Batch experiments comparing the link codes
//!
//! Every trial sends a random message through a fresh noisy channel and
//! records what the receiver made of it. Trials are grouped per algorithm
//! into summary counts; plotting is left to whoever reads the JSON.

use bitlink_channel::noisy::{seeded_rng, ChannelConfig};
use bitlink_frame::link::LinkAlgorithm;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use crate::common::ProgressReporter;
use crate::pipeline::LinkPipeline;
use crate::{LinkError, Result};

/// Characters random messages are drawn from
const MESSAGE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

/// Experiment grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Message lengths in characters
    pub message_lengths: Vec<usize>,
    pub error_rates: Vec<f64>,
    /// Trials per (length, rate, algorithm) cell
    pub repetitions: usize,
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            message_lengths: vec![10, 20, 50, 100, 200],
            error_rates: vec![0.0, 0.001, 0.01, 0.05, 0.1],
            repetitions: 3,
            seed: 0,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.message_lengths.contains(&0) {
            return Err(LinkError::Config {
                msg: "message lengths must be non-zero".to_string(),
            });
        }
        for &rate in &self.error_rates {
            ChannelConfig::new(rate)?;
        }
        Ok(())
    }

    /// Number of trials the grid expands to
    pub fn total_trials(&self) -> usize {
        self.message_lengths.len() * self.error_rates.len() * self.repetitions * LinkAlgorithm::ALL.len()
    }
}

/// Outcome of one message through one code and one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub algorithm: LinkAlgorithm,
    pub message: String,
    pub error_rate: f64,
    pub original_bits: usize,
    pub coded_bits: usize,
    pub flipped_count: usize,
    /// 0-indexed frame positions flipped by the channel
    pub flipped_positions: Vec<usize>,
    pub error_detected: bool,
    pub error_corrected: bool,
    /// 1-indexed position the receiver corrected
    pub error_position: Option<usize>,
    /// The receiver accepted the frame
    pub integrity_ok: bool,
    /// The delivered text equals the message
    pub delivered_intact: bool,
    pub encode_ms: f64,
    pub verify_ms: f64,
    pub overhead: f64,
}

impl TrialRecord {
    pub fn corrupted(&self) -> bool {
        self.flipped_count > 0
    }

    /// Damaged frame accepted as clean
    pub fn undetected_corruption(&self) -> bool {
        self.corrupted() && !self.error_detected
    }

    /// A correction was applied but the text still came out wrong
    pub fn miscorrected(&self) -> bool {
        self.error_corrected && !self.delivered_intact
    }
}

/// Aggregate counts for one algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSummary {
    pub algorithm: LinkAlgorithm,
    pub trials: usize,
    pub corrupted: usize,
    pub detected: usize,
    pub corrected: usize,
    pub undetected_corruptions: usize,
    pub miscorrections: usize,
    pub delivered_intact: usize,
    pub mean_overhead: f64,
    pub mean_encode_ms: f64,
    pub mean_verify_ms: f64,
}

impl AlgorithmSummary {
    /// Summarise the records of `algorithm` found in `trials`
    pub fn from_trials(algorithm: LinkAlgorithm, trials: &[TrialRecord]) -> Self {
        let own: Vec<&TrialRecord> = trials.iter().filter(|t| t.algorithm == algorithm).collect();
        let count = |pred: fn(&TrialRecord) -> bool| own.iter().filter(|t| pred(t)).count();
        let mean = |field: fn(&TrialRecord) -> f64| {
            if own.is_empty() {
                0.0
            } else {
                own.iter().map(|t| field(t)).sum::<f64>() / own.len() as f64
            }
        };

        Self {
            algorithm,
            trials: own.len(),
            corrupted: count(|t| t.corrupted()),
            detected: count(|t| t.corrupted() && t.error_detected),
            corrected: count(|t| t.error_corrected),
            undetected_corruptions: count(|t| t.undetected_corruption()),
            miscorrections: count(|t| t.miscorrected()),
            delivered_intact: count(|t| t.delivered_intact),
            mean_overhead: mean(|t| t.overhead),
            mean_encode_ms: mean(|t| t.encode_ms),
            mean_verify_ms: mean(|t| t.verify_ms),
        }
    }

    /// Share of corrupted frames the receiver noticed
    pub fn detection_rate(&self) -> f64 {
        if self.corrupted == 0 {
            return 1.0;
        }
        self.detected as f64 / self.corrupted as f64
    }
}

/// Full experiment output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub generated_at: DateTime<Utc>,
    pub config: ExperimentConfig,
    pub trials: Vec<TrialRecord>,
    pub summaries: Vec<AlgorithmSummary>,
}

impl ExperimentReport {
    pub fn summary(&self, algorithm: LinkAlgorithm) -> Option<&AlgorithmSummary> {
        self.summaries.iter().find(|s| s.algorithm == algorithm)
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self).map_err(std::io::Error::from)?;
        info!("Experiment report written to {:?}", path);
        Ok(())
    }
}

/// Random message of `len` characters over letters, digits and space
pub fn random_message<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| MESSAGE_ALPHABET[rng.gen_range(0..MESSAGE_ALPHABET.len())] as char)
        .collect()
}

/// Send `message` once with `algorithm` over a channel flipping bits at `error_rate`
pub fn run_trial<R: Rng + ?Sized>(
    algorithm: LinkAlgorithm,
    message: &str,
    error_rate: f64,
    rng: &mut R,
) -> Result<TrialRecord> {
    let pipeline = LinkPipeline::new(algorithm, ChannelConfig::new(error_rate)?);
    let sent = pipeline.send(message, rng)?;
    let received = pipeline.receive(&sent.noisy())?;

    let record = TrialRecord {
        algorithm,
        message: message.to_string(),
        error_rate,
        original_bits: sent.data.len(),
        coded_bits: sent.coded.len(),
        flipped_count: sent.transmission.flip_count(),
        flipped_positions: sent.transmission.flipped.clone(),
        error_detected: received.error_detected(),
        error_corrected: received.error_corrected(),
        error_position: received.position(),
        integrity_ok: !received.is_dropped(),
        delivered_intact: received.text() == Some(message),
        encode_ms: sent.encode_time.as_secs_f64() * 1000.0,
        verify_ms: received.decode_time.as_secs_f64() * 1000.0,
        overhead: sent.overhead(),
    };
    debug!(
        "{} trial: {} flips, detected={}, intact={}",
        algorithm, record.flipped_count, record.error_detected, record.delivered_intact
    );
    Ok(record)
}

/// Run every cell of the grid for both algorithms
///
/// Both algorithms see the same message in each repetition. The whole run
/// draws from one generator seeded with `config.seed`, so a report is
/// reproducible apart from its timings.
pub fn run_experiments(config: &ExperimentConfig) -> Result<ExperimentReport> {
    config.validate()?;
    let mut rng = seeded_rng(config.seed);
    let mut progress = ProgressReporter::new("experiments", config.total_trials());
    let mut trials = Vec::with_capacity(config.total_trials());

    info!("Running {} trials", config.total_trials());
    for &length in &config.message_lengths {
        for &rate in &config.error_rates {
            for _ in 0..config.repetitions {
                let message = random_message(&mut rng, length);
                for algorithm in LinkAlgorithm::ALL {
                    trials.push(run_trial(algorithm, &message, rate, &mut rng)?);
                    progress.advance();
                }
            }
        }
    }
    progress.complete();

    let summaries = LinkAlgorithm::ALL
        .iter()
        .map(|&algorithm| AlgorithmSummary::from_trials(algorithm, &trials))
        .collect();

    Ok(ExperimentReport {
        generated_at: Utc::now(),
        config: config.clone(),
        trials,
        summaries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn small_config() -> ExperimentConfig {
        ExperimentConfig {
            message_lengths: vec![4, 16],
            error_rates: vec![0.0, 0.02],
            repetitions: 2,
            seed: 11,
        }
    }

    fn record(algorithm: LinkAlgorithm, flips: usize, detected: bool, corrected: bool, intact: bool) -> TrialRecord {
        TrialRecord {
            algorithm,
            message: "abc".to_string(),
            error_rate: 0.1,
            original_bits: 24,
            coded_bits: 56,
            flipped_count: flips,
            flipped_positions: (0..flips).collect(),
            error_detected: detected,
            error_corrected: corrected,
            error_position: if corrected { Some(1) } else { None },
            integrity_ok: intact || corrected,
            delivered_intact: intact,
            encode_ms: 1.0,
            verify_ms: 3.0,
            overhead: 4.0 / 3.0,
        }
    }

    #[test]
    fn test_random_message_alphabet() {
        let mut rng = seeded_rng(5);
        let message = random_message(&mut rng, 200);
        assert_eq!(message.chars().count(), 200);
        assert!(message.bytes().all(|b| MESSAGE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_noiseless_trials_are_intact() {
        let mut rng = seeded_rng(1);
        for algorithm in LinkAlgorithm::ALL {
            let trial = run_trial(algorithm, "clean run", 0.0, &mut rng).unwrap();
            assert_eq!(trial.flipped_count, 0);
            assert!(trial.integrity_ok);
            assert!(trial.delivered_intact);
            assert!(!trial.error_detected);
            assert_eq!(trial.original_bits, 72);
        }
    }

    #[test]
    fn test_certain_noise_is_noticed_by_crc() {
        let mut rng = seeded_rng(2);
        let trial = run_trial(LinkAlgorithm::Crc32, "all flipped", 1.0, &mut rng).unwrap();
        assert_eq!(trial.flipped_count, trial.coded_bits);
        assert!(trial.error_detected);
        assert!(!trial.integrity_ok);
        assert!(!trial.delivered_intact);
    }

    #[test]
    fn test_summary_counts() {
        let trials = vec![
            record(LinkAlgorithm::Hamming, 0, false, false, true),
            record(LinkAlgorithm::Hamming, 1, true, true, true),
            record(LinkAlgorithm::Hamming, 2, true, true, false),
            record(LinkAlgorithm::Hamming, 3, false, false, false),
            record(LinkAlgorithm::Crc32, 1, true, false, false),
        ];
        let summary = AlgorithmSummary::from_trials(LinkAlgorithm::Hamming, &trials);
        assert_eq!(summary.trials, 4);
        assert_eq!(summary.corrupted, 3);
        assert_eq!(summary.detected, 2);
        assert_eq!(summary.corrected, 2);
        assert_eq!(summary.undetected_corruptions, 1);
        assert_eq!(summary.miscorrections, 1);
        assert_eq!(summary.delivered_intact, 2);
        assert_eq!(summary.mean_encode_ms, 1.0);
        assert_eq!(summary.mean_verify_ms, 3.0);
        assert!((summary.detection_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_run_experiments_is_reproducible() {
        let config = small_config();
        let a = run_experiments(&config).unwrap();
        let b = run_experiments(&config).unwrap();

        assert_eq!(a.trials.len(), config.total_trials());
        assert_eq!(a.summaries.len(), 2);
        for (x, y) in a.trials.iter().zip(&b.trials) {
            assert_eq!(x.message, y.message);
            assert_eq!(x.flipped_positions, y.flipped_positions);
            assert_eq!(x.delivered_intact, y.delivered_intact);
        }

        let crc = a.summary(LinkAlgorithm::Crc32).unwrap();
        assert_eq!(crc.trials, config.total_trials() / 2);
        assert_eq!(crc.corrected, 0);
    }

    #[test]
    fn test_invalid_grid_rejected() {
        let config = ExperimentConfig {
            error_rates: vec![0.1, 2.0],
            ..small_config()
        };
        assert!(matches!(run_experiments(&config), Err(LinkError::Channel(_))));

        let config = ExperimentConfig {
            message_lengths: vec![0],
            ..small_config()
        };
        assert!(matches!(run_experiments(&config), Err(LinkError::Config { .. })));
    }

    #[test]
    fn test_write_json() {
        let report = run_experiments(&ExperimentConfig {
            message_lengths: vec![3],
            error_rates: vec![0.0],
            repetitions: 1,
            seed: 0,
        })
        .unwrap();

        let temp_file = NamedTempFile::new().unwrap();
        report.write_json(temp_file.path()).unwrap();

        let text = std::fs::read_to_string(temp_file.path()).unwrap();
        let loaded: ExperimentReport = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded.trials.len(), 2);
        assert_eq!(loaded.trials[0].message, report.trials[0].message);
        assert_eq!(loaded.summaries[1].algorithm, LinkAlgorithm::Hamming);
        assert_eq!(loaded.summaries[1].delivered_intact, 1);
        assert_eq!(loaded.config.repetitions, 1);
    }

    #[test]
    fn test_grid_loads_from_shared_config_file() {
        let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            temp_file,
            "algorithm = \"hamming\"\nport = 9100\nseed = 5\nerror_rates = [0.0, 0.2]\nrepetitions = 1"
        )
        .unwrap();

        let config: ExperimentConfig = crate::common::load_config(temp_file.path()).unwrap();
        assert_eq!(config.error_rates, vec![0.0, 0.2]);
        assert_eq!(config.repetitions, 1);
        assert_eq!(config.seed, 5);
        assert_eq!(config.message_lengths, ExperimentConfig::default().message_lengths);
        assert!(config.validate().is_ok());
    }
}
