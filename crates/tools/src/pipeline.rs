//! Send and receive paths of the link pipeline
//!
//! Send: text -> bits -> link frame -> noisy channel.
//! Receive: frame -> verify or correct -> bits -> text.
//!
//! The two paths share nothing but the frame handed between them. A frame
//! must be received by a pipeline configured with the same link algorithm
//! it was encoded with.

use bitlink_channel::noisy::{ChannelConfig, NoisyChannel, Transmission};
use bitlink_codecs::text::{BitTextCodec, TextCodec};
use bitlink_core::Bits;
use bitlink_frame::link::{link_codec, LinkAlgorithm, LinkCodec, LinkDecoded};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{LinkError, Result};

/// Frame tagged with the code that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedFrame {
    pub algorithm: LinkAlgorithm,
    pub bits: Bits,
}

/// Everything the send path produced for one message
#[derive(Debug, Clone)]
pub struct SentFrame {
    pub algorithm: LinkAlgorithm,
    /// Presentation-layer bits before link coding
    pub data: Bits,
    /// Link frame as it left the encoder
    pub coded: Bits,
    /// Link frame after the channel, with the flipped positions
    pub transmission: Transmission,
    pub encode_time: Duration,
}

impl SentFrame {
    /// Frame to hand to the transport or the receive path
    pub fn noisy(&self) -> CodedFrame {
        CodedFrame {
            algorithm: self.algorithm,
            bits: self.transmission.frame.clone(),
        }
    }

    /// Added bits per data bit
    pub fn overhead(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        (self.coded.len() - self.data.len()) as f64 / self.data.len() as f64
    }
}

/// How a delivered message got through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// No damage detected
    Intact,
    /// One bit corrected at the 1-indexed `position`; unconfirmed
    Corrected { position: usize },
    /// Damage detected but not located; data delivered as received
    Suspect { syndrome: usize },
}

/// Verdict of the receive path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Delivered {
        text: String,
        data: Bits,
        delivery: Delivery,
    },
    /// Integrity check failed; the frame is discarded
    Dropped { residual: u32 },
}

/// Result of receiving one frame
#[derive(Debug, Clone)]
pub struct Received {
    pub outcome: ReceiveOutcome,
    pub decode_time: Duration,
}

impl Received {
    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            ReceiveOutcome::Delivered { text, .. } => Some(text),
            ReceiveOutcome::Dropped { .. } => None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self.outcome, ReceiveOutcome::Dropped { .. })
    }

    /// Delivered without any repair
    ///
    /// A single-error-correcting code cannot tell one flipped bit from a
    /// multi-bit pattern that aliases to it, so corrected output is never
    /// trusted.
    pub fn trusted(&self) -> bool {
        matches!(
            self.outcome,
            ReceiveOutcome::Delivered {
                delivery: Delivery::Intact,
                ..
            }
        )
    }

    pub fn error_detected(&self) -> bool {
        !self.trusted()
    }

    pub fn error_corrected(&self) -> bool {
        self.position().is_some()
    }

    /// 1-indexed position corrected by the link layer
    pub fn position(&self) -> Option<usize> {
        match self.outcome {
            ReceiveOutcome::Delivered {
                delivery: Delivery::Corrected { position },
                ..
            } => Some(position),
            _ => None,
        }
    }
}

/// Presentation -> link -> channel pipeline for one link algorithm
pub struct LinkPipeline {
    algorithm: LinkAlgorithm,
    link: Box<dyn LinkCodec>,
    text: BitTextCodec,
    channel: NoisyChannel,
}

impl LinkPipeline {
    /// Create a pipeline coding with `algorithm` over a channel with `config`
    pub fn new(algorithm: LinkAlgorithm, config: ChannelConfig) -> Self {
        Self {
            algorithm,
            link: link_codec(algorithm),
            text: BitTextCodec::new(),
            channel: NoisyChannel::new(config),
        }
    }

    /// Replace the presentation codec
    pub fn with_text_codec(mut self, text: BitTextCodec) -> Self {
        self.text = text;
        self
    }

    pub fn algorithm(&self) -> LinkAlgorithm {
        self.algorithm
    }

    pub fn link(&self) -> &dyn LinkCodec {
        self.link.as_ref()
    }

    pub fn channel(&self) -> &NoisyChannel {
        &self.channel
    }

    /// Encode `text`, apply the link code, and pass it through the channel
    pub fn send<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Result<SentFrame> {
        if text.is_empty() {
            return Err(LinkError::EmptyMessage);
        }
        let data = self.text.encode(text)?;
        debug!("Presentation encoded {} chars into {} bits", text.chars().count(), data.len());
        self.send_bits(&data, rng)
    }

    /// Link-code raw `data` bits and pass them through the channel
    pub fn send_bits<R: Rng + ?Sized>(&self, data: &Bits, rng: &mut R) -> Result<SentFrame> {
        if data.is_empty() {
            return Err(LinkError::EmptyMessage);
        }
        let start = Instant::now();
        let coded = self.link.encode(data)?;
        let encode_time = start.elapsed();

        let transmission = self.channel.transmit(&coded, rng);
        info!(
            "{} frame of {} bits sent, {} flipped",
            self.algorithm,
            coded.len(),
            transmission.flip_count()
        );

        Ok(SentFrame {
            algorithm: self.algorithm,
            data: data.clone(),
            coded,
            transmission,
            encode_time,
        })
    }

    /// Verify or correct a frame and decode its text
    pub fn receive(&self, frame: &CodedFrame) -> Result<Received> {
        if frame.algorithm != self.algorithm {
            return Err(LinkError::AlgorithmMismatch {
                expected: self.algorithm,
                actual: frame.algorithm,
            });
        }

        let start = Instant::now();
        let verdict = self.link.decode(&frame.bits)?;
        let decode_time = start.elapsed();

        let (data, delivery) = match verdict {
            LinkDecoded::Rejected { residual } => {
                warn!("{} check failed (residual {:#010x}), frame dropped", self.algorithm, residual);
                return Ok(Received {
                    outcome: ReceiveOutcome::Dropped { residual },
                    decode_time,
                });
            }
            LinkDecoded::Intact { data } => (data, Delivery::Intact),
            LinkDecoded::Corrected { data, position } => {
                info!("{} corrected bit at position {}", self.algorithm, position);
                (data, Delivery::Corrected { position })
            }
            LinkDecoded::Suspect { data, syndrome } => {
                warn!(
                    "{} syndrome {} lies outside the frame, delivering uncorrected data",
                    self.algorithm, syndrome
                );
                (data, Delivery::Suspect { syndrome })
            }
        };

        let text = self.text.decode(&data)?;
        Ok(Received {
            outcome: ReceiveOutcome::Delivered {
                text,
                data,
                delivery,
            },
            decode_time,
        })
    }

    /// Receive untagged wire bits, assuming this pipeline's algorithm
    pub fn receive_wire(&self, bits: Bits) -> Result<Received> {
        self.receive(&CodedFrame {
            algorithm: self.algorithm,
            bits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitlink_channel::noisy::{inject_errors, seeded_rng};
    use bitlink_codecs::CodecError;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn pipeline(algorithm: LinkAlgorithm, rate: f64) -> LinkPipeline {
        LinkPipeline::new(algorithm, ChannelConfig::new(rate).unwrap())
    }

    fn with_flips(sent: &SentFrame, positions: &[usize]) -> CodedFrame {
        CodedFrame {
            algorithm: sent.algorithm,
            bits: inject_errors(&sent.coded, positions).unwrap().frame,
        }
    }

    #[test]
    fn test_clean_roundtrip_both_algorithms() {
        for algorithm in LinkAlgorithm::ALL {
            let link = pipeline(algorithm, 0.0);
            let sent = link.send("Hello, link!", &mut seeded_rng(1)).unwrap();
            assert!(sent.transmission.flipped.is_empty());

            let received = link.receive(&sent.noisy()).unwrap();
            assert_eq!(received.text(), Some("Hello, link!"));
            assert!(received.trusted());
            assert!(!received.error_detected());
        }
    }

    #[test]
    fn test_crc_drops_damaged_frame() {
        let link = pipeline(LinkAlgorithm::Crc32, 0.0);
        let sent = link.send("drop me", &mut seeded_rng(2)).unwrap();
        let received = link.receive(&with_flips(&sent, &[5])).unwrap();
        assert!(received.is_dropped());
        assert_eq!(received.text(), None);
        assert!(received.error_detected());
        assert!(!received.error_corrected());
    }

    #[test]
    fn test_hamming_corrects_single_flip() {
        let link = pipeline(LinkAlgorithm::Hamming, 0.0);
        let sent = link.send("fix me", &mut seeded_rng(3)).unwrap();
        let received = link.receive(&with_flips(&sent, &[10])).unwrap();
        assert_eq!(received.text(), Some("fix me"));
        assert_eq!(received.position(), Some(11));
        assert!(received.error_corrected());
        assert!(!received.trusted());
    }

    #[test]
    fn test_hamming_out_of_range_syndrome_is_suspect() {
        let link = pipeline(LinkAlgorithm::Hamming, 0.0);
        let sent = link.send("A", &mut seeded_rng(4)).unwrap();
        let received = link.receive(&with_flips(&sent, &[4, 7])).unwrap();
        match received.outcome {
            ReceiveOutcome::Delivered { delivery, .. } => {
                assert_eq!(delivery, Delivery::Suspect { syndrome: 13 });
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_mixed_codecs_rejected() {
        let crc = pipeline(LinkAlgorithm::Crc32, 0.0);
        let hamming = pipeline(LinkAlgorithm::Hamming, 0.0);
        let sent = crc.send("mixed", &mut seeded_rng(5)).unwrap();
        assert!(matches!(
            hamming.receive(&sent.noisy()),
            Err(LinkError::AlgorithmMismatch {
                expected: LinkAlgorithm::Hamming,
                actual: LinkAlgorithm::Crc32,
            })
        ));
    }

    #[test]
    fn test_invalid_input_rejected_before_coding() {
        let link = pipeline(LinkAlgorithm::Crc32, 0.0);
        assert!(matches!(
            link.send("\u{263a}", &mut seeded_rng(6)),
            Err(LinkError::Codec(CodecError::UnsupportedCharacter { .. }))
        ));
        assert!(matches!(
            link.send("", &mut seeded_rng(6)),
            Err(LinkError::EmptyMessage)
        ));
    }

    #[test]
    fn test_noisy_channel_is_reproducible() {
        let link = pipeline(LinkAlgorithm::Hamming, 0.05);
        let a = link.send("same seed, same noise", &mut seeded_rng(9)).unwrap();
        let b = link.send("same seed, same noise", &mut seeded_rng(9)).unwrap();
        assert_eq!(a.transmission, b.transmission);
    }

    #[test]
    fn test_overhead() {
        let crc = pipeline(LinkAlgorithm::Crc32, 0.0);
        let sent = crc.send("abcd", &mut seeded_rng(0)).unwrap();
        assert_eq!(sent.overhead(), 1.0);

        let hamming = pipeline(LinkAlgorithm::Hamming, 0.0);
        let sent = hamming.send("A", &mut seeded_rng(0)).unwrap();
        assert_eq!(sent.overhead(), 0.5);
    }

    #[quickcheck]
    fn prop_noiseless_link_delivers_text(bytes: Vec<u8>, hamming: bool) -> TestResult {
        if bytes.is_empty() {
            return TestResult::discard();
        }
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        let algorithm = if hamming {
            LinkAlgorithm::Hamming
        } else {
            LinkAlgorithm::Crc32
        };
        let link = pipeline(algorithm, 0.0);
        let sent = link.send(&text, &mut seeded_rng(0)).unwrap();
        let received = link.receive(&sent.noisy()).unwrap();
        TestResult::from_bool(received.trusted() && received.text() == Some(text.as_str()))
    }

    #[test]
    fn test_receive_wire_assumes_pipeline_algorithm() {
        let link = pipeline(LinkAlgorithm::Hamming, 0.0);
        let frame = Bits::parse("100010010001").unwrap();
        assert_eq!(link.receive_wire(frame).unwrap().text(), Some("A"));
    }
}
