//! Tampering link for secure channel testing
//!
//! Carries encrypted frames between two endpoints and damages them:
//! - Byte corruption inside the ciphertext
//! - Truncation
//! - Duplication
//! - Reordering
//!
//! Every damaged frame must be rejected by the receiving context.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use nxcp_wire::ENVELOPE_HEADER_SIZE;

/// Link damage configuration
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// Probability of flipping one ciphertext byte (0.0 - 1.0)
    pub corrupt_prob: f64,
    /// Probability of cutting bytes off the end
    pub truncate_prob: f64,
    /// Probability of delivering a frame twice
    pub duplicate_prob: f64,
    /// Probability of delivering a frame early
    pub reorder_prob: f64,
    /// Max frames a reordered frame may overtake
    pub reorder_depth: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            corrupt_prob: 0.05,
            truncate_prob: 0.01,
            duplicate_prob: 0.01,
            reorder_prob: 0.05,
            reorder_depth: 3,
        }
    }
}

impl LinkConfig {
    /// Link that delivers everything intact and in order
    pub fn clean() -> Self {
        LinkConfig {
            corrupt_prob: 0.0,
            truncate_prob: 0.0,
            duplicate_prob: 0.0,
            reorder_prob: 0.0,
            reorder_depth: 0,
        }
    }

    /// Link under active tampering
    pub fn hostile() -> Self {
        LinkConfig {
            corrupt_prob: 0.3,
            truncate_prob: 0.1,
            duplicate_prob: 0.05,
            reorder_prob: 0.2,
            reorder_depth: 10,
        }
    }
}

/// Frame in flight
#[derive(Clone, Debug)]
pub struct LinkFrame {
    pub data: Vec<u8>,
    /// Whether the link altered the bytes
    pub damaged: bool,
    /// Send order
    pub seq: u64,
}

/// Link statistics
#[derive(Clone, Debug, Default)]
pub struct LinkStats {
    pub frames_sent: u64,
    pub frames_delivered: u64,
    pub frames_corrupted: u64,
    pub frames_truncated: u64,
    pub frames_duplicated: u64,
    pub frames_reordered: u64,
}

impl LinkStats {
    pub fn damage_rate(&self) -> f64 {
        if self.frames_sent == 0 {
            0.0
        } else {
            (self.frames_corrupted + self.frames_truncated) as f64 / self.frames_sent as f64
        }
    }
}

/// One-way tampering link
pub struct TamperingLink {
    config: LinkConfig,
    rng: StdRng,
    in_flight: VecDeque<LinkFrame>,
    next_seq: u64,
    stats: LinkStats,
}

impl TamperingLink {
    /// Create a new link with seed
    pub fn new(config: LinkConfig, seed: u64) -> Self {
        TamperingLink {
            config,
            rng: StdRng::seed_from_u64(seed),
            in_flight: VecDeque::new(),
            next_seq: 0,
            stats: LinkStats::default(),
        }
    }

    /// Send an encrypted frame into the link
    pub fn send(&mut self, data: Vec<u8>) {
        self.stats.frames_sent += 1;
        let seq = self.next_seq;
        self.next_seq += 1;

        let mut frame = LinkFrame {
            data,
            damaged: false,
            seq,
        };
        self.damage(&mut frame);

        if self.rng.gen::<f64>() < self.config.duplicate_prob {
            self.in_flight.push_back(frame.clone());
            self.stats.frames_duplicated += 1;
        }

        if self.rng.gen::<f64>() < self.config.reorder_prob && !self.in_flight.is_empty() {
            let depth = self.config.reorder_depth.min(self.in_flight.len() as u32);
            let pos = self.rng.gen_range(0..=depth) as usize;
            let insert_pos = self.in_flight.len().saturating_sub(pos);
            self.in_flight.insert(insert_pos, frame);
            self.stats.frames_reordered += 1;
        } else {
            self.in_flight.push_back(frame);
        }
    }

    fn damage(&mut self, frame: &mut LinkFrame) {
        // The envelope reserved byte is not covered by any check, so only
        // ciphertext bytes are flipped
        if frame.data.len() > ENVELOPE_HEADER_SIZE
            && self.rng.gen::<f64>() < self.config.corrupt_prob
        {
            let pos = self.rng.gen_range(ENVELOPE_HEADER_SIZE..frame.data.len());
            frame.data[pos] ^= self.rng.gen_range(1..=255u8);
            frame.damaged = true;
            self.stats.frames_corrupted += 1;
        }

        if frame.data.len() > 1 && self.rng.gen::<f64>() < self.config.truncate_prob {
            let cut = self.rng.gen_range(1..frame.data.len());
            frame.data.truncate(frame.data.len() - cut);
            frame.damaged = true;
            self.stats.frames_truncated += 1;
        }
    }

    /// Deliver everything in flight
    pub fn drain(&mut self) -> Vec<LinkFrame> {
        let delivered: Vec<_> = self.in_flight.drain(..).collect();
        self.stats.frames_delivered += delivered.len() as u64;
        delivered
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_link() {
        let mut link = TamperingLink::new(LinkConfig::clean(), 7);
        for i in 0..100u8 {
            link.send(vec![i; 32]);
        }

        let delivered = link.drain();
        assert_eq!(delivered.len(), 100);
        assert!(delivered.iter().all(|f| !f.damaged));
        assert!(delivered.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn test_hostile_link_damages() {
        let mut link = TamperingLink::new(LinkConfig::hostile(), 12345);
        for _ in 0..1000 {
            link.send(vec![0u8; 64]);
        }

        let delivered = link.drain();
        let stats = link.stats();
        assert!(stats.damage_rate() > 0.2);
        assert_eq!(delivered.len() as u64, stats.frames_sent + stats.frames_duplicated);

        for frame in delivered.iter().filter(|f| f.damaged) {
            assert!(frame.data.len() < 64 || frame.data[ENVELOPE_HEADER_SIZE..].iter().any(|b| *b != 0));
        }
    }

    #[test]
    fn test_envelope_header_untouched_by_corruption() {
        let config = LinkConfig {
            corrupt_prob: 1.0,
            ..LinkConfig::clean()
        };
        let mut link = TamperingLink::new(config, 3);
        for _ in 0..200 {
            link.send(vec![0u8; 24]);
        }

        for frame in link.drain() {
            assert!(frame.damaged);
            assert_eq!(&frame.data[..ENVELOPE_HEADER_SIZE], &[0u8; ENVELOPE_HEADER_SIZE]);
        }
    }
}
