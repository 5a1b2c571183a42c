//! Wire layouts and the shared snapshot schedule.
//!
//! Everything that crosses a rank boundary is either a row of raw cell
//! bytes or a short fixed-width `i32` message whose layout lives here. The
//! schema is an explicit value handed to the transport at construction;
//! there is no globally registered message type to set up or tear down.

use super::partition::BandDescriptor;
use crate::error::{LifebandError, Result};

/// Words in an encoded [`BandDescriptor`].
pub const DESCRIPTOR_WORDS: usize = 9;
/// Words in an encoded [`RunSettings`].
pub const SETTINGS_WORDS: usize = 3;

/// Run-wide settings handed to every worker before its descriptor, so both
/// sides derive the same snapshot schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Gather and emit output every N generations; 0 disables.
    pub output_step: u32,
    /// Whether snapshot comparison may halt the run early.
    pub detect_cycles: bool,
    /// Cycles that stabilized at or below this generation are not
    /// persisted as images.
    pub min_cycle_generation: u32,
}

/// Coordinator's one-word answer to a snapshot gather.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Halt,
}

impl Verdict {
    pub fn to_word(self) -> i32 {
        match self {
            Verdict::Continue => 0,
            Verdict::Halt => 1,
        }
    }

    pub fn from_word(word: i32) -> Result<Self> {
        match word {
            0 => Ok(Verdict::Continue),
            1 => Ok(Verdict::Halt),
            other => Err(LifebandError::Transport(format!(
                "invalid verdict word {other}"
            ))),
        }
    }
}

/// Fixed-layout codec for the short control messages.
///
/// Constructed once at startup and moved into the transport; dropped with
/// it at shutdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireSchema;

impl WireSchema {
    pub fn new() -> Self {
        Self
    }

    /// Field order on the wire: world_size, world_rank, total_iterations,
    /// global_row_start, local_rows, width, update_start, update_end,
    /// update_rows.
    pub fn encode_descriptor(&self, band: &BandDescriptor) -> [i32; DESCRIPTOR_WORDS] {
        [
            band.world_size,
            band.world_rank,
            band.total_iterations,
            band.global_row_start,
            band.local_rows,
            band.width,
            band.update_start,
            band.update_end,
            band.update_rows,
        ]
    }

    pub fn decode_descriptor(&self, words: &[i32]) -> Result<BandDescriptor> {
        if words.len() != DESCRIPTOR_WORDS {
            return Err(LifebandError::Transport(format!(
                "descriptor message has {} words, expected {DESCRIPTOR_WORDS}",
                words.len()
            )));
        }
        let band = BandDescriptor {
            world_size: words[0],
            world_rank: words[1],
            total_iterations: words[2],
            global_row_start: words[3],
            local_rows: words[4],
            width: words[5],
            update_start: words[6],
            update_end: words[7],
            update_rows: words[8],
            // Not transmitted; fully determined by the ghost clamp rule.
            send_row_start: (words[3] - 1).max(0),
        };
        if band.local_rows <= 0
            || band.width <= 0
            || band.update_rows <= 0
            || band.update_end - band.update_start + 1 != band.update_rows
        {
            return Err(LifebandError::Transport(format!(
                "inconsistent band descriptor for rank {}",
                band.world_rank
            )));
        }
        Ok(band)
    }

    pub fn encode_settings(&self, settings: &RunSettings) -> [i32; SETTINGS_WORDS] {
        [
            settings.output_step as i32,
            i32::from(settings.detect_cycles),
            settings.min_cycle_generation as i32,
        ]
    }

    pub fn decode_settings(&self, words: &[i32]) -> Result<RunSettings> {
        if words.len() != SETTINGS_WORDS {
            return Err(LifebandError::Transport(format!(
                "settings message has {} words, expected {SETTINGS_WORDS}",
                words.len()
            )));
        }
        Ok(RunSettings {
            output_step: words[0].max(0) as u32,
            detect_cycles: words[1] != 0,
            min_cycle_generation: words[2].max(0) as u32,
        })
    }
}

/// Whether owned rows are gathered to the coordinator after `generation`.
///
/// Coordinator and workers evaluate this independently; it must stay a
/// pure function of the three inputs.
pub fn is_snapshot_generation(generation: u32, total_iterations: u32, s: &RunSettings) -> bool {
    if generation == total_iterations {
        return true;
    }
    if s.output_step > 0 && generation % s.output_step == 0 {
        return true;
    }
    s.detect_cycles && crate::detector::CycleDetector::wants(generation as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::partition::plan_bands;

    #[test]
    fn descriptor_round_trips_with_fixed_field_order() {
        let bands = plan_bands(10, 10, 4, 25).unwrap();
        let schema = WireSchema::new();
        let words = schema.encode_descriptor(&bands[1]);
        assert_eq!(words, [4, 2, 25, 4, 5, 10, 1, 3, 3]);
        let decoded = schema.decode_descriptor(&words).unwrap();
        assert_eq!(decoded, bands[1]);
    }

    #[test]
    fn decoder_reconstructs_the_send_start_clamp() {
        let bands = plan_bands(10, 10, 4, 25).unwrap();
        let schema = WireSchema::new();
        for band in &bands {
            let decoded = schema
                .decode_descriptor(&schema.encode_descriptor(band))
                .unwrap();
            assert_eq!(decoded.send_row_start, band.send_row_start);
        }
    }

    #[test]
    fn corrupt_descriptor_is_rejected() {
        let schema = WireSchema::new();
        let mut words = [4, 2, 25, 4, 5, 10, 1, 3, 3];
        words[8] = 2; // update_rows no longer matches the range
        assert!(schema.decode_descriptor(&words).is_err());
        assert!(schema.decode_descriptor(&words[..5]).is_err());
    }

    #[test]
    fn settings_round_trip() {
        let schema = WireSchema::new();
        let settings = RunSettings {
            output_step: 5,
            detect_cycles: true,
            min_cycle_generation: 100,
        };
        let decoded = schema
            .decode_settings(&schema.encode_settings(&settings))
            .unwrap();
        assert_eq!(decoded, settings);
    }

    #[test]
    fn final_generation_is_always_a_snapshot() {
        let settings = RunSettings {
            output_step: 0,
            detect_cycles: false,
            min_cycle_generation: 0,
        };
        assert!(is_snapshot_generation(40, 40, &settings));
        assert!(!is_snapshot_generation(39, 40, &settings));
    }

    #[test]
    fn output_cadence_and_detector_cadence_combine() {
        let settings = RunSettings {
            output_step: 7,
            detect_cycles: true,
            min_cycle_generation: 0,
        };
        assert!(is_snapshot_generation(7, 100, &settings)); // output step
        assert!(is_snapshot_generation(12, 100, &settings)); // detector
        assert!(!is_snapshot_generation(8, 100, &settings));
        assert!(!is_snapshot_generation(15, 100, &settings));
    }
}
