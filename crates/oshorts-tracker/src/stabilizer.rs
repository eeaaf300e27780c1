//! Anti-flicker target selection.
//!
//! Per-frame activity signals are noisy: in a two-speaker video the top
//! signal can flip every frame. The stabilizer runs a small state machine
//! per tracked identity so the framing target only moves when a challenger
//! has genuinely taken over, and never more than once per
//! `min_stable_frames + cooldown_frames` window.

use std::collections::HashMap;

use tracing::debug;

use crate::config::TrackerConfig;

/// State of one tracked identity in the stabilizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerState {
    /// Not the target and not currently challenging.
    Idle,
    /// Held the top signal for `streak` consecutive frames.
    Candidate { streak: u32 },
    /// The current framing target.
    Stabilized,
    /// Newly promoted target; switches are suppressed for `remaining` frames.
    Cooldown { remaining: u32 },
}

/// Hysteresis filter turning per-frame "loudest subject" signals into a
/// stable framing target.
pub struct SpeakerStabilizer {
    min_stable_frames: u32,
    cooldown_frames: u32,
    states: HashMap<u32, SpeakerState>,
    target: Option<u32>,
}

impl SpeakerStabilizer {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            min_stable_frames: config.min_stable_frames,
            cooldown_frames: config.cooldown_frames,
            states: HashMap::new(),
            target: None,
        }
    }

    /// Current framing target, if any identity has ever been adopted.
    pub fn target(&self) -> Option<u32> {
        self.target
    }

    /// State of one identity. Unknown identities are idle.
    pub fn state_of(&self, track_id: u32) -> SpeakerState {
        self.states
            .get(&track_id)
            .copied()
            .unwrap_or(SpeakerState::Idle)
    }

    /// Advance one frame with the identity holding the top activity signal
    /// (`None` when the frame had no detections). Returns the framing target
    /// after applying stabilization.
    pub fn observe(&mut self, top: Option<u32>) -> Option<u32> {
        self.tick_cooldown();

        let Some(top) = top else {
            // Nothing detected. Challenger streaks require consecutive
            // frames, so they reset here.
            self.clear_candidates();
            return self.target;
        };

        // First adoption is immediate. There is no previous target to
        // protect, and delaying would leave the opening frames uncentered.
        let Some(current) = self.target else {
            self.states.insert(top, SpeakerState::Stabilized);
            self.target = Some(top);
            return self.target;
        };

        if top == current {
            self.clear_candidates();
            return self.target;
        }

        // A switch is in flight or suppressed while the target cools down.
        if matches!(
            self.states.get(&current),
            Some(SpeakerState::Cooldown { .. })
        ) {
            return self.target;
        }

        let streak = match self.states.get(&top) {
            Some(SpeakerState::Candidate { streak }) => streak + 1,
            _ => 1,
        };

        if streak >= self.min_stable_frames {
            debug!(from = current, to = top, "Switching framing target");
            self.states.insert(current, SpeakerState::Idle);
            self.states.insert(
                top,
                SpeakerState::Cooldown {
                    remaining: self.cooldown_frames,
                },
            );
            self.target = Some(top);
        } else {
            // Any other challenger lost the top slot this frame.
            self.clear_candidates();
            self.states.insert(top, SpeakerState::Candidate { streak });
        }

        self.target
    }

    fn tick_cooldown(&mut self) {
        for state in self.states.values_mut() {
            if let SpeakerState::Cooldown { remaining } = state {
                // The tick runs before this frame's suppression check, so
                // the window only closes once the counter has already hit
                // zero; suppression then covers the full cooldown_frames.
                *state = if *remaining == 0 {
                    SpeakerState::Stabilized
                } else {
                    SpeakerState::Cooldown {
                        remaining: *remaining - 1,
                    }
                };
            }
        }
    }

    fn clear_candidates(&mut self) {
        for state in self.states.values_mut() {
            if matches!(state, SpeakerState::Candidate { .. }) {
                *state = SpeakerState::Idle;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stabilizer() -> SpeakerStabilizer {
        SpeakerStabilizer::new(&TrackerConfig::default())
    }

    #[test]
    fn test_first_adoption_is_immediate() {
        let mut s = stabilizer();
        assert_eq!(s.observe(Some(7)), Some(7));
        assert_eq!(s.state_of(7), SpeakerState::Stabilized);
    }

    #[test]
    fn test_toggling_signal_never_switches() {
        let mut s = stabilizer();
        s.observe(Some(1));

        // Alternate the top signal every frame for 200 frames. A challenger
        // needs 15 consecutive frames, so the target must never move.
        for frame in 0..200 {
            let top = if frame % 2 == 0 { 2 } else { 1 };
            assert_eq!(s.observe(Some(top)), Some(1));
        }
    }

    #[test]
    fn test_switch_after_min_stable_frames() {
        let mut s = stabilizer();
        s.observe(Some(1));

        for _ in 0..14 {
            assert_eq!(s.observe(Some(2)), Some(1));
        }
        // 15th consecutive frame promotes the challenger.
        assert_eq!(s.observe(Some(2)), Some(2));
        assert!(matches!(s.state_of(2), SpeakerState::Cooldown { .. }));
        assert_eq!(s.state_of(1), SpeakerState::Idle);
    }

    #[test]
    fn test_cooldown_suppresses_immediate_switch_back() {
        let mut s = stabilizer();
        s.observe(Some(1));
        for _ in 0..15 {
            s.observe(Some(2));
        }
        assert_eq!(s.target(), Some(2));

        // The old target tops the signal for the entire cooldown window and
        // beyond, but only frames after the cooldown count toward a streak.
        for _ in 0..30 {
            assert_eq!(s.observe(Some(1)), Some(2));
        }
        for _ in 0..14 {
            assert_eq!(s.observe(Some(1)), Some(2));
        }
        assert_eq!(s.observe(Some(1)), Some(1));
    }

    #[test]
    fn test_at_most_one_switch_per_45_frame_window() {
        let mut s = stabilizer();
        s.observe(Some(1));

        // Adversarial signal: always favors whoever is not the target.
        let mut switches = Vec::new();
        let mut last = s.target();
        for frame in 0..300u32 {
            let top = if s.target() == Some(1) { 2 } else { 1 };
            let now = s.observe(Some(top));
            if now != last {
                switches.push(frame);
                last = now;
            }
        }

        for pair in switches.windows(2) {
            assert!(pair[1] - pair[0] >= 45);
        }
    }

    #[test]
    fn test_empty_frames_reset_challenger_streak() {
        let mut s = stabilizer();
        s.observe(Some(1));

        for _ in 0..14 {
            s.observe(Some(2));
        }
        s.observe(None);
        // Streak restarted, 14 more frames are not enough.
        for _ in 0..14 {
            assert_eq!(s.observe(Some(2)), Some(1));
        }
        assert_eq!(s.observe(Some(2)), Some(2));
    }
}
