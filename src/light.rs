use crate::LaneId;
use std::collections::HashMap;

/// The signal phase of one controlled lane.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SignalPhase {
    Red,
    Amber,
    Green,
    /// Any phase the formation policy does not react to
    /// (minor green, off, blinking).
    Other,
}

impl SignalPhase {
    /// Parses one character of a junction's signal state string.
    pub fn from_state_char(c: char) -> Self {
        match c {
            'r' => SignalPhase::Red,
            'y' => SignalPhase::Amber,
            'G' => SignalPhase::Green,
            _ => SignalPhase::Other,
        }
    }
}

/// Tracks per-lane signal phases across ticks to detect the red-to-green
/// transitions that trigger platoon formation.
#[derive(Default)]
pub struct SignalTracker {
    /// The phase each lane showed when it was last observed.
    prev: HashMap<LaneId, SignalPhase>,
}

impl SignalTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Default::default()
    }

    /// Observes a lane's current phase and returns `true` iff the lane
    /// switched from red to green since the previous observation.
    ///
    /// The first observation of a lane never reports a transition, and no
    /// other transition (including green to green) ever does.
    pub fn observe(&mut self, lane: &LaneId, phase: SignalPhase) -> bool {
        let prev = self.prev.insert(lane.clone(), phase);
        prev == Some(SignalPhase::Red) && phase == SignalPhase::Green
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_state_chars() {
        assert_eq!(SignalPhase::from_state_char('r'), SignalPhase::Red);
        assert_eq!(SignalPhase::from_state_char('y'), SignalPhase::Amber);
        assert_eq!(SignalPhase::from_state_char('G'), SignalPhase::Green);
        assert_eq!(SignalPhase::from_state_char('g'), SignalPhase::Other);
        assert_eq!(SignalPhase::from_state_char('O'), SignalPhase::Other);
    }

    #[test]
    fn reports_only_red_to_green() {
        let lane = LaneId::from("n_0");
        let mut tracker = SignalTracker::new();
        assert!(!tracker.observe(&lane, SignalPhase::Green)); // first sighting
        assert!(!tracker.observe(&lane, SignalPhase::Green));
        assert!(!tracker.observe(&lane, SignalPhase::Amber));
        assert!(!tracker.observe(&lane, SignalPhase::Red));
        assert!(tracker.observe(&lane, SignalPhase::Green));
        assert!(!tracker.observe(&lane, SignalPhase::Green));
    }

    #[test]
    fn tracks_lanes_independently() {
        let a = LaneId::from("a_0");
        let b = LaneId::from("b_0");
        let mut tracker = SignalTracker::new();
        tracker.observe(&a, SignalPhase::Red);
        tracker.observe(&b, SignalPhase::Green);
        assert!(tracker.observe(&a, SignalPhase::Green));
        assert!(!tracker.observe(&b, SignalPhase::Green));
    }
}
