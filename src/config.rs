use serde::{Deserialize, Serialize};

/// Process-wide platooning parameters. Immutable once the manager is built.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The simulation's default minimum following gap in m.
    pub min_gap: f64,
    /// The maximum vehicle deceleration in m/s<sup>2</sup>; a negative number.
    pub max_deceleration: f64,
    /// The fixed speed held by platoon leaders while crossing, in m/s.
    pub platoon_speed: f64,
    /// The target inter-vehicle distance within a platoon, in m.
    pub spacing: f64,
    /// Platoons are never created with fewer members than this.
    pub min_members: usize,
    /// A candidate group is closed once it reaches this many members.
    pub max_members: usize,
    /// Waiting time in s beyond which a stalled platoon may dissolve
    /// regardless of member spacing.
    pub waiting_time_threshold: f64,
    /// An ex-member's minimum gap is restored once its available space is at
    /// least this multiple of `min_gap`. Sensible values lie in 1.5..=2.0.
    pub gap_restore_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_gap: 4.0,
            max_deceleration: -4.0,
            platoon_speed: 10.0,
            spacing: 4.0,
            min_members: 2,
            max_members: 26,
            waiting_time_threshold: 60.0,
            gap_restore_factor: 2.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_is_sane() {
        let cfg = Config::default();
        assert!(cfg.max_deceleration < 0.0);
        assert!(cfg.min_members >= 2);
        assert!(cfg.min_members <= cfg.max_members);
        assert!(cfg.gap_restore_factor >= 1.0);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"platoon_speed": 14.0, "min_members": 5}"#)
            .expect("config should deserialise");
        assert_eq!(cfg.platoon_speed, 14.0);
        assert_eq!(cfg.min_members, 5);
        assert_eq!(cfg.spacing, Config::default().spacing);
    }
}
