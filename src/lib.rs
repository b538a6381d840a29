//! Coordination of short-lived vehicle platoons crossing signalised
//! intersections inside a stepped traffic simulation.
//!
//! The crate does not own any vehicles or advance any clock. An external
//! driver loop steps the simulator and, between steps, calls
//! [`PlatoonManager::step`], which forms platoons on lanes whose signal just
//! turned green, evaluates braking and dissolution for every active platoon,
//! relays leader and front vehicle data to every follower, and restores the
//! safety gaps of former members. The simulator and the car-following
//! controller are reached through the [`Simulator`] and [`VehicleController`]
//! traits.

pub use config::Config;
pub use controller::{CaccParams, ControlMode, RadarReading, VehicleController, VehicleData};
pub use error::Error;
pub use light::{SignalPhase, SignalTracker};
pub use manager::PlatoonManager;
pub use metrics::MetricsWriter;
pub use platoon::{FrontLink, Member, Platoon, PlatoonState};
pub use registry::Registry;
pub use sim::{Color, Simulator, SpeedMode, NEUTRAL_COLOR};
use slotmap::new_key_type;

mod config;
mod controller;
mod debug;
mod error;
mod formation;
mod light;
mod manager;
mod metrics;
mod platoon;
mod registry;
mod sim;
mod util;

#[cfg(feature = "debug")]
pub use debug::take_debug_frame;

new_key_type! {
    /// Unique ID of a [Platoon] within the [Registry].
    pub struct PlatoonId;
}

macro_rules! sim_id_type {
    ($($(#[$meta:meta])* $name:ident;)*) => {$(
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Gets the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    )*};
}

sim_id_type! {
    /// Opaque simulator-assigned ID of a vehicle.
    VehicleId;
    /// Opaque simulator-assigned ID of a lane.
    LaneId;
    /// Opaque simulator-assigned ID of a road segment.
    EdgeId;
    /// Opaque simulator-assigned ID of a signalised junction.
    JunctionId;
}
