use crate::{LaneId, VehicleId};
use thiserror::Error;

/// Errors surfaced by the platoon manager.
#[derive(Debug, Error)]
pub enum Error {
    /// A watch entry references a vehicle that no platoon on its lane
    /// contains. The registry and the watch set have fallen out of sync,
    /// which indicates a broken invariant.
    #[error("no platoon on lane {lane} contains watched vehicle {vehicle}")]
    OrphanedWatch { lane: LaneId, vehicle: VehicleId },

    /// The controller plugin has no data record for a platoon member.
    #[error("controller has no data record for vehicle {0}")]
    MissingVehicleData(VehicleId),

    /// The simulator has no record of a vehicle the manager still references.
    #[error("simulator has no record of vehicle {0}")]
    UnknownVehicle(VehicleId),

    /// Writing to the metrics sink failed.
    #[error("metrics sink error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error indicates a broken internal invariant.
    ///
    /// Consistency faults are fatal to the run, since continuing risks
    /// driving vehicles on inconsistent topology. All other errors are
    /// isolated to the platoon that raised them.
    pub fn is_consistency(&self) -> bool {
        matches!(self, Error::OrphanedWatch { .. })
    }
}
