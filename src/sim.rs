//! The interface to the external stepped traffic simulator.

use crate::{EdgeId, JunctionId, LaneId, VehicleId};

/// An RGBA colour used for vehicle visualisation.
pub type Color = [u8; 4];

/// The neutral colour applied to vehicles leaving a platoon.
pub const NEUTRAL_COLOR: Color = [255, 255, 255, 255];

/// The safety-check regime applied to a vehicle's commanded speed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpeedMode {
    /// All safety checks enabled; the simulator may override commands.
    Checked,
    /// All safety checks disabled; the vehicle obeys commands exactly.
    /// Applied to followers so the cooperative controller is in full control.
    Unchecked,
}

/// Access to the external simulator that owns the vehicles and the clock.
///
/// The manager runs exactly one pass between successive simulator steps and
/// never blocks. Per-vehicle queries return `None` when the vehicle is not
/// (or no longer) known to the simulator; actuation commands for unknown
/// vehicles must be ignored by the implementation.
pub trait Simulator {
    /// The vehicle's speed in m/s.
    fn speed(&self, vehicle: &VehicleId) -> Option<f64>;

    /// The vehicle's acceleration in m/s<sup>2</sup>.
    fn acceleration(&self, vehicle: &VehicleId) -> Option<f64>;

    /// The vehicle's physical length in m.
    fn length(&self, vehicle: &VehicleId) -> Option<f64>;

    /// The lane the vehicle is currently on.
    fn lane(&self, vehicle: &VehicleId) -> Option<LaneId>;

    /// The index of the vehicle's lane within its edge.
    fn lane_index(&self, vehicle: &VehicleId) -> Option<u32>;

    /// The vehicle's longitudinal position along its lane in m.
    fn lane_position(&self, vehicle: &VehicleId) -> Option<f64>;

    /// The edge the vehicle is currently on.
    fn road(&self, vehicle: &VehicleId) -> Option<EdgeId>;

    /// The vehicle's route as a sequence of edges, including the current one.
    fn route(&self, vehicle: &VehicleId) -> Option<Vec<EdgeId>>;

    /// The time in s the vehicle has spent below walking speed.
    /// Reset by the simulator as soon as the vehicle moves freely again.
    fn waiting_time(&self, vehicle: &VehicleId) -> Option<f64>;

    /// The vehicle's current minimum following gap in m.
    fn min_gap(&self, vehicle: &VehicleId) -> Option<f64>;

    /// The net gap to the vehicle ahead in m, or `None` if there is no
    /// vehicle ahead within sensing range.
    fn leader_gap(&self, vehicle: &VehicleId) -> Option<f64>;

    /// Whether the vehicle is flagged as blocked for an imminent left or
    /// right lane change.
    fn lane_change_pending(&self, vehicle: &VehicleId) -> bool;

    /// Commands the vehicle to hold the given speed, or returns speed
    /// control to the simulator's own car-following model when `None`.
    fn set_speed(&mut self, vehicle: &VehicleId, speed: Option<f64>);

    /// Sets the vehicle's speed-check regime.
    fn set_speed_mode(&mut self, vehicle: &VehicleId, mode: SpeedMode);

    /// Commands a fixed acceleration for the given duration in s.
    fn set_acceleration(&mut self, vehicle: &VehicleId, acceleration: f64, duration: f64);

    /// Sets the vehicle's minimum following gap in m.
    fn set_min_gap(&mut self, vehicle: &VehicleId, gap: f64);

    /// Pins the vehicle to the given lane index, or releases the pin
    /// when `None`.
    fn set_fixed_lane(&mut self, vehicle: &VehicleId, lane: Option<u32>);

    /// Sets the vehicle's display colour.
    fn set_color(&mut self, vehicle: &VehicleId, color: Color);

    /// The lane's length in m, or `0.0` for an unknown lane.
    fn lane_length(&self, lane: &LaneId) -> f64;

    /// The number of vehicles currently on the lane.
    fn lane_vehicle_count(&self, lane: &LaneId) -> usize;

    /// The vehicles on the lane in ascending longitudinal position; the
    /// last element is the vehicle nearest the end of the lane.
    fn lane_vehicles(&self, lane: &LaneId) -> Vec<VehicleId>;

    /// The edges reachable through the lane's outgoing connections.
    fn lane_connections(&self, lane: &LaneId) -> Vec<EdgeId>;

    /// The lanes belonging to the given edge.
    fn edge_lanes(&self, edge: &EdgeId) -> Vec<LaneId>;

    /// The signalised junctions in the network.
    fn junctions(&self) -> Vec<JunctionId>;

    /// The lanes controlled by the junction's signal, in signal-state order.
    fn controlled_lanes(&self, junction: &JunctionId) -> Vec<LaneId>;

    /// The junction's signal state, one character per controlled lane
    /// (`r`, `y`, `G`, or other).
    fn signal_state(&self, junction: &JunctionId) -> String;
}
