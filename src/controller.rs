//! The interface to the cooperative car-following controller plugin.

use crate::VehicleId;

/// A control-relevant snapshot of one vehicle, as exchanged between
/// platoon members every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VehicleData {
    /// The x world coordinate in m.
    pub pos_x: f64,
    /// The y world coordinate in m.
    pub pos_y: f64,
    /// The speed in m/s.
    pub speed: f64,
    /// The acceleration in m/s<sup>2</sup>.
    pub acceleration: f64,
    /// The simulation time the record was taken at, in s.
    pub time: f64,
    /// The vehicle's length in m.
    pub length: f64,
}

/// A radar-style measurement of the vehicle directly ahead.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RadarReading {
    /// The net distance to the vehicle ahead in m.
    pub distance: f64,
    /// The speed relative to the vehicle ahead in m/s.
    pub rel_speed: f64,
}

/// The control law actively driving a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlMode {
    /// The simulator's own car-following model; used for platoon leaders
    /// and restored to every member at dissolution.
    Driver,
    /// Adaptive cruise control, reacting to radar data only.
    Acc,
    /// Cooperative adaptive cruise control, fed leader and front vehicle
    /// data by the communication relay.
    Cacc,
}

/// Tuning parameters of the cooperative controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaccParams {
    /// The target inter-vehicle distance in m.
    pub spacing: f64,
    /// The damping ratio.
    pub xi: f64,
    /// The controller bandwidth in rad/s.
    pub omega_n: f64,
    /// The leader data weighting constant.
    pub c1: f64,
}

impl CaccParams {
    /// Creates the standard parameter set for the given target spacing.
    pub fn with_spacing(spacing: f64) -> Self {
        Self {
            spacing,
            xi: 2.0,
            omega_n: 1.0,
            c1: 0.5,
        }
    }
}

/// Access to the car-following controller plugin.
///
/// Data queries return `None` when the plugin has no record for the vehicle,
/// for example because it exited the simulation mid-tick.
pub trait VehicleController {
    /// The current data record for the vehicle.
    fn vehicle_data(&self, vehicle: &VehicleId) -> Option<VehicleData>;

    /// A radar measurement of the vehicle directly ahead, or `None` if
    /// nothing is within sensing range.
    fn radar(&self, vehicle: &VehicleId) -> Option<RadarReading>;

    /// Pushes the platoon leader's data record to a follower.
    fn set_leader_data(&mut self, vehicle: &VehicleId, data: VehicleData);

    /// Pushes the front vehicle's data record to a follower.
    fn set_front_data(&mut self, vehicle: &VehicleId, data: VehicleData);

    /// Selects the control law actively driving the vehicle.
    fn set_active_controller(&mut self, vehicle: &VehicleId, mode: ControlMode);

    /// Whether the active controller's acceleration output actuates the
    /// vehicle, as opposed to being computed but not applied.
    fn use_controller_acceleration(&mut self, vehicle: &VehicleId, enabled: bool);

    /// Sets the cooperative controller's tuning parameters.
    fn set_cacc_params(&mut self, vehicle: &VehicleId, params: CaccParams);
}
