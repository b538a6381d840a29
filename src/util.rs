//! Route and road-space helpers shared by the formation and lifecycle phases.

use crate::sim::Simulator;
use crate::{EdgeId, VehicleId};

/// Gets the next edge on the vehicle's route, or `None` if the route ends
/// on the current edge or the vehicle is unknown.
pub(crate) fn next_edge<S: Simulator + ?Sized>(sim: &S, vehicle: &VehicleId) -> Option<EdgeId> {
    let route = sim.route(vehicle)?;
    let current = sim.road(vehicle)?;
    let idx = route.iter().position(|edge| *edge == current)?;
    route.get(idx + 1).cloned()
}

/// The remaining available space on the given edge in m.
///
/// Computed per lane as the lane length minus the space occupied by the
/// vehicles currently on it, each counted with its following gap; the
/// returned value is the minimum over the edge's lanes. An edge with no
/// known lanes has unbounded space.
pub(crate) fn available_space<S: Simulator + ?Sized>(
    sim: &S,
    edge: &EdgeId,
    min_gap: f64,
    spacing: f64,
) -> f64 {
    let gap = f64::max(min_gap, spacing);
    sim.edge_lanes(edge)
        .iter()
        .map(|lane| {
            let occupied = sim.lane_vehicle_count(lane) as f64 * (1.0 + gap);
            sim.lane_length(lane) - occupied
        })
        .fold(f64::INFINITY, f64::min)
}
