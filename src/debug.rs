//! Collection of per-tick platoon lifecycle events for debugging.

use crate::{LaneId, VehicleId};
#[cfg(feature = "debug")]
use serde_json::json;

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

#[allow(unused)]
pub(crate) fn debug_event(kind: &str, lane: &LaneId, vehicles: &[VehicleId]) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": kind,
            "lane": lane.as_str(),
            "vehicles": vehicles.iter().map(|v| v.as_str()).collect::<Vec<_>>(),
        }))
    });
}

/// Takes the lifecycle events collected since the last call as a JSON array.
#[cfg(feature = "debug")]
pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}
