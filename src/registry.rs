use crate::platoon::Platoon;
use crate::{LaneId, PlatoonId, VehicleId};
use slotmap::SlotMap;
use std::collections::HashMap;

/// Owns every active platoon, indexed by formation lane.
///
/// At most one platoon exists per lane at a time. Inserting onto an
/// occupied lane is a programming error and panics; it is not a
/// recoverable runtime condition.
#[derive(Default)]
pub struct Registry {
    /// The active platoons.
    platoons: SlotMap<PlatoonId, Platoon>,
    /// Formation lane of each active platoon.
    lanes: HashMap<LaneId, PlatoonId>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of active platoons.
    pub fn len(&self) -> usize {
        self.platoons.len()
    }

    /// Whether no platoon is active.
    pub fn is_empty(&self) -> bool {
        self.platoons.is_empty()
    }

    /// Gets the platoon formed on the given lane.
    pub fn get(&self, lane: &LaneId) -> Option<&Platoon> {
        self.lanes.get(lane).map(|id| &self.platoons[*id])
    }

    /// Gets the platoon formed on the given lane, along with its ID.
    pub fn lane_platoon(&self, lane: &LaneId) -> Option<(PlatoonId, &Platoon)> {
        self.lanes.get(lane).map(|id| (*id, &self.platoons[*id]))
    }

    /// Gets the platoon with the given ID.
    pub fn get_by_id(&self, id: PlatoonId) -> Option<&Platoon> {
        self.platoons.get(id)
    }

    /// Gets a mutable reference to the platoon formed on the given lane.
    pub(crate) fn get_mut(&mut self, lane: &LaneId) -> Option<&mut Platoon> {
        self.lanes.get(lane).map(|id| &mut self.platoons[*id])
    }

    /// Inserts a newly formed platoon.
    ///
    /// # Panics
    /// Panics if the platoon's lane already has an active platoon.
    pub fn insert(&mut self, platoon: Platoon) -> PlatoonId {
        let lane = platoon.lane().clone();
        assert!(
            !self.lanes.contains_key(&lane),
            "lane {lane} already has an active platoon"
        );
        let id = self.platoons.insert(platoon);
        self.lanes.insert(lane, id);
        id
    }

    /// Removes the platoon with the given ID and frees its lane.
    pub fn remove(&mut self, id: PlatoonId) -> Option<Platoon> {
        let platoon = self.platoons.remove(id)?;
        self.lanes.remove(platoon.lane());
        Some(platoon)
    }

    /// Removes the platoon formed on the given lane.
    pub fn remove_lane(&mut self, lane: &LaneId) -> Option<Platoon> {
        let id = self.lanes.remove(lane)?;
        self.platoons.remove(id)
    }

    /// Resolves a member on the given lane back to its platoon leader.
    pub fn leader_of(&self, lane: &LaneId, vehicle: &VehicleId) -> Option<&VehicleId> {
        let platoon = self.get(lane)?;
        platoon.contains(vehicle).then(|| platoon.leader())
    }

    /// Finds the platoon the vehicle currently belongs to, if any.
    /// A vehicle is a member of at most one platoon across the registry.
    pub fn member_of(&self, vehicle: &VehicleId) -> Option<PlatoonId> {
        self.platoons
            .iter()
            .find(|(_, platoon)| platoon.contains(vehicle))
            .map(|(id, _)| id)
    }

    /// Iterates over all active platoons in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (PlatoonId, &Platoon)> {
        self.platoons.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn platoon(lane: &str, ids: &[&str]) -> Platoon {
        let vids: Vec<VehicleId> = ids.iter().map(|id| VehicleId::from(*id)).collect();
        Platoon::new(LaneId::from(lane), &vids)
    }

    #[test]
    fn insert_get_remove() {
        let mut registry = Registry::new();
        let lane = LaneId::from("e_0");
        let id = registry.insert(platoon("e_0", &["v1", "v2"]));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&lane).unwrap().leader().as_str(), "v1");
        assert_eq!(registry.lane_platoon(&lane).unwrap().0, id);

        let removed = registry.remove(id).unwrap();
        assert_eq!(removed.leader().as_str(), "v1");
        assert!(registry.is_empty());
        assert!(registry.get(&lane).is_none());

        // the lane is free again
        registry.insert(platoon("e_0", &["v3", "v4"]));
    }

    #[test]
    fn remove_by_lane() {
        let mut registry = Registry::new();
        registry.insert(platoon("e_0", &["v1", "v2"]));
        assert!(registry.remove_lane(&LaneId::from("e_1")).is_none());
        assert!(registry.remove_lane(&LaneId::from("e_0")).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    #[should_panic(expected = "already has an active platoon")]
    fn one_platoon_per_lane() {
        let mut registry = Registry::new();
        registry.insert(platoon("e_0", &["v1", "v2"]));
        registry.insert(platoon("e_0", &["v3", "v4"]));
    }

    #[test]
    fn resolves_members_to_leaders() {
        let mut registry = Registry::new();
        registry.insert(platoon("e_0", &["v1", "v2", "v3"]));
        registry.insert(platoon("e_1", &["v4", "v5"]));

        let lane = LaneId::from("e_0");
        let leader = registry.leader_of(&lane, &VehicleId::from("v3"));
        assert_eq!(leader.unwrap().as_str(), "v1");
        assert!(registry.leader_of(&lane, &VehicleId::from("v5")).is_none());

        let id = registry.member_of(&VehicleId::from("v5")).unwrap();
        assert_eq!(registry.get_by_id(id).unwrap().leader().as_str(), "v4");
        assert!(registry.member_of(&VehicleId::from("v9")).is_none());
    }
}
