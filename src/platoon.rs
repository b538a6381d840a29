use crate::{LaneId, VehicleId};
use smallvec::SmallVec;

/// The lifecycle state of a platoon.
///
/// `Standard` platoons hold a fixed speed; `Braking` platoons have been
/// commanded a fixed deceleration. The transition is one-way, and a
/// dissolved platoon is simply removed rather than retained in a state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlatoonState {
    Standard,
    Braking,
}

/// A member's link to the vehicle ahead of it in the chain.
///
/// Making the link a tagged variant rules out a missing front reference at
/// the type level: only followers carry one, and they always do.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FrontLink {
    /// The member at the head of the chain; it has no front vehicle.
    Leader,
    /// A follower, with the member directly ahead of it.
    Follower { front: VehicleId },
}

/// One vehicle's entry in a platoon topology.
#[derive(Clone, Debug)]
pub struct Member {
    id: VehicleId,
    link: FrontLink,
}

impl Member {
    /// The member's vehicle ID.
    pub fn id(&self) -> &VehicleId {
        &self.id
    }

    /// The member's link to the vehicle ahead.
    pub fn link(&self) -> &FrontLink {
        &self.link
    }

    /// The vehicle directly ahead, or `None` for the leader.
    pub fn front(&self) -> Option<&VehicleId> {
        match &self.link {
            FrontLink::Leader => None,
            FrontLink::Follower { front } => Some(front),
        }
    }
}

/// A single-file chain of cooperatively controlled vehicles.
///
/// Membership is fixed at creation. The topology is strictly a line: each
/// follower references the member directly ahead, and walking the front
/// links from any member reaches the leader without repeats.
#[derive(Clone, Debug)]
pub struct Platoon {
    /// The lane the platoon was formed on.
    lane: LaneId,
    /// The members in chain order; the leader is first.
    members: SmallVec<[Member; 8]>,
    /// The lifecycle state.
    state: PlatoonState,
}

impl Platoon {
    /// Creates a platoon from vehicles listed in chain order, leader first.
    ///
    /// # Panics
    /// Panics if fewer than two vehicles are given; a platoon needs a
    /// leader and at least one follower.
    pub fn new(lane: LaneId, vehicles: &[VehicleId]) -> Self {
        assert!(
            vehicles.len() >= 2,
            "a platoon needs a leader and at least one follower"
        );
        let members = vehicles
            .iter()
            .enumerate()
            .map(|(i, id)| Member {
                id: id.clone(),
                link: if i == 0 {
                    FrontLink::Leader
                } else {
                    FrontLink::Follower {
                        front: vehicles[i - 1].clone(),
                    }
                },
            })
            .collect();
        Self {
            lane,
            members,
            state: PlatoonState::Standard,
        }
    }

    /// The lane the platoon was formed on.
    pub fn lane(&self) -> &LaneId {
        &self.lane
    }

    /// The platoon's lifecycle state.
    pub fn state(&self) -> PlatoonState {
        self.state
    }

    /// Marks the platoon as braking. There is no way back to `Standard`.
    pub(crate) fn begin_braking(&mut self) {
        self.state = PlatoonState::Braking;
    }

    /// The platoon leader.
    pub fn leader(&self) -> &VehicleId {
        self.members[0].id()
    }

    /// The member at the tail of the chain.
    pub fn last_member(&self) -> &VehicleId {
        self.members[self.members.len() - 1].id()
    }

    /// The number of members, leader included.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always `false`; a platoon has at least two members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterates over the members in chain order, leader first.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    /// Iterates over the non-leader members in chain order.
    pub fn followers(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().skip(1)
    }

    /// Whether the vehicle is a member of this platoon.
    pub fn contains(&self, vehicle: &VehicleId) -> bool {
        self.members.iter().any(|m| m.id() == vehicle)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn vids(ids: &[&str]) -> Vec<VehicleId> {
        ids.iter().map(|id| VehicleId::from(*id)).collect()
    }

    #[test]
    fn builds_a_single_chain() {
        let platoon = Platoon::new(LaneId::from("e_0"), &vids(&["v1", "v2", "v3"]));
        assert_eq!(platoon.len(), 3);
        assert_eq!(platoon.leader().as_str(), "v1");
        assert_eq!(platoon.last_member().as_str(), "v3");
        assert_eq!(platoon.state(), PlatoonState::Standard);

        let fronts: Vec<_> = platoon
            .members()
            .map(|m| m.front().map(|v| v.as_str().to_owned()))
            .collect();
        assert_eq!(
            fronts,
            [None, Some("v1".to_owned()), Some("v2".to_owned())]
        );
    }

    #[test]
    fn front_links_reach_the_leader_without_repeats() {
        let members = vids(&["v1", "v2", "v3", "v4", "v5"]);
        let platoon = Platoon::new(LaneId::from("e_0"), &members);

        for member in platoon.members() {
            let mut seen = vec![member.id().clone()];
            let mut current = member;
            while let Some(front) = current.front() {
                assert!(!seen.contains(front), "front chain revisited {front}");
                seen.push(front.clone());
                current = platoon
                    .members()
                    .find(|m| m.id() == front)
                    .expect("front link must point at a member");
            }
            assert_eq!(current.id(), platoon.leader());
            assert!(seen.len() <= platoon.len());
        }
    }

    #[test]
    #[should_panic(expected = "leader and at least one follower")]
    fn rejects_a_lone_vehicle() {
        Platoon::new(LaneId::from("e_0"), &vids(&["v1"]));
    }

    #[test]
    fn braking_is_one_way() {
        let mut platoon = Platoon::new(LaneId::from("e_0"), &vids(&["v1", "v2"]));
        platoon.begin_braking();
        assert_eq!(platoon.state(), PlatoonState::Braking);
    }
}
