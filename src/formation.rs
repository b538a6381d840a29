//! Partitioning of a green-lit lane's queue into platoon member groups.

use crate::{Config, EdgeId, VehicleId};
use std::collections::HashMap;
use std::mem;

/// A snapshot of one queued vehicle, taken when its lane's signal
/// turns green.
#[derive(Clone, Debug)]
pub(crate) struct Candidate {
    pub id: VehicleId,
    /// The vehicle's physical length in m.
    pub length: f64,
    /// The vehicle's accumulated waiting time in s.
    pub waiting_time: f64,
    /// The next edge on the vehicle's route, if any.
    pub next_edge: Option<EdgeId>,
    /// Whether the vehicle is blocked for an imminent lane change, or its
    /// next edge is unreachable through the lane's connections.
    pub blocked: bool,
}

/// Partitions a queue into platoon member groups.
///
/// `queue` is ordered from closest to the intersection to farthest, and
/// `space_for` yields the available space on a given next edge. A candidate
/// group is closed by any stop condition: a non-head vehicle that never
/// stopped, exhausted space on the target edge, route divergence, a blocked
/// lane change, or the group size cap. Closed groups below
/// `Config::min_members` are discarded; scanning always continues past a
/// closed group, so one queue may yield several platoons.
pub(crate) fn partition<F>(queue: &[Candidate], space_for: F, cfg: &Config) -> Vec<Vec<VehicleId>>
where
    F: Fn(&EdgeId) -> f64,
{
    let mut scan = Scan::new(cfg.min_members);

    for (i, cand) in queue.iter().enumerate() {
        // A vehicle with zero waiting time was never actually stopped and is
        // not a platooning candidate. The head of the queue is exempt, since
        // the green light has just reset its waiting time.
        if i > 0 && cand.waiting_time == 0.0 {
            scan.close();
            continue;
        }

        if cand.blocked {
            scan.close();
            continue;
        }

        // A vehicle whose route ends here cannot cross with the group.
        let Some(edge) = &cand.next_edge else {
            scan.close();
            continue;
        };

        // Route divergence: vehicles that split at the next junction cannot
        // share a platoon, but the diverging vehicle may head a new group.
        if scan.edge.as_ref().is_some_and(|e| e != edge) {
            scan.close();
        }

        if scan.group.is_empty() {
            scan.open(edge, space_for(edge));
        }

        let needed = cand.length + cfg.spacing;
        if scan.length + needed > scan.space {
            // No more room on the target edge for this group.
            scan.close();
            if needed > scan.free_space(space_for(edge), edge) {
                continue;
            }
            scan.open(edge, space_for(edge));
        }

        scan.group.push(cand.id.clone());
        scan.length += needed;

        if scan.group.len() == cfg.max_members {
            scan.close();
        }
    }

    scan.close();
    scan.groups
}

/// The accumulator state of one partitioning pass.
struct Scan {
    min_members: usize,
    groups: Vec<Vec<VehicleId>>,
    /// Space on each next edge already granted to emitted groups.
    committed: HashMap<EdgeId, f64>,
    group: Vec<VehicleId>,
    /// The accumulated physical length of the current group in m,
    /// inter-vehicle distances included.
    length: f64,
    /// The current group's shared next edge.
    edge: Option<EdgeId>,
    /// The space available to the current group in m.
    space: f64,
}

impl Scan {
    fn new(min_members: usize) -> Self {
        Self {
            min_members,
            groups: vec![],
            committed: HashMap::new(),
            group: vec![],
            length: 0.0,
            edge: None,
            space: 0.0,
        }
    }

    /// Starts a fresh group bound for the given edge.
    fn open(&mut self, edge: &EdgeId, space: f64) {
        self.edge = Some(edge.clone());
        self.space = self.free_space(space, edge);
        self.length = 0.0;
    }

    /// Closes the current group, emitting it if it is large enough and
    /// discarding it otherwise.
    fn close(&mut self) {
        if self.group.len() >= self.min_members {
            if let Some(edge) = self.edge.take() {
                *self.committed.entry(edge).or_insert(0.0) += self.length;
            }
            self.groups.push(mem::take(&mut self.group));
        } else {
            self.group.clear();
            self.edge = None;
        }
        self.length = 0.0;
        self.space = 0.0;
    }

    /// The given base space minus what emitted groups already claimed.
    fn free_space(&self, base: f64, edge: &EdgeId) -> f64 {
        base - self.committed.get(edge).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn candidate(id: &str, waiting: f64, edge: Option<&str>, blocked: bool) -> Candidate {
        Candidate {
            id: VehicleId::from(id),
            length: 5.0,
            waiting_time: waiting,
            next_edge: edge.map(EdgeId::from),
            blocked,
        }
    }

    /// Six stopped vehicles sharing a next edge, uniform length 5 and
    /// spacing 4. The head's waiting time is reset by the green light.
    fn uniform_queue() -> Vec<Candidate> {
        (1..=6)
            .map(|i| {
                let waiting = if i == 1 { 0.0 } else { 10.0 };
                candidate(&format!("v{i}"), waiting, Some("E"), false)
            })
            .collect()
    }

    fn config(min_members: usize) -> Config {
        Config {
            min_members,
            spacing: 4.0,
            ..Default::default()
        }
    }

    fn names(groups: &[Vec<VehicleId>]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|group| group.iter().map(|v| v.as_str()).collect())
            .collect()
    }

    #[test]
    fn forms_one_platoon_from_a_uniform_queue() {
        let mut queue = uniform_queue();
        // v6 was never stopped, so it is driving freely
        queue[5].waiting_time = 0.0;

        let groups = partition(&queue, |_| 100.0, &config(5));
        assert_eq!(names(&groups), [["v1", "v2", "v3", "v4", "v5"]]);
    }

    #[test]
    fn includes_the_tail_when_it_also_waited() {
        let groups = partition(&uniform_queue(), |_| 100.0, &config(5));
        assert_eq!(names(&groups), [["v1", "v2", "v3", "v4", "v5", "v6"]]);
    }

    #[test]
    fn discards_groups_below_the_minimum_size() {
        let queue: Vec<_> = (1..=2)
            .map(|i| candidate(&format!("v{i}"), 10.0, Some("E"), false))
            .collect();
        assert!(partition(&queue, |_| 100.0, &config(5)).is_empty());
    }

    #[test]
    fn route_divergence_splits_the_queue() {
        let mut queue = uniform_queue();
        for cand in &mut queue[2..] {
            cand.next_edge = Some(EdgeId::from("F"));
        }

        // both sides of the split are below the threshold
        assert!(partition(&queue, |_| 100.0, &config(5)).is_empty());

        // with a lower threshold, both sub-groups become platoons
        let groups = partition(&queue, |_| 100.0, &config(2));
        assert_eq!(
            names(&groups),
            vec![vec!["v1", "v2"], vec!["v3", "v4", "v5", "v6"]]
        );
    }

    #[test]
    fn stops_at_the_available_space() {
        // each vehicle claims 5 + 4 = 9 m; only two fit into 25 m
        let groups = partition(&uniform_queue(), |_| 25.0, &config(2));
        assert_eq!(names(&groups), [["v1", "v2"]]);
    }

    #[test]
    fn accounts_for_space_claimed_by_earlier_groups() {
        // 40 m fits one group of four; the second group would need room
        // beyond what the first already claimed
        let groups = partition(&uniform_queue(), |_| 40.0, &config(2));
        assert_eq!(names(&groups), [["v1", "v2", "v3", "v4"]]);
    }

    #[test]
    fn caps_the_group_size() {
        let cfg = Config {
            max_members: 3,
            ..config(2)
        };
        let groups = partition(&uniform_queue(), |_| 1000.0, &cfg);
        assert_eq!(
            names(&groups),
            vec![vec!["v1", "v2", "v3"], vec!["v4", "v5", "v6"]]
        );
    }

    #[test]
    fn excludes_blocked_vehicles() {
        let mut queue = uniform_queue();
        queue[2].blocked = true;

        let groups = partition(&queue, |_| 100.0, &config(2));
        assert_eq!(
            names(&groups),
            vec![vec!["v1", "v2"], vec!["v4", "v5", "v6"]]
        );
    }

    #[test]
    fn excludes_vehicles_without_a_next_edge() {
        let mut queue = uniform_queue();
        queue[2].next_edge = None;

        let groups = partition(&queue, |_| 100.0, &config(5));
        assert!(groups.is_empty());

        let groups = partition(&queue, |_| 100.0, &config(2));
        assert_eq!(
            names(&groups),
            vec![vec!["v1", "v2"], vec!["v4", "v5", "v6"]]
        );
    }

    #[test]
    fn a_moving_vehicle_mid_queue_splits_the_scan() {
        let mut queue = uniform_queue();
        queue[3].waiting_time = 0.0;

        let groups = partition(&queue, |_| 100.0, &config(2));
        assert_eq!(
            names(&groups),
            vec![vec!["v1", "v2", "v3"], vec!["v5", "v6"]]
        );
    }
}
