use crate::controller::{CaccParams, ControlMode, VehicleController};
use crate::debug::debug_event;
use crate::formation::{self, Candidate};
use crate::light::{SignalPhase, SignalTracker};
use crate::metrics::MetricsWriter;
use crate::platoon::{Platoon, PlatoonState};
use crate::registry::Registry;
use crate::sim::{Color, Simulator, SpeedMode, NEUTRAL_COLOR};
use crate::{util, Config, EdgeId, Error, LaneId, PlatoonId, VehicleId};
use itertools::Itertools;
use log::{debug, info, warn};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::io::Write;

/// Safety margin in m added to the computed braking space.
const BRAKING_MARGIN: f64 = 5.0; // m

/// A braking platoon may dissolve only once its leader is slower than this.
const STOPPED_SPEED: f64 = 0.5; // m/s

/// The tracked last member of an active platoon, used to detect when the
/// whole platoon has crossed the junction.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Watch {
    /// The platoon's last member.
    vehicle: VehicleId,
    /// The lane the platoon was formed on.
    lane: LaneId,
    /// The edge beyond the watched crossing.
    next_edge: EdgeId,
}

/// Coordinates the formation, upkeep and dissolution of platoons at
/// signalised intersections.
///
/// The external driver loop calls [`step`](Self::step) exactly once between
/// successive simulator steps. Everything is synchronous and single
/// threaded; the simulator owns the clock.
pub struct PlatoonManager {
    /// The platooning parameters.
    cfg: Config,
    /// The active platoons.
    registry: Registry,
    /// The last members of the active platoons.
    watches: Vec<Watch>,
    /// Past members whose minimum gap is still reduced.
    ex_members: HashSet<VehicleId>,
    /// Per-lane signal phases from the previous tick.
    signals: SignalTracker,
    /// The benchmark sink, if one is attached.
    metrics: Option<MetricsWriter<Box<dyn Write>>>,
}

impl PlatoonManager {
    /// Creates a manager with the given configuration.
    ///
    /// # Panics
    /// Panics if `Config::max_deceleration` is not negative; the braking
    /// formulas divide by its magnitude.
    pub fn new(cfg: Config) -> Self {
        assert!(
            cfg.max_deceleration < 0.0,
            "max_deceleration must be negative, got {}",
            cfg.max_deceleration
        );
        Self {
            cfg,
            registry: Registry::new(),
            watches: Vec::new(),
            ex_members: HashSet::new(),
            signals: SignalTracker::new(),
            metrics: None,
        }
    }

    /// The manager's configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The active platoons.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The number of ex-members whose minimum gap is still reduced.
    pub fn pending_restorations(&self) -> usize {
        self.ex_members.len()
    }

    /// Attaches a benchmark sink and writes the header line to it.
    pub fn attach_metrics(&mut self, sink: Box<dyn Write>) -> Result<(), Error> {
        self.metrics = Some(MetricsWriter::new(sink)?);
        Ok(())
    }

    /// Runs one coordination pass at simulation time `now` (in s).
    ///
    /// Phases run in a fixed order: formation on lanes whose signal turned
    /// green, dissolution of crossed platoons, braking evaluation,
    /// communication relay, gap restoration, metrics emission. An error is
    /// returned only for consistency faults and metrics I/O failures, both
    /// fatal to the run; collaborator-data-missing faults are isolated to
    /// the affected platoon and logged.
    pub fn step<S: Simulator, C: VehicleController>(
        &mut self,
        sim: &mut S,
        ctrl: &mut C,
        now: f64,
    ) -> Result<(), Error> {
        self.form_platoons(sim, ctrl);
        self.clear_crossed_platoons(sim, ctrl)?;
        self.apply_braking(sim);
        self.communicate(ctrl);
        self.restore_min_gaps(sim);
        self.log_metrics(sim, ctrl, now)
    }

    /// Partitions the queues of lanes whose signal switched from red to
    /// green into new platoons.
    fn form_platoons<S: Simulator, C: VehicleController>(&mut self, sim: &mut S, ctrl: &mut C) {
        let mut lanes: Vec<LaneId> = vec![];
        for junction in sim.junctions() {
            let controlled = sim.controlled_lanes(&junction);
            let state = sim.signal_state(&junction);

            // A lane is listed once per connection it serves, so it may
            // appear under several signal indices. Collapse to one phase
            // per lane, last index wins, before updating the tracker;
            // observing a lane twice per tick would corrupt its history.
            let mut order: Vec<LaneId> = vec![];
            let mut phases: HashMap<LaneId, SignalPhase> = HashMap::new();
            for (lane, c) in controlled.into_iter().zip(state.chars()) {
                if phases.insert(lane.clone(), SignalPhase::from_state_char(c)).is_none() {
                    order.push(lane);
                }
            }
            for lane in order {
                let fired = self.signals.observe(&lane, phases[&lane]);
                if fired && !lanes.contains(&lane) {
                    lanes.push(lane);
                }
            }
        }

        for lane in lanes {
            let queue = sim.lane_vehicles(&lane);
            if queue.is_empty() {
                continue;
            }
            let connections = sim.lane_connections(&lane);

            // the simulator reports the queue back to front
            let mut candidates = Vec::with_capacity(queue.len());
            for vid in queue.iter().rev() {
                let (Some(length), Some(waiting_time)) =
                    (sim.length(vid), sim.waiting_time(vid))
                else {
                    warn!("vehicle {vid} vanished while its queue was scanned");
                    continue;
                };
                let next_edge = util::next_edge(sim, vid);
                let blocked = sim.lane_change_pending(vid)
                    || next_edge
                        .as_ref()
                        .is_some_and(|edge| !connections.contains(edge));
                candidates.push(Candidate {
                    id: vid.clone(),
                    length,
                    waiting_time,
                    next_edge,
                    blocked,
                });
            }

            let groups = {
                let sim_ref: &S = sim;
                let cfg = &self.cfg;
                formation::partition(
                    &candidates,
                    |edge| util::available_space(sim_ref, edge, cfg.min_gap, cfg.spacing),
                    cfg,
                )
            };

            for group in groups {
                self.create_platoon(sim, ctrl, &lane, &group);
            }
        }
    }

    /// Creates a platoon from the given member group, leader first.
    fn create_platoon<S: Simulator, C: VehicleController>(
        &mut self,
        sim: &mut S,
        ctrl: &mut C,
        lane: &LaneId,
        vids: &[VehicleId],
    ) {
        // Exclusive membership takes precedence over the new formation.
        let stale: Vec<PlatoonId> = vids
            .iter()
            .filter_map(|vid| self.registry.member_of(vid))
            .unique()
            .collect();
        for id in stale {
            warn!("dissolving a platoon that still holds a member of a new formation");
            self.dissolve(sim, ctrl, id);
        }

        if self.registry.get(lane).is_some() {
            // One platoon per lane; the previous one has not finished crossing.
            warn!("lane {lane} still has an active platoon, skipping formation");
            return;
        }

        let last = vids[vids.len() - 1].clone();
        let Some(next_edge) = util::next_edge(sim, &last) else {
            warn!("last member {last} has no next edge, skipping formation");
            return;
        };

        info!(
            "creating a platoon of [{}] on lane {lane}",
            vids.iter().join(", ")
        );

        let mut rng = rand::thread_rng();
        let color: Color = [
            rng.gen_range(0..255),
            rng.gen_range(0..255),
            rng.gen_range(0..255),
            255,
        ];
        let params = CaccParams::with_spacing(self.cfg.spacing);

        let leader = &vids[0];
        sim.set_speed_mode(leader, SpeedMode::Checked);
        sim.set_color(leader, color);
        ctrl.set_active_controller(leader, ControlMode::Driver);
        ctrl.use_controller_acceleration(leader, false);
        ctrl.set_cacc_params(leader, params);
        if let Some(idx) = sim.lane_index(leader) {
            sim.set_fixed_lane(leader, Some(idx));
        }
        sim.set_speed(leader, Some(self.cfg.platoon_speed));

        for vid in &vids[1..] {
            // a re-platooned vehicle no longer awaits gap restoration
            self.ex_members.remove(vid);
            // tight-formation driving
            sim.set_min_gap(vid, 0.0);
            sim.set_speed_mode(vid, SpeedMode::Unchecked);
            sim.set_color(vid, color);
            ctrl.set_active_controller(vid, ControlMode::Cacc);
            ctrl.use_controller_acceleration(vid, true);
            ctrl.set_cacc_params(vid, params);
            if let Some(idx) = sim.lane_index(vid) {
                sim.set_fixed_lane(vid, Some(idx));
            }
        }

        self.registry.insert(Platoon::new(lane.clone(), vids));
        self.watches.push(Watch {
            vehicle: last,
            lane: lane.clone(),
            next_edge,
        });
        debug_event("create", lane, vids);
    }

    /// Evaluates every watch entry and dissolves the platoons that have
    /// fully crossed their intersection.
    fn clear_crossed_platoons<S: Simulator, C: VehicleController>(
        &mut self,
        sim: &mut S,
        ctrl: &mut C,
    ) -> Result<(), Error> {
        let mut crossed: Vec<(Watch, PlatoonId)> = vec![];

        for watch in &self.watches {
            let resolved = self
                .registry
                .lane_platoon(&watch.lane)
                .filter(|(_, platoon)| platoon.contains(&watch.vehicle));
            let Some((id, platoon)) = resolved else {
                return Err(Error::OrphanedWatch {
                    lane: watch.lane.clone(),
                    vehicle: watch.vehicle.clone(),
                });
            };

            // A watched vehicle the simulator no longer knows has crossed
            // and left; the platoon is dissolved rather than kept forever.
            let Some(road) = sim.road(&watch.vehicle) else {
                warn!("{}", Error::UnknownVehicle(watch.vehicle.clone()));
                crossed.push((watch.clone(), id));
                continue;
            };
            if road != watch.next_edge {
                continue;
            }

            let spacing_reached = ctrl
                .radar(&watch.vehicle)
                .map_or(true, |radar| radar.distance >= self.cfg.spacing);
            let stalled =
                sim.waiting_time(&watch.vehicle).unwrap_or(0.0) > self.cfg.waiting_time_threshold;
            if !spacing_reached && !stalled {
                continue;
            }

            // a braking platoon is not dissolved mid-deceleration
            if platoon.state() == PlatoonState::Braking
                && sim.speed(platoon.leader()).unwrap_or(0.0) >= STOPPED_SPEED
            {
                continue;
            }

            crossed.push((watch.clone(), id));
        }

        for (watch, id) in crossed {
            self.watches.retain(|w| *w != watch);
            self.dissolve(sim, ctrl, id);
        }
        Ok(())
    }

    /// Disassembles a platoon, restoring every member to independent
    /// driving and queueing the followers for gap restoration.
    fn dissolve<S: Simulator, C: VehicleController>(
        &mut self,
        sim: &mut S,
        ctrl: &mut C,
        id: PlatoonId,
    ) {
        let Some(platoon) = self.registry.remove(id) else {
            return;
        };
        let ids: Vec<VehicleId> = platoon.members().map(|m| m.id().clone()).collect();
        info!(
            "dissolving the platoon of [{}] on lane {}",
            ids.iter().join(", "),
            platoon.lane()
        );

        for member in platoon.members() {
            let vid = member.id();
            sim.set_speed_mode(vid, SpeedMode::Checked);
            sim.set_speed(vid, None);
            sim.set_color(vid, NEUTRAL_COLOR);
            ctrl.set_active_controller(vid, ControlMode::Driver);
            if member.front().is_some() {
                sim.set_fixed_lane(vid, None);
                self.ex_members.insert(vid.clone());
            }
        }

        self.watches.retain(|watch| !platoon.contains(&watch.vehicle));
        debug_event("dissolve", platoon.lane(), &ids);
    }

    /// Commands a coordinated deceleration for platoons approaching the
    /// end of their road segment. Fires at most once per platoon.
    fn apply_braking<S: Simulator>(&mut self, sim: &mut S) {
        let space = braking_space(&self.cfg);
        let time = braking_time(&self.cfg);

        let mut braking: Vec<LaneId> = vec![];
        for watch in &self.watches {
            let Some(platoon) = self.registry.get(&watch.lane) else {
                continue;
            };
            if platoon.state() != PlatoonState::Standard {
                continue;
            }
            let leader = platoon.leader();

            // only brake while the leader still approaches the watched crossing
            if util::next_edge(sim, leader).as_ref() != Some(&watch.next_edge) {
                continue;
            }

            let (Some(lane), Some(pos)) = (sim.lane(leader), sim.lane_position(leader)) else {
                continue;
            };
            let remaining = sim.lane_length(&lane) - pos;
            if remaining <= space + BRAKING_MARGIN {
                debug!("platoon led by {leader} starts braking with {remaining:.1} m to go");
                sim.set_acceleration(leader, self.cfg.max_deceleration, time);
                debug_event("braking", &watch.lane, std::slice::from_ref(leader));
                braking.push(watch.lane.clone());
            }
        }

        for lane in braking {
            if let Some(platoon) = self.registry.get_mut(&lane) {
                platoon.begin_braking();
            }
        }
    }

    /// Relays leader and front vehicle data to every follower of every
    /// active platoon, braking platoons included.
    fn communicate<C: VehicleController>(&self, ctrl: &mut C) {
        for (_, platoon) in self.registry.iter() {
            if let Err(err) = relay_platoon(ctrl, platoon) {
                // the platoon must not be driven on stale data this tick
                warn!("relay aborted for the platoon on lane {}: {err}", platoon.lane());
            }
        }
    }

    /// Restores the minimum gap of ex-members once the space ahead of
    /// them allows it without forcing the vehicle behind to brake.
    fn restore_min_gaps<S: Simulator>(&mut self, sim: &mut S) {
        let mut restored: Vec<VehicleId> = vec![];
        for vid in &self.ex_members {
            let Some(gap) = sim.min_gap(vid) else {
                // left the simulation
                restored.push(vid.clone());
                continue;
            };
            if (gap - self.cfg.min_gap).abs() < 1e-9 {
                restored.push(vid.clone());
                continue;
            }

            // available space ahead, counting the still-reduced gap;
            // no vehicle ahead means unbounded space
            let available = sim.leader_gap(vid).map(|dist| dist + gap);
            let threshold = self.cfg.gap_restore_factor * self.cfg.min_gap;
            if available.map_or(true, |space| space >= threshold) {
                sim.set_min_gap(vid, self.cfg.min_gap);
                restored.push(vid.clone());
            }
        }
        for vid in restored {
            self.ex_members.remove(&vid);
        }
    }

    /// Emits one benchmark record per member of every active platoon.
    fn log_metrics<S: Simulator, C: VehicleController>(
        &mut self,
        sim: &S,
        ctrl: &C,
        now: f64,
    ) -> Result<(), Error> {
        let Some(metrics) = self.metrics.as_mut() else {
            return Ok(());
        };

        for (_, platoon) in self.registry.iter() {
            for member in platoon.members() {
                let vid = member.id();
                let (distance, rel_speed) = match member.front() {
                    // the leader has no front vehicle, by convention
                    None => (-1.0, 0.0),
                    Some(_) => match ctrl.radar(vid) {
                        Some(radar) => (radar.distance, radar.rel_speed),
                        None => {
                            debug!("no radar data for {vid}");
                            continue;
                        }
                    },
                };
                let (Some(speed), Some(acceleration)) =
                    (sim.speed(vid), sim.acceleration(vid))
                else {
                    continue;
                };
                metrics.record(vid, now, distance, rel_speed, speed, acceleration)?;
            }
        }
        Ok(())
    }
}

/// Pushes the leader's data to every follower and each front vehicle's
/// data to the member behind it, in chain order.
///
/// A missing data record aborts the platoon's relay for this tick: from
/// that member on, no data is pushed at all rather than partial data.
fn relay_platoon<C: VehicleController>(ctrl: &mut C, platoon: &Platoon) -> Result<(), Error> {
    let leader = platoon.leader();
    let leader_data = ctrl
        .vehicle_data(leader)
        .ok_or_else(|| Error::MissingVehicleData(leader.clone()))?;

    for member in platoon.followers() {
        let Some(front) = member.front() else {
            continue;
        };
        let front_data = ctrl
            .vehicle_data(front)
            .ok_or_else(|| Error::MissingVehicleData(front.clone()))?;
        ctrl.set_leader_data(member.id(), leader_data);
        ctrl.set_front_data(member.id(), front_data);
    }
    Ok(())
}

/// The distance in m a platoon needs to brake from `platoon_speed`
/// to a standstill at the maximum deceleration.
fn braking_space(cfg: &Config) -> f64 {
    cfg.platoon_speed.powi(2) / (2.0 * cfg.max_deceleration.abs())
}

/// The duration in s of the braking manoeuvre.
fn braking_time(cfg: &Config) -> f64 {
    cfg.platoon_speed / cfg.max_deceleration.abs()
}
