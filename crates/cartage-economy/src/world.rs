//! The `World`: every arena, the map, the clock, and the event timeline.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use cartage_agent::{Agent, AgentHost};
use cartage_core::{
    AgentId, Arena, DepotId, DockId, EconomyId, FleetId, GameClock, HubId, LaneId, NoteBus,
    QueueId, Registry, RequestId, RoleId, SimRng, Tick, TuningConfig, WareId,
};
use cartage_path::GridMap;

use crate::depot::Depot;
use crate::dock::{Dock, ShippingItem};
use crate::embark::Embark;
use crate::fleet::Fleet;
use crate::hub::Hub;
use crate::lane::Lane;
use crate::request::{Economy, Request};
use crate::supply_queue::SupplyQueue;
use crate::ware::Ware;

// ── Events ────────────────────────────────────────────────────────────────────

/// A timeline entry.  Everything that "waits" in the simulation registers
/// one of these and returns immediately.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Event {
    /// Wake an agent's task stack.  `gen` is the act-generation stamp; the
    /// scheduler drops the event if the agent has re-scheduled since.
    Act { agent: AgentId, gen: u64 },

    /// A world-side callback.
    Timer(Timer),
}

/// Non-agent callbacks.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Timer {
    /// A ware fulfillment finishes traveling and arrives at its requester.
    Deliver { request: RequestId },

    /// Periodic request/stock matching for one economy.
    Balance { economy: EconomyId },
}

/// Time-ordered event queue.
///
/// Ties on the tick are broken by a monotonically increasing sequence
/// number, i.e. insertion order — the stable secondary key that keeps
/// replays of the same command log reproducible.
#[derive(Default)]
pub struct Timeline {
    heap: BinaryHeap<Reverse<(Tick, u64, Event)>>,
    seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, at: Tick, event: Event) {
        self.seq += 1;
        self.heap.push(Reverse((at, self.seq, event)));
    }

    /// Earliest queued tick, if any.
    pub fn peek_tick(&self) -> Option<Tick> {
        self.heap.peek().map(|Reverse((t, _, _))| *t)
    }

    /// Pop the next event if it is due at or before `until`.
    pub fn pop_due(&mut self, until: Tick) -> Option<(Tick, Event)> {
        if self.peek_tick()? > until {
            return None;
        }
        self.heap.pop().map(|Reverse((t, _, e))| (t, e))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// All queued events in delivery order.  Used by persistence; the heap
    /// itself is untouched.
    pub fn snapshot(&self) -> Vec<(Tick, Event)> {
        let mut entries: Vec<(Tick, u64, Event)> = self
            .heap
            .iter()
            .map(|Reverse((t, s, e))| (*t, *s, e.clone()))
            .collect();
        entries.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        entries.into_iter().map(|(t, _, e)| (t, e)).collect()
    }
}

// ── Agent payloads ────────────────────────────────────────────────────────────

/// Role-specific state attached to an agent.
pub enum AgentData {
    Carrier(CarrierData),
    Worker(WorkerData),
    Ship(ShipData),
}

/// A carrier employed by a lane slot.
pub struct CarrierData {
    pub role: RoleId,
    pub lane: LaneId,
    pub slot: u32,
    /// The ware currently on the carrier's back, if any.
    pub carried: Option<WareId>,
}

/// A transport worker walking to fulfill a request.
pub struct WorkerData {
    pub role: RoleId,
}

/// A ship belonging to a fleet.
pub struct ShipData {
    pub fleet: FleetId,
    pub capacity: u32,
    pub cargo: Vec<ShippingItem>,
    /// Dock this ship is headed to, if the fleet gave it one.
    pub dest: Option<DockId>,
    /// An expedition was handed over; the ship's behavior starts the
    /// outbound voyage on its next update.
    pub expedition: bool,
}

// ── World ─────────────────────────────────────────────────────────────────────

/// All simulation state.
pub struct World {
    pub map: GridMap,
    pub registry: Registry,
    pub tuning: TuningConfig,
    pub rng: SimRng,
    pub notes: NoteBus,
    pub clock: GameClock,
    pub timeline: Timeline,

    pub agents: Arena<AgentId, Agent<World>>,
    pub agent_data: FxHashMap<AgentId, AgentData>,

    pub hubs: Arena<HubId, Hub>,
    pub lanes: Arena<LaneId, Lane>,
    pub wares: Arena<WareId, Ware>,
    pub depots: Arena<DepotId, Depot>,
    pub docks: Arena<DockId, Dock>,
    pub fleets: Arena<FleetId, Fleet>,
    pub queues: Arena<QueueId, SupplyQueue>,
    pub requests: Arena<RequestId, Request>,
    pub economies: Arena<EconomyId, Economy>,
}

impl World {
    pub fn new(map: GridMap, registry: Registry, tuning: TuningConfig, seed: u64) -> Self {
        Self {
            map,
            registry,
            tuning,
            rng: SimRng::new(seed),
            notes: NoteBus::new(),
            clock: GameClock::new(),
            timeline: Timeline::new(),
            agents: Arena::new(),
            agent_data: FxHashMap::default(),
            hubs: Arena::new(),
            lanes: Arena::new(),
            wares: Arena::new(),
            depots: Arena::new(),
            docks: Arena::new(),
            fleets: Arena::new(),
            queues: Arena::new(),
            requests: Arena::new(),
            economies: Arena::new(),
        }
    }

    // ── Checked accessors ─────────────────────────────────────────────────
    //
    // Looking up a dead handle through these is a defect in the caller
    // (e.g. dispatching a good from an unknown hub), so they panic rather
    // than limp on with corrupt state.  Use the arenas directly where
    // absence is an expected outcome.

    #[track_caller]
    pub fn hub(&self, id: HubId) -> &Hub {
        self.hubs.get(id).unwrap_or_else(|| panic!("unknown hub {id}"))
    }

    #[track_caller]
    pub fn hub_mut(&mut self, id: HubId) -> &mut Hub {
        self.hubs.get_mut(id).unwrap_or_else(|| panic!("unknown hub {id}"))
    }

    #[track_caller]
    pub fn lane(&self, id: LaneId) -> &Lane {
        self.lanes.get(id).unwrap_or_else(|| panic!("unknown lane {id}"))
    }

    #[track_caller]
    pub fn lane_mut(&mut self, id: LaneId) -> &mut Lane {
        self.lanes.get_mut(id).unwrap_or_else(|| panic!("unknown lane {id}"))
    }

    #[track_caller]
    pub fn ware(&self, id: WareId) -> &Ware {
        self.wares.get(id).unwrap_or_else(|| panic!("unknown ware {id}"))
    }

    #[track_caller]
    pub fn ware_mut(&mut self, id: WareId) -> &mut Ware {
        self.wares.get_mut(id).unwrap_or_else(|| panic!("unknown ware {id}"))
    }

    #[track_caller]
    pub fn depot_mut(&mut self, id: DepotId) -> &mut Depot {
        self.depots.get_mut(id).unwrap_or_else(|| panic!("unknown depot {id}"))
    }

    #[track_caller]
    pub fn dock(&self, id: DockId) -> &Dock {
        self.docks.get(id).unwrap_or_else(|| panic!("unknown dock {id}"))
    }

    #[track_caller]
    pub fn dock_mut(&mut self, id: DockId) -> &mut Dock {
        self.docks.get_mut(id).unwrap_or_else(|| panic!("unknown dock {id}"))
    }

    #[track_caller]
    pub fn fleet_mut(&mut self, id: FleetId) -> &mut Fleet {
        self.fleets.get_mut(id).unwrap_or_else(|| panic!("unknown fleet {id}"))
    }

    // ── Agent payload accessors ───────────────────────────────────────────

    pub fn carrier_data(&self, agent: AgentId) -> Option<&CarrierData> {
        match self.agent_data.get(&agent) {
            Some(AgentData::Carrier(c)) => Some(c),
            _ => None,
        }
    }

    pub fn carrier_data_mut(&mut self, agent: AgentId) -> Option<&mut CarrierData> {
        match self.agent_data.get_mut(&agent) {
            Some(AgentData::Carrier(c)) => Some(c),
            _ => None,
        }
    }

    pub fn ship_data(&self, agent: AgentId) -> Option<&ShipData> {
        match self.agent_data.get(&agent) {
            Some(AgentData::Ship(s)) => Some(s),
            _ => None,
        }
    }

    pub fn ship_data_mut(&mut self, agent: AgentId) -> Option<&mut ShipData> {
        match self.agent_data.get_mut(&agent) {
            Some(AgentData::Ship(s)) => Some(s),
            _ => None,
        }
    }

    /// Role of a worker-ish agent (worker or carrier).
    pub fn worker_role(&self, agent: AgentId) -> Option<RoleId> {
        match self.agent_data.get(&agent)? {
            AgentData::Worker(w) => Some(w.role),
            AgentData::Carrier(c) => Some(c.role),
            AgentData::Ship(_) => None,
        }
    }

    // ── Timers ────────────────────────────────────────────────────────────

    pub fn schedule_timer(&mut self, at: Tick, timer: Timer) {
        self.timeline.push(at, Event::Timer(timer));
    }
}

impl AgentHost for World {
    fn agents(&self) -> &Arena<AgentId, Agent<World>> {
        &self.agents
    }

    fn agents_mut(&mut self) -> &mut Arena<AgentId, Agent<World>> {
        &mut self.agents
    }

    fn now(&self) -> Tick {
        self.clock.now()
    }

    fn tuning(&self) -> &TuningConfig {
        &self.tuning
    }

    fn schedule_act_event(&mut self, at: Tick, agent: AgentId, gen: u64) {
        self.timeline.push(at, Event::Act { agent, gen });
    }
}

/// Dispatch one timer event.  Called by the sim loop when the timeline
/// reaches it.
pub fn dispatch_timer(world: &mut World, timer: Timer) {
    match timer {
        Timer::Deliver { request } => crate::request::deliver_ware(world, request),
        Timer::Balance { economy } => crate::request::balance(world, economy),
    }
}
