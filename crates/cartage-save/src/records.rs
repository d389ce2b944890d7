//! The on-disk record tree.
//!
//! Records are plain serde structs.  Object references are dense file
//! indices (`u32`) into the sibling record lists; kind and role references
//! are names, so saves survive registry reordering.  `Option<u32>` encodes
//! "no object" (a stale or absent handle at save time).

use cartage_core::Coord;
use cartage_path::Path;

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct WorldRecord {
    pub version: u8,
    pub clock_now: u64,
    pub hubs: Vec<HubRecord>,
    pub lanes: Vec<LaneRecord>,
    pub depots: Vec<DepotRecord>,
    pub wares: Vec<WareRecord>,
    pub docks: Vec<DockRecord>,
    pub fleets: Vec<FleetRecord>,
    pub queues: Vec<QueueRecord>,
    pub requests: Vec<RequestRecord>,
    pub economies: Vec<EconomyRecord>,
    pub agents: Vec<AgentRecord>,
    pub timeline: Vec<EventRecord>,
}

// ── Network ───────────────────────────────────────────────────────────────────

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct HubRecord {
    pub pos: Coord,
    pub economy: u32,
    pub capacity: u32,
    pub wares: Vec<RestingWareRecord>,
    pub next_seq: u64,
    /// Fixed six lane slots, `None` where empty.
    pub lanes: Vec<Option<u32>>,
    pub depot: Option<u32>,
    pub dock: Option<u32>,
    pub capacity_wait: Vec<u32>,
    pub jobs: Vec<HubJobRecord>,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct RestingWareRecord {
    pub ware: u32,
    pub pending: bool,
    pub priority: i32,
    pub nextstep: Option<u32>,
    pub seq: u64,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct HubJobRecord {
    pub request: u32,
    pub program: String,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct LaneRecord {
    pub hubs: [u32; 2],
    pub path: Path,
    pub idle_index: u32,
    pub carrier_role: String,
    pub slots: Vec<CarrierSlotRecord>,
    pub busyness: u32,
    pub busyness_last_update: u64,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct CarrierSlotRecord {
    pub carrier: Option<u32>,
    pub request: Option<u32>,
}

// ── Stores ────────────────────────────────────────────────────────────────────

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct DepotRecord {
    pub hub: u32,
    /// Sorted by kind name so output is deterministic.
    pub stock: Vec<(String, u32)>,
    pub workers: Vec<(String, u32)>,
    pub expedition_bill: Vec<(String, u32)>,
    pub expedition_roles: Vec<String>,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct WareRecord {
    pub kind: String,
    pub location: WareLocationRecord,
    pub destination: Option<u32>,
    pub priority: i32,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub enum WareLocationRecord {
    Hub(u32),
    Carried(u32),
    Dock(u32),
    Ship(u32),
}

// ── Maritime ──────────────────────────────────────────────────────────────────

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct DockRecord {
    pub hub: u32,
    pub positions: Vec<Coord>,
    pub depot: u32,
    pub fleet: u32,
    pub need_ship: bool,
    pub waiting: Vec<ShippingItemRecord>,
    pub embark: Option<EmbarkRecord>,
    pub embark_ready: bool,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct ShippingItemRecord {
    pub payload: DockPayloadRecord,
    pub destination: Option<u32>,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub enum DockPayloadRecord {
    Ware(u32),
    /// `agent` is `None` while the worker rides a ship.
    Worker { agent: Option<u32>, role: String },
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct EmbarkRecord {
    pub queues: Vec<u32>,
    pub workers: Vec<EmbarkSlotRecord>,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct EmbarkSlotRecord {
    pub role: String,
    pub request: Option<u32>,
    pub agent: Option<u32>,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct FleetRecord {
    pub ships: Vec<u32>,
    pub docks: Vec<u32>,
}

// ── Supply ────────────────────────────────────────────────────────────────────

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct QueueRecord {
    pub owner: QueueOwnerRecord,
    pub hub: u32,
    pub kind: String,
    pub max_size: u32,
    pub target_fill: u32,
    pub filled: u32,
    pub request: Option<u32>,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub enum QueueOwnerRecord {
    Embark(u32),
    Depot(u32),
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct RequestRecord {
    pub kind: RequestKindRecord,
    pub target_hub: u32,
    pub role: RequestRoleRecord,
    pub economy: u32,
    pub created: u64,
    pub in_delivery: bool,
    pub source_depot: Option<u32>,
    pub courier: Option<u32>,
    pub starve_noted: bool,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub enum RequestKindRecord {
    Ware(String),
    Worker(String),
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub enum RequestRoleRecord {
    SupplyQueue { queue: u32 },
    LaneSlot { lane: u32, slot: u32 },
    HubJob { hub: u32 },
    EmbarkWorker { dock: u32, slot: u32 },
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct EconomyRecord {
    pub hubs: Vec<u32>,
    pub requests: Vec<u32>,
    pub balance_scheduled: bool,
}

// ── Agents ────────────────────────────────────────────────────────────────────

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct AgentRecord {
    pub pos: Coord,
    pub walk_end: u64,
    pub signal: String,
    pub act_gen: u64,
    pub default_task: String,
    pub stack: Vec<TaskStateRecord>,
    pub data: Option<AgentDataRecord>,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct TaskStateRecord {
    pub task: String,
    pub ivar1: i32,
    pub ivar2: i32,
    pub ivar3: i32,
    pub svar: String,
    /// The one weak scratch reference tasks use points at a request.
    pub objvar_request: Option<u32>,
    pub coords: Option<Coord>,
    pub path: Option<Path>,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub enum AgentDataRecord {
    Carrier { role: String, lane: u32, slot: u32, carried: Option<u32> },
    Worker { role: String },
    Ship {
        fleet: u32,
        capacity: u32,
        cargo: Vec<ShippingItemRecord>,
        dest: Option<u32>,
        expedition: bool,
    },
}

// ── Timeline ──────────────────────────────────────────────────────────────────

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub struct EventRecord {
    pub at: u64,
    pub event: EventKindRecord,
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
pub enum EventKindRecord {
    Act { agent: u32, gen: u64 },
    Deliver { request: u32 },
    Balance { economy: u32 },
}
