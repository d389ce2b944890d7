//! Ware-kind and worker-role registry.
//!
//! One `Registry` is constructed at startup and passed by reference to every
//! component that needs to look a kind up by id or name.  There are no
//! global descriptor tables: whoever builds the world decides what kinds
//! exist, which also removes any static-initialization-order hazard.

use std::io::Read;

use crate::error::{CoreError, CoreResult};
use crate::ids::{RoleId, WareKindId};

/// A kind of transportable good.
#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct WareKind {
    pub name: String,
}

/// A kind of worker an economy can request (carrier, builder, …).
#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct WorkerRole {
    pub name: String,
}

/// The constructed-once kind table.
#[derive(Default, Debug)]
pub struct Registry {
    wares: Vec<WareKind>,
    roles: Vec<WorkerRole>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Population ────────────────────────────────────────────────────────

    pub fn add_ware(&mut self, name: impl Into<String>) -> WareKindId {
        let id = WareKindId(self.wares.len() as u16);
        self.wares.push(WareKind { name: name.into() });
        id
    }

    pub fn add_role(&mut self, name: impl Into<String>) -> RoleId {
        let id = RoleId(self.roles.len() as u16);
        self.roles.push(WorkerRole { name: name.into() });
        id
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    pub fn ware(&self, id: WareKindId) -> Option<&WareKind> {
        self.wares.get(id.index())
    }

    pub fn role(&self, id: RoleId) -> Option<&WorkerRole> {
        self.roles.get(id.index())
    }

    pub fn ware_by_name(&self, name: &str) -> Option<WareKindId> {
        self.wares
            .iter()
            .position(|w| w.name == name)
            .map(|i| WareKindId(i as u16))
    }

    pub fn role_by_name(&self, name: &str) -> Option<RoleId> {
        self.roles
            .iter()
            .position(|r| r.name == name)
            .map(|i| RoleId(i as u16))
    }

    pub fn ware_count(&self) -> usize {
        self.wares.len()
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    // ── CSV loading ───────────────────────────────────────────────────────

    /// Load ware kinds from a CSV stream with a `name` header column.
    ///
    /// Duplicate names are rejected: kind names double as persistence keys,
    /// so two kinds with the same name could not be told apart on load.
    pub fn load_wares_csv<R: Read>(&mut self, reader: R) -> CoreResult<usize> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut added = 0;
        for row in rdr.deserialize::<KindRow>() {
            let row = row.map_err(|e| CoreError::Parse(e.to_string()))?;
            if self.ware_by_name(&row.name).is_some() {
                return Err(CoreError::Parse(format!("duplicate ware kind '{}'", row.name)));
            }
            self.add_ware(row.name);
            added += 1;
        }
        Ok(added)
    }

    /// Load worker roles from a CSV stream with a `name` header column.
    pub fn load_roles_csv<R: Read>(&mut self, reader: R) -> CoreResult<usize> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut added = 0;
        for row in rdr.deserialize::<KindRow>() {
            let row = row.map_err(|e| CoreError::Parse(e.to_string()))?;
            if self.role_by_name(&row.name).is_some() {
                return Err(CoreError::Parse(format!("duplicate worker role '{}'", row.name)));
            }
            self.add_role(row.name);
            added += 1;
        }
        Ok(added)
    }
}

/// One CSV row of either kind table.
#[derive(serde::Deserialize)]
struct KindRow {
    name: String,
}
