use serde::Serialize;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::event::Pass;
use super::inventory::{InventoryTracker, Phenotype, Sighting};
use super::time::TimeBudget;

/// Counters the console reads and the planner reasons over.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub running: bool,
    pub action_count: u64,
    pub row: u32,
    /// Distinct sightings newly logged.
    pub plant_count: u32,
    /// Grabs issued.
    pub samples_collected: u32,
    pub pass: Pass,
}

/// Strict state delta. The planner only proposes these; `reduce` applies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionDelta {
    StepCounted,
    PassObserved(Pass),
    RowEntered(u32),
    RowAdvanced,
    SightingRecorded(Sighting),
    SampleCollected(Phenotype),
}

/// The whole mutable session: counters, inventory and time budget.
/// Owned by the reactor and passed to the planner explicitly.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub state: SessionState,
    pub inventory: InventoryTracker,
    pub budget: TimeBudget,
    /// Monotonic, bumped on every reduction.
    pub version: u64,
}

impl SessionContext {
    pub fn new(run_time: Duration, give_up: Duration) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: SessionState::default(),
            inventory: InventoryTracker::new(),
            budget: TimeBudget::new(run_time, give_up),
            version: 0,
        }
    }

    /// Pure reduction: Session + Delta -> mutated Session
    pub fn reduce(&mut self, delta: SessionDelta) {
        self.version += 1;

        match delta {
            SessionDelta::StepCounted => self.state.action_count += 1,
            SessionDelta::PassObserved(pass) => self.state.pass = pass,
            SessionDelta::RowEntered(row) => self.state.row = row,
            SessionDelta::RowAdvanced => self.state.row += 1,
            SessionDelta::SightingRecorded(s) => {
                if self.inventory.record_sighting(s.row, s.slot, s.color, s.height) {
                    self.state.plant_count += 1;
                }
            }
            SessionDelta::SampleCollected(p) => {
                // Grab count follows the inventory flip so it can never exceed six.
                if self.inventory.is_new_phenotype(p) {
                    self.inventory.mark_collected(p);
                    self.state.samples_collected += 1;
                }
            }
        }
    }

    pub fn run(&mut self) {
        self.state.running = true;
        self.budget.resume();
        info!(target: "reactor", session = %self.session_id, remaining = ?self.budget.remaining(), "session running");
    }

    pub fn stop(&mut self) {
        self.state.running = false;
        self.budget.pause();
        info!(target: "reactor", session = %self.session_id, remaining = ?self.budget.remaining(), "session stopped");
    }

    /// Back to creation-time values with a fresh session id.
    pub fn reset(&mut self) {
        let run_time = self.budget.duration();
        let give_up = self.budget.give_up_threshold();
        *self = Self::new(run_time, give_up);
        info!(target: "reactor", session = %self.session_id, "session reset");
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.session_id,
            running: self.state.running,
            action_count: self.state.action_count,
            row: self.state.row,
            plant_count: self.state.plant_count,
            samples_collected: self.state.samples_collected,
            pass: u8::from(self.state.pass),
            remaining: self.budget.remaining(),
            sightings: self.inventory.sightings().to_vec(),
        }
    }
}

/// Read-only snapshot for the operator console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub running: bool,
    pub action_count: u64,
    pub row: u32,
    pub plant_count: u32,
    pub samples_collected: u32,
    pub pass: u8,
    pub remaining: Duration,
    pub sightings: Vec<Sighting>,
}
