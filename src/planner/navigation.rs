use tracing::{debug, info, warn};

use crate::kernel::action::Action;
use crate::kernel::event::{EndSignal, Pass, Telemetry};
use crate::kernel::inventory::Sighting;
use crate::kernel::state::{SessionContext, SessionDelta};
use crate::vision::{Classification, Classifier};

/// Field geometry the planner needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    pub num_rows: u32,
    pub num_plants: u32,
    /// Highest slot index in a row; the return pass mirrors against it.
    pub slots_per_row: u32,
}

/// Output of one planning step. `deltas` are applied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub action: Action,
    pub deltas: Vec<SessionDelta>,
    pub classification: Option<Classification>,
}

impl Plan {
    fn new(action: Action, deltas: Vec<SessionDelta>) -> Self {
        Self {
            action,
            deltas,
            classification: None,
        }
    }
}

/// The navigation state machine.
///
/// Reads the session, never writes it. The only impurity is whatever the
/// classifier does with a frame.
#[derive(Debug, Clone)]
pub struct NavigationPlanner {
    config: PlannerConfig,
}

impl NavigationPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Pure Projection: (Telemetry, Session) -> (Action, Deltas)
    /// Rules are evaluated in order; the first match wins.
    pub fn plan(
        &self,
        telemetry: &Telemetry,
        session: &SessionContext,
        classifier: &mut dyn Classifier,
    ) -> Plan {
        let mut deltas = vec![
            SessionDelta::StepCounted,
            SessionDelta::PassObserved(telemetry.pass),
        ];
        let last = telemetry.last_action;

        // 1. Not running: settle the robot before the next run.
        if !session.state.running {
            let action = if last == Some(Action::Clear) {
                Action::Wait
            } else {
                Action::Clear
            };
            return Plan::new(action, deltas);
        }

        // 2. Out of time, whatever the progress.
        if session.budget.should_give_up() {
            info!(target: "planner", session = %session.session_id, remaining = ?session.budget.remaining(), "give-up time reached");
            return Plan::new(Action::Finish, deltas);
        }

        // 3. Traversal
        if !self.traversal_complete(session) {
            if session.state.row == 0 {
                deltas.push(SessionDelta::RowEntered(1));
                return Plan::new(Action::Begin, deltas);
            }

            let action = match last {
                Some(Action::Begin) => Action::Align,
                Some(Action::Align) => Action::Seek,
                Some(Action::Seek) => {
                    return self.after_seek(telemetry, session, classifier, deltas);
                }
                Some(Action::Turn) => Action::Align,
                Some(Action::Grab) => Action::Seek,
                Some(Action::Jump) => Action::Align,
                _ => Action::Wait,
            };
            return Plan::new(action, deltas);
        }

        // 4. Traversal complete
        let action = match (last, telemetry.at_end, telemetry.pass) {
            (Some(Action::Seek), EndSignal::NearEnd, Pass::Return) => Action::Finish,
            // Blind terminal seek back along the return pass.
            (Some(Action::Seek), _, Pass::Return) => Action::End,
            _ => Action::Finish,
        };
        Plan::new(action, deltas)
    }

    fn traversal_complete(&self, session: &SessionContext) -> bool {
        !(session.state.row < self.config.num_rows || session.state.plant_count < self.config.num_plants)
    }

    fn after_seek(
        &self,
        telemetry: &Telemetry,
        session: &SessionContext,
        classifier: &mut dyn Classifier,
        mut deltas: Vec<SessionDelta>,
    ) -> Plan {
        // Far end first: it wins if both flags could be raised.
        match telemetry.at_end {
            EndSignal::FarEnd => {
                deltas.push(SessionDelta::RowAdvanced);
                return Plan::new(Action::Turn, deltas);
            }
            EndSignal::NearEnd => {
                deltas.push(SessionDelta::RowAdvanced);
                return Plan::new(Action::Jump, deltas);
            }
            EndSignal::MidRow => {}
        }

        if telemetry.at_plant == 0 {
            return Plan::new(Action::Seek, deltas);
        }

        let classification = match &telemetry.image {
            Some(frame) => classifier.classify(frame),
            None => {
                warn!(target: "planner", "at plant but no image in telemetry");
                Classification::Unknown
            }
        };

        let phenotype = match classification {
            Classification::Plant(p) => p,
            Classification::Unknown => {
                warn!(target: "planner", session = %session.session_id, at_plant = telemetry.at_plant, "unclassified plant, seeking on");
                return Plan {
                    action: Action::Seek,
                    deltas,
                    classification: Some(classification),
                };
            }
        };

        let row = session.state.row;
        let slot = self.logical_slot(telemetry.at_plant, telemetry.pass);
        let sighting = Sighting::new(row, slot, phenotype);
        if !session.inventory.has_sighting(&sighting) {
            debug!(target: "planner", row, slot, %phenotype, "new sighting");
        }
        deltas.push(SessionDelta::SightingRecorded(sighting));

        let action = if session.inventory.is_new_phenotype(phenotype) {
            info!(target: "planner", session = %session.session_id, row, slot, %phenotype, "grabbing new phenotype");
            deltas.push(SessionDelta::SampleCollected(phenotype));
            Action::Grab
        } else {
            Action::Seek
        };

        Plan {
            action,
            deltas,
            classification: Some(classification),
        }
    }

    /// Slot as seen on the outbound pass.
    pub fn logical_slot(&self, at_plant: u32, pass: Pass) -> u32 {
        match pass {
            Pass::Outbound => at_plant,
            Pass::Return => {
                if at_plant > self.config.slots_per_row {
                    warn!(target: "planner", at_plant, slots = self.config.slots_per_row, "slot beyond row length");
                }
                (self.config.slots_per_row + 1).saturating_sub(at_plant)
            }
        }
    }
}
