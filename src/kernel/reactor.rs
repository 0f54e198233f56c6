use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::action::Action;
use super::event::{ConsoleCommand, Event, PendingRequest, Telemetry};
use super::state::{SessionContext, SessionView};
use super::time::Tick;
use crate::config::Config;
use crate::console;
use crate::persistence::{EventRecord, EventSink};
use crate::planner::{NavigationPlanner, Plan, PlannerConfig};
use crate::vision::{Classification, Classifier, FixedClassifier};

#[derive(Debug, Clone)]
pub struct ReactorConfig {
    pub listen_interval: Duration,
    pub display_interval: Duration,
    pub run_time: Duration,
    pub give_up_time: Duration,
    pub planner: PlannerConfig,
    pub title: String,
}

impl From<&Config> for ReactorConfig {
    fn from(config: &Config) -> Self {
        Self {
            listen_interval: config.listen_interval(),
            display_interval: config.display_interval(),
            run_time: config.run_time(),
            give_up_time: config.give_up_time(),
            planner: config.planner(),
            title: config.console_title.clone(),
        }
    }
}

/// Single owner of the session.
///
/// Two periodic tasks share one select loop: plan-and-respond and display
/// refresh. They can never interleave, so the session needs no lock.
pub struct Reactor {
    pub receiver: mpsc::Receiver<Event>,
    pub session: SessionContext,
    pub planner: NavigationPlanner,
    pub tick: Tick,
    classifier: Box<dyn Classifier + Send>,
    sink: Box<dyn EventSink>,
    cancel: CancellationToken,
    config: ReactorConfig,
}

impl Reactor {
    pub fn new(
        receiver: mpsc::Receiver<Event>,
        config: ReactorConfig,
        classifier: Box<dyn Classifier + Send>,
        sink: Box<dyn EventSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            session: SessionContext::new(config.run_time, config.give_up_time),
            planner: NavigationPlanner::new(config.planner),
            tick: Tick::new(),
            classifier,
            sink,
            cancel,
            config,
        }
    }

    /// One plan tick: console commands first, then requests in arrival order.
    /// Returns the actions emitted, in order.
    pub async fn tick_step(&mut self, events: Vec<Event>) -> Vec<Action> {
        self.tick = self.tick.next();
        let mut emitted = Vec::new();

        for event in events {
            match event {
                Event::Console(cmd) => self.apply_command(cmd),
                Event::Request(PendingRequest { telemetry, reply }) => {
                    let action = self.handle_request(&telemetry).await;
                    if reply.send(action).is_err() {
                        warn!(target: "reactor", %action, "robot went away before the response");
                    }
                    emitted.push(action);
                }
            }
        }
        emitted
    }

    /// Plans one step, applies its deltas and archives the pair.
    pub async fn handle_request(&mut self, telemetry: &Telemetry) -> Action {
        let plan = self.plan_off_thread(telemetry).await;
        for delta in plan.deltas {
            self.session.reduce(delta);
        }

        let state = &self.session.state;
        info!(
            target: "planner",
            session = %self.session.session_id,
            step = state.action_count,
            last = ?telemetry.last_action,
            action = %plan.action,
            row = state.row,
            plants = state.plant_count,
            samples = state.samples_collected,
            "planned"
        );

        let record = EventRecord::new(self.session.session_id, state.action_count, telemetry, plan.action);
        if let Err(e) = self.sink.store(&record) {
            warn!(target: "store", "failed to store event: {}", e);
        }
        plan.action
    }

    /// Runs the planner, and with it any image work, on the blocking pool.
    /// The reactor awaits the result, so steps still apply one at a time.
    async fn plan_off_thread(&mut self, telemetry: &Telemetry) -> Plan {
        let planner = self.planner.clone();
        let session = self.session.clone();
        let request = telemetry.clone();
        let mut classifier = std::mem::replace(
            &mut self.classifier,
            Box::new(FixedClassifier(Classification::Unknown)),
        );

        let job = tokio::task::spawn_blocking(move || {
            let plan = planner.plan(&request, &session, classifier.as_mut());
            (plan, classifier)
        });
        match job.await {
            Ok((plan, classifier)) => {
                self.classifier = classifier;
                plan
            }
            Err(e) => {
                // The classifier went down with the task; frames classify as unknown from here on.
                error!(target: "vision", "classifier task failed: {}", e);
                self.planner
                    .plan(telemetry, &self.session, self.classifier.as_mut())
            }
        }
    }

    pub fn apply_command(&mut self, cmd: ConsoleCommand) {
        debug!(target: "console", ?cmd, "command");
        match cmd {
            ConsoleCommand::Run => self.session.run(),
            ConsoleCommand::Stop => self.session.stop(),
            ConsoleCommand::Reset => self.session.reset(),
            ConsoleCommand::Status => {
                info!(target: "console", "{}", console::format_view(&self.config.title, &self.session.view()));
            }
            ConsoleCommand::Close => {
                self.session.stop();
                self.cancel.cancel();
            }
            ConsoleCommand::Shutdown => self.cancel.cancel(),
        }
    }

    pub fn display_step(&self) -> SessionView {
        let view = self.session.view();
        info!(target: "console", "{}", console::format_view(&self.config.title, &view));
        view
    }

    /// Async Driver Loop
    pub async fn run(&mut self) {
        info!(target: "reactor", listen = ?self.config.listen_interval, display = ?self.config.display_interval, "reactor started");

        let mut listen = interval(self.config.listen_interval);
        listen.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut display = interval(self.config.display_interval);
        display.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = listen.tick() => {
                    let mut events = Vec::new();
                    while let Ok(event) = self.receiver.try_recv() {
                        events.push(event);
                    }
                    self.tick_step(events).await;
                }
                _ = display.tick() => {
                    self.display_step();
                }
            }
        }
        info!(target: "reactor", ticks = self.tick.frame, "reactor stopped");
    }
}
