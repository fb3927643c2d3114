//! The collector agent and its per-tick state machine.
//!
//! Each agent executes a fixed multi-phase plan:
//!
//! 1. **Home first** (optional) -- walk to the home cell.
//! 2. **Exploring** -- serpentine sweep of the assigned zone, picking up
//!    (or reporting) everything found and delivering each pickup at once.
//! 3. **Harvest planning / harvesting** -- drain the mailbox into a set of
//!    cells, order it with [`greedy_route`], walk it, and repeat until a
//!    drain comes back empty.
//! 4. **Tidying** -- wait a settle delay, then compact the home lane until
//!    it is stable or the attempt budget runs out. Reports that arrive
//!    during the delay send the agent back to harvesting.
//! 5. **Done**.
//!
//! The plan is an explicit state machine. [`Agent::step`] is called once per
//! scheduler tick and runs until the agent reaches a yield point: waiting
//! on a reservation, one interpolation step, the end of a harvest route,
//! one settle tick, or one tidy attempt.
//!
//! A visit abandoned because its cell stayed reserved is queued in the
//! agent's own mailbox again, a bounded number of times per cell, so the
//! harvest loop comes back for it.

use std::collections::{BTreeMap, BTreeSet};

use gemfield_types::{
    AgentId, AgentPhase, AgentSnapshot, Cell, Color, Position, Report, ResourceId, Zone,
};
use gemfield_world::{GridGeometry, MailboxSender, OccupancyProbe, Picker, Registry, Resource};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::compaction::{self, Lane};
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::movement::{MoveStatus, Movement};
use crate::routing::greedy_route;

/// Upper bound on state transitions evaluated in a single tick.
///
/// Transitions that do not consume a tick (skipped out-of-bounds cells,
/// arrivals at the current cell) chain within one step; past this bound
/// the agent simply continues next tick.
const MAX_TRANSITIONS_PER_STEP: usize = 256;

/// Shared collaborators an agent needs for one step.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    /// The coordination registry.
    pub registry: &'a Registry,
    /// Grid geometry for bounds and world positions.
    pub geometry: &'a dyn GridGeometry,
    /// Occupancy check used by delivery; must report cells held by other
    /// agents.
    pub probe: &'a dyn OccupancyProbe,
    /// Simulated seconds that one tick represents.
    pub seconds_per_tick: f64,
}

/// Static description of an agent, supplied by the spawner.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSpec {
    /// Short display name.
    pub name: String,
    /// The color this agent owns.
    pub color: Color,
    /// Rectangle swept during exploration.
    pub zone: Zone,
    /// Lane origin; the lane is the column `home.x`.
    pub home: Cell,
    /// Initial world position; snapped to the nearest cell.
    pub start: Position,
    /// Whether to walk home before sweeping.
    pub go_home_first: bool,
}

/// The plan's program counter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Task {
    /// Waiting to claim the starting cell.
    Claim,
    /// Walking home before the sweep.
    GoHome,
    /// Serpentine sweep; `next` indexes `cells`.
    Sweep {
        /// Visiting order of the zone.
        cells: Vec<Cell>,
        /// Next cell to visit.
        next: usize,
    },
    /// Drain the mailbox and plan a route.
    Plan,
    /// Walking the planned route; `next` indexes `Agent::route`.
    Harvest {
        /// Next route entry to visit.
        next: usize,
    },
    /// Finished a route; yield once before re-planning.
    RouteEnd,
    /// Settle delay before tidying.
    Settle {
        /// Ticks left to wait.
        remaining: u32,
    },
    /// Bounded compaction attempts.
    Tidy {
        /// Attempts left.
        attempts_left: u32,
    },
    /// Terminal.
    Done,
}

/// A movement in flight and what to do on arrival.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Errand {
    /// Plain travel, nothing on arrival.
    Travel(Movement),
    /// Visit a cell and pick up everything there.
    Visit(Movement),
    /// Carry the held resource to a lane slot.
    Deliver(Movement),
}

/// Whether the step loop may keep going this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Keep evaluating transitions.
    Continue,
    /// This tick is used up.
    Yield,
}

/// A collector agent.
#[derive(Debug)]
pub struct Agent {
    pub(crate) id: AgentId,
    pub(crate) name: String,
    pub(crate) color: Color,
    pub(crate) zone: Zone,
    pub(crate) home: Cell,
    pub(crate) go_home_first: bool,
    pub(crate) cell: Cell,
    pub(crate) position: Position,
    pub(crate) heading: f64,
    pub(crate) phase: AgentPhase,
    pub(crate) route: Vec<Cell>,
    pub(crate) mailbox_tx: MailboxSender,
    pub(crate) mailbox_rx: UnboundedReceiver<Report>,
    pub(crate) carried: Option<Resource>,
    pub(crate) delivered: u32,
    pub(crate) config: AgentConfig,
    pub(crate) task: Task,
    pub(crate) errand: Option<Errand>,
    pub(crate) retries: BTreeMap<Cell, u32>,
}

impl Agent {
    /// Create an agent, register it as the owner of its color, and claim
    /// the cell nearest to its starting position.
    ///
    /// If the starting cell is already held, the agent keeps retrying the
    /// claim on its first steps.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if `config` does not validate,
    /// or [`AgentError::InvalidZone`] if the zone is empty or leaves the grid.
    pub fn new(
        spec: AgentSpec,
        config: AgentConfig,
        registry: &Registry,
        geometry: &dyn GridGeometry,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        let zone = spec.zone;
        if zone.is_empty()
            || !geometry.is_in_bounds(Cell::new(zone.min_x, zone.min_z))
            || !geometry.is_in_bounds(Cell::new(zone.max_x, zone.max_z))
        {
            return Err(AgentError::InvalidZone { zone });
        }

        let id = AgentId::new();
        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        registry.register_owner(spec.color, id, mailbox_tx.clone());

        let cell = geometry.nearest_cell(spec.start);
        let mut agent = Self {
            id,
            name: spec.name,
            color: spec.color,
            zone: spec.zone,
            home: spec.home,
            go_home_first: spec.go_home_first,
            cell,
            position: geometry.cell_to_position(cell),
            heading: 0.0,
            phase: AgentPhase::Exploring,
            route: Vec::new(),
            mailbox_tx,
            mailbox_rx,
            carried: None,
            delivered: 0,
            config,
            task: Task::Claim,
            errand: None,
            retries: BTreeMap::new(),
        };
        if registry.try_reserve_cell(cell, id) {
            agent.task = agent.task_after_claim(geometry);
        }
        info!(agent = %agent.name, color = %agent.color, %cell, home = %agent.home, "Agent created");
        Ok(agent)
    }

    // -------------------------------------------------------------------
    // Read-only state
    // -------------------------------------------------------------------

    /// Agent identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owned color.
    pub const fn color(&self) -> Color {
        self.color
    }

    /// Current plan phase.
    pub const fn phase(&self) -> AgentPhase {
        self.phase
    }

    /// Last successfully reserved cell.
    pub const fn cell(&self) -> Cell {
        self.cell
    }

    /// Interpolated world position.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Yaw in radians, `0` facing `+z`.
    pub const fn heading(&self) -> f64 {
        self.heading
    }

    /// Lane origin.
    pub const fn home(&self) -> Cell {
        self.home
    }

    /// Assigned sweep zone.
    pub const fn zone(&self) -> Zone {
        self.zone
    }

    /// The harvest route being walked; empty outside the harvest phase.
    pub fn route(&self) -> &[Cell] {
        if matches!(self.task, Task::Harvest { .. }) {
            &self.route
        } else {
            &[]
        }
    }

    /// The resource currently carried, if any.
    pub fn carrying(&self) -> Option<ResourceId> {
        self.carried.as_ref().map(Resource::id)
    }

    /// Number of resources delivered so far.
    pub const fn delivered_count(&self) -> u32 {
        self.delivered
    }

    /// Whether the agent has reached its terminal phase.
    pub const fn is_done(&self) -> bool {
        self.phase.is_done()
    }

    /// This agent's home lane on a board with `depth` rows.
    pub const fn lane(&self, depth: i32) -> Lane {
        Lane {
            column: self.home.x,
            length: depth,
            color: self.color,
        }
    }

    /// Plain-data view for display and debugging.
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            name: self.name.clone(),
            color: self.color,
            phase: self.phase,
            cell: self.cell,
            position: self.position,
            home: self.home,
            route: self.route().to_vec(),
            carrying: self.carrying(),
            delivered: self.delivered,
        }
    }

    // -------------------------------------------------------------------
    // Mailbox
    // -------------------------------------------------------------------

    /// Inject a report that `cell` holds a resource of this agent's color.
    pub fn enqueue_report(&self, cell: Cell, reported_by: AgentId) {
        // The receiver lives in `self`, so the send cannot fail here.
        let _ = self.mailbox_tx.send(Report { cell, reported_by });
    }

    /// Drain every queued report into a set of distinct cells.
    pub(crate) fn drain_mailbox(&mut self) -> BTreeSet<Cell> {
        let mut cells = BTreeSet::new();
        while let Ok(report) = self.mailbox_rx.try_recv() {
            cells.insert(report.cell);
        }
        cells
    }

    // -------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------

    /// Advance the agent by one scheduler tick and return its phase.
    pub fn step(&mut self, ctx: &StepContext<'_>) -> AgentPhase {
        for _ in 0..MAX_TRANSITIONS_PER_STEP {
            if self.advance(ctx) == Flow::Yield {
                break;
            }
        }
        self.phase
    }

    /// Evaluate one transition.
    fn advance(&mut self, ctx: &StepContext<'_>) -> Flow {
        if let Some(errand) = self.errand.take() {
            return self.advance_errand(errand, ctx);
        }

        match core::mem::replace(&mut self.task, Task::Done) {
            Task::Claim => {
                if ctx.registry.try_reserve_cell(self.cell, self.id) {
                    self.task = self.task_after_claim(ctx.geometry);
                    Flow::Continue
                } else {
                    self.task = Task::Claim;
                    Flow::Yield
                }
            }
            Task::GoHome => {
                self.task = self.sweep_task();
                self.errand = Some(Errand::Travel(Movement::new(
                    self.home,
                    ctx.geometry,
                    self.config.reservation_patience,
                )));
                Flow::Continue
            }
            Task::Sweep { cells, next } => {
                if let Some(&target) = cells.get(next) {
                    self.task = Task::Sweep {
                        cells,
                        next: next.saturating_add(1),
                    };
                    self.start_visit(target, ctx);
                } else {
                    self.set_phase(AgentPhase::HarvestPlanning);
                    self.task = Task::Plan;
                }
                Flow::Continue
            }
            Task::Plan => {
                self.set_phase(AgentPhase::HarvestPlanning);
                let targets = self.drain_mailbox();
                if targets.is_empty() {
                    self.route.clear();
                    self.set_phase(AgentPhase::Tidying);
                    self.task = Task::Settle {
                        remaining: self.config.tidy_settle_ticks,
                    };
                } else {
                    self.plan_route(&targets);
                }
                Flow::Continue
            }
            Task::Harvest { next } => {
                if let Some(&target) = self.route.get(next) {
                    self.task = Task::Harvest {
                        next: next.saturating_add(1),
                    };
                    self.start_visit(target, ctx);
                    Flow::Continue
                } else {
                    self.set_phase(AgentPhase::HarvestPlanning);
                    self.task = Task::RouteEnd;
                    Flow::Continue
                }
            }
            Task::RouteEnd => {
                self.task = Task::Plan;
                Flow::Yield
            }
            Task::Settle { remaining } => {
                let late = self.drain_mailbox();
                if !late.is_empty() {
                    debug!(agent = %self.name, reports = late.len(), "Reports arrived while settling");
                    self.plan_route(&late);
                    return Flow::Continue;
                }
                if remaining == 0 {
                    self.task = Task::Tidy {
                        attempts_left: self.config.tidy_max_attempts,
                    };
                    Flow::Continue
                } else {
                    self.task = Task::Settle {
                        remaining: remaining.saturating_sub(1),
                    };
                    Flow::Yield
                }
            }
            Task::Tidy { attempts_left } => {
                let lane = self.lane(ctx.geometry.depth());
                if attempts_left == 0 || compaction::is_lane_stable(ctx.registry, lane) {
                    self.set_phase(AgentPhase::Done);
                    self.task = Task::Done;
                    info!(agent = %self.name, delivered = self.delivered, "Agent done");
                    return Flow::Yield;
                }
                let _ = compaction::compact_lane(ctx.registry, lane);
                self.task = Task::Tidy {
                    attempts_left: attempts_left.saturating_sub(1),
                };
                Flow::Yield
            }
            Task::Done => Flow::Yield,
        }
    }

    /// Advance the errand in flight.
    fn advance_errand(&mut self, errand: Errand, ctx: &StepContext<'_>) -> Flow {
        match errand {
            Errand::Travel(mut movement) => match self.advance_movement(&mut movement, ctx) {
                MoveStatus::Waiting | MoveStatus::Travelling => {
                    self.errand = Some(Errand::Travel(movement));
                    Flow::Yield
                }
                MoveStatus::Arrived | MoveStatus::Aborted => Flow::Continue,
            },
            Errand::Visit(mut movement) => match self.advance_movement(&mut movement, ctx) {
                MoveStatus::Waiting | MoveStatus::Travelling => {
                    self.errand = Some(Errand::Visit(movement));
                    Flow::Yield
                }
                MoveStatus::Arrived => {
                    self.pick_up_here(ctx);
                    if self.carried.is_some() {
                        self.begin_delivery(ctx);
                    }
                    Flow::Continue
                }
                MoveStatus::Aborted => {
                    if ctx.geometry.is_in_bounds(movement.target) {
                        self.retry_later(movement.target);
                    }
                    Flow::Continue
                }
            },
            Errand::Deliver(mut movement) => match self.advance_movement(&mut movement, ctx) {
                MoveStatus::Waiting | MoveStatus::Travelling => {
                    self.errand = Some(Errand::Deliver(movement));
                    Flow::Yield
                }
                MoveStatus::Arrived => {
                    self.finish_delivery(ctx);
                    Flow::Continue
                }
                MoveStatus::Aborted => {
                    self.begin_delivery(ctx);
                    Flow::Continue
                }
            },
        }
    }

    /// Order `targets` into a harvest route and start walking it.
    fn plan_route(&mut self, targets: &BTreeSet<Cell>) {
        self.route = greedy_route(self.cell, targets);
        debug!(agent = %self.name, route = ?self.route, "Harvest route planned");
        self.set_phase(AgentPhase::Harvesting);
        self.task = Task::Harvest { next: 0 };
    }

    fn start_visit(&mut self, target: Cell, ctx: &StepContext<'_>) {
        self.errand = Some(Errand::Visit(Movement::new(
            target,
            ctx.geometry,
            self.config.reservation_patience,
        )));
    }

    /// Queue an abandoned visit target again, up to `visit_retries` times.
    fn retry_later(&mut self, cell: Cell) {
        let tries = self.retries.entry(cell).or_insert(0);
        if *tries < self.config.visit_retries {
            *tries = tries.saturating_add(1);
            debug!(agent = %self.name, %cell, attempt = *tries, "Visit queued again");
            self.enqueue_report(cell, self.id);
        } else {
            warn!(agent = %self.name, %cell, "Cell given up after repeated waits");
        }
    }

    /// First task once the starting cell is held.
    fn task_after_claim(&self, geometry: &dyn GridGeometry) -> Task {
        if self.go_home_first && self.cell != self.home && geometry.is_in_bounds(self.home) {
            Task::GoHome
        } else {
            self.sweep_task()
        }
    }

    fn sweep_task(&self) -> Task {
        Task::Sweep {
            cells: self.zone.serpentine(),
            next: 0,
        }
    }

    fn set_phase(&mut self, phase: AgentPhase) {
        if self.phase != phase {
            info!(agent = %self.name, from = ?self.phase, to = ?phase, "Phase changed");
            self.phase = phase;
        }
    }
}

impl Picker for Agent {
    fn picker_id(&self) -> AgentId {
        self.id
    }

    fn picker_color(&self) -> Color {
        self.color
    }

    fn can_carry(&self) -> bool {
        self.carried.is_none()
    }

    fn pick_up(&mut self, resource: Resource) {
        info!(agent = %self.name, resource = %resource.id(), cell = %self.cell, "Picked up resource");
        self.carried = Some(resource);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use gemfield_types::ResourceState;
    use gemfield_world::Board;

    use super::*;

    fn board(width: i32, depth: i32) -> Board {
        Board::new(width, depth, 1.0, Position::default()).unwrap()
    }

    fn spec(color: Color, zone: Zone, home: Cell, board: &Board) -> AgentSpec {
        AgentSpec {
            name: format!("{color}-agent"),
            color,
            zone,
            home,
            start: board.cell_to_position(home),
            go_home_first: true,
        }
    }

    fn quick_config() -> AgentConfig {
        AgentConfig {
            tidy_settle_ticks: 3,
            ..AgentConfig::default()
        }
    }

    fn context<'a>(registry: &'a Registry, board: &'a Board) -> StepContext<'a> {
        StepContext {
            registry,
            geometry: board,
            probe: registry,
            seconds_per_tick: 0.5,
        }
    }

    fn run_until_done(agent: &mut Agent, ctx: &StepContext<'_>) -> u32 {
        for tick in 1..=2_000 {
            if agent.step(ctx).is_done() {
                return tick;
            }
        }
        panic!("agent {} did not finish", agent.name());
    }

    #[test]
    fn new_agent_registers_owner_and_claims_start() {
        let board = board(3, 3);
        let registry = Registry::new();
        let agent = Agent::new(
            spec(Color::Red, Zone::new(0, 2, 0, 2), Cell::new(1, 1), &board),
            quick_config(),
            &registry,
            &board,
        )
        .unwrap();

        assert_eq!(registry.get_owner(Color::Red), Some(agent.id()));
        assert_eq!(registry.reservation_holder(Cell::new(1, 1)), Some(agent.id()));
        assert_eq!(agent.cell(), Cell::new(1, 1));
        assert_eq!(agent.phase(), AgentPhase::Exploring);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let board = board(3, 3);
        let registry = Registry::new();
        let config = AgentConfig {
            move_speed: -1.0,
            ..AgentConfig::default()
        };
        let result = Agent::new(
            spec(Color::Red, Zone::new(0, 2, 0, 2), Cell::new(0, 0), &board),
            config,
            &registry,
            &board,
        );
        assert!(result.is_err());
    }

    #[test]
    fn zone_outside_grid_is_rejected() {
        let board = board(3, 3);
        let registry = Registry::new();
        let result = Agent::new(
            spec(Color::Red, Zone::new(0, 3, 0, 2), Cell::new(0, 0), &board),
            quick_config(),
            &registry,
            &board,
        );
        assert!(matches!(result, Err(AgentError::InvalidZone { .. })));
    }

    #[test]
    fn contended_start_cell_is_claimed_later() {
        let board = board(3, 3);
        let registry = Registry::new();
        let blocker = AgentId::new();
        assert!(registry.try_reserve_cell(Cell::new(0, 0), blocker));

        let mut agent = Agent::new(
            spec(Color::Red, Zone::new(0, 0, 0, 0), Cell::new(0, 0), &board),
            quick_config(),
            &registry,
            &board,
        )
        .unwrap();
        let ctx = context(&registry, &board);

        let _ = agent.step(&ctx);
        assert_eq!(agent.task, Task::Claim);

        assert!(registry.release_cell(Cell::new(0, 0), blocker));
        let _ = agent.step(&ctx);
        assert_ne!(agent.task, Task::Claim);
        assert_eq!(registry.reservation_holder(Cell::new(0, 0)), Some(agent.id()));
    }

    #[test]
    fn mailbox_drain_collapses_duplicates() {
        let board = board(3, 3);
        let registry = Registry::new();
        let mut agent = Agent::new(
            spec(Color::Red, Zone::new(0, 2, 0, 2), Cell::new(0, 0), &board),
            quick_config(),
            &registry,
            &board,
        )
        .unwrap();
        let other = AgentId::new();
        agent.enqueue_report(Cell::new(2, 2), other);
        agent.enqueue_report(Cell::new(1, 0), other);
        agent.enqueue_report(Cell::new(2, 2), other);

        let drained = agent.drain_mailbox();
        assert_eq!(drained.len(), 2);
        assert!(agent.drain_mailbox().is_empty());
    }

    #[test]
    fn out_of_bounds_home_is_skipped() {
        let board = board(3, 3);
        let registry = Registry::new();
        let mut spec = spec(Color::Red, Zone::new(0, 2, 0, 2), Cell::new(9, 9), &board);
        spec.start = board.cell_to_position(Cell::new(0, 0));
        let agent = Agent::new(spec, quick_config(), &registry, &board).unwrap();

        assert!(matches!(agent.task, Task::Sweep { next: 0, .. }));
    }

    #[test]
    fn carries_one_at_a_time_and_returns_for_the_rest() {
        let board = board(3, 3);
        let registry = Registry::new();
        let pile = Cell::new(2, 2);
        registry.register_resource(Resource::new(Color::Red, pile));
        registry.register_resource(Resource::new(Color::Red, pile));

        let mut agent = Agent::new(
            spec(Color::Red, Zone::new(0, 2, 0, 2), Cell::new(0, 0), &board),
            quick_config(),
            &registry,
            &board,
        )
        .unwrap();
        let ctx = context(&registry, &board);

        for _ in 0..2_000 {
            if agent.step(&ctx).is_done() {
                break;
            }
            assert!(agent.carried.iter().count() <= 1);
        }

        assert!(agent.is_done());
        assert_eq!(agent.delivered_count(), 2);
        for row in 0..2 {
            let here = registry.resources_at(Cell::new(0, row));
            assert_eq!(here.len(), 1);
            assert_eq!(here.first().unwrap().state, ResourceState::Delivered);
        }
        assert!(registry.resources_at(pile).is_empty());
    }

    #[test]
    fn report_during_settle_resumes_harvesting() {
        let board = board(3, 3);
        let registry = Registry::new();
        let mut agent = Agent::new(
            spec(Color::Red, Zone::new(0, 0, 0, 0), Cell::new(0, 0), &board),
            AgentConfig {
                tidy_settle_ticks: 50,
                ..AgentConfig::default()
            },
            &registry,
            &board,
        )
        .unwrap();
        let ctx = context(&registry, &board);

        for _ in 0..5 {
            let _ = agent.step(&ctx);
        }
        assert_eq!(agent.phase(), AgentPhase::Tidying);

        let late = Cell::new(2, 1);
        registry.register_resource(Resource::new(Color::Red, late));
        agent.enqueue_report(late, AgentId::new());
        let _ = agent.step(&ctx);
        assert_eq!(agent.phase(), AgentPhase::Harvesting);
        assert_eq!(agent.route(), &[late]);

        let _ = run_until_done(&mut agent, &ctx);
        assert_eq!(agent.delivered_count(), 1);
        assert_eq!(
            registry.resources_at(Cell::new(0, 0)).first().unwrap().state,
            ResourceState::Delivered
        );
    }

    #[test]
    fn snapshot_reflects_agent_state() {
        let board = board(3, 3);
        let registry = Registry::new();
        let agent = Agent::new(
            spec(Color::Blue, Zone::new(0, 2, 0, 2), Cell::new(2, 0), &board),
            quick_config(),
            &registry,
            &board,
        )
        .unwrap();

        let snapshot = agent.snapshot();
        assert_eq!(snapshot.id, agent.id());
        assert_eq!(snapshot.color, Color::Blue);
        assert_eq!(snapshot.cell, Cell::new(2, 0));
        assert_eq!(snapshot.carrying, None);
        assert!(snapshot.route.is_empty());
    }

    fn patient_config(patience: u32) -> AgentConfig {
        AgentConfig {
            reservation_patience: Some(patience),
            ..quick_config()
        }
    }

    #[test]
    fn full_lane_leaves_extra_own_resources_and_finishes() {
        let board = board(2, 1);
        let registry = Registry::new();
        let pile = Cell::new(1, 0);
        registry.register_resource(Resource::new(Color::Blue, Cell::new(0, 0)));
        registry.register_resource(Resource::new(Color::Red, pile));
        registry.register_resource(Resource::new(Color::Red, pile));

        let mut agent = Agent::new(
            spec(Color::Red, Zone::new(0, 1, 0, 0), Cell::new(0, 0), &board),
            quick_config(),
            &registry,
            &board,
        )
        .unwrap();
        let ctx = context(&registry, &board);

        let _ = run_until_done(&mut agent, &ctx);

        assert_eq!(agent.delivered_count(), 0);
        assert_eq!(agent.carrying(), None);
        let left = registry.resources_at(pile);
        assert_eq!(left.len(), 2);
        assert!(left.iter().all(|r| r.state == ResourceState::Unclaimed));
    }

    #[test]
    fn delivery_skips_lane_row_held_by_finished_agent() {
        let board = board(2, 2);
        let registry = Registry::new();
        let ctx = context(&registry, &board);

        let mut parked = Agent::new(
            spec(Color::Blue, Zone::new(0, 0, 0, 0), Cell::new(0, 0), &board),
            quick_config(),
            &registry,
            &board,
        )
        .unwrap();
        let _ = run_until_done(&mut parked, &ctx);
        assert_eq!(registry.reservation_holder(Cell::new(0, 0)), Some(parked.id()));

        registry.register_resource(Resource::new(Color::Red, Cell::new(1, 1)));
        let mut red = spec(Color::Red, Zone::new(1, 1, 0, 1), Cell::new(0, 0), &board);
        red.start = board.cell_to_position(Cell::new(1, 0));
        red.go_home_first = false;
        let mut agent = Agent::new(red, quick_config(), &registry, &board).unwrap();

        let _ = run_until_done(&mut agent, &ctx);

        assert_eq!(agent.delivered_count(), 1);
        let delivered: Vec<_> = registry
            .resources()
            .into_iter()
            .filter(|r| r.color == Color::Red)
            .collect();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered.first().unwrap().state, ResourceState::Delivered);
        assert_eq!(delivered.first().unwrap().cell.x, 0);
        assert_eq!(registry.reservation_holder(Cell::new(0, 0)), Some(parked.id()));
    }

    #[test]
    fn blocked_delivery_slot_is_rescanned() {
        let board = board(2, 2);
        let registry = Registry::new();
        let ctx = context(&registry, &board);
        let mut red = spec(Color::Red, Zone::new(1, 1, 1, 1), Cell::new(0, 0), &board);
        red.start = board.cell_to_position(Cell::new(1, 1));
        red.go_home_first = false;
        let mut agent = Agent::new(red, patient_config(5), &registry, &board).unwrap();
        agent.task = Task::Plan;
        agent.carried = Some(Resource::new(Color::Red, Cell::new(1, 1)));

        agent.begin_delivery(&ctx);
        assert!(matches!(agent.errand, Some(Errand::Deliver(m)) if m.target == Cell::new(0, 0)));

        // The slot is taken after the scan; the carrier must not wait on it forever.
        let blocker = AgentId::new();
        assert!(registry.try_reserve_cell(Cell::new(0, 0), blocker));

        let _ = run_until_done(&mut agent, &ctx);

        assert_eq!(agent.delivered_count(), 1);
        assert_eq!(agent.carrying(), None);
        let lane: usize = (0..2)
            .map(|row| registry.resources_at(Cell::new(0, row)).len())
            .sum();
        assert_eq!(lane, 1);
        assert_eq!(registry.reservation_holder(Cell::new(0, 0)), Some(blocker));
    }

    #[test]
    fn abandoned_harvest_visit_is_retried() {
        let board = board(3, 3);
        let registry = Registry::new();
        let target = Cell::new(2, 2);
        registry.register_resource(Resource::new(Color::Red, target));
        let blocker = AgentId::new();
        assert!(registry.try_reserve_cell(target, blocker));

        let mut agent = Agent::new(
            spec(Color::Red, Zone::new(0, 0, 0, 0), Cell::new(0, 0), &board),
            patient_config(5),
            &registry,
            &board,
        )
        .unwrap();
        agent.enqueue_report(target, AgentId::new());
        let ctx = context(&registry, &board);

        // Long enough for at least one visit to give up on the held cell.
        for _ in 0..10 {
            let _ = agent.step(&ctx);
        }
        assert!(!agent.is_done());
        assert!(agent.retries.get(&target).copied().unwrap_or(0) >= 1);

        assert!(registry.release_cell(target, blocker));
        let _ = run_until_done(&mut agent, &ctx);

        assert_eq!(agent.delivered_count(), 1);
        assert!(registry.resources_at(target).is_empty());
    }

    #[test]
    fn permanently_held_target_is_given_up() {
        let board = board(3, 3);
        let registry = Registry::new();
        let target = Cell::new(2, 2);
        registry.register_resource(Resource::new(Color::Red, target));
        assert!(registry.try_reserve_cell(target, AgentId::new()));

        let mut agent = Agent::new(
            spec(Color::Red, Zone::new(0, 0, 0, 0), Cell::new(0, 0), &board),
            patient_config(2),
            &registry,
            &board,
        )
        .unwrap();
        agent.enqueue_report(target, AgentId::new());
        let ctx = context(&registry, &board);

        let _ = run_until_done(&mut agent, &ctx);

        assert_eq!(agent.delivered_count(), 0);
        assert_eq!(agent.retries.get(&target).copied(), Some(agent.config.visit_retries));
        assert_eq!(registry.resources_at(target).len(), 1);
    }
}
