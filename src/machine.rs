// Spin state machine.
//
//   Idle -> FastSpinning -> AwaitingStop -> Decelerating -> Settled -> Idle
//
// The machine owns phase, cumulative rotation, the committed landing, and a
// session generation. Timers and rendering go through the TimingDriver, and every
// scheduled callback is tagged with the session that issued it. Starting and
// resetting bump the session, so a callback from an older session is dropped
// when it arrives instead of mutating the new one.

use crate::driver::{CancelToken, TimerQueue, TimingDriver};
use crate::error::WheelError;
use crate::history::{HistoryEntry, SpinHistory};
use crate::resolver::verify_landing;
use crate::rng::RandomSource;
use crate::rotation::{compute_target_rotation, LandingParams, LandingPlan};
use crate::selector::select_winner;
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reveal {
    highlighted: bool,
    done: bool,
}

/// Drives one wheel through its spin sessions.
pub struct SpinMachine<D: TimingDriver> {
    config: WheelConfig,
    driver: D,
    rng: Box<dyn RandomSource>,
    session: SessionId,
    phase: SpinPhase,
    cumulative_rotation: Degrees,
    /// Face snapshot taken at spin start; read-only for the session.
    face: Option<WheelFace>,
    landing: Option<(CategoryId, LandingPlan)>,
    winner: Option<Category>,
    spin_started_at: Option<Timestamp>,
    reveal: Option<Reveal>,
    timers: Vec<(TimerKind, CancelToken)>,
    events: Vec<WheelEvent>,
    history: SpinHistory,
}

impl<D: TimingDriver> SpinMachine<D> {
    pub fn new(config: WheelConfig, driver: D, rng: Box<dyn RandomSource>) -> Result<Self, WheelError> {
        config.validate()?;
        let history = SpinHistory::new(config.history_limit);
        Ok(SpinMachine {
            config,
            driver,
            rng,
            session: SessionId::default(),
            phase: SpinPhase::Idle,
            cumulative_rotation: Degrees::ZERO,
            face: None,
            landing: None,
            winner: None,
            spin_started_at: None,
            reveal: None,
            timers: Vec::new(),
            events: Vec::new(),
            history,
        })
    }

    /// Begin fast-spinning `face`. A no-op unless idle; an invalid face is
    /// rejected and the machine stays idle.
    pub fn start_spin(&mut self, face: &WheelFace) -> Result<(), WheelError> {
        if self.phase != SpinPhase::Idle {
            log::debug!("start ignored: session {} is {:?}", self.session, self.phase);
            return Ok(());
        }
        face.validate(self.config.max_categories)?;

        self.cancel_timers();
        self.session = self.session.next();
        self.face = Some(face.clone());
        self.landing = None;
        self.winner = None;
        self.reveal = None;
        self.spin_started_at = Some(self.driver.now());
        log::info!(
            "session {}: spinning face {} ({} categories)",
            self.session,
            face.id,
            face.len()
        );

        self.set_phase(SpinPhase::FastSpinning);
        self.schedule(TimerKind::MinimumDuration, self.config.min_spin_ms);
        self.fast_spin_tick();
        Ok(())
    }

    /// Commit to a landing. Only honoured once the minimum spin time has passed.
    pub fn request_stop(&mut self) {
        if !self.phase.accepts_stop() {
            log::debug!("stop ignored: session {} is {:?}", self.session, self.phase);
            return;
        }
        self.commit_landing();
    }

    /// Return to idle from any state, cancelling every pending callback.
    /// Keeps the cumulative rotation; see `reset_rotation`.
    pub fn reset_wheel(&mut self) {
        self.cancel_timers();
        self.session = self.session.next();
        self.face = None;
        self.landing = None;
        self.winner = None;
        self.spin_started_at = None;
        self.reveal = None;
        self.set_phase(SpinPhase::Idle);
    }

    /// `reset_wheel` plus snapping the wheel back to 0°.
    pub fn reset_rotation(&mut self) {
        self.reset_wheel();
        self.cumulative_rotation = Degrees::ZERO;
        self.driver.animate_rotation(&RotationAnimation {
            angle: Degrees::ZERO,
            duration_ms: self.config.snap_back_ms,
            easing: EasingType::EaseOut,
            on_complete: None,
        });
    }

    /// Single-key interaction: start when idle, stop when a stop is accepted,
    /// close out a revealed result. Anything else is ignored.
    pub fn activate(&mut self, face: &WheelFace) -> Result<(), WheelError> {
        match self.phase {
            SpinPhase::Idle => self.start_spin(face),
            SpinPhase::AwaitingStop => {
                self.request_stop();
                Ok(())
            }
            SpinPhase::Settled if self.is_revealed() => {
                self.reset_wheel();
                Ok(())
            }
            phase => {
                log::debug!("activate ignored in {:?}", phase);
                Ok(())
            }
        }
    }

    /// Callback entry for every scheduled ticket, including the deceleration
    /// animation's completion. Tickets from another session are dropped.
    pub fn handle_timer(&mut self, ticket: TimerTicket) {
        if ticket.session != self.session {
            log::trace!(
                "dropping {:?} from stale session {} (current {})",
                ticket.kind,
                ticket.session,
                self.session
            );
            return;
        }
        self.timers.retain(|(kind, _)| *kind != ticket.kind);

        match (ticket.kind, self.phase) {
            (TimerKind::FastSpinTick, phase) if phase.is_spinning() => self.fast_spin_tick(),
            (TimerKind::MinimumDuration, SpinPhase::FastSpinning) => self.permit_stop(),
            (TimerKind::AutoStop, SpinPhase::AwaitingStop) => {
                log::info!("session {}: auto-stop", self.session);
                self.commit_landing();
            }
            (TimerKind::DecelerationComplete, SpinPhase::Decelerating) => self.settle(),
            (TimerKind::RevealBlink, SpinPhase::Settled) => self.reveal_blink(),
            (TimerKind::RevealComplete, SpinPhase::Settled) => self.finish_reveal(),
            (kind, phase) => log::debug!("ignoring {:?} in {:?}", kind, phase),
        }
    }

    fn fast_spin_tick(&mut self) {
        self.cumulative_rotation = self.cumulative_rotation + self.config.tick_increment_deg;
        self.driver.animate_rotation(&RotationAnimation {
            angle: self.cumulative_rotation,
            duration_ms: self.config.tick_interval_ms,
            easing: EasingType::Linear,
            on_complete: None,
        });
        self.schedule(TimerKind::FastSpinTick, self.config.tick_interval_ms);
    }

    fn permit_stop(&mut self) {
        self.set_phase(SpinPhase::AwaitingStop);
        if let Some(delay) = self.config.auto_stop_delay_ms {
            self.schedule(TimerKind::AutoStop, delay);
        }
    }

    fn commit_landing(&mut self) {
        if let Err(err) = self.try_commit_landing() {
            log::error!("session {}: cannot commit landing: {}", self.session, err);
            self.reset_wheel();
        }
    }

    /// Selection and rotation in one step; nothing can interleave between them.
    fn try_commit_landing(&mut self) -> Result<(), WheelError> {
        let face = self
            .face
            .as_ref()
            .ok_or_else(|| WheelError::InvalidState("no face snapshot for the active session".to_string()))?;
        let (_, target) = select_winner(&face.categories, self.rng.as_mut())
            .ok_or_else(|| WheelError::InvalidState("face snapshot has no categories".to_string()))?;
        let target_id = target.id;
        let plan = compute_target_rotation(
            self.cumulative_rotation,
            &face.categories,
            target_id,
            &LandingParams::from(&self.config),
            self.rng.as_mut(),
        )?;

        self.cancel_kind(TimerKind::FastSpinTick);
        self.cancel_kind(TimerKind::MinimumDuration);
        self.cancel_kind(TimerKind::AutoStop);

        self.cumulative_rotation = plan.final_angle;
        self.landing = Some((target_id, plan));
        log::info!(
            "session {}: landing on {} at {} ({} extra turns)",
            self.session,
            target_id,
            plan.final_angle,
            plan.extra_turns
        );

        self.set_phase(SpinPhase::Decelerating);
        let token = self.driver.animate_rotation(&RotationAnimation {
            angle: plan.final_angle,
            duration_ms: self.config.deceleration_ms,
            easing: EasingType::Deceleration,
            on_complete: Some(TimerTicket::new(self.session, TimerKind::DecelerationComplete)),
        });
        self.timers.push((TimerKind::DecelerationComplete, token));
        Ok(())
    }

    fn settle(&mut self) {
        let (Some(face), Some((expected, plan))) = (self.face.as_ref(), self.landing) else {
            log::error!("session {}: deceleration ended without a landing", self.session);
            self.reset_wheel();
            return;
        };

        let verdict = verify_landing(self.session, plan.final_angle, &face.categories, expected)
            .map(|category| (category.clone(), face.id.clone()));

        match verdict {
            Ok((category, face_id)) => self.complete(category, face_id, plan.final_angle),
            Err(err) => {
                log::error!("{}", err);
                if let WheelError::InvariantViolation {
                    session,
                    expected,
                    resolved,
                    angle,
                } = err
                {
                    self.events.push(WheelEvent::InvariantViolation {
                        session,
                        expected,
                        resolved,
                        angle,
                    });
                }
                self.reset_wheel();
            }
        }
    }

    fn complete(&mut self, category: Category, face_id: String, final_angle: Degrees) {
        log::info!(
            "session {}: winner {} ({})",
            self.session,
            category.name,
            category.id
        );
        self.winner = Some(category.clone());
        self.set_phase(SpinPhase::Settled);
        self.events.push(WheelEvent::SpinComplete {
            session: self.session,
            category: category.clone(),
            final_angle,
        });
        self.history.record(HistoryEntry {
            session: self.session,
            face_id,
            category: category.clone(),
            final_angle,
            at: self.driver.now(),
        });

        self.reveal = Some(Reveal {
            highlighted: true,
            done: false,
        });
        self.events.push(WheelEvent::RevealBlink {
            session: self.session,
            category_id: category.id,
            highlighted: true,
        });
        self.schedule(TimerKind::RevealBlink, self.config.reveal_blink_ms);
        self.schedule(TimerKind::RevealComplete, self.config.reveal_ms);
    }

    fn reveal_blink(&mut self) {
        let Some(reveal) = self.reveal.as_mut() else {
            return;
        };
        if reveal.done {
            return;
        }
        reveal.highlighted = !reveal.highlighted;
        let highlighted = reveal.highlighted;

        if let Some(winner) = &self.winner {
            self.events.push(WheelEvent::RevealBlink {
                session: self.session,
                category_id: winner.id,
                highlighted,
            });
        }
        self.schedule(TimerKind::RevealBlink, self.config.reveal_blink_ms);
    }

    fn finish_reveal(&mut self) {
        self.cancel_kind(TimerKind::RevealBlink);
        if let Some(reveal) = self.reveal.as_mut() {
            reveal.highlighted = false;
            reveal.done = true;
        }
        if let Some(winner) = self.winner.clone() {
            self.events.push(WheelEvent::WinnerRevealed {
                session: self.session,
                category: winner,
            });
        }
    }

    fn set_phase(&mut self, phase: SpinPhase) {
        if self.phase == phase {
            return;
        }
        log::debug!("session {}: {:?} -> {:?}", self.session, self.phase, phase);
        self.phase = phase;
        self.events.push(WheelEvent::PhaseChanged {
            session: self.session,
            phase,
        });
    }

    fn schedule(&mut self, kind: TimerKind, delay_ms: u64) {
        self.cancel_kind(kind);
        let token = self
            .driver
            .schedule(TimerTicket::new(self.session, kind), delay_ms);
        self.timers.push((kind, token));
    }

    fn cancel_kind(&mut self, kind: TimerKind) {
        let driver = &mut self.driver;
        self.timers.retain(|(k, token)| {
            if *k == kind {
                driver.cancel(*token);
                false
            } else {
                true
            }
        });
    }

    fn cancel_timers(&mut self) {
        for (_, token) in self.timers.drain(..) {
            self.driver.cancel(token);
        }
    }

    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn cumulative_rotation(&self) -> Degrees {
        self.cumulative_rotation
    }

    pub fn target_category_id(&self) -> Option<CategoryId> {
        self.landing.map(|(id, _)| id)
    }

    pub fn landing(&self) -> Option<LandingPlan> {
        self.landing.map(|(_, plan)| plan)
    }

    pub fn winner(&self) -> Option<&Category> {
        self.winner.as_ref()
    }

    pub fn spin_started_at(&self) -> Option<Timestamp> {
        self.spin_started_at
    }

    pub fn can_stop(&self) -> bool {
        self.phase.accepts_stop()
    }

    pub fn is_revealed(&self) -> bool {
        self.reveal.map_or(false, |r| r.done)
    }

    /// Winner slice while its highlight is on.
    pub fn highlighted(&self) -> Option<CategoryId> {
        match (self.reveal, &self.winner) {
            (Some(reveal), Some(winner)) if reveal.highlighted => Some(winner.id),
            _ => None,
        }
    }

    pub fn face(&self) -> Option<&WheelFace> {
        self.face.as_ref()
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn history(&self) -> &SpinHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut SpinHistory {
        &mut self.history
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Drain queued UI notifications.
    pub fn take_events(&mut self) -> Vec<WheelEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> SpinSnapshot {
        SpinSnapshot {
            session: self.session,
            phase: self.phase,
            cumulative_rotation: self.cumulative_rotation,
            target_category_id: self.target_category_id(),
            winner: self.winner.clone(),
            spin_started_at: self.spin_started_at,
            can_stop: self.can_stop(),
            highlighted: self.highlighted(),
            revealed: self.is_revealed(),
        }
    }
}

impl SpinMachine<TimerQueue> {
    /// Fire every ticket due up to `now`, in order, then move the clock to `now`.
    ///
    /// Fast-spin ticks that fell behind (a backgrounded tab, a stalled frame loop)
    /// are coalesced: the missed turns are added in one step and a single redraw is
    /// queued, never one per missed tick.
    pub fn advance_to(&mut self, now: Timestamp) {
        while let Some(ticket) = self.driver.pop_due(now) {
            if ticket.kind == TimerKind::FastSpinTick
                && ticket.session == self.session
                && self.phase.is_spinning()
            {
                self.skip_missed_ticks(now);
            }
            self.handle_timer(ticket);
        }
        self.driver.set_now(now);
    }

    /// Jump the clock over whole tick intervals that are already overdue, stopping
    /// at `until` or the next other pending timer so nothing fires out of order.
    fn skip_missed_ticks(&mut self, until: Timestamp) {
        let horizon = self
            .driver
            .next_due()
            .map_or(until, |due| due.min(until));
        let interval = self.config.tick_interval_ms;
        let missed = horizon.millis_since(self.driver.now()) / interval;
        if missed == 0 {
            return;
        }

        self.cumulative_rotation =
            self.cumulative_rotation + missed as f64 * self.config.tick_increment_deg;
        let caught_up = self.driver.now().after(missed * interval);
        self.driver.set_now(caught_up);
        log::debug!(
            "session {}: coalesced {} late fast-spin ticks",
            self.session,
            missed
        );
    }

    pub fn advance_by(&mut self, ms: u64) {
        let now = self.driver.now().after(ms);
        self.advance_to(now);
    }
}
