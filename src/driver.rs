// Timing driver seam. The machine never owns real timers or touches rendering: it
// asks the driver to schedule tickets and to rotate the wheel element, and the host
// hands tickets back through `SpinMachine::handle_timer` when they fire.

use serde::{Deserialize, Serialize};

use crate::types::{RotationAnimation, TimerTicket, Timestamp};

/// Handle for cancelling a scheduled ticket or animation callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CancelToken(u64);

impl CancelToken {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Timers and rendering, provided by the host.
pub trait TimingDriver {
    /// Current host time.
    fn now(&self) -> Timestamp;

    /// Hand `ticket` back after `delay_ms`.
    fn schedule(&mut self, ticket: TimerTicket, delay_ms: u64) -> CancelToken;

    /// Rotate the wheel to `animation.angle`. When `on_complete` is set the
    /// driver hands that ticket back once `duration_ms` has elapsed.
    fn animate_rotation(&mut self, animation: &RotationAnimation) -> CancelToken;

    /// Drop a pending callback. Unknown or already-fired tokens are ignored.
    fn cancel(&mut self, token: CancelToken);
}

#[derive(Debug, Clone)]
struct PendingTimer {
    token: CancelToken,
    due: Timestamp,
    ticket: TimerTicket,
}

/// Virtual timer queue driven by the host clock.
///
/// The host calls `SpinMachine::advance_to(now)` from its frame loop; due tickets
/// fire in `(due, scheduling order)` order, and a handler may schedule follow-up
/// timers that fire within the same advance. Rotation requests are queued for the
/// renderer and drained with `take_animations`.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    now: Timestamp,
    next_token: u64,
    pending: Vec<PendingTimer>,
    animations: Vec<RotationAnimation>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: Timestamp) -> Self {
        TimerQueue {
            now,
            ..Self::default()
        }
    }

    /// Move the clock forward. Earlier readings are ignored.
    pub fn set_now(&mut self, now: Timestamp) {
        if now > self.now {
            self.now = now;
        }
    }

    /// Remove and return the earliest ticket due at or before `until`, moving
    /// the clock to its due time.
    pub fn pop_due(&mut self, until: Timestamp) -> Option<TimerTicket> {
        let (index, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= until)
            .min_by_key(|(_, p)| (p.due, p.token.as_u64()))?;

        let timer = self.pending.remove(index);
        self.set_now(timer.due);
        Some(timer.ticket)
    }

    /// Due time of the earliest pending ticket.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Pending tickets in firing order.
    pub fn pending_tickets(&self) -> Vec<TimerTicket> {
        let mut pending: Vec<&PendingTimer> = self.pending.iter().collect();
        pending.sort_by_key(|p| (p.due, p.token.as_u64()));
        pending.into_iter().map(|p| p.ticket).collect()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Rotation requests not yet handed to the renderer.
    pub fn animations(&self) -> &[RotationAnimation] {
        &self.animations
    }

    pub fn take_animations(&mut self) -> Vec<RotationAnimation> {
        std::mem::take(&mut self.animations)
    }

    fn issue_token(&mut self) -> CancelToken {
        self.next_token += 1;
        CancelToken(self.next_token)
    }
}

impl TimingDriver for TimerQueue {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn schedule(&mut self, ticket: TimerTicket, delay_ms: u64) -> CancelToken {
        let token = self.issue_token();
        self.pending.push(PendingTimer {
            token,
            due: self.now.after(delay_ms),
            ticket,
        });
        token
    }

    fn animate_rotation(&mut self, animation: &RotationAnimation) -> CancelToken {
        self.animations.push(animation.clone());
        match animation.on_complete {
            Some(ticket) => self.schedule(ticket, animation.duration_ms),
            None => self.issue_token(),
        }
    }

    fn cancel(&mut self, token: CancelToken) {
        self.pending.retain(|p| p.token != token);
    }
}
