use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Readiness of the outbound transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No session; no connect attempt in flight.
    Disconnected,

    /// Connect attempt started; waiting for the transport to report
    /// ready or fail.
    AwaitingHandshake,

    /// Transport accepts sends.
    Ready,

    /// Session lost; a reconnect is scheduled or being counted.
    Reconnecting,

    /// Retry budget exhausted. Terminal until an operator intervenes.
    FailedPermanently,
}

/// What the caller must do after feeding an event into the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDirective {
    /// Nothing to schedule. Either the transition needs no timer or a
    /// reconnect timer is already outstanding.
    None,

    /// Start one reconnect timer with this delay, then call
    /// [`ConnectionMonitor::begin_attempt`] and connect the transport.
    Schedule(Duration),

    /// Retry budget exhausted; surface to the operator. No timer.
    Exhausted,
}

/// State machine tracking outbound readiness and owning the reconnect
/// policy.
///
/// The monitor is synchronous and transport-free: the tenant runtime
/// feeds it lifecycle events and acts on the returned directive. At
/// most one reconnect timer may be outstanding at a time; a second
/// disconnect while one is scheduled is counted but schedules nothing.
#[derive(Debug)]
pub struct ConnectionMonitor {
    state: ConnectionState,
    attempts: u32,
    max_attempts: u32,
    reconnect_delay: Duration,
    handshake_failures: u64,
    timer_outstanding: bool,
}

impl ConnectionMonitor {
    pub fn new(max_attempts: u32, reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            reconnect_delay,
            handshake_failures: 0,
            timer_outstanding: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive failed attempts since the last ready signal.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Handshake failures over the monitor's lifetime, kept separate
    /// from plain disconnects for observability.
    pub fn handshake_failures(&self) -> u64 {
        self.handshake_failures
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Mark the start of a connect attempt.
    ///
    /// Clears the outstanding-timer latch. Returns false when the
    /// machine is not in a state that allows connecting (already
    /// ready, mid-handshake, or permanently failed), in which case the
    /// caller must not touch the transport.
    pub fn begin_attempt(&mut self) -> bool {
        self.timer_outstanding = false;
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Reconnecting => {
                self.state = ConnectionState::AwaitingHandshake;
                true
            }
            _ => false,
        }
    }

    /// Transport signaled ready. Resets the retry budget.
    pub fn on_ready(&mut self) {
        self.state = ConnectionState::Ready;
        self.attempts = 0;
        self.timer_outstanding = false;
    }

    /// Transport signaled a disconnect.
    pub fn on_disconnected(&mut self) -> ReconnectDirective {
        self.count_failure()
    }

    /// Handshake attempt failed before the transport became ready.
    pub fn on_handshake_failure(&mut self) -> ReconnectDirective {
        self.handshake_failures += 1;
        self.count_failure()
    }

    /// Decline a `Schedule` directive that was just issued.
    ///
    /// Used when the disconnect reason makes automatic reconnection
    /// pointless (remote logout): the failure stays counted but the
    /// timer latch is released so a later event can schedule again.
    pub fn cancel_schedule(&mut self) {
        self.timer_outstanding = false;
    }

    /// Operator recovery from `FailedPermanently` (or a manual kick in
    /// any non-terminal state): reset the budget and reconnect now.
    pub fn force_reconnect(&mut self) -> ReconnectDirective {
        self.attempts = 0;
        self.state = ConnectionState::Reconnecting;
        self.timer_outstanding = true;
        ReconnectDirective::Schedule(Duration::ZERO)
    }

    fn count_failure(&mut self) -> ReconnectDirective {
        if self.state == ConnectionState::FailedPermanently {
            return ReconnectDirective::None;
        }

        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            self.state = ConnectionState::FailedPermanently;
            self.timer_outstanding = false;
            return ReconnectDirective::Exhausted;
        }

        self.state = ConnectionState::Reconnecting;
        if self.timer_outstanding {
            return ReconnectDirective::None;
        }
        self.timer_outstanding = true;
        ReconnectDirective::Schedule(self.reconnect_delay)
    }
}
