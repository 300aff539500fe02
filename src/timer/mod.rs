//! Contains the session timer: an Idle/Running state machine whose transitions are durable in
//! the session store and announced on a broadcast outbox for the reminder side to react to.

pub mod controller;

pub use controller::{ReconcileOutcome, SessionTimerController, TimerState};

/// Announced whenever the controller changes state. Listeners that miss events can always
/// resynchronize from the next one, so sends are fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new session started; zero seconds on the clock.
    Started,
    /// The running session was completed with this final duration.
    Stopped { elapsed: i64 },
    /// Reconciliation found a session this process was not tracking, with this much time
    /// already elapsed.
    Resumed { elapsed: i64 },
    /// Reconciliation found the session this process was tracking gone from the store.
    Idle,
}
