//! The room's turn and reset countdown.
//!
//! A room has at most one pending countdown. The actor owns it, replaces it
//! whenever the session moves to a new turn or phase, and drops it with
//! itself when the room closes.

use std::time::Duration;
use tokio::time::Instant;

use super::config::MAX_COUNTDOWN_SECS;

/// Longest a single countdown can run.
pub const MAX_COUNTDOWN: Duration = Duration::from_secs(MAX_COUNTDOWN_SECS);

/// What happens when a countdown runs out.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CountdownKind {
    /// Force-fold the player whose turn carries this sequence number.
    Turn(u64),
    /// Reset the room for the next hand.
    Reset,
}

#[derive(Clone, Copy, Debug)]
pub struct Countdown {
    kind: CountdownKind,
    deadline: Instant,
}

impl Countdown {
    pub fn turn(turn: u64, timeout: Duration) -> Self {
        Self {
            kind: CountdownKind::Turn(turn),
            deadline: deadline_after(timeout),
        }
    }

    pub fn reset(delay: Duration) -> Self {
        Self {
            kind: CountdownKind::Reset,
            deadline: deadline_after(delay),
        }
    }

    pub fn kind(&self) -> CountdownKind {
        self.kind
    }
}

/// Deadlines never reach further out than [`MAX_COUNTDOWN`].
fn deadline_after(delay: Duration) -> Instant {
    Instant::now() + delay.min(MAX_COUNTDOWN)
}

/// Sleep until the countdown's deadline, or forever without one.
pub async fn wait(countdown: Option<Countdown>) {
    match countdown {
        Some(countdown) => tokio::time::sleep_until(countdown.deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_turn_countdown_expires() {
        let start = Instant::now();
        let countdown = Countdown::turn(4, Duration::from_secs(20));
        assert_eq!(countdown.kind(), CountdownKind::Turn(4));

        wait(Some(countdown)).await;
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_delay_is_capped() {
        let countdown = Countdown::reset(Duration::MAX);
        assert_eq!(countdown.kind(), CountdownKind::Reset);

        let start = Instant::now();
        wait(Some(countdown)).await;
        assert_eq!(start.elapsed(), MAX_COUNTDOWN);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_at_deadline() {
        let start = Instant::now();
        wait(Some(Countdown::reset(Duration::from_secs(3)))).await;
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_without_countdown_never_returns() {
        let result = tokio::time::timeout(Duration::from_secs(60), wait(None)).await;
        assert!(result.is_err());
    }
}
