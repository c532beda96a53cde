//! Readiness polling.

use std::time::Duration;

use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::Error;
use crate::traits::Session;
use crate::Result;

/// Default delay between two readiness probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// How to wait for an instance to come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between a failed probe and the next one.
    pub interval: Duration,

    /// Give up after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Probe `session` until a health check succeeds.
///
/// The first probe runs immediately, each failed one is followed by a pause
/// of `config.interval`. Probe failures only mean "not ready yet". Returns the
/// number of probes made.
///
/// With a timeout, neither a pause nor a slow probe runs past the deadline.
///
/// # Errors
///
/// [`Error::Cancelled`] when `cancel` fires, [`Error::ReadyTimeout`] once a
/// configured timeout has elapsed.
#[instrument(skip(session, cancel), fields(role = %session.role(), url = %session.url()))]
pub async fn await_ready<S>(
    session: &S,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<u32>
where
    S: Session + ?Sized,
{
    let started = Instant::now();
    let deadline = config.timeout.map(|timeout| started + timeout);
    let mut probes: u32 = 0;

    loop {
        probes += 1;

        let probe = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            probe = session.health_check() => probe,
            _ = until(deadline) => Err(Error::Unreachable {
                message: "no answer before the deadline".to_string(),
            }),
        };

        match probe {
            Ok(()) => {
                info!(probes, "Instance is ready");
                return Ok(probes);
            }
            Err(e) => debug!(probe = probes, error = %e, "Instance not ready yet"),
        }

        let pause = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(Error::ReadyTimeout {
                        waited_ms: started.elapsed().as_millis() as u64,
                        probes,
                    });
                }
                config.interval.min(remaining)
            }
            None => config.interval,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = sleep(pause) => {}
        }
    }
}

/// Resolves at `deadline`, never without one.
async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeSession;
    use crate::types::Role;

    fn config(interval_ms: u64) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(interval_ms),
            timeout: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ready_immediately_takes_one_probe() {
        let session = FakeSession::new(Role::Target);

        let probes = await_ready(&session, &config(1500), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(probes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn n_failures_take_n_plus_one_probes_at_interval() {
        let session = FakeSession::new(Role::Target);
        session.fail_health_checks(3);

        let probes = await_ready(&session, &config(1500), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(probes, 4);
        let times = session.probe_times();
        assert_eq!(times.len(), 4);
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_millis(1500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_waiting() {
        let session = FakeSession::new(Role::Target);
        session.fail_health_checks(u32::MAX);
        let cancel = CancellationToken::new();

        let waiter = {
            let session = session.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { await_ready(&session, &config(1500), &cancel).await })
        };

        sleep(Duration::from_millis(4000)).await;
        cancel.cancel();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));

        let probes_at_cancel = session.probe_times().len();
        assert_eq!(probes_at_cancel, 3);
        sleep(Duration::from_secs(10)).await;
        assert_eq!(session.probe_times().len(), probes_at_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_gives_up() {
        let session = FakeSession::new(Role::Target);
        session.fail_health_checks(u32::MAX);
        let config = PollConfig {
            interval: Duration::from_secs(1),
            timeout: Some(Duration::from_secs(5)),
        };

        let err = await_ready(&session, &config, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::ReadyTimeout { probes, .. } => assert_eq!(probes, 6),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn last_pause_is_cut_to_the_deadline() {
        let session = FakeSession::new(Role::Target);
        session.fail_health_checks(u32::MAX);
        let config = PollConfig {
            interval: Duration::from_secs(2),
            timeout: Some(Duration::from_secs(3)),
        };
        let started = Instant::now();

        let err = await_ready(&session, &config, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::ReadyTimeout { waited_ms, probes } => {
                assert_eq!(probes, 3);
                assert_eq!(waited_ms, 3000);
            }
            other => panic!("unexpected error: {other}"),
        }
        let offsets: Vec<_> = session
            .probe_times()
            .iter()
            .map(|t| *t - started)
            .collect();
        assert_eq!(offsets, [0, 2, 3].map(Duration::from_secs).to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_health_check_is_cut_at_the_deadline() {
        let session = FakeSession::new(Role::Target);
        session.delay_health_checks(Duration::from_secs(10));
        let config = PollConfig {
            interval: Duration::from_secs(1),
            timeout: Some(Duration::from_secs(3)),
        };
        let started = Instant::now();

        let err = await_ready(&session, &config, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ReadyTimeout { probes: 1, .. }), "got {err}");
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_can_still_become_ready() {
        let session = FakeSession::new(Role::Target);
        session.invalidate();
        session.fail_health_checks(1);

        let probes = await_ready(&session, &config(1500), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(probes, 2);
    }

    #[test]
    fn default_interval_is_one_and_a_half_seconds() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_millis(1500));
        assert!(config.timeout.is_none());
    }
}
