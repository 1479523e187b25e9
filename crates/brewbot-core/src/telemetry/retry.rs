use core::future::Future;
use core::time::Duration;

use embedded_hal_async::delay::DelayNs;
use log::{debug, error, warn};

use super::{TelemetryError, TelemetryEvent};

/// Attempt budget and linear backoff for telemetry delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    /// Failed attempt `n` (1-based) is followed by `n * backoff_step` of waiting
    pub backoff_step: Duration,
}

impl RetryPolicy {
    pub fn backoff_after(&self, attempt: u8) -> Duration {
        self.backoff_step * u32::from(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(1000),
        }
    }
}

/// Something that can POST a JSON body to the telemetry server.
pub trait TelemetryTransport {
    /// Send one request and return the response's status code.
    fn post(
        &mut self,
        path: &str,
        body: &str,
    ) -> impl Future<Output = Result<u16, TelemetryError>>;
}

/// Post an event, retrying failures with linear backoff.
///
/// Returns the final status code on a 2xx response, or the last error once
/// the policy's attempts are used up.
pub async fn deliver<T, D>(
    transport: &mut T,
    delay: &mut D,
    policy: RetryPolicy,
    event: &TelemetryEvent,
) -> Result<u16, TelemetryError>
where
    T: TelemetryTransport,
    D: DelayNs,
{
    let path = event.path();
    let body = event.to_json()?;
    let attempts = policy.max_attempts.max(1);

    let mut attempt = 1;
    loop {
        let error = match transport.post(path, &body).await {
            Ok(status) if (200..300).contains(&status) => {
                debug!("POST {} -> {} (attempt {})", path, status, attempt);
                return Ok(status);
            }
            Ok(status) => TelemetryError::Status(status),
            Err(e) => e,
        };

        if attempt >= attempts {
            error!("POST {} failed after {} attempts: {}", path, attempt, error);
            return Err(error);
        }

        let backoff = policy.backoff_after(attempt);
        warn!(
            "POST {} attempt {}/{} failed: {}; retrying in {} ms",
            path,
            attempt,
            attempts,
            error,
            backoff.as_millis()
        );
        delay.delay_ms(backoff.as_millis() as u32).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;
    use embassy_futures::block_on;

    /// Replays scripted results and records every request
    struct ScriptedTransport {
        script: Vec<Result<u16, TelemetryError>>,
        requests: Vec<(String, String)>,
    }

    impl ScriptedTransport {
        fn new(script: &[Result<u16, TelemetryError>]) -> Self {
            Self {
                script: script.iter().rev().copied().collect(),
                requests: Vec::new(),
            }
        }
    }

    impl TelemetryTransport for ScriptedTransport {
        async fn post(&mut self, path: &str, body: &str) -> Result<u16, TelemetryError> {
            self.requests.push((path.to_string(), body.to_string()));
            self.script.pop().unwrap_or(Err(TelemetryError::Connect))
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        waits_ms: Vec<u32>,
    }

    impl DelayNs for RecordingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.waits_ms.push(ns / 1_000_000);
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.waits_ms.push(ms);
        }
    }

    const STATS: TelemetryEvent = TelemetryEvent::StatsUpdate {
        cups: 2,
        total_brews: 1,
        total_cups: 2,
    };

    #[test]
    fn test_first_attempt_success() {
        let mut transport = ScriptedTransport::new(&[Ok(200)]);
        let mut delay = RecordingDelay::default();

        let result = block_on(deliver(
            &mut transport,
            &mut delay,
            RetryPolicy::default(),
            &STATS,
        ));

        assert_eq!(result, Ok(200));
        assert_eq!(transport.requests.len(), 1);
        assert_eq!(transport.requests[0].0, "/update_stats");
        assert_eq!(
            transport.requests[0].1,
            r#"{"cups":2,"total_brews":1,"total_cups":2}"#
        );
        assert!(delay.waits_ms.is_empty());
    }

    #[test]
    fn test_retries_with_linear_backoff() {
        let mut transport =
            ScriptedTransport::new(&[Err(TelemetryError::Connect), Ok(500), Ok(201)]);
        let mut delay = RecordingDelay::default();

        let result = block_on(deliver(
            &mut transport,
            &mut delay,
            RetryPolicy::default(),
            &STATS,
        ));

        assert_eq!(result, Ok(201));
        assert_eq!(transport.requests.len(), 3);
        assert_eq!(delay.waits_ms, [1000, 2000]);
    }

    #[test]
    fn test_gives_up_after_three_attempts() {
        let mut transport = ScriptedTransport::new(&[Ok(404), Ok(404), Ok(404), Ok(200)]);
        let mut delay = RecordingDelay::default();

        let result = block_on(deliver(
            &mut transport,
            &mut delay,
            RetryPolicy::default(),
            &STATS,
        ));

        assert_eq!(result, Err(TelemetryError::Status(404)));
        assert_eq!(transport.requests.len(), 3);
        assert_eq!(delay.waits_ms, [1000, 2000]);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let mut transport = ScriptedTransport::new(&[]);
        let mut delay = RecordingDelay::default();
        let policy = RetryPolicy {
            max_attempts: 0,
            backoff_step: Duration::from_millis(250),
        };

        let result = block_on(deliver(&mut transport, &mut delay, policy, &STATS));

        assert_eq!(result, Err(TelemetryError::Connect));
        assert_eq!(transport.requests.len(), 1);
        assert!(delay.waits_ms.is_empty());
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff_step: Duration::from_millis(250),
        };

        assert_eq!(policy.backoff_after(1), Duration::from_millis(250));
        assert_eq!(policy.backoff_after(4), Duration::from_millis(1000));
    }
}
