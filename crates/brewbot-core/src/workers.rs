//! Background workers fed by the application channels
//!
//! Both are platform-neutral `async fn`s: the firmware wraps them in embassy
//! tasks and the simulator drives them on their own threads.

use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info};

use crate::app_state::{BREW_ORDERS, SharedPanel, TELEMETRY_EVENTS, queue_telemetry};
use crate::brew::BrewOrder;
use crate::panel::PanelControl;
use crate::telemetry::{RetryPolicy, TelemetryEvent, TelemetryTransport, deliver};

/// Hold the coffee maker on for one order, then switch it off.
///
/// The panel lock is only taken once the brew time is over. Returns the stats
/// event to post, if the brew was still running.
pub async fn brew_once<P, D>(
    panel: &SharedPanel<P>,
    delay: &mut D,
    order: BrewOrder,
) -> Option<TelemetryEvent>
where
    P: PanelControl,
    D: DelayNs,
{
    info!(
        "Brewing {} cups for {} s",
        order.cups.count(),
        order.duration.as_secs()
    );
    let mut remaining = order.duration.as_millis();
    while remaining > 0 {
        let chunk = u32::try_from(remaining).unwrap_or(u32::MAX);
        delay.delay_ms(chunk).await;
        remaining -= u128::from(chunk);
    }

    match panel.lock().await.finish_brew() {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            debug!("Brew was cancelled before it finished");
            None
        }
        Err(e) => {
            error!("Failed to switch the coffee maker off: {}", e);
            None
        }
    }
}

pub async fn run_brew_worker<P, D>(panel: &SharedPanel<P>, mut delay: D)
where
    P: PanelControl,
    D: DelayNs,
{
    info!("Brew worker started");
    loop {
        let order = BREW_ORDERS.receive().await;
        if let Some(event) = brew_once(panel, &mut delay, order).await {
            queue_telemetry(event);
        }
    }
}

/// Deliver queued telemetry events one at a time.
///
/// With no transport (telemetry not configured) events are discarded.
pub async fn run_telemetry_worker<T, D>(mut transport: Option<T>, mut delay: D, policy: RetryPolicy)
where
    T: TelemetryTransport,
    D: DelayNs,
{
    if transport.is_none() {
        info!("Telemetry disabled, events will be discarded");
    }

    loop {
        let event = TELEMETRY_EVENTS.receive().await;
        let Some(transport) = transport.as_mut() else {
            debug!("Discarding {} event", event.path());
            continue;
        };

        // failures are logged by deliver
        if let Ok(status) = deliver(transport, &mut delay, policy, &event).await {
            info!("Posted {} ({})", event.path(), status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::PanelError;
    use crate::brew::CupCount;
    use crate::panel::{Outcome, Request};
    use alloc::vec::Vec;
    use core::time::Duration;
    use embassy_futures::block_on;

    struct Brewer {
        result: Result<Option<TelemetryEvent>, PanelError>,
        finished: u32,
    }

    impl PanelControl for Brewer {
        fn handle(&mut self, _request: &Request<'_>) -> Outcome {
            unreachable!("the brew worker never routes requests")
        }

        fn finish_brew(&mut self) -> Result<Option<TelemetryEvent>, PanelError> {
            self.finished += 1;
            self.result
        }

        fn cancel_brew(&mut self) {}
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

    const ORDER: BrewOrder = BrewOrder {
        cups: CupCount::Eight,
        duration: Duration::from_secs(10),
    };

    const STATS: TelemetryEvent = TelemetryEvent::StatsUpdate {
        cups: 8,
        total_brews: 1,
        total_cups: 8,
    };

    #[test]
    fn test_brew_waits_then_finishes() {
        let panel = SharedPanel::new(Brewer {
            result: Ok(Some(STATS)),
            finished: 0,
        });
        let mut delay = RecordingDelay::default();

        let event = block_on(brew_once(&panel, &mut delay, ORDER));

        assert_eq!(event, Some(STATS));
        assert_eq!(delay.waits_ms, [10_000]);
        assert_eq!(block_on(panel.lock()).finished, 1);
    }

    #[test]
    fn test_long_brew_waits_in_full() {
        let panel = SharedPanel::new(Brewer {
            result: Ok(Some(STATS)),
            finished: 0,
        });
        let mut delay = RecordingDelay::default();
        let order = BrewOrder {
            duration: Duration::from_secs(4_294_968),
            ..ORDER
        };

        block_on(brew_once(&panel, &mut delay, order));

        assert_eq!(delay.waits_ms, [u32::MAX, 705]);
    }

    #[test]
    fn test_cancelled_brew_posts_nothing() {
        let panel = SharedPanel::new(Brewer {
            result: Ok(None),
            finished: 0,
        });
        let mut delay = RecordingDelay::default();

        assert_eq!(block_on(brew_once(&panel, &mut delay, ORDER)), None);
    }

    #[test]
    fn test_relay_fault_posts_nothing() {
        let panel = SharedPanel::new(Brewer {
            result: Err(PanelError::Gpio { device: "relay" }),
            finished: 0,
        });
        let mut delay = RecordingDelay::default();

        assert_eq!(block_on(brew_once(&panel, &mut delay, ORDER)), None);
        assert_eq!(block_on(panel.lock()).finished, 1);
    }
}
