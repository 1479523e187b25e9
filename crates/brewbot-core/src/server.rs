//! edge-http glue shared by the firmware and the simulator
//!
//! The handler reads one request, lets the panel answer it under the shared
//! lock, hands any follow-up work to the background workers, then writes the
//! reply.

use core::fmt::{Debug, Display, Write as _};

use edge_http::io::Error as HttpError;
use edge_http::io::server::{Connection, Handler};
use embedded_io_async::{Read, Write};
use log::{debug, error};

use crate::app_state::{BREW_ORDERS, SharedPanel, queue_telemetry};
use crate::brew::BrewError;
use crate::panel::{FollowUp, Method, PanelControl, Reply, Request};

/// Request bodies beyond this are truncated
pub const MAX_BODY_LEN: usize = 512;

const MAX_PATH_LEN: usize = 128;

fn method_of(method: edge_http::Method) -> Method {
    match method {
        edge_http::Method::Get => Method::Get,
        edge_http::Method::Post => Method::Post,
        _ => Method::Other,
    }
}

pub struct PanelHandler<'a, P> {
    panel: &'a SharedPanel<P>,
}

impl<'a, P> PanelHandler<'a, P> {
    pub const fn new(panel: &'a SharedPanel<P>) -> Self {
        Self { panel }
    }
}

impl<P: PanelControl> PanelHandler<'_, P> {
    /// Answer a request and dispatch its follow-up.
    pub async fn respond(&self, request: &Request<'_>) -> Reply {
        let mut panel = self.panel.lock().await;
        let outcome = panel.handle(request);

        match outcome.follow_up {
            Some(FollowUp::Brew(order)) => {
                if BREW_ORDERS.try_send(order).is_err() {
                    error!("Brew worker did not take the order");
                    panel.cancel_brew();
                    return Reply::brew_error(&BrewError::WorkerUnavailable);
                }
            }
            Some(FollowUp::Telemetry(event)) => {
                queue_telemetry(event);
            }
            None => {}
        }

        outcome.reply
    }
}

impl<P: PanelControl> Handler for PanelHandler<'_, P> {
    type Error<E>
        = HttpError<E>
    where
        E: Debug;

    async fn handle<T, const N: usize>(
        &self,
        _task_id: impl Display + Copy,
        conn: &mut Connection<'_, T, N>,
    ) -> Result<(), Self::Error<T::Error>>
    where
        T: Read + Write,
    {
        let (method, path) = {
            let headers = conn.headers()?;
            // Over-long targets are no route of ours; an empty path 404s
            let path: heapless::String<MAX_PATH_LEN> =
                headers.path.try_into().unwrap_or_default();
            (method_of(headers.method), path)
        };

        let mut body = heapless::Vec::<u8, MAX_BODY_LEN>::new();
        let mut buf = [0u8; 256];
        loop {
            match conn.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    // keep draining past the limit so the connection stays usable
                    for &b in &buf[..n] {
                        if body.push(b).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let reply = self
            .respond(&Request {
                method,
                path: &path,
                body: &body,
            })
            .await;
        debug!("HTTP {:?} {} -> {}", method, path, reply.status);

        let payload = reply.body.as_str().as_bytes();
        // 20 digits hold any usize
        let mut length = heapless::String::<20>::new();
        let _ = write!(length, "{}", payload.len());

        conn.initiate_response(
            reply.status,
            Some(reply.reason()),
            &[
                ("Content-Type", reply.content_type),
                ("Content-Length", length.as_str()),
            ],
        )
        .await?;
        conn.write_all(payload).await?;

        Ok(())
    }
}
