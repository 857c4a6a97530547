//! Worker-thread websocket client.
//!
//! The session loop talks to the backend through a pair of channels; the
//! worker owns the socket, drains queued uplink messages, and parses
//! incoming frames into [`DownlinkEvent`]s. Socket failures surface as a
//! final `Closed` event rather than a panic or a poisoned loop.

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message, WebSocket};
use url::Url;

use super::protocol::{parse_server_message, DownlinkEvent, UplinkMessage};
use crate::log_debug;

/// How long one read blocks before the worker checks the uplink queue
/// and the shutdown flag again.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

pub struct LinkClient {
    outgoing: Sender<UplinkMessage>,
    events: Receiver<DownlinkEvent>,
    shutdown: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl LinkClient {
    /// Connect and spawn the socket worker. `capacity` bounds both
    /// channels; uplink sends beyond it drop at the producer.
    pub fn connect(url: &Url, capacity: usize) -> Result<Self> {
        let (socket, _response) = tungstenite::connect(url.as_str())
            .with_context(|| format!("failed to connect to {url}"))?;
        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            stream
                .set_read_timeout(Some(READ_TIMEOUT))
                .context("failed to set link read timeout")?;
        }

        let (outgoing, outgoing_rx) = bounded::<UplinkMessage>(capacity.max(1));
        let (events_tx, events) = bounded::<DownlinkEvent>(capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = shutdown.clone();

        let worker = thread::spawn(move || {
            run_socket_worker(socket, outgoing_rx, events_tx, worker_shutdown);
        });

        log_debug(&format!("link connected: {url}"));
        Ok(Self {
            outgoing,
            events,
            shutdown,
            worker: Some(worker),
        })
    }

    /// Producer side for the session loop.
    pub fn outgoing(&self) -> Sender<UplinkMessage> {
        self.outgoing.clone()
    }

    /// Consumer side for the session loop.
    pub fn events(&self) -> Receiver<DownlinkEvent> {
        self.events.clone()
    }

    /// Queue an uplink message, dropping it if the worker is behind.
    pub fn send(&self, message: UplinkMessage) -> Result<()> {
        self.outgoing
            .try_send(message)
            .map_err(|_| anyhow!("link uplink queue full or disconnected"))
    }

    /// Stop the worker and close the socket.
    pub fn close(mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for LinkClient {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_socket_worker(
    mut socket: WebSocket<MaybeTlsStream<TcpStream>>,
    outgoing: Receiver<UplinkMessage>,
    events: Sender<DownlinkEvent>,
    shutdown: Arc<AtomicBool>,
) {
    let close_reason;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            let _ = socket.close(None);
            let _ = socket.flush();
            close_reason = "closed by client".to_string();
            break;
        }

        // Drain everything queued before blocking on the next read.
        loop {
            match outgoing.try_recv() {
                Ok(message) => {
                    let payload = match serde_json::to_string(&message) {
                        Ok(payload) => payload,
                        Err(err) => {
                            log_debug(&format!("uplink serialization failed: {err}"));
                            continue;
                        }
                    };
                    if let Err(err) = socket.send(Message::Text(payload)) {
                        log_debug(&format!("uplink send failed: {err}"));
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(raw)) => match parse_server_message(&raw) {
                Ok(event) => {
                    if events.send(event).is_err() {
                        close_reason = "event consumer gone".to_string();
                        break;
                    }
                }
                Err(err) => log_debug(&format!("ignoring unparseable server message: {err}")),
            },
            Ok(Message::Close(_)) => {
                close_reason = "closed by server".to_string();
                break;
            }
            // Ping/pong and binary frames carry nothing for us.
            Ok(_) => {}
            Err(WsError::Io(err))
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
            {
                // Read timeout: loop back around to service the queue.
            }
            Err(err) => {
                close_reason = format!("link error: {err}");
                break;
            }
        }
    }
    let _ = events.send(DownlinkEvent::Closed(close_reason));
}
