//! # Channel Manager
//!
//! Drives a [`ChannelMachine`] from one tokio task. UI requests, transport
//! events and the two timers (reconnect backoff, typing expiry) all meet in
//! a single `select!` loop, so the machine never needs a lock.
//!
//! The UI talks to the task through a cloneable [`ChannelHandle`] and
//! receives [`ChannelUpdate`]s on the channel passed to [`spawn_channel`].

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::channel::machine::{ChannelMachine, ChannelUpdate, Command};
use crate::channel::transport::{Connector, TransportEvent, TransportEventKind, TransportLink};
use crate::core::session::SessionContext;

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelRequest {
    Connect {
        room: String,
        session: SessionContext,
    },
    Send(String),
    Typing,
    React {
        message_id: String,
        symbol: String,
    },
    Disconnect,
    /// Closes the live link and stops the task.
    Shutdown,
}

/// Sender side of the manager task. Requests after shutdown are dropped.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    requests: UnboundedSender<ChannelRequest>,
}

impl ChannelHandle {
    pub fn request(&self, request: ChannelRequest) {
        if self.requests.send(request).is_err() {
            warn!("Channel task has stopped; request dropped");
        }
    }

    pub fn connect(&self, room: impl Into<String>, session: SessionContext) {
        self.request(ChannelRequest::Connect {
            room: room.into(),
            session,
        });
    }

    pub fn send(&self, body: impl Into<String>) {
        self.request(ChannelRequest::Send(body.into()));
    }

    pub fn typing(&self) {
        self.request(ChannelRequest::Typing);
    }

    pub fn react(&self, message_id: impl Into<String>, symbol: impl Into<String>) {
        self.request(ChannelRequest::React {
            message_id: message_id.into(),
            symbol: symbol.into(),
        });
    }

    pub fn disconnect(&self) {
        self.request(ChannelRequest::Disconnect);
    }

    pub fn shutdown(&self) {
        self.request(ChannelRequest::Shutdown);
    }
}

/// Starts the manager task. Must be called inside a tokio runtime.
pub fn spawn_channel(
    machine: ChannelMachine,
    connector: Arc<dyn Connector>,
    updates: UnboundedSender<ChannelUpdate>,
) -> (ChannelHandle, JoinHandle<()>) {
    let (requests_tx, requests_rx) = unbounded_channel();
    let (events_tx, events_rx) = unbounded_channel();
    let driver = ChannelDriver {
        machine,
        connector,
        link: None,
        reconnect_at: None,
        requests: requests_rx,
        events_tx,
        events_rx,
        updates,
    };
    let task = tokio::spawn(driver.run());
    (
        ChannelHandle {
            requests: requests_tx,
        },
        task,
    )
}

struct ChannelDriver {
    machine: ChannelMachine,
    connector: Arc<dyn Connector>,
    link: Option<TransportLink>,
    /// The single owned backoff deadline.
    reconnect_at: Option<Instant>,
    requests: UnboundedReceiver<ChannelRequest>,
    events_tx: UnboundedSender<TransportEvent>,
    events_rx: UnboundedReceiver<TransportEvent>,
    updates: UnboundedSender<ChannelUpdate>,
}

/// Sleeps until `deadline`, or forever when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl ChannelDriver {
    async fn run(mut self) {
        info!("Channel manager started");
        loop {
            let reconnect_at = self.reconnect_at;
            let typing_at = self.machine.next_typing_deadline();

            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(ChannelRequest::Shutdown) | None => break,
                    Some(request) => self.handle_request(request),
                },
                Some(event) = self.events_rx.recv() => self.handle_transport(event),
                _ = wait_until(reconnect_at) => {
                    self.reconnect_at = None;
                    let commands = self.machine.on_reconnect_due();
                    self.execute(commands);
                }
                _ = wait_until(typing_at) => {
                    self.machine.on_tick(Instant::now());
                }
            }
            self.flush_updates();
        }

        let commands = self.machine.disconnect();
        self.execute(commands);
        self.flush_updates();
        self.link = None;
        info!("Channel manager stopped");
    }

    fn handle_request(&mut self, request: ChannelRequest) {
        debug!("Channel request: {request:?}");
        let commands = match request {
            ChannelRequest::Connect { room, session } => self.machine.connect(&room, session),
            ChannelRequest::Send(body) => self.machine.send(&body),
            ChannelRequest::Typing => self.machine.send_typing(),
            ChannelRequest::React { message_id, symbol } => {
                self.machine.react(&message_id, &symbol);
                Vec::new()
            }
            ChannelRequest::Disconnect => self.machine.disconnect(),
            ChannelRequest::Shutdown => Vec::new(),
        };
        self.execute(commands);
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        let generation = event.generation;
        match event.kind {
            TransportEventKind::Opened => self.machine.on_open(generation),
            TransportEventKind::Frame(raw) => {
                let unix_millis = chrono::Utc::now().timestamp_millis();
                self.machine
                    .on_frame(generation, &raw, unix_millis, Instant::now());
            }
            TransportEventKind::Error(error) => self.machine.on_error(generation, &error),
            TransportEventKind::Closed(code) => {
                if self.link.as_ref().is_some_and(|l| l.generation == generation) {
                    self.link = None;
                }
                let commands = self.machine.on_close(generation, code);
                self.execute(commands);
            }
        }
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Open { generation, target } => {
                    // Dropping a superseded link ends its task
                    self.link = Some(self.connector.open(
                        generation,
                        &target,
                        self.events_tx.clone(),
                    ));
                }
                Command::Close { code } => {
                    if let Some(link) = &self.link {
                        link.close(code);
                    }
                }
                Command::Transmit(frame) => match &self.link {
                    Some(link) => link.transmit(frame),
                    None => debug!("No live link; frame dropped"),
                },
                Command::ScheduleReconnect(delay) => {
                    self.reconnect_at = Some(Instant::now() + delay);
                }
                Command::CancelReconnect => {
                    self.reconnect_at = None;
                }
            }
        }
    }

    fn flush_updates(&mut self) {
        for update in self.machine.take_updates() {
            if self.updates.send(update).is_err() {
                debug!("Update receiver dropped");
            }
        }
    }
}
