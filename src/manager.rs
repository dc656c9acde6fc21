use std::sync::Arc;

use log::{debug, info, warn};
use presence_rs::config::awake_time_from_millis;
use presence_rs::messages::{Command, PresenceEvent};
use presence_rs::{PresenceService, Scheduler};
use tokio::sync::{broadcast, mpsc};

enum Flow {
    Continue,
    Quit,
}

/// Applies activity commands to the presence service and reports every
/// presence change on stdout as a JSON line.
pub struct Manager<S: Scheduler> {
    service: Arc<PresenceService<S>>,
    events: broadcast::Receiver<PresenceEvent>,
    commands: mpsc::Receiver<Command>,
}

impl<S: Scheduler> Manager<S> {
    pub fn new(
        service: Arc<PresenceService<S>>,
        events: broadcast::Receiver<PresenceEvent>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        Manager {
            service,
            events,
            commands,
        }
    }

    pub async fn run_loop(mut self) -> anyhow::Result<()> {
        let mut events_open = true;

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("Command channel closed");
                        break;
                    };
                    if let Flow::Quit = self.handle_command(command)? {
                        break;
                    }
                }
                event = self.events.recv(), if events_open => {
                    match event {
                        Ok(event) => print_event(&event)?,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Missed {} presence events", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Presence event channel closed");
                            events_open = false;
                        }
                    }
                }
            }
        }

        while let Ok(event) = self.events.try_recv() {
            print_event(&event)?;
        }

        info!("Exiting manager event loop");
        self.service.shutdown();

        Ok(())
    }

    fn handle_command(&self, command: Command) -> anyhow::Result<Flow> {
        match command {
            Command::Register {
                device,
                awake_time_ms,
            } => {
                let registered = awake_time_ms
                    .map(|millis| awake_time_from_millis("awake time", millis))
                    .transpose()
                    .and_then(|awake_time| self.service.register(&device, awake_time));
                if let Err(err) = registered {
                    warn!("Not registering device {}: {}", device, err);
                }
            }
            Command::Deregister(device) => {
                if !self.service.deregister(&device) {
                    warn!("Cannot deregister unknown device {}", device);
                }
            }
            Command::Awake(device) => {
                if !self.service.mark_awake(&device) {
                    warn!("Activity from unknown device {}", device);
                }
            }
            Command::Sleep(device) => {
                if !self.service.mark_sleeping(&device) {
                    warn!("Sleep for unknown device {}", device);
                }
            }
            Command::Status => {
                println!("{}", serde_json::to_string(&self.service.snapshot())?);
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

fn print_event(event: &PresenceEvent) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
