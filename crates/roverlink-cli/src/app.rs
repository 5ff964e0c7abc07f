//! Interactive application loop.
//!
//! Owns the link, a session, and the event stream; drives everything from
//! one select loop over stdin lines, link events, and ctrl-c.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

use roverlink_ble::{BleLinkConfig, BleSerialLink};
use roverlink_core::{
    Command, CommandName, LinkEvent, LinkEventReceiver, LinkSession, SchedulerConfig,
};

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Input parsing
// ----------------------------------------------------------------------------

/// One parsed teleop input line.
#[derive(Debug, PartialEq, Eq)]
enum TeleopInput {
    Send(Command),
    FullStop,
    Connect,
    Disconnect,
    Quit,
}

fn parse_input(line: &str) -> Result<Option<TeleopInput>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let input = match tokens.as_slice() {
        [] => return Ok(None),
        ["quit"] | ["exit"] => TeleopInput::Quit,
        ["stop"] => TeleopInput::FullStop,
        ["connect"] => TeleopInput::Connect,
        ["disconnect"] => TeleopInput::Disconnect,
        ["ef"] => TeleopInput::Send(Command::release_failsafe()),
        [name, value] => {
            let name: CommandName = name.parse()?;
            let value: i32 = value.parse().map_err(|_| {
                CliError::InvalidCommand(format!("{name}: value must be an integer"))
            })?;
            TeleopInput::Send(Command::new(name, value))
        }
        _ => {
            return Err(CliError::InvalidCommand(format!(
                "unrecognized input {:?}",
                line.trim()
            )))
        }
    };
    Ok(Some(input))
}

// ----------------------------------------------------------------------------
// Application
// ----------------------------------------------------------------------------

/// Owns the link and session for one run.
pub struct App {
    link: BleSerialLink,
    session: LinkSession<roverlink_ble::BleLinkHandle>,
    events: LinkEventReceiver,
    read_only: bool,
}

impl App {
    /// Starts the link and binds a session over it.
    pub async fn start(
        scheduler: SchedulerConfig,
        ble: BleLinkConfig,
        read_only: bool,
    ) -> Result<Self> {
        let mut link = BleSerialLink::start(ble).await?;
        let events = link
            .take_events()
            .ok_or_else(|| CliError::Config("link events already taken".to_string()))?;
        let session = LinkSession::new(link.handle(), scheduler);
        Ok(App {
            link,
            session,
            events,
            read_only,
        })
    }

    /// Runs until quit, ctrl-c, stdin closing, or the link going away.
    pub async fn run(mut self) -> Result<()> {
        self.link.handle().begin_connecting().await?;
        if self.read_only {
            info!("scanning; ctrl-c to exit");
        } else {
            info!("scanning; try 'ds 40', 'stop', 'ef', or 'quit'");
        }

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.on_event(&event).await,
                    None => break,
                },
                line = lines.next_line(), if !self.read_only => match line? {
                    Some(line) => {
                        if self.on_line(&line).await? {
                            break;
                        }
                    }
                    None => break,
                },
                _ = signal::ctrl_c() => break,
            }
        }

        self.session.shutdown().await;
        self.link.shutdown().await;
        Ok(())
    }

    async fn on_event(&mut self, event: &LinkEvent) {
        self.session.handle_event(event).await;
        match event {
            LinkEvent::ConnectionChanged { connected: true } => info!("connected"),
            LinkEvent::ConnectionChanged { connected: false } => info!("disconnected"),
            LinkEvent::TextReceived { text } => println!("{}", text.trim_end()),
        }
    }

    /// Handles one input line; returns `true` on quit.
    async fn on_line(&mut self, line: &str) -> Result<bool> {
        let input = match parse_input(line) {
            Ok(Some(input)) => input,
            Ok(None) => return Ok(false),
            Err(error) => {
                warn!(%error, "input rejected");
                return Ok(false);
            }
        };
        match input {
            TeleopInput::Quit => return Ok(true),
            TeleopInput::Connect => self.link.handle().begin_connecting().await?,
            TeleopInput::Disconnect => self.link.handle().disconnect().await?,
            TeleopInput::FullStop => {
                let mut delivered = true;
                for command in Command::full_stop() {
                    delivered &= self.session.enqueue(command);
                }
                if !delivered {
                    warn!("not connected; stop not sent");
                }
            }
            TeleopInput::Send(command) => {
                if !self.session.enqueue(command) {
                    warn!("not connected; command dropped");
                }
            }
        }
        Ok(false)
    }
}
