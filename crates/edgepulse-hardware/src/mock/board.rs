//! Simulated Firmata board.
//!
//! Answers the handshake like StandardFirmata and records every command it
//! receives, with the (tokio) time it arrived. Under a paused test clock the
//! timestamps are exact, which makes pulse timing and ordering checkable.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use edgepulse_firmata::{BoardCodec, Command, FirmwareReport, PinMode, Report, Version};
use futures::{SinkExt, StreamExt};
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

/// A command as seen by the simulated board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub at: Instant,
    pub command: Command,
}

/// Board personality: what it reports during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockBoard {
    protocol_version: Version,
    firmware: FirmwareReport,
}

impl MockBoard {
    pub fn new(protocol_version: Version, firmware: FirmwareReport) -> Self {
        Self {
            protocol_version,
            firmware,
        }
    }

    /// An Arduino running StandardFirmata 2.5.
    pub fn standard() -> Self {
        Self::new(
            Version::new(2, 5),
            FirmwareReport::new(Version::new(2, 5), "StandardFirmata.ino"),
        )
    }

    pub fn firmware(&self) -> &FirmwareReport {
        &self.firmware
    }

    /// Start serving on `stream`. Must be called inside a tokio runtime.
    pub fn spawn(self, stream: DuplexStream) -> MockBoardHandle {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(serve(self.clone(), stream, Arc::clone(&commands)));

        MockBoardHandle {
            firmware: self.firmware,
            commands,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::standard()
    }
}

async fn serve(board: MockBoard, stream: DuplexStream, commands: Arc<Mutex<Vec<RecordedCommand>>>) {
    let mut framed = Framed::new(stream, BoardCodec::new());

    while let Some(Ok(command)) = framed.next().await {
        trace!(?command, "Mock board received command");
        lock(&commands).push(RecordedCommand {
            at: Instant::now(),
            command: command.clone(),
        });

        let reply = match command {
            Command::QueryVersion => Some(Report::Version(board.protocol_version)),
            Command::QueryFirmware => Some(Report::Firmware(board.firmware.clone())),
            _ => None,
        };

        if let Some(report) = reply
            && framed.send(report).await.is_err()
        {
            break;
        }
    }

    debug!(firmware = %board.firmware.name, "Mock board stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Test-side view of a running mock board.
#[derive(Debug, Clone)]
pub struct MockBoardHandle {
    firmware: FirmwareReport,
    commands: Arc<Mutex<Vec<RecordedCommand>>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl MockBoardHandle {
    pub fn firmware(&self) -> &FirmwareReport {
        &self.firmware
    }

    /// Every command received so far, in arrival order.
    pub fn commands(&self) -> Vec<RecordedCommand> {
        lock(&self.commands).clone()
    }

    /// Digital writes to `pin` as `(time, high)` pairs.
    pub fn pin_writes(&self, pin: u8) -> Vec<(Instant, bool)> {
        lock(&self.commands)
            .iter()
            .filter_map(|recorded| match recorded.command {
                Command::SetDigitalPinValue { pin: p, high } if p == pin => {
                    Some((recorded.at, high))
                }
                _ => None,
            })
            .collect()
    }

    /// Mode changes requested for `pin`, in order.
    pub fn pin_modes(&self, pin: u8) -> Vec<PinMode> {
        lock(&self.commands)
            .iter()
            .filter_map(|recorded| match recorded.command {
                Command::SetPinMode { pin: p, mode } if p == pin => Some(mode),
                _ => None,
            })
            .collect()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.task)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Unplug the board. Returns once its end of the stream is gone.
    pub async fn disconnect(&self) {
        let task = lock(&self.task).take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }
    }
}
