//! Scripted endpoints for connector tests and simulation mode.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use edgepulse_core::EndpointCandidate;
use tokio::io::DuplexStream;
use tracing::debug;

use super::board::{MockBoard, MockBoardHandle};
use crate::error::OpenError;
use crate::traits::PortOpener;

const MOCK_PIPE_SIZE: usize = 1024;

/// How a scripted endpoint behaves when opened.
#[derive(Debug, Clone)]
pub enum MockEndpoint {
    /// Held by another process.
    Claimed,

    /// Does not exist.
    Missing,

    /// Opens, but nothing ever answers.
    Silent,

    /// A simulated Firmata board.
    Board(MockBoard),
}

/// [`PortOpener`] over a fixed table of scripted endpoints.
///
/// Paths not in the table behave as [`MockEndpoint::Missing`].
///
/// # Examples
///
/// ```
/// use edgepulse_hardware::mock::{MockBoard, MockEndpoint, MockPortOpener};
///
/// let opener = MockPortOpener::new()
///     .with_endpoint("/dev/ttyACM0", MockEndpoint::Silent)
///     .with_endpoint("/dev/ttyACM1", MockEndpoint::Board(MockBoard::standard()));
/// assert!(opener.attempts().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPortOpener {
    endpoints: HashMap<String, MockEndpoint>,
    attempts: Arc<Mutex<Vec<String>>>,
    boards: Arc<Mutex<HashMap<String, MockBoardHandle>>>,
    silent_peers: Arc<Mutex<Vec<DuplexStream>>>,
}

impl MockPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, path: impl Into<String>, endpoint: MockEndpoint) -> Self {
        self.endpoints.insert(path.into(), endpoint);
        self
    }

    /// Opener for `--simulate`: every candidate is missing except the last,
    /// which is a StandardFirmata board.
    pub fn simulated(candidates: &[EndpointCandidate]) -> Self {
        let mut opener = Self::new();
        if let Some((last, rest)) = candidates.split_last() {
            for candidate in rest {
                opener = opener.with_endpoint(candidate.path(), MockEndpoint::Missing);
            }
            opener = opener.with_endpoint(last.path(), MockEndpoint::Board(MockBoard::standard()));
        }
        opener
    }

    /// Paths opened so far, in order.
    pub fn attempts(&self) -> Vec<String> {
        lock(&self.attempts).clone()
    }

    /// Handle of the board served on `path`, once it has been opened.
    pub fn board(&self, path: &str) -> Option<MockBoardHandle> {
        lock(&self.boards).get(path).cloned()
    }
}

impl PortOpener for MockPortOpener {
    type Stream = DuplexStream;

    async fn open(&self, candidate: &EndpointCandidate) -> Result<DuplexStream, OpenError> {
        let path = candidate.path();
        lock(&self.attempts).push(path.to_string());

        let endpoint = self
            .endpoints
            .get(path)
            .cloned()
            .unwrap_or(MockEndpoint::Missing);
        debug!(endpoint = path, behavior = ?endpoint, "Mock open");

        match endpoint {
            MockEndpoint::Claimed => Err(OpenError::claimed(path, "Device or resource busy")),
            MockEndpoint::Missing => Err(OpenError::unavailable(path, "No such file or directory")),
            MockEndpoint::Silent => {
                let (host, peer) = tokio::io::duplex(MOCK_PIPE_SIZE);
                lock(&self.silent_peers).push(peer);
                Ok(host)
            }
            MockEndpoint::Board(board) => {
                let (host, board_side) = tokio::io::duplex(MOCK_PIPE_SIZE);
                let handle = board.spawn(board_side);
                lock(&self.boards).insert(path.to_string(), handle);
                Ok(host)
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(path: &str) -> EndpointCandidate {
        EndpointCandidate::new(path, 115_200).unwrap()
    }

    #[tokio::test]
    async fn test_scripted_open_outcomes() {
        let opener = MockPortOpener::new()
            .with_endpoint("/dev/ttyS1", MockEndpoint::Claimed)
            .with_endpoint("/dev/ttyS2", MockEndpoint::Silent)
            .with_endpoint("/dev/ttyS3", MockEndpoint::Board(MockBoard::standard()));

        assert!(opener.open(&candidate("/dev/ttyS1")).await.unwrap_err().is_claimed());
        assert!(opener.open(&candidate("/dev/ttyS2")).await.is_ok());
        assert!(opener.open(&candidate("/dev/ttyS3")).await.is_ok());
        assert!(matches!(
            opener.open(&candidate("/dev/ttyS4")).await,
            Err(OpenError::Unavailable { .. })
        ));

        assert_eq!(
            opener.attempts(),
            vec!["/dev/ttyS1", "/dev/ttyS2", "/dev/ttyS3", "/dev/ttyS4"]
        );
        assert!(opener.board("/dev/ttyS3").is_some());
        assert!(opener.board("/dev/ttyS2").is_none());
    }

    #[test]
    fn test_simulated_puts_board_last() {
        let candidates = vec![candidate("/dev/ttyS1"), candidate("/dev/ttyS2")];
        let opener = MockPortOpener::simulated(&candidates);

        assert!(matches!(
            opener.endpoints.get("/dev/ttyS1"),
            Some(MockEndpoint::Missing)
        ));
        assert!(matches!(
            opener.endpoints.get("/dev/ttyS2"),
            Some(MockEndpoint::Board(_))
        ));
    }
}
