//! Serial endpoint candidates.
//!
//! The bridge does not know which serial device the board is attached to.
//! Configuration supplies a delimited list of candidate paths and the
//! connector tries them in order.
//!
//! ```
//! use edgepulse_core::endpoint::{enumerate, parse_candidates};
//!
//! let paths = parse_candidates("/dev/ttyACM0, /dev/ttyACM1,,/dev/ttyUSB0");
//! assert_eq!(paths, vec!["/dev/ttyACM0", "/dev/ttyACM1", "/dev/ttyUSB0"]);
//!
//! let candidates = enumerate("/dev/ttyACM0 /dev/ttyACM1", 115_200);
//! assert_eq!(candidates.len(), 2);
//! assert_eq!(candidates[1].baud_rate(), 115_200);
//! ```

use crate::{Error, Result, constants::CANDIDATE_DELIMITERS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A place where a compatible board might be reachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointCandidate {
    path: String,
    baud_rate: u32,
}

impl EndpointCandidate {
    /// Create a candidate with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidEndpoint` for an empty path and
    /// `Error::InvalidBaudRate` for a zero baud rate.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(Error::InvalidEndpoint("endpoint path is empty".to_string()));
        }
        if baud_rate == 0 {
            return Err(Error::InvalidBaudRate(baud_rate));
        }
        Ok(Self { path, baud_rate })
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl fmt::Display for EndpointCandidate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.baud_rate)
    }
}

/// Split a configured candidate list into endpoint paths.
///
/// Entries are separated by commas or whitespace. Empty entries are dropped
/// and order is preserved. An empty result is valid.
#[must_use]
pub fn parse_candidates(list: &str) -> Vec<String> {
    list.split(|c: char| CANDIDATE_DELIMITERS.contains(&c) || c.is_whitespace())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Produce the ordered candidates for a configured list and baud rate.
///
/// A zero baud rate yields no candidates, which the caller treats the same
/// way as an empty list.
#[must_use]
pub fn enumerate(list: &str, baud_rate: u32) -> Vec<EndpointCandidate> {
    parse_candidates(list)
        .into_iter()
        .filter_map(|path| EndpointCandidate::new(path, baud_rate).ok())
        .collect()
}
