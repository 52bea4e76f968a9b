//! Pin configuration and pulse generation.
//!
//! The [`ActuatorController`] owns the one live [`DeviceHandle`] together with
//! the set of pins configured on it. Both sit behind a single async mutex:
//! a pulse holds it for exactly one high/low cycle, so cycles from concurrent
//! callers never interleave on the wire.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use edgepulse_core::constants::{DEFAULT_PULSES_PER_EVENT, MAX_PIN_NUMBER};
use edgepulse_firmata::PinMode;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::device::DeviceHandle;
use crate::error::{ActuationError, ConfigError};
use crate::traits::Actuate;
use crate::types::{ActuatorPin, DeviceInfo, PulseTiming};

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinState {
    Live,
    Faulted,
}

struct Board<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    device: DeviceHandle<S>,
    pins: HashMap<u8, PinState>,
}

/// Owner of the connected board and its actuator pins.
pub struct ActuatorController<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    id: u64,
    info: DeviceInfo,
    board: Mutex<Option<Board<S>>>,
}

impl<S> ActuatorController<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Take ownership of a connected device.
    pub fn new(device: DeviceHandle<S>) -> Self {
        Self {
            id: NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed),
            info: device.info().clone(),
            board: Mutex::new(Some(Board {
                device,
                pins: HashMap::new(),
            })),
        }
    }

    /// Identity of the board this controller drives.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Put `pin` into output mode.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidPin`] for pins above 127
    /// - [`ConfigError::AlreadyConfigured`] if the pin is live (or faulted)
    /// - [`ConfigError::DeviceClosed`] after [`shutdown`](Self::shutdown)
    /// - [`ConfigError::Device`] if the board did not accept the command
    pub async fn configure(&self, pin: u8) -> Result<ActuatorPin, ConfigError> {
        if pin > MAX_PIN_NUMBER {
            return Err(ConfigError::InvalidPin {
                pin,
                max: MAX_PIN_NUMBER,
            });
        }

        let mut guard = self.board.lock().await;
        let board = guard.as_mut().ok_or(ConfigError::DeviceClosed)?;

        if board.pins.contains_key(&pin) {
            return Err(ConfigError::AlreadyConfigured { pin });
        }

        board
            .device
            .set_pin_mode(pin, PinMode::Output)
            .await
            .map_err(|source| ConfigError::Device { pin, source })?;
        board.pins.insert(pin, PinState::Live);

        info!(pin, endpoint = %self.info.endpoint, "Actuator pin configured");
        Ok(ActuatorPin::new(pin, PinMode::Output, self.id))
    }

    /// One high/low cycle: drive high, wait `high`, drive low, wait `low`.
    ///
    /// The device stays locked for the whole cycle. A failed write faults the
    /// pin; every later pulse on it returns [`ActuationError::PinFaulted`].
    pub async fn pulse(
        &self,
        pin: &ActuatorPin,
        high: Duration,
        low: Duration,
    ) -> Result<(), ActuationError> {
        let number = pin.number();
        let mut guard = self.board.lock().await;
        let board = guard.as_mut().ok_or(ActuationError::DeviceClosed)?;

        if pin.controller_id() != self.id {
            return Err(ActuationError::NotConfigured { pin: number });
        }
        match board.pins.get(&number) {
            Some(PinState::Live) => {}
            Some(PinState::Faulted) => return Err(ActuationError::PinFaulted { pin: number }),
            None => return Err(ActuationError::NotConfigured { pin: number }),
        }

        debug!(pin = number, high_ms = high.as_millis() as u64, "Pulse high");
        board.write(number, true).await?;
        tokio::time::sleep(high).await;

        debug!(pin = number, low_ms = low.as_millis() as u64, "Pulse low");
        board.write(number, false).await?;
        tokio::time::sleep(low).await;

        Ok(())
    }

    /// Drive `pin` low, return it to input mode and forget it.
    ///
    /// The pin is forgotten even if the board rejects the commands, so it can
    /// be configured again.
    pub async fn release(&self, pin: ActuatorPin) -> Result<(), ActuationError> {
        let number = pin.number();
        let mut guard = self.board.lock().await;
        let board = guard.as_mut().ok_or(ActuationError::DeviceClosed)?;

        if pin.controller_id() != self.id || board.pins.remove(&number).is_none() {
            return Err(ActuationError::NotConfigured { pin: number });
        }

        let result = board.reset_pin(number).await;
        info!(pin = number, ok = result.is_ok(), "Actuator pin released");
        result
    }

    /// Pins currently known to the controller, live or faulted.
    pub async fn configured_pins(&self) -> Vec<u8> {
        let guard = self.board.lock().await;
        let mut pins: Vec<u8> = guard
            .as_ref()
            .map(|board| board.pins.keys().copied().collect())
            .unwrap_or_default();
        pins.sort_unstable();
        pins
    }

    pub async fn is_closed(&self) -> bool {
        self.board.lock().await.is_none()
    }

    /// Release every pin on a best-effort basis and close the device.
    ///
    /// Waits for a running pulse to finish. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let Some(mut board) = self.board.lock().await.take() else {
            debug!("Controller already shut down");
            return;
        };

        let pins: Vec<u8> = board.pins.drain().map(|(pin, _)| pin).collect();
        for pin in pins {
            if let Err(e) = board.reset_pin(pin).await {
                warn!(pin, error = %e, "Failed to release pin during shutdown");
            }
        }

        board.device.close().await;
        info!(endpoint = %self.info.endpoint, "Actuator controller shut down");
    }
}

impl<S> Board<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn write(&mut self, pin: u8, high: bool) -> Result<(), ActuationError> {
        if let Err(source) = self.device.digital_write(pin, high).await {
            error!(pin, error = %source, "Device unresponsive, pin faulted");
            self.pins.insert(pin, PinState::Faulted);
            return Err(ActuationError::DeviceUnresponsive { pin, source });
        }
        Ok(())
    }

    async fn reset_pin(&mut self, pin: u8) -> Result<(), ActuationError> {
        self.device
            .digital_write(pin, false)
            .await
            .map_err(|source| ActuationError::DeviceUnresponsive { pin, source })?;
        self.device
            .set_pin_mode(pin, PinMode::Input)
            .await
            .map_err(|source| ActuationError::DeviceUnresponsive { pin, source })
    }
}

impl<S> std::fmt::Debug for ActuatorController<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorController")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// A pin pulsed a fixed number of times per actuation.
///
/// This is the piece of the hardware layer the relay pipeline sees, through
/// [`Actuate`].
pub struct Buzzer<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    controller: Arc<ActuatorController<S>>,
    pin: ActuatorPin,
    timing: PulseTiming,
    pulses: u32,
}

impl<S> Buzzer<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(controller: Arc<ActuatorController<S>>, pin: ActuatorPin) -> Self {
        Self {
            controller,
            pin,
            timing: PulseTiming::default(),
            pulses: DEFAULT_PULSES_PER_EVENT,
        }
    }

    pub fn with_timing(mut self, timing: PulseTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Pulses per actuation. Zero is treated as one.
    pub fn with_pulses(mut self, pulses: u32) -> Self {
        self.pulses = pulses.max(1);
        self
    }

    pub fn pin(&self) -> &ActuatorPin {
        &self.pin
    }

    pub fn controller(&self) -> &Arc<ActuatorController<S>> {
        &self.controller
    }
}

impl<S> Actuate for Buzzer<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn actuate(&self) -> Result<(), ActuationError> {
        for n in 1..=self.pulses {
            debug!(pin = self.pin.number(), pulse = n, of = self.pulses, "Actuating");
            self.controller
                .pulse(&self.pin, self.timing.high, self.timing.low)
                .await?;
        }
        Ok(())
    }
}
