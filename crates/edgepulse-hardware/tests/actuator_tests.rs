//! Pin configuration and pulses against a simulated board.
//!
//! All tests run on a paused clock, so the timestamps the board records are
//! exact.

use std::sync::Arc;
use std::time::Duration;

use edgepulse_core::EndpointCandidate;
use edgepulse_firmata::PinMode;
use edgepulse_hardware::mock::{MockBoard, MockBoardHandle, MockEndpoint, MockPortOpener};
use edgepulse_hardware::{
    Actuate, ActuationError, ActuatorController, Buzzer, ConfigError, DeviceConnector, PulseTiming,
};
use tokio::io::DuplexStream;

const PATH: &str = "/dev/ttyACM1";
const HIGH: Duration = Duration::from_millis(500);
const LOW: Duration = Duration::from_millis(500);

async fn connect_board() -> (Arc<ActuatorController<DuplexStream>>, MockBoardHandle) {
    let opener =
        MockPortOpener::new().with_endpoint(PATH, MockEndpoint::Board(MockBoard::standard()));
    let connector = DeviceConnector::new(opener);
    let candidate = EndpointCandidate::new(PATH, 115_200).unwrap();

    let device = connector.connect(&[candidate]).await.unwrap();
    let board = connector.opener().board(PATH).unwrap();
    (Arc::new(ActuatorController::new(device)), board)
}

/// Let the board task catch up with everything already written.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_pulse_drives_high_then_low() {
    let (controller, board) = connect_board().await;
    let pin = controller.configure(6).await.unwrap();

    controller.pulse(&pin, HIGH, LOW).await.unwrap();

    let writes = board.pin_writes(6);
    assert_eq!(writes.len(), 2);
    assert!(writes[0].1);
    assert!(!writes[1].1);
    assert_eq!(writes[1].0 - writes[0].0, HIGH);
    assert_eq!(board.pin_modes(6), vec![PinMode::Output]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_pulses_never_interleave() {
    let (controller, board) = connect_board().await;
    let pin = controller.configure(6).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..3 {
        let controller = Arc::clone(&controller);
        tasks.push(tokio::spawn(async move {
            controller.pulse(&pin, HIGH, LOW).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let writes = board.pin_writes(6);
    let levels: Vec<bool> = writes.iter().map(|(_, high)| *high).collect();
    assert_eq!(levels, vec![true, false, true, false, true, false]);

    // Each cycle starts only after the previous one finished its low phase
    for cycle in writes.chunks(2).collect::<Vec<_>>().windows(2) {
        let previous_low = cycle[0][1].0;
        let next_high = cycle[1][0].0;
        assert!(next_high - previous_low >= LOW);
    }
}

#[tokio::test(start_paused = true)]
async fn test_buzzer_pulses_per_event() {
    let (controller, board) = connect_board().await;
    let pin = controller.configure(6).await.unwrap();

    let buzzer = Buzzer::new(Arc::clone(&controller), pin)
        .with_timing(PulseTiming::from_millis(100, 200))
        .with_pulses(3);
    buzzer.actuate().await.unwrap();

    let writes = board.pin_writes(6);
    assert_eq!(writes.len(), 6);
    assert_eq!(writes[1].0 - writes[0].0, Duration::from_millis(100));
    assert_eq!(writes[2].0 - writes[1].0, Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_faults_pin() {
    let (controller, board) = connect_board().await;
    let pin = controller.configure(6).await.unwrap();

    board.disconnect().await;
    assert!(!board.is_running());

    match controller.pulse(&pin, HIGH, LOW).await {
        Err(ActuationError::DeviceUnresponsive { pin, .. }) => assert_eq!(pin, 6),
        other => panic!("Expected DeviceUnresponsive, got {other:?}"),
    }
    assert!(matches!(
        controller.pulse(&pin, HIGH, LOW).await,
        Err(ActuationError::PinFaulted { pin: 6 })
    ));
    assert!(matches!(
        controller.configure(6).await,
        Err(ConfigError::AlreadyConfigured { pin: 6 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_release_allows_reconfigure() {
    let (controller, board) = connect_board().await;
    let pin = controller.configure(6).await.unwrap();
    controller.pulse(&pin, HIGH, LOW).await.unwrap();

    controller.release(pin).await.unwrap();
    assert!(controller.configured_pins().await.is_empty());
    assert!(matches!(
        controller.pulse(&pin, HIGH, LOW).await,
        Err(ActuationError::NotConfigured { pin: 6 })
    ));

    let pin = controller.configure(6).await.unwrap();
    assert_eq!(controller.configured_pins().await, vec![pin.number()]);

    settle().await;
    assert_eq!(
        board.pin_modes(6),
        vec![PinMode::Output, PinMode::Input, PinMode::Output]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_pins_and_closes() {
    let (controller, board) = connect_board().await;
    let buzzer_pin = controller.configure(6).await.unwrap();
    controller.configure(13).await.unwrap();

    controller.shutdown().await;
    assert!(controller.is_closed().await);

    assert!(matches!(
        controller.pulse(&buzzer_pin, HIGH, LOW).await,
        Err(ActuationError::DeviceClosed)
    ));
    assert!(matches!(
        controller.configure(7).await,
        Err(ConfigError::DeviceClosed)
    ));

    settle().await;
    assert_eq!(board.pin_modes(6), vec![PinMode::Output, PinMode::Input]);
    assert_eq!(board.pin_modes(13), vec![PinMode::Output, PinMode::Input]);
    assert!(!board.pin_writes(6).last().unwrap().1);
    assert!(!board.is_running());

    // Second shutdown is a no-op
    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_invalid_pin() {
    let (controller, _board) = connect_board().await;

    assert!(matches!(
        controller.configure(128).await,
        Err(ConfigError::InvalidPin { pin: 128, max: 127 })
    ));
    assert!(controller.configured_pins().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_pin_from_another_controller() {
    let (first, _first_board) = connect_board().await;
    let (second, _second_board) = connect_board().await;

    let pin = first.configure(6).await.unwrap();
    assert!(matches!(
        second.pulse(&pin, HIGH, LOW).await,
        Err(ActuationError::NotConfigured { pin: 6 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_pin_from_another_controller_with_same_number() {
    let (first, first_board) = connect_board().await;
    let (second, second_board) = connect_board().await;

    let first_pin = first.configure(6).await.unwrap();
    second.configure(6).await.unwrap();

    assert!(matches!(
        second.pulse(&first_pin, HIGH, LOW).await,
        Err(ActuationError::NotConfigured { pin: 6 })
    ));
    assert!(matches!(
        second.release(first_pin).await,
        Err(ActuationError::NotConfigured { pin: 6 })
    ));
    assert_eq!(second.configured_pins().await, vec![6]);

    settle().await;
    assert!(second_board.pin_writes(6).is_empty());
    assert!(first_board.pin_writes(6).is_empty());

    // The issuing controller still accepts it
    first.pulse(&first_pin, HIGH, LOW).await.unwrap();
    settle().await;
    assert_eq!(first_board.pin_writes(6).len(), 2);
}
