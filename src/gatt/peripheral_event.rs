use super::{
    central::Central,
    status::{GattStatus, NotifyOutcome},
};
use tokio::sync::oneshot;
use uuid::Uuid;

pub type ReadResponder = oneshot::Sender<Result<Vec<u8>, GattStatus>>;
pub type WriteResponder = oneshot::Sender<GattStatus>;

/// Callback surface delivered by the platform stack (and the tick timer)
/// onto the peripheral's single event queue.
#[derive(Debug)]
pub enum PeripheralEvent {
    DidUpdateState {
        is_powered: bool,
    },
    DidStartAdvertising {
        error: Option<String>,
    },
    DidStopAdvertising,
    DidAddService {
        service: Uuid,
        error: Option<String>,
    },
    DidConnect {
        client: Central,
    },
    DidDisconnect {
        client: Central,
    },
    DidSubscribeToCharacteristic {
        client: Central,
        service: Uuid,
        characteristic: Uuid,
    },
    DidUnsubscribeFromCharacteristic {
        client: Central,
        service: Uuid,
        characteristic: Uuid,
    },
    DidReceiveReadRequest {
        client: Central,
        service: Uuid,
        characteristic: Uuid,
        responder: ReadResponder,
    },
    DidReceiveWriteRequest {
        client: Central,
        service: Uuid,
        characteristic: Uuid,
        value: Vec<u8>,
        responder: WriteResponder,
    },
    DidReceiveDescriptorReadRequest {
        client: Central,
        service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
        responder: ReadResponder,
    },
    DidReceiveDescriptorWriteRequest {
        client: Central,
        service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
        value: Vec<u8>,
        responder: WriteResponder,
    },
    DidSendNotification {
        client: Central,
        characteristic: Uuid,
        value: Vec<u8>,
        outcome: NotifyOutcome,
    },
    NotificationTick {
        characteristic: Uuid,
        epoch: u64,
    },
}
