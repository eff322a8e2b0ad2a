use super::{error::req_error, NotifySessions, NOTIFY_SESSION};
use crate::gatt::{
    central::Central,
    characteristic,
    descriptor,
    peripheral_event::PeripheralEvent,
    properties::CharacteristicProperty,
    service,
    status::{GattStatus, NotifyOutcome},
};
use bluer::gatt::local::{
    service_control, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, CharacteristicReadRequest,
    CharacteristicWrite, CharacteristicWriteMethod, CharacteristicWriteRequest, Descriptor,
    DescriptorRead, DescriptorReadRequest, DescriptorWrite, DescriptorWriteRequest, ReqError,
    Service,
};
use futures::FutureExt;
use log::{debug, warn};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

const NOTIFY_QUEUE_DEPTH: usize = 16;
const STOP_POLL: Duration = Duration::from_millis(250);

pub fn parse_service(
    service: &service::ServiceDescriptor,
    sender_tx: mpsc::Sender<PeripheralEvent>,
    sessions: NotifySessions,
) -> Service {
    let (_, service_handle) = service_control();

    let chars: Vec<Characteristic> = service
        .characteristics
        .iter()
        .map(|data| {
            parse_characteristic(data, service.uuid, sender_tx.clone(), sessions.clone())
        })
        .collect();

    Service {
        uuid: service.uuid,
        primary: service.primary,
        characteristics: chars,
        control_handle: service_handle,
        ..Default::default()
    }
}

fn parse_characteristic(
    characteristic: &characteristic::Characteristic,
    service_uuid: Uuid,
    sender_tx: mpsc::Sender<PeripheralEvent>,
    sessions: NotifySessions,
) -> Characteristic {
    let char_uuid = characteristic.uuid;
    let mut char_read: Option<CharacteristicRead> = None;
    let mut char_write: Option<CharacteristicWrite> = None;
    let mut char_notify: Option<CharacteristicNotify> = None;

    if characteristic.is_readable() {
        let read_sender = sender_tx.clone();
        char_read = Some(CharacteristicRead {
            read: true,
            fun: Box::new(move |request: CharacteristicReadRequest| {
                let sender_tx_clone = read_sender.clone();
                async move { on_read_request(sender_tx_clone, request, service_uuid, char_uuid).await }
                    .boxed()
            }),
            ..Default::default()
        });
    }

    if characteristic.is_writable() {
        let write_sender = sender_tx.clone();
        let without_response = characteristic
            .properties
            .contains(&CharacteristicProperty::WriteWithoutResponse);
        char_write = Some(CharacteristicWrite {
            write: characteristic
                .properties
                .contains(&CharacteristicProperty::Write),
            write_without_response: without_response,
            method: CharacteristicWriteMethod::Fun(Box::new(
                move |value: Vec<u8>, request: CharacteristicWriteRequest| {
                    let sender_tx_clone = write_sender.clone();
                    async move {
                        on_write_request(sender_tx_clone, request, service_uuid, char_uuid, value)
                            .await
                    }
                    .boxed()
                },
            )),
            ..Default::default()
        });
    }

    if characteristic.is_notify_capable() {
        let notify_sender = sender_tx.clone();
        let indicate = characteristic
            .properties
            .contains(&CharacteristicProperty::Indicate);
        char_notify = Some(CharacteristicNotify {
            notify: !indicate,
            indicate,
            method: CharacteristicNotifyMethod::Fun(Box::new(
                move |notifier: CharacteristicNotifier| {
                    let sender_tx_clone = notify_sender.clone();
                    let sessions = sessions.clone();
                    async move {
                        on_char_notify(sender_tx_clone, sessions, notifier, service_uuid, char_uuid)
                            .await
                    }
                    .boxed()
                },
            )),
            ..Default::default()
        });
    }

    // BlueZ owns the client characteristic configuration descriptor.
    let descriptors: Vec<Descriptor> = characteristic
        .descriptors
        .iter()
        .filter(|d| !d.is_client_configuration())
        .map(|d| parse_descriptor(d, service_uuid, char_uuid, sender_tx.clone()))
        .collect();

    Characteristic {
        uuid: char_uuid,
        read: char_read,
        write: char_write,
        notify: char_notify,
        descriptors,
        ..Default::default()
    }
}

fn parse_descriptor(
    descriptor: &descriptor::Descriptor,
    service_uuid: Uuid,
    char_uuid: Uuid,
    sender_tx: mpsc::Sender<PeripheralEvent>,
) -> Descriptor {
    let desc_uuid = descriptor.uuid;
    let mut desc_read: Option<DescriptorRead> = None;
    let mut desc_write: Option<DescriptorWrite> = None;

    if descriptor.is_readable() {
        let read_sender = sender_tx.clone();
        desc_read = Some(DescriptorRead {
            read: true,
            fun: Box::new(move |request: DescriptorReadRequest| {
                let sender_tx_clone = read_sender.clone();
                async move {
                    let (responder, response) = oneshot::channel();
                    let event = PeripheralEvent::DidReceiveDescriptorReadRequest {
                        client: Central::new(request.device_address.to_string()),
                        service: service_uuid,
                        characteristic: char_uuid,
                        descriptor: desc_uuid,
                        responder,
                    };
                    await_read(sender_tx_clone, event, response).await
                }
                .boxed()
            }),
            ..Default::default()
        });
    }

    if descriptor.is_writable() {
        let write_sender = sender_tx.clone();
        desc_write = Some(DescriptorWrite {
            write: true,
            fun: Box::new(move |value: Vec<u8>, request: DescriptorWriteRequest| {
                let sender_tx_clone = write_sender.clone();
                async move {
                    let (responder, response) = oneshot::channel();
                    let event = PeripheralEvent::DidReceiveDescriptorWriteRequest {
                        client: Central::new(request.device_address.to_string()),
                        service: service_uuid,
                        characteristic: char_uuid,
                        descriptor: desc_uuid,
                        value,
                        responder,
                    };
                    await_write(sender_tx_clone, event, response).await
                }
                .boxed()
            }),
            ..Default::default()
        });
    }

    Descriptor {
        uuid: desc_uuid,
        read: desc_read,
        write: desc_write,
        ..Default::default()
    }
}

/// Handle Requests
async fn on_read_request(
    sender_tx: mpsc::Sender<PeripheralEvent>,
    request: CharacteristicReadRequest,
    service_uuid: Uuid,
    characteristic: Uuid,
) -> Result<Vec<u8>, ReqError> {
    let (responder, response) = oneshot::channel();
    let event = PeripheralEvent::DidReceiveReadRequest {
        client: Central::new(request.device_address.to_string()),
        service: service_uuid,
        characteristic,
        responder,
    };
    await_read(sender_tx, event, response).await
}

async fn on_write_request(
    sender_tx: mpsc::Sender<PeripheralEvent>,
    request: CharacteristicWriteRequest,
    service_uuid: Uuid,
    characteristic: Uuid,
    value: Vec<u8>,
) -> Result<(), ReqError> {
    let (responder, response) = oneshot::channel();
    let event = PeripheralEvent::DidReceiveWriteRequest {
        client: Central::new(request.device_address.to_string()),
        service: service_uuid,
        characteristic,
        value,
        responder,
    };
    await_write(sender_tx, event, response).await
}

async fn await_read(
    sender_tx: mpsc::Sender<PeripheralEvent>,
    event: PeripheralEvent,
    response: oneshot::Receiver<Result<Vec<u8>, GattStatus>>,
) -> Result<Vec<u8>, ReqError> {
    if let Err(err) = sender_tx.send(event).await {
        warn!("Error sending read request event: {}", err);
        return Err(ReqError::Failed);
    }
    match response.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(status)) => Err(req_error(status)),
        Err(_) => Err(ReqError::Failed),
    }
}

async fn await_write(
    sender_tx: mpsc::Sender<PeripheralEvent>,
    event: PeripheralEvent,
    response: oneshot::Receiver<GattStatus>,
) -> Result<(), ReqError> {
    if let Err(err) = sender_tx.send(event).await {
        warn!("Error sending write request event: {}", err);
        return Err(ReqError::Failed);
    }
    match response.await {
        Ok(GattStatus::Success) => Ok(()),
        Ok(status) => Err(req_error(status)),
        Err(_) => Err(ReqError::Failed),
    }
}

/// One BlueZ notify session. BlueZ does not say which device enabled
/// notifications, so the session is reported as a single synthetic central.
async fn on_char_notify(
    sender_tx: mpsc::Sender<PeripheralEvent>,
    sessions: NotifySessions,
    mut notifier: CharacteristicNotifier,
    service_uuid: Uuid,
    characteristic: Uuid,
) {
    let client = Central::new(NOTIFY_SESSION);
    let (payload_tx, mut payload_rx) = mpsc::channel::<Vec<u8>>(NOTIFY_QUEUE_DEPTH);
    // The map holds the only strong sender; a replacing session drops it
    // and this queue closes.
    let own_session = payload_tx.downgrade();
    if let Ok(mut sessions) = sessions.lock() {
        sessions.insert(characteristic, payload_tx);
    }

    if let Err(err) = sender_tx
        .send(PeripheralEvent::DidSubscribeToCharacteristic {
            client: client.clone(),
            service: service_uuid,
            characteristic,
        })
        .await
    {
        warn!("Error sending subscribe event: {}", err);
    }
    debug!("Notify session started on {}", characteristic);

    loop {
        let value = match tokio::time::timeout(STOP_POLL, payload_rx.recv()).await {
            Ok(Some(value)) => value,
            Ok(None) => break,
            Err(_) if notifier.is_stopped() => break,
            Err(_) => continue,
        };
        let outcome = match notifier.notify(value.clone()).await {
            Ok(()) => NotifyOutcome::Delivered,
            Err(err) => NotifyOutcome::Failed(err.to_string()),
        };
        let stopped = !outcome.is_delivered() && notifier.is_stopped();
        if let Err(err) = sender_tx
            .send(PeripheralEvent::DidSendNotification {
                client: client.clone(),
                characteristic,
                value,
                outcome,
            })
            .await
        {
            warn!("Error sending notification outcome: {}", err);
        }
        if stopped {
            break;
        }
    }

    if !release_session(&sessions, characteristic, &own_session) {
        debug!(
            "Notify session on {} was replaced, keeping the subscription",
            characteristic
        );
        return;
    }
    if let Err(err) = sender_tx
        .send(PeripheralEvent::DidUnsubscribeFromCharacteristic {
            client,
            service: service_uuid,
            characteristic,
        })
        .await
    {
        warn!("Error sending unsubscribe event: {}", err);
    }
    debug!("Notify session stopped on {}", characteristic);
}

/// Removes the session entry if it still belongs to `own_session`. Returns
/// false when a newer session has taken the characteristic over.
fn release_session(
    sessions: &NotifySessions,
    characteristic: Uuid,
    own_session: &mpsc::WeakSender<Vec<u8>>,
) -> bool {
    let Some(own) = own_session.upgrade() else {
        return false;
    };
    let Ok(mut sessions) = sessions.lock() else {
        return false;
    };
    match sessions.get(&characteristic) {
        Some(current) if current.same_channel(&own) => {
            sessions.remove(&characteristic);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    fn sessions() -> NotifySessions {
        Arc::new(Mutex::new(HashMap::new()))
    }

    #[test]
    fn ended_session_removes_its_own_entry() {
        let sessions = sessions();
        let characteristic = Uuid::from_u128(0x1102);
        let (tx, _rx) = mpsc::channel::<Vec<u8>>(1);
        let own = tx.downgrade();
        sessions.lock().unwrap().insert(characteristic, tx);

        assert!(release_session(&sessions, characteristic, &own));
        assert!(sessions.lock().unwrap().is_empty());
    }

    #[test]
    fn replaced_session_leaves_the_newer_one_alone() {
        let sessions = sessions();
        let characteristic = Uuid::from_u128(0x1102);
        let (old_tx, _old_rx) = mpsc::channel::<Vec<u8>>(1);
        let old = old_tx.downgrade();
        sessions.lock().unwrap().insert(characteristic, old_tx);

        let (new_tx, _new_rx) = mpsc::channel::<Vec<u8>>(1);
        let newer = new_tx.clone();
        sessions.lock().unwrap().insert(characteristic, new_tx);

        assert!(!release_session(&sessions, characteristic, &old));
        let guard = sessions.lock().unwrap();
        assert!(guard[&characteristic].same_channel(&newer));
    }
}
