mod common;

use common::{sent_counters, server, RecordingPlatform};
use gatt_router::{
    gatt::{
        central::Central, peripheral_event::PeripheralEvent, status::GattStatus,
    },
    notification::SchedulerState,
    peripheral::server::event_channel,
    service::{sdl::MAX_ATTRIBUTE_LENGTH, SdlService, SdlServiceConfig, Service},
    ErrorType, PeripheralConfig, PeripheralServer,
};
use std::time::Duration;
use tokio::{sync::oneshot, time::timeout};
use uuid::Uuid;

fn sdl() -> Vec<Box<dyn Service>> {
    vec![Box::new(SdlService::new(SdlServiceConfig::default()))]
}

fn state(server: &PeripheralServer<RecordingPlatform>) -> Option<SchedulerState> {
    server
        .router()
        .service(&SdlService::service_uuid())?
        .notifications()?
        .state(&SdlService::notification_uuid())
}

fn counter(server: &PeripheralServer<RecordingPlatform>) -> Option<u32> {
    server
        .router()
        .service(&SdlService::service_uuid())?
        .notifications()?
        .scheduler(&SdlService::notification_uuid())
        .map(|s| s.counter())
}

fn subscribe(client: &Central) -> PeripheralEvent {
    PeripheralEvent::DidSubscribeToCharacteristic {
        client: client.clone(),
        service: SdlService::service_uuid(),
        characteristic: SdlService::notification_uuid(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_registers_and_advertises() {
    let (mut server, log) = server();
    server.start(sdl()).await.unwrap();
    server.drain();

    assert!(server.is_powered());
    assert!(server.is_advertising());
    assert_eq!(server.router().len(), 1);

    let log = log.lock().unwrap();
    assert_eq!(log.removed_all, 1);
    assert_eq!(log.registered, vec![SdlService::service_uuid()]);
    let advertised = log.advertised.as_ref().unwrap();
    assert_eq!(advertised.primary_service, SdlService::service_uuid());
    assert_eq!(advertised.local_name, "SdlTester");
    assert!(advertised.connectable);
}

#[tokio::test(start_paused = true)]
async fn test_notification_session_over_callback_queue() {
    let (mut server, log) = server();
    server.start(sdl()).await.unwrap();
    server.drain();

    let a = Central::new("central-a");
    let b = Central::new("central-b");
    server.handle_event(PeripheralEvent::DidConnect { client: a.clone() });
    server.handle_event(PeripheralEvent::DidConnect { client: b.clone() });
    server.handle_event(subscribe(&a));

    assert_eq!(state(&server), Some(SchedulerState::Active));
    assert_eq!(sent_counters(&log), vec![(1, "central-a".to_string())]);

    // Two periods elapse on the paused clock.
    assert!(server.process_next().await);
    assert!(server.process_next().await);
    assert_eq!(
        sent_counters(&log),
        vec![
            (1, "central-a".to_string()),
            (2, "central-a".to_string()),
            (3, "central-a".to_string()),
        ]
    );

    server.handle_event(PeripheralEvent::DidDisconnect { client: a });
    assert_eq!(state(&server), Some(SchedulerState::Idle));

    // A tick of the finished Active period changes nothing.
    server.handle_event(PeripheralEvent::NotificationTick {
        characteristic: SdlService::notification_uuid(),
        epoch: 1,
    });
    assert_eq!(counter(&server), Some(3));
    assert!(timeout(Duration::from_secs(5), server.process_next())
        .await
        .is_err());
    assert_eq!(log.lock().unwrap().notifications.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_before_connect_starts_on_connect() {
    let (mut server, log) = server();
    server.start(sdl()).await.unwrap();
    server.drain();

    let a = Central::new("central-a");
    server.handle_event(subscribe(&a));
    assert_eq!(state(&server), Some(SchedulerState::Idle));
    assert!(sent_counters(&log).is_empty());

    server.handle_event(PeripheralEvent::DidConnect { client: a });
    assert_eq!(state(&server), Some(SchedulerState::Active));
    assert_eq!(sent_counters(&log), vec![(1, "central-a".to_string())]);

    assert!(server.process_next().await);
    assert_eq!(counter(&server), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_resubscribe_continues_counter() {
    let (mut server, log) = server();
    server.start(sdl()).await.unwrap();
    server.drain();

    let a = Central::new("central-a");
    server.handle_event(PeripheralEvent::DidConnect { client: a.clone() });
    server.handle_event(subscribe(&a));
    server.handle_event(PeripheralEvent::DidUnsubscribeFromCharacteristic {
        client: a.clone(),
        service: SdlService::service_uuid(),
        characteristic: SdlService::notification_uuid(),
    });
    assert_eq!(state(&server), Some(SchedulerState::Idle));

    server.handle_event(subscribe(&a));
    assert_eq!(
        sent_counters(&log),
        vec![(1, "central-a".to_string()), (2, "central-a".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_write_and_read_answer_through_responders() {
    let (mut server, _log) = server();
    server.start(sdl()).await.unwrap();
    server.drain();
    let client = Central::new("central-a");

    let (responder, status) = oneshot::channel();
    server.handle_event(PeripheralEvent::DidReceiveWriteRequest {
        client: client.clone(),
        service: SdlService::service_uuid(),
        characteristic: SdlService::response_uuid(),
        value: vec![0; MAX_ATTRIBUTE_LENGTH + 1],
        responder,
    });
    assert_eq!(status.await.unwrap(), GattStatus::InvalidLength);

    let (responder, status) = oneshot::channel();
    server.handle_event(PeripheralEvent::DidReceiveWriteRequest {
        client: client.clone(),
        service: SdlService::service_uuid(),
        characteristic: SdlService::response_uuid(),
        value: b"ok".to_vec(),
        responder,
    });
    assert_eq!(status.await.unwrap(), GattStatus::Success);

    let (responder, value) = oneshot::channel();
    server.handle_event(PeripheralEvent::DidReceiveReadRequest {
        client,
        service: Uuid::nil(),
        characteristic: Uuid::from_u128(0xdead_beef),
        responder,
    });
    assert_eq!(value.await.unwrap(), Err(GattStatus::RequestNotSupported));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_service_is_fatal() {
    let (mut server, log) = server();
    let mut services = sdl();
    services.extend(sdl());

    let err = server.start(services).await.unwrap_err();
    assert_eq!(err.error_type, ErrorType::DuplicateService);
    assert!(err.is_fatal());
    assert!(log.lock().unwrap().advertised.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unpowered_adapter_does_not_start() {
    let config = PeripheralConfig::default();
    let (sender, receiver) = event_channel(&config);
    let platform = RecordingPlatform::unpowered(sender.clone());
    let log = platform.log();
    let mut server = PeripheralServer::new(platform, config, sender, receiver);

    let err = server.start(sdl()).await.unwrap_err();
    assert_eq!(err.error_type, ErrorType::NotPowered);
    assert!(!server.is_powered());
    assert!(log.lock().unwrap().registered.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_advertising() {
    let (mut server, log) = server();
    server.start(sdl()).await.unwrap();
    server.drain();

    server.shutdown().await.unwrap();
    server.drain();
    assert!(!server.is_advertising());
    assert_eq!(log.lock().unwrap().stopped, 1);
}
