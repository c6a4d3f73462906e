use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{PullState, PushState, RtspPuller, RtspPusher};
use crate::config::SessionConfig;
use crate::error::{ProtocolStep, SessionError};
use crate::media::MediaIndex;
use crate::route::{ControlEvent, StreamEvent, StreamSubscription};
use crate::rtp::RtpPacket;
use crate::testing::{RecordingRegistry, ScriptedTransport, video_audio_description};
use crate::transport::RtspTransport;

fn config() -> SessionConfig {
    SessionConfig::new("rtsp://127.0.0.1:8554/stream")
}

fn packet(payload_type: u8, sequence: u16) -> RtpPacket {
    RtpPacket::new(
        payload_type,
        sequence,
        0,
        0xABCD,
        Bytes::from_static(b"\x00\x01"),
    )
}

fn subscription(events: mpsc::Receiver<StreamEvent>) -> StreamSubscription {
    StreamSubscription {
        description: video_audio_description(),
        video_media: Some(MediaIndex(0)),
        audio_media: Some(MediaIndex(1)),
        events,
    }
}

async fn wait_for_running<F, Fut>(state: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !state().await {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("session never reached running state");
}

#[tokio::test]
async fn test_pull_lifecycle_call_order() {
    let transport = Arc::new(ScriptedTransport::with_description(
        video_audio_description(),
    ));
    transport.close().await;
    let registry = Arc::new(RecordingRegistry::new());
    let mut cfg = config();
    cfg.send_options = true;

    let puller = RtspPuller::new(cfg, Arc::clone(&transport), registry.clone());
    assert_eq!(puller.state().await, PullState::Init);

    puller.run().await.unwrap();

    assert_eq!(
        transport.calls(),
        vec![
            "connect",
            "options",
            "describe",
            "setup media#0",
            "setup media#1",
            "play"
        ]
    );
    assert!(transport.has_handler());
    assert_eq!(puller.state().await, PullState::Closed);

    let tracks = puller.tracks().await.unwrap();
    assert!(tracks.has_video());
    assert!(tracks.has_audio());
}

#[tokio::test]
async fn test_pull_skips_probe_by_default() {
    let transport = Arc::new(ScriptedTransport::with_description(
        video_audio_description(),
    ));
    transport.close().await;
    let registry = Arc::new(RecordingRegistry::new());

    let puller = RtspPuller::new(config(), Arc::clone(&transport), registry);
    puller.run().await.unwrap();

    assert!(!transport.calls().contains(&"options".to_string()));
}

#[tokio::test]
async fn test_pull_invalid_url_is_terminal() {
    let transport = Arc::new(ScriptedTransport::new());
    let registry = Arc::new(RecordingRegistry::new());

    let puller = RtspPuller::new(
        SessionConfig::new("not a url"),
        Arc::clone(&transport),
        registry,
    );
    let err = puller.run().await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidUrl { .. }));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_pull_connect_failure_is_terminal() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.fail_connect();
    let registry = Arc::new(RecordingRegistry::new());

    let puller = RtspPuller::new(config(), Arc::clone(&transport), registry.clone());
    let err = puller.run().await.unwrap_err();

    assert!(matches!(err, SessionError::ConnectionFailed { .. }));
    // No track objects exist when the connection never came up
    assert_eq!(registry.created(), 0);
    assert_eq!(transport.calls(), vec!["connect"]);
}

#[tokio::test]
async fn test_pull_describe_failure_is_terminal() {
    let transport = Arc::new(ScriptedTransport::with_description(
        video_audio_description(),
    ));
    transport.fail_at(ProtocolStep::Describe);
    let registry = Arc::new(RecordingRegistry::new());

    let puller = RtspPuller::new(config(), Arc::clone(&transport), registry.clone());
    let err = puller.run().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol {
            step: ProtocolStep::Describe,
            ..
        }
    ));
    assert_eq!(transport.calls(), vec!["connect", "describe"]);
    assert_eq!(registry.created(), 0);
    assert_eq!(puller.state().await, PullState::Closed);
}

#[tokio::test]
async fn test_pull_play_failure_is_terminal() {
    let transport = Arc::new(ScriptedTransport::with_description(
        video_audio_description(),
    ));
    transport.fail_at(ProtocolStep::Play);
    let registry = Arc::new(RecordingRegistry::new());

    let puller = RtspPuller::new(config(), Arc::clone(&transport), registry);
    let err = puller.run().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol {
            step: ProtocolStep::Play,
            ..
        }
    ));
}

#[tokio::test]
async fn test_pull_routes_inbound_packets_to_stable_tracks() {
    let transport = Arc::new(ScriptedTransport::with_description(
        video_audio_description(),
    ));
    let registry = Arc::new(RecordingRegistry::new());
    let puller = Arc::new(RtspPuller::new(
        config(),
        Arc::clone(&transport),
        registry.clone(),
    ));

    let task = tokio::spawn({
        let puller = Arc::clone(&puller);
        async move { puller.run().await }
    });
    wait_for_running(|| async { puller.state().await.is_running() }).await;

    transport.deliver(MediaIndex(0), &packet(96, 1));
    transport.deliver(MediaIndex(0), &packet(96, 2));
    transport.deliver(MediaIndex(1), &packet(97, 1));
    // A media index negotiation never saw is dropped, not an error
    transport.deliver(MediaIndex(9), &packet(98, 1));

    puller.close().await;
    task.await.unwrap().unwrap();

    let tracks = registry.tracks();
    assert_eq!(tracks[0].packets().len(), 2);
    assert_eq!(tracks[1].packets().len(), 1);
}

#[tokio::test]
async fn test_pull_close_is_idempotent() {
    let transport = Arc::new(ScriptedTransport::with_description(
        video_audio_description(),
    ));
    let registry = Arc::new(RecordingRegistry::new());
    let puller = Arc::new(RtspPuller::new(
        config(),
        Arc::clone(&transport),
        registry.clone(),
    ));

    let task = tokio::spawn({
        let puller = Arc::clone(&puller);
        async move { puller.run().await }
    });
    wait_for_running(|| async { puller.state().await.is_running() }).await;

    puller.close().await;
    puller.close().await;
    task.await.unwrap().unwrap();

    // No further packets are forwarded after close
    transport.deliver(MediaIndex(0), &packet(96, 3));
    assert!(registry.tracks()[0].packets().is_empty());
}

#[tokio::test]
async fn test_push_lifecycle_call_order() {
    let (tx, rx) = mpsc::channel(8);
    let transport = Arc::new(ScriptedTransport::new());
    let mut cfg = config();
    cfg.send_options = true;

    let pusher = RtspPusher::new(cfg, Arc::clone(&transport), subscription(rx));
    assert_eq!(pusher.state().await, PushState::Init);

    drop(tx);
    pusher.run().await.unwrap();

    assert_eq!(
        transport.calls(),
        vec![
            "connect",
            "options",
            "announce",
            "setup media#0",
            "setup media#1",
            "record"
        ]
    );
    assert!(transport.announced().is_some());
    assert_eq!(pusher.state().await, PushState::Closed);
}

#[tokio::test]
async fn test_push_relays_events_to_bound_media() {
    let (tx, rx) = mpsc::channel(8);
    let transport = Arc::new(ScriptedTransport::new());
    let controls = Arc::new(Mutex::new(Vec::new()));

    let pusher = RtspPusher::new(config(), Arc::clone(&transport), subscription(rx))
        .with_control_handler(Box::new({
            let controls = Arc::clone(&controls);
            move |event| controls.lock().unwrap().push(event)
        }));

    let video = packet(96, 1);
    let audio = packet(97, 1);
    tx.send(StreamEvent::VideoRtp(video.clone())).await.unwrap();
    tx.send(StreamEvent::AudioRtp(audio.clone())).await.unwrap();
    tx.send(StreamEvent::Control(ControlEvent::Pause))
        .await
        .unwrap();
    drop(tx);

    pusher.run().await.unwrap();

    assert_eq!(
        transport.sent(),
        vec![(MediaIndex(0), video), (MediaIndex(1), audio)]
    );
    assert_eq!(*controls.lock().unwrap(), vec![ControlEvent::Pause]);
}

#[tokio::test]
async fn test_push_announce_failure_is_terminal() {
    let (_tx, rx) = mpsc::channel(8);
    let transport = Arc::new(ScriptedTransport::new());
    transport.fail_at(ProtocolStep::Announce);

    let pusher = RtspPusher::new(config(), Arc::clone(&transport), subscription(rx));
    let err = pusher.run().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Protocol {
            step: ProtocolStep::Announce,
            ..
        }
    ));
    assert_eq!(transport.calls(), vec!["connect", "announce"]);
}

#[tokio::test]
async fn test_push_close_unblocks_run() {
    let (tx, rx) = mpsc::channel(8);
    let transport = Arc::new(ScriptedTransport::new());
    let pusher = Arc::new(RtspPusher::new(
        config(),
        Arc::clone(&transport),
        subscription(rx),
    ));

    let task = tokio::spawn({
        let pusher = Arc::clone(&pusher);
        async move { pusher.run().await }
    });
    wait_for_running(|| async { pusher.state().await.is_running() }).await;

    pusher.close().await;
    task.await.unwrap().unwrap();
    drop(tx);
}

#[tokio::test]
async fn test_push_run_twice_is_rejected() {
    let (tx, rx) = mpsc::channel(8);
    let transport = Arc::new(ScriptedTransport::new());
    let pusher = RtspPusher::new(config(), Arc::clone(&transport), subscription(rx));

    drop(tx);
    pusher.run().await.unwrap();

    let err = pusher.run().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidState { .. }));
}
