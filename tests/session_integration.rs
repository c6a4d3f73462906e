//! End-to-end pull and push sessions over the scripted transport

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use rtsp_bridge::media::{
    FormatDescriptor, MediaDescription, MediaKind, OtherFormat,
};
use rtsp_bridge::testing::{
    RecordingRegistry, ScriptedTransport, aac_media, h264_media, video_audio_description,
};
use rtsp_bridge::{
    MediaIndex, RtpPacket, RtspPuller, RtspPusher, SessionConfig, SessionDescription, StreamEvent,
    StreamSubscription,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn packet(payload_type: u8, sequence: u16) -> RtpPacket {
    RtpPacket::new(
        payload_type,
        sequence,
        3000,
        0x0BAD_CAFE,
        Bytes::from_static(b"\x01\x02\x03\x04"),
    )
}

async fn wait_until_running(transport: &ScriptedTransport) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !transport.has_handler() || !transport.calls().contains(&"play".to_string()) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("pull session never started playing");
}

#[tokio::test]
async fn full_pull_session() {
    init_tracing();
    let transport = Arc::new(ScriptedTransport::with_description(
        video_audio_description(),
    ));
    let registry = Arc::new(RecordingRegistry::new());
    let config = SessionConfig::builder()
        .remote_url("rtsp://camera.local:8554/live")
        .send_options(true)
        .build();

    let puller = Arc::new(RtspPuller::new(
        config,
        Arc::clone(&transport),
        registry.clone(),
    ));
    let session = tokio::spawn({
        let puller = Arc::clone(&puller);
        async move { puller.run().await }
    });

    wait_until_running(&transport).await;

    // One video and one audio track, each seeded out of band
    assert_eq!(registry.created(), 2);
    let video = &registry.tracks()[0];
    let audio = &registry.tracks()[1];
    assert_eq!(video.configs().len(), 2); // SPS and PPS
    assert_eq!(audio.configs()[0][..2], [0xAF, 0x00]);

    // Inbound packets reach the tracks bound at negotiation
    transport.deliver(MediaIndex(0), &packet(96, 1));
    transport.deliver(MediaIndex(1), &packet(97, 1));
    transport.deliver(MediaIndex(0), &packet(96, 2));

    puller.close().await;
    session.await.unwrap().unwrap();

    assert_eq!(video.packets().len(), 2);
    assert_eq!(audio.packets().len(), 1);
}

#[tokio::test]
async fn pull_session_with_partially_recognized_media() {
    init_tracing();
    let description = SessionDescription {
        base_url: None,
        medias: vec![
            h264_media(),
            MediaDescription {
                kind: MediaKind::Other,
                formats: vec![FormatDescriptor::Other(OtherFormat {
                    payload_type: 101,
                    rtp_map: "telephone-event/8000".to_string(),
                    clock_rate: 8000,
                })],
            },
            aac_media(),
        ],
    };

    let transport = Arc::new(ScriptedTransport::with_description(description));
    let registry = Arc::new(RecordingRegistry::new());
    let puller = Arc::new(RtspPuller::new(
        SessionConfig::new("rtsp://host/stream"),
        Arc::clone(&transport),
        registry.clone(),
    ));
    let session = tokio::spawn({
        let puller = Arc::clone(&puller);
        async move { puller.run().await }
    });

    wait_until_running(&transport).await;

    // Only the mapped media were set up
    let calls = transport.calls();
    assert!(calls.contains(&"setup media#0".to_string()));
    assert!(!calls.contains(&"setup media#1".to_string()));
    assert!(calls.contains(&"setup media#2".to_string()));

    // Packets for the rejected media are dropped without error
    transport.deliver(MediaIndex(1), &packet(101, 1));
    transport.deliver(MediaIndex(0), &packet(96, 1));

    puller.close().await;
    session.await.unwrap().unwrap();

    assert_eq!(registry.created(), 2);
    assert_eq!(registry.tracks()[0].packets().len(), 1);
    assert!(registry.tracks()[1].packets().is_empty());
}

#[tokio::test]
async fn full_push_session() {
    init_tracing();
    let (events, rx) = mpsc::channel(16);
    let transport = Arc::new(ScriptedTransport::new());
    let subscription = StreamSubscription {
        description: video_audio_description(),
        video_media: Some(MediaIndex(0)),
        audio_media: Some(MediaIndex(1)),
        events: rx,
    };

    let pusher = Arc::new(RtspPusher::new(
        SessionConfig::new("rtsp://relay.example/push"),
        Arc::clone(&transport),
        subscription,
    ));
    let session = tokio::spawn({
        let pusher = Arc::clone(&pusher);
        async move { pusher.run().await }
    });

    let video = packet(96, 10);
    let audio = packet(97, 20);
    events
        .send(StreamEvent::VideoRtp(video.clone()))
        .await
        .unwrap();
    events
        .send(StreamEvent::AudioRtp(audio.clone()))
        .await
        .unwrap();
    drop(events);

    session.await.unwrap().unwrap();

    // The upstream description was announced, every media set up
    assert_eq!(transport.announced().unwrap().medias.len(), 2);
    let calls = transport.calls();
    assert!(calls.contains(&"announce".to_string()));
    assert!(calls.contains(&"record".to_string()));

    assert_eq!(
        transport.sent(),
        vec![(MediaIndex(0), video), (MediaIndex(1), audio)]
    );
}
