//! Exchange protocol tests against a local HTTP server

mod common;

use common::{CannedReply, MockServer, ScriptedEvidence};
use murmur::{Error, ExchangeClient, ExchangeReply, HttpConfig};

fn test_http_config() -> HttpConfig {
    HttpConfig::default()
}

#[tokio::test]
async fn audio_reply_passes_through_untouched() {
    let server = MockServer::spawn(vec![CannedReply::Audio(vec![0xFF, 0xFB, 0x90, 0x00])]).await;
    let client = ExchangeClient::new(&server.url, &test_http_config()).unwrap();

    let reply = client.send(b"RIFF-payload", None).await.unwrap();

    assert_eq!(reply, ExchangeReply::AudioReply(vec![0xFF, 0xFB, 0x90, 0x00]));
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].had_audio);
    assert!(!requests[0].had_image);
}

#[tokio::test]
async fn evidence_request_resends_with_image() {
    let server = MockServer::spawn(vec![
        CannedReply::NeedImage,
        CannedReply::Audio(b"reply-mp3".to_vec()),
    ])
    .await;
    let client = ExchangeClient::new(&server.url, &test_http_config()).unwrap();
    let (mut evidence, captures) = ScriptedEvidence::always();

    let mut notified = 0;
    let reply = client
        .run(b"RIFF-payload", None, &mut evidence, || notified += 1)
        .await
        .unwrap();

    assert_eq!(reply, b"reply-mp3");
    assert_eq!(notified, 1);
    assert_eq!(*captures.lock().unwrap(), 1);

    // Exactly two outbound requests: bare, then with the image attached
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].had_image);
    assert!(requests[1].had_image);
    assert!(requests[1].had_audio);
}

#[tokio::test]
async fn second_evidence_request_fails_without_a_third_round_trip() {
    let server = MockServer::spawn(vec![CannedReply::NeedImage, CannedReply::NeedImage]).await;
    let client = ExchangeClient::new(&server.url, &test_http_config()).unwrap();
    let (mut evidence, _captures) = ScriptedEvidence::always();

    let result = client.run(b"RIFF-payload", None, &mut evidence, || {}).await;

    assert!(matches!(result, Err(Error::Protocol(_))));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn evidence_request_without_camera_fails_before_resending() {
    let server = MockServer::spawn(vec![CannedReply::NeedImage]).await;
    let client = ExchangeClient::new(&server.url, &test_http_config()).unwrap();
    let (mut evidence, _captures) = ScriptedEvidence::never();

    let result = client.run(b"RIFF-payload", None, &mut evidence, || {}).await;

    assert!(matches!(result, Err(Error::EvidenceUnavailable(_))));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn initial_image_satisfies_the_evidence_request_protocol() {
    // When an image was already attached up-front and the service still
    // asks for evidence, the retry recaptures rather than reusing it
    let server = MockServer::spawn(vec![
        CannedReply::NeedImage,
        CannedReply::Audio(b"ok".to_vec()),
    ])
    .await;
    let client = ExchangeClient::new(&server.url, &test_http_config()).unwrap();
    let (mut evidence, captures) = ScriptedEvidence::always();

    let reply = client
        .run(b"RIFF-payload", Some(common::jpeg_bytes()), &mut evidence, || {})
        .await
        .unwrap();

    assert_eq!(reply, b"ok");
    assert_eq!(*captures.lock().unwrap(), 1);
    let requests = server.requests();
    assert!(requests[0].had_image);
    assert!(requests[1].had_image);
}

#[tokio::test]
async fn unreachable_service_is_a_transport_failure() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/process", listener.local_addr().unwrap());
    drop(listener);

    let client = ExchangeClient::new(&url, &test_http_config()).unwrap();
    let result = client.send(b"RIFF-payload", None).await;

    assert!(matches!(result, Err(Error::Transport(_))));
}
