// Tests for the WebSocket transport adapter
//
// Each test spins up a scripted loopback server with tokio-tungstenite and
// dials it through the production connector.

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use voicelink::transport::TransportEvent;
use voicelink::{TransportConnector, TransportError, WsConnector};

type ServerSocket = WebSocketStream<TcpStream>;

/// Bind a loopback listener, accept exactly one WebSocket connection, and
/// hand it to the scripted handler.
async fn ws_server<F, Fut>(handler: F) -> (String, JoinHandle<()>)
where
    F: FnOnce(ServerSocket) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        handler(ws).await;
    });

    (format!("ws://{}/voice-stream", addr), handle)
}

async fn next_event(events: &mut mpsc::Receiver<TransportEvent>) -> TransportEvent {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for a transport event")
        .expect("event channel closed without a terminal event")
}

#[tokio::test]
async fn delivers_chunks_in_arrival_order_then_reports_closed() {
    let (url, server) = ws_server(|mut ws| async move {
        for payload in [b"one".to_vec(), b"two".to_vec(), b"three".to_vec()] {
            ws.send(Message::Binary(payload)).await.unwrap();
        }
        ws.close(None).await.unwrap();
    })
    .await;

    let mut transport = WsConnector.connect(&url).await.unwrap();

    for expected in [b"one".to_vec(), b"two".to_vec(), b"three".to_vec()] {
        match next_event(&mut transport.events).await {
            TransportEvent::Chunk(payload) => assert_eq!(payload, expected),
            other => panic!("expected chunk, got {:?}", other),
        }
    }

    assert!(matches!(
        next_event(&mut transport.events).await,
        TransportEvent::Closed
    ));
    assert!(!transport.sender.is_ready(), "closed link must refuse frames");

    server.await.unwrap();
}

#[tokio::test]
async fn outbound_frames_arrive_in_send_order() {
    let (received_tx, mut received_rx) = mpsc::unbounded_channel();

    let (url, server) = ws_server(move |mut ws| async move {
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Binary(payload) => {
                    let _ = received_tx.send(payload);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    })
    .await;

    let transport = WsConnector.connect(&url).await.unwrap();

    transport.sender.send(b"frame-1".to_vec());
    transport.sender.send(b"frame-2".to_vec());

    let first = timeout(Duration::from_secs(2), received_rx.recv())
        .await
        .unwrap()
        .unwrap();
    let second = timeout(Duration::from_secs(2), received_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, b"frame-1".to_vec());
    assert_eq!(second, b"frame-2".to_vec());

    // A polite close reaches the server and ends its read loop.
    transport.sender.close();
    timeout(Duration::from_secs(2), server)
        .await
        .expect("server did not observe the close")
        .unwrap();
}

#[tokio::test]
async fn send_after_remote_close_is_dropped_silently() {
    let (url, server) = ws_server(|mut ws| async move {
        ws.close(None).await.unwrap();
    })
    .await;

    let mut transport = WsConnector.connect(&url).await.unwrap();

    assert!(matches!(
        next_event(&mut transport.events).await,
        TransportEvent::Closed
    ));

    transport.sender.send(b"too-late".to_vec());
    assert_eq!(transport.sender.dropped_frames(), 1);

    server.await.unwrap();
}

#[tokio::test]
async fn text_messages_are_ignored() {
    let (url, server) = ws_server(|mut ws| async move {
        ws.send(Message::Text("not audio".to_string())).await.unwrap();
        ws.send(Message::Binary(b"audio".to_vec())).await.unwrap();
        ws.close(None).await.unwrap();
    })
    .await;

    let mut transport = WsConnector.connect(&url).await.unwrap();

    // The text frame produces no event at all.
    match next_event(&mut transport.events).await {
        TransportEvent::Chunk(payload) => assert_eq!(payload, b"audio".to_vec()),
        other => panic!("expected the binary chunk, got {:?}", other),
    }
    assert!(matches!(
        next_event(&mut transport.events).await,
        TransportEvent::Closed
    ));

    server.await.unwrap();
}

#[tokio::test]
async fn refused_connection_surfaces_a_connect_error() {
    // Nothing listens on the discard port.
    let result = WsConnector.connect("ws://127.0.0.1:1/voice-stream").await;

    match result {
        Err(TransportError::Connect(_)) => {}
        Err(other) => panic!("expected a connect error, got {:?}", other),
        Ok(_) => panic!("connect to a dead port must fail"),
    }
}
