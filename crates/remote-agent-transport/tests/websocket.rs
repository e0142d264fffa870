#![cfg(feature = "websocket")]

use std::{sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use remote_agent_core::{AgentConfig, Frame};
use remote_agent_transport::{ConnectionManager, WebSocketConnector};
use tokio::{net::TcpListener, sync::oneshot};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        Message,
        handshake::server::{ErrorResponse, Request, Response},
    },
};

#[tokio::test]
async fn test_websocket_connector_exchanges_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (handshake_tx, handshake_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_hdr_async(tcp, move |req: &Request, resp: Response| {
            let client = req
                .headers()
                .get("x-client")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let _ = handshake_tx.send((req.uri().path().to_owned(), client));
            Ok::<_, ErrorResponse>(resp)
        })
        .await
        .unwrap();

        ws.send(Message::text(r#"{"command":"device-info"}"#.to_owned()))
            .await
            .unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        assert!(reply.is_binary());
        ws.close(None).await.unwrap();
        reply.into_data()
    });

    let config = AgentConfig::parse(&format!("http://{addr}"), "agent-ws").unwrap();
    let connector = WebSocketConnector::from_config(&config).unwrap();
    let mut manager = ConnectionManager::new(Arc::new(connector), Duration::from_millis(10), 4);
    manager.connect().await;

    let (path, client) = handshake_rx.await.unwrap();
    assert_eq!(path, "/client");
    assert_eq!(client.as_deref(), Some("agent-ws"));

    let raw = manager.read().await.unwrap();
    assert_eq!(Frame::decode_request(&raw).unwrap().command, "device-info");

    manager
        .outbound()
        .send(Frame::response("agent-ws", "ok"))
        .await
        .unwrap();
    let data = server.await.unwrap();
    assert_eq!(Frame::decode(&data).unwrap().response_text(), "ok");

    assert!(manager.read().await.is_err());
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn test_unreachable_controller_keeps_retrying() {
    // Bind then drop so the port is known to refuse connections.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let config = AgentConfig::parse(&format!("http://{addr}"), "agent-ws").unwrap();
    let connector = WebSocketConnector::from_config(&config).unwrap();
    let mut manager = ConnectionManager::new(Arc::new(connector), Duration::from_millis(10), 4);

    let attempt = tokio::time::timeout(Duration::from_millis(200), manager.connect()).await;
    assert!(attempt.is_err(), "connect must not give up");
    assert!(!manager.is_connected());
}
