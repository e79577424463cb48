//! Integration tests for the WebSocket transport against a real client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use qiba_transport::{Connection, Transport, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on an OS-assigned port and connects one client to it.
    async fn connected_pair() -> (qiba_transport::WebSocketConnection, Client) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_send_json_arrives_as_text_frame() {
        let (conn, mut client) = connected_pair().await;

        conn.send(br#"{"seq":1}"#).await.expect("send should succeed");

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"seq":1}"#);
    }

    #[tokio::test]
    async fn test_send_non_utf8_arrives_as_binary_frame() {
        let (conn, mut client) = connected_pair().await;

        conn.send(&[0xff, 0x00]).await.unwrap();

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0xff, 0x00]);
    }

    #[tokio::test]
    async fn test_recv_accepts_text_and_binary() {
        let (conn, mut client) = connected_pair().await;

        client.send(Message::text("hello".to_owned())).await.unwrap();
        client.send(Message::binary(vec![1, 2, 3])).await.unwrap();

        assert_eq!(conn.recv().await.unwrap().unwrap(), b"hello");
        assert_eq!(conn.recv().await.unwrap().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let (conn, mut client) = connected_pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let (a, _ca) = connected_pair().await;
        let (b, _cb) = connected_pair().await;
        assert_ne!(a.id(), b.id());
        assert!(a.peer_addr().ip().is_loopback());
    }
}
