//! WebSocket integration tests.
//!
//! Tests for connecting, joining rooms and relaying chat through a real server.

mod fixtures;
use fixtures::{TestServer, wait_until};

use roomcast::{ClientId, HubConfig};
use tokio_tungstenite::tungstenite::{self, http::StatusCode};

#[tokio::test]
async fn test_connect_with_room_joins_it() {
    // テスト項目: room クエリ付きで接続するとルームに参加し、参加者一覧を受け取る
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let mut alice = server.connect("alice", Some("lobby")).await;

    // then (期待する結果):
    let joined = alice.recv_json().await;
    assert_eq!(joined["type"], "room-joined");
    assert_eq!(joined["room_id"], "lobby");
    assert_eq!(joined["participants"][0]["client_id"], "alice");
}

#[tokio::test]
async fn test_chat_broadcast_excludes_sender() {
    // テスト項目: チャットは同じルームの他の参加者にだけ配信される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice", Some("lobby")).await;
    alice.recv_json().await; // room-joined
    let mut bob = server.connect("bob", Some("lobby")).await;
    bob.recv_json().await; // room-joined
    let joined = alice.recv_json().await;
    assert_eq!(joined["type"], "participant-joined");

    // when (操作):
    alice.send_text(r#"{"type":"chat","content":"hello bob"}"#).await;
    bob.send_text("hi alice").await;

    // then (期待する結果):
    let to_bob = bob.recv_json().await;
    assert_eq!(to_bob["type"], "chat");
    assert_eq!(to_bob["client_id"], "alice");
    assert_eq!(to_bob["content"], "hello bob");

    // alice が最初に受け取るのは bob のメッセージであり、自分の送信したメッセージではない
    let to_alice = alice.recv_json().await;
    assert_eq!(to_alice["client_id"], "bob");
    assert_eq!(to_alice["content"], "hi alice");
}

#[tokio::test]
async fn test_join_command_moves_between_rooms() {
    // テスト項目: join コマンドでルームを移動すると元のルームに退出通知が届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice", Some("lobby")).await;
    alice.recv_json().await;
    let mut bob = server.connect("bob", Some("lobby")).await;
    bob.recv_json().await;
    alice.recv_json().await; // participant-joined

    // when (操作):
    bob.send_text(r#"{"type":"join","room_id":"games"}"#).await;

    // then (期待する結果):
    let to_bob = bob.recv_json().await;
    assert_eq!(to_bob["type"], "room-joined");
    assert_eq!(to_bob["room_id"], "games");

    let to_alice = alice.recv_json().await;
    assert_eq!(to_alice["type"], "participant-left");
    assert_eq!(to_alice["client_id"], "bob");
}

#[tokio::test]
async fn test_disconnect_unregisters_and_notifies_room() {
    // テスト項目: 切断したクライアントは登録解除され、ルームに退出通知が届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice", Some("lobby")).await;
    alice.recv_json().await;
    let mut bob = server.connect("bob", Some("lobby")).await;
    bob.recv_json().await;
    alice.recv_json().await; // participant-joined

    // when (操作):
    bob.close().await;

    // then (期待する結果):
    let to_alice = alice.recv_json().await;
    assert_eq!(to_alice["type"], "participant-left");
    assert_eq!(to_alice["client_id"], "bob");

    let bob_id = ClientId::new("bob".to_string()).unwrap();
    let (hub, bob_id) = (&server.hub, &bob_id);
    wait_until(|| async move { hub.get_client(bob_id).await.is_err() }).await;
    assert_eq!(server.hub.client_count().await, 1);
}

#[tokio::test]
async fn test_duplicate_client_id_is_rejected() {
    // テスト項目: 接続中のクライアント ID での接続は 409 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let _alice = server.connect("alice", None).await;

    // when (操作):
    let result = tokio_tungstenite::connect_async(server.ws_url("client_id=alice")).await;

    // then (期待する結果):
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), StatusCode::CONFLICT),
        other => panic!("expected HTTP 409, got {:?}", other.map(|(_, response)| response.status())),
    }
}

#[tokio::test]
async fn test_invalid_client_id_is_rejected() {
    // テスト項目: 長すぎるクライアント ID での接続は 400 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let too_long = "a".repeat(101);

    // when (操作):
    let result = tokio_tungstenite::connect_async(server.ws_url(&format!("client_id={too_long}"))).await;

    // then (期待する結果):
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), StatusCode::BAD_REQUEST),
        other => panic!("expected HTTP 400, got {:?}", other.map(|(_, response)| response.status())),
    }
}

#[tokio::test]
async fn test_rejected_origin_is_forbidden() {
    // テスト項目: オリジン検査で拒否された接続は 403 になる
    // given (前提条件):
    let server = TestServer::start_with(HubConfig::default().with_check_origin(|_| false)).await;

    // when (操作):
    let result = tokio_tungstenite::connect_async(server.ws_url("client_id=alice")).await;

    // then (期待する結果):
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), StatusCode::FORBIDDEN),
        other => panic!("expected HTTP 403, got {:?}", other.map(|(_, response)| response.status())),
    }
    assert_eq!(server.hub.client_count().await, 0);
}

#[tokio::test]
async fn test_server_side_send_reaches_client() {
    // テスト項目: Hub から直接送ったメッセージがクライアントに届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice", None).await;
    let alice_id = ClientId::new("alice".to_string()).unwrap();

    // when (操作):
    server
        .hub
        .send_to_client(&alice_id, bytes_of(r#"{"type":"notice"}"#))
        .await
        .expect("Failed to send");

    // then (期待する結果):
    let message = alice.recv_json().await;
    assert_eq!(message["type"], "notice");
}

#[tokio::test]
async fn test_binary_payload_is_delivered_without_disconnecting() {
    // テスト項目: UTF-8 でないペイロードはバイナリで届き、クライアントは接続されたまま
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice", None).await;
    let alice_id = ClientId::new("alice".to_string()).unwrap();

    // when (操作):
    server
        .hub
        .send_to_client(&alice_id, bytes::Bytes::from_static(&[0xff, 0x00, 0x01]))
        .await
        .expect("Failed to send");

    // then (期待する結果):
    assert_eq!(alice.recv_binary().await, vec![0xff, 0x00, 0x01]);
    assert!(server.hub.get_client(&alice_id).await.is_ok());

    server
        .hub
        .send_to_client(&alice_id, bytes_of(r#"{"type":"notice"}"#))
        .await
        .expect("Failed to send after binary payload");
    assert_eq!(alice.recv_json().await["type"], "notice");
}

fn bytes_of(text: &'static str) -> bytes::Bytes {
    bytes::Bytes::from_static(text.as_bytes())
}
