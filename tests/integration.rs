//! Integration tests for rsipc, driven by a fake desktop app

use futures_util::future::join_all;
use rsipc::protocol::frame::{read_frame, write_frame, DEFAULT_MAX_FRAME_LEN};
use rsipc::protocol::Frame;
use rsipc::transports::{IpcTransport, Transport};
use rsipc::{
    Activity, Client, ClientBuilder, ClientError, ClientState, CloseCode, Command, Config,
    DispatchEvent, Event, IpcOpcode, Payload, RpcErrorCode, TransportKind,
};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

const CLIENT_ID: &str = "192741864418312192";

/// The desktop-app end of an in-memory connection
struct FakeApp {
    stream: DuplexStream,
}

impl FakeApp {
    async fn recv(&mut self) -> Frame {
        read_frame(&mut self.stream, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap()
    }

    async fn recv_json(&mut self) -> Value {
        let frame = self.recv().await;
        assert_eq!(frame.opcode, IpcOpcode::Frame);
        serde_json::from_slice(&frame.payload).unwrap()
    }

    async fn send(&mut self, opcode: IpcOpcode, body: Value) {
        let frame = Frame::new(opcode, serde_json::to_vec(&body).unwrap());
        write_frame(&mut self.stream, &frame).await.unwrap();
    }

    async fn ping(&mut self, payload: &[u8]) {
        let frame = Frame::new(IpcOpcode::Ping, payload.to_vec());
        write_frame(&mut self.stream, &frame).await.unwrap();
    }

    async fn reply(&mut self, request: &Value, data: Value) {
        self.send(
            IpcOpcode::Frame,
            json!({
                "cmd": request["cmd"],
                "data": data,
                "evt": null,
                "nonce": request["nonce"],
            }),
        )
        .await;
    }

    async fn dispatch(&mut self, evt: &str, data: Value) {
        self.send(
            IpcOpcode::Frame,
            json!({ "cmd": "DISPATCH", "evt": evt, "data": data, "nonce": null }),
        )
        .await;
    }

    /// Read the handshake and answer with READY
    async fn accept(&mut self) {
        let frame = self.recv().await;
        assert_eq!(frame.opcode, IpcOpcode::Handshake);
        let handshake: Value = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(handshake, json!({ "v": 1, "client_id": CLIENT_ID }));

        self.dispatch("READY", ready_data()).await;
    }
}

fn ready_data() -> Value {
    json!({
        "v": 1,
        "config": {
            "cdn_host": "cdn.discordapp.com",
            "api_endpoint": "//discord.com/api",
            "environment": "production"
        },
        "user": {
            "id": "53908232506183680",
            "username": "Mason",
            "discriminator": "0",
            "avatar": null
        }
    })
}

fn pair() -> (Transport, FakeApp) {
    let (client, app) = tokio::io::duplex(64 * 1024);
    (
        IpcTransport::from_stream(client, DEFAULT_MAX_FRAME_LEN),
        FakeApp { stream: app },
    )
}

async fn connect(builder: ClientBuilder) -> (Client, FakeApp) {
    let (transport, mut app) = pair();
    let (client, ()) = tokio::join!(builder.connect_with(transport), app.accept());
    (client.unwrap(), app)
}

async fn connect_default() -> (Client, FakeApp) {
    connect(ClientBuilder::new(Config::new(CLIENT_ID))).await
}

#[tokio::test]
async fn test_handshake_populates_session_and_callback() {
    let (tx, mut rx) = mpsc::unbounded_channel::<DispatchEvent>();
    let builder = ClientBuilder::new(Config::new(CLIENT_ID)).on_event(move |event| {
        let _ = tx.send(event);
    });
    let (client, _app) = connect(builder).await;

    assert_eq!(client.state(), ClientState::Ready);
    assert_eq!(client.user().username, "Mason");
    assert_eq!(client.server_config().cdn_host, "cdn.discordapp.com");
    assert_eq!(client.version(), 1);
    assert_eq!(client.transport_name(), "IPC");

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event, Event::Ready);
    assert!(matches!(event.payload, Payload::Ready(ref ready) if ready.user.id == "53908232506183680"));
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn test_concurrent_sends_answered_out_of_order() {
    let (client, mut app) = connect_default().await;

    let sends = join_all((0..10).map(|i| {
        let client = &client;
        async move {
            let guild: rsipc::models::Guild = client
                .request(Command::GetGuild, json!({ "guild_id": i.to_string() }))
                .await
                .unwrap();
            (i, guild)
        }
    }));

    let app_side = async {
        let mut requests = Vec::new();
        for _ in 0..10 {
            requests.push(app.recv_json().await);
        }
        for request in requests.iter().rev() {
            let id = request["args"]["guild_id"].as_str().unwrap().to_string();
            app.reply(
                request,
                json!({ "id": id, "name": format!("Guild {}", id), "icon_url": null }),
            )
            .await;
        }
        requests
    };

    let (results, requests) = tokio::join!(sends, app_side);

    let mut nonces: Vec<_> = requests
        .iter()
        .map(|r| r["nonce"].as_str().unwrap().to_string())
        .collect();
    nonces.sort();
    nonces.dedup();
    assert_eq!(nonces.len(), 10);

    for (i, guild) in results {
        assert_eq!(guild.id, i.to_string());
        assert_eq!(guild.name, format!("Guild {}", i));
    }
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn test_error_response_only_fails_its_request() {
    let (client, mut app) = connect_default().await;

    let guild = client.get_guild("404");
    let guilds = client.get_guilds();

    let app_side = async {
        let first = app.recv_json().await;
        let second = app.recv_json().await;
        let (failing, ok) = if first["cmd"] == "GET_GUILD" {
            (first, second)
        } else {
            (second, first)
        };
        app.send(
            IpcOpcode::Frame,
            json!({
                "cmd": "GET_GUILD",
                "evt": "ERROR",
                "data": { "code": 4003, "message": "Invalid guild" },
                "nonce": failing["nonce"],
            }),
        )
        .await;
        app.reply(&ok, json!({ "guilds": [{ "id": "1", "name": "One" }] }))
            .await;
    };

    let (guild, guilds, ()) = tokio::join!(guild, guilds, app_side);

    match guild {
        Err(ClientError::Rpc { code, message }) => {
            assert_eq!(code, 4003);
            assert_eq!(message, "Invalid guild");
        }
        other => panic!("expected RPC error, got {:?}", other),
    }
    let guilds = guilds.unwrap();
    assert_eq!(guilds.guilds.len(), 1);
    assert_eq!(guilds.guilds[0].name, "One");
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_ping_answered_with_single_pong() {
    let (client, mut app) = connect_default().await;

    app.ping(b"heartbeat-1").await;
    let pong = app.recv().await;
    assert_eq!(pong.opcode, IpcOpcode::Pong);
    assert_eq!(pong.payload, b"heartbeat-1");

    // Next frame must be the request, not a second pong
    let send = client.get_guilds();
    let app_side = async {
        let request = app.recv_json().await;
        assert_eq!(request["cmd"], "GET_GUILDS");
        app.reply(&request, json!({ "guilds": [] })).await;
    };
    let (guilds, ()) = tokio::join!(send, app_side);
    assert!(guilds.unwrap().guilds.is_empty());
}

#[tokio::test]
async fn test_close_fails_pending_requests() {
    let (client, mut app) = connect_default().await;

    let sends = join_all((0..3).map(|_| client.send(Command::GetGuilds, json!({}))));
    let app_side = async {
        for _ in 0..3 {
            app.recv_json().await;
        }
        app.send(
            IpcOpcode::Close,
            json!({ "code": 1000, "message": "Goodbye" }),
        )
        .await;
    };

    let (results, ()) = tokio::join!(sends, app_side);
    for result in results {
        assert!(matches!(result, Err(ClientError::Closed)));
    }

    client.closed().await;
    assert_eq!(client.state(), ClientState::Closed);
    assert!(matches!(
        client.send(Command::GetGuilds, json!({})).await,
        Err(ClientError::Closed)
    ));
}

#[tokio::test]
async fn test_unknown_event_skipped() {
    let (tx, mut rx) = mpsc::unbounded_channel::<DispatchEvent>();
    let builder = ClientBuilder::new(Config::new(CLIENT_ID)).on_event(move |event| {
        let _ = tx.send(event);
    });
    let (client, mut app) = connect(builder).await;
    assert_eq!(rx.recv().await.unwrap().event, Event::Ready);

    app.dispatch("SOMETHING_NEW", json!({ "x": 1 })).await;
    app.dispatch(
        "GUILD_STATUS",
        json!({ "guild": { "id": "7", "name": "Seven", "icon_url": null }, "online": 3 }),
    )
    .await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event, Event::GuildStatus);
    match event.payload {
        Payload::GuildStatus(status) => {
            assert_eq!(status.guild.id, "7");
            assert_eq!(status.online, 3);
        }
        other => panic!("unexpected payload {:?}", other),
    }
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_subscribe_sets_event() {
    let (client, mut app) = connect_default().await;

    let subscribe = client.subscribe(Event::GuildStatus, json!({ "guild_id": "7" }));
    let app_side = async {
        let request = app.recv_json().await;
        assert_eq!(request["cmd"], "SUBSCRIBE");
        assert_eq!(request["evt"], "GUILD_STATUS");
        assert_eq!(request["args"]["guild_id"], "7");
        app.reply(&request, json!({ "evt": "GUILD_STATUS" })).await;
    };

    let (subscription, ()) = tokio::join!(subscribe, app_side);
    assert_eq!(subscription.unwrap().evt, "GUILD_STATUS");
}

#[tokio::test]
async fn test_set_and_clear_activity() {
    let (client, mut app) = connect_default().await;

    let activity = Activity {
        name: Some("Testing".to_string()),
        state: Some("In a match".to_string()),
        ..Default::default()
    };
    let set = client.set_activity(activity);
    let app_side = async {
        let request = app.recv_json().await;
        assert_eq!(request["cmd"], "SET_ACTIVITY");
        assert_eq!(request["args"]["pid"], std::process::id());
        assert_eq!(request["args"]["activity"]["state"], "In a match");
        let echo = request["args"]["activity"].clone();
        app.reply(&request, echo).await;
    };
    let (echoed, ()) = tokio::join!(set, app_side);
    assert_eq!(
        echoed.unwrap().and_then(|a| a.name),
        Some("Testing".to_string())
    );

    let clear = client.clear_activity();
    let app_side = async {
        let request = app.recv_json().await;
        assert!(request["args"].get("activity").is_none());
        app.reply(&request, Value::Null).await;
    };
    let (cleared, ()) = tokio::join!(clear, app_side);
    cleared.unwrap();
}

#[tokio::test]
async fn test_leave_voice_channel_returns_none() {
    let (client, mut app) = connect_default().await;

    let leave = client.select_voice_channel(None, Default::default());
    let app_side = async {
        let request = app.recv_json().await;
        assert_eq!(request["args"], json!({ "channel_id": null }));
        app.reply(&request, Value::Null).await;
    };
    let (left, ()) = tokio::join!(leave, app_side);
    assert_eq!(left.unwrap(), None);
}

#[tokio::test]
async fn test_handshake_timeout() {
    let (transport, mut app) = pair();
    let config = Config {
        handshake_timeout: Duration::from_millis(50),
        ..Config::new(CLIENT_ID)
    };

    let result = ClientBuilder::new(config).connect_with(transport).await;
    assert!(matches!(result, Err(ClientError::HandshakeTimeout(_))));

    // Handshake was written, then the transport was closed
    assert_eq!(app.recv().await.opcode, IpcOpcode::Handshake);
    assert!(read_frame(&mut app.stream, DEFAULT_MAX_FRAME_LEN).await.is_err());
}

#[tokio::test]
async fn test_rejected_handshake() {
    let (transport, mut app) = pair();

    let app_side = async {
        assert_eq!(app.recv().await.opcode, IpcOpcode::Handshake);
        app.send(
            IpcOpcode::Close,
            json!({ "code": 4000, "message": "Invalid Client ID" }),
        )
        .await;
    };
    let (result, ()) = tokio::join!(
        ClientBuilder::new(Config::new(CLIENT_ID)).connect_with(transport),
        app_side
    );

    let err = result.unwrap_err();
    assert_eq!(err.close_code(), Some(CloseCode::InvalidClientId));
    match err {
        ClientError::Rejected { code, message } => {
            assert_eq!(code, 4000);
            assert_eq!(message, "Invalid Client ID");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_before_ready_fails_handshake() {
    let (transport, mut app) = pair();

    let app_side = async {
        assert_eq!(app.recv().await.opcode, IpcOpcode::Handshake);
        app.dispatch("ERROR", json!({ "code": 4007, "message": "Invalid client ID" }))
            .await;
    };
    let (result, ()) = tokio::join!(
        ClientBuilder::new(Config::new(CLIENT_ID)).connect_with(transport),
        app_side
    );

    let err = result.unwrap_err();
    assert_eq!(err.rpc_code(), Some(RpcErrorCode::InvalidClientId));
    match err {
        ClientError::Rpc { code, message } => {
            assert_eq!(code, 4007);
            assert_eq!(message, "Invalid client ID");
        }
        other => panic!("expected RPC error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_after_ready_keeps_connection() {
    let (client, mut app) = connect_default().await;

    app.dispatch("ERROR", json!({ "code": 4007, "message": "Invalid client ID" }))
        .await;

    // Read loop is still serving: ping answered, request completes
    app.ping(b"still-there").await;
    assert_eq!(app.recv().await.payload, b"still-there");

    let send = client.get_guilds();
    let app_side = async {
        let request = app.recv_json().await;
        app.reply(&request, json!({ "guilds": [] })).await;
    };
    let (guilds, ()) = tokio::join!(send, app_side);
    assert!(guilds.unwrap().guilds.is_empty());
    assert_eq!(client.state(), ClientState::Ready);
}

#[tokio::test]
async fn test_panicking_callback_tears_down() {
    let builder = ClientBuilder::new(Config::new(CLIENT_ID)).on_event(|event| {
        if event.event == Event::GuildStatus {
            panic!("callback failure");
        }
    });
    let (client, mut app) = connect(builder).await;

    // In flight when the read loop dies
    let pending = client.get_guilds();
    let app_side = async {
        app.recv_json().await;
        app.dispatch(
            "GUILD_STATUS",
            json!({ "guild": { "id": "7", "name": "Seven" }, "online": 1 }),
        )
        .await;
    };
    let (pending, ()) = tokio::time::timeout(Duration::from_secs(1), async {
        tokio::join!(pending, app_side)
    })
    .await
    .unwrap();
    assert!(matches!(pending, Err(ClientError::Closed)));

    tokio::time::timeout(Duration::from_secs(1), client.closed())
        .await
        .unwrap();
    assert_eq!(client.state(), ClientState::Closed);
    let later = tokio::time::timeout(Duration::from_secs(1), client.get_guilds())
        .await
        .unwrap();
    assert!(matches!(later, Err(ClientError::Closed)));
}

#[tokio::test]
async fn test_eof_tears_down() {
    let (client, app) = connect_default().await;
    drop(app);

    tokio::time::timeout(Duration::from_secs(1), client.closed())
        .await
        .unwrap();
    assert!(client.is_closed());
    assert!(matches!(
        client.get_guilds().await,
        Err(ClientError::Closed)
    ));
}

#[tokio::test]
async fn test_dropped_send_unregisters() {
    let (client, mut app) = connect_default().await;

    let result = tokio::time::timeout(
        Duration::from_millis(50),
        client.send(Command::GetGuilds, json!({})),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(client.pending_requests(), 0);

    // A late response for the abandoned nonce is ignored
    let request = app.recv_json().await;
    app.reply(&request, json!({ "guilds": [] })).await;
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (client, mut app) = connect_default().await;

    client.close().await.unwrap();
    client.close().await.unwrap();
    assert!(client.is_closed());

    let frame = app.recv().await;
    assert_eq!(frame.opcode, IpcOpcode::Close);
}

#[cfg(unix)]
#[tokio::test]
async fn test_connect_over_unix_socket() {
    use tokio::net::UnixListener;

    let dir = tempfile::tempdir().unwrap();
    let listener = UnixListener::bind(dir.path().join("discord-ipc-0")).unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, write) = tokio::io::split(stream);
        let mut app = SplitApp { read, write };
        let frame = read_frame(&mut app.read, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap();
        assert_eq!(frame.opcode, IpcOpcode::Handshake);
        let ready = json!({ "cmd": "DISPATCH", "evt": "READY", "data": ready_data(), "nonce": null });
        let frame = Frame::new(IpcOpcode::Frame, serde_json::to_vec(&ready).unwrap());
        write_frame(&mut app.write, &frame).await.unwrap();
        // Wait for the client's Close
        let frame = read_frame(&mut app.read, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap();
        assert_eq!(frame.opcode, IpcOpcode::Close);
    });

    let config = Config {
        transport: TransportKind::Ipc,
        ipc_dir: Some(dir.path().to_path_buf()),
        ..Config::new(CLIENT_ID)
    };
    let client = Client::connect(config).await.unwrap();
    assert_eq!(client.transport_name(), "IPC");
    assert_eq!(client.user().username, "Mason");

    client.close().await.unwrap();
    server.await.unwrap();
}

#[cfg(unix)]
struct SplitApp {
    read: tokio::io::ReadHalf<tokio::net::UnixStream>,
    write: tokio::io::WriteHalf<tokio::net::UnixStream>,
}

#[cfg(unix)]
#[tokio::test]
async fn test_no_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        transport: TransportKind::Ipc,
        ipc_dir: Some(dir.path().to_path_buf()),
        ..Config::new(CLIENT_ID)
    };

    match Client::connect(config).await {
        Err(ClientError::NoEndpoint(attempts)) => assert_eq!(attempts.len(), 10),
        other => panic!("expected NoEndpoint, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connect_over_websocket() {
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    use tokio_tungstenite::tungstenite::Message;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let check = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            let query = request.uri().query().unwrap_or_default();
            assert_eq!(
                query,
                format!("v=1&client_id={}&encoding=json", CLIENT_ID)
            );
            assert_eq!(
                request.headers().get("origin").unwrap(),
                "https://discord.com"
            );
            Ok(response)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, check)
            .await
            .unwrap();

        let ready = json!({ "cmd": "DISPATCH", "evt": "READY", "data": ready_data(), "nonce": null });
        ws.send(Message::Text(ready.to_string())).await.unwrap();

        let request: Value = match ws.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text request, got {:?}", other),
        };
        assert_eq!(request["cmd"], "GET_GUILDS");
        let response = json!({
            "cmd": "GET_GUILDS",
            "data": { "guilds": [{ "id": "9", "name": "Nine" }] },
            "evt": null,
            "nonce": request["nonce"],
        });
        ws.send(Message::Text(response.to_string())).await.unwrap();

        // Drain until the client closes
        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() {
                break;
            }
        }
    });

    let config = Config {
        transport: TransportKind::WebSocket,
        ws_port_start: port,
        ws_port_end: port,
        ..Config::new(CLIENT_ID)
    };
    let client = Client::connect(config).await.unwrap();
    assert_eq!(client.transport_name(), "WebSocket");

    let guilds = client.get_guilds().await.unwrap();
    assert_eq!(guilds.guilds[0].name, "Nine");

    client.close().await.unwrap();
    server.await.unwrap();
}
