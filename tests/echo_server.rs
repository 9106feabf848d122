use futures::{SinkExt, StreamExt};
use resilient_ws::{
    ChannelSignal, ClientEvent, Connector, EventPayload, Listener, ReadyState,
    TungsteniteConnector, WsClient, WsClientOptions,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

/// Echo responder: `#PING` gets `#PONG`, `#CLOSE` closes the session and
/// everything else comes back as `echo:<text>`.
async fn spawn_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream));
        }
    });
    addr
}

async fn serve(stream: TcpStream) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let reply = match text.as_str() {
            "#PING" => "#PONG".to_string(),
            "#CLOSE" => {
                let _ = ws.close(None).await;
                continue;
            }
            other => format!("echo:{}", other),
        };
        if ws.send(Message::text(reply)).await.is_err() {
            break;
        }
    }
}

fn options(reconnect_ms: u64, idle_ms: u64) -> WsClientOptions {
    WsClientOptions {
        reconnect_delay_ms: Some(reconnect_ms),
        heartbeat_idle_ms: Some(idle_ms),
        heartbeat_ack_timeout_ms: Some(1000),
    }
}

fn counter(client: &WsClient, event: ClientEvent) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    client
        .on(
            event,
            Listener::from_fn(move |_: EventPayload| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
    count
}

#[tokio::test]
async fn test_message_sent_before_open_is_delivered() {
    let addr = spawn_echo_server().await;
    let client = WsClient::new(format!("ws://{}", addr), options(100, 5000)).unwrap();
    let reply = client.once(ClientEvent::Notify).unwrap();

    client.send("hello");

    let payload = timeout(WAIT, reply).await.unwrap();
    assert_eq!(payload, Some(EventPayload::Message("echo:hello".to_string())));
    assert!(client.is_open());
    assert_eq!(client.buffered_len(), 0);

    client.destroy();
}

#[tokio::test]
async fn test_heartbeat_replies_keep_the_channel_open() {
    let addr = spawn_echo_server().await;
    let client = WsClient::new(format!("ws://{}", addr), options(100, 100)).unwrap();
    let notes = counter(&client, ClientEvent::Notify);
    let closes = counter(&client, ClientEvent::OnClose);
    let opened = client.once(ClientEvent::OnOpen).unwrap();

    timeout(WAIT, opened).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(client.is_open());
    assert_eq!(notes.load(Ordering::SeqCst), 0);
    assert_eq!(closes.load(Ordering::SeqCst), 0);

    client.destroy();
}

#[tokio::test]
async fn test_server_close_triggers_reconnection() {
    let addr = spawn_echo_server().await;
    let client = WsClient::new(format!("ws://{}", addr), options(50, 5000)).unwrap();
    let mut opens = client.events(ClientEvent::OnOpen).unwrap();
    let reconnection = client.once(ClientEvent::Reconnection).unwrap();

    timeout(WAIT, opens.advance()).await.unwrap();
    client.send("#CLOSE");

    timeout(WAIT, reconnection).await.unwrap();
    timeout(WAIT, opens.advance()).await.unwrap();
    assert!(client.is_open());

    let reply = client.once(ClientEvent::Notify).unwrap();
    client.send("again");
    let payload = timeout(WAIT, reply).await.unwrap();
    assert_eq!(payload, Some(EventPayload::Message("echo:again".to_string())));

    client.destroy();
}

#[tokio::test]
async fn test_manual_close_stays_closed() {
    let addr = spawn_echo_server().await;
    let client = WsClient::new(format!("ws://{}", addr), options(50, 5000)).unwrap();
    let reconnections = counter(&client, ClientEvent::Reconnection);
    let opened = client.once(ClientEvent::OnOpen).unwrap();

    timeout(WAIT, opened).await.unwrap();
    client.close();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!client.is_open());
    assert_eq!(reconnections.load(Ordering::SeqCst), 0);
}

/// Accepts sessions and never reads from them, so close frames go unanswered.
async fn spawn_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let ws = tokio_tungstenite::accept_async(stream).await;
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(ws);
            });
        }
    });
    addr
}

#[tokio::test]
async fn test_unacknowledged_close_times_out_as_abnormal() {
    let addr = spawn_silent_server().await;
    let url = Url::parse(&format!("ws://{}", addr)).unwrap();
    let connector = TungsteniteConnector::new().with_close_timeout(Duration::from_millis(100));
    let (channel, mut signals) = connector.connect(&url);

    assert_eq!(
        timeout(WAIT, signals.recv()).await.unwrap(),
        Some(ChannelSignal::Open)
    );
    assert_eq!(channel.ready_state(), ReadyState::Open);

    channel.close();
    assert_eq!(channel.ready_state(), ReadyState::Closing);

    let closed = timeout(Duration::from_secs(2), signals.recv()).await.unwrap();
    assert_eq!(
        closed,
        Some(ChannelSignal::Close {
            code: 1006,
            reason: String::new()
        })
    );
    assert_eq!(channel.ready_state(), ReadyState::Closed);
}
