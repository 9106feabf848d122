use resilient_ws::{ClientEvent, EventPayload, Listener, WsClient, WsClientOptions};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Keeps one connection alive against a real server and prints every event
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing to see logs
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let url = std::env::var("WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:9999".to_string());
    let options = WsClientOptions::from_env()?;

    println!("📡 Connecting to: {}", url);
    println!(
        "   reconnect every {:?}, heartbeat after {:?} of silence\n",
        options.reconnect_delay(),
        options.heartbeat_idle()
    );

    let client = WsClient::new(&url, options)?;

    client.on(
        [
            ClientEvent::OnOpen,
            ClientEvent::OnClose,
            ClientEvent::OnError,
            ClientEvent::Reconnection,
        ],
        Listener::from_fn(|payload: EventPayload| match payload {
            EventPayload::Open => println!("✅ Connected"),
            EventPayload::Close(info) => println!("🔌 Closed: {} ({})", info.code, info.reason),
            EventPayload::Error(e) => println!("❌ Error: {}", e),
            EventPayload::Reconnection => println!("🔄 Reconnection scheduled"),
            _ => {}
        }),
    )?;

    // Buffered until the first open
    client.send("hello from resilient-ws");

    let mut messages = client.events(ClientEvent::Notify)?;
    let reader = tokio::spawn(async move {
        while let Some(payload) = messages.advance().await {
            if let Some(text) = payload.as_message() {
                println!("📨 {}", text);
            }
        }
    });

    println!("⏳ Running for 60 seconds (interrupt the server to watch reconnection)...\n");
    for i in 1..=6 {
        tokio::time::sleep(Duration::from_secs(10)).await;
        client.send(format!("tick {}", i));
    }

    client.destroy();
    reader.await?;
    println!("\n🎉 Done");
    Ok(())
}
