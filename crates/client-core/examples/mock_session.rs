//! Drive a client against the in-memory engine host
//!
//! Run with:
//! ```sh
//! RUST_LOG=voipbridge_client_core=debug cargo run -p voipbridge-client-core --example mock_session
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voipbridge_client_core::{
    CallEventHandler, CallSession, ClientBuilder, NetworkStatus, TelephonyRequest,
};
use voipbridge_engine_core::mock::{MockEngineHost, ReadyBehavior};
use voipbridge_engine_core::{CallDirection, CallId, CallSnapshot, CallState, Reason, RemoteAddress};

struct PrintingHandler;

#[async_trait]
impl CallEventHandler for PrintingHandler {
    async fn on_call_state_changed(&self, session: &CallSession) {
        info!("📞 {} is now {}", session.label(), session.state);
    }

    async fn on_pause_state_changed(&self, call_id: CallId, paused_locally: bool, paused_by_remote: bool) {
        info!("⏸️  {} paused locally={} by remote={}", call_id, paused_locally, paused_by_remote);
    }

    async fn on_mute_state_changed(&self, muted: bool) {
        info!("🎙️  muted={}", muted);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let host = Arc::new(MockEngineHost::new(ReadyBehavior::After(Duration::from_millis(50))));
    let engine = host.engine();

    let client = ClientBuilder::new()
        .engine_host(host.clone())
        .user_agent("mock-session", env!("CARGO_PKG_VERSION"))
        .build()?;
    client.events().set_call_handler(Some(Arc::new(PrintingHandler)));

    client.start().await?;
    info!("✅ Connected to engine host {:?}", client.host_id());

    client.invite("sip:bob@example.com").await?;

    // Play the engine's side of the call
    let call = CallSnapshot::new(
        CallDirection::Outgoing,
        RemoteAddress::new("sip:bob@example.com", "bob"),
        CallState::OutgoingProgress,
    );
    engine.report_call(call.clone());
    engine.set_current_call(Some(call.id));
    engine.report_call(call.with_state(CallState::Connected));
    engine.report_call(call.with_state(CallState::StreamsRunning));
    client.flush().await?;

    client.handle_telephony_request(TelephonyRequest::Mute).await?;
    client.set_hold(true).await?;
    engine.report_call(call.with_state(CallState::Paused));
    client.set_hold(false).await?;
    engine.report_call(call.with_state(CallState::StreamsRunning));

    client.network_changed(NetworkStatus::offline())?;
    client.network_changed(NetworkStatus::wifi())?;

    client.terminate().await?;
    engine.report_call(call.with_state(CallState::CallEnd).with_reason(Reason::None));
    engine.report_call(call.with_state(CallState::Released));
    client.flush().await?;

    for command in engine.commands() {
        info!("engine <- {:?}", command);
    }

    client.stop().await?;
    info!("👋 Stopped");
    Ok(())
}
