//! Realtime feed session against the provider's streaming endpoint

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::feed::cache::{PriceCache, PriceTick};
use crate::feed::subscriptions::SubscriptionManager;
use crate::gateway::{GatewayError, MarketGateway};

/// Realtime transaction id for domestic equity executions
const TICK_TR_ID: &str = "H0STCNT0";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed handshake failed: {0}")]
    Handshake(#[from] GatewayError),
    #[error("feed transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("feed url invalid: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Connection lifecycle as seen by readers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Connecting,
    Connected,
}

/// Reconnect policy. Attempt `n` waits `n * base_delay`; the attempt counter
/// is global for the life of the task and never resets on success.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub base_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_reconnect_attempts: 2,
        }
    }
}

/// How one session ended
enum SessionEnd {
    Shutdown,
    Remote,
}

/// Owns the provider websocket session: handshake, subscribe frames,
/// keepalive echo and tick decoding into the shared price cache.
pub struct FeedConnection {
    gateway: Arc<MarketGateway>,
    cache: Arc<PriceCache>,
    subs: Arc<SubscriptionManager>,
    config: FeedConfig,
    state: Arc<RwLock<FeedState>>,
    shutdown: watch::Sender<bool>,
}

impl FeedConnection {
    pub fn new(
        gateway: Arc<MarketGateway>,
        cache: Arc<PriceCache>,
        subs: Arc<SubscriptionManager>,
        config: FeedConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            gateway,
            cache,
            subs,
            config,
            state: Arc::new(RwLock::new(FeedState::Disconnected)),
            shutdown,
        }
    }

    pub async fn state(&self) -> FeedState {
        self.state.read().await.clone()
    }

    /// Ask the run loop to close the current session and stop. No reconnect
    /// follows an explicit shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Drive the feed until shutdown or the reconnect budget is spent.
    pub async fn run(&self) {
        if !self.gateway.is_configured() {
            warn!("realtime feed disabled: provider credentials not configured");
            return;
        }

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut attempts: u32 = 0;
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            *self.state.write().await = FeedState::Connecting;

            let outcome = self.run_session(&mut shutdown_rx).await;
            self.subs.detach().await;
            *self.state.write().await = FeedState::Disconnected;

            match outcome {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Remote) => {}
                Err(err) => error!(error = %err, "feed session error"),
            }

            attempts += 1;
            if attempts > self.config.max_reconnect_attempts {
                error!(attempts, "feed reconnect budget exhausted; staying down");
                break;
            }
            let delay = self.config.base_delay * attempts;
            warn!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                "feed session ended; reconnecting"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        *self.state.write().await = FeedState::Disconnected;
        info!("realtime feed stopped");
    }

    async fn run_session(
        &self,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, FeedError> {
        // The subscribe frames need a fresh approval key; fetch it once per
        // session and reuse it for every instrument.
        let approval_key = self.gateway.ws_approval_key().await?;

        let url = url::Url::parse(&self.gateway.config().ws_url)?;
        info!(url = %url, "connecting realtime feed");
        let (stream, _response) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = stream.split();

        *self.state.write().await = FeedState::Connected;
        let (sub_tx, mut sub_rx) = mpsc::unbounded_channel::<String>();
        self.subs.attach(sub_tx).await;
        info!("realtime feed connected");

        loop {
            tokio::select! {
                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(reply) = self.handle_text(text.as_str()) {
                                write.send(Message::Text(reply.into())).await?;
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            write.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("feed closed by server");
                            return Ok(SessionEnd::Remote);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            error!(error = %err, "feed read error");
                            return Ok(SessionEnd::Remote);
                        }
                        None => {
                            warn!("feed stream ended");
                            return Ok(SessionEnd::Remote);
                        }
                    }
                }
                request = sub_rx.recv() => {
                    match request {
                        Some(code) => {
                            debug!(code = %code, "sending subscribe request");
                            let frame = subscribe_frame(&approval_key, &code);
                            write.send(Message::Text(frame.into())).await?;
                        }
                        None => {
                            warn!("subscription channel closed");
                            return Ok(SessionEnd::Remote);
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("feed shutdown requested");
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(SessionEnd::Shutdown);
                    }
                }
            }
        }
    }

    /// Handle one inbound text frame; a returned string is echoed back to
    /// the provider.
    fn handle_text(&self, text: &str) -> Option<String> {
        if let Some((code, tick)) = parse_tick(text) {
            self.cache.insert(&code, tick);
            return None;
        }
        // Data frames for streams we never subscribed to, or the encrypted
        // variant, arrive with the same prefix shape; skip them quietly.
        if text.starts_with("0|") || text.starts_with("1|") {
            if text.starts_with("0|") && text.contains(TICK_TR_ID) {
                warn!("malformed tick frame dropped");
            } else {
                debug!("ignoring unrecognized data frame");
            }
            return None;
        }

        match serde_json::from_str::<Value>(text) {
            Ok(control) => {
                let tr_id = control
                    .pointer("/header/tr_id")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if tr_id == "PINGPONG" {
                    debug!("feed keepalive echoed");
                    return Some(text.to_string());
                }
                let msg = control
                    .pointer("/body/msg1")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if msg == "SUBSCRIBE SUCCESS" {
                    let tr_key = control
                        .pointer("/header/tr_key")
                        .and_then(Value::as_str)
                        .unwrap_or("");
                    debug!(tr_key = %tr_key, "subscription confirmed");
                } else {
                    debug!(frame = %text, "unhandled control frame");
                }
            }
            Err(_) => {
                warn!(frame = %text, "unparseable feed frame dropped");
            }
        }
        None
    }
}

/// Registration frame for one instrument on the execution stream.
fn subscribe_frame(approval_key: &str, code: &str) -> String {
    json!({
        "header": {
            "approval_key": approval_key,
            "custtype": "P",
            "tr_type": "1",
            "content-type": "utf-8",
        },
        "body": {
            "input": {
                "tr_id": TICK_TR_ID,
                "tr_key": code,
            }
        }
    })
    .to_string()
}

/// Decode a realtime execution frame into its instrument code and tick.
///
/// Data frames look like `0|H0STCNT0|001|<payload>` with a caret-delimited
/// payload: code, trade time, price, change, change rate, cumulative volume.
/// Anything else, including a payload too short or without a price, is None.
pub fn parse_tick(text: &str) -> Option<(String, PriceTick)> {
    if !text.starts_with("0|") {
        return None;
    }
    let mut parts = text.splitn(4, '|');
    let _flag = parts.next()?;
    let tr_id = parts.next()?;
    if tr_id != TICK_TR_ID {
        return None;
    }
    let _count = parts.next()?;
    let payload = parts.next()?;

    let fields: Vec<&str> = payload.split('^').collect();
    if fields.len() < 6 {
        return None;
    }
    let code = fields[0].trim();
    if code.is_empty() {
        return None;
    }

    let price = parse_field(fields[2])?;
    let change = parse_field(fields[3]).unwrap_or(Decimal::ZERO);
    let change_rate = parse_field(fields[4]).unwrap_or(Decimal::ZERO);
    let volume = fields[5].trim().replace(',', "").parse::<u64>().unwrap_or(0);

    Some((
        code.to_string(),
        PriceTick {
            price,
            change,
            change_rate,
            volume,
            updated_at: Utc::now(),
        },
    ))
}

fn parse_field(raw: &str) -> Option<Decimal> {
    crate::gateway::parse::parse_decimal(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tick_frame_decodes_expected_fields() {
        let frame = "0|H0STCNT0|001|005930^093015^71500^-300^-0.42^1234567^junk";
        let (code, tick) = parse_tick(frame).unwrap();
        assert_eq!(code, "005930");
        assert_eq!(tick.price, dec!(71500));
        assert_eq!(tick.change, dec!(-300));
        assert_eq!(tick.change_rate, dec!(-0.42));
        assert_eq!(tick.volume, 1_234_567);
    }

    #[test]
    fn short_or_foreign_frames_are_ignored() {
        assert!(parse_tick("0|H0STCNT0|001|005930^093015").is_none());
        assert!(parse_tick("0|H0STASP0|001|005930^1^2^3^4^5").is_none());
        assert!(parse_tick("{\"header\":{\"tr_id\":\"PINGPONG\"}}").is_none());
        assert!(parse_tick("").is_none());
    }

    #[test]
    fn tick_without_price_is_dropped() {
        assert!(parse_tick("0|H0STCNT0|001|005930^093015^^-300^-0.42^10").is_none());
    }

    #[test]
    fn subscribe_frame_carries_key_and_code() {
        let frame = subscribe_frame("approval-1", "005930");
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value.pointer("/header/approval_key").and_then(Value::as_str),
            Some("approval-1")
        );
        assert_eq!(
            value.pointer("/header/tr_type").and_then(Value::as_str),
            Some("1")
        );
        assert_eq!(
            value.pointer("/body/input/tr_id").and_then(Value::as_str),
            Some(TICK_TR_ID)
        );
        assert_eq!(
            value.pointer("/body/input/tr_key").and_then(Value::as_str),
            Some("005930")
        );
    }

    #[test]
    fn reconnect_delays_grow_linearly() {
        let config = FeedConfig::default();
        assert_eq!(config.base_delay * 1, Duration::from_secs(1));
        assert_eq!(config.base_delay * 2, Duration::from_secs(2));
        assert_eq!(config.max_reconnect_attempts, 2);
    }
}
