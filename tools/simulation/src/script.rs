//! Scripted single-trader submission
//!
//! Connects one trader, registers, sends a fixed list of orders with a pause
//! between them and records whatever text the server sent back, then listens
//! for late notifications (fills) before disconnecting.

use crate::codec;
use crate::transport::{Connector, Endpoint};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info};
use types::errors::SessionError;
use types::ids::{Symbol, TraderId};
use types::numeric::{Price, Quantity};
use types::order::{OrderKind, Side};

const READ_BUFFER: usize = 1024;

/// One scripted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Price,
    pub quantity: Quantity,
}

impl ScriptStep {
    pub fn limit(symbol: &str, side: Side, price: Price, quantity: u32) -> Option<Self> {
        Some(Self {
            symbol: Symbol::try_new(symbol)?,
            side,
            kind: OrderKind::LIMIT,
            price,
            quantity: Quantity::try_new(quantity)?,
        })
    }
}

/// Waits used by the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTiming {
    pub connect: Duration,
    /// Bound on each write and on the final shutdown
    pub send: Duration,
    /// How long to wait for a reply after each command
    pub response_wait: Duration,
    /// Pause between orders
    pub pause: Duration,
    /// Listening window for notifications after the last order
    pub listen: Duration,
}

impl Default for ScriptTiming {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            send: Duration::from_secs(1),
            response_wait: Duration::from_millis(500),
            pause: Duration::from_secs(1),
            listen: Duration::from_secs(3),
        }
    }
}

/// A command and the text received after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub command: String,
    pub response: Option<String>,
}

/// Everything the scripted trader saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTranscript {
    pub trader_id: TraderId,
    pub registration: Exchange,
    pub orders: Vec<Exchange>,
    pub notifications: Vec<String>,
}

/// Default script: two AAPL limits on opposite sides and a GOOGL buy.
pub fn default_script() -> Vec<ScriptStep> {
    [
        ScriptStep::limit("AAPL", Side::BUY, Price::new(Decimal::new(15050, 2)), 10),
        ScriptStep::limit("AAPL", Side::SELL, Price::from_u64(151), 5),
        ScriptStep::limit("GOOGL", Side::BUY, Price::from_u64(2800), 2),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Run `steps` for one trader. Only a failed connect is an error.
pub async fn run_script<C: Connector>(
    connector: &C,
    endpoint: &Endpoint,
    trader_id: &TraderId,
    steps: &[ScriptStep],
    timing: ScriptTiming,
) -> Result<ScriptTranscript, SessionError> {
    let mut stream = connector
        .connect(endpoint, Instant::now() + timing.connect)
        .await?;
    info!(endpoint = %endpoint, trader = %trader_id, "connected");

    let registration = exchange(&mut stream, codec::encode_register(trader_id), &timing).await;

    let mut orders = Vec::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            sleep(timing.pause).await;
        }
        let command = codec::encode_order(
            trader_id,
            &step.symbol,
            step.side,
            step.kind,
            step.price,
            step.quantity,
        );
        orders.push(exchange(&mut stream, command, &timing).await);
    }

    let notifications = listen(&mut stream, Instant::now() + timing.listen).await;
    match timeout_at(Instant::now() + timing.send, stream.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "shutdown failed"),
        Err(_) => debug!("shutdown timed out"),
    }
    info!(trader = %trader_id, orders = orders.len(), notifications = notifications.len(), "disconnected");

    Ok(ScriptTranscript {
        trader_id: trader_id.clone(),
        registration,
        orders,
        notifications,
    })
}

/// Send one command and capture a single reply, if any arrives in time.
async fn exchange<S>(stream: &mut S, command: String, timing: &ScriptTiming) -> Exchange
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match timeout_at(Instant::now() + timing.send, stream.write_all(command.as_bytes())).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            debug!(error = %e, command = command.trim_end(), "send failed");
            return Exchange { command, response: None };
        }
        Err(_) => {
            debug!(command = command.trim_end(), "send timed out");
            return Exchange { command, response: None };
        }
    }
    let response = read_text(stream, Instant::now() + timing.response_wait).await;
    debug!(command = command.trim_end(), response = ?response, "exchange");
    Exchange { command, response }
}

/// Collect reply lines until the deadline or EOF.
async fn listen<S>(stream: &mut S, deadline: Instant) -> Vec<String>
where
    S: AsyncRead + Unpin,
{
    let mut lines = Vec::new();
    while let Some(text) = read_text(stream, deadline).await {
        lines.extend(text.lines().filter(|l| !l.is_empty()).map(str::to_string));
    }
    lines
}

async fn read_text<S>(stream: &mut S, deadline: Instant) -> Option<String>
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_BUFFER];
    match timeout_at(deadline, stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => Some(String::from_utf8_lossy(&buf[..n]).trim_end().to_string()),
        _ => None,
    }
}
