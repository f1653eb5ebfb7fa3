//! Simulated trader session
//!
//! One worker drives one trader through
//! `INIT → CONNECTING → CONNECTED → REGISTERING → {REGISTERED | REGISTER_FAILED} → TRADING → CLOSED`.
//! A failed connect jumps straight to `CLOSED`. Everything after a successful
//! connect is best effort: registration problems and per-order I/O faults are
//! logged and counted, never propagated.
//!
//! Every blocking step takes an explicit deadline derived from
//! `SessionTimeouts`, so no session can hold a concurrency slot forever.

use crate::catalog::SymbolCatalog;
use crate::codec;
use crate::generator::{GeneratorConfig, OrderGenerator};
use crate::metrics::LatencyHistogram;
use crate::transport::{Connector, Endpoint};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{interval_at, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};
use types::errors::{RegistrationError, SessionError};
use types::ids::TraderId;

/// Upper bound on bytes inspected for the registration acknowledgement.
const ACK_BUFFER: usize = 1024;

/// Read size for post-send drains.
const DRAIN_BUFFER: usize = 1024;

/// Deadlines for each suspension point of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTimeouts {
    /// Connection establishment
    pub connect: Duration,
    /// Waiting for the registration acknowledgement
    pub register_ack: Duration,
    /// Writing one command
    pub send: Duration,
    /// Reading whatever the server replied after an order
    pub drain: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            register_ack: Duration::from_secs(1),
            send: Duration::from_secs(1),
            drain: Duration::from_millis(100),
        }
    }
}

/// Immutable per-session parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub trader_id: TraderId,
    pub endpoint: Endpoint,
    /// Length of the trading window
    pub duration: Duration,
    /// Pause between order sends
    pub interval: Duration,
    pub catalog: Arc<SymbolCatalog>,
    pub generator: GeneratorConfig,
    pub timeouts: SessionTimeouts,
    /// Fixed RNG seed; None seeds from the OS
    pub seed: Option<u64>,
}

impl SessionConfig {
    /// Create a session with a 60s window and a 2s interval.
    pub fn new(trader_id: TraderId, endpoint: Endpoint, catalog: Arc<SymbolCatalog>) -> Self {
        Self {
            trader_id,
            endpoint,
            duration: Duration::from_secs(60),
            interval: Duration::from_secs(2),
            catalog,
            generator: GeneratorConfig::default(),
            timeouts: SessionTimeouts::default(),
            seed: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeouts(mut self, timeouts: SessionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Most order cycles the trading window can hold: ⌊duration / interval⌋ + 1.
    pub fn max_order_cycles(&self) -> u64 {
        if self.interval.is_zero() {
            return 1;
        }
        let cycles = self.duration.as_nanos() / self.interval.as_nanos();
        u64::try_from(cycles).unwrap_or(u64::MAX).saturating_add(1)
    }
}

/// Lifecycle states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Init,
    Connecting,
    Connected,
    Registering,
    Registered,
    RegisterFailed,
    Trading,
    Closed,
}

impl SessionState {
    /// Check whether `next` may follow this state.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Init, Connecting)
                | (Connecting, Connected)
                | (Connecting, Closed)
                | (Connected, Registering)
                | (Registering, Registered)
                | (Registering, RegisterFailed)
                | (Registered, Trading)
                | (RegisterFailed, Trading)
                | (Trading, Closed)
        )
    }
}

/// Result of one completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub trader_id: TraderId,
    /// Orders fully written to the connection
    pub orders_sent: u64,
    /// Order cycles lost to send faults
    pub orders_skipped: u64,
    /// Wall-clock time from connect attempt to close
    pub elapsed: Duration,
    /// Reached the trading phase
    pub success: bool,
    /// Registration acknowledgement was recognized
    pub registered: bool,
    pub latency: LatencyHistogram,
    /// What went wrong, if anything. Fatal errors mean the session never traded.
    pub failure: Option<SessionError>,
}

impl SessionOutcome {
    /// Zero-order outcome for a session that never reached trading.
    pub fn failed(trader_id: TraderId, elapsed: Duration, error: SessionError) -> Self {
        debug_assert!(error.is_fatal(), "non-fatal error cannot fail a session: {error}");
        Self {
            trader_id,
            orders_sent: 0,
            orders_skipped: 0,
            elapsed,
            success: false,
            registered: false,
            latency: LatencyHistogram::new(),
            failure: Some(error),
        }
    }
}

/// Tracks and traces state transitions for one session.
struct Lifecycle<'a> {
    trader_id: &'a TraderId,
    state: SessionState,
}

impl<'a> Lifecycle<'a> {
    fn new(trader_id: &'a TraderId) -> Self {
        Self { trader_id, state: SessionState::Init }
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid session transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(trader = %self.trader_id, from = ?self.state, to = ?next, "session transition");
        self.state = next;
    }
}

/// Counters accumulated during the trading phase.
#[derive(Debug, Default)]
struct TradeTally {
    sent: u64,
    skipped: u64,
    latency: LatencyHistogram,
}

/// Runs one trader session over connections from `C`.
pub struct SessionWorker<C> {
    connector: Arc<C>,
}

impl<C> Clone for SessionWorker<C> {
    fn clone(&self) -> Self {
        Self { connector: Arc::clone(&self.connector) }
    }
}

impl<C: Connector> SessionWorker<C> {
    pub fn new(connector: Arc<C>) -> Self {
        Self { connector }
    }

    /// Drive the session to completion. Never fails; faults end up in the outcome.
    pub async fn run(&self, config: &SessionConfig) -> SessionOutcome {
        let started = Instant::now();
        let trader_id = &config.trader_id;
        let mut lifecycle = Lifecycle::new(trader_id);

        lifecycle.advance(SessionState::Connecting);
        let connect_deadline = started + config.timeouts.connect;
        let mut stream = match self.connector.connect(&config.endpoint, connect_deadline).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(trader = %trader_id, error = %err, "connection failed");
                lifecycle.advance(SessionState::Closed);
                return SessionOutcome::failed(trader_id.clone(), started.elapsed(), err);
            }
        };
        lifecycle.advance(SessionState::Connected);

        lifecycle.advance(SessionState::Registering);
        let ack_deadline = Instant::now() + config.timeouts.register_ack;
        let registration_failure = match register(&mut stream, trader_id, ack_deadline).await {
            Ok(()) => {
                lifecycle.advance(SessionState::Registered);
                None
            }
            Err(err) => {
                warn!(trader = %trader_id, error = %err, "registration not confirmed, trading anyway");
                lifecycle.advance(SessionState::RegisterFailed);
                Some(SessionError::from(err))
            }
        };

        lifecycle.advance(SessionState::Trading);
        let mut generator = match config.seed {
            Some(seed) => OrderGenerator::new(config.catalog.clone(), config.generator.clone(), seed),
            None => OrderGenerator::from_entropy(config.catalog.clone(), config.generator.clone()),
        };
        let tally = trade(&mut stream, config, &mut generator).await;

        close(&mut stream, Instant::now() + config.timeouts.send).await;
        drop(stream);
        lifecycle.advance(SessionState::Closed);

        let elapsed = started.elapsed();
        debug!(
            trader = %trader_id,
            orders = tally.sent,
            skipped = tally.skipped,
            elapsed_ms = elapsed.as_millis() as u64,
            "session finished"
        );

        SessionOutcome {
            trader_id: trader_id.clone(),
            orders_sent: tally.sent,
            orders_skipped: tally.skipped,
            elapsed,
            success: true,
            registered: registration_failure.is_none(),
            latency: tally.latency,
            failure: registration_failure,
        }
    }
}

/// Send `REGISTER` and look for the acknowledgement marker before `deadline`.
///
/// Stops early once a full line without the marker has arrived.
pub(crate) async fn register<S>(
    stream: &mut S,
    trader_id: &TraderId,
    deadline: Instant,
) -> Result<(), RegistrationError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let command = codec::encode_register(trader_id);
    match timeout_at(deadline, stream.write_all(command.as_bytes())).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(RegistrationError::Io { reason: e.to_string() }),
        Err(_) => return Err(RegistrationError::Timeout),
    }

    let mut received = Vec::with_capacity(ACK_BUFFER);
    let mut buf = [0u8; ACK_BUFFER];
    loop {
        match timeout_at(deadline, stream.read(&mut buf)).await {
            Ok(Ok(0)) if received.is_empty() => return Err(RegistrationError::Closed),
            Ok(Ok(0)) => return Err(unrecognized(&received)),
            Ok(Ok(n)) => {
                received.extend_from_slice(&buf[..n]);
                if codec::is_registration_ack(&received) {
                    return Ok(());
                }
                if received.contains(&b'\n') || received.len() >= ACK_BUFFER {
                    return Err(unrecognized(&received));
                }
            }
            Ok(Err(e)) => return Err(RegistrationError::Io { reason: e.to_string() }),
            Err(_) if received.is_empty() => return Err(RegistrationError::Timeout),
            Err(_) => return Err(unrecognized(&received)),
        }
    }
}

fn unrecognized(raw: &[u8]) -> RegistrationError {
    RegistrationError::Unrecognized {
        response: String::from_utf8_lossy(raw).trim_end().to_string(),
    }
}

/// Trading loop.
///
/// Sends are scheduled at `k * interval` from entry into the phase and only
/// while that offset is within `duration` (boundary inclusive). Missed slots
/// are skipped, never replayed, so cycles stay within ⌊duration / interval⌋ + 1.
/// A cycle that wakes after the window has closed sends nothing, even if its
/// slot was inside the window.
async fn trade<S>(stream: &mut S, config: &SessionConfig, generator: &mut OrderGenerator) -> TradeTally
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut tally = TradeTally::default();
    let window_start = Instant::now();
    let window_end = window_start + config.duration;

    if config.interval.is_zero() {
        submit_cycle(stream, config, generator, &mut tally).await;
        return tally;
    }

    let mut ticker = interval_at(window_start, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let slot = ticker.tick().await;
        if slot > window_end || Instant::now() > window_end {
            break;
        }

        submit_cycle(stream, config, generator, &mut tally).await;

        if slot + config.interval > window_end {
            break;
        }
    }
    tally
}

async fn submit_cycle<S>(
    stream: &mut S,
    config: &SessionConfig,
    generator: &mut OrderGenerator,
    tally: &mut TradeTally,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match submit_order(stream, &config.trader_id, generator, &config.timeouts).await {
        Ok(round_trip) => {
            tally.sent += 1;
            if let Some(rtt) = round_trip {
                tally.latency.record(rtt);
            }
        }
        Err(err) => {
            tally.skipped += 1;
            debug!(trader = %config.trader_id, error = %err, "order cycle skipped");
        }
    }
}

/// Send one generated order, then drain whatever reply is already there.
///
/// Returns the round-trip time when a reply arrived. Drain problems are not
/// errors; only the write decides whether the order counts.
async fn submit_order<S>(
    stream: &mut S,
    trader_id: &TraderId,
    generator: &mut OrderGenerator,
    timeouts: &SessionTimeouts,
) -> Result<Option<Duration>, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let intent = generator.next_intent().ok_or_else(|| SessionError::Send {
        reason: "symbol catalog is empty".to_string(),
    })?;
    let line = codec::encode_intent(trader_id, &intent);

    let sent_at = Instant::now();
    match timeout_at(sent_at + timeouts.send, stream.write_all(line.as_bytes())).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(SessionError::Send { reason: e.to_string() }),
        Err(_) => return Err(SessionError::Send { reason: "timed out".to_string() }),
    }
    trace!(trader = %trader_id, order = line.trim_end(), "order sent");

    match drain(stream, Instant::now() + timeouts.drain).await {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(sent_at.elapsed())),
        Err(err) => {
            trace!(trader = %trader_id, error = %err, "nothing drained");
            Ok(None)
        }
    }
}

/// One read attempt bounded by `deadline`.
pub(crate) async fn drain<S>(stream: &mut S, deadline: Instant) -> Result<usize, SessionError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; DRAIN_BUFFER];
    match timeout_at(deadline, stream.read(&mut buf)).await {
        Ok(Ok(n)) => Ok(n),
        Ok(Err(e)) => Err(SessionError::Drain { reason: e.to_string() }),
        Err(_) => Err(SessionError::Drain { reason: "no reply before deadline".to_string() }),
    }
}

async fn close<S>(stream: &mut S, deadline: Instant)
where
    S: AsyncWrite + Unpin,
{
    match timeout_at(deadline, stream.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => trace!(error = %e, "shutdown failed"),
        Err(_) => trace!("shutdown timed out"),
    }
}
