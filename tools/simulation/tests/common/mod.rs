//! In-memory mock matching server
//!
//! Hands out `tokio::io::duplex` pipes and answers the line protocol from a
//! spawned task, so sessions can run under paused tokio time.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::time::Instant;
use trader_sim::transport::{Connector, Endpoint};
use types::errors::SessionError;

/// How the mock server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// `REGISTERED:<id>` and `ORDER_ACCEPTED:<n>`
    Acknowledge,
    /// Reads everything, never replies
    Silent,
    /// Replies with errors that do not contain the registration marker
    Reject,
    /// Acknowledges registration, then closes the connection
    HangUpAfterRegister,
}

/// Connection-level fault injection, keyed on the n-th connect attempt (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    RefuseEvery(usize),
    PanicEvery(usize),
}

pub struct MockExchange {
    behavior: Behavior,
    fault: Fault,
    attempts: AtomicUsize,
    received: Arc<Mutex<Vec<(Instant, String)>>>,
}

impl MockExchange {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Self::with_fault(behavior, Fault::None)
    }

    pub fn with_fault(behavior: Behavior, fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            fault,
            attempts: AtomicUsize::new(0),
            received: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Every line the server has read, across all connections.
    pub fn received(&self) -> Vec<String> {
        self.received_at().into_iter().map(|(_, line)| line).collect()
    }

    /// Received lines with the instant the server read each one.
    pub fn received_at(&self) -> Vec<(Instant, String)> {
        self.received.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.received().iter().filter(|l| l.starts_with(prefix)).count()
    }
}

#[async_trait]
impl Connector for MockExchange {
    type Stream = DuplexStream;

    async fn connect(&self, endpoint: &Endpoint, _deadline: Instant) -> Result<DuplexStream, SessionError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fault {
            Fault::RefuseEvery(k) if attempt % k == 0 => {
                return Err(SessionError::Connect {
                    endpoint: endpoint.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            Fault::PanicEvery(k) if attempt % k == 0 => {
                panic!("mock exchange crashed on attempt {attempt}");
            }
            _ => {}
        }

        let (client, server) = duplex(64 * 1024);
        tokio::spawn(serve(server, self.behavior, Arc::clone(&self.received)));
        Ok(client)
    }
}

async fn serve(stream: DuplexStream, behavior: Behavior, log: Arc<Mutex<Vec<(Instant, String)>>>) {
    let (read, mut write) = split(stream);
    let mut lines = BufReader::new(read).lines();
    let mut order_seq = 0u64;

    while let Ok(Some(line)) = lines.next_line().await {
        log.lock().unwrap().push((Instant::now(), line.clone()));

        let is_register = line.starts_with("REGISTER:");
        let reply = match behavior {
            Behavior::Silent => None,
            Behavior::Reject if is_register => Some("ERROR:Registration disabled\n".to_string()),
            Behavior::Reject => Some("ORDER_REJECTED:0:Invalid order\n".to_string()),
            Behavior::Acknowledge | Behavior::HangUpAfterRegister => {
                if let Some(id) = line.strip_prefix("REGISTER:") {
                    Some(format!("REGISTERED:{id}\n"))
                } else {
                    order_seq += 1;
                    Some(format!("ORDER_ACCEPTED:{order_seq}\n"))
                }
            }
        };

        if let Some(reply) = reply {
            if write.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }
        if behavior == Behavior::HangUpAfterRegister && is_register {
            break;
        }
    }
}
