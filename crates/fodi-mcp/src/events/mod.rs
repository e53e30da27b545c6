// ABOUTME: Push-notification events streamed to SSE subscribers
// ABOUTME: Event payloads, wire framing, client id generation, and liveness configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod registry;
pub mod sweep;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fodi::types::{DriveError, FileMeta};
use serde::{Deserialize, Serialize};

pub use registry::{ConnectionRegistry, EventSender, SweepReport};
pub use sweep::LivenessSweeper;

/// Period between liveness sweeps
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(15);

/// A client whose reader has not caught up for longer than this is evicted
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Frames buffered per client before it is considered stalled
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Process-wide sequence for client ids; never reset, so ids are never reused
static CLIENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// What happened to a drive item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Item was created
    Created,
    /// Item content or metadata changed
    Updated,
    /// Item was removed
    Deleted,
}

/// A change to a single drive item, fanned out once to every subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeEvent {
    /// Kind of change
    pub kind: ChangeKind,
    /// Item the change applies to
    pub file: FileMeta,
    /// Unix epoch milliseconds (filled in on receipt when absent)
    #[serde(default = "unix_millis")]
    pub timestamp: u64,
}

/// Payload of one `data:` frame on the subscription stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First event on every stream
    Connected {
        /// Id assigned to this subscriber
        #[serde(rename = "clientId")]
        client_id: String,
        /// Unix epoch milliseconds
        timestamp: u64,
    },
    /// A drive item changed
    FileChange(FileChangeEvent),
    /// Periodic liveness ping
    Ping {
        /// Unix epoch milliseconds
        timestamp: u64,
    },
}

impl ServerEvent {
    /// `connected` event for a newly registered client
    pub fn connected(client_id: &str) -> Self {
        Self::Connected {
            client_id: client_id.to_owned(),
            timestamp: unix_millis(),
        }
    }

    /// `ping` event stamped now
    pub fn ping() -> Self {
        Self::Ping {
            timestamp: unix_millis(),
        }
    }

    /// `file_change` event stamped now
    pub fn file_change(kind: ChangeKind, file: FileMeta) -> Self {
        Self::FileChange(FileChangeEvent {
            kind,
            file,
            timestamp: unix_millis(),
        })
    }

    /// Wire name of the event type
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::FileChange(_) => "file_change",
            Self::Ping { .. } => "ping",
        }
    }
}

/// Encode an event as one Server-Sent-Events frame: `data: <json>\n\n`
pub fn encode_frame(event: &ServerEvent) -> Result<String, DriveError> {
    let json = serde_json::to_string(event).map_err(|e| {
        DriveError::internal(format!(
            "Failed to encode {} event: {e}",
            event.type_name()
        ))
    })?;
    Ok(format!("data: {json}\n\n"))
}

/// Generate a subscriber id unique for the process lifetime
pub fn generate_client_id() -> String {
    let ts = unix_millis() / 1000;
    let seq = CLIENT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("client-{ts:x}{seq:08x}")
}

/// Current unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Liveness and buffering settings for the subscription channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventsConfig {
    /// Period between sweeps (each sweep pings every live client)
    pub ping_interval: Duration,
    /// Eviction threshold since the reader last caught up
    pub client_timeout: Duration,
    /// Per-client frame buffer
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl EventsConfig {
    /// Reject settings that would stall or spin the sweeper
    pub fn validate(&self) -> Result<(), DriveError> {
        if self.ping_interval.is_zero() {
            return Err(DriveError::config("ping interval must be greater than zero"));
        }
        if self.client_timeout < self.ping_interval {
            return Err(DriveError::config(format!(
                "client timeout ({}s) must not be shorter than the ping interval ({}s)",
                self.client_timeout.as_secs(),
                self.ping_interval.as_secs()
            )));
        }
        if self.channel_capacity == 0 {
            return Err(DriveError::config("channel capacity must be at least 1"));
        }
        Ok(())
    }
}
