//! Hub configuration.
//!
//! Every option has a default matching a typical browser-facing deployment;
//! use the `with_*` methods to override individual values.

use std::{fmt, sync::Arc, time::Duration};

use axum::http::{HeaderMap, Uri, header};

use crate::error::ConfigError;

/// Default read buffer size, in bytes
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;
/// Default write buffer size, in bytes
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 4096;
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PONG_WAIT: Duration = Duration::from_secs(60);
/// 90% of [`DEFAULT_PONG_WAIT`]
pub const DEFAULT_PING_PERIOD: Duration = Duration::from_secs(54);
/// 512 KiB
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 512 * 1024;
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Predicate deciding whether a handshake request's origin is acceptable.
pub type OriginCheck = Arc<dyn Fn(&HeaderMap) -> bool + Send + Sync>;

/// Configuration shared by the hub and every client it creates.
#[derive(Clone)]
pub struct HubConfig {
    pub read_buffer_size: usize,
    pub write_buffer_size: usize,
    /// Carried for completeness; the axum transport does not negotiate
    /// permessage-deflate.
    pub enable_compression: bool,
    pub handshake_timeout: Duration,
    /// Per-frame read deadline. Zero falls back to `pong_wait`.
    pub read_timeout: Duration,
    /// Per-frame write deadline. Zero falls back to 10 seconds.
    pub write_timeout: Duration,
    pub pong_wait: Duration,
    /// Keepalive ping interval. Must be shorter than `pong_wait`.
    pub ping_period: Duration,
    pub max_message_size: usize,
    pub mailbox_capacity: usize,
    /// `None` uses [`same_origin`].
    pub check_origin: Option<OriginCheck>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            enable_compression: false,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            pong_wait: DEFAULT_PONG_WAIT,
            ping_period: DEFAULT_PING_PERIOD,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            check_origin: None,
        }
    }
}

impl fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubConfig")
            .field("read_buffer_size", &self.read_buffer_size)
            .field("write_buffer_size", &self.write_buffer_size)
            .field("enable_compression", &self.enable_compression)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("pong_wait", &self.pong_wait)
            .field("ping_period", &self.ping_period)
            .field("max_message_size", &self.max_message_size)
            .field("mailbox_capacity", &self.mailbox_capacity)
            .field("check_origin", &self.check_origin.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl HubConfig {
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    pub fn with_enable_compression(mut self, enable: bool) -> Self {
        self.enable_compression = enable;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_pong_wait(mut self, duration: Duration) -> Self {
        self.pong_wait = duration;
        self
    }

    pub fn with_ping_period(mut self, duration: Duration) -> Self {
        self.ping_period = duration;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn with_check_origin<F>(mut self, check: F) -> Self
    where
        F: Fn(&HeaderMap) -> bool + Send + Sync + 'static,
    {
        self.check_origin = Some(Arc::new(check));
        self
    }

    /// Check the invariants the pumps rely on.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ping_period.is_zero() {
            return Err(ConfigError::ZeroPingPeriod);
        }
        if self.ping_period >= self.pong_wait {
            return Err(ConfigError::PingPeriodNotBelowPongWait {
                ping_period: self.ping_period,
                pong_wait: self.pong_wait,
            });
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::ZeroMailboxCapacity);
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::ZeroMaxMessageSize);
        }
        Ok(())
    }

    /// Deadline for a single frame read.
    pub fn read_deadline(&self) -> Duration {
        if self.read_timeout.is_zero() {
            self.pong_wait
        } else {
            self.read_timeout
        }
    }

    /// Deadline for a single frame write.
    pub fn write_deadline(&self) -> Duration {
        if self.write_timeout.is_zero() {
            DEFAULT_WRITE_TIMEOUT
        } else {
            self.write_timeout
        }
    }

    /// Apply the configured origin policy to handshake request headers.
    pub fn origin_allowed(&self, headers: &HeaderMap) -> bool {
        match &self.check_origin {
            Some(check) => check(headers),
            None => same_origin(headers),
        }
    }
}

/// Default origin policy.
///
/// Requests without an `Origin` header are accepted (non-browser clients).
/// Otherwise the origin's authority must match the `Host` header, ignoring
/// ASCII case.
pub fn same_origin(headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return true;
    };
    let Some(origin_authority) = origin
        .to_str()
        .ok()
        .and_then(|value| value.parse::<Uri>().ok())
        .and_then(|uri| uri.authority().map(|authority| authority.as_str().to_owned()))
    else {
        return false;
    };
    headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .is_some_and(|host| host.eq_ignore_ascii_case(&origin_authority))
}
