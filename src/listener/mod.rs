//! Trap listener lifecycle.
//!
//! [`TrapListener`] owns the UDP socket task. Its states:
//!
//! ```text
//! Created --configure--> Configured --start--> Listening --stop--> Stopped
//!    |                       |
//!    +-------------------> Failed   (bad address, bad v3 settings, bind failure)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use async_snmp_trap::config::ListenerConfig;
//! use async_snmp_trap::listener::TrapListener;
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> async_snmp_trap::Result<()> {
//! let config = ListenerConfig::default().service_address("udp://0.0.0.0:1162");
//! let (tx, mut rx) = mpsc::unbounded_channel();
//!
//! let mut listener = TrapListener::with_snmptranslate(config, tx);
//! listener.start().await?;
//!
//! while let Some(metric) = rx.recv().await {
//!     println!("{}", metric);
//! }
//! listener.stop().await;
//! # Ok(())
//! # }
//! ```

mod receiver;

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::config::{ListenerConfig, SecurityParams, ServiceAddress};
use crate::error::{Error, Result};
use crate::normalize::TrapNormalizer;
use crate::resolve::{OidCache, Resolve, SnmpTranslate};
use crate::sink::MetricSink;
use crate::util::bind_udp_socket;
use receiver::PacketDecoder;

/// Lifecycle state of a [`TrapListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Constructed, nothing validated
    Created,
    /// Address and security settings validated
    Configured,
    /// Socket bound, receiving
    Listening,
    /// Stopped after listening
    Stopped,
    /// Configuration or bind failed
    Failed,
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Configured => write!(f, "configured"),
            Self::Listening => write!(f, "listening"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

struct Prepared {
    address: ServiceAddress,
    security: SecurityParams,
}

/// Receives traps on UDP and feeds them through a [`TrapNormalizer`].
pub struct TrapListener<R, S> {
    config: ListenerConfig,
    normalizer: Arc<TrapNormalizer<R, S>>,
    state: ListenerState,
    prepared: Option<Prepared>,
    local_addr: Option<SocketAddr>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<()>>>,
}

impl<S: MetricSink> TrapListener<OidCache<SnmpTranslate>, S> {
    /// Listener resolving names with `snmptranslate`, as the configuration
    /// describes (timeout and cache capacity).
    pub fn with_snmptranslate(config: ListenerConfig, sink: S) -> Self {
        let resolver = config.resolver();
        Self::new(config, resolver, sink)
    }
}

impl<R: Resolve, S: MetricSink> TrapListener<R, S> {
    /// Create a listener. Nothing is validated or bound yet.
    pub fn new(config: ListenerConfig, resolver: R, sink: S) -> Self {
        Self {
            config,
            normalizer: Arc::new(TrapNormalizer::new(resolver, sink)),
            state: ListenerState::Created,
            prepared: None,
            local_addr: None,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// The configuration.
    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// The normalizer, shared with in-flight handlers.
    pub fn normalizer(&self) -> &TrapNormalizer<R, S> {
        &self.normalizer
    }

    /// Bound address, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Validate the service address and the version/security settings.
    ///
    /// Called by [`start`](Self::start) when needed. Failure moves the
    /// listener to [`ListenerState::Failed`].
    pub fn configure(&mut self) -> Result<()> {
        if self.state != ListenerState::Created {
            return Err(Error::InvalidState { state: self.state }.boxed());
        }

        let prepared = ServiceAddress::parse(&self.config.service_address).and_then(|address| {
            let security = SecurityParams::from_config(&self.config)?;
            Ok(Prepared { address, security })
        });
        match prepared {
            Ok(prepared) => {
                self.prepared = Some(prepared);
                self.state = ListenerState::Configured;
                Ok(())
            }
            Err(e) => {
                self.state = ListenerState::Failed;
                Err(e)
            }
        }
    }

    /// Bind the socket and start receiving.
    ///
    /// Returns once the socket is bound, or with the error that prevented
    /// it. Configuration errors are returned before any socket is opened.
    #[instrument(
        level = "debug",
        skip(self),
        err,
        fields(snmp.service_address = %self.config.service_address)
    )]
    pub async fn start(&mut self) -> Result<()> {
        if self.state == ListenerState::Created {
            self.configure()?;
        }
        if self.state != ListenerState::Configured {
            return Err(Error::InvalidState { state: self.state }.boxed());
        }
        let Some(Prepared { address, security }) = self.prepared.take() else {
            return Err(Error::InvalidState { state: self.state }.boxed());
        };

        let bind_addr = match address.socket_addr().await {
            Ok(addr) => addr,
            Err(e) => {
                self.state = ListenerState::Failed;
                return Err(Error::Config(
                    format!("cannot resolve '{}': {}", address, e).into_boxed_str(),
                )
                .boxed());
            }
        };

        let decoder = PacketDecoder {
            version: security.version,
            usm_user: security.usm_user,
        };
        let (ready_tx, ready_rx) = oneshot::channel();
        let normalizer = self.normalizer.clone();
        let handler_limit = self.config.max_concurrent_handlers;
        let cancel = self.cancel.clone();

        let mut task = tokio::spawn(async move {
            let socket = bind_udp_socket(bind_addr).map_err(|source| Error::Network {
                target: bind_addr,
                source,
            })?;
            let local_addr = socket.local_addr().map_err(|source| Error::Network {
                target: bind_addr,
                source,
            })?;
            // The starter may have given up; keep going regardless
            let _ = ready_tx.send(local_addr);
            receiver::run(socket, decoder, normalizer, handler_limit, cancel).await
        });

        tokio::select! {
            ready = ready_rx => {
                if let Ok(local_addr) = ready {
                    tracing::info!(target: "async_snmp_trap::listener", { snmp.local_addr = %local_addr }, "listening on {}", address);
                    self.local_addr = Some(local_addr);
                    self.task = Some(task);
                    self.state = ListenerState::Listening;
                    return Ok(());
                }
                // Sender dropped: the task ended before binding
                let result = task.await;
                self.state = ListenerState::Failed;
                Err(join_error(result, bind_addr))
            }
            result = &mut task => {
                self.state = ListenerState::Failed;
                Err(join_error(result, bind_addr))
            }
        }
    }

    /// Stop receiving and wait for the listen task and in-flight handlers.
    ///
    /// A terminal error from the listen task is logged, not returned.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            tracing::debug!(target: "async_snmp_trap::listener", { state = %self.state }, "stop called while not listening");
            return;
        };

        self.cancel.cancel();
        match task.await {
            Ok(Ok(())) => {
                tracing::info!(target: "async_snmp_trap::listener", "trap listener stopped");
            }
            Ok(Err(e)) => {
                tracing::error!(target: "async_snmp_trap::listener", error = %e, "error stopping trap listener");
            }
            Err(e) => {
                tracing::error!(target: "async_snmp_trap::listener", error = %e, "trap listener task panicked");
            }
        }
        self.local_addr = None;
        self.state = ListenerState::Stopped;
    }

    /// Pull-driven collection hook. Traps are pushed, so there is nothing
    /// to gather.
    pub fn gather(&self) -> Result<()> {
        Ok(())
    }
}

/// Error for a listen task that finished before becoming ready.
fn join_error(
    result: std::result::Result<Result<()>, tokio::task::JoinError>,
    bind_addr: SocketAddr,
) -> Box<Error> {
    match result {
        Ok(Err(e)) => e,
        Ok(Ok(())) => Error::Network {
            target: bind_addr,
            source: std::io::Error::other("listener exited before binding"),
        }
        .boxed(),
        Err(e) => Error::Network {
            target: bind_addr,
            source: std::io::Error::other(e),
        }
        .boxed(),
    }
}

impl<R, S> fmt::Debug for TrapListener<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapListener")
            .field("service_address", &self.config.service_address)
            .field("state", &self.state)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl<R, S> Drop for TrapListener<R, S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
