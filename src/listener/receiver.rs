//! Datagram decoding and the socket read loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::normalize::TrapNormalizer;
use crate::pdu::{AnyPdu, PduType};
use crate::resolve::Resolve;
use crate::sink::MetricSink;
use crate::trap::TrapEvent;
use crate::v3::UsmUser;
use crate::version::Version;

/// Largest UDP payload.
const RECV_BUFFER_SIZE: usize = 65535;

/// Decoded events waiting for the dispatcher. Once the handler limit is
/// reached the queue fills, the read loop stalls and the kernel buffer
/// absorbs the burst.
const DISPATCH_QUEUE: usize = 1024;

/// A notification ready for normalization.
#[derive(Debug)]
pub(crate) struct Decoded {
    pub(crate) event: TrapEvent,
    /// Response to send back when the notification was an inform
    pub(crate) reply: Option<Bytes>,
}

/// Turns datagrams into trap events.
#[derive(Debug, Clone)]
pub(crate) struct PacketDecoder {
    pub(crate) version: Version,
    pub(crate) usm_user: Option<Arc<UsmUser>>,
}

impl PacketDecoder {
    /// Decode one datagram.
    ///
    /// Returns `Ok(None)` for well-formed messages that are not
    /// notifications. v1 and v2c messages are always accepted; v3 messages
    /// only when the listener is configured for version 3. Community informs
    /// come with the Response that acknowledges them. SNMPv3 informs are
    /// dropped: acknowledging them needs an authoritative engine.
    pub(crate) fn decode(
        &self,
        data: Bytes,
        peer: SocketAddr,
        received_at: SystemTime,
    ) -> Result<Option<Decoded>> {
        let source = peer.ip().to_canonical();

        match Message::decode(data.clone(), peer)? {
            Message::Community(msg) => {
                let reply = msg.inform_response();
                let event = match msg.pdu {
                    AnyPdu::TrapV1(trap) => TrapEvent::from_trap_v1(source, received_at, trap),
                    AnyPdu::Standard(pdu) if is_v2_notification(pdu.pdu_type) => {
                        TrapEvent::from_pdu(msg.version, source, received_at, pdu)
                    }
                    AnyPdu::Standard(pdu) => {
                        tracing::debug!(target: "async_snmp_trap::listener", { snmp.source = %peer, snmp.pdu_type = %pdu.pdu_type }, "ignoring non-notification PDU");
                        return Ok(None);
                    }
                };
                Ok(Some(Decoded { event, reply }))
            }
            Message::V3(msg) => {
                let Some(user) = self.usm_user.as_ref().filter(|_| self.version == Version::V3)
                else {
                    tracing::debug!(target: "async_snmp_trap::listener", { snmp.source = %peer }, "SNMPv3 message but listener not configured for v3");
                    return Err(Error::Auth { peer }.boxed());
                };
                let scoped = user.process(msg, &data, peer)?;
                match scoped.pdu.pdu_type {
                    PduType::TrapV2 => {}
                    PduType::InformRequest => {
                        tracing::debug!(target: "async_snmp_trap::listener", { snmp.source = %peer, snmp.request_id = scoped.pdu.request_id }, "dropping SNMPv3 inform, cannot acknowledge");
                        return Ok(None);
                    }
                    other => {
                        tracing::debug!(target: "async_snmp_trap::listener", { snmp.source = %peer, snmp.pdu_type = %other }, "ignoring non-notification PDU");
                        return Ok(None);
                    }
                }
                let event = TrapEvent::from_pdu(Version::V3, source, received_at, scoped.pdu);
                Ok(Some(Decoded { event, reply: None }))
            }
        }
    }
}

fn is_v2_notification(pdu_type: PduType) -> bool {
    matches!(pdu_type, PduType::TrapV2 | PduType::InformRequest)
}

/// Read datagrams until cancelled, handing decoded events to the dispatcher.
///
/// Only a socket receive failure ends the loop with an error. Undecodable
/// or unauthenticated datagrams are logged and dropped. Informs are
/// acknowledged as soon as they decode.
pub(crate) async fn run<R: Resolve, S: MetricSink>(
    socket: UdpSocket,
    decoder: PacketDecoder,
    normalizer: Arc<TrapNormalizer<R, S>>,
    handler_limit: Option<usize>,
    cancel: CancellationToken,
) -> Result<()> {
    let local_addr = socket
        .local_addr()
        .map_err(|source| Error::Network {
            target: crate::error::UNKNOWN_PEER,
            source,
        })?;
    let (tx, rx) = mpsc::channel(DISPATCH_QUEUE);
    let limit = handler_limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
    let dispatcher = tokio::spawn(dispatch(rx, normalizer, limit));

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let result = loop {
        let (len, peer) = tokio::select! {
            recv = socket.recv_from(&mut buf) => match recv {
                Ok(v) => v,
                Err(source) => break Err(Error::Network { target: local_addr, source }.boxed()),
            },
            _ = cancel.cancelled() => {
                tracing::debug!(target: "async_snmp_trap::listener", "listener shutdown requested");
                break Ok(());
            }
        };

        let data = Bytes::copy_from_slice(&buf[..len]);
        match decoder.decode(data, peer, SystemTime::now()) {
            Ok(Some(Decoded { event, reply })) => {
                if let Some(reply) = reply {
                    if let Err(e) = socket.send_to(&reply, peer).await {
                        tracing::warn!(target: "async_snmp_trap::listener", { snmp.source = %peer, error = %e }, "failed to acknowledge inform");
                    }
                }
                if tx.send(event).await.is_err() {
                    break Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(target: "async_snmp_trap::listener", { snmp.source = %peer, error = %e }, "dropping datagram");
            }
        }
    };

    // Closing the channel lets the dispatcher drain in-flight handlers
    drop(tx);
    if let Err(e) = dispatcher.await {
        tracing::error!(target: "async_snmp_trap::listener", error = %e, "trap dispatcher panicked");
    }
    result
}

/// Run each event's normalization on its own task.
///
/// With a limit, no event is taken off the queue until a handler slot is
/// free, so a slow resolver backs up into the queue and the read loop.
async fn dispatch<R: Resolve, S: MetricSink>(
    mut rx: mpsc::Receiver<TrapEvent>,
    normalizer: Arc<TrapNormalizer<R, S>>,
    limit: Option<Arc<Semaphore>>,
) {
    let mut handlers = JoinSet::new();
    loop {
        let permit = match &limit {
            Some(sem) => match sem.clone().acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => break,
            },
            None => None,
        };
        let Some(event) = rx.recv().await else {
            break;
        };

        let normalizer = normalizer.clone();
        handlers.spawn(async move {
            normalizer.handle(&event).await;
            drop(permit);
        });

        while let Some(finished) = handlers.try_join_next() {
            log_handler_panic(finished);
        }
    }
    while let Some(finished) = handlers.join_next().await {
        log_handler_panic(finished);
    }
}

fn log_handler_panic(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(target: "async_snmp_trap::listener", error = %e, "trap handler panicked");
    }
}
