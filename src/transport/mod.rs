//! Duplex binary transport to the remote voice service.
//!
//! A [`Transport`] wraps exactly one connection: outbound encoded audio
//! frames go through the fire-and-forget [`TransportSender`], inbound
//! synthesized audio chunks and lifecycle changes arrive as
//! [`TransportEvent`]s. Connections are dialed through the
//! [`TransportConnector`] seam so the session logic stays independent of
//! the wire protocol.

mod event;
mod ws;

pub use event::TransportEvent;
pub use ws::{Transport, TransportConnector, TransportError, TransportSender, WireCommand, WsConnector};
