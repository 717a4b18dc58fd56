/// Lifecycle events reported by a live transport.
///
/// Ready is not an event: a transport only exists once the connection
/// handshake has completed, so the successful return of
/// [`TransportConnector::connect`](super::TransportConnector::connect) is the
/// ready signal. `Error` and `Closed` are terminal: a transport reports at
/// most one of them, exactly once, and a fresh `connect` is required
/// afterwards.
#[derive(Debug)]
pub enum TransportEvent {
    /// One inbound binary message: a complete synthesized audio chunk.
    Chunk(Vec<u8>),

    /// The connection failed after it was established.
    Error(String),

    /// The remote closed the connection (or the stream ended).
    Closed,
}
