//! Error types for the transport.

/// Failures while moving a frame over a connection.
///
/// None of these reach the ring logic directly: the client reports all of
/// them as [`chord_core::Error::PeerUnreachable`].
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// The peer closed the connection before answering.
    #[error("connection closed")]
    Closed,
}
