//! Frame codec: 4-byte big-endian length, then a bincode payload.

use crate::error::TransportError;
use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload either side accepts.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

const HEADER_LEN: usize = 4;

pub fn encode<T: Serialize>(message: &T) -> Result<BytesMut, TransportError> {
    let payload = bincode::serialize(message)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = BytesMut::with_capacity(HEADER_LEN + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(&payload);
    Ok(frame)
}

pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. `Ok(None)` means the peer closed the connection
/// cleanly between frames.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, TransportError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(bincode::deserialize(&payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chord_core::{Identifier, NodeRef, Request, Response};

    #[tokio::test]
    async fn frames_survive_a_pipe() {
        let (mut writer, mut reader) = tokio::io::duplex(4096);
        let request = Request::FindSuccessor {
            id: Identifier(6),
            queried: NodeRef::new(3, "127.0.0.1", 5003),
        };

        write_frame(&mut writer, &request).await.unwrap();
        write_frame(&mut writer, &Response::Predecessor(None)).await.unwrap();
        drop(writer);

        let first: Option<Request> = read_frame(&mut reader).await.unwrap();
        assert_eq!(first, Some(request));
        let second: Option<Response> = read_frame(&mut reader).await.unwrap();
        assert_eq!(second, Some(Response::Predecessor(None)));
        let end: Option<Response> = read_frame(&mut reader).await.unwrap();
        assert_eq!(end, None);
    }

    #[test]
    fn header_is_big_endian_length() {
        let frame = encode(&Request::Summary).unwrap();
        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - HEADER_LEN);
    }

    #[tokio::test]
    async fn oversized_frames_are_refused() {
        let (mut writer, mut reader) = tokio::io::duplex(64);
        writer.write_u32(MAX_FRAME_LEN as u32 + 1).await.unwrap();

        let result: Result<Option<Request>, _> = read_frame(&mut reader).await;
        assert!(matches!(result, Err(TransportError::FrameTooLarge { .. })));

        let huge = Request::Insert {
            key: "k".into(),
            value: "x".repeat(MAX_FRAME_LEN),
        };
        assert!(matches!(encode(&huge), Err(TransportError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn truncated_payload_is_an_error() {
        let (mut writer, mut reader) = tokio::io::duplex(64);
        writer.write_u32(16).await.unwrap();
        writer.write_all(b"short").await.unwrap();
        drop(writer);

        let result: Result<Option<Request>, _> = read_frame(&mut reader).await;
        assert!(matches!(result, Err(TransportError::Io(_))));
    }
}
