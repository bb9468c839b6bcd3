//! Framed token transport over turmoil TCP.
//!
//! Every ring member listens on [`PORT`] under the host name
//! [`host_name`]. Frames travel as the 16-byte header followed by the CBOR
//! payload, exactly as [`Frame::encode`] writes them.

use std::{io, time::Duration};

use bytes::Bytes;
use tokenring_proto::{Frame, FrameHeader, NodeId, Payload, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt};
use turmoil::net::TcpStream;

use crate::error::SimError;

/// Port every node listens on.
pub const PORT: u16 = 9000;

/// Turmoil host name of node `node_num`.
pub fn host_name(node_num: u32) -> String {
    format!("node{node_num}")
}

/// Endpoint identity node `node_num` announces in its `Hello`.
pub fn identity(node_num: u32) -> String {
    format!("{}:{PORT}", host_name(node_num))
}

/// Read one complete frame.
///
/// Returns `Ok(None)` when the peer closed the connection between frames.
///
/// # Errors
///
/// - `SimError::Protocol` if the header or payload is malformed
/// - `SimError::Io` if the connection fails mid-frame
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, SimError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FrameHeader::SIZE];
    match reader.read_exact(&mut header).await {
        Ok(_) => {},
        Err(e) if is_disconnect(&e) => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let payload_size = FrameHeader::from_bytes(&header)?.payload_size() as usize;

    let mut buf = vec![0u8; FrameHeader::SIZE + payload_size];
    buf[..FrameHeader::SIZE].copy_from_slice(&header);
    reader.read_exact(&mut buf[FrameHeader::SIZE..]).await?;

    Ok(Some(Frame::decode(&buf)?))
}

/// Encode a payload into wire bytes written by `sender`.
///
/// # Errors
///
/// Returns `ProtocolError` if CBOR encoding fails or the payload is too large.
pub fn encode_frame(payload: Payload, sender: NodeId) -> Result<Bytes, ProtocolError> {
    let frame = payload.into_frame(sender)?;
    let mut buf = Vec::with_capacity(frame.wire_len());
    frame.encode(&mut buf)?;
    Ok(Bytes::from(buf))
}

/// Connect to `host`, retrying while its listener is not yet bound.
///
/// # Errors
///
/// Returns the last connection error once `attempts` are exhausted.
pub async fn connect_with_retry(
    host: &str,
    attempts: u32,
    backoff: Duration,
) -> io::Result<TcpStream> {
    let addr = format!("{host}:{PORT}");
    let mut last_error = io::Error::new(io::ErrorKind::NotConnected, "no connection attempt");

    for attempt in 1..=attempts.max(1) {
        match TcpStream::connect(addr.as_str()).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::trace!(host, attempt, error = %e, "Connect failed, retrying");
                last_error = e;
                tokio::time::sleep(backoff).await;
            },
        }
    }

    Err(last_error)
}

/// Whether an I/O error means the peer went away.
///
/// Halted nodes drop their sockets, so these are routine at the end of a run.
pub fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
    )
}

#[cfg(test)]
mod tests {
    use tokenring_proto::{Hello, Token};

    use super::*;

    #[test]
    fn identities_follow_host_names() {
        assert_eq!(host_name(2), "node2");
        assert_eq!(identity(2), "node2:9000");
    }

    #[tokio::test]
    async fn reads_back_encoded_frames() {
        let sender = NodeId::new(1);
        let hello = encode_frame(Payload::Hello(Hello::new("node1:9000")), sender).unwrap();
        let token = encode_frame(Payload::Token(Token::new(2, sender)), sender).unwrap();
        let wire = [hello, token].concat();

        let mut reader = wire.as_slice();
        let hello = read_frame(&mut reader).await.unwrap().unwrap();
        let token = read_frame(&mut reader).await.unwrap().unwrap();

        assert_eq!(Payload::from_frame(&hello).unwrap(), Payload::Hello(Hello::new("node1:9000")));
        assert_eq!(Payload::from_frame(&token).unwrap(), Payload::Token(Token::new(2, sender)));
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_bad_magic() {
        let mut reader: &[u8] = &[0u8; FrameHeader::SIZE];
        assert!(matches!(read_frame(&mut reader).await, Err(SimError::Protocol(_))));
    }

    #[tokio::test]
    async fn truncated_payload_is_io_error() {
        let bytes = encode_frame(Payload::Token(Token::new(5, NodeId::new(1))), NodeId::new(1))
            .unwrap();
        let mut reader = &bytes[..bytes.len() - 1];
        assert!(matches!(read_frame(&mut reader).await, Err(SimError::Io(_))));
    }
}
