//! Message framing for the binary observer feed
//!
//! Format: [4 bytes little-endian length][payload]

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::game::constants::net::MAX_MESSAGE_SIZE;

/// Errors that can occur during message framing
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Message too large: {0} bytes (max {1})")]
    MessageTooLarge(usize, usize),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Read a length-prefixed message from a stream
pub async fn read_message<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Vec<u8>, FramingError> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(FramingError::ConnectionClosed);
        }
        Err(e) => return Err(FramingError::Io(e)),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(len, MAX_MESSAGE_SIZE));
    }

    let mut buf = vec![0u8; len];
    match stream.read_exact(&mut buf).await {
        Ok(_) => Ok(buf),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FramingError::ConnectionClosed),
        Err(e) => Err(FramingError::Io(e)),
    }
}

/// Write a length-prefixed message to a stream
pub async fn write_message<W: AsyncWrite + Unpin>(stream: &mut W, data: &[u8]) -> Result<(), FramingError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(data.len(), MAX_MESSAGE_SIZE));
    }

    stream.write_all(&(data.len() as u32).to_le_bytes()).await?;
    stream.write_all(data).await?;
    stream.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_message(&mut server, b"hello").await.unwrap();
        write_message(&mut server, b"").await.unwrap();

        assert_eq!(read_message(&mut client).await.unwrap(), b"hello");
        assert!(read_message(&mut client).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_length_prefix_is_little_endian() {
        let mut buf = Vec::new();
        write_message(&mut buf, &[7u8; 3]).await.unwrap();
        assert_eq!(buf, vec![3, 0, 0, 0, 7, 7, 7]);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut buf = Vec::new();
        let data = vec![0u8; MAX_MESSAGE_SIZE + 1];
        assert!(matches!(
            write_message(&mut buf, &data).await,
            Err(FramingError::MessageTooLarge(_, _))
        ));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (mut client, server) = tokio::io::duplex(64);
        drop(server);
        assert!(matches!(
            read_message(&mut client).await,
            Err(FramingError::ConnectionClosed)
        ));
    }
}
