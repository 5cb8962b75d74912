// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Wire Codec
//!
//! The line-and-frame protocol spoken between clients, the router and the
//! backend nodes.
//!
//! - **Lines** carry commands and status replies. They end in `\n` and are
//!   at most [`MAX_LINE_LEN`] bytes. A partial line at end of stream is
//!   still returned.
//! - **Frames** carry file contents, archives and listings: an 8-byte
//!   big-endian length followed by exactly that many bytes. Receivers loop
//!   until the full length arrives; a stream that ends early is
//!   [`WireError::Truncated`].
//!
//! Every read and write can be bounded by an idle timeout. The bound applies
//! per operation, so a slow but steady transfer never times out.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements internal responsibilities for wire

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest accepted line, terminator excluded
pub const MAX_LINE_LEN: usize = 4096;

/// Size of the frame length prefix
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest directory listing a node may return
pub const MAX_LISTING_LEN: u64 = 1024 * 1024;

/// Fixed status lines
pub mod status {
    pub const INVALID_COMMAND: &str = "Invalid command";
    pub const INVALID_FILE_TYPE: &str = "Invalid file type";
    pub const FILE_TYPE_ACCEPTED: &str = "File type accepted";
    pub const TRANSFER_READY: &str = "Transfer ready";
    pub const NO_FILES_FOUND: &str = "No files found in the directory";
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line exceeds the maximum line length")]
    LineTooLong,

    #[error("Line is not valid UTF-8")]
    InvalidUtf8,

    #[error("Stream ended after {received} of {expected} bytes")]
    Truncated { expected: u64, received: u64 },

    #[error("Frame of {len} bytes exceeds limit of {limit}")]
    FrameTooLarge { len: u64, limit: u64 },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure while relaying a frame body
#[derive(Debug, Error)]
pub enum RelayError {
    /// Reading from the source failed or it ended early
    #[error("source failed: {0}")]
    Source(WireError),

    /// Writing to the sink failed; `remaining` bytes are still unread on the
    /// source and must be drained to keep it in sync
    #[error("sink failed: {source}")]
    Sink {
        remaining: u64,
        #[source]
        source: WireError,
    },
}

/// Run an I/O future under an optional idle bound
pub async fn bounded<T, F>(idle: Option<Duration>, fut: F) -> Result<T, WireError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match idle {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| WireError::Timeout(limit))?
            .map_err(WireError::Io),
        None => fut.await.map_err(WireError::Io),
    }
}

/// Read one line, without its terminator
///
/// Returns `Ok(None)` on a clean end of stream.
pub async fn read_line<R>(reader: &mut R, idle: Option<Duration>) -> Result<Option<String>, WireError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = (MAX_LINE_LEN + 1) as u64;
    let n = bounded(idle, (&mut *reader).take(limit).read_until(b'\n', &mut buf)).await?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > MAX_LINE_LEN {
        return Err(WireError::LineTooLong);
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| WireError::InvalidUtf8)
}

/// Write one line followed by `\n`
pub async fn write_line<W>(writer: &mut W, line: &str, idle: Option<Duration>) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = Vec::with_capacity(line.len() + 1);
    bytes.extend_from_slice(line.as_bytes());
    bytes.push(b'\n');
    bounded(idle, writer.write_all(&bytes)).await?;
    bounded(idle, writer.flush()).await
}

/// Read until `buf` is full, counting what arrived before an early EOF
async fn read_full<R>(reader: &mut R, buf: &mut [u8], idle: Option<Duration>) -> Result<(), WireError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = bounded(idle, reader.read(&mut buf[filled..])).await?;
        if n == 0 {
            return Err(WireError::Truncated {
                expected: buf.len() as u64,
                received: filled as u64,
            });
        }
        filled += n;
    }
    Ok(())
}

pub async fn read_frame_header<R>(reader: &mut R, idle: Option<Duration>) -> Result<u64, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    read_full(reader, &mut header, idle).await?;
    Ok(u64::from_be_bytes(header))
}

pub async fn write_frame_header<W>(writer: &mut W, len: u64, idle: Option<Duration>) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    bounded(idle, writer.write_all(&len.to_be_bytes())).await
}

/// Read a whole frame into memory, refusing frames over `limit`
pub async fn read_frame<R>(reader: &mut R, limit: u64, idle: Option<Duration>) -> Result<Vec<u8>, WireError>
where
    R: AsyncRead + Unpin,
{
    let len = read_frame_header(reader, idle).await?;
    if len > limit {
        return Err(WireError::FrameTooLarge { len, limit });
    }
    let mut body = vec![0u8; len as usize];
    read_full(reader, &mut body, idle).await?;
    Ok(body)
}

/// Write a small in-memory frame
pub async fn write_frame<W>(writer: &mut W, body: &[u8], idle: Option<Duration>) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    write_frame_header(writer, body.len() as u64, idle).await?;
    bounded(idle, writer.write_all(body)).await?;
    bounded(idle, writer.flush()).await
}

/// Copy exactly `len` bytes from `src` to `dst` through a `buffer_size` buffer
///
/// The sink is flushed before returning. Returns the number of bytes copied,
/// which is always `len` on success.
pub async fn relay<R, W>(
    src: &mut R,
    dst: &mut W,
    len: u64,
    buffer_size: usize,
    idle: Option<Duration>,
) -> Result<u64, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut remaining = len;

    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = bounded(idle, src.read(&mut buf[..want]))
            .await
            .map_err(RelayError::Source)?;
        if n == 0 {
            return Err(RelayError::Source(WireError::Truncated {
                expected: len,
                received: len - remaining,
            }));
        }
        remaining -= n as u64;

        bounded(idle, dst.write_all(&buf[..n]))
            .await
            .map_err(|source| RelayError::Sink { remaining, source })?;
    }

    bounded(idle, dst.flush())
        .await
        .map_err(|source| RelayError::Sink { remaining: 0, source })?;

    Ok(len)
}

/// Discard exactly `len` bytes from `src`
pub async fn drain<R>(src: &mut R, len: u64, buffer_size: usize, idle: Option<Duration>) -> Result<(), WireError>
where
    R: AsyncRead + Unpin,
{
    match relay(src, &mut tokio::io::sink(), len, buffer_size, idle).await {
        Ok(_) => Ok(()),
        Err(RelayError::Source(e)) | Err(RelayError::Sink { source: e, .. }) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, BufReader};
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_lines_across_chunks() {
        let mock = Builder::new()
            .read(b"dfile ~/sm")
            .read(b"ain/a.c\ndisplay ~/smain\r\n")
            .read(b"dtar .c")
            .build();
        let mut reader = BufReader::new(mock);

        assert_eq!(read_line(&mut reader, None).await.unwrap().as_deref(), Some("dfile ~/smain/a.c"));
        assert_eq!(read_line(&mut reader, None).await.unwrap().as_deref(), Some("display ~/smain"));
        assert_eq!(read_line(&mut reader, None).await.unwrap().as_deref(), Some("dtar .c"));
        assert_eq!(read_line(&mut reader, None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let long = vec![b'a'; MAX_LINE_LEN + 10];
        let mut reader = BufReader::new(long.as_slice());
        assert!(matches!(read_line(&mut reader, None).await, Err(WireError::LineTooLong)));

        let mut exact = vec![b'a'; MAX_LINE_LEN];
        exact.push(b'\n');
        let mut reader = BufReader::new(exact.as_slice());
        assert_eq!(read_line(&mut reader, None).await.unwrap().map(|l| l.len()), Some(MAX_LINE_LEN));
    }

    #[tokio::test]
    async fn test_write_line() {
        let mock = Builder::new().write(b"Transfer ready\n").build();
        let mut writer = mock;
        write_line(&mut writer, status::TRANSFER_READY, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_frame_over_split_reads() {
        let mut bytes = 5u64.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"hello");
        let mock = Builder::new().read(&bytes[..3]).read(&bytes[3..9]).read(&bytes[9..]).build();
        let mut reader = mock;
        assert_eq!(read_frame(&mut reader, 16, None).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_frame_limit() {
        let bytes = 100u64.to_be_bytes();
        let mut reader = &bytes[..];
        assert!(matches!(
            read_frame(&mut reader, 10, None).await,
            Err(WireError::FrameTooLarge { len: 100, limit: 10 })
        ));
    }

    #[tokio::test]
    async fn test_truncated_header() {
        let mut reader = &[0u8, 0, 0][..];
        assert!(matches!(
            read_frame_header(&mut reader, None).await,
            Err(WireError::Truncated { expected: 8, received: 3 })
        ));
    }

    #[tokio::test]
    async fn test_relay_exact_length_leaves_rest() {
        let data = b"0123456789tail";
        let mut src = &data[..];
        let mut dst = Vec::new();
        let copied = relay(&mut src, &mut dst, 10, 3, None).await.unwrap();
        assert_eq!(copied, 10);
        assert_eq!(dst, b"0123456789");
        assert_eq!(src, b"tail");
    }

    #[tokio::test]
    async fn test_relay_zero_length() {
        let mut src = &b"next"[..];
        let mut dst = Vec::new();
        assert_eq!(relay(&mut src, &mut dst, 0, 4, None).await.unwrap(), 0);
        assert!(dst.is_empty());
        assert_eq!(src, b"next");
    }

    #[tokio::test]
    async fn test_relay_truncated_source() {
        let mut src = &b"abc"[..];
        let mut dst = Vec::new();
        let err = relay(&mut src, &mut dst, 8, 2, None).await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::Source(WireError::Truncated { expected: 8, received: 3 })
        ));
    }

    #[tokio::test]
    async fn test_relay_sink_failure_reports_remaining() {
        let mut src = &b"abcdef"[..];
        let mut dst = Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            .build();
        match relay(&mut src, &mut dst, 6, 2, None).await {
            Err(RelayError::Sink { remaining, .. }) => {
                assert_eq!(remaining, 4);
                drain(&mut src, remaining, 2, None).await.unwrap();
                assert!(src.is_empty());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let (_keep_open, mut far) = duplex(64);
        let err = read_frame_header(&mut far, Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::Timeout(_)));
    }
}
