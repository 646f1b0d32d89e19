//! Duplex byte channel handed over after the HTTP upgrade.
//!
//! [`ByteStream`] wraps whatever connection the collaborator hijacked and
//! exposes the three operations the protocol needs: read exactly `n` bytes,
//! write a whole buffer, and close. A stream can be split into a read half
//! and a write half so that a receive loop and concurrent senders never share
//! a lock.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::error::Result;

/// A duplex byte stream, or one half of one.
#[derive(Debug)]
pub struct ByteStream<T> {
    io: T,
}

impl<T> ByteStream<T> {
    /// Wrap an upgraded connection.
    #[must_use]
    pub fn new(io: T) -> Self {
        Self { io }
    }

    /// Get a reference to the underlying connection.
    #[must_use]
    pub fn get_ref(&self) -> &T {
        &self.io
    }

    /// Unwrap the underlying connection.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: AsyncRead + AsyncWrite> ByteStream<T> {
    /// Split into independently owned read and write halves.
    #[must_use]
    pub fn split(self) -> (ByteStream<ReadHalf<T>>, ByteStream<WriteHalf<T>>) {
        let (read, write) = tokio::io::split(self.io);
        (ByteStream::new(read), ByteStream::new(write))
    }
}

impl<T: AsyncRead + Unpin> ByteStream<T> {
    /// Read exactly `n` bytes into a single buffer sized up front.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` on a read failure or if the stream ends first.
    pub async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.io.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Read exactly `N` bytes into an array.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` on a read failure or if the stream ends first.
    pub async fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.io.read_exact(&mut buf).await?;
        Ok(buf)
    }
}

impl<T: AsyncWrite + Unpin> ByteStream<T> {
    /// Write the whole buffer and flush it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the write or flush fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.io.write_all(data).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Shut down the write side of the stream.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the shutdown fails.
    pub async fn close(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}
