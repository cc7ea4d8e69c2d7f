//! Line framing over a connected stream.

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::error::ProtocolError;
use crate::wire::{self, MAX_LINE_LENGTH};

/// Split a connected stream into a line sender and receiver.
pub fn split(stream: TcpStream) -> (LineSender, LineReceiver) {
    let (read, write) = stream.into_split();
    (LineSender::new(write), LineReceiver::new(read))
}

/// Writes newline-terminated lines, flushing after each one.
pub struct LineSender<W = OwnedWriteHalf> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineSender<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Send one line. Fails without writing if `text` contains a line break.
    pub async fn send(&mut self, text: &str) -> Result<(), ProtocolError> {
        let bytes = wire::encode_line(text)?;
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        trace!(len = bytes.len(), "sent line");
        Ok(())
    }

    /// Close the write direction.
    pub async fn shutdown(&mut self) -> Result<(), ProtocolError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Reads newline-terminated lines.
pub struct LineReceiver<R = OwnedReadHalf> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReceiver<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Receive the next complete line, without its terminator.
    ///
    /// Returns `None` once the peer has closed the stream. Bytes after the
    /// last terminator at end-of-stream are discarded. Invalid UTF-8 does not
    /// end the stream; it is decoded lossily.
    pub async fn recv(&mut self) -> Result<Option<String>, ProtocolError> {
        self.buf.clear();
        // Room for the longest allowed line plus "\r\n".
        let limit = MAX_LINE_LENGTH + 2;
        let n = (&mut self.reader)
            .take(limit as u64)
            .read_until(b'\n', &mut self.buf)
            .await?;
        if n == 0 {
            return Ok(None);
        }

        match wire::strip_terminator(&self.buf) {
            Some(line) if line.len() > MAX_LINE_LENGTH => Err(ProtocolError::LineTooLong {
                len: line.len(),
                max: MAX_LINE_LENGTH,
            }),
            Some(line) => {
                trace!(len = n, "received line");
                Ok(Some(wire::decode_line(line)))
            }
            None if n >= limit => Err(ProtocolError::LineTooLong {
                len: n,
                max: MAX_LINE_LENGTH,
            }),
            None => {
                debug!(len = n, "stream ended mid-line, discarding fragment");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_survive_partial_writes() {
        let (client, server) = tokio::io::duplex(64);
        let mut rx = LineReceiver::new(server);

        let writer = tokio::spawn(async move {
            let mut client = client;
            for chunk in [&b"hel"[..], b"lo\nwor", b"ld\r\n", b"\n", b"tail"] {
                client.write_all(chunk).await.unwrap();
                client.flush().await.unwrap();
                tokio::task::yield_now().await;
            }
        });

        assert_eq!(rx.recv().await.unwrap().as_deref(), Some("hello"));
        assert_eq!(rx.recv().await.unwrap().as_deref(), Some("world"));
        assert_eq!(rx.recv().await.unwrap().as_deref(), Some(""));
        writer.await.unwrap();
        // "tail" never got a terminator.
        assert_eq!(rx.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_end_the_stream() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut rx = LineReceiver::new(server);

        client.write_all(b"caf\xe9\nnext\n").await.unwrap();
        drop(client);

        assert_eq!(
            rx.recv().await.unwrap().as_deref(),
            Some("caf\u{fffd}")
        );
        assert_eq!(rx.recv().await.unwrap().as_deref(), Some("next"));
        assert_eq!(rx.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn overlong_line_is_rejected() {
        let (client, server) = tokio::io::duplex(MAX_LINE_LENGTH * 2);
        let mut rx = LineReceiver::new(server);
        let mut tx = LineSender::new(client);

        let long = "x".repeat(MAX_LINE_LENGTH + 10);
        tokio::spawn(async move {
            let _ = tx.send(&long).await;
        });

        assert!(matches!(
            rx.recv().await,
            Err(ProtocolError::LineTooLong { .. })
        ));
    }

    #[tokio::test]
    async fn sender_rejects_multiline_text() {
        let (client, _server) = tokio::io::duplex(64);
        let mut tx = LineSender::new(client);
        assert!(matches!(
            tx.send("a\nb").await,
            Err(ProtocolError::EmbeddedNewline)
        ));
    }
}
