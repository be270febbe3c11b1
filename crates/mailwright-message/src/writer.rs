//! Streaming mail writer.
//!
//! Buffers and folds headers, then hands out a one-shot content stream
//! wrapped in the chosen transfer encoding. Multipart framing is tracked
//! as a stack of boundaries on the writer, one frame per open container.

use bytes::BytesMut;
use mailwright_mime::TransferEncoding;
use mailwright_mime::encoding::ContentEncoder;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Maximum header value line length before folding.
const MAX_LINE_LENGTH: usize = 78;

/// Initial capacity of the header buffer.
const WRITE_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Buffering header lines for the current part.
    Headers,
    /// A content stream is active.
    Content,
    /// Content of the current part is complete; a sibling part, a
    /// container close, or the writer close may follow.
    PartDone,
}

#[derive(Debug)]
struct Frame {
    boundary: String,
    /// No part delimiter has been written in this frame yet.
    first: bool,
}

/// Streaming mail writer over an async byte stream.
///
/// Headers accumulate in an internal buffer and are flushed when a
/// content stream is taken or the writer closes. Content bytes go to the
/// stream directly, wrapped in the part's transfer encoding.
#[derive(Debug)]
pub struct MailWriter<W> {
    stream: W,
    buffer: BytesMut,
    frames: Vec<Frame>,
    state: State,
}

impl<W> MailWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Creates a writer over the given stream.
    pub fn new(stream: W) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(WRITE_BUFFER_SIZE),
            frames: Vec::new(),
            state: State::Headers,
        }
    }

    /// Buffers one header line, folding a long value on space boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once the content stream for the
    /// current part has been taken.
    pub fn write_header(&mut self, name: &str, value: &str) -> Result<()> {
        if self.state != State::Headers {
            return Err(Error::InvalidState(
                "header written after content".to_string(),
            ));
        }

        self.buffer.extend_from_slice(name.as_bytes());
        self.buffer.extend_from_slice(b": ");
        write_and_fold(&mut self.buffer, value);
        self.buffer.extend_from_slice(b"\r\n");
        Ok(())
    }

    /// Ends the header block and hands out the content stream.
    ///
    /// One-shot per part: the blank separator line is written, buffered
    /// headers are flushed, and content written through the returned
    /// stream is wrapped in `encoding`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when the content stream for the
    /// current part was already taken, and any I/O error from the flush.
    pub async fn content_stream(
        &mut self,
        encoding: TransferEncoding,
    ) -> Result<ContentStream<'_, W>> {
        if self.state != State::Headers {
            return Err(Error::InvalidState(
                "content stream already taken for this part".to_string(),
            ));
        }

        self.buffer.extend_from_slice(b"\r\n");
        self.flush_buffer().await?;
        self.state = State::Content;

        Ok(ContentStream {
            encoder: ContentEncoder::for_encoding(encoding),
            scratch: Vec::new(),
            writer: self,
        })
    }

    /// Opens a multipart container using `boundary`.
    ///
    /// Call after writing the container's own headers; each child part is
    /// then introduced with [`start_part`](Self::start_part) and the
    /// container closed with [`end_multipart`](Self::end_multipart).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once content for the current part
    /// has been written.
    pub fn begin_multipart(&mut self, boundary: impl Into<String>) -> Result<()> {
        if self.state != State::Headers {
            return Err(Error::InvalidState(
                "multipart begun after content".to_string(),
            ));
        }

        self.buffer.extend_from_slice(b"\r\n");
        self.frames.push(Frame {
            boundary: boundary.into(),
            first: true,
        });
        self.state = State::PartDone;
        Ok(())
    }

    /// Writes the delimiter introducing the next part of the innermost
    /// open container.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when no container is open or the
    /// previous part has not finished its content.
    pub fn start_part(&mut self) -> Result<()> {
        if self.state != State::PartDone {
            return Err(Error::InvalidState(
                "previous part is not finished".to_string(),
            ));
        }
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| Error::InvalidState("no multipart in progress".to_string()))?;

        // The delimiter owns the CRLF that precedes it, except for the
        // first one after the container prologue
        if frame.first {
            frame.first = false;
        } else {
            self.buffer.extend_from_slice(b"\r\n");
        }
        self.buffer.extend_from_slice(b"--");
        self.buffer.extend_from_slice(frame.boundary.as_bytes());
        self.buffer.extend_from_slice(b"\r\n");

        self.state = State::Headers;
        Ok(())
    }

    /// Writes the closing delimiter of the innermost open container.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when no container is open or the
    /// previous part has not finished its content.
    pub fn end_multipart(&mut self) -> Result<()> {
        if self.state != State::PartDone {
            return Err(Error::InvalidState(
                "previous part is not finished".to_string(),
            ));
        }
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| Error::InvalidState("no multipart in progress".to_string()))?;

        if !frame.first {
            self.buffer.extend_from_slice(b"\r\n");
        }
        self.buffer.extend_from_slice(b"--");
        self.buffer.extend_from_slice(frame.boundary.as_bytes());
        self.buffer.extend_from_slice(b"--\r\n");
        Ok(())
    }

    /// Writes the trailing CRLF, shuts the stream down, and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when a content stream was dropped
    /// without being closed or a multipart container is still open, and
    /// any I/O error from the final flush or shutdown.
    pub async fn close(mut self) -> Result<W> {
        if self.state == State::Content {
            return Err(Error::InvalidState(
                "content stream still open".to_string(),
            ));
        }
        if !self.frames.is_empty() {
            return Err(Error::InvalidState(
                "multipart container still open".to_string(),
            ));
        }

        self.buffer.extend_from_slice(b"\r\n");
        self.flush_buffer().await?;
        self.stream.shutdown().await?;
        tracing::trace!("Mail stream closed");
        Ok(self.stream)
    }

    /// Best-effort stream shutdown after a failed send.
    ///
    /// Buffered headers are discarded; a shutdown failure is logged
    /// rather than surfaced, so the original error stays visible.
    pub async fn abort(mut self) {
        self.buffer.clear();
        if let Err(e) = self.stream.shutdown().await {
            tracing::warn!(?e, "Failed to close stream after send failure");
        }
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.stream
    }

    /// Gets a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.stream
    }

    /// Consumes the writer and returns the inner stream.
    ///
    /// Note: Any buffered headers will be lost.
    pub fn into_inner(self) -> W {
        self.stream
    }

    async fn flush_buffer(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.stream.write_all(&self.buffer).await?;
            self.buffer.clear();
        }
        Ok(())
    }
}

/// One-shot content stream for a single part.
///
/// Bytes pass through the part's transfer encoding on the way to the
/// stream. Must be closed for the encoder tail to be written and the
/// writer to accept the next part.
#[derive(Debug)]
pub struct ContentStream<'a, W> {
    encoder: ContentEncoder,
    scratch: Vec<u8>,
    writer: &'a mut MailWriter<W>,
}

impl<W> ContentStream<'_, W>
where
    W: AsyncWrite + Unpin,
{
    /// Encodes and writes one chunk of content.
    ///
    /// # Errors
    ///
    /// Returns an encoding error for 7bit content with a byte outside the
    /// 7-bit range, or any I/O error from the stream.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.scratch.clear();
        self.encoder.encode(data, &mut self.scratch)?;
        if !self.scratch.is_empty() {
            self.writer.stream.write_all(&self.scratch).await?;
        }
        Ok(())
    }

    /// Writes the encoder tail and marks the part's content complete.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the stream.
    pub async fn close(mut self) -> Result<()> {
        self.scratch.clear();
        self.encoder.finish(&mut self.scratch);
        if !self.scratch.is_empty() {
            self.writer.stream.write_all(&self.scratch).await?;
        }
        self.writer.state = State::PartDone;
        Ok(())
    }
}

/// Writes `value`, folding on the last space of each 78-byte window.
///
/// The space moves to the start of the continuation line. A window with
/// no usable space is written unbroken.
fn write_and_fold(buffer: &mut BytesMut, value: &str) {
    let mut rest = value.as_bytes();
    while rest.len() > MAX_LINE_LENGTH {
        match rest[..MAX_LINE_LENGTH].iter().rposition(|&b| b == b' ') {
            Some(pos) if pos > 0 => {
                buffer.extend_from_slice(&rest[..pos]);
                buffer.extend_from_slice(b"\r\n");
                rest = &rest[pos..];
            }
            _ => break,
        }
    }
    buffer.extend_from_slice(rest);
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    async fn written(writer: MailWriter<Vec<u8>>) -> String {
        let out = writer.close().await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_headers_then_body() {
        use tokio_test::io::Builder;

        let mock = Builder::new()
            .write(b"Subject: Test\r\nFrom: a@b.com\r\n\r\nHello\r\n")
            .build();
        let mut writer = MailWriter::new(mock);

        writer.write_header("Subject", "Test").unwrap();
        writer.write_header("From", "a@b.com").unwrap();

        let mut content = writer.content_stream(TransferEncoding::SevenBit).await.unwrap();
        content.write(b"Hello").await.unwrap();
        content.close().await.unwrap();

        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_header_folding_breaks_on_last_space() {
        let value = format!("{} {}", "a".repeat(40), "b".repeat(50));
        let mut writer = MailWriter::new(Vec::new());
        writer.write_header("X-Long", &value).unwrap();

        let out = written(writer).await;
        let expected = format!("X-Long: {}\r\n {}\r\n\r\n", "a".repeat(40), "b".repeat(50));
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_header_folding_repeats_per_window() {
        let value = format!("{}abcde", "abcde ".repeat(19));
        assert_eq!(value.len(), 119);

        let mut writer = MailWriter::new(Vec::new());
        writer.write_header("X-Long", &value).unwrap();

        let out = written(writer).await;
        let expected = format!("X-Long: {}\r\n{}\r\n\r\n", &value[..77], &value[77..]);
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_header_without_space_is_not_folded() {
        let value = "x".repeat(200);
        let mut writer = MailWriter::new(Vec::new());
        writer.write_header("X-Long", &value).unwrap();

        let out = written(writer).await;
        assert_eq!(out, format!("X-Long: {value}\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_short_header_is_unchanged() {
        let mut writer = MailWriter::new(Vec::new());
        writer.write_header("Subject", "short").unwrap();

        let out = written(writer).await;
        assert_eq!(out, "Subject: short\r\n\r\n");
    }

    #[tokio::test]
    async fn test_header_after_content_errors() {
        let mut writer = MailWriter::new(Vec::new());
        writer.write_header("Subject", "Test").unwrap();

        let content = writer.content_stream(TransferEncoding::SevenBit).await.unwrap();
        content.close().await.unwrap();

        let err = writer.write_header("X-Late", "nope").unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_content_stream_is_one_shot() {
        let mut writer = MailWriter::new(Vec::new());
        let content = writer.content_stream(TransferEncoding::SevenBit).await.unwrap();
        content.close().await.unwrap();

        let err = writer
            .content_stream(TransferEncoding::SevenBit)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_close_appends_trailing_crlf() {
        let mut writer = MailWriter::new(Vec::new());
        let mut content = writer.content_stream(TransferEncoding::SevenBit).await.unwrap();
        content.write(b"body").await.unwrap();
        content.close().await.unwrap();

        let out = writer.close().await.unwrap();
        assert_eq!(out, b"\r\nbody\r\n".to_vec());
    }

    #[tokio::test]
    async fn test_multipart_layout() {
        let mut writer = MailWriter::new(Vec::new());
        writer
            .write_header("Content-Type", "multipart/mixed; boundary=XYZ")
            .unwrap();
        writer.begin_multipart("XYZ").unwrap();

        writer.start_part().unwrap();
        writer.write_header("Content-Type", "text/plain").unwrap();
        let mut content = writer.content_stream(TransferEncoding::SevenBit).await.unwrap();
        content.write(b"first").await.unwrap();
        content.close().await.unwrap();

        writer.start_part().unwrap();
        writer.write_header("Content-Type", "text/plain").unwrap();
        let mut content = writer.content_stream(TransferEncoding::SevenBit).await.unwrap();
        content.write(b"second").await.unwrap();
        content.close().await.unwrap();

        writer.end_multipart().unwrap();

        let out = written(writer).await;
        assert_eq!(
            out,
            concat!(
                "Content-Type: multipart/mixed; boundary=XYZ\r\n",
                "\r\n",
                "--XYZ\r\n",
                "Content-Type: text/plain\r\n",
                "\r\n",
                "first",
                "\r\n--XYZ\r\n",
                "Content-Type: text/plain\r\n",
                "\r\n",
                "second",
                "\r\n--XYZ--\r\n",
                "\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_empty_multipart_emits_only_closing_delimiter() {
        let mut writer = MailWriter::new(Vec::new());
        writer
            .write_header("Content-Type", "multipart/mixed; boundary=EMPTY")
            .unwrap();
        writer.begin_multipart("EMPTY").unwrap();
        writer.end_multipart().unwrap();

        let out = written(writer).await;
        assert_eq!(
            out,
            "Content-Type: multipart/mixed; boundary=EMPTY\r\n\r\n--EMPTY--\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_nested_multipart_layout() {
        let mut writer = MailWriter::new(Vec::new());
        writer.begin_multipart("OUTER").unwrap();

        writer.start_part().unwrap();
        writer.begin_multipart("INNER").unwrap();
        writer.start_part().unwrap();
        let content = writer.content_stream(TransferEncoding::SevenBit).await.unwrap();
        content.close().await.unwrap();
        writer.end_multipart().unwrap();

        writer.end_multipart().unwrap();

        let out = written(writer).await;
        assert_eq!(
            out,
            concat!(
                "\r\n",
                "--OUTER\r\n",
                "\r\n",
                "--INNER\r\n",
                "\r\n",
                "\r\n--INNER--\r\n",
                "\r\n--OUTER--\r\n",
                "\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_quoted_printable_content() {
        let mut writer = MailWriter::new(Vec::new());
        let mut content = writer
            .content_stream(TransferEncoding::QuotedPrintable)
            .await
            .unwrap();
        content.write("Héllo".as_bytes()).await.unwrap();
        content.close().await.unwrap();

        let out = written(writer).await;
        assert_eq!(out, "\r\nH=C3=A9llo\r\n");
    }

    #[tokio::test]
    async fn test_base64_content() {
        let mut writer = MailWriter::new(Vec::new());
        let mut content = writer.content_stream(TransferEncoding::Base64).await.unwrap();
        content.write(b"Hello, World!").await.unwrap();
        content.close().await.unwrap();

        let out = written(writer).await;
        assert_eq!(out, "\r\nSGVsbG8sIFdvcmxkIQ==\r\n\r\n");
    }

    #[tokio::test]
    async fn test_seven_bit_rejects_non_ascii_body() {
        let mut writer = MailWriter::new(Vec::new());
        let mut content = writer.content_stream(TransferEncoding::SevenBit).await.unwrap();

        let err = content.write("Héllo".as_bytes()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Mime(mailwright_mime::Error::NonAsciiBody(0xC3))
        ));
    }

    #[tokio::test]
    async fn test_part_framing_requires_open_container() {
        let mut writer = MailWriter::new(Vec::new());
        let content = writer.content_stream(TransferEncoding::SevenBit).await.unwrap();
        content.close().await.unwrap();

        assert!(matches!(
            writer.start_part(),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            writer.end_multipart(),
            Err(Error::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_start_part_requires_finished_sibling() {
        let mut writer = MailWriter::new(Vec::new());
        writer.begin_multipart("B").unwrap();
        writer.start_part().unwrap();

        // The new part is still in its header phase
        assert!(matches!(
            writer.start_part(),
            Err(Error::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_close_with_open_container_errors() {
        let mut writer = MailWriter::new(Vec::new());
        writer.begin_multipart("OPEN").unwrap();

        let err = writer.close().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_close_after_abandoned_content_stream_errors() {
        let mut writer = MailWriter::new(Vec::new());
        let content = writer.content_stream(TransferEncoding::SevenBit).await.unwrap();
        drop(content);

        let err = writer.close().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_into_inner_drops_buffered_headers() {
        let mut writer = MailWriter::new(Vec::new());
        writer.write_header("Subject", "Test").unwrap();

        let out = writer.into_inner();
        assert!(out.is_empty());
    }
}
