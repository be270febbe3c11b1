//! MIME body parts.
//!
//! A message body is a tree of parts: leaf parts carry content bytes,
//! multipart containers group children under a boundary. Children are
//! written in insertion order.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use mailwright_mime::{ContentDisposition, ContentType, Headers, TransferEncoding};
use tokio::io::AsyncWrite;

use crate::boundary::next_boundary;
use crate::error::Result;
use crate::writer::MailWriter;

/// Composite media subtypes for multipart containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartKind {
    /// Independent parts in sequence.
    Mixed,
    /// Alternative renderings of the same content, simplest first.
    Alternative,
    /// Independent parts that may be presented simultaneously.
    Parallel,
    /// A root part plus the resources it references.
    Related,
}

impl MultipartKind {
    /// The media subtype token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mixed => "mixed",
            Self::Alternative => "alternative",
            Self::Parallel => "parallel",
            Self::Related => "related",
        }
    }
}

impl fmt::Display for MultipartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leaf body part: content headers plus content bytes.
#[derive(Debug, Clone)]
pub struct SinglePart {
    content_type: ContentType,
    disposition: Option<ContentDisposition>,
    headers: Headers,
    encoding: TransferEncoding,
    body: Vec<u8>,
}

impl SinglePart {
    /// Creates a part with the given content type and raw body.
    ///
    /// The transfer encoding defaults to 7bit; pick another with
    /// [`with_encoding`](Self::with_encoding) when the body needs one.
    #[must_use]
    pub fn new(content_type: ContentType, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type,
            disposition: None,
            headers: Headers::new(),
            encoding: TransferEncoding::default(),
            body: body.into(),
        }
    }

    /// Creates a text/plain part.
    ///
    /// ASCII text is sent as 7bit, anything else as quoted-printable.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::typed_text(ContentType::text_plain(), body.into())
    }

    /// Creates a text/html part.
    ///
    /// ASCII text is sent as 7bit, anything else as quoted-printable.
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self::typed_text(ContentType::text_html(), body.into())
    }

    fn typed_text(content_type: ContentType, body: String) -> Self {
        let encoding = if body.is_ascii() {
            TransferEncoding::SevenBit
        } else {
            TransferEncoding::QuotedPrintable
        };
        Self::new(content_type, body.into_bytes()).with_encoding(encoding)
    }

    /// Sets the transfer encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: TransferEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the content disposition.
    #[must_use]
    pub fn with_disposition(mut self, disposition: ContentDisposition) -> Self {
        self.disposition = Some(disposition);
        self
    }

    /// Adds a custom header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// The part's content type.
    #[must_use]
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// The part's transfer encoding.
    #[must_use]
    pub fn encoding(&self) -> TransferEncoding {
        self.encoding
    }

    /// The raw (unencoded) body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The part's custom headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Writes the part's headers and encoded content through `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error when the writer rejects the sequence, the body
    /// does not fit the declared encoding, or the stream fails.
    pub async fn write_to<W>(&self, writer: &mut MailWriter<W>) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        writer.write_header("Content-Type", &self.content_type.to_string())?;
        if let Some(disposition) = &self.disposition {
            writer.write_header("Content-Disposition", &disposition.to_string())?;
        }
        for (name, value) in self.headers.iter() {
            writer.write_header(name, value)?;
        }
        writer.write_header("Content-Transfer-Encoding", &self.encoding.to_string())?;

        let mut content = writer.content_stream(self.encoding).await?;
        content.write(&self.body).await?;
        content.close().await
    }
}

/// A multipart container with an owned boundary and child parts.
#[derive(Debug, Clone)]
pub struct MultiPart {
    kind: MultipartKind,
    boundary: String,
    headers: Headers,
    parts: Vec<Part>,
}

impl MultiPart {
    /// Creates a container of the given kind with a fresh boundary.
    ///
    /// Boundaries come from the process-wide generator, so sibling and
    /// nested containers never share one.
    #[must_use]
    pub fn new(kind: MultipartKind) -> Self {
        Self {
            kind,
            boundary: next_boundary(),
            headers: Headers::new(),
            parts: Vec::new(),
        }
    }

    /// Creates a multipart/mixed container.
    #[must_use]
    pub fn mixed() -> Self {
        Self::new(MultipartKind::Mixed)
    }

    /// Creates a multipart/alternative container.
    #[must_use]
    pub fn alternative() -> Self {
        Self::new(MultipartKind::Alternative)
    }

    /// Creates a multipart/parallel container.
    #[must_use]
    pub fn parallel() -> Self {
        Self::new(MultipartKind::Parallel)
    }

    /// Creates a multipart/related container.
    #[must_use]
    pub fn related() -> Self {
        Self::new(MultipartKind::Related)
    }

    /// Replaces the generated boundary.
    #[must_use]
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = boundary.into();
        self
    }

    /// Adds a custom header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Appends a child part.
    #[must_use]
    pub fn with_part(mut self, part: impl Into<Part>) -> Self {
        self.push(part);
        self
    }

    /// Appends a child part in place.
    pub fn push(&mut self, part: impl Into<Part>) {
        self.parts.push(part.into());
    }

    /// Changes the composite kind, allocating a fresh boundary.
    pub fn set_kind(&mut self, kind: MultipartKind) {
        self.kind = kind;
        self.boundary = next_boundary();
    }

    /// The composite kind.
    #[must_use]
    pub fn kind(&self) -> MultipartKind {
        self.kind
    }

    /// The boundary token.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The child parts in send order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// The container's content type, boundary parameter included.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        ContentType::multipart(self.kind.as_str(), self.boundary.as_str())
    }

    /// Writes the container and every child in insertion order.
    ///
    /// A failing child aborts the remaining children; the error reaches
    /// the caller unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first error from a child part or the stream.
    pub async fn write_to<W>(&self, writer: &mut MailWriter<W>) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        writer.write_header("Content-Type", &self.content_type().to_string())?;
        for (name, value) in self.headers.iter() {
            writer.write_header(name, value)?;
        }
        writer.begin_multipart(self.boundary.as_str())?;

        for part in &self.parts {
            writer.start_part()?;
            part.write_to(writer).await?;
        }

        writer.end_multipart()
    }
}

/// A node of the body tree.
#[derive(Debug, Clone)]
pub enum Part {
    /// Leaf content part.
    Single(SinglePart),
    /// Multipart container.
    Multi(MultiPart),
}

impl Part {
    /// Writes this part through `writer`.
    ///
    /// Boxed so containers can hold parts of either variant at any
    /// nesting depth.
    ///
    /// # Errors
    ///
    /// Returns the first error from the part tree or the stream.
    pub fn write_to<'a, W>(
        &'a self,
        writer: &'a mut MailWriter<W>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match self {
            Self::Single(part) => Box::pin(part.write_to(writer)),
            Self::Multi(part) => Box::pin(part.write_to(writer)),
        }
    }
}

impl From<SinglePart> for Part {
    fn from(part: SinglePart) -> Self {
        Self::Single(part)
    }
}

impl From<MultiPart> for Part {
    fn from(part: MultiPart) -> Self {
        Self::Multi(part)
    }
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

    async fn render(part: Part) -> String {
        let mut writer = MailWriter::new(Vec::new());
        part.write_to(&mut writer).await.unwrap();
        let out = writer.close().await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_multipart_kind_tokens() {
        assert_eq!(MultipartKind::Mixed.as_str(), "mixed");
        assert_eq!(MultipartKind::Alternative.as_str(), "alternative");
        assert_eq!(MultipartKind::Parallel.as_str(), "parallel");
        assert_eq!(MultipartKind::Related.as_str(), "related");
    }

    #[test]
    fn test_text_part_picks_encoding() {
        assert_eq!(
            SinglePart::text("plain ascii").encoding(),
            TransferEncoding::SevenBit
        );
        assert_eq!(
            SinglePart::text("Héllo").encoding(),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_set_kind_allocates_fresh_boundary() {
        let mut part = MultiPart::mixed();
        let before = part.boundary().to_string();
        part.set_kind(MultipartKind::Alternative);

        assert_eq!(part.kind(), MultipartKind::Alternative);
        assert_ne!(part.boundary(), before);
    }

    #[tokio::test]
    async fn test_single_part_layout() {
        let out = render(SinglePart::text("Hello").into()).await;
        assert_eq!(
            out,
            concat!(
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Hello",
                "\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_single_part_header_order() {
        let part = SinglePart::new(ContentType::new("application", "octet-stream"), b"\x00".to_vec())
            .with_encoding(TransferEncoding::Base64)
            .with_disposition(ContentDisposition::attachment().with_filename("a.bin"))
            .with_header("Content-ID", "<one@local>");

        let out = render(part.into()).await;
        assert_eq!(
            out,
            concat!(
                "Content-Type: application/octet-stream\r\n",
                "Content-Disposition: attachment; filename=a.bin\r\n",
                "Content-ID: <one@local>\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "\r\n",
                "AA==\r\n",
                "\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_multipart_layout_in_insertion_order() {
        let part = MultiPart::mixed()
            .with_boundary("B")
            .with_part(SinglePart::text("first"))
            .with_part(SinglePart::text("second"));

        let out = render(part.into()).await;
        assert_eq!(
            out,
            concat!(
                "Content-Type: multipart/mixed; boundary=B\r\n",
                "\r\n",
                "--B\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "first",
                "\r\n--B\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "second",
                "\r\n--B--\r\n",
                "\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_multipart_sections_match_part_count() {
        let mut container = MultiPart::mixed().with_boundary("SECT");
        for i in 0..4 {
            container.push(SinglePart::text(format!("part {i}")));
        }

        let out = render(container.into()).await;
        // One delimiter per part plus a single closing delimiter
        assert_eq!(out.matches("--SECT\r\n").count(), 4);
        assert_eq!(out.matches("--SECT--\r\n").count(), 1);

        let order: Vec<usize> = (0..4)
            .map(|i| out.find(&format!("part {i}")).unwrap())
            .collect();
        assert!(order.is_sorted());
    }

    #[tokio::test]
    async fn test_nested_multipart() {
        let inner = MultiPart::alternative()
            .with_boundary("IN")
            .with_part(SinglePart::text("plain"))
            .with_part(SinglePart::html("<b>html</b>"));
        let outer = MultiPart::mixed()
            .with_boundary("OUT")
            .with_part(inner)
            .with_part(SinglePart::text("attachment body"));

        let out = render(outer.into()).await;
        assert_eq!(
            out,
            concat!(
                "Content-Type: multipart/mixed; boundary=OUT\r\n",
                "\r\n",
                "--OUT\r\n",
                "Content-Type: multipart/alternative; boundary=IN\r\n",
                "\r\n",
                "--IN\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "plain",
                "\r\n--IN\r\n",
                "Content-Type: text/html; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "<b>html</b>",
                "\r\n--IN--\r\n",
                "\r\n--OUT\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "attachment body",
                "\r\n--OUT--\r\n",
                "\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_failing_child_aborts_following_parts() {
        // 7bit declared but the body is not 7-bit clean
        let bad = SinglePart::new(ContentType::text_plain(), "Héllo".as_bytes().to_vec());
        let container = MultiPart::mixed()
            .with_boundary("B")
            .with_part(bad)
            .with_part(SinglePart::text("never written"));

        let mut writer = MailWriter::new(Vec::new());
        let err = Part::from(container).write_to(&mut writer).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Mime(_)));

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert!(!out.contains("never written"));
    }

    #[test]
    fn test_fresh_boundaries_are_distinct() {
        let a = MultiPart::mixed();
        let b = MultiPart::mixed();
        assert_ne!(a.boundary(), b.boundary());
    }
}
