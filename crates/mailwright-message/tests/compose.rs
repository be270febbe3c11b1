//! Integration tests for message composition.
//!
//! These tests render complete messages through a mock stream and
//! assert on the exact wire bytes and the stream shutdown behavior.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use chrono::{TimeZone, Utc};
use tokio::io::AsyncWrite;

use mailwright_message::{
    ContentDisposition, ContentType, MailAddress, MailWriter, Message, MultiPart, SinglePart,
    TransferEncoding,
};

/// Mock stream that captures written bytes and counts shutdowns.
#[derive(Clone, Debug, Default)]
struct MockStream {
    /// Everything written so far.
    written: Arc<Mutex<Vec<u8>>>,
    /// Number of shutdown calls.
    shutdowns: Arc<AtomicUsize>,
}

impl MockStream {
    fn new() -> Self {
        Self::default()
    }

    fn written_string(&self) -> String {
        String::from_utf8(self.written.lock().unwrap().clone()).unwrap()
    }

    fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

fn addr(s: &str) -> MailAddress {
    MailAddress::parse(s).unwrap()
}

#[tokio::test]
async fn test_full_multipart_message_bytes() {
    let alternative = MultiPart::alternative()
        .with_boundary("inner")
        .with_part(SinglePart::text("Hello, World!"))
        .with_part(SinglePart::html("<p>Hello, World!</p>"));

    let attachment = SinglePart::new(
        ContentType::new("application", "octet-stream"),
        vec![0x00, 0x01, 0x02],
    )
    .with_encoding(TransferEncoding::Base64)
    .with_disposition(ContentDisposition::attachment().with_filename("data.bin"));

    let body = MultiPart::mixed()
        .with_boundary("outer")
        .with_part(alternative)
        .with_part(attachment);

    let message = Message::new(addr("sender@example.com"), body)
        .to(addr("Jane Doe <jane@example.com>"))
        .subject("Greetings")
        .date(Utc.with_ymd_and_hms(2024, 5, 17, 10, 30, 0).unwrap());

    let out = message.write_to(Vec::new()).await.unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        concat!(
            "From: sender@example.com\r\n",
            "To: \"Jane Doe\" <jane@example.com>\r\n",
            "Subject: Greetings\r\n",
            "Date: Fri, 17 May 2024 10:30:00 +0000\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/mixed; boundary=outer\r\n",
            "\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=inner\r\n",
            "\r\n",
            "--inner\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: 7bit\r\n",
            "\r\n",
            "Hello, World!",
            "\r\n--inner\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "Content-Transfer-Encoding: 7bit\r\n",
            "\r\n",
            "<p>Hello, World!</p>",
            "\r\n--inner--\r\n",
            "\r\n--outer\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Disposition: attachment; filename=data.bin\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AAEC\r\n",
            "\r\n--outer--\r\n",
            "\r\n",
        )
    );
}

#[tokio::test]
async fn test_stream_is_shut_down_once_on_success() {
    let stream = MockStream::new();
    let message = Message::new(addr("s@example.com"), SinglePart::text("Hello"))
        .to(addr("r@example.com"));

    message.write_to(stream.clone()).await.unwrap();

    assert_eq!(stream.shutdown_count(), 1);
    assert!(stream.written_string().contains("MIME-Version: 1.0\r\n"));
    assert!(stream.written_string().ends_with("Hello\r\n"));
}

#[tokio::test]
async fn test_stream_is_shut_down_once_on_failure() {
    let stream = MockStream::new();

    // The second part declares 7bit but is not 7-bit clean
    let body = MultiPart::mixed()
        .with_boundary("FAIL")
        .with_part(SinglePart::text("first part"))
        .with_part(SinglePart::new(
            ContentType::text_plain(),
            "Héllo".as_bytes().to_vec(),
        ))
        .with_part(SinglePart::text("never reached"));

    let message = Message::new(addr("s@example.com"), body).to(addr("r@example.com"));
    let err = message.write_to(stream.clone()).await.unwrap_err();

    assert!(matches!(err, mailwright_message::Error::Mime(_)));
    assert_eq!(stream.shutdown_count(), 1);

    let written = stream.written_string();
    assert!(written.contains("first part"));
    assert!(!written.contains("Héllo"));
    assert!(!written.contains("never reached"));
}

#[tokio::test]
async fn test_long_recipient_list_folds_and_unfolds() {
    let recipients: Vec<String> = (0..6)
        .map(|i| format!("recipient-{i}@example.com"))
        .collect();

    let mut message = Message::new(addr("s@example.com"), SinglePart::text("x"));
    for recipient in &recipients {
        message = message.to(addr(recipient));
    }

    let out = message.write_to(Vec::new()).await.unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("\r\n "));

    // Folding moves the break space to the continuation line, so
    // unfolding restores the header value byte for byte.
    let unfolded = out.replace("\r\n ", " ");
    assert!(unfolded.contains(&format!("To: {}\r\n", recipients.join(", "))));
}

#[tokio::test]
async fn test_writer_compose_by_hand() {
    let mut writer = MailWriter::new(Vec::new());
    writer.write_header("Subject", "Manual").unwrap();
    writer
        .write_header("Content-Type", "text/plain; charset=utf-8")
        .unwrap();
    writer
        .write_header("Content-Transfer-Encoding", "quoted-printable")
        .unwrap();

    let mut content = writer
        .content_stream(TransferEncoding::QuotedPrintable)
        .await
        .unwrap();
    content.write("café".as_bytes()).await.unwrap();
    content.close().await.unwrap();

    let out = writer.close().await.unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        concat!(
            "Subject: Manual\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "caf=C3=A9",
            "\r\n",
        )
    );
}

#[test]
fn test_generated_boundaries_are_unique() {
    let first = MultiPart::mixed();
    let second = MultiPart::mixed();
    assert_ne!(first.boundary(), second.boundary());
}
