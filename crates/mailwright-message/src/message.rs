//! Outgoing message assembly.

use chrono::{DateTime, Utc};
use mailwright_mime::Headers;
use mailwright_mime::encoded_word::encode_header_value;
use tokio::io::AsyncWrite;

use crate::address::MailAddress;
use crate::error::{Error, Result};
use crate::part::Part;
use crate::writer::MailWriter;

/// An outgoing message: envelope headers plus a body part tree.
#[derive(Debug, Clone)]
pub struct Message {
    from: MailAddress,
    to: Vec<MailAddress>,
    cc: Vec<MailAddress>,
    bcc: Vec<MailAddress>,
    reply_to: Option<MailAddress>,
    subject: String,
    date: Option<DateTime<Utc>>,
    headers: Headers,
    body: Part,
}

impl Message {
    /// Creates a message from a sender and a body.
    #[must_use]
    pub fn new(from: MailAddress, body: impl Into<Part>) -> Self {
        Self {
            from,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: None,
            subject: String::new(),
            date: None,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: MailAddress) -> Self {
        self.to.push(recipient);
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: MailAddress) -> Self {
        self.cc.push(recipient);
        self
    }

    /// Adds a BCC recipient.
    ///
    /// BCC recipients receive the message but never appear in its
    /// headers.
    #[must_use]
    pub fn bcc(mut self, recipient: MailAddress) -> Self {
        self.bcc.push(recipient);
        self
    }

    /// Sets the Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, address: MailAddress) -> Self {
        self.reply_to = Some(address);
        self
    }

    /// Sets the subject line.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the Date header value.
    ///
    /// Without an explicit date the current time is stamped when the
    /// message is written.
    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Adds a custom header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// The sender address.
    #[must_use]
    pub fn from(&self) -> &MailAddress {
        &self.from
    }

    /// All recipients (to, cc, bcc) for the transport envelope.
    #[must_use]
    pub fn recipients(&self) -> Vec<&MailAddress> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .collect()
    }

    /// The body part tree.
    #[must_use]
    pub fn body(&self) -> &Part {
        &self.body
    }

    /// Writes the complete message to `stream` and returns the stream.
    ///
    /// Envelope headers come first, then the body part tree; the stream
    /// is shut down exactly once, on success and on failure alike. On
    /// failure the original error is returned and a shutdown problem is
    /// only logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRecipients`] when no To, Cc, or Bcc recipient
    /// is set, and otherwise the first error from the part tree or the
    /// stream.
    pub async fn write_to<W>(&self, stream: W) -> Result<W>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(Error::NoRecipients);
        }

        tracing::debug!(
            from = %self.from,
            recipients = self.to.len() + self.cc.len() + self.bcc.len(),
            "Writing message"
        );

        let mut writer = MailWriter::new(stream);
        match self.write_envelope_and_body(&mut writer).await {
            Ok(()) => writer.close().await,
            Err(e) => {
                writer.abort().await;
                Err(e)
            }
        }
    }

    async fn write_envelope_and_body<W>(&self, writer: &mut MailWriter<W>) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        writer.write_header("From", &self.from.encoded_address())?;
        if !self.to.is_empty() {
            writer.write_header("To", &join_addresses(&self.to))?;
        }
        if !self.cc.is_empty() {
            writer.write_header("Cc", &join_addresses(&self.cc))?;
        }
        // Bcc recipients are envelope-only
        if let Some(reply_to) = &self.reply_to {
            writer.write_header("Reply-To", &reply_to.encoded_address())?;
        }
        if !self.subject.is_empty() {
            writer.write_header("Subject", &encode_header_value(&self.subject, None, false))?;
        }
        let date = self.date.unwrap_or_else(Utc::now);
        writer.write_header("Date", &date.to_rfc2822())?;
        for (name, value) in self.headers.iter() {
            writer.write_header(name, value)?;
        }
        writer.write_header("MIME-Version", "1.0")?;

        self.body.write_to(writer).await
    }
}

fn join_addresses(addresses: &[MailAddress]) -> String {
    addresses
        .iter()
        .map(MailAddress::encoded_address)
        .collect::<Vec<_>>()
        .join(", ")
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
    use chrono::TimeZone;
    use mailwright_mime::ContentType;

    use super::*;
    use crate::part::SinglePart;

    fn addr(s: &str) -> MailAddress {
        MailAddress::parse(s).unwrap()
    }

    async fn render(message: &Message) -> String {
        let out = message.write_to(Vec::new()).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_simple_message_layout() {
        let message = Message::new(addr("sender@example.com"), SinglePart::text("Hello"))
            .to(addr("jane@example.com"))
            .subject("Greetings")
            .date(Utc.with_ymd_and_hms(2024, 5, 17, 10, 30, 0).unwrap());

        assert_eq!(
            render(&message).await,
            concat!(
                "From: sender@example.com\r\n",
                "To: jane@example.com\r\n",
                "Subject: Greetings\r\n",
                "Date: Fri, 17 May 2024 10:30:00 +0000\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Hello",
                "\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_date_is_stamped_when_not_set() {
        let message = Message::new(addr("s@example.com"), SinglePart::text("x"))
            .to(addr("r@example.com"));

        let out = render(&message).await;
        assert!(out.contains("\r\nDate: "));
    }

    #[tokio::test]
    async fn test_recipient_lists_are_joined() {
        let message = Message::new(addr("s@example.com"), SinglePart::text("x"))
            .to(addr("a@example.com"))
            .to(addr("\"B C\" <b@example.com>"))
            .cc(addr("c@example.com"));

        let out = render(&message).await;
        assert!(out.contains("To: a@example.com, \"B C\" <b@example.com>\r\n"));
        assert!(out.contains("Cc: c@example.com\r\n"));
    }

    #[tokio::test]
    async fn test_bcc_recipients_never_appear_in_headers() {
        let message = Message::new(addr("s@example.com"), SinglePart::text("x"))
            .bcc(addr("hidden@example.com"));

        let out = render(&message).await;
        assert!(!out.contains("hidden@example.com"));
        assert!(!out.contains("Bcc"));
        assert_eq!(message.recipients().len(), 1);
    }

    #[tokio::test]
    async fn test_no_recipients_is_an_error() {
        let message = Message::new(addr("s@example.com"), SinglePart::text("x"));
        assert!(matches!(
            message.write_to(Vec::new()).await,
            Err(Error::NoRecipients)
        ));
    }

    #[tokio::test]
    async fn test_non_ascii_subject_is_encoded() {
        let message = Message::new(addr("s@example.com"), SinglePart::text("x"))
            .to(addr("r@example.com"))
            .subject("Héllo");

        let out = render(&message).await;
        assert!(out.contains("Subject: =?utf-8?Q?H=C3=A9llo?=\r\n"));
        assert!(out.is_ascii());
    }

    #[tokio::test]
    async fn test_reply_to_date_and_custom_headers() {
        let date = Utc.with_ymd_and_hms(2024, 5, 17, 10, 30, 0).unwrap();
        let message = Message::new(addr("s@example.com"), SinglePart::text("x"))
            .to(addr("r@example.com"))
            .reply_to(addr("replies@example.com"))
            .date(date)
            .header("X-Mailer", "mailwright");

        let out = render(&message).await;
        assert!(out.contains("Reply-To: replies@example.com\r\n"));
        assert!(out.contains("Date: Fri, 17 May 2024 10:30:00 +0000\r\n"));
        assert!(out.contains("X-Mailer: mailwright\r\n"));
        assert!(out.contains("MIME-Version: 1.0\r\n"));
    }

    #[tokio::test]
    async fn test_failing_body_surfaces_original_error() {
        // Declared 7bit with a body that is not 7-bit clean
        let bad = SinglePart::new(ContentType::text_plain(), "Héllo".as_bytes().to_vec());
        let message = Message::new(addr("s@example.com"), bad).to(addr("r@example.com"));

        let err = message.write_to(Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::Mime(_)));
    }
}
