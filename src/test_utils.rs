//! Shared test utilities: a scriptable inbound message.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::message::{ByteStream, Headers, InboundMessage};

/// What the raw accessor does.
#[derive(Debug, Clone)]
pub enum RawScript {
    Chunks(Vec<Vec<u8>>),
    /// Yield the chunks, then fail mid-stream.
    FailAfter(Vec<Vec<u8>>, SourceError),
    Unavailable(SourceError),
}

/// An `InboundMessage` whose accessors return pre-scripted results.
#[derive(Debug, Clone)]
pub struct StubMessage {
    pub from: String,
    pub to: String,
    pub headers: Headers,
    pub raw: RawScript,
    pub text: Result<Option<String>, SourceError>,
    pub html: Result<Option<String>, SourceError>,
    pub panic_in_text: bool,
}

impl StubMessage {
    /// A message where every source fails.
    pub fn broken() -> Self {
        Self {
            from: "sender@example.com".into(),
            to: "inbox@example.com".into(),
            headers: Headers::new(),
            raw: RawScript::Unavailable(SourceError::Unavailable("no stream".into())),
            text: Err(SourceError::Read("text accessor failed".into())),
            html: Err(SourceError::Read("html accessor failed".into())),
            panic_in_text: false,
        }
    }

    pub fn with_raw(mut self, raw: &str) -> Self {
        self.raw = RawScript::Chunks(vec![raw.as_bytes().to_vec()]);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Ok(Some(text.to_string()));
        self
    }

    pub fn with_html(mut self, html: &str) -> Self {
        self.html = Ok(Some(html.to_string()));
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(name, value);
        self
    }
}

#[async_trait]
impl InboundMessage for StubMessage {
    fn envelope_from(&self) -> &str {
        &self.from
    }

    fn envelope_to(&self) -> &str {
        &self.to
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn raw(&self) -> Result<ByteStream, SourceError> {
        match &self.raw {
            RawScript::Chunks(chunks) => {
                let items: Vec<Result<Vec<u8>, SourceError>> =
                    chunks.iter().cloned().map(Ok).collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
            RawScript::FailAfter(chunks, err) => {
                let mut items: Vec<Result<Vec<u8>, SourceError>> =
                    chunks.iter().cloned().map(Ok).collect();
                items.push(Err(err.clone()));
                Ok(Box::pin(futures::stream::iter(items)))
            }
            RawScript::Unavailable(err) => Err(err.clone()),
        }
    }

    async fn text(&self) -> Result<Option<String>, SourceError> {
        if self.panic_in_text {
            panic!("text accessor blew up");
        }
        self.text.clone()
    }

    async fn html(&self) -> Result<Option<String>, SourceError> {
        self.html.clone()
    }
}
