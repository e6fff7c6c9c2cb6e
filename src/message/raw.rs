//! Bytes-backed inbound message.
//!
//! Holds the raw RFC 5322 message as received from the transport. The raw
//! accessor streams the bytes back in chunks; the text and HTML accessors
//! decode through `mail-parser`.

use async_trait::async_trait;
use mail_parser::{MessageParser, PartType};

use super::{ByteStream, Headers, InboundMessage};
use crate::error::SourceError;

/// Chunk size used when streaming the raw bytes.
const RAW_CHUNK_SIZE: usize = 8 * 1024;

/// A message delivered as raw bytes plus envelope addresses.
#[derive(Debug, Clone)]
pub struct RawMessage {
    envelope_from: String,
    envelope_to: String,
    headers: Headers,
    raw: Vec<u8>,
}

impl RawMessage {
    /// Wrap raw message bytes. Headers are read from the header block.
    pub fn new(envelope_from: impl Into<String>, envelope_to: impl Into<String>, raw: Vec<u8>) -> Self {
        let headers = parse_header_block(&String::from_utf8_lossy(&raw));
        Self {
            envelope_from: envelope_from.into(),
            envelope_to: envelope_to.into(),
            headers,
            raw,
        }
    }

    pub fn with_envelope(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.envelope_from = from.into();
        self.envelope_to = to.into();
        self
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    fn parsed(&self) -> Result<mail_parser::Message<'_>, SourceError> {
        MessageParser::default()
            .parse(self.raw.as_slice())
            .ok_or_else(|| SourceError::Decode("message could not be parsed".into()))
    }
}

#[async_trait]
impl InboundMessage for RawMessage {
    fn envelope_from(&self) -> &str {
        &self.envelope_from
    }

    fn envelope_to(&self) -> &str {
        &self.envelope_to
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn raw(&self) -> Result<ByteStream, SourceError> {
        let chunks: Vec<Result<Vec<u8>, SourceError>> = self
            .raw
            .chunks(RAW_CHUNK_SIZE)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn text(&self) -> Result<Option<String>, SourceError> {
        let parsed = self.parsed()?;
        Ok(parsed.body_text(0).map(|text| text.into_owned()))
    }

    async fn html(&self) -> Result<Option<String>, SourceError> {
        let parsed = self.parsed()?;
        // A text-only message lists its text part as the HTML body too; only
        // report a real text/html part.
        Ok(parsed.html_part(0).and_then(|part| match &part.body {
            PartType::Html(html) => Some(html.to_string()),
            _ => None,
        }))
    }
}

/// Read the header block (everything before the first blank line).
///
/// Folded continuation lines are joined onto the previous header with a
/// single space. Lines without a colon are skipped.
pub fn parse_header_block(raw: &str) -> Headers {
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            break;
        }

        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }

        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if !name.is_empty() {
                headers.push((name.to_string(), value.trim().to_string()));
            }
        }
    }

    headers.into_iter().collect()
}
