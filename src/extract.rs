//! Best-effort body extraction.
//!
//! Three sources are read independently and their failures kept as values:
//! 1. the raw byte stream, drained and decoded as UTF-8 (lossy)
//! 2. the decoded plain-text accessor
//! 3. the decoded HTML accessor
//!
//! The body is then chosen by priority: text accessor, then the part of the
//! raw content after the first blank line, then a fixed placeholder. Nothing
//! here returns an error to the caller.

use std::panic::AssertUnwindSafe;

use futures::{FutureExt, StreamExt};
use serde::Serialize;

use crate::error::SourceError;
use crate::message::InboundMessage;
use crate::telemetry::{CycleEvents, IntakeEvent, SourceKind};

/// Body used when no source produced anything.
pub const EMPTY_BODY_PLACEHOLDER: &str = "(unable to parse message content)";

/// Which strategy produced `ExtractedContent::body`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodySource {
    RawStream,
    TextAccessor,
    ManualSplit,
    None,
}

impl BodySource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RawStream => "raw-stream",
            Self::TextAccessor => "text-accessor",
            Self::ManualSplit => "manual-split",
            Self::None => "none",
        }
    }
}

/// Extractor output. `body` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub body: String,
    pub html_body: String,
    pub source: BodySource,
}

/// Raw results of the three source reads.
#[derive(Debug, Clone)]
pub struct SourceReadings {
    pub raw: Result<String, SourceError>,
    pub text: Result<Option<String>, SourceError>,
    pub html: Result<Option<String>, SourceError>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Read all sources and pick the best body.
    pub async fn extract(&self, message: &dyn InboundMessage, events: &CycleEvents) -> ExtractedContent {
        let readings = read_sources(message).await;
        report_readings(&readings, events);

        let content = combine(&readings);
        events.emit(IntakeEvent::BodyExtracted {
            source: content.source,
            len: content.body.len(),
        });
        content
    }
}

/// Read the three sources concurrently. A panicking accessor counts as a
/// failed source.
pub async fn read_sources(message: &dyn InboundMessage) -> SourceReadings {
    let (raw, text, html) = futures::join!(
        guarded(drain_raw(message)),
        guarded(message.text()),
        guarded(message.html()),
    );
    SourceReadings { raw, text, html }
}

/// Drain the raw stream into one buffer and decode it.
pub async fn drain_raw(message: &dyn InboundMessage) -> Result<String, SourceError> {
    let mut stream = message.raw()?;
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn guarded<T, F>(fut: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(SourceError::Read("accessor panicked".into())))
}

fn report_readings(readings: &SourceReadings, events: &CycleEvents) {
    let lens = [
        (SourceKind::RawStream, readings.raw.as_ref().map(|s| s.len())),
        (
            SourceKind::TextAccessor,
            readings.text.as_ref().map(|t| t.as_ref().map_or(0, |s| s.len())),
        ),
        (
            SourceKind::HtmlAccessor,
            readings.html.as_ref().map(|h| h.as_ref().map_or(0, |s| s.len())),
        ),
    ];

    for (source, result) in lens {
        match result {
            Ok(len) => events.emit(IntakeEvent::SourceRead { source, len }),
            Err(e) => events.emit(IntakeEvent::SourceFailed {
                source,
                error: e.to_string(),
            }),
        }
    }
}

/// Choose the body from already-read sources.
///
/// Order: non-empty text as read, then the part of the raw stream after the
/// first blank line, then the placeholder. One case prefers raw content over
/// the placeholder: a raw stream that has a blank line but nothing after it.
/// That is a header-only message, and its trimmed header block is the only
/// readable content it carries, so it is relayed with `BodySource::RawStream`
/// rather than dropped. Raw content with no blank line at all has no known
/// body boundary and gets the placeholder.
pub fn combine(readings: &SourceReadings) -> ExtractedContent {
    let html_body = match &readings.html {
        Ok(Some(html)) => html.clone(),
        _ => String::new(),
    };

    if let Ok(Some(text)) = &readings.text
        && !text.is_empty()
    {
        return ExtractedContent {
            body: text.clone(),
            html_body,
            source: BodySource::TextAccessor,
        };
    }

    let (body, source) = match &readings.raw {
        Ok(raw) => match split_body(raw) {
            Some(body) if !body.is_empty() => (body, BodySource::ManualSplit),
            // Header block with nothing after it: relay what we have.
            Some(_) if !raw.trim().is_empty() => (raw.trim().to_string(), BodySource::RawStream),
            _ => placeholder(),
        },
        Err(_) => placeholder(),
    };

    ExtractedContent {
        body,
        html_body,
        source,
    }
}

/// Everything after the first blank line, trimmed. `None` when the content
/// has no blank line at all.
pub fn split_body(raw: &str) -> Option<String> {
    let mut lines = raw.split('\n');
    lines.by_ref().find(|line| line.trim().is_empty())?;
    let rest: Vec<&str> = lines.collect();
    Some(rest.join("\n").trim().to_string())
}

fn placeholder() -> (String, BodySource) {
    (EMPTY_BODY_PLACEHOLDER.to_string(), BodySource::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RecordingObserver;
    use crate::test_utils::{RawScript, StubMessage};

    const RAW: &str = "Subject: hi\r\nFrom: a@example.com\r\n\r\n  Body line one\r\nline two  \r\n";

    async fn run(msg: &StubMessage) -> (ExtractedContent, Vec<IntakeEvent>) {
        let rec = RecordingObserver::new();
        let events = CycleEvents::new(rec.clone());
        let content = ContentExtractor::new().extract(msg, &events).await;
        (content, rec.events())
    }

    #[test]
    fn split_after_first_blank_line() {
        assert_eq!(
            split_body(RAW).as_deref(),
            Some("Body line one\r\nline two")
        );
    }

    #[test]
    fn split_without_blank_line_is_none() {
        assert_eq!(split_body("Subject: hi\nFrom: a@b.com"), None);
    }

    #[test]
    fn split_keeps_later_blank_lines() {
        assert_eq!(
            split_body("H: v\n\npara one\n\npara two\n").as_deref(),
            Some("para one\n\npara two")
        );
    }

    #[tokio::test]
    async fn text_accessor_wins_verbatim() {
        let msg = StubMessage::broken()
            .with_raw(RAW)
            .with_text("  exact text\n")
            .with_html("<b>x</b>");
        let (content, _) = run(&msg).await;
        assert_eq!(content.body, "  exact text\n");
        assert_eq!(content.html_body, "<b>x</b>");
        assert_eq!(content.source, BodySource::TextAccessor);
    }

    #[tokio::test]
    async fn failed_text_falls_back_to_manual_split() {
        let msg = StubMessage::broken().with_raw(RAW);
        let (content, _) = run(&msg).await;
        assert_eq!(content.body, "Body line one\r\nline two");
        assert_eq!(content.html_body, "");
        assert_eq!(content.source, BodySource::ManualSplit);
    }

    #[tokio::test]
    async fn empty_text_falls_back_to_manual_split() {
        let msg = StubMessage::broken().with_raw(RAW).with_text("");
        let (content, _) = run(&msg).await;
        assert_eq!(content.source, BodySource::ManualSplit);
    }

    #[tokio::test]
    async fn raw_without_blank_line_gives_placeholder() {
        let msg = StubMessage::broken().with_raw("Subject: only headers\nX-A: b");
        let (content, _) = run(&msg).await;
        assert_eq!(content.body, EMPTY_BODY_PLACEHOLDER);
        assert_eq!(content.source, BodySource::None);
    }

    #[tokio::test]
    async fn headers_only_block_relays_raw_content() {
        let msg = StubMessage::broken().with_raw("Subject: x\n\n   \n");
        let (content, _) = run(&msg).await;
        assert_eq!(content.body, "Subject: x");
        assert_eq!(content.source, BodySource::RawStream);
    }

    #[tokio::test]
    async fn all_sources_failing_gives_placeholder() {
        let (content, events) = run(&StubMessage::broken()).await;
        assert_eq!(content.body, EMPTY_BODY_PLACEHOLDER);
        assert_eq!(content.html_body, "");
        assert_eq!(content.source, BodySource::None);

        let failed = events
            .iter()
            .filter(|e| matches!(e, IntakeEvent::SourceFailed { .. }))
            .count();
        assert_eq!(failed, 3);
    }

    #[tokio::test]
    async fn mid_stream_failure_discards_raw() {
        let mut msg = StubMessage::broken();
        msg.raw = RawScript::FailAfter(
            vec![RAW.as_bytes().to_vec()],
            SourceError::Read("reset".into()),
        );
        let (content, events) = run(&msg).await;
        assert_eq!(content.source, BodySource::None);
        assert!(events.contains(&IntakeEvent::SourceFailed {
            source: SourceKind::RawStream,
            error: "read failed: reset".into(),
        }));
    }

    #[tokio::test]
    async fn chunked_raw_is_joined_before_split() {
        let mut msg = StubMessage::broken();
        msg.raw = RawScript::Chunks(vec![b"Subject: a\r\n".to_vec(), b"\r\nhello".to_vec()]);
        let (content, _) = run(&msg).await;
        assert_eq!(content.body, "hello");
    }

    #[tokio::test]
    async fn panicking_accessor_is_a_failed_source() {
        let mut msg = StubMessage::broken().with_raw(RAW);
        msg.panic_in_text = true;
        let (content, events) = run(&msg).await;
        assert_eq!(content.source, BodySource::ManualSplit);
        assert!(events.contains(&IntakeEvent::SourceFailed {
            source: SourceKind::TextAccessor,
            error: "read failed: accessor panicked".into(),
        }));
    }

    #[tokio::test]
    async fn html_failure_does_not_affect_body() {
        let msg = StubMessage::broken().with_text("body");
        let (content, events) = run(&msg).await;
        assert_eq!(content.body, "body");
        assert_eq!(content.html_body, "");
        assert!(events.contains(&IntakeEvent::BodyExtracted {
            source: BodySource::TextAccessor,
            len: 4,
        }));
    }
}
