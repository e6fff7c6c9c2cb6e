//! Outbound record assembly.

use serde::{Deserialize, Serialize};

use crate::extract::ExtractedContent;
use crate::message::{Headers, InboundMessage};

/// Payload posted to the downstream API. Every field is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub html_body: String,
    pub headers: Headers,
}

/// Build the record from envelope, headers and extracted content.
pub fn normalize(message: &dyn InboundMessage, extracted: ExtractedContent) -> NormalizedRecord {
    let headers = message.headers().clone();
    NormalizedRecord {
        from: message.envelope_from().to_string(),
        to: message.envelope_to().to_string(),
        subject: headers.get("subject").unwrap_or_default().to_string(),
        body: extracted.body,
        html_body: extracted.html_body,
        headers,
    }
}
