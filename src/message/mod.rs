//! Transport-facing message abstraction.
//!
//! A transport hands the intake controller one `InboundMessage` per delivery.
//! Each content accessor can fail on its own; the extractor decides what to
//! do with the pieces.

pub mod raw;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SourceError;

pub use raw::RawMessage;

/// Chunked raw message bytes.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, SourceError>>;

/// One inbound message, as exposed by the delivery transport.
#[async_trait]
pub trait InboundMessage: Send + Sync {
    /// Envelope sender.
    fn envelope_from(&self) -> &str;

    /// Envelope recipient.
    fn envelope_to(&self) -> &str;

    /// Message headers in arrival order, name case preserved.
    fn headers(&self) -> &Headers;

    /// Open the raw byte stream.
    fn raw(&self) -> Result<ByteStream, SourceError>;

    /// Decoded plain-text body, `None` if the message has none.
    async fn text(&self) -> Result<Option<String>, SourceError>;

    /// Decoded HTML body, `None` if the message has none.
    async fn html(&self) -> Result<Option<String>, SourceError>;
}

/// Ordered header list. Names keep their original case; lookups ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }
}

/// Serialized as a JSON object in first-seen order. Values of a repeated
/// name (compared case-insensitively) are joined with `", "` in arrival
/// order under the first spelling of the name.
impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        let mut merged: Vec<(&str, String)> = Vec::with_capacity(self.len());
        for (name, value) in self.iter() {
            match merged.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some((_, joined)) => {
                    joined.push_str(", ");
                    joined.push_str(value);
                }
                None => merged.push((name, value.to_string())),
            }
        }

        let mut map = ser.serialize_map(Some(merged.len()))?;
        for (name, value) in &merged {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(de)?;
        Ok(map
            .into_iter()
            .map(|(name, value)| match value {
                serde_json::Value::String(s) => (name, s),
                other => (name, other.to_string()),
            })
            .collect())
    }
}
