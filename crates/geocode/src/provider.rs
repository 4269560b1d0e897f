//! Reverse-geocoding providers.
//!
//! This module defines the `ReverseGeocoder` trait and its implementations:
//! - Nominatim-style HTTP endpoints (the production path)
//! - A static in-memory provider for tests and offline runs
//!
//! New providers can be added by implementing the `ReverseGeocoder` trait.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;

use crate::coord::Coord;

/// Error type for provider operations.
#[derive(Debug)]
pub struct GeocodeError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GeocodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl GeocodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Address detail of a reverse-geocoding reply.
///
/// Only the keys the label derivation understands are kept; everything else
/// in the provider payload is ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Address {
    #[serde(default)]
    pub amenity: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub shop: Option<String>,
    #[serde(default)]
    pub tourism: Option<String>,
    #[serde(default)]
    pub prefecture: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub quarter: Option<String>,
    #[serde(default)]
    pub neighbourhood: Option<String>,
    #[serde(default)]
    pub road: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub house_number: Option<String>,
}

/// A reverse-geocoding reply, reduced to the fields label derivation reads.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ReverseReply {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: Address,
}

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for reverse-geocoding backends.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait ReverseGeocoder: Send + Sync {
    /// Look up address detail for a coordinate.
    ///
    /// A malformed payload or non-success status is an `Err`; the resolver
    /// absorbs those into its fallback path.
    fn reverse(&self, coord: Coord) -> BoxFuture<'_, Result<ReverseReply, GeocodeError>>;
}

/// Nominatim-compatible HTTP reverse-geocoding source.
pub struct NominatimSource {
    endpoint: String,
    language: String,
    user_agent: String,
    client: reqwest::Client,
}

pub const DEFAULT_NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org";

impl NominatimSource {
    pub fn new(endpoint: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            language: language.into(),
            user_agent: "fieldlog/0.1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn reverse_url(&self, coord: Coord) -> String {
        format!(
            "{}/reverse?format=json&lat={}&lon={}&zoom=18&addressdetails=1&accept-language={}",
            self.endpoint.trim_end_matches('/'),
            coord.lat,
            coord.lon,
            self.language
        )
    }
}

impl ReverseGeocoder for NominatimSource {
    fn reverse(&self, coord: Coord) -> BoxFuture<'_, Result<ReverseReply, GeocodeError>> {
        let url = self.reverse_url(coord);
        Box::pin(async move {
            let resp = self
                .client
                .get(&url)
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .send()
                .await
                .map_err(|e| GeocodeError::with_source("Reverse geocode request failed", e))?;

            if !resp.status().is_success() {
                return Err(GeocodeError::new(format!(
                    "Reverse geocode HTTP error: {}",
                    resp.status()
                )));
            }

            resp.json::<ReverseReply>()
                .await
                .map_err(|e| GeocodeError::with_source("Malformed reverse geocode payload", e))
        })
    }
}

/// In-memory reverse-geocoding source for tests and offline use.
///
/// Replies are keyed by the rounded coordinate key. Unknown coordinates are
/// errors, so fallback paths can be exercised deliberately. The call counter
/// lets tests assert that cache hits short-circuit the remote lookup.
#[derive(Debug, Default)]
pub struct StaticSource {
    replies: BTreeMap<String, ReverseReply>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, coord: Coord, reply: ReverseReply) -> Self {
        self.replies.insert(coord.key().0, reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReverseGeocoder for StaticSource {
    fn reverse(&self, coord: Coord) -> BoxFuture<'_, Result<ReverseReply, GeocodeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.get(&coord.key().0).cloned();
        Box::pin(async move {
            reply.ok_or_else(|| GeocodeError::new("No canned reply for coordinate"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Address, NominatimSource, ReverseReply};
    use crate::coord::Coord;

    #[test]
    fn reverse_url_carries_zoom_detail_and_language() {
        let source = NominatimSource::new("https://nominatim.example.org/", "ja");
        let url = source.reverse_url(Coord::new(34.9576, 137.1656));
        assert_eq!(
            url,
            "https://nominatim.example.org/reverse?format=json&lat=34.9576&lon=137.1656&zoom=18&addressdetails=1&accept-language=ja"
        );
    }

    #[test]
    fn reply_deserializes_with_partial_address() {
        let json = r#"{
            "display_name": "岡崎図書館, 本町通り, 岡崎市, 愛知県, 日本",
            "address": { "amenity": "岡崎図書館", "state": "愛知県", "postcode": "444-0000" }
        }"#;
        let reply: ReverseReply = serde_json::from_str(json).expect("parse");
        assert_eq!(reply.address.amenity.as_deref(), Some("岡崎図書館"));
        assert_eq!(reply.address.state.as_deref(), Some("愛知県"));
        assert_eq!(reply.address.city, None);
    }

    #[test]
    fn reply_tolerates_missing_fields() {
        let reply: ReverseReply = serde_json::from_str("{}").expect("parse");
        assert_eq!(reply.display_name, None);
        assert_eq!(reply.address, Address::default());
    }
}
