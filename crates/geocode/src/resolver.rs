use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::LabelCache;
use crate::coord::Coord;
use crate::provider::{ReverseGeocoder, ReverseReply};

/// Label shown when no coordinate is available at all.
pub const NO_LOCATION_LABEL: &str = "位置情報なし";

/// Labels longer than this are truncated (in characters, not bytes).
pub const MAX_LABEL_CHARS: usize = 30;

const ELLIPSIS: &str = "...";

/// Turns a coordinate into a short human label, memoizing by rounded key.
///
/// Resolution is total: every failure mode degrades to a deterministic
/// fallback string, so callers may invoke it speculatively and never need an
/// error branch. The cache lock is released while the provider call is in
/// flight, so concurrent misses for the same key each hit the provider and
/// the last write wins.
pub struct LabelResolver {
    provider: Arc<dyn ReverseGeocoder>,
    cache: Mutex<LabelCache>,
}

impl LabelResolver {
    pub fn new(provider: Arc<dyn ReverseGeocoder>) -> Self {
        Self {
            provider,
            cache: Mutex::new(LabelCache::new()),
        }
    }

    pub async fn cached_labels(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Resolve a label for an optional coordinate pair.
    ///
    /// Missing coordinates return the fallback (or a sentinel) without any
    /// remote call or cache access. Otherwise the rounded-key cache is
    /// consulted first; on a miss the provider is queried and the derived
    /// label (or the fallback, on any provider failure) is cached and
    /// returned.
    pub async fn resolve(
        &self,
        lat: Option<f64>,
        lon: Option<f64>,
        fallback: Option<&str>,
    ) -> String {
        let (Some(lat), Some(lon)) = (lat, lon) else {
            // An empty fallback counts as absent, same as on the remote paths.
            return match fallback {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => NO_LOCATION_LABEL.to_string(),
            };
        };
        self.resolve_coord(Coord::new(lat, lon), fallback).await
    }

    pub async fn resolve_coord(&self, coord: Coord, fallback: Option<&str>) -> String {
        let key = coord.key();

        if let Some(hit) = self.cache.lock().await.get(&key) {
            return hit.to_string();
        }

        let label = match self.provider.reverse(coord).await {
            Ok(reply) => derive_label(&reply)
                .unwrap_or_else(|| fallback_label(coord, fallback)),
            Err(err) => {
                debug!("reverse geocode failed for {key}: {err}");
                fallback_label(coord, fallback)
            }
        };

        // Unconditional, even on fallback paths: a provider that failed once
        // is unlikely to do better for the same ~11 m cell this session.
        self.cache.lock().await.insert(key, label.clone());
        label
    }
}

fn fallback_label(coord: Coord, fallback: Option<&str>) -> String {
    match fallback {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => coord.fallback_text(),
    }
}

/// Derive a place name from a reply, first non-empty wins:
/// point-of-interest fields, then a composed address, then the first
/// comma-delimited segment of the provider's display name.
fn derive_label(reply: &ReverseReply) -> Option<String> {
    let addr = &reply.address;

    let poi = [&addr.amenity, &addr.building, &addr.shop, &addr.tourism]
        .into_iter()
        .find_map(|f| non_empty(f));

    let derived = poi
        .or_else(|| composed_address(reply))
        .or_else(|| {
            reply
                .display_name
                .as_deref()
                .and_then(|name| name.split(',').next())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        })?;

    Some(truncate_label(derived))
}

/// Region down to house number, space-joined, present fields only.
fn composed_address(reply: &ReverseReply) -> Option<String> {
    let addr = &reply.address;
    let parts: Vec<String> = [
        non_empty(&addr.prefecture).or_else(|| non_empty(&addr.state)),
        non_empty(&addr.city)
            .or_else(|| non_empty(&addr.town))
            .or_else(|| non_empty(&addr.village)),
        non_empty(&addr.suburb).or_else(|| non_empty(&addr.district)),
        non_empty(&addr.quarter).or_else(|| non_empty(&addr.neighbourhood)),
        non_empty(&addr.road).or_else(|| non_empty(&addr.street)),
        non_empty(&addr.house_number),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn non_empty(field: &Option<String>) -> Option<String> {
    field.as_deref().filter(|s| !s.is_empty()).map(String::from)
}

fn truncate_label(label: String) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label;
    }
    let mut short: String = label.chars().take(MAX_LABEL_CHARS).collect();
    short.push_str(ELLIPSIS);
    short
}
