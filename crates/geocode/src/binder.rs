//! Deferred label binding.
//!
//! A caller that needs a label before resolution completes gets a
//! `Placeholder` to show immediately and a `LabelHandle` to observe. The
//! handle carries the eventual result over a oneshot channel; the caller, not
//! the binder, decides whether that result still applies to a live target.
//! A target that has gone away by then is a silent discard, not an error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use crate::coord::Coord;
use crate::resolver::LabelResolver;

/// Text shown in a placeholder while resolution is in flight.
pub const LOADING_LABEL: &str = "住所取得中...";

/// Decorative suffix appended to every rendered location label.
pub const VICINITY_SUFFIX: &str = "周辺";

/// Grace period before resolution starts, so the caller can finish placing
/// the placeholder before its replacement can arrive.
const INSERT_GRACE: Duration = Duration::from_millis(100);

/// Locally-unique identifier tying a placeholder to its eventual label.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PlaceholderId(Uuid);

impl PlaceholderId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "location_{}", self.0.simple())
    }
}

/// The immediately renderable half of a deferred binding.
#[derive(Debug, Clone)]
pub struct Placeholder {
    pub id: PlaceholderId,
    pub loading_text: &'static str,
}

/// A resolved label ready for display: text with the vicinity suffix, a
/// coordinate tooltip, and the coordinate itself for re-centering a map view.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoratedLabel {
    pub text: String,
    pub tooltip: String,
    pub center: Coord,
}

impl DecoratedLabel {
    pub fn new(label: &str, center: Coord) -> Self {
        let text = if label.ends_with(VICINITY_SUFFIX) {
            label.to_string()
        } else {
            format!("{label}{VICINITY_SUFFIX}")
        };
        Self {
            text,
            tooltip: center.tooltip_text(),
            center,
        }
    }
}

/// How the caller should treat the target of a pending label.
pub trait BindTarget {
    /// Whether the original display slot still exists.
    fn is_live(&self) -> bool;

    /// Replace the loading indicator with the resolved label.
    fn apply(&mut self, label: &DecoratedLabel);
}

/// Terminal state of a binding: the label was rendered, or the target was
/// gone by the time the label arrived.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    Discarded,
}

/// The observable half of a deferred binding.
#[derive(Debug)]
pub struct LabelHandle {
    pub id: PlaceholderId,
    coord: Coord,
    fallback: Option<String>,
    rx: oneshot::Receiver<DecoratedLabel>,
}

impl LabelHandle {
    /// Await the resolved label and apply it to the target if it is still
    /// live. Resolution itself is total; if the channel fails anyway, the
    /// fallback (or a coordinate string) is decorated and used instead.
    pub async fn complete(self, target: &mut dyn BindTarget) -> BindOutcome {
        let label = match self.rx.await {
            Ok(label) => label,
            Err(_) => {
                let text = match self.fallback {
                    Some(text) if !text.is_empty() => text,
                    _ => format!("座標 {}", self.coord.fallback_text()),
                };
                DecoratedLabel::new(&text, self.coord)
            }
        };

        if !target.is_live() {
            debug!("placeholder {} vanished before label arrived", self.id);
            return BindOutcome::Discarded;
        }

        target.apply(&label);
        BindOutcome::Bound
    }
}

/// Creates placeholder/handle pairs and drives resolution in the background.
pub struct Binder {
    resolver: Arc<LabelResolver>,
    grace: Duration,
}

impl Binder {
    pub fn new(resolver: Arc<LabelResolver>) -> Self {
        Self {
            resolver,
            grace: INSERT_GRACE,
        }
    }

    /// Override the insertion grace period (tests use zero).
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn resolver(&self) -> &Arc<LabelResolver> {
        &self.resolver
    }

    /// Start a deferred resolution for `coord`.
    ///
    /// The returned placeholder is for immediate display; the handle delivers
    /// the decorated label once the resolver finishes. Dropping the handle
    /// discards the result (the resolution still runs to completion and
    /// populates the cache).
    pub fn bind(&self, coord: Coord, fallback: Option<String>) -> (Placeholder, LabelHandle) {
        let id = PlaceholderId::generate();
        let (tx, rx) = oneshot::channel();

        let resolver = self.resolver.clone();
        let grace = self.grace;
        let task_fallback = fallback.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let label = resolver
                .resolve_coord(coord, task_fallback.as_deref())
                .await;
            // A dropped receiver means the caller no longer cares.
            let _ = tx.send(DecoratedLabel::new(&label, coord));
        });

        (
            Placeholder {
                id,
                loading_text: LOADING_LABEL,
            },
            LabelHandle {
                id,
                coord,
                fallback,
                rx,
            },
        )
    }
}
