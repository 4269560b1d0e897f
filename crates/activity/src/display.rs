//! Location display composition for activity rows.
//!
//! A row's location cell is rendered from, in order of preference: the
//! saved resolved name, a deferred reverse-geocode lookup when only
//! coordinates exist, or the raw location text.

use geocode::{Binder, Coord, DecoratedLabel, LabelHandle, Placeholder, VICINITY_SUFFIX};

use crate::client::Activity;

/// How an activity's location should be rendered.
#[derive(Debug)]
pub enum LocationDisplay {
    /// A label that can be shown immediately (clickable when it has a
    /// coordinate to re-center on).
    Ready(DecoratedLabel),
    /// Plain text with nothing to resolve or click.
    Plain(String),
    /// Show the placeholder now; complete the handle when the label arrives.
    Pending(Placeholder, LabelHandle),
}

/// Compose the display for one activity row.
pub fn location_display(activity: &Activity, binder: &Binder) -> LocationDisplay {
    let coord = match (activity.latitude, activity.longitude) {
        (Some(lat), Some(lon)) => Some(Coord::new(lat, lon)),
        _ => None,
    };

    // A saved resolved name wins outright; no lookup needed.
    if let Some(name) = non_empty(activity.location_name.as_deref()) {
        return match coord {
            Some(coord) => LocationDisplay::Ready(DecoratedLabel::new(name, coord)),
            None => LocationDisplay::Plain(with_vicinity_suffix(name)),
        };
    }

    let Some(coord) = coord else {
        let text = non_empty(Some(activity.location.as_str()))
            .unwrap_or(geocode::NO_LOCATION_LABEL)
            .to_string();
        return LocationDisplay::Plain(text);
    };

    let fallback = non_empty(Some(activity.location.as_str())).map(String::from);
    let (placeholder, handle) = binder.bind(coord, fallback);
    LocationDisplay::Pending(placeholder, handle)
}

/// Strip the trailing vicinity suffix, for prefilled edit forms.
pub fn strip_vicinity_suffix(name: &str) -> &str {
    name.strip_suffix(VICINITY_SUFFIX).unwrap_or(name)
}

fn with_vicinity_suffix(name: &str) -> String {
    if name.ends_with(VICINITY_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{VICINITY_SUFFIX}")
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use geocode::{Binder, LabelResolver, StaticSource};
    use pretty_assertions::assert_eq;

    use super::{location_display, strip_vicinity_suffix, LocationDisplay};
    use crate::client::Activity;

    fn activity() -> Activity {
        Activity {
            id: 1,
            username: None,
            activity_type: "訪問".to_string(),
            location: "東岡崎駅周辺".to_string(),
            location_name: None,
            latitude: None,
            longitude: None,
            date: "2026-08-29T00:00:00".to_string(),
            memo: None,
            created_at: None,
        }
    }

    fn binder() -> Binder {
        Binder::new(Arc::new(LabelResolver::new(Arc::new(StaticSource::new()))))
            .with_grace(Duration::ZERO)
    }

    #[tokio::test]
    async fn saved_name_with_coordinates_is_ready_and_clickable() {
        let mut a = activity();
        a.location_name = Some("東岡崎駅".to_string());
        a.latitude = Some(34.9576);
        a.longitude = Some(137.1656);

        match location_display(&a, &binder()) {
            LocationDisplay::Ready(label) => {
                assert_eq!(label.text, "東岡崎駅周辺");
                assert_eq!(label.tooltip, "(34.9576, 137.1656)");
            }
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn saved_name_without_coordinates_is_plain_text() {
        let mut a = activity();
        a.location_name = Some("東岡崎駅周辺".to_string());

        match location_display(&a, &binder()) {
            // Suffix already present; not doubled.
            LocationDisplay::Plain(text) => assert_eq!(text, "東岡崎駅周辺"),
            other => panic!("expected Plain, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_everything_falls_back_to_location_text() {
        let a = activity();
        match location_display(&a, &binder()) {
            LocationDisplay::Plain(text) => assert_eq!(text, "東岡崎駅周辺"),
            other => panic!("expected Plain, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_row_shows_the_no_location_sentinel() {
        let mut a = activity();
        a.location = String::new();
        match location_display(&a, &binder()) {
            LocationDisplay::Plain(text) => assert_eq!(text, "位置情報なし"),
            other => panic!("expected Plain, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn coordinates_without_a_saved_name_go_through_the_binder() {
        let mut a = activity();
        a.latitude = Some(34.9576);
        a.longitude = Some(137.1656);

        match location_display(&a, &binder()) {
            LocationDisplay::Pending(placeholder, _handle) => {
                assert_eq!(placeholder.loading_text, "住所取得中...");
            }
            other => panic!("expected Pending, got {other:?}"),
        }
    }

    #[test]
    fn vicinity_suffix_is_stripped_for_edit_prefill() {
        assert_eq!(strip_vicinity_suffix("東岡崎駅周辺"), "東岡崎駅");
        assert_eq!(strip_vicinity_suffix("東岡崎駅"), "東岡崎駅");
    }
}
