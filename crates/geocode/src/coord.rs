/// A WGS84 coordinate pair as reported by the map view or an activity record.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// Cache key derived from a coordinate rounded to 4 decimal places (~11 m).
///
/// Two clicks within that radius share a key and therefore a cached label.
/// Keys are display strings, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoordKey(pub String);

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn key(&self) -> CoordKey {
        CoordKey(format!("{:.4},{:.4}", self.lat, self.lon))
    }

    /// Coordinate-pair fallback label, e.g. `"34.9576, 137.1656"`.
    pub fn fallback_text(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }

    /// Parenthesized form used in tooltips.
    pub fn tooltip_text(&self) -> String {
        format!("({:.4}, {:.4})", self.lat, self.lon)
    }
}

impl std::fmt::Display for CoordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
