//! Turning points and the wave segments built from them.

use serde::{Deserialize, Serialize};

/// Kind of local extremum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointKind {
    Peak,
    Trough,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Peak => "peak",
            PointKind::Trough => "trough",
        }
    }
}

/// A local price extremum within a symmetric comparison window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurningPoint {
    /// Index into the analyzed price series
    pub index: usize,

    /// Price at `index`
    pub price: f64,

    pub kind: PointKind,
}

impl TurningPoint {
    pub fn new(index: usize, price: f64, kind: PointKind) -> Self {
        Self { index, price, kind }
    }
}

/// Pattern a wave segment was validated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveKind {
    /// Five points, W1..W5
    Impulse,
    /// Three points, A-B-C
    Corrective,
}

impl WaveKind {
    pub fn point_count(&self) -> usize {
        match self {
            WaveKind::Impulse => 5,
            WaveKind::Corrective => 3,
        }
    }
}

/// Consecutive turning points forming a candidate pattern.
///
/// Derived data: rebuilt on every analysis pass and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveSegment {
    pub kind: WaveKind,
    pub points: Vec<TurningPoint>,
}

impl WaveSegment {
    /// Build a segment; `None` if the point count does not match the kind or
    /// the points are not strictly increasing in index.
    pub fn new(kind: WaveKind, points: Vec<TurningPoint>) -> Option<Self> {
        if points.len() != kind.point_count() {
            return None;
        }
        if points.windows(2).any(|p| p[0].index >= p[1].index) {
            return None;
        }
        Some(Self { kind, points })
    }

    #[cfg(test)]
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn last_index(&self) -> usize {
        self.points[self.points.len() - 1].index
    }

    /// Point by 1-based wave label (W1..W5, or A=1, B=2, C=3).
    pub fn point(&self, label: usize) -> Option<&TurningPoint> {
        label.checked_sub(1).and_then(|i| self.points.get(i))
    }
}

impl std::fmt::Display for WaveSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            WaveKind::Impulse => "impulse",
            WaveKind::Corrective => "corrective",
        };
        write!(f, "{} [", kind)?;
        for (i, p) in self.points.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}@{:.2}", p.index, p.price)?;
        }
        write!(f, "]")
    }
}
