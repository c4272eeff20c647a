use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PAIR_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\s*(-?\d+)\s*,\s*(-?\d+)\s*\]\s*\[\s*(-?\d+)\s*,\s*(-?\d+)\s*\]$")
        .expect("bounds pattern is valid")
});

static FLAT_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\s*(-?\d+)\s*,\s*(-?\d+)\s*,\s*(-?\d+)\s*,\s*(-?\d+)\s*\]$")
        .expect("bounds pattern is valid")
});

/// Pixel rectangle taken from an Android `bounds` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub w: i32,
    pub h: i32,
}

impl Bounds {
    /// Build from corners. Returns `None` for inverted rectangles and for
    /// spans that do not fit in an `i32`.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
        if x2 < x1 || y2 < y1 {
            return None;
        }
        Some(Bounds {
            x1,
            y1,
            x2,
            y2,
            w: x2.checked_sub(x1)?,
            h: y2.checked_sub(y1)?,
        })
    }

    /// Parse `[x1,y1][x2,y2]` (uiautomator) or `[x1,y1,x2,y2]`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let caps = PAIR_FORM.captures(raw).or_else(|| FLAT_FORM.captures(raw))?;

        let mut coords = [0i32; 4];
        for (slot, i) in coords.iter_mut().zip(1..=4) {
            *slot = caps.get(i)?.as_str().parse().ok()?;
        }

        Bounds::new(coords[0], coords[1], coords[2], coords[3])
    }

    pub fn center(&self) -> (i32, i32) {
        let (cx, cy) = self.center_wide();
        // Midpoints lie between the corners, so they fit back in i32.
        (cx as i32, cy as i32)
    }

    fn center_wide(&self) -> (i64, i64) {
        (
            self.x1 as i64 + self.w as i64 / 2,
            self.y1 as i64 + self.h as i64 / 2,
        )
    }

    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Inclusive on the top/left edge, exclusive on the bottom/right edge.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        other.x1 >= self.x1 && other.y1 >= self.y1 && other.x2 <= self.x2 && other.y2 <= self.y2
    }

    /// Euclidean distance between the two centres.
    pub fn center_distance(&self, other: &Bounds) -> f64 {
        let (ax, ay) = self.center_wide();
        let (bx, by) = other.center_wide();
        let dx = (ax - bx) as f64;
        let dy = (ay - by) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Canonical uiautomator form.
    pub fn to_attr(&self) -> String {
        format!("[{},{}][{},{}]", self.x1, self.y1, self.x2, self.y2)
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_attr())
    }
}
