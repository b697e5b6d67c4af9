//! Column widths and content extent.

use crate::units::{Length, contains_unit_token};

/// How a track's width constraint string resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidthConstraint {
    /// Absorbs slack (or deficit) against the preferred scene width.
    Elastic,
    /// Fixed width in pixels.
    Fixed(f64),
    /// No usable constraint; the track's natural width applies.
    Natural,
}

impl WidthConstraint {
    /// Parses `"*"`, `"2 in"`, `"120"` or nothing.
    pub fn parse(text: Option<&str>) -> Self {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return WidthConstraint::Natural;
        };
        if text.contains('*') {
            return WidthConstraint::Elastic;
        }
        if contains_unit_token(text) {
            return match Length::parse(text) {
                Ok(length) => WidthConstraint::Fixed(length.to_points().max(0.0)),
                Err(err) => {
                    log::warn!("Ignoring width constraint '{}': {}", text, err);
                    WidthConstraint::Natural
                }
            };
        }
        match text.parse::<f64>() {
            Ok(px) if px.is_finite() => WidthConstraint::Fixed(px.max(0.0)),
            _ => {
                log::warn!("Ignoring width constraint '{}'", text);
                WidthConstraint::Natural
            }
        }
    }
}

/// Resolves column widths from `(constraint, natural width)` pairs.
///
/// Without a preferred width, or without elastic columns, every column
/// keeps its own width and elastic ones use their natural width. With both,
/// elastic columns split `preferred - fixed` evenly, the first columns
/// taking one extra pixel each for the remainder. When the fixed columns
/// alone exceed the preferred width, every column gives up an even share
/// of the deficit instead; columns clamped at zero pass their unmet share
/// on to the others, so the widths still sum to the preferred width.
pub fn distribute(columns: &[(WidthConstraint, f64)], preferred: Option<f64>) -> Vec<f64> {
    let natural = |w: f64| w.max(0.0).ceil();
    let elastic: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, (c, _))| *c == WidthConstraint::Elastic)
        .map(|(i, _)| i)
        .collect();

    let preferred = match preferred {
        Some(p) if !elastic.is_empty() => p.max(0.0),
        _ => {
            return columns
                .iter()
                .map(|(c, w)| match c {
                    WidthConstraint::Fixed(px) => *px,
                    WidthConstraint::Elastic | WidthConstraint::Natural => natural(*w),
                })
                .collect();
        }
    };

    let mut widths: Vec<f64> = columns
        .iter()
        .map(|(c, w)| match c {
            WidthConstraint::Fixed(px) => *px,
            WidthConstraint::Natural => natural(*w),
            WidthConstraint::Elastic => 0.0,
        })
        .collect();
    let fixed: f64 = widths.iter().sum();

    if preferred >= fixed {
        spread(&mut widths, &elastic, preferred - fixed);
    } else {
        shrink_to(&mut widths, preferred);
    }
    widths
}

/// Shrinks `widths` evenly until they sum to `target`.
///
/// Columns clamped at zero drop out and the rest of the deficit is spread
/// again over the columns still wider than zero.
fn shrink_to(widths: &mut [f64], target: f64) {
    for _ in 0..=widths.len() {
        let excess = widths.iter().sum::<f64>() - target;
        let active: Vec<usize> = (0..widths.len()).filter(|&i| widths[i] > 0.0).collect();
        if excess <= 1e-9 || active.is_empty() {
            return;
        }
        spread(widths, &active, -excess);
        for width in widths.iter_mut() {
            *width = width.max(0.0);
        }
    }
}

/// Adds `amount` over `targets`: an even whole-pixel share each, one more
/// pixel for the first targets, and the fractional rest to the last one.
fn spread(widths: &mut [f64], targets: &[usize], amount: f64) {
    let Some(&last) = targets.last() else {
        return;
    };
    let sign = amount.signum();
    let magnitude = amount.abs();
    let whole = magnitude.floor();
    let count = targets.len() as f64;
    let share = (whole / count).floor();
    let extra = (whole - share * count) as usize;

    for (n, &i) in targets.iter().enumerate() {
        let bonus = if n < extra { 1.0 } else { 0.0 };
        widths[i] += sign * (share + bonus);
    }
    widths[last] += sign * (magnitude - whole);
}

/// Pixel bounds of a content extent: `floor(min * scale)`, `ceil(max * scale)`.
pub fn pixel_bounds(extent: Option<(f64, f64)>, scale: f64) -> (f64, f64) {
    match extent {
        Some((min, max)) => ((min * scale).floor(), (max * scale).ceil()),
        None => (0.0, 0.0),
    }
}

/// A laid-out column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub x: f64,
    pub width: f64,
}

impl Column {
    pub fn contains_x(&self, x: f64) -> bool {
        x >= self.x && x < self.x + self.width
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Places columns left to right without gaps.
pub fn place(widths: &[f64]) -> Vec<Column> {
    let mut x = 0.0;
    widths
        .iter()
        .map(|&width| {
            let column = Column { x, width };
            x += width;
            column
        })
        .collect()
}
