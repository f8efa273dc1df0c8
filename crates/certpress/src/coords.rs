//! Coordinate / anchor model
//!
//! The one place where stored fractional coordinates turn into draw
//! positions. The authoring preview, drag write-back, and the final
//! renderer all call these functions; duplicating the math anywhere
//! else is how preview and output drift apart.

use crate::schema::{Align, CoordMode, FieldDef};

/// Clamp a fractional coordinate to [0, 1]
pub fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Pixel distance from a box's left edge to its alignment anchor
pub fn anchor_offset(box_width: f64, align: Align) -> f64 {
    match align {
        Align::Left => 0.0,
        Align::Center => box_width / 2.0,
        Align::Right => box_width,
    }
}

/// Left edge at which to draw a box, in container pixels
///
/// Under `PercentAnchor`, `x` locates the alignment-dependent anchor
/// and the offset is subtracted. Under `PercentLeft` (and `Unset`,
/// which reads as `PercentLeft`), `x` locates the left edge directly
/// and alignment is ignored. This is the legacy interpretation,
/// preserved bug-for-bug so un-migrated templates keep their
/// authored layout.
pub fn left_edge(
    x: f64,
    container_width: f64,
    box_width: f64,
    align: Align,
    mode: CoordMode,
) -> f64 {
    let px = x * container_width;
    match mode {
        CoordMode::PercentAnchor => px - anchor_offset(box_width, align),
        CoordMode::PercentLeft | CoordMode::Unset => px,
    }
}

/// Anchor fraction for a box dropped at `left_edge` pixels
///
/// Drag write-back: the result is always `PercentAnchor` semantics and
/// the caller persists `coord_mode = percent_anchor` with it.
pub fn anchor_fraction(
    left_edge: f64,
    box_width: f64,
    align: Align,
    container_width: f64,
) -> f64 {
    clamp01((left_edge + anchor_offset(box_width, align)) / container_width)
}

/// One-shot lazy migration of a stored field to current coordinates
///
/// Applied when the authoring surface loads a definition set. Returns
/// whether the field changed; the caller persists dirty fields (batched
/// behind its own debounce).
///
/// * Pixel-magnitude legacy values (`x` or `y` > 1) become fractions of
///   the authoritative image dimensions under `PercentLeft`.
/// * `PercentLeft`/`Unset` with center or right alignment converts to
///   `PercentAnchor` by adding the anchor offset in image pixel space;
///   `box_width` is the field's rendered box width in image pixels.
/// * `PercentAnchor` is terminal and never touched.
pub fn normalize(field: &mut FieldDef, image_width: f64, image_height: f64, box_width: f64) -> bool {
    if field.coord_mode == CoordMode::PercentAnchor {
        return false;
    }

    let mut changed = false;

    if field.x > 1.0 || field.y > 1.0 {
        field.x = clamp01(field.x / image_width);
        field.y = clamp01(field.y / image_height);
        field.coord_mode = CoordMode::PercentLeft;
        changed = true;
    }

    match field.style.align {
        Align::Center | Align::Right => {
            let offset = anchor_offset(box_width, field.style.align);
            field.x = clamp01((field.x * image_width + offset) / image_width);
            field.coord_mode = CoordMode::PercentAnchor;
            changed = true;
        }
        Align::Left => {
            if field.coord_mode == CoordMode::Unset {
                field.coord_mode = CoordMode::PercentLeft;
                changed = true;
            }
        }
    }

    if changed {
        tracing::debug!(
            key = %field.key,
            mode = ?field.coord_mode,
            x = field.x,
            y = field.y,
            "migrated field coordinates"
        );
    }
    changed
}
