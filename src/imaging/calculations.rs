//! Pure calculation functions for responsive widths.
//!
//! All functions here are pure and testable without any I/O or images.

/// Build the width ladder: `None` (the source's own width) followed by
/// `step, 2 * step, ...` up to and including `max`.
///
/// ```
/// # use quire::imaging::width_ladder;
/// assert_eq!(
///     width_ladder(300, 1000),
///     vec![None, Some(300), Some(600), Some(900)]
/// );
/// ```
pub fn width_ladder(step: u32, max: u32) -> Vec<Option<u32>> {
    let mut ladder = vec![None];
    if step == 0 {
        return ladder;
    }
    ladder.extend((1..).map(|n| n * step).take_while(|&w| w <= max).map(Some));
    ladder
}

/// One responsive width to generate, with the height that preserves the
/// source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSize {
    pub width: u32,
    pub height: u32,
}

/// Resolve a width ladder against the source dimensions.
///
/// `None` becomes the original width. Widths wider than the source are
/// dropped (no upscaling), so the original is always the widest entry.
/// The result is sorted ascending with duplicates merged.
pub fn resolve_widths(original: (u32, u32), ladder: &[Option<u32>]) -> Vec<VariantSize> {
    let (orig_w, orig_h) = original;

    let mut widths: Vec<u32> = ladder
        .iter()
        .map(|w| w.unwrap_or(orig_w))
        .filter(|&w| w > 0 && w <= orig_w)
        .collect();
    widths.sort_unstable();
    widths.dedup();

    widths
        .into_iter()
        .map(|width| {
            let height = if width == orig_w {
                orig_h
            } else {
                ((orig_h as f64 * width as f64 / orig_w as f64).round() as u32).max(1)
            };
            VariantSize { width, height }
        })
        .collect()
}
