pub mod geometry;
pub mod transform;

pub use geometry::{distance, order_best_patterns, round, ResultPoint};
pub use transform::PerspectiveTransform;

// Run length ratio checks shared by the finder and alignment locators
//------------------------------------------------------------------------------

/// Checks a 1:1:3:1:1 dark/light/dark/light/dark run, each run within half a module of the
/// ideal, or within `1 / 1.333` of a module when scanning diagonally.
pub fn is_finder_ratio(counts: &[u32; 5], diagonal: bool) -> bool {
    if counts.contains(&0) {
        return false;
    }
    let total: u32 = counts.iter().sum();
    if total < 7 {
        return false;
    }

    let module_size = total as f32 / 7.0;
    let max_variance = if diagonal { module_size / 1.333 } else { module_size / 2.0 };
    counts.iter().zip([1.0, 1.0, 3.0, 1.0, 1.0]).all(|(&c, ratio)| {
        (ratio * module_size - c as f32).abs() < ratio * max_variance
    })
}

/// Checks a light/dark/light run of roughly one module each.
pub fn is_alignment_ratio(counts: &[u32; 3], module_size: f32) -> bool {
    let max_variance = module_size / 2.0;
    counts.iter().all(|&c| (module_size - c as f32).abs() < max_variance)
}
