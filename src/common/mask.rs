use std::ops::Deref;

use tracing::debug;

use super::error::{QRError, QRResult};
use super::metadata::Color;
use crate::builder::QR;

// Mask pattern
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct MaskPattern(u8);

impl MaskPattern {
    pub fn new(pattern: u8) -> Self {
        debug_assert!(pattern < 8, "Invalid masking pattern");
        Self(pattern)
    }

    pub fn try_new(pattern: u8) -> QRResult<Self> {
        if pattern < 8 {
            Ok(Self(pattern))
        } else {
            Err(QRError::InvalidMaskPattern(pattern))
        }
    }

    pub fn all() -> impl Iterator<Item = MaskPattern> {
        (0..8).map(MaskPattern)
    }
}

impl Deref for MaskPattern {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

mod mask_functions {
    pub fn checkerboard(r: i32, c: i32) -> bool {
        (r + c) & 1 == 0
    }

    pub fn horizontal_lines(r: i32, _: i32) -> bool {
        r & 1 == 0
    }

    pub fn vertical_lines(_: i32, c: i32) -> bool {
        c % 3 == 0
    }

    pub fn diagonal_lines(r: i32, c: i32) -> bool {
        (r + c) % 3 == 0
    }

    pub fn large_checkerboard(r: i32, c: i32) -> bool {
        ((r >> 1) + (c / 3)) & 1 == 0
    }

    pub fn fields(r: i32, c: i32) -> bool {
        ((r * c) & 1) + ((r * c) % 3) == 0
    }

    pub fn diamonds(r: i32, c: i32) -> bool {
        (((r * c) & 1) + ((r * c) % 3)) & 1 == 0
    }

    pub fn meadow(r: i32, c: i32) -> bool {
        (((r + c) & 1) + ((r * c) % 3)) & 1 == 0
    }
}

impl MaskPattern {
    /// Predicate over `(row, col)` telling whether the module is flipped.
    pub fn mask_function(self) -> fn(i32, i32) -> bool {
        debug_assert!(*self < 8, "Invalid pattern");

        match *self {
            0b000 => mask_functions::checkerboard,
            0b001 => mask_functions::horizontal_lines,
            0b010 => mask_functions::vertical_lines,
            0b011 => mask_functions::diagonal_lines,
            0b100 => mask_functions::large_checkerboard,
            0b101 => mask_functions::fields,
            0b110 => mask_functions::diamonds,
            _ => mask_functions::meadow,
        }
    }
}


// Mask selection
//------------------------------------------------------------------------------

/// Tries all 8 patterns on copies of the symbol and keeps the one with the lowest penalty.
/// Ties go to the lowest pattern index.
pub fn apply_best_mask(qr: &mut QR) -> MaskPattern {
    let (best_mask, penalty) = MaskPattern::all()
        .map(|m| {
            let mut qr = qr.clone();
            qr.apply_mask(m);
            (m, compute_total_penalty(&qr))
        })
        .fold((MaskPattern(0), u32::MAX), |best, cur| if cur.1 < best.1 { cur } else { best });

    debug!(mask = *best_mask, penalty, "Selected mask pattern");
    qr.apply_mask(best_mask);
    best_mask
}

pub fn compute_total_penalty(qr: &QR) -> u32 {
    let run_pen = compute_run_penalty(qr, true) + compute_run_penalty(qr, false);
    let blk_pen = compute_block_penalty(qr);
    let fp_pen =
        compute_finder_pattern_penalty(qr, true) + compute_finder_pattern_penalty(qr, false);
    let bal_pen = compute_balance_penalty(qr);
    run_pen + blk_pen + fp_pen + bal_pen
}

fn color_at(qr: &QR, is_hor: bool, i: usize, j: usize) -> Color {
    let (r, c) = if is_hor { (i, j) } else { (j, i) };
    *qr.get(r as i16, c as i16)
}

// Rule 1: every run of 5 or more same colored modules scores 3 plus its excess over 5
fn compute_run_penalty(qr: &QR, is_hor: bool) -> u32 {
    let w = qr.width();
    let mut pen = 0;
    for i in 0..w {
        let mut run = 0;
        let mut last = None;
        for j in 0..w {
            let clr = color_at(qr, is_hor, i, j);
            if Some(clr) == last {
                run += 1;
            } else {
                if run >= 5 {
                    pen += run - 2;
                }
                run = 1;
                last = Some(clr);
            }
        }
        if run >= 5 {
            pen += run - 2;
        }
    }
    pen
}

// Rule 2: 3 for every 2x2 block of one color, overlaps counted
fn compute_block_penalty(qr: &QR) -> u32 {
    let w = qr.width() as i16;
    let mut pen = 0;
    for r in 0..w - 1 {
        for c in 0..w - 1 {
            let clr = *qr.get(r, c);
            if clr == *qr.get(r + 1, c) && clr == *qr.get(r, c + 1) && clr == *qr.get(r + 1, c + 1)
            {
                pen += 3;
            }
        }
    }
    pen
}

// Rule 3: 40 for every 1:1:3:1:1 dark motif with 4 light modules on either side
fn compute_finder_pattern_penalty(qr: &QR, is_hor: bool) -> u32 {
    use Color::{Dark, Light};
    static PATTERN: [Color; 7] = [Dark, Light, Dark, Dark, Dark, Light, Dark];

    let w = qr.width();
    let mut pen = 0;
    for i in 0..w {
        let is_light_run = |from: usize, to: usize| {
            (from..to.min(w)).all(|j| color_at(qr, is_hor, i, j) == Color::Light)
        };
        for j in 0..w.saturating_sub(6) {
            if (0..7).any(|k| color_at(qr, is_hor, i, j + k) != PATTERN[k]) {
                continue;
            }
            if is_light_run(j.saturating_sub(4), j) || is_light_run(j + 7, j + 11) {
                pen += 40;
            }
        }
    }
    pen
}

// Rule 4: 10 for every 5% the dark ratio strays from half
fn compute_balance_penalty(qr: &QR) -> u32 {
    let dark = qr.count_dark_modules() as i64;
    let w = qr.width() as i64;
    let total = w * w;
    let variance = (dark * 2 - total).abs() * 10 / total;
    (variance * 10) as u32
}
