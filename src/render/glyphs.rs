//! Built-in 3×5 pixel digits for seat numbers.

use crate::foundation::core::{Point, Rect};

const GLYPH_W: u32 = 3;
const GLYPH_H: u32 = 5;

// One row per entry, most significant of the low three bits is the left column.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

fn decimal_digits(n: u32) -> Vec<u8> {
    n.to_string().bytes().map(|b| b - b'0').collect()
}

/// Size of `n` rendered with `cell`-pixel cells and one empty column between digits.
pub(crate) fn number_size(n: u32, cell: f64) -> (f64, f64) {
    let count = decimal_digits(n).len() as u32;
    let cols = count * GLYPH_W + count.saturating_sub(1);
    (f64::from(cols) * cell, f64::from(GLYPH_H) * cell)
}

/// Filled cells for `n`, centered on `center`.
pub(crate) fn number_cells(n: u32, center: Point, cell: f64) -> Vec<Rect> {
    let (w, h) = number_size(n, cell);
    let x0 = center.x - w / 2.0;
    let y0 = center.y - h / 2.0;
    let mut cells = Vec::new();
    for (i, d) in decimal_digits(n).into_iter().enumerate() {
        let gx = x0 + (i as f64) * f64::from(GLYPH_W + 1) * cell;
        for (row, bits) in DIGITS[usize::from(d)].iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (0b100 >> col) != 0 {
                    let x = gx + f64::from(col) * cell;
                    let y = y0 + (row as f64) * cell;
                    cells.push(Rect::new(x, y, x + cell, y + cell));
                }
            }
        }
    }
    cells
}

#[cfg(test)]
#[path = "../../tests/unit/render/glyphs.rs"]
mod tests;
