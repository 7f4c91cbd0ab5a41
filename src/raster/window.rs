//! Pixel windows and grid splitting

use ndarray::{s, Array2, ArrayView2};

/// Rectangular pixel window, (0, 0) is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Column of the top-left pixel
    pub col_off: usize,
    /// Row of the top-left pixel
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Window { col_off, row_off, width, height }
    }

    /// Column just right of the window
    pub fn end_col(&self) -> usize {
        self.col_off + self.width
    }

    /// Row just below the window
    pub fn end_row(&self) -> usize {
        self.row_off + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// View of `array` covered by the window, clipped to the array
    pub fn view<'a>(&self, array: &'a Array2<f64>) -> ArrayView2<'a, f64> {
        let (rows, cols) = array.dim();
        let r0 = self.row_off.min(rows);
        let c0 = self.col_off.min(cols);
        array.slice(s![r0..self.end_row().min(rows), c0..self.end_col().min(cols)])
    }
}

/// Evenly spaced split points of `0..length` into `parts` pieces
///
/// Boundaries are `floor(i * length / parts)`; the last piece ends at `length`.
pub fn split_points(length: usize, parts: usize) -> Vec<usize> {
    (0..=parts).map(|i| i * length / parts.max(1)).collect()
}

/// Splits a `width` x `height` raster into `rows` x `cols` windows, row-major
///
/// Windows may be empty when a dimension is smaller than the split count.
pub fn split_grid(width: usize, height: usize, rows: usize, cols: usize) -> Vec<Window> {
    let row_edges = split_points(height, rows);
    let col_edges = split_points(width, cols);

    let mut windows = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            windows.push(Window::new(
                col_edges[c],
                row_edges[r],
                col_edges[c + 1] - col_edges[c],
                row_edges[r + 1] - row_edges[r],
            ));
        }
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_covers_without_gaps() {
        let windows = split_grid(101, 47, 3, 4);
        assert_eq!(windows.len(), 12);

        let first_col_heights: usize = windows.iter().step_by(4).map(|w| w.height).sum();
        let first_row_widths: usize = windows.iter().take(4).map(|w| w.width).sum();
        assert_eq!(first_col_heights, 47);
        assert_eq!(first_row_widths, 101);

        for pair in windows[..4].windows(2) {
            assert_eq!(pair[0].end_col(), pair[1].col_off);
        }
        assert_eq!(windows[11].end_row(), 47);
        assert_eq!(windows[11].end_col(), 101);
    }

    #[test]
    fn test_split_smaller_than_parts() {
        let windows = split_grid(2, 2, 3, 3);
        assert_eq!(windows.len(), 9);
        assert!(windows.iter().any(|w| w.is_empty()));
        assert_eq!(windows.iter().filter(|w| !w.is_empty()).count(), 4);
    }

    #[test]
    fn test_view_clips() {
        let array = Array2::from_shape_fn((4, 5), |(r, c)| (r * 10 + c) as f64);
        let view = Window::new(3, 2, 5, 5).view(&array);
        assert_eq!(view.dim(), (2, 2));
        assert_eq!(view[[0, 0]], 23.0);
    }
}
