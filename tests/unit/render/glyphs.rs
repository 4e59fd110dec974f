use super::*;

#[test]
fn single_digit_cell_counts() {
    assert_eq!(number_cells(1, Point::ZERO, 1.0).len(), 8);
    assert_eq!(number_cells(8, Point::ZERO, 1.0).len(), 13);
    assert_eq!(number_cells(0, Point::ZERO, 1.0).len(), 12);
}

#[test]
fn multi_digit_layout_has_gap_column() {
    assert_eq!(number_size(5, 2.0), (6.0, 10.0));
    assert_eq!(number_size(12, 2.0), (14.0, 10.0));
    let cells = number_cells(11, Point::new(0.0, 0.0), 1.0);
    assert_eq!(cells.len(), 16);
    let min_x = cells.iter().map(|r| r.x0).fold(f64::INFINITY, f64::min);
    let max_x = cells.iter().map(|r| r.x1).fold(f64::NEG_INFINITY, f64::max);
    assert_eq!((min_x, max_x), (-3.5, 3.5));
}

#[test]
fn cells_are_centered() {
    let cells = number_cells(7, Point::new(10.0, 20.0), 2.0);
    let min_y = cells.iter().map(|r| r.y0).fold(f64::INFINITY, f64::min);
    let max_y = cells.iter().map(|r| r.y1).fold(f64::NEG_INFINITY, f64::max);
    assert_eq!((min_y, max_y), (15.0, 25.0));
}
