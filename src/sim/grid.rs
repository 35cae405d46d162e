//! Uniform-grid broad phase
//!
//! Maps world-space cells to the indices of the items overlapping them, so a
//! per-tick collision query only touches the cells around the player instead
//! of every platform in the level. The grid owns nothing: it stores indices
//! into the caller's item list and is rebuilt whenever that list changes shape.

use rustc_hash::FxHashMap;

use super::rect::Rect;

/// Anything the grid can index
pub trait Bounded {
    fn bounds(&self) -> Rect;

    /// Items returning false are skipped by `SpatialGrid::build`
    fn is_indexed(&self) -> bool {
        true
    }
}

impl Bounded for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

/// Sparse uniform grid of item indices
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: FxHashMap<(i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");
        Self {
            cell_size,
            cells: FxHashMap::default(),
        }
    }

    /// Create a grid already populated with `items`
    pub fn from_items<T: Bounded>(cell_size: f32, items: &[T]) -> Self {
        let mut grid = Self::new(cell_size);
        grid.build(items);
        grid
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Drop every cell
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Clear and re-insert every indexed item
    pub fn build<T: Bounded>(&mut self, items: &[T]) {
        self.clear();
        for (index, item) in items.iter().enumerate() {
            if item.is_indexed() {
                self.insert(index, item.bounds());
            }
        }
    }

    /// Append `index` to every cell `bounds` touches
    pub fn insert(&mut self, index: usize, bounds: Rect) {
        let (min_col, max_col, min_row, max_row) = self.cell_range(&bounds);
        for col in min_col..=max_col {
            for row in min_row..=max_row {
                self.cells.entry((col, row)).or_default().push(index);
            }
        }
    }

    /// Indices of every item whose cells overlap the rectangle.
    ///
    /// Broad phase only: callers still run an exact overlap test. Each index
    /// appears once, in ascending order, no matter how many cells it spans.
    pub fn query(&self, x: f32, y: f32, width: f32, height: f32) -> Vec<usize> {
        self.query_rect(Rect::new(x, y, width, height))
    }

    pub fn query_rect(&self, rect: Rect) -> Vec<usize> {
        let mut found = Vec::new();
        self.query_into(rect, &mut found);
        found
    }

    /// Allocation-reusing variant of `query_rect`; `buf` is cleared first
    pub fn query_into(&self, rect: Rect, buf: &mut Vec<usize>) {
        buf.clear();
        if self.cells.is_empty() {
            return;
        }
        let (min_col, max_col, min_row, max_row) = self.cell_range(&rect);
        for col in min_col..=max_col {
            for row in min_row..=max_row {
                if let Some(indices) = self.cells.get(&(col, row)) {
                    buf.extend_from_slice(indices);
                }
            }
        }
        buf.sort_unstable();
        buf.dedup();
    }

    /// Query the camera view grown by `margin` on every side (render culling)
    pub fn query_viewport(
        &self,
        camera_x: f32,
        viewport_width: f32,
        viewport_height: f32,
        margin: f32,
    ) -> Vec<usize> {
        let view = Rect::new(camera_x, 0.0, viewport_width, viewport_height).expand(margin);
        self.query_rect(view)
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Inclusive column/row span of a rectangle
    fn cell_range(&self, rect: &Rect) -> (i32, i32, i32, i32) {
        let min_col = (rect.left() / self.cell_size).floor() as i32;
        let max_col = (rect.right() / self.cell_size).floor() as i32;
        let min_row = (rect.top() / self.cell_size).floor() as i32;
        let max_row = (rect.bottom() / self.cell_size).floor() as i32;
        (min_col, max_col, min_row, max_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_grid_returns_nothing() {
        let grid = SpatialGrid::new(100.0);
        assert!(grid.query(-1000.0, -1000.0, 5000.0, 5000.0).is_empty());
        assert_eq!(grid.cell_count(), 0);
    }

    #[test]
    fn test_multi_cell_item_reported_once() {
        // 80..120 on both axes spans four 100-unit cells
        let items = [Rect::new(80.0, 80.0, 40.0, 40.0)];
        let grid = SpatialGrid::from_items(100.0, &items);
        assert_eq!(grid.cell_count(), 4);
        assert_eq!(grid.query(50.0, 50.0, 100.0, 100.0), vec![0]);
    }

    #[test]
    fn test_zero_area_query_finds_containing_item() {
        let items = [Rect::new(0.0, 0.0, 300.0, 20.0), Rect::new(1000.0, 0.0, 10.0, 10.0)];
        let grid = SpatialGrid::from_items(256.0, &items);
        assert_eq!(grid.query(150.0, 10.0, 0.0, 0.0), vec![0]);
    }

    #[test]
    fn test_negative_coordinates_use_floor() {
        let items = [Rect::new(-50.0, -50.0, 10.0, 10.0)];
        let grid = SpatialGrid::from_items(100.0, &items);
        assert_eq!(grid.query(-45.0, -45.0, 1.0, 1.0), vec![0]);
        assert!(grid.query(10.0, 10.0, 1.0, 1.0).is_empty());
    }

    #[test]
    fn test_results_sorted_and_distant_items_skipped() {
        let items = [
            Rect::new(500.0, 0.0, 10.0, 10.0),
            Rect::new(0.0, 0.0, 600.0, 10.0),
            Rect::new(5000.0, 0.0, 10.0, 10.0),
        ];
        let grid = SpatialGrid::from_items(256.0, &items);
        assert_eq!(grid.query(400.0, 0.0, 200.0, 10.0), vec![0, 1]);
    }

    #[test]
    fn test_clear_and_rebuild() {
        let mut grid = SpatialGrid::from_items(100.0, &[Rect::new(0.0, 0.0, 10.0, 10.0)]);
        grid.clear();
        assert!(grid.is_empty());
        assert!(grid.query(0.0, 0.0, 10.0, 10.0).is_empty());

        grid.build(&[Rect::new(300.0, 0.0, 10.0, 10.0)]);
        assert_eq!(grid.query(300.0, 0.0, 1.0, 1.0), vec![0]);
    }

    #[test]
    fn test_query_viewport_applies_margin() {
        let items = [Rect::new(-40.0, 100.0, 10.0, 10.0)];
        let grid = SpatialGrid::from_items(32.0, &items);
        assert!(grid.query_viewport(0.0, 800.0, 600.0, 0.0).is_empty());
        assert_eq!(grid.query_viewport(0.0, 800.0, 600.0, 50.0), vec![0]);
    }
}
