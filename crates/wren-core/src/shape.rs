use std::fmt;

// Shape — 2-D shape representation
//
// Every value flowing through the engine is a matrix, so a shape is exactly
// a (rows, columns) pair:
//   - Row vector:  Shape(1, 4)   — one sample with 4 features
//   - Batch:       Shape(8, 4)   — 8 samples with 4 features each
//   - Weights:     Shape(4, 3)   — maps 4 features to 3
//
// The shape gates every algebraic operation: element-wise ops need equal
// shapes, a product needs lhs.cols == rhs.rows.

/// Shape of a matrix: number of rows and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl Shape {
    /// Create a new shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        Shape { rows, cols }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements (rows × cols), or `None` when the product
    /// overflows `usize`.
    pub fn checked_elem_count(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    /// Total number of elements (rows × cols), saturating at `usize::MAX`.
    ///
    /// No vector holds `usize::MAX` elements, so a saturated count can never
    /// match real storage.
    pub fn elem_count(&self) -> usize {
        self.rows.saturating_mul(self.cols)
    }

    /// The shape with rows and columns swapped.
    pub fn transposed(&self) -> Shape {
        Shape::new(self.cols, self.rows)
    }

    /// Shape of `self @ rhs`, or `None` when the inner dimensions differ.
    pub fn matmul(&self, rhs: &Shape) -> Option<Shape> {
        (self.cols == rhs.rows).then(|| Shape::new(self.rows, rhs.cols))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.rows, self.cols)
    }
}

// These let you write: Shape::from((3, 4)) or `let s: Shape = (3, 4).into()`

impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Shape::new(rows, cols)
    }
}

impl From<Shape> for (usize, usize) {
    fn from(s: Shape) -> Self {
        (s.rows, s.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_shape() {
        let s = Shape::from((3, 4));
        assert_eq!(s.rows(), 3);
        assert_eq!(s.cols(), 4);
        assert_eq!(s.elem_count(), 12);
        assert_eq!(s.checked_elem_count(), Some(12));
    }

    #[test]
    fn test_elem_count_overflow() {
        let s = Shape::new(usize::MAX, 2);
        assert_eq!(s.checked_elem_count(), None);
        assert_eq!(s.elem_count(), usize::MAX);
        assert_eq!(Shape::new(usize::MAX, 0).elem_count(), 0);
    }

    #[test]
    fn test_transposed() {
        let s = Shape::new(2, 5);
        assert_eq!(s.transposed(), Shape::new(5, 2));
        assert_eq!(s.transposed().transposed(), s);
    }

    #[test]
    fn test_matmul_shape() {
        let a = Shape::new(2, 3);
        let b = Shape::new(3, 7);
        assert_eq!(a.matmul(&b), Some(Shape::new(2, 7)));
        assert_eq!(b.matmul(&a), None);
    }

    #[test]
    fn test_display() {
        let s = Shape::from((3, 4));
        assert_eq!(format!("{}", s), "[3, 4]");
        let pair: (usize, usize) = s.into();
        assert_eq!(pair, (3, 4));
    }
}
