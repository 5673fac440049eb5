use std::fmt;

use crate::error::{Result, TensorError};

/// Computes row-major strides for `dims`.
///
/// For dims [d0, d1, d2], the strides are [d1*d2, d2, 1].
pub fn row_major_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![0usize; dims.len()];
    let mut step = 1usize;
    for (stride, &d) in strides.iter_mut().zip(dims).rev() {
        *stride = step;
        step = step.saturating_mul(d);
    }
    strides
}

/// Computes column-major strides for `dims`.
///
/// For dims [d0, d1, d2], the strides are [1, d0, d0*d1].
pub fn col_major_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![0usize; dims.len()];
    let mut step = 1usize;
    for (stride, &d) in strides.iter_mut().zip(dims) {
        *stride = step;
        step = step.saturating_mul(d);
    }
    strides
}

/// Sizes, strides and names of the dimensions of a tensor.
///
/// `dims`, `strides` and `names` always have the same length. The strides
/// fully determine addressing: the flat offset of an index is the dot product
/// of the index with the strides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
    strides: Vec<usize>,
    names: Vec<String>,
}

impl Shape {
    /// Create a row-major shape with unnamed dimensions.
    pub fn row_major(dims: &[usize]) -> Self {
        Shape {
            strides: row_major_strides(dims),
            names: vec![String::new(); dims.len()],
            dims: dims.to_vec(),
        }
    }

    /// Create a column-major shape with unnamed dimensions.
    pub fn col_major(dims: &[usize]) -> Self {
        Shape {
            strides: col_major_strides(dims),
            names: vec![String::new(); dims.len()],
            dims: dims.to_vec(),
        }
    }

    /// Create a shape with explicit strides.
    ///
    /// # Errors
    /// Returns `InvalidShape` if `strides` does not have one entry per dimension.
    pub fn with_strides(dims: &[usize], strides: &[usize]) -> Result<Self> {
        if strides.len() != dims.len() {
            return Err(TensorError::invalid_shape(
                dims,
                format!("{} strides given for {} dimensions", strides.len(), dims.len()),
            ));
        }
        Ok(Shape {
            dims: dims.to_vec(),
            strides: strides.to_vec(),
            names: vec![String::new(); dims.len()],
        })
    }

    /// Replace the dimension names.
    ///
    /// # Errors
    /// Returns `InvalidShape` if `names` does not have one entry per dimension.
    pub fn with_names<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self> {
        if names.len() != self.dims.len() {
            return Err(TensorError::invalid_shape(
                &self.dims,
                format!("{} names given for {} dimensions", names.len(), self.dims.len()),
            ));
        }
        self.names = names.iter().map(|n| n.as_ref().to_string()).collect();
        Ok(self)
    }

    /// Builds the shape that results from a reshape of `self`.
    ///
    /// Absent strides are synthesized in the layout class of `self`: a
    /// column-major shape stays column-major, anything else becomes row-major.
    /// Absent names are kept when the rank is unchanged and reset otherwise.
    pub fn reshaped<S: AsRef<str>>(
        &self,
        dims: &[usize],
        strides: Option<&[usize]>,
        names: Option<&[S]>,
    ) -> Result<Shape> {
        let mut shape = match strides {
            Some(strides) => Shape::with_strides(dims, strides)?,
            None if self.is_col_major() && !self.is_row_major() => Shape::col_major(dims),
            None => Shape::row_major(dims),
        };
        shape.checked_len()?;
        match names {
            Some(names) => shape = shape.with_names(names)?,
            None if self.names.len() == dims.len() => shape.names = self.names.clone(),
            None => {}
        }
        Ok(shape)
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns true if any dimension has size zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements, or `InvalidShape` if the product overflows.
    pub fn checked_len(&self) -> Result<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| TensorError::invalid_shape(&self.dims, "element count overflows"))
    }

    /// Returns the size of dimension `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    /// Returns the name of dimension `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim_name(&self, i: usize) -> &str {
        &self.names[i]
    }

    /// Checked variant of [`Shape::dim`].
    ///
    /// # Errors
    /// Returns `DimOutOfRange` if `i >= ndim()`.
    pub fn try_dim(&self, i: usize) -> Result<usize> {
        self.dims.get(i).copied().ok_or(TensorError::DimOutOfRange {
            dim: i,
            ndim: self.dims.len(),
        })
    }

    /// Checked variant of [`Shape::dim_name`].
    pub fn try_dim_name(&self, i: usize) -> Result<&str> {
        self.names
            .get(i)
            .map(String::as_str)
            .ok_or(TensorError::DimOutOfRange {
                dim: i,
                ndim: self.dims.len(),
            })
    }

    /// Position of the first dimension called `name`.
    pub fn dim_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Dimension sizes widened to `i64`.
    pub fn dims64(&self) -> Vec<i64> {
        self.dims.iter().map(|&d| d as i64).collect()
    }

    /// Strides widened to `i64`.
    pub fn strides64(&self) -> Vec<i64> {
        self.strides.iter().map(|&s| s as i64).collect()
    }

    pub fn is_row_major(&self) -> bool {
        self.strides == row_major_strides(&self.dims)
    }

    pub fn is_col_major(&self) -> bool {
        self.strides == col_major_strides(&self.dims)
    }

    pub fn is_contiguous(&self) -> bool {
        self.is_row_major() || self.is_col_major()
    }

    /// Flat storage offset of `index`.
    ///
    /// No validation is done on the length of `index` or on the range of its
    /// coordinates; use [`Shape::checked_offset`] for that.
    #[inline]
    pub fn offset(&self, index: &[usize]) -> usize {
        index
            .iter()
            .zip(&self.strides)
            .map(|(&i, &s)| i * s)
            .sum()
    }

    /// Flat storage offset of `index`, validating the index first.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` if `index` has the wrong length or any
    /// coordinate is outside its dimension.
    pub fn checked_offset(&self, index: &[usize]) -> Result<usize> {
        let in_range =
            index.len() == self.dims.len() && index.iter().zip(&self.dims).all(|(&i, &d)| i < d);
        if !in_range {
            return Err(TensorError::IndexOutOfRange {
                index: index.to_vec(),
                dims: self.dims.clone(),
            });
        }
        Ok(self.offset(index))
    }

    /// Logical index of the element at flat `offset`.
    ///
    /// Only meaningful for contiguous shapes; custom strides are decoded as if
    /// the shape were row-major.
    pub fn index(&self, offset: usize) -> Vec<usize> {
        let mut index = vec![0usize; self.dims.len()];
        let mut rem = offset;
        if self.is_col_major() && !self.is_row_major() {
            for (i, &d) in index.iter_mut().zip(&self.dims) {
                if d > 0 {
                    *i = rem % d;
                    rem /= d;
                }
            }
        } else {
            for (i, &d) in index.iter_mut().zip(&self.dims).rev() {
                if d > 0 {
                    *i = rem % d;
                    rem /= d;
                }
            }
        }
        index
    }

    /// Size of the outermost dimension and number of elements in each slice
    /// along it. A scalar shape is a single row of one cell.
    pub fn row_cell_size(&self) -> (usize, usize) {
        match self.dims.split_first() {
            Some((&rows, rest)) => (rows, rest.iter().product()),
            None => (1, 1),
        }
    }

    /// Same shape with the outermost dimension resized to `rows` and
    /// row-major strides recomputed. `None` for a scalar shape or when the
    /// new element count overflows.
    pub(crate) fn with_num_rows(&self, rows: usize) -> Option<Shape> {
        if self.dims.is_empty() {
            return None;
        }
        let mut dims = self.dims.clone();
        dims[0] = rows;
        let shape = Shape {
            strides: row_major_strides(&dims),
            dims,
            names: self.names.clone(),
        };
        shape.checked_len().ok()?;
        Some(shape)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let named = self.names.iter().any(|n| !n.is_empty());
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if named {
                write!(f, "{}: {}", self.names[i], d)?;
            } else {
                write!(f, "{}", d)?;
            }
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::row_major(&dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::row_major(dims)
    }
}
