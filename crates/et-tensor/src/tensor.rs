use std::any::Any;
use std::fmt::Debug;

use log::{debug, trace};

use crate::dtype::DType;
use crate::error::Result;
use crate::shape::Shape;

/// Uniform interface over n-dimensional tensors of any element type.
///
/// Callers hold a `&dyn Tensor` (or `Box<dyn Tensor>`) and read or write
/// elements as `f64` or as text without knowing the concrete element type;
/// each backend converts to and from its native storage.
///
/// Every element accessor addresses storage through [`Tensor::offset`]. The
/// unchecked accessors do not validate the index: a coordinate outside its
/// dimension yields some other element or panics on the storage bounds check.
/// The `try_*` variants validate first.
///
/// No internal synchronization is performed. Mutation requires `&mut self`,
/// so sharing a tensor across threads needs an external lock.
pub trait Tensor: Debug + Send + Sync {
    /// Element type of the backing storage.
    fn dtype(&self) -> DType;

    /// Current shape, strides and dimension names.
    fn shape(&self) -> &Shape;

    /// Reads the element at flat `offset` as `f64`.
    fn f64_val_1d(&self, offset: usize) -> f64;

    /// Writes `val` at flat `offset`, converting to the native type.
    fn set_f64_1d(&mut self, offset: usize, val: f64);

    /// Reads the element at flat `offset` as text.
    fn string_val_1d(&self, offset: usize) -> String;

    /// Parses `val` into the native type and writes it at flat `offset`.
    ///
    /// # Errors
    /// Returns `Parse` and leaves the element unchanged if `val` cannot be
    /// interpreted as the native type.
    fn set_string_1d(&mut self, offset: usize, val: &str) -> Result<()>;

    /// Folds `fun(value, acc)` over every element in flat storage order,
    /// starting from `init`.
    fn agg_f64(&self, fun: &dyn Fn(f64, f64) -> f64, init: f64) -> f64;

    /// Writes `fun(value)` for every element, in flat storage order, into
    /// `res`, which is resized to exactly `len()` entries.
    fn eval_f64(&self, fun: &dyn Fn(f64) -> f64, res: &mut Vec<f64>);

    /// Replaces every element with `fun(value)`, in flat storage order.
    fn update_f64(&mut self, fun: &dyn Fn(f64) -> f64);

    /// Resets every element to the zero value of the element type.
    fn set_zeros(&mut self);

    /// Deep copy behind a fresh handle.
    fn clone_tensor(&self) -> Box<dyn Tensor>;

    /// Replaces shape, strides and names and resizes storage to the new
    /// element count.
    ///
    /// With `strides` absent the previous layout class is kept: column-major
    /// stays column-major, anything else becomes row-major. With `names`
    /// absent the current names survive if the rank is unchanged.
    ///
    /// # Errors
    /// Returns `InvalidShape`, leaving the tensor untouched, if `strides` or
    /// `names` do not match the rank or the element count overflows.
    fn set_shape(
        &mut self,
        dims: &[usize],
        strides: Option<&[usize]>,
        names: Option<&[&str]>,
    ) -> Result<()>;

    /// Sets the size of the outermost dimension to `rows`, resizing storage.
    ///
    /// Only row-major tensors are affected; for any other layout this does
    /// nothing.
    fn set_num_rows(&mut self, rows: usize);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Number of elements (product of the dimension sizes).
    fn len(&self) -> usize {
        self.shape().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of each dimension.
    fn shapes(&self) -> &[usize] {
        self.shape().dims()
    }

    fn strides(&self) -> &[usize] {
        self.shape().strides()
    }

    /// Size of each dimension as `i64`, for wide-index libraries.
    fn shape64(&self) -> Vec<i64> {
        self.shape().dims64()
    }

    /// Strides as `i64`, for wide-index libraries.
    fn strides64(&self) -> Vec<i64> {
        self.shape().strides64()
    }

    fn num_dims(&self) -> usize {
        self.shape().ndim()
    }

    /// Size of dimension `i`. Panics if `i >= num_dims()`.
    fn dim(&self, i: usize) -> usize {
        self.shape().dim(i)
    }

    /// Checked variant of [`Tensor::dim`].
    fn try_dim(&self, i: usize) -> Result<usize> {
        self.shape().try_dim(i)
    }

    /// Checked variant of [`Tensor::dim_name`].
    fn try_dim_name(&self, i: usize) -> Result<&str> {
        self.shape().try_dim_name(i)
    }

    fn dim_names(&self) -> &[String] {
        self.shape().names()
    }

    /// Name of dimension `i`. Panics if `i >= num_dims()`.
    fn dim_name(&self, i: usize) -> &str {
        self.shape().dim_name(i)
    }

    fn is_contiguous(&self) -> bool {
        self.shape().is_contiguous()
    }

    fn is_row_major(&self) -> bool {
        self.shape().is_row_major()
    }

    fn is_col_major(&self) -> bool {
        self.shape().is_col_major()
    }

    /// Flat storage offset of `index`; not validated.
    #[inline]
    fn offset(&self, index: &[usize]) -> usize {
        self.shape().offset(index)
    }

    #[inline]
    fn f64_val(&self, index: &[usize]) -> f64 {
        self.f64_val_1d(self.offset(index))
    }

    #[inline]
    fn set_f64(&mut self, index: &[usize], val: f64) {
        let offset = self.offset(index);
        self.set_f64_1d(offset, val);
    }

    fn string_val(&self, index: &[usize]) -> String {
        self.string_val_1d(self.offset(index))
    }

    /// Writes `val` at `index`; unparsable text leaves the element unchanged.
    fn set_string(&mut self, index: &[usize], val: &str) {
        let offset = self.offset(index);
        if let Err(e) = self.set_string_1d(offset, val) {
            debug!("set_string at {:?} ignored: {}", index, e);
        }
    }

    /// Checked variant of [`Tensor::f64_val`].
    fn try_f64_val(&self, index: &[usize]) -> Result<f64> {
        let offset = self.shape().checked_offset(index)?;
        Ok(self.f64_val_1d(offset))
    }

    /// Checked variant of [`Tensor::set_f64`].
    fn try_set_f64(&mut self, index: &[usize], val: f64) -> Result<()> {
        let offset = self.shape().checked_offset(index)?;
        self.set_f64_1d(offset, val);
        Ok(())
    }

    /// Checked variant of [`Tensor::string_val`].
    fn try_string_val(&self, index: &[usize]) -> Result<String> {
        let offset = self.shape().checked_offset(index)?;
        Ok(self.string_val_1d(offset))
    }

    /// Checked variant of [`Tensor::set_string`], reporting parse failures.
    fn try_set_string(&mut self, index: &[usize], val: &str) -> Result<()> {
        let offset = self.shape().checked_offset(index)?;
        self.set_string_1d(offset, val)
    }

    /// Adds `n` rows to the outermost dimension of a row-major tensor.
    /// Does nothing for other layouts.
    fn add_rows(&mut self, n: usize) {
        let Some(&rows) = self.shapes().first() else {
            return;
        };
        match rows.checked_add(n) {
            Some(total) => self.set_num_rows(total),
            None => trace!("add_rows({}) ignored: row count overflows", n),
        }
    }

    /// Copies elements from `from` in flat order, up to the shorter of the
    /// two lengths. Goes through the text view when either side holds
    /// strings, through `f64` otherwise.
    fn copy_from(&mut self, from: &dyn Tensor) {
        let n = self.len().min(from.len());
        if self.dtype() == DType::String || from.dtype() == DType::String {
            for i in 0..n {
                let val = from.string_val_1d(i);
                if let Err(e) = self.set_string_1d(i, &val) {
                    debug!("copy_from skipped element {}: {}", i, e);
                }
            }
        } else {
            for i in 0..n {
                self.set_f64_1d(i, from.f64_val_1d(i));
            }
        }
    }
}

impl Clone for Box<dyn Tensor> {
    fn clone(&self) -> Self {
        self.clone_tensor()
    }
}
