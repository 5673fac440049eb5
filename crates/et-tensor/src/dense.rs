use std::any::Any;

use half::f16;
use log::{debug, trace};

use crate::dtype::DType;
use crate::element::Element;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// A tensor holding its elements in a flat `Vec` of the native type.
///
/// Element `i` of `values` is the one at flat offset `i`; the shape maps
/// n-dimensional indices onto those offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense<E: Element> {
    shape: Shape,
    values: Vec<E>,
}

pub type BoolTensor = Dense<bool>;
pub type Uint8 = Dense<u8>;
pub type Int32 = Dense<i32>;
pub type Int64 = Dense<i64>;
pub type Uint32 = Dense<u32>;
pub type Float16 = Dense<f16>;
pub type Float32 = Dense<f32>;
pub type Float64 = Dense<f64>;
pub type StringTensor = Dense<String>;

impl<E: Element> Dense<E> {
    /// Create a zero-filled, row-major tensor with the given dimensions.
    pub fn new(dims: &[usize]) -> Self {
        Self::with_shape(Shape::row_major(dims))
    }

    /// Create a zero-filled tensor with the given shape.
    pub fn with_shape(shape: Shape) -> Self {
        let values = vec![E::default(); shape.len()];
        Dense { shape, values }
    }

    /// Create a tensor from flat-ordered values.
    ///
    /// # Errors
    /// Returns `InvalidShape` if `values.len()` differs from the number of
    /// elements of `shape`.
    pub fn from_vec(shape: Shape, values: Vec<E>) -> Result<Self> {
        let n = shape.checked_len()?;
        if values.len() != n {
            return Err(TensorError::invalid_shape(
                shape.dims(),
                format!("{} values given for {} elements", values.len(), n),
            ));
        }
        Ok(Dense { shape, values })
    }

    /// Native value at `index`; not validated.
    #[inline]
    pub fn value(&self, index: &[usize]) -> &E {
        &self.values[self.shape.offset(index)]
    }

    /// Native value at `index`, or `None` if the index is out of range.
    pub fn get(&self, index: &[usize]) -> Option<&E> {
        let offset = self.shape.checked_offset(index).ok()?;
        self.values.get(offset)
    }

    /// Writes a native value at `index`; not validated.
    #[inline]
    pub fn set(&mut self, index: &[usize], val: E) {
        let offset = self.shape.offset(index);
        self.values[offset] = val;
    }

    /// Elements in flat storage order.
    pub fn values(&self) -> &[E] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [E] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<E> {
        self.values
    }

    /// Recovers the concrete tensor behind a uniform handle.
    ///
    /// # Errors
    /// Returns `DTypeMismatch` if `tensor` does not hold `E` elements.
    pub fn downcast_ref(tensor: &dyn Tensor) -> Result<&Self> {
        let dtype = tensor.dtype();
        tensor
            .as_any()
            .downcast_ref::<Self>()
            .ok_or_else(|| TensorError::DTypeMismatch {
                expected: E::DTYPE.to_string(),
                got: dtype.to_string(),
            })
    }

    /// Mutable variant of [`Dense::downcast_ref`].
    pub fn downcast_mut(tensor: &mut dyn Tensor) -> Result<&mut Self> {
        let dtype = tensor.dtype();
        tensor
            .as_any_mut()
            .downcast_mut::<Self>()
            .ok_or_else(|| TensorError::DTypeMismatch {
                expected: E::DTYPE.to_string(),
                got: dtype.to_string(),
            })
    }

    /// Installs `shape` and resizes storage, keeping the flat-order prefix of
    /// the existing values and zero-filling any new slots.
    fn resize_to(&mut self, shape: Shape) {
        let n = shape.len();
        if n != self.values.len() {
            debug!(
                "resizing {} storage from {} to {} elements for shape {}",
                E::DTYPE,
                self.values.len(),
                n,
                shape
            );
        }
        self.values.resize(n, E::default());
        self.shape = shape;
    }
}

impl<E: Element> Tensor for Dense<E> {
    fn dtype(&self) -> DType {
        E::DTYPE
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    fn f64_val_1d(&self, offset: usize) -> f64 {
        self.values[offset].to_f64()
    }

    #[inline]
    fn set_f64_1d(&mut self, offset: usize, val: f64) {
        self.values[offset] = E::from_f64(val);
    }

    fn string_val_1d(&self, offset: usize) -> String {
        self.values[offset].to_text()
    }

    fn set_string_1d(&mut self, offset: usize, val: &str) -> Result<()> {
        let parsed = E::parse_text(val).ok_or_else(|| TensorError::Parse {
            text: val.to_string(),
            dtype: E::DTYPE.to_string(),
        })?;
        self.values[offset] = parsed;
        Ok(())
    }

    fn agg_f64(&self, fun: &dyn Fn(f64, f64) -> f64, init: f64) -> f64 {
        self.values
            .iter()
            .fold(init, |acc, v| fun(v.to_f64(), acc))
    }

    fn eval_f64(&self, fun: &dyn Fn(f64) -> f64, res: &mut Vec<f64>) {
        res.clear();
        res.extend(self.values.iter().map(|v| fun(v.to_f64())));
    }

    fn update_f64(&mut self, fun: &dyn Fn(f64) -> f64) {
        for v in self.values.iter_mut() {
            *v = E::from_f64(fun(v.to_f64()));
        }
    }

    fn set_zeros(&mut self) {
        self.values.fill(E::default());
    }

    fn clone_tensor(&self) -> Box<dyn Tensor> {
        Box::new(self.clone())
    }

    fn set_shape(
        &mut self,
        dims: &[usize],
        strides: Option<&[usize]>,
        names: Option<&[&str]>,
    ) -> Result<()> {
        let shape = self.shape.reshaped(dims, strides, names)?;
        self.resize_to(shape);
        Ok(())
    }

    fn set_num_rows(&mut self, rows: usize) {
        if !self.shape.is_row_major() {
            trace!("set_num_rows ignored for non row-major shape {}", self.shape);
            return;
        }
        match self.shape.with_num_rows(rows) {
            Some(shape) => self.resize_to(shape),
            None => trace!(
                "set_num_rows({}) ignored for shape {}: scalar or element count overflows",
                rows,
                self.shape
            ),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Creates a zero-filled tensor of the given element type behind a uniform
/// handle.
///
/// # Errors
/// Returns `InvalidShape` if the element count of `shape` overflows.
pub fn new_of_type(dtype: DType, shape: Shape) -> Result<Box<dyn Tensor>> {
    shape.checked_len()?;
    let tensor: Box<dyn Tensor> = match dtype {
        DType::Bool => Box::new(BoolTensor::with_shape(shape)),
        DType::U8 => Box::new(Uint8::with_shape(shape)),
        DType::I32 => Box::new(Int32::with_shape(shape)),
        DType::I64 => Box::new(Int64::with_shape(shape)),
        DType::U32 => Box::new(Uint32::with_shape(shape)),
        DType::F16 => Box::new(Float16::with_shape(shape)),
        DType::F32 => Box::new(Float32::with_shape(shape)),
        DType::F64 => Box::new(Float64::with_shape(shape)),
        DType::String => Box::new(StringTensor::with_shape(shape)),
    };
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn arange(dims: &[usize]) -> Float64 {
        let shape = Shape::row_major(dims);
        let values = (0..shape.len()).map(|v| v as f64).collect();
        Float64::from_vec(shape, values).unwrap()
    }

    #[test]
    fn test_new_tensor() {
        let t = Float32::new(&[2, 3]);
        assert_eq!(t.len(), 6);
        assert_eq!(t.num_dims(), 2);
        assert_eq!(t.shapes(), &[2, 3]);
        assert_eq!(t.strides(), &[3, 1]);
        assert_eq!(t.dtype(), DType::F32);
        assert!(t.is_row_major());
        assert_eq!(t.values(), &[0.0; 6]);
    }

    #[test]
    fn test_from_vec_length_mismatch() {
        let err = Float32::from_vec(Shape::row_major(&[2, 2]), vec![1.0; 3]).unwrap_err();
        assert!(matches!(err, TensorError::InvalidShape { .. }));
    }

    #[test]
    fn test_f64_roundtrip_every_index() {
        let mut t = Float32::new(&[3, 4]);
        for i in 0..3 {
            for j in 0..4 {
                t.set_f64(&[i, j], (i * 10 + j) as f64 + 0.25);
            }
        }
        for i in 0..3 {
            for j in 0..4 {
                assert_eq!(t.f64_val(&[i, j]), (i * 10 + j) as f64 + 0.25);
            }
        }
    }

    #[test]
    fn test_lossy_narrowing() {
        let mut t = Int32::new(&[2]);
        t.set_f64(&[0], 2.75);
        assert_eq!(t.f64_val(&[0]), 2.0);

        let mut h = Float16::new(&[1]);
        h.set_f64(&[0], 0.1);
        assert_relative_eq!(h.f64_val(&[0]), 0.1, epsilon = 1e-3);
    }

    #[test]
    fn test_views_share_element() {
        let mut t = Float64::new(&[2, 2]);
        t.set_f64(&[1, 0], 3.5);
        assert_eq!(t.string_val(&[1, 0]), "3.5");
        t.set_string(&[0, 1], "-1.25");
        assert_eq!(t.f64_val(&[0, 1]), -1.25);
        assert_eq!(t.values(), &[0.0, -1.25, 3.5, 0.0]);
    }

    #[test]
    fn test_set_string_unparsable_keeps_value() {
        let mut t = Int32::new(&[2]);
        t.set_f64(&[1], 7.0);
        t.set_string(&[1], "seven");
        assert_eq!(t.f64_val(&[1]), 7.0);
        assert!(matches!(
            t.try_set_string(&[1], "seven"),
            Err(TensorError::Parse { .. })
        ));
    }

    #[test]
    fn test_string_tensor() {
        let mut t = StringTensor::new(&[3]);
        t.set_string(&[0], "alpha");
        t.set_f64(&[1], 2.5);
        assert_eq!(t.string_val(&[0]), "alpha");
        assert_eq!(t.string_val(&[1]), "2.5");
        assert_eq!(t.f64_val(&[1]), 2.5);
        assert!(t.f64_val(&[0]).is_nan());
        assert_eq!(t.dtype(), DType::String);
    }

    #[test]
    fn test_col_major_addressing() {
        let shape = Shape::col_major(&[2, 4]);
        let mut t = Float64::with_shape(shape);
        t.set_f64(&[1, 2], 9.0);
        assert_eq!(t.offset(&[1, 2]), 5);
        assert_eq!(t.values()[5], 9.0);
        assert_eq!(*t.value(&[1, 2]), 9.0);
    }

    #[test]
    fn test_checked_access() {
        let mut t = arange(&[2, 3]);
        assert_eq!(t.try_f64_val(&[1, 2]).unwrap(), 5.0);
        assert!(t.try_f64_val(&[2, 0]).is_err());
        assert!(t.try_set_f64(&[0, 3], 1.0).is_err());
        assert_eq!(t.try_string_val(&[0, 1]).unwrap(), "1");
        assert_eq!(t.get(&[1, 1]), Some(&4.0));
        assert_eq!(t.get(&[1, 3]), None);
    }

    #[test]
    #[should_panic]
    fn test_unchecked_out_of_storage_panics() {
        let t = arange(&[2, 3]);
        t.f64_val(&[2, 0]);
    }

    #[test]
    fn test_agg_sum() {
        let mut t = Float32::new(&[4, 5]);
        t.update_f64(&|_| 1.5);
        let sum = t.agg_f64(&|v, acc| v + acc, 0.0);
        assert_relative_eq!(sum, 20.0 * 1.5);
    }

    #[test]
    fn test_agg_empty_returns_init() {
        let t = Float64::new(&[0, 3]);
        assert_eq!(t.agg_f64(&|v, acc| v + acc, 42.0), 42.0);
        let mut res = vec![1.0, 2.0];
        t.eval_f64(&|v| v, &mut res);
        assert!(res.is_empty());
    }

    #[test]
    fn test_agg_flat_order() {
        // Transposed strides: flat order differs from logical order.
        let shape = Shape::with_strides(&[2, 3], &[1, 2]).unwrap();
        let values = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let t = Float64::from_vec(shape, values).unwrap();
        let digits = t.agg_f64(&|v, acc| acc * 10.0 + v, 0.0);
        assert_eq!(digits, 12345.0);
    }

    #[test]
    fn test_eval_independent_calls() {
        let t = arange(&[2, 2]);
        let mut res = vec![99.0; 10];
        t.eval_f64(&|v| v * 2.0, &mut res);
        assert_eq!(res, vec![0.0, 2.0, 4.0, 6.0]);
        t.eval_f64(&|v| v + 1.0, &mut res);
        assert_eq!(res, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(t.values(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_update_identity_and_square() {
        let mut t = arange(&[3]);
        t.update_f64(&|v| v);
        assert_eq!(t.values(), &[0.0, 1.0, 2.0]);
        t.update_f64(&|v| v * v);
        assert_eq!(t.values(), &[0.0, 1.0, 4.0]);
    }

    #[test]
    fn test_set_shape_row_major_synthesis() {
        let mut t = arange(&[2, 3]);
        t.set_shape(&[3, 4], None, None).unwrap();
        assert!(t.is_row_major());
        assert_eq!(t.strides(), &[4, 1]);
        assert_eq!(t.len(), 12);
        // Flat prefix survives, the rest is zero-filled.
        assert_eq!(&t.values()[..6], &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(&t.values()[6..], &[0.0; 6]);
    }

    #[test]
    fn test_set_shape_col_major_synthesis() {
        let mut t = Float64::with_shape(Shape::col_major(&[2, 4]));
        t.set_shape(&[3, 5, 2], None, None).unwrap();
        assert!(t.is_col_major());
        assert_eq!(t.strides(), &[1, 3, 15]);
        assert_eq!(t.len(), 30);
    }

    #[test]
    fn test_set_shape_names() {
        let mut t = Float64::new(&[2, 3]);
        t.set_shape(&[2, 3], None, Some(&["time", "unit"][..])).unwrap();
        assert_eq!(t.dim_name(0), "time");
        t.set_shape(&[4, 3], None, None).unwrap();
        assert_eq!(t.dim_names(), &["time", "unit"]);
        t.set_shape(&[4], None, None).unwrap();
        assert_eq!(t.dim_names(), &[""]);
    }

    #[test]
    fn test_set_shape_invalid_leaves_tensor() {
        let mut t = arange(&[2, 3]);
        let before = t.clone();
        assert!(t.set_shape(&[2, 3], Some(&[1][..]), None).is_err());
        assert!(t.set_shape(&[2, 3], None, Some(&["a"][..])).is_err());
        assert!(t.set_shape(&[usize::MAX, 3], None, None).is_err());
        assert_eq!(t, before);
    }

    #[test]
    fn test_set_shape_zero_dim() {
        let mut t = arange(&[2, 3]);
        t.set_shape(&[0, 3], None, None).unwrap();
        assert_eq!(t.len(), 0);
        assert!(t.is_empty());
        assert!(t.values().is_empty());
    }

    #[test]
    fn test_add_rows_row_major() {
        let mut t = arange(&[2, 3]);
        t.add_rows(2);
        assert_eq!(t.shapes(), &[4, 3]);
        assert_eq!(t.len(), 12);
        assert_eq!(t.strides(), &[3, 1]);
        assert_eq!(t.f64_val(&[1, 2]), 5.0);
        assert_eq!(t.f64_val(&[3, 2]), 0.0);
    }

    #[test]
    fn test_add_rows_from_empty() {
        let mut t = Float64::new(&[0, 4]);
        t.add_rows(1);
        t.add_rows(1);
        assert_eq!(t.shapes(), &[2, 4]);
        assert_eq!(t.values().len(), 8);
    }

    #[test]
    fn test_add_rows_col_major_noop() {
        let mut t = Float64::with_shape(Shape::col_major(&[2, 3]));
        t.add_rows(3);
        assert_eq!(t.shapes(), &[2, 3]);
        assert_eq!(t.len(), 6);
        t.set_num_rows(10);
        assert_eq!(t.shapes(), &[2, 3]);
    }

    #[test]
    fn test_add_rows_custom_strides_noop() {
        let shape = Shape::with_strides(&[2, 3], &[1, 5]).unwrap();
        let mut t = Float64::with_shape(shape);
        t.add_rows(1);
        assert_eq!(t.shapes(), &[2, 3]);
    }

    #[test]
    fn test_set_num_rows_shrink_and_grow() {
        let mut t = arange(&[4, 2]);
        t.set_num_rows(1);
        assert_eq!(t.shapes(), &[1, 2]);
        assert_eq!(t.values(), &[0.0, 1.0]);
        t.set_num_rows(3);
        assert_eq!(t.values(), &[0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_set_num_rows_overflow_keeps_tensor() {
        let mut t = arange(&[2, 4]);
        let before = t.clone();
        t.set_num_rows(1 << 62);
        assert_eq!(t, before);
        assert_eq!(t.len(), 8);
        t.add_rows(usize::MAX);
        assert_eq!(t, before);
        t.add_rows(1);
        assert_eq!(t.shapes(), &[3, 4]);
    }

    #[test]
    fn test_try_dim_through_trait() {
        let t = Float64::new(&[2, 3]);
        assert_eq!(t.try_dim(0).unwrap(), 2);
        assert_eq!(t.try_dim_name(1).unwrap(), "");
        assert!(matches!(
            t.try_dim(2),
            Err(TensorError::DimOutOfRange { dim: 2, ndim: 2 })
        ));
    }

    #[test]
    fn test_set_num_rows_scalar_noop() {
        let mut t = Float64::new(&[]);
        assert_eq!(t.len(), 1);
        t.add_rows(3);
        t.set_num_rows(3);
        assert_eq!(t.num_dims(), 0);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_set_zeros_and_clone_tensor() {
        let mut t = arange(&[2, 2]);
        let copy = t.clone_tensor();
        t.set_zeros();
        assert_eq!(t.values(), &[0.0; 4]);
        assert_eq!(copy.f64_val(&[1, 1]), 3.0);
        assert_eq!(copy.dtype(), DType::F64);
    }

    #[test]
    fn test_copy_from_numeric() {
        let src = arange(&[2, 3]);
        let mut dst = Int32::new(&[4]);
        dst.copy_from(&src);
        assert_eq!(dst.values(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_copy_from_strings() {
        let mut src = StringTensor::new(&[3]);
        src.set_string(&[0], "1");
        src.set_string(&[1], "x");
        src.set_string(&[2], "3");
        let mut dst = Uint8::new(&[3]);
        dst.set_f64(&[1], 8.0);
        dst.copy_from(&src);
        assert_eq!(dst.values(), &[1, 8, 3]);
    }

    #[test]
    fn test_downcast() {
        let boxed: Box<dyn Tensor> = Box::new(arange(&[3]));
        let t = Float64::downcast_ref(boxed.as_ref()).unwrap();
        assert_eq!(t.values(), &[0.0, 1.0, 2.0]);
        assert!(matches!(
            Float32::downcast_ref(boxed.as_ref()),
            Err(TensorError::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_downcast_mut() {
        let mut boxed = new_of_type(DType::I64, Shape::row_major(&[2])).unwrap();
        Int64::downcast_mut(boxed.as_mut()).unwrap().values_mut()[1] = 9;
        assert_eq!(boxed.f64_val(&[1]), 9.0);
    }

    #[test]
    fn test_new_of_type() {
        for dtype in DType::ALL {
            let t = new_of_type(dtype, Shape::row_major(&[2, 3])).unwrap();
            assert_eq!(t.dtype(), dtype);
            assert_eq!(t.len(), 6);
        }
        assert!(new_of_type(DType::F32, Shape::row_major(&[usize::MAX, 2])).is_err());
    }
}
