//! `et-tensor` - N-dimensional tensors with a uniform interface over element types.
//!
//! This crate provides:
//! - A `Tensor` trait giving shape queries, `f64` and text element access,
//!   and whole-tensor fold / map operations without knowing the element type
//! - A `Shape` type holding dimension sizes, strides and names, which maps
//!   n-dimensional indices to flat offsets and classifies the layout
//! - A generic `Dense<E>` backend with aliases per element type
//!   (`Float32`, `Int64`, `StringTensor`, ...)
//! - Data type identifiers (`DType`) and per-type conversion rules (`Element`)
//! - Optional serde support behind the `serde` feature

pub mod dense;
pub mod dtype;
pub mod element;
pub mod error;
#[cfg(feature = "serde")]
pub mod serde;
pub mod shape;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use dense::{
    new_of_type, BoolTensor, Dense, Float16, Float32, Float64, Int32, Int64, StringTensor, Uint32,
    Uint8,
};
pub use dtype::DType;
pub use element::Element;
pub use error::{Result, TensorError};
pub use shape::{col_major_strides, row_major_strides, Shape};
pub use tensor::Tensor;
