use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("invalid shape {dims:?}: {reason}")]
    InvalidShape { dims: Vec<usize>, reason: String },
    #[error("index {index:?} out of range for shape {dims:?}")]
    IndexOutOfRange { index: Vec<usize>, dims: Vec<usize> },
    #[error("dimension {dim} out of range for tensor with {ndim} dimensions")]
    DimOutOfRange { dim: usize, ndim: usize },
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: String, got: String },
    #[error("cannot parse {text:?} as {dtype}")]
    Parse { text: String, dtype: String },
    #[error("unsupported dtype: {0}")]
    UnsupportedDType(String),
}

impl TensorError {
    pub(crate) fn invalid_shape(dims: &[usize], reason: impl Into<String>) -> Self {
        TensorError::InvalidShape {
            dims: dims.to_vec(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;
