use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::Deserialize;

use crate::dense::Dense;
use crate::dtype::DType;
use crate::element::Element;
use crate::shape::Shape;

impl<E> serde::Serialize for Dense<E>
where
    E: Element + serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let shape = crate::Tensor::shape(self);
        let mut state = serializer.serialize_struct("Tensor", 5)?;
        state.serialize_field("dtype", &E::DTYPE)?;
        state.serialize_field("shape", shape.dims())?;
        state.serialize_field("strides", shape.strides())?;
        state.serialize_field("names", shape.names())?;
        state.serialize_field("data", self.values())?;
        state.end()
    }
}

impl<'de, E> serde::Deserialize<'de> for Dense<E>
where
    E: Element + serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TensorData<E> {
            dtype: DType,
            shape: Vec<usize>,
            strides: Vec<usize>,
            names: Vec<String>,
            data: Vec<E>,
        }

        let TensorData {
            dtype,
            shape,
            strides,
            names,
            data,
        } = TensorData::deserialize(deserializer)?;

        if dtype != E::DTYPE {
            return Err(D::Error::custom(format!(
                "expected {} tensor, found {}",
                E::DTYPE,
                dtype
            )));
        }

        let shape = Shape::with_strides(&shape, &strides)
            .and_then(|s| s.with_names(&names))
            .map_err(D::Error::custom)?;
        Dense::from_vec(shape, data).map_err(D::Error::custom)
    }
}
