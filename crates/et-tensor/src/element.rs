//! Per-type conversions between native element values and the two canonical
//! views every tensor exposes: `f64` and `String`.
//!
//! Conversion policy:
//! - floats widen exactly to `f64` and round to nearest when narrowing; text
//!   uses the shortest representation that parses back to the same value.
//! - integers narrow from `f64` with saturating casts (NaN becomes 0); text is
//!   parsed as an integer first, then as a float and cast.
//! - `bool` maps to 1.0 / 0.0, and any non-zero value is `true`; text is
//!   `true` / `false`, numbers are also accepted.
//! - `String` parses its text as `f64`, yielding NaN for non-numeric text.

use std::fmt::Debug;

use half::f16;

use crate::dtype::DType;

/// A value type that can be stored in a [`Dense`](crate::dense::Dense) tensor.
pub trait Element: Clone + Default + Debug + PartialEq + Send + Sync + 'static {
    /// Identifier reported through `Tensor::dtype`.
    const DTYPE: DType;

    fn to_f64(&self) -> f64;

    fn from_f64(val: f64) -> Self;

    fn to_text(&self) -> String;

    /// Parses `text` into a native value, or `None` if it has no sensible
    /// interpretation for this type.
    fn parse_text(text: &str) -> Option<Self>;
}

macro_rules! impl_float_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;
            #[inline]
            fn to_f64(&self) -> f64 {
                *self as f64
            }
            #[inline]
            fn from_f64(val: f64) -> Self {
                val as $ty
            }
            fn to_text(&self) -> String {
                self.to_string()
            }
            fn parse_text(text: &str) -> Option<Self> {
                text.trim().parse::<$ty>().ok()
            }
        }
    };
}

macro_rules! impl_int_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;
            #[inline]
            fn to_f64(&self) -> f64 {
                *self as f64
            }
            #[inline]
            fn from_f64(val: f64) -> Self {
                val as $ty
            }
            fn to_text(&self) -> String {
                self.to_string()
            }
            fn parse_text(text: &str) -> Option<Self> {
                let text = text.trim();
                text.parse::<$ty>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().map(|v| v as $ty))
            }
        }
    };
}

impl_float_element!(f32, DType::F32);
impl_float_element!(f64, DType::F64);
impl_int_element!(u8, DType::U8);
impl_int_element!(i32, DType::I32);
impl_int_element!(i64, DType::I64);
impl_int_element!(u32, DType::U32);

impl Element for f16 {
    const DTYPE: DType = DType::F16;

    #[inline]
    fn to_f64(&self) -> f64 {
        f16::to_f64(*self)
    }

    #[inline]
    fn from_f64(val: f64) -> Self {
        f16::from_f64(val)
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn parse_text(text: &str) -> Option<Self> {
        text.trim().parse::<f32>().ok().map(f16::from_f32)
    }
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    #[inline]
    fn to_f64(&self) -> f64 {
        if *self {
            1.0
        } else {
            0.0
        }
    }

    #[inline]
    fn from_f64(val: f64) -> Self {
        val != 0.0
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn parse_text(text: &str) -> Option<Self> {
        let text = text.trim();
        match text {
            "true" => Some(true),
            "false" => Some(false),
            _ => text.parse::<f64>().ok().map(Self::from_f64),
        }
    }
}

impl Element for String {
    const DTYPE: DType = DType::String;

    fn to_f64(&self) -> f64 {
        self.trim().parse::<f64>().unwrap_or(f64::NAN)
    }

    fn from_f64(val: f64) -> Self {
        val.to_string()
    }

    fn to_text(&self) -> String {
        self.clone()
    }

    fn parse_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_float_conversions() {
        assert_eq!(<f32 as Element>::from_f64(1.5), 1.5f32);
        assert_relative_eq!(<f32 as Element>::from_f64(0.1).to_f64(), 0.1, epsilon = 1e-7);
        assert_eq!(2.25f64.to_text(), "2.25");
        assert_eq!(<f64 as Element>::parse_text(" 3.5 "), Some(3.5));
        assert_eq!(<f64 as Element>::parse_text("abc"), None);
    }

    #[test]
    fn test_half_conversions() {
        let h = <f16 as Element>::from_f64(0.5);
        assert_eq!(h.to_f64(), 0.5);
        assert_eq!(<f16 as Element>::parse_text("2"), Some(f16::from_f32(2.0)));
        // Precision is lost when narrowing.
        assert_relative_eq!(<f16 as Element>::from_f64(0.1).to_f64(), 0.1, epsilon = 1e-3);
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(<i32 as Element>::from_f64(2.9), 2);
        assert_eq!(<i32 as Element>::from_f64(-2.9), -2);
        assert_eq!(<u8 as Element>::from_f64(300.0), 255);
        assert_eq!(<u8 as Element>::from_f64(-1.0), 0);
        assert_eq!(<i64 as Element>::from_f64(f64::NAN), 0);
        assert_eq!(<i32 as Element>::parse_text("42"), Some(42));
        assert_eq!(<i32 as Element>::parse_text("4.7"), Some(4));
        assert_eq!(<u32 as Element>::parse_text("x"), None);
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(true.to_f64(), 1.0);
        assert!(!<bool as Element>::from_f64(0.0));
        assert!(<bool as Element>::from_f64(-0.5));
        assert_eq!(<bool as Element>::parse_text("false"), Some(false));
        assert_eq!(<bool as Element>::parse_text("1"), Some(true));
        assert_eq!(<bool as Element>::parse_text("yes"), None);
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!("2.5".to_string().to_f64(), 2.5);
        assert!("hello".to_string().to_f64().is_nan());
        assert_eq!(<String as Element>::from_f64(3.0), "3");
        assert_eq!(<String as Element>::parse_text("abc"), Some("abc".to_string()));
    }

    #[test]
    fn test_dtype_ids() {
        assert_eq!(<f16 as Element>::DTYPE, DType::F16);
        assert_eq!(<String as Element>::DTYPE, DType::String);
        assert_eq!(<u8 as Element>::DTYPE, DType::U8);
    }
}
