//! Argument serialization.
//!
//! [`Arg`] is the local representation of anything that can be passed to a
//! toolkit method. Encoding is recursive: sequences keep their order and
//! nesting, proxies become their handle pair, categories become their
//! canonical string and numbers are normalised to `i64` / `f64`.
//!
//! Replies travel the other way through [`crate::wire::WireValue`] and are
//! adopted into [`crate::Value`]s by the connection.

use crate::category::{Category, FiniteElementObject, GeometryType};
use crate::error::Result;
use crate::proxy::Proxy;
use crate::wire::Primitive;
use serde_json::Value as Json;

/// A single method argument.
#[derive(Debug, Clone)]
pub enum Arg {
    Primitive(Primitive),
    List(Vec<Arg>),
    Proxy(Proxy),
    Category(Category),
    /// Passed through unchanged.
    Raw(Json),
}

/// Encode one argument into its wire form.
pub fn encode(arg: &Arg) -> Result<Json> {
    match arg {
        Arg::Primitive(primitive) => Ok(primitive.to_json()),
        Arg::List(items) => Ok(Json::Array(encode_args(items)?)),
        Arg::Proxy(proxy) => Ok(proxy.handle().to_wire()),
        Arg::Category(category) => Ok(Json::String(category.cubit_str().to_string())),
        Arg::Raw(value) => Ok(value.clone()),
    }
}

/// Encode a positional argument list.
pub fn encode_args(args: &[Arg]) -> Result<Vec<Json>> {
    args.iter().map(encode).collect()
}

/// First proxy in `args`, at any depth, for which `accept` is false.
pub(crate) fn find_rejected_proxy<'a>(
    args: &'a [Arg],
    accept: &dyn Fn(&Proxy) -> bool,
) -> Option<&'a Proxy> {
    args.iter().find_map(|arg| match arg {
        Arg::Proxy(proxy) if !accept(proxy) => Some(proxy),
        Arg::List(items) => find_rejected_proxy(items, accept),
        _ => None,
    })
}

/// Build an argument list from heterogeneous values.
///
/// ```rust,ignore
/// use cubit_bridge::args;
///
/// let volume = cubit.invoke("brick", &args![1.0, 2.0, 0.5])?.into_proxy()?;
/// cubit.invoke("move", &args![&volume, [0.0, 0.0, 1.0]])?;
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),+]
    };
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Primitive(Primitive::Int(value as i64))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, isize);

impl From<usize> for Arg {
    fn from(value: usize) -> Self {
        match i64::try_from(value) {
            Ok(i) => Arg::Primitive(Primitive::Int(i)),
            Err(_) => Arg::Primitive(Primitive::Float(value as f64)),
        }
    }
}

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => Arg::Primitive(Primitive::Int(i)),
            Err(_) => Arg::Primitive(Primitive::Float(value as f64)),
        }
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Primitive(Primitive::Float(value))
    }
}

impl From<f32> for Arg {
    fn from(value: f32) -> Self {
        Arg::Primitive(Primitive::Float(f64::from(value)))
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Primitive(Primitive::Bool(value))
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Primitive(Primitive::Str(value.to_string()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Primitive(Primitive::Str(value))
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::Primitive(Primitive::Str(value.clone()))
    }
}

impl From<Primitive> for Arg {
    fn from(value: Primitive) -> Self {
        Arg::Primitive(value)
    }
}

impl From<Proxy> for Arg {
    fn from(value: Proxy) -> Self {
        Arg::Proxy(value)
    }
}

impl From<&Proxy> for Arg {
    fn from(value: &Proxy) -> Self {
        Arg::Proxy(value.clone())
    }
}

impl From<Category> for Arg {
    fn from(value: Category) -> Self {
        Arg::Category(value)
    }
}

impl From<GeometryType> for Arg {
    fn from(value: GeometryType) -> Self {
        Arg::Category(value.into())
    }
}

impl From<FiniteElementObject> for Arg {
    fn from(value: FiniteElementObject) -> Self {
        Arg::Category(value.into())
    }
}

impl From<Json> for Arg {
    fn from(value: Json) -> Self {
        Arg::Raw(value)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Primitive(Primitive::None), Into::into)
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(values: Vec<T>) -> Self {
        Arg::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Arg>, const N: usize> From<[T; N]> for Arg {
    fn from(values: [T; N]) -> Self {
        Arg::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Arg> + Clone> From<&[T]> for Arg {
    fn from(values: &[T]) -> Self {
        Arg::List(values.iter().cloned().map(Into::into).collect())
    }
}
