//! The closed element-type universe of variables.
//!
//! Every variable stores one of a fixed set of element types, held as a
//! [`Buffer`] inside the [`Elements`] tagged union. [`DType`] is the runtime
//! discriminant used for cross-variable type checks; the [`Element`] trait
//! maps Rust types onto union arms for typed access.

use std::sync::Arc;

use crate::buffer::Buffer;
use crate::tag::ValueWithDelta;
use crate::Dataset;

/// Runtime discriminant of an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F64,
    I32,
    I64,
    Bool,
    Str,
    StrList,
    IndexList,
    IndexPair,
    F64Triple,
    F64Quad,
    SharedF64List,
    FuzzyF64,
    Dataset,
}

/// A typed column buffer: one arm per supported element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Elements {
    F64(Buffer<f64>),
    I32(Buffer<i32>),
    I64(Buffer<i64>),
    Bool(Buffer<bool>),
    Str(Buffer<String>),
    StrList(Buffer<Vec<String>>),
    IndexList(Buffer<Vec<i64>>),
    IndexPair(Buffer<(i64, i64)>),
    F64Triple(Buffer<[f64; 3]>),
    F64Quad(Buffer<[f64; 4]>),
    SharedF64List(Buffer<Arc<Vec<f64>>>),
    FuzzyF64(Buffer<ValueWithDelta<f64>>),
    Dataset(Buffer<Dataset>),
}

/// Expand `$body` once per `(variant, element type)` pair of the universe.
macro_rules! for_each_element_type {
    ($m:ident) => {
        $m!(F64, f64);
        $m!(I32, i32);
        $m!(I64, i64);
        $m!(Bool, bool);
        $m!(Str, String);
        $m!(StrList, Vec<String>);
        $m!(IndexList, Vec<i64>);
        $m!(IndexPair, (i64, i64));
        $m!(F64Triple, [f64; 3]);
        $m!(F64Quad, [f64; 4]);
        $m!(SharedF64List, Arc<Vec<f64>>);
        $m!(FuzzyF64, ValueWithDelta<f64>);
        $m!(Dataset, Dataset);
    };
}

/// Match an `Elements` reference, binding the typed buffer as `$buf`.
macro_rules! with_buffer {
    ($elements:expr, $buf:ident => $body:expr) => {
        match $elements {
            Elements::F64($buf) => $body,
            Elements::I32($buf) => $body,
            Elements::I64($buf) => $body,
            Elements::Bool($buf) => $body,
            Elements::Str($buf) => $body,
            Elements::StrList($buf) => $body,
            Elements::IndexList($buf) => $body,
            Elements::IndexPair($buf) => $body,
            Elements::F64Triple($buf) => $body,
            Elements::F64Quad($buf) => $body,
            Elements::SharedF64List($buf) => $body,
            Elements::FuzzyF64($buf) => $body,
            Elements::Dataset($buf) => $body,
        }
    };
}

/// Match a pair of `Elements` with matching arms, binding both typed buffers.
/// The fallback arm receives mismatched pairs.
macro_rules! with_buffer_pair {
    ($a:expr, $b:expr, ($x:ident, $y:ident) => $body:expr, else => $mismatch:expr) => {
        match ($a, $b) {
            (Elements::F64($x), Elements::F64($y)) => $body,
            (Elements::I32($x), Elements::I32($y)) => $body,
            (Elements::I64($x), Elements::I64($y)) => $body,
            (Elements::Bool($x), Elements::Bool($y)) => $body,
            (Elements::Str($x), Elements::Str($y)) => $body,
            (Elements::StrList($x), Elements::StrList($y)) => $body,
            (Elements::IndexList($x), Elements::IndexList($y)) => $body,
            (Elements::IndexPair($x), Elements::IndexPair($y)) => $body,
            (Elements::F64Triple($x), Elements::F64Triple($y)) => $body,
            (Elements::F64Quad($x), Elements::F64Quad($y)) => $body,
            (Elements::SharedF64List($x), Elements::SharedF64List($y)) => $body,
            (Elements::FuzzyF64($x), Elements::FuzzyF64($y)) => $body,
            (Elements::Dataset($x), Elements::Dataset($y)) => $body,
            _ => $mismatch,
        }
    };
}

pub(crate) use with_buffer_pair;

impl Elements {
    pub fn dtype(&self) -> DType {
        match self {
            Elements::F64(_) => DType::F64,
            Elements::I32(_) => DType::I32,
            Elements::I64(_) => DType::I64,
            Elements::Bool(_) => DType::Bool,
            Elements::Str(_) => DType::Str,
            Elements::StrList(_) => DType::StrList,
            Elements::IndexList(_) => DType::IndexList,
            Elements::IndexPair(_) => DType::IndexPair,
            Elements::F64Triple(_) => DType::F64Triple,
            Elements::F64Quad(_) => DType::F64Quad,
            Elements::SharedF64List(_) => DType::SharedF64List,
            Elements::FuzzyF64(_) => DType::FuzzyF64,
            Elements::Dataset(_) => DType::Dataset,
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        with_buffer!(self, buf => buf.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A default-initialised column of `len` elements of type `dtype`.
    pub fn with_default(dtype: DType, len: usize) -> Elements {
        match dtype {
            DType::F64 => Elements::F64(Buffer::with_default(len)),
            DType::I32 => Elements::I32(Buffer::with_default(len)),
            DType::I64 => Elements::I64(Buffer::with_default(len)),
            DType::Bool => Elements::Bool(Buffer::with_default(len)),
            DType::Str => Elements::Str(Buffer::with_default(len)),
            DType::StrList => Elements::StrList(Buffer::with_default(len)),
            DType::IndexList => Elements::IndexList(Buffer::with_default(len)),
            DType::IndexPair => Elements::IndexPair(Buffer::with_default(len)),
            DType::F64Triple => Elements::F64Triple(Buffer::with_default(len)),
            DType::F64Quad => Elements::F64Quad(Buffer::with_default(len)),
            DType::SharedF64List => Elements::SharedF64List(Buffer::with_default(len)),
            DType::FuzzyF64 => Elements::FuzzyF64(Buffer::with_default(len)),
            DType::Dataset => Elements::Dataset(Buffer::with_default(len)),
        }
    }

    /// True when both columns share the same underlying storage.
    pub fn ptr_eq(&self, other: &Elements) -> bool {
        with_buffer_pair!(self, other, (x, y) => x.ptr_eq(y), else => false)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust type that is a member of the closed element universe.
pub trait Element: Clone + PartialEq + Default + sealed::Sealed + Send + Sync + 'static {
    const DTYPE: DType;

    fn from_vec(values: Vec<Self>) -> Elements;
    fn buffer(elements: &Elements) -> Option<&Buffer<Self>>;
    fn buffer_mut(elements: &mut Elements) -> Option<&mut Buffer<Self>>;
}

macro_rules! impl_element {
    ($variant:ident, $ty:ty) => {
        impl sealed::Sealed for $ty {}

        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn from_vec(values: Vec<Self>) -> Elements {
                Elements::$variant(Buffer::new(values))
            }

            fn buffer(elements: &Elements) -> Option<&Buffer<Self>> {
                match elements {
                    Elements::$variant(buf) => Some(buf),
                    _ => None,
                }
            }

            fn buffer_mut(elements: &mut Elements) -> Option<&mut Buffer<Self>> {
                match elements {
                    Elements::$variant(buf) => Some(buf),
                    _ => None,
                }
            }
        }
    };
}

for_each_element_type!(impl_element);
