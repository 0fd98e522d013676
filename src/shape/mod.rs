mod core;

pub use core::{array, boolean, field, number, object, optional, string, Field, RequestShape, Shape};
