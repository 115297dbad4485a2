//! Rewrites schema trees so raw form input is coerced before validation.
//!
//! Form submissions deliver every field as a string (or a file, or a list of
//! either) and omit empty fields inconsistently. [`coerce`] returns a schema
//! that first normalizes such input into the shapes the original nodes expect
//! and then validates with the original nodes, so error messages still come
//! from the schema itself.

mod engine;
mod normalize;
mod options;

pub use engine::{coerce, coerce_with, transform, CoercionMemo};
pub use normalize::{
    normalize_array, normalize_file, normalize_string, normalize_string_with, parse_bigint,
    parse_boolean, parse_date, parse_number,
};
pub use options::CoerceOptions;
