//! Typed value storage for tabula columns.
//!
//! Every column stores one logical [`DataType`]. This crate maps each datatype to:
//!
//! - an in-memory array representation ([`ValueArray`]) with its null handling,
//! - a builder that type-checks incoming values ([`ArrayBuilder`]),
//! - a persisted file form with demand loading ([`persist`], [`Loadable`]),
//! - per-type defaults: null representation, display format and column role.
//!
//! # Example
//!
//! ```rust
//! use tabula_store::{DataType, Value, persist};
//!
//! let mut builder = DataType::Int.get_array(3);
//! builder.push(Some(Value::Int(40))).unwrap();
//! builder.push(None).unwrap();
//! builder.push(Some(Value::Int(61))).unwrap();
//!
//! let handle = persist::store(DataType::Int, builder.finish(), None).unwrap();
//! let gathered = persist::take(DataType::Int, &handle, &[2, 0]).unwrap();
//! assert_eq!(gathered.get(0), Some(Value::Int(61)));
//! ```

pub mod array;
pub mod builder;
pub mod coltype;
pub mod datatype;
pub mod format;
pub mod lazy;
pub mod persist;
pub mod value;

pub use array::ValueArray;
pub use builder::ArrayBuilder;
pub use coltype::ColType;
pub use datatype::DataType;
pub use format::format_value;
pub use lazy::Loadable;
pub use persist::ArrayHandle;
pub use value::Value;
