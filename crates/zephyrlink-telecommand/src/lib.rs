//! Schema-driven decoder for Zephyr telecommand statements.
//!
//! The binary section of a `TC` frame carries ASCII statements of the form
//! `id,param_1,param_2,...;`. Which parameters follow an id is described by a
//! static [`ParameterSchema`]; the decoder turns each statement into a
//! [`DecodedTelecommand`] with strongly typed [`ParamValue`]s.
//!
//! Decoding is pure: no I/O, no global state. The caller owns whatever it
//! does with the decoded parameters.

pub mod codec;
pub mod error;
pub mod schema;
pub mod value;

pub use codec::{count_statements, decode, decode_at, statements, Statements};
pub use error::{DecodeError, Result};
pub use schema::{CommandSpec, FieldSpec, ParamType, ParameterSchema, STRATEOLE_SCHEMA};
pub use value::{DecodedTelecommand, ParamValue};
