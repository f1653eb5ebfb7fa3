//! Types library for the trader load harness
//!
//! Shared vocabulary between the session workers, the wire codec and the
//! reporting layer. Everything here is plain data with no I/O.
//!
//! # Modules
//! - `ids`: Identities that appear on the wire (TraderId, Symbol)
//! - `numeric`: Fixed-point prices and integer quantities
//! - `order`: Side, order kind and the generated `OrderIntent`
//! - `errors`: Session error taxonomy

pub mod ids;
pub mod numeric;
pub mod order;
pub mod errors;
