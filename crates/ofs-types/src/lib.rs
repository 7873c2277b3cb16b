//! Shared vocabulary types for the OrangeFS block-location connector.

#[allow(non_snake_case)]
pub mod status_code;

pub mod status;
pub mod result;

#[macro_use]
pub mod strong_type;

pub mod ids;
pub mod address;

// Re-export commonly used items at the crate root.
pub use address::{AddressParseError, BmiAddress, BmiProtocol};
pub use ids::*;
pub use result::{make_error, make_error_msg, Result};
pub use status::Status;
pub use status_code::*;
