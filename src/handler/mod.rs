//! Request handler module
//!
//! Routes requests to the two form endpoints and the health probe.

pub mod contact;
pub mod driver;
pub mod router;
pub mod submission;

pub use contact::ContactForm;
pub use driver::DriverForm;
pub use router::{handle_request, route_request};
pub use submission::{handle_submission, Draft, FormEndpoint};
