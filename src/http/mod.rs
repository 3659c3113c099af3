//! HTTP protocol layer module
//!
//! Response builders and content-type detection, decoupled from the form handlers.

pub mod mime;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_404_response, build_405_response, build_error_response, build_health_response,
    build_ok_response, json_response, set_server_header, Reply,
};
