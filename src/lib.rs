//! Form relay
//!
//! A small HTTP service that accepts the website's contact form and driver
//! application as `multipart/form-data`, validates them and forwards them by
//! SMTP, uploads included.

pub mod config;
pub mod error;
pub mod form;
pub mod handler;
pub mod http;
pub mod logger;
pub mod mail;
pub mod server;
