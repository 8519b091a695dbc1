//! The worker contract ([`Service`]) and a closure-backed adapter
//! ([`ServiceFn`]).

mod service;
mod service_fn;

pub use service::{Service, ServiceRef};
pub use service_fn::ServiceFn;
