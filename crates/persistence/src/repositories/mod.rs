//! Repository implementations.

pub mod request;

pub use request::RequestRepository;
