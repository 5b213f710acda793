//! Byte source implementations

pub mod tcp;

pub use tcp::TcpSource;
