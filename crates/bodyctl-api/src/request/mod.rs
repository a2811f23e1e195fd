// Command API client modules
//
// `RequestClient` handles transport mechanics (retry, deadlines, envelope
// unwrapping); the per-device modules add typed endpoint constructors and
// convenience methods for every service operation.

pub mod client;
pub mod doors;
pub mod endpoint;
pub mod lights;
pub mod seat;
pub mod system;
pub mod windows;

pub use client::{RequestClient, Response};
pub use endpoint::Endpoint;
pub use reqwest::Method;
