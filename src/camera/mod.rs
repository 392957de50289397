// Camera domain: capture backends and raw frame types.

pub mod backend;
pub mod dummy;
pub mod error;
pub mod types;
