// Preview pipeline: frame composition, display hand-off and session lifecycle.

pub mod capture;
pub mod display;
pub mod publisher;
