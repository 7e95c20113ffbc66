pub mod closing;
pub mod dates;
pub mod period;
pub mod service;
pub mod validation;
