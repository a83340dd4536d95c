pub mod errors;
pub mod invoice;
pub mod money;
pub mod ports;
pub mod transitions;
