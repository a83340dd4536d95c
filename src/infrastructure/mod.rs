pub mod actor_directory;
pub mod invoice_repo;
pub mod memory;
pub mod models;
pub mod number_sequence;
