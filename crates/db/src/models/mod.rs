pub mod job;
pub mod request;
pub mod usage;
pub mod worker;
