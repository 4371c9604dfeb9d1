pub mod batch;
pub mod file;
pub mod job;
pub mod response;
pub mod submission;
