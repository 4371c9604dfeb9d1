pub mod backend;
pub mod classifier;
pub mod cleanup;
pub mod downloader;
pub mod extractor;
pub mod gemini;
pub mod inventory;
pub mod recovery;
pub mod request_builder;
pub mod retrieval;
pub mod scanner;
pub mod submitter;
pub mod uploader;
