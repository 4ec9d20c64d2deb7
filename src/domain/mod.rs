pub mod composer;
pub mod models;
pub mod scoring;
