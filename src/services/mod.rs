pub mod composer;
pub mod interviews;
