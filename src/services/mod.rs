pub mod media;
pub mod pipeline;
pub mod script_analysis;
