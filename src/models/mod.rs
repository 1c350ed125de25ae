pub mod plan;
pub mod saved_response;
pub mod settings;
pub mod subscription;
pub mod tool;
pub mod tool_output;
pub mod usage;
