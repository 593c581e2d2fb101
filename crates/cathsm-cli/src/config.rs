mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{build_model_config, build_pipeline_config, build_select_template_config};
pub use models::SessionOptions;
