mod defaults;
mod parser;
mod settings;
mod validation;

pub(crate) use defaults::{
    DEFAULT_BUCKET_WIDTH, DEFAULT_MIN_IMPROVEMENT, DEFAULT_NEW_DEVICE_THRESHOLD,
    DEFAULT_PROTECTED_LEVEL, MIN_BUCKET_WIDTH,
};
pub use settings::AppConfig;
