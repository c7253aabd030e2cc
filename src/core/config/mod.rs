mod parsing;
mod settings;
mod types;

pub use types::{
    AiSettings, AssignmentSettings, ConfigError, Environment, RuntimeSettings, S3Settings,
    Settings, TelemetrySettings, UploadSettings,
};
