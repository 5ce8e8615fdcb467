pub mod error;
pub mod load;
pub mod settings;

pub use error::ConfigError;
pub use load::{
    load_settings, resolve_runner_binaries, ENV_PROVIDER_BIN_ANTHROPIC, ENV_PROVIDER_BIN_OPENAI,
    SETTINGS_FILE_NAME,
};
pub use settings::{BinaryOverrides, Settings};
