// Configuration management module
// TOML settings, environment overrides and provider credentials

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    CohereConfig, Config, ConfigError, Credentials, ExportConfig, HttpConfig, IndexConfig,
    NamespacePolicy, PineconeConfig, read_credential,
};

/// Resolve the configuration directory, preferring an explicit override
#[inline]
pub fn get_config_dir(
    override_dir: Option<&std::path::Path>,
) -> Result<std::path::PathBuf, ConfigError> {
    override_dir.map_or_else(Config::config_dir, |dir| Ok(dir.to_path_buf()))
}
