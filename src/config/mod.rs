mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    BrokerSettings, CatalogSettings, LoggingSettings, ProducerSettings, Settings,
};

/// Prefix for environment overrides, e.g. `SHELTERFEED__BROKER__PORT=5700`.
pub const ENV_PREFIX: &str = "SHELTERFEED";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct with every section filled in
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("catalog.dog_breeds")
                .with_list_parse_key("catalog.cat_breeds"),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(merge(partial, Settings::default()))
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let broker = partial.broker.unwrap_or_default();
    let producer = partial.producer.unwrap_or_default();
    let catalog = partial.catalog.unwrap_or_default();
    let logging = partial.logging.unwrap_or_default();

    Settings {
        broker: BrokerSettings {
            host: broker.host.unwrap_or(default.broker.host),
            port: broker.port.unwrap_or(default.broker.port),
            data_dir: broker.data_dir.unwrap_or(default.broker.data_dir),
        },
        producer: ProducerSettings {
            source_path: producer.source_path.unwrap_or(default.producer.source_path),
            samples_path: producer
                .samples_path
                .unwrap_or(default.producer.samples_path),
            pace_ms: producer.pace_ms.unwrap_or(default.producer.pace_ms),
        },
        catalog: CatalogSettings {
            dog_breeds: catalog.dog_breeds.unwrap_or(default.catalog.dog_breeds),
            cat_breeds: catalog.cat_breeds.unwrap_or(default.catalog.cat_breeds),
        },
        logging: LoggingSettings {
            level: logging.level.unwrap_or(default.logging.level),
            file: logging.file.or(default.logging.file),
        },
    }
}

#[cfg(test)]
mod tests;
