use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the broker, the producer, the breed catalog and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub producer: ProducerSettings,
    pub catalog: CatalogSettings,
    pub logging: LoggingSettings,
}

/// Where the broker listens (and where clients connect), plus its data directory.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
}

/// Source files and pacing for the producer.
#[derive(Debug, Deserialize, Clone)]
pub struct ProducerSettings {
    pub source_path: String,
    pub samples_path: String,
    pub pace_ms: u64,
}

/// Enumerated breed options per species, in menu order.
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogSettings {
    pub dog_breeds: Vec<String>,
    pub cat_breeds: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<String>,
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional. Missing values can be filled using defaults.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub producer: Option<PartialProducerSettings>,
    pub catalog: Option<PartialCatalogSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialProducerSettings {
    pub source_path: Option<String>,
    pub samples_path: Option<String>,
    pub pace_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialCatalogSettings {
    pub dog_breeds: Option<Vec<String>>,
    pub cat_breeds: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
    pub file: Option<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The fixed 10-entry menus shown to operators.
impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            dog_breeds: owned(&[
                "Labrador Retriever",
                "German Shepherd",
                "Golden Retriever",
                "Bulldog",
                "Poodle",
                "Beagle",
                "Rottweiler",
                "Yorkshire Terrier",
                "Boxer",
                "Dachshund",
            ]),
            cat_breeds: owned(&[
                "Siamese",
                "Persian",
                "Maine Coon",
                "Ragdoll",
                "Sphynx",
                "British Shorthair",
                "Abyssinian",
                "Birman",
                "Oriental Shorthair",
                "Scottish Fold",
            ]),
        }
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                host: "127.0.0.1".to_string(),
                port: 5680,
                data_dir: "shelterfeed_db".to_string(),
            },
            producer: ProducerSettings {
                source_path: "adoption_data.csv".to_string(),
                samples_path: "smoker-temps.csv".to_string(),
                pace_ms: 30_000,
            },
            catalog: CatalogSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                file: None,
            },
        }
    }
}
