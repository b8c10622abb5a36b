pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub database_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        pub jwt_secret: String,
        #[serde(default = "default_jwt_ttl_hours")]
        pub jwt_ttl_hours: i64,
        /// Comma separated list of origins allowed by CORS. Empty allows any origin.
        #[serde(default)]
        pub allowed_origins: String,
        #[serde(default = "default_password_hash_iterations")]
        pub password_hash_iterations: u32,
        /// Deployment name reported by the health check.
        #[serde(default = "default_environment")]
        pub environment: String,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Returns the configured CORS origins, skipping blank entries.
        pub fn allowed_origins(&self) -> Vec<String> {
            self.allowed_origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect()
        }
    }

    fn default_port() -> u16 {
        5000
    }

    fn default_jwt_ttl_hours() -> i64 {
        24
    }

    fn default_password_hash_iterations() -> u32 {
        100_000
    }

    fn default_environment() -> String {
        "development".to_string()
    }

}
pub mod auth;
pub mod entities;
pub mod task;
pub mod user;
pub mod web;
