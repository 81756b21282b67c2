use std::env;

const DEFAULT_MODEL_PATH: &str = "mnist_model.json";
const DEFAULT_METADATA_TABLE: &str = "model_metadata";
const DEFAULT_PORT: &str = "8080";

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_path: String,
    pub metadata_table: String,
    pub bind_address: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let model_path =
            env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string());
        let metadata_table =
            env::var("METADATA_TABLE").unwrap_or_else(|_| DEFAULT_METADATA_TABLE.to_string());
        let port = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let bind_address = format!("0.0.0.0:{}", port);

        Self {
            model_path,
            metadata_table,
            bind_address,
        }
    }
}
