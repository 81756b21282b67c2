use std::path::Path;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;

use mnist_backend::config::AppConfig;
use mnist_backend::db::dynamodb::DynamoMetadataStore;
use mnist_backend::model::ModelHolder;
use mnist_backend::routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = AppConfig::from_env();

    // A missing or corrupt artifact is fatal; never serve without a model.
    let model = match ModelHolder::load(Path::new(&config.model_path)) {
        Ok(model) => web::Data::new(model),
        Err(e) => {
            log::error!("Failed to load model artifact {}: {}", config.model_path, e);
            return Err(std::io::Error::other(format!("Model loading failed: {}", e)));
        }
    };

    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let dynamodb_client = DynamoDbClient::new(&aws_config);
    let store = DynamoMetadataStore::new(dynamodb_client, config.metadata_table.clone());

    log::info!("Starting server on {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .max_age(3600),
            )
            .app_data(model.clone())
            .app_data(web::Data::new(store.clone()))
            .configure(configure_routes::<DynamoMetadataStore>)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}
