use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use log::info;

use mnist_backend::config::AppConfig;
use mnist_backend::db::MetadataStore;
use mnist_backend::db::dynamodb::DynamoMetadataStore;
use mnist_backend::model::network::DenseNetwork;
use mnist_backend::model::{INPUT_SIDE, NUM_CLASSES};
use mnist_backend::training;

/// Offline training job: fits a small dense network on synthetic random
/// data, saves the artifact the server loads, and records the run in the
/// metadata store. Not part of the serving path.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = AppConfig::from_env();
    let features = INPUT_SIDE * INPUT_SIDE;

    let (network, accuracy) = {
        let mut rng = rand::rng();
        let (mut train_x, train_y) =
            training::generate_random_data(training::TRAIN_SAMPLES, features, NUM_CLASSES, &mut rng);
        let (mut test_x, test_y) =
            training::generate_random_data(training::TEST_SAMPLES, features, NUM_CLASSES, &mut rng);
        training::standardize(&mut train_x, &mut test_x);

        let mut network = DenseNetwork::new(&[features, 128, 64, NUM_CLASSES], &mut rng);
        training::train(
            &mut network,
            &train_x,
            &train_y,
            training::EPOCHS,
            training::LEARNING_RATE,
        );
        let accuracy = training::evaluate(&network, &test_x, &test_y);
        (network, accuracy)
    };
    info!("Test accuracy: {:.4}", accuracy);

    training::save_artifact(&network, Path::new(&config.model_path))
        .map_err(|e| std::io::Error::other(format!("Saving model failed: {}", e)))?;
    info!("Model saved to {}", config.model_path);

    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let client = DynamoDbClient::new(&aws_config);
    let store = DynamoMetadataStore::new(client, config.metadata_table.clone());
    let metadata = training::metadata_for(accuracy, &config.model_path);
    store
        .insert_metadata(&metadata)
        .await
        .map_err(|e| std::io::Error::other(format!("Saving metadata failed: {}", e)))?;
    info!("Model metadata saved.");

    Ok(())
}
