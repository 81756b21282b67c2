use actix_web::{HttpResponse, web};
use log::{error, info};
use rand::Rng;
use serde_json::json;

use crate::db::{MetadataStore, ScratchRecord, StoreError};
use crate::error::ApiError;
use crate::inference;
use crate::inference::PredictResponse;
use crate::model::ModelHolder;

pub fn configure_routes<S: MetadataStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/get_model_metadata").route(web::get().to(get_model_metadata::<S>)))
        .service(
            web::resource("/insert_random_data").route(web::post().to(insert_random_data::<S>)),
        )
        .service(
            web::resource("/update_random_data").route(web::post().to(update_random_data::<S>)),
        )
        .service(
            web::resource("/delete_random_data").route(web::post().to(delete_random_data::<S>)),
        );
}

fn store_failure(endpoint: &str, e: StoreError) -> ApiError {
    error!("{} store failure: {}", endpoint, e);
    ApiError::Store(e)
}

async fn predict(
    model: web::Data<ModelHolder>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let predicted_class = inference::run(model.get_ref(), &body).map_err(|e| {
        error!("/predict failed: {}", e);
        e
    })?;
    info!("Predicted class: {}", predicted_class);
    Ok(HttpResponse::Ok().json(PredictResponse { predicted_class }))
}

async fn get_model_metadata<S: MetadataStore>(
    store: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let latest = store
        .get_latest()
        .await
        .map_err(|e| store_failure("/get_model_metadata", e))?;
    match latest {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Ok(HttpResponse::Ok().json(json!({ "message": "No metadata found." }))),
    }
}

async fn insert_random_data<S: MetadataStore>(
    store: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let records: Vec<ScratchRecord> = {
        let mut rng = rand::rng();
        (0..10).map(|_| ScratchRecord::random(&mut rng)).collect()
    };
    for record in &records {
        store
            .insert_one(record)
            .await
            .map_err(|e| store_failure("/insert_random_data", e))?;
    }
    info!("Random data inserted.");
    Ok(HttpResponse::Ok().json(json!({ "message": "Random data inserted." })))
}

async fn update_random_data<S: MetadataStore>(
    store: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let found = store
        .find_one()
        .await
        .map_err(|e| store_failure("/update_random_data", e))?;
    match found {
        Some(record) => {
            let value = rand::rng().random_range(1.0..100.0);
            store
                .update_one(&record.id, value)
                .await
                .map_err(|e| store_failure("/update_random_data", e))?;
            info!("Updated item: {}", record.id);
            Ok(HttpResponse::Ok()
                .json(json!({ "message": format!("Updated item: {}", record.id) })))
        }
        None => Ok(HttpResponse::Ok().json(json!({ "message": "No records to update." }))),
    }
}

async fn delete_random_data<S: MetadataStore>(
    store: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let found = store
        .find_one()
        .await
        .map_err(|e| store_failure("/delete_random_data", e))?;
    match found {
        Some(record) => {
            store
                .delete_one(&record.id)
                .await
                .map_err(|e| store_failure("/delete_random_data", e))?;
            info!("Deleted item: {}", record.id);
            Ok(HttpResponse::Ok()
                .json(json!({ "message": format!("Deleted item: {}", record.id) })))
        }
        None => Ok(HttpResponse::Ok().json(json!({ "message": "No records to delete." }))),
    }
}
