use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::classifier::ModelState;
use crate::error::ApiError;
use crate::models::{HealthResponse, PredictionResponse};

const FILE_FIELD: &str = "file";
const SYMPTOMS_FIELD: &str = "symptoms";
const MAX_SYMPTOMS_BYTES: usize = 16 * 1024;

pub struct AppState {
    pub model: ModelState,
    pub max_upload_bytes: usize,
}

struct Upload {
    image: Option<Vec<u8>>,
    symptoms: Option<String>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/predict").route(web::post().to(predict)))
        .service(web::resource("/api/health").route(web::get().to(health)));
}

pub async fn predict(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    // Checked before the body is read so nothing is decoded without a model
    let classifier = match &state.model {
        ModelState::Loaded(classifier) => classifier.clone(),
        ModelState::Unavailable { reason } => {
            return Err(ApiError::ModelUnavailable(reason.clone()));
        }
    };

    let upload = read_upload(payload, state.max_upload_bytes).await?;
    let image = upload.image.ok_or(ApiError::MissingFile)?;

    let request_id = Uuid::new_v4();
    log::info!(
        "[{}] classifying {} byte upload, symptoms: {}",
        request_id,
        image.len(),
        upload.symptoms.as_deref().unwrap_or("not specified")
    );

    let ranking = web::block(move || classifier.classify(&image))
        .await
        .map_err(|e| {
            log::error!("[{}] prediction task did not complete: {}", request_id, e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(|e| {
            log::error!("[{}] prediction failed: {}", request_id, e);
            ApiError::from(e)
        })?;

    let response = PredictionResponse::from_ranking(ranking)
        .ok_or_else(|| ApiError::Internal("model returned an empty ranking".to_string()))?;
    log::info!(
        "[{}] top prediction {} ({:.4})",
        request_id,
        response.condition,
        response.probability_raw
    );

    Ok(HttpResponse::Ok().json(response))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let body = match &state.model {
        ModelState::Loaded(classifier) => HealthResponse {
            status: "ok".to_string(),
            model_loaded: true,
            classes: classifier.num_classes(),
            message: "Model loaded.".to_string(),
        },
        ModelState::Unavailable { reason } => HealthResponse {
            status: "unavailable".to_string(),
            model_loaded: false,
            classes: 0,
            message: reason.clone(),
        },
    };
    HttpResponse::Ok().json(body)
}

async fn read_upload(mut payload: Multipart, max_upload_bytes: usize) -> Result<Upload, ApiError> {
    let mut upload = Upload {
        image: None,
        symptoms: None,
    };

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        // The first occurrence of a field wins; repeats are drained like unknown fields
        let limit = match name.as_str() {
            FILE_FIELD if upload.image.is_none() => max_upload_bytes,
            SYMPTOMS_FIELD if upload.symptoms.is_none() => MAX_SYMPTOMS_BYTES,
            _ => {
                while let Some(chunk) = field.next().await {
                    chunk?;
                }
                continue;
            }
        };

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > limit {
                return Err(ApiError::PayloadTooLarge(limit));
            }
            data.extend_from_slice(&chunk);
        }

        if name == FILE_FIELD {
            upload.image = Some(data);
        } else {
            upload.symptoms = Some(String::from_utf8_lossy(&data).into_owned());
        }
    }

    Ok(upload)
}
