//! HTTP handler functions for the marketplace API.

use actix_web::{HttpResponse, web};
use carbonflow_ai::augment::analyze_matches as run_analysis;
use carbonflow_database::{new_consumer_id, new_producer_id};
use carbonflow_marketplace_models::{NewConsumer, NewProducer};
use carbonflow_matching::{compute_impact, find_matches};
use carbonflow_server_models::{
    AnalyzeMatchesRequest, ApiHealth, ConsumerCreated, GeocodeRequest, ImpactRequest,
    MatchesQueryParams, ProducerCreated,
};

use crate::AppState;
use crate::error::ApiError;

/// `GET /`
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("CarbonFlow API is running!")
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        narrator_available: state.narrator.is_some(),
    })
}

/// `GET /api/producers`
pub async fn list_producers(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let producers = state
        .store
        .list_producers()
        .await
        .map_err(|e| ApiError::internal("Failed to list producers", e))?;

    Ok(HttpResponse::Ok().json(producers))
}

/// `POST /api/producers`
pub async fn create_producer(
    state: web::Data<AppState>,
    body: web::Json<NewProducer>,
) -> Result<HttpResponse, ApiError> {
    let new = body.into_inner();
    new.validate()?;

    let producer = new.with_id(new_producer_id());
    let inserted = state
        .store
        .insert_producer(&producer)
        .await
        .map_err(|e| ApiError::internal("Failed to save producer", e))?;
    if !inserted {
        return Err(ApiError::internal(
            "Failed to save producer",
            format!("id collision on {}", producer.id),
        ));
    }

    log::info!("Registered producer {} ({})", producer.name, producer.id);
    Ok(HttpResponse::Created().json(ProducerCreated {
        message: "Producer added successfully".to_string(),
        producer,
    }))
}

/// `GET /api/consumers`
pub async fn list_consumers(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let consumers = state
        .store
        .list_consumers()
        .await
        .map_err(|e| ApiError::internal("Failed to list consumers", e))?;

    Ok(HttpResponse::Ok().json(consumers))
}

/// `POST /api/consumers`
pub async fn create_consumer(
    state: web::Data<AppState>,
    body: web::Json<NewConsumer>,
) -> Result<HttpResponse, ApiError> {
    let new = body.into_inner();
    new.validate()?;

    let consumer = new.with_id(new_consumer_id());
    let inserted = state
        .store
        .insert_consumer(&consumer)
        .await
        .map_err(|e| ApiError::internal("Failed to save consumer", e))?;
    if !inserted {
        return Err(ApiError::internal(
            "Failed to save consumer",
            format!("id collision on {}", consumer.id),
        ));
    }

    log::info!("Registered consumer {} ({})", consumer.name, consumer.id);
    Ok(HttpResponse::Created().json(ConsumerCreated {
        message: "Consumer added successfully".to_string(),
        consumer,
    }))
}

/// `GET /api/matches?producer_id=`
///
/// Feasible consumers for a stored producer, nearest first.
pub async fn matches(
    state: web::Data<AppState>,
    params: web::Query<MatchesQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let Some(producer_id) = params.producer_id.as_deref().filter(|id| !id.is_empty()) else {
        return Err(ApiError::BadRequest(
            "producer_id parameter is required".to_string(),
        ));
    };

    let producer = state
        .store
        .get_producer(producer_id)
        .await
        .map_err(|e| ApiError::internal("Failed to load producer", e))?
        .ok_or_else(|| ApiError::NotFound("Producer not found".to_string()))?;

    let consumers = state
        .store
        .list_consumers()
        .await
        .map_err(|e| ApiError::internal("Failed to list consumers", e))?;

    let matches = find_matches(&producer, &consumers)
        .map_err(|e| ApiError::internal("Failed to compute matches", e))?;

    Ok(HttpResponse::Ok().json(matches))
}

/// `POST /api/analyze-matches`
///
/// Ranks the submitted matches and attaches an analysis to each. Narrator
/// problems never fail the request.
pub async fn analyze_matches(
    state: web::Data<AppState>,
    body: web::Json<AnalyzeMatchesRequest>,
) -> Result<HttpResponse, ApiError> {
    let AnalyzeMatchesRequest {
        producer: Some(producer),
        matches: Some(matches),
    } = body.into_inner()
    else {
        return Err(missing_analysis_input());
    };
    if matches.is_empty() {
        return Err(missing_analysis_input());
    }

    producer.validate()?;
    for m in &matches {
        m.validate()?;
    }

    let report = run_analysis(&producer, matches, state.narrator.as_deref(), state.augment).await;

    Ok(HttpResponse::Ok().json(report))
}

fn missing_analysis_input() -> ApiError {
    ApiError::BadRequest("Producer and matches data are required".to_string())
}

/// `POST /api/impact-model`
pub async fn impact_model(body: web::Json<ImpactRequest>) -> Result<HttpResponse, ApiError> {
    let ImpactRequest {
        producer: Some(producer),
        consumer: Some(consumer),
    } = body.into_inner()
    else {
        return Err(ApiError::BadRequest(
            "Producer and consumer data are required".to_string(),
        ));
    };

    let report =
        compute_impact(&producer, &consumer).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(HttpResponse::Ok().json(report))
}

/// `POST /api/geocode`
pub async fn geocode(
    state: web::Data<AppState>,
    body: web::Json<GeocodeRequest>,
) -> Result<HttpResponse, ApiError> {
    let Some(address) = body.address.as_deref().map(str::trim).filter(|a| !a.is_empty()) else {
        return Err(ApiError::BadRequest("Address is required".to_string()));
    };

    match state.geocoder.geocode(address).await {
        Ok(Some(location)) => Ok(HttpResponse::Ok().json(location)),
        Ok(None) => Err(ApiError::NotFound(
            "Could not find coordinates for the address.".to_string(),
        )),
        Err(e) => {
            log::error!("Geocoding error: {e}");
            Err(ApiError::Upstream("Geocoding service failed.".to_string()))
        }
    }
}
