use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

fn config_view(config: &crate::config::AppConfig) -> serde_json::Value {
    // The API key environment variable name is configuration; the key
    // itself never appears in any response
    json!({
        "server": {
            "host": config.server.host,
            "port": config.server.port
        },
        "realtime": {
            "endpoint": config.realtime.endpoint,
            "model": config.realtime.model,
            "temperature": config.realtime.temperature,
            "input_transcription_model": config.realtime.input_transcription_model,
            "silence_duration_ms": config.realtime.silence_duration_ms
        },
        "interview": {
            "rendezvous_timeout_secs": config.interview.rendezvous_timeout_secs,
            "token_ttl_hours": config.interview.token_ttl_hours
        },
        "performance": {
            "max_concurrent_sessions": config.performance.max_concurrent_sessions
        },
        "audio": {
            "sample_rate": config.audio.sample_rate,
            "channels": config.audio.channels,
            "bit_depth": config.audio.bit_depth
        }
    })
}

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": config_view(&config)
    })))
}

pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config.update_from_json(&json_str)?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": config_view(&current_config)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_get_config_hides_api_key() {
        let state = web::Data::new(AppState::for_tests());
        let response = get_config(state).await.unwrap();
        let body = to_bytes(response.into_body()).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["config"]["server"]["port"], 8080);
        assert!(parsed["config"]["realtime"].get("api_key_env").is_none());
    }

    #[actix_web::test]
    async fn test_update_config_applies_partial_change() {
        let state = web::Data::new(AppState::for_tests());
        let body = web::Json(serde_json::json!({
            "interview": { "rendezvous_timeout_secs": 120 }
        }));
        let response = update_config(state.clone(), body).await.unwrap();
        assert_eq!(response.status(), actix_web::http::StatusCode::OK);
        assert_eq!(state.get_config().interview.rendezvous_timeout_secs, 120);
    }

    #[actix_web::test]
    async fn test_update_config_rejects_invalid() {
        let state = web::Data::new(AppState::for_tests());
        let body = web::Json(serde_json::json!({
            "performance": { "max_concurrent_sessions": 0 }
        }));
        assert!(update_config(state.clone(), body).await.is_err());
        assert_eq!(state.get_config().performance.max_concurrent_sessions, 10);
    }
}
