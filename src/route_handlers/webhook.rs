use axum::{
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{secret, SharedAppState};

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    message: String,
}

/// Payment-notification payload. Every field is optional so that auth can be
/// checked before the payload itself is validated.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    payer_tax_number: Option<String>,
    #[serde(default)]
    value_in_cents: Option<f64>,
    #[serde(default)]
    secret: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct WebhookQuery {
    secret: Option<String>,
}

/// Every failure is terminal and maps onto one localized JSON response.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("método não permitido")]
    MethodNotAllowed,
    #[error("secret inválido")]
    AccessDenied,
    #[error("dados incompletos")]
    IncompleteData,
    #[error("usuário não encontrado")]
    UserNotFound,
    #[error("falha ao registrar saldo")]
    BalanceWriteFailed,
    #[error("erro interno")]
    Internal,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "message": "Método não permitido" }),
            ),
            Self::AccessDenied => (
                StatusCode::FORBIDDEN,
                json!({ "error": "Acesso negado. Secret inválido." }),
            ),
            Self::IncompleteData => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Dados incompletos" }),
            ),
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                json!({ "message": "Usuário não encontrado" }),
            ),
            Self::BalanceWriteFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Erro ao registrar saldo" }),
            ),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Erro interno" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for WebhookError {
    fn from(err: anyhow::Error) -> Self {
        error!("Erro interno no webhook: {:?}", err);
        Self::Internal
    }
}

/// Linear validate-then-write sequence: method check, secret check, payload
/// validation, user lookup, balance insert. Registered with `any` so that
/// non-POST calls still get the localized 405 body.
pub async fn handler(
    State(state): State<SharedAppState>,
    method: Method,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    payload: Option<Json<WebhookRequest>>,
) -> Result<impl IntoResponse, WebhookError> {
    if method != Method::POST {
        return Err(WebhookError::MethodNotAllowed);
    }

    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    debug!("Webhook request: {:?}", payload);

    let received = secret::extract_secret(
        &headers,
        query.secret.as_deref(),
        payload.secret.as_deref(),
        &state.webhook_secret,
    );
    if received.as_deref() != Some(state.webhook_secret.as_str()) {
        return Err(WebhookError::AccessDenied);
    }

    let payer_tax_number = payload.payer_tax_number.as_deref().filter(|s| !s.is_empty());
    let value_in_cents = payload.value_in_cents.filter(|v| *v != 0.0);
    let (Some(payer_tax_number), Some(value_in_cents)) = (payer_tax_number, value_in_cents) else {
        return Err(WebhookError::IncompleteData);
    };

    let cpf: String = payer_tax_number
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    let usuario_id = match state.store.find_user_by_cpf(&cpf).await {
        Ok(Some(id)) => id,
        Ok(None) => return Err(WebhookError::UserNotFound),
        Err(err) => {
            debug!("User lookup failed: {:?}", err);
            return Err(WebhookError::UserNotFound);
        }
    };

    let valor = value_in_cents / 100.0;

    if let Err(err) = state.store.insert_deposit(usuario_id, valor).await {
        error!("Erro ao inserir na tabela saldo: {:?}", err);
        return Err(WebhookError::BalanceWriteFailed);
    }

    info!(
        "Depósito de {} registrado para o usuário {}",
        valor, usuario_id
    );

    Ok((
        StatusCode::OK,
        Json(WebhookResponse {
            message: "Depósito registrado com sucesso".to_string(),
        }),
    ))
}
