use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tracing::warn;

const REALM: &str = "Basic realm=\"Staff Login Required\"";

/// Shared staff password. The Basic-auth username is ignored.
#[derive(Clone)]
pub struct StaffAuth {
    password: Arc<str>,
}

impl StaffAuth {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Arc::from(password.into()),
        }
    }

    fn accepts(&self, headers: &HeaderMap) -> bool {
        basic_password(headers).is_some_and(|password| password == *self.password)
    }
}

fn basic_password(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ").or_else(|| value.strip_prefix("basic "))?;
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (_, password) = decoded.split_once(':')?;
    Some(password.to_string())
}

pub async fn require_staff(State(auth): State<StaffAuth>, req: Request, next: Next) -> Response {
    if auth.accepts(req.headers()) {
        return next.run(req).await;
    }

    warn!("Rejected staff request to {}", req.uri().path());
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM))],
        "Staff login required",
    )
        .into_response()
}
