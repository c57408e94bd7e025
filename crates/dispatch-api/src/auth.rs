//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based access control.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{actor_id}:{secret}   role is admin, partner, customer or system
//! Bearer {secret}                     treated as admin
//! ```
//!
//! For partners the `actor_id` is the numeric partner id, which is what
//! ties a caller to the requests assigned to them.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl
//! and pass [`CallerIdentity::actor`] to the coordinator, which records it
//! on the timeline.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::typed_header::TypedHeaderRejection;
use axum_extra::TypedHeader;
use subtle::ConstantTimeEq;

use dispatch_core::{Actor, ActorRole, PartnerId};

use crate::error::AppError;

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: ActorRole,
    /// Actor id from the token; `None` for bare-secret and unauthenticated
    /// admin callers.
    pub actor_id: Option<String>,
}

impl CallerIdentity {
    /// The identity used when authentication is disabled.
    pub fn anonymous_admin() -> Self {
        Self {
            role: ActorRole::Admin,
            actor_id: None,
        }
    }

    /// The actor recorded on timeline events.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.actor_id.clone(),
            role: Some(self.role),
        }
    }

    /// The partner this caller acts for, if they are a partner with a
    /// numeric actor id.
    pub fn partner_id(&self) -> Option<PartnerId> {
        if self.role != ActorRole::Partner {
            return None;
        }
        self.actor_id
            .as_deref()
            .and_then(|id| id.parse::<i64>().ok())
            .map(PartnerId::new)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller holds one of `allowed`.
pub fn require_role(caller: &CallerIdentity, allowed: &[ActorRole]) -> Result<(), AppError> {
    if allowed.contains(&caller.role) {
        return Ok(());
    }
    let names: Vec<&str> = allowed.iter().map(ActorRole::as_str).collect();
    Err(AppError::Forbidden(format!(
        "role '{}' may not perform this operation (requires {})",
        caller.role,
        names.join(" or ")
    )))
}

/// The partner a reject or status update acts for.
///
/// Admins act for no partner (`None`). Partners act for their own id, which
/// the coordinator checks against the assignment it commits over. Other
/// roles are refused.
pub fn acting_partner(caller: &CallerIdentity) -> Result<Option<PartnerId>, AppError> {
    match caller.role {
        ActorRole::Admin => Ok(None),
        ActorRole::Partner => caller.partner_id().map(Some).ok_or_else(|| {
            AppError::Forbidden("partner token does not carry a numeric partner id".into())
        }),
        other => Err(AppError::Forbidden(format!(
            "role '{other}' may not change request status"
        ))),
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token of the form `{role}:{actor_id}:{secret}` or `{secret}`.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if constant_time_token_eq(secret, expected_secret) {
                Ok(CallerIdentity::anonymous_admin())
            } else {
                Err("invalid bearer token".into())
            }
        }
        [role, actor_id, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            let role =
                ActorRole::from_name(role).ok_or_else(|| format!("unknown role: {role}"))?;
            let actor_id = (!actor_id.is_empty()).then(|| actor_id.to_string());
            if role == ActorRole::Partner && actor_id.is_none() {
                return Err("partner tokens must carry the partner id".into());
            }
            Ok(CallerIdentity { role, actor_id })
        }
        _ => Err("invalid token format: expected {role}:{actor_id}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the bearer token and inject the [`CallerIdentity`].
///
/// When `AuthConfig.token` is `None`, every request proceeds as an
/// anonymous admin.
pub async fn auth_middleware(
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let Some(expected) = expected else {
        request
            .extensions_mut()
            .insert(CallerIdentity::anonymous_admin());
        return next.run(request).await;
    };

    let provided = match bearer {
        Ok(TypedHeader(Authorization(bearer))) => bearer,
        Err(rejection) if rejection.is_missing() => {
            tracing::warn!("authentication failed: missing authorization header");
            return AppError::Unauthorized("missing authorization header".into()).into_response();
        }
        Err(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            return AppError::Unauthorized("authorization header must use Bearer scheme".into())
                .into_response();
        }
    };

    match parse_bearer_token(provided.token(), &expected) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(msg) => {
            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
            AppError::Unauthorized(msg).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(token: Option<&str>) -> Router {
        let auth_config = AuthConfig {
            token: token.map(str::to_string),
        };
        Router::new()
            .route(
                "/whoami",
                get(|caller: CallerIdentity| async move {
                    format!("{}:{}", caller.role, caller.actor_id.unwrap_or_default())
                }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(auth_config))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn parses_role_tokens() {
        let caller = parse_bearer_token("partner:7:s3cret", "s3cret").unwrap();
        assert_eq!(caller.role, ActorRole::Partner);
        assert_eq!(caller.partner_id(), Some(PartnerId::new(7)));
        assert_eq!(caller.actor().id.as_deref(), Some("7"));

        let admin = parse_bearer_token("s3cret", "s3cret").unwrap();
        assert_eq!(admin, CallerIdentity::anonymous_admin());

        let customer = parse_bearer_token("customer:c-9:s3cret", "s3cret").unwrap();
        assert_eq!(customer.partner_id(), None);
    }

    #[test]
    fn rejects_bad_tokens() {
        assert!(parse_bearer_token("wrong", "s3cret").is_err());
        assert!(parse_bearer_token("admin:a:wrong", "s3cret").is_err());
        assert!(parse_bearer_token("root:a:s3cret", "s3cret")
            .unwrap_err()
            .contains("unknown role"));
        assert!(parse_bearer_token("partner::s3cret", "s3cret").is_err());
        assert!(parse_bearer_token("a:b", "s3cret").is_err());
    }

    #[test]
    fn role_gates() {
        let customer = CallerIdentity {
            role: ActorRole::Customer,
            actor_id: Some("c1".into()),
        };
        assert!(require_role(&customer, &[ActorRole::Customer, ActorRole::Admin]).is_ok());
        assert!(matches!(
            require_role(&customer, &[ActorRole::Admin]),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn acting_partner_by_role() {
        let caller = |role, id: &str| CallerIdentity {
            role,
            actor_id: Some(id.into()),
        };
        assert_eq!(acting_partner(&caller(ActorRole::Admin, "ops")).unwrap(), None);
        assert_eq!(
            acting_partner(&caller(ActorRole::Partner, "7")).unwrap(),
            Some(PartnerId::new(7))
        );
        assert!(matches!(
            acting_partner(&caller(ActorRole::Partner, "acme")),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            acting_partner(&caller(ActorRole::Customer, "c1")),
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn auth_disabled_is_admin() {
        let (status, body) = call(test_app(None), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin:");
    }

    #[tokio::test]
    async fn valid_token_sets_identity() {
        let (status, body) = call(test_app(Some("s3cret")), Some("Bearer partner:4:s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "partner:4");
    }

    #[tokio::test]
    async fn missing_and_invalid_tokens_are_unauthorized() {
        let (status, body) = call(test_app(Some("s3cret")), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("missing"));

        let (status, _) = call(test_app(Some("s3cret")), Some("Bearer nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(test_app(Some("s3cret")), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Bearer"));
    }
}
