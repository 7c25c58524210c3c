use crate::application::auth_service::AuthService;
use crate::domain::repository::AccountRepository;
use crate::presentation::auth::TOKEN_COOKIE;
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{AUTHORIZATION, HeaderName, HeaderValue},
};
use std::{
    future::{Ready, ready},
    pin::Pin,
    rc::Rc,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};
use tracing::{debug, info};
use uuid::Uuid;

type LocalBoxFuture<T> = Pin<Box<dyn std::future::Future<Output = T>>>;

/// Resolves the caller's identity from the `token` cookie or the
/// `Authorization` header and stores it in the request extensions.
///
/// Requests without valid credentials pass through untouched; handlers that
/// take an `AuthenticatedUser` argument answer them with 401.
pub struct JwtAuthMiddleware<R: AccountRepository> {
    auth_service: Arc<AuthService<R>>,
}

impl<R: AccountRepository> JwtAuthMiddleware<R> {
    pub fn new(auth_service: Arc<AuthService<R>>) -> Self {
        Self { auth_service }
    }
}

impl<S, B, R> Transform<S, ServiceRequest> for JwtAuthMiddleware<R>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
    R: AccountRepository + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddlewareService<S, R>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            auth_service: self.auth_service.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S, R: AccountRepository> {
    service: Rc<S>,
    auth_service: Arc<AuthService<R>>,
}

impl<S, B, R> Service<ServiceRequest> for JwtAuthMiddlewareService<S, R>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
    R: AccountRepository + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let auth_service = self.auth_service.clone();
        let token = extract_token(&req);

        Box::pin(async move {
            if let Some(token) = token {
                match auth_service.authenticate(&token).await {
                    Ok(user) => {
                        debug!(account_id = user.account_id, "Request authenticated");
                        req.extensions_mut().insert(user);
                    }
                    Err(e) => debug!(error = %e, path = %req.path(), "Credentials rejected"),
                }
            }
            service.call(req).await
        })
    }
}

/// The cookie wins over the header. The header may carry the bare token or
/// `Bearer <token>`.
fn extract_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    let raw = req.headers().get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match raw.strip_prefix("Bearer ") {
        Some(rest) => rest.trim(),
        None if raw == "Bearer" => "",
        None => raw,
    };
    (!token.is_empty()).then(|| token.to_string())
}

/// Tags every request with a uuid (`x-request-id`), measures it
/// (`x-response-time`) and logs one line per request.
pub struct RequestLogging;

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestLoggingService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let method = req.method().clone();
        let path = req.path().to_string();

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            let duration_ms = start.elapsed().as_millis();

            let headers = res.headers_mut();
            headers.insert(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_str(&request_id)
                    .unwrap_or_else(|_| HeaderValue::from_static("unknown")),
            );
            headers.insert(
                HeaderName::from_static("x-response-time"),
                HeaderValue::from_str(&format!("{}ms", duration_ms))
                    .unwrap_or_else(|_| HeaderValue::from_static("0ms")),
            );

            info!(
                method = %method,
                path = %path,
                status = res.status().as_u16(),
                duration_ms = duration_ms,
                request_id = %request_id,
                "Request processed"
            );
            Ok(res)
        })
    }
}
