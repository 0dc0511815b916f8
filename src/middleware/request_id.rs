use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation id of the current request, as stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Outermost layer: every request gets a fresh id, visible to the handlers,
/// to the access log and on the response. An id sent by the client is
/// overwritten.
pub async fn assign_request_id(mut req: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    let value = HeaderValue::from_str(&id).ok();

    if let Some(v) = &value {
        req.headers_mut().insert(REQUEST_ID_HEADER.clone(), v.clone());
    }
    req.extensions_mut().insert(RequestId(id));

    let mut res = next.run(req).await;
    if let Some(v) = value {
        res.headers_mut().insert(REQUEST_ID_HEADER.clone(), v);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn handler_sees_the_id_sent_back() {
        let app = Router::new()
            .route(
                "/",
                get(|Extension(id): Extension<RequestId>| async move { id.0 }),
            )
            .layer(middleware::from_fn(assign_request_id));

        let req = Request::builder()
            .uri("/")
            .header("x-request-id", "client-chosen")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        let header = res.headers()["x-request-id"].to_str().unwrap().to_string();
        assert_ne!(header, "client-chosen");
        assert!(Uuid::parse_str(&header).is_ok());

        use http_body_util::BodyExt;
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, header.as_bytes());
    }
}
