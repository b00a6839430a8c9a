//! Extractors that answer with an API [`Error`] instead of axum's plain text rejections

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::extract::Json;
use axum::extract::Path;
use axum::extract::Request;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::PathRejection;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use super::Error;

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                Error::bad_request("Data error").with_description(err.body_text())
            }
            JsonRejection::JsonSyntaxError(err) => {
                // serde's message without axum's prefix, when there is one
                let description = std::error::Error::source(&err)
                    .map_or_else(|| err.body_text(), ToString::to_string);

                Error::bad_request("JSON syntax error").with_description(description)
            }
            JsonRejection::MissingJsonContentType(_) => {
                Error::bad_request("Missing `application/json` content type")
            }
            JsonRejection::BytesRejection(err) => {
                Error::bad_request("Invalid characters in JSON").with_description(err)
            }
            other => Error::bad_request("Unknown JSON error").with_description(other),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(err) => {
                Error::bad_request("Invalid path parameter").with_description(err.body_text())
            }
            PathRejection::MissingPathParams(err) => {
                Error::bad_request("Missing path parameter").with_description(err)
            }
            other => Error::bad_request("Unknown path error").with_description(other),
        }
    }
}

/// JSON body of a request
pub struct Form<F>(pub F);

impl<S, F> FromRequest<S> for Form<F>
where
    S: Send + Sync,
    F: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<F>::from_request(req, state)
            .await
            .map(|Json(form)| Form(form))
            .map_err(Error::from)
    }
}

/// Typed path parameters
pub struct PathParameters<P>(pub P);

impl<S, P> FromRequestParts<S> for PathParameters<P>
where
    S: Send + Sync,
    P: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<P>::from_request_parts(parts, state)
            .await
            .map(|Path(parameters)| PathParameters(parameters))
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::http::header;
    use axum::response::IntoResponse;
    use serde_json::Value;

    use super::*;

    fn json_request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = Request::builder().method("POST").uri("/api/meetings");

        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        builder.body(Body::from(body)).unwrap()
    }

    async fn form_error(request: Request) -> Error {
        match Form::<Value>::from_request(request, &()).await {
            Ok(_) => panic!("the request should have been rejected"),
            Err(err) => err,
        }
    }

    #[tokio::test]
    async fn test_form() {
        let request = json_request(Some("application/json"), r#"{ "agenda": "Demo" }"#);

        let Ok(Form(form)) = Form::<Value>::from_request(request, &()).await else {
            panic!("the request should have been accepted");
        };

        assert_eq!("Demo", form["agenda"]);
    }

    #[tokio::test]
    async fn test_form_without_content_type() {
        let error = form_error(json_request(None, r#"{ "agenda": "Demo" }"#)).await;

        assert_eq!("Missing `application/json` content type", error.to_string());
        assert_eq!(StatusCode::BAD_REQUEST, error.into_response().status());
    }

    #[tokio::test]
    async fn test_form_with_broken_json() {
        let error = form_error(json_request(Some("application/json"), r#"{ "agenda": "#)).await;

        assert_eq!("JSON syntax error", error.to_string());
        assert_eq!(StatusCode::BAD_REQUEST, error.into_response().status());
    }
}
