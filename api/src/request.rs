//! Typed access to path parameters, query parameters and the request body.
//!
//! `RequestContext` is extracted once per handler and answers lookups with
//! best-effort coercion: numeric targets parse the raw text, `bool` compares
//! against `"true"`, strings pass through. A value that cannot be coerced is
//! reported as absent rather than as an error.

use std::collections::HashMap;

use axum::{
    async_trait,
    body::Bytes,
    extract::{
        rejection::{FormRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::header,
    Form,
};
use serde_json::{Map, Value};

use crate::error::{error_code, ApiError};
use crate::response::bad_request;
use crate::validation::parse_number;

/// Conversion from a raw request value into a handler-side type
pub trait Coerce: Sized {
    fn coerce(raw: &Value) -> Option<Self>;
}

impl Coerce for String {
    fn coerce(raw: &Value) -> Option<Self> {
        match raw {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl Coerce for bool {
    fn coerce(raw: &Value) -> Option<Self> {
        match raw {
            Value::String(s) => Some(s == "true"),
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Coerce for f64 {
    fn coerce(raw: &Value) -> Option<Self> {
        match raw {
            Value::String(s) => parse_number(s),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

macro_rules! coerce_integer {
    ($($ty:ty),*) => {
        $(
            impl Coerce for $ty {
                fn coerce(raw: &Value) -> Option<Self> {
                    let exact = match raw {
                        Value::String(s) => s.trim().parse::<$ty>().ok(),
                        Value::Number(n) => n
                            .as_i64()
                            .and_then(|v| <$ty>::try_from(v).ok())
                            .or_else(|| n.as_u64().and_then(|v| <$ty>::try_from(v).ok())),
                        _ => None,
                    };
                    if exact.is_some() {
                        return exact;
                    }

                    // `MAX as f64` rounds up for 64-bit types, so the upper
                    // bound is the exclusive power of two.
                    let bits = <$ty>::BITS as i32 - if <$ty>::MIN == 0 { 0 } else { 1 };
                    let num = f64::coerce(raw)?;
                    if num.fract() != 0.0 || num < <$ty>::MIN as f64 || num >= 2f64.powi(bits) {
                        return None;
                    }
                    Some(num as $ty)
                }
            }
        )*
    };
}

coerce_integer!(i32, i64, u32, u64);

impl Coerce for Value {
    fn coerce(raw: &Value) -> Option<Self> {
        Some(raw.clone())
    }
}

/// Path params, query params and decoded body of one request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Value,
}

impl RequestContext {
    pub fn new(
        params: HashMap<String, String>,
        query: HashMap<String, String>,
        body: Value,
    ) -> Self {
        Self {
            params,
            query,
            body,
        }
    }

    /// Integral id from the route, `None` when missing or non-numeric.
    pub fn param_id(&self, key: &str) -> Option<i64> {
        parse_id(self.params.get(key)?)
    }

    /// Integral id from the query string, `None` when missing or non-numeric.
    pub fn query_id(&self, key: &str) -> Option<i64> {
        parse_id(self.query.get(key)?)
    }

    pub fn param_value<T: Coerce>(&self, key: &str) -> Option<T> {
        let raw = self.params.get(key)?;
        T::coerce(&Value::String(raw.clone()))
    }

    pub fn query_value<T: Coerce>(&self, key: &str) -> Option<T> {
        let raw = self.query.get(key)?;
        T::coerce(&Value::String(raw.clone()))
    }

    pub fn body_value<T: Coerce>(&self, key: &str) -> Option<T> {
        T::coerce(self.body.get(key)?)
    }

    /// Body string that is non-blank after trimming, as the rule engine
    /// counts presence.
    pub fn present_text(&self, key: &str) -> Option<String> {
        self.body_value::<String>(key)
            .filter(|value| !value.trim().is_empty())
    }

    /// Whole decoded body; `null` when the request had none.
    pub fn body(&self) -> &Value {
        &self.body
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() {
        return None;
    }
    i64::coerce(&Value::String(raw.to_string()))
}

#[async_trait]
impl<S> FromRequest<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
        {
            Ok(Path(params)) => params,
            Err(PathRejection::MissingPathParams(_)) => HashMap::new(),
            Err(err) => {
                return Err(bad_request(
                    format!("Invalid path parameters: {}", err.body_text()),
                    Some(error_code::DEFAULT),
                    None,
                ))
            }
        };

        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .map_err(|err| {
                bad_request(
                    format!("Invalid query parameters: {}", err.body_text()),
                    Some(error_code::DEFAULT),
                    None,
                )
            })?;

        let is_form = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let req = Request::from_parts(parts, body);
        let body = if is_form {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(map_form_rejection)?;
            Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect::<Map<String, Value>>(),
            )
        } else {
            let bytes = Bytes::from_request(req, state).await.map_err(|err| {
                bad_request(
                    format!("Failed to read request body: {}", err.body_text()),
                    Some(error_code::DEFAULT),
                    None,
                )
            })?;
            decode_json_body(&bytes)?
        };

        Ok(Self {
            params,
            query,
            body,
        })
    }
}

fn map_form_rejection(err: FormRejection) -> ApiError {
    bad_request(
        format!("Invalid form payload: {}", err.body_text()),
        Some(error_code::DEFAULT),
        None,
    )
}

fn decode_json_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|err| {
        bad_request(
            format!("Invalid JSON payload: {err}"),
            Some(error_code::DEFAULT),
            None,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::{routing::post, Router};
    use serde_json::json;
    use tower::ServiceExt;

    fn ctx(params: &[(&str, &str)], query: &[(&str, &str)], body: Value) -> RequestContext {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>()
        };
        RequestContext::new(to_map(params), to_map(query), body)
    }

    #[test]
    fn test_param_id() {
        assert_eq!(ctx(&[("id", "42")], &[], Value::Null).param_id("id"), Some(42));
        assert_eq!(ctx(&[("id", "abc")], &[], Value::Null).param_id("id"), None);
        assert_eq!(ctx(&[("id", "")], &[], Value::Null).param_id("id"), None);
        assert_eq!(ctx(&[("id", "1.5")], &[], Value::Null).param_id("id"), None);
        assert_eq!(ctx(&[], &[], Value::Null).param_id("id"), None);
        assert_eq!(
            ctx(&[("userId", "9")], &[], Value::Null).param_id("userId"),
            Some(9)
        );
    }

    #[test]
    fn test_query_id() {
        assert_eq!(ctx(&[], &[("id", "7")], Value::Null).query_id("id"), Some(7));
        assert_eq!(ctx(&[], &[("id", "x7")], Value::Null).query_id("id"), None);
    }

    #[test]
    fn test_query_value_coercion() {
        let c = ctx(
            &[],
            &[("active", "true"), ("archived", "yes"), ("page", "2"), ("q", "rust")],
            Value::Null,
        );
        assert_eq!(c.query_value::<bool>("active"), Some(true));
        assert_eq!(c.query_value::<bool>("archived"), Some(false));
        assert_eq!(c.query_value::<i64>("page"), Some(2));
        assert_eq!(c.query_value::<i64>("q"), None);
        assert_eq!(c.query_value::<String>("q"), Some("rust".to_string()));
        assert_eq!(c.query_value::<i64>("missing"), None);
    }

    #[test]
    fn test_body_value_coercion() {
        let c = ctx(
            &[],
            &[],
            json!({"name": "Ada", "age": "36", "admin": true, "count": 3, "tags": ["a"]}),
        );
        assert_eq!(c.body_value::<String>("name"), Some("Ada".to_string()));
        assert_eq!(c.body_value::<i64>("age"), Some(36));
        assert_eq!(c.body_value::<bool>("admin"), Some(true));
        assert_eq!(c.body_value::<String>("count"), Some("3".to_string()));
        assert_eq!(c.body_value::<f64>("tags"), None);
        assert_eq!(c.body_value::<Value>("tags"), Some(json!(["a"])));
    }

    #[test]
    fn test_integer_bounds_are_exact() {
        let c = ctx(
            &[],
            &[
                ("max", "9223372036854775807"),
                ("over", "9223372036854775808"),
                ("big", "2147483648"),
            ],
            json!({"float_over": 9.223372036854775808e18, "neg": -3}),
        );
        assert_eq!(c.query_value::<i64>("max"), Some(i64::MAX));
        assert_eq!(c.query_value::<i64>("over"), None);
        assert_eq!(c.query_value::<u64>("over"), Some(9_223_372_036_854_775_808));
        assert_eq!(c.query_value::<i32>("big"), None);
        assert_eq!(c.query_value::<u32>("big"), Some(2_147_483_648));
        assert_eq!(c.body_value::<i64>("float_over"), None);
        assert_eq!(c.body_value::<u32>("neg"), None);
        assert_eq!(c.body_value::<i32>("neg"), Some(-3));
    }

    #[test]
    fn test_present_text_skips_blank_values() {
        let c = ctx(&[], &[], json!({"name": "Ada", "blank": "   ", "count": 3}));
        assert_eq!(c.present_text("name"), Some("Ada".to_string()));
        assert_eq!(c.present_text("blank"), None);
        assert_eq!(c.present_text("count"), Some("3".to_string()));
        assert_eq!(c.present_text("missing"), None);
    }

    #[test]
    fn test_param_value() {
        let c = ctx(&[("slug", "hello"), ("n", "0x1F")], &[], Value::Null);
        assert_eq!(c.param_value::<String>("slug"), Some("hello".to_string()));
        assert_eq!(c.param_value::<u32>("n"), Some(31));
    }

    async fn echo(ctx: RequestContext) -> axum::Json<Value> {
        axum::Json(json!({
            "id": ctx.param_id("id"),
            "flag": ctx.query_value::<bool>("flag"),
            "body": ctx.body().clone(),
        }))
    }

    async fn send(req: axum::http::Request<Body>) -> (u16, Value) {
        let app = Router::new().route("/items/:id", post(echo));
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status().as_u16();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_extracts_params_query_and_json_body() {
        let req = axum::http::Request::post("/items/5?flag=true")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"x"}"#))
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"id": 5, "flag": true, "body": {"name": "x"}}));
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let req = axum::http::Request::post("/items/abc")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"id": null, "flag": null, "body": null}));
    }

    #[tokio::test]
    async fn test_form_body_becomes_object() {
        let req = axum::http::Request::post("/items/1")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Widget&qty=3"))
            .unwrap();
        let (_, body) = send(req).await;
        assert_eq!(body["body"], json!({"name": "Widget", "qty": "3"}));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let req = axum::http::Request::post("/items/1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, 400);
        assert_eq!(body["type"], "bad_request");
        assert_eq!(body["error"]["code"], 40000);
    }
}
