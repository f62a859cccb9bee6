//! Xiaoe open API client.
//!
//! Every endpoint is a POST of a flat JSON body carrying `access_token`, and
//! every response is a `{code, msg, data}` envelope. The access token comes
//! from `GET {api_base}/token` and is shared through a [`TokenCache`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use url::Url;

use super::token::{AccessToken, TokenCache};
use super::{Cursor, Page, PageRequest, SourceClient, SourceError, TransientKind};
use crate::config::{ConfigError, SourceConfig};
use crate::records::EntityKind;
use crate::sync::window::SyncWindow;

const TOKEN_PATH: &str = "token";
const ORDER_LIST: &str = "xe.ecommerce.order.list/1.0.0";
const ORDER_DETAIL: &str = "xe.ecommerce.order.detail/1.0.0";
const AFTERSALE_LIST: &str = "xe.ecommerce.after_sale.list/1.0.0";
const AFTERSALE_DETAIL: &str = "xe.aftersale.detail/1.0.0";
const USER_LIST: &str = "xe.user.batch.get/2.0.0";
const PRODUCT_LIST: &str = "xe.goods.list.get/4.0.0";

/// Order search by last update time.
const ORDER_SEARCH_BY_UPDATE: u8 = 3;
const DEFAULT_TOKEN_TTL_SECS: u64 = 7200;
const SOURCE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Credential rejected outright while issuing a token.
const CREDENTIAL_REJECTED: std::ops::RangeInclusive<i64> = 40001..=40003;
/// Token missing, invalid or expired on a business call.
const TOKEN_INVALID: std::ops::RangeInclusive<i64> = 40101..=40107;

#[derive(Debug, Deserialize)]
struct Envelope {
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub struct XiaoeClient {
    http: reqwest::Client,
    base: Url,
    app_id: String,
    client_id: String,
    secret_key: String,
    token_timeout: Duration,
    offset: FixedOffset,
    tokens: TokenCache,
}

impl XiaoeClient {
    pub fn new(config: &SourceConfig) -> Result<Self, ConfigError> {
        let mut base = Url::parse(&config.api_base).map_err(|source| ConfigError::InvalidApiBase {
            value: config.api_base.clone(),
            source,
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("storesync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            http,
            base,
            app_id: config.app_id.clone(),
            client_id: config.client_id.clone(),
            secret_key: config.secret_key.clone(),
            token_timeout: Duration::from_secs(config.token_timeout_seconds),
            offset: config.utc_offset(),
            tokens: TokenCache::new(Duration::from_secs(config.token_refresh_lead_seconds)),
        })
    }

    fn endpoint(&self, path: &str, operation: &str) -> Result<Url, SourceError> {
        self.base
            .join(path)
            .map_err(|err| SourceError::malformed(operation, format!("bad endpoint {path}: {err}")))
    }

    async fn request_token(&self) -> Result<AccessToken, SourceError> {
        const OP: &str = "token";
        let url = self.endpoint(TOKEN_PATH, OP)?;
        let payload = json!({
            "app_id": self.app_id,
            "client_id": self.client_id,
            "secret_key": self.secret_key,
            "grant_type": "client_credential",
        });

        debug!(url = %url, "requesting access token");
        let response = self
            .http
            .get(url)
            .timeout(self.token_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|err| transport_error(OP, err))?;

        let envelope = read_envelope(response, OP).await?;
        match envelope.code.unwrap_or(-1) {
            0 => {
                let data: TokenData = serde_json::from_value(envelope.data)
                    .map_err(|err| SourceError::malformed(OP, err.to_string()))?;
                let ttl = data.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
                debug!(expires_in = ttl, "access token issued");
                Ok(AccessToken::new(data.access_token, Duration::from_secs(ttl)))
            }
            code if CREDENTIAL_REJECTED.contains(&code) => Err(SourceError::authentication(
                envelope.msg.unwrap_or_else(|| "credential rejected".to_string()),
                Some(code),
            )),
            code => Err(SourceError::Api {
                code,
                operation: OP.to_string(),
                message: envelope.msg.unwrap_or_default(),
            }),
        }
    }

    /// POST `body` to `path` and return the envelope's `data`.
    async fn call(&self, path: &str, mut body: Map<String, Value>) -> Result<Value, SourceError> {
        let token = self.tokens.get_or_refresh(|| self.request_token()).await?;
        body.insert("access_token".to_string(), Value::String(token));
        let url = self.endpoint(path, path)?;

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| transport_error(path, err))?;

        let envelope = match read_envelope(response, path).await {
            Err(err @ SourceError::Authentication { .. }) => {
                self.tokens.invalidate().await;
                return Err(err);
            }
            other => other?,
        };

        match envelope.code.unwrap_or(-1) {
            0 => Ok(envelope.data),
            code if TOKEN_INVALID.contains(&code) || CREDENTIAL_REJECTED.contains(&code) => {
                warn!(endpoint = path, code, "access token rejected, clearing cache");
                self.tokens.invalidate().await;
                Err(SourceError::authentication(
                    envelope.msg.unwrap_or_else(|| "access token rejected".to_string()),
                    Some(code),
                ))
            }
            code => Err(SourceError::Api {
                code,
                operation: path.to_string(),
                message: envelope.msg.unwrap_or_default(),
            }),
        }
    }

    fn source_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format(SOURCE_TIME_FORMAT)
            .to_string()
    }

    fn source_date(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%Y-%m-%d").to_string()
    }

    fn order_list_body(&self, page: u64, request: &PageRequest) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("page".into(), page.into());
        body.insert("page_size".into(), request.page_size.into());
        body.insert("search_type".into(), ORDER_SEARCH_BY_UPDATE.into());
        if let Some(SyncWindow { start, end }) = request.window {
            body.insert("start_time".into(), self.source_time(start).into());
            body.insert("end_time".into(), self.source_time(end).into());
        }
        body
    }

    fn aftersale_list_body(&self, page: u64, request: &PageRequest) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("page_index".into(), page.into());
        body.insert("page_size".into(), request.page_size.into());
        if let Some(SyncWindow { start, end }) = request.window {
            body.insert("date_type".into(), "created_at".into());
            body.insert(
                "created_at".into(),
                format!("{}||{}", self.source_date(start), self.source_date(end)).into(),
            );
        }
        body
    }

    async fn fetch_numbered(
        &self,
        path: &str,
        body: Map<String, Value>,
        page: u64,
        page_size: u32,
        total_key: &str,
    ) -> Result<Page, SourceError> {
        let data = self.call(path, body).await?;
        numbered_page(data, page, page_size, total_key, path)
    }

    async fn fetch_users(&self, request: &PageRequest) -> Result<Page, SourceError> {
        let mut body = Map::new();
        body.insert("page_size".into(), request.page_size.into());
        if let Some(cursor) = &request.cursor {
            body.insert("es_skip".into(), cursor.as_json().clone());
        }

        let data = self.call(USER_LIST, body).await?;
        let items = list_items(&data, USER_LIST)?;
        let next_cursor = items
            .last()
            .and_then(|last| last.get("es_skip"))
            .filter(|skip| !skip.is_null())
            .cloned()
            .map(Cursor::from_json);

        Ok(Page {
            has_more: next_cursor.is_some() && !items.is_empty(),
            total_count: total_of(&data, "total"),
            next_cursor,
            items,
        })
    }
}

#[async_trait]
impl SourceClient for XiaoeClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, SourceError> {
        let page = request.cursor.as_ref().and_then(Cursor::as_page).unwrap_or(1);
        match request.entity {
            EntityKind::Order => {
                let body = self.order_list_body(page, request);
                self.fetch_numbered(ORDER_LIST, body, page, request.page_size, "total")
                    .await
            }
            EntityKind::Aftersale => {
                let body = self.aftersale_list_body(page, request);
                self.fetch_numbered(AFTERSALE_LIST, body, page, request.page_size, "row_count")
                    .await
            }
            EntityKind::Product => {
                let mut body = Map::new();
                body.insert("page".into(), page.into());
                body.insert("page_size".into(), request.page_size.into());
                self.fetch_numbered(PRODUCT_LIST, body, page, request.page_size, "total")
                    .await
            }
            EntityKind::User => self.fetch_users(request).await,
        }
    }

    async fn fetch_detail(&self, entity: EntityKind, id: &str) -> Result<Option<Value>, SourceError> {
        let (path, key) = match entity {
            EntityKind::Order => (ORDER_DETAIL, "order_id"),
            EntityKind::Aftersale => (AFTERSALE_DETAIL, "aftersale_id"),
            EntityKind::User | EntityKind::Product => {
                return Err(SourceError::Unsupported {
                    entity,
                    operation: "detail lookup",
                });
            }
        };

        let mut body = Map::new();
        body.insert(key.into(), id.into());
        let data = self.call(path, body).await?;
        Ok(match data {
            Value::Null => None,
            Value::Object(ref map) if map.is_empty() => None,
            Value::Array(ref list) if list.is_empty() => None,
            other => Some(other),
        })
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> SourceError {
    let kind = if err.is_timeout() {
        TransientKind::Timeout
    } else {
        TransientKind::Network
    };
    SourceError::transient(kind, operation, err.to_string())
}

/// Map the HTTP status, then decode the envelope.
async fn read_envelope(response: reqwest::Response, operation: &str) -> Result<Envelope, SourceError> {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(SourceError::authentication(
                format!("{operation} answered HTTP {}", status.as_u16()),
                None,
            ));
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(SourceError::transient(
                TransientKind::RateLimited { retry_after_secs },
                operation,
                "rate limited",
            ));
        }
        s if s.is_server_error() => {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::transient(
                TransientKind::Server { status: s.as_u16() },
                operation,
                body,
            ));
        }
        s if !s.is_success() => {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                code: i64::from(s.as_u16()),
                operation: operation.to_string(),
                message: body,
            });
        }
        _ => {}
    }

    let raw = response
        .text()
        .await
        .map_err(|err| transport_error(operation, err))?;
    serde_json::from_str(&raw).map_err(|err| SourceError::malformed(operation, err.to_string()))
}

fn list_items(data: &Value, operation: &str) -> Result<Vec<Value>, SourceError> {
    match data.get("list") {
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(SourceError::malformed(
            operation,
            format!("`list` is not an array: {other}"),
        )),
    }
}

fn total_of(data: &Value, key: &str) -> Option<u64> {
    match data.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn numbered_page(
    data: Value,
    page: u64,
    page_size: u32,
    total_key: &str,
    operation: &str,
) -> Result<Page, SourceError> {
    let items = list_items(&data, operation)?;
    let total_count = total_of(&data, total_key);
    let has_more = !items.is_empty()
        && match total_count {
            Some(total) => page.saturating_mul(u64::from(page_size)) < total,
            None => items.len() >= page_size as usize,
        };

    Ok(Page {
        next_cursor: has_more.then(|| Cursor::from_page(page + 1)),
        has_more,
        total_count,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Value {
        Value::Array((0..n).map(|i| json!({ "id": i })).collect())
    }

    #[test]
    fn total_drives_has_more() {
        let page = numbered_page(json!({"list": items(50), "total": 60}), 1, 50, "total", "t").unwrap();
        assert!(page.has_more);
        assert_eq!(page.next_cursor, Some(Cursor::from_page(2)));

        let last = numbered_page(json!({"list": items(10), "total": 60}), 2, 50, "total", "t").unwrap();
        assert!(!last.has_more);
        assert_eq!(last.next_cursor, None);
    }

    #[test]
    fn full_page_without_total_implies_more() {
        let page = numbered_page(json!({"list": items(5)}), 3, 5, "total", "t").unwrap();
        assert!(page.has_more);
        assert_eq!(page.total_count, None);
    }

    #[test]
    fn row_count_may_arrive_as_string() {
        let page = numbered_page(json!({"list": items(2), "row_count": "2"}), 1, 50, "row_count", "t")
            .unwrap();
        assert_eq!(page.total_count, Some(2));
        assert!(!page.has_more);
    }

    #[test]
    fn missing_list_is_an_empty_page() {
        let page = numbered_page(json!([]), 1, 50, "total", "t").unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn non_array_list_is_malformed() {
        let err = numbered_page(json!({"list": "oops"}), 1, 50, "total", "t").unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }
}
