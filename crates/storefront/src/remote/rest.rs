//! Firebase Realtime Database REST client.
//!
//! Reads and writes go to `<base>/<path>.json`; live snapshots use the
//! streaming variant of the same URL (`Accept: text/event-stream`). The
//! optional database secret or ID token travels as the `auth` query
//! parameter.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use url::Url;

use super::sse::{SseDecoder, SseEvent, StreamChange};
use super::{DocumentStore, RemoteError, segments};
use crate::subscription::{Feed, FeedSender};

/// Maximum characters of an error body kept for logs and errors.
const ERROR_BODY_LIMIT: usize = 500;

/// REST client for the remote document store.
///
/// Cheaply cloneable; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct RestDocumentStore {
    inner: Arc<RestStoreInner>,
}

#[derive(Debug)]
struct RestStoreInner {
    client: reqwest::Client,
    base: Url,
    auth: Option<SecretString>,
}

impl RestDocumentStore {
    /// Create a client for the database at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base: Url, auth: Option<SecretString>) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            inner: Arc::new(RestStoreInner { client, base, auth }),
        })
    }

    /// Build the `.json` URL of `path`.
    fn url_for(&self, path: &str) -> Result<Url, RemoteError> {
        let parts = segments(path)?;
        let mut url = self.inner.base.clone();
        {
            let mut url_segments = url
                .path_segments_mut()
                .map_err(|()| RemoteError::InvalidPath(self.inner.base.to_string()))?;
            url_segments.pop_if_empty();
            if let Some((last, parents)) = parts.split_last() {
                url_segments.extend(parents);
                url_segments.push(&format!("{last}.json"));
            }
        }
        if let Some(auth) = &self.inner.auth {
            url.query_pairs_mut()
                .append_pair("auth", auth.expose_secret());
        }
        Ok(url)
    }

    /// Turn a response into its body, logging and failing on non-success.
    async fn body_of(response: reqwest::Response) -> Result<String, RemoteError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            tracing::error!(
                status = %status,
                body = %body,
                "Document store returned non-success status"
            );
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(text)
    }

    /// Follow the event stream of `path`, forwarding snapshots into `tx`.
    ///
    /// Returns `Ok(())` when the consumer went away.
    async fn stream(&self, path: &str, tx: &FeedSender) -> Result<(), RemoteError> {
        let url = self.url_for(path)?;
        let mut response = self
            .inner
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Self::body_of(response).await.map(|_| ());
        }
        tracing::debug!(path, "Document stream opened");

        let mut decoder = SseDecoder::new();
        loop {
            let chunk = tokio::select! {
                () = tx.closed() => return Ok(()),
                chunk = response.chunk() => chunk?,
            };
            let Some(bytes) = chunk else {
                return Err(RemoteError::StreamClosed("server ended the stream".to_owned()));
            };

            for event in decoder.push(&bytes) {
                let Some(snapshot) = self.apply_event(path, &event).await? else {
                    continue;
                };
                if tx.send(Ok(snapshot)).is_err() {
                    return Ok(());
                }
            }
        }
    }

    /// Interpret one stream event, yielding the new snapshot if it changed.
    async fn apply_event(
        &self,
        path: &str,
        event: &SseEvent,
    ) -> Result<Option<Option<Value>>, RemoteError> {
        match event.event.as_str() {
            "put" | "patch" => {
                let change: StreamChange = serde_json::from_str(&event.data)?;
                if event.event == "put" && change.path == "/" {
                    return Ok(Some((!change.data.is_null()).then_some(change.data)));
                }
                // Partial change: fetch the whole subtree again.
                self.get(path).await.map(Some)
            }
            "keep-alive" => Ok(None),
            "cancel" => Err(RemoteError::StreamClosed(format!(
                "cancelled by server: {}",
                event.data
            ))),
            "auth_revoked" => Err(RemoteError::StreamClosed("credential revoked".to_owned())),
            other => {
                tracing::debug!(event = other, "Ignoring unknown stream event");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, RemoteError> {
        let url = self.url_for(path)?;
        let response = self.inner.client.get(url).send().await?;
        let text = Self::body_of(response).await?;

        let value: Value = serde_json::from_str(&text)?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), RemoteError> {
        let url = self.url_for(path)?;
        let response = self.inner.client.put(url).json(&value).send().await?;
        Self::body_of(response).await?;
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), RemoteError> {
        let url = self.url_for(path)?;
        let response = self
            .inner
            .client
            .patch(url)
            .json(&Value::Object(fields))
            .send()
            .await?;
        Self::body_of(response).await?;
        Ok(())
    }

    fn watch(&self, path: &str) -> Feed {
        let (tx, feed) = Feed::channel();
        let store = self.clone();
        let path = path.to_owned();

        let producer = tokio::spawn(async move {
            if let Err(e) = store.stream(&path, &tx).await {
                tracing::warn!(path = %path, error = %e, "Document stream ended");
                let _ = tx.send(Err(e));
            }
        });

        feed.with_producer(&producer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(base: &str, auth: Option<&str>) -> RestDocumentStore {
        RestDocumentStore::new(
            Url::parse(base).unwrap(),
            auth.map(|a| SecretString::from(a.to_owned())),
        )
        .unwrap()
    }

    #[test]
    fn test_url_for_appends_json_suffix() {
        let store = store("https://shop-default-rtdb.firebaseio.com/", None);
        assert_eq!(
            store.url_for("users/u1").unwrap().as_str(),
            "https://shop-default-rtdb.firebaseio.com/users/u1.json"
        );
    }

    #[test]
    fn test_url_for_keeps_base_path_and_adds_auth() {
        let store = store("https://db.example.com/tenant", Some("s3cret"));
        assert_eq!(
            store.url_for("orders").unwrap().as_str(),
            "https://db.example.com/tenant/orders.json?auth=s3cret"
        );
    }

    #[test]
    fn test_url_for_rejects_bad_path() {
        let store = store("https://db.example.com", None);
        assert!(matches!(
            store.url_for("products/a.b"),
            Err(RemoteError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_debug_redacts_auth() {
        let store = store("https://db.example.com", Some("s3cret"));
        assert!(!format!("{store:?}").contains("s3cret"));
    }

    #[tokio::test]
    async fn test_transport_error_hides_auth() {
        // Nothing listens on port 1, so the request fails before any response.
        let store = store("http://127.0.0.1:1/", Some("TOPSECRETTOKEN"));
        let err = store.get("products").await.unwrap_err();
        assert!(matches!(err, RemoteError::Http(_)));
        assert!(!err.to_string().contains("TOPSECRETTOKEN"));
        assert!(!format!("{err:?}").contains("TOPSECRETTOKEN"));

        let app: crate::error::AppError = err.into();
        assert!(!app.to_string().contains("TOPSECRETTOKEN"));
    }
}
