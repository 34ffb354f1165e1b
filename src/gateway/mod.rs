//! Boundary gateway — mediates between the in-page pipeline and the
//! out-of-page classification process
//!
//! Requests against restricted navigation targets are refused before any
//! provider involvement, with a failure distinct from ordinary errors so the
//! caller can show "not available here". Requests missing required fields
//! are rejected before any suspension point, with an error payload rather
//! than silence; every request that performs async work responds exactly
//! once.

use crate::config::ProviderConfig;
use crate::engine::HighlightEngine;
use crate::provider::Sentiment;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Navigation targets the host environment refuses to script
pub const RESTRICTED_TARGETS: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "chrome.google.com/webstore",
    "chromewebstore.google.com",
    "chrome-error://",
    "edge://",
    "brave://",
    "about:",
];

/// Errors from gateway operations
#[derive(Debug, Error, PartialEq)]
pub enum GatewayError {
    /// The origin is a restricted target; the host would reject the
    /// operation, so it is refused up front.
    #[error("classification not permitted on this target: {0}")]
    RestrictedTarget(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Requests crossing the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    /// Classify a user selection from the page at `origin`
    #[serde(rename_all = "camelCase")]
    ClassifySelection {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        origin: Option<String>,
    },
    /// Replace the provider configuration
    #[serde(rename_all = "camelCase")]
    UpdateConfig {
        #[serde(default)]
        config: Option<ProviderConfig>,
    },
    /// The in-page pipeline announces it is ready
    Ready,
}

/// Responses crossing the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    Classification { results: Vec<Sentiment> },
    ConfigUpdated,
    Ready,
    #[serde(rename_all = "camelCase")]
    Error { message: String, restricted: bool },
}

impl Response {
    fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
            restricted: false,
        }
    }
}

/// The boundary between page pipeline and classification process
pub struct Gateway {
    engine: Arc<HighlightEngine>,
    restricted: Vec<String>,
}

impl Gateway {
    pub fn new(engine: Arc<HighlightEngine>) -> Self {
        Self {
            engine,
            restricted: RESTRICTED_TARGETS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether `origin` names a restricted navigation target. An unknown
    /// (empty) origin is treated as restricted.
    pub fn is_restricted(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return true;
        }
        self.restricted
            .iter()
            .any(|pattern| origin.starts_with(pattern.as_str()) || origin.contains(pattern.as_str()))
    }

    /// Classify `sentences` on behalf of the page at `origin`.
    ///
    /// Restricted targets fail before the dispatcher or provider is touched.
    pub async fn request_classification(
        &self,
        sentences: &[String],
        origin: &str,
    ) -> Result<Vec<Sentiment>, GatewayError> {
        if self.is_restricted(origin) {
            debug!(%origin, "refusing classification for restricted target");
            return Err(GatewayError::RestrictedTarget(origin.to_string()));
        }
        Ok(self.engine.classify_batch(sentences).await)
    }

    /// Handle one protocol request. Field validation happens before any
    /// suspension point; async work responds exactly once.
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::ClassifySelection { text, origin } => {
                let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
                    return Response::error(GatewayError::MissingField("text").to_string());
                };
                let origin = origin.unwrap_or_default();
                match self.request_classification(&[text], &origin).await {
                    Ok(results) => Response::Classification { results },
                    Err(e @ GatewayError::RestrictedTarget(_)) => Response::Error {
                        message: e.to_string(),
                        restricted: true,
                    },
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Request::UpdateConfig { config } => {
                let Some(config) = config else {
                    return Response::error(GatewayError::MissingField("config").to_string());
                };
                match self.engine.update_config(config).await {
                    Ok(()) => Response::ConfigUpdated,
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Request::Ready => Response::Ready,
        }
    }
}
