// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.

//! Remote API boundary.
//!
//! The engine talks to the authoritative server only through [`RemoteApi`]:
//! a generic verb+path+body request returning a status code and an opaque
//! body. The embedding app supplies the transport (HTTP client, auth
//! headers, timeouts); the core only inspects the status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Request verb. Serialized uppercase so persisted queue snapshots read
/// like the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A generic remote request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// A generic remote response. The engine inspects `status` only; `data` is
/// opaque and flows to the caller (cache refreshes) untouched.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub data: Value,
}

/// Transport-level failure: no response was obtained at all.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request could not be sent: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
}

#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn request(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError>;
}

/// Per-item drain classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx — the mutation took effect; drop it from the queue.
    Applied,
    /// No response or 5xx — keep the item for the next drain. Also covers
    /// 1xx/3xx, which this API never emits; treating them as transient is
    /// the safe side of the ambiguity.
    Retry,
    /// 4xx — the server rejected the mutation as invalid; drop it for good.
    Discard,
}

impl Outcome {
    #[must_use]
    pub fn classify(result: &Result<ApiResponse, RemoteError>) -> Self {
        match result {
            Err(_) => Self::Retry,
            Ok(response) => match response.status {
                200..=299 => Self::Applied,
                400..=499 => Self::Discard,
                _ => Self::Retry,
            },
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Retry => "retry",
            Self::Discard => "discard",
        }
    }
}
