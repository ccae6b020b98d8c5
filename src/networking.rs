//! Networking module for the cascade engine
//!
//! ## Table of Contents
//! - **HttpServerConfig**: Bind address and server options
//! - **HttpState**: Shared state wrapper for axum handlers
//! - **ErrorResponse**: JSON error body with a carried status code
//! - **HttpServer**: Axum-based HTTP/REST API server

use crate::error::{CascadeError, Result};
use axum::{http::StatusCode, response::IntoResponse, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Bind address
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub cors_enabled: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 3000).into(),
            cors_enabled: true,
            timeout_secs: 30,
        }
    }
}

impl HttpServerConfig {
    /// Create with custom bind address
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Parse from string address
    pub fn with_addr_str(mut self, addr: &str) -> Result<Self> {
        self.bind_addr = addr
            .parse()
            .map_err(|e| CascadeError::config(format!("Invalid address: {}", e)))?;
        Ok(self)
    }
}

/// Shared state for HTTP handlers
pub struct HttpState<T> {
    /// Application state
    pub app: Arc<RwLock<T>>,
}

impl<T> Clone for HttpState<T> {
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
        }
    }
}

/// Error body for REST handlers
///
/// Serializes as `{ "error": "..." }`; the HTTP status travels with the
/// response, not in the body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Status for the response line, not serialized
    #[serde(skip)]
    pub status: StatusCode,
}

impl ErrorResponse {
    /// Create with an explicit status
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status,
        }
    }

    /// 404 with the given error message
    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

/// HTTP server wrapper
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: HttpServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
        }
    }

    /// Set the router
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Start the server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| CascadeError::network(format!("Failed to bind: {}", e)))?;

        info!(addr = %self.config.bind_addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .await
            .map_err(|e| CascadeError::network(format!("Server error: {}", e)))?;

        Ok(())
    }
}
