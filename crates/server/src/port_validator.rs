//! Port checks before startup
//!
//! A successful check does not reserve the port; the bind in
//! [`HttpServer::run`](crate::http::HttpServer) is authoritative. The check
//! only turns a taken port into an early, readable error.

use tokio::net::TcpListener;
use tracing::{debug, error, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Fail early if the configured HTTP port cannot be bound
pub async fn validate_port_available(config: &ServerConfig) -> Result<()> {
    if config.http_port == 0 {
        return Ok(());
    }
    let addr = config.http_addr()?;
    debug!(%addr, "Checking HTTP port");

    match TcpListener::bind(addr).await {
        Ok(listener) => {
            drop(listener);
            Ok(())
        }
        Err(e) => {
            error!(port = config.http_port, error = %e, "HTTP port is not available");
            Err(ServerError::port_in_use(config.http_port, e.to_string()))
        }
    }
}

/// Reject port 0 for explicit configuration; warn on privileged ports
pub fn validate_port_range(port: u16) -> Result<()> {
    if port == 0 {
        Err(ServerError::ConfigError(
            "HTTP port cannot be 0".to_string(),
        ))
    } else {
        if port < 1024 {
            warn!(port, "Privileged port, binding requires elevated permissions");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_port_range() {
        assert!(validate_port_range(0).is_err());
        assert!(validate_port_range(80).is_ok());
        assert!(validate_port_range(8000).is_ok());
        assert!(validate_port_range(65535).is_ok());
    }

    #[tokio::test]
    async fn test_taken_port_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let err = validate_port_available(&ServerConfig::new("127.0.0.1", port))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::PortInUse { port: p, .. } if p == port));

        drop(listener);
        assert!(validate_port_available(&ServerConfig::new("127.0.0.1", 0)).await.is_ok());
    }
}
