//! mirror-agent entry point.
//!
//! Connects to the controller's control socket and runs one session on it.
//!
//! The device side is the in-memory [`FakeDevice`], so the binary is a
//! headless demo harness for exercising a controller.  Injected events are
//! logged and kept in bounded recordings instead of being delivered.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load AgentConfig (TOML, CLI overrides)
//!  └─ connect control socket (Unix-domain or TCP)
//!  └─ SessionController::new()     -- writes the channel marker
//!       ├─ ctrl_c task             -- StopHandle::stop()
//!       └─ spawn_blocking(run)     -- receive loop on a blocking thread
//! ```
//!
//! The process exits with status 0 when the peer disconnects, with
//! [`INVALID_CONTROL_MESSAGE`] when the peer sends a malformed message and with
//! [`SOCKET_IO_ERROR`] on a fatal socket error.

use std::net::TcpStream;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mirror_agent::application::capabilities::Capabilities;
use mirror_agent::application::session::{SessionConfig, SessionController, SessionEnd, SessionError};
use mirror_agent::infrastructure::config::{load_config, SocketKind};
use mirror_agent::infrastructure::services::mock::FakeDevice;
use mirror_agent::transport::ControlChannel;

/// Exit status after the peer sent bytes that are not a valid message.
const INVALID_CONTROL_MESSAGE: i32 = 3;
/// Exit status after a fatal control socket error.
const SOCKET_IO_ERROR: i32 = 21;

/// Device-side control channel of the device mirroring agent.
#[derive(Debug, Parser)]
#[command(name = "mirror-agent", about = "Device-side control channel agent", version)]
struct Cli {
    /// Path of the TOML configuration file.  A missing file means defaults.
    #[arg(long, default_value = "mirror-agent.toml", env = "MIRROR_AGENT_CONFIG")]
    config: PathBuf,

    /// Control socket to connect to, overriding the configuration.
    #[arg(long, env = "MIRROR_AGENT_SOCKET")]
    socket: Option<String>,

    /// Treat the socket as a `host:port` TCP address.
    #[arg(long)]
    tcp: bool,
}

fn exit_code(e: &SessionError) -> i32 {
    match e {
        SessionError::Protocol(_) => INVALID_CONTROL_MESSAGE,
        SessionError::Transport(_) | SessionError::Io(_) => SOCKET_IO_ERROR,
    }
}

/// Runs one session on `channel` until it ends.  Ctrl-C stops the session.
async fn serve<C: ControlChannel + 'static>(
    channel: C,
    capabilities: Capabilities,
    config: SessionConfig,
) -> anyhow::Result<Result<SessionEnd, SessionError>> {
    let mut controller = match SessionController::new(channel, capabilities, config) {
        Ok(controller) => controller,
        Err(e) => return Ok(Err(e)),
    };

    let stop = controller.stop_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, stopping the session");
                stop.stop();
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    tokio::task::spawn_blocking(move || controller.run())
        .await
        .context("session thread panicked")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)
        .with_context(|| format!("could not load {}", cli.config.display()))?;
    if let Some(socket) = cli.socket {
        config.connection.socket = socket;
    }
    if cli.tcp {
        config.connection.kind = SocketKind::Tcp;
    }

    // `RUST_LOG` overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "mirror-agent starting, {:?} socket {}",
        config.connection.kind, config.connection.socket
    );

    let device = FakeDevice::phone();
    let session_config = config.session_config();
    let socket = config.connection.socket.as_str();

    let outcome = match config.connection.kind {
        SocketKind::Tcp => {
            let stream = TcpStream::connect(socket)
                .with_context(|| format!("could not connect to {socket}"))?;
            stream.set_nodelay(true)?;
            serve(stream, device.capabilities(), session_config).await?
        }
        #[cfg(unix)]
        SocketKind::Unix => {
            let stream = std::os::unix::net::UnixStream::connect(socket)
                .with_context(|| format!("could not connect to {socket}"))?;
            serve(stream, device.capabilities(), session_config).await?
        }
        #[cfg(not(unix))]
        SocketKind::Unix => anyhow::bail!("Unix-domain sockets are not supported on this platform"),
    };

    match outcome {
        Ok(end) => {
            info!("mirror-agent stopped ({end:?})");
            Ok(())
        }
        Err(e) => {
            error!("mirror-agent failed: {e}");
            std::process::exit(exit_code(&e));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::ProtocolError;

    #[test]
    fn test_cli_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["mirror-agent"]);

        // Assert
        assert_eq!(cli.config, PathBuf::from("mirror-agent.toml"));
        assert!(!cli.tcp);
    }

    #[test]
    fn test_cli_socket_override() {
        let cli = Cli::parse_from(["mirror-agent", "--socket", "127.0.0.1:27183", "--tcp"]);
        assert_eq!(cli.socket.as_deref(), Some("127.0.0.1:27183"));
        assert!(cli.tcp);
    }

    #[test]
    fn test_malformed_message_exit_code() {
        let e = SessionError::Protocol(ProtocolError::Malformed("empty text".to_string()));
        assert_eq!(exit_code(&e), INVALID_CONTROL_MESSAGE);
    }

    #[test]
    fn test_socket_error_exit_code() {
        let e = SessionError::Io(std::io::ErrorKind::PermissionDenied.into());
        assert_eq!(exit_code(&e), SOCKET_IO_ERROR);
    }
}
