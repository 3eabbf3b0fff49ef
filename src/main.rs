use anyhow::Result;
use clap::Parser;
use eventify_gateway::auth::{self, CookieSettings, GatewayConfig, SessionGateway};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "eventify-gateway")]
#[command(about = "session authentication gateway for the eventify dashboard")]
struct Args {
    /// Host to bind to
    #[arg(long, env = "GATEWAY_HOST", default_value = "localhost")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "GATEWAY_PORT", default_value = "3000")]
    port: u16,

    /// Base URL of the eventify API (refresh goes to <url>/auth/token)
    #[arg(long, env = "AUTH_SERVER_URL")]
    auth_server_url: String,

    /// Refresh tokens this many seconds before they actually expire
    #[arg(long, env = "TOKEN_REFRESH_BUFFER_SECONDS", default_value_t = auth::DEFAULT_REFRESH_BUFFER_SECS)]
    refresh_buffer: i64,

    /// Give up on a refresh call after this many seconds
    #[arg(long, env = "TOKEN_REFRESH_TIMEOUT_SECONDS", default_value_t = auth::DEFAULT_REFRESH_TIMEOUT.as_secs())]
    refresh_timeout: u64,

    /// Drop the Secure cookie attribute. Only for plain-http local development.
    #[arg(long, env = "INSECURE_COOKIES", default_value = "false")]
    insecure_cookies: bool,

    /// Cookie holding the access token
    #[arg(long, env = "ACCESS_TOKEN_COOKIE", default_value = auth::ACCESS_COOKIE_NAME)]
    access_cookie: String,

    /// Cookie holding the refresh token
    #[arg(long, env = "REFRESH_TOKEN_COOKIE", default_value = auth::REFRESH_COOKIE_NAME)]
    refresh_cookie: String,
}

impl Args {
    fn gateway_config(&self) -> Result<GatewayConfig> {
        if self.refresh_buffer < 0 {
            return Err(anyhow::anyhow!("TOKEN_REFRESH_BUFFER_SECONDS cannot be negative"));
        }
        if self.refresh_timeout == 0 {
            return Err(anyhow::anyhow!("TOKEN_REFRESH_TIMEOUT_SECONDS must be at least 1"));
        }

        Ok(GatewayConfig {
            auth_server_url: self.auth_server_url.clone(),
            refresh_buffer_secs: self.refresh_buffer,
            refresh_timeout: Duration::from_secs(self.refresh_timeout),
            cookies: CookieSettings {
                access_name: self.access_cookie.clone(),
                refresh_name: self.refresh_cookie.clone(),
                secure: !self.insecure_cookies,
            },
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventify_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.gateway_config()?;
    if !config.cookies.secure {
        tracing::warn!("WARNING: Secure cookie attribute disabled. Do not run this in production!");
    }

    let gateway = Arc::new(SessionGateway::new(config)?);
    tracing::info!("Refreshing sessions against {}", args.auth_server_url);

    let app = eventify_gateway::create_app(gateway);

    // we pass this to TcpListener::bind() which accepts ToSocketAddrs,
    // so hostnames like "localhost" get resolved properly
    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Gateway ready at http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
