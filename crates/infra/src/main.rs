//! `ssogate` — checks an SSO deployment's configuration.
//!
//! Loads the config the way a host would (`SSOGATE_CONFIG` file, else
//! `SSOGATE_*` variables), prints it with credentials masked, and prints the
//! authorization URL a login would redirect to.

use std::sync::Arc;

use anyhow::Context;

use ssogate_auth::LoginFlow;
use ssogate_infra::{InMemorySession, ReqwestTransport};

fn main() -> anyhow::Result<()> {
    ssogate_observability::init();

    let config = ssogate_infra::config::load()?;
    println!("{}", serde_json::to_string_pretty(&config.display_json())?);

    let transport = ReqwestTransport::new().context("failed to build HTTP client")?;
    let flow = LoginFlow::new(config, Arc::new(transport));

    let mut session = InMemorySession::new();
    let return_to = std::env::args().nth(1);
    let redirect = flow
        .begin_login(&mut session, return_to.as_deref())
        .context("failed to start login")?;

    tracing::info!("authorization URL generated");
    println!("{}", redirect.url);
    Ok(())
}
