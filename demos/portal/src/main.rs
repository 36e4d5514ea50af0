//! Game portal server.
//!
//! Run with: `PLAYHUB_USERS="alice:k-1,bob:k-2" cargo run -p portal`
//!
//! Then open two browser tabs, connect to `ws://127.0.0.1:8080`, send
//! `{"type":"auth:hello","payload":{"token":"k-1"}}` (and `k-2` in the
//! other tab), and queue both with
//! `{"type":"caro:find_match","payload":{"ticketToken":"t-1"}}`.

use playhub::prelude::*;

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_USERS: &str = "alice:alice-key,bob:bob-key";

/// Where to listen and who may log in.
#[derive(Debug, PartialEq)]
struct Settings {
    bind: String,
    users: String,
}

impl Settings {
    /// Reads `PLAYHUB_BIND` and `PLAYHUB_USERS` through `lookup`, falling
    /// back to a loopback address and two demo accounts.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind: lookup("PLAYHUB_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            users: lookup("PLAYHUB_USERS").unwrap_or_else(|| DEFAULT_USERS.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    playhub::init_tracing();

    let settings = Settings::from_lookup(|key| std::env::var(key).ok());
    let auth = ApiKeyAuthenticator::from_pairs(&settings.users)?;
    if auth.is_empty() {
        tracing::warn!("PLAYHUB_USERS is empty, nobody can log in");
    }

    let server = PlayhubServerBuilder::new()
        .bind(&settings.bind)
        .build(auth)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "portal listening");

    server.run().await?;
    Ok(())
}
