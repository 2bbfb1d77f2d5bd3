//! Shared command context: resolved paths, configuration and database
//! handles. Passed explicitly - no process-wide mutable state.

use anyhow::{bail, Context, Result};
use tokio::runtime::Runtime;

use velocity_db::{ArpCatDb, AssetsDb, UsersDb};
use velocity_net::transport::Credentials;
use velocity_protocol::config::CoreConfig;
use velocity_protocol::paths::DataLayout;

pub struct CliContext {
    pub layout: DataLayout,
    pub config: CoreConfig,
    /// One runtime per invocation bridges the async stores into the
    /// synchronous command flow.
    pub runtime: Runtime,
}

impl CliContext {
    /// Resolve layout + config. Most commands require an initialized data
    /// directory; `init` itself passes `require_init = false`.
    pub fn open(require_init: bool) -> Result<Self> {
        let layout = DataLayout::resolve();
        if require_init && !layout.is_initialized() {
            bail!(
                "data directory {} is not initialized; run `velocity init` first",
                layout.base().display()
            );
        }
        let config = CoreConfig::load(&layout.config_file())
            .with_context(|| format!("loading config {}", layout.config_file().display()))?;
        let runtime = Runtime::new().context("failed to start async runtime")?;
        Ok(Self {
            layout,
            config,
            runtime,
        })
    }

    pub fn open_assets(&self) -> Result<AssetsDb> {
        self.runtime
            .block_on(AssetsDb::open(&self.layout.assets_db()))
            .context("opening assets.db")
    }

    pub fn open_arp_cat(&self) -> Result<ArpCatDb> {
        self.runtime
            .block_on(ArpCatDb::open(&self.layout.arp_cat_db()))
            .context("opening arp_cat.db")
    }

    pub fn open_users(&self) -> Result<UsersDb> {
        self.runtime
            .block_on(UsersDb::open(&self.layout.users_db()))
            .context("opening users.db")
    }
}

/// Resolve credentials: explicit flags first, then the CRED_1_* slot.
pub fn resolve_credentials(username: &str, password: Option<&str>) -> Result<Credentials> {
    if let Some(password) = password {
        return Ok(Credentials::password(username, password));
    }
    if let Some(env) = Credentials::from_env(1) {
        if env.username == username {
            return Ok(env);
        }
        return Ok(Credentials {
            username: username.to_string(),
            password: env.password,
            key_path: None,
        });
    }
    bail!("no password given: pass --password or set CRED_1_USER/CRED_1_PASS");
}
