//! LDAP connection pool.
//!
//! Connections are checked out per request and returned on drop, so release
//! happens on every exit path, including errors. A connection that saw a
//! connection-level failure is discarded instead of returned. Capacity is
//! bounded by a semaphore; acquisition waits when the pool is saturated.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;
use std::time::Duration;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError};
use log::{debug, warn};
use tokio::sync::Semaphore;

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct LdapPoolConfig {
    /// LDAP server URL (`ldap://` or `ldaps://`)
    pub url: String,
    /// DN to bind with; anonymous when absent
    pub bind_dn: Option<String>,
    /// Password for the bind DN
    pub bind_password: Option<String>,
    /// Maximum concurrently checked-out connections
    pub size: usize,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl LdapPoolConfig {
    /// A pool configuration with defaults for everything but the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bind_dn: None,
            bind_password: None,
            size: 8,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Bind with the given DN and password instead of anonymously.
    pub fn with_bind(mut self, dn: impl Into<String>, password: impl Into<String>) -> Self {
        self.bind_dn = Some(dn.into());
        self.bind_password = Some(password.into());
        self
    }

    /// Set the pool capacity.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size.max(1);
        self
    }
}

/// A bounded pool of LDAP connections.
pub struct LdapPool {
    config: LdapPoolConfig,
    idle: Mutex<VecDeque<Ldap>>,
    permits: Semaphore,
}

impl LdapPool {
    /// Create a pool; connections are established lazily on first checkout.
    pub fn new(config: LdapPoolConfig) -> Self {
        let permits = Semaphore::new(config.size.max(1));
        Self {
            config,
            idle: Mutex::new(VecDeque::new()),
            permits,
        }
    }

    /// The server URL this pool connects to.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Check out a connection, connecting if no idle one is available.
    pub async fn acquire(&self) -> Result<PooledLdap<'_>, LdapError> {
        let permit = self
            .permits
            .acquire()
            .await
            .expect("pool semaphore is never closed");
        let idle = self.idle.lock().expect("pool lock is never poisoned").pop_front();
        let ldap = match idle {
            Some(ldap) => ldap,
            None => self.connect().await?,
        };
        Ok(PooledLdap {
            pool: self,
            ldap: Some(ldap),
            broken: false,
            _permit: permit,
        })
    }

    /// Open a fresh, independent connection outside the pool. Used for bind
    /// checks, which change a connection's authentication state.
    pub async fn connect_unpooled(&self) -> Result<Ldap, LdapError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.config.connect_timeout);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.config.url).await?;
        ldap3::drive!(conn);
        Ok(ldap)
    }

    async fn connect(&self) -> Result<Ldap, LdapError> {
        let mut ldap = self.connect_unpooled().await?;
        if let (Some(dn), Some(password)) =
            (&self.config.bind_dn, &self.config.bind_password)
        {
            ldap.simple_bind(dn, password).await?.success().inspect_err(|e| {
                warn!("pool bind as {dn} failed: {e}");
            })?;
        }
        debug!("opened ldap connection to {}", self.config.url);
        Ok(ldap)
    }

    fn release(&self, ldap: Ldap) {
        self.idle
            .lock()
            .expect("pool lock is never poisoned")
            .push_back(ldap);
    }
}

/// A checked-out connection; dereferences to [`Ldap`].
pub struct PooledLdap<'a> {
    pool: &'a LdapPool,
    ldap: Option<Ldap>,
    broken: bool,
    _permit: tokio::sync::SemaphorePermit<'a>,
}

impl PooledLdap<'_> {
    /// Mark the connection as broken; it will be dropped instead of returned
    /// to the pool.
    pub fn discard(&mut self) {
        self.broken = true;
    }
}

impl Deref for PooledLdap<'_> {
    type Target = Ldap;

    fn deref(&self) -> &Ldap {
        self.ldap.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledLdap<'_> {
    fn deref_mut(&mut self) -> &mut Ldap {
        self.ldap.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledLdap<'_> {
    fn drop(&mut self) {
        if let Some(ldap) = self.ldap.take()
            && !self.broken
        {
            self.pool.release(ldap);
        }
    }
}
