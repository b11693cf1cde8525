//! LDAP-backed implementation of the [`Backend`] interface.
//!
//! All reads go through paged searches (Simple Paged Results control, cookie
//! carried between pages on one pooled connection). Sorting retrieves the
//! full candidate set, bounded by `max_candidates`, and orders it in memory.
//! Connection-level failures retry with exponential backoff; logical LDAP
//! errors do not. Every operation runs under the configured deadline.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ldap3::controls::{Control, ControlType, PagedResults};
use ldap3::{LdapError, Scope, SearchEntry, SearchResult, ldap_escape};
use log::{debug, error, warn};
use uuid::Uuid;

use crate::backend::requests::{
    DeleteResourceRequest, GetResourceRequest, GetResourcesRequest, PostResourceRequest,
    PutResourceRequest, RequestContext, ResourcePage,
};
use crate::backend::{Backend, strip_read_only, validate_required};
use crate::error::{ScimError, ScimResult};
use crate::filter::AttrPath;
use crate::resource::{Meta, ScimObject};

use super::config::ResourceMapping;
use super::filter::to_ldap_filter;
use super::mapper::{LdapMapper, entry_version};
use super::pool::LdapPool;

/// Result code subset the backend interprets.
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;
const RC_ENTRY_ALREADY_EXISTS: u32 = 68;

/// Retry policy for connection-level LDAP failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Backoff before the first retry; doubles per retry
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

/// Configuration for the LDAP backend.
#[derive(Debug, Clone)]
pub struct LdapBackendConfig {
    /// Simple Paged Results page size
    pub page_size: i32,
    /// Maximum candidate entries retrieved for an in-memory sort
    pub max_candidates: usize,
    /// Page size when a request does not specify `count`
    pub default_count: usize,
    /// Per-request deadline
    pub deadline: Duration,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
    /// Base URI for `meta.location`, when known
    pub base_uri: Option<String>,
}

impl Default for LdapBackendConfig {
    fn default() -> Self {
        Self {
            page_size: 500,
            max_candidates: 1000,
            default_count: 100,
            deadline: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            base_uri: None,
        }
    }
}

/// [`Backend`] over an LDAP directory, driven by per-resource mappings.
pub struct LdapBackend {
    pool: LdapPool,
    mappers: HashMap<String, Arc<LdapMapper>>,
    config: LdapBackendConfig,
}

/// Connection-level failures are retried; logical failures are not.
enum OpError {
    Transport(LdapError),
    Protocol(ScimError),
}

impl From<LdapError> for OpError {
    fn from(e: LdapError) -> Self {
        Self::Transport(e)
    }
}

impl From<ScimError> for OpError {
    fn from(e: ScimError) -> Self {
        Self::Protocol(e)
    }
}

/// Which part of a paged result walk to keep in memory.
#[derive(Clone, Copy)]
enum Window {
    /// Everything, capped (for in-memory sort)
    All { cap: usize },
    /// Only the requested page; earlier entries are discarded as they stream
    Slice { skip: usize, take: usize },
}

impl LdapBackend {
    /// Create a backend over a pool with the given configuration.
    pub fn new(pool: LdapPool, config: LdapBackendConfig) -> Self {
        Self {
            pool,
            mappers: HashMap::new(),
            config,
        }
    }

    /// Register a resource mapping.
    pub fn with_mapping(mut self, mapping: ResourceMapping) -> Self {
        let mapper = Arc::new(LdapMapper::new(mapping));
        self.mappers
            .insert(mapper.resource().name().to_ascii_lowercase(), mapper);
        self
    }

    /// The mappers registered with this backend, for schema registration.
    pub fn mappers(&self) -> impl Iterator<Item = &Arc<LdapMapper>> {
        self.mappers.values()
    }

    fn mapper(&self, resource_name: &str) -> ScimResult<Arc<LdapMapper>> {
        self.mappers
            .get(&resource_name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ScimError::NotImplemented {
                message: format!("no LDAP mapping for resource '{resource_name}'"),
            })
    }

    async fn with_deadline<T>(
        &self,
        fut: impl Future<Output = ScimResult<T>>,
    ) -> ScimResult<T> {
        match tokio::time::timeout(self.config.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(ScimError::RequestExpired {
                timeout: self.config.deadline,
            }),
        }
    }

    async fn retry<T, Op, Fut>(&self, what: &str, op: Op) -> ScimResult<T>
    where
        Op: Fn() -> Fut,
        Fut: Future<Output = Result<T, OpError>>,
    {
        let attempts = self.config.retry.attempts.max(1);
        let mut backoff = self.config.retry.initial_backoff;
        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(OpError::Protocol(e)) => return Err(e),
                Err(OpError::Transport(e)) if is_transient(&e) && attempt < attempts => {
                    warn!(
                        "ldap {what} failed (attempt {attempt}/{attempts}): {e}; retrying in {backoff:?}"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(OpError::Transport(e)) => {
                    error!("ldap {what} failed: {e}");
                    return Err(ScimError::backend("directory operation failed"));
                }
            }
        }
        unreachable!("retry loop always returns")
    }

    /// Walk a paged search, keeping the requested window. Returns the total
    /// number of matching entries and the kept slice.
    async fn collect(
        &self,
        mapper: &LdapMapper,
        filter: &str,
        window: Window,
    ) -> ScimResult<(usize, Vec<SearchEntry>)> {
        self.retry("paged search", async || {
            let mut conn = self.pool.acquire().await.map_err(OpError::Transport)?;
            let attrs = mapper.ldap_attributes();
            let mut cookie: Vec<u8> = Vec::new();
            let mut total = 0usize;
            let mut kept = Vec::new();
            loop {
                let control = PagedResults {
                    size: self.config.page_size,
                    cookie: std::mem::take(&mut cookie),
                };
                let result = conn
                    .with_controls(control)
                    .search(mapper.base_dn(), Scope::Subtree, filter, attrs.clone())
                    .await;
                let SearchResult(batch, res) = match result {
                    Ok(r) => r,
                    Err(e) => {
                        conn.discard();
                        return Err(e.into());
                    }
                };
                if res.rc == RC_NO_SUCH_OBJECT {
                    break;
                }
                if res.rc != 0 && res.rc != RC_SIZE_LIMIT_EXCEEDED {
                    return Err(OpError::Protocol(ScimError::backend(format!(
                        "directory search failed (rc={})",
                        res.rc
                    ))));
                }
                for raw in batch {
                    let entry = SearchEntry::construct(raw);
                    match window {
                        Window::All { cap } => {
                            if kept.len() >= cap {
                                return Err(OpError::Protocol(ScimError::backend(
                                    "candidate set exceeds the configured maximum",
                                )));
                            }
                            kept.push(entry);
                        }
                        Window::Slice { skip, take } => {
                            if total >= skip && total < skip + take {
                                kept.push(entry);
                            }
                        }
                    }
                    total += 1;
                }
                let mut more = false;
                for Control(ctype, raw) in res.ctrls {
                    if matches!(ctype, Some(ControlType::PagedResults)) {
                        let paged: PagedResults = raw.parse();
                        if !paged.cookie.is_empty() {
                            cookie = paged.cookie;
                            more = true;
                        }
                    }
                }
                if !more {
                    break;
                }
            }
            Ok((total, kept))
        })
        .await
    }

    async fn find_entry(&self, mapper: &LdapMapper, id: &str) -> ScimResult<Option<SearchEntry>> {
        let filter = format!(
            "(&{}({}={}))",
            mapper.search_filter(),
            mapper.rdn_attribute(),
            ldap_escape(id)
        );
        let (_, entries) = self
            .collect(mapper, &filter, Window::Slice { skip: 0, take: 1 })
            .await?;
        Ok(entries.into_iter().next())
    }

    fn objectify(&self, mapper: &LdapMapper, entry: &SearchEntry) -> ScimResult<ScimObject> {
        let mut object = mapper.from_entry(entry)?;
        self.attach_location(mapper, &mut object)?;
        Ok(object)
    }

    fn attach_location(&self, mapper: &LdapMapper, object: &mut ScimObject) -> ScimResult<()> {
        let Some(base) = self.config.base_uri.as_deref() else {
            return Ok(());
        };
        let resource = mapper.resource();
        let Some(id) = object.id(resource.schema()).map(str::to_string) else {
            return Ok(());
        };
        let Some(meta_attr) = object.attribute(resource.schema(), "meta") else {
            return Ok(());
        };
        let mut meta = Meta::from_attribute(meta_attr);
        meta.location = Some(format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            resource.endpoint(),
            id
        ));
        if let Some(descriptor) = resource.core_attribute("meta") {
            object.set_attribute(meta.to_attribute(descriptor)?);
        }
        Ok(())
    }

    /// Conflict pre-check: does another entry already carry this `userName`?
    async fn check_user_name_conflict(
        &self,
        mapper: &LdapMapper,
        object: &ScimObject,
        exclude_id: Option<&str>,
    ) -> ScimResult<()> {
        let path = AttrPath {
            name: "userName".to_string(),
            sub: None,
        };
        let Some((ldap_attr, _)) = mapper.map_path(&path).into_iter().next() else {
            return Ok(());
        };
        let Some(user_name) = object
            .attribute(mapper.resource().schema(), "userName")
            .and_then(|a| a.as_string().ok())
        else {
            return Ok(());
        };
        let filter = format!(
            "(&{}({}={}))",
            mapper.search_filter(),
            ldap_attr,
            ldap_escape(user_name)
        );
        let (_, entries) = self
            .collect(mapper, &filter, Window::Slice { skip: 0, take: 2 })
            .await?;
        let taken = entries
            .iter()
            .filter_map(|e| mapper.entry_id(e))
            .any(|id| exclude_id != Some(id.as_str()));
        if taken {
            return Err(ScimError::conflict(format!(
                "userName '{user_name}' already exists"
            )));
        }
        Ok(())
    }
}

impl Backend for LdapBackend {
    async fn get_resource(&self, request: &GetResourceRequest) -> ScimResult<ScimObject> {
        let mapper = self.mapper(request.resource.name())?;
        self.with_deadline(async {
            let entry = self
                .find_entry(&mapper, &request.id)
                .await?
                .ok_or_else(|| ScimError::not_found(request.resource.name(), &request.id))?;
            let object = self.objectify(&mapper, &entry)?;
            Ok(request.selection.apply(&object))
        })
        .await
    }

    async fn get_resources(&self, request: &GetResourcesRequest) -> ScimResult<ResourcePage> {
        let mapper = self.mapper(request.resource.name())?;
        let filter = match &request.filter {
            Some(expr) => format!(
                "(&{}{})",
                mapper.search_filter(),
                to_ldap_filter(expr, &mapper)
            ),
            None => mapper.search_filter().to_string(),
        };
        self.with_deadline(async {
            let take = request.page.count.unwrap_or(self.config.default_count);
            let (total, resources) = match &request.sort {
                Some(sort) => {
                    // In-memory sort needs the full candidate set, bounded by
                    // the configured cap.
                    let (total, entries) = self
                        .collect(
                            &mapper,
                            &filter,
                            Window::All {
                                cap: self.config.max_candidates,
                            },
                        )
                        .await?;
                    let mut objects = entries
                        .iter()
                        .map(|e| self.objectify(&mapper, e))
                        .collect::<ScimResult<Vec<_>>>()?;
                    sort.sort(&mut objects);
                    let skip = request.page.start_index.saturating_sub(1);
                    let page: Vec<ScimObject> =
                        objects.into_iter().skip(skip).take(take).collect();
                    (total, page)
                }
                None => {
                    // Unsorted listings stream pages and keep only the
                    // requested window, still counting the full total.
                    let skip = request.page.start_index.saturating_sub(1);
                    let (total, entries) = self
                        .collect(&mapper, &filter, Window::Slice { skip, take })
                        .await?;
                    let objects = entries
                        .iter()
                        .map(|e| self.objectify(&mapper, e))
                        .collect::<ScimResult<Vec<_>>>()?;
                    (total, objects)
                }
            };
            debug!(
                "ldap list {} returned {}/{} entries (request {})",
                request.resource.endpoint(),
                resources.len(),
                total,
                request.context.request_id
            );
            Ok(ResourcePage {
                total_results: total,
                start_index: request.page.start_index,
                resources: resources
                    .iter()
                    .map(|o| request.selection.apply(o))
                    .collect(),
            })
        })
        .await
    }

    async fn post_resource(&self, request: &PostResourceRequest) -> ScimResult<ScimObject> {
        let mapper = self.mapper(request.resource.name())?;
        let resource = mapper.resource().clone();
        let object = strip_read_only(&resource, &request.object);
        validate_required(&resource, &object)?;
        self.with_deadline(async {
            self.check_user_name_conflict(&mapper, &object, None).await?;

            let id = Uuid::new_v4().to_string();
            let dn = mapper.dn_for(&id, Some(&object));
            let mut attrs = mapper.to_entry(&object)?;
            let rdn = mapper.rdn_attribute().as_bytes().to_vec();
            if !attrs.iter().any(|(name, _)| *name == rdn) {
                attrs.push((rdn, HashSet::from([id.clone().into_bytes()])));
            }

            self.retry("add", async || {
                let mut conn = self.pool.acquire().await.map_err(OpError::Transport)?;
                let result = match conn.add(&dn, attrs.clone()).await {
                    Ok(r) => r,
                    Err(e) => {
                        conn.discard();
                        return Err(e.into());
                    }
                };
                match result.rc {
                    0 => Ok(()),
                    RC_ENTRY_ALREADY_EXISTS => Err(OpError::Protocol(ScimError::conflict(
                        "a resource with this identifier already exists",
                    ))),
                    rc => Err(OpError::Protocol(ScimError::backend(format!(
                        "directory add failed (rc={rc})"
                    )))),
                }
            })
            .await?;
            debug!(
                "ldap created {} as {dn} (request {})",
                resource.name(),
                request.context.request_id
            );

            let entry = self
                .find_entry(&mapper, &id)
                .await?
                .ok_or_else(|| ScimError::backend("created entry could not be read back"))?;
            let object = self.objectify(&mapper, &entry)?;
            Ok(request.selection.apply(&object))
        })
        .await
    }

    async fn put_resource(&self, request: &PutResourceRequest) -> ScimResult<ScimObject> {
        let mapper = self.mapper(request.resource.name())?;
        let resource = mapper.resource().clone();
        let object = strip_read_only(&resource, &request.object);
        self.with_deadline(async {
            let entry = self
                .find_entry(&mapper, &request.id)
                .await?
                .ok_or_else(|| ScimError::not_found(resource.name(), &request.id))?;

            if let Some(expected) = &request.expected_version {
                let current = entry_version(&entry);
                if current != *expected {
                    return Err(ScimError::PreconditionFailed {
                        message: format!("version '{expected}' does not match current resource"),
                    });
                }
            }
            self.check_user_name_conflict(&mapper, &object, Some(&request.id))
                .await?;

            let existing: HashSet<String> = entry
                .attrs
                .keys()
                .chain(entry.bin_attrs.keys())
                .map(|k| k.to_ascii_lowercase())
                .collect();
            let mods = mapper.to_modifications(&object, &existing)?;
            if !mods.is_empty() {
                let dn = entry.dn.clone();
                self.retry("modify", async || {
                    let mut conn = self.pool.acquire().await.map_err(OpError::Transport)?;
                    let result = match conn.modify(&dn, mods.clone()).await {
                        Ok(r) => r,
                        Err(e) => {
                            conn.discard();
                            return Err(e.into());
                        }
                    };
                    match result.rc {
                        0 => Ok(()),
                        rc => Err(OpError::Protocol(ScimError::backend(format!(
                            "directory modify failed (rc={rc})"
                        )))),
                    }
                })
                .await?;
            }
            debug!(
                "ldap replaced {} {} (request {})",
                resource.name(),
                request.id,
                request.context.request_id
            );

            let entry = self
                .find_entry(&mapper, &request.id)
                .await?
                .ok_or_else(|| ScimError::backend("replaced entry could not be read back"))?;
            let object = self.objectify(&mapper, &entry)?;
            Ok(request.selection.apply(&object))
        })
        .await
    }

    async fn delete_resource(&self, request: &DeleteResourceRequest) -> ScimResult<()> {
        let mapper = self.mapper(request.resource.name())?;
        self.with_deadline(async {
            let entry = self
                .find_entry(&mapper, &request.id)
                .await?
                .ok_or_else(|| ScimError::not_found(request.resource.name(), &request.id))?;
            if let Some(expected) = &request.expected_version {
                let current = entry_version(&entry);
                if current != *expected {
                    return Err(ScimError::PreconditionFailed {
                        message: format!("version '{expected}' does not match current resource"),
                    });
                }
            }
            let dn = entry.dn.clone();
            self.retry("delete", async || {
                let mut conn = self.pool.acquire().await.map_err(OpError::Transport)?;
                let result = match conn.delete(&dn).await {
                    Ok(r) => r,
                    Err(e) => {
                        conn.discard();
                        return Err(e.into());
                    }
                };
                match result.rc {
                    0 => Ok(()),
                    RC_NO_SUCH_OBJECT => Err(OpError::Protocol(ScimError::not_found(
                        request.resource.name(),
                        &request.id,
                    ))),
                    rc => Err(OpError::Protocol(ScimError::backend(format!(
                        "directory delete failed (rc={rc})"
                    )))),
                }
            })
            .await
        })
        .await
    }

    async fn authenticate(
        &self,
        user: &str,
        password: &str,
        context: &RequestContext,
    ) -> ScimResult<()> {
        // The first mapper with a userName mapping names the entries users
        // bind as.
        let mapper = self
            .mappers
            .values()
            .find(|m| {
                !m.map_path(&AttrPath {
                    name: "userName".to_string(),
                    sub: None,
                })
                .is_empty()
            })
            .cloned()
            .ok_or_else(|| ScimError::NotImplemented {
                message: "no resource maps userName; authentication unavailable".to_string(),
            })?;
        self.with_deadline(async {
            let (ldap_attr, _) = mapper
                .map_path(&AttrPath {
                    name: "userName".to_string(),
                    sub: None,
                })
                .into_iter()
                .next()
                .expect("mapper was selected for its userName mapping");
            let filter = format!(
                "(&{}({}={}))",
                mapper.search_filter(),
                ldap_attr,
                ldap_escape(user)
            );
            let (_, entries) = self
                .collect(&mapper, &filter, Window::Slice { skip: 0, take: 1 })
                .await?;
            let entry = entries
                .into_iter()
                .next()
                .ok_or_else(|| ScimError::unauthorized("invalid credentials"))?;

            // Bind on a dedicated connection; binding changes a connection's
            // auth state, so pooled connections are never used here.
            let mut conn = self
                .pool
                .connect_unpooled()
                .await
                .map_err(|e| backend_fault("bind connect", e))?;
            let result = conn
                .simple_bind(&entry.dn, password)
                .await
                .map_err(|e| backend_fault("bind", e))?;
            drop(conn);
            match result.rc {
                0 => {
                    debug!("authenticated {user} (request {})", context.request_id);
                    Ok(())
                }
                RC_INVALID_CREDENTIALS => Err(ScimError::unauthorized("invalid credentials")),
                rc => Err(ScimError::backend(format!(
                    "directory bind failed (rc={rc})"
                ))),
            }
        })
        .await
    }
}

fn backend_fault(what: &str, e: LdapError) -> ScimError {
    error!("ldap {what} failed: {e}");
    ScimError::backend("directory operation failed")
}

fn is_transient(e: &LdapError) -> bool {
    matches!(
        e,
        LdapError::Io { .. } | LdapError::EndOfStream | LdapError::Timeout { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeouts_and_io_failures_are_transient() {
        let elapsed = tokio::time::timeout(Duration::from_nanos(1), futures::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(is_transient(&LdapError::Timeout { elapsed }));
        assert!(is_transient(&LdapError::EndOfStream));
    }

    #[test]
    fn retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert!(policy.initial_backoff < Duration::from_secs(1));
    }
}
