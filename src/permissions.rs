//! Role and department permission checks.
//!
//! `ADMIN` bypasses everything. Every other role resolves through the stored
//! `(department, module)` row, defaulting to read-only when no row exists.
//! Resolved sets are cached per `(department, module)` for a short TTL.
use std::{future::Future, sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    cache::TtlCache,
    error::{ApiResult, api_forbidden},
    models::{DepartmentPermission, Module, ModulePermission, Role},
    repository::{RepositoryState, StoreResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Delete,
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionSet {
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
}

impl PermissionSet {
    pub const FULL: PermissionSet = PermissionSet {
        can_read: true,
        can_write: true,
        can_delete: true,
    };

    pub const READ_ONLY: PermissionSet = PermissionSet {
        can_read: true,
        can_write: false,
        can_delete: false,
    };

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => self.can_read,
            Action::Write => self.can_write,
            Action::Delete => self.can_delete,
        }
    }

    pub fn for_module(&self, module: Module) -> ModulePermission {
        ModulePermission {
            module,
            can_read: self.can_read,
            can_write: self.can_write,
            can_delete: self.can_delete,
        }
    }
}

/// Pure permission resolution for one module.
pub fn resolve(role: Role, row: Option<&DepartmentPermission>) -> PermissionSet {
    if role == Role::Admin {
        return PermissionSet::FULL;
    }
    match row {
        None => PermissionSet::READ_ONLY,
        Some(row) => PermissionSet {
            can_read: row.can_read,
            can_write: row.can_write,
            can_delete: row.can_delete,
        },
    }
}

/// require_role
///
/// 403 unless the caller holds one of `allowed`.
pub fn require_role(user: &AuthUser, allowed: &[Role]) -> ApiResult<()> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(api_forbidden("insufficient role for this operation"))
    }
}

type CacheKey = (Uuid, Module);

/// Cached rows plus a generation that every invalidation bumps. A lookup that
/// started before an invalidation must not repopulate the cache.
struct PermissionCache {
    entries: TtlCache<CacheKey, Option<DepartmentPermission>>,
    generation: u64,
}

/// PermissionService
///
/// Resolves department permissions through the repository with a shared TTL/LRU
/// cache in front of it. Cloning shares the cache.
#[derive(Clone)]
pub struct PermissionService {
    repo: RepositoryState,
    cache: Arc<Mutex<PermissionCache>>,
}

impl PermissionService {
    pub fn new(repo: RepositoryState, capacity: usize, ttl: Duration) -> Self {
        Self {
            repo,
            cache: Arc::new(Mutex::new(PermissionCache {
                entries: TtlCache::new(capacity, ttl),
                generation: 0,
            })),
        }
    }

    /// check_user_permissions
    ///
    /// Users without a department have no row and resolve read-only.
    pub async fn check_user_permissions(
        &self,
        user: &AuthUser,
        module: Module,
    ) -> StoreResult<PermissionSet> {
        if user.role == Role::Admin {
            return Ok(PermissionSet::FULL);
        }
        let Some(department_id) = user.department_id else {
            return Ok(resolve(user.role, None));
        };

        let row = self
            .cached_row((department_id, module), || {
                self.repo.get_permission(department_id, module)
            })
            .await?;
        Ok(resolve(user.role, row.as_ref()))
    }

    async fn cached_row<F, Fut>(
        &self,
        key: CacheKey,
        fetch: F,
    ) -> StoreResult<Option<DepartmentPermission>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<Option<DepartmentPermission>>>,
    {
        let generation = {
            let mut cache = self.cache.lock().await;
            if let Some(row) = cache.entries.get(&key) {
                return Ok(row);
            }
            cache.generation
        };

        let row = fetch().await?;
        let (department_id, module) = key;
        tracing::debug!(%department_id, module = module.as_str(), found = row.is_some(), "permission cache miss");

        let mut cache = self.cache.lock().await;
        if cache.generation == generation {
            cache.entries.insert(key, row.clone());
        } else {
            tracing::debug!(%department_id, "permissions changed during lookup, result not cached");
        }
        Ok(row)
    }

    /// require_permission
    ///
    /// 403 when the resolved set for `module` does not allow `action`.
    pub async fn require(&self, user: &AuthUser, module: Module, action: Action) -> ApiResult<()> {
        let set = self.check_user_permissions(user, module).await?;
        if set.allows(action) {
            Ok(())
        } else {
            Err(api_forbidden(&format!(
                "no {} permission on {}",
                action.verb(),
                module.as_str()
            )))
        }
    }

    /// Resolved flags for every module, for the profile endpoint.
    pub async fn permission_map(&self, user: &AuthUser) -> StoreResult<Vec<ModulePermission>> {
        let mut out = Vec::with_capacity(Module::ALL.len());
        for module in Module::ALL {
            let set = self.check_user_permissions(user, module).await?;
            out.push(set.for_module(module));
        }
        Ok(out)
    }

    pub async fn invalidate_department(&self, department_id: Uuid) {
        let mut cache = self.cache.lock().await;
        cache.generation += 1;
        cache.entries.retain(|(dept, _), _| *dept != department_id);
    }

    pub async fn invalidate_all(&self) {
        let mut cache = self.cache.lock().await;
        cache.generation += 1;
        cache.entries.clear();
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(read: bool, write: bool, delete: bool) -> DepartmentPermission {
        DepartmentPermission {
            id: Uuid::new_v4(),
            department_id: Uuid::new_v4(),
            module: Module::Assets,
            can_read: read,
            can_write: write,
            can_delete: delete,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_gets_everything_regardless_of_row() {
        let denied = row(false, false, false);
        assert_eq!(resolve(Role::Admin, Some(&denied)), PermissionSet::FULL);
        assert_eq!(resolve(Role::Admin, None), PermissionSet::FULL);
    }

    #[test]
    fn missing_row_defaults_to_read_only() {
        let set = resolve(Role::User, None);
        assert!(set.allows(Action::Read));
        assert!(!set.allows(Action::Write));
        assert!(!set.allows(Action::Delete));
    }

    #[test]
    fn stored_flags_are_used_verbatim() {
        let set = resolve(Role::Manager, Some(&row(false, true, false)));
        assert!(!set.allows(Action::Read));
        assert!(set.allows(Action::Write));
        assert!(!set.allows(Action::Delete));
    }

    #[test]
    fn require_role_checks_membership() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "u@example.com".into(),
            role: Role::Manager,
            department_id: None,
        };
        assert!(require_role(&user, &[Role::Admin, Role::Manager]).is_ok());
        let err = require_role(&user, &[Role::Admin]).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::FORBIDDEN);
    }

    async fn service() -> PermissionService {
        let repo = crate::repository::SqliteRepository::in_memory().await.unwrap();
        PermissionService::new(Arc::new(repo), 16, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn lookup_result_is_cached() {
        let service = service().await;
        let key = (Uuid::new_v4(), Module::Assets);

        let first = service
            .cached_row(key, || async { Ok(Some(row(true, true, false))) })
            .await
            .unwrap();
        assert_eq!(service.cached_entries().await, 1);

        // Served from the cache; the fetch is not consulted.
        let second = service
            .cached_row(key, || async { Ok(None) })
            .await
            .unwrap();
        assert_eq!(second.map(|r| r.id), first.map(|r| r.id));
    }

    #[tokio::test]
    async fn invalidation_during_lookup_discards_the_stale_row() {
        let service = service().await;
        let department_id = Uuid::new_v4();
        let key = (department_id, Module::Assets);

        // The permission write lands while the read is in flight.
        let stale = service
            .cached_row(key, || async {
                let old = row(true, true, true);
                service.invalidate_department(department_id).await;
                Ok(Some(old))
            })
            .await
            .unwrap();
        assert!(stale.is_some_and(|r| r.can_delete));
        assert_eq!(service.cached_entries().await, 0);

        let fresh = service
            .cached_row(key, || async { Ok(Some(row(true, false, false))) })
            .await
            .unwrap();
        assert!(fresh.is_some_and(|r| !r.can_delete));
        assert_eq!(service.cached_entries().await, 1);
    }

    #[tokio::test]
    async fn invalidate_all_also_discards_in_flight_lookups() {
        let service = service().await;
        let key = (Uuid::new_v4(), Module::Documents);

        service
            .cached_row(key, || async {
                service.invalidate_all().await;
                Ok(None)
            })
            .await
            .unwrap();
        assert_eq!(service.cached_entries().await, 0);
    }
}
