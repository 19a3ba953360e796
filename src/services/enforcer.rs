//! 权限执行引擎
//!
//! 内存中维护一份策略快照：角色的 URL 规则集合加上用户到角色的分组关系，
//! 请求期的 check 只读快照，不访问数据库。快照整体通过 Arc 原子替换，
//! 读方看到的要么是变更前、要么是变更后的完整状态，不会出现半成品。
//!
//! 引擎启动时处于未加载状态（快照为 None），第一次 check 会同步执行一次
//! 全量加载；宿主在进程启动后另行触发一次异步预热，让首个请求通常不用
//! 付出加载代价。重载失败时保留上一份可用快照继续服务。

use crate::{
    error::AppError,
    models::role::Role,
    models::user::{CurrentUser, User},
    repository::policy_repo::PolicyRepository,
};
use sqlx::PgPool;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// 规范化请求路径：去掉查询串、补前导斜杠、去掉末尾斜杠（根路径除外）
///
/// 路径和存储的规则模式采用同一套规范，带不带末尾斜杠的写法都能匹配。
pub fn normalize_path(raw: &str) -> String {
    let stripped = raw.split('?').next().unwrap_or(raw);

    let mut path = String::with_capacity(stripped.len() + 1);
    if !stripped.starts_with('/') {
        path.push('/');
    }
    path.push_str(stripped);

    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    path
}

/// 规范化规则模式：与 normalize_path 同一约定，末尾的 `*` 通配符保留
pub fn normalize_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 1);
    if !raw.starts_with('/') {
        pattern.push('/');
    }
    pattern.push_str(raw);

    while pattern.len() > 1 && pattern.ends_with('/') {
        pattern.pop();
    }

    pattern
}

/// 模式匹配：末尾 `*` 按前缀匹配任意剩余段，否则全等比较
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path == pattern,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PolicyPattern {
    path: String,
    method: String,
}

/// 内存策略快照。纯数据结构，所有操作不涉及 I/O。
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
    /// role_id -> 该角色的规则列表
    rules: HashMap<String, Vec<PolicyPattern>>,
    /// username -> 角色标识集合（一个用户可持有多个角色）
    groupings: HashMap<String, BTreeSet<String>>,
}

impl PolicySnapshot {
    /// 从全量数据构建快照，输入在此统一规范化
    pub fn from_parts<R, G>(rules: R, groupings: G) -> Self
    where
        R: IntoIterator<Item = (String, String, String)>,
        G: IntoIterator<Item = (String, String)>,
    {
        let mut snapshot = PolicySnapshot::default();
        for (role_id, path, method) in rules {
            snapshot.add_rule(&role_id, &path, &method);
        }
        for (username, role_id) in groupings {
            snapshot.add_grouping(&username, &role_id);
        }
        snapshot
    }

    /// 添加规则，已存在时返回 false
    pub fn add_rule(&mut self, role_id: &str, path: &str, method: &str) -> bool {
        let rule = PolicyPattern {
            path: normalize_pattern(path),
            method: method.to_uppercase(),
        };

        let rules = self.rules.entry(role_id.to_string()).or_default();
        if rules.contains(&rule) {
            return false;
        }
        rules.push(rule);
        true
    }

    /// 删除规则，不存在时返回 false
    pub fn remove_rule(&mut self, role_id: &str, path: &str, method: &str) -> bool {
        let rule = PolicyPattern {
            path: normalize_pattern(path),
            method: method.to_uppercase(),
        };

        let Some(rules) = self.rules.get_mut(role_id) else {
            return false;
        };

        let before = rules.len();
        rules.retain(|r| r != &rule);
        let removed = rules.len() != before;
        let now_empty = rules.is_empty();

        if now_empty {
            self.rules.remove(role_id);
        }

        removed
    }

    /// 删除角色的全部规则
    pub fn remove_role_rules(&mut self, role_id: &str) -> usize {
        self.rules.remove(role_id).map(|rules| rules.len()).unwrap_or(0)
    }

    /// 添加用户角色分组，已存在时返回 false
    pub fn add_grouping(&mut self, username: &str, role_id: &str) -> bool {
        self.groupings
            .entry(username.to_string())
            .or_default()
            .insert(role_id.to_string())
    }

    /// 删除用户角色分组，不存在时返回 false
    pub fn remove_grouping(&mut self, username: &str, role_id: &str) -> bool {
        let Some(roles) = self.groupings.get_mut(username) else {
            return false;
        };

        let removed = roles.remove(role_id);
        let now_empty = roles.is_empty();

        if now_empty {
            self.groupings.remove(username);
        }

        removed
    }

    /// 用户持有的角色标识集合
    pub fn roles_for(&self, username: &str) -> Vec<String> {
        self.groupings
            .get(username)
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 匹配判定：展开用户的角色集合，任一角色的任一规则命中即放行
    pub fn allows(&self, username: &str, path: &str, method: &str) -> bool {
        let normalized = normalize_path(path);
        let method = method.to_uppercase();

        let Some(roles) = self.groupings.get(username) else {
            return false;
        };

        roles.iter().any(|role_id| {
            self.rules.get(role_id).is_some_and(|rules| {
                rules
                    .iter()
                    .any(|rule| rule.method == method && pattern_matches(&rule.path, &normalized))
            })
        })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(|rules| rules.len()).sum()
    }

    pub fn grouping_count(&self) -> usize {
        self.groupings.values().map(|roles| roles.len()).sum()
    }
}

/// 权限判定的完整决策顺序（纯函数，便于用字面量夹具测试）
///
/// 未认证直接拒绝；超级用户直接放行，完全不做规则求值；
/// 其余按用户名展开角色集合，任一角色命中即放行。
pub fn authorize(
    subject: &CurrentUser,
    snapshot: &PolicySnapshot,
    path: &str,
    method: &str,
) -> bool {
    if !subject.is_authenticated {
        return false;
    }

    if subject.is_superuser {
        return true;
    }

    snapshot.allows(&subject.username, path, method)
}

/// 执行引擎运行时指标
#[derive(Debug, Clone, serde::Serialize)]
pub struct EnforcerStats {
    pub warm: bool,
    pub rule_count: usize,
    pub grouping_count: usize,
}

/// 权限执行引擎：持久策略存储 + 内存快照的组合
pub struct Enforcer {
    store: PolicyRepository,
    snapshot: RwLock<Option<Arc<PolicySnapshot>>>,
}

impl Enforcer {
    pub fn new(db: PgPool) -> Self {
        Self {
            store: PolicyRepository::new(db),
            snapshot: RwLock::new(None),
        }
    }

    /// 引擎是否已完成首次加载
    pub async fn is_warm(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    /// 启动预热：未加载时执行一次全量加载，失败只记日志，
    /// 留给首次 check 懒加载重试
    pub async fn warm_up(&self) {
        if self.is_warm().await {
            return;
        }

        if let Err(e) = self.reload().await {
            tracing::warn!(error = %e, "Policy warm-up failed, will retry on first check");
        }
    }

    /// 全量重载：先离线构建完整快照，再原子替换。
    /// 存储不可用时返回错误并保留现有快照。
    pub async fn reload(&self) -> Result<(), AppError> {
        let rules = self.store.all_rules().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to load policy rules, keeping current snapshot");
            AppError::StoreUnavailable
        })?;
        let groupings = self.store.all_groupings().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to load role groupings, keeping current snapshot");
            AppError::StoreUnavailable
        })?;

        let next = Arc::new(PolicySnapshot::from_parts(
            rules.into_iter().map(|r| (r.role_id, r.path, r.method)),
            groupings.into_iter().map(|g| (g.username, g.role_id)),
        ));

        let rule_count = next.rule_count();
        let grouping_count = next.grouping_count();

        *self.snapshot.write().await = Some(next);

        metrics::counter!("rbac_policy_reloads_total").increment(1);
        metrics::gauge!("rbac_policy_rules").set(rule_count as f64);
        metrics::gauge!("rbac_policy_groupings").set(grouping_count as f64);

        tracing::info!(rule_count, grouping_count, "Policy snapshot reloaded");
        Ok(())
    }

    /// 获取当前快照；未加载时同步执行一次全量加载
    async fn current_or_load(&self) -> Result<Arc<PolicySnapshot>, AppError> {
        {
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref() {
                return Ok(Arc::clone(snapshot));
            }
        }

        self.reload().await?;

        self.snapshot
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or(AppError::StoreUnavailable)
    }

    /// 权限判定，决策顺序见 [`authorize`]
    pub async fn check(
        &self,
        subject: &CurrentUser,
        path: &str,
        method: &str,
    ) -> Result<bool, AppError> {
        // 匿名与超级用户的判定不需要策略快照
        if !subject.is_authenticated || subject.is_superuser {
            return Ok(authorize(subject, &PolicySnapshot::default(), path, method));
        }

        let snapshot = self.current_or_load().await?;
        Ok(authorize(subject, &snapshot, path, method))
    }

    /// 用户当前在快照中的角色集合（诊断用）
    pub async fn roles_for(&self, username: &str) -> Result<Vec<String>, AppError> {
        let snapshot = self.current_or_load().await?;
        Ok(snapshot.roles_for(username))
    }

    /// 在当前快照上做写时复制变更并原子替换。
    /// 引擎尚未加载时跳过（首次加载自然会读到最新存储状态）。
    async fn apply<F>(&self, mutate: F)
    where
        F: FnOnce(&mut PolicySnapshot),
    {
        let mut guard = self.snapshot.write().await;
        if let Some(current) = guard.as_ref() {
            let mut next = PolicySnapshot::clone(current);
            mutate(&mut next);
            *guard = Some(Arc::new(next));
        }
    }

    /// 授予策略规则：先写存储再同步缓存。
    /// 已存在时返回 Ok(false)，缓存同样收敛到含该规则的状态。
    pub async fn add_rule(
        &self,
        role_id: &str,
        path: &str,
        method: &str,
    ) -> Result<bool, AppError> {
        let path = normalize_pattern(path);
        let method = method.to_uppercase();

        let created = match self.store.insert_rule(role_id, &path, &method).await {
            Ok(_) => true,
            Err(AppError::DuplicateRule) => false,
            Err(e) => return Err(e),
        };

        self.apply(|s| {
            s.add_rule(role_id, &path, &method);
        })
        .await;

        if created {
            tracing::info!(role_id, %path, %method, "Policy rule granted");
        }

        Ok(created)
    }

    /// 撤销策略规则：先写存储再同步缓存。不存在时返回 Ok(false)。
    pub async fn remove_rule(
        &self,
        role_id: &str,
        path: &str,
        method: &str,
    ) -> Result<bool, AppError> {
        let path = normalize_pattern(path);
        let method = method.to_uppercase();

        let removed = self.store.delete_rule(role_id, &path, &method).await?;

        self.apply(|s| {
            s.remove_rule(role_id, &path, &method);
        })
        .await;

        if removed {
            tracing::info!(role_id, %path, %method, "Policy rule revoked");
        }

        Ok(removed)
    }

    /// 为用户分配角色：先写存储再同步缓存。已存在时返回 Ok(false)。
    pub async fn add_grouping(&self, user: &User, role: &Role) -> Result<bool, AppError> {
        let created = match self.store.insert_assignment(user.id, role.id).await {
            Ok(_) => true,
            Err(AppError::DuplicateAssignment) => false,
            Err(e) => return Err(e),
        };

        // 停用的角色不进入执行缓存
        if role.is_active {
            self.apply(|s| {
                s.add_grouping(&user.username, &role.role_id);
            })
            .await;
        }

        Ok(created)
    }

    /// 撤销用户角色：先写存储再同步缓存，立刻对后续 check 生效
    pub async fn remove_grouping(&self, user: &User, role: &Role) -> Result<bool, AppError> {
        let removed = self.store.delete_assignment(user.id, role.id).await?;

        self.apply(|s| {
            s.remove_grouping(&user.username, &role.role_id);
        })
        .await;

        Ok(removed)
    }

    /// 全量替换角色的规则集合（权限分配界面的 diff-and-replace 语义）
    ///
    /// 存储写到一半失败时强制重载收敛缓存；连重载都失败则上报 Sync 错误。
    pub async fn replace_role_rules(
        &self,
        role_id: &str,
        entries: &[(String, String)],
    ) -> Result<usize, AppError> {
        self.store.delete_rules_for_role(role_id).await?;

        let mut normalized = Vec::with_capacity(entries.len());
        for (path, method) in entries {
            let path = normalize_pattern(path);
            let method = method.to_uppercase();

            match self.store.insert_rule(role_id, &path, &method).await {
                // 请求内的重复条目按幂等处理
                Ok(_) | Err(AppError::DuplicateRule) => normalized.push((path, method)),
                Err(e) => {
                    if let Err(reload_err) = self.reload().await {
                        tracing::error!(
                            role_id,
                            error = %e,
                            reload_error = %reload_err,
                            "Policy replace failed and cache could not be reconverged"
                        );
                        return Err(AppError::Sync(format!(
                            "policy replace failed: {e}; reload failed: {reload_err}"
                        )));
                    }
                    return Err(e);
                }
            }
        }

        let applied = normalized.len();
        self.apply(|s| {
            s.remove_role_rules(role_id);
            for (path, method) in &normalized {
                s.add_rule(role_id, path, method);
            }
        })
        .await;

        tracing::info!(role_id, applied, "Role policy rules replaced");
        Ok(applied)
    }

    /// 删除角色遗留的规则与分组（角色删除流程调用）
    pub async fn purge_role(&self, role_id: &str) -> Result<u64, AppError> {
        let deleted = self.store.delete_rules_for_role(role_id).await?;

        self.apply(|s| {
            s.remove_role_rules(role_id);
            let usernames: Vec<String> = s
                .groupings
                .iter()
                .filter(|(_, roles)| roles.contains(role_id))
                .map(|(username, _)| username.clone())
                .collect();
            for username in usernames {
                s.remove_grouping(&username, role_id);
            }
        })
        .await;

        Ok(deleted)
    }

    /// 从缓存清理某个用户的全部分组（账户停用流程调用）
    ///
    /// 存储中的分配保留不动，全量重载时会按账户激活状态自然过滤。
    pub async fn purge_user(&self, username: &str) {
        self.apply(|s| {
            s.groupings.remove(username);
        })
        .await;
    }

    /// 当前运行状态，供指标端点使用
    pub async fn stats(&self) -> EnforcerStats {
        let guard = self.snapshot.read().await;
        match guard.as_ref() {
            Some(snapshot) => EnforcerStats {
                warm: true,
                rule_count: snapshot.rule_count(),
                grouping_count: snapshot.grouping_count(),
            },
            None => EnforcerStats {
                warm: false,
                rule_count: 0,
                grouping_count: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_strips_query() {
        assert_eq!(normalize_path("/api/v1/users?page=2"), "/api/v1/users");
    }

    #[test]
    fn test_normalize_path_leading_slash() {
        assert_eq!(normalize_path("api/v1/users"), "/api/v1/users");
    }

    #[test]
    fn test_normalize_path_trailing_slash() {
        assert_eq!(normalize_path("/api/v1/users/"), "/api/v1/users");
        assert_eq!(normalize_path("/api/v1/users///"), "/api/v1/users");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_normalize_pattern_keeps_wildcard() {
        assert_eq!(normalize_pattern("/rbac/api/*"), "/rbac/api/*");
        assert_eq!(normalize_pattern("/rbac/api/users/"), "/rbac/api/users");
        assert_eq!(normalize_pattern("rbac/api/users"), "/rbac/api/users");
    }

    #[test]
    fn test_pattern_matches_exact() {
        assert!(pattern_matches("/api/v1/users", "/api/v1/users"));
        assert!(!pattern_matches("/api/v1/users", "/api/v1/users/abc"));
    }

    #[test]
    fn test_pattern_matches_wildcard() {
        assert!(pattern_matches("/rbac/api/*", "/rbac/api/users"));
        assert!(pattern_matches("/rbac/api/*", "/rbac/api/anything/nested"));
        // 通配符前缀本身不在匹配范围内
        assert!(!pattern_matches("/rbac/api/*", "/rbac/api"));
        assert!(!pattern_matches("/rbac/api/*", "/rbac/other"));
    }

    #[test]
    fn test_snapshot_method_case_insensitive() {
        let mut snapshot = PolicySnapshot::default();
        snapshot.add_rule("r1", "/api/v1/users", "get");
        snapshot.add_grouping("alice", "r1");

        assert!(snapshot.allows("alice", "/api/v1/users", "GET"));
        assert!(snapshot.allows("alice", "/api/v1/users", "get"));
        assert!(!snapshot.allows("alice", "/api/v1/users", "POST"));
    }

    #[test]
    fn test_snapshot_remove_rule_cleans_empty_role() {
        let mut snapshot = PolicySnapshot::default();
        snapshot.add_rule("r1", "/api/v1/users", "GET");
        assert!(snapshot.remove_rule("r1", "/api/v1/users/", "get"));
        assert_eq!(snapshot.rule_count(), 0);
        assert!(!snapshot.remove_rule("r1", "/api/v1/users", "GET"));
    }
}
