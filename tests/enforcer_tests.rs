//! 权限执行引擎单元测试
//!
//! 覆盖判定顺序、通配符匹配、路径规范化和快照的幂等增删，
//! 全部基于内存快照，不依赖数据库。

use rbac_system::models::user::CurrentUser;
use rbac_system::services::enforcer::{
    authorize, normalize_path, normalize_pattern, pattern_matches, PolicySnapshot,
};
use uuid::Uuid;

/// 创建已认证的普通用户主体
fn subject(username: &str) -> CurrentUser {
    CurrentUser {
        id: Some(Uuid::new_v4()),
        username: username.to_string(),
        is_authenticated: true,
        is_superuser: false,
        department_id: None,
        scope_override: None,
    }
}

/// 创建超级用户主体
fn superuser(username: &str) -> CurrentUser {
    CurrentUser {
        is_superuser: true,
        ..subject(username)
    }
}

/// 测试超级用户绕过：无论策略内容如何都放行
#[test]
fn test_superuser_always_allowed() {
    let empty = PolicySnapshot::default();
    let admin = superuser("admin");

    for (path, method) in [
        ("/api/v1/users", "GET"),
        ("/api/v1/users/abc", "DELETE"),
        ("/anything/at/all", "POST"),
        ("/", "PUT"),
    ] {
        assert!(authorize(&admin, &empty, path, method));
    }

    // 策略里明确没有授权给 admin 的规则也一样放行
    let mut snapshot = PolicySnapshot::default();
    snapshot.add_rule("r1", "/api/v1/users", "GET");
    assert!(authorize(&admin, &snapshot, "/api/v1/secret", "DELETE"));
}

/// 测试未认证主体始终拒绝，即使规则能匹配上
#[test]
fn test_anonymous_always_denied() {
    let mut snapshot = PolicySnapshot::default();
    snapshot.add_rule("r1", "/api/v1/users", "GET");
    snapshot.add_grouping("", "r1");

    let anon = CurrentUser::anonymous();
    assert!(!authorize(&anon, &snapshot, "/api/v1/users", "GET"));
}

/// 测试默认拒绝：没有角色、没有授权的用户处处被拒
#[test]
fn test_deny_by_default() {
    let mut snapshot = PolicySnapshot::default();
    snapshot.add_rule("r1", "/api/v1/users", "GET");
    snapshot.add_grouping("alice", "r1");

    let nobody = subject("nobody");
    for (path, method) in [
        ("/api/v1/users", "GET"),
        ("/api/v1/roles", "GET"),
        ("/api/v1/articles", "POST"),
    ] {
        assert!(!authorize(&nobody, &snapshot, path, method));
    }
}

/// 测试通配符匹配：前缀命中任意剩余段，方法不匹配则拒绝
#[test]
fn test_wildcard_rule_matching() {
    let mut snapshot = PolicySnapshot::default();
    snapshot.add_rule("r1", "/rbac/api/*", "GET");
    snapshot.add_grouping("alice", "r1");

    let alice = subject("alice");

    assert!(authorize(&alice, &snapshot, "/rbac/api/users/", "GET"));
    assert!(authorize(&alice, &snapshot, "/rbac/api/anything/nested/", "GET"));
    assert!(authorize(&alice, &snapshot, "/rbac/api/users?page=2", "GET"));

    // 同一路径换成 POST 不放行
    assert!(!authorize(&alice, &snapshot, "/rbac/api/users/", "POST"));
    // 通配符前缀之外的路径不放行
    assert!(!authorize(&alice, &snapshot, "/rbac/other/users", "GET"));
}

/// 测试幂等授权：重复添加只保留一条规则且第二次报告已存在
#[test]
fn test_idempotent_grant() {
    let mut snapshot = PolicySnapshot::default();

    assert!(snapshot.add_rule("r1", "/api/v1/widgets", "GET"));
    assert!(!snapshot.add_rule("r1", "/api/v1/widgets", "GET"));
    // 换一种等价写法也视为同一条规则
    assert!(!snapshot.add_rule("r1", "/api/v1/widgets/", "get"));

    assert_eq!(snapshot.rule_count(), 1);

    // 重建快照后判定结果不变
    snapshot.add_grouping("alice", "r1");
    let rebuilt = PolicySnapshot::from_parts(
        [("r1".to_string(), "/api/v1/widgets".to_string(), "GET".to_string())],
        [("alice".to_string(), "r1".to_string())],
    );

    let alice = subject("alice");
    assert_eq!(
        authorize(&alice, &snapshot, "/api/v1/widgets", "GET"),
        authorize(&alice, &rebuilt, "/api/v1/widgets", "GET"),
    );
}

/// 测试撤销角色立即生效：移除分组后下一次判定即拒绝
#[test]
fn test_revoked_grouping_denies_immediately() {
    let mut snapshot = PolicySnapshot::default();
    snapshot.add_rule("r1", "/api/widgets", "GET");
    snapshot.add_grouping("u1", "r1");

    let u1 = subject("u1");
    assert!(authorize(&u1, &snapshot, "/api/widgets/", "GET"));

    assert!(snapshot.remove_grouping("u1", "r1"));
    assert!(!authorize(&u1, &snapshot, "/api/widgets/", "GET"));

    // 再次移除报告不存在
    assert!(!snapshot.remove_grouping("u1", "r1"));
}

/// 测试多角色是任一命中放行，而不是全部命中
#[test]
fn test_multiple_roles_allow_if_any() {
    let mut snapshot = PolicySnapshot::default();
    snapshot.add_rule("viewer", "/api/v1/articles", "GET");
    snapshot.add_rule("editor", "/api/v1/articles", "POST");
    snapshot.add_grouping("bob", "viewer");
    snapshot.add_grouping("bob", "editor");

    let bob = subject("bob");
    assert!(authorize(&bob, &snapshot, "/api/v1/articles", "GET"));
    assert!(authorize(&bob, &snapshot, "/api/v1/articles", "POST"));
    assert!(!authorize(&bob, &snapshot, "/api/v1/articles", "DELETE"));
}

/// 测试末尾斜杠两种写法互相匹配（统一剥离后比较）
#[test]
fn test_trailing_slash_convention() {
    let mut snapshot = PolicySnapshot::default();
    snapshot.add_rule("r1", "/rbac/api/users/", "GET");
    snapshot.add_grouping("alice", "r1");

    let alice = subject("alice");
    assert!(authorize(&alice, &snapshot, "/rbac/api/users", "GET"));
    assert!(authorize(&alice, &snapshot, "/rbac/api/users/", "GET"));
}

/// 测试分组键是角色外部标识字符串，而不是角色名
#[test]
fn test_grouping_keyed_by_role_id() {
    let mut snapshot = PolicySnapshot::default();
    snapshot.add_rule("2", "/rbac/api/users", "GET");
    snapshot.add_grouping("alice", "2");

    assert_eq!(snapshot.roles_for("alice"), vec!["2".to_string()]);
    assert!(snapshot.roles_for("unknown").is_empty());
}

/// 测试路径规范化边界
#[test]
fn test_path_normalization_edges() {
    assert_eq!(normalize_path("/api/v1/users?page=1&size=20"), "/api/v1/users");
    assert_eq!(normalize_path("api/v1/users/"), "/api/v1/users");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path("?x=1"), "/");
}

/// 测试模式规范化保留通配符
#[test]
fn test_pattern_normalization() {
    assert_eq!(normalize_pattern("/rbac/api/*"), "/rbac/api/*");
    assert_eq!(normalize_pattern("rbac/api/users/"), "/rbac/api/users");
}

/// 测试通配符前缀比较的严格性
#[test]
fn test_wildcard_prefix_boundary() {
    // "/rbac/api" 本身不被 "/rbac/api/*" 命中
    assert!(!pattern_matches("/rbac/api/*", "/rbac/api"));
    // 前缀相似但段不同的路径不命中
    assert!(!pattern_matches("/rbac/api/*", "/rbac/apix/users"));
}
