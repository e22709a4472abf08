mod common;

use oxiam_common::roles::DEFAULT_ROLES;
use oxiam_storage::store::UserListFilter;

const SHORT_CODES: [&str; 5] = ["logged", "user", "admin", "root", "api"];

#[tokio::test]
async fn test_seeding_creates_one_role_per_registered_name() {
    let ctx = common::build_test_context()
        .await
        .expect("context should build");
    let refs = common::seed_fixtures(&ctx).await.expect("seed should run");

    let store = &ctx.state.store;
    assert_eq!(
        store.count_roles().await.expect("count should work"),
        DEFAULT_ROLES.len() as i64
    );

    let roles = store.list_roles().await.expect("list should work");
    for name in DEFAULT_ROLES {
        assert!(
            roles.iter().any(|r| r.id == name),
            "missing seeded role {name}"
        );
    }

    let admin = roles
        .iter()
        .find(|r| r.id == "ROLE_ADMIN")
        .expect("admin role should exist");
    assert_eq!(admin.short, "admin");
    assert_eq!(admin.description, "Description - ROLE_ADMIN");

    // 每个角色都能通过引用键取回
    for short in SHORT_CODES {
        let role = refs
            .role(&format!("Role-{short}"))
            .expect("role reference should resolve");
        assert_eq!(role.short, short);
    }
}

#[tokio::test]
async fn test_seeding_creates_one_group_per_role() {
    let ctx = common::build_test_context()
        .await
        .expect("context should build");
    let refs = common::seed_fixtures(&ctx).await.expect("seed should run");

    let store = &ctx.state.store;
    assert_eq!(
        store.count_user_groups().await.expect("count should work"),
        DEFAULT_ROLES.len() as i64
    );

    let groups = store
        .list_user_groups(None)
        .await
        .expect("list should work");
    for group in &groups {
        assert!(
            DEFAULT_ROLES.contains(&group.role_id.as_str()),
            "group {} links unknown role {}",
            group.id,
            group.role_id
        );
    }

    let api_groups = store
        .list_user_groups(Some("ROLE_API"))
        .await
        .expect("list should work");
    assert_eq!(api_groups.len(), 1);
    assert_eq!(api_groups[0].name, "Group - ROLE_API");

    let api_ref = refs
        .user_group("UserGroup-api")
        .expect("group reference should resolve");
    assert_eq!(api_ref.id, api_groups[0].id);
}

#[tokio::test]
async fn test_seeding_creates_one_user_per_role_plus_ungrouped_default() {
    let ctx = common::build_test_context()
        .await
        .expect("context should build");
    let refs = common::seed_fixtures(&ctx).await.expect("seed should run");

    let store = &ctx.state.store;
    assert_eq!(
        store
            .count_users(&UserListFilter::default())
            .await
            .expect("count should work"),
        DEFAULT_ROLES.len() as i64 + 1
    );

    // 默认用户不挂任何组
    let john = store
        .get_user_by_username("john")
        .await
        .expect("query should work")
        .expect("john should exist");
    assert_eq!(john.email, "john.doe@test.com");
    assert!(store
        .list_user_group_ids(&john.id)
        .await
        .expect("query should work")
        .is_empty());
    assert!(
        oxiam_storage::auth::verify_password("password", &john.password_hash)
            .expect("verify should work")
    );

    // 带角色后缀的用户挂进对应的组，口令按后缀派生
    let admin = store
        .get_user_by_username("john-admin")
        .await
        .expect("query should work")
        .expect("john-admin should exist");
    assert_eq!(admin.email, "john.doe-admin@test.com");
    let group_ids = store
        .list_user_group_ids(&admin.id)
        .await
        .expect("query should work");
    let admin_group = refs
        .user_group("UserGroup-admin")
        .expect("group reference should resolve");
    assert_eq!(group_ids, vec![admin_group.id.clone()]);
    assert!(
        oxiam_storage::auth::verify_password("password-admin", &admin.password_hash)
            .expect("verify should work")
    );
}

#[tokio::test]
async fn test_reference_keys_follow_the_naming_contract() {
    let ctx = common::build_test_context()
        .await
        .expect("context should build");
    let refs = common::seed_fixtures(&ctx).await.expect("seed should run");

    assert!(refs.get("Role-admin").is_some());
    assert!(refs.get("UserGroup-admin").is_some());
    assert!(refs.get("User-john-admin").is_some());
    assert!(refs.get("User-john").is_some());
    assert!(refs.get("Role-ROLE_ADMIN").is_none());

    // 5 角色 + 5 用户组 + 6 用户
    assert_eq!(refs.len(), 16);
}
