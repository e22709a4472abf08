use crate::entity_manager::{EntityManager, EntityRecord, KIND_ROLE, KIND_USER};
use crate::error::StorageError;
use crate::store::{UserListFilter, UserStore};
use chrono::Utc;
use oxiam_common::types::{Role, User, UserGroup};
use tempfile::TempDir;

async fn setup() -> (TempDir, UserStore) {
    oxiam_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("oxiam.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let store = UserStore::new(&db_url, dir.path()).await.unwrap();
    (dir, store)
}

fn make_role(name: &str, short: &str) -> Role {
    let now = Utc::now();
    Role {
        id: name.to_string(),
        short: short.to_string(),
        description: format!("Description - {name}"),
        created_at: now,
        updated_at: now,
    }
}

fn make_group(id: &str, role_id: &str, name: &str) -> UserGroup {
    let now = Utc::now();
    UserGroup {
        id: id.to_string(),
        role_id: role_id.to_string(),
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn make_user(id: &str, username: &str) -> User {
    let now = Utc::now();
    User {
        id: id.to_string(),
        username: username.to_string(),
        firstname: "John".to_string(),
        surname: "Doe".to_string(),
        email: format!("{username}@test.com"),
        password_hash: "$2b$04$placeholder-hash".to_string(),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn insert_and_get_role() {
    let (_dir, store) = setup().await;

    store
        .insert_role(&make_role("ROLE_ADMIN", "admin"))
        .await
        .unwrap();

    let found = store.get_role("ROLE_ADMIN").await.unwrap().unwrap();
    assert_eq!(found.short, "admin");
    assert_eq!(found.description, "Description - ROLE_ADMIN");
    assert!(store.get_role("ROLE_MISSING").await.unwrap().is_none());
}

#[tokio::test]
async fn list_roles_ordered_by_id() {
    let (_dir, store) = setup().await;

    store
        .insert_role(&make_role("ROLE_USER", "user"))
        .await
        .unwrap();
    store
        .insert_role(&make_role("ROLE_ADMIN", "admin"))
        .await
        .unwrap();

    let roles = store.list_roles().await.unwrap();
    assert_eq!(roles.len(), 2);
    assert_eq!(roles[0].id, "ROLE_ADMIN");
    assert_eq!(roles[1].id, "ROLE_USER");
    assert_eq!(store.count_roles().await.unwrap(), 2);
}

#[tokio::test]
async fn list_user_groups_filters_by_role() {
    let (_dir, store) = setup().await;

    store
        .insert_user_group(&make_group("g1", "ROLE_ADMIN", "Group - ROLE_ADMIN"))
        .await
        .unwrap();
    store
        .insert_user_group(&make_group("g2", "ROLE_USER", "Group - ROLE_USER"))
        .await
        .unwrap();

    let all = store.list_user_groups(None).await.unwrap();
    assert_eq!(all.len(), 2);

    let admin_only = store.list_user_groups(Some("ROLE_ADMIN")).await.unwrap();
    assert_eq!(admin_only.len(), 1);
    assert_eq!(admin_only[0].id, "g1");
}

#[tokio::test]
async fn flush_writes_user_with_memberships() {
    let (_dir, store) = setup().await;
    let em = EntityManager::new(store.connection());

    store
        .insert_user_group(&make_group("g1", "ROLE_ADMIN", "Group - ROLE_ADMIN"))
        .await
        .unwrap();

    em.persist(EntityRecord::User {
        user: make_user("u1", "john-admin"),
        group_ids: vec!["g1".to_string()],
    });
    assert_eq!(em.pending_count(), 1);
    let flushed = em.flush().await.unwrap();
    assert_eq!(flushed, 1);
    assert_eq!(em.pending_count(), 0);

    let user = store.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.username, "john-admin");
    let group_ids = store.list_user_group_ids("u1").await.unwrap();
    assert_eq!(group_ids, vec!["g1".to_string()]);
}

#[tokio::test]
async fn persist_replaces_record_with_same_kind_and_id() {
    let (_dir, store) = setup().await;
    let em = EntityManager::new(store.connection());

    let mut user = make_user("u1", "john");
    em.persist(EntityRecord::User {
        user: user.clone(),
        group_ids: vec![],
    });
    user.email = "changed@test.com".to_string();
    em.persist(EntityRecord::User {
        user,
        group_ids: vec![],
    });
    assert_eq!(em.pending_count(), 1);

    let flushed = em.flush().await.unwrap();
    assert_eq!(flushed, 1);
    let stored = store.get_user("u1").await.unwrap().unwrap();
    assert_eq!(stored.email, "changed@test.com");
}

#[tokio::test]
async fn detach_drops_staged_record_before_flush() {
    let (_dir, store) = setup().await;
    let em = EntityManager::new(store.connection());

    em.persist(EntityRecord::User {
        user: make_user("u1", "john"),
        group_ids: vec![],
    });
    assert!(em.is_managed(KIND_USER, "u1"));
    assert!(em.detach(KIND_USER, "u1"));
    assert!(!em.is_managed(KIND_USER, "u1"));
    assert!(!em.detach(KIND_USER, "u1"));

    assert_eq!(em.flush().await.unwrap(), 0);
    assert!(store.get_user("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn find_sees_staged_and_committed_records() {
    let (_dir, store) = setup().await;
    let em = EntityManager::new(store.connection());

    em.persist(EntityRecord::Role(make_role("ROLE_ADMIN", "admin")));
    assert!(em.find(KIND_ROLE, "ROLE_ADMIN").await.unwrap());

    em.flush().await.unwrap();
    assert!(em.find(KIND_ROLE, "ROLE_ADMIN").await.unwrap());
    assert!(!em.find(KIND_ROLE, "ROLE_MISSING").await.unwrap());
    assert!(em.find("bogus_kind", "x").await.is_err());
}

#[tokio::test]
async fn failed_flush_clears_pending_set() {
    let (_dir, store) = setup().await;
    let em = EntityManager::new(store.connection());

    em.persist(EntityRecord::User {
        user: make_user("u1", "duplicate"),
        group_ids: vec![],
    });
    em.flush().await.unwrap();

    // 同 username 不同 id，触发 UNIQUE 约束
    em.persist(EntityRecord::User {
        user: make_user("u2", "duplicate"),
        group_ids: vec![],
    });
    assert!(em.flush().await.is_err());
    assert_eq!(em.pending_count(), 0);
    assert!(store.get_user("u2").await.unwrap().is_none());
}

#[tokio::test]
async fn get_user_by_email_reports_non_unique_rows() {
    let (_dir, store) = setup().await;
    let em = EntityManager::new(store.connection());

    let mut first = make_user("u1", "john");
    first.email = "shared@test.com".to_string();
    let mut second = make_user("u2", "jane");
    second.email = "shared@test.com".to_string();
    em.persist(EntityRecord::User {
        user: first,
        group_ids: vec![],
    });
    em.persist(EntityRecord::User {
        user: second,
        group_ids: vec![],
    });
    em.flush().await.unwrap();

    let err = store.get_user_by_email("shared@test.com").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StorageError>(),
        Some(StorageError::NonUnique { .. })
    ));

    assert!(store
        .get_user_by_email("nobody@test.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn flush_rebuilds_memberships_on_update() {
    let (_dir, store) = setup().await;
    let em = EntityManager::new(store.connection());

    store
        .insert_user_group(&make_group("g1", "ROLE_ADMIN", "Group - ROLE_ADMIN"))
        .await
        .unwrap();
    store
        .insert_user_group(&make_group("g2", "ROLE_USER", "Group - ROLE_USER"))
        .await
        .unwrap();

    em.persist(EntityRecord::User {
        user: make_user("u1", "john"),
        group_ids: vec!["g1".to_string()],
    });
    em.flush().await.unwrap();

    em.persist(EntityRecord::User {
        user: make_user("u1", "john"),
        group_ids: vec!["g2".to_string()],
    });
    em.flush().await.unwrap();

    let group_ids = store.list_user_group_ids("u1").await.unwrap();
    assert_eq!(group_ids, vec!["g2".to_string()]);
}

#[tokio::test]
async fn delete_user_removes_row_and_memberships() {
    let (_dir, store) = setup().await;
    let em = EntityManager::new(store.connection());

    store
        .insert_user_group(&make_group("g1", "ROLE_ADMIN", "Group - ROLE_ADMIN"))
        .await
        .unwrap();
    em.persist(EntityRecord::User {
        user: make_user("u1", "john"),
        group_ids: vec!["g1".to_string()],
    });
    em.flush().await.unwrap();

    assert!(store.delete_user("u1").await.unwrap());
    assert!(store.get_user("u1").await.unwrap().is_none());
    assert!(store.list_user_group_ids("u1").await.unwrap().is_empty());
    assert!(!store.delete_user("u1").await.unwrap());
}

#[tokio::test]
async fn list_users_supports_filter_and_pagination() {
    let (_dir, store) = setup().await;
    let em = EntityManager::new(store.connection());

    for (id, username) in [("u1", "john"), ("u2", "john-admin"), ("u3", "jane")] {
        em.persist(EntityRecord::User {
            user: make_user(id, username),
            group_ids: vec![],
        });
    }
    em.flush().await.unwrap();

    let filter = UserListFilter {
        username_contains: Some("john".to_string()),
    };
    let users = store.list_users(&filter, 20, 0).await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(store.count_users(&filter).await.unwrap(), 2);

    let page = store
        .list_users(&UserListFilter::default(), 2, 2)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(store.count_users(&UserListFilter::default()).await.unwrap(), 3);
}
