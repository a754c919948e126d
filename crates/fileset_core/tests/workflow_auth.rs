use fileset_core::db::open_db_in_memory;
use fileset_core::{
    Allowed, CoreConfig, FailureKind, FileSet, FileSetError, FileSetRepository, GrantTable,
    NotFoundTarget, ParentIndex, ParentWork, Principal, SqliteFileSetRepository,
    SqliteFileSetService, SqliteParentIndex,
};
use rusqlite::Connection;
use uuid::Uuid;

fn seed(conn: &Connection, suppressed: bool) -> (ParentWork, FileSet) {
    let repo = SqliteFileSetRepository::try_new(conn).unwrap();
    let index = SqliteParentIndex::try_new(conn).unwrap();

    let mut parent = ParentWork::new("Parent work");
    parent.suppressed = suppressed;
    repo.create_parent(&parent).unwrap();
    let file_set = FileSet::new(Some(parent.id));
    repo.create_file_set(&file_set).unwrap();

    index.index_parent(&parent, 1).unwrap();
    index.index_file_set(&file_set, 1).unwrap();
    (parent, file_set)
}

fn service(conn: &Connection, grants: GrantTable) -> SqliteFileSetService<'_, GrantTable> {
    SqliteFileSetService::try_from_connection(conn, grants, &CoreConfig::default()).unwrap()
}

#[test]
fn suppressed_parent_without_grants_is_denied() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, true);
    let service = service(&conn, GrantTable::new());
    let principal = Principal::user("alice");

    for parent_id in [None, Some(parent.id)] {
        let err = service
            .authorize_edit(&principal, file_set.id, parent_id, None)
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::WorkflowSuppressed);
        assert!(matches!(
            err,
            FileSetError::WorkflowSuppressed { parent_id: Some(id), .. } if id == parent.id
        ));
    }
}

#[test]
fn non_suppressed_parent_without_grants_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let (_, file_set) = seed(&conn, false);
    let service = service(&conn, GrantTable::new());

    let allowed = service
        .authorize_edit(&Principal::user("nobody"), file_set.id, None, None)
        .unwrap();
    assert_eq!(allowed, Allowed::NotSuppressed);
}

#[test]
fn parent_edit_grant_overrides_suppression() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, true);
    let mut grants = GrantTable::new();
    grants.grant_edit_group(parent.id, "curators");
    let service = service(&conn, grants);

    let principal = Principal::user_in_groups("carol", &["curators"]);
    let allowed = service
        .authorize_edit(&principal, file_set.id, Some(parent.id), None)
        .unwrap();
    assert_eq!(allowed, Allowed::ParentGrant);
}

#[test]
fn held_document_grant_short_circuits_before_parent_projection() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, true);
    let index = SqliteParentIndex::try_new(&conn).unwrap();
    let held = index.find_file_set_document(file_set.id).unwrap().unwrap();
    index.remove_parent(parent.id).unwrap();

    let mut grants = GrantTable::new();
    grants.grant_edit_user(file_set.id, "alice");
    let service = service(&conn, grants);

    let allowed = service
        .authorize_edit(&Principal::user("alice"), file_set.id, Some(parent.id), Some(&held))
        .unwrap();
    assert_eq!(allowed, Allowed::FileSetGrant);

    let err = service
        .authorize_edit(&Principal::user("alice"), file_set.id, Some(parent.id), None)
        .unwrap_err();
    assert!(matches!(
        err,
        FileSetError::NotFound(NotFoundTarget::ParentProjection(id)) if id == parent.id
    ));
}

#[test]
fn held_document_for_another_file_set_is_ignored() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, true);
    let (_, other) = seed(&conn, false);
    let index = SqliteParentIndex::try_new(&conn).unwrap();
    let other_document = index.find_file_set_document(other.id).unwrap().unwrap();

    let mut grants = GrantTable::new();
    grants.grant_edit_user(other.id, "alice");
    let service = service(&conn, grants);

    let err = service
        .authorize_edit(
            &Principal::user("alice"),
            file_set.id,
            Some(parent.id),
            Some(&other_document),
        )
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::WorkflowSuppressed);
}

#[test]
fn file_set_grant_without_held_document_does_not_bypass_suppression() {
    let conn = open_db_in_memory().unwrap();
    let (_, file_set) = seed(&conn, true);
    let mut grants = GrantTable::new();
    grants.grant_edit_user(file_set.id, "alice");
    let service = service(&conn, grants);

    let err = service
        .authorize_edit(&Principal::user("alice"), file_set.id, None, None)
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::WorkflowSuppressed);
}

#[test]
fn stale_projection_decides_over_authoritative_parent() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let repo = SqliteFileSetRepository::try_new(&conn).unwrap();
    repo.set_parent_suppressed(parent.id, true).unwrap();
    let service = service(&conn, GrantTable::new());

    let allowed = service
        .authorize_edit(&Principal::user("alice"), file_set.id, None, None)
        .unwrap();
    assert_eq!(allowed, Allowed::NotSuppressed);

    let index = SqliteParentIndex::try_new(&conn).unwrap();
    let refreshed = repo.get_parent(parent.id).unwrap().unwrap();
    index.index_parent(&refreshed, 2).unwrap();
    let err = service
        .authorize_edit(&Principal::user("alice"), file_set.id, None, None)
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::WorkflowSuppressed);
}

#[test]
fn unresolvable_file_set_or_parent_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFileSetRepository::try_new(&conn).unwrap();
    let service = service(&conn, GrantTable::new());
    let principal = Principal::user("alice");

    let missing = Uuid::new_v4();
    let err = service
        .authorize_edit(&principal, missing, None, None)
        .unwrap_err();
    assert!(matches!(err, FileSetError::NotFound(NotFoundTarget::FileSet(id)) if id == missing));

    let orphan = FileSet::new(None);
    repo.create_file_set(&orphan).unwrap();
    let err = service
        .authorize_edit(&principal, orphan.id, None, None)
        .unwrap_err();
    assert!(matches!(err, FileSetError::NotFound(NotFoundTarget::ParentOf(id)) if id == orphan.id));

    let unindexed = ParentWork::new("Never indexed");
    repo.create_parent(&unindexed).unwrap();
    let err = service
        .authorize_edit(&principal, orphan.id, Some(unindexed.id), None)
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NotFound);
}
