use fileset_core::db::{open_db_in_memory, DbError};
use fileset_core::{
    CoreConfig, FailureKind, FileSet, FileSetError, FileSetRepository, FileSetService,
    GrantTable, MutationKind, MutationParams, NotFoundTarget, ParentWork, Principal, RepoError,
    RepoResult, SqliteBlobStore, SqliteFileSetRepository, SqliteFileSetService,
    SqliteParentIndex, SqliteVersionRepository, UploadedFile, Version, VersionHistory,
    VersionRepository,
};
use rusqlite::{ffi, Connection};

fn seed(conn: &Connection, suppressed: bool) -> (ParentWork, FileSet) {
    let repo = SqliteFileSetRepository::try_new(conn).unwrap();
    let index = SqliteParentIndex::try_new(conn).unwrap();

    let mut parent = ParentWork::new("Parent work");
    parent.suppressed = suppressed;
    repo.create_parent(&parent).unwrap();
    let mut file_set = FileSet::new(Some(parent.id));
    file_set
        .attributes
        .insert("title".to_string(), "Original".to_string());
    repo.create_file_set(&file_set).unwrap();

    index.index_parent(&parent, 1).unwrap();
    index.index_file_set(&file_set, 1).unwrap();
    (parent, file_set)
}

fn service_with_parent_editor<'conn>(
    conn: &'conn Connection,
    parent: &ParentWork,
) -> SqliteFileSetService<'conn, GrantTable> {
    let mut grants = GrantTable::new();
    grants.grant_edit_user(parent.id, "editor");
    SqliteFileSetService::try_from_connection(conn, grants, &CoreConfig::default()).unwrap()
}

fn editor() -> Principal {
    Principal::user("editor")
}

fn upload(name: &str, bytes: &[u8]) -> MutationParams {
    MutationParams::replace_with(UploadedFile::new(name, bytes.to_vec()))
}

#[test]
fn metadata_update_with_parent_grant_sets_title() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);

    let outcome = service
        .mutate(
            &editor(),
            file_set.id,
            MutationParams::update_attributes([("title", "X")]),
        )
        .unwrap();

    assert_eq!(outcome.kind, MutationKind::UpdateMetadata);
    assert_eq!(outcome.file_set.attribute("title"), Some("X"));
    assert!(outcome.version.is_none());
}

#[test]
fn metadata_update_drops_unpermitted_fields() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);

    let outcome = service
        .mutate(
            &editor(),
            file_set.id,
            MutationParams::update_attributes([
                ("creator", "Ada"),
                ("depositor", "mallory"),
                ("current_version", "version9"),
            ]),
        )
        .unwrap();

    assert_eq!(outcome.file_set.attribute("creator"), Some("Ada"));
    assert_eq!(outcome.file_set.attribute("depositor"), None);
    assert_eq!(outcome.file_set.attribute("current_version"), None);
    assert_eq!(outcome.file_set.attribute("title"), Some("Original"));
}

#[test]
fn suppressed_parent_denies_before_any_mutation() {
    let conn = open_db_in_memory().unwrap();
    let (_, file_set) = seed(&conn, true);
    let service =
        SqliteFileSetService::try_from_connection(&conn, GrantTable::new(), &CoreConfig::default())
            .unwrap();

    let err = service
        .mutate(
            &Principal::user("stranger"),
            file_set.id,
            MutationParams::update_attributes([("title", "Hijacked")]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::WorkflowSuppressed);

    let err = service
        .mutate(&Principal::user("stranger"), file_set.id, upload("a.txt", b"a"))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::WorkflowSuppressed);

    let loaded = service.file_sets().get_file_set(file_set.id).unwrap().unwrap();
    assert_eq!(loaded, file_set);
    assert_eq!(service.blobs().blob_count().unwrap(), 0);
}

#[test]
fn anonymous_principal_is_unauthorized_for_edits() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);

    let err = service
        .mutate(
            &Principal::Anonymous,
            file_set.id,
            MutationParams::update_attributes([("title", "X")]),
        )
        .unwrap_err();
    assert!(matches!(err, FileSetError::Unauthorized(id) if id == file_set.id));

    let err = service
        .destroy(&Principal::Anonymous, file_set.id)
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Unauthorized);
}

#[test]
fn sequential_replacements_append_ordered_versions() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);

    let mut appended = Vec::new();
    for idx in 1..=5 {
        let name = format!("page-{idx}.txt");
        let outcome = service
            .mutate(&editor(), file_set.id, upload(&name, name.as_bytes()))
            .unwrap();
        assert_eq!(outcome.kind, MutationKind::ReplaceContent);
        let version = outcome.version.unwrap();
        assert_eq!(outcome.file_set.current_version.as_deref(), Some(version.label.as_str()));
        assert_eq!(outcome.file_set.file_name.as_deref(), Some(name.as_str()));
        appended.push(version);
    }

    let history = service.versions().load_history(file_set.id).unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history.latest(), appended.last());
    assert_eq!(history.all(), appended.as_slice());
    assert!(history
        .all()
        .windows(2)
        .all(|pair| pair[0].created_at < pair[1].created_at));
    assert_eq!(history.all()[0].label, "version1");
    assert_eq!(history.all()[4].label, "version5");
}

#[test]
fn revert_selects_earlier_version_and_clears_wants_to_revert() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);
    service
        .mutate(&editor(), file_set.id, upload("one.txt", b"one"))
        .unwrap();
    service
        .mutate(&editor(), file_set.id, upload("two.txt", b"two"))
        .unwrap();

    let outcome = service
        .mutate(&editor(), file_set.id, MutationParams::revert_to("version1"))
        .unwrap();

    assert_eq!(outcome.kind, MutationKind::Revert);
    assert!(!outcome.file_set.wants_to_revert("version1"));
    assert!(outcome.file_set.wants_to_revert("version2"));
    let history = service.versions().load_history(file_set.id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.latest().unwrap().label, "version2");
}

#[test]
fn revert_takes_priority_over_file_payload() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);
    service
        .mutate(&editor(), file_set.id, upload("one.txt", b"one"))
        .unwrap();
    service
        .mutate(&editor(), file_set.id, upload("two.txt", b"two"))
        .unwrap();
    let blobs_before = service.blobs().blob_count().unwrap();

    let params = MutationParams {
        revision: Some("version1".to_string()),
        files: vec![UploadedFile::new("three.txt", b"three".to_vec())],
        attributes: None,
    };
    let outcome = service.mutate(&editor(), file_set.id, params).unwrap();

    assert_eq!(outcome.kind, MutationKind::Revert);
    assert_eq!(service.blobs().blob_count().unwrap(), blobs_before);
    assert_eq!(service.versions().load_history(file_set.id).unwrap().len(), 2);
}

#[test]
fn revision_equal_to_current_without_other_fields_is_no_op() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);
    service
        .mutate(&editor(), file_set.id, upload("one.txt", b"one"))
        .unwrap();
    service
        .mutate(&editor(), file_set.id, upload("two.txt", b"two"))
        .unwrap();

    let err = service
        .mutate(&editor(), file_set.id, MutationParams::revert_to("version2"))
        .unwrap_err();
    assert!(matches!(err, FileSetError::NoOp(id) if id == file_set.id));

    service
        .mutate(&editor(), file_set.id, MutationParams::revert_to("version1"))
        .unwrap();
    let err = service
        .mutate(&editor(), file_set.id, MutationParams::revert_to("version1"))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NoOp);

    let err = service
        .mutate(&editor(), file_set.id, MutationParams::default())
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NoOp);
}

#[test]
fn revision_equal_to_current_with_file_replaces_content() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);
    service
        .mutate(&editor(), file_set.id, upload("one.txt", b"one"))
        .unwrap();

    let params = MutationParams {
        revision: Some("version1".to_string()),
        files: vec![UploadedFile::new("two.txt", b"two".to_vec())],
        attributes: Some([("title".to_string(), "ignored".to_string())].into()),
    };
    let outcome = service.mutate(&editor(), file_set.id, params).unwrap();

    assert_eq!(outcome.kind, MutationKind::ReplaceContent);
    assert_eq!(outcome.file_set.current_version.as_deref(), Some("version2"));
    assert_eq!(outcome.file_set.attribute("title"), Some("Original"));
}

#[test]
fn replace_then_revert_restores_previous_content_reference() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);
    let first = service
        .mutate(&editor(), file_set.id, upload("one.txt", b"one"))
        .unwrap();
    let before = first.file_set.current_content;

    service
        .mutate(&editor(), file_set.id, upload("two.txt", b"two"))
        .unwrap();
    let reverted = service
        .mutate(&editor(), file_set.id, MutationParams::revert_to("version1"))
        .unwrap();

    assert_eq!(reverted.file_set.current_content, before);
    assert_eq!(reverted.file_set.file_name.as_deref(), Some("one.txt"));

    let after_new_upload = service
        .mutate(&editor(), file_set.id, upload("three.txt", b"three"))
        .unwrap();
    assert_eq!(
        after_new_upload.file_set.current_version.as_deref(),
        Some("version3")
    );
}

#[test]
fn revert_to_unknown_label_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);
    service
        .mutate(&editor(), file_set.id, upload("one.txt", b"one"))
        .unwrap();

    let err = service
        .mutate(&editor(), file_set.id, MutationParams::revert_to("version7"))
        .unwrap_err();
    assert!(matches!(
        err,
        FileSetError::NotFound(NotFoundTarget::Version { ref label, .. }) if label == "version7"
    ));
}

#[test]
fn destroy_detaches_file_set_from_parent() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let service = service_with_parent_editor(&conn, &parent);
    service
        .mutate(&editor(), file_set.id, upload("one.txt", b"one"))
        .unwrap();
    assert_eq!(
        service.file_sets().list_children(parent.id).unwrap(),
        vec![file_set.id]
    );

    let former_parent = service.destroy(&editor(), file_set.id).unwrap();

    assert_eq!(former_parent, parent.id);
    assert!(service.file_sets().list_children(parent.id).unwrap().is_empty());
    assert!(service.file_sets().get_file_set(file_set.id).unwrap().is_none());
    assert!(service
        .versions()
        .load_history(file_set.id)
        .unwrap()
        .is_empty());

    let err = service.destroy(&editor(), file_set.id).unwrap_err();
    assert_eq!(err.kind(), FailureKind::NotFound);
}

#[test]
fn destroy_under_suppressed_parent_is_denied() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, true);
    let service =
        SqliteFileSetService::try_from_connection(&conn, GrantTable::new(), &CoreConfig::default())
            .unwrap();

    let err = service
        .destroy(&Principal::user("stranger"), file_set.id)
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::WorkflowSuppressed);
    assert_eq!(
        service.file_sets().list_children(parent.id).unwrap(),
        vec![file_set.id]
    );
}

struct FailingAppend<'conn> {
    inner: SqliteVersionRepository<'conn>,
}

impl VersionRepository for FailingAppend<'_> {
    fn load_history(&self, file_set_id: fileset_core::FileSetId) -> RepoResult<VersionHistory> {
        self.inner.load_history(file_set_id)
    }

    fn append_version(
        &self,
        _file_set_id: fileset_core::FileSetId,
        _version: &Version,
        _file_name: &str,
    ) -> RepoResult<()> {
        Err(RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_IOERR),
            Some("disk I/O error".to_string()),
        ))))
    }

    fn restore_version(
        &self,
        file_set_id: fileset_core::FileSetId,
        label: &str,
    ) -> RepoResult<Version> {
        self.inner.restore_version(file_set_id, label)
    }
}

#[test]
fn failed_version_append_leaves_current_version_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let (parent, file_set) = seed(&conn, false);
    let healthy = service_with_parent_editor(&conn, &parent);
    healthy
        .mutate(&editor(), file_set.id, upload("one.txt", b"one"))
        .unwrap();
    let before = healthy
        .file_sets()
        .get_file_set(file_set.id)
        .unwrap()
        .unwrap();

    let mut grants = GrantTable::new();
    grants.grant_edit_user(parent.id, "editor");
    let failing = FileSetService::new(
        SqliteFileSetRepository::try_new(&conn).unwrap(),
        FailingAppend {
            inner: SqliteVersionRepository::try_new(&conn).unwrap(),
        },
        SqliteBlobStore::try_new(&conn).unwrap(),
        SqliteParentIndex::try_new(&conn).unwrap(),
        grants,
        &CoreConfig::default(),
    );

    let err = failing
        .mutate(&editor(), file_set.id, upload("two.txt", b"two"))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::UpstreamUnavailable);

    let after = healthy
        .file_sets()
        .get_file_set(file_set.id)
        .unwrap()
        .unwrap();
    assert_eq!(after, before);
    assert_eq!(healthy.versions().load_history(file_set.id).unwrap().len(), 1);
    assert_eq!(healthy.blobs().blob_count().unwrap(), 2);
}
