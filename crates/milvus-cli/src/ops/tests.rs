use super::*;
use milvus_client::memory::InMemoryService;
use milvus_client::{
    CollectionSchema, CreateCollectionOptions, DataType, FieldSchema, IndexParams, PrivilegeGrant,
    QueryRequest, ResourceGroupConfig, Row, SearchRequest, SearchVectors, VectorService,
};
use serde_json::json;

fn schema() -> CollectionSchema {
    CollectionSchema {
        fields: vec![
            FieldSchema::new("id", DataType::Int64).primary(),
            FieldSchema::new("title", DataType::VarChar).with_max_length(64),
            FieldSchema::new("vec", DataType::FloatVector).with_dim(2),
        ],
        description: String::new(),
        auto_id: false,
        enable_dynamic_field: false,
    }
}

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn service_with_books() -> InMemoryService {
    let service = InMemoryService::new();
    CollectionOps::new(&service)
        .create("books", &schema(), &CreateCollectionOptions::default())
        .unwrap();
    service
}

fn load_books(service: &InMemoryService) {
    IndexOps::new(service)
        .create(
            "books",
            &IndexParams {
                field_name: "vec".into(),
                index_name: "vec_idx".into(),
                index_type: "HNSW".into(),
                metric_type: Some("L2".into()),
                params: vec![("M".into(), json!(8)), ("efConstruction".into(), json!(64))],
            },
        )
        .unwrap();
    CollectionOps::new(service).load("books", None).unwrap();
}

fn assert_not_found(result: crate::error::Result<()>, kind: &str) {
    match result {
        Err(CliError::NotFound { kind: k, .. }) => assert_eq!(k, kind),
        other => panic!("expected NotFound for {kind}, got {other:?}"),
    }
}

// =========================================================================
// Shared helpers
// =========================================================================

#[test]
fn test_detail_degrades_to_unknown() {
    let value = detail(
        "row count",
        || -> milvus_client::Result<u64> { Err(milvus_client::Error::Transport("reset".into())) },
        Value::from,
    );
    assert_eq!(value, json!(UNKNOWN));
    assert_eq!(detail("ok", || Ok(3_u64), Value::from), json!(3));
}

#[test]
fn test_remote_failures_use_operation_template() {
    let service = service_with_books();
    let err = CollectionOps::new(&service)
        .create("books", &schema(), &CreateCollectionOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), "RemoteOperationError");
    assert!(err.to_string().starts_with("Create collection error!"));
}

// =========================================================================
// Drop policy
// =========================================================================

#[test]
fn test_drop_absent_is_not_found_for_every_noun() {
    let service = service_with_books();
    for _ in 0..2 {
        assert_not_found(CollectionOps::new(&service).drop("nosuch"), "Collection");
        assert_not_found(PartitionOps::new(&service).drop("books", "nosuch"), "Partition");
        assert_not_found(PartitionOps::new(&service).drop("nosuch", "p"), "Collection");
        assert_not_found(IndexOps::new(&service).drop("books", "nosuch"), "Index");
        assert_not_found(AliasOps::new(&service).drop("nosuch"), "Alias");
        assert_not_found(DatabaseOps::new(&service).drop("nosuch"), "Database");
        assert_not_found(UserOps::new(&service).drop("nosuch"), "User");
        assert_not_found(RoleOps::new(&service).drop("nosuch"), "Role");
        assert_not_found(ResourceGroupOps::new(&service).drop("nosuch"), "Resource group");
        assert_not_found(PrivilegeGroupOps::new(&service).drop("nosuch"), "Privilege group");
    }
}

// =========================================================================
// Collections, partitions, indexes
// =========================================================================

#[test]
fn test_collection_lifecycle() {
    let service = service_with_books();
    let ops = CollectionOps::new(&service);
    assert_eq!(ops.list().unwrap(), vec!["books"]);
    assert!(ops.has("books").unwrap());

    let details = ops.details("books").unwrap();
    let get = |key: &str| details.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
    assert_eq!(get("Name"), Some(json!("books")));
    assert_eq!(get("Row Count"), Some(json!(0)));
    assert_eq!(get("Partitions"), Some(json!("_default")));
    assert_eq!(get("Load State"), Some(json!("LoadStateNotLoad")));

    ops.rename("books", "novels", None).unwrap();
    assert!(!ops.has("books").unwrap());
    ops.drop("novels").unwrap();
    assert!(ops.list().unwrap().is_empty());
}

#[test]
fn test_load_needs_index() {
    let service = service_with_books();
    let err = CollectionOps::new(&service).load("books", None).unwrap_err();
    assert!(err.to_string().starts_with("Load collection error!"));
    load_books(&service);
    let state = CollectionOps::new(&service).load_state("books", None).unwrap();
    assert_eq!(state.state, milvus_client::LoadState::Loaded);
}

#[test]
fn test_partitions() {
    let service = service_with_books();
    let ops = PartitionOps::new(&service);
    ops.create("books", "p2024").unwrap();
    assert_eq!(ops.list("books").unwrap(), vec!["_default", "p2024"]);
    let details = ops.details("books", "p2024").unwrap();
    assert_eq!(details[0], ("Partition".to_string(), json!("p2024")));
    ops.drop("books", "p2024").unwrap();
    assert!(!ops.has("books", "p2024").unwrap());
}

#[test]
fn test_index_for_field() {
    let service = service_with_books();
    assert!(IndexOps::new(&service).for_field("books", "vec").is_none());
    load_books(&service);
    let summary = IndexOps::new(&service).for_field("books", "vec").unwrap();
    assert_eq!(summary.index_type, "HNSW");
    assert_eq!(summary.metric_type, "L2");
    let details = IndexOps::new(&service).details("books", "vec_idx").unwrap();
    assert!(details.contains(&("Index Type".to_string(), json!("HNSW"))));
}

// =========================================================================
// Aliases, databases, access control
// =========================================================================

#[test]
fn test_aliases() {
    let service = service_with_books();
    let ops = AliasOps::new(&service);
    ops.create("books", "library").unwrap();
    assert_eq!(ops.list(Some("books")).unwrap(), vec!["library"]);
    let details = ops.details("library").unwrap();
    assert_eq!(details[1], ("Collection".to_string(), json!("books")));
    ops.drop("library").unwrap();
    assert!(ops.list(None).unwrap().is_empty());
}

#[test]
fn test_databases() {
    let service = InMemoryService::new();
    let ops = DatabaseOps::new(&service);
    ops.create("analytics", &[]).unwrap();
    assert!(ops.has("analytics").unwrap());
    assert!(ops.list().unwrap().contains(&"default".to_string()));
    ops.drop("analytics").unwrap();
    assert!(!ops.has("analytics").unwrap());
}

#[test]
fn test_users_and_roles() {
    let service = InMemoryService::new();
    let users = UserOps::new(&service);
    let roles = RoleOps::new(&service);
    users.create("alice", "secret123").unwrap();
    roles.create("reader").unwrap();
    users.grant_role("alice", "reader").unwrap();
    let details = users.details("alice").unwrap();
    assert_eq!(details[1], ("Roles".to_string(), json!("public, reader")));

    let grant = PrivilegeGrant {
        object_type: "Collection".into(),
        object_name: "*".into(),
        privilege: "Search".into(),
        db_name: "default".into(),
        grantor: None,
    };
    roles.grant("reader", &grant).unwrap();
    let rows = roles.grants("reader").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["Privilege"], json!("Search"));
    roles.revoke("reader", &grant).unwrap();
    assert!(roles.grants("reader").unwrap().is_empty());

    users.revoke_role("alice", "reader").unwrap();
    users.drop("alice").unwrap();
    roles.drop("reader").unwrap();
}

#[test]
fn test_resource_and_privilege_groups() {
    let service = InMemoryService::new();
    let rg = ResourceGroupOps::new(&service);
    rg.create(
        "rg1",
        &ResourceGroupConfig {
            requests_node_num: 1,
            limits_node_num: 2,
        },
    )
    .unwrap();
    let details = rg.details("rg1").unwrap();
    assert!(details.contains(&("Limits Node Num".to_string(), json!(2))));

    let pg = PrivilegeGroupOps::new(&service);
    pg.create("readers").unwrap();
    pg.add("readers", &["Query".to_string(), "Search".to_string()])
        .unwrap();
    let groups = pg.list().unwrap();
    let readers = groups.iter().find(|g| g.name == "readers").unwrap();
    assert_eq!(readers.privileges.len(), 2);
    pg.remove("readers", &["Query".to_string()]).unwrap();
    pg.drop("readers").unwrap();
}

// =========================================================================
// Data plane
// =========================================================================

#[test]
fn test_insert_query_search_delete() {
    let service = service_with_books();
    let data = DataOps::new(&service);
    let rows = vec![
        row(json!({"id": 1, "title": "a", "vec": [0.0, 0.0]})),
        row(json!({"id": 2, "title": "b", "vec": [1.0, 1.0]})),
    ];
    assert_eq!(data.insert("books", None, &rows).unwrap().count, 2);
    load_books(&service);

    let found = data
        .query(&QueryRequest {
            collection: "books".into(),
            filter: "id > 1".into(),
            output_fields: vec!["title".into()],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["title"], json!("b"));

    let outcome = data
        .search(&SearchRequest {
            collection: "books".into(),
            anns_field: "vec".into(),
            data: SearchVectors::Dense(vec![vec![0.1, 0.1], vec![0.9, 0.9]]),
            metric_type: "L2".into(),
            params: Vec::new(),
            limit: 1,
            offset: 0,
            filter: None,
            output_fields: Vec::new(),
            partition_names: Vec::new(),
            round_decimal: 2,
            guarantee_timestamp: None,
            timeout: None,
        })
        .unwrap();
    assert_eq!(outcome.len(), 2);
    let rows = outcome.into_rows();
    assert_eq!(rows[0]["query"], json!(0));
    assert_eq!(rows[1]["id"], json!(2));

    let deleted = data
        .delete_by_ids("books", None, "id", &[json!(1)])
        .unwrap();
    assert_eq!(deleted.count, 1);
    assert!(data.delete_by_expr("books", None, "  ").is_err());
}
