//! Tests for the REST transport: body building and response decoding.

use super::*;
use crate::types::{AnnRequest, ConsistencyLevel, SearchVectors};
use std::io::Write;

fn sample_schema() -> CollectionSchema {
    let mut tags = FieldSchema::new("tags", DataType::Array);
    tags.element_type = Some(DataType::VarChar);
    tags.max_capacity = Some(16);
    tags.max_length = Some(64);
    CollectionSchema {
        fields: vec![
            FieldSchema::new("id", DataType::Int64).primary(),
            FieldSchema::new("vec", DataType::FloatVector).with_dim(4),
            tags,
        ],
        description: "docs".to_string(),
        auto_id: false,
        enable_dynamic_field: true,
    }
}

#[test]
fn test_normalize_base_url() {
    assert_eq!(
        normalize_base_url("127.0.0.1:19530", TlsMode::Disabled),
        "http://127.0.0.1:19530"
    );
    assert_eq!(
        normalize_base_url("http://host:19530/", TlsMode::OneWay),
        "https://host:19530"
    );
    assert_eq!(
        normalize_base_url("https://host", TlsMode::Disabled),
        "https://host"
    );
}

#[test]
fn test_decode_envelope_success() {
    let data = decode_envelope(r#"{"code":0,"data":["a","b"]}"#).unwrap();
    assert_eq!(parse_string_list(&data).unwrap(), vec!["a", "b"]);
}

#[test]
fn test_decode_envelope_server_error() {
    let err = decode_envelope(r#"{"code":100,"message":"collection not found[collection=x]"}"#)
        .unwrap_err();
    match err {
        Error::Server { code, message } => {
            assert_eq!(code, 100);
            assert_eq!(message, "collection not found[collection=x]");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_decode_envelope_auth_error() {
    let err = decode_envelope(r#"{"code":1800,"message":"user hasn't authenticated"}"#)
        .unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));
}

#[test]
fn test_decode_envelope_garbage() {
    assert!(matches!(
        decode_envelope("<html>").unwrap_err(),
        Error::Decode(_)
    ));
}

#[test]
fn test_handle_http_error() {
    assert!(matches!(handle_http_error(401, "no"), Error::Authentication(_)));
    assert!(matches!(handle_http_error(403, "no"), Error::Authentication(_)));
    assert!(matches!(handle_http_error(404, "no"), Error::Unsupported(_)));
    assert!(matches!(handle_http_error(502, "bad"), Error::Transport(_)));
}

#[test]
fn test_create_collection_body() {
    let options = CreateCollectionOptions {
        shards_num: Some(2),
        consistency_level: Some(ConsistencyLevel::Strong),
        num_partitions: None,
    };
    let body = create_collection_body("docs", &sample_schema(), &options);
    assert_eq!(body["collectionName"], "docs");
    assert_eq!(body["schema"]["enableDynamicField"], true);
    assert_eq!(body["params"]["shardsNum"], 2);
    assert_eq!(body["params"]["consistencyLevel"], "Strong");

    let fields = body["schema"]["fields"].as_array().unwrap();
    assert_eq!(fields[0]["dataType"], "Int64");
    assert_eq!(fields[0]["isPrimary"], true);
    assert_eq!(fields[1]["elementTypeParams"]["dim"], "4");
    assert_eq!(fields[2]["elementDataType"], "VarChar");
    assert_eq!(fields[2]["elementTypeParams"]["max_capacity"], "16");
    assert_eq!(fields[2]["elementTypeParams"]["max_length"], "64");
}

#[test]
fn test_create_index_body_carries_type_and_params() {
    let params = IndexParams {
        field_name: "vec".to_string(),
        index_name: "vec_idx".to_string(),
        index_type: "HNSW".to_string(),
        metric_type: Some("L2".to_string()),
        params: vec![("M".to_string(), json!(16)), ("efConstruction".to_string(), json!(200))],
    };
    let body = create_index_body("docs", &params);
    let entry = &body["indexParams"][0];
    assert_eq!(entry["fieldName"], "vec");
    assert_eq!(entry["metricType"], "L2");
    assert_eq!(entry["params"]["index_type"], "HNSW");
    assert_eq!(entry["params"]["M"], 16);
}

#[test]
fn test_search_body() {
    let request = SearchRequest {
        collection: "docs".to_string(),
        anns_field: "vec".to_string(),
        data: SearchVectors::Dense(vec![vec![0.1, 0.2]]),
        metric_type: "IP".to_string(),
        params: vec![("ef".to_string(), json!(64))],
        limit: 5,
        offset: 0,
        filter: Some(String::new()),
        output_fields: vec!["title".to_string()],
        partition_names: Vec::new(),
        round_decimal: -1,
        guarantee_timestamp: None,
        timeout: None,
    };
    let body = search_body(&request);
    assert_eq!(body["annsField"], "vec");
    assert_eq!(body["limit"], 5);
    assert_eq!(body["searchParams"]["metricType"], "IP");
    assert_eq!(body["searchParams"]["params"]["ef"], 64);
    assert_eq!(body["outputFields"], json!(["title"]));
    assert!(body.get("filter").is_none());
    assert!(body.get("offset").is_none());
    assert!(body.get("partitionNames").is_none());
}

#[test]
fn test_query_body_skips_unset_fields() {
    let request = QueryRequest {
        collection: "docs".to_string(),
        filter: "id > 0".to_string(),
        limit: Some(10),
        ..QueryRequest::default()
    };
    let body = query_body(&request);
    assert_eq!(body["filter"], "id > 0");
    assert_eq!(body["limit"], 10);
    assert!(body.get("offset").is_none());
    assert!(body.get("outputFields").is_none());
}

#[test]
fn test_hybrid_search_body_rrf() {
    let leg = AnnRequest {
        anns_field: "vec".to_string(),
        data: SearchVectors::Dense(vec![vec![1.0, 0.0]]),
        metric_type: "L2".to_string(),
        params: Vec::new(),
        limit: 3,
        filter: None,
    };
    let request = HybridSearchRequest {
        collection: "docs".to_string(),
        requests: vec![leg.clone(), leg],
        ranker: Ranker::Rrf { k: 60 },
        limit: 3,
        output_fields: Vec::new(),
        partition_names: Vec::new(),
    };
    let body = hybrid_search_body(&request);
    assert_eq!(body["search"].as_array().unwrap().len(), 2);
    assert_eq!(body["rerank"]["strategy"], "rrf");
    assert_eq!(body["rerank"]["params"]["k"], 60);
}

#[test]
fn test_parse_collection_info() {
    let data = json!({
        "collectionName": "docs",
        "collectionID": 4521,
        "description": "",
        "autoId": false,
        "enableDynamicField": true,
        "consistencyLevel": "Bounded",
        "shardsNum": 1,
        "partitionsNum": 1,
        "aliases": ["d"],
        "fields": [
            {"name": "id", "type": "Int64", "primaryKey": true},
            {"name": "vec", "type": "FloatVector", "params": [{"key": "dim", "value": "8"}]},
            {"name": "title", "type": "VarChar", "params": [{"key": "max_length", "value": 256}]}
        ]
    });
    let info = parse_collection_info(&data).unwrap();
    assert_eq!(info.name, "docs");
    assert_eq!(info.collection_id, 4521);
    assert_eq!(info.aliases, vec!["d"]);
    assert!(info.fields[0].is_primary);
    assert_eq!(info.fields[1].dim, Some(8));
    assert_eq!(info.fields[2].max_length, Some(256));
}

#[test]
fn test_parse_field_rejects_unknown_type() {
    let err = parse_field(&json!({"name": "x", "type": "Quaternion"})).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[test]
fn test_parse_index_info_strips_type_keys() {
    let data = json!([{
        "indexName": "vec",
        "fieldName": "vec",
        "indexType": "IVF_FLAT",
        "metricType": "L2",
        "indexState": "Finished",
        "indexedRows": 10,
        "totalRows": 10,
        "pendingRows": 0,
        "params": {"index_type": "IVF_FLAT", "metric_type": "L2", "nlist": 128}
    }]);
    let info = parse_index_info(&data);
    assert_eq!(info.index_type, "IVF_FLAT");
    assert_eq!(info.params, vec![("nlist".to_string(), json!(128))]);
    assert_eq!(info.indexed_rows, 10);
}

#[test]
fn test_parse_privilege_groups_both_layouts() {
    let wrapped = json!({"privilegeGroups": [{"privilegeGroupName": "g", "privileges": "Query,Search"}]});
    let bare = json!([{"privilegeGroupName": "g", "privileges": ["Query", "Search"]}]);
    assert_eq!(parse_privilege_groups(&wrapped), parse_privilege_groups(&bare));
    assert_eq!(parse_privilege_groups(&bare)[0].privileges, vec!["Query", "Search"]);
}

#[test]
fn test_parse_resource_group() {
    let data = json!({"resource_group": {
        "name": "rg1",
        "capacity": 2,
        "num_available_node": 1,
        "num_loaded_replica": {"b": 1, "a": 2},
        "config": {"requests": {"node_num": 1}, "limits": {"node_num": 3}}
    }});
    let info = parse_resource_group(&data);
    assert_eq!(info.name, "rg1");
    assert_eq!(info.config.limits_node_num, 3);
    assert_eq!(info.loaded_replicas, vec![("a".to_string(), 2), ("b".to_string(), 1)]);
}

#[test]
fn test_split_hits_flat_single_query() {
    let data = json!([{"id": 1, "distance": 0.1}, {"id": 2, "distance": 0.2}]);
    let groups = split_hits(data, 1, 10).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_split_hits_flat_many_queries() {
    let data = json!([{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}]);
    let groups = split_hits(data, 2, 2).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1][0]["id"], 3);
}

#[test]
fn test_split_hits_nested() {
    let data = json!([[{"id": 1}], [{"id": 2}, {"id": 3}]]);
    let groups = split_hits(data, 2, 5).unwrap();
    assert_eq!(groups[1].len(), 2);
}

#[test]
fn test_parse_rows_rejects_scalars() {
    assert!(parse_rows(json!([1, 2])).is_err());
    assert!(parse_rows(Value::Null).unwrap().is_empty());
}

#[test]
fn test_two_way_tls_requires_key_pair() {
    let mut config = ConnectConfig::new("https://localhost:19530");
    config.tls = TlsMode::TwoWay;
    let err = RestClient::new(&config).err().unwrap();
    assert!(matches!(err, Error::Tls(_)));
}

#[test]
fn test_unreadable_ca_is_tls_error() {
    let mut bogus = tempfile::NamedTempFile::new().unwrap();
    writeln!(bogus, "not a certificate").unwrap();
    let mut config = ConnectConfig::new("https://localhost:19530");
    config.tls = TlsMode::OneWay;
    config.cert_path = Some(bogus.path().join("missing.pem"));
    let err = RestClient::new(&config).err().unwrap();
    assert!(matches!(err, Error::Tls(_)));
}

#[test]
fn test_connect_refused_is_connection_error() {
    let mut config = ConnectConfig::new("http://127.0.0.1:1");
    config.timeout = std::time::Duration::from_secs(2);
    let err = RestConnector.connect(&config).err().unwrap();
    assert!(err.is_connection(), "got {err:?}");
}
