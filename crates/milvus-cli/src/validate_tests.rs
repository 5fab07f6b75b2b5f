//! Tests for parameter validation.

use super::*;
use serde_json::json;

fn search_input(data: &str) -> SearchInput {
    SearchInput {
        collection: "books".to_string(),
        anns_field: "vec".to_string(),
        vector_type: DataType::FloatVector,
        dim: Some(2),
        data: data.to_string(),
        metric_type: None,
        params: Vec::new(),
        limit: 10,
        offset: 0,
        expr: None,
        output_fields: None,
        partition_names: None,
        round_decimal: -1,
        guarantee_timestamp: None,
        index: None,
    }
}

fn hnsw() -> Option<IndexSummary> {
    Some(IndexSummary {
        index_type: "HNSW".to_string(),
        metric_type: "L2".to_string(),
    })
}

// =========================================================================
// Index parameters
// =========================================================================

#[test]
fn test_hnsw_accepts_build_keys() {
    let params = normalize_index_params("HNSW", &["M:16", "efConstruction:200"]).unwrap();
    assert_eq!(
        params,
        vec![
            ("M".to_string(), json!(16)),
            ("efConstruction".to_string(), json!(200)),
        ]
    );
}

#[test]
fn test_hnsw_rejects_nlist() {
    let err = normalize_index_params("HNSW", &["nlist:128"]).unwrap_err();
    match err {
        CliError::IndexParam {
            index_type,
            key,
            accepted,
        } => {
            assert_eq!(index_type, "HNSW");
            assert_eq!(key, "nlist");
            assert_eq!(accepted, "M, efConstruction");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_flat_and_autoindex_take_no_build_params() {
    assert!(normalize_index_params::<&str>("FLAT", &[]).unwrap().is_empty());
    assert!(normalize_index_params("AUTOINDEX", &["nlist:1"]).is_err());
    assert!(normalize_index_params("FLAT", &["metric_type:L2"]).is_err());
}

#[test]
fn test_unknown_index_type() {
    let err = normalize_index_params("BTREE", &["x:1"]).unwrap_err();
    assert_eq!(err.kind(), "IndexParamError");
    assert!(err.to_string().contains("HNSW"));
}

#[test]
fn test_index_type_lookup_is_case_insensitive() {
    assert_eq!(index_type_spec("ivf_pq").unwrap().build, &["nlist", "m", "nbits"]);
}

#[test]
fn test_param_without_colon_is_parameter_error() {
    let err = normalize_index_params("IVF_FLAT", &["nlist"]).unwrap_err();
    assert_eq!(err.kind(), "ParameterError");
}

#[test]
fn test_duplicate_param_rejected() {
    assert!(normalize_index_params("IVF_FLAT", &["nlist:1", "nlist:2"]).is_err());
}

#[test]
fn test_parse_scalar() {
    assert_eq!(parse_scalar("12"), json!(12));
    assert_eq!(parse_scalar("0.5"), json!(0.5));
    assert_eq!(parse_scalar("'L2'"), json!("L2"));
}

// =========================================================================
// Fields
// =========================================================================

#[test]
fn test_vector_field_requires_dim() {
    let err = normalize_field("vec", "float_vector", &RawFieldAttributes::default()).unwrap_err();
    assert_eq!(err.kind(), "SchemaError");
    assert!(err.to_string().contains("vec"));

    let attrs = RawFieldAttributes {
        dim: Some("128".into()),
        ..Default::default()
    };
    let field = normalize_field("vec", "float_vector", &attrs).unwrap();
    assert_eq!(field.data_type, DataType::FloatVector);
    assert_eq!(field.dim, Some(128));
}

#[test]
fn test_sparse_vector_takes_no_dim() {
    let field =
        normalize_field("sv", "SPARSE_FLOAT_VECTOR", &RawFieldAttributes::default()).unwrap();
    assert_eq!(field.dim, None);
    let attrs = RawFieldAttributes {
        dim: Some("8".into()),
        ..Default::default()
    };
    assert!(normalize_field("sv", "SPARSE_FLOAT_VECTOR", &attrs).is_err());
}

#[test]
fn test_binary_dim_multiple_of_eight() {
    let attrs = RawFieldAttributes {
        dim: Some("12".into()),
        ..Default::default()
    };
    let err = normalize_field("bv", "BINARY_VECTOR", &attrs).unwrap_err();
    assert!(err.to_string().contains("multiple of 8"));
}

#[test]
fn test_varchar_requires_max_length() {
    assert!(normalize_field("t", "VARCHAR", &RawFieldAttributes::default()).is_err());
    let attrs = RawFieldAttributes {
        max_length: Some("0".into()),
        ..Default::default()
    };
    assert!(normalize_field("t", "VARCHAR", &attrs).is_err());
}

#[test]
fn test_array_of_varchar_needs_max_length() {
    let mut attrs = RawFieldAttributes {
        element_type: Some("varchar".into()),
        max_capacity: Some("10".into()),
        ..Default::default()
    };
    assert!(normalize_field("tags", "ARRAY", &attrs).is_err());
    attrs.max_length = Some("64".into());
    let field = normalize_field("tags", "ARRAY", &attrs).unwrap();
    assert_eq!(field.element_type, Some(DataType::VarChar));
    assert_eq!(field.max_capacity, Some(10));
    assert_eq!(field.max_length, Some(64));
}

#[test]
fn test_array_of_vectors_rejected() {
    let attrs = RawFieldAttributes {
        element_type: Some("FLOAT_VECTOR".into()),
        max_capacity: Some("4".into()),
        ..Default::default()
    };
    assert!(normalize_field("a", "ARRAY", &attrs).is_err());
}

#[test]
fn test_unknown_type_lists_accepted() {
    let err = normalize_field("x", "STRING", &RawFieldAttributes::default()).unwrap_err();
    assert!(err.to_string().contains("VARCHAR"));
}

#[test]
fn test_primary_must_be_int64_or_varchar() {
    let attrs = RawFieldAttributes {
        is_primary: true,
        ..Default::default()
    };
    assert!(normalize_field("id", "FLOAT", &attrs).is_err());
    assert!(normalize_field("id", "INT64", &attrs).unwrap().is_primary);
}

#[test]
fn test_default_value_parsed_per_type() {
    let attrs = RawFieldAttributes {
        default_value: Some("42".into()),
        ..Default::default()
    };
    let field = normalize_field("year", "INT16", &attrs).unwrap();
    assert_eq!(field.default_value, Some(json!(42)));

    let attrs = RawFieldAttributes {
        default_value: Some("abc".into()),
        ..Default::default()
    };
    assert!(normalize_field("year", "INT16", &attrs).is_err());
}

#[test]
fn test_field_token_forms() {
    let pk = parse_field_token("id:INT64:primary:auto_id").unwrap();
    assert!(pk.is_primary && pk.auto_id);

    let vec = parse_field_token("vec:FLOAT_VECTOR:128").unwrap();
    assert_eq!(vec.dim, Some(128));

    let title = parse_field_token("title:varchar:256:nullable").unwrap();
    assert_eq!(title.max_length, Some(256));
    assert!(title.nullable);

    let tags = parse_field_token("tags:ARRAY:VARCHAR:100:64").unwrap();
    assert_eq!(tags.max_capacity, Some(100));
    assert_eq!(tags.max_length, Some(64));

    let sv = parse_field_token("sv:SPARSE_FLOAT_VECTOR").unwrap();
    assert!(sv.data_type.is_vector());

    assert!(parse_field_token("n:INT64:7").is_err());
    assert!(parse_field_token("lonely").is_err());
}

// =========================================================================
// Schemas
// =========================================================================

#[test]
fn test_schema_needs_exactly_one_primary() {
    let vec = parse_field_token("vec:FLOAT_VECTOR:4").unwrap();
    let err = normalize_schema(vec![vec.clone()], "", false, false).unwrap_err();
    assert!(err.to_string().contains("primary"));

    let a = parse_field_token("a:INT64:primary").unwrap();
    let b = parse_field_token("b:INT64:primary").unwrap();
    assert!(normalize_schema(vec![a, b, vec], "", false, false).is_err());
}

#[test]
fn test_schema_needs_vector_field() {
    let pk = parse_field_token("id:INT64:primary").unwrap();
    assert!(normalize_schema(vec![pk], "", false, false).is_err());
}

#[test]
fn test_schema_rejects_duplicate_names() {
    let pk = parse_field_token("id:INT64:primary").unwrap();
    let v1 = parse_field_token("v:FLOAT_VECTOR:4").unwrap();
    let v2 = parse_field_token("v:FLOAT_VECTOR:8").unwrap();
    assert!(normalize_schema(vec![pk, v1, v2], "", false, false).is_err());
}

#[test]
fn test_schema_auto_id_propagates_to_primary() {
    let pk = parse_field_token("id:INT64:primary").unwrap();
    let v = parse_field_token("v:FLOAT_VECTOR:4").unwrap();
    let schema = normalize_schema(vec![pk, v], "books", true, true).unwrap();
    assert!(schema.auto_id);
    assert!(schema.primary_field().unwrap().auto_id);
    assert!(schema.enable_dynamic_field);
}

#[test]
fn test_schema_document_json_and_toml() {
    let json_doc = r#"{
        "description": "books",
        "fields": [
            {"name": "id", "type": "INT64", "is_primary": true, "auto_id": true},
            {"name": "title", "type": "VARCHAR", "max_length": 128},
            {"name": "vec", "type": "FLOAT_VECTOR", "dim": 4}
        ]
    }"#;
    let schema = parse_schema_text(json_doc, "json").unwrap();
    assert_eq!(schema.fields.len(), 3);
    assert_eq!(schema.description, "books");

    let toml_doc = r#"
        enable_dynamic_field = true

        [[fields]]
        name = "id"
        type = "VARCHAR"
        max_length = 64
        is_primary = true

        [[fields]]
        name = "vec"
        type = "FLOAT_VECTOR"
        dim = 8
    "#;
    let schema = parse_schema_text(toml_doc, "toml").unwrap();
    assert!(schema.enable_dynamic_field);
    assert_eq!(schema.primary_field().unwrap().data_type, DataType::VarChar);

    assert!(parse_schema_text("{}", "yaml").is_err());
    assert!(parse_schema_text("{", "json").is_err());
}

#[test]
fn test_schema_document_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    std::fs::write(
        &path,
        r#"{"fields": [{"name": "id", "type": "INT64", "is_primary": true},
                      {"name": "v", "type": "FLOAT_VECTOR", "dim": 2}]}"#,
    )
    .unwrap();
    assert_eq!(parse_schema_document(&path).unwrap().fields.len(), 2);
    assert!(parse_schema_document(&dir.path().join("missing.json")).is_err());
}

// =========================================================================
// Literals and lists
// =========================================================================

#[test]
fn test_clean_output_fields() {
    assert_eq!(clean_output_fields("['a', 'b', 'a']"), vec!["a", "b"]);
    assert_eq!(clean_output_fields("a,b"), vec!["a", "b"]);
    assert!(clean_output_fields(" , [] ").is_empty());
}

#[test]
fn test_vector_literals() {
    assert_eq!(parse_vector_literal("[0.1, 0.2]").unwrap(), vec![0.1, 0.2]);
    assert_eq!(parse_vector_literal("1,2,3").unwrap().len(), 3);
    assert!(parse_vector_literal("[]").is_err());
    assert!(parse_vector_literal("[a, b]").is_err());
    assert_eq!(parse_dense_vectors("[[1,2],[3,4]]").unwrap().len(), 2);
}

#[test]
fn test_sparse_literals() {
    assert_eq!(
        parse_sparse_literal("{7: 0.25, 1: 0.5}").unwrap(),
        vec![(1, 0.5), (7, 0.25)]
    );
    assert_eq!(
        parse_sparse_vectors("[{1: 0.5}, {\"2\": 1.0}]").unwrap().len(),
        2
    );
    assert!(parse_sparse_literal("{}").is_err());
}

#[test]
fn test_parse_ids_and_filter() {
    let ids = parse_ids("[1, 2]", DataType::Int64).unwrap();
    assert_eq!(ids_filter("id", &ids), "id in [1, 2]");
    let ids = parse_ids("['a','b']", DataType::VarChar).unwrap();
    assert_eq!(ids_filter("pk", &ids), "pk in [\"a\", \"b\"]");
    assert!(parse_ids("x", DataType::Int64).is_err());
}

#[test]
fn test_field_values() {
    let int8 = FieldSchema::new("n", DataType::Int8);
    assert!(parse_field_value(&int8, "300").is_err());
    assert_eq!(parse_field_value(&int8, "-3").unwrap(), json!(-3));

    let text = FieldSchema::new("t", DataType::VarChar).with_max_length(3);
    assert!(parse_field_value(&text, "abcd").is_err());
    assert_eq!(parse_field_value(&text, "'ab'").unwrap(), json!("ab"));

    let vec = FieldSchema::new("v", DataType::FloatVector).with_dim(2);
    assert!(parse_field_value(&vec, "[1,2,3]").is_err());
    assert_eq!(parse_field_value(&vec, "[1,2]").unwrap(), json!([1.0, 2.0]));

    let flag = FieldSchema::new("b", DataType::Bool);
    assert_eq!(parse_field_value(&flag, "TRUE").unwrap(), json!(true));
}

#[test]
fn test_validate_name() {
    assert!(validate_name("collection", "books_2").is_ok());
    assert!(validate_name("collection", "2books").is_err());
    assert!(validate_name("collection", "bad-name").is_err());
    assert!(validate_name("collection", "").is_err());
}

// =========================================================================
// Requests
// =========================================================================

#[test]
fn test_search_defaults_to_cosine_without_index() {
    let request = normalize_search_request(&search_input("[0.1, 0.2]")).unwrap();
    assert_eq!(request.metric_type, "COSINE");
    assert!(request.params.is_empty());
}

#[test]
fn test_search_uses_index_metric() {
    let mut input = search_input("[0.1, 0.2]");
    input.index = hnsw();
    input.params = vec!["ef:64".to_string()];
    let request = normalize_search_request(&input).unwrap();
    assert_eq!(request.metric_type, "L2");
    assert_eq!(request.params, vec![("ef".to_string(), json!(64))]);
}

#[test]
fn test_search_params_without_index_rejected() {
    let mut input = search_input("[0.1, 0.2]");
    input.params = vec!["ef:64".to_string()];
    let err = normalize_search_request(&input).unwrap_err();
    assert_eq!(err.kind(), "ParameterError");
}

#[test]
fn test_search_param_checked_against_index() {
    let mut input = search_input("[0.1, 0.2]");
    input.index = hnsw();
    input.params = vec!["nprobe:8".to_string()];
    assert_eq!(
        normalize_search_request(&input).unwrap_err().kind(),
        "IndexParamError"
    );
}

#[test]
fn test_search_empty_vector_rejected() {
    let err = normalize_search_request(&search_input("[]")).unwrap_err();
    assert!(err.to_string().contains("no numeric elements"));
}

#[test]
fn test_search_dim_mismatch_rejected() {
    assert!(normalize_search_request(&search_input("[1, 2, 3]")).is_err());
}

#[test]
fn test_search_limit_and_round_decimal_bounds() {
    let mut input = search_input("[1, 2]");
    input.limit = 0;
    assert!(normalize_search_request(&input).is_err());
    input.limit = MAX_LIMIT + 1;
    assert!(normalize_search_request(&input).is_err());
    input.limit = MAX_LIMIT;
    input.round_decimal = 7;
    assert!(normalize_search_request(&input).is_err());
}

#[test]
fn test_search_cleans_output_fields_and_metric() {
    let mut input = search_input("[1, 2]");
    input.output_fields = Some("['title', 'title', 'year']".to_string());
    input.metric_type = Some("ip".to_string());
    input.expr = Some("  ".to_string());
    let request = normalize_search_request(&input).unwrap();
    assert_eq!(request.output_fields, vec!["title", "year"]);
    assert_eq!(request.metric_type, "IP");
    assert_eq!(request.filter, None);

    input.metric_type = Some("HAMMING".to_string());
    assert!(normalize_search_request(&input).is_err());
}

#[test]
fn test_query_requires_expression() {
    let input = QueryInput {
        collection: "books".into(),
        expr: "   ".into(),
        ..Default::default()
    };
    assert_eq!(
        normalize_query_request(&input).unwrap_err().kind(),
        "ParameterError"
    );
}

#[test]
fn test_query_passes_expression_verbatim() {
    let input = QueryInput {
        collection: "books".into(),
        expr: "id in [1, 2] and title like \"a%\"".into(),
        output_fields: Some("[id, id, title]".into()),
        partition_names: Some("p1".into()),
        timeout: Some(5.0),
        ..Default::default()
    };
    let request = normalize_query_request(&input).unwrap();
    assert_eq!(request.filter, input.expr);
    assert_eq!(request.output_fields, vec!["id", "title"]);
    assert_eq!(request.partition_names, vec!["p1"]);

    let bad = QueryInput {
        timeout: Some(0.0),
        ..input
    };
    assert!(normalize_query_request(&bad).is_err());
}

#[test]
fn test_rankers() {
    assert_eq!(parse_ranker("rrf", None, 2).unwrap(), Ranker::Rrf { k: 60 });
    assert_eq!(parse_ranker("RRF", Some("10"), 2).unwrap(), Ranker::Rrf { k: 10 });
    assert_eq!(
        parse_ranker("weighted", Some("0.7,0.3"), 2).unwrap(),
        Ranker::Weighted(vec![0.7, 0.3])
    );
    assert_eq!(
        parse_ranker("weighted", Some("0.5,0.5"), 2).unwrap(),
        Ranker::Weighted(vec![0.5, 0.5])
    );
    assert_eq!(
        parse_ranker("weighted", Some("[0.2, 0.2, 0.6]"), 3).unwrap(),
        Ranker::Weighted(vec![0.2, 0.2, 0.6])
    );
    assert!(parse_ranker("weighted", Some("0.7"), 2).is_err());
    assert!(parse_ranker("weighted", Some("1.5,0"), 2).is_err());
    assert!(parse_ranker("max", None, 2).is_err());
}

#[test]
fn test_round_distances() {
    let mut hits = vec![vec![json!({"id": 1, "distance": 0.123_456})
        .as_object()
        .cloned()
        .unwrap()]];
    round_distances(&mut hits, 2);
    assert_eq!(hits[0][0]["distance"], json!(0.12));
}
