use milvus_client::{DataType, IndexParams};

use crate::error::{CliError, Result};
use crate::ops::{CollectionOps, IndexOps};
use crate::output::View;
use crate::registry::{Args, CommandDescriptor, ParamSpec, Registry};
use crate::session::Session;
use crate::validate::{
    index_type_names, normalize_index_params, normalize_metric, BINARY_METRICS,
    FLOAT_METRICS, SCALAR_INDEX_TYPES, SPARSE_METRICS,
};

use super::{ask, ask_or, ask_pairs, choose, confirm, connected, COLLECTION, YES};

const INDEX_NAME: ParamSpec = ParamSpec::value("index_name", "n", "Index name");

pub(super) fn register(registry: &mut Registry) {
    registry.register(
        CommandDescriptor::new("create", Some("index"), "Build an index on a field", create)
            .param(COLLECTION)
            .param(ParamSpec::value("field", "f", "Indexed field"))
            .param(INDEX_NAME)
            .param(ParamSpec::value("index_type", "t", "Index algorithm, e.g. HNSW"))
            .param(ParamSpec::value("metric", "m", "Metric type, e.g. COSINE"))
            .param(ParamSpec::multi("param", "P", "Build parameter as key:value")),
    );
    registry.register(
        CommandDescriptor::new("delete", Some("index"), "Drop an index", delete)
            .param(COLLECTION)
            .param(INDEX_NAME)
            .param(YES),
    );
    registry.register(
        CommandDescriptor::new("list", Some("indexes"), "List indexes of a collection", list)
            .param(COLLECTION),
    );
    registry.register(
        CommandDescriptor::new("show", Some("index"), "Describe an index", show)
            .param(COLLECTION)
            .param(INDEX_NAME),
    );
}

fn metrics_for(data_type: DataType) -> (&'static [&'static str], usize) {
    match data_type {
        DataType::BinaryVector => (BINARY_METRICS, 0),
        DataType::SparseFloatVector => (SPARSE_METRICS, 0),
        _ => (FLOAT_METRICS, 2),
    }
}

fn create(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = ask(session, args, "collection", "Collection name")?;
    let types = index_type_names();
    let index_type = choose(session, args, "index_type", "Index type", &types, None)?;
    let raw_params = ask_pairs(session, args, "param", "Build parameter key:value")?;
    let params = normalize_index_params(&index_type, &raw_params)?;

    let info = CollectionOps::new(session.client()?).describe(&collection)?;
    let field_names: Vec<&str> = info.fields.iter().map(|f| f.name.as_str()).collect();
    let default_field = info.fields.iter().position(|f| f.data_type.is_vector());
    let field_name = choose(session, args, "field", "Field", &field_names, default_field)?;
    let data_type = info
        .fields
        .iter()
        .find(|f| f.name == field_name)
        .map_or(DataType::Int64, |f| f.data_type);

    let is_scalar_index = SCALAR_INDEX_TYPES.contains(&index_type.as_str());
    if index_type != "AUTOINDEX" && data_type.is_vector() == is_scalar_index {
        return Err(CliError::parameter(
            "index_type",
            format!("{index_type} cannot index {field_name} of type {data_type}"),
        ));
    }
    let metric_type = if data_type.is_vector() {
        let (metrics, default) = metrics_for(data_type);
        let raw = choose(session, args, "metric", "Metric type", metrics, Some(default))?;
        Some(normalize_metric(&raw, data_type)?)
    } else {
        None
    };
    let index_name = ask_or(session, args, "index_name", "Index name", &field_name)?;

    let request = IndexParams {
        field_name: field_name.clone(),
        index_name: index_name.clone(),
        index_type,
        metric_type,
        params,
    };
    IndexOps::new(session.client()?).create(&collection, &request)?;
    Ok(View::message(format!(
        "Create index {index_name} on {collection}.{field_name} successfully!"
    )))
}

fn delete(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = ask(session, args, "collection", "Collection name")?;
    let index_name = ask(session, args, "index_name", "Index name")?;
    confirm(
        session,
        args,
        &format!("Drop index {index_name} of {collection}?"),
    )?;
    IndexOps::new(session.client()?).drop(&collection, &index_name)?;
    Ok(View::message(format!(
        "Drop index {index_name} of {collection} successfully!"
    )))
}

fn list(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = ask(session, args, "collection", "Collection name")?;
    let names = IndexOps::new(session.client()?).list(&collection)?;
    Ok(View::list("Indexes", names))
}

fn show(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = ask(session, args, "collection", "Collection name")?;
    let index_name = ask(session, args, "index_name", "Index name")?;
    Ok(View::details(
        IndexOps::new(session.client()?).details(&collection, &index_name)?,
    ))
}
