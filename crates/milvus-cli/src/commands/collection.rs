//! Collection commands, maintenance included.

use milvus_client::{
    CollectionSchema, ConsistencyLevel, CreateCollectionOptions, DataType,
};
use serde_json::Value;
use std::path::Path;

use crate::error::{CliError, Result};
use crate::ops::CollectionOps;
use crate::output::View;
use crate::registry::{Args, CommandDescriptor, ParamSpec, Registry};
use crate::session::Session;
use crate::validate::{
    normalize_field, normalize_schema, parse_field_token, parse_schema_document, validate_name,
    RawFieldAttributes,
};

use super::{ask, ask_parsed, ask_switch, confirm, connected, COLLECTION, PARTITION, YES};

pub(super) fn register(registry: &mut Registry) {
    registry.register(
        CommandDescriptor::new("create", Some("collection"), "Create a collection", create)
            .param(COLLECTION)
            .param(ParamSpec::value("schema_file", "s", "Schema document (.json or .toml)"))
            .param(ParamSpec::multi("field", "f", "Field as name:TYPE[:attributes]"))
            .param(ParamSpec::value("description", "d", "Collection description"))
            .param(ParamSpec::switch("auto_id", "a", "Server generated primary keys"))
            .param(ParamSpec::switch("dynamic", "e", "Enable the dynamic field"))
            .param(ParamSpec::value("shards", "n", "Shard count"))
            .param(ParamSpec::value("consistency_level", "l", "Strong, Session, Bounded or Eventually"))
            .param(ParamSpec::value("num_partitions", "np", "Partitions for a partition key")),
    );
    registry.register(
        CommandDescriptor::new("delete", Some("collection"), "Drop a collection", delete)
            .param(COLLECTION)
            .param(YES),
    );
    registry.register(CommandDescriptor::new(
        "list",
        Some("collections"),
        "List collections of the current database",
        list,
    ));
    registry.register(
        CommandDescriptor::new("show", Some("collection"), "Describe a collection", show)
            .param(COLLECTION),
    );
    registry.register(
        CommandDescriptor::new("rename", Some("collection"), "Rename a collection", rename)
            .param(COLLECTION)
            .param(ParamSpec::value("new_name", "n", "New name"))
            .param(ParamSpec::value("new_db", "d", "Move into this database")),
    );
    registry.register(
        CommandDescriptor::new("load", Some("collection"), "Load a collection for search", load)
            .param(COLLECTION)
            .param(ParamSpec::value("replicas", "r", "Replica count")),
    );
    registry.register(
        CommandDescriptor::new("release", Some("collection"), "Release a loaded collection", release)
            .param(COLLECTION),
    );
    registry.register(
        CommandDescriptor::new("show", Some("load_state"), "Show the load state", load_state)
            .param(COLLECTION)
            .param(PARTITION),
    );
    registry.register(
        CommandDescriptor::new("flush", None, "Seal growing segments of a collection", flush)
            .param(COLLECTION),
    );
    registry.register(
        CommandDescriptor::new("compact", None, "Start a compaction", compact).param(COLLECTION),
    );
    registry.register(
        CommandDescriptor::new(
            "show",
            Some("compaction_state"),
            "Show the state of a compaction job",
            compaction_state,
        )
        .param(ParamSpec::value("job_id", "j", "Compaction job id")),
    );
}

fn collection_name(session: &mut Session, args: &Args) -> Result<String> {
    ask(session, args, "collection", "Collection name")
}

fn prompt_schema(session: &mut Session, args: &Args) -> Result<CollectionSchema> {
    let type_names: Vec<&str> = DataType::ALL.iter().map(|t| t.token()).collect();
    let element_names: Vec<&str> = DataType::ALL
        .iter()
        .filter(|t| t.can_be_element())
        .map(|t| t.token())
        .collect();
    let mut fields = Vec::new();
    loop {
        let name = session
            .prompter()
            .input("Field name (empty to finish)", Some(""))?;
        let name = name.trim().to_string();
        if name.is_empty() {
            break;
        }
        let index = session.prompter().select("Field type", &type_names, 0)?;
        let raw_type = type_names.get(index).copied().unwrap_or("INT64");
        let data_type = DataType::from_token(raw_type).unwrap_or(DataType::Int64);

        let mut attrs = RawFieldAttributes::default();
        if data_type.requires_dim() {
            attrs.dim = Some(session.prompter().input("Dimension", None)?);
        }
        if data_type == DataType::VarChar {
            attrs.max_length = Some(session.prompter().input("Max length", Some("256"))?);
        }
        if data_type == DataType::Array {
            let i = session.prompter().select("Element type", &element_names, 0)?;
            let element = element_names.get(i).copied().unwrap_or("INT64");
            attrs.element_type = Some(element.to_string());
            attrs.max_capacity = Some(session.prompter().input("Max capacity", Some("64"))?);
            if element == "VARCHAR" {
                attrs.max_length =
                    Some(session.prompter().input("Element max length", Some("256"))?);
            }
        }
        let has_primary = fields.iter().any(|f: &milvus_client::FieldSchema| f.is_primary);
        if data_type.can_be_primary() && !has_primary {
            attrs.is_primary = session.prompter().confirm("Primary key?", false)?;
            if attrs.is_primary && data_type == DataType::Int64 {
                attrs.auto_id = ask_switch(session, args, "auto_id", "Auto ID?")?;
            }
        }
        attrs.description = session.prompter().input("Field description", Some(""))?;
        fields.push(normalize_field(&name, raw_type, &attrs)?);
    }
    let description = session
        .prompter()
        .input("Collection description", Some(""))?;
    let dynamic = ask_switch(session, args, "dynamic", "Enable dynamic field?")?;
    normalize_schema(fields, description.trim(), false, dynamic)
}

fn create(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = collection_name(session, args)?;
    validate_name("collection", &name)?;

    let schema = if let Some(path) = args.get("schema_file") {
        parse_schema_document(Path::new(path))?
    } else if !args.all("field").is_empty() {
        let fields = args
            .all("field")
            .iter()
            .map(|token| parse_field_token(token))
            .collect::<Result<Vec<_>>>()?;
        normalize_schema(
            fields,
            args.get("description").unwrap_or_default(),
            args.flag("auto_id"),
            args.flag("dynamic"),
        )?
    } else if session.is_interactive() {
        prompt_schema(session, args)?
    } else {
        return Err(CliError::parameter(
            "field",
            "is required, pass --schema-file or one --field per column",
        ));
    };

    let consistency_level = match args.get("consistency_level") {
        Some(raw) => Some(ConsistencyLevel::parse(raw).ok_or_else(|| {
            CliError::parameter(
                "consistency_level",
                format!("'{raw}' is not one of [Strong, Session, Bounded, Eventually]"),
            )
        })?),
        None => None,
    };
    let options = CreateCollectionOptions {
        shards_num: args.parsed("shards")?,
        consistency_level,
        num_partitions: args.parsed("num_partitions")?,
    };
    CollectionOps::new(session.client()?).create(&name, &schema, &options)?;
    session.invalidate_completion();
    Ok(View::message(format!("Create collection {name} successfully!")))
}

fn delete(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = collection_name(session, args)?;
    confirm(
        session,
        args,
        &format!("Drop collection {name} and all its data?"),
    )?;
    CollectionOps::new(session.client()?).drop(&name)?;
    session.invalidate_completion();
    Ok(View::message(format!("Drop collection {name} successfully!")))
}

fn list(session: &mut Session, _args: &Args) -> Result<View> {
    let names = CollectionOps::new(session.client()?).list()?;
    Ok(View::list("Collections", names))
}

fn show(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = collection_name(session, args)?;
    Ok(View::details(CollectionOps::new(session.client()?).details(&name)?))
}

fn rename(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = collection_name(session, args)?;
    let new_name = ask(session, args, "new_name", "New collection name")?;
    validate_name("new_name", &new_name)?;
    CollectionOps::new(session.client()?).rename(&name, &new_name, args.get("new_db"))?;
    session.invalidate_completion();
    Ok(View::message(format!(
        "Rename collection {name} to {new_name} successfully!"
    )))
}

fn load(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = collection_name(session, args)?;
    let replicas = ask_parsed(session, args, "replicas", "Replica count", 1_u32)?;
    if replicas == 0 {
        return Err(CliError::parameter("replicas", "must be at least 1"));
    }
    CollectionOps::new(session.client()?).load(&name, Some(replicas))?;
    Ok(View::message(format!("Load collection {name} successfully!")))
}

fn release(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = collection_name(session, args)?;
    CollectionOps::new(session.client()?).release(&name)?;
    Ok(View::message(format!("Release collection {name} successfully!")))
}

fn load_state(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = collection_name(session, args)?;
    let partition = args.get("partition");
    let status = CollectionOps::new(session.client()?).load_state(&name, partition)?;
    let mut entries = vec![("Collection".to_string(), Value::from(name))];
    if let Some(partition) = partition {
        entries.push(("Partition".to_string(), Value::from(partition)));
    }
    entries.push(("State".to_string(), Value::from(status.state.as_str())));
    if let Some(progress) = status.progress {
        entries.push(("Progress".to_string(), Value::from(format!("{progress}%"))));
    }
    Ok(View::details(entries))
}

fn flush(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = collection_name(session, args)?;
    CollectionOps::new(session.client()?).flush(&name)?;
    Ok(View::message(format!("Flush collection {name} successfully!")))
}

fn compact(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = collection_name(session, args)?;
    let job_id = CollectionOps::new(session.client()?).compact(&name)?;
    Ok(View::message(format!(
        "Compaction of {name} started, job id {job_id}."
    )))
}

fn compaction_state(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let raw = ask(session, args, "job_id", "Compaction job id")?;
    let job_id: i64 = raw
        .parse()
        .map_err(|_| CliError::parameter("job_id", format!("'{raw}' is not a job id")))?;
    let state = CollectionOps::new(session.client()?).compaction_state(job_id)?;
    Ok(View::details(vec![
        ("Job ID".to_string(), Value::from(state.job_id)),
        ("State".to_string(), Value::from(state.state)),
        ("Executing Plans".to_string(), Value::from(state.executing_plans)),
        ("Completed Plans".to_string(), Value::from(state.completed_plans)),
        ("Timeout Plans".to_string(), Value::from(state.timeout_plans)),
    ]))
}
