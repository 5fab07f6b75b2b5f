use milvus_client::ResourceGroupConfig;

use crate::error::{CliError, Result};
use crate::ops::ResourceGroupOps;
use crate::output::View;
use crate::registry::{Args, CommandDescriptor, ParamSpec, Registry};
use crate::session::Session;
use crate::validate::validate_name;

use super::{ask, ask_parsed, confirm, connected, COLLECTION, YES};

const NAME: ParamSpec = ParamSpec::value("name", "n", "Resource group name");
const REQUESTS: ParamSpec = ParamSpec::value("requests", "r", "Requested node count");
const LIMITS: ParamSpec = ParamSpec::value("limits", "l", "Node count limit");

pub(super) fn register(registry: &mut Registry) {
    registry.register(
        CommandDescriptor::new(
            "create",
            Some("resource_group"),
            "Create a resource group",
            create,
        )
        .param(NAME)
        .param(REQUESTS)
        .param(LIMITS),
    );
    registry.register(
        CommandDescriptor::new(
            "update",
            Some("resource_group"),
            "Change node requests and limits",
            update,
        )
        .param(NAME)
        .param(REQUESTS)
        .param(LIMITS),
    );
    registry.register(
        CommandDescriptor::new(
            "delete",
            Some("resource_group"),
            "Drop a resource group",
            delete,
        )
        .param(NAME)
        .param(YES),
    );
    registry.register(CommandDescriptor::new(
        "list",
        Some("resource_groups"),
        "List resource groups",
        list,
    ));
    registry.register(
        CommandDescriptor::new("show", Some("resource_group"), "Describe a resource group", show)
            .param(NAME),
    );
    registry.register(
        CommandDescriptor::new(
            "transfer",
            Some("replica"),
            "Move replicas between resource groups",
            transfer_replica,
        )
        .param(ParamSpec::value("source", "s", "Source resource group"))
        .param(ParamSpec::value("target", "t", "Target resource group"))
        .param(COLLECTION)
        .param(ParamSpec::value("num_replicas", "r", "Replicas to move")),
    );
}

fn group_config(session: &mut Session, args: &Args) -> Result<ResourceGroupConfig> {
    let requests_node_num = ask_parsed(session, args, "requests", "Requested nodes", 0_u32)?;
    let limits_node_num = ask_parsed(session, args, "limits", "Node limit", requests_node_num)?;
    if limits_node_num < requests_node_num {
        return Err(CliError::parameter(
            "limits",
            format!("{limits_node_num} is below the requested {requests_node_num} nodes"),
        ));
    }
    Ok(ResourceGroupConfig {
        requests_node_num,
        limits_node_num,
    })
}

fn create(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = ask(session, args, "name", "Resource group name")?;
    validate_name("name", &name)?;
    let config = group_config(session, args)?;
    ResourceGroupOps::new(session.client()?).create(&name, &config)?;
    Ok(View::message(format!(
        "Create resource group {name} successfully!"
    )))
}

fn update(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = ask(session, args, "name", "Resource group name")?;
    let config = group_config(session, args)?;
    ResourceGroupOps::new(session.client()?).update(&name, &config)?;
    Ok(View::message(format!(
        "Update resource group {name} successfully!"
    )))
}

fn delete(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = ask(session, args, "name", "Resource group name")?;
    confirm(session, args, &format!("Drop resource group {name}?"))?;
    ResourceGroupOps::new(session.client()?).drop(&name)?;
    Ok(View::message(format!("Drop resource group {name} successfully!")))
}

fn list(session: &mut Session, _args: &Args) -> Result<View> {
    Ok(View::list(
        "Resource Groups",
        ResourceGroupOps::new(session.client()?).list()?,
    ))
}

fn show(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = ask(session, args, "name", "Resource group name")?;
    Ok(View::details(
        ResourceGroupOps::new(session.client()?).details(&name)?,
    ))
}

fn transfer_replica(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let source = ask(session, args, "source", "Source resource group")?;
    let target = ask(session, args, "target", "Target resource group")?;
    let collection = ask(session, args, "collection", "Collection name")?;
    let num_replicas = ask_parsed(session, args, "num_replicas", "Replicas to move", 1_u32)?;
    if num_replicas == 0 {
        return Err(CliError::parameter("num_replicas", "must be at least 1"));
    }
    ResourceGroupOps::new(session.client()?).transfer_replica(
        &source,
        &target,
        &collection,
        num_replicas,
    )?;
    Ok(View::message(format!(
        "Transfer {num_replicas} replica(s) of {collection} from {source} to {target} successfully!"
    )))
}
