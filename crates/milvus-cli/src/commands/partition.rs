use crate::error::Result;
use crate::ops::PartitionOps;
use crate::output::View;
use crate::registry::{Args, CommandDescriptor, Registry};
use crate::session::Session;
use crate::validate::{clean_output_fields, validate_name};

use super::{ask, confirm, connected, COLLECTION, PARTITION, YES};

pub(super) fn register(registry: &mut Registry) {
    registry.register(
        CommandDescriptor::new("create", Some("partition"), "Create a partition", create)
            .param(COLLECTION)
            .param(PARTITION),
    );
    registry.register(
        CommandDescriptor::new("delete", Some("partition"), "Drop a partition", delete)
            .param(COLLECTION)
            .param(PARTITION)
            .param(YES),
    );
    registry.register(
        CommandDescriptor::new("list", Some("partitions"), "List partitions of a collection", list)
            .param(COLLECTION),
    );
    registry.register(
        CommandDescriptor::new("show", Some("partition"), "Describe a partition", show)
            .param(COLLECTION)
            .param(PARTITION),
    );
    registry.register(
        CommandDescriptor::new("load", Some("partition"), "Load partitions", load)
            .param(COLLECTION)
            .param(PARTITION),
    );
    registry.register(
        CommandDescriptor::new("release", Some("partition"), "Release partitions", release)
            .param(COLLECTION)
            .param(PARTITION),
    );
}

fn names(session: &mut Session, args: &Args) -> Result<(String, String)> {
    let collection = ask(session, args, "collection", "Collection name")?;
    let partition = ask(session, args, "partition", "Partition name")?;
    Ok((collection, partition))
}

fn create(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let (collection, partition) = names(session, args)?;
    validate_name("partition", &partition)?;
    PartitionOps::new(session.client()?).create(&collection, &partition)?;
    Ok(View::message(format!(
        "Create partition {partition} in {collection} successfully!"
    )))
}

fn delete(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let (collection, partition) = names(session, args)?;
    confirm(
        session,
        args,
        &format!("Drop partition {partition} of {collection} and its data?"),
    )?;
    PartitionOps::new(session.client()?).drop(&collection, &partition)?;
    Ok(View::message(format!(
        "Drop partition {partition} of {collection} successfully!"
    )))
}

fn list(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = ask(session, args, "collection", "Collection name")?;
    let names = PartitionOps::new(session.client()?).list(&collection)?;
    Ok(View::list("Partitions", names))
}

fn show(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let (collection, partition) = names(session, args)?;
    Ok(View::details(
        PartitionOps::new(session.client()?).details(&collection, &partition)?,
    ))
}

fn load(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let (collection, raw) = names(session, args)?;
    let partitions = clean_output_fields(&raw);
    PartitionOps::new(session.client()?).load(&collection, &partitions)?;
    Ok(View::message(format!(
        "Load partitions {} of {collection} successfully!",
        partitions.join(", ")
    )))
}

fn release(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let (collection, raw) = names(session, args)?;
    let partitions = clean_output_fields(&raw);
    PartitionOps::new(session.client()?).release(&collection, &partitions)?;
    Ok(View::message(format!(
        "Release partitions {} of {collection} successfully!",
        partitions.join(", ")
    )))
}
