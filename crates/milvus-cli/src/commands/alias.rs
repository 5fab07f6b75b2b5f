use crate::error::Result;
use crate::ops::AliasOps;
use crate::output::View;
use crate::registry::{Args, CommandDescriptor, ParamSpec, Registry};
use crate::session::Session;
use crate::validate::validate_name;

use super::{ask, confirm, connected, COLLECTION, YES};

const ALIAS: ParamSpec = ParamSpec::value("alias", "a", "Alias name");

pub(super) fn register(registry: &mut Registry) {
    registry.register(
        CommandDescriptor::new("create", Some("alias"), "Point a new alias at a collection", create)
            .param(COLLECTION)
            .param(ALIAS),
    );
    registry.register(
        CommandDescriptor::new("alter", Some("alias"), "Re-point an alias", alter)
            .param(COLLECTION)
            .param(ALIAS),
    );
    registry.register(
        CommandDescriptor::new("delete", Some("alias"), "Drop an alias", delete)
            .param(ALIAS)
            .param(YES),
    );
    registry.register(
        CommandDescriptor::new("list", Some("aliases"), "List aliases", list).param(COLLECTION),
    );
    registry.register(
        CommandDescriptor::new("show", Some("alias"), "Describe an alias", show).param(ALIAS),
    );
}

fn create(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = ask(session, args, "collection", "Collection name")?;
    let alias = ask(session, args, "alias", "Alias name")?;
    validate_name("alias", &alias)?;
    AliasOps::new(session.client()?).create(&collection, &alias)?;
    Ok(View::message(format!(
        "Create alias {alias} for {collection} successfully!"
    )))
}

fn alter(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = ask(session, args, "collection", "Collection name")?;
    let alias = ask(session, args, "alias", "Alias name")?;
    AliasOps::new(session.client()?).alter(&collection, &alias)?;
    Ok(View::message(format!(
        "Alter alias {alias} to {collection} successfully!"
    )))
}

fn delete(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let alias = ask(session, args, "alias", "Alias name")?;
    confirm(session, args, &format!("Drop alias {alias}?"))?;
    AliasOps::new(session.client()?).drop(&alias)?;
    Ok(View::message(format!("Drop alias {alias} successfully!")))
}

fn list(session: &mut Session, args: &Args) -> Result<View> {
    let names = AliasOps::new(session.client()?).list(args.get("collection"))?;
    Ok(View::list("Aliases", names))
}

fn show(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let alias = ask(session, args, "alias", "Alias name")?;
    Ok(View::details(AliasOps::new(session.client()?).details(&alias)?))
}
