use crate::error::Result;
use crate::ops::DatabaseOps;
use crate::output::View;
use crate::registry::{Args, CommandDescriptor, ParamSpec, Registry};
use crate::session::Session;
use crate::validate::{parse_properties, validate_name};

use super::{ask, confirm, connected, YES};

const DB: ParamSpec = ParamSpec::value("db", "d", "Database name");

pub(super) fn register(registry: &mut Registry) {
    registry.register(
        CommandDescriptor::new("create", Some("database"), "Create a database", create)
            .param(DB)
            .param(ParamSpec::multi("property", "P", "Property as key:value")),
    );
    registry.register(
        CommandDescriptor::new("delete", Some("database"), "Drop a database", delete)
            .param(DB)
            .param(YES),
    );
    registry.register(CommandDescriptor::new(
        "list",
        Some("databases"),
        "List databases",
        list,
    ));
    registry.register(
        CommandDescriptor::new("show", Some("database"), "Describe a database", show).param(DB),
    );
    registry.register(
        CommandDescriptor::new("use", Some("database"), "Switch the current database", use_db)
            .param(ParamSpec::positional("name", "Database name"))
            .param(DB),
    );
}

fn create(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = ask(session, args, "db", "Database name")?;
    validate_name("db", &name)?;
    let properties = parse_properties(args.all("property"))?;
    DatabaseOps::new(session.client()?).create(&name, &properties)?;
    session.invalidate_completion();
    Ok(View::message(format!("Create database {name} successfully!")))
}

fn delete(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = ask(session, args, "db", "Database name")?;
    confirm(session, args, &format!("Drop database {name}?"))?;
    DatabaseOps::new(session.client()?).drop(&name)?;
    session.invalidate_completion();
    Ok(View::message(format!("Drop database {name} successfully!")))
}

fn list(session: &mut Session, _args: &Args) -> Result<View> {
    let names = DatabaseOps::new(session.client()?).list()?;
    Ok(View::list("Databases", names))
}

fn show(session: &mut Session, args: &Args) -> Result<View> {
    let name = match args.get("db") {
        Some(name) => name.to_string(),
        None => session.client()?.current_database().to_string(),
    };
    Ok(View::details(DatabaseOps::new(session.client()?).details(&name)?))
}

fn use_db(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let name = match args.get("name") {
        Some(name) => name.to_string(),
        None => ask(session, args, "db", "Database name")?,
    };
    let exists = DatabaseOps::new(session.client()?).has(&name)?;
    crate::ops::ensure_exists("Database", &name, exists)?;
    session.use_database(&name)?;
    Ok(View::message(format!("Using database {name}.")))
}
