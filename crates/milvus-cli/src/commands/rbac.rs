//! Users, roles, privileges and privilege groups.

use milvus_client::{PrivilegeGrant, Row};
use serde_json::Value;

use crate::error::{CliError, Result};
use crate::ops::{PrivilegeGroupOps, RoleOps, UserOps};
use crate::output::View;
use crate::registry::{Args, CommandDescriptor, ParamSpec, Registry};
use crate::session::Session;
use crate::validate::{clean_output_fields, validate_name};

use super::{ask, ask_or, ask_password, choose, confirm, connected, YES};

const USER: ParamSpec = ParamSpec::value("user", "u", "User name");
const ROLE: ParamSpec = ParamSpec::value("role", "r", "Role name");
const GROUP: ParamSpec = ParamSpec::value("group", "g", "Privilege group name");
const OBJECT_TYPES: &[&str] = &["Global", "Collection", "User"];

pub(super) fn register(registry: &mut Registry) {
    registry.register(
        CommandDescriptor::new("create", Some("user"), "Create a user", create_user)
            .param(USER)
            .param(ParamSpec::value("password", "w", "Password")),
    );
    registry.register(
        CommandDescriptor::new("delete", Some("user"), "Drop a user", delete_user)
            .param(USER)
            .param(YES),
    );
    registry.register(CommandDescriptor::new("list", Some("users"), "List users", list_users));
    registry.register(
        CommandDescriptor::new("show", Some("user"), "Describe a user", show_user).param(USER),
    );
    registry.register(
        CommandDescriptor::new("update", Some("password"), "Change a password", update_password)
            .param(USER)
            .param(ParamSpec::value("old_password", "o", "Current password"))
            .param(ParamSpec::value("new_password", "w", "New password")),
    );

    registry.register(
        CommandDescriptor::new("create", Some("role"), "Create a role", create_role).param(ROLE),
    );
    registry.register(
        CommandDescriptor::new("delete", Some("role"), "Drop a role", delete_role)
            .param(ROLE)
            .param(YES),
    );
    registry.register(CommandDescriptor::new("list", Some("roles"), "List roles", list_roles));
    registry.register(
        CommandDescriptor::new("show", Some("role"), "Show the privileges of a role", show_role)
            .param(ROLE),
    );
    registry.register(
        CommandDescriptor::new("grant", Some("role"), "Grant a role to a user", grant_role)
            .param(ROLE)
            .param(USER),
    );
    registry.register(
        CommandDescriptor::new("revoke", Some("role"), "Revoke a role from a user", revoke_role)
            .param(ROLE)
            .param(USER),
    );
    for (verb, about, handler) in [
        (
            "grant",
            "Grant a privilege or privilege group to a role",
            grant_privilege as crate::registry::Handler,
        ),
        (
            "revoke",
            "Revoke a privilege or privilege group from a role",
            revoke_privilege,
        ),
    ] {
        registry.register(
            CommandDescriptor::new(verb, Some("privilege"), about, handler)
                .param(ROLE)
                .param(ParamSpec::value("object_type", "o", "Global, Collection or User"))
                .param(ParamSpec::value("object_name", "n", "Object name, * for all"))
                .param(ParamSpec::value("privilege", "P", "Privilege or privilege group"))
                .param(ParamSpec::value("db", "d", "Database scope")),
        );
    }

    registry.register(
        CommandDescriptor::new(
            "create",
            Some("privilege_group"),
            "Create a privilege group",
            create_group,
        )
        .param(GROUP),
    );
    registry.register(
        CommandDescriptor::new(
            "delete",
            Some("privilege_group"),
            "Drop a privilege group",
            delete_group,
        )
        .param(GROUP)
        .param(YES),
    );
    registry.register(CommandDescriptor::new(
        "list",
        Some("privilege_groups"),
        "List privilege groups",
        list_groups,
    ));
    registry.register(
        CommandDescriptor::new(
            "update",
            Some("privilege_group"),
            "Add or remove privileges of a group",
            update_group,
        )
        .param(GROUP)
        .param(ParamSpec::value("action", "a", "add or remove"))
        .param(ParamSpec::value("privileges", "P", "Comma separated privileges")),
    );
}

// ------------------------------------------------------------------- users

fn create_user(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let user = ask(session, args, "user", "User name")?;
    validate_name("user", &user)?;
    let password = ask_password(session, args, "password", "Password")?;
    UserOps::new(session.client()?).create(&user, &password)?;
    Ok(View::message(format!("Create user {user} successfully!")))
}

fn delete_user(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let user = ask(session, args, "user", "User name")?;
    confirm(session, args, &format!("Drop user {user}?"))?;
    UserOps::new(session.client()?).drop(&user)?;
    Ok(View::message(format!("Drop user {user} successfully!")))
}

fn list_users(session: &mut Session, _args: &Args) -> Result<View> {
    Ok(View::list("Users", UserOps::new(session.client()?).list()?))
}

fn show_user(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let user = ask(session, args, "user", "User name")?;
    Ok(View::details(UserOps::new(session.client()?).details(&user)?))
}

fn update_password(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let user = ask(session, args, "user", "User name")?;
    let old_password = ask_password(session, args, "old_password", "Current password")?;
    let new_password = ask_password(session, args, "new_password", "New password")?;
    UserOps::new(session.client()?).update_password(&user, &old_password, &new_password)?;
    Ok(View::message(format!(
        "Update password of {user} successfully!"
    )))
}

// ------------------------------------------------------------------- roles

fn create_role(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let role = ask(session, args, "role", "Role name")?;
    validate_name("role", &role)?;
    RoleOps::new(session.client()?).create(&role)?;
    Ok(View::message(format!("Create role {role} successfully!")))
}

fn delete_role(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let role = ask(session, args, "role", "Role name")?;
    confirm(session, args, &format!("Drop role {role}?"))?;
    RoleOps::new(session.client()?).drop(&role)?;
    Ok(View::message(format!("Drop role {role} successfully!")))
}

fn list_roles(session: &mut Session, _args: &Args) -> Result<View> {
    Ok(View::list("Roles", RoleOps::new(session.client()?).list()?))
}

fn show_role(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let role = ask(session, args, "role", "Role name")?;
    let rows = RoleOps::new(session.client()?).grants(&role)?;
    Ok(View::Rows {
        headers: ["Object Type", "Object Name", "Privilege", "Database", "Grantor"]
            .iter()
            .map(ToString::to_string)
            .collect(),
        rows,
    })
}

fn user_and_role(session: &mut Session, args: &Args) -> Result<(String, String)> {
    let role = ask(session, args, "role", "Role name")?;
    let user = ask(session, args, "user", "User name")?;
    Ok((user, role))
}

fn grant_role(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let (user, role) = user_and_role(session, args)?;
    UserOps::new(session.client()?).grant_role(&user, &role)?;
    Ok(View::message(format!("Grant role {role} to {user} successfully!")))
}

fn revoke_role(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let (user, role) = user_and_role(session, args)?;
    UserOps::new(session.client()?).revoke_role(&user, &role)?;
    Ok(View::message(format!(
        "Revoke role {role} from {user} successfully!"
    )))
}

fn privilege_grant(session: &mut Session, args: &Args) -> Result<(String, PrivilegeGrant)> {
    let role = ask(session, args, "role", "Role name")?;
    let object_type = choose(session, args, "object_type", "Object type", OBJECT_TYPES, None)?;
    let object_name = ask_or(session, args, "object_name", "Object name", "*")?;
    let privilege = ask(session, args, "privilege", "Privilege")?;
    let current_db = session.client()?.current_database().to_string();
    let db_name = ask_or(session, args, "db", "Database", &current_db)?;
    Ok((
        role,
        PrivilegeGrant {
            object_type,
            object_name,
            privilege,
            db_name,
            grantor: None,
        },
    ))
}

fn grant_privilege(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let (role, grant) = privilege_grant(session, args)?;
    RoleOps::new(session.client()?).grant(&role, &grant)?;
    Ok(View::message(format!(
        "Grant {} on {} {} to {role} successfully!",
        grant.privilege, grant.object_type, grant.object_name
    )))
}

fn revoke_privilege(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let (role, grant) = privilege_grant(session, args)?;
    RoleOps::new(session.client()?).revoke(&role, &grant)?;
    Ok(View::message(format!(
        "Revoke {} on {} {} from {role} successfully!",
        grant.privilege, grant.object_type, grant.object_name
    )))
}

// -------------------------------------------------------- privilege groups

fn create_group(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let group = ask(session, args, "group", "Privilege group name")?;
    validate_name("group", &group)?;
    PrivilegeGroupOps::new(session.client()?).create(&group)?;
    Ok(View::message(format!(
        "Create privilege group {group} successfully!"
    )))
}

fn delete_group(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let group = ask(session, args, "group", "Privilege group name")?;
    confirm(session, args, &format!("Drop privilege group {group}?"))?;
    PrivilegeGroupOps::new(session.client()?).drop(&group)?;
    Ok(View::message(format!(
        "Drop privilege group {group} successfully!"
    )))
}

fn list_groups(session: &mut Session, _args: &Args) -> Result<View> {
    let groups = PrivilegeGroupOps::new(session.client()?).list()?;
    let rows = groups
        .into_iter()
        .map(|g| {
            let mut row = Row::new();
            row.insert("Name".to_string(), Value::from(g.name));
            row.insert("Privileges".to_string(), Value::from(g.privileges.join(", ")));
            row
        })
        .collect();
    Ok(View::Rows {
        headers: vec!["Name".to_string(), "Privileges".to_string()],
        rows,
    })
}

fn update_group(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let group = ask(session, args, "group", "Privilege group name")?;
    let action = choose(session, args, "action", "Action", &["add", "remove"], None)?;
    let privileges = clean_output_fields(&ask(session, args, "privileges", "Privileges")?);
    if privileges.is_empty() {
        return Err(CliError::parameter("privileges", "no privilege given"));
    }
    let ops = PrivilegeGroupOps::new(session.client()?);
    if action == "add" {
        ops.add(&group, &privileges)?;
    } else {
        ops.remove(&group, &privileges)?;
    }
    Ok(View::message(format!(
        "Update privilege group {group} successfully!"
    )))
}
