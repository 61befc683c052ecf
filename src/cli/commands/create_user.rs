use std::io::Write;

use crate::config::Config;
use crate::db::{NewUser, Store};
use crate::domain::Role;

pub async fn cmd_create_user(
    config: &Config,
    username: &str,
    role: &str,
    email: Option<String>,
    department: Option<String>,
) -> anyhow::Result<()> {
    let role: Role = role.parse()?;
    let username = username.trim();
    if username.is_empty() {
        anyhow::bail!("Username cannot be empty");
    }

    let store = Store::new(&config.general.database_path).await?;

    if store.user_repo().get_by_username(username).await?.is_some() {
        println!("User '{username}' already exists.");
        return Ok(());
    }

    let department_id = match department.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            let existing = store
                .list_departments()
                .await?
                .into_iter()
                .find(|d| d.name.eq_ignore_ascii_case(name));
            let department = match existing {
                Some(d) => d,
                None => store.create_department(name).await?,
            };
            Some(department.id)
        }
        _ => None,
    };

    print!("Password for {username}: ");
    std::io::stdout().flush()?;
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']).to_string();

    if password.chars().count() < config.security.min_password_length {
        anyhow::bail!(
            "Password must be at least {} characters",
            config.security.min_password_length
        );
    }

    let user = store
        .user_repo()
        .create(
            NewUser {
                username: username.to_string(),
                password,
                email,
                role,
                department_id,
                is_superadmin: role == Role::Superadmin,
            },
            &config.security,
            chrono::Utc::now().naive_utc(),
        )
        .await?;

    println!("✓ Created user {} (ID {}) with role {}", user.username, user.id, user.role);
    Ok(())
}
