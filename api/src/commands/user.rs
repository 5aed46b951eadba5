use crate::repository::{Database, UserRepository};

/// `user create` — seeds the singleton row (§3 User). There is no
/// registration flow in scope (§1 excludes authentication), so this is the
/// only way the single user comes to exist; an operator runs it once after
/// `migrate`, passing an already-hashed password.
pub async fn create_user(database: &Database, username: &str, password_hash: &str) -> anyhow::Result<()> {
    let mut tx = database.begin().await?;
    let user = database.create_user(&mut tx, username, password_hash).await?;
    tx.commit().await?;
    println!("Created user {} ({})", user.username, user.id);
    Ok(())
}

/// `user show` — prints the singleton user's sync settings, mostly useful
/// for confirming `initial_sync_days`/`initial_sync_max_count` before the
/// first backfill runs.
pub async fn show_user(database: &Database) -> anyhow::Result<()> {
    let mut tx = database.begin().await?;
    let user = database.get_user(&mut tx).await?;
    tx.commit().await?;

    match user {
        Some(user) => {
            println!("username: {}", user.username);
            println!("sync_settings: {:#?}", user.sync_settings);
        }
        None => println!("No user configured yet. Run `user create` first."),
    }
    Ok(())
}
