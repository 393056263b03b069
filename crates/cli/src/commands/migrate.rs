use stepwise_migrate::{MigrationResult, MigrationState, Migrator};

pub async fn run(migrator: &Migrator) -> MigrationResult<()> {
    let applied = migrator.run().await?;

    if applied.is_empty() {
        println!("Nothing to migrate");
        return Ok(());
    }

    for file in &applied {
        println!("Applied migration: {}", file);
    }
    println!("{} migration(s) applied", applied.len());
    Ok(())
}

pub async fn status(migrator: &Migrator) -> MigrationResult<()> {
    let states = migrator.status().await?;

    println!("Migration Status:");
    println!("================");

    if states.is_empty() {
        println!("No migrations found in {}", migrator.migrations_dir().display());
        return Ok(());
    }

    for state in &states {
        println!("  {}", format_state(state));
    }

    let pending = states.iter().filter(|s| s.is_pending()).count();
    println!("\n{} pending, table `{}`", pending, migrator.table());
    println!("✅ = Applied  ⏳ = Pending  ❓ = Applied, file missing");
    Ok(())
}

fn format_state(state: &MigrationState) -> String {
    match state {
        MigrationState::Applied { file, created, .. } => format!("✅ {} ({})", file, created),
        MigrationState::Pending { file, .. } => format!("⏳ {}", file),
        MigrationState::Missing { file, created, .. } => {
            format!("❓ {} ({}, not on disk)", file, created)
        }
    }
}
