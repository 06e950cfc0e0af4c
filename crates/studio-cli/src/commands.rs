use anyhow::Result;
use studio_core::catalog::{self, BackendKind, Resolution};

pub async fn credits(app: &super::App, grant: Option<u64>) -> Result<()> {
    let user = &app.config.user_id;
    let balance = match grant {
        Some(amount) => {
            let balance = app
                .db
                .accounts()
                .grant(user, amount)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Granted {amount} credits to {user}.");
            balance
        }
        None => app
            .db
            .accounts()
            .credits(user)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?,
    };
    println!("Credits: \x1b[33m{balance}\x1b[0m ({user})");
    Ok(())
}

pub async fn gallery(app: &super::App, limit: u32) -> Result<()> {
    let user = &app.config.user_id;
    let items = app
        .db
        .gallery()
        .list(user, limit)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let total = app
        .db
        .gallery()
        .count(user)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if items.is_empty() {
        println!("No generations yet.");
        return Ok(());
    }

    for item in &items {
        println!(
            "  \x1b[90m{}\x1b[0m  \x1b[36m{}\x1b[0m  {}  ({} cr)\n      {}",
            item.created_at.format("%Y-%m-%d %H:%M"),
            item.backend,
            item.prompt,
            item.cost,
            super::output::display_ref(&item.result),
        );
    }
    println!("\x1b[90mShowing {} of {total}\x1b[0m", items.len());
    Ok(())
}

pub async fn sessions(app: &super::App, delete: Option<String>) -> Result<()> {
    let repo = app.db.snapshots();
    if let Some(id) = delete {
        repo.delete(&id, &app.config.user_id).await.map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("Deleted session {id}.");
        return Ok(());
    }

    let saved = repo
        .list(&app.config.user_id)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    if saved.is_empty() {
        println!("No saved sessions.");
        return Ok(());
    }
    for s in &saved {
        println!(
            "  {}  \x1b[90m{}\x1b[0m",
            s.id,
            s.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("Resume with \x1b[33mstudio edit --session <ID>\x1b[0m");
    Ok(())
}

pub fn backends(app: &super::App) {
    for info in catalog::list_backends() {
        let kind = match info.kind {
            BackendKind::Edit => "edit",
            BackendKind::Generate => "generate",
        };
        let prices: Vec<String> = [Resolution::OneK, Resolution::TwoK, Resolution::FourK]
            .iter()
            .filter_map(|r| info.cost(*r).map(|c| format!("{r}={c}")))
            .collect();
        let key = if app.config.has_key_for(info.id) {
            "\x1b[32mkey set\x1b[0m"
        } else {
            "\x1b[31mno key\x1b[0m"
        };
        println!(
            "  {:<18} {:<18} {:<9} {:<20} {key}",
            info.id.as_str(),
            info.display_name,
            kind,
            prices.join(" "),
        );
    }
}
