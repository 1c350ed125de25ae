use std::env;

use anyhow::{Context, Result};

use rhythm90_backend::services::usage::plan_catalog::{StaticPlanCatalog, UNLIMITED};

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let catalog = match env::var("PLAN_LIMITS_PATH") {
        Ok(path) if !path.trim().is_empty() => StaticPlanCatalog::from_path(path.trim())
            .with_context(|| format!("failed to load plan limits from {path}"))?,
        _ => StaticPlanCatalog::builtin(),
    };

    println!("{:<16} {:<20} {:>9}", "plan", "tool", "limit");
    for (plan, tool, limit) in catalog.rows() {
        let limit = if limit == UNLIMITED {
            "unlimited".to_string()
        } else {
            limit.to_string()
        };
        println!("{:<16} {:<20} {:>9}", plan.as_str(), tool, limit);
    }

    Ok(())
}
