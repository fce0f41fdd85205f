use anyhow::Result;
use colored::Colorize;
use papertrade::db::PortfolioUpdate;
use papertrade::reports;

use super::{resolve_portfolio, Context};
use crate::cli::{formatters, PortfolioCommands};

pub fn dispatch_portfolio(action: PortfolioCommands, ctx: &Context) -> Result<()> {
    match action {
        PortfolioCommands::Create { name } => create_portfolio(&name, ctx),
        PortfolioCommands::List => list_portfolios(ctx),
        PortfolioCommands::Show { portfolio } => show_portfolio(&portfolio, ctx),
        PortfolioCommands::Rename { portfolio, name } => rename_portfolio(&portfolio, &name, ctx),
        PortfolioCommands::Delete { portfolio } => delete_portfolio(&portfolio, ctx),
    }
}

fn create_portfolio(name: &str, ctx: &Context) -> Result<()> {
    let mut ledger = ctx.open_ledger()?;
    let portfolio = ledger.create_portfolio(ctx.user_id, name)?;
    tracing::info!("Created portfolio {} ({})", portfolio.name, portfolio.id);

    if ctx.json_output {
        println!("{}", formatters::to_json(&portfolio)?);
    } else {
        println!("{}", formatters::format_portfolio_saved(&portfolio, "created"));
    }
    Ok(())
}

fn list_portfolios(ctx: &Context) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let views = reports::user_view(&ledger.repository(), ctx.user_id)?;

    if ctx.json_output {
        println!("{}", formatters::to_json(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("{}", formatters::format_empty_portfolios());
        return Ok(());
    }
    for view in &views {
        println!("{}", formatters::format_portfolio_table(view, ctx.scale()));
    }
    Ok(())
}

fn show_portfolio(ident: &str, ctx: &Context) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let repo = ledger.repository();
    let portfolio = resolve_portfolio(&repo, ctx.user_id, ident)?;
    let view = reports::portfolio_view(&repo, portfolio.id)?;

    if ctx.json_output {
        println!("{}", formatters::to_json(&view)?);
    } else {
        println!("{}", formatters::format_portfolio_table(&view, ctx.scale()));
    }
    Ok(())
}

fn rename_portfolio(ident: &str, name: &str, ctx: &Context) -> Result<()> {
    let mut ledger = ctx.open_ledger()?;
    let portfolio = resolve_portfolio(&ledger.repository(), ctx.user_id, ident)?;
    let renamed = ledger.rename_portfolio(
        portfolio.id,
        &PortfolioUpdate {
            name: Some(name.to_string()),
        },
    )?;

    if ctx.json_output {
        println!("{}", formatters::to_json(&renamed)?);
    } else {
        println!("{}", formatters::format_portfolio_saved(&renamed, "renamed"));
    }
    Ok(())
}

fn delete_portfolio(ident: &str, ctx: &Context) -> Result<()> {
    let mut ledger = ctx.open_ledger()?;
    let portfolio = resolve_portfolio(&ledger.repository(), ctx.user_id, ident)?;
    ledger.delete_portfolio(portfolio.id)?;

    if ctx.json_output {
        println!(
            "{}",
            formatters::to_json(&serde_json::json!({ "deleted": portfolio.id }))?
        );
    } else {
        println!(
            "{} Portfolio {} deleted (its trades are kept)",
            "✓".green().bold(),
            portfolio.name.bold()
        );
    }
    Ok(())
}
