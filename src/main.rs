mod cli;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands, OutputFormat};
use ibrest::client::{HistoryRequest, IbRestClient};
use ibrest::config::load_config;
use ibrest::utils::{
    current_human_timestamp, parse_anchor, render_table, write_history_csv, write_history_json,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli.config).context("Failed to load configuration")?;

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let client = IbRestClient::new(config).context("Failed to construct gateway client")?;

    match cli.command {
        Commands::Tickle => tickle(&client).await?,
        Commands::Accounts => show_accounts(&client).await?,
        Commands::Contract { ref symbols } => show_contracts(&client, symbols).await?,
        Commands::History {
            ref symbol,
            ref period,
            ref bar,
            ref from,
            ref exchange,
            outside_rth,
            format,
        } => {
            let from = parse_anchor(from)?;
            let mut request = HistoryRequest::new(symbol, period, bar, from).outside_rth(outside_rth);
            if let Some(exchange) = exchange {
                request = request.exchange(exchange);
            }
            download_history(&client, &request, format).await?;
        }
        Commands::Config => {}
    }

    Ok(())
}

async fn tickle(client: &IbRestClient) -> Result<()> {
    let tickle = client.tickle().await.context("Tickle request failed")?;
    let status = &tickle.iserver.auth_status;

    println!("# Gateway session at {}", current_human_timestamp());
    println!("#   session:        {}", tickle.session);
    println!("#   authenticated:  {}", status.authenticated);
    println!("#   connected:      {}", status.connected);
    println!("#   competing:      {}", status.competing);
    println!(
        "#   server:         {} ({})",
        status.server_info.server_name, status.server_info.server_version
    );
    if !status.message.is_empty() {
        println!("#   message:        {}", status.message);
    }
    Ok(())
}

async fn show_accounts(client: &IbRestClient) -> Result<()> {
    let accounts = client
        .get_accounts()
        .await
        .context("Failed to fetch accounts")?;

    let rows: Vec<Vec<String>> = accounts
        .iter()
        .map(|account| {
            vec![
                account.account_id.clone(),
                account.display_name.clone().unwrap_or_default(),
                account.account_title.clone().unwrap_or_default(),
                account.currency.clone().unwrap_or_default(),
                account.account_type.clone().unwrap_or_default(),
            ]
        })
        .collect();

    print!(
        "{}",
        render_table(&["ACCOUNT", "NAME", "TITLE", "CCY", "TYPE"], &rows)
    );
    Ok(())
}

async fn show_contracts(client: &IbRestClient, symbols: &[String]) -> Result<()> {
    let conids = client
        .get_contract_details(symbols)
        .await
        .context("Failed to fetch contract details")?;

    let mut rows = Vec::new();
    for symbol in symbols {
        let symbol = symbol.trim().to_uppercase();
        let details = conids.details(&symbol);
        if details.is_empty() {
            rows.push(vec![symbol.clone(), "-".into(), "-".into(), "no contract found".into()]);
            continue;
        }
        for detail in details {
            for contract in &detail.contracts {
                rows.push(vec![
                    symbol.clone(),
                    contract.conid.to_string(),
                    contract.exchange.clone().unwrap_or_default(),
                    detail.name.clone().unwrap_or_default(),
                ]);
            }
        }
    }

    print!("{}", render_table(&["SYMBOL", "CONID", "EXCHANGE", "NAME"], &rows));
    Ok(())
}

async fn download_history(
    client: &IbRestClient,
    request: &HistoryRequest,
    format: OutputFormat,
) -> Result<()> {
    let series = client
        .get_historical_data_with(request)
        .await
        .with_context(|| format!("Failed to fetch history for {}", request.symbol))?;

    log::info!("Retrieved {} bars for {}", series.data.len(), series.symbol);

    let stdout = io::stdout();
    let handle = stdout.lock();
    match format {
        OutputFormat::Json => write_history_json(handle, &series)?,
        OutputFormat::Csv => write_history_csv(handle, &series)?,
    }
    println!();
    Ok(())
}
