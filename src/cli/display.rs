//! Terminal rendering shared by the commands

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use owo_colors::OwoColorize;
use rust_decimal::Decimal;

use crate::feed::cache::PriceCache;
use crate::gateway::types::{IndexCandle, MarketIndex, Quote};
use crate::ledger::types::{OrderRecord, Side, TeamLedger};
use crate::valuation::TeamStanding;
use crate::voting::{ProposalStatus, ProposalView};

/// Sign-aware rendering: gains green with a leading plus, losses red.
pub fn signed(value: Decimal) -> String {
    if value > Decimal::ZERO {
        format!("+{}", value).bright_green().to_string()
    } else if value < Decimal::ZERO {
        value.to_string().bright_red().to_string()
    } else {
        value.to_string()
    }
}

fn base_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_quote(quote: &Quote) {
    println!();
    println!(
        "{} {}",
        quote.name.bright_white().bold(),
        format!("({})", quote.code).bright_black()
    );
    println!("{}", "─".repeat(40).bright_black());
    println!(
        "  {} {}",
        "Price:".bright_black(),
        quote.price.to_string().bright_yellow()
    );
    println!(
        "  {} {} ({}%)",
        "Change:".bright_black(),
        signed(quote.change),
        signed(quote.change_rate)
    );
    println!("  {} {}", "Volume:".bright_black(), quote.volume);
}

pub fn print_quote_table(title: &str, quotes: &[Quote]) {
    println!("\n{}", title.bright_yellow());
    if quotes.is_empty() {
        println!("{}", "No instruments to show".bright_black().italic());
        return;
    }

    let mut table = base_table(vec!["#", "Code", "Name", "Price", "Change", "Rate %", "Volume"]);
    for (idx, quote) in quotes.iter().enumerate() {
        table.add_row(vec![
            (idx + 1).to_string(),
            quote.code.clone(),
            quote.name.clone(),
            quote.price.to_string(),
            signed(quote.change),
            signed(quote.change_rate),
            quote.volume.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn print_index(index: &MarketIndex) {
    println!();
    println!(
        "{} {}",
        index.name.bright_white().bold(),
        format!("({})", index.code).bright_black()
    );
    println!("{}", "─".repeat(40).bright_black());
    println!(
        "  {} {}",
        "Level:".bright_black(),
        index.value.to_string().bright_yellow()
    );
    println!(
        "  {} {} ({}%)",
        "Change:".bright_black(),
        signed(index.change),
        signed(index.change_rate)
    );
}

pub fn print_candles(title: &str, candles: &[IndexCandle]) {
    println!("\n{}", title.bright_yellow());
    if candles.is_empty() {
        println!("{}", "No candles in range".bright_black().italic());
        return;
    }

    let mut table = base_table(vec!["Date", "Open", "High", "Low", "Close"]);
    for candle in candles {
        table.add_row(vec![
            candle.date.clone(),
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
        ]);
    }
    println!("{table}");
}

/// One refresh of the watch table from whatever the cache has seen so far.
pub fn print_watch_frame(cache: &PriceCache, codes: &[String]) {
    let mut table = base_table(vec!["Code", "Price", "Change", "Rate %", "Volume", "As of"]);
    for code in codes {
        match cache.get(code) {
            Some(tick) => {
                table.add_row(vec![
                    code.clone(),
                    tick.price.to_string(),
                    signed(tick.change),
                    signed(tick.change_rate),
                    tick.volume.to_string(),
                    tick.updated_at.format("%H:%M:%S").to_string(),
                ]);
            }
            None => {
                table.add_row(vec![
                    code.clone(),
                    "-".to_string(),
                    "-".to_string(),
                    "-".to_string(),
                    "-".to_string(),
                    "waiting".bright_black().to_string(),
                ]);
            }
        }
    }
    println!("{table}");
}

pub fn print_ledger(room_name: &str, ledger: &TeamLedger) {
    println!("\n{}", format!("{room_name} LEDGER").bright_yellow());
    println!(
        "  {} {}",
        "Cash:".bright_black(),
        ledger.cash.to_string().bright_green()
    );
    if ledger.holdings.is_empty() {
        println!("  {}", "No holdings".bright_black().italic());
        return;
    }

    let mut table = base_table(vec!["Code", "Name", "Qty", "Avg Price"]);
    for holding in &ledger.holdings {
        table.add_row(vec![
            holding.code.clone(),
            holding
                .name
                .clone()
                .unwrap_or_else(|| format!("#{}", holding.code)),
            holding.quantity.to_string(),
            holding.avg_price.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn print_orders(orders: &[OrderRecord]) {
    println!("\n{}", "ORDER HISTORY".bright_yellow());
    if orders.is_empty() {
        println!("{}", "No orders".bright_black().italic());
        return;
    }

    let mut table = base_table(vec!["ID", "Side", "Code", "Qty", "Price", "Status", "Ref"]);
    for order in orders {
        let side = match order.side {
            Side::Buy => "BUY".bright_green().to_string(),
            Side::Sell => "SELL".bright_red().to_string(),
        };
        table.add_row(vec![
            order.id.to_string(),
            side,
            order.code.clone(),
            order.quantity.to_string(),
            order.price.to_string(),
            format!("{:?}", order.status),
            order.external_ref.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{table}");
}

pub fn print_proposals(views: &[ProposalView]) {
    println!("\n{}", "PROPOSALS".bright_yellow());
    if views.is_empty() {
        println!("{}", "No proposals".bright_black().italic());
        return;
    }

    let mut table = base_table(vec![
        "ID", "Side", "Instrument", "Qty", "Status", "Agree", "Disagree", "Fill",
    ]);
    for view in views {
        let tally = view.proposal.tally();
        let status = match view.proposal.status {
            ProposalStatus::Ongoing => "Ongoing".bright_yellow().to_string(),
            ProposalStatus::Passed => "Passed".bright_green().to_string(),
            ProposalStatus::Rejected => "Rejected".bright_red().to_string(),
            ProposalStatus::Expired => "Expired".bright_black().to_string(),
        };
        table.add_row(vec![
            view.proposal.id.to_string(),
            view.proposal.side.to_string(),
            view.proposal.name.clone(),
            view.proposal.quantity.to_string(),
            status,
            tally.agree.to_string(),
            tally.disagree.to_string(),
            view.execution_price
                .map(|price| price.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{table}");
}

pub fn print_standings(standings: &[TeamStanding]) {
    println!("\n{}", "ROOM STANDINGS".bright_yellow());
    if standings.is_empty() {
        println!("{}", "No active rooms".bright_black().italic());
        return;
    }

    let mut table = base_table(vec!["Rank", "Room", "Total Value", "Profit %"]);
    for row in standings {
        let pct = (row.profit_rate * Decimal::from(100)).normalize();
        table.add_row(vec![
            row.rank.to_string(),
            row.room_name.clone(),
            row.total_value.to_string(),
            signed(pct),
        ]);
    }
    println!("{table}");
}
