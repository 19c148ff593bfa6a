use crate::models::{BlockAndEventLogs, BridgeEvent};
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

const COLUMNS: [&str; 10] = [
    "height",
    "chain",
    "event",
    "token",
    "counterpart_token",
    "account",
    "amount",
    "fee_amount",
    "tx_hash",
    "log_index",
];

/// One flat row per event. Columns an event kind does not have are empty.
fn event_row(event: &BridgeEvent) -> [String; 10] {
    match event {
        BridgeEvent::SwapStarted(ev) => [
            ev.height.to_string(),
            ev.chain.to_string(),
            format!("SwapStarted({:?})", ev.direction),
            ev.token_addr.clone(),
            ev.counterpart_token_addr.clone().unwrap_or_default(),
            ev.from_address.clone(),
            ev.amount.to_string(),
            ev.fee_amount.to_string(),
            format!("{:?}", ev.tx_hash),
            ev.log_index.to_string(),
        ],
        BridgeEvent::SwapPairRegister(ev) => [
            ev.height.to_string(),
            ev.chain.to_string(),
            format!("SwapPairRegister({} {} {})", ev.symbol, ev.name, ev.decimals),
            ev.erc20_addr.clone(),
            String::new(),
            ev.sponsor.clone(),
            String::new(),
            String::new(),
            format!("{:?}", ev.tx_hash),
            ev.log_index.to_string(),
        ],
        BridgeEvent::SwapPairCreated(ev) => [
            ev.height.to_string(),
            ev.chain.to_string(),
            format!("SwapPairCreated({} {} {})", ev.symbol, ev.name, ev.decimals),
            ev.bep20_addr.clone(),
            ev.erc20_addr.clone(),
            String::new(),
            String::new(),
            String::new(),
            format!("{:?}", ev.create_tx_hash),
            ev.log_index.to_string(),
        ],
    }
}

pub fn format_blocks(blocks: &[BlockAndEventLogs], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_blocks_table(blocks),
        OutputFormat::Json => format_blocks_json(blocks),
        OutputFormat::Csv => format_blocks_csv(blocks),
    }
}

fn format_blocks_table(blocks: &[BlockAndEventLogs]) -> String {
    let events: Vec<&BridgeEvent> = blocks.iter().flat_map(|b| b.events.iter()).collect();
    if events.is_empty() {
        return format!("No bridge events found in {} block(s).", blocks.len());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            "Block", "Chain", "Event", "Token", "Counterpart", "Account", "Amount", "Fee",
            "Tx Hash", "Log",
        ]);

    for event in events {
        let row = event_row(event);
        let tx_hash = format_tx_hash(&row[8]);
        table.add_row(vec![
            Cell::new(&row[0]),
            Cell::new(&row[1]),
            Cell::new(&row[2]),
            Cell::new(&row[3]),
            Cell::new(&row[4]),
            Cell::new(&row[5]),
            Cell::new(&row[6]),
            Cell::new(&row[7]),
            Cell::new(tx_hash),
            Cell::new(&row[9]),
        ]);
    }

    table.to_string()
}

fn format_blocks_json(blocks: &[BlockAndEventLogs]) -> String {
    serde_json::to_string_pretty(blocks).unwrap_or_else(|_| "[]".to_string())
}

fn format_blocks_csv(blocks: &[BlockAndEventLogs]) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record(COLUMNS);

    for event in blocks.iter().flat_map(|b| b.events.iter()) {
        let _ = wtr.write_record(event_row(event));
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

fn format_tx_hash(hash: &str) -> String {
    if hash.len() > 16 {
        format!("{}...{}", &hash[..10], &hash[hash.len() - 6..])
    } else {
        hash.to_string()
    }
}
