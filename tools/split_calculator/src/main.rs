use receipt_split_core::config::SplitConfig;
use receipt_split_core::receipt::parser::{parse_items, ParseStatus};
use receipt_split_core::split::export::render_split_csv;
use receipt_split_core::split::model::SplitState;
use receipt_split_core::split::slider::slider_spec;
use serde_json::json;
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "usage: split_calculator [--csv] [--config <split.json>] <payload.json> [item_id=amount ...]";

/// Payer shares sit under `payers` so a configured label can never shadow a
/// fixed key such as `grand_total`.
fn build_report(state: &SplitState, cfg: &SplitConfig) -> serde_json::Value {
    let items: Vec<serde_json::Value> = state
        .rows()
        .into_iter()
        .zip(state.items())
        .map(|(row, item)| {
            json!({
                "item_id": row.item_id,
                "name": item.display_name(cfg.display_name_max_chars),
                "total_price": row.total_price,
                "payers": {
                    cfg.payer_a_label.clone(): row.payer_a,
                    cfg.payer_b_label.clone(): row.payer_b,
                },
                "remarks": row.remarks,
                "slider": slider_spec(row.total_price, cfg.slider_divisions),
            })
        })
        .collect();
    let totals = state.totals();
    json!({
        "items": items,
        "totals": {
            "payers": {
                cfg.payer_a_label.clone(): totals.total_a,
                cfg.payer_b_label.clone(): totals.total_b,
            },
            "grand_total": totals.grand_total,
        }
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut csv_out = false;
    let mut config_path: Option<String> = None;
    let mut positional = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--csv" => csv_out = true,
            "--config" => match args.next() {
                Some(p) => config_path = Some(p),
                None => {
                    eprintln!("{}", USAGE);
                    std::process::exit(2);
                }
            },
            _ => positional.push(arg),
        }
    }
    if positional.is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    let cfg = match config_path {
        Some(p) => match SplitConfig::load(&p) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("config error: {}", e);
                std::process::exit(2);
            }
        },
        None => SplitConfig::default(),
    };

    let raw = match std::fs::read_to_string(&positional[0]) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("cannot read {}: {}", positional[0], e);
            std::process::exit(2);
        }
    };

    let outcome = parse_items(&raw);
    match &outcome.status {
        ParseStatus::Malformed(reason) => {
            tracing::error!(reason = %reason, "payload is malformed");
            std::process::exit(1);
        }
        ParseStatus::NoItems => tracing::warn!("payload contains no items"),
        ParseStatus::Parsed => tracing::info!(
            items = outcome.items.len(),
            shops = outcome.shop_names.len(),
            "payload parsed"
        ),
    }
    if !outcome.non_positive_price_ids.is_empty() {
        tracing::warn!(ids = ?outcome.non_positive_price_ids, "items with non-positive price");
    }

    let mut state = SplitState::initialize(outcome.items);
    for spec in &positional[1..] {
        let Some((id, amount)) = spec.split_once('=') else {
            eprintln!("invalid allocation {:?}, expected item_id=amount", spec);
            std::process::exit(2);
        };
        let value: f64 = match amount.parse() {
            Ok(v) => v,
            Err(_) => {
                eprintln!("invalid amount in {:?}", spec);
                std::process::exit(2);
            }
        };
        match state.set_allocation(id, value) {
            Ok(stored) if stored != value => {
                tracing::warn!(item_id = id, requested = value, stored, "allocation clamped")
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }

    if csv_out {
        match render_split_csv(&state, &cfg) {
            Ok(csv) => print!("{}", csv),
            Err(e) => {
                eprintln!("csv error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let report = build_report(&state, &cfg);
    match serde_json::to_string_pretty(&report) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("output error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BREAD: &str = r#"[{"shop_name":"S","item_info":[{"id":"0","name":"Bread","total_price":300,"price":300,"buyer_f":0,"remarks":""}]}]"#;

    #[test]
    fn labels_matching_fixed_keys_do_not_overwrite_them() {
        let cfg = SplitConfig {
            payer_a_label: "grand_total".to_string(),
            payer_b_label: "name".to_string(),
            ..SplitConfig::default()
        };
        let mut state = SplitState::initialize(parse_items(BREAD).items);
        state.set_allocation("0", 100.0).unwrap();

        let report = build_report(&state, &cfg);
        assert_eq!(report["totals"]["grand_total"], json!(300.0));
        assert_eq!(report["totals"]["payers"]["grand_total"], json!(200.0));
        assert_eq!(report["items"][0]["name"], json!("Bread"));
        assert_eq!(report["items"][0]["payers"]["name"], json!(100.0));
    }
}
