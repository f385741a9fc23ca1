use super::model::SplitState;
use crate::config::SplitConfig;
use crate::error::CoreResult;

/// Itemized split as CSV, rows in display order followed by a TOTAL row.
pub fn render_split_csv(state: &SplitState, cfg: &SplitConfig) -> CoreResult<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record([
        "item_id",
        "name",
        "total_price",
        cfg.payer_a_label.as_str(),
        cfg.payer_b_label.as_str(),
    ])?;
    for r in state.rows() {
        wtr.write_record(&[
            r.item_id,
            r.name,
            format_amount(r.total_price),
            format_amount(r.payer_a),
            format_amount(r.payer_b),
        ])?;
    }
    let totals = state.totals();
    wtr.write_record(&[
        "TOTAL".to_string(),
        String::new(),
        format_amount(totals.grand_total),
        format_amount(totals.total_a),
        format_amount(totals.total_b),
    ])?;
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}

fn format_amount(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}
