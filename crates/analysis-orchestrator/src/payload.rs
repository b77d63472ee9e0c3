use serde_json::{json, Map, Value};

use crate::pipeline::EnrichedAnalysis;

impl EnrichedAnalysis {
    /// Flat chart/summary object: one array per bar field and indicator column
    /// (undefined values become `null`) plus the summary scalars.
    ///
    /// Bar highs and lows are published as `bar_high` / `bar_low` because
    /// `high` / `low` are the period extremes from the summary.
    pub fn to_payload(&self) -> Value {
        let bars = self.frame.bars();
        let mut out = Map::new();

        out.insert(
            "dates".to_string(),
            json!(bars.iter().map(|b| b.date.format("%Y-%m-%d").to_string()).collect::<Vec<_>>()),
        );
        out.insert("open".to_string(), json!(bars.iter().map(|b| b.open).collect::<Vec<_>>()));
        out.insert("bar_high".to_string(), json!(bars.iter().map(|b| b.high).collect::<Vec<_>>()));
        out.insert("bar_low".to_string(), json!(bars.iter().map(|b| b.low).collect::<Vec<_>>()));
        out.insert("close".to_string(), json!(bars.iter().map(|b| b.close).collect::<Vec<_>>()));
        out.insert("volume".to_string(), json!(bars.iter().map(|b| b.volume).collect::<Vec<_>>()));

        for column in self.frame.columns() {
            out.insert(column.name.clone(), json!(column.values));
        }

        let s = &self.summary;
        out.insert("latest_price".to_string(), json!(s.latest_price));
        out.insert("period_open".to_string(), json!(s.period_open));
        out.insert("change_abs".to_string(), json!(s.change_abs));
        out.insert("change_pct".to_string(), json!(s.change_pct));
        out.insert("high".to_string(), json!(s.high));
        out.insert("low".to_string(), json!(s.low));
        out.insert("avg_volume".to_string(), json!(s.avg_volume));

        Value::Object(out)
    }
}
