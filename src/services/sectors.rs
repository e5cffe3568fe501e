use std::collections::HashMap;

use crate::models::StockRecord;

/// Per-sector peer averages computed over one result set.
///
/// P/E means only count records with `pe > 0` (zero marks "provider had no
/// value", and loss-making companies have no meaningful trailing P/E).
/// Margin means only count records with a non-zero margin. A sector with no
/// qualifying peer averages to zero.
#[derive(Debug, Default)]
pub struct SectorAverages {
    pe: HashMap<String, f64>,
    margin: HashMap<String, f64>,
}

impl SectorAverages {
    pub fn compute(records: &[StockRecord]) -> Self {
        let mut pe_buckets: HashMap<String, Vec<f64>> = HashMap::new();
        let mut margin_buckets: HashMap<String, Vec<f64>> = HashMap::new();

        for record in records {
            if record.pe > 0.0 {
                pe_buckets
                    .entry(record.sector.clone())
                    .or_default()
                    .push(record.pe);
            }
            if record.operating_margin != 0.0 {
                margin_buckets
                    .entry(record.sector.clone())
                    .or_default()
                    .push(record.operating_margin);
            }
        }

        Self {
            pe: mean_by_key(pe_buckets),
            margin: mean_by_key(margin_buckets),
        }
    }

    pub fn pe_avg(&self, sector: &str) -> f64 {
        self.pe.get(sector).copied().unwrap_or(0.0)
    }

    pub fn margin_avg(&self, sector: &str) -> f64 {
        self.margin.get(sector).copied().unwrap_or(0.0)
    }

    /// Stamp the averages onto every record in place
    pub fn attach(&self, records: &mut [StockRecord]) {
        for record in records.iter_mut() {
            record.sector_pe_avg = self.pe_avg(&record.sector);
            record.sector_margin_avg = self.margin_avg(&record.sector);
        }
    }
}

fn mean_by_key(buckets: HashMap<String, Vec<f64>>) -> HashMap<String, f64> {
    buckets
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(key, values)| {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            (key, mean)
        })
        .collect()
}
