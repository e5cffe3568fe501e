mod forecast;
mod history;
mod stock;
mod universe;

pub use forecast::{Forecast, Trend};
pub use history::{HistoryPoint, Interval};
pub use stock::{current_timestamp, CachedStock, StockRecord};
pub use universe::{Universe, UniverseEntry};
