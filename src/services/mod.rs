pub mod forecast;
pub mod history;
pub mod refresher;
pub mod sectors;
pub mod store;

pub use forecast::ForecastService;
pub use history::HistoryService;
pub use refresher::Refresher;
pub use sectors::SectorAverages;
pub use store::StockStore;
