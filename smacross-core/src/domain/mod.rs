//! Domain types for smacross

pub mod bar;
pub mod series;

pub use bar::{PriceBar, PriceField};
pub use series::{PriceSeries, SeriesError};
