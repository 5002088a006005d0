mod price_point;
mod schema;

pub use price_point::{PriceBook, PriceMap, PricePoint};
pub use schema::RowSchema;
