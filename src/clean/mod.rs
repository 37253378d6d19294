// src/clean/mod.rs

pub mod datasets;
pub mod date_parser;
pub mod numeric;
pub mod units;

pub use datasets::{
    clean_card_data, clean_date_time, clean_orders_data, clean_products_data, clean_store_data,
    clean_user_data, convert_product_weights,
};
pub use date_parser::{normalize_date, parse_date, parse_time};
pub use numeric::{fill_nulls, is_numeric_string, strip_non_digits, to_numeric_or_null};
pub use units::parse_kg;
