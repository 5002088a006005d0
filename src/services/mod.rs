pub mod price_map_service;
pub mod rate_export_service;
pub mod valuation_service;
