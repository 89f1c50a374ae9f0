/// Source name constants used in logs, reports, and integrity warnings so
/// every stage refers to a source the same way.
pub const MORTGAGE_SOURCE: &str = "mortgage_rate";
pub const CPI_SOURCE: &str = "cpi";
pub const LISTINGS_SOURCE: &str = "active_listings";
pub const POPULATION_SOURCE: &str = "population";
pub const HOME_VALUE_SOURCE: &str = "home_value_index";

/// All tracked sources, in output-column order.
pub fn tracked_sources() -> Vec<&'static str> {
    vec![
        MORTGAGE_SOURCE,
        CPI_SOURCE,
        LISTINGS_SOURCE,
        POPULATION_SOURCE,
        HOME_VALUE_SOURCE,
    ]
}
