//! services/client/src/endpoints.rs
//!
//! Centralizes all endpoint definitions for better maintainability.

use eventbook_core::domain::EventFilters;
use url::form_urlencoded;

pub const EVENTS: &str = "/events";
pub const USERS: &str = "/users";
pub const REGISTRATIONS: &str = "/registrations";

pub fn event_by_id(id: &str) -> String {
    format!("{}/{}", EVENTS, id)
}

pub fn user_by_id(id: &str) -> String {
    format!("{}/{}", USERS, id)
}

pub fn registration_by_id(id: &str) -> String {
    format!("{}/{}", REGISTRATIONS, id)
}

/// Builds a query string from the given pairs, skipping absent and empty
/// values. Returns either an empty string or `?key=value&...`.
pub fn build_query(params: &[(&str, Option<String>)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in params {
        if let Some(value) = value {
            if !value.is_empty() {
                serializer.append_pair(key, value);
                any = true;
            }
        }
    }
    if any {
        format!("?{}", serializer.finish())
    } else {
        String::new()
    }
}

/// Flattens event filters into query pairs.
pub fn event_filter_params(filters: &EventFilters) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("page", filters.page.map(|p| p.to_string())),
        ("limit", filters.limit.map(|l| l.to_string())),
        ("search", filters.search.clone()),
        ("sort", filters.sort.clone()),
        (
            "order",
            filters.order.map(|o| {
                match o {
                    eventbook_core::domain::SortOrder::Asc => "asc",
                    eventbook_core::domain::SortOrder::Desc => "desc",
                }
                .to_string()
            }),
        ),
        ("category", filters.category.clone()),
        ("dateFrom", filters.date_from.clone()),
        ("dateTo", filters.date_to.clone()),
        ("priceMin", filters.price_min.map(|p| p.to_string())),
        ("priceMax", filters.price_max.map(|p| p.to_string())),
        ("location", filters.location.clone()),
    ]
}
