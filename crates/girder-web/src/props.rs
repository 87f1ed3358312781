//! Custom build-property extraction from the force form.

use std::collections::HashMap;
use tracing::info;

use crate::validate::{is_clean_path_component, is_clean_property_value};

/// Validate and collect the `property{N}name`/`property{N}value` pairs
/// of a force submission.
///
/// Pairs with an empty name are skipped. Any malformed name or value
/// invalidates the whole submission and yields `None`.
pub fn get_and_check_properties(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    let mut properties = HashMap::new();
    for (name, value) in pairs {
        if !is_clean_path_component(name) || !is_clean_property_value(value) {
            info!(property = %name, value = %value, "bad property in force submission");
            return None;
        }
        if !name.is_empty() {
            properties.insert((*name).to_string(), (*value).to_string());
        }
    }
    Some(properties)
}
