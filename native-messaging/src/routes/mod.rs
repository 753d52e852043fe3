//! Native messaging route handlers.
//!
//! # Adding New Routes
//!
//! 1. Create a route struct in the module that fits it
//! 2. Implement `NativeMessagingRoute`
//! 3. Register it in `MessageRouter::register_all_routes`
//! 4. Add its metadata to [`get_all_routes`]

pub mod collections;
pub mod documents;
pub mod system;

pub use crate::route_trait::NativeMessagingRoute;

/// Get all available route metadata for documentation and discovery.
pub fn get_all_routes() -> Vec<crate::route_trait::RouteMetadata> {
    vec![
        system::InitRoute::metadata(),
        system::GetPathRoute::metadata(),
        documents::WriteRoute::metadata(),
        documents::AddRoute::metadata(),
        documents::ReadRoute::metadata(),
        documents::DeleteRoute::metadata(),
        documents::ExistsRoute::metadata(),
        collections::ListRoute::metadata(),
        collections::SearchRoute::metadata(),
    ]
}

/// Get route count for validation.
pub fn get_route_count() -> usize {
    get_all_routes().len()
}
