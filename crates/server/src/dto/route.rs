use serde::Serialize;
use transitflow::repository::{Repository, Route};

#[derive(Debug, Clone, Serialize)]
pub struct RouteDto {
    pub id: String,
    pub agency_name: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub description: Option<String>,
    pub route_type: i32,
    pub color: Option<String>,
    pub text_color: Option<String>,
}

impl RouteDto {
    pub fn from(route: &Route, repository: &Repository) -> Self {
        Self {
            id: route.id.to_string(),
            agency_name: repository
                .agency_by_route(route)
                .map(|agency| agency.name.to_string()),
            short_name: route.short_name.as_deref().map(String::from),
            long_name: route.long_name.as_deref().map(String::from),
            description: route.description.as_deref().map(String::from),
            route_type: route.route_type,
            color: route.color.as_deref().map(String::from),
            text_color: route.text_color.as_deref().map(String::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutesDto {
    pub routes: Vec<RouteDto>,
}
