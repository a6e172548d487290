use crate::types::{Filter, FilterSet, Location};
use std::fmt;

/// `around:` filter shared by every statement of a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Around {
    pub radius: u32,
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for Around {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "around:{},{},{}", self.radius, self.lat, self.lng)
    }
}

/// Tag selectors standing in for each data category.
fn selectors(filter: Filter) -> &'static [&'static str] {
    match filter {
        // Traffic lights and speed cameras are dense along main roads.
        Filter::Accidents => &[
            r#"["highway"="traffic_signals"]"#,
            r#"["highway"="speed_camera"]"#,
        ],
        Filter::Vehicles => &[r#"["amenity"="parking"]"#],
        // Any barrier: gates, bollards, lift gates.
        Filter::RoadClosures => &[r#"["barrier"]"#],
    }
}

/// The node statements contributed by one enabled filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    filter: Filter,
    statements: Vec<String>,
}

impl Clause {
    fn new(filter: Filter, around: &Around) -> Self {
        let statements = selectors(filter)
            .iter()
            .map(|tags| format!("node{tags}({around});"))
            .collect();
        Self { filter, statements }
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverpassQuery {
    around: Around,
    clauses: Vec<Clause>,
}

impl OverpassQuery {
    pub fn around(&self) -> &Around {
        &self.around
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// True when no filter is enabled; such a query selects nothing.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl fmt::Display for OverpassQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[out:json];")?;
        for statement in self.clauses.iter().flat_map(|c| c.statements.iter()) {
            writeln!(f, "{statement}")?;
        }
        writeln!(f, "out;")
    }
}

pub fn build_query(filters: &FilterSet, location: &Location) -> OverpassQuery {
    let around = Around {
        radius: location.radius_or_default(),
        lat: location.lat,
        lng: location.lng,
    };
    let clauses = filters.enabled().map(|f| Clause::new(f, &around)).collect();
    OverpassQuery { around, clauses }
}
