use crate::cities;
use crate::config::MapConfig;
use crate::fetch::{FetchError, PointSource};
use crate::render::{MapInit, MapRenderer, MapWidget, RefreshOutcome, RefreshTicket, RenderError};
use crate::styles::{self, MapStyle, StyleView};
use crate::types::{Filter, FilterSet, Location, PointCollection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// A user interaction in the sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Change {
    ToggleFilter(Filter),
    SetFilters(FilterSet),
    SelectCity(String),
    SelectStyle(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("unknown map style `{0}`")]
    UnknownStyle(String),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub filters: FilterSet,
    pub active_filters: usize,
    pub city: &'static Location,
    pub style: &'static str,
    pub styles: Vec<StyleView>,
    pub mounted: bool,
}

pub struct Dashboard<W> {
    filters: FilterSet,
    city: &'static Location,
    style: &'static MapStyle,
    style_key: String,
    renderer: MapRenderer<W>,
}

impl<W: MapWidget> Dashboard<W> {
    pub fn new(config: &MapConfig) -> Self {
        let style = styles::find(&config.default_style).unwrap_or_else(|| {
            warn!(style = %config.default_style, "unknown default style, using the first one");
            &styles::STYLES[0]
        });
        Self {
            filters: FilterSet::default(),
            city: cities::find_or_default(&config.default_city),
            style,
            style_key: config.style_key.clone(),
            renderer: MapRenderer::new(config.zoom),
        }
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn city(&self) -> &'static Location {
        self.city
    }

    pub fn style_url(&self) -> String {
        self.style.url(&self.style_key)
    }

    pub fn is_mounted(&self) -> bool {
        self.renderer.is_ready()
    }

    /// Creates the map and issues the initial refresh.
    pub fn mount<F>(&mut self, make_widget: F) -> Result<RefreshTicket, DashboardError>
    where
        F: FnOnce(MapInit) -> W,
    {
        let style_url = self.style_url();
        self.renderer.mount(self.city, &style_url, make_widget)?;
        Ok(self.renderer.begin_refresh(&self.filters, self.city)?)
    }

    /// Applies a sidebar change. Filter and city changes return the refresh
    /// to run once the map is mounted; style changes never refetch.
    pub fn apply(&mut self, change: Change) -> Result<Option<RefreshTicket>, DashboardError> {
        match change {
            Change::ToggleFilter(filter) => self.filters.toggle(filter),
            Change::SetFilters(filters) => self.filters = filters,
            Change::SelectCity(id) => {
                let city = cities::find_or_default(&id);
                if city.id == self.city.id {
                    return Ok(None);
                }
                self.city = city;
            }
            Change::SelectStyle(name) => {
                let style = styles::find(&name).ok_or(DashboardError::UnknownStyle(name))?;
                self.style = style;
                if self.renderer.is_ready() {
                    let url = self.style_url();
                    self.renderer.set_style(&url)?;
                }
                info!(style = style.name, "map style changed");
                return Ok(None);
            }
        }

        if !self.renderer.is_ready() {
            return Ok(None);
        }
        Ok(Some(self.renderer.begin_refresh(&self.filters, self.city)?))
    }

    pub fn complete(
        &mut self,
        ticket: RefreshTicket,
        result: Result<PointCollection, FetchError>,
    ) -> Result<RefreshOutcome, DashboardError> {
        Ok(self.renderer.complete_refresh(ticket, result)?)
    }

    /// Runs a full fetch-and-draw cycle for `ticket`.
    pub async fn run<S: PointSource>(
        &mut self,
        ticket: RefreshTicket,
        source: &S,
    ) -> Result<RefreshOutcome, DashboardError> {
        let result = source.fetch(&ticket.query).await;
        self.complete(ticket, result)
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            filters: self.filters,
            active_filters: self.filters.active_count(),
            city: self.city,
            style: self.style.name,
            styles: styles::list(&self.style_key),
            mounted: self.renderer.is_ready(),
        }
    }
}
