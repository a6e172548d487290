use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapStyle {
    pub name: &'static str,
    pub label: &'static str,
    template: &'static str,
}

pub static STYLES: &[MapStyle] = &[
    MapStyle {
        name: "dark",
        label: "Dark Matter",
        template: "https://api.maptiler.com/maps/darkmatter/style.json?key={key}",
    },
    MapStyle {
        name: "streets",
        label: "Streets",
        template: "https://api.maptiler.com/maps/streets-v2/style.json?key={key}",
    },
    MapStyle {
        name: "light",
        label: "Positron",
        template: "https://api.maptiler.com/maps/positron/style.json?key={key}",
    },
];

impl MapStyle {
    pub fn url(&self, key: &str) -> String {
        self.template.replace("{key}", key)
    }
}

pub fn find(name: &str) -> Option<&'static MapStyle> {
    STYLES.iter().find(|s| s.name == name)
}

/// Style as listed to the page, with its key already filled in.
#[derive(Debug, Clone, Serialize)]
pub struct StyleView {
    pub name: &'static str,
    pub label: &'static str,
    pub url: String,
}

pub fn list(key: &str) -> Vec<StyleView> {
    STYLES
        .iter()
        .map(|s| StyleView {
            name: s.name,
            label: s.label,
            url: s.url(key),
        })
        .collect()
}
