use crate::types::Location;

/// Location the dashboard opens on when the configuration does not name one.
pub const DEFAULT_CITY_ID: &str = "buenos-aires";

const fn city(
    id: &'static str,
    name: &'static str,
    country: &'static str,
    lat: f64,
    lng: f64,
) -> Location {
    Location {
        id,
        name,
        country,
        lat,
        lng,
        radius: None,
    }
}

pub static CITIES: &[Location] = &[
    city("new-york", "New York", "United States", 40.7128, -74.006),
    city("london", "London", "United Kingdom", 51.5074, -0.1278),
    city("tokyo", "Tokyo", "Japan", 35.6762, 139.6503),
    city("paris", "Paris", "France", 48.8566, 2.3522),
    city("sydney", "Sydney", "Australia", -33.8688, 151.2093),
    city("dubai", "Dubai", "UAE", 25.2048, 55.2708),
    city("singapore", "Singapore", "Singapore", 1.3521, 103.8198),
    city("hong-kong", "Hong Kong", "China", 22.3193, 114.1694),
    city("shanghai", "Shanghai", "China", 31.2304, 121.4737),
    city("mumbai", "Mumbai", "India", 19.076, 72.8777),
    city("buenos-aires", "Buenos Aires", "Argentina", -34.6037, -58.3816),
    city("cordoba", "Córdoba", "Argentina", -31.4201, -64.1888),
    city("rosario", "Rosario", "Argentina", -32.9468, -60.6393),
    city("santiago", "Santiago", "Chile", -33.4489, -70.6693),
    city("valparaiso", "Valparaíso", "Chile", -33.0472, -71.6127),
    city("sao-paulo", "São Paulo", "Brazil", -23.5505, -46.6333),
    city("rio-de-janeiro", "Rio de Janeiro", "Brazil", -22.9068, -43.1729),
    city("mexico-city", "Ciudad de México", "Mexico", 19.4326, -99.1332),
    city("bogota", "Bogotá", "Colombia", 4.711, -74.0721),
    city("lima", "Lima", "Peru", -12.0464, -77.0428),
    city("madrid", "Madrid", "Spain", 40.4168, -3.7038),
    city("rome", "Rome", "Italy", 41.9028, 12.4964),
    city("berlin", "Berlin", "Germany", 52.52, 13.405),
    city("amsterdam", "Amsterdam", "Netherlands", 52.3676, 4.9041),
    city("vienna", "Vienna", "Austria", 48.2082, 16.3738),
    city("seoul", "Seoul", "South Korea", 37.5665, 126.978),
    city("bangkok", "Bangkok", "Thailand", 13.7563, 100.5018),
    city("manila", "Manila", "Philippines", 14.5995, 120.9842),
    city("jakarta", "Jakarta", "Indonesia", -6.2088, 106.8456),
    city("kuala-lumpur", "Kuala Lumpur", "Malaysia", 3.139, 101.6869),
    city("los-angeles", "Los Angeles", "United States", 34.0522, -118.2437),
    city("chicago", "Chicago", "United States", 41.8781, -87.6298),
    city("toronto", "Toronto", "Canada", 43.6532, -79.3832),
    city("vancouver", "Vancouver", "Canada", 49.2827, -123.1207),
    city("montreal", "Montreal", "Canada", 45.5017, -73.5673),
    city("cairo", "Cairo", "Egypt", 30.0444, 31.2357),
    city("johannesburg", "Johannesburg", "South Africa", -26.2041, 28.0473),
    city("nairobi", "Nairobi", "Kenya", -1.2921, 36.8219),
    city("lagos", "Lagos", "Nigeria", 6.5244, 3.3792),
    city("casablanca", "Casablanca", "Morocco", 33.5731, -7.5898),
    city("melbourne", "Melbourne", "Australia", -37.8136, 144.9631),
    city("auckland", "Auckland", "New Zealand", -36.8509, 174.7645),
    city("brisbane", "Brisbane", "Australia", -27.4698, 153.0251),
    city("perth", "Perth", "Australia", -31.9523, 115.8613),
    city("wellington", "Wellington", "New Zealand", -41.2866, 174.7756),
];

pub fn find(id: &str) -> Option<&'static Location> {
    CITIES.iter().find(|c| c.id == id)
}

/// Looks up `id`, falling back to the first registry entry.
pub fn find_or_default(id: &str) -> &'static Location {
    find(id).unwrap_or_else(|| {
        tracing::warn!(city = id, fallback = CITIES[0].id, "unknown city, using default");
        &CITIES[0]
    })
}
