use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use traffic_heatmap::cities::{self, CITIES};
use traffic_heatmap::config::AppConfig;
use traffic_heatmap::fetch::{fetch_points, OverpassClient};
use traffic_heatmap::heat::to_feature_collection;
use traffic_heatmap::query::build_query;
use traffic_heatmap::server;
use traffic_heatmap::types::{Filter, FilterSet};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard and its API
    Serve {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Print the Overpass query for a city and filter set
    Query {
        #[command(flatten)]
        selection: Selection,
    },
    /// Fetch points once and print them as GeoJSON
    Fetch {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[command(flatten)]
        selection: Selection,
    },
    /// List the selectable cities
    Cities,
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    Accidents,
    RoadClosures,
    Vehicles,
}

impl From<FilterArg> for Filter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Accidents => Filter::Accidents,
            FilterArg::RoadClosures => Filter::RoadClosures,
            FilterArg::Vehicles => Filter::Vehicles,
        }
    }
}

#[derive(clap::Args)]
struct Selection {
    /// City id, see `cities`
    #[arg(long, default_value = cities::DEFAULT_CITY_ID)]
    city: String,
    /// Comma-separated data types; all of them when omitted
    #[arg(long, value_enum, value_delimiter = ',')]
    filters: Option<Vec<FilterArg>>,
}

impl Selection {
    fn filter_set(&self) -> FilterSet {
        match &self.filters {
            None => FilterSet::default(),
            Some(list) => {
                let mut set = FilterSet::none();
                for f in list {
                    set.set((*f).into(), true);
                }
                set
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            let app_config = AppConfig::load(config.as_deref())?;
            server::start_server(app_config).await?;
        }
        Commands::Query { selection } => {
            let city = cities::find_or_default(&selection.city);
            print!("{}", build_query(&selection.filter_set(), city));
        }
        Commands::Fetch { config, selection } => {
            let app_config = AppConfig::load(config.as_deref())?;
            let client = OverpassClient::new(&app_config.overpass.endpoint);
            let city = cities::find_or_default(&selection.city);
            let query = build_query(&selection.filter_set(), city);

            let points = fetch_points(&client, &query).await;
            println!("{}", serde_json::to_string_pretty(&to_feature_collection(&points))?);
        }
        Commands::Cities => {
            for c in CITIES {
                println!("{:<16} {}, {}", c.id, c.name, c.country);
            }
        }
    }

    Ok(())
}
