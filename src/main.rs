use clap::{Parser, ValueEnum};
use loo_finder::config::Settings;
use loo_finder::finder::{render_text_summary, ToiletFinder};
use loo_finder::location::{DeviceLocator, IpLocator, LocationInput, ManualInput, NoDeviceLocator};
use loo_finder::server;
use loo_finder::toilets::SearchRadius;
use tracing_subscriber::EnvFilter;

/// Loo Finder — public toilets near you, from OpenStreetMap.
///
/// Resolves one location (manual coordinates, then device location, then
/// place name), queries Overpass for `amenity=toilets` nodes within the
/// radius and prints distances plus navigation links.
///
/// Examples:
///   loo-finder London
///   loo-finder --city "Paris" --radius 2500
///   loo-finder --device
///   loo-finder --lat 41.9028 --lon 12.4964 --format geojson
///   loo-finder --serve --port 3000
#[derive(Parser)]
#[command(name = "loo-finder", version, about, long_about = None)]
struct Cli {
    /// Place name (positional). Example: loo-finder London
    #[arg(index = 1)]
    city_positional: Option<String>,

    /// Place name (named). Example: --city "Rome"
    #[arg(long)]
    city: Option<String>,

    /// Use the device location (approximated from the public IP).
    #[arg(long, short = 'g')]
    device: bool,

    /// Manual latitude override (-90 to 90).
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<String>,

    /// Manual longitude override (-180 to 180).
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<String>,

    /// Search radius in meters (500 to 5000). Defaults to LOO_DEFAULT_RADIUS or 1500.
    #[arg(long, short = 'r', value_parser = parse_radius)]
    radius: Option<SearchRadius>,

    /// What to print on stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Run the HTTP API instead of a single search.
    #[arg(long)]
    serve: bool,

    /// Bind address for --serve.
    #[arg(long)]
    host: Option<String>,

    /// Port for --serve.
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Geojson,
}

fn parse_radius(s: &str) -> Result<SearchRadius, String> {
    let meters: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a whole number of meters", s))?;
    SearchRadius::new(meters).map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut settings = Settings::from_env().unwrap_or_else(|e| {
        eprintln!("Error: Invalid configuration: {}", e);
        std::process::exit(1);
    });
    if let Some(host) = cli.host.clone() {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(radius) = cli.radius {
        settings.default_radius = radius;
    }

    // ── Server mode ─────────────────────────────────────────────

    if cli.serve {
        let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("Error: Cannot start runtime: {}", e);
            std::process::exit(1);
        });
        if let Err(e) = runtime.block_on(server::start(&settings)) {
            eprintln!("Server error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // ── Single search ───────────────────────────────────────────

    let locator = device_locator(&settings);
    let input = location_input(&cli, locator.as_ref());
    if input == LocationInput::default() {
        eprintln!("Error: No location specified.");
        eprintln!();
        eprintln!("Usage:");
        eprintln!("  loo-finder London");
        eprintln!("  loo-finder --city \"Paris\" --radius 2500");
        eprintln!("  loo-finder --device");
        eprintln!("  loo-finder --lat 41.9028 --lon 12.4964");
        std::process::exit(1);
    }

    let finder = ToiletFinder::from_settings(&settings);
    let report = finder.search(&input, settings.default_radius);

    // Summary to stderr
    eprint!("{}", render_text_summary(&report));

    let stdout = match cli.format {
        OutputFormat::Text => Ok(None),
        OutputFormat::Json => serde_json::to_string_pretty(&report).map(Some),
        OutputFormat::Geojson => serde_json::to_string_pretty(&report.to_geojson()).map(Some),
    };
    match stdout {
        Ok(Some(out)) => println!("{}", out),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error: Cannot serialize report: {}", e);
            std::process::exit(1);
        }
    }

    if !report.is_success() {
        std::process::exit(1);
    }
}

fn device_locator(settings: &Settings) -> Box<dyn DeviceLocator> {
    if settings.ip_api_url.trim().is_empty() {
        Box::new(NoDeviceLocator)
    } else {
        Box::new(IpLocator::from_settings(settings))
    }
}

fn location_input(cli: &Cli, locator: &dyn DeviceLocator) -> LocationInput {
    let manual = if cli.lat.is_some() || cli.lon.is_some() {
        Some(ManualInput::new(
            cli.lat.clone().unwrap_or_default(),
            cli.lon.clone().unwrap_or_default(),
        ))
    } else {
        None
    };

    // The device is only asked when no manual pair outranks it.
    let device = if cli.device && !manual.as_ref().is_some_and(ManualInput::is_supplied) {
        Some(locator.locate())
    } else {
        None
    };

    LocationInput {
        manual,
        device,
        place: cli.city.clone().or_else(|| cli.city_positional.clone()),
    }
}
