use std::{path::PathBuf, time::Duration};

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use inquire::validator::Validation;
use weather_core::{
    ApiKey, Config, GeoResult, OpenWeatherClient, Units, WeatherError, WeatherProvider,
    WeatherReport, model::SysInfo,
};

use crate::format::Formatter;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Also write logs to this file.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and default settings.
    Configure,

    /// Show current weather and a 3-day forecast for a city.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// City name, e.g. "Puchong", "New York".
    #[arg(long)]
    pub city: String,

    /// Two-letter country code, e.g. "MY", "US".
    #[arg(long)]
    pub country: String,

    /// Display units: metric or imperial.
    #[arg(long)]
    pub units: Option<Units>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Simple)]
    pub format: OutputFormat,

    /// OpenWeatherMap API key.
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Request timeout in seconds [default: 10].
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Simple,
    Detailed,
    Table,
    Json,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show(args) => show(args).await,
        }
    }
}

async fn show(args: ShowArgs) -> anyhow::Result<()> {
    let config = config_or_default(Config::load());

    let api_key = config.resolve_api_key(args.api_key.as_deref());
    let timeout = args.timeout.map(Duration::from_secs).unwrap_or_else(|| config.timeout());
    let units = args.units.unwrap_or_else(|| config.units());

    tracing::info!("City: {}, Country: {}, Units: {units}", args.city, args.country);

    let client = OpenWeatherClient::new(api_key, timeout).map_err(user_error)?;

    if args.format != OutputFormat::Json {
        eprintln!("Fetching weather for {}, {}...", args.city, args.country);
    }

    let report = tokio::select! {
        result = lookup(&client, &args.city, &args.country) => result.map_err(user_error)?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("User interrupted the program");
            return Err(anyhow!("Operation cancelled by user"));
        }
    };

    println!("{}", render(&report, units, args.format)?);
    tracing::info!("Weather data displayed successfully");
    Ok(())
}

/// Resolves the city, then fetches weather at its coordinates.
///
/// When the provider leaves the location out of the current conditions, the
/// geocoded name is filled in so renderers always have one.
pub async fn lookup(
    provider: &dyn WeatherProvider,
    city: &str,
    country: &str,
) -> Result<WeatherReport, WeatherError> {
    let geo: GeoResult = provider.resolve_location(city, country).await?;
    let mut report = provider
        .fetch_weather(geo.coordinates.latitude(), geo.coordinates.longitude())
        .await?;

    let current = &mut report.current;
    if current.name.as_deref().is_none_or(str::is_empty) {
        current.name = Some(geo.name);
        let sys = current.sys.get_or_insert_with(SysInfo::default);
        sys.country.get_or_insert(geo.country);
    }

    Ok(report)
}

fn render(report: &WeatherReport, units: Units, format: OutputFormat) -> anyhow::Result<String> {
    let formatter = Formatter::new(units);

    let text = match format {
        OutputFormat::Json => Formatter::json(report)?,
        OutputFormat::Detailed => {
            let rule = "=".repeat(60);
            format!("\n{rule}\n{}\n{rule}", formatter.summary(report))
        }
        OutputFormat::Table => {
            let current = formatter.current(&report.current);
            format!("{current}\n\n{}", formatter.table(&report.forecast))
        }
        OutputFormat::Simple => {
            let rule = "=".repeat(50);
            let mut out = format!("\n{rule}\n{}", formatter.current(&report.current));
            if !report.forecast.is_empty() {
                out.push_str("\n\n");
                out.push_str(&formatter.forecast(&report.forecast));
            }
            out.push('\n');
            out.push_str(&rule);
            out
        }
    };

    Ok(text)
}

fn user_error(err: WeatherError) -> anyhow::Error {
    tracing::debug!("{} failure: {err:?}", err.code());
    anyhow!("[{}] {err}\nHint: {}", err.code(), err.hint())
}

/// An unreadable config file is reported and replaced by defaults.
fn config_or_default(loaded: anyhow::Result<Config>) -> Config {
    loaded.unwrap_or_else(|err| {
        tracing::warn!("Ignoring config file: {err:#}");
        Config::default()
    })
}

/// Blank input is accepted only when a key is already stored.
fn validate_key_input(input: &str, keep_existing: bool) -> Validation {
    if keep_existing && input.trim().is_empty() {
        return Validation::Valid;
    }
    match ApiKey::parse(Some(input)) {
        Ok(_) => Validation::Valid,
        Err(err) => Validation::Invalid(err.to_string().into()),
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = config_or_default(Config::load());
    let keep_existing = config.is_configured();

    let mut prompt = inquire::Password::new("OpenWeatherMap API key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .with_validator(move |input: &str| Ok(validate_key_input(input, keep_existing)));
    if keep_existing {
        prompt = prompt.with_help_message("Leave blank to keep the stored key");
    }
    let api_key = prompt.prompt().context("Failed to read API key")?;

    let current_units = config.units();
    let units = inquire::Select::new("Default units:", Units::all().to_vec())
        .with_starting_cursor(Units::all().iter().position(|u| *u == current_units).unwrap_or(0))
        .prompt()
        .context("Failed to read units")?;

    let timeout_secs = inquire::CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(config.timeout().as_secs())
        .with_validator(|secs: &u64| {
            Ok(if *secs > 0 {
                Validation::Valid
            } else {
                Validation::Invalid("Timeout must be at least 1 second".into())
            })
        })
        .prompt()
        .context("Failed to read timeout")?;

    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_string());
    }
    config.units = Some(units);
    config.timeout_secs = Some(timeout_secs);

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}
