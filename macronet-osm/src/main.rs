use clap::{Parser, Subcommand};
use macronet_osm::config::Settings;
use macronet_osm::io::{OsmScanner, OsmSource};
use macronet_osm::pass;
use macronet_osm::OsmImportError;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct MacronetOsmArguments {
    #[command(subcommand)]
    app: App,
}

#[derive(Subcommand)]
pub enum App {
    /// import an OSM extract as a macroscopic network
    Network {
        #[arg(long, help = "path or URL of the .osm / .osm.pbf source")]
        source: String,
        #[arg(long, help = "ISO-2 country code driving the defaults")]
        country: Option<String>,
        #[arg(long, help = "path to a .toml/.json file with import settings")]
        settings_file: Option<String>,
        #[arg(long, help = "write the parsed network as json to this path")]
        output: Option<String>,
    },
    /// import an OSM extract as a network plus public transport zoning
    Intermodal {
        #[arg(long, help = "path or URL of the .osm / .osm.pbf source")]
        source: String,
        #[arg(long, help = "ISO-2 country code driving the defaults")]
        country: Option<String>,
        #[arg(long, help = "path to a .toml/.json file with import settings")]
        settings_file: Option<String>,
        #[arg(long, help = "write the parsed network and zoning as json to this path")]
        output: Option<String>,
    },
}

fn load_settings(
    settings_file: &Option<String>,
    country: &Option<String>,
) -> Result<Settings, OsmImportError> {
    let mut settings = match settings_file {
        None => Settings::default(),
        Some(f) => {
            log::info!("reading import settings from {f}");
            Settings::try_from(f)?
        }
    };
    if let Some(country) = country {
        settings.country_code = country.clone();
    }
    Ok(settings)
}

fn write_output(path: &str, payload: &impl serde::Serialize) -> Result<(), OsmImportError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|e| OsmImportError::InternalError(format!("failure encoding output: {e}")))?;
    std::fs::write(path, encoded)
        .map_err(|e| OsmImportError::FileError(path.to_string(), e.to_string()))?;
    log::info!("wrote {path}");
    Ok(())
}

pub fn run(app: &App) -> Result<(), OsmImportError> {
    env_logger::init();
    match app {
        App::Network {
            source,
            country,
            settings_file,
            output,
        } => {
            let settings = load_settings(settings_file, country)?;
            let source = OsmSource::locate(source)?;
            let network = pass::parse_network(&source, &settings)?;
            eprintln!(
                "network: {} layers, {} nodes, {} links, {} link segments",
                network.n_layers(),
                network.n_nodes(),
                network.n_links(),
                network.n_segments()
            );
            if let Some(path) = output {
                write_output(path, &network)?;
            }
            Ok(())
        }
        App::Intermodal {
            source,
            country,
            settings_file,
            output,
        } => {
            let settings = load_settings(settings_file, country)?;
            let source = OsmSource::locate(source)?;
            log::info!("parsing intermodal network from {}", source.descriptor());
            let (network, zoning) = pass::parse_intermodal(&source, &settings)?;
            eprintln!(
                "network: {} layers, {} nodes, {} links, {} link segments",
                network.n_layers(),
                network.n_nodes(),
                network.n_links(),
                network.n_segments()
            );
            eprintln!(
                "zoning: {} transfer zones, {} groups, {} connectoids",
                zoning.n_zones(),
                zoning.n_groups(),
                zoning.n_connectoids()
            );
            if let Some(path) = output {
                write_output(path, &(network, zoning))?;
            }
            Ok(())
        }
    }
}

fn main() {
    let args = MacronetOsmArguments::parse();
    if let Err(e) = run(&args.app) {
        log::error!("macronet-osm failed: {e}");
        eprintln!("{e}");
        std::process::exit(1);
    }
}
