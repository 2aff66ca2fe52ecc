use crate::config::Settings;
use crate::error::OsmImportError;
use crate::io::handler::{OsmEntityHandler, OsmScanner};
use crate::pass::network::{NetworkBuild, NetworkHandler};
use crate::pass::retention::NodeRetentionPlanner;
use crate::pass::zoning::{self, ZoningMainHandler, ZoningPreprocessHandler, ZoningState};
use macronet_core::algorithm::spatial::LinkLocator;
use macronet_core::{MacroNetwork, Zoning};

/// parses the source into a macroscopic network only.
pub fn parse_network(
    source: &dyn OsmScanner,
    settings: &Settings,
) -> Result<MacroNetwork, OsmImportError> {
    Ok(build_network(source, settings)?.network)
}

/// parses the source into a macroscopic network plus the public transport
/// zoning stitched onto it.
pub fn parse_intermodal(
    source: &dyn OsmScanner,
    settings: &Settings,
) -> Result<(MacroNetwork, Zoning), OsmImportError> {
    let mut build = build_network(source, settings)?;
    if !settings.zoning.active {
        log::info!("public transport parsing disabled, producing network only");
        return Ok((build.network, Zoning::new()));
    }

    let mut state = ZoningState::new(build.bounds);
    log::info!("(3) public transport preprocessing pass");
    {
        let mut preprocess = ZoningPreprocessHandler::new(settings, &mut state);
        scan_tolerating_eof(source, &mut preprocess)?;
        preprocess.finish();
    }
    log::info!("(4) public transport main pass");
    {
        let mut main = ZoningMainHandler::new(settings, &mut state, &mut build.ids);
        scan_tolerating_eof(source, &mut main)?;
        main.finish();
    }
    log::info!("(5) public transport postprocessing pass");
    let mut locator = LinkLocator::from_network(&build.network);
    zoning::resolve_deferred(
        settings,
        &mut state,
        &mut build.network,
        &mut build.ids,
        &mut locator,
    )?;
    Ok((build.network, state.zoning))
}

fn build_network(
    source: &dyn OsmScanner,
    settings: &Settings,
) -> Result<NetworkBuild, OsmImportError> {
    let keep = if settings.network.plan_node_retention {
        log::info!("(0) node retention planning pass over {}", source.descriptor());
        let mut planner = NodeRetentionPlanner::new(settings);
        scan_tolerating_eof(source, &mut planner)?;
        Some(planner.into_keep_set())
    } else {
        None
    };
    log::info!("(1) main network pass over {}", source.descriptor());
    let mut handler = NetworkHandler::new(settings, keep)?;
    scan_tolerating_eof(source, &mut handler)?;
    log::info!("(2) repairing topology and finalising network");
    handler.finalize()
}

/// a truncated source finalises whatever state is present with a warning
/// instead of aborting; all other decode errors propagate.
fn scan_tolerating_eof(
    source: &dyn OsmScanner,
    handler: &mut dyn OsmEntityHandler,
) -> Result<(), OsmImportError> {
    match source.scan(handler) {
        Err(e) if is_unexpected_eof(&e) => {
            log::warn!("OSM source ended unexpectedly, continuing with partial data: {e}");
            Ok(())
        }
        other => other,
    }
}

fn is_unexpected_eof(error: &OsmImportError) -> bool {
    let recoverable_kind = matches!(
        error,
        OsmImportError::PbfLibError { .. } | OsmImportError::XmlParseError(_)
    );
    if !recoverable_kind {
        return false;
    }
    let message = error.to_string().to_lowercase();
    message.contains("unexpected eof") || message.contains("unexpected end")
}
