use super::access::{is_rail_boarding, AccessResources};
use super::{DeferredStation, ZoningState};
use crate::config::{BoundingBox, Settings};
use crate::error::OsmImportError;
use crate::osm::entity::{OsmMemberKind, OsmNodeData, OsmTags};
use crate::tags::pt;
use geo::{Geometry, Point};
use itertools::Itertools;
use macronet_core::algorithm::spatial::LinkLocator;
use macronet_core::ids::{LayerId, TransferZoneId};
use macronet_core::zoning::TransferZoneKind;
use macronet_core::{IdGenerators, MacroNetwork, Mode};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use wkt::ToWkt;

/// warning sink for the postprocessing pass: once per cause, silenced for
/// user-suppressed ids and for entities hugging the bounding border.
struct Warner<'a> {
    settings: &'a Settings,
    bounds: Option<BoundingBox>,
    warned: &'a mut HashSet<String>,
}

impl Warner<'_> {
    fn warn(&mut self, id: i64, position: Option<Point<f64>>, cause: String) {
        if self.settings.zoning.is_warning_suppressed(id) {
            return;
        }
        if let (Some(bounds), Some(p)) = (&self.bounds, position) {
            if bounds.distance_to_border_m(p.x(), p.y())
                < self.settings.zoning.bounding_border_suppression_m
            {
                return;
            }
        }
        if self.warned.insert(cause.clone()) {
            log::warn!("{cause}");
        }
    }
}

fn tag_refs(tags: &OsmTags) -> Vec<String> {
    ["ref", "local_ref", "route_ref"]
        .iter()
        .filter_map(|k| tags.get(*k))
        .flat_map(|v| v.split(';'))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn names_match(a: Option<&String>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// groups a mode set by the layer each mode is assigned to. unassigned modes
/// are dropped silently; they cannot be anchored anywhere.
fn modes_by_layer(
    network: &MacroNetwork,
    modes: &BTreeSet<Mode>,
) -> BTreeMap<LayerId, BTreeSet<Mode>> {
    let mut result: BTreeMap<LayerId, BTreeSet<Mode>> = BTreeMap::new();
    for mode in modes {
        if let Ok(layer) = network.layer_of_mode(*mode) {
            result.entry(layer).or_default().insert(*mode);
        }
    }
    result
}

/// pass 3 of the public transport stitching: resolves the deferred stop
/// positions onto transfer zones and creates their connectoids, processes
/// standalone stations, gives orphan zones access links, and culls groups
/// that ended up empty.
pub fn resolve_deferred(
    settings: &Settings,
    state: &mut ZoningState,
    network: &mut MacroNetwork,
    ids: &mut IdGenerators,
    locator: &mut LinkLocator,
) -> Result<(), OsmImportError> {
    let driving_side = settings.resolved_driving_side();
    let mut stops = std::mem::take(&mut state.deferred_stops);
    stops.sort_by_key(|s| s.osmid);
    let mut stations = std::mem::take(&mut state.deferred_stations);
    stations.sort_by_key(|s| (s.kind, s.external_id));
    let bounds = state.bounds;

    let mut resources = AccessResources {
        network,
        ids,
        locator,
        zoning: &mut state.zoning,
        driving_side,
        closest_edge_buffer_m: settings.zoning.closest_edge_buffer_m,
        way_class: &state.way_class,
    };
    let mut warner = Warner {
        settings,
        bounds,
        warned: &mut state.warned,
    };

    log::info!("resolving {} deferred stop positions", stops.len());
    for stop in stops.iter() {
        process_stop_position(
            settings,
            &mut resources,
            &mut warner,
            &state.zone_by_node,
            &state.zone_by_way,
            &state.zone_refs,
            &state.groups_of_stop,
            stop,
        )?;
    }

    log::info!("resolving {} deferred stations", stations.len());
    for station in stations.iter() {
        process_station(settings, &mut resources, &mut warner, station)?;
    }

    let orphan_zones: Vec<TransferZoneId> = resources
        .zoning
        .zone_iterator()
        .filter(|z| !resources.zoning.zone_has_connectoids(z.id))
        .map(|z| z.id)
        .collect();
    log::info!("resolving access for {} orphan transfer zones", orphan_zones.len());
    for zone in orphan_zones {
        process_orphan_zone(
            settings,
            &mut resources,
            &mut warner,
            &state.zone_by_node,
            zone,
        )?;
    }

    let culled = resources.zoning.remove_empty_groups();
    if culled > 0 {
        log::info!("culled {culled} transfer zone groups without members");
    }
    log::info!(
        "zoning holds {} transfer zones, {} groups, {} connectoids",
        resources.zoning.n_zones(),
        resources.zoning.n_groups(),
        resources.zoning.n_connectoids()
    );
    Ok(())
}

/// the matching ladder for one stop position, per the order: user override,
/// group by ref/name, spatial search, Ptv1 platform promotion.
#[allow(clippy::too_many_arguments)]
fn process_stop_position(
    settings: &Settings,
    resources: &mut AccessResources,
    warner: &mut Warner,
    zone_by_node: &BTreeMap<i64, TransferZoneId>,
    zone_by_way: &BTreeMap<i64, TransferZoneId>,
    zone_refs: &std::collections::HashMap<TransferZoneId, Vec<String>>,
    groups_of_stop: &std::collections::HashMap<i64, Vec<macronet_core::ids::TransferZoneGroupId>>,
    stop: &OsmNodeData,
) -> Result<(), OsmImportError> {
    let point = stop.get_point();
    let stop_modes = pt::inferred_modes(&stop.tags);
    let stop_refs = tag_refs(&stop.tags);
    let stop_name = stop.tag("name");
    let mut tried: Vec<&str> = vec![];

    let zone_of_external = |kind: OsmMemberKind, id: i64| -> Option<TransferZoneId> {
        match kind {
            OsmMemberKind::Node => zone_by_node.get(&id).copied(),
            OsmMemberKind::Way => zone_by_way.get(&id).copied(),
            OsmMemberKind::Relation => None,
        }
    };

    // 1. explicit user override wins unconditionally
    let mut matched: Option<TransferZoneId> = None;
    if let Some((kind, id)) = settings.zoning.overridden_waiting_area(stop.osmid.0) {
        tried.push("user override");
        matched = zone_of_external(kind, id);
        if matched.is_none() {
            warner.warn(
                stop.osmid.0,
                Some(point),
                format!(
                    "stop position {} overridden to waiting area {kind} {id} which does not exist",
                    stop.osmid
                ),
            );
        }
    }

    let mode_compatible = |resources: &AccessResources, zone: TransferZoneId| -> bool {
        resources
            .zoning
            .get_zone(zone)
            .map(|z| z.modes.is_empty() || stop_modes.is_empty() || z.supports_any(&stop_modes))
            .unwrap_or(false)
    };

    // 2. the stop's own stop-area groups, by ref then name
    if matched.is_none() {
        if let Some(groups) = groups_of_stop.get(&stop.osmid.0) {
            tried.push("stop area by ref/name");
            let candidates: Vec<TransferZoneId> = groups
                .iter()
                .filter_map(|g| resources.zoning.get_group(*g).ok())
                .flat_map(|g| g.zones.iter().copied().collect_vec())
                .filter(|z| mode_compatible(resources, *z))
                .sorted()
                .dedup()
                .collect();
            matched = match_by_ref_or_name(
                resources,
                &candidates,
                zone_refs,
                &stop_refs,
                stop_name,
            );
            // a single compatible platform in the group is unambiguous even
            // without a ref or name
            if matched.is_none() && candidates.len() == 1 {
                matched = candidates.first().copied();
            }
        }
    }

    // 3. spatial search over all mode-compatible zones
    if matched.is_none() {
        tried.push("spatial search");
        let radius = settings.zoning.stop_to_waiting_area_search_m;
        let nearby: Vec<(TransferZoneId, f64)> = resources
            .zoning
            .zone_iterator()
            .filter_map(|zone| {
                ZoningState::zone_distance_m(zone, &point).map(|d| (zone.id, d))
            })
            .filter(|(_, d)| *d <= radius)
            .sorted_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .collect();
        let compatible: Vec<TransferZoneId> = nearby
            .iter()
            .map(|(z, _)| *z)
            .filter(|z| mode_compatible(resources, *z))
            .collect();
        matched =
            match_by_ref_or_name(resources, &compatible, zone_refs, &stop_refs, stop_name)
                .or_else(|| compatible.first().copied());
    }

    // 4. tagging error recovery: the stop is itself tagged as a platform
    if matched.is_none()
        && (pt::is_ptv2_platform(&stop.tags)
            || pt::is_ptv1_highway_platform(&stop.tags)
            || pt::is_ptv1_railway_platform(&stop.tags)
            || pt::is_ptv1_bus_stop(&stop.tags))
    {
        tried.push("platform promotion");
        let on_infrastructure = resources.existing_node_at(&point).is_some()
            || !resources
                .select_access_links(&point, &point, &stop_modes, 1.0, None, 1)?
                .is_empty();
        if on_infrastructure {
            let kind = if pt::is_ptv1_bus_stop(&stop.tags) {
                TransferZoneKind::Pole
            } else {
                TransferZoneKind::Platform
            };
            let zone = resources.zoning.add_zone(
                resources.ids,
                Some(stop.osmid.0),
                stop_name.map(String::from),
                kind,
                Geometry::Point(point),
                stop_modes.clone(),
            );
            matched = Some(zone);
        }
    }

    let Some(zone) = matched else {
        warner.warn(
            stop.osmid.0,
            Some(point),
            format!(
                "no waiting area found for stop position {} at {} (tried: {})",
                stop.osmid,
                point.to_wkt(),
                tried.join(", ")
            ),
        );
        return Ok(());
    };

    // mode adoption in both directions
    let effective_modes = {
        let z = resources.zoning.get_zone_mut(zone)?;
        if z.modes.is_empty() {
            z.modes = stop_modes.clone();
        }
        if stop_modes.is_empty() {
            z.modes.clone()
        } else {
            stop_modes.clone()
        }
    };
    if effective_modes.is_empty() {
        warner.warn(
            stop.osmid.0,
            Some(point),
            format!(
                "stop position {} has no inferable modes, no connectoid created",
                stop.osmid
            ),
        );
        return Ok(());
    }

    // a user-nominated access way for the matched waiting area restricts the
    // candidate links
    let restrict_way = {
        let z = resources.zoning.get_zone(zone)?;
        z.external_id.and_then(|external| {
            let kind = if zone_by_way.get(&external) == Some(&zone) {
                OsmMemberKind::Way
            } else {
                OsmMemberKind::Node
            };
            settings.zoning.overridden_access_way(kind, external)
        })
    };
    let zone_point = resources
        .zoning
        .get_zone(zone)?
        .centroid()
        .unwrap_or(point);

    connect_zone(
        resources,
        warner,
        zone,
        &zone_point,
        &point,
        &effective_modes,
        settings.zoning.stop_to_waiting_area_search_m,
        restrict_way,
        stop.osmid.0,
    )
}

/// ref match first, then case-insensitive name equality.
fn match_by_ref_or_name(
    resources: &AccessResources,
    candidates: &[TransferZoneId],
    zone_refs: &std::collections::HashMap<TransferZoneId, Vec<String>>,
    stop_refs: &[String],
    stop_name: Option<&str>,
) -> Option<TransferZoneId> {
    if !stop_refs.is_empty() {
        for candidate in candidates {
            if let Some(refs) = zone_refs.get(candidate) {
                if refs.iter().any(|r| stop_refs.contains(r)) {
                    return Some(*candidate);
                }
            }
        }
    }
    for candidate in candidates {
        let name = resources
            .zoning
            .get_zone(*candidate)
            .ok()
            .and_then(|z| z.name.clone());
        if names_match(name.as_ref(), stop_name) {
            return Some(*candidate);
        }
    }
    None
}

/// anchors a zone onto the network at a stop location and creates its
/// connectoids, one layer at a time.
#[allow(clippy::too_many_arguments)]
fn connect_zone(
    resources: &mut AccessResources,
    warner: &mut Warner,
    zone: TransferZoneId,
    zone_point: &Point<f64>,
    stop_point: &Point<f64>,
    modes: &BTreeSet<Mode>,
    radius_m: f64,
    restrict_way: Option<i64>,
    subject_id: i64,
) -> Result<(), OsmImportError> {
    let mut total = 0;
    for (layer_id, layer_modes) in modes_by_layer(resources.network, modes) {
        let node = match resources.existing_node_at(stop_point) {
            Some((existing_layer, node)) if existing_layer == layer_id => node,
            _ => {
                let candidates = resources.select_access_links(
                    stop_point,
                    zone_point,
                    &layer_modes,
                    radius_m,
                    restrict_way,
                    1,
                )?;
                let Some(candidate) = candidates.first() else {
                    continue;
                };
                resources.anchor_on_link(candidate)?
            }
        };
        total += resources.create_connectoids(layer_id, node, zone, zone_point, &layer_modes)?;
    }
    if total == 0 {
        warner.warn(
            subject_id,
            Some(*stop_point),
            format!(
                "no access link segment found for stop location of entity {subject_id} \
                 (mode or driving-side incompatible within {radius_m}m)"
            ),
        );
    }
    Ok(())
}

/// a deferred station either names a nearby group of platforms or becomes a
/// standalone transfer zone with its own access links.
fn process_station(
    settings: &Settings,
    resources: &mut AccessResources,
    warner: &mut Warner,
    station: &DeferredStation,
) -> Result<(), OsmImportError> {
    // 1. adopt: nearest mode-compatible zone within the waiting area radius
    let nearby = resources
        .zoning
        .zone_iterator()
        .filter(|z| {
            station.modes.is_empty() || z.modes.is_empty() || z.supports_any(&station.modes)
        })
        .filter_map(|z| {
            ZoningState::zone_distance_m(z, &station.position).map(|d| (z.id, d))
        })
        .filter(|(_, d)| *d <= settings.zoning.station_to_waiting_area_search_m)
        .sorted_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(z, _)| z)
        .next();

    if let Some(zone) = nearby {
        let groups: Vec<_> = resources
            .zoning
            .get_zone(zone)?
            .groups()
            .copied()
            .collect();
        if groups.is_empty() {
            let group =
                resources
                    .zoning
                    .add_group(resources.ids, Some(station.external_id), station.name.clone());
            resources.zoning.add_zone_to_group(zone, group)?;
        } else {
            for group in groups {
                let g = resources.zoning.get_group_mut(group)?;
                if g.name.is_none() {
                    g.name = station.name.clone();
                }
            }
        }
        return Ok(());
    }

    // 2. standalone: a zone of its own plus access links onto the tracks
    let modes = if station.modes.is_empty() {
        warner.warn(
            station.external_id,
            Some(station.position),
            format!(
                "station {} {} has no inferable modes, skipped",
                station.kind, station.external_id
            ),
        );
        return Ok(());
    } else {
        station.modes.clone()
    };
    let zone = resources.zoning.add_zone(
        resources.ids,
        Some(station.external_id),
        station.name.clone(),
        TransferZoneKind::None,
        Geometry::Point(station.position),
        modes.clone(),
    );

    let max_links = if is_rail_boarding(&modes) { 2 } else { 1 };
    let mut created = 0;
    for (layer_id, layer_modes) in modes_by_layer(resources.network, &modes) {
        let candidates = resources.select_access_links(
            &station.position,
            &station.position,
            &layer_modes,
            settings.zoning.station_to_tracks_search_m,
            None,
            max_links,
        )?;
        for candidate in candidates {
            let node = resources.anchor_on_link(&candidate)?;
            created += resources.create_connectoids(
                layer_id,
                node,
                zone,
                &station.position,
                &layer_modes,
            )?;
        }
    }
    if created == 0 {
        warner.warn(
            station.external_id,
            Some(station.position),
            format!(
                "standalone station {} {} found no access link within {}m",
                station.kind, station.external_id, settings.zoning.station_to_tracks_search_m
            ),
        );
    }
    Ok(())
}

/// a transfer zone that gained no connectoid during stop resolution is
/// matched to the infrastructure on its own: candidate links within the
/// search radius, closest-edge family, driving side, importance order.
fn process_orphan_zone(
    settings: &Settings,
    resources: &mut AccessResources,
    warner: &mut Warner,
    zone_by_node: &BTreeMap<i64, TransferZoneId>,
    zone: TransferZoneId,
) -> Result<(), OsmImportError> {
    let (zone_point, modes, external_id) = {
        let z = resources.zoning.get_zone(zone)?;
        let Some(centroid) = z.centroid() else {
            return Ok(());
        };
        (centroid, z.modes.clone(), z.external_id)
    };
    if modes.is_empty() {
        warner.warn(
            external_id.unwrap_or_default(),
            Some(zone_point),
            format!("transfer zone {zone} has no modes and no stop position, no access created"),
        );
        return Ok(());
    }
    let restrict_way = external_id.and_then(|external| {
        let kind = if zone_by_node.get(&external) == Some(&zone) {
            OsmMemberKind::Node
        } else {
            OsmMemberKind::Way
        };
        settings.zoning.overridden_access_way(kind, external)
    });

    let mut created = 0;
    for (layer_id, layer_modes) in modes_by_layer(resources.network, &modes) {
        let candidates = resources.select_access_links(
            &zone_point,
            &zone_point,
            &layer_modes,
            settings.zoning.stop_to_waiting_area_search_m,
            restrict_way,
            1,
        )?;
        let Some(candidate) = candidates.first() else {
            continue;
        };
        let node = resources.anchor_on_link(candidate)?;
        created += resources.create_connectoids(layer_id, node, zone, &zone_point, &layer_modes)?;
    }
    if created == 0 {
        warner.warn(
            external_id.unwrap_or_default(),
            Some(zone_point),
            format!(
                "no viable access link for waiting area {zone} \
                 (tried: candidate filter, closest-edge family, driving side, validity)"
            ),
        );
    }
    Ok(())
}
