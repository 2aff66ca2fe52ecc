use macronet_core::Mode;

/// road-based OSM mode tokens
pub mod road {
    pub const MOTORCAR: &str = "motorcar";
    pub const MOTORCYCLE: &str = "motorcycle";
    pub const BUS: &str = "bus";
    pub const MINIBUS: &str = "minibus";
    pub const COACH: &str = "coach";
    pub const SHARE_TAXI: &str = "share_taxi";
    pub const HGV: &str = "hgv";
    pub const HGV_ARTICULATED: &str = "hgv_articulated";
    pub const GOODS: &str = "goods";
    pub const BICYCLE: &str = "bicycle";
    pub const FOOT: &str = "foot";
}

/// rail-based OSM mode tokens
pub mod rail {
    pub const TRAIN: &str = "train";
    pub const RAIL: &str = "rail";
    pub const TRAM: &str = "tram";
    pub const LIGHT_RAIL: &str = "light_rail";
    pub const SUBWAY: &str = "subway";
    pub const METRO: &str = "metro";
    pub const NARROW_GAUGE: &str = "narrow_gauge";
}

/// water-based OSM mode tokens
pub mod water {
    pub const FERRY: &str = "ferry";
}

// category keys whose access tags apply to whole mode families
pub const ACCESS: &str = "access";
pub const VEHICLE: &str = "vehicle";
pub const MOTOR_VEHICLE: &str = "motor_vehicle";
pub const PSV: &str = "psv";

/// members of a mode category token, or None when the token is not a
/// category. categories nest: `vehicle` spans everything `motor_vehicle`
/// spans plus bicycles.
pub fn category_members(token: &str) -> Option<&'static [&'static str]> {
    match token {
        VEHICLE => Some(&[
            road::MOTORCAR,
            road::MOTORCYCLE,
            road::BUS,
            road::MINIBUS,
            road::COACH,
            road::SHARE_TAXI,
            road::HGV,
            road::HGV_ARTICULATED,
            road::GOODS,
            road::BICYCLE,
        ]),
        MOTOR_VEHICLE => Some(&[
            road::MOTORCAR,
            road::MOTORCYCLE,
            road::BUS,
            road::MINIBUS,
            road::COACH,
            road::SHARE_TAXI,
            road::HGV,
            road::HGV_ARTICULATED,
            road::GOODS,
        ]),
        PSV => Some(&[road::BUS, road::MINIBUS, road::COACH, road::SHARE_TAXI]),
        _ => None,
    }
}

/// expands a token to concrete mode tokens: categories expand to their
/// members, concrete tokens expand to themselves.
pub fn expand(token: &str) -> Vec<&str> {
    match category_members(token) {
        Some(members) => members.to_vec(),
        None => vec![token],
    }
}

/// the predefined mode an OSM mode token activates by default, if any.
/// settings may add or remove pairings on top of this table.
pub fn default_mode_of(token: &str) -> Option<Mode> {
    match token {
        road::MOTORCAR => Some(Mode::Car),
        road::MOTORCYCLE => Some(Mode::Motorcycle),
        road::BUS | road::MINIBUS | road::COACH | road::SHARE_TAXI => Some(Mode::Bus),
        road::HGV | road::GOODS => Some(Mode::HeavyGoods),
        road::HGV_ARTICULATED => Some(Mode::HeavyGoodsArticulated),
        road::BICYCLE => Some(Mode::Bicycle),
        road::FOOT => Some(Mode::Foot),
        rail::TRAIN | rail::RAIL | rail::NARROW_GAUGE => Some(Mode::Train),
        rail::TRAM => Some(Mode::Tram),
        rail::LIGHT_RAIL => Some(Mode::LightRail),
        rail::SUBWAY | rail::METRO => Some(Mode::Subway),
        water::FERRY => Some(Mode::Ferry),
        _ => None,
    }
}

/// the OSM tokens aggregated into a mode's external id, primary token first.
pub fn tokens_of(mode: Mode) -> &'static [&'static str] {
    match mode {
        Mode::Car => &[road::MOTORCAR],
        Mode::Motorcycle => &[road::MOTORCYCLE],
        Mode::Bus => &[road::BUS, road::MINIBUS, road::COACH, road::SHARE_TAXI],
        Mode::HeavyGoods => &[road::HGV, road::GOODS],
        Mode::HeavyGoodsArticulated => &[road::HGV_ARTICULATED],
        Mode::Bicycle => &[road::BICYCLE],
        Mode::Foot => &[road::FOOT],
        Mode::Train => &[rail::TRAIN, rail::RAIL, rail::NARROW_GAUGE],
        Mode::Tram => &[rail::TRAM],
        Mode::LightRail => &[rail::LIGHT_RAIL],
        Mode::Subway => &[rail::SUBWAY, rail::METRO],
        Mode::Ferry => &[water::FERRY],
    }
}

/// access tag values granting a mode the use of a way.
pub fn is_access_positive(value: &str) -> bool {
    matches!(value, "yes" | "designated" | "permissive" | "official")
}

/// access tag values denying a mode the use of a way.
pub fn is_access_negative(value: &str) -> bool {
    matches!(value, "no" | "private" | "use_sidepath" | "military")
}
