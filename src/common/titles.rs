//! Static title-id lookup for display purposes.

/// Title id the server sends when a player has no title.
pub const NO_TITLE: u32 = 0xFFFF_FFFF;

const TITLES: &[(u32, &str)] = &[
    (71087, "Pioneer"),
    (72950, "Piligrim"),
    (73478, "Seeker"),
    (73566, "Assassin"),
    (75131, "Charming"),
    (76154, "Trasher"),
    (76502, "Sinister"),
    (76813, "Dark Overlord"),
    (76911, "Power broker"),
    (77405, "Champion"),
    (77578, "Corsair"),
    (78971, "Rear admiral"),
    (79547, "Strategist"),
    (79945, "Veteran"),
    (79955, "Cosmonaut"),
    (NO_TITLE, "NONE"),
];

/// Look up a known title name.
pub fn title_name(id: u32) -> Option<&'static str> {
    TITLES
        .iter()
        .find(|(title_id, _)| *title_id == id)
        .map(|(_, name)| *name)
}

/// Display form of a title: its name when known, otherwise the raw id.
pub fn display_title(id: u32) -> String {
    title_name(id).map_or_else(|| id.to_string(), str::to_string)
}
