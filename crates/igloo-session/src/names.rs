//! Nickname rules checked at login.

/// Mascot names nobody may log in as.
pub const MASCOT_NAMES: &[&str] = &[
    "rockhopper", "cadence", "gary", "gary the gadget guy", "jet pack guy",
    "aunt arctic", "sensei", "ninja", "penguin band", "franky", "g billy",
    "petey k", "stompin bob", "dj cadence", "dot", "the director", "rookie",
    "herbert", "klutzy", "protobot", "tusk", "skip", "phineas", "rory",
    "captain rockhopper", "yarr", "coins for change", "puffle handler",
];

/// Staff names nobody may log in as.
pub const STAFF_NAMES: &[&str] = &[
    "polo field", "screenhog", "happy77", "billybob", "rsnail", "gizmo",
    "spike hike", "daffodaily5", "saffi", "rookie moderator", "businesmoose",
    "club penguin team", "cp team", "moderator", "admin", "administrator",
];

/// Length limit, reserved names and blocked terms for nicknames.
#[derive(Debug, Clone)]
pub struct NameRules {
    /// Longest accepted display name, in characters.
    pub max_len: usize,
    /// Lowercase names that are refused outright.
    pub reserved: Vec<String>,
    /// Lowercase substrings that get a name auto-banned.
    pub blocked_terms: Vec<String>,
}

impl Default for NameRules {
    fn default() -> Self {
        Self {
            max_len: 12,
            reserved: MASCOT_NAMES
                .iter()
                .chain(STAFF_NAMES)
                .map(|s| s.to_string())
                .collect(),
            blocked_terms: Vec::new(),
        }
    }
}

impl NameRules {
    pub fn is_too_long(&self, name: &str) -> bool {
        name.chars().count() > self.max_len
    }

    /// Case-insensitive, surrounding whitespace ignored.
    pub fn is_reserved(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.reserved.iter().any(|r| *r == name)
    }

    /// Matches blocked terms with spaces, underscores and case folded
    /// away, so `Bad_Word` and `b a d word` hit the same entry.
    pub fn is_inappropriate(&self, name: &str) -> bool {
        let folded: String = name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        self.blocked_terms
            .iter()
            .filter(|term| !term.is_empty())
            .any(|term| folded.contains(term.as_str()))
    }
}
