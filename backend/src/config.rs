use std::str::FromStr;
use shared::validation::ValidationRules;
use tracing::warn;

pub const DEFAULT_CREATE_LIMIT: u32 = 5;
pub const DEFAULT_CREATE_WINDOW_MINUTES: i64 = 60;

/// Policy knobs of the ledger itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Remove contestants and ballots together with their voting.
    pub cascade_deletes: bool,
    /// Remove contestants that an edit form no longer lists.
    pub prune_dropped_contestants: bool,
    /// Keep an audit ballot for every cast vote.
    pub record_ballots: bool,
    pub rules: ValidationRules,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            cascade_deletes: true,
            prune_dropped_contestants: false,
            record_ballots: true,
            rules: ValidationRules::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub ledger: LedgerConfig,
    pub store_backend: StoreBackend,
    pub create_limit: u32,
    pub create_window_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            store_backend: StoreBackend::default(),
            create_limit: DEFAULT_CREATE_LIMIT,
            create_window_minutes: DEFAULT_CREATE_WINDOW_MINUTES,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    match lookup(key) {
        Some(raw) => parse(&raw).unwrap_or_else(|| {
            warn!("Ignoring invalid value {:?} for {} - using default", raw, key);
            default
        }),
        None => default,
    }
}

impl ServerConfig {
    /// Reads settings by key, e.g. from the Shuttle secret store. Missing keys fall
    /// back to defaults; unparsable ones are logged and fall back too.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let ledger = LedgerConfig {
            cascade_deletes: read(&lookup, "CASCADE_DELETES", defaults.ledger.cascade_deletes, parse_bool),
            prune_dropped_contestants: read(
                &lookup,
                "PRUNE_DROPPED_CONTESTANTS",
                defaults.ledger.prune_dropped_contestants,
                parse_bool,
            ),
            record_ballots: read(&lookup, "RECORD_BALLOTS", defaults.ledger.record_ballots, parse_bool),
            rules: ValidationRules {
                require_face_image: read(
                    &lookup,
                    "REQUIRE_FACE_IMAGE",
                    defaults.ledger.rules.require_face_image,
                    parse_bool,
                ),
            },
        };

        Self {
            ledger,
            store_backend: read(&lookup, "STORE_BACKEND", defaults.store_backend, |v| v.parse().ok()),
            create_limit: read(&lookup, "CREATE_LIMIT", defaults.create_limit, |v| {
                v.trim().parse().ok().filter(|n: &u32| *n > 0)
            }),
            create_window_minutes: read(&lookup, "CREATE_WINDOW_MINUTES", defaults.create_window_minutes, |v| {
                v.trim().parse().ok().filter(|n: &i64| *n > 0)
            }),
        }
    }
}
