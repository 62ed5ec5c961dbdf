use log::{debug, warn};
use thiserror::Error;

use super::store::{Entries, SettingsStore, StoreError};
use super::{keys, NumericField, Settings, RAM, WINDOW_HEIGHT, WINDOW_WIDTH};
use crate::host::HostCapabilities;
use crate::language::{Language, LanguageList, DEFAULT_LANGUAGE};
use crate::mirror::{Mirror, MirrorSet, AUTO_MIRROR_NAME};
use crate::util::{format_flag, parse_flag};

/// Reference data and host bounds settings are resolved against.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub host: &'a dyn HostCapabilities,
    pub languages: &'a LanguageList,
    pub mirrors: &'a MirrorSet,
}

/// Why a stored or requested value was not taken as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("cannot set {key} to {value}: the maximum on this host is {max}")]
    OutOfBounds {
        key: &'static str,
        value: u64,
        max: u32,
    },
    #[error("{key} must be a whole number, got {value:?}")]
    Unparseable { key: &'static str, value: String },
    #[error("{key} must be true or false, got {value:?}")]
    NotAFlag { key: String, value: String },
    #[error("no language exists with name {0}")]
    UnknownLanguage(String),
    #[error("no server exists with name {0}")]
    UnknownServer(String),
    #[error("unknown setting {0}")]
    UnknownKey(String),
    #[error("{0} is managed by the launcher")]
    ReadOnly(&'static str),
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub settings: Settings,
    /// Stored values that were replaced by a fallback.
    pub corrections: Vec<Rejection>,
}

/// Resolves settings from `store`. Never fails: every rejected or missing
/// value has a fallback, and an unreadable store reads as empty.
pub fn load(store: &dyn SettingsStore, ctx: &ResolveContext<'_>) -> Loaded {
    let entries = store.read().unwrap_or_else(|err| {
        warn!("{err}; using default settings");
        Entries::new()
    });
    let get = |key: &str| entries.get(key).map(String::as_str);

    let mut corrections = Vec::new();
    let mut correct = |rejection: Rejection| {
        warn!("{rejection}");
        corrections.push(rejection);
    };

    let language = match get(keys::LANGUAGE) {
        None => ctx
            .languages
            .lookup(DEFAULT_LANGUAGE)
            .unwrap_or_else(|| ctx.languages.first())
            .clone(),
        Some(name) => resolve_language(ctx, name).unwrap_or_else(|rejection| {
            correct(rejection);
            ctx.languages.first().clone()
        }),
    };

    // Unlike the language, an unknown server falls back to the best
    // connected mirror rather than the first entry.
    let server = resolve_server(ctx, get(keys::SERVER).unwrap_or(AUTO_MIRROR_NAME))
        .unwrap_or_else(|rejection| {
            correct(rejection);
            server_fallback(ctx.mirrors).clone()
        });

    let mut numeric = |field: NumericField| {
        let raw = get(field.key);
        let value = match raw {
            Some(raw) => check_numeric(field, raw, ctx.host),
            None => check_numeric(field, &field.default.to_string(), ctx.host),
        };
        value.unwrap_or_else(|rejection| {
            correct(rejection);
            field.revert
        })
    };
    let ram = numeric(RAM);
    let window_width = numeric(WINDOW_WIDTH);
    let window_height = numeric(WINDOW_HEIGHT);

    let flag = |key: &str| get(key).map(parse_flag).unwrap_or(true);
    let settings = Settings {
        first_time_run: flag(keys::FIRST_TIME_RUN),
        language,
        server,
        ram,
        window_width,
        window_height,
        java_parameters: get(keys::JAVA_PARAMETERS).unwrap_or_default().to_string(),
        enable_console: flag(keys::ENABLE_CONSOLE),
        enable_leaderboards: flag(keys::ENABLE_LEADERBOARDS),
        enable_logs: flag(keys::ENABLE_LOGS),
    };
    debug!("resolved settings: {settings:?}");

    Loaded {
        settings,
        corrections,
    }
}

/// Writes `settings` over whatever `store` holds, keeping keys this crate
/// does not know. Always marks the launcher as no longer on its first run.
pub fn save(settings: &Settings, store: &dyn SettingsStore) -> Result<(), StoreError> {
    let mut entries = store.read().unwrap_or_else(|err| {
        warn!("{err}; rewriting settings from scratch");
        Entries::new()
    });
    entries.extend(to_entries(settings));
    store.write(&entries)
}

/// Returns `settings` with one key changed. Invalid values are rejected
/// rather than replaced by a fallback.
pub fn update(
    settings: &Settings,
    key: &str,
    value: &str,
    ctx: &ResolveContext<'_>,
) -> Result<Settings, Rejection> {
    let mut next = settings.clone();
    let key = key.trim().to_ascii_lowercase();
    match key.as_str() {
        keys::LANGUAGE => next.language = resolve_language(ctx, value)?,
        keys::SERVER => next.server = resolve_server(ctx, value)?,
        keys::RAM => next.ram = check_numeric(RAM, value, ctx.host)?,
        keys::WINDOW_WIDTH => next.window_width = check_numeric(WINDOW_WIDTH, value, ctx.host)?,
        keys::WINDOW_HEIGHT => next.window_height = check_numeric(WINDOW_HEIGHT, value, ctx.host)?,
        keys::JAVA_PARAMETERS => next.java_parameters = value.trim().to_string(),
        keys::ENABLE_CONSOLE => next.enable_console = strict_flag(&key, value)?,
        keys::ENABLE_LEADERBOARDS => next.enable_leaderboards = strict_flag(&key, value)?,
        keys::ENABLE_LOGS => next.enable_logs = strict_flag(&key, value)?,
        keys::FIRST_TIME_RUN => return Err(Rejection::ReadOnly(keys::FIRST_TIME_RUN)),
        _ => return Err(Rejection::UnknownKey(key.clone())),
    }
    Ok(next)
}

fn to_entries(settings: &Settings) -> Entries {
    let pairs = [
        (keys::FIRST_TIME_RUN, format_flag(false).to_string()),
        (keys::LANGUAGE, settings.language.name.clone()),
        (keys::SERVER, settings.server.name.clone()),
        (keys::RAM, settings.ram.to_string()),
        (keys::WINDOW_WIDTH, settings.window_width.to_string()),
        (keys::WINDOW_HEIGHT, settings.window_height.to_string()),
        (keys::JAVA_PARAMETERS, settings.java_parameters.clone()),
        (keys::ENABLE_CONSOLE, format_flag(settings.enable_console).to_string()),
        (
            keys::ENABLE_LEADERBOARDS,
            format_flag(settings.enable_leaderboards).to_string(),
        ),
        (keys::ENABLE_LOGS, format_flag(settings.enable_logs).to_string()),
    ];
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn resolve_language(ctx: &ResolveContext<'_>, name: &str) -> Result<Language, Rejection> {
    ctx.languages
        .lookup(name.trim())
        .cloned()
        .ok_or_else(|| Rejection::UnknownLanguage(name.trim().to_string()))
}

fn resolve_server(ctx: &ResolveContext<'_>, name: &str) -> Result<Mirror, Rejection> {
    ctx.mirrors
        .lookup(name.trim())
        .cloned()
        .ok_or_else(|| Rejection::UnknownServer(name.trim().to_string()))
}

fn server_fallback(mirrors: &MirrorSet) -> &Mirror {
    mirrors.best().unwrap_or_else(|| mirrors.auto())
}

fn check_numeric(
    field: NumericField,
    raw: &str,
    host: &dyn HostCapabilities,
) -> Result<u32, Rejection> {
    let value: u64 = raw.trim().parse().map_err(|_| Rejection::Unparseable {
        key: field.key,
        value: raw.to_string(),
    })?;
    let max = field.max(host);
    if value > u64::from(max) {
        return Err(Rejection::OutOfBounds {
            key: field.key,
            value,
            max,
        });
    }
    // bounded by a u32 above
    Ok(value as u32)
}

fn strict_flag(key: &str, value: &str) -> Result<bool, Rejection> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Rejection::NotAFlag {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FixedHost, WindowBounds};
    use crate::mirror::{Endpoints, ProbeError, ProbeOutcome, ProbeReport};
    use crate::settings::{FileStore, MemoryStore};
    use std::time::Duration;

    struct Fixture {
        host: FixedHost,
        languages: LanguageList,
        mirrors: MirrorSet,
    }

    impl Fixture {
        /// US West ends up as the best connected mirror.
        fn online() -> Self {
            let mut mirrors = MirrorSet::builtin(Endpoints::default());
            let reports = [
                (1, ProbeOutcome::Reachable(Duration::from_millis(120))),
                (2, ProbeOutcome::Unreachable(ProbeError::Timeout)),
                (3, ProbeOutcome::Reachable(Duration::from_millis(40))),
            ]
            .into_iter()
            .map(|(index, outcome)| ProbeReport {
                index,
                name: mirrors.mirrors()[index].name.clone(),
                outcome,
            })
            .collect::<Vec<_>>();
            mirrors.apply_probe(&reports).expect("online");
            Self::with_mirrors(mirrors)
        }

        fn offline() -> Self {
            let mut mirrors = MirrorSet::builtin(Endpoints::default());
            let reports = (1..4)
                .map(|index| ProbeReport {
                    index,
                    name: mirrors.mirrors()[index].name.clone(),
                    outcome: ProbeOutcome::Unreachable(ProbeError::Timeout),
                })
                .collect::<Vec<_>>();
            assert!(mirrors.apply_probe(&reports).is_err());
            Self::with_mirrors(mirrors)
        }

        fn with_mirrors(mirrors: MirrorSet) -> Self {
            Self {
                host: FixedHost {
                    ram_mb: 4096,
                    window: WindowBounds {
                        width: 1920,
                        height: 1080,
                    },
                },
                languages: LanguageList::new(vec![
                    Language::named("English"),
                    Language::named("Deutsch"),
                ])
                .expect("languages"),
                mirrors,
            }
        }

        fn ctx(&self) -> ResolveContext<'_> {
            ResolveContext {
                host: &self.host,
                languages: &self.languages,
                mirrors: &self.mirrors,
            }
        }
    }

    struct BrokenStore;

    impl SettingsStore for BrokenStore {
        fn read(&self) -> Result<Entries, StoreError> {
            Err(StoreError::Read {
                path: "launcher.conf".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }

        fn write(&self, _entries: &Entries) -> Result<(), StoreError> {
            Err(StoreError::Write {
                path: "launcher.conf".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    #[test]
    fn missing_keys_use_defaults_silently() {
        let fixture = Fixture::online();
        let loaded = load(&MemoryStore::default(), &fixture.ctx());
        let s = loaded.settings;
        assert!(loaded.corrections.is_empty());
        assert!(s.first_time_run);
        assert_eq!(s.language.name, "English");
        assert!(s.server.is_auto());
        assert_eq!((s.ram, s.window_width, s.window_height), (512, 854, 854));
        assert_eq!(s.java_parameters, "");
        assert!(s.enable_console && s.enable_leaderboards && s.enable_logs);
    }

    #[test]
    fn out_of_bound_values_revert_to_defaults_not_bounds() {
        let fixture = Fixture::online();
        let store = MemoryStore::with([
            ("ram", "8192"),
            ("windowwidth", "5000"),
            ("windowheight", "2000"),
        ]);
        let loaded = load(&store, &fixture.ctx());
        assert_eq!(loaded.settings.ram, 512);
        assert_eq!(loaded.settings.window_width, 854);
        assert_eq!(loaded.settings.window_height, 480);
        assert_eq!(loaded.corrections.len(), 3);
        assert_eq!(
            loaded.corrections[0],
            Rejection::OutOfBounds {
                key: "ram",
                value: 8192,
                max: 4096
            }
        );
    }

    #[test]
    fn values_at_the_bound_are_accepted() {
        let fixture = Fixture::online();
        let store = MemoryStore::with([("ram", "4096"), ("windowheight", "1080")]);
        let loaded = load(&store, &fixture.ctx());
        assert_eq!(loaded.settings.ram, 4096);
        assert_eq!(loaded.settings.window_height, 1080);
        assert!(loaded.corrections.is_empty());
    }

    #[test]
    fn unparseable_numbers_revert() {
        let fixture = Fixture::online();
        let store = MemoryStore::with([("ram", "lots"), ("windowwidth", "-5")]);
        let loaded = load(&store, &fixture.ctx());
        assert_eq!(loaded.settings.ram, 512);
        assert_eq!(loaded.settings.window_width, 854);
        assert!(matches!(
            loaded.corrections[0],
            Rejection::Unparseable { key: "ram", .. }
        ));
    }

    #[test]
    fn missing_height_over_a_small_screen_reverts_to_480() {
        let mut fixture = Fixture::online();
        fixture.host.window.height = 800;
        let loaded = load(&MemoryStore::default(), &fixture.ctx());
        assert_eq!(loaded.settings.window_height, 480);
    }

    #[test]
    fn unknown_language_falls_back_to_first_entry() {
        let fixture = Fixture::online();
        let store = MemoryStore::with([("language", "Klingon")]);
        let loaded = load(&store, &fixture.ctx());
        assert_eq!(loaded.settings.language.name, "English");
        assert_eq!(
            loaded.corrections,
            vec![Rejection::UnknownLanguage("Klingon".into())]
        );
    }

    #[test]
    fn names_resolve_ignoring_case() {
        let fixture = Fixture::online();
        let store = MemoryStore::with([("language", "deutsch"), ("server", "EUROPE")]);
        let loaded = load(&store, &fixture.ctx());
        assert_eq!(loaded.settings.language.name, "Deutsch");
        assert_eq!(loaded.settings.server.name, "Europe");
    }

    #[test]
    fn unknown_server_falls_back_to_best_connected_mirror() {
        let fixture = Fixture::online();
        let store = MemoryStore::with([("server", "Atlantis")]);
        let loaded = load(&store, &fixture.ctx());
        assert_eq!(loaded.settings.server.name, "US West");
        assert_ne!(&loaded.settings.server, &fixture.mirrors.mirrors()[0]);
    }

    #[test]
    fn unknown_server_while_offline_falls_back_to_auto() {
        let fixture = Fixture::offline();
        let store = MemoryStore::with([("server", "Atlantis")]);
        let loaded = load(&store, &fixture.ctx());
        assert!(loaded.settings.server.is_auto());
    }

    #[test]
    fn flags_read_leniently() {
        let fixture = Fixture::online();
        let store = MemoryStore::with([
            ("enableconsole", "FALSE"),
            ("enableleaderboards", "nope"),
            ("enablelogs", "True"),
            ("firsttimerun", "false"),
        ]);
        let s = load(&store, &fixture.ctx()).settings;
        assert!(!s.enable_console);
        assert!(!s.enable_leaderboards);
        assert!(s.enable_logs);
        assert!(!s.first_time_run);
    }

    #[test]
    fn unreadable_store_loads_defaults() {
        let fixture = Fixture::online();
        let loaded = load(&BrokenStore, &fixture.ctx());
        assert_eq!(loaded.settings.ram, 512);
        assert!(save(&loaded.settings, &BrokenStore).is_err());
    }

    #[test]
    fn save_then_load_round_trips_in_bound_settings() {
        let fixture = Fixture::online();
        let ctx = fixture.ctx();
        let original = Settings {
            first_time_run: false,
            language: fixture.languages.lookup("Deutsch").cloned().expect("lang"),
            server: fixture.mirrors.lookup("Europe").cloned().expect("mirror"),
            ram: 2048,
            window_width: 1280,
            window_height: 720,
            java_parameters: "-XX:+UseG1GC -Dfile.encoding=UTF-8".into(),
            enable_console: false,
            enable_leaderboards: true,
            enable_logs: false,
        };
        let store = MemoryStore::default();
        save(&original, &store).expect("save");
        let loaded = load(&store, &ctx);
        assert!(loaded.corrections.is_empty());
        assert_eq!(loaded.settings, original);
    }

    #[test]
    fn save_then_load_round_trips_through_a_settings_file() {
        let fixture = Fixture::online();
        let ctx = fixture.ctx();
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("launcher.conf"));
        let original = Settings {
            first_time_run: false,
            language: fixture.languages.lookup("Deutsch").cloned().expect("lang"),
            server: fixture.mirrors.lookup("US East").cloned().expect("mirror"),
            ram: 1024,
            window_width: 1600,
            window_height: 900,
            java_parameters: "  -Xmx1G -Dpath=C:\\games".into(),
            enable_console: true,
            enable_leaderboards: false,
            enable_logs: true,
        };
        save(&original, &store).expect("save");
        let loaded = load(&store, &ctx);
        assert!(loaded.corrections.is_empty());
        assert_eq!(loaded.settings, original);
    }

    #[test]
    fn non_utf8_settings_file_keeps_its_values_across_save() {
        let fixture = Fixture::online();
        let ctx = fixture.ctx();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("launcher.conf");
        std::fs::write(&path, b"ram=2048\ntheme=dark\njavaparameters=-Duser=Jos\xe9\n")
            .expect("seed");
        let store = FileStore::new(path);

        let loaded = load(&store, &ctx);
        assert_eq!(loaded.settings.ram, 2048);
        assert_eq!(loaded.settings.java_parameters, "-Duser=Jos\u{e9}");

        save(&loaded.settings, &store).expect("save");
        let entries = store.read().expect("read");
        assert_eq!(entries.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(entries.get("ram").map(String::as_str), Some("2048"));
        assert_eq!(load(&store, &ctx).settings, loaded.settings);
    }

    #[test]
    fn save_stamps_first_run_and_keeps_unknown_keys() {
        let fixture = Fixture::online();
        let store = MemoryStore::with([("theme", "dark"), ("firsttimerun", "true")]);
        let loaded = load(&store, &fixture.ctx());
        assert!(loaded.settings.first_time_run);

        save(&loaded.settings, &store).expect("save");
        let entries = store.snapshot();
        assert_eq!(entries.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(entries.get("firsttimerun").map(String::as_str), Some("false"));
        for key in keys::ALL {
            assert!(entries.contains_key(key), "missing {key}");
        }
        assert!(!load(&store, &fixture.ctx()).settings.first_time_run);
    }

    #[test]
    fn update_changes_one_field() {
        let fixture = Fixture::online();
        let ctx = fixture.ctx();
        let base = load(&MemoryStore::default(), &ctx).settings;

        let next = update(&base, "RAM", "3072", &ctx).expect("ram");
        assert_eq!(next.ram, 3072);
        assert_eq!(next.window_width, base.window_width);

        let next = update(&next, "server", "us east", &ctx).expect("server");
        assert_eq!(next.server.name, "US East");

        let next = update(&next, "enablelogs", "false", &ctx).expect("flag");
        assert!(!next.enable_logs);
    }

    #[test]
    fn update_rejects_instead_of_falling_back() {
        let fixture = Fixture::online();
        let ctx = fixture.ctx();
        let base = load(&MemoryStore::default(), &ctx).settings;

        assert!(matches!(
            update(&base, "ram", "9000", &ctx),
            Err(Rejection::OutOfBounds { max: 4096, .. })
        ));
        assert_eq!(
            update(&base, "language", "Klingon", &ctx),
            Err(Rejection::UnknownLanguage("Klingon".into()))
        );
        assert_eq!(
            update(&base, "server", "Atlantis", &ctx),
            Err(Rejection::UnknownServer("Atlantis".into()))
        );
        assert!(matches!(
            update(&base, "enableconsole", "maybe", &ctx),
            Err(Rejection::NotAFlag { .. })
        ));
        assert_eq!(
            update(&base, "firsttimerun", "true", &ctx),
            Err(Rejection::ReadOnly("firsttimerun"))
        );
        assert_eq!(
            update(&base, "colour", "blue", &ctx),
            Err(Rejection::UnknownKey("colour".into()))
        );
    }
}
