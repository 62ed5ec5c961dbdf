use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use reqwest::Client;

use crate::cli::{AppConfig, Command};
use crate::host::SystemHost;
use crate::language::LanguageList;
use crate::mirror::{build_client, probe_all, Mirror, MirrorSet, Offline, ProbeReport};
use crate::report::{self, Outcome, ProbeSpinner};
use crate::settings::{self, FileStore, Loaded, ResolveContext};

/// One launcher session: probes the mirrors once, then resolves settings
/// against the result and carries out the requested command.
pub struct Session {
    config: AppConfig,
    client: Client,
    mirrors: MirrorSet,
    languages: LanguageList,
    host: SystemHost,
    store: FileStore,
}

impl Session {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = build_client(config.probe.timeout)?;
        let mirrors = match &config.mirrors {
            Some(mirrors) => MirrorSet::new(mirrors.clone(), config.endpoints.clone()),
            None => MirrorSet::builtin(config.endpoints.clone()),
        };
        let languages = match &config.languages_path {
            Some(path) => LanguageList::from_json_file(path)?,
            None => LanguageList::builtin(),
        };
        let host = SystemHost::detect(config.window);
        let store = FileStore::new(config.settings_path.clone());
        Ok(Self {
            config,
            client,
            mirrors,
            languages,
            host,
            store,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        let (reports, selection) = self.select_best_mirror().await;
        let command = self.config.command.clone();
        let mode = self.config.output;

        let mut outcome = Outcome {
            mirrors: &self.mirrors,
            reports: &reports,
            selection: &selection,
            loaded: None,
            saved_to: None,
            url: None,
        };

        if command == Command::Probe {
            report::render(mode, &outcome);
            return Ok(());
        }

        let ctx = ResolveContext {
            host: &self.host,
            languages: &self.languages,
            mirrors: &self.mirrors,
        };
        let loaded = settings::load(&self.store, &ctx);
        debug!("loaded settings from {:?}", self.store.path());

        match command {
            Command::Probe | Command::Show => {
                outcome.loaded = Some(&loaded);
                report::render(mode, &outcome);
            }
            Command::Set { key, value } => {
                let updated = settings::update(&loaded.settings, &key, &value, &ctx)
                    .with_context(|| format!("cannot set {key}"))?;
                settings::save(&updated, &self.store)?;
                info!("{key} saved");
                let loaded = Loaded {
                    settings: updated,
                    corrections: loaded.corrections,
                };
                outcome.loaded = Some(&loaded);
                outcome.saved_to = Some(self.store.path().display().to_string());
                report::render(mode, &outcome);
            }
            Command::Init => {
                settings::save(&loaded.settings, &self.store)?;
                info!("settings written to {:?}", self.store.path());
                outcome.loaded = Some(&loaded);
                outcome.saved_to = Some(self.store.path().display().to_string());
                report::render(mode, &outcome);
            }
            Command::Url { filename } => {
                let server = &loaded.settings.server;
                if !server.is_auto() && !server.enabled {
                    warn!("server {} failed its probe; the URL may not work", server.name);
                }
                let url = self.mirrors.file_url(server, &filename).ok_or_else(|| {
                    anyhow!("no mirror can serve {filename}: {}", Offline)
                })?;
                outcome.url = Some(&url);
                report::render(mode, &outcome);
            }
        }
        Ok(())
    }

    /// Probes the session's mirrors and records the fastest as the best
    /// connected one. Offline is a mode, not an error.
    async fn select_best_mirror(&mut self) -> (Vec<ProbeReport>, Result<Mirror, Offline>) {
        let count = self.mirrors.mirrors().iter().filter(|m| !m.is_auto()).count();
        let spinner = ProbeSpinner::start(self.config.output, count);
        let reports = probe_all(&self.client, &self.mirrors, self.config.probe).await;
        spinner.finish();
        let selection = self.mirrors.apply_probe(&reports);
        (reports, selection)
    }
}
