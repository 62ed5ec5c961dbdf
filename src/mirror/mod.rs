mod probe;
mod select;

pub use probe::{
    build_client, probe_all, ProbeError, ProbeMode, ProbeOptions, ProbeOutcome, ProbeReport,
};
pub use select::{select_best, Offline, UNREACHABLE_LATENCY};

use log::{error, info};
use serde::Serialize;
use thiserror::Error;
use url::Url;

pub const AUTO_MIRROR_NAME: &str = "Auto";
pub const DEFAULT_SCHEME: &str = "http";
pub const DEFAULT_LIVENESS_PATH: &str = "launcher/version.txt";

/// Mirrors every session starts from unless the user supplies their own list.
const BUILTIN_MIRRORS: [(&str, &str); 3] = [
    ("Europe", "eu.atlcdn.net"),
    ("US East", "useast.atlcdn.net"),
    ("US West", "uswest.atlcdn.net"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mirror {
    pub name: String,
    /// Empty for the synthetic auto entry.
    pub hostname: String,
    pub enabled: bool,
}

impl Mirror {
    pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            enabled: true,
        }
    }

    pub fn auto() -> Self {
        Self::new(AUTO_MIRROR_NAME, "")
    }

    pub fn is_auto(&self) -> bool {
        self.hostname.is_empty()
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("the {0} mirror has no address of its own")]
    Auto(String),
    #[error("invalid address for mirror {name}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: url::ParseError,
    },
}

/// How mirror hostnames turn into URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub scheme: String,
    pub liveness_path: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            liveness_path: DEFAULT_LIVENESS_PATH.to_string(),
        }
    }
}

impl Endpoints {
    pub fn url_for(&self, mirror: &Mirror, path: &str) -> Result<Url, EndpointError> {
        if mirror.is_auto() {
            return Err(EndpointError::Auto(mirror.name.clone()));
        }
        let invalid = |source| EndpointError::Invalid {
            name: mirror.name.clone(),
            source,
        };
        let base =
            Url::parse(&format!("{}://{}/", self.scheme, mirror.hostname)).map_err(invalid)?;
        base.join(path.trim_start_matches('/')).map_err(invalid)
    }

    pub fn liveness_url(&self, mirror: &Mirror) -> Result<Url, EndpointError> {
        self.url_for(mirror, &self.liveness_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Unprobed,
    Online { best: usize },
    Offline,
}

/// The ordered mirror list of a session. The auto entry is always first.
#[derive(Debug, Clone)]
pub struct MirrorSet {
    mirrors: Vec<Mirror>,
    endpoints: Endpoints,
    connectivity: Connectivity,
}

impl MirrorSet {
    pub fn new(mirrors: Vec<Mirror>, endpoints: Endpoints) -> Self {
        let mut mirrors: Vec<Mirror> = mirrors.into_iter().filter(|m| !m.is_auto()).collect();
        mirrors.insert(0, Mirror::auto());
        Self {
            mirrors,
            endpoints,
            connectivity: Connectivity::Unprobed,
        }
    }

    pub fn builtin(endpoints: Endpoints) -> Self {
        let mirrors = BUILTIN_MIRRORS
            .iter()
            .map(|(name, host)| Mirror::new(*name, *host))
            .collect();
        Self::new(mirrors, endpoints)
    }

    pub fn mirrors(&self) -> &[Mirror] {
        &self.mirrors
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn auto(&self) -> &Mirror {
        &self.mirrors[0]
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn best(&self) -> Option<&Mirror> {
        match self.connectivity {
            Connectivity::Online { best } => self.mirrors.get(best),
            Connectivity::Unprobed | Connectivity::Offline => None,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.connectivity == Connectivity::Offline
    }

    pub fn lookup(&self, name: &str) -> Option<&Mirror> {
        self.mirrors
            .iter()
            .find(|mirror| mirror.name.eq_ignore_ascii_case(name))
    }

    /// Records a probe round: failed mirrors are disabled and the fastest
    /// reachable one becomes the auto-selected best.
    pub fn apply_probe(&mut self, reports: &[ProbeReport]) -> Result<Mirror, Offline> {
        for report in reports {
            if !report.outcome.is_reachable() {
                if let Some(mirror) = self.mirrors.get_mut(report.index) {
                    mirror.disable();
                }
            }
        }

        let (indices, candidates): (Vec<usize>, Vec<(&Mirror, &ProbeOutcome)>) = reports
            .iter()
            .filter_map(|report| {
                let mirror = self.mirrors.get(report.index)?;
                Some((report.index, (mirror, &report.outcome)))
            })
            .unzip();

        match select::select_position(&candidates) {
            Some(position) => {
                let index = indices[position];
                self.connectivity = Connectivity::Online { best: index };
                let best = self.mirrors[index].clone();
                info!("the best connected mirror is {}", best.name);
                Ok(best)
            }
            None => {
                self.connectivity = Connectivity::Offline;
                error!(
                    "could not connect to any mirror; offline mode is enabled, \
                     try connecting again later to install packs"
                );
                Err(Offline)
            }
        }
    }

    /// URL of `filename` on `server`. The auto entry resolves through the best
    /// connected mirror, so it has no URL while offline or before probing.
    pub fn file_url(&self, server: &Mirror, filename: &str) -> Option<Url> {
        let target = if server.is_auto() { self.best()? } else { server };
        match self.endpoints.url_for(target, filename) {
            Ok(url) => Some(url),
            Err(err) => {
                error!("{err}");
                None
            }
        }
    }
}
