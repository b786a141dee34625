//! Exporter options
//!
//! Values come from an optional YAML file overlaid by command-line flags,
//! then get validated into [`Options`].

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::collectors::{AVAILABLE_COLLECTORS, DEFAULT_COLLECTORS};
use crate::error::{Error, Result};
use crate::metrics::WhiteBlackList;
use crate::store::Layout;

/// Namespace value meaning "every namespace"
pub const ALL_NAMESPACES: &str = "";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TELEMETRY_PORT: u16 = 8081;

/// Split a comma separated flag value, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Namespace List
// =============================================================================

/// Namespaces to watch; empty or containing `""` means all namespaces
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct NamespaceList(Vec<String>);

impl NamespaceList {
    pub fn new(namespaces: Vec<String>) -> Self {
        Self(namespaces)
    }

    /// The all-namespaces sentinel
    pub fn all() -> Self {
        Self(vec![ALL_NAMESPACES.to_string()])
    }

    pub fn is_all_namespaces(&self) -> bool {
        self.0.is_empty() || self.0.iter().any(|ns| ns == ALL_NAMESPACES)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for NamespaceList {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for NamespaceList {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let namespaces = split_list(s);
        if namespaces.is_empty() {
            return Ok(Self::all());
        }
        Ok(Self(namespaces))
    }
}

impl fmt::Display for NamespaceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all_namespaces() {
            write!(f, "<all>")
        } else {
            write!(f, "{}", self.0.join(","))
        }
    }
}

// =============================================================================
// Config File
// =============================================================================

/// Raw option values; every field optional so sources can be layered
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    pub collectors: Option<Vec<String>>,
    pub namespaces: Option<Vec<String>>,
    pub metric_whitelist: Option<Vec<String>>,
    pub metric_blacklist: Option<Vec<String>>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub telemetry_host: Option<String>,
    pub telemetry_port: Option<u16>,
    pub apiserver: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub group_by_family: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Values of `overlay` win wherever they are set
    pub fn merge(self, overlay: ConfigFile) -> ConfigFile {
        ConfigFile {
            collectors: overlay.collectors.or(self.collectors),
            namespaces: overlay.namespaces.or(self.namespaces),
            metric_whitelist: overlay.metric_whitelist.or(self.metric_whitelist),
            metric_blacklist: overlay.metric_blacklist.or(self.metric_blacklist),
            host: overlay.host.or(self.host),
            port: overlay.port.or(self.port),
            telemetry_host: overlay.telemetry_host.or(self.telemetry_host),
            telemetry_port: overlay.telemetry_port.or(self.telemetry_port),
            apiserver: overlay.apiserver.or(self.apiserver),
            kubeconfig: overlay.kubeconfig.or(self.kubeconfig),
            group_by_family: overlay.group_by_family.or(self.group_by_family),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

/// Validated exporter options
#[derive(Debug, Clone)]
pub struct Options {
    pub collectors: Vec<String>,
    pub namespaces: NamespaceList,
    pub white_black_list: WhiteBlackList,
    pub host: String,
    pub port: u16,
    pub telemetry_host: String,
    pub telemetry_port: u16,
    pub apiserver: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub layout: Layout,
}

impl TryFrom<ConfigFile> for Options {
    type Error = Error;

    fn try_from(raw: ConfigFile) -> Result<Self> {
        let mut collectors = raw
            .collectors
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_COLLECTORS.iter().map(|c| c.to_string()).collect());
        collectors.sort();
        collectors.dedup();

        if let Some(unknown) = collectors
            .iter()
            .find(|c| !AVAILABLE_COLLECTORS.contains(&c.as_str()))
        {
            return Err(Error::UnknownCollector(unknown.clone()));
        }

        let white: HashSet<String> = raw.metric_whitelist.unwrap_or_default().into_iter().collect();
        let black: HashSet<String> = raw.metric_blacklist.unwrap_or_default().into_iter().collect();
        let white_black_list = WhiteBlackList::new(white, black)?;

        let namespaces = raw
            .namespaces
            .filter(|ns| !ns.is_empty())
            .map(NamespaceList::new)
            .unwrap_or_default();

        let layout = if raw.group_by_family.unwrap_or(false) {
            Layout::ByFamily
        } else {
            Layout::ByObject
        };

        Ok(Options {
            collectors,
            namespaces,
            white_black_list,
            host: raw.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: raw.port.unwrap_or(DEFAULT_PORT),
            telemetry_host: raw.telemetry_host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            telemetry_port: raw.telemetry_port.unwrap_or(DEFAULT_TELEMETRY_PORT),
            apiserver: raw.apiserver,
            kubeconfig: raw.kubeconfig,
            layout,
        })
    }
}
