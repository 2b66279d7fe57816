//! gridplan.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};
use crate::node::{ComputeNode, Platform, StaticInventory};
use crate::types::ClusterMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub ports: PortsConfig,
    pub preferences: Option<PreferencesConfig>,
    #[serde(default)]
    pub descriptor: DescriptorConfig,
    pub inventory: Option<InventoryConfig>,
    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub name: String,
    #[serde(default = "default_instance_prefix")]
    pub instance_prefix: String,
    #[serde(default = "default_num_instances")]
    pub num_instances: u32,
    #[serde(default)]
    pub mode: ClusterMode,
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    #[serde(default)]
    pub node_label: String,
    pub bundle_url: Option<String>,
    #[serde(default = "default_coordinator_admin_port")]
    pub coordinator_admin_port: u16,
    #[serde(default = "default_coordinator_http_port")]
    pub coordinator_http_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// Stride steps tried per instance before giving up.
    pub max_probe_attempts: u32,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            max_probe_attempts: 64,
        }
    }
}

/// Where user port preferences come from. `text` wins over `file`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesConfig {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorConfig {
    pub canonical_file: String,
    pub legacy_file: String,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            canonical_file: "cluster.props".to_string(),
            legacy_file: "cluster.properties".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Name of the node this run executes on.
    pub current: String,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Address used to reach the node. Defaults to `name`.
    pub host: Option<String>,
    #[serde(default)]
    pub platform: Platform,
    pub install_home: Option<String>,
}

/// Command templates run on nodes. `{url}` and `{home}` are substituted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub posix_install: String,
    pub posix_delete: String,
    pub windows_install: String,
    pub windows_delete: String,
    pub default_home: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            posix_install: "mkdir -p {home} && curl -fsSL -o {home}/bundle.zip {url} \
                            && unzip -oq {home}/bundle.zip -d {home}"
                .to_string(),
            posix_delete: "rm -rf {home}".to_string(),
            windows_install: "powershell -Command \"Invoke-WebRequest -Uri {url} \
                              -OutFile {home}.zip; Expand-Archive -Force {home}.zip {home}\""
                .to_string(),
            windows_delete: "rmdir /s /q {home}".to_string(),
            default_home: "gridplan-server".to_string(),
        }
    }
}

impl CommandsConfig {
    pub fn install_command(&self, platform: Platform, url: &str, home: &str) -> String {
        let template = match platform {
            Platform::Posix => &self.posix_install,
            Platform::Windows => &self.windows_install,
        };
        template.replace("{url}", url).replace("{home}", home)
    }

    pub fn delete_command(&self, platform: Platform, home: &str) -> String {
        let template = match platform {
            Platform::Posix => &self.posix_delete,
            Platform::Windows => &self.windows_delete,
        };
        template.replace("{home}", home)
    }
}

/// User preference text, inline or read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceSource {
    Inline(String),
    File(PathBuf),
}

impl PreferenceSource {
    /// Load the raw text. Any I/O failure is a [`ClusterError::PreferenceLoad`].
    pub fn read(&self) -> ClusterResult<String> {
        match self {
            PreferenceSource::Inline(text) => Ok(text.clone()),
            PreferenceSource::File(path) => {
                std::fs::read_to_string(path).map_err(|source| ClusterError::PreferenceLoad {
                    origin: path.display().to_string(),
                    source,
                })
            }
        }
    }
}

fn default_instance_prefix() -> String {
    "instance".to_string()
}

fn default_num_instances() -> u32 {
    1
}

fn default_base_port() -> u16 {
    9000
}

fn default_coordinator_admin_port() -> u16 {
    4848
}

fn default_coordinator_http_port() -> u16 {
    8080
}

impl PlanConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PlanConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn preference_source(&self) -> Option<PreferenceSource> {
        let prefs = self.preferences.as_ref()?;
        if let Some(text) = &prefs.text {
            return Some(PreferenceSource::Inline(text.clone()));
        }
        prefs.file.clone().map(PreferenceSource::File)
    }

    /// Inventory described by `[inventory]`, or just `current` when absent.
    pub fn static_inventory(&self, fallback_current: &str) -> StaticInventory {
        match &self.inventory {
            Some(inv) => StaticInventory::new(
                &inv.current,
                inv.nodes
                    .iter()
                    .map(|n| ComputeNode::new(&n.name).with_labels(n.labels.iter().cloned()))
                    .collect(),
            ),
            None => StaticInventory::new(fallback_current, Vec::new()),
        }
    }

    pub fn node_config(&self, name: &str) -> Option<&NodeConfig> {
        self.inventory.as_ref()?.nodes.iter().find(|n| n.name == name)
    }

    /// Scaffold a minimal gridplan.toml for a single-node cluster.
    pub fn scaffold(cluster_name: &str, current_node: &str) -> Self {
        PlanConfig {
            cluster: ClusterConfig {
                name: cluster_name.to_string(),
                instance_prefix: default_instance_prefix(),
                num_instances: 2,
                mode: ClusterMode::SingleNode,
                base_port: default_base_port(),
                node_label: "gridplan".to_string(),
                bundle_url: None,
                coordinator_admin_port: default_coordinator_admin_port(),
                coordinator_http_port: default_coordinator_http_port(),
            },
            ports: PortsConfig::default(),
            preferences: None,
            descriptor: DescriptorConfig::default(),
            inventory: Some(InventoryConfig {
                current: current_node.to_string(),
                nodes: vec![NodeConfig {
                    name: current_node.to_string(),
                    labels: vec!["gridplan".to_string()],
                    host: None,
                    platform: Platform::Posix,
                    install_home: None,
                }],
            }),
            commands: CommandsConfig::default(),
        }
    }
}
