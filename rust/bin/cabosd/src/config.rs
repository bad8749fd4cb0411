//! Server-side configuration, loaded from a TOML file.
//!
//! ```toml
//! [storage]
//! data_dir = "/var/lib/cabos"
//! sqlite_path = "/fast/cabos.sqlite"   # optional
//!
//! [company]
//! nome_empresa = "ACME Redes"
//! logotipo_visivel = false
//! ```

use std::path::{Path, PathBuf};

use cabos_core::ServiceConfig;
use serde::{Deserialize, Serialize};

/// Directory holding the named context files.
const CONTEXT_DIR: &str = "/etc/cabos";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageSection,

    #[serde(default)]
    pub company: CompanySection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    pub data_dir: String,

    /// Database file outside `data_dir`; defaults to `{data_dir}/cabos.sqlite`.
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

/// Company branding shown by the dashboard header and the printed labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanySection {
    pub nome_empresa: String,
    pub logotipo_path: Option<String>,
    pub logotipo_posicao: String,
    pub logotipo_visivel: bool,
}

impl Default for CompanySection {
    fn default() -> Self {
        Self {
            nome_empresa: "Sistema de Controle de Cabos".to_string(),
            logotipo_path: None,
            logotipo_posicao: "superior_esquerdo".to_string(),
            logotipo_visivel: true,
        }
    }
}

impl StorageSection {
    /// On-disk layout described by this section.
    pub fn layout(&self) -> ServiceConfig {
        ServiceConfig {
            sqlite_path: self.sqlite_path.as_ref().map(PathBuf::from),
            ..ServiceConfig::new(&self.data_dir)
        }
    }
}

impl ServerConfig {
    /// Resolve a context name or explicit path to a config file path.
    ///
    /// Anything containing `/` or `.` is taken as a path; a bare name maps to
    /// `/etc/cabos/<name>.toml`.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(CONTEXT_DIR).join(format!("{name_or_path}.toml"))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: ServerConfig = toml::from_str(content)?;
        config.verify()?;
        Ok(config)
    }

    /// Reject configs with empty storage paths or company name.
    pub fn verify(&self) -> anyhow::Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            anyhow::bail!("Storage data_dir is empty in configuration.");
        }
        if matches!(&self.storage.sqlite_path, Some(p) if p.trim().is_empty()) {
            anyhow::bail!("Storage sqlite_path is empty in configuration.");
        }
        if self.company.nome_empresa.trim().is_empty() {
            anyhow::bail!("company.nome_empresa is empty in configuration.");
        }
        Ok(())
    }
}
