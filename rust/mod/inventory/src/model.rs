use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// BoxStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a cable box.
///
/// ```text
/// NOVA → ABERTA → FECHADA → ABERTA → ... → ENCERRADA
///                ↘ (final quantity 0) ↗
/// ```
///
/// `ENCERRADA` (exhausted) is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxStatus {
    Nova,
    Aberta,
    Fechada,
    Encerrada,
}

impl BoxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nova => "nova",
            Self::Aberta => "aberta",
            Self::Fechada => "fechada",
            Self::Encerrada => "encerrada",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "nova" => Some(Self::Nova),
            "aberta" => Some(Self::Aberta),
            "fechada" => Some(Self::Fechada),
            "encerrada" => Some(Self::Encerrada),
            _ => None,
        }
    }

    /// Whether a box in this state may be opened for a project.
    pub fn can_open(&self) -> bool {
        matches!(self, Self::Nova | Self::Fechada)
    }

    /// Whether a box in this state may be closed.
    pub fn can_close(&self) -> bool {
        matches!(self, Self::Aberta)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Encerrada)
    }

    /// State reached by closing a box with the given remaining quantity.
    pub fn after_close(quantidade_final: f64) -> Self {
        if quantidade_final <= 0.0 {
            Self::Encerrada
        } else {
            Self::Fechada
        }
    }
}

impl std::fmt::Display for BoxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UnitOfMeasure
// ---------------------------------------------------------------------------

/// How a cable type is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    #[default]
    Metros,
    Unidades,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metros => "metros",
            Self::Unidades => "unidades",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "metros" => Some(Self::Metros),
            "unidades" => Some(Self::Unidades),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Records: one struct per table, fields named after their columns
// ---------------------------------------------------------------------------

/// A cable product definition. `prefixo` seeds the box codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableType {
    pub id: i64,
    pub nome: String,
    pub prefixo: String,
    pub descricao: String,
    pub unidade_medida: UnitOfMeasure,
    pub created_at: String,
}

/// A work order that consumes cable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub nome: String,
    pub descricao: String,
    pub status: String,
    pub created_at: String,
}

/// A physical reel of cable tracked through its usage lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableBox {
    pub id: i64,
    /// Generated code: cable type prefix + 3-digit sequence, e.g. `C6001`.
    pub numero: String,
    pub tipo_cabo_id: i64,
    pub quantidade_inicial: f64,
    pub quantidade_atual: f64,
    pub status: BoxStatus,
    /// Set while the box is `aberta`.
    pub projeto_id: Option<i64>,
    /// Set while the box is `aberta`.
    pub tecnico_responsavel: Option<String>,
    /// Notes from the most recent close.
    pub observacoes: Option<String>,
    /// Bumped on every transition; guards concurrent updates.
    pub version: i64,
    /// Joined from the cable type for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_nome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefixo: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One closed open/close cycle of a box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub id: i64,
    pub caixa_id: i64,
    pub projeto_id: i64,
    pub tecnico_responsavel: String,
    pub quantidade_usada: f64,
    pub observacoes: Option<String>,
    pub data_uso: String,
}

// ---------------------------------------------------------------------------
// API request / response types
// ---------------------------------------------------------------------------

/// Body for `POST /tipos-cabo`.
#[derive(Debug, Deserialize)]
pub struct CreateCableTypeRequest {
    pub nome: String,
    pub prefixo: String,
    #[serde(default)]
    pub descricao: Option<String>,
    /// Free text on the wire so unknown units fail validation with a message.
    #[serde(default)]
    pub unidade_medida: Option<String>,
}

/// Body for `POST /projetos`.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub nome: String,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body for `POST /caixas`.
#[derive(Debug, Deserialize)]
pub struct CreateBoxRequest {
    #[serde(deserialize_with = "de_id")]
    pub tipo_cabo_id: i64,
    pub quantidade_inicial: f64,
}

/// Body for `POST /caixas/{id}/abrir`.
#[derive(Debug, Deserialize)]
pub struct OpenBoxRequest {
    #[serde(deserialize_with = "de_id")]
    pub projeto_id: i64,
    pub tecnico_responsavel: String,
}

/// Body for `POST /caixas/{id}/fechar`.
#[derive(Debug, Deserialize)]
pub struct CloseBoxRequest {
    #[serde(deserialize_with = "de_id")]
    pub projeto_id: i64,
    pub tecnico_responsavel: String,
    pub quantidade_final: f64,
    #[serde(default)]
    pub observacoes: Option<String>,
}

/// Result of a successful close.
#[derive(Debug, Clone, Serialize)]
pub struct CloseOutcome {
    pub message: String,
    pub quantidade_usada: f64,
    pub status: BoxStatus,
    pub caixa: CableBox,
}

/// Reply for `POST` endpoints that create a record.
#[derive(Debug, Clone, Serialize)]
pub struct Created {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero: Option<String>,
    pub message: String,
}

/// Ids arrive either as numbers or, from `<select>` values, as numeric strings.
fn de_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Int(i64),
        Text(String),
    }

    match IdRepr::deserialize(deserializer)? {
        IdRepr::Int(id) => Ok(id),
        IdRepr::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id: {s:?}"))),
    }
}
