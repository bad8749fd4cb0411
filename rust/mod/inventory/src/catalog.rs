use std::sync::Arc;

use cabos_core::{ServiceError, optional_text, required_text};
use tracing::info;

use crate::model::{CableType, CreateCableTypeRequest, CreateProjectRequest, Project, UnitOfMeasure};
use crate::store::InventoryStore;

/// Longest accepted cable type prefix.
pub const MAX_PREFIX_LEN: usize = 4;

/// Cable type and project registries.
///
/// Append-only: records are registered and listed, never edited.
pub struct Catalog {
    store: Arc<InventoryStore>,
}

impl Catalog {
    pub fn new(store: Arc<InventoryStore>) -> Self {
        Self { store }
    }

    /// Register a cable type. The prefix is trimmed and uppercased before
    /// validation, so `" c6 "` is stored as `C6`.
    pub fn register_cable_type(&self, req: CreateCableTypeRequest) -> Result<CableType, ServiceError> {
        let nome = required_text(&req.nome, "nome")?;
        let prefixo = normalize_prefix(&req.prefixo)?;
        let descricao = optional_text(req.descricao.as_deref()).unwrap_or_default();
        let unidade = match optional_text(req.unidade_medida.as_deref()) {
            None => UnitOfMeasure::default(),
            Some(u) => UnitOfMeasure::from_str(&u.to_lowercase()).ok_or_else(|| {
                ServiceError::Validation(format!(
                    "unidade_medida inválida: '{u}' (use metros ou unidades)"
                ))
            })?,
        };

        if self.store.find_cable_type_by_prefix(&prefixo)?.is_some() {
            return Err(ServiceError::Conflict(format!("prefixo '{prefixo}' já cadastrado")));
        }

        let tipo = self.store.insert_cable_type(&nome, &prefixo, &descricao, unidade)?;
        info!(id = tipo.id, prefixo = %tipo.prefixo, "cable type registered");
        Ok(tipo)
    }

    pub fn cable_types(&self) -> Result<Vec<CableType>, ServiceError> {
        self.store.list_cable_types()
    }

    /// Register a project. Only the name is required; status defaults to `ativo`.
    pub fn register_project(&self, req: CreateProjectRequest) -> Result<Project, ServiceError> {
        let nome = required_text(&req.nome, "nome")?;
        let descricao = optional_text(req.descricao.as_deref()).unwrap_or_default();
        let status = optional_text(req.status.as_deref()).unwrap_or_else(|| "ativo".to_string());

        let projeto = self.store.insert_project(&nome, &descricao, &status)?;
        info!(id = projeto.id, nome = %projeto.nome, "project registered");
        Ok(projeto)
    }

    pub fn projects(&self) -> Result<Vec<Project>, ServiceError> {
        self.store.list_projects()
    }
}

/// Trim and uppercase a prefix, then check it is 1–4 ASCII alphanumerics.
pub fn normalize_prefix(raw: &str) -> Result<String, ServiceError> {
    let prefixo = raw.trim().to_uppercase();
    let len = prefixo.chars().count();
    if len == 0 || len > MAX_PREFIX_LEN {
        return Err(ServiceError::Validation(format!(
            "prefixo deve ter entre 1 e {MAX_PREFIX_LEN} caracteres"
        )));
    }
    if !prefixo.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ServiceError::Validation(format!(
            "prefixo '{prefixo}' deve conter apenas letras e números"
        )));
    }
    Ok(prefixo)
}
