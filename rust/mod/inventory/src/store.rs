use std::sync::Arc;

use cabos_core::{ServiceError, now_rfc3339};
use cabos_sql::{Row, SQLError, SQLStore, Statement, Value};

use crate::model::{BoxStatus, CableBox, CableType, Project, UnitOfMeasure, Usage};

/// SQL schema for the inventory tables.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tipos_cabo (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    nome            TEXT NOT NULL,
    prefixo         TEXT NOT NULL UNIQUE,
    descricao       TEXT NOT NULL DEFAULT '',
    unidade_medida  TEXT NOT NULL DEFAULT 'metros',
    created_at      TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS projetos (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    nome        TEXT NOT NULL,
    descricao   TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'ativo',
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS caixas (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    numero              TEXT NOT NULL UNIQUE,
    tipo_cabo_id        INTEGER NOT NULL REFERENCES tipos_cabo(id),
    sequencia           INTEGER NOT NULL,
    quantidade_inicial  REAL NOT NULL,
    quantidade_atual    REAL NOT NULL,
    status              TEXT NOT NULL DEFAULT 'nova',
    projeto_id          INTEGER REFERENCES projetos(id),
    tecnico_responsavel TEXT,
    observacoes         TEXT,
    version             INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_caixa_tipo ON caixas(tipo_cabo_id);
CREATE INDEX IF NOT EXISTS idx_caixa_status ON caixas(status);
CREATE TABLE IF NOT EXISTS usos (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    caixa_id            INTEGER NOT NULL REFERENCES caixas(id),
    projeto_id          INTEGER NOT NULL REFERENCES projetos(id),
    quantidade_usada    REAL NOT NULL,
    tecnico_responsavel TEXT NOT NULL,
    observacoes         TEXT,
    data_uso            TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_uso_caixa ON usos(caixa_id);
";

/// Box columns joined with the owning cable type.
const BOX_SELECT: &str = "
SELECT c.id AS id, c.numero AS numero, c.tipo_cabo_id AS tipo_cabo_id,
       c.quantidade_inicial AS quantidade_inicial, c.quantidade_atual AS quantidade_atual,
       c.status AS status, c.projeto_id AS projeto_id,
       c.tecnico_responsavel AS tecnico_responsavel, c.observacoes AS observacoes,
       c.version AS version, c.created_at AS created_at, c.updated_at AS updated_at,
       tc.nome AS tipo_nome, tc.prefixo AS prefixo
FROM caixas c
LEFT JOIN tipos_cabo tc ON c.tipo_cabo_id = tc.id";

/// Numbering retries when concurrent creates keep taking the computed code.
const NUMBERING_ATTEMPTS: usize = 16;

/// A usage entry to be written alongside a transition.
#[derive(Debug, Clone)]
pub struct NewUsage {
    pub projeto_id: i64,
    pub tecnico_responsavel: String,
    pub quantidade_usada: f64,
    pub observacoes: Option<String>,
}

/// Persistent storage for the catalog, the box registry and the usage
/// ledger, backed by SQLStore (SQLite).
pub struct InventoryStore {
    db: Arc<dyn SQLStore>,
}

impl InventoryStore {
    /// Create a new InventoryStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        db.exec_batch(SCHEMA)
            .map_err(|e| ServiceError::Storage(format!("inventory schema init: {e}")))?;
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Cable types
    // -----------------------------------------------------------------------

    /// Insert a cable type. The prefix must already be normalised.
    pub fn insert_cable_type(
        &self,
        nome: &str,
        prefixo: &str,
        descricao: &str,
        unidade: UnitOfMeasure,
    ) -> Result<CableType, ServiceError> {
        let now = now_rfc3339();
        let id = self
            .db
            .insert(
                "INSERT INTO tipos_cabo (nome, prefixo, descricao, unidade_medida, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                &[
                    Value::Text(nome.to_string()),
                    Value::Text(prefixo.to_string()),
                    Value::Text(descricao.to_string()),
                    Value::Text(unidade.as_str().to_string()),
                    Value::Text(now.clone()),
                ],
            )
            .map_err(|e| map_write_error(e, &format!("prefixo '{prefixo}' já cadastrado")))?;

        Ok(CableType {
            id,
            nome: nome.to_string(),
            prefixo: prefixo.to_string(),
            descricao: descricao.to_string(),
            unidade_medida: unidade,
            created_at: now,
        })
    }

    pub fn get_cable_type(&self, id: i64) -> Result<Option<CableType>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT * FROM tipos_cabo WHERE id = ?1",
                &[Value::Integer(id)],
            )
            .map_err(ServiceError::storage)?;
        rows.first().map(row_to_cable_type).transpose()
    }

    pub fn find_cable_type_by_prefix(&self, prefixo: &str) -> Result<Option<CableType>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT * FROM tipos_cabo WHERE prefixo = ?1",
                &[Value::Text(prefixo.to_string())],
            )
            .map_err(ServiceError::storage)?;
        rows.first().map(row_to_cable_type).transpose()
    }

    pub fn list_cable_types(&self) -> Result<Vec<CableType>, ServiceError> {
        let rows = self
            .db
            .query("SELECT * FROM tipos_cabo ORDER BY nome, id", &[])
            .map_err(ServiceError::storage)?;
        rows.iter().map(row_to_cable_type).collect()
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub fn insert_project(
        &self,
        nome: &str,
        descricao: &str,
        status: &str,
    ) -> Result<Project, ServiceError> {
        let now = now_rfc3339();
        let id = self
            .db
            .insert(
                "INSERT INTO projetos (nome, descricao, status, created_at) VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::Text(nome.to_string()),
                    Value::Text(descricao.to_string()),
                    Value::Text(status.to_string()),
                    Value::Text(now.clone()),
                ],
            )
            .map_err(ServiceError::storage)?;

        Ok(Project {
            id,
            nome: nome.to_string(),
            descricao: descricao.to_string(),
            status: status.to_string(),
            created_at: now,
        })
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>, ServiceError> {
        let rows = self
            .db
            .query("SELECT * FROM projetos WHERE id = ?1", &[Value::Integer(id)])
            .map_err(ServiceError::storage)?;
        rows.first().map(row_to_project).transpose()
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, ServiceError> {
        let rows = self
            .db
            .query("SELECT * FROM projetos ORDER BY nome, id", &[])
            .map_err(ServiceError::storage)?;
        rows.iter().map(row_to_project).collect()
    }

    // -----------------------------------------------------------------------
    // Boxes
    // -----------------------------------------------------------------------

    /// Insert a new box in `nova`, numbering it with the next free sequence
    /// of its cable type. A create that loses the number to a concurrent one
    /// recomputes it and tries again.
    pub fn insert_box(
        &self,
        tipo: &CableType,
        quantidade_inicial: f64,
    ) -> Result<CableBox, ServiceError> {
        for _ in 0..NUMBERING_ATTEMPTS {
            let (sequencia, numero) = self.next_box_number(tipo)?;
            let now = now_rfc3339();
            let inserted = self.db.insert(
                "INSERT INTO caixas (numero, tipo_cabo_id, sequencia, quantidade_inicial, \
                     quantidade_atual, status, version, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5, 0, ?6, ?6)",
                &[
                    Value::Text(numero.clone()),
                    Value::Integer(tipo.id),
                    Value::Integer(sequencia),
                    Value::Real(quantidade_inicial),
                    Value::Text(BoxStatus::Nova.as_str().to_string()),
                    Value::Text(now),
                ],
            );
            match inserted {
                Ok(id) => {
                    return self.get_box(id)?.ok_or_else(|| {
                        ServiceError::Internal(format!("caixa {id} sumiu após inserção"))
                    });
                }
                Err(e) if is_unique_violation(&e) => {
                    tracing::debug!(numero = %numero, "box number taken concurrently, renumbering");
                }
                Err(e) => return Err(ServiceError::storage(e)),
            }
        }
        Err(ServiceError::Conflict(format!(
            "não foi possível numerar nova caixa do tipo {}",
            tipo.prefixo
        )))
    }

    /// Next sequence after the highest one of `tipo` whose code is not taken.
    ///
    /// Codes of a short prefix can run into a longer one once they pass 999:
    /// `C6` box 1001 is `C61001`, the first box of `C61`. Taken codes are
    /// skipped so the type keeps numbering.
    fn next_box_number(&self, tipo: &CableType) -> Result<(i64, String), ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT COALESCE(MAX(sequencia), 0) AS ultima FROM caixas WHERE tipo_cabo_id = ?1",
                &[Value::Integer(tipo.id)],
            )
            .map_err(ServiceError::storage)?;
        let mut sequencia = rows.first().and_then(|r| r.get_i64("ultima")).unwrap_or(0) + 1;
        loop {
            let numero = box_number(&tipo.prefixo, sequencia);
            if !self.numero_taken(&numero)? {
                return Ok((sequencia, numero));
            }
            sequencia += 1;
        }
    }

    fn numero_taken(&self, numero: &str) -> Result<bool, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT 1 AS hit FROM caixas WHERE numero = ?1 LIMIT 1",
                &[Value::Text(numero.to_string())],
            )
            .map_err(ServiceError::storage)?;
        Ok(!rows.is_empty())
    }

    pub fn get_box(&self, id: i64) -> Result<Option<CableBox>, ServiceError> {
        let rows = self
            .db
            .query(&format!("{BOX_SELECT} WHERE c.id = ?1"), &[Value::Integer(id)])
            .map_err(ServiceError::storage)?;
        rows.first().map(row_to_box).transpose()
    }

    pub fn find_box_by_numero(&self, numero: &str) -> Result<Option<CableBox>, ServiceError> {
        let rows = self
            .db
            .query(
                &format!("{BOX_SELECT} WHERE c.numero = ?1"),
                &[Value::Text(numero.to_string())],
            )
            .map_err(ServiceError::storage)?;
        rows.first().map(row_to_box).transpose()
    }

    /// All boxes, newest first.
    pub fn list_boxes(&self) -> Result<Vec<CableBox>, ServiceError> {
        let rows = self
            .db
            .query(&format!("{BOX_SELECT} ORDER BY c.created_at DESC, c.id DESC"), &[])
            .map_err(ServiceError::storage)?;
        rows.iter().map(row_to_box).collect()
    }

    /// Persist a transition computed from a box read at `expected_version`.
    ///
    /// The update is a compare-and-swap on `version`: if another transition
    /// landed first nothing is written (the usage entry included) and the
    /// call fails with [`ServiceError::InvalidTransition`].
    pub fn apply_transition(
        &self,
        next: &CableBox,
        expected_version: i64,
        usage: Option<NewUsage>,
    ) -> Result<CableBox, ServiceError> {
        let now = now_rfc3339();
        let mut statements = vec![Statement::guarded(
            "UPDATE caixas SET quantidade_atual = ?1, status = ?2, projeto_id = ?3, \
                 tecnico_responsavel = ?4, observacoes = ?5, version = version + 1, \
                 updated_at = ?6 \
             WHERE id = ?7 AND version = ?8",
            vec![
                Value::Real(next.quantidade_atual),
                Value::Text(next.status.as_str().to_string()),
                Value::from(next.projeto_id),
                Value::from(next.tecnico_responsavel.clone()),
                Value::from(next.observacoes.clone()),
                Value::Text(now.clone()),
                Value::Integer(next.id),
                Value::Integer(expected_version),
            ],
        )];

        if let Some(usage) = usage {
            statements.push(Statement::new(
                "INSERT INTO usos (caixa_id, projeto_id, quantidade_usada, tecnico_responsavel, \
                     observacoes, data_uso) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                vec![
                    Value::Integer(next.id),
                    Value::Integer(usage.projeto_id),
                    Value::Real(usage.quantidade_usada),
                    Value::Text(usage.tecnico_responsavel),
                    Value::from(usage.observacoes),
                    Value::Text(now),
                ],
            ));
        }

        match self.db.transaction(&statements) {
            Ok(_) => {}
            Err(SQLError::GuardFailed(_)) => {
                tracing::warn!(numero = %next.numero, expected_version, "stale box version, transition dropped");
                return Err(ServiceError::InvalidTransition(format!(
                    "caixa {} foi modificada por outra operação",
                    next.numero
                )));
            }
            Err(e) => return Err(ServiceError::storage(e)),
        }

        self.get_box(next.id)?
            .ok_or_else(|| ServiceError::NotFound(format!("caixa {} não encontrada", next.id)))
    }

    // -----------------------------------------------------------------------
    // Usage ledger
    // -----------------------------------------------------------------------

    /// Usage entries of a box, oldest first.
    pub fn list_usages(&self, caixa_id: i64) -> Result<Vec<Usage>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT * FROM usos WHERE caixa_id = ?1 ORDER BY id ASC",
                &[Value::Integer(caixa_id)],
            )
            .map_err(ServiceError::storage)?;
        rows.iter().map(row_to_usage).collect()
    }
}

/// Box code: prefix followed by the sequence, zero-padded to three digits.
/// Sequences past 999 simply widen.
pub fn box_number(prefixo: &str, sequencia: i64) -> String {
    format!("{prefixo}{sequencia:03}")
}

fn is_unique_violation(e: &SQLError) -> bool {
    matches!(e, SQLError::Execution(msg) if msg.contains("UNIQUE constraint failed"))
}

/// Unique-constraint violations become conflicts; anything else is storage.
fn map_write_error(e: SQLError, conflict_msg: &str) -> ServiceError {
    if is_unique_violation(&e) {
        ServiceError::Conflict(conflict_msg.to_string())
    } else {
        ServiceError::storage(e)
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn text(row: &Row, col: &str) -> Result<String, ServiceError> {
    row.get_str(col)
        .map(str::to_string)
        .ok_or_else(|| ServiceError::Storage(format!("missing column {col}")))
}

fn int(row: &Row, col: &str) -> Result<i64, ServiceError> {
    row.get_i64(col)
        .ok_or_else(|| ServiceError::Storage(format!("missing column {col}")))
}

fn real(row: &Row, col: &str) -> Result<f64, ServiceError> {
    row.get_f64(col)
        .ok_or_else(|| ServiceError::Storage(format!("missing column {col}")))
}

fn row_to_cable_type(row: &Row) -> Result<CableType, ServiceError> {
    let unit = text(row, "unidade_medida")?;
    Ok(CableType {
        id: int(row, "id")?,
        nome: text(row, "nome")?,
        prefixo: text(row, "prefixo")?,
        descricao: row.get_str("descricao").unwrap_or_default().to_string(),
        unidade_medida: UnitOfMeasure::from_str(&unit)
            .ok_or_else(|| ServiceError::Storage(format!("bad unidade_medida: {unit}")))?,
        created_at: text(row, "created_at")?,
    })
}

fn row_to_project(row: &Row) -> Result<Project, ServiceError> {
    Ok(Project {
        id: int(row, "id")?,
        nome: text(row, "nome")?,
        descricao: row.get_str("descricao").unwrap_or_default().to_string(),
        status: text(row, "status")?,
        created_at: text(row, "created_at")?,
    })
}

fn row_to_box(row: &Row) -> Result<CableBox, ServiceError> {
    let status = text(row, "status")?;
    Ok(CableBox {
        id: int(row, "id")?,
        numero: text(row, "numero")?,
        tipo_cabo_id: int(row, "tipo_cabo_id")?,
        quantidade_inicial: real(row, "quantidade_inicial")?,
        quantidade_atual: real(row, "quantidade_atual")?,
        status: BoxStatus::from_str(&status)
            .ok_or_else(|| ServiceError::Storage(format!("bad box status: {status}")))?,
        projeto_id: row.get_i64("projeto_id"),
        tecnico_responsavel: row.get_str("tecnico_responsavel").map(str::to_string),
        observacoes: row.get_str("observacoes").map(str::to_string),
        version: int(row, "version")?,
        tipo_nome: row.get_str("tipo_nome").map(str::to_string),
        prefixo: row.get_str("prefixo").map(str::to_string),
        created_at: text(row, "created_at")?,
        updated_at: text(row, "updated_at")?,
    })
}

fn row_to_usage(row: &Row) -> Result<Usage, ServiceError> {
    Ok(Usage {
        id: int(row, "id")?,
        caixa_id: int(row, "caixa_id")?,
        projeto_id: int(row, "projeto_id")?,
        tecnico_responsavel: text(row, "tecnico_responsavel")?,
        quantidade_usada: real(row, "quantidade_usada")?,
        observacoes: row.get_str("observacoes").map(str::to_string),
        data_uso: text(row, "data_uso")?,
    })
}
