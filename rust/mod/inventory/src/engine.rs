use std::sync::Arc;

use cabos_core::{ServiceError, optional_text, required_text};
use tracing::{info, warn};

use crate::model::{BoxStatus, CableBox, CloseBoxRequest, CloseOutcome, OpenBoxRequest, Usage};
use crate::store::{InventoryStore, NewUsage};

// ---------------------------------------------------------------------------
// LifecycleEngine: box state machine
// ---------------------------------------------------------------------------

/// Validates and applies box transitions.
///
/// ```text
/// nova --open--> aberta --close(final>0)--> fechada --open--> aberta
///                       --close(final=0)--> encerrada (terminal)
/// ```
///
/// Every transition reads the box, checks the rules against that snapshot
/// and writes with a version compare-and-swap. A caller that loses a race
/// gets `InvalidTransition` and nothing is written.
pub struct LifecycleEngine {
    store: Arc<InventoryStore>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<InventoryStore>) -> Self {
        Self { store }
    }

    // =======================================================================
    // Creation
    // =======================================================================

    /// Register a new box of the given cable type, full and in `nova`.
    pub fn create(&self, tipo_cabo_id: i64, quantidade_inicial: f64) -> Result<CableBox, ServiceError> {
        if !quantidade_inicial.is_finite() || quantidade_inicial <= 0.0 {
            return Err(ServiceError::Validation(
                "quantidade_inicial deve ser maior que zero".into(),
            ));
        }
        let tipo = self.store.get_cable_type(tipo_cabo_id)?.ok_or_else(|| {
            ServiceError::Validation(format!("tipo de cabo {tipo_cabo_id} não encontrado"))
        })?;

        let caixa = self.store.insert_box(&tipo, quantidade_inicial)?;
        info!(id = caixa.id, numero = %caixa.numero, quantidade_inicial, "box created");
        Ok(caixa)
    }

    // =======================================================================
    // Transitions
    // =======================================================================

    /// Open a box for a project: `nova | fechada` → `aberta`.
    pub fn open(&self, box_id: i64, req: OpenBoxRequest) -> Result<CableBox, ServiceError> {
        let caixa = self.get(box_id)?;
        if !caixa.status.can_open() {
            warn!(numero = %caixa.numero, status = %caixa.status, "open rejected");
            return Err(ServiceError::InvalidTransition(format!(
                "caixa {} não pode ser aberta (status: {})",
                caixa.numero, caixa.status
            )));
        }

        let tecnico = required_text(&req.tecnico_responsavel, "tecnico_responsavel")?;
        self.require_project(req.projeto_id)?;

        let mut next = caixa.clone();
        next.status = BoxStatus::Aberta;
        next.projeto_id = Some(req.projeto_id);
        next.tecnico_responsavel = Some(tecnico);

        let opened = self.store.apply_transition(&next, caixa.version, None)?;
        info!(
            numero = %opened.numero,
            projeto_id = req.projeto_id,
            "box opened"
        );
        Ok(opened)
    }

    /// Return a box after use: `aberta` → `fechada`, or `encerrada` when
    /// nothing is left. Records the consumed quantity in the usage ledger.
    pub fn close(&self, box_id: i64, req: CloseBoxRequest) -> Result<CloseOutcome, ServiceError> {
        let caixa = self.get(box_id)?;
        if !caixa.status.can_close() {
            warn!(numero = %caixa.numero, status = %caixa.status, "close rejected");
            return Err(ServiceError::InvalidTransition(format!(
                "caixa {} não está aberta (status: {})",
                caixa.numero, caixa.status
            )));
        }

        let tecnico = required_text(&req.tecnico_responsavel, "tecnico_responsavel")?;
        let quantidade_final = req.quantidade_final;
        if !quantidade_final.is_finite() || quantidade_final < 0.0 {
            return Err(ServiceError::Validation(
                "quantidade_final não pode ser negativa".into(),
            ));
        }
        if quantidade_final > caixa.quantidade_atual {
            return Err(ServiceError::Validation(format!(
                "quantidade final ({quantidade_final}) maior que quantidade atual ({})",
                caixa.quantidade_atual
            )));
        }
        self.require_project(req.projeto_id)?;

        let observacoes = optional_text(req.observacoes.as_deref());
        let quantidade_usada = caixa.quantidade_atual - quantidade_final;

        let mut next = caixa.clone();
        next.quantidade_atual = quantidade_final;
        next.status = BoxStatus::after_close(quantidade_final);
        next.projeto_id = None;
        next.tecnico_responsavel = None;
        next.observacoes = observacoes.clone();

        let usage = NewUsage {
            projeto_id: req.projeto_id,
            tecnico_responsavel: tecnico,
            quantidade_usada,
            observacoes,
        };
        let closed = self
            .store
            .apply_transition(&next, caixa.version, Some(usage))?;
        info!(
            numero = %closed.numero,
            status = %closed.status,
            quantidade_usada,
            quantidade_atual = closed.quantidade_atual,
            "box closed"
        );

        let message = match closed.status {
            BoxStatus::Encerrada => "Caixa encerrada: quantidade esgotada",
            _ => "Caixa fechada com sucesso",
        };
        Ok(CloseOutcome {
            message: message.to_string(),
            quantidade_usada,
            status: closed.status,
            caixa: closed,
        })
    }

    // =======================================================================
    // Queries
    // =======================================================================

    /// Find a box by its exact code. Callers normalise case.
    pub fn lookup(&self, codigo: &str) -> Result<CableBox, ServiceError> {
        self.store
            .find_box_by_numero(codigo)?
            .ok_or_else(|| ServiceError::NotFound(format!("caixa '{codigo}' não encontrada")))
    }

    pub fn get(&self, box_id: i64) -> Result<CableBox, ServiceError> {
        self.store
            .get_box(box_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("caixa {box_id} não encontrada")))
    }

    pub fn list(&self) -> Result<Vec<CableBox>, ServiceError> {
        self.store.list_boxes()
    }

    /// Usage history of a box, oldest first.
    pub fn usages(&self, box_id: i64) -> Result<Vec<Usage>, ServiceError> {
        self.get(box_id)?;
        self.store.list_usages(box_id)
    }

    fn require_project(&self, projeto_id: i64) -> Result<(), ServiceError> {
        match self.store.get_project(projeto_id)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::Validation(format!(
                "projeto {projeto_id} não encontrado"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnitOfMeasure;
    use cabos_sql::SqliteStore;

    struct Fixture {
        engine: LifecycleEngine,
        store: Arc<InventoryStore>,
        tipo_id: i64,
        p1: i64,
        p2: i64,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        let store = Arc::new(InventoryStore::new(db).unwrap());
        let tipo = store
            .insert_cable_type("Cat6", "C6", "", UnitOfMeasure::Metros)
            .unwrap();
        let p1 = store.insert_project("Prédio A", "", "ativo").unwrap().id;
        let p2 = store.insert_project("Prédio B", "", "ativo").unwrap().id;
        Fixture {
            engine: LifecycleEngine::new(Arc::clone(&store)),
            store,
            tipo_id: tipo.id,
            p1,
            p2,
        }
    }

    fn open_req(projeto_id: i64, tecnico: &str) -> OpenBoxRequest {
        OpenBoxRequest {
            projeto_id,
            tecnico_responsavel: tecnico.into(),
        }
    }

    fn close_req(projeto_id: i64, tecnico: &str, quantidade_final: f64) -> CloseBoxRequest {
        CloseBoxRequest {
            projeto_id,
            tecnico_responsavel: tecnico.into(),
            quantidade_final,
            observacoes: None,
        }
    }

    fn is_invalid_transition<T: std::fmt::Debug>(r: Result<T, ServiceError>) -> bool {
        matches!(r, Err(ServiceError::InvalidTransition(_)))
    }

    fn is_validation<T: std::fmt::Debug>(r: Result<T, ServiceError>) -> bool {
        matches!(r, Err(ServiceError::Validation(_)))
    }

    #[test]
    fn create_starts_full_and_new() {
        let f = fixture();
        for q in [0.5, 1.0, 500.0, 12_345.75] {
            let caixa = f.engine.create(f.tipo_id, q).unwrap();
            assert_eq!(caixa.status, BoxStatus::Nova);
            assert_eq!(caixa.quantidade_atual, q);
            assert_eq!(caixa.quantidade_inicial, q);
            assert!(caixa.projeto_id.is_none());
        }
    }

    #[test]
    fn create_rejects_bad_input() {
        let f = fixture();
        assert!(is_validation(f.engine.create(f.tipo_id, 0.0)));
        assert!(is_validation(f.engine.create(f.tipo_id, -3.0)));
        assert!(is_validation(f.engine.create(f.tipo_id, f64::NAN)));
        assert!(is_validation(f.engine.create(f.tipo_id, f64::INFINITY)));
        assert!(is_validation(f.engine.create(999, 10.0)));
        assert!(f.engine.list().unwrap().is_empty());
    }

    #[test]
    fn full_lifecycle_scenario() {
        let f = fixture();
        let caixa = f.engine.create(f.tipo_id, 500.0).unwrap();
        assert_eq!(caixa.status, BoxStatus::Nova);
        assert_eq!(caixa.quantidade_atual, 500.0);

        let opened = f.engine.open(caixa.id, open_req(f.p1, "Ana")).unwrap();
        assert_eq!(opened.status, BoxStatus::Aberta);
        assert_eq!(opened.projeto_id, Some(f.p1));
        assert_eq!(opened.tecnico_responsavel.as_deref(), Some("Ana"));

        let closed = f.engine.close(caixa.id, close_req(f.p1, "Ana", 300.0)).unwrap();
        assert_eq!(closed.status, BoxStatus::Fechada);
        assert_eq!(closed.quantidade_usada, 200.0);
        assert_eq!(closed.caixa.quantidade_atual, 300.0);
        assert!(closed.caixa.projeto_id.is_none());
        assert!(closed.caixa.tecnico_responsavel.is_none());

        let reopened = f.engine.open(caixa.id, open_req(f.p2, "Bob")).unwrap();
        assert_eq!(reopened.status, BoxStatus::Aberta);
        assert_eq!(reopened.projeto_id, Some(f.p2));

        let exhausted = f.engine.close(caixa.id, close_req(f.p2, "Bob", 0.0)).unwrap();
        assert_eq!(exhausted.status, BoxStatus::Encerrada);
        assert_eq!(exhausted.caixa.quantidade_atual, 0.0);
        assert_eq!(exhausted.quantidade_usada, 300.0);

        assert!(is_invalid_transition(f.engine.open(caixa.id, open_req(f.p1, "Ana"))));

        let usages = f.engine.usages(caixa.id).unwrap();
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].projeto_id, f.p1);
        assert_eq!(usages[0].quantidade_usada, 200.0);
        assert_eq!(usages[1].tecnico_responsavel, "Bob");
        assert_eq!(usages[1].quantidade_usada, 300.0);
    }

    #[test]
    fn open_rejected_when_already_open() {
        let f = fixture();
        let caixa = f.engine.create(f.tipo_id, 100.0).unwrap();
        f.engine.open(caixa.id, open_req(f.p1, "Ana")).unwrap();
        assert!(is_invalid_transition(f.engine.open(caixa.id, open_req(f.p2, "Bob"))));
        // Status rule wins even when the input is also bad.
        assert!(is_invalid_transition(f.engine.open(caixa.id, open_req(999, ""))));
    }

    #[test]
    fn open_validates_inputs() {
        let f = fixture();
        let caixa = f.engine.create(f.tipo_id, 100.0).unwrap();
        assert!(is_validation(f.engine.open(caixa.id, open_req(f.p1, "   "))));
        assert!(is_validation(f.engine.open(caixa.id, open_req(999, "Ana"))));
        assert_eq!(f.engine.get(caixa.id).unwrap().status, BoxStatus::Nova);
        assert!(matches!(
            f.engine.open(424242, open_req(f.p1, "Ana")),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn close_requires_open_box() {
        let f = fixture();
        let caixa = f.engine.create(f.tipo_id, 100.0).unwrap();
        assert!(is_invalid_transition(f.engine.close(caixa.id, close_req(f.p1, "Ana", 50.0))));

        f.engine.open(caixa.id, open_req(f.p1, "Ana")).unwrap();
        f.engine.close(caixa.id, close_req(f.p1, "Ana", 50.0)).unwrap();
        // fechada cannot be closed again
        assert!(is_invalid_transition(f.engine.close(caixa.id, close_req(f.p1, "Ana", 10.0))));
    }

    #[test]
    fn close_validates_quantity_and_fields() {
        let f = fixture();
        let caixa = f.engine.create(f.tipo_id, 100.0).unwrap();
        f.engine.open(caixa.id, open_req(f.p1, "Ana")).unwrap();

        assert!(is_validation(f.engine.close(caixa.id, close_req(f.p1, "Ana", 100.5))));
        assert!(is_validation(f.engine.close(caixa.id, close_req(f.p1, "Ana", -1.0))));
        assert!(is_validation(f.engine.close(caixa.id, close_req(f.p1, "Ana", f64::NAN))));
        assert!(is_validation(f.engine.close(caixa.id, close_req(f.p1, "", 10.0))));
        assert!(is_validation(f.engine.close(caixa.id, close_req(999, "Ana", 10.0))));

        // Nothing changed.
        let current = f.engine.get(caixa.id).unwrap();
        assert_eq!(current.status, BoxStatus::Aberta);
        assert_eq!(current.quantidade_atual, 100.0);
        assert!(f.engine.usages(caixa.id).unwrap().is_empty());

        // Closing with everything left is allowed.
        let outcome = f.engine.close(caixa.id, close_req(f.p1, "Ana", 100.0)).unwrap();
        assert_eq!(outcome.status, BoxStatus::Fechada);
        assert_eq!(outcome.quantidade_usada, 0.0);
    }

    #[test]
    fn close_keeps_notes() {
        let f = fixture();
        let caixa = f.engine.create(f.tipo_id, 100.0).unwrap();
        f.engine.open(caixa.id, open_req(f.p1, "Ana")).unwrap();
        let mut req = close_req(f.p1, "Ana", 70.0);
        req.observacoes = Some("  emenda no meio  ".into());
        let outcome = f.engine.close(caixa.id, req).unwrap();
        assert_eq!(outcome.caixa.observacoes.as_deref(), Some("emenda no meio"));
    }

    #[test]
    fn exhausted_box_is_absorbing() {
        let f = fixture();
        let caixa = f.engine.create(f.tipo_id, 10.0).unwrap();
        f.engine.open(caixa.id, open_req(f.p1, "Ana")).unwrap();
        f.engine.close(caixa.id, close_req(f.p1, "Ana", 0.0)).unwrap();

        for _ in 0..3 {
            assert!(is_invalid_transition(f.engine.open(caixa.id, open_req(f.p1, "Ana"))));
            assert!(is_invalid_transition(f.engine.close(caixa.id, close_req(f.p1, "Ana", 0.0))));
        }
        let current = f.engine.get(caixa.id).unwrap();
        assert_eq!(current.status, BoxStatus::Encerrada);
        assert_eq!(current.quantidade_atual, 0.0);
    }

    #[test]
    fn lookup_is_exact() {
        let f = fixture();
        let caixa = f.engine.create(f.tipo_id, 10.0).unwrap();
        assert_eq!(f.engine.lookup("C6001").unwrap().id, caixa.id);
        assert!(matches!(f.engine.lookup("c6001"), Err(ServiceError::NotFound(_))));
        assert!(matches!(f.engine.lookup("C6002"), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn concurrent_opens_serialize() {
        let f = fixture();
        let caixa = f.engine.create(f.tipo_id, 100.0).unwrap();
        let engine = Arc::new(f.engine);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                let p1 = f.p1;
                std::thread::spawn(move || engine.open(caixa.id, open_req(p1, &format!("t{i}"))))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(ServiceError::InvalidTransition(_)))));

        let current = f.store.get_box(caixa.id).unwrap().unwrap();
        assert_eq!(current.status, BoxStatus::Aberta);
        assert_eq!(current.version, 1);
    }

    #[test]
    fn concurrent_closes_record_one_usage() {
        let f = fixture();
        let caixa = f.engine.create(f.tipo_id, 100.0).unwrap();
        f.engine.open(caixa.id, open_req(f.p1, "Ana")).unwrap();
        let engine = Arc::new(f.engine);

        let handles: Vec<_> = (1..=6)
            .map(|i| {
                let engine = Arc::clone(&engine);
                let p1 = f.p1;
                let quantidade_final = f64::from(i) * 10.0;
                std::thread::spawn(move || {
                    let r = engine.close(caixa.id, close_req(p1, &format!("t{i}"), quantidade_final));
                    (quantidade_final, r)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<f64> = results
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(q, _)| *q)
            .collect();
        assert_eq!(winners.len(), 1);
        assert!(results
            .iter()
            .filter(|(_, r)| r.is_err())
            .all(|(_, r)| matches!(r, Err(ServiceError::InvalidTransition(_)))));

        let current = f.store.get_box(caixa.id).unwrap().unwrap();
        assert_eq!(current.status, BoxStatus::Fechada);
        assert_eq!(current.quantidade_atual, winners[0]);
        assert_eq!(current.version, 2);

        let usos = engine.usages(caixa.id).unwrap();
        assert_eq!(usos.len(), 1);
        assert_eq!(usos[0].quantidade_usada, 100.0 - winners[0]);
    }

    #[test]
    fn concurrent_creates_get_distinct_numbers() {
        let f = fixture();
        let engine = Arc::new(f.engine);
        let tipo_id = f.tipo_id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.create(tipo_id, 10.0))
            })
            .collect();

        let mut numeros: Vec<String> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap().numero)
            .collect();
        numeros.sort();
        let expected: Vec<String> = (1..=8).map(|i| format!("C600{i}")).collect();
        assert_eq!(numeros, expected);
    }
}
