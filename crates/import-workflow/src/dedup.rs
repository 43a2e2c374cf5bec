use crate::record::ImportRecord;
use std::collections::HashMap;

/// Marca como no ejecutables los registros del lote que comparten clave
/// (recurso + discriminante). Cada par duplicado queda marcado en ambos
/// lados y cada mensaje cita la línea (base 1) del otro registro.
pub fn mark_duplicates<R: ImportRecord>(records: &mut [R]) {
    let mut seen: HashMap<String, Vec<usize>> = HashMap::new();
    for cur in 0..records.len() {
        let key = records[cur].dedup_key();
        let prior = seen.entry(key).or_default();
        for &prev in prior.iter() {
            records[prev].state_mut().set_not_executable(format!("duplicado con la línea {}", cur + 1));
            records[cur].state_mut().set_not_executable(format!("duplicado con la línea {}", prev + 1));
        }
        prior.push(cur);
    }
}
