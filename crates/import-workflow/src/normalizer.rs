// Archivo: normalizer.rs
// Propósito: convertir filas de celdas de texto en registros tipados usando
// una tabla explícita columna → campo por cada forma de registro.
use crate::errors::{ImportError, Result};

/// Asigna el valor (ya recortado) de una celda a un campo del registro.
pub type FieldSetter<T> = fn(&mut T, &str) -> std::result::Result<(), String>;

/// Una columna de la forma de registro.
pub struct FieldSpec<T> {
    pub name: &'static str,
    pub set: FieldSetter<T>,
}

/// Normaliza `rows` con la tabla `columns`. Las filas más cortas dejan los
/// campos restantes con su valor por defecto; una fila más larga o un valor
/// que no se puede interpretar aborta todo con un error estructural.
pub fn normalize_rows<T: Default>(rows: &[Vec<String>], columns: &[FieldSpec<T>]) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let line = idx + 1;
        if row.len() > columns.len() {
            return Err(ImportError::Structural(format!("línea {}: {} columnas, la forma admite {}",
                                                       line,
                                                       row.len(),
                                                       columns.len())));
        }
        let mut record = T::default();
        for (spec, cell) in columns.iter().zip(row.iter()) {
            (spec.set)(&mut record, cell.trim())
                .map_err(|e| ImportError::Structural(format!("línea {} columna {}: {}", line, spec.name, e)))?;
        }
        out.push(record);
    }
    Ok(out)
}

fn parse_int(s: &str) -> std::result::Result<u32, String> {
    s.trim().parse::<u32>().map_err(|_| format!("'{}' no es un entero válido", s.trim()))
}

/// Interpreta un puerto único (`80`) o un rango (`[8000, 8010]`). Un rango
/// ascendente dentro de `1..=65535` se expande a la lista completa de
/// puertos; un rango descendente o fuera de límites se conserva tal cual
/// para que las reglas locales lo rechacen. Más de dos extremos es un error.
pub fn parse_ports(s: &str) -> std::result::Result<Vec<u32>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) else {
        return Ok(vec![parse_int(s)?]);
    };
    let bounds: Vec<u32> = inner.split(',')
                                .filter(|p| !p.trim().is_empty())
                                .map(parse_int)
                                .collect::<std::result::Result<_, _>>()?;
    match *bounds.as_slice() {
        [start, end] if start >= 1 && start < end && end <= 65535 => Ok((start..=end).collect()),
        [_, _, _, ..] => Err(format!("'{}': un rango admite como mucho dos extremos", s)),
        _ => Ok(bounds),
    }
}

/// Entero opcional: celda vacía → `None`.
pub fn parse_opt_i64(s: &str) -> std::result::Result<Option<i64>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    s.parse::<i64>().map(Some).map_err(|_| format!("'{}' no es un entero válido", s))
}

/// Separa una lista de ids (`[a,b]` o `a,b`) descartando entradas vacías.
pub fn split_ids(s: &str) -> Vec<String> {
    let s = s.trim();
    let inner = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')).unwrap_or(s);
    inner.split(',')
         .map(|p| p.trim().trim_matches('"').trim())
         .filter(|p| !p.is_empty())
         .map(str::to_string)
         .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct Pair {
        a: String,
        b: Vec<u32>,
    }

    fn set_a(p: &mut Pair, v: &str) -> std::result::Result<(), String> {
        p.a = v.to_string();
        Ok(())
    }

    fn set_b(p: &mut Pair, v: &str) -> std::result::Result<(), String> {
        p.b = parse_ports(v)?;
        Ok(())
    }

    const COLUMNS: &[FieldSpec<Pair>] = &[FieldSpec { name: "a", set: set_a }, FieldSpec { name: "b", set: set_b }];

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn trims_and_fills_missing_cells() {
        let out = normalize_rows(&[row(&["  x ", "[80, 83]"]), row(&["y"])], COLUMNS).unwrap();
        assert_eq!(out[0].a, "x");
        assert_eq!(out[0].b, vec![80, 81, 82, 83]);
        assert_eq!(out[1].a, "y");
        assert!(out[1].b.is_empty());
    }

    #[test]
    fn long_rows_and_bad_integers_are_structural() {
        let err = normalize_rows(&[row(&["x", "80", "extra"])], COLUMNS).unwrap_err();
        assert!(matches!(err, ImportError::Structural(_)));
        let err = normalize_rows(&[row(&["x", "80"]), row(&["y", "ochenta"])], COLUMNS).unwrap_err();
        match err {
            ImportError::Structural(msg) => assert!(msg.contains("línea 2") && msg.contains("columna b")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn ranges_expand_only_when_ascending_and_in_bounds() {
        assert_eq!(parse_ports("[8000,8003]").unwrap(), vec![8000, 8001, 8002, 8003]);
        assert_eq!(parse_ports("[90, 80]").unwrap(), vec![90, 80]);
        assert_eq!(parse_ports("[80,80]").unwrap(), vec![80, 80]);
        assert_eq!(parse_ports("[1, 70000]").unwrap(), vec![1, 70000]);
        assert_eq!(parse_ports("[443]").unwrap(), vec![443]);
        assert_eq!(parse_ports(" 80 ").unwrap(), vec![80]);
        assert!(parse_ports("[80, x]").is_err());
        assert!(parse_ports("[80, 81, 82]").is_err());
    }

    #[test]
    fn id_lists() {
        assert_eq!(split_ids("[cert-a, ,cert-b]"), vec!["cert-a", "cert-b"]);
        assert_eq!(split_ids("cert-a"), vec!["cert-a"]);
        assert!(split_ids("  ").is_empty());
        assert_eq!(parse_opt_i64("").unwrap(), None);
        assert_eq!(parse_opt_i64("-3").unwrap(), Some(-3));
    }
}
