use serde::Serialize;

/// A TerriData indicator that can be crossed against another one.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Variable {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(skip)]
    pub indicador: &'static str,
}

pub const VARIABLES: [Variable; 8] = [
    Variable { id: "poblacion", name: "Población total", indicador: "Población total" },
    Variable {
        id: "icfes",
        name: "Puntaje ICFES",
        indicador: "Puntaje promedio Pruebas Saber 11 - Matemáticas",
    },
    Variable {
        id: "homicidios",
        name: "Tasa de homicidios",
        indicador: "Tasa de homicidios por cada 100.000 habitantes",
    },
    Variable {
        id: "hurtos",
        name: "Tasa de hurtos",
        indicador: "Tasa de hurto común por cada 100.000 habitantes",
    },
    Variable {
        id: "pobreza",
        name: "Pobreza multidimensional (IPM)",
        indicador: "Índice de pobreza multidimensional - IPM",
    },
    Variable {
        id: "valor_agregado",
        name: "Valor agregado per cápita",
        indicador: "Valor agregado per cápita",
    },
    Variable {
        id: "desercion",
        name: "Tasa de deserción escolar",
        indicador: "Tasa de deserción intra-anual del sector oficial en educación básica y media (Desde transición hasta once)",
    },
    Variable {
        id: "vif",
        name: "Violencia intrafamiliar",
        indicador: "Tasa de violencia intrafamiliar por cada 100.000 habitantes",
    },
];

pub fn find_variable(id: &str) -> Option<&'static Variable> {
    VARIABLES.iter().find(|v| v.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_indicator() {
        let value = serde_json::to_value(find_variable("vif").unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"id": "vif", "name": "Violencia intrafamiliar"}));
    }

    #[test]
    fn unknown_variable() {
        assert!(find_variable("pib").is_none());
        assert_eq!(find_variable("poblacion").map(|v| v.indicador), Some("Población total"));
    }
}
