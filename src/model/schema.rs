use std::collections::HashSet;

use crate::model::{FeatureMap, FeatureRow};

/// Customer attributes every scoring request must carry.
pub const REQUIRED_FEATURES: [&str; 17] = [
    "ind_empleado",
    "sexo",
    "age",
    "ind_nuevo",
    "antiguedad",
    "indrel",
    "tiprel_1mes",
    "indresi",
    "indext",
    "canal_entrada",
    "indfall",
    "tipodom",
    "nomprov",
    "ind_actividad_cliente",
    "renta",
    "segmento",
    "ind_ahor_fin_ult1",
];

/// Fixed set of feature names, kept in the column order predictors expect.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Vec<String>,
    lookup: HashSet<String>,
}

/// Key-set difference between a request and the schema.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl SchemaMismatch {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

impl FeatureSchema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names_in_order = Vec::new();
        let mut lookup = HashSet::new();
        for name in names {
            let name = name.into();
            if lookup.insert(name.clone()) {
                names_in_order.push(name);
            }
        }
        Self {
            names: names_in_order,
            lookup,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// True when the map's keys are exactly the schema, with nothing missing or extra.
    pub fn matches(&self, features: &FeatureMap) -> bool {
        features.len() == self.names.len() && features.keys().all(|key| self.contains(key))
    }

    pub fn mismatch(&self, features: &FeatureMap) -> SchemaMismatch {
        SchemaMismatch {
            missing: self
                .names
                .iter()
                .filter(|name| !features.contains(name))
                .cloned()
                .collect(),
            unexpected: features
                .keys()
                .filter(|key| !self.contains(key))
                .map(str::to_string)
                .collect(),
        }
    }

    /// Lays out the map in schema order. Columns absent from the map are skipped,
    /// so callers should check [`FeatureSchema::matches`] first.
    pub fn row(&self, features: &FeatureMap) -> FeatureRow {
        FeatureRow::from_columns(
            self.names
                .iter()
                .filter_map(|name| features.get(name).map(|v| (name.clone(), v.clone())))
                .collect(),
        )
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::new(REQUIRED_FEATURES)
    }
}
