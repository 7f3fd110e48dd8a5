//! Random customer profiles for smoke-testing a deployment end to end.

use rand::Rng;

use crate::model::{FeatureMap, FeatureValue};

const EMPLOYEE_INDEX: &[&str] = &["N", "A", "B", "F", "S"];
const SEX: &[&str] = &["H", "V"];
const ENTRY_CHANNEL: &[&str] = &["KHQ", "KFC", "KAT", "KHG"];
const PROVINCE: &[&str] = &["ALICANTE", "BARCELONA", "MADRID", "CASTELLON", "TOLEDO"];
const SEGMENT: &[&str] = &["01 - TOP", "02 - PARTICULARES", "03 - UNIVERSITARIO"];

fn pick<R: Rng + ?Sized, T: Copy>(rng: &mut R, options: &[T]) -> T {
    options[rng.gen_range(0..options.len())]
}

fn flag<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    pick(rng, &[0, 1])
}

/// Builds a feature map covering every required feature with plausible values.
pub fn random_features<R: Rng + ?Sized>(rng: &mut R) -> FeatureMap {
    let mut features = FeatureMap::new();
    features.insert("ind_empleado", pick(rng, EMPLOYEE_INDEX));
    features.insert("sexo", pick(rng, SEX));
    features.insert("age", FeatureValue::Float(rng.gen_range(18.0..100.0)));
    features.insert("ind_nuevo", flag(rng));
    // months of seniority, up to 20 years
    features.insert("antiguedad", rng.gen_range(0_i64..=240));
    features.insert("indrel", pick(rng, &[1_i64, 99]));
    features.insert("tiprel_1mes", pick(rng, &[1_i64, 2, 3, 4]));
    features.insert("indresi", flag(rng));
    features.insert("indext", flag(rng));
    features.insert("canal_entrada", pick(rng, ENTRY_CHANNEL));
    features.insert("indfall", flag(rng));
    features.insert("tipodom", pick(rng, &[1_i64, 2]));
    features.insert("nomprov", pick(rng, PROVINCE));
    features.insert("ind_actividad_cliente", flag(rng));
    features.insert("renta", FeatureValue::Float(rng.gen_range(10_000.0..300_000.0)));
    features.insert("segmento", pick(rng, SEGMENT));
    features.insert("ind_ahor_fin_ult1", flag(rng));
    features
}
