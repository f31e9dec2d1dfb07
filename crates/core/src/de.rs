//! Lenient numeric deserializers for indicator payloads.
//!
//! Pine Script alert templates are loose about number formatting: integers
//! may arrive as `1.0` and prices as quoted strings. These helpers coerce
//! anything that represents the declared type exactly and reject the rest.

use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(i64),
    Float(f64),
    Text(String),
}

fn text_to_f64<E: Error>(s: &str) -> Result<f64, E> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| E::custom(format!("expected a number, found string {s:?}")))
}

fn to_f64<E: Error>(n: Number) -> Result<f64, E> {
    match n {
        Number::Int(i) => Ok(i as f64),
        Number::Float(f) => Ok(f),
        Number::Text(s) => text_to_f64(&s),
    }
}

fn to_i64<E: Error>(n: Number) -> Result<i64, E> {
    let f = match n {
        Number::Int(i) => return Ok(i),
        Number::Float(f) => f,
        Number::Text(s) => match s.trim().parse::<i64>() {
            Ok(i) => return Ok(i),
            Err(_) => text_to_f64(&s)?,
        },
    };
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Ok(f as i64)
    } else {
        Err(E::custom(format!("expected an integer, found {f}")))
    }
}

/// `f64` from a number or numeric string.
pub(crate) fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    to_f64(Number::deserialize(d)?)
}

/// Optional `f64`; `null` is absent.
pub(crate) fn opt_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Option::<Number>::deserialize(d)?.map(to_f64).transpose()
}

/// Integer from an integer, an integral float, or a numeric string.
pub(crate) fn integer<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let i = to_i64(Number::deserialize(d)?)?;
    T::try_from(i).map_err(|_| D::Error::custom(format!("integer {i} out of range")))
}
