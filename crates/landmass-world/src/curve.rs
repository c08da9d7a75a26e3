use serde::Deserialize;

use crate::error::ConfigError;

/// Piecewise-linear remap of normalized heights. Keys are `(t, v)` pairs with
/// strictly increasing `t` in `[0, 1]`; evaluation clamps outside the key range.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "Vec<[f32; 2]>")]
pub struct HeightCurve {
    keys: Vec<(f32, f32)>,
}

impl From<Vec<[f32; 2]>> for HeightCurve {
    fn from(value: Vec<[f32; 2]>) -> Self {
        Self {
            keys: value.into_iter().map(|[t, v]| (t, v)).collect(),
        }
    }
}

impl Default for HeightCurve {
    // Flat lowlands that steepen towards the peaks.
    fn default() -> Self {
        Self::from(vec![[0.0, 0.0], [0.3, 0.05], [0.6, 0.35], [1.0, 1.0]])
    }
}

impl HeightCurve {
    pub fn evaluate(&self, t: f32) -> f32 {
        let Some(&(t0, v0)) = self.keys.first() else {
            return 0.0;
        };
        if t <= t0 {
            return v0;
        }
        for w in self.keys.windows(2) {
            let (ta, va) = w[0];
            let (tb, vb) = w[1];
            if t <= tb {
                let span = tb - ta;
                if span <= 0.0 {
                    return vb;
                }
                return va + (vb - va) * ((t - ta) / span);
            }
        }
        self.keys.last().map(|&(_, v)| v).unwrap_or(v0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keys.len() < 2 {
            return Err(ConfigError::invalid(
                "height_curve",
                format!("{} key(s) given, at least 2 required", self.keys.len()),
            ));
        }
        let mut prev: Option<f32> = None;
        for &(t, v) in &self.keys {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::invalid(
                    "height_curve",
                    format!("t = {t} is outside [0, 1]"),
                ));
            }
            if !v.is_finite() {
                return Err(ConfigError::invalid(
                    "height_curve",
                    format!("value at t = {t} is not finite"),
                ));
            }
            if let Some(p) = prev
                && t <= p
            {
                return Err(ConfigError::invalid(
                    "height_curve",
                    format!("t must increase strictly ({t} after {p})"),
                ));
            }
            prev = Some(t);
        }
        Ok(())
    }
}
