/// Square island mask: 0 in the middle, rising to 1 at the edges.
#[derive(Clone, Debug, PartialEq)]
pub struct FalloffField {
    size: usize,
    values: Vec<f32>,
}

const CURVE_A: f32 = 3.0;
const CURVE_B: f32 = 2.2;

impl FalloffField {
    pub fn generate(size: usize) -> Self {
        let mut values = Vec::with_capacity(size * size);
        let denom = (size.max(2) - 1) as f32;
        for j in 0..size {
            for i in 0..size {
                let x = i as f32 / denom * 2.0 - 1.0;
                let y = j as f32 / denom * 2.0 - 1.0;
                let v = x.abs().max(y.abs());
                values.push(evaluate(v));
            }
        }
        Self { size, values }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.size + x]
    }
}

fn evaluate(v: f32) -> f32 {
    let num = v.powf(CURVE_A);
    num / (num + (CURVE_B - CURVE_B * v).powf(CURVE_A))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_is_open_and_rim_is_closed() {
        let f = FalloffField::generate(41);
        assert!(f.get(20, 20) < 1e-6);
        assert!((f.get(0, 20) - 1.0).abs() < 1e-6);
        assert!((f.get(40, 40) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn symmetric_and_monotonic_outwards() {
        let f = FalloffField::generate(21);
        for i in 0..21 {
            assert_eq!(f.get(i, 3), f.get(3, i));
            assert!((f.get(i, 10) - f.get(20 - i, 10)).abs() < 1e-5);
        }
        for i in 10..20 {
            assert!(f.get(i + 1, 10) >= f.get(i, 10));
        }
    }
}
