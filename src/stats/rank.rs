use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// A correlation coefficient and its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub coefficient: f64,
    pub p_value: f64,
    /// False when one of the series has no variation, in which case the
    /// coefficient is reported as 0 with p = 1.
    pub defined: bool,
}

/// 1-based ranks; tied values share the average of the ranks they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order = (0..n).collect::<Vec<usize>>();
    order.sort_by(|&left, &right| values[left].total_cmp(&values[right]));

    let mut ranks = vec![0.0; n];
    let mut start = 0usize;
    while start < n {
        let value = values[order[start]];
        let mut end = start + 1;
        while end < n && values[order[end]] == value {
            end += 1;
        }
        let shared = (start + end + 1) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = shared;
        }
        start = end;
    }

    ranks
}

pub fn spearman(x: &[f64], y: &[f64]) -> Correlation {
    pearson(&average_ranks(x), &average_ranks(y))
}

pub fn pearson(x: &[f64], y: &[f64]) -> Correlation {
    let n = x.len().min(y.len());
    if n < 2 {
        return undefined_correlation();
    }

    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut den_x = 0.0;
    let mut den_y = 0.0;
    for (xi, yi) in x[..n].iter().zip(&y[..n]) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    if den_x == 0.0 || den_y == 0.0 {
        return undefined_correlation();
    }

    let coefficient = (num / (den_x * den_y).sqrt()).clamp(-1.0, 1.0);
    Correlation {
        coefficient,
        p_value: correlation_p_value(coefficient, n),
        defined: true,
    }
}

/// Two-sided p-value from the t approximation with `n - 2` degrees of freedom.
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return 0.0;
    }
    let t = r * (df / denom).sqrt();
    student_t_two_sided_p(t, df)
}

/// Two-sided tail probability of a Student t statistic. A NaN statistic or a
/// non-positive `df` carries no evidence and maps to 1.
pub fn student_t_two_sided_p(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        return 1.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(distribution) => (2.0 * distribution.sf(t.abs())).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

fn undefined_correlation() -> Correlation {
    Correlation {
        coefficient: 0.0,
        p_value: 1.0,
        defined: false,
    }
}
