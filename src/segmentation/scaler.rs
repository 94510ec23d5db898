use ndarray::{Array1, Array2, Axis};

/// Column-wise z-score standardization.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub means: Array1<f64>,
    /// Population standard deviation per column.
    pub stds: Array1<f64>,
}

impl StandardScaler {
    /// Returns `None` for a matrix with no rows.
    pub fn fit(data: &Array2<f64>) -> Option<Self> {
        let means = data.mean_axis(Axis(0))?;
        let stds = data.std_axis(Axis(0), 0.0);
        Some(Self { means, stds })
    }

    /// Zero-variance columns map to 0 instead of dividing by zero.
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut out = data - &self.means;
        for (mut col, std) in out.axis_iter_mut(Axis(1)).zip(self.stds.iter()) {
            if *std > 0.0 {
                col.mapv_inplace(|v| v / std);
            } else {
                col.fill(0.0);
            }
        }
        out
    }

    pub fn inverse_transform(&self, scaled: &Array2<f64>) -> Array2<f64> {
        let mut out = scaled.clone();
        for (mut col, std) in out.axis_iter_mut(Axis(1)).zip(self.stds.iter()) {
            if *std > 0.0 {
                col.mapv_inplace(|v| v * std);
            } else {
                col.fill(0.0);
            }
        }
        out + &self.means
    }
}
