use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Shapes of a network's trainable parameters, in slot order.
///
/// Stateful optimizers allocate one moment buffer per slot; every update
/// names its slot explicitly, so optimizer state never depends on call order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterLayout {
    pub weight_shapes: Vec<(usize, usize)>,
    pub bias_shapes: Vec<usize>,
}

pub trait Optimizer {
    fn update_weights(
        &mut self,
        slot: usize,
        weights: &mut Array2<f32>,
        gradients: &Array2<f32>,
        learning_rate: f32,
    );

    fn update_biases(
        &mut self,
        slot: usize,
        biases: &mut Array1<f32>,
        gradients: &Array1<f32>,
        learning_rate: f32,
    );

    /// Called once after every parameter of a gradient step has been updated.
    fn end_step(&mut self) {}
}

#[derive(Serialize, Deserialize, Clone)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
    RMSProp(RMSProp),
}

impl Optimizer for OptimizerWrapper {
    fn update_weights(
        &mut self,
        slot: usize,
        weights: &mut Array2<f32>,
        gradients: &Array2<f32>,
        learning_rate: f32,
    ) {
        match self {
            OptimizerWrapper::SGD(optimizer) => {
                optimizer.update_weights(slot, weights, gradients, learning_rate)
            }
            OptimizerWrapper::Adam(optimizer) => {
                optimizer.update_weights(slot, weights, gradients, learning_rate)
            }
            OptimizerWrapper::RMSProp(optimizer) => {
                optimizer.update_weights(slot, weights, gradients, learning_rate)
            }
        }
    }

    fn update_biases(
        &mut self,
        slot: usize,
        biases: &mut Array1<f32>,
        gradients: &Array1<f32>,
        learning_rate: f32,
    ) {
        match self {
            OptimizerWrapper::SGD(optimizer) => {
                optimizer.update_biases(slot, biases, gradients, learning_rate)
            }
            OptimizerWrapper::Adam(optimizer) => {
                optimizer.update_biases(slot, biases, gradients, learning_rate)
            }
            OptimizerWrapper::RMSProp(optimizer) => {
                optimizer.update_biases(slot, biases, gradients, learning_rate)
            }
        }
    }

    fn end_step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.end_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.end_step(),
            OptimizerWrapper::RMSProp(optimizer) => optimizer.end_step(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Default for SGD {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for SGD {
    fn update_weights(
        &mut self,
        _slot: usize,
        weights: &mut Array2<f32>,
        gradients: &Array2<f32>,
        learning_rate: f32,
    ) {
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
    }

    fn update_biases(
        &mut self,
        _slot: usize,
        biases: &mut Array1<f32>,
        gradients: &Array1<f32>,
        learning_rate: f32,
    ) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    pub t: usize,
}

impl Adam {
    pub fn new(layout: &ParameterLayout, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        let m_weights = layout
            .weight_shapes
            .iter()
            .map(|&shape| Array2::zeros(shape))
            .collect::<Vec<_>>();
        let v_weights = m_weights.clone();
        let m_biases = layout
            .bias_shapes
            .iter()
            .map(|&size| Array1::zeros(size))
            .collect::<Vec<_>>();
        let v_biases = m_biases.clone();

        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights,
            v_weights,
            m_biases,
            v_biases,
            t: 1,
        }
    }

    pub fn default_for(layout: &ParameterLayout) -> Self {
        Self::new(layout, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn update_weights(
        &mut self,
        slot: usize,
        weights: &mut Array2<f32>,
        gradients: &Array2<f32>,
        learning_rate: f32,
    ) {
        let (beta1, beta2, t) = (self.beta1, self.beta2, self.t as i32);
        let m = &mut self.m_weights[slot];
        let v = &mut self.v_weights[slot];

        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let m_hat = m.mapv(|x| x / (1.0 - beta1.powi(t)));
        let v_hat = v.mapv(|x| x / (1.0 - beta2.powi(t)));

        *weights -= &((&m_hat / (v_hat.mapv(f32::sqrt) + self.epsilon)) * learning_rate);
    }

    fn update_biases(
        &mut self,
        slot: usize,
        biases: &mut Array1<f32>,
        gradients: &Array1<f32>,
        learning_rate: f32,
    ) {
        let (beta1, beta2, t) = (self.beta1, self.beta2, self.t as i32);
        let m = &mut self.m_biases[slot];
        let v = &mut self.v_biases[slot];

        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let m_hat = m.mapv(|x| x / (1.0 - beta1.powi(t)));
        let v_hat = v.mapv(|x| x / (1.0 - beta2.powi(t)));

        *biases -= &((&m_hat / (v_hat.mapv(f32::sqrt) + self.epsilon)) * learning_rate);
    }

    fn end_step(&mut self) {
        self.t += 1;
    }
}

/// RMSProp optimizer
#[derive(Serialize, Deserialize, Clone)]
pub struct RMSProp {
    pub beta: f32,
    pub epsilon: f32,
    v_weights: Vec<Array2<f32>>,
    v_biases: Vec<Array1<f32>>,
}

impl RMSProp {
    pub fn new(layout: &ParameterLayout, beta: f32, epsilon: f32) -> Self {
        let v_weights = layout
            .weight_shapes
            .iter()
            .map(|&shape| Array2::zeros(shape))
            .collect();
        let v_biases = layout
            .bias_shapes
            .iter()
            .map(|&size| Array1::zeros(size))
            .collect();

        RMSProp {
            beta,
            epsilon,
            v_weights,
            v_biases,
        }
    }

    pub fn default_for(layout: &ParameterLayout) -> Self {
        Self::new(layout, 0.9, 1e-8)
    }
}

impl Optimizer for RMSProp {
    fn update_weights(
        &mut self,
        slot: usize,
        weights: &mut Array2<f32>,
        gradients: &Array2<f32>,
        learning_rate: f32,
    ) {
        let beta = self.beta;
        let v = &mut self.v_weights[slot];
        v.zip_mut_with(gradients, |v, &g| *v = beta * *v + (1.0 - beta) * g * g);
        *weights -= &((gradients / (v.mapv(f32::sqrt) + self.epsilon)) * learning_rate);
    }

    fn update_biases(
        &mut self,
        slot: usize,
        biases: &mut Array1<f32>,
        gradients: &Array1<f32>,
        learning_rate: f32,
    ) {
        let beta = self.beta;
        let v = &mut self.v_biases[slot];
        v.zip_mut_with(gradients, |v, &g| *v = beta * *v + (1.0 - beta) * g * g);
        *biases -= &((gradients / (v.mapv(f32::sqrt) + self.epsilon)) * learning_rate);
    }
}
