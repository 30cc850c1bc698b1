use std::marker::PhantomData;

use log::{info, trace};

use crate::counter::Counter;
use crate::learning::QFunction;
use crate::learning::features::FeatureExtractor;

/// Linear Q-function: `Q(s, a) = w · features(s, a)`.
#[derive(Debug, Clone)]
pub struct LinearQFunction<S, A, X: FeatureExtractor<S, A>> {
    extractor: X,
    weights: Counter<X::Feature>,
    _marker: PhantomData<fn(&S, &A)>,
}

impl<S, A, X: FeatureExtractor<S, A>> LinearQFunction<S, A, X> {
    pub fn new(extractor: X) -> Self {
        LinearQFunction {
            extractor,
            weights: Counter::new(),
            _marker: PhantomData,
        }
    }

    pub fn weights(&self) -> &Counter<X::Feature> {
        &self.weights
    }

    pub fn extractor(&self) -> &X {
        &self.extractor
    }
}

impl<S, A, X: FeatureExtractor<S, A>> QFunction<S, A> for LinearQFunction<S, A, X> {
    fn q_value(&self, state: &S, action: &A) -> f64 {
        self.weights.dot(&self.extractor.features(state, action))
    }

    fn update(&mut self, state: &S, action: &A, target: f64, alpha: f64) {
        let features = self.extractor.features(state, action);
        let correction = target - self.weights.dot(&features);
        for (feature, value) in features {
            trace!("w[{feature:?}] += {:.6}", alpha * correction * value);
            *self.weights.entry(feature) += alpha * correction * value;
        }
    }

    fn on_training_complete(&self) {
        info!("Training complete with {} weights", self.weights.len());
        for (feature, weight) in self.weights.sorted_desc() {
            info!("  {feature:?}: {weight:.4}");
        }
    }
}
