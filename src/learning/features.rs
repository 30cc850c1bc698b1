use crate::Key;
use crate::counter::Counter;

/// Maps a (state, action) pair to a sparse feature vector.
pub trait FeatureExtractor<S, A> {
    type Feature: Key;

    fn features(&self, state: &S, action: &A) -> Counter<Self::Feature>;
}

impl<S, A, K, F> FeatureExtractor<S, A> for F
where
    K: Key,
    F: Fn(&S, &A) -> Counter<K>,
{
    type Feature = K;

    fn features(&self, state: &S, action: &A) -> Counter<K> {
        self(state, action)
    }
}

/// One indicator feature per (state, action) pair. A linear Q-function over
/// these features is equivalent to a Q-table.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityExtractor;

impl<S: Key, A: Key> FeatureExtractor<S, A> for IdentityExtractor {
    type Feature = (S, A);

    fn features(&self, state: &S, action: &A) -> Counter<(S, A)> {
        let mut features = Counter::new();
        features.set((state.clone(), action.clone()), 1.0);
        features
    }
}
