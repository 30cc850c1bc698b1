pub mod episode;
pub mod features;
pub mod linear;
pub mod q_learning;
pub mod q_table;
pub mod value_iteration;

/// Queries shared by every agent that estimates values.
pub trait ValueEstimationAgent<S, A> {
    /// V(state). `0.0` for terminal states.
    fn value(&self, state: &S) -> f64;

    /// Q(state, action).
    fn q_value(&self, state: &S, action: &A) -> f64;

    /// Best action in `state`, `None` if there are no legal actions.
    fn policy(&mut self, state: &S) -> Option<A>;

    /// Action to take in `state`, which may differ from the policy while exploring.
    fn action(&mut self, state: &S) -> Option<A>;
}

/// The part of a Q-learner that differs between the tabular and the
/// approximate variants.
pub trait QFunction<S, A> {
    fn q_value(&self, state: &S, action: &A) -> f64;

    /// Move the estimate for (`state`, `action`) towards `target` with step
    /// size `alpha`.
    fn update(&mut self, state: &S, action: &A, target: f64, alpha: f64);

    /// Called once when the training budget has been used up.
    fn on_training_complete(&self) {}
}
