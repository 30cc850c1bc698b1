//! Offline value iteration over a fully specified MDP.

use log::debug;

use crate::counter::Counter;
use crate::learning::ValueEstimationAgent;
use crate::mdp::Mdp;

/// Runs synchronous value iteration on construction and then acts greedily
/// with respect to the resulting values.
///
/// Every sweep computes each state's new value from the previous sweep's
/// table only, then replaces the whole table at once.
#[derive(Debug, Clone)]
pub struct ValueIterationAgent<M: Mdp> {
    mdp: M,
    discount: f64,
    values: Counter<M::State>,
    sweeps: usize,
}

impl<M: Mdp> ValueIterationAgent<M> {
    /// Runs `iterations` sweeps before returning.
    pub fn new(mdp: M, discount: f64, iterations: usize) -> Self {
        let mut agent = Self::unsolved(mdp, discount);
        for _ in 0..iterations {
            agent.sweep();
        }
        agent
    }

    /// An agent with all values at zero; drive it with [`Self::sweep`].
    pub fn unsolved(mdp: M, discount: f64) -> Self {
        ValueIterationAgent {
            mdp,
            discount,
            values: Counter::new(),
            sweeps: 0,
        }
    }

    /// Performs one synchronous Bellman backup of every state and returns
    /// the largest absolute change in value.
    pub fn sweep(&mut self) -> f64 {
        let mut update = Counter::new();
        for state in self.mdp.states() {
            // Terminal states are left out and read as 0.
            let best = self
                .mdp
                .possible_actions(&state)
                .iter()
                .map(|action| self.backup(&state, action))
                .max_by(f64::total_cmp);
            if let Some(best) = best {
                update.set(state, best);
            }
        }

        let max_change = update
            .iter()
            .map(|(state, value)| (value - self.values.get(state)).abs())
            .chain(
                self.values
                    .iter()
                    .filter(|(state, _)| !update.contains_key(state))
                    .map(|(_, value)| value.abs()),
            )
            .fold(0.0, f64::max);

        self.values = update;
        self.sweeps += 1;
        debug!("Value iteration sweep {}: max change {max_change:.6}", self.sweeps);
        max_change
    }

    /// Σ P(s'|s,a) · [R(s,a,s') + γ V(s')] under the current table.
    fn backup(&self, state: &M::State, action: &M::Action) -> f64 {
        self.mdp
            .transition_states_and_probs(state, action)
            .into_iter()
            .map(|(next_state, prob)| {
                prob * (self.mdp.reward(state, action, &next_state)
                    + self.discount * self.values.get(&next_state))
            })
            .sum()
    }

    /// Q-value with an optional action; `None` gives the state value.
    pub fn q_value_or_value(&self, state: &M::State, action: Option<&M::Action>) -> f64 {
        match action {
            Some(action) => self.backup(state, action),
            None => self.values.get(state),
        }
    }

    /// Greedy action with respect to Σ P(s'|s,a) V(s').
    ///
    /// The comparison is made after every next-state term, not only on the
    /// full sum, and a tie replaces the current best. So the last action to
    /// reach the running maximum at any point of its sum is returned.
    pub fn greedy_action(&self, state: &M::State) -> Option<M::Action> {
        let mut max_val = f64::NEG_INFINITY;
        let mut arg_max = None;

        for action in self.mdp.possible_actions(state) {
            let mut val = 0.0;
            for (next_state, prob) in self.mdp.transition_states_and_probs(state, &action) {
                val += prob * self.values.get(&next_state);
                if max_val <= val {
                    max_val = val;
                    arg_max = Some(action.clone());
                }
            }
        }
        arg_max
    }

    pub fn values(&self) -> &Counter<M::State> {
        &self.values
    }

    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn mdp(&self) -> &M {
        &self.mdp
    }
}

impl<M: Mdp> ValueEstimationAgent<M::State, M::Action> for ValueIterationAgent<M> {
    fn value(&self, state: &M::State) -> f64 {
        self.values.get(state)
    }

    fn q_value(&self, state: &M::State, action: &M::Action) -> f64 {
        self.backup(state, action)
    }

    fn policy(&mut self, state: &M::State) -> Option<M::Action> {
        self.greedy_action(state)
    }

    /// No exploration: always the policy.
    fn action(&mut self, state: &M::State) -> Option<M::Action> {
        self.greedy_action(state)
    }
}
