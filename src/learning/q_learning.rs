//! Online Q-learning, tabular and linear.
//!
//! [`QLearningAgent`] holds everything the two variants share: the
//! exploration policy, the value and policy queries, the temporal-difference
//! target and the episode bookkeeping. The [`QFunction`] it is parameterized
//! over decides how Q-values are stored and corrected.

use std::marker::PhantomData;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::Key;
use crate::config::RlConfig;
use crate::counter::Counter;
use crate::learning::episode::EpisodeTracker;
use crate::learning::features::FeatureExtractor;
use crate::learning::linear::LinearQFunction;
use crate::learning::q_table::QTable;
use crate::learning::{QFunction, ValueEstimationAgent};
use crate::mdp::LegalActions;

pub type TabularQAgent<S, A, L> = QLearningAgent<S, A, L, QTable<S, A>>;
pub type ApproximateQAgent<S, A, L, X> = QLearningAgent<S, A, L, LinearQFunction<S, A, X>>;

fn build_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[derive(Debug, Clone)]
pub struct QLearningAgent<S, A, L, Q> {
    q: Q,
    legal_actions: L,
    /// Learning rate.
    alpha: f64,
    /// Exploration probability.
    epsilon: f64,
    discount: f64,
    rng: StdRng,
    episodes: EpisodeTracker,
    _marker: PhantomData<fn(&S) -> A>,
}

impl<S, A, L> TabularQAgent<S, A, L>
where
    S: Key,
    A: Key,
    L: LegalActions<S, A>,
{
    pub fn tabular(legal_actions: L, config: &RlConfig) -> Self {
        QLearningAgent::new(QTable::new(), legal_actions, config)
    }

    pub fn q_table(&self) -> &QTable<S, A> {
        &self.q
    }
}

impl<S, A, L, X> ApproximateQAgent<S, A, L, X>
where
    S: Key,
    A: Key,
    L: LegalActions<S, A>,
    X: FeatureExtractor<S, A>,
{
    pub fn approximate(extractor: X, legal_actions: L, config: &RlConfig) -> Self {
        QLearningAgent::new(LinearQFunction::new(extractor), legal_actions, config)
    }

    pub fn weights(&self) -> &Counter<X::Feature> {
        self.q.weights()
    }
}

impl<S, A, L, Q> QLearningAgent<S, A, L, Q>
where
    S: Key,
    A: Key,
    L: LegalActions<S, A>,
    Q: QFunction<S, A>,
{
    pub fn new(q: Q, legal_actions: L, config: &RlConfig) -> Self {
        QLearningAgent {
            q,
            legal_actions,
            alpha: config.alpha,
            epsilon: config.epsilon,
            discount: config.discount,
            rng: build_rng(config.seed),
            episodes: EpisodeTracker::new(config.num_training),
            _marker: PhantomData,
        }
    }

    /// Replaces the random source used for exploration and tie-breaking.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn legal_actions(&self, state: &S) -> Vec<A> {
        self.legal_actions.legal_actions(state)
    }

    pub fn get_q_value(&self, state: &S, action: &A) -> f64 {
        self.q.q_value(state, action)
    }

    /// Max Q-value over the legal actions, but never below `0.0`.
    pub fn get_value(&self, state: &S) -> f64 {
        self.legal_actions(state)
            .iter()
            .map(|action| self.get_q_value(state, action))
            .fold(0.0, f64::max)
    }

    /// A uniformly random choice among the legal actions with the highest
    /// Q-value.
    pub fn get_policy(&mut self, state: &S) -> Option<A> {
        let scored: Vec<(A, f64)> = self
            .legal_actions(state)
            .into_iter()
            .map(|action| {
                let q = self.get_q_value(state, &action);
                (action, q)
            })
            .collect();

        let max_val = scored
            .iter()
            .map(|(_, q)| *q)
            .fold(f64::NEG_INFINITY, f64::max);
        let max_actions: Vec<&A> = scored
            .iter()
            .filter(|(_, q)| *q == max_val)
            .map(|(action, _)| action)
            .collect();

        max_actions.choose(&mut self.rng).map(|action| (*action).clone())
    }

    /// Epsilon-greedy: a random legal action with probability epsilon,
    /// otherwise the policy.
    pub fn get_action(&mut self, state: &S) -> Option<A> {
        let legal_actions = self.legal_actions(state);
        if legal_actions.is_empty() {
            return None;
        }
        let r: f64 = self.rng.random();
        if r < self.epsilon {
            legal_actions.choose(&mut self.rng).cloned()
        } else {
            self.get_policy(state)
        }
    }

    /// Temporal-difference update for one observed transition.
    ///
    /// Q(s, a) moves towards `reward + discount * V(next_state)` by a step of
    /// size alpha. Must be called by the driver, once per transition.
    pub fn update(&mut self, state: &S, action: &A, next_state: &S, reward: f64) {
        let target = reward + self.discount * self.get_value(next_state);
        self.q.update(state, action, target, self.alpha);
    }

    pub fn start_episode(&mut self) {
        self.episodes.start_episode();
    }

    /// Records the reward for the running episode, then updates.
    pub fn observe_transition(&mut self, state: &S, action: &A, next_state: &S, reward: f64) {
        self.episodes.record_reward(reward);
        self.update(state, action, next_state, reward);
    }

    /// Closes the running episode. Once the training budget is spent the
    /// agent stops exploring and stops learning.
    pub fn stop_episode(&mut self) {
        let training_complete = self.episodes.stop_episode();
        debug!(
            "Episode {} finished with reward {:.3}",
            self.episodes.episodes_so_far(),
            self.episodes.episode_rewards()
        );
        if training_complete {
            info!(
                "Finished {} training episodes, accumulated reward {:.3}",
                self.episodes.num_training,
                self.episodes.accum_train_rewards()
            );
            self.q.on_training_complete();
        }
        if self.episodes.is_in_testing() {
            self.epsilon = 0.0;
            self.alpha = 0.0;
        }
    }

    pub fn episodes(&self) -> &EpisodeTracker {
        &self.episodes
    }

    pub fn q_function(&self) -> &Q {
        &self.q
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }
}

impl<S, A, L, Q> ValueEstimationAgent<S, A> for QLearningAgent<S, A, L, Q>
where
    S: Key,
    A: Key,
    L: LegalActions<S, A>,
    Q: QFunction<S, A>,
{
    fn value(&self, state: &S) -> f64 {
        self.get_value(state)
    }

    fn q_value(&self, state: &S, action: &A) -> f64 {
        self.get_q_value(state, action)
    }

    fn policy(&mut self, state: &S) -> Option<A> {
        self.get_policy(state)
    }

    fn action(&mut self, state: &S) -> Option<A> {
        self.get_action(state)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::learning::features::IdentityExtractor;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Cell {
        Start,
        Middle,
        End,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Move {
        Left,
        Right,
        Stay,
    }

    fn actions(state: &Cell) -> Vec<Move> {
        match state {
            Cell::End => vec![],
            _ => vec![Move::Left, Move::Right, Move::Stay],
        }
    }

    fn config(alpha: f64, epsilon: f64, discount: f64) -> RlConfig {
        RlConfig {
            alpha,
            epsilon,
            discount,
            num_training: 10,
            seed: Some(7),
            ..RlConfig::default()
        }
    }

    type Actions = fn(&Cell) -> Vec<Move>;

    fn tabular(alpha: f64, epsilon: f64, discount: f64) -> TabularQAgent<Cell, Move, Actions> {
        QLearningAgent::tabular(actions as Actions, &config(alpha, epsilon, discount))
    }

    #[test]
    fn test_unseen_q_values_are_zero() {
        let agent = tabular(0.5, 0.0, 0.9);
        assert_eq!(agent.get_q_value(&Cell::Start, &Move::Left), 0.0);
        assert_eq!(agent.get_value(&Cell::Start), 0.0);
    }

    #[test]
    fn test_terminal_state() {
        let mut agent = tabular(0.5, 1.0, 0.9);
        assert_eq!(agent.get_value(&Cell::End), 0.0);
        assert_eq!(agent.get_policy(&Cell::End), None);
        assert_eq!(agent.get_action(&Cell::End), None);

        // Transitions into and out of terminal states still update.
        agent.update(&Cell::Middle, &Move::Right, &Cell::End, 4.0);
        assert_eq!(agent.get_q_value(&Cell::Middle, &Move::Right), 2.0);
        agent.update(&Cell::End, &Move::Stay, &Cell::End, 2.0);
        assert_eq!(agent.get_q_value(&Cell::End, &Move::Stay), 1.0);
        assert_eq!(agent.get_value(&Cell::End), 0.0);
    }

    #[test]
    fn test_single_update_on_self_loop() {
        let alpha = 0.3;
        let reward = 5.0;
        let mut agent = tabular(alpha, 0.0, 0.9);
        agent.update(&Cell::Start, &Move::Stay, &Cell::Start, reward);
        assert_eq!(agent.get_q_value(&Cell::Start, &Move::Stay), alpha * reward);
    }

    #[test]
    fn test_zero_reward_decays_geometrically() {
        let alpha = 0.25;
        let mut agent = tabular(alpha, 0.0, 0.0);
        agent.update(&Cell::Start, &Move::Left, &Cell::Middle, 8.0);
        let mut expected = alpha * 8.0;
        for _ in 0..20 {
            let before = agent.get_q_value(&Cell::Start, &Move::Left);
            agent.update(&Cell::Start, &Move::Left, &Cell::Middle, 0.0);
            expected *= 1.0 - alpha;
            let after = agent.get_q_value(&Cell::Start, &Move::Left);
            assert!(after < before);
            assert!(after > 0.0);
            assert!((after - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_update_bootstraps_from_next_state() {
        let mut agent = tabular(0.5, 0.0, 0.9);
        agent.q.set(Cell::Middle, Move::Right, 10.0);
        agent.q.set(Cell::Middle, Move::Left, 4.0);
        agent.update(&Cell::Start, &Move::Right, &Cell::Middle, 1.0);
        // 0 + 0.5 * (1 + 0.9 * 10 - 0)
        assert!((agent.get_q_value(&Cell::Start, &Move::Right) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_value_is_floored_at_zero() {
        let mut agent = tabular(1.0, 0.0, 0.9);
        agent.update(&Cell::Start, &Move::Left, &Cell::End, -1.0);
        agent.update(&Cell::Start, &Move::Right, &Cell::End, -2.0);
        agent.update(&Cell::Start, &Move::Stay, &Cell::End, -3.0);
        assert_eq!(agent.get_q_value(&Cell::Start, &Move::Left), -1.0);
        assert_eq!(agent.get_value(&Cell::Start), 0.0);

        agent.update(&Cell::Middle, &Move::Left, &Cell::End, 3.0);
        assert_eq!(agent.get_value(&Cell::Middle), 3.0);
    }

    #[test]
    fn test_policy_picks_the_best_action() {
        let mut agent = tabular(1.0, 0.0, 0.9);
        agent.update(&Cell::Start, &Move::Left, &Cell::End, -1.0);
        agent.update(&Cell::Start, &Move::Right, &Cell::End, 2.0);
        for _ in 0..20 {
            assert_eq!(agent.get_policy(&Cell::Start), Some(Move::Right));
        }
    }

    #[test]
    fn test_policy_with_all_negative_values_picks_the_least_bad() {
        let mut agent = tabular(1.0, 0.0, 0.9);
        agent.update(&Cell::Start, &Move::Left, &Cell::End, -1.0);
        agent.update(&Cell::Start, &Move::Right, &Cell::End, -2.0);
        agent.update(&Cell::Start, &Move::Stay, &Cell::End, -3.0);
        for _ in 0..20 {
            assert_eq!(agent.get_policy(&Cell::Start), Some(Move::Left));
        }
    }

    #[test]
    fn test_policy_breaks_ties_uniformly() {
        let mut agent = tabular(1.0, 0.0, 0.9);
        agent.update(&Cell::Start, &Move::Stay, &Cell::End, -1.0);
        let mut counts = HashMap::new();
        for _ in 0..2000 {
            let action = agent.get_policy(&Cell::Start).unwrap();
            *counts.entry(action).or_insert(0) += 1;
        }
        assert_eq!(counts.get(&Move::Stay), None);
        for action in [Move::Left, Move::Right] {
            let n = counts[&action];
            assert!((800..=1200).contains(&n), "{action:?} chosen {n} times");
        }
    }

    #[test]
    fn test_greedy_action_follows_policy() {
        let mut agent = tabular(1.0, 0.0, 0.9);
        agent.update(&Cell::Middle, &Move::Stay, &Cell::End, 1.0);
        for _ in 0..50 {
            assert_eq!(agent.get_action(&Cell::Middle), Some(Move::Stay));
            assert_eq!(agent.get_action(&Cell::Middle), agent.get_policy(&Cell::Middle));
        }
    }

    #[test]
    fn test_full_exploration_is_uniform() {
        let mut agent = tabular(1.0, 1.0, 0.9);
        agent.update(&Cell::Middle, &Move::Stay, &Cell::End, 100.0);
        let mut counts = HashMap::new();
        let trials = 3000;
        for _ in 0..trials {
            let action = agent.get_action(&Cell::Middle).unwrap();
            *counts.entry(action).or_insert(0) += 1;
        }
        for action in actions(&Cell::Middle) {
            let n = counts[&action];
            assert!((800..=1200).contains(&n), "{action:?} chosen {n} times");
        }
    }

    #[test]
    fn test_seeded_agents_are_reproducible() {
        let run = || {
            let mut agent = tabular(0.5, 0.5, 0.9);
            (0..100)
                .map(|_| agent.get_action(&Cell::Start).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());

        let mut a = tabular(0.5, 1.0, 0.9).with_rng(StdRng::seed_from_u64(1));
        let mut b = tabular(0.5, 1.0, 0.9).with_rng(StdRng::seed_from_u64(1));
        for _ in 0..50 {
            assert_eq!(a.get_action(&Cell::Start), b.get_action(&Cell::Start));
        }
    }

    #[test]
    fn test_training_budget_stops_exploration_and_learning() {
        let mut agent = QLearningAgent::tabular(
            actions as Actions,
            &RlConfig {
                num_training: 2,
                ..config(0.5, 0.8, 0.9)
            },
        );
        for episode in 0..2 {
            assert!(agent.episodes().is_in_training());
            agent.start_episode();
            agent.observe_transition(&Cell::Start, &Move::Right, &Cell::End, 1.0);
            agent.stop_episode();
            if episode == 0 {
                assert_eq!(agent.epsilon(), 0.8);
            }
        }
        assert!(agent.episodes().is_in_testing());
        assert_eq!(agent.epsilon(), 0.0);
        assert_eq!(agent.alpha(), 0.0);
        assert_eq!(agent.episodes().accum_train_rewards(), 2.0);

        let learned = agent.get_q_value(&Cell::Start, &Move::Right);
        assert_eq!(learned, 0.75);
        agent.start_episode();
        agent.observe_transition(&Cell::Start, &Move::Right, &Cell::End, 100.0);
        agent.stop_episode();
        assert_eq!(agent.get_q_value(&Cell::Start, &Move::Right), learned);
        assert_eq!(agent.episodes().accum_test_rewards(), 100.0);
    }

    #[test]
    fn test_approximate_single_feature_matches_tabular_formula() {
        let alpha = 0.2;
        let discount = 0.8;
        let constant = |_: &Cell, _: &Move| -> Counter<&'static str> {
            [("f", 1.0)].into_iter().collect()
        };
        let mut agent = QLearningAgent::approximate(
            constant,
            actions as Actions,
            &config(alpha, 0.0, discount),
        );

        let transitions = [
            (Cell::Start, Move::Right, Cell::Middle, 1.0),
            (Cell::Middle, Move::Stay, Cell::Middle, -0.5),
            (Cell::Middle, Move::Right, Cell::End, 3.0),
            (Cell::Start, Move::Left, Cell::Start, 0.0),
        ];
        let mut w: f64 = 0.0;
        for (s, a, next, r) in transitions {
            let next_value = if actions(&next).is_empty() { 0.0 } else { w.max(0.0) };
            w += alpha * (r + discount * next_value - w);
            agent.update(&s, &a, &next, r);
            assert!((agent.weights().get(&"f") - w).abs() < 1e-12);
            assert!((agent.get_q_value(&s, &a) - w).abs() < 1e-12);
        }
    }

    #[test]
    fn test_identity_features_match_tabular_agent() {
        let cfg = config(0.5, 0.0, 0.9);
        let mut table = QLearningAgent::tabular(actions as Actions, &cfg);
        let mut linear = QLearningAgent::approximate(
            IdentityExtractor,
            actions as Actions,
            &cfg,
        );
        let transitions = [
            (Cell::Start, Move::Right, Cell::Middle, 0.0),
            (Cell::Middle, Move::Right, Cell::End, 10.0),
            (Cell::Start, Move::Right, Cell::Middle, 0.0),
            (Cell::Middle, Move::Left, Cell::Start, -1.0),
            (Cell::Start, Move::Stay, Cell::Start, 0.5),
        ];
        for (s, a, next, r) in transitions {
            table.update(&s, &a, &next, r);
            linear.update(&s, &a, &next, r);
        }
        for state in [Cell::Start, Cell::Middle] {
            for action in actions(&state) {
                let expected = table.get_q_value(&state, &action);
                assert!((linear.get_q_value(&state, &action) - expected).abs() < 1e-12);
            }
            assert!((linear.get_value(&state) - table.get_value(&state)).abs() < 1e-12);
        }
        assert_eq!(linear.weights().len(), table.q_table().len());
    }

    #[test]
    fn test_approximate_terminal_state() {
        let mut agent = QLearningAgent::approximate(
            IdentityExtractor,
            actions as Actions,
            &config(0.5, 1.0, 0.9),
        );
        assert_eq!(agent.get_value(&Cell::End), 0.0);
        assert_eq!(agent.get_policy(&Cell::End), None);
        assert_eq!(agent.get_action(&Cell::End), None);
    }
}
