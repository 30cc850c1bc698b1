//! Collaborator interfaces for Markov decision processes, and an explicit
//! in-memory MDP.

use std::collections::HashMap;

use crate::Key;

/// A finite Markov decision process.
///
/// Probabilities returned by [`Mdp::transition_states_and_probs`] are trusted
/// to be non-negative and to sum to one for each (state, action).
pub trait Mdp {
    type State: Key;
    type Action: Key;

    fn states(&self) -> Vec<Self::State>;

    fn start_state(&self) -> Self::State;

    /// Legal actions in `state`. Empty for terminal states.
    fn possible_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    fn transition_states_and_probs(
        &self,
        state: &Self::State,
        action: &Self::Action,
    ) -> Vec<(Self::State, f64)>;

    fn reward(&self, state: &Self::State, action: &Self::Action, next_state: &Self::State) -> f64;

    fn is_terminal(&self, state: &Self::State) -> bool {
        self.possible_actions(state).is_empty()
    }
}

impl<M: Mdp + ?Sized> Mdp for &M {
    type State = M::State;
    type Action = M::Action;

    fn states(&self) -> Vec<Self::State> {
        (**self).states()
    }

    fn start_state(&self) -> Self::State {
        (**self).start_state()
    }

    fn possible_actions(&self, state: &Self::State) -> Vec<Self::Action> {
        (**self).possible_actions(state)
    }

    fn transition_states_and_probs(
        &self,
        state: &Self::State,
        action: &Self::Action,
    ) -> Vec<(Self::State, f64)> {
        (**self).transition_states_and_probs(state, action)
    }

    fn reward(&self, state: &Self::State, action: &Self::Action, next_state: &Self::State) -> f64 {
        (**self).reward(state, action, next_state)
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        (**self).is_terminal(state)
    }
}

/// Oracle for the legal actions in a state, as used by the Q-learners.
pub trait LegalActions<S, A> {
    fn legal_actions(&self, state: &S) -> Vec<A>;
}

impl<S, A, F> LegalActions<S, A> for F
where
    F: Fn(&S) -> Vec<A>,
{
    fn legal_actions(&self, state: &S) -> Vec<A> {
        self(state)
    }
}

/// Exposes the actions of an [`Mdp`] as a [`LegalActions`] oracle.
#[derive(Debug, Clone, Copy)]
pub struct MdpActions<M>(pub M);

impl<M: Mdp> LegalActions<M::State, M::Action> for MdpActions<M> {
    fn legal_actions(&self, state: &M::State) -> Vec<M::Action> {
        self.0.possible_actions(state)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    pub next_state: S,
    pub probability: f64,
    pub reward: f64,
}

/// An MDP given explicitly as a list of transitions.
///
/// States and actions are reported in insertion order. A state without any
/// outgoing transitions is terminal.
#[derive(Debug, Clone)]
pub struct TabularMdp<S, A> {
    start: S,
    states: Vec<S>,
    actions: HashMap<S, Vec<A>>,
    transitions: HashMap<(S, A), Vec<Transition<S>>>,
}

impl<S: Key, A: Key> TabularMdp<S, A> {
    pub fn new(start: S) -> Self {
        let mut mdp = TabularMdp {
            start: start.clone(),
            states: vec![],
            actions: HashMap::new(),
            transitions: HashMap::new(),
        };
        mdp.add_state(start);
        mdp
    }

    /// Registers a state with no transitions of its own (yet).
    pub fn add_state(&mut self, state: S) -> &mut Self {
        if !self.actions.contains_key(&state) {
            self.actions.insert(state.clone(), vec![]);
            self.states.push(state);
        }
        self
    }

    pub fn add_transition(
        &mut self,
        state: S,
        action: A,
        next_state: S,
        probability: f64,
        reward: f64,
    ) -> &mut Self {
        self.add_state(state.clone());
        self.add_state(next_state.clone());
        let actions = self.actions.entry(state.clone()).or_default();
        if !actions.contains(&action) {
            actions.push(action.clone());
        }
        self.transitions
            .entry((state, action))
            .or_default()
            .push(Transition {
                next_state,
                probability,
                reward,
            });
        self
    }

    /// Consuming form of [`TabularMdp::add_transition`].
    pub fn with_transition(
        mut self,
        state: S,
        action: A,
        next_state: S,
        probability: f64,
        reward: f64,
    ) -> Self {
        self.add_transition(state, action, next_state, probability, reward);
        self
    }

    pub fn transitions(&self, state: &S, action: &A) -> &[Transition<S>] {
        self.transitions
            .get(&(state.clone(), action.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl<S: Key, A: Key> Mdp for TabularMdp<S, A> {
    type State = S;
    type Action = A;

    fn states(&self) -> Vec<S> {
        self.states.clone()
    }

    fn start_state(&self) -> S {
        self.start.clone()
    }

    fn possible_actions(&self, state: &S) -> Vec<A> {
        self.actions.get(state).cloned().unwrap_or_default()
    }

    fn transition_states_and_probs(&self, state: &S, action: &A) -> Vec<(S, f64)> {
        self.transitions(state, action)
            .iter()
            .map(|t| (t.next_state.clone(), t.probability))
            .collect()
    }

    /// Reward of the first listed transition into `next_state`, `0.0` if none.
    fn reward(&self, state: &S, action: &A, next_state: &S) -> f64 {
        self.transitions(state, action)
            .iter()
            .find(|t| &t.next_state == next_state)
            .map_or(0.0, |t| t.reward)
    }
}

impl<S: Key, A: Key> LegalActions<S, A> for TabularMdp<S, A> {
    fn legal_actions(&self, state: &S) -> Vec<A> {
        self.possible_actions(state)
    }
}
