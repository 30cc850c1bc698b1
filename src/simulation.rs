use log::{debug, info};
use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::learning::QFunction;
use crate::learning::q_learning::QLearningAgent;
use crate::mdp::{LegalActions, Mdp};

/// Summary of one simulated episode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub steps: usize,
    pub total_reward: f64,
    pub discounted_return: f64,
}

/// Drives a learner through an MDP by sampling its transitions.
#[derive(Debug)]
pub struct Simulation<'a, M: Mdp> {
    mdp: &'a M,
    max_steps: usize,
    rng: StdRng,
}

impl<'a, M: Mdp> Simulation<'a, M> {
    pub fn new(mdp: &'a M, config: &SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Simulation {
            mdp,
            max_steps: config.max_steps,
            rng,
        }
    }

    /// Samples the successor of taking `action` in `state`. `None` if the
    /// action has no successors with positive probability.
    pub fn sample_transition(
        &mut self,
        state: &M::State,
        action: &M::Action,
    ) -> Option<(M::State, f64)> {
        let successors = self.mdp.transition_states_and_probs(state, action);
        let dist = WeightedIndex::new(successors.iter().map(|(_, prob)| *prob)).ok()?;
        let (next_state, _) = successors.into_iter().nth(dist.sample(&mut self.rng))?;
        let reward = self.mdp.reward(state, action, &next_state);
        Some((next_state, reward))
    }

    /// Runs one episode from the start state. The episode ends when the
    /// agent has no action to take, the chosen action has no successor, or
    /// the step limit is reached.
    pub fn run_episode<L, Q>(
        &mut self,
        agent: &mut QLearningAgent<M::State, M::Action, L, Q>,
    ) -> EpisodeOutcome
    where
        L: LegalActions<M::State, M::Action>,
        Q: QFunction<M::State, M::Action>,
    {
        let mut outcome = EpisodeOutcome::default();
        let mut discount = 1.0;
        let mut state = self.mdp.start_state();

        agent.start_episode();
        while outcome.steps < self.max_steps {
            let Some(action) = agent.get_action(&state) else {
                break;
            };
            let Some((next_state, reward)) = self.sample_transition(&state, &action) else {
                break;
            };
            agent.observe_transition(&state, &action, &next_state, reward);

            outcome.steps += 1;
            outcome.total_reward += reward;
            outcome.discounted_return += discount * reward;
            discount *= agent.discount();
            state = next_state;
        }
        agent.stop_episode();
        outcome
    }

    /// Runs `episodes` episodes and returns their outcomes in order.
    pub fn run<L, Q>(
        &mut self,
        agent: &mut QLearningAgent<M::State, M::Action, L, Q>,
        episodes: usize,
    ) -> Vec<EpisodeOutcome>
    where
        L: LegalActions<M::State, M::Action>,
        Q: QFunction<M::State, M::Action>,
    {
        let mut outcomes = Vec::with_capacity(episodes);
        for episode in 1..=episodes {
            let outcome = self.run_episode(agent);
            debug!(
                "Episode {episode}: {} steps, return {:.3}",
                outcome.steps, outcome.discounted_return
            );
            outcomes.push(outcome);
            if episode % 100 == 0 {
                let recent = &outcomes[outcomes.len() - 100..];
                let avg = recent.iter().map(|o| o.total_reward).sum::<f64>() / recent.len() as f64;
                info!("Episode {episode}: average reward over last 100 episodes {avg:.3}");
            }
        }
        outcomes
    }
}
