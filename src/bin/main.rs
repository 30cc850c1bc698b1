use bellman::{
    Counter, Result,
    config::{AgentKind, Config},
    learning::{
        QFunction, ValueEstimationAgent, q_learning::QLearningAgent,
        value_iteration::ValueIterationAgent,
    },
    mdp::{LegalActions, Mdp, MdpActions, TabularMdp},
    simulation::Simulation,
};
use itertools::Itertools;
use log::info;
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

const LENGTH: u8 = 6;
const SLIP: f64 = 0.1;
const STEP_REWARD: f64 = -0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
enum Move {
    Left,
    Right,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Tile {
    Cell(u8),
    Done,
}

/// A corridor of `LENGTH` cells. Moves slip the opposite way with
/// probability `SLIP`. Exiting at the left end pays 1, at the right end 10.
fn corridor() -> TabularMdp<Tile, Move> {
    let mut mdp = TabularMdp::new(Tile::Cell(1));
    let last = LENGTH - 1;
    for i in 0..LENGTH {
        let here = Tile::Cell(i);
        let left = Tile::Cell(i.saturating_sub(1));
        let right = Tile::Cell((i + 1).min(last));
        for mv in Move::iter() {
            match mv {
                Move::Left => {
                    mdp.add_transition(here, mv, left, 1.0 - SLIP, STEP_REWARD);
                    mdp.add_transition(here, mv, right, SLIP, STEP_REWARD);
                }
                Move::Right => {
                    mdp.add_transition(here, mv, right, 1.0 - SLIP, STEP_REWARD);
                    mdp.add_transition(here, mv, left, SLIP, STEP_REWARD);
                }
                Move::Exit if i == 0 => {
                    mdp.add_transition(here, mv, Tile::Done, 1.0, 1.0);
                }
                Move::Exit if i == last => {
                    mdp.add_transition(here, mv, Tile::Done, 1.0, 10.0);
                }
                Move::Exit => {}
            }
        }
    }
    mdp
}

/// Per-action bias and position features.
fn corridor_features(tile: &Tile, mv: &Move) -> Counter<(Move, &'static str)> {
    let mut features = Counter::new();
    features.set((*mv, "bias"), 1.0);
    if let Tile::Cell(i) = tile {
        features.set((*mv, "position"), f64::from(*i) / f64::from(LENGTH - 1));
    }
    features
}

#[derive(Debug, Serialize)]
struct StateReport {
    state: String,
    planned_value: f64,
    planned_policy: Option<String>,
    learned_value: f64,
    learned_policy: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report {
    agent: AgentKind,
    sweeps: usize,
    episodes: usize,
    average_test_reward: Option<f64>,
    states: Vec<StateReport>,
}

fn learn<L, Q>(
    config: &Config,
    mdp: &TabularMdp<Tile, Move>,
    planner: &ValueIterationAgent<&TabularMdp<Tile, Move>>,
    mut agent: QLearningAgent<Tile, Move, L, Q>,
) -> Report
where
    L: LegalActions<Tile, Move>,
    Q: QFunction<Tile, Move>,
{
    let mut sim = Simulation::new(mdp, &config.simulation);
    let outcomes = sim.run(&mut agent, config.simulation.episodes);

    let testing = &outcomes[config.rl.num_training.min(outcomes.len())..];
    let average_test_reward = (!testing.is_empty())
        .then(|| testing.iter().map(|o| o.total_reward).sum::<f64>() / testing.len() as f64);

    let states = mdp
        .states()
        .into_iter()
        .sorted()
        .map(|state| StateReport {
            state: format!("{state:?}"),
            planned_value: planner.value(&state),
            planned_policy: planner.greedy_action(&state).map(|mv| mv.to_string()),
            learned_value: agent.get_value(&state),
            learned_policy: agent.get_policy(&state).map(|mv| mv.to_string()),
        })
        .collect();

    Report {
        agent: config.rl.agent,
        sweeps: planner.sweeps(),
        episodes: outcomes.len(),
        average_test_reward,
        states,
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    info!("Running with {config:?}");

    let mdp = corridor();
    let planner = ValueIterationAgent::new(
        &mdp,
        config.value_iteration.discount,
        config.value_iteration.iterations,
    );
    info!(
        "Value iteration: V(start) = {:.4} after {} sweeps",
        planner.value(&mdp.start_state()),
        planner.sweeps()
    );

    let report = match config.rl.agent {
        AgentKind::QLearning => learn(
            &config,
            &mdp,
            &planner,
            QLearningAgent::tabular(MdpActions(&mdp), &config.rl),
        ),
        AgentKind::Approximate => learn(
            &config,
            &mdp,
            &planner,
            QLearningAgent::approximate(corridor_features, MdpActions(&mdp), &config.rl),
        ),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
