use log::trace;
use serde::{Deserialize, Serialize};

use crate::Key;
use crate::counter::Counter;
use crate::learning::QFunction;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct QKey<S, A>(pub S, pub A);

impl<S, A> QKey<S, A> {
    pub fn from_tuple(tup: (S, A)) -> QKey<S, A> {
        QKey(tup.0, tup.1)
    }
}

/// Tabular Q-function. Pairs never seen read as `0.0`; entries are created
/// by the first update that touches them.
#[derive(Debug, Clone)]
pub struct QTable<S, A> {
    tab: Counter<QKey<S, A>>,
}

impl<S, A> Default for QTable<S, A> {
    fn default() -> Self {
        QTable {
            tab: Counter::default(),
        }
    }
}

impl<S: Key, A: Key> QTable<S, A> {
    pub fn new() -> Self {
        QTable::default()
    }

    pub fn get(&self, state: &S, action: &A) -> f64 {
        self.tab.get(&QKey(state.clone(), action.clone()))
    }

    pub fn set(&mut self, state: S, action: A, value: f64) {
        self.tab.set(QKey(state, action), value);
    }

    pub fn get_tab(&self) -> &Counter<QKey<S, A>> {
        &self.tab
    }

    /// Number of (state, action) pairs that have been written.
    pub fn len(&self) -> usize {
        self.tab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tab.is_empty()
    }
}

impl<S: Key, A: Key> QFunction<S, A> for QTable<S, A> {
    fn q_value(&self, state: &S, action: &A) -> f64 {
        self.get(state, action)
    }

    fn update(&mut self, state: &S, action: &A, target: f64, alpha: f64) {
        let q = self.tab.entry(QKey(state.clone(), action.clone()));
        let correction = target - *q;
        *q += alpha * correction;
        trace!("Q({state:?}, {action:?}) <- {q:.6} (correction {correction:.6})");
    }
}
