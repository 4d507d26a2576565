//! Mutual exclusion for tanks that share one filling line.

use crate::registry::SessionRegistry;
use crate::types::TankId;

/// Pair table. Holds no session state; it reads statuses from the registry
/// each time it is asked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TankPairArbiter {
    pairs: Vec<(TankId, TankId)>,
}

impl TankPairArbiter {
    /// Pairs are assumed validated (see `LineLayout::validate`).
    pub fn new(pairs: impl IntoIterator<Item = (TankId, TankId)>) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    pub fn pairs(&self) -> &[(TankId, TankId)] {
        &self.pairs
    }

    pub fn partner_of(&self, tank: TankId) -> Option<TankId> {
        self.pairs.iter().find_map(|&(a, b)| {
            if a == tank {
                Some(b)
            } else if b == tank {
                Some(a)
            } else {
                None
            }
        })
    }

    /// The partner that currently prevents `tank` from starting, if any.
    pub fn blocking_partner(&self, tank: TankId, registry: &SessionRegistry) -> Option<TankId> {
        self.partner_of(tank)
            .filter(|p| registry.session(*p).is_ok_and(|s| s.is_filling()))
    }

    pub fn can_start(&self, tank: TankId, registry: &SessionRegistry) -> bool {
        self.blocking_partner(tank, registry).is_none()
    }
}
