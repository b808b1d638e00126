use serde::{Deserialize, Serialize};

/// Who strokes the hand during stimulation
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    /// The participant strokes their own hand ("Self")
    Participant,
    /// The experimenter strokes the participant's hand ("Other")
    Experimenter,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Synchrony {
    Sync,
    Async,
}

/// One of the four long-exposure conditions.
///
/// Indices follow the counterbalancing table: 0 Self-Sync, 1 Self-Async,
/// 2 Other-Sync, 3 Other-Async.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub struct LongCondition {
    pub actor: Actor,
    pub synchrony: Synchrony,
}

impl Actor {
    pub fn label(&self) -> &'static str {
        match self {
            Actor::Participant => "Self",
            Actor::Experimenter => "Other",
        }
    }

    /// Actor order for the two per-actor blocks of a session.
    pub fn ordered(self_first: bool) -> [Actor; 2] {
        if self_first {
            [Actor::Participant, Actor::Experimenter]
        } else {
            [Actor::Experimenter, Actor::Participant]
        }
    }
}

impl Synchrony {
    pub fn label(&self) -> &'static str {
        match self {
            Synchrony::Sync => "Sync",
            Synchrony::Async => "Async",
        }
    }

    pub fn from_delay_ms(delay_ms: u32) -> Self {
        if delay_ms == 0 {
            Synchrony::Sync
        } else {
            Synchrony::Async
        }
    }
}

impl LongCondition {
    pub const ALL: [LongCondition; 4] = [
        LongCondition::new(Actor::Participant, Synchrony::Sync),
        LongCondition::new(Actor::Participant, Synchrony::Async),
        LongCondition::new(Actor::Experimenter, Synchrony::Sync),
        LongCondition::new(Actor::Experimenter, Synchrony::Async),
    ];

    pub const fn new(actor: Actor, synchrony: Synchrony) -> Self {
        Self { actor, synchrony }
    }

    /// Indices past 3 map to the last condition.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn index(&self) -> usize {
        let actor = match self.actor {
            Actor::Participant => 0,
            Actor::Experimenter => 2,
        };
        let sync = match self.synchrony {
            Synchrony::Sync => 0,
            Synchrony::Async => 1,
        };
        actor + sync
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::fmt::Display for LongCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.actor.label(), self.synchrony.label())
    }
}
