use crate::config::{ExperimentConfig, LongBlockMode};
use rand::Rng;
use rhex_core::{Actor, LongCondition, Synchrony, TrialDescriptor};
use std::collections::VecDeque;

/// Balanced 4×4 Latin square over the long-condition indices
/// (0 Self-Sync, 1 Self-Async, 2 Other-Sync, 3 Other-Async). Row = group.
pub const LATIN_SQUARE: [[usize; 4]; 4] = [[0, 1, 3, 2], [1, 2, 0, 3], [2, 3, 1, 0], [3, 0, 2, 1]];

/// Per-session counterbalancing choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counterbalance {
    /// Latin-square row, `0..=3`
    pub group: usize,
    pub self_first: bool,
}

impl Counterbalance {
    /// Out-of-range groups are clamped to the last row.
    pub fn new(group: usize, self_first: bool) -> Self {
        let clamped = group.min(LATIN_SQUARE.len() - 1);
        if clamped != group {
            log::warn!("Latin-square group {group} out of range, using {clamped}");
        }
        Self {
            group: clamped,
            self_first,
        }
    }

    /// Cycles the four rows over consecutive participants and alternates actor order.
    pub fn for_participant(number: u32) -> Self {
        let n = number.max(1);
        Self::new(((n - 1) % 4) as usize, n % 2 == 1)
    }

    /// Explicit config values win over the participant-derived defaults.
    pub fn resolve(config: &ExperimentConfig, participant_number: u32) -> Self {
        let derived = Self::for_participant(participant_number);
        Self::new(
            config.latin_square_group.unwrap_or(derived.group),
            config.self_first.unwrap_or(derived.self_first),
        )
    }

    pub fn long_order(&self) -> [LongCondition; 4] {
        LATIN_SQUARE[self.group].map(LongCondition::from_index)
    }
}

/// In-place Fisher–Yates: for each `i`, swap with a uniform pick from `i..n`.
pub fn shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    let n = items.len();
    for i in 0..n {
        let j = rng.random_range(i..n);
        items.swap(i, j);
    }
}

/// Ordered, pop-only queue of the session's trials
#[derive(Debug, Clone, Default)]
pub struct TrialQueue {
    trials: VecDeque<TrialDescriptor>,
    total: usize,
}

impl TrialQueue {
    pub fn pop(&mut self) -> Option<TrialDescriptor> {
        self.trials.pop_front()
    }

    pub fn peek(&self) -> Option<&TrialDescriptor> {
        self.trials.front()
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Size at construction
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrialDescriptor> {
        self.trials.iter()
    }
}

impl FromIterator<TrialDescriptor> for TrialQueue {
    fn from_iter<I: IntoIterator<Item = TrialDescriptor>>(iter: I) -> Self {
        let trials: VecDeque<_> = iter.into_iter().collect();
        let total = trials.len();
        Self { trials, total }
    }
}

/// Builds the trial sequence for one session.
pub struct TrialCatalog<'a, R: Rng> {
    config: &'a ExperimentConfig,
    counterbalance: Counterbalance,
    rng: &'a mut R,
}

impl<'a, R: Rng> TrialCatalog<'a, R> {
    pub fn new(config: &'a ExperimentConfig, counterbalance: Counterbalance, rng: &'a mut R) -> Self {
        Self {
            config,
            counterbalance,
            rng,
        }
    }

    pub fn practice_block(&self) -> Vec<TrialDescriptor> {
        if !self.config.include_practice {
            return Vec::new();
        }
        (1..=self.config.practice_trials)
            .map(|n| TrialDescriptor::practice(n, self.config.practice_duration_s))
            .collect()
    }

    /// Equally spaced delays from 0 to the maximum, in whole milliseconds.
    pub fn threshold_delays(&self) -> Vec<u32> {
        let steps = self.config.threshold_steps;
        if steps <= 1 {
            return if steps == 1 { vec![0] } else { Vec::new() };
        }
        let step = self.config.max_threshold_delay_ms / (steps - 1);
        (0..steps).map(|i| i * step).collect()
    }

    /// Every delay repeated `threshold_repetitions` times for one actor, shuffled.
    pub fn threshold_block(&mut self, actor: Actor) -> Vec<TrialDescriptor> {
        let duration = self.config.threshold_duration_s;
        let repetitions = self.config.threshold_repetitions;
        let mut block: Vec<_> = self
            .threshold_delays()
            .into_iter()
            .flat_map(|delay| {
                (0..repetitions).map(move |_| TrialDescriptor::threshold(actor, delay, duration))
            })
            .collect();
        shuffle(&mut block, &mut *self.rng);
        block
    }

    fn long_trial(&self, condition: LongCondition) -> TrialDescriptor {
        TrialDescriptor::long(
            condition.actor,
            condition.synchrony,
            self.config.long_async_delay_ms,
            self.config.long_duration_s,
        )
    }

    /// The four long conditions in this session's Latin-square order.
    pub fn long_block(&self) -> Vec<TrialDescriptor> {
        self.counterbalance
            .long_order()
            .into_iter()
            .map(|c| self.long_trial(c))
            .collect()
    }

    /// One actor's Sync/Async pair in random order.
    pub fn long_pair(&mut self, actor: Actor) -> Vec<TrialDescriptor> {
        let mut pair = vec![
            self.long_trial(LongCondition::new(actor, Synchrony::Sync)),
            self.long_trial(LongCondition::new(actor, Synchrony::Async)),
        ];
        shuffle(&mut pair, &mut *self.rng);
        pair
    }

    pub fn build(mut self) -> TrialQueue {
        let mut trials = self.practice_block();
        let actors = Actor::ordered(self.counterbalance.self_first);

        match self.config.long_block_mode {
            LongBlockMode::LatinSquare => {
                for actor in actors {
                    trials.extend(self.threshold_block(actor));
                }
                trials.extend(self.long_block());
            }
            LongBlockMode::ShuffledPerActor => {
                for actor in actors {
                    trials.extend(self.threshold_block(actor));
                    trials.extend(self.long_pair(actor));
                }
            }
        }

        log::info!(
            "catalog: {} trials, group {}, {} first, {:?} long block",
            trials.len(),
            self.counterbalance.group,
            actors[0],
            self.config.long_block_mode
        );
        trials.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rhex_core::TrialPhase;

    fn conditions(trials: &[TrialDescriptor]) -> Vec<String> {
        trials
            .iter()
            .map(|t| format!("{}-{}", t.actor.label(), t.synchrony().label()))
            .collect()
    }

    #[test]
    fn threshold_steps_are_66ms_apart() {
        let config = ExperimentConfig {
            threshold_steps: 10,
            max_threshold_delay_ms: 594,
            threshold_repetitions: 3,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut catalog = TrialCatalog::new(&config, Counterbalance::new(0, true), &mut rng);
        assert_eq!(
            catalog.threshold_delays(),
            vec![0, 66, 132, 198, 264, 330, 396, 462, 528, 594]
        );

        let block = catalog.threshold_block(Actor::Experimenter);
        assert_eq!(block.len(), 30);
        for delay in (0..=594).step_by(66) {
            assert_eq!(block.iter().filter(|t| t.delay_ms == delay).count(), 3);
        }
        assert!(block.iter().all(|t| t.actor == Actor::Experimenter));
        assert!(block.iter().all(|t| t.phase == TrialPhase::Threshold));
    }

    #[test]
    fn degenerate_step_counts() {
        let mut rng = StdRng::seed_from_u64(1);
        let one = ExperimentConfig {
            threshold_steps: 1,
            ..Default::default()
        };
        assert_eq!(
            TrialCatalog::new(&one, Counterbalance::new(0, true), &mut rng).threshold_delays(),
            vec![0]
        );
        let none = ExperimentConfig {
            threshold_steps: 0,
            ..Default::default()
        };
        assert!(
            TrialCatalog::new(&none, Counterbalance::new(0, true), &mut rng)
                .threshold_delays()
                .is_empty()
        );
    }

    #[test]
    fn latin_square_rows_give_expected_long_orders() {
        let config = ExperimentConfig::default();
        let mut rng = StdRng::seed_from_u64(7);

        let group0 = TrialCatalog::new(&config, Counterbalance::new(0, true), &mut rng).long_block();
        assert_eq!(
            conditions(&group0),
            ["Self-Sync", "Self-Async", "Other-Async", "Other-Sync"]
        );

        let group2 = TrialCatalog::new(&config, Counterbalance::new(2, true), &mut rng).long_block();
        assert_eq!(
            conditions(&group2),
            ["Other-Sync", "Other-Async", "Self-Async", "Self-Sync"]
        );
    }

    #[test]
    fn latin_square_is_balanced() {
        for col in 0..4 {
            let mut seen: Vec<_> = LATIN_SQUARE.iter().map(|row| row[col]).collect();
            seen.sort();
            assert_eq!(seen, vec![0, 1, 2, 3]);
        }
        // every ordered pair of neighbours appears exactly once
        let mut pairs = std::collections::HashSet::new();
        for row in LATIN_SQUARE {
            for w in row.windows(2) {
                assert!(pairs.insert((w[0], w[1])));
            }
        }
        assert_eq!(pairs.len(), 12);
    }

    #[test]
    fn async_long_trials_use_target_delay() {
        let config = ExperimentConfig {
            long_async_delay_ms: 800,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let block = TrialCatalog::new(&config, Counterbalance::new(1, true), &mut rng).long_block();
        for t in &block {
            match t.synchrony() {
                Synchrony::Sync => assert_eq!(t.delay_ms, 0),
                Synchrony::Async => assert_eq!(t.delay_ms, 800),
            }
        }
    }

    #[test]
    fn session_order_is_practice_threshold_long() {
        let config = ExperimentConfig {
            threshold_steps: 3,
            threshold_repetitions: 2,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let queue = TrialCatalog::new(&config, Counterbalance::new(3, false), &mut rng).build();
        let trials: Vec<_> = queue.iter().cloned().collect();
        assert_eq!(queue.total(), 3 + 6 + 6 + 4);

        assert!(trials[..3].iter().all(|t| t.is_practice && t.delay_ms == 0));
        assert!(trials[3..9].iter().all(|t| t.actor == Actor::Experimenter));
        assert!(trials[9..15].iter().all(|t| t.actor == Actor::Participant));
        assert_eq!(
            conditions(&trials[15..]),
            ["Other-Async", "Self-Sync", "Other-Sync", "Self-Async"]
        );
    }

    #[test]
    fn practice_can_be_disabled() {
        let config = ExperimentConfig {
            include_practice: false,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let queue = TrialCatalog::new(&config, Counterbalance::new(0, true), &mut rng).build();
        assert!(queue.iter().all(|t| !t.is_practice));
    }

    #[test]
    fn shuffled_per_actor_interleaves_long_pairs() {
        let config = ExperimentConfig {
            include_practice: false,
            threshold_steps: 2,
            threshold_repetitions: 1,
            long_block_mode: LongBlockMode::ShuffledPerActor,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let trials: Vec<_> = TrialCatalog::new(&config, Counterbalance::new(0, true), &mut rng)
            .build()
            .iter()
            .cloned()
            .collect();
        let phases: Vec<_> = trials.iter().map(|t| (t.phase, t.actor)).collect();
        use Actor::*;
        use TrialPhase::*;
        assert_eq!(
            phases,
            [
                (Threshold, Participant),
                (Threshold, Participant),
                (Long, Participant),
                (Long, Participant),
                (Threshold, Experimenter),
                (Threshold, Experimenter),
                (Long, Experimenter),
                (Long, Experimenter),
            ]
        );
    }

    #[test]
    fn same_seed_same_queue() {
        let config = ExperimentConfig::default();
        let build = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            TrialCatalog::new(&config, Counterbalance::new(1, true), &mut rng)
                .build()
                .iter()
                .map(|t| t.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(build(42), build(42));
        assert_ne!(build(42), build(43));
    }

    #[test]
    fn shuffle_keeps_every_element() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        assert_ne!(items, sorted);
    }

    #[test]
    fn counterbalance_cycles_over_participants() {
        let cb: Vec<_> = (1..=5).map(Counterbalance::for_participant).collect();
        assert_eq!(cb.iter().map(|c| c.group).collect::<Vec<_>>(), [0, 1, 2, 3, 0]);
        assert_eq!(
            cb.iter().map(|c| c.self_first).collect::<Vec<_>>(),
            [true, false, true, false, true]
        );
    }

    #[test]
    fn config_overrides_and_clamps_group() {
        let config = ExperimentConfig {
            latin_square_group: Some(9),
            self_first: Some(false),
            ..Default::default()
        };
        let cb = Counterbalance::resolve(&config, 1);
        assert_eq!(cb, Counterbalance { group: 3, self_first: false });
    }
}
