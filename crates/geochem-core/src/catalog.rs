use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::code_tables::KeyedSample;
use crate::config::{ProductConfig, RepeatPolicy};
use crate::model::{ColumnKey, SampleId};

/// The dynamic part of the output header, fixed before any row is assembled.
///
/// `keys` lists one entry per slot in discovery order; `slots` maps each key to
/// the positions it occupies in `keys`, in ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnCatalog {
    keys: Vec<ColumnKey>,
    slots: HashMap<ColumnKey, Vec<usize>>,
    publication_width: usize,
    capped_keys: Vec<ColumnKey>,
}

impl ColumnCatalog {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Slot-ordered keys; a key appears once per slot it owns.
    pub fn keys(&self) -> &[ColumnKey] {
        &self.keys
    }

    pub fn slots_for(&self, key: &ColumnKey) -> &[usize] {
        self.slots.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn slot_count(&self, key: &ColumnKey) -> usize {
        self.slots_for(key).len()
    }

    pub fn distinct_keys(&self) -> usize {
        self.slots.len()
    }

    /// Largest number of publication links held by any one sample.
    pub fn publication_width(&self) -> usize {
        self.publication_width
    }

    /// Keys for which some sample needed more slots than the cap allowed.
    pub fn capped_keys(&self) -> &[ColumnKey] {
        &self.capped_keys
    }
}

#[derive(Debug)]
struct KeyState {
    slots: Vec<usize>,
    last_sample: SampleId,
    run: usize,
}

/// Single pass over the keyed measurement stream that discovers the catalog.
#[derive(Debug)]
pub struct SchemaAccumulator {
    max_repeats: usize,
    policy: RepeatPolicy,
    keys: Vec<ColumnKey>,
    states: HashMap<ColumnKey, KeyState>,
    publication_width: usize,
    capped: BTreeSet<ColumnKey>,
}

impl SchemaAccumulator {
    pub fn new(max_repeats: usize, policy: RepeatPolicy) -> Self {
        Self {
            max_repeats: max_repeats.max(1),
            policy,
            keys: Vec::new(),
            states: HashMap::new(),
            publication_width: 0,
            capped: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &ProductConfig) -> Self {
        Self::new(config.max_repeats, config.repeat_policy)
    }

    pub fn observe_sample(&mut self, sample: &KeyedSample<'_>) {
        let sample_id = sample.sample.sample_id;
        for entry in &sample.measurements {
            self.observe(sample_id, &entry.key);
        }
        self.publication_width = self.publication_width.max(sample.publications.len());
    }

    /// Records one occurrence of `key` for `sample_id`.
    ///
    /// A key seen for the first time always gets a slot. A repeat for the
    /// sample that last produced the key counts towards that sample's run; a
    /// repeat for any other sample starts a new run. Under
    /// [`RepeatPolicy::PerSample`] a slot is appended only when the current
    /// run outgrows the key's slots; under [`RepeatPolicy::PerOccurrence`]
    /// every repeat appends. Neither appends past `max_repeats` slots.
    pub fn observe(&mut self, sample_id: SampleId, key: &ColumnKey) {
        let Some(state) = self.states.get_mut(key) else {
            let slot = self.keys.len();
            self.keys.push(key.clone());
            self.states.insert(
                key.clone(),
                KeyState {
                    slots: vec![slot],
                    last_sample: sample_id,
                    run: 1,
                },
            );
            return;
        };

        if state.last_sample == sample_id {
            state.run += 1;
        } else {
            state.last_sample = sample_id;
            state.run = 1;
        }

        let demanded = state.run > state.slots.len();
        let under_cap = state.slots.len() < self.max_repeats;
        let append = under_cap && (demanded || self.policy == RepeatPolicy::PerOccurrence);

        if append {
            state.slots.push(self.keys.len());
            self.keys.push(key.clone());
        } else if demanded {
            debug!(sample_id, column = %key, cap = self.max_repeats, "Repeat cap reached");
            self.capped.insert(key.clone());
        }
    }

    pub fn finish(self) -> ColumnCatalog {
        let slots = self
            .states
            .into_iter()
            .map(|(key, state)| (key, state.slots))
            .collect();
        ColumnCatalog {
            keys: self.keys,
            slots,
            publication_width: self.publication_width,
            capped_keys: self.capped.into_iter().collect(),
        }
    }
}

/// Runs the accumulator over every sample, in order.
pub fn build_catalog(samples: &[KeyedSample<'_>], config: &ProductConfig) -> ColumnCatalog {
    let mut accumulator = SchemaAccumulator::from_config(config);
    for sample in samples {
        accumulator.observe_sample(sample);
    }
    accumulator.finish()
}
