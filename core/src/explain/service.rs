use super::fallback::{fallback_explanation, FALLBACK_ENGINE_NAME};
use super::prompt::{ExplanationInput, Prompt};
use super::{ExplanationRecord, GenerationError, TextGenerator};
use crate::types::{
    PipelineConfig, DEFAULT_EXPLANATION_CACHE_CAPACITY, DEFAULT_EXPLANATION_TIMEOUT_MS,
};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Lifecycle of one cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplanationState {
    /// Nothing requested yet
    None,
    /// A caller is generating; others wait for it
    Generating,
    /// Stored and returned verbatim from now on
    Cached,
}

#[derive(Default)]
struct Slot {
    gate: Mutex<()>,
    record: OnceLock<ExplanationRecord>,
}

impl Slot {
    fn state(&self) -> ExplanationState {
        if self.is_stored() {
            ExplanationState::Cached
        } else if self.gate.try_lock().is_none() {
            ExplanationState::Generating
        } else {
            ExplanationState::None
        }
    }

    fn is_stored(&self) -> bool {
        self.record.get().is_some()
    }
}

/// Cache entries in insertion order, bounded by `capacity`
struct SlotTable {
    slots: HashMap<Uuid, Arc<Slot>>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl SlotTable {
    fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, key: &Uuid) -> Option<&Arc<Slot>> {
        self.slots.get(key)
    }

    fn get_or_insert(&mut self, key: Uuid) -> Arc<Slot> {
        if let Some(slot) = self.slots.get(&key) {
            return Arc::clone(slot);
        }
        let slot = Arc::new(Slot::default());
        self.slots.insert(key, Arc::clone(&slot));
        self.order.push_back(key);
        self.evict();
        slot
    }

    /// Drops the oldest stored entries until the table fits its capacity
    ///
    /// Entries without a record are still being generated and are skipped,
    /// so the table may briefly exceed its capacity.
    fn evict(&mut self) {
        while self.slots.len() > self.capacity {
            let slots = &self.slots;
            let oldest = self
                .order
                .iter()
                .position(|key| slots.get(key).map_or(true, |slot| slot.is_stored()));
            match oldest.and_then(|index| self.order.remove(index)) {
                Some(key) => {
                    if self.slots.remove(&key).is_some() {
                        debug!("Evicted explanation for {}", key);
                    }
                }
                None => break,
            }
        }
    }

    fn remove_stored(&mut self, key: Uuid) -> Option<ExplanationRecord> {
        let record = self.slots.get(&key)?.record.get().cloned()?;
        self.slots.remove(&key);
        self.order.retain(|k| *k != key);
        Some(record)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Generates and caches one explanation per prediction
///
/// Cache entries are keyed by prediction id. The first request for a key
/// generates; concurrent requests for the same key block until it is stored
/// and then get the same record. Requests for different keys never wait on
/// each other.
///
/// The cache holds at most `explanation_cache_capacity` stored records and
/// evicts the oldest first. An evicted or forgotten key is generated again
/// on its next request.
///
/// # Example
///
/// ```
/// use tirads_core::explain::{ExplanationInput, ExplanationService, ExplanationState};
/// use tirads_core::rules::score;
/// use tirads_core::{Composition, EchogenicFoci, Echogenicity, FeatureSet, Margin, Shape};
/// use uuid::Uuid;
///
/// let service = ExplanationService::fallback_only();
/// let features = FeatureSet::certain(
///     Composition::Solid,
///     Echogenicity::Hypoechoic,
///     Shape::WiderThanTall,
///     Margin::Smooth,
///     EchogenicFoci::None,
/// );
/// let input = ExplanationInput::from_result(&score(&features));
/// let id = Uuid::new_v4();
///
/// let first = service.explain(id, &input);
/// assert!(first.is_fallback);
/// assert_eq!(service.state(id), ExplanationState::Cached);
/// assert_eq!(service.explain(id, &input), first);
/// ```
pub struct ExplanationService {
    generator: Option<Arc<dyn TextGenerator>>,
    enabled: bool,
    timeout: Duration,
    slots: Mutex<SlotTable>,
}

impl ExplanationService {
    /// Creates a service backed by `generator`
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, config: &PipelineConfig) -> Self {
        Self {
            generator,
            enabled: config.llm_explanations,
            timeout: config.explanation_timeout(),
            slots: Mutex::new(SlotTable::new(config.explanation_cache_capacity)),
        }
    }

    /// Creates a service that always uses the rule-based template
    pub fn fallback_only() -> Self {
        Self {
            generator: None,
            enabled: false,
            timeout: Duration::from_millis(DEFAULT_EXPLANATION_TIMEOUT_MS),
            slots: Mutex::new(SlotTable::new(DEFAULT_EXPLANATION_CACHE_CAPACITY)),
        }
    }

    /// Returns the configured generator's engine name, if it may be called
    pub fn engine_name(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.generator.as_deref().map(|g| g.engine_name())
    }

    /// Returns the explanation for `key`, generating it on first request
    ///
    /// Never fails: generator errors, blank text and timeouts produce a
    /// fallback record.
    pub fn explain(&self, key: Uuid, input: &ExplanationInput) -> ExplanationRecord {
        let slot = self.slot(key);
        if let Some(record) = slot.record.get() {
            return record.clone();
        }

        let _guard = slot.gate.lock();
        if let Some(record) = slot.record.get() {
            debug!("Explanation for {} generated by a concurrent request", key);
            return record.clone();
        }

        let record = self.generate(input);
        slot.record.get_or_init(|| record).clone()
    }

    /// Returns the cached record for `key` without generating
    pub fn cached(&self, key: Uuid) -> Option<ExplanationRecord> {
        let slot = self.slots.lock().get(&key).cloned()?;
        slot.record.get().cloned()
    }

    /// Removes the stored record for `key` and returns it
    ///
    /// A key that is still being generated is left in place and `None` is
    /// returned.
    pub fn forget(&self, key: Uuid) -> Option<ExplanationRecord> {
        self.slots.lock().remove_stored(key)
    }

    /// Returns the lifecycle state for `key`
    pub fn state(&self, key: Uuid) -> ExplanationState {
        match self.slots.lock().get(&key) {
            Some(slot) => slot.state(),
            None => ExplanationState::None,
        }
    }

    /// Number of cache entries
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: Uuid) -> Arc<Slot> {
        self.slots.lock().get_or_insert(key)
    }

    fn generate(&self, input: &ExplanationInput) -> ExplanationRecord {
        let start = Instant::now();

        match self.call_generator(input) {
            Ok((text, engine_name)) => {
                let generation_time_ms = start.elapsed().as_millis() as u64;
                info!(
                    "Generated explanation with {} in {} ms",
                    engine_name, generation_time_ms
                );
                ExplanationRecord {
                    text,
                    engine_name,
                    is_fallback: false,
                    generated_at: Utc::now(),
                    input_snapshot: input.clone(),
                    fallback_reason: None,
                    generation_time_ms,
                }
            }
            Err(reason) => {
                match reason {
                    GenerationError::Disabled => debug!("Using rule-based explanation: {}", reason),
                    _ => warn!("Using rule-based explanation: {}", reason),
                }
                ExplanationRecord {
                    text: fallback_explanation(input),
                    engine_name: FALLBACK_ENGINE_NAME.to_string(),
                    is_fallback: true,
                    generated_at: Utc::now(),
                    input_snapshot: input.clone(),
                    fallback_reason: Some(reason),
                    generation_time_ms: start.elapsed().as_millis() as u64,
                }
            }
        }
    }

    fn call_generator(
        &self,
        input: &ExplanationInput,
    ) -> std::result::Result<(String, String), GenerationError> {
        if !self.enabled {
            return Err(GenerationError::Disabled);
        }
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| GenerationError::Unavailable("no text generator configured".into()))?;

        let prompt = Prompt::for_input(input);
        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(generator);
        thread::Builder::new()
            .name("tirads-explain".into())
            .spawn(move || {
                let _ = tx.send(worker.generate(&prompt));
            })
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;

        let text = match rx.recv_timeout(self.timeout) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                return Err(GenerationError::Timeout(self.timeout.as_millis() as u64))
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(GenerationError::Transport(
                    "generator thread exited without a result".into(),
                ))
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok((text.to_string(), generator.engine_name().to_string()))
    }
}
