//! Material synchronizer
//!
//! Keeps the label materials in step with the parameter set. Every change is
//! classified by
//! [`ParamKey::change_class`](crate::render::materials::ParamKey::change_class):
//!
//! - uniform patches are written straight into an attached ceramic shader
//! - debounced changes arm a quiescence timer; the rebuild reads the
//!   parameters when it fires
//! - structural changes rebuild synchronously and cancel any pending timer
//!
//! Texture loads and timers are both driven from [`MaterialSynchronizer::update`],
//! called once per frame on the render thread.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Instant;

use thiserror::Error;

use crate::assets::{
    AssetError, CacheStats, DerivedTextureSet, FileTextureSource, LoadState, TextureDerivationCache,
    TextureSource,
};
use crate::config::{NormalRecomputePolicy, SyncConfig};
use crate::render::materials::{
    ChangeClass, InvalidParameterError, MaterialFactory, MaterialInstance, MaterialVariant, ParamChange,
    ParamValue, ParameterSet,
};
use crate::scene::{MeshTags, NodeId, SceneApplier, SceneError};

use super::scheduler::{DebounceScheduler, PendingUpdate};

/// Synchronizer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// A texture could not be fetched or decoded
    #[error("Texture load failed: {0}")]
    AssetLoad(#[from] AssetError),

    /// The target node is gone from the scene
    #[error("Target node {0:?} is not in the scene")]
    MissingTarget(NodeId),

    /// A named parameter could not be applied
    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] InvalidParameterError),
}

impl From<SceneError> for SyncError {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::MissingNode(node) => Self::MissingTarget(node),
        }
    }
}

/// Per-target state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Material matches the parameters, or only uniform patches are applied
    Idle,
    /// A debounced rebuild is armed
    PendingRebuild(PendingUpdate),
    /// Waiting for the relief texture; built when it settles
    Loading,
}

/// What happened to a target in response to a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A shader uniform was updated in place
    Patched(NodeId),
    /// A debounced rebuild was armed or re-armed
    Scheduled(PendingUpdate),
    /// A new material was built and attached
    Rebuilt {
        /// Rebuilt node
        target: NodeId,
        /// Variant now attached
        variant: MaterialVariant,
    },
    /// The relief texture is unavailable; the fallback material was attached
    FallbackApplied(NodeId),
    /// Textures are still loading; the target is built once they settle
    AwaitingTextures(NodeId),
    /// The node is gone; the target was dropped
    MissingTarget(NodeId),
}

/// Counters for host diagnostics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    /// Materials built and attached
    pub rebuilds: usize,
    /// In-place uniform patches
    pub patches: usize,
    /// Fallback materials attached
    pub fallbacks: usize,
    /// Debounce timers armed
    pub scheduled: usize,
    /// Pending timers cancelled by a reschedule or a structural rebuild
    pub superseded: usize,
    /// Normal recomputations requested
    pub normal_recomputes: usize,
    /// Targets dropped because their node disappeared
    pub missing_targets: usize,
}

enum ReliefStatus {
    Ready(Rc<DerivedTextureSet>),
    Failed(AssetError),
    Pending,
}

/// Parameter-driven material synchronizer for label nodes
pub struct MaterialSynchronizer {
    params: ParameterSet,
    config: SyncConfig,
    cache: TextureDerivationCache,
    scheduler: DebounceScheduler,
    targets: BTreeMap<NodeId, TargetState>,
    stats: SyncStats,
}

impl MaterialSynchronizer {
    /// Create a synchronizer reading textures from `source`
    pub fn new(config: SyncConfig, params: ParameterSet, source: impl TextureSource + 'static) -> Self {
        if let Err(err) = params.validate() {
            log::warn!("Initial label parameters out of range: {}", err);
        }
        Self {
            scheduler: DebounceScheduler::new(config.debounce_window()),
            cache: TextureDerivationCache::new(source),
            params,
            config,
            targets: BTreeMap::new(),
            stats: SyncStats::default(),
        }
    }

    /// Create a synchronizer reading textures from the configured search paths
    pub fn with_file_source(config: SyncConfig, params: ParameterSet) -> Self {
        let source = FileTextureSource::new(config.texture_search_paths.clone());
        Self::new(config, params, source)
    }

    /// Current parameter snapshot
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Active configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Synchronizer counters
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Texture cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// State of a tracked target
    pub fn target_state(&self, target: NodeId) -> Option<TargetState> {
        self.targets.get(&target).copied()
    }

    /// Tracked targets in key order
    pub fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.targets.keys().copied()
    }

    /// Earliest pending rebuild deadline, for hosts that sleep between frames
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Whether texture decodes are queued for the next [`Self::update`]
    pub fn has_pending_loads(&self) -> bool {
        self.cache.has_pending()
    }

    /// Derived relief textures, once a material has been built from them
    pub fn textures(&self) -> Option<Rc<DerivedTextureSet>> {
        let relief = self.cache.state(&self.config.relief_texture)?;
        self.cache.derived(relief.ready()?.id())
    }

    /// Error of the relief texture load, once it has failed
    pub fn texture_error(&self) -> Option<SyncError> {
        match self.cache.state(&self.config.relief_texture) {
            Some(LoadState::Failed(err)) => Some(SyncError::AssetLoad(err)),
            _ => None,
        }
    }

    /// Start driving `target`'s material
    ///
    /// Requests the relief texture and normal map. If both are already
    /// settled the material is built immediately.
    pub fn attach(&mut self, scene: &mut impl SceneApplier, target: NodeId) -> Result<SyncOutcome, SyncError> {
        if !scene.contains(target) {
            return Err(SyncError::MissingTarget(target));
        }

        log::debug!("Attaching material target {:?}", target);
        self.request_textures();
        self.targets.insert(target, TargetState::Idle);
        Ok(self.rebuild(scene, target))
    }

    /// Stop driving `target`; its attached material is left in place
    pub fn detach(&mut self, target: NodeId) -> bool {
        if self.scheduler.cancel(target).is_some() {
            self.stats.superseded += 1;
        }
        self.targets.remove(&target).is_some()
    }

    /// Apply one parameter change
    ///
    /// The parameter set is updated even when no target is tracked.
    /// Out-of-range values are applied as given and logged.
    pub fn set(&mut self, scene: &mut impl SceneApplier, change: ParamChange, now: Instant) -> Vec<SyncOutcome> {
        if let Err(err) = change.validate() {
            log::warn!("{}", err);
        }
        self.params.apply(change);

        let class = change.key().change_class();
        log::trace!("{} -> {} ({:?})", change.key(), change.value(), class);

        let targets: Vec<NodeId> = self.targets.keys().copied().collect();
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            outcomes.push(self.dispatch(scene, target, &change, class, now));
        }
        outcomes
    }

    /// Apply a change addressed by host binding name
    pub fn set_named(
        &mut self,
        scene: &mut impl SceneApplier,
        name: &str,
        value: ParamValue,
        now: Instant,
    ) -> Result<Vec<SyncOutcome>, SyncError> {
        let change = ParamChange::from_named(name, value)?;
        Ok(self.set(scene, change, now))
    }

    /// Replace the whole parameter set and rebuild every target
    pub fn replace_params(&mut self, scene: &mut impl SceneApplier, params: ParameterSet) -> Vec<SyncOutcome> {
        if let Err(err) = params.validate() {
            log::warn!("Replacement label parameters out of range: {}", err);
        }
        self.params = params;

        let targets: Vec<NodeId> = self.targets.keys().copied().collect();
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            self.cancel_pending(target);
            outcomes.push(self.rebuild(scene, target));
        }
        outcomes
    }

    /// Advance loads and timers; call once per frame
    pub fn update(&mut self, scene: &mut impl SceneApplier, now: Instant) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();

        if self.cache.has_pending() {
            for completion in self.cache.pump() {
                if !completion.succeeded && completion.path == self.config.normal_map {
                    log::warn!("Normal map unavailable; labels render without normal perturbation");
                }
            }
        }

        if self.textures_settled() {
            let loading: Vec<NodeId> = self
                .targets
                .iter()
                .filter(|(_, state)| **state == TargetState::Loading)
                .map(|(target, _)| *target)
                .collect();
            for target in loading {
                outcomes.push(self.rebuild(scene, target));
            }
        }

        for due in self.scheduler.take_due(now) {
            let current = matches!(
                self.targets.get(&due.target),
                Some(TargetState::PendingRebuild(token)) if token.generation == due.generation
            );
            if current {
                log::debug!("Debounced rebuild firing for {:?}", due.target);
                outcomes.push(self.rebuild(scene, due.target));
            } else {
                log::trace!("Dropping stale timer {:?}", due);
            }
        }

        outcomes
    }

    /// Drop every cached texture and reload for all targets
    ///
    /// Pending timers are cancelled; targets keep their current material
    /// until the reload settles.
    pub fn reset_textures(&mut self) {
        log::info!("Resetting label textures for {} targets", self.targets.len());
        self.cache.reset();
        self.request_textures();

        let targets: Vec<NodeId> = self.targets.keys().copied().collect();
        for target in targets {
            self.cancel_pending(target);
            self.targets.insert(target, TargetState::Loading);
        }
    }

    fn dispatch(
        &mut self,
        scene: &mut impl SceneApplier,
        target: NodeId,
        change: &ParamChange,
        class: ChangeClass,
        now: Instant,
    ) -> SyncOutcome {
        if !scene.contains(target) {
            return self.drop_missing(target);
        }
        if self.targets.get(&target) == Some(&TargetState::Loading) {
            return SyncOutcome::AwaitingTextures(target);
        }

        match class {
            ChangeClass::UniformPatch => match self.try_patch(scene, target, change) {
                Some(outcome) => outcome,
                None => self.schedule(target, now),
            },
            ChangeClass::Debounced => self.schedule(target, now),
            ChangeClass::Structural => {
                self.cancel_pending(target);
                self.rebuild(scene, target)
            }
        }
    }

    fn try_patch(
        &mut self,
        scene: &mut impl SceneApplier,
        target: NodeId,
        change: &ParamChange,
    ) -> Option<SyncOutcome> {
        let patch = MaterialFactory::uniform_patch_for(change)?;
        let material = scene.material_mut(target)?;
        if !material.patch_uniform(patch) {
            return None;
        }
        self.stats.patches += 1;
        Some(SyncOutcome::Patched(target))
    }

    fn schedule(&mut self, target: NodeId, now: Instant) -> SyncOutcome {
        let (token, superseded) = self.scheduler.schedule(target, now);
        if superseded {
            self.stats.superseded += 1;
        }
        self.stats.scheduled += 1;
        self.targets.insert(target, TargetState::PendingRebuild(token));
        SyncOutcome::Scheduled(token)
    }

    fn cancel_pending(&mut self, target: NodeId) {
        if let Some(token) = self.scheduler.cancel(target) {
            log::debug!("Superseding pending rebuild {:?}", token);
            self.stats.superseded += 1;
        }
    }

    fn drop_missing(&mut self, target: NodeId) -> SyncOutcome {
        log::warn!("{}", SyncError::MissingTarget(target));
        self.scheduler.cancel(target);
        self.targets.remove(&target);
        self.stats.missing_targets += 1;
        SyncOutcome::MissingTarget(target)
    }

    fn rebuild(&mut self, scene: &mut impl SceneApplier, target: NodeId) -> SyncOutcome {
        let Some(tags) = scene.tags(target) else {
            return self.drop_missing(target);
        };

        let (material, outcome) = match self.relief_status() {
            ReliefStatus::Ready(textures) => {
                let material = MaterialFactory::build(tags, &self.params, &textures);
                let variant = material.variant();
                log::debug!("Rebuilt {:?} material for {:?}", variant, target);
                self.stats.rebuilds += 1;
                (material, SyncOutcome::Rebuilt { target, variant })
            }
            ReliefStatus::Failed(err) => {
                log::warn!("Applying fallback label material to {:?}: {}", target, err);
                self.stats.fallbacks += 1;
                (MaterialFactory::fallback(tags), SyncOutcome::FallbackApplied(target))
            }
            ReliefStatus::Pending => {
                self.targets.insert(target, TargetState::Loading);
                return SyncOutcome::AwaitingTextures(target);
            }
        };

        match self.swap_material(scene, target, tags, material) {
            Ok(()) => {
                self.targets.insert(target, TargetState::Idle);
                outcome
            }
            Err(_) => self.drop_missing(target),
        }
    }

    fn swap_material(
        &mut self,
        scene: &mut impl SceneApplier,
        target: NodeId,
        tags: MeshTags,
        material: MaterialInstance,
    ) -> Result<(), SyncError> {
        let signature = material.displacement_signature();
        let previous = scene.attach_material(target, material)?;

        let recompute = match self.config.normal_recompute {
            NormalRecomputePolicy::Always => true,
            NormalRecomputePolicy::OnGeometryChange => {
                previous.map_or(true, |p| p.displacement_signature() != signature)
            }
        };
        if recompute {
            scene.request_normal_recompute(target)?;
            self.stats.normal_recomputes += 1;
        } else {
            log::trace!("Skipping normal recomputation for {:?} ({:?})", target, tags);
        }
        Ok(())
    }

    fn request_textures(&mut self) {
        self.cache.load(&self.config.relief_texture);
        self.cache.load(&self.config.normal_map);
    }

    fn textures_settled(&self) -> bool {
        let settled = |state: Option<LoadState>| state.map_or(false, |s| s.is_settled());
        settled(self.cache.state(&self.config.relief_texture))
            && settled(self.cache.state(&self.config.normal_map))
    }

    fn relief_status(&mut self) -> ReliefStatus {
        if !self.textures_settled() {
            // Only re-request after a reset dropped the entries
            if self.cache.state(&self.config.relief_texture).is_none() {
                self.request_textures();
            }
            return ReliefStatus::Pending;
        }

        match self.cache.state(&self.config.relief_texture) {
            Some(LoadState::Ready(relief)) => {
                let textures = self.cache.derive(&relief);
                if let Some(LoadState::Ready(normal)) = self.cache.state(&self.config.normal_map) {
                    textures.attach_normal_map(&normal);
                }
                ReliefStatus::Ready(textures)
            }
            Some(LoadState::Failed(err)) => ReliefStatus::Failed(err),
            _ => ReliefStatus::Pending,
        }
    }
}

impl std::fmt::Debug for MaterialSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialSynchronizer")
            .field("targets", &self.targets)
            .field("cache", &self.cache)
            .field("stats", &self.stats)
            .finish()
    }
}
