//! Refresh orchestration
//!
//! One `tick` per control-loop frame. Two kinds of work are issued:
//!
//! - **major refresh** (on request or when the reader wraps): rebuild the
//!   tone layer, and the noise layer when configured. Before it starts, the
//!   control thread waits for the previous major and binaural chains, since
//!   both read the buffers it is about to clear.
//! - **binaural refresh** (whenever the previous one has finished): solve
//!   the spatial parameters and mix into the non-stable output instance,
//!   then publish it.
//!
//! ```text
//! major:     tone refresh ─┬─► (noise refresh) ──► major handle
//!
//! binaural:  solve ─────────┬─► clear ──► tone pass ──► noise pass ──► publish
//!            major handle ──┘
//! ```

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::input::TickInputs;
use crate::spatial::{SpatialMixer, SpatialSolver, SpatializationParams};
use crate::synth::{subunit_size, DeviceParams, NoiseSynthesizer, ToneSynthesizer};
use crate::task::{TaskHandle, TaskPool};

use super::output::{OutputReader, StereoOutputPair};

/// Coarse engine state, derived from the outstanding task handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing published yet, nothing running
    Idle,
    /// A major refresh was requested and the next tick starts it
    ///
    /// Set by the reader's wrap or by [`SynthEngine::request_major_refresh`].
    /// An edge carried in [`TickInputs`] goes through the same flag but is
    /// consumed by the tick that carries it, so it is never observed here.
    MajorRefreshPending,
    MajorRefreshRunning,
    BinauralRefreshRunning,
    /// The latest mix is readable and no work is in flight
    Published,
}

/// What happened to the binaural refresh during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinauralRefresh {
    /// A new mix chain was scheduled
    Issued,
    /// The previous chain is still running
    #[default]
    Busy,
    /// The reader is still inside the instance that would be written
    Deferred,
}

/// Outcome of one control-loop step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub major_refresh_started: bool,
    pub binaural: BinauralRefresh,
}

/// The synthesis engine (control-loop side)
pub struct SynthEngine {
    device: DeviceParams,
    subunit: usize,
    refresh_noise: bool,
    pool: TaskPool,
    tone: ToneSynthesizer,
    noise: NoiseSynthesizer,
    solver: SpatialSolver,
    mixer: SpatialMixer,
    output: Arc<StereoOutputPair>,
    /// Latest major refresh (tone, and noise when enabled)
    major: TaskHandle,
    /// Latest binaural chain, up to and including the publish
    binaural: TaskHandle,
}

impl SynthEngine {
    /// Build an engine and the reader for the audio callback
    ///
    /// The noise buffer is filled before this returns; the tone buffer stays
    /// silent until the first major refresh.
    pub fn new(config: EngineConfig, device: DeviceParams) -> EngineResult<(Self, OutputReader)> {
        config.validate()?;
        device.validate()?;
        let pool = TaskPool::new(config.worker_threads)?;
        Self::with_pool(config, device, pool)
    }

    /// Like [`SynthEngine::new`], on a caller-provided pool
    ///
    /// `worker_threads` from the config is ignored.
    pub fn with_pool(
        config: EngineConfig,
        device: DeviceParams,
        pool: TaskPool,
    ) -> EngineResult<(Self, OutputReader)> {
        config.validate()?;
        let subunit = subunit_size(device, config.subunit_ratio)?;

        let tone = ToneSynthesizer::new(config.tone_mode, config.chords(), device.sample_rate, subunit)?;
        let len = tone.buffer().len();

        let noise = NoiseSynthesizer::new(len, config.noise.seed, config.noise.max_amplitude);
        noise.refresh(&pool).wait();

        let solver = SpatialSolver::new(config.geometry(device.sample_rate));
        let mixer = SpatialMixer::new(
            Arc::clone(tone.buffer()),
            Arc::clone(noise.buffer()),
            Arc::clone(solver.slot()),
        )?;

        let output = Arc::new(StereoOutputPair::new(len));
        let reader = OutputReader::new(Arc::clone(&output));

        log::info!(
            "Synth engine ready: {:?}, {}Hz / {} frames, subunit {} samples, buffer {} samples",
            config.tone_mode,
            device.sample_rate,
            device.block_size,
            subunit,
            len
        );

        let engine = Self {
            device,
            subunit,
            refresh_noise: config.refreshes_noise_on_major(),
            pool,
            tone,
            noise,
            solver,
            mixer,
            output,
            major: TaskHandle::completed(),
            binaural: TaskHandle::completed(),
        };
        Ok((engine, reader))
    }

    /// One control-loop step
    ///
    /// Only blocks when a major refresh has to wait for earlier chains.
    pub fn tick(&mut self, inputs: &TickInputs) -> EngineResult<TickReport> {
        let mut report = TickReport::default();

        if inputs.major_refresh_requested {
            self.request_major_refresh();
        }
        if self.output.take_refresh_request() {
            self.start_major_refresh(inputs)?;
            report.major_refresh_started = true;
        }

        report.binaural = self.start_binaural_refresh(inputs)?;
        Ok(report)
    }

    fn start_major_refresh(&mut self, inputs: &TickInputs) -> EngineResult<()> {
        self.binaural.wait();
        self.major.wait();

        let tone = self
            .tone
            .refresh(&self.pool, inputs.base_frequency, inputs.use_major, inputs.gaps)?;
        self.major = if self.refresh_noise {
            let noise = self.noise.refresh(&self.pool);
            self.pool.combine(&[tone, noise])
        } else {
            tone
        };
        self.output.request_rewind();

        log::debug!(
            "Major refresh: {:.3}Hz, {}, gaps {:?}",
            inputs.base_frequency,
            if inputs.use_major { "major" } else { "minor" },
            inputs.gaps
        );
        Ok(())
    }

    fn start_binaural_refresh(&mut self, inputs: &TickInputs) -> EngineResult<BinauralRefresh> {
        if !self.binaural.is_complete() {
            return Ok(BinauralRefresh::Busy);
        }
        let Some(target) = self.output.writable_index() else {
            log::debug!("Binaural refresh deferred: reader still on the target instance");
            return Ok(BinauralRefresh::Deferred);
        };

        let solve = self.solver.schedule(&self.pool, &[], inputs.source_position);
        let instance = Arc::clone(self.output.instance(target));
        let mixed = self.mixer.mix(&self.pool, &[solve, self.major.clone()], &instance)?;

        let output = Arc::clone(&self.output);
        self.binaural = self.pool.schedule(&[mixed], move || output.publish(target));
        Ok(BinauralRefresh::Issued)
    }

    /// Signal a game-state edge between ticks
    pub fn request_major_refresh(&self) {
        self.output.request_refresh();
    }

    /// Block until every scheduled task has finished
    pub fn wait_idle(&self) {
        self.pool.wait_idle();
    }

    /// Join everything and release the engine
    pub fn shutdown(self) {
        drop(self);
    }

    pub fn state(&self) -> EngineState {
        if self.output.refresh_pending() {
            EngineState::MajorRefreshPending
        } else if !self.major.is_complete() {
            EngineState::MajorRefreshRunning
        } else if !self.binaural.is_complete() {
            EngineState::BinauralRefreshRunning
        } else if self.output.published() > 0 {
            EngineState::Published
        } else {
            EngineState::Idle
        }
    }

    /// Parameters of the most recent solve
    pub fn last_params(&self) -> SpatializationParams {
        self.solver.latest()
    }

    pub fn device(&self) -> DeviceParams {
        self.device
    }

    pub fn subunit_size(&self) -> usize {
        self.subunit
    }

    /// Frames per output instance (and per tone/noise buffer)
    pub fn buffer_len(&self) -> usize {
        self.output.len()
    }

    /// Number of mixes published to the reader so far
    pub fn published_cycles(&self) -> u64 {
        self.output.published()
    }
}

impl Drop for SynthEngine {
    fn drop(&mut self) {
        self.pool.wait_idle();
        log::info!(
            "Synth engine stopped after {} published cycles",
            self.output.published()
        );
    }
}
