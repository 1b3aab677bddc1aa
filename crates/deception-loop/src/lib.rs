pub mod controller;
pub mod delay;
pub mod fault;
pub mod modulator;
pub mod rotator;
pub mod synthesizer;

pub use controller::{DeceptionLoop, HaltReason, LoopState, RoundReport, RunSummary, Transition};
pub use delay::{
    compute_and_wait, effective_scale, pause_for, CountingPacer, Pacer, RecordingPacer, ThreadPacer,
};
pub use fault::{FaultInjector, NoFaults, RandomFaults, ScriptedFaults};
pub use modulator::{modulate, ModulationOutcome};
pub use rotator::PortRotator;
pub use synthesizer::{consequence_delta, ProbeSynthesis, ProbeSynthesizer};
