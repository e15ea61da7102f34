//! Loader/executor state machine.
//!
//! `Executor::new` performs no resolution. `init_execution_plan` moves the
//! executor from `Unloaded` to `Loaded` (or to the terminal `Failed`), and
//! `execute` interprets the loaded plan: chains in order, instructions in
//! order, kernel arguments in declared order. The interpreter loop does no
//! lookups and no allocation.
use std::time::Instant;

use crate::config::ExecutorConfig;
use crate::error::{Error, Result};
use crate::memory::MemoryManager;
use crate::program::Program;
use crate::registry::{KernelArgs, OperatorRegistry};
use crate::trace::{TraceEvent, TraceEventKind};
use crate::value::EValue;

mod loader;
mod plan;

pub use plan::{BoundOperator, Chain, Instruction, Kernel, LoadedPlan};

enum LoadState<'p> {
    Unloaded,
    Loaded(LoadedPlan<'p>),
    Failed,
}

impl LoadState<'_> {
    fn name(&self) -> &'static str {
        match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Loaded(_) => "loaded",
            LoadState::Failed => "failed",
        }
    }
}

pub struct Executor<'p> {
    program: &'p Program,
    memory: MemoryManager<'p>,
    registry: &'p OperatorRegistry,
    config: ExecutorConfig,
    state: LoadState<'p>,
    trace: Vec<TraceEvent>,
}

impl<'p> Executor<'p> {
    pub fn new(
        program: &'p Program,
        memory: MemoryManager<'p>,
        registry: &'p OperatorRegistry,
    ) -> Self {
        Self::with_config(program, memory, registry, ExecutorConfig::from_env())
    }

    pub fn with_config(
        program: &'p Program,
        memory: MemoryManager<'p>,
        registry: &'p OperatorRegistry,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            program,
            memory,
            registry,
            config,
            state: LoadState::Unloaded,
            trace: Vec::new(),
        }
    }

    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    pub fn memory(&self) -> &MemoryManager<'p> {
        &self.memory
    }

    /// Resolve plan `index` against the pools and the registry.
    pub fn init_execution_plan(&mut self, index: usize) -> Result<()> {
        if !matches!(self.state, LoadState::Unloaded) {
            return Err(Error::InvalidState {
                expected: "unloaded",
                found: self.state.name(),
            });
        }
        match loader::load_plan(self.program, index, &mut self.memory, self.registry) {
            Ok(plan) => {
                if self.config.trace {
                    self.trace = Vec::with_capacity(plan.num_instructions());
                }
                self.state = LoadState::Loaded(plan);
                Ok(())
            }
            Err(err) => {
                crate::error!("failed to load execution plan {}: {}", index, err);
                self.state = LoadState::Failed;
                Err(err)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded(_))
    }

    pub fn plan(&self) -> Result<&LoadedPlan<'p>> {
        match &self.state {
            LoadState::Loaded(plan) => Ok(plan),
            other => Err(Error::InvalidState {
                expected: "loaded",
                found: other.name(),
            }),
        }
    }

    fn plan_mut(&mut self) -> Result<&mut LoadedPlan<'p>> {
        match &mut self.state {
            LoadState::Loaded(plan) => Ok(plan),
            other => Err(Error::InvalidState {
                expected: "loaded",
                found: other.name(),
            }),
        }
    }

    /// Value at the `pos`-th plan input.
    pub fn input(&self, pos: usize) -> Result<&EValue<'p>> {
        let plan = self.plan()?;
        let idx = boundary(plan.inputs(), pos, "plan input")?;
        Ok(&plan.values[idx])
    }

    /// Value at the `pos`-th plan output.
    pub fn output(&self, pos: usize) -> Result<&EValue<'p>> {
        let plan = self.plan()?;
        let idx = boundary(plan.outputs(), pos, "plan output")?;
        Ok(&plan.values[idx])
    }

    /// Replace a non-tensor plan input. Tensor inputs are filled in place
    /// through [`crate::Tensor::copy_from_slice`].
    pub fn set_input(&mut self, pos: usize, value: EValue<'p>) -> Result<()> {
        let plan = self.plan_mut()?;
        let idx = boundary(plan.inputs(), pos, "plan input")?;
        let slot = &mut plan.values[idx];
        if slot.is_tensor() || value.is_tensor() || slot.tag() != value.tag() {
            return Err(Error::TypeMismatch {
                expected: slot.tag().name(),
                actual: value.tag().name(),
            });
        }
        *slot = value;
        Ok(())
    }

    /// Events recorded by the last `execute` when tracing is enabled.
    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    /// Run every chain of the loaded plan once.
    ///
    /// Recorded trace events are logged after the last chain; the chains
    /// themselves run without allocating.
    pub fn execute(&mut self) -> Result<()> {
        let Self {
            state,
            trace,
            config,
            ..
        } = self;
        let plan = match state {
            LoadState::Loaded(plan) => plan,
            other => {
                return Err(Error::InvalidState {
                    expected: "loaded",
                    found: other.name(),
                })
            }
        };
        trace.clear();
        let LoadedPlan {
            values,
            chains,
            operators,
            ..
        } = plan;

        for (chain_index, chain) in chains.iter().enumerate() {
            for (instruction_index, instruction) in chain.instructions.iter().enumerate() {
                match *instruction {
                    Instruction::CallKernel { kernel_index } => {
                        let kernel = &chain.kernels[kernel_index];
                        let started = config.timer.then(Instant::now);
                        let mut args = KernelArgs::trusted(&mut values[..], &kernel.args);
                        if let Err(source) = (kernel.function)(&mut args) {
                            let op = &operators[kernel.op_index].name;
                            crate::error!(
                                "operator {} failed at chain {}, instruction {}: {:#}",
                                op,
                                chain_index,
                                instruction_index,
                                source
                            );
                            return Err(Error::KernelFailed {
                                op: op.clone(),
                                chain: chain_index,
                                instruction: instruction_index,
                                source: source.into(),
                            });
                        }
                        if config.trace {
                            let micros = started
                                .map(|start| start.elapsed().as_micros() as u64)
                                .unwrap_or(0);
                            let event = TraceEvent {
                                kind: TraceEventKind::CallKernel,
                                chain_index,
                                instruction_index,
                                kernel_index,
                                op_index: kernel.op_index,
                                micros,
                            };
                            trace.push(event);
                        }
                    }
                    Instruction::Unsupported { opcode } => {
                        crate::critical!(
                            "unsupported opcode {} at chain {}, instruction {}",
                            opcode,
                            chain_index,
                            instruction_index
                        );
                        return Err(Error::UnsupportedOpcode {
                            chain: chain_index,
                            instruction: instruction_index,
                            opcode,
                        });
                    }
                }
            }
        }
        for event in trace.iter() {
            crate::trace!("{} {}", event, operators[event.op_index].name);
        }
        Ok(())
    }
}

fn boundary(indices: &[usize], pos: usize, what: &'static str) -> Result<usize> {
    indices.get(pos).copied().ok_or(Error::IndexOutOfRange {
        what,
        index: pos as i64,
        len: indices.len(),
    })
}
