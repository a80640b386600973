use super::{Dispatcher, Job};
use crate::pipeline::{ChunkOutcome, PipelineContext, WireBuffers};

/// The encode side of the pipeline, meant to own the second core.
///
/// Jobs run one at a time, in the order they were pushed, to completion.
pub struct Worker<'a, const N: usize> {
    pipeline: &'a PipelineContext<N>,
    wire: &'a WireBuffers,
    dispatcher: &'a Dispatcher,
}

impl<'a, const N: usize> Worker<'a, N> {
    /// # Safety
    ///
    /// At most one worker may exist for a given pipeline. While a job can be
    /// dispatched to it, nothing else may run the encode side or write the
    /// wire buffers.
    pub unsafe fn new(
        pipeline: &'a PipelineContext<N>,
        wire: &'a WireBuffers,
        dispatcher: &'a Dispatcher,
    ) -> Self {
        Worker {
            pipeline,
            wire,
            dispatcher,
        }
    }

    /// Run one job synchronously.
    pub fn execute(&self, job: Job) -> ChunkOutcome {
        match job {
            Job::Encode(channel) => {
                // SAFETY: This worker is the only encode context (see `new`).
                // Only the DMA engine reads the wire buffer meanwhile.
                unsafe {
                    let wire = self.wire.get_mut(channel);
                    self.pipeline.consume_chunk(wire)
                }
            }
        }
    }

    /// Run every job currently waiting and return how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Some(job) = self.dispatcher.pop() {
            self.execute(job);
            self.dispatcher.complete();
            ran += 1;
        }
        ran
    }

    /// Service jobs until `keep_running` returns false.
    pub fn run_while(&self, mut keep_running: impl FnMut() -> bool) {
        while keep_running() {
            if self.run_pending() == 0 {
                core::hint::spin_loop();
            }
        }
    }

    /// Service jobs forever. This is the second core's entire workload.
    pub fn run(&self) -> ! {
        loop {
            if self.run_pending() == 0 {
                core::hint::spin_loop();
            }
        }
    }
}
