use ember_blocks::{run_sequence, ExecutionContext, Frame, LoopNext, LoopPhase, Outcome};

/// What a chain task wants after one scheduler step.
#[derive(Debug)]
pub enum StepResult {
    /// Park again and step after this many ticks.
    Sleep(u32),
    /// The chain ran to an end; an `Error` outcome is the caller's to log.
    Finished(Outcome),
}

/// A suspended chain: the owned execution context plus the continuation
/// frame stack, innermost frame last.
///
/// The invariant between steps is that the innermost frame is a parked
/// loop; sequence and call frames only appear above it and are consumed
/// while unwinding a finished loop's outcome.
pub struct ChainTask {
    ctx: ExecutionContext,
    frames: Vec<Frame>,
}

impl ChainTask {
    /// Capture a chain that returned `Deferred`, taking ownership of its
    /// context and suspension frames. Returns the task and the delay until
    /// its first step.
    pub fn capture(mut ctx: ExecutionContext) -> Option<(Self, u32)> {
        if !ctx.has_suspension() {
            return None;
        }
        let mut task = Self {
            ctx,
            frames: Vec::new(),
        };
        let delay = task.absorb_suspension();
        Some((task, delay))
    }

    /// Move freshly collected suspension frames onto the stack. Frames are
    /// collected innermost-first while `Deferred` bubbles, so they are
    /// pushed in reverse to keep the innermost on top. Returns the delay of
    /// the now-innermost loop.
    fn absorb_suspension(&mut self) -> u32 {
        for frame in self.ctx.take_suspension().into_iter().rev() {
            self.frames.push(frame);
        }
        match self.frames.last() {
            Some(Frame::Loop(state)) => state.delay_ticks,
            _ => 1,
        }
    }

    /// Run one scheduler step: at most one loop-body execution, then either
    /// park again or unwind to completion. Never runs two iterations
    /// back-to-back.
    pub fn step(&mut self) -> StepResult {
        match self.frames.pop() {
            None => StepResult::Finished(Outcome::ok()),
            Some(Frame::Loop(mut state)) => match state.next(&mut self.ctx) {
                LoopNext::Stop => self.unwind(Outcome::ok()),
                LoopNext::RunBody => {
                    let body = state.body.clone();
                    match run_sequence(&body, &mut self.ctx) {
                        Outcome::Deferred => {
                            // the body parked itself on an inner loop; this
                            // iteration is counted when the inner suspension
                            // unwinds back into this frame
                            self.frames.push(Frame::Loop(state));
                            StepResult::Sleep(self.absorb_suspension())
                        }
                        Outcome::Break => {
                            state.phase = LoopPhase::Completed;
                            self.unwind(Outcome::ok())
                        }
                        Outcome::Error(message) => {
                            state.phase = LoopPhase::Aborted;
                            self.unwind(Outcome::Error(message))
                        }
                        Outcome::Return(value) => self.unwind(Outcome::Return(value)),
                        Outcome::Continue | Outcome::Success(_) => {
                            state.iterations += 1;
                            let delay = state.delay_ticks;
                            self.frames.push(Frame::Loop(state));
                            StepResult::Sleep(delay)
                        }
                    }
                }
            },
            // sequence or call on top only happens if a loop frame was
            // consumed without rescheduling; treat it as a resumed success
            Some(frame) => {
                self.frames.push(frame);
                self.unwind(Outcome::ok())
            }
        }
    }

    /// Feed an outcome outward through the continuation stack until the
    /// chain either parks again or finishes.
    fn unwind(&mut self, mut outcome: Outcome) -> StepResult {
        while let Some(frame) = self.frames.pop() {
            match frame {
                Frame::Call { saved_vars } => {
                    self.ctx.restore_vars(saved_vars);
                    if let Outcome::Return(value) = outcome {
                        outcome = Outcome::Success(value);
                    }
                }
                Frame::Sequence { rest } => {
                    if outcome.is_success() {
                        match run_sequence(&rest, &mut self.ctx) {
                            Outcome::Deferred => {
                                return StepResult::Sleep(self.absorb_suspension());
                            }
                            other => outcome = other,
                        }
                    }
                    // anything else short-circuits the remaining siblings
                }
                Frame::Loop(mut state) => match outcome {
                    // an inner suspension finished one body iteration
                    Outcome::Continue | Outcome::Success(_) => {
                        state.iterations += 1;
                        let delay = state.delay_ticks;
                        self.frames.push(Frame::Loop(state));
                        return StepResult::Sleep(delay);
                    }
                    Outcome::Break => {
                        state.phase = LoopPhase::Completed;
                        outcome = Outcome::ok();
                    }
                    Outcome::Error(_) => {
                        state.phase = LoopPhase::Aborted;
                    }
                    Outcome::Return(_) | Outcome::Deferred => {}
                },
            }
        }
        StepResult::Finished(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_blocks::{Block, BlockFactory, Value};
    use ember_events::{ActorRef, HostActionSender, PlayerId};

    fn context() -> ExecutionContext {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        ExecutionContext::new(
            PlayerId(1),
            ActorRef::new(PlayerId(1), "Ann"),
            HostActionSender::new(tx),
        )
    }

    fn counter_block(factory: &BlockFactory) -> Block {
        let mut block = factory.create("action.change_var").unwrap();
        block.set_parameter("var", Value::from("count"));
        block.set_parameter("delta", Value::Int(1));
        block
    }

    fn capture_repeat(factory: &BlockFactory, repeat: Block) -> (ChainTask, u32) {
        let mut ctx = context();
        assert_eq!(repeat.execute(&mut ctx), Outcome::Deferred);
        ChainTask::capture(ctx).unwrap()
    }

    #[test]
    fn test_fixed_count_runs_body_once_per_step() {
        let factory = BlockFactory::new();
        let mut repeat = factory.create("control.repeat").unwrap();
        repeat.set_parameter("times", Value::Int(5));
        repeat.add_child(counter_block(&factory));

        let (mut task, delay) = capture_repeat(&factory, repeat);
        assert_eq!(delay, 1);

        let mut steps = 0;
        loop {
            steps += 1;
            match task.step() {
                StepResult::Sleep(d) => assert_eq!(d, 1),
                StepResult::Finished(outcome) => {
                    assert!(outcome.is_success());
                    break;
                }
            }
            assert!(steps < 100, "loop failed to terminate");
        }
        // five body steps plus the final condition check
        assert_eq!(steps, 6);
        assert_eq!(task.ctx.var("count"), Some(Value::Int(5)));
    }

    #[test]
    fn test_body_error_aborts_immediately() {
        let factory = BlockFactory::new();
        let mut repeat = factory.create("control.repeat").unwrap();
        repeat.set_parameter("times", Value::Int(5));
        let mut bad = factory.create("func.call").unwrap();
        bad.set_parameter("name", Value::from("missing"));
        repeat.add_child(bad);

        let (mut task, _) = capture_repeat(&factory, repeat);
        match task.step() {
            StepResult::Finished(Outcome::Error(_)) => {}
            other => panic!("expected abort, got {:?}", other),
        }
    }

    #[test]
    fn test_break_completes_early_and_is_contained() {
        let factory = BlockFactory::new();
        let mut repeat = factory.create("control.repeat").unwrap();
        repeat.set_parameter("times", Value::Int(100));
        repeat.add_child(counter_block(&factory));
        repeat.add_child(factory.create("control.break").unwrap());

        let (mut task, _) = capture_repeat(&factory, repeat);
        match task.step() {
            // Break stops the loop and unwinds as plain success
            StepResult::Finished(outcome) => assert!(outcome.is_success()),
            other => panic!("expected finish, got {:?}", other),
        }
        assert_eq!(task.ctx.var("count"), Some(Value::Int(1)));
    }

    #[test]
    fn test_continuation_after_loop_resumes() {
        let factory = BlockFactory::new();
        let mut repeat = factory.create("control.repeat").unwrap();
        repeat.set_parameter("times", Value::Int(1));
        repeat.add_child(counter_block(&factory));
        let mut after = factory.create("action.set_var").unwrap();
        after.set_parameter("var", Value::from("after"));
        after.set_parameter("value", Value::Bool(true));

        // chain: [repeat, after] — "after" must only run once the loop ends
        let mut ctx = context();
        let out = run_sequence(&[repeat, after], &mut ctx);
        assert_eq!(out, Outcome::Deferred);
        assert_eq!(ctx.var("after"), None);

        let (mut task, _) = ChainTask::capture(ctx).unwrap();
        // step 1: body; step 2: stop condition met, continuation runs
        assert!(matches!(task.step(), StepResult::Sleep(_)));
        assert_eq!(task.ctx.var("after"), None);
        match task.step() {
            StepResult::Finished(outcome) => assert!(outcome.is_success()),
            other => panic!("expected finish, got {:?}", other),
        }
        assert_eq!(task.ctx.var("after"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_nested_loops_yield_at_each_level() {
        let factory = BlockFactory::new();
        let mut inner = factory.create("control.repeat").unwrap();
        inner.set_parameter("times", Value::Int(2));
        inner.add_child(counter_block(&factory));
        let mut outer = factory.create("control.repeat").unwrap();
        outer.set_parameter("times", Value::Int(2));
        outer.add_child(inner);

        let (mut task, _) = capture_repeat(&factory, outer);
        let mut steps = 0;
        loop {
            steps += 1;
            match task.step() {
                StepResult::Sleep(_) => {}
                StepResult::Finished(outcome) => {
                    assert!(outcome.is_success());
                    break;
                }
            }
            assert!(steps < 100, "nested loop failed to terminate");
        }
        // 2 outer iterations x 2 inner body runs
        assert_eq!(task.ctx.var("count"), Some(Value::Int(4)));
        // every body run took its own step
        assert!(steps >= 4);
    }

    #[test]
    fn test_while_condition_reads_live_mutations() {
        let factory = BlockFactory::new();
        let mut repeat = factory.create("control.repeat").unwrap();
        repeat.set_parameter("mode", Value::from("until"));
        repeat.set_parameter("var", Value::from("count"));
        repeat.set_parameter("op", Value::from("equals"));
        repeat.set_parameter("value", Value::Int(3));
        repeat.add_child(counter_block(&factory));

        let mut ctx = context();
        ctx.set_var("count", Value::Int(0));
        assert_eq!(repeat.execute(&mut ctx), Outcome::Deferred);
        let (mut task, _) = ChainTask::capture(ctx).unwrap();

        let mut steps = 0;
        loop {
            steps += 1;
            if let StepResult::Finished(outcome) = task.step() {
                assert!(outcome.is_success());
                break;
            }
            assert!(steps < 100, "until loop failed to terminate");
        }
        assert_eq!(task.ctx.var("count"), Some(Value::Int(3)));
    }
}
