//! The scheduler engine: act dispatch, push/pop discipline, signals.
//!
//! All functions are free functions generic over [`AgentHost`] — the world
//! passes itself in, and the engine temporarily moves task state out of the
//! agent so updates can receive `&mut W` without aliasing the entry they
//! run for.

use log::{debug, trace};

use cartage_core::AgentId;

use crate::agent::Agent;
use crate::host::AgentHost;
use crate::task::{Step, Task, TaskState};

/// Delay before a freshly spawned agent's first act, ms.
const SPAWN_DELAY_MS: u64 = 1;

/// Spawn an agent and schedule its first act.
///
/// The stack starts empty; the first act pushes `default_task`.
pub fn spawn<W: AgentHost>(
    world: &mut W,
    pos: cartage_core::Coord,
    default_task: &'static dyn Task<W>,
) -> AgentId {
    let agent = world.agents_mut().insert(Agent::new(pos, default_task));
    trace!("spawn {agent} at {pos} with default task '{}'", default_task.name());
    schedule_act(world, agent, SPAWN_DELAY_MS);
    agent
}

/// Remove an agent from the world, unwinding its stack.
///
/// Every entry's `on_pop` hook runs top-down, exactly as for
/// [`reset_tasks`], so owned requests and routes are released.  The task
/// stack is empty by the time the agent record is dropped.
pub fn despawn<W: AgentHost>(world: &mut W, agent: AgentId) {
    unwind_stack(world, agent);
    world.agents_mut().remove(agent);
    trace!("despawn {agent}");
}

/// Deliver one wake-up event.  The host calls this when its timeline
/// reaches the event; `gen` is the stamp the event was scheduled with.
pub fn act<W: AgentHost>(world: &mut W, agent: AgentId, gen: u64) {
    let Some(a) = world.agents_mut().get_mut(agent) else {
        return; // agent died while the event was in flight
    };
    if a.act_gen != gen {
        return; // stale wake-up, superseded by a later schedule
    }

    if a.stack.is_empty() {
        // Fresh or reset agent: arm the default task.  Its first update
        // runs on the act this push schedules.
        a.signal.clear();
        let task = a.default_task;
        trace!("{agent}: arming default task '{}'", task.name());
        push_task(world, agent, TaskState::new(task), SPAWN_DELAY_MS);
        return;
    }

    // Move the top entry out so update() can take &mut world without
    // aliasing it.  The verdict decides whether it goes back.
    let mut state = world
        .agents_mut()
        .get_mut(agent)
        .expect("agent vanished mid-act")
        .stack
        .pop()
        .expect("checked non-empty above");
    let task = state.task;

    let step = task.update(world, agent, &mut state);
    apply_step(world, agent, state, step);
}

fn apply_step<W: AgentHost>(world: &mut W, agent: AgentId, state: TaskState<W>, step: Step<W>) {
    match step {
        Step::Push { state: new_state, delay_ms } => {
            restore(world, agent, state);
            push_task(world, agent, new_state, delay_ms);
        }
        Step::Pop => {
            pop_entry(world, agent, state);
            let delay = world.tuning().pop_retick_ms;
            schedule_act(world, agent, delay);
        }
        Step::Wait(delay_ms) => {
            restore(world, agent, state);
            schedule_act(world, agent, delay_ms);
        }
        Step::Idle => {
            restore(world, agent, state);
            // No wake-up: the agent sleeps until a signal or an explicit
            // schedule_act from world code.
        }
    }
}

fn restore<W: AgentHost>(world: &mut W, agent: AgentId, state: TaskState<W>) {
    if let Some(a) = world.agents_mut().get_mut(agent) {
        a.stack.push(state);
    }
}

/// Run an entry's cleanup and drop it.  Does not schedule anything.
fn pop_entry<W: AgentHost>(world: &mut W, agent: AgentId, mut state: TaskState<W>) {
    trace!("{agent}: pop '{}'", state.task.name());
    state.task.on_pop(world, agent, &mut state);
    // state drops here, releasing its path and scratch.
}

/// Push a task entry and schedule the act that runs its first update.
///
/// # Panics
///
/// Panics if `state.task` is marked unique and an entry of it is already on
/// the stack — a defect in the caller (§ fatal invariant), not a runtime
/// condition.
pub fn push_task<W: AgentHost>(world: &mut W, agent: AgentId, state: TaskState<W>, delay_ms: u64) {
    let Some(a) = world.agents_mut().get_mut(agent) else {
        return;
    };
    let task = state.task;
    assert!(
        !task.unique() || !a.has_task(task),
        "{agent}: double push of unique task '{}'",
        task.name()
    );
    trace!("{agent}: push '{}' (+{delay_ms} ms)", task.name());
    a.stack.push(state);
    schedule_act(world, agent, delay_ms);
}

/// Invalidate any pending wake-up for `agent` and arrange exactly one
/// future act after `delay_ms`.
pub fn schedule_act<W: AgentHost>(world: &mut W, agent: AgentId, delay_ms: u64) {
    let now = world.now();
    let Some(a) = world.agents_mut().get_mut(agent) else {
        return;
    };
    a.act_gen += 1;
    let gen = a.act_gen;
    world.schedule_act_event(now.offset(delay_ms), agent, gen);
}

/// Deliver `signal` to `agent`.
///
/// Runs every stacked entry's `on_signal` hook from the top down for
/// synchronous side effects, then stores the signal string and schedules an
/// immediate act.  The convention is that every task's update checks the
/// pending signal first and pops itself if one is set; beyond the hooks the
/// signal is inert data.
pub fn send_signal<W: AgentHost>(world: &mut W, agent: AgentId, signal: &str) {
    assert!(!signal.is_empty(), "empty signal; use Agent::clear_signal for removal");
    let Some(a) = world.agents_mut().get_mut(agent) else {
        return;
    };

    // Take the stack so hooks can receive &mut world.  Hooks must not grow
    // the stack (they observe, release requests, adjust scratch) — the
    // engine restores it wholesale afterwards.
    let mut stack = std::mem::take(&mut a.stack);
    for state in stack.iter_mut().rev() {
        let task = state.task;
        task.on_signal(world, agent, state, signal);
    }

    let Some(a) = world.agents_mut().get_mut(agent) else {
        return;
    };
    debug_assert!(a.stack.is_empty(), "signal hook pushed a task");
    a.stack = stack;
    a.signal = signal.to_string();
    debug!("{agent}: signal '{signal}'");

    let delay = world.tuning().signal_retick_ms;
    schedule_act(world, agent, delay);
}

/// Force a complete reset of the task stack.
///
/// Every entry's `on_pop` hook runs top-down (as if every task failed);
/// afterwards the agent is back in its initial no-task state and the next
/// act arms the default task again.
pub fn reset_tasks<W: AgentHost>(world: &mut W, agent: AgentId) {
    unwind_stack(world, agent);
    let Some(a) = world.agents_mut().get_mut(agent) else {
        return;
    };
    a.signal.clear();
    debug!("{agent}: tasks reset");
    let delay = world.tuning().pop_retick_ms;
    schedule_act(world, agent, delay);
}

fn unwind_stack<W: AgentHost>(world: &mut W, agent: AgentId) {
    loop {
        let Some(a) = world.agents_mut().get_mut(agent) else {
            return;
        };
        let Some(state) = a.stack.pop() else {
            return;
        };
        pop_entry(world, agent, state);
    }
}
