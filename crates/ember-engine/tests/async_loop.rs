use ember_blocks::Value;
use ember_engine::{EngineConfig, Line, Script, ScriptEngine};
use ember_events::{ActorRef, HostAction, Occurrence, PlayerId};
use tokio::sync::mpsc::UnboundedReceiver;

fn engine_with(config: EngineConfig) -> (ScriptEngine, UnboundedReceiver<HostAction>) {
    ScriptEngine::new(config)
}

fn engine() -> (ScriptEngine, UnboundedReceiver<HostAction>) {
    engine_with(EngineConfig::default())
}

fn chat(player: u64, name: &str, message: &str) -> Occurrence {
    Occurrence::Chat {
        player: ActorRef::new(PlayerId(player), name),
        message: message.into(),
    }
}

/// A chat-triggered script whose chain is the given blocks appended under
/// the event root, with a global `ticks` counter pre-seeded to zero so loop
/// bodies have something observable to mutate.
fn looping_script(engine: &ScriptEngine, blocks: Vec<ember_blocks::Block>) -> Script {
    let factory = engine.factory();
    let mut root = factory.create("event.chat").unwrap();
    for block in blocks {
        root.add_child(block);
    }
    let script = Script::new(PlayerId(1), "Ann").with_line(Line::new().with_root(root));
    script
        .globals()
        .lock()
        .unwrap()
        .insert("ticks".into(), Value::Int(0));
    script
}

fn bump_block(engine: &ScriptEngine) -> ember_blocks::Block {
    let factory = engine.factory();
    let mut bump = factory.create("action.change_var").unwrap();
    bump.set_parameter("var", Value::from("ticks"));
    bump
}

fn counter(engine: &ScriptEngine) -> i64 {
    match engine.script(PlayerId(1)).unwrap().global("ticks") {
        Some(Value::Int(n)) => n,
        other => panic!("unexpected counter value: {:?}", other),
    }
}

fn drain(rx: &mut UnboundedReceiver<HostAction>) -> Vec<HostAction> {
    let mut out = Vec::new();
    while let Ok(action) = rx.try_recv() {
        out.push(action);
    }
    out
}

#[test]
fn test_five_iterations_across_five_ticks() {
    let (mut engine, _rx) = engine();
    let bump = bump_block(&engine);
    let mut repeat = engine.factory().create("control.repeat").unwrap();
    repeat.set_parameter("times", Value::Int(5));
    repeat.add_child(bump);
    let script = looping_script(&engine, vec![repeat]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "go"));
    // starting the loop never runs the body synchronously
    assert_eq!(counter(&engine), 0);
    assert_eq!(engine.pending_tasks(), 1);

    // exactly one body execution per tick, five ticks long
    for expected in 1..=5 {
        engine.tick();
        assert_eq!(counter(&engine), expected);
    }

    // the final step observes the exhausted count and completes
    engine.tick();
    assert_eq!(counter(&engine), 5);
    assert_eq!(engine.pending_tasks(), 0);

    // no further ticks touch the counter
    engine.tick();
    assert_eq!(counter(&engine), 5);
}

#[test]
fn test_body_error_stops_scheduling() {
    let (mut engine, _rx) = engine();
    let bump = bump_block(&engine);
    let factory = engine.factory();
    let mut repeat = factory.create("control.repeat").unwrap();
    repeat.set_parameter("times", Value::Int(5));
    repeat.add_child(bump);
    let mut bad = factory.create("func.call").unwrap();
    bad.set_parameter("name", Value::from("missing"));
    repeat.add_child(bad);
    let script = looping_script(&engine, vec![repeat]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "go"));
    engine.tick();
    // first body run hit the error and the loop aborted
    assert_eq!(counter(&engine), 1);
    assert_eq!(engine.pending_tasks(), 0);

    engine.tick();
    assert_eq!(counter(&engine), 1);
}

#[test]
fn test_break_completes_loop_early() {
    let (mut engine, mut rx) = engine();
    let bump = bump_block(&engine);
    let factory = engine.factory();
    let mut repeat = factory.create("control.repeat").unwrap();
    repeat.set_parameter("times", Value::Int(100));
    repeat.add_child(bump);
    repeat.add_child(factory.create("control.break").unwrap());
    // the break must not propagate past the loop: this sibling still runs
    let mut after = factory.create("action.broadcast").unwrap();
    after.set_parameter("text", Value::from("done"));
    let script = looping_script(&engine, vec![repeat, after]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "go"));
    engine.tick();
    assert_eq!(counter(&engine), 1);
    assert_eq!(engine.pending_tasks(), 0);
    assert_eq!(
        drain(&mut rx),
        vec![HostAction::Broadcast {
            text: "done".into()
        }]
    );
}

#[test]
fn test_continuation_waits_for_completion() {
    let (mut engine, mut rx) = engine();
    let bump = bump_block(&engine);
    let factory = engine.factory();
    let mut repeat = factory.create("control.repeat").unwrap();
    repeat.set_parameter("times", Value::Int(2));
    repeat.add_child(bump);
    let mut after = factory.create("action.broadcast").unwrap();
    after.set_parameter("text", Value::from("after %ticks%"));
    let script = looping_script(&engine, vec![repeat, after]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "go"));
    assert!(drain(&mut rx).is_empty());

    engine.tick();
    engine.tick();
    // both iterations ran, completion not yet observed
    assert_eq!(counter(&engine), 2);
    assert!(drain(&mut rx).is_empty());

    engine.tick();
    assert_eq!(
        drain(&mut rx),
        vec![HostAction::Broadcast {
            text: "after 2".into()
        }]
    );
}

#[test]
fn test_wait_defers_the_rest_of_the_chain() {
    let (mut engine, mut rx) = engine();
    let factory = engine.factory();
    let mut wait = factory.create("control.wait").unwrap();
    wait.set_parameter("ticks", Value::Int(3));
    let mut after = factory.create("action.broadcast").unwrap();
    after.set_parameter("text", Value::from("awake"));
    let script = looping_script(&engine, vec![wait, after]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "sleep"));
    assert!(drain(&mut rx).is_empty());

    engine.tick();
    engine.tick();
    assert!(drain(&mut rx).is_empty());
    engine.tick();
    assert_eq!(
        drain(&mut rx),
        vec![HostAction::Broadcast {
            text: "awake".into()
        }]
    );
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn test_unregister_cancels_pending_steps() {
    let (mut engine, _rx) = engine();
    let bump = bump_block(&engine);
    let mut repeat = engine.factory().create("control.repeat").unwrap();
    repeat.set_parameter("mode", Value::from("forever"));
    repeat.add_child(bump);
    let script = looping_script(&engine, vec![repeat]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "go"));
    engine.tick();
    engine.tick();
    let script = engine.script(PlayerId(1)).unwrap();
    assert_eq!(script.global("ticks"), Some(Value::Int(2)));

    engine.unregister(PlayerId(1));
    assert_eq!(engine.pending_tasks(), 0);
    for _ in 0..3 {
        engine.tick();
    }
    // a cancelled task never steps again
    assert_eq!(script.global("ticks"), Some(Value::Int(2)));
}

#[test]
fn test_disable_cancels_pending_steps() {
    let (mut engine, _rx) = engine();
    let bump = bump_block(&engine);
    let mut repeat = engine.factory().create("control.repeat").unwrap();
    repeat.set_parameter("mode", Value::from("forever"));
    repeat.add_child(bump);
    let script = looping_script(&engine, vec![repeat]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "go"));
    engine.tick();
    assert_eq!(counter(&engine), 1);

    engine.set_enabled(PlayerId(1), false);
    assert_eq!(engine.pending_tasks(), 0);
    engine.tick();
    engine.tick();
    assert_eq!(counter(&engine), 1);
}

#[test]
fn test_iteration_ceiling_truncates_forever() {
    let config = EngineConfig {
        loop_iteration_ceiling: 10,
        ..EngineConfig::default()
    };
    let (mut engine, _rx) = engine_with(config);
    let bump = bump_block(&engine);
    let mut repeat = engine.factory().create("control.repeat").unwrap();
    repeat.set_parameter("mode", Value::from("forever"));
    repeat.add_child(bump);
    let script = looping_script(&engine, vec![repeat]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "go"));
    for _ in 0..20 {
        engine.tick();
    }
    assert_eq!(counter(&engine), 10);
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn test_inter_iteration_delay_spreads_steps() {
    let (mut engine, _rx) = engine();
    let bump = bump_block(&engine);
    let mut repeat = engine.factory().create("control.repeat").unwrap();
    repeat.set_parameter("times", Value::Int(2));
    repeat.set_parameter("delay", Value::Int(3));
    repeat.add_child(bump);
    let script = looping_script(&engine, vec![repeat]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "go"));
    // first step lands three ticks out
    engine.tick();
    engine.tick();
    assert_eq!(counter(&engine), 0);
    engine.tick();
    assert_eq!(counter(&engine), 1);
    // and the second three ticks after that
    engine.tick();
    engine.tick();
    assert_eq!(counter(&engine), 1);
    engine.tick();
    assert_eq!(counter(&engine), 2);
}

#[test]
fn test_until_condition_reevaluated_against_live_state() {
    let (mut engine, _rx) = engine();
    let bump = bump_block(&engine);
    let mut repeat = engine.factory().create("control.repeat").unwrap();
    repeat.set_parameter("mode", Value::from("until"));
    repeat.set_parameter("var", Value::from("ticks"));
    repeat.set_parameter("op", Value::from("equals"));
    repeat.set_parameter("value", Value::Int(3));
    repeat.add_child(bump);
    let script = looping_script(&engine, vec![repeat]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "go"));
    for _ in 0..10 {
        engine.tick();
    }
    // the body mutates the variable the stop condition reads
    assert_eq!(counter(&engine), 3);
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn test_for_each_visits_every_element() {
    let (mut engine, mut rx) = engine();
    let factory = engine.factory();
    let mut repeat = factory.create("control.repeat").unwrap();
    repeat.set_parameter("mode", Value::from("for_each"));
    repeat.set_parameter(
        "list",
        Value::List(vec![Value::from("iron"), Value::from("gold")]),
    );
    repeat.set_parameter("as", Value::from("ore"));
    let mut say = factory.create("action.broadcast").unwrap();
    say.set_parameter("text", Value::from("mined %ore%"));
    repeat.add_child(say);
    let script = looping_script(&engine, vec![repeat]);
    engine.register(script).unwrap();

    engine.dispatch(chat(1, "Ann", "go"));
    for _ in 0..5 {
        engine.tick();
    }
    let texts: Vec<String> = drain(&mut rx)
        .into_iter()
        .map(|a| match a {
            HostAction::Broadcast { text } => text,
            other => panic!("unexpected action: {:?}", other),
        })
        .collect();
    assert_eq!(texts, vec!["mined iron", "mined gold"]);
    assert_eq!(engine.pending_tasks(), 0);
}
