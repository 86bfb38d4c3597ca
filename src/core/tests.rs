use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;

use super::*;
use crate::actor::{Actor, Behaviour, Case, Envelope, Matcher, Template};
use crate::address::Address;
use crate::error::{ActorError, RuntimeError};
use crate::events::{Event, EventKind};
use crate::policies::{Trap, TrapAction, trap};
use crate::vm::{Constants, FunInfo, Instr, Script, Value};

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn addr(path: &str) -> Address {
    Address::parse(path).unwrap()
}

fn ignoring_root() -> Platform {
    Platform::builder(Config::default())
        .with_trap(trap::always(TrapAction::Ignore))
        .build()
}

fn events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

struct Idle;
impl Actor for Idle {}

fn idle(id: &str) -> Template {
    Template::new(|_| Box::new(Idle)).with_id(id)
}

/// Logs every delivery; optionally re-arms a receiver after each match.
struct Recorder {
    log: Log,
    behaviour: Behaviour,
    rearm: Option<Matcher>,
}

impl Actor for Recorder {
    fn init(&mut self, behaviour: &mut Behaviour) {
        *behaviour = self.behaviour.clone();
    }

    fn run(&mut self, cx: &mut Cx<'_>) -> Result<(), ActorError> {
        self.log.borrow_mut().push(format!("run {}", cx.address()));
        if let Some(m) = &self.rearm {
            cx.receive(m.clone());
        }
        Ok(())
    }

    fn accept(&mut self, env: Envelope, _cx: &mut Cx<'_>) -> Result<(), ActorError> {
        self.log.borrow_mut().push(format!("accept {}", env.message));
        Ok(())
    }

    fn receive(&mut self, case: &'static str, env: Envelope, cx: &mut Cx<'_>) -> Result<(), ActorError> {
        self.log.borrow_mut().push(format!("{case} {}", env.message));
        if let Some(m) = &self.rearm {
            cx.receive(m.clone());
        }
        Ok(())
    }
}

fn recorder(id: &str, log: &Log, behaviour: Behaviour, rearm: Option<Matcher>) -> Template {
    let log = log.clone();
    Template::new(move |_| {
        Box::new(Recorder {
            log: log.clone(),
            behaviour: behaviour.clone(),
            rearm: rearm.clone(),
        })
    })
    .with_id(id)
}

fn delivered(log: &Log) -> Vec<String> {
    log.borrow()
        .iter()
        .filter(|l| !l.starts_with("run "))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// VM dispatch
// ---------------------------------------------------------------------------

#[test]
fn test_jump_is_absolute() {
    use Instr::*;
    let cfg = Config {
        log_ops: true,
        ..Config::default()
    };
    let mut p = Platform::new(cfg);
    let a = p.spawn(idle("a")).unwrap();

    let pushes = |p: &mut Platform, target: usize| {
        let mut rx = p.subscribe();
        p.eval(&a, Script::new(vec![PushInt(1), PushInt(1), Jump(target), PushInt(1), PushInt(1)]))
            .unwrap();
        events(&mut rx)
            .iter()
            .filter(|e| e.op == Some("push_int"))
            .count()
    };

    assert_eq!(pushes(&mut p, 5), 2);
    assert_eq!(pushes(&mut p, 4), 3);
}

#[test]
fn test_vm_and_foreign_calls() {
    use Instr::*;
    let mut p = Platform::new(Config::default());
    let a = p.spawn(idle("a")).unwrap();

    let constants = Constants::new()
        .with_function(FunInfo::vm("identity", 1, vec![Load(0), Ret]))
        .with_function(FunInfo::foreign("sum", 2, |_cx, args| {
            match (args[0].as_int(), args[1].as_int()) {
                (Some(x), Some(y)) => Ok(Value::Int(x + y)),
                _ => Err(ActorError::application("sum wants ints")),
            }
        }))
        .with_function(FunInfo::foreign("whoami", 0, |cx, _args| {
            Ok(Value::Str(cx.address().to_string()))
        }));

    let out = p
        .eval(
            &a,
            Script::with_constants(constants.clone(), vec![PushInt(41), PushFun(0), Call(1)]),
        )
        .unwrap();
    assert_eq!(out, Some(Value::Int(41)));

    let out = p
        .eval(
            &a,
            Script::with_constants(
                constants.clone(),
                vec![PushInt(40), PushInt(2), PushFun(1), Call(2)],
            ),
        )
        .unwrap();
    assert_eq!(out, Some(Value::Int(42)));

    let out = p
        .eval(&a, Script::with_constants(constants, vec![PushFun(2), Call(0)]))
        .unwrap();
    assert_eq!(out, Some(Value::Str("/a".to_string())));
}

#[test]
fn test_vm_fault_is_raised_on_executing_actor() {
    use Instr::*;
    let seen = log();
    let sink = seen.clone();
    let classify: Trap = Arc::new(move |e: &ActorError| {
        sink.borrow_mut().push(e.to_string());
        TrapAction::Ignore
    });
    let cfg = Config {
        max_frames: 4,
        ..Config::default()
    };
    let mut p = Platform::new(cfg);
    let a = p.spawn(idle("a").with_trap(classify)).unwrap();

    let recurse = Constants::new().with_function(FunInfo::vm("loop", 0, vec![PushFun(0), Call(0)]));
    let out = p
        .eval(&a, Script::with_constants(recurse, vec![PushFun(0), Call(0)]))
        .unwrap();
    assert_eq!(out, None);

    let out = p.eval(&a, Script::new(vec![Pop])).unwrap();
    assert_eq!(out, None);

    assert_eq!(
        *seen.borrow(),
        vec![
            "vm: frame stack overflow (limit 4)".to_string(),
            "vm: stack underflow in pop".to_string(),
        ]
    );
    assert!(p.contains(&a));
    assert!(p.fatal().is_none());
}

#[test]
fn test_spawn_script_leaves_child_address() {
    let mut p = Platform::new(Config::default());
    let a = p.spawn(idle("a")).unwrap();

    let out = p.eval(&a, Script::spawn(idle("kid"))).unwrap();
    assert_eq!(out, Some(Value::Str("/a/kid".to_string())));
    assert!(p.contains(&addr("/a/kid")));
}

// ---------------------------------------------------------------------------
// Allocation and lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_allocation_errors() {
    let mut p = Platform::new(Config::default());
    p.spawn(idle("a")).unwrap();

    assert_eq!(
        p.spawn(idle("a")).unwrap_err(),
        RuntimeError::DuplicateAddress { address: addr("/a") }
    );
    assert_eq!(
        p.spawn_under(&addr("/missing"), idle("b")).unwrap_err(),
        RuntimeError::NotFound {
            address: addr("/missing")
        }
    );
    assert_eq!(
        p.spawn(idle("$")).unwrap_err().as_label(),
        "runtime_invalid_id"
    );
    assert_eq!(p.len(), 1);
}

#[test]
fn test_failed_child_allocation_rolls_back_parent() {
    let mut p = Platform::new(Config::default());
    let mut rx = p.subscribe();

    let err = p
        .spawn(
            idle("p")
                .with_group("pool")
                .with_child(idle("c"))
                .with_child(idle("c")),
        )
        .unwrap_err();

    assert_eq!(err, RuntimeError::DuplicateAddress { address: addr("/p/c") });
    assert!(!p.contains(&addr("/p")));
    assert!(!p.contains(&addr("/p/c")));
    assert!(p.get_group("pool").is_empty());
    assert!(p.is_empty());

    let evs = events(&mut rx);
    assert_eq!(count(&evs, EventKind::ActorStarted), 0);
    assert_eq!(count(&evs, EventKind::ActorRemoved), 2);
}

#[test]
fn test_generated_ids_are_unique() {
    let mut p = Platform::new(Config::default());
    let t = Template::new(|_| Box::new(Idle));
    let x = p.spawn(t.clone()).unwrap();
    let y = p.spawn(t).unwrap();

    assert_ne!(x, y);
    assert_eq!(x.parent(), Address::root());
    assert_eq!(p.template(&x).and_then(Template::id), Some(x.id()));
}

#[test]
fn test_children_start_after_parent_in_address_order() {
    let l = log();
    let tree = recorder("p", &l, Behaviour::direct(), None)
        .with_child(
            recorder("c1", &l, Behaviour::direct(), None)
                .with_child(recorder("g", &l, Behaviour::direct(), None)),
        )
        .with_child(recorder("c2", &l, Behaviour::direct(), None));

    let mut p = Platform::new(Config::default());
    p.spawn(tree).unwrap();

    assert_eq!(
        *l.borrow(),
        vec!["run /p", "run /p/c1", "run /p/c1/g", "run /p/c2"]
    );
    assert_eq!(
        p.get_children(&addr("/p")),
        vec![addr("/p/c1"), addr("/p/c1/g"), addr("/p/c2")]
    );
}

#[test]
fn test_template_args_reach_factory() {
    struct Args(Log);
    impl Actor for Args {}

    let l = log();
    let sink = l.clone();
    let t = Template::new(move |args| {
        sink.borrow_mut()
            .extend(args.iter().map(|a| a.to_string()));
        Box::new(Args(sink.clone()))
    })
    .with_id("w")
    .with_args(vec![json!(1), json!("two")]);

    let mut p = Platform::new(Config::default());
    p.spawn(t).unwrap();
    assert_eq!(*l.borrow(), vec!["1", "\"two\""]);
}

#[test]
fn test_allocate_then_run() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let a = p
        .allocate(&Address::root(), recorder("a", &l, Behaviour::direct(), None))
        .unwrap();
    assert!(l.borrow().is_empty());

    p.run_actor(&a).unwrap();
    assert_eq!(*l.borrow(), vec!["run /a"]);
    assert!(p.run_actor(&addr("/nope")).is_err());
}

struct Stops(Rc<Cell<u32>>);
impl Actor for Stops {
    fn stop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

fn stops(id: &str, counter: &Rc<Cell<u32>>) -> Template {
    let counter = counter.clone();
    Template::new(move |_| Box::new(Stops(counter.clone()))).with_id(id)
}

#[test]
fn test_kill_removes_subtree_once() {
    let stopped = Rc::new(Cell::new(0));
    let tree = stops("a", &stopped)
        .with_child(stops("b", &stopped).with_child(stops("c", &stopped)))
        .with_child(stops("d", &stopped));

    let mut p = Platform::new(Config::default());
    let a = p.spawn(tree).unwrap();
    p.spawn(idle("keep")).unwrap();
    let mut rx = p.subscribe();

    p.kill(&a);
    assert_eq!(stopped.get(), 4);
    assert_eq!(count(&events(&mut rx), EventKind::ActorRemoved), 4);
    assert!(p.get_children(&a).is_empty());
    assert_eq!(p.get_children(&Address::root()), vec![addr("/keep")]);

    p.kill(&a);
    assert_eq!(stopped.get(), 4);
    assert_eq!(count(&events(&mut rx), EventKind::ActorRemoved), 0);
}

#[test]
fn test_kill_root_clears_tree() {
    let mut p = Platform::new(Config::default());
    p.spawn(idle("a").with_child(idle("b"))).unwrap();
    p.spawn(idle("c")).unwrap();

    p.kill(&Address::root());
    assert!(p.is_empty());
    assert!(p.contains(&Address::root()));
}

struct Killer {
    target: Address,
    log: Log,
}

impl Actor for Killer {
    fn run(&mut self, cx: &mut Cx<'_>) -> Result<(), ActorError> {
        let outcome = match cx.kill(&self.target) {
            Ok(()) => "ok".to_string(),
            Err(e) => e.as_label().to_string(),
        };
        self.log.borrow_mut().push(outcome);
        Ok(())
    }
}

fn killer(id: &str, target: &str, log: &Log) -> Template {
    let (target, log) = (addr(target), log.clone());
    Template::new(move |_| {
        Box::new(Killer {
            target: target.clone(),
            log: log.clone(),
        })
    })
    .with_id(id)
}

#[test]
fn test_kill_authority_is_own_subtree() {
    let l = log();
    let mut p = Platform::new(Config::default());
    p.spawn(idle("x")).unwrap();

    p.spawn(killer("k1", "/x", &l)).unwrap();
    p.spawn(killer("k2", "/k2/kid", &l).with_child(idle("kid"))).unwrap();
    p.spawn(killer("k3", "/k3/gone", &l)).unwrap();

    assert_eq!(
        *l.borrow(),
        vec!["runtime_illegal_kill_signal", "ok", "ok"]
    );
    assert!(p.contains(&addr("/x")));
    assert!(!p.contains(&addr("/k2/kid")));
}

struct Quitter(Rc<Cell<u32>>);
impl Actor for Quitter {
    fn accept(&mut self, _env: Envelope, cx: &mut Cx<'_>) -> Result<(), ActorError> {
        cx.exit();
        Ok(())
    }

    fn stop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn test_exit_from_handler_stops_instance_once() {
    let stopped = Rc::new(Cell::new(0));
    let counter = stopped.clone();
    let mut p = Platform::new(Config::default());
    let q = p
        .spawn(Template::new(move |_| Box::new(Quitter(counter.clone()))).with_id("q"))
        .unwrap();

    assert!(p.tell(&q, json!(1)));
    assert!(!p.contains(&q));
    assert_eq!(stopped.get(), 1);
    assert!(!p.tell(&q, json!(2)));
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[test]
fn test_direct_delivery_hits_accept() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let a = p.spawn(recorder("a", &l, Behaviour::direct(), None)).unwrap();

    assert!(p.tell(&a, json!(1)));
    assert!(p.send_message(&a, &Address::root(), json!(2)));
    assert_eq!(delivered(&l), vec!["accept 1", "accept 2"]);
    assert_eq!(p.mailbox_len(&a), None);
}

#[test]
fn test_unknown_target_drops_and_discard_absorbs() {
    let mut p = Platform::new(Config::default());
    let mut rx = p.subscribe();

    assert!(!p.tell(&addr("/nobody"), json!("lost")));
    assert!(p.tell(&Address::discard(), json!("gone")));

    let evs = events(&mut rx);
    assert_eq!(count(&evs, EventKind::MessageDropped), 1);
    let dropped = evs
        .iter()
        .find(|e| e.kind == EventKind::MessageDropped)
        .unwrap();
    assert_eq!(dropped.to, Some(addr("/nobody")));
    assert_eq!(dropped.message, Some(json!("lost")));
}

#[test]
fn test_tell_from_records_sender_on_drop() {
    let mut p = Platform::new(Config::default());
    let mut rx = p.subscribe();
    let me = p.spawn(idle("me")).unwrap();

    assert!(!p.tell_from(&addr("/gone"), &me, json!(3)));
    assert_eq!(p.broadcast_from("nobody", &me, json!(4)), 0);

    let evs = events(&mut rx);
    let dropped = evs
        .iter()
        .find(|e| e.kind == EventKind::MessageDropped)
        .unwrap();
    assert_eq!(dropped.from, Some(me));
    assert_eq!(count(&evs, EventKind::MessageDropped), 1);
}

#[test]
fn test_buffered_mailbox_is_fifo() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let a = p
        .spawn(recorder("a", &l, Behaviour::buffered(), Some(Matcher::any("msg"))))
        .unwrap();

    for n in 1..=3 {
        assert!(p.tell(&a, json!(n)));
    }
    assert_eq!(delivered(&l), vec!["msg 1", "msg 2", "msg 3"]);
    assert_eq!(p.mailbox_len(&a), Some(0));
}

#[test]
fn test_fifo_holds_per_sender_when_interleaved() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let x = p.spawn(idle("x")).unwrap();
    let y = p.spawn(idle("y")).unwrap();
    let a = p
        .spawn(recorder("a", &l, Behaviour::buffered(), Some(Matcher::any("msg"))))
        .unwrap();

    for (from, n) in [(&x, 1), (&y, 10), (&x, 2), (&y, 20), (&x, 3)] {
        assert!(p.send_message(&a, from, json!(n)));
    }
    assert_eq!(
        delivered(&l),
        vec!["msg 1", "msg 10", "msg 2", "msg 20", "msg 3"]
    );
}

#[test]
fn test_mail_waits_for_a_receiver() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let a = p.spawn(recorder("a", &l, Behaviour::buffered(), None)).unwrap();

    p.tell(&a, json!(1));
    p.tell(&a, json!(2));
    assert_eq!(p.mailbox_len(&a), Some(2));
    assert!(delivered(&l).is_empty());

    let arm = Script::with_constants(
        Constants::new().with_matcher(Matcher::any("late")),
        vec![Instr::Recv(0)],
    );
    p.exec(&a, arm).unwrap();
    assert_eq!(delivered(&l), vec!["late 1"]);
    assert_eq!(p.mailbox_len(&a), Some(1));
}

#[test]
fn test_immutable_receiver_drops_unmatched_head() {
    let l = log();
    let jobs = Matcher::new().case(Case::field("job", "type", json!("job")));
    let mut p = Platform::new(Config::default());
    let a = p.spawn(recorder("a", &l, Behaviour::immutable(jobs), None)).unwrap();
    let mut rx = p.subscribe();

    p.tell(&a, json!({"type": "noise"}));
    p.tell(&a, json!({"type": "job", "id": 1}));
    p.tell(&a, json!({"type": "job", "id": 2}));

    assert_eq!(
        delivered(&l),
        vec![
            r#"job {"id":1,"type":"job"}"#,
            r#"job {"id":2,"type":"job"}"#
        ]
    );
    let evs = events(&mut rx);
    assert_eq!(count(&evs, EventKind::MessageDropped), 1);
    assert_eq!(count(&evs, EventKind::MessageReceived), 2);
    assert_eq!(p.mailbox_len(&a), Some(0));
}

#[test]
fn test_temporary_actor_exits_after_first_match() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let a = p
        .spawn(recorder("a", &l, Behaviour::temporary(Matcher::any("once")), None))
        .unwrap();

    assert!(p.tell(&a, json!(1)));
    assert!(!p.contains(&a));
    assert!(!p.tell(&a, json!(2)));
    assert_eq!(delivered(&l), vec!["once 1"]);
}

/// Temporary actor whose only receive fails.
struct OneShot;
impl Actor for OneShot {
    fn init(&mut self, behaviour: &mut Behaviour) {
        *behaviour = Behaviour::temporary(Matcher::any("once"));
    }

    fn receive(&mut self, _case: &'static str, _env: Envelope, _cx: &mut Cx<'_>) -> Result<(), ActorError> {
        Err(ActorError::application("oops"))
    }
}

fn one_shot(action: TrapAction) -> Template {
    Template::new(|_| Box::new(OneShot))
        .with_id("t")
        .with_trap(trap::always(action))
}

#[test]
fn test_exited_temporary_raiser_uses_its_own_trap() {
    let mut p = Platform::new(Config::default());
    let mut rx = p.subscribe();
    let t = p.spawn(one_shot(TrapAction::Ignore)).unwrap();

    assert!(p.tell(&t, json!(1)));

    assert!(p.fatal().is_none());
    assert!(!p.is_stopped());
    assert!(!p.contains(&t));
    let evs = events(&mut rx);
    assert_eq!(count(&evs, EventKind::ErrorIgnored), 1);
    assert_eq!(count(&evs, EventKind::ErrorEscalated), 0);
}

#[test]
fn test_exited_temporary_raiser_can_be_restarted() {
    let mut p = Platform::new(Config::default());
    let mut rx = p.subscribe();
    let t = p.spawn(one_shot(TrapAction::Restart)).unwrap();

    assert!(p.tell(&t, json!(1)));

    assert!(p.fatal().is_none());
    assert!(p.contains(&t));
    assert_eq!(count(&events(&mut rx), EventKind::ActorRestarted), 1);
}

struct Gateway {
    log: Log,
    forwarding: bool,
}

impl Actor for Gateway {
    fn accept(&mut self, env: Envelope, cx: &mut Cx<'_>) -> Result<(), ActorError> {
        self.log.borrow_mut().push(format!("route {}", env.to));
        if self.forwarding {
            cx.forward(env);
        } else {
            cx.drop_message(env);
        }
        Ok(())
    }
}

fn gateway(log: &Log, forwarding: bool) -> Template {
    let log = log.clone();
    Template::new(move |_| {
        Box::new(Gateway {
            log: log.clone(),
            forwarding,
        })
    })
    .with_id("gw")
}

#[test]
fn test_route_transfers_subtree_to_router() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let gw = p.spawn(gateway(&l, true)).unwrap();
    p.spawn(
        recorder("svc", &l, Behaviour::direct(), None)
            .with_child(recorder("w1", &l, Behaviour::direct(), None)),
    )
    .unwrap();
    p.put_route(addr("/svc"), gw.clone());
    let mut rx = p.subscribe();

    assert!(p.tell(&addr("/svc/w1"), json!(7)));
    assert_eq!(delivered(&l), vec!["route /svc/w1", "accept 7"]);

    let evs = events(&mut rx);
    assert_eq!(count(&evs, EventKind::MessageTransferred), 1);
    let transferred = evs
        .iter()
        .find(|e| e.kind == EventKind::MessageTransferred)
        .unwrap();
    assert_eq!(transferred.address, Some(gw));
    assert_eq!(transferred.to, Some(addr("/svc/w1")));

    p.remove_route(&addr("/svc"));
    assert!(p.tell(&addr("/svc/w1"), json!(8)));
    assert_eq!(delivered(&l).last().map(String::as_str), Some("accept 8"));
}

#[test]
fn test_router_decline_is_a_drop() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let gw = p.spawn(gateway(&l, false)).unwrap();
    p.spawn(recorder("svc", &l, Behaviour::direct(), None)).unwrap();
    p.put_route(addr("/svc"), gw);
    let mut rx = p.subscribe();

    assert!(p.tell(&addr("/svc"), json!(1)));
    assert_eq!(delivered(&l), vec!["route /svc"]);
    assert_eq!(count(&events(&mut rx), EventKind::MessageDropped), 1);
}

#[test]
fn test_groups_and_broadcast() {
    let l = log();
    let mut p = Platform::new(Config::default());
    p.spawn(recorder("a", &l, Behaviour::direct(), None).with_group("pool"))
        .unwrap();
    p.spawn(recorder("b", &l, Behaviour::direct(), None).with_group("pool"))
        .unwrap();

    assert_eq!(p.get_group("pool"), vec![addr("/a"), addr("/b")]);
    assert_eq!(p.broadcast("pool", json!("hi")), 2);
    assert_eq!(delivered(&l), vec![r#"accept "hi""#, r#"accept "hi""#]);

    p.kill(&addr("/a"));
    assert_eq!(p.get_group("pool"), vec![addr("/b")]);
    assert_eq!(p.broadcast("empty", json!(0)), 0);
}

struct Teller {
    to: Address,
    log: Log,
}

impl Actor for Teller {
    fn run(&mut self, cx: &mut Cx<'_>) -> Result<(), ActorError> {
        let sent = cx.tell(&self.to, json!("ping"));
        self.log.borrow_mut().push(format!("sent {sent}"));
        Ok(())
    }
}

#[test]
fn test_cx_tell_reports_delivery() {
    let l = log();
    let mut p = Platform::new(Config::default());
    p.spawn(recorder("sink", &l, Behaviour::direct(), None)).unwrap();
    let mut rx = p.subscribe();

    for (id, to) in [("t1", "/sink"), ("t2", "/void")] {
        let (to, sink) = (addr(to), l.clone());
        p.spawn(
            Template::new(move |_| {
                Box::new(Teller {
                    to: to.clone(),
                    log: sink.clone(),
                })
            })
            .with_id(id),
        )
        .unwrap();
    }

    assert_eq!(
        delivered(&l),
        vec![r#"accept "ping""#, "sent true", "sent false"]
    );
    assert_eq!(count(&events(&mut rx), EventKind::MessageDropped), 1);
}

// ---------------------------------------------------------------------------
// Supervision
// ---------------------------------------------------------------------------

#[test]
fn test_escalation_passes_every_level() {
    let mut p = ignoring_root();
    p.spawn(idle("a").with_child(idle("b").with_child(idle("c"))))
        .unwrap();
    let mut rx = p.subscribe();

    p.raise(&addr("/a/b/c"), ActorError::application("boom"));

    let evs = events(&mut rx);
    let hops: Vec<(Address, Address)> = evs
        .iter()
        .filter(|e| e.kind == EventKind::ErrorEscalated)
        .map(|e| (e.address.clone().unwrap(), e.to.clone().unwrap()))
        .collect();
    assert_eq!(
        hops,
        vec![
            (addr("/a/b/c"), addr("/a/b")),
            (addr("/a/b"), addr("/a")),
            (addr("/a"), Address::root()),
        ]
    );
    assert_eq!(count(&evs, EventKind::ErrorIgnored), 1);
    assert!(p.fatal().is_none());
}

#[test]
fn test_ancestor_trap_stops_original_raiser() {
    let mut p = Platform::new(Config::default());
    p.spawn(
        idle("a")
            .with_trap(trap::always(TrapAction::Stop))
            .with_child(idle("b").with_child(idle("c"))),
    )
    .unwrap();

    p.raise(&addr("/a/b/c"), ActorError::application("boom"));
    assert!(!p.contains(&addr("/a/b/c")));
    assert!(p.contains(&addr("/a/b")));
    assert!(p.contains(&addr("/a")));
}

#[test]
fn test_restart_rebuilds_with_empty_mailbox() {
    let builds = Rc::new(Cell::new(0));
    let stopped = Rc::new(Cell::new(0));
    let (b, s) = (builds.clone(), stopped.clone());

    struct Buffered(Rc<Cell<u32>>);
    impl Actor for Buffered {
        fn init(&mut self, behaviour: &mut Behaviour) {
            *behaviour = Behaviour::buffered();
        }
        fn stop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    let t = Template::new(move |_| {
        b.set(b.get() + 1);
        Box::new(Buffered(s.clone()))
    })
    .with_id("w")
    .with_trap(trap::restart_on_application());

    let mut p = Platform::new(Config::default());
    let w = p.spawn(t).unwrap();
    let before = p.generation(&w).unwrap();
    p.tell(&w, json!(1));
    p.tell(&w, json!(2));
    assert_eq!(p.mailbox_len(&w), Some(2));
    let mut rx = p.subscribe();

    p.raise(&w, ActorError::application("crash"));

    assert!(p.contains(&w));
    assert_ne!(p.generation(&w), Some(before));
    assert_eq!(p.mailbox_len(&w), Some(0));
    assert_eq!(builds.get(), 2);
    assert_eq!(stopped.get(), 1);
    assert_eq!(count(&events(&mut rx), EventKind::ActorRestarted), 1);
}

#[test]
fn test_unhandled_escalation_stops_platform() {
    let mut p = Platform::new(Config::default());
    let a = p.spawn(idle("a")).unwrap();
    let mut rx = p.subscribe();

    p.raise(&a, ActorError::application("boom"));

    assert!(p.is_stopped());
    assert_eq!(
        p.fatal(),
        Some(&RuntimeError::UnhandledEscalation {
            source_address: a,
            error: "boom".to_string(),
        })
    );
    assert_eq!(count(&events(&mut rx), EventKind::UnhandledEscalation), 1);
}

struct Failing;
impl Actor for Failing {
    fn run(&mut self, _cx: &mut Cx<'_>) -> Result<(), ActorError> {
        Err(ActorError::application("bad start"))
    }
}

#[tokio::test]
async fn test_run_reports_fatal_error() {
    let mut p = Platform::new(Config::default());
    let _ = p.spawn(Template::new(|_| Box::new(Failing)).with_id("f"));

    let err = p.run().await.unwrap_err();
    assert_eq!(err.as_label(), "runtime_unhandled_escalation");
}

#[test]
fn test_stop_keeps_pending_slots() {
    let mut p = Platform::new(Config::default());
    let a = p.spawn(idle("a")).unwrap();

    p.stop();
    p.exec(&a, Script::new(vec![Instr::Nop])).unwrap();
    assert_eq!(p.pending_slots(), 1);
    assert!(p.exec(&addr("/nope"), Script::default()).is_err());
}

#[test]
fn test_slot_waits_while_runtime_is_checked_out() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let a = p.spawn(idle("a")).unwrap();

    let sink = l.clone();
    let mark = Constants::new().with_function(FunInfo::foreign("mark", 0, move |_cx, _| {
        sink.borrow_mut().push("slot".to_string());
        Ok(Value::Nil)
    }));
    let runtime = p.checkout_runtime(&a).unwrap();
    p.exec(
        &a,
        Script::with_constants(mark, vec![Instr::PushFun(0), Instr::Call(0)]),
    )
    .unwrap();
    assert_eq!(p.pending_slots(), 1);
    assert!(l.borrow().is_empty());

    p.checkin_runtime(runtime);
    p.drain();
    assert_eq!(*l.borrow(), vec!["slot"]);
    assert_eq!(p.pending_slots(), 0);
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

struct Waiter {
    log: Log,
    outcome: Option<Result<Option<serde_json::Value>, ActorError>>,
}

impl Actor for Waiter {
    fn run(&mut self, cx: &mut Cx<'_>) -> Result<(), ActorError> {
        if let Some(outcome) = self.outcome.take() {
            cx.run_task(async move { outcome });
        }
        Ok(())
    }

    fn accept(&mut self, env: Envelope, _cx: &mut Cx<'_>) -> Result<(), ActorError> {
        self.log.borrow_mut().push(format!("accept {}", env.message));
        Ok(())
    }
}

fn waiter(
    log: &Log,
    outcome: Result<Option<serde_json::Value>, ActorError>,
) -> Template {
    let log = log.clone();
    Template::new(move |_| {
        Box::new(Waiter {
            log: log.clone(),
            outcome: Some(outcome.clone()),
        })
    })
    .with_id("w")
}

#[tokio::test]
async fn test_task_blocks_owner_until_settled() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let w = p.spawn(waiter(&l, Ok(Some(json!("done"))))).unwrap();

    assert!(p.is_blocked(&w));
    assert_eq!(p.pending_tasks(), 1);
    assert_eq!(p.task_state(TaskId(1)), Some(&TaskState::Pending));

    let sink = l.clone();
    let mark = Constants::new().with_function(FunInfo::foreign("mark", 0, move |_cx, _| {
        sink.borrow_mut().push("slot".to_string());
        Ok(Value::Nil)
    }));
    p.exec(
        &w,
        Script::with_constants(mark, vec![Instr::PushFun(0), Instr::Call(0)]),
    )
    .unwrap();
    assert!(l.borrow().is_empty());

    p.run().await.unwrap();

    assert_eq!(*l.borrow(), vec![r#"accept "done""#, "slot"]);
    assert!(!p.is_blocked(&w));
    assert_eq!(
        p.task_state(TaskId(1)),
        Some(&TaskState::Settled(Ok(Some(json!("done")))))
    );
}

#[tokio::test]
async fn test_failed_task_raises_on_owner() {
    let l = log();
    let mut p = ignoring_root();
    let mut rx = p.subscribe();
    let w = p.spawn(waiter(&l, Err(ActorError::task("io")))).unwrap();

    p.run().await.unwrap();

    let evs = events(&mut rx);
    let raised = evs
        .iter()
        .find(|e| e.kind == EventKind::ErrorRaised)
        .unwrap();
    assert_eq!(raised.address, Some(w));
    assert_eq!(raised.reason.as_deref(), Some("task failed: io"));
    assert_eq!(count(&evs, EventKind::TaskSettled), 1);
    assert!(l.borrow().is_empty());
}

#[tokio::test]
async fn test_eval_refuses_actor_blocked_on_task() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let w = p.spawn(waiter(&l, Ok(None))).unwrap();

    let sink = l.clone();
    let mark = Constants::new().with_function(FunInfo::foreign("mark", 0, move |_cx, _| {
        sink.borrow_mut().push("ran".to_string());
        Ok(Value::Nil)
    }));
    let script = Script::with_constants(mark, vec![Instr::PushFun(0), Instr::Call(0)]);

    let err = p.eval(&w, script.clone()).unwrap_err();
    assert_eq!(err, RuntimeError::Blocked { address: w.clone() });
    assert!(l.borrow().is_empty());

    p.run().await.unwrap();
    assert!(p.eval(&w, script).is_ok());
    assert_eq!(*l.borrow(), vec!["ran"]);
}

#[tokio::test]
async fn test_settled_tasks_are_released_with_their_owner() {
    let l = log();
    let mut p = Platform::new(Config::default());
    let w = p.spawn(waiter(&l, Ok(None))).unwrap();

    p.run().await.unwrap();
    assert_eq!(p.task_state(TaskId(1)), Some(&TaskState::Settled(Ok(None))));

    p.kill(&w);
    assert_eq!(p.task_state(TaskId(1)), None);

    // Owner removed while the task is still pending.
    let w = p.spawn(waiter(&l, Ok(None))).unwrap();
    assert_eq!(p.task_state(TaskId(2)), Some(&TaskState::Pending));
    p.kill(&w);
    p.run().await.unwrap();
    assert_eq!(p.task_state(TaskId(2)), None);
    assert_eq!(p.pending_tasks(), 0);
}
