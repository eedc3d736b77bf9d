//! Lifecycle properties: cascading End, peek semantics, backpressure,
//! cancellation, and the failure policies.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, timeout};
use weft_core::test_utils::{EmitOnce, Limiter, Relay, schemas};
use weft_core::{Agent, AgentError, Message, Outcome, Ports, Signature};
use weft_net::{Endpoint, FailurePolicy, GraphSpec, NetworkConfig, NetworkError, RunOutcome};

fn trace() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn int_msg(value: u64) -> Message {
    Message::encode(&schemas::integer(), &value).unwrap()
}

fn text_msg(value: &str) -> Message {
    Message::encode(&schemas::text(), &value).unwrap()
}

// --- Cascading End ---

#[tokio::test]
async fn ended_upstream_starves_downstream_but_not_siblings() {
    let mut graph = GraphSpec::new();
    graph.add_agent("x", Box::new(EmitOnce::new(int_msg(1))));
    graph.add_agent("y", Box::new(Relay::new(schemas::integer())));
    graph.add_agent("z", Box::new(Relay::new(schemas::integer())));
    graph.connect(Endpoint::new("x", "out"), Endpoint::new("y", "in"));
    graph.expose_output("y_out", Endpoint::new("y", "out"));
    graph.expose_input("z_in", Endpoint::new("z", "in"));
    graph.expose_output("z_out", Endpoint::new("z", "out"));

    let network = graph.build(NetworkConfig::default()).unwrap();
    let mut handle = network.start();
    let mut y_out = handle.take_output("y_out").unwrap();
    let mut z_out = handle.take_output("z_out").unwrap();

    // X emits once on kickoff and ends; Y forwards that one message.
    assert_eq!(y_out.recv().await.unwrap().decode::<u64>().unwrap(), 1);

    // The sibling keeps working after X ended.
    for n in 10..13u64 {
        handle.inject("z_in", int_msg(n)).await.unwrap();
        assert_eq!(z_out.recv().await.unwrap().decode::<u64>().unwrap(), n);
    }

    // Y never becomes runnable again: cascading shutdown, not an error.
    assert!(handle.await_terminal().await.is_completed());
    assert!(y_out.recv().await.is_none());
}

// --- Peek semantics ---

#[tokio::test]
async fn option_port_is_peeked_not_consumed() {
    let mut graph = GraphSpec::new();
    graph.add_agent("limit", Box::new(Limiter::new(schemas::text())));
    graph.expose_input("in", Endpoint::new("limit", "in"));
    graph.expose_input("limit", Endpoint::new("limit", "limit"));
    graph.expose_output("out", Endpoint::new("limit", "out"));

    let network = graph.build(NetworkConfig::default()).unwrap();
    let mut handle = network.start();
    let mut out = handle.take_output("out").unwrap();

    // One delivery to the option port serves every later run.
    handle.inject("limit", int_msg(2)).await.unwrap();
    for word in ["a", "b", "c"] {
        handle.inject("in", text_msg(word)).await.unwrap();
    }

    // Both runs peeked the same limit message; the second one tripped it.
    assert_eq!(out.recv().await.unwrap().decode::<String>().unwrap(), "a");
    assert_eq!(out.recv().await.unwrap().decode::<String>().unwrap(), "b");

    assert!(handle.await_terminal().await.is_completed());
    assert!(out.recv().await.is_none());
}

/// Emits what its accumulator holds whenever it is triggered.
struct AccReader;

#[async_trait]
impl Agent for AccReader {
    fn signature(&self) -> Signature {
        Signature::builder()
            .input("tick", schemas::text())
            .accumulator("acc", schemas::integer())
            .output("out", schemas::integer())
            .build()
    }

    async fn run(&mut self, ports: &mut dyn Ports) -> Result<Outcome, AgentError> {
        ports.receive("tick")?;
        let value: u64 = match ports.peek("acc")? {
            Some(message) => message.decode()?,
            None => 0,
        };
        ports.send("out", Message::encode(&schemas::integer(), &value)?).await?;
        Ok(Outcome::Continue)
    }
}

#[tokio::test]
async fn accumulator_seed_is_visible_before_any_arrival() {
    let mut graph = GraphSpec::new();
    graph.add_agent("reader", Box::new(AccReader));
    graph.expose_input("tick", Endpoint::new("reader", "tick"));
    graph.expose_input("acc", Endpoint::new("reader", "acc"));
    graph.expose_output("out", Endpoint::new("reader", "out"));
    graph.seed(Endpoint::new("reader", "acc"), int_msg(41));

    let network = graph.build(NetworkConfig::default()).unwrap();
    let mut handle = network.start();
    let mut out = handle.take_output("out").unwrap();

    // Before any arrival, peek returns the wiring-time seed.
    handle.inject("tick", text_msg("go")).await.unwrap();
    assert_eq!(out.recv().await.unwrap().decode::<u64>().unwrap(), 41);

    // An arrival replaces the seed.
    handle.inject("acc", int_msg(99)).await.unwrap();
    handle.inject("tick", text_msg("go")).await.unwrap();
    assert_eq!(out.recv().await.unwrap().decode::<u64>().unwrap(), 99);

    assert!(handle.await_terminal().await.is_completed());
}

/// No mandatory inputs: runs only when its option port receives.
struct Announcer;

#[async_trait]
impl Agent for Announcer {
    fn signature(&self) -> Signature {
        Signature::builder()
            .option("cfg", schemas::text())
            .output("out", schemas::text())
            .build()
    }

    async fn run(&mut self, ports: &mut dyn Ports) -> Result<Outcome, AgentError> {
        if let Some(message) = ports.peek("cfg")? {
            ports.send("out", message).await?;
        }
        Ok(Outcome::Continue)
    }
}

#[tokio::test]
async fn peek_only_agent_runs_per_arrival_and_otherwise_never() {
    let mut graph = GraphSpec::new();
    graph.add_agent("announcer", Box::new(Announcer));
    graph.expose_input("cfg", Endpoint::new("announcer", "cfg"));
    graph.expose_output("out", Endpoint::new("announcer", "out"));

    let network = graph.build(NetworkConfig::default()).unwrap();
    let mut handle = network.start();
    let mut out = handle.take_output("out").unwrap();

    // Nothing delivered yet: the agent has no reason to run.
    assert!(
        timeout(Duration::from_millis(200), out.recv())
            .await
            .is_err()
    );

    handle.inject("cfg", text_msg("hello")).await.unwrap();
    assert_eq!(
        out.recv().await.unwrap().decode::<String>().unwrap(),
        "hello"
    );

    assert!(handle.await_terminal().await.is_completed());
}

// --- Backpressure ---

#[tokio::test]
async fn full_buffer_blocks_the_producer_until_drained() {
    trace();
    let mut config = NetworkConfig::default();
    config.default_capacity = 1;

    let mut graph = GraphSpec::new();
    graph.add_agent("relay", Box::new(Relay::new(schemas::integer())));
    graph.expose_input("in", Endpoint::new("relay", "in"));
    graph.expose_output("out", Endpoint::new("relay", "out"));

    let network = graph.build(config).unwrap();
    let mut handle = network.start();
    let mut out = handle.take_output("out").unwrap();

    // Capacity 1 everywhere: one message parked in the output buffer, one
    // held by the relay's blocked send, one waiting in the input buffer.
    for n in 1..=3u64 {
        timeout(Duration::from_secs(1), handle.inject("in", int_msg(n)))
            .await
            .expect("within total buffer capacity")
            .unwrap();
    }

    // The fourth send backpressures the injector: nothing is dropped,
    // the producer just waits.
    assert!(
        timeout(Duration::from_millis(300), handle.inject("in", int_msg(4)))
            .await
            .is_err()
    );

    // Draining one message unblocks the chain.
    assert_eq!(out.recv().await.unwrap().decode::<u64>().unwrap(), 1);
    timeout(Duration::from_secs(1), handle.inject("in", int_msg(4)))
        .await
        .expect("slot freed by the drain")
        .unwrap();

    for n in 2..=4u64 {
        assert_eq!(out.recv().await.unwrap().decode::<u64>().unwrap(), n);
    }
    assert!(handle.await_terminal().await.is_completed());
}

// --- Cancellation ---

#[tokio::test]
async fn cancel_is_a_synthetic_end_not_a_failure() {
    let mut graph = GraphSpec::new();
    graph.add_agent("relay", Box::new(Relay::new(schemas::integer())));
    graph.expose_input("in", Endpoint::new("relay", "in"));
    graph.expose_output("out", Endpoint::new("relay", "out"));

    let network = graph.build(NetworkConfig::default()).unwrap();
    let mut handle = network.start();
    let mut out = handle.take_output("out").unwrap();

    handle.inject("in", int_msg(1)).await.unwrap();
    assert_eq!(out.recv().await.unwrap().decode::<u64>().unwrap(), 1);

    handle.cancel();
    assert!(handle.await_terminal().await.is_completed());
}

// --- Failure policies ---

/// Fails on every run.
struct Faulty;

#[async_trait]
impl Agent for Faulty {
    fn signature(&self) -> Signature {
        Signature::builder().input("in", schemas::integer()).build()
    }

    async fn run(&mut self, ports: &mut dyn Ports) -> Result<Outcome, AgentError> {
        ports.receive("in")?;
        Err(AgentError::failed("wired to fail"))
    }
}

fn feed_into_faulty() -> GraphSpec {
    let mut graph = GraphSpec::new();
    graph.add_agent("feed", Box::new(Relay::new(schemas::integer())));
    graph.add_agent("faulty", Box::new(Faulty));
    graph.expose_input("in", Endpoint::new("feed", "in"));
    graph.connect(Endpoint::new("feed", "out"), Endpoint::new("faulty", "in"));
    graph
}

#[tokio::test]
async fn isolate_closes_ports_and_spares_siblings() {
    let mut graph = GraphSpec::new();
    graph.add_agent("faulty", Box::new(Faulty));
    graph.add_agent("relay", Box::new(Relay::new(schemas::integer())));
    graph.expose_input("bad", Endpoint::new("faulty", "in"));
    graph.expose_input("good", Endpoint::new("relay", "in"));
    graph.expose_output("out", Endpoint::new("relay", "out"));

    let network = graph.build(NetworkConfig::default()).unwrap();
    let mut handle = network.start();
    let mut out = handle.take_output("out").unwrap();

    handle.inject("bad", int_msg(1)).await.unwrap();
    handle.inject("good", int_msg(2)).await.unwrap();

    // The sibling is untouched by the failure.
    assert_eq!(out.recv().await.unwrap().decode::<u64>().unwrap(), 2);

    match handle.await_terminal().await {
        RunOutcome::Failed(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].agent.as_str(), "faulty");
            assert!(failures[0].error.to_string().contains("wired to fail"));
        }
        RunOutcome::Completed => panic!("the failure must be surfaced"),
    }
}

#[tokio::test]
async fn isolate_makes_upstream_observe_the_close() {
    let network = feed_into_faulty().build(NetworkConfig::default()).unwrap();
    let handle = network.start();

    handle.inject("in", int_msg(1)).await.unwrap();
    sleep(Duration::from_millis(150)).await;
    // The failed agent's input closed, so the next forward fails upstream.
    handle.inject("in", int_msg(2)).await.unwrap();

    match handle.await_terminal().await {
        RunOutcome::Failed(failures) => {
            let mut agents: Vec<_> = failures.iter().map(|f| f.agent.as_str()).collect();
            agents.sort();
            assert_eq!(agents, vec!["faulty", "feed"]);
        }
        RunOutcome::Completed => panic!("the failures must be surfaced"),
    }
}

#[tokio::test]
async fn stall_keeps_channels_open_for_upstream() {
    let mut config = NetworkConfig::default();
    config.failure_policy = FailurePolicy::Stall;

    let network = feed_into_faulty().build(config).unwrap();
    let handle = network.start();

    handle.inject("in", int_msg(1)).await.unwrap();
    sleep(Duration::from_millis(150)).await;
    // The stalled agent's buffer still accepts: upstream does not fail.
    handle.inject("in", int_msg(2)).await.unwrap();

    match handle.await_terminal().await {
        RunOutcome::Failed(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].agent.as_str(), "faulty");
        }
        RunOutcome::Completed => panic!("the failure must be surfaced"),
    }
}

#[tokio::test]
async fn halt_cancels_the_whole_network() {
    trace();
    let mut config = NetworkConfig::default();
    config.failure_policy = FailurePolicy::Halt;

    let mut graph = GraphSpec::new();
    graph.add_agent("faulty", Box::new(Faulty));
    graph.add_agent("relay", Box::new(Relay::new(schemas::integer())));
    graph.expose_input("bad", Endpoint::new("faulty", "in"));
    graph.expose_input("good", Endpoint::new("relay", "in"));
    graph.expose_output("out", Endpoint::new("relay", "out"));

    let network = graph.build(config).unwrap();
    let mut handle = network.start();
    let mut out = handle.take_output("out").unwrap();

    handle.inject("bad", int_msg(1)).await.unwrap();

    // Everything winds down; the sibling is cancelled with the network.
    match handle.await_terminal().await {
        RunOutcome::Failed(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].agent.as_str(), "faulty");
        }
        RunOutcome::Completed => panic!("the failure must be surfaced"),
    }
    assert!(out.recv().await.is_none());
}

// --- Boundary contract ---

#[tokio::test]
async fn inject_rejects_unknown_ports_and_wrong_schemas() {
    let mut graph = GraphSpec::new();
    graph.add_agent("relay", Box::new(Relay::new(schemas::integer())));
    graph.expose_input("in", Endpoint::new("relay", "in"));
    graph.expose_output("out", Endpoint::new("relay", "out"));

    let network = graph.build(NetworkConfig::default()).unwrap();
    let handle = network.start();

    let err = handle.inject("sideways", int_msg(1)).await.unwrap_err();
    assert!(matches!(err, NetworkError::UnknownBoundary(_)));

    let err = handle.inject("in", text_msg("nope")).await.unwrap_err();
    assert!(matches!(err, NetworkError::SchemaMismatch { .. }));

    assert!(handle.await_terminal().await.is_completed());
}
