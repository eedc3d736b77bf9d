//! Construction-time validation: every malformed-network condition is
//! rejected by `build`, before any agent ever runs.

use async_trait::async_trait;
use weft_core::test_utils::{AndGate, CloneFan, EmitOnce, Limiter, Relay, schemas};
use weft_core::{Agent, AgentError, Message, Outcome, Ports, Signature};
use weft_net::{BuildError, Endpoint, GraphSpec, NetworkConfig};

fn bool_msg(value: bool) -> Message {
    Message::encode(&schemas::boolean(), &value).unwrap()
}

// --- Well-formed networks build ---

#[test]
fn minimal_network_builds() {
    let mut graph = GraphSpec::new();
    graph.add_agent("gate", Box::new(AndGate));
    graph.expose_input("a", Endpoint::new("gate", "a"));
    graph.expose_input("b", Endpoint::new("gate", "b"));
    graph.expose_output("out", Endpoint::new("gate", "out"));

    let network = graph.build(NetworkConfig::default()).unwrap();
    let mut inputs = network.boundary_inputs();
    inputs.sort();
    assert_eq!(inputs, vec!["a", "b"]);
    assert_eq!(network.boundary_outputs(), vec!["out"]);
}

#[test]
fn build_is_deterministic_over_the_same_wiring() {
    for _ in 0..2 {
        let mut graph = GraphSpec::new();
        graph.add_agent("relay", Box::new(Relay::new(schemas::text())));
        graph.expose_input("in", Endpoint::new("relay", "in"));
        graph.expose_output("out", Endpoint::new("relay", "out"));
        assert!(graph.build(NetworkConfig::default()).is_ok());
    }
}

// --- Mandatory-input coverage ---

#[test]
fn dangling_mandatory_input_is_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("gate", Box::new(AndGate));
    graph.expose_input("a", Endpoint::new("gate", "a"));
    // "b" is neither connected nor exposed.
    graph.expose_output("out", Endpoint::new("gate", "out"));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::MissingConnection { .. }));
    assert!(err.to_string().contains("gate.b"));
}

#[test]
fn two_producers_for_one_mandatory_input_are_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("one", Box::new(EmitOnce::new(bool_msg(true))));
    graph.add_agent("two", Box::new(EmitOnce::new(bool_msg(false))));
    graph.add_agent("relay", Box::new(Relay::new(schemas::boolean())));
    graph.connect(Endpoint::new("one", "out"), Endpoint::new("relay", "in"));
    graph.connect(Endpoint::new("two", "out"), Endpoint::new("relay", "in"));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::DuplicateConnection { .. }));
}

// --- Schema compatibility ---

#[test]
fn schema_mismatch_is_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("words", Box::new(Relay::new(schemas::text())));
    graph.add_agent("gate", Box::new(AndGate));
    graph.expose_input("in", Endpoint::new("words", "in"));
    graph.connect(Endpoint::new("words", "out"), Endpoint::new("gate", "a"));
    graph.expose_input("b", Endpoint::new("gate", "b"));
    graph.expose_output("out", Endpoint::new("gate", "out"));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::SchemaMismatch { .. }));
    assert!(err.to_string().contains("text@1"));
    assert!(err.to_string().contains("bool@1"));
}

// --- Endpoint addressing ---

#[test]
fn unknown_agent_is_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("relay", Box::new(Relay::new(schemas::text())));
    graph.expose_input("in", Endpoint::new("relay", "in"));
    graph.connect(Endpoint::new("relay", "out"), Endpoint::new("ghost", "in"));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(err.to_string().contains("unknown agent: ghost"));
}

#[test]
fn unknown_port_is_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("relay", Box::new(Relay::new(schemas::text())));
    graph.expose_input("in", Endpoint::new("relay", "in"));
    graph.expose_output("out", Endpoint::new("relay", "sideways"));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::UnknownPort { .. }));
}

#[test]
fn element_on_simple_port_is_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("relay", Box::new(Relay::new(schemas::text())));
    graph.expose_input("in", Endpoint::new("relay", "in"));
    graph.expose_output("out", Endpoint::element("relay", "out", "x"));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::UnexpectedElement { .. }));
}

#[test]
fn array_port_without_element_is_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("fan", Box::new(CloneFan::new(schemas::text())));
    graph.expose_input("in", Endpoint::new("fan", "in"));
    graph.expose_output("out", Endpoint::new("fan", "clone"));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::MissingElement { .. }));
}

#[test]
fn input_cannot_produce() {
    let mut graph = GraphSpec::new();
    graph.add_agent("relay", Box::new(Relay::new(schemas::text())));
    graph.expose_input("in", Endpoint::new("relay", "in"));
    graph.connect(Endpoint::new("relay", "in"), Endpoint::new("relay", "in"));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::NotAProducer { .. }));
}

// --- Identity rules ---

#[test]
fn duplicate_agent_id_is_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("relay", Box::new(Relay::new(schemas::text())));
    graph.add_agent("relay", Box::new(Relay::new(schemas::text())));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::DuplicateAgent { .. }));
}

struct ClashingPorts;

#[async_trait]
impl Agent for ClashingPorts {
    fn signature(&self) -> Signature {
        Signature::builder()
            .input("x", schemas::text())
            .output("x", schemas::text())
            .build()
    }

    async fn run(&mut self, _ports: &mut dyn Ports) -> Result<Outcome, AgentError> {
        Ok(Outcome::End)
    }
}

#[test]
fn duplicate_port_name_is_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("bad", Box::new(ClashingPorts));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::DuplicatePort { .. }));
}

#[test]
fn duplicate_boundary_name_is_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("gate", Box::new(AndGate));
    graph.expose_input("x", Endpoint::new("gate", "a"));
    graph.expose_input("x", Endpoint::new("gate", "b"));
    graph.expose_output("out", Endpoint::new("gate", "out"));

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::DuplicateBoundary { .. }));
}

// --- Seeds ---

#[test]
fn seed_on_non_accumulator_is_rejected() {
    let mut graph = GraphSpec::new();
    graph.add_agent("limit", Box::new(Limiter::new(schemas::text())));
    graph.expose_input("in", Endpoint::new("limit", "in"));
    graph.expose_output("out", Endpoint::new("limit", "out"));
    graph.seed(
        Endpoint::new("limit", "limit"),
        Message::encode(&schemas::integer(), &3u64).unwrap(),
    );

    let err = graph.build(NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::SeedTarget { .. }));
}
