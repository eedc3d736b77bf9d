//! Wire a boolean AND gate, inject both operands, read the result.

use weft::prelude::*;
use weft_core::test_utils::{AndGate, schemas};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut graph = GraphSpec::new();
    graph.add_agent("gate", Box::new(AndGate));
    graph.expose_input("a", Endpoint::new("gate", "a"));
    graph.expose_input("b", Endpoint::new("gate", "b"));
    graph.expose_output("out", Endpoint::new("gate", "out"));

    let network = graph.build(NetworkConfig::default())?;
    let mut handle = network.start();
    let mut out = handle.take_output("out").expect("exposed above");

    handle
        .inject("a", Message::encode(&schemas::boolean(), &true)?)
        .await?;
    handle
        .inject("b", Message::encode(&schemas::boolean(), &true)?)
        .await?;

    let result = out.recv().await.expect("gate produces one message");
    println!("true AND true = {}", result.decode::<bool>()?);

    match handle.await_terminal().await {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Failed(failures) => Err(format!("{} agent(s) failed", failures.len()).into()),
    }
}
