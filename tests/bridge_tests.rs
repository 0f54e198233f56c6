use fieldbot::bridge::protocol::{self, Message};
use fieldbot::bridge::BridgeServer;
use fieldbot::kernel::action::Action;
use fieldbot::kernel::event::{ConsoleCommand, EndSignal, Event, ImageFrame, Pass, Telemetry};
use fieldbot::kernel::reactor::{Reactor, ReactorConfig};
use fieldbot::persistence::NullSink;
use fieldbot::planner::PlannerConfig;
use fieldbot::robot::BrainClient;
use fieldbot::vision::{Classification, FixedClassifier};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::codec::{Framed, LinesCodec};
use tokio_util::sync::CancellationToken;

#[test]
fn test_every_action_round_trips() {
    for action in Action::ALL {
        let line = protocol::encode(&Message::response(action)).expect("encode");
        assert_eq!(protocol::decode(&line).expect("decode"), Message::response(action));
        assert_eq!(action.as_str().parse::<Action>().expect("parse"), action);
    }
    assert_eq!("FINISH".parse::<Action>().expect("parse"), Action::Finish);
    assert!("fly".parse::<Action>().is_err());
}

#[test]
fn test_response_wire_format() {
    let line = protocol::encode(&Message::response(Action::Grab)).expect("encode");
    let v: Value = serde_json::from_str(&line).expect("json");
    assert_eq!(v, serde_json::json!({"type": "response", "action": "grab"}));
}

#[test]
fn test_request_accepts_camel_case_and_defaults() {
    let line = r#"{"type":"request","lastAction":"seek","atEnd":2,"atPlant":0}"#;
    let msg = protocol::decode(line).expect("decode");
    assert_eq!(
        msg,
        Message::Request(Telemetry {
            last_action: Some(Action::Seek),
            at_end: EndSignal::FarEnd,
            at_plant: 0,
            pass: Pass::Outbound,
            image: None,
        })
    );

    let line = r#"{"type":"request","last_action":null,"at_end":0,"at_plant":0,"pass":2}"#;
    match protocol::decode(line).expect("decode") {
        Message::Request(t) => {
            assert_eq!(t.last_action, None);
            assert_eq!(t.pass, Pass::Return);
        }
        other => panic!("expected a request, got {:?}", other),
    }
}

#[test]
fn test_request_encoding_matches_decoding() {
    let t = Telemetry {
        last_action: Some(Action::Grab),
        at_end: EndSignal::NearEnd,
        at_plant: 4,
        pass: Pass::Return,
        image: Some(ImageFrame {
            width: 1,
            height: 1,
            data: vec![10, 20, 30],
        }),
    };
    let line = protocol::encode_request(&t).expect("encode");
    let v: Value = serde_json::from_str(&line).expect("json");
    assert_eq!(v["type"], "request");
    assert_eq!(v["at_end"], 1);
    assert_eq!(v["image"]["data"], serde_json::json!([10, 20, 30]));

    assert_eq!(protocol::decode(&line).expect("decode"), Message::Request(t));
}

#[test]
fn test_bad_requests_rejected() {
    assert!(protocol::decode("not json").is_err());
    assert!(protocol::decode(r#"{"type":"request","atEnd":7}"#).is_err());
    assert!(protocol::decode(r#"{"type":"request","pass":0}"#).is_err());
    assert!(protocol::decode(r#"{"type":"request","lastAction":"dance"}"#).is_err());
    assert!(protocol::decode(r#"{"type":"hello"}"#).is_err());
}

fn reactor_config() -> ReactorConfig {
    ReactorConfig {
        listen_interval: Duration::from_millis(5),
        display_interval: Duration::from_secs(60),
        run_time: Duration::from_secs(300),
        give_up_time: Duration::from_secs(30),
        planner: PlannerConfig {
            num_rows: 2,
            num_plants: 4,
            slots_per_row: 6,
        },
        title: "test".to_string(),
    }
}

async fn start() -> (Reactor, mpsc::Sender<Event>, String, CancellationToken) {
    start_with_idle(Duration::from_secs(60)).await
}

async fn start_with_idle(idle_timeout: Duration) -> (Reactor, mpsc::Sender<Event>, String, CancellationToken) {
    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let server = BridgeServer::bind("127.0.0.1:0", tx.clone(), idle_timeout)
        .await
        .expect("bind");
    let addr = server.local_addr().expect("addr").to_string();
    tokio::spawn(server.serve(cancel.clone()));

    let reactor = Reactor::new(
        rx,
        reactor_config(),
        Box::new(FixedClassifier(Classification::Unknown)),
        Box::new(NullSink),
        cancel.clone(),
    );
    (reactor, tx, addr, cancel)
}

#[tokio::test]
async fn test_client_round_trip_through_reactor() {
    let (mut reactor, tx, addr, _cancel) = start().await;

    let robot = tokio::spawn(async move {
        let mut client = BrainClient::connect(&addr, Duration::from_secs(5)).await.expect("connect");
        let mut t = Telemetry::default();

        // Not running yet.
        let first = client.request_action(&t).await.expect("first");
        t.last_action = Some(first);
        let second = client.request_action(&t).await.expect("second");

        tx.send(Event::Console(ConsoleCommand::Run)).await.expect("run");
        t.last_action = None;
        let third = client.request_action(&t).await.expect("third");

        tx.send(Event::Console(ConsoleCommand::Shutdown)).await.expect("shutdown");
        vec![first, second, third]
    });

    reactor.run().await;
    let actions = robot.await.expect("robot task");

    assert_eq!(actions, vec![Action::Clear, Action::Wait, Action::Begin]);
    assert_eq!(reactor.session.state.action_count, 3);
    assert_eq!(reactor.session.state.row, 1);
}

#[tokio::test]
async fn test_undecodable_line_gets_no_response() {
    let (mut reactor, tx, addr, _cancel) = start().await;

    let robot = tokio::spawn(async move {
        let stream = TcpStream::connect(&addr).await.expect("connect");
        let mut framed = Framed::new(stream, LinesCodec::new());

        framed.send("{garbage".to_string()).await.expect("send");
        framed.send(String::new()).await.expect("send");
        framed
            .send(r#"{"type":"request","lastAction":"clear"}"#.to_string())
            .await
            .expect("send");

        // The only reply is to the well-formed request.
        let reply = framed.next().await.expect("line").expect("codec");
        tx.send(Event::Console(ConsoleCommand::Shutdown)).await.expect("shutdown");
        reply
    });

    reactor.run().await;
    let reply = robot.await.expect("robot task");
    assert_eq!(protocol::decode(&reply).expect("decode"), Message::response(Action::Wait));
    assert_eq!(reactor.session.state.action_count, 1);
}

#[tokio::test]
async fn test_client_times_out_without_reply() {
    // A listener that accepts and never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.expect("accept");
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let mut client = BrainClient::connect(&addr, Duration::from_millis(50)).await.expect("connect");
    let err = client.request_action(&Telemetry::default()).await.expect_err("timeout");
    assert_eq!(err.kind(), fieldbot::error::LinkErrorKind::Timeout);
}

#[tokio::test]
async fn test_silent_connection_dropped_for_reconnect() {
    let (mut reactor, tx, addr, _cancel) = start_with_idle(Duration::from_millis(100)).await;

    let robot = tokio::spawn(async move {
        // Connects and never sends: the server is stuck on this socket until it gives up.
        let stale = TcpStream::connect(&addr).await.expect("stale connect");

        let mut client = BrainClient::connect(&addr, Duration::from_secs(5)).await.expect("connect");
        let action = client.request_action(&Telemetry::default()).await.expect("served after idle drop");

        tx.send(Event::Console(ConsoleCommand::Shutdown)).await.expect("shutdown");
        drop(stale);
        action
    });

    reactor.run().await;
    assert_eq!(robot.await.expect("robot task"), Action::Clear);
}
