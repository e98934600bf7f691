//! In-process stand-in for the toolkit interpreter.
//!
//! `FakeToolkit` implements `Transport` by answering requests directly, the
//! way the dispatcher would against a small fake `cubit` module. Clones share
//! state, so a test keeps one clone for assertions and hands the other to the
//! connection.

#![allow(dead_code)]

use cubit_bridge::{BridgeError, Connection, RemoteFault, Reply, Request, Result, Transport};
use serde_json::{json, Map, Value as Json};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use tempfile::TempDir;

pub const ROOT_ID: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Object {
    Module,
    Vertex(i64),
    Volume(i64),
    Body(i64),
}

impl Object {
    fn display(&self) -> String {
        match self {
            Object::Module => "<module 'cubit' from '/opt/cubit/bin/cubit.py'>".to_string(),
            Object::Vertex(n) => format!("<cubit.Vertex; vertex {n}>"),
            Object::Volume(n) => format!("<cubit.Volume; volume {n}>"),
            Object::Body(n) => format!("<cubit.Body; body {n}>"),
        }
    }

    fn members(&self) -> &'static [(&'static str, bool)] {
        match self {
            Object::Module => &[
                ("body", true),
                ("cmd", true),
                ("cubit_module", true),
                ("echo", true),
                ("get_nodeset_id_list", true),
                ("get_nodeset_nodes_inclusive", true),
                ("identity", true),
                ("nested", true),
                ("raise_error", true),
                ("settings", true),
                ("version", false),
                ("vertex", true),
                ("volume", true),
            ],
            Object::Vertex(_) => &[("coordinates", true), ("id", false)],
            Object::Volume(_) => &[("id", false), ("vertices", true)],
            Object::Body(_) => &[("id", false)],
        }
    }

    fn category(&self) -> Option<&'static str> {
        match self {
            Object::Vertex(_) => Some("cubitpy_vertex"),
            Object::Volume(_) => Some("cubitpy_volume"),
            _ => None,
        }
    }
}

#[derive(Default)]
struct State {
    closed: bool,
    objects: HashMap<u64, Object>,
    free_ids: Vec<u64>,
    next_id: u64,
    vertices: HashMap<i64, u64>,
    nodesets: BTreeMap<i64, Vec<i64>>,
    params: Map<String, Json>,
    launch_args: Vec<String>,
    log_path: Option<PathBuf>,
    requests: Vec<Request>,
    deleted: Vec<u64>,
    pending: VecDeque<Json>,
}

fn fault(kind: &str, message: impl Into<String>) -> Json {
    Reply::Error(RemoteFault {
        kind: kind.to_string(),
        message: message.into(),
        traceback: Some("Traceback (most recent call last):\n  File \"<cubit-bridge>\"".to_string()),
    })
    .to_json()
}

fn ok(value: Json) -> Json {
    Reply::Ok(value).to_json()
}

impl State {
    fn handle(&self, id: u64) -> Json {
        json!([format!("cp2t3id_{id}"), self.objects[&id].display()])
    }

    /// Python reuses the ids of collected objects.
    fn allocate(&mut self, object: Object) -> u64 {
        let id = self.free_ids.pop().unwrap_or_else(|| {
            self.next_id += 1;
            ROOT_ID + self.next_id
        });
        self.objects.insert(id, object);
        id
    }

    fn vertex(&mut self, n: i64) -> Json {
        let id = match self.vertices.get(&n) {
            Some(id) => *id,
            None => {
                let id = self.allocate(Object::Vertex(n));
                self.vertices.insert(n, id);
                id
            }
        };
        self.handle(id)
    }

    fn write_log(&self, line: &str) {
        if let Some(path) = &self.log_path {
            let mut file = OpenOptions::new().append(true).create(true).open(path).unwrap();
            writeln!(file, "{line}").unwrap();
        }
    }

    fn cmd(&mut self, command: &str) {
        self.write_log(&format!("Journaled Command: {command}"));
        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            ["nodeset", id, kind, entity] => {
                let id: i64 = id.parse().unwrap();
                let entity: i64 = entity.parse().unwrap();
                let nodes = match *kind {
                    "vertex" => vec![entity * 100],
                    "volume" => (1..=8).map(|i| entity * 100 + i).collect(),
                    _ => Vec::new(),
                };
                self.nodesets.insert(id, nodes);
            }
            ["delete", "nodeset", id] => {
                self.nodesets.remove(&id.parse::<i64>().unwrap());
            }
            _ => {}
        }
    }

    fn int_arg(args: &[Json], i: usize) -> i64 {
        args.get(i).and_then(Json::as_i64).unwrap()
    }

    fn call(&mut self, receiver: u64, method: &str, args: &[Json]) -> Json {
        let Some(object) = self.objects.get(&receiver).copied() else {
            return fault("KeyError", receiver.to_string());
        };
        let value = match (object, method) {
            (Object::Module, "cmd") => {
                let command = args[0].as_str().unwrap().to_string();
                self.cmd(&command);
                Json::Null
            }
            (Object::Module, "vertex") => self.vertex(Self::int_arg(args, 0)),
            (Object::Module, "volume") => {
                let id = self.allocate(Object::Volume(Self::int_arg(args, 0)));
                self.handle(id)
            }
            (Object::Module, "body") => {
                let id = self.allocate(Object::Body(Self::int_arg(args, 0)));
                self.handle(id)
            }
            (Object::Module, "get_nodeset_id_list") => json!(self.nodesets.keys().collect::<Vec<_>>()),
            (Object::Module, "get_nodeset_nodes_inclusive") => {
                json!(self.nodesets.get(&Self::int_arg(args, 0)).cloned().unwrap_or_default())
            }
            (Object::Module, "version") => json!("16.0"),
            (Object::Module, "cubit_module") => self.handle(ROOT_ID),
            (Object::Module, "echo") => Json::Array(args.to_vec()),
            (Object::Module, "identity") => args[0].clone(),
            (Object::Module, "settings") => json!({ "journal": true }),
            (Object::Module, "nested") => json!([[1, 2], [3]]),
            (Object::Module, "raise_error") => {
                self.write_log("ERROR: boom");
                return fault("RuntimeError", "boom");
            }
            (Object::Vertex(n), "id") | (Object::Volume(n), "id") | (Object::Body(n), "id") => {
                json!(n)
            }
            (Object::Vertex(n), "coordinates") => json!([n as f64, 0.0, 0.5]),
            (Object::Volume(n), "vertices") => {
                let first = self.vertex(n * 10 + 1);
                let second = self.vertex(n * 10 + 2);
                json!([first, second])
            }
            _ => {
                return fault(
                    "AttributeError",
                    format!("object has no attribute '{method}'"),
                )
            }
        };
        ok(value)
    }

    fn dispatch(&mut self, request: Request) -> Json {
        match request {
            Request::Parameters(params) => {
                self.params = params;
                ok(json!(true))
            }
            Request::Init { launch_args } => {
                self.log_path = launch_args
                    .iter()
                    .position(|arg| arg == "-log")
                    .and_then(|i| launch_args.get(i + 1))
                    .map(PathBuf::from);
                self.launch_args = launch_args;
                self.objects.insert(ROOT_ID, Object::Module);
                ok(self.handle(ROOT_ID))
            }
            Request::Call {
                receiver,
                method,
                args,
            } => self.call(receiver.id(), &method, &args),
            Request::IsCallable { handle, name } => match self.objects.get(&handle.id()) {
                Some(object) => match object.members().iter().find(|(m, _)| *m == name) {
                    Some((_, callable)) => ok(json!(callable)),
                    None => fault("AttributeError", format!("object has no attribute '{name}'")),
                },
                None => fault("KeyError", handle.id().to_string()),
            },
            Request::IsInstance { handle, category } => {
                let object = self.objects.get(&handle.id());
                ok(json!(object.and_then(Object::category) == Some(category.as_str())))
            }
            Request::GetSelfDir { handle } => match self.objects.get(&handle.id()) {
                Some(object) => ok(json!(object.members())),
                None => fault("KeyError", handle.id().to_string()),
            },
            Request::Delete { handle } => {
                let id = handle.id();
                if let Some(object) = self.objects.remove(&id) {
                    if let Object::Vertex(n) = object {
                        self.vertices.remove(&n);
                    }
                    self.free_ids.push(id);
                }
                self.deleted.push(id);
                ok(Json::Null)
            }
        }
    }
}

/// Lets a test stop method calls inside the toolkit while the connection
/// still holds its channel.
#[derive(Default)]
struct Gate {
    held: bool,
    parked: usize,
}

#[derive(Clone, Default)]
pub struct FakeToolkit {
    state: Arc<Mutex<State>>,
    gate: Arc<(Mutex<Gate>, Condvar)>,
}

impl FakeToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn requests(&self) -> Vec<Request> {
        self.with(|s| s.requests.clone())
    }

    pub fn count(&self, verb: &str) -> usize {
        self.with(|s| s.requests.iter().filter(|r| r.verb() == verb).count())
    }

    pub fn deleted(&self) -> Vec<u64> {
        self.with(|s| s.deleted.clone())
    }

    pub fn params(&self) -> Map<String, Json> {
        self.with(|s| s.params.clone())
    }

    pub fn launch_args(&self) -> Vec<String> {
        self.with(|s| s.launch_args.clone())
    }

    pub fn live_objects(&self) -> usize {
        self.with(|s| s.objects.len())
    }

    pub fn nodeset_ids(&self) -> Vec<i64> {
        self.with(|s| s.nodesets.keys().copied().collect())
    }

    pub fn add_nodeset(&self, id: i64) {
        self.with(|s| s.nodesets.insert(id, Vec::new()));
    }

    /// Method calls sent from now on wait until `resume_calls`.
    pub fn hold_calls(&self) {
        self.gate.0.lock().unwrap().held = true;
    }

    pub fn wait_for_parked_call(&self) {
        let (lock, cvar) = &*self.gate;
        let _gate = cvar.wait_while(lock.lock().unwrap(), |g| g.parked == 0).unwrap();
    }

    pub fn resume_calls(&self) {
        let (lock, cvar) = &*self.gate;
        lock.lock().unwrap().held = false;
        cvar.notify_all();
    }

    fn pass_gate(&self) {
        let (lock, cvar) = &*self.gate;
        let mut gate = lock.lock().unwrap();
        if gate.held {
            gate.parked += 1;
            cvar.notify_all();
            gate = cvar.wait_while(gate, |g| g.held).unwrap();
            gate.parked -= 1;
        }
    }

    /// Simulate the interpreter exiting on its own.
    pub fn exit(&self) {
        self.with(|s| s.closed = true);
    }
}

impl Transport for FakeToolkit {
    fn send(&mut self, message: &Json) -> Result<()> {
        if matches!(Request::from_wire(message), Some(Request::Call { .. })) {
            self.pass_gate();
        }
        self.with(|s| {
            if s.closed {
                return Err(BridgeError::ChannelClosed);
            }
            let reply = match Request::from_wire(message) {
                Some(request) => {
                    s.requests.push(request.clone());
                    s.dispatch(request)
                }
                None => fault("ValueError", format!("Unknown message: {message}")),
            };
            s.pending.push_back(reply);
            Ok(())
        })
    }

    fn receive(&mut self) -> Result<Json> {
        self.with(|s| s.pending.pop_front()).ok_or_else(|| BridgeError::Transport {
            message: "No reply pending".to_string(),
            source: None,
        })
    }

    fn channel_count(&mut self) -> usize {
        self.with(|s| usize::from(!s.closed))
    }

    fn close(&mut self) -> Result<()> {
        self.with(|s| s.closed = true);
        Ok(())
    }
}

/// Everything handed to the diagnostic sink, one entry per forward.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<String>>>);

impl Captured {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

pub struct Harness {
    pub toolkit: FakeToolkit,
    pub captured: Captured,
    pub bin_dir: TempDir,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Connect to a fresh fake toolkit with log capture enabled.
pub fn connect() -> (Connection, Harness) {
    connect_with_args(Vec::<String>::new())
}

pub fn connect_with_args(args: Vec<impl Into<String>>) -> (Connection, Harness) {
    init_tracing();
    let toolkit = FakeToolkit::new();
    let captured = Captured::default();
    let bin_dir = TempDir::new().expect("Failed to create temp dir");

    let sink = captured.0.clone();
    let conn = Connection::builder()
        .cubit_bin_path(bin_dir.path())
        .launch_args(args)
        .diagnostic_sink(move |text: &str| sink.lock().unwrap().push(text.to_string()))
        .connect_with(Box::new(toolkit.clone()))
        .expect("Failed to connect to fake toolkit");

    (
        conn,
        Harness {
            toolkit,
            captured,
            bin_dir,
        },
    )
}
