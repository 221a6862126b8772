//! The embedded Jonquil script engine: a compact ECMAScript-flavored
//! interpreter exposing the operations the shell drives — parse, run, eval,
//! snapshot save/exec, literal extraction, global registration, and a FIFO
//! queue of deferred promise reactions.

pub mod ast;
pub mod environment;
mod interp;
mod lexer;
mod parser;
#[cfg(feature = "snapshot")]
mod snapshot;
pub mod value;

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use self::{
    ast::Program,
    environment::{Scope, ScopeRef},
    interp::{Interp, JobQueue},
    value::{ErrorValue, HostFn, Value},
};

/// Which program semantics a snapshot is serialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotTarget {
    Global,
    Eval,
}

/// Output shape of a literal-table dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralFormat {
    List,
    CSource,
}

/// Engine capabilities a host may probe before relying on an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    ErrorMessages,
    ParserDump,
    MemStats,
    RegexpDump,
    Debugger,
    SnapshotSave,
    SnapshotExec,
}

/// Engine start-up options.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitFlags {
    /// Log every parsed program at DEBUG level.
    pub show_opcodes: bool,
}

/// A parsed top-level script, ready to run.
pub struct Script {
    program: Program,
}

/// The engine instance. Owns the global scope and the deferred-job queue;
/// dropping it is the single teardown point.
pub struct Engine {
    globals: ScopeRef,
    jobs: JobQueue,
    flags: InitFlags,
}

impl Engine {
    pub fn init(flags: InitFlags) -> Self {
        let globals = Scope::global();
        let engine = Self {
            globals,
            jobs: Rc::new(RefCell::new(VecDeque::new())),
            flags,
        };
        engine.install_prelude();
        engine
    }

    /// Whether this engine build supports a capability.
    pub fn has_feature(feature: Feature) -> bool {
        match feature {
            Feature::ErrorMessages | Feature::ParserDump => true,
            Feature::SnapshotSave | Feature::SnapshotExec => cfg!(feature = "snapshot"),
            Feature::MemStats | Feature::RegexpDump | Feature::Debugger => false,
        }
    }

    /// Expose a host function as a global, immutable binding.
    pub fn register_global(&mut self, name: &'static str, callback: HostFn) {
        self.globals
            .borrow_mut()
            .define(name.to_string(), Value::native(name, callback), false);
    }

    pub fn parse(&self, source: &str) -> Result<Script, ErrorValue> {
        let program = parser::parse_program(source)?;
        if self.flags.show_opcodes {
            debug!("parsed program:\n{program:#?}");
        }
        Ok(Script { program })
    }

    pub fn run(&mut self, script: &Script) -> Result<Value, ErrorValue> {
        self.interp().run_program(&script.program)
    }

    pub fn eval(&mut self, source: &str) -> Result<Value, ErrorValue> {
        let script = self.parse(source)?;
        self.run(&script)
    }

    /// Run one deferred reaction. `None` means the queue is empty.
    pub fn run_pending_job(&mut self) -> Option<Result<Value, ErrorValue>> {
        let job = self.jobs.borrow_mut().pop_front()?;
        Some(self.interp().call_value(&job.callback, &[job.argument]))
    }

    #[cfg(feature = "snapshot")]
    pub fn save_snapshot(
        &self,
        source: &str,
        target: SnapshotTarget,
    ) -> Result<Vec<u8>, ErrorValue> {
        let script = self.parse(source)?;
        snapshot::encode(&snapshot::SnapshotBody {
            target,
            program: script.program,
        })
    }

    #[cfg(not(feature = "snapshot"))]
    pub fn save_snapshot(
        &self,
        _source: &str,
        _target: SnapshotTarget,
    ) -> Result<Vec<u8>, ErrorValue> {
        Err(ErrorValue::plain("snapshot support is not compiled in"))
    }

    #[cfg(feature = "snapshot")]
    pub fn exec_snapshot(&mut self, blob: &[u8]) -> Result<Value, ErrorValue> {
        let body = snapshot::decode(blob)?;
        let value = self.interp().run_program(&body.program)?;
        Ok(match body.target {
            SnapshotTarget::Global => Value::undefined(),
            SnapshotTarget::Eval => value,
        })
    }

    #[cfg(not(feature = "snapshot"))]
    pub fn exec_snapshot(&mut self, _blob: &[u8]) -> Result<Value, ErrorValue> {
        Err(ErrorValue::plain("snapshot support is not compiled in"))
    }

    #[cfg(feature = "snapshot")]
    pub fn save_literals(
        &self,
        source: &str,
        format: LiteralFormat,
    ) -> Result<Vec<u8>, ErrorValue> {
        let script = self.parse(source)?;
        let literals = snapshot::literal_table(&script.program);
        Ok(snapshot::render_literals(&literals, format))
    }

    #[cfg(not(feature = "snapshot"))]
    pub fn save_literals(
        &self,
        _source: &str,
        _format: LiteralFormat,
    ) -> Result<Vec<u8>, ErrorValue> {
        Err(ErrorValue::plain("snapshot support is not compiled in"))
    }

    fn interp(&self) -> Interp {
        Interp::new(Rc::clone(&self.globals), Rc::clone(&self.jobs))
    }

    fn install_prelude(&self) {
        let mut resolve_table = indexmap::IndexMap::new();
        resolve_table.insert("resolve".to_string(), Value::native("resolve", promise_resolve));
        self.globals
            .borrow_mut()
            .define("Promise".to_string(), Value::object(resolve_table), false);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let dropped = self.jobs.borrow_mut().drain(..).count();
        if dropped > 0 {
            trace!("discarded {dropped} pending job(s) at teardown");
        }
        trace!("engine torn down");
    }
}

fn promise_resolve(args: &[Value]) -> Result<Value, ErrorValue> {
    let value = args.first().cloned().unwrap_or_else(Value::undefined);
    if matches!(value.kind(), value::ValueKind::Promise(_)) {
        return Ok(value);
    }
    Ok(Value::fulfilled_promise(value))
}
