//! The tree-walking executor.
//!
//! The machine walks the compiled program against a scope stack of shared
//! mutable cells, with `data` bound in the root scope. Three accounting
//! contracts are enforced here: every statement accounts once immediately
//! before it runs, every loop iteration re-accounts the loop statement and
//! one iteration before the body runs, and every call (builtin, host
//! function, or lambda) brackets its execution with call-depth
//! enter/exit - on every exit path. Any error propagating out of a
//! statement without a location is stamped with that statement's span.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use jam_compiler::program::{ArgIr, CallIr, Instr, Ir, LambdaIr, Program, Target};
use jam_core::diag::MessageCode;
use jam_core::error::RuntimeError;
use jam_core::ops;
use jam_core::signature::{Parameter, ParameterType};
use jam_core::value::{TypeHint, Value};
use jam_core::ExecutionContext;

use crate::function::ScriptFunction;

static NULL: Value = Value::Null;

/// One variable binding: a shared mutable cell plus the declared hint.
#[derive(Clone)]
struct Binding {
    cell: Rc<RefCell<Value>>,
    hint: Option<TypeHint>,
}

impl Binding {
    fn new(value: Value, hint: Option<TypeHint>) -> Self {
        Binding {
            cell: Rc::new(RefCell::new(value)),
            hint: hint.filter(|h| *h != TypeHint::Any),
        }
    }
}

type Scope = HashMap<String, Binding>;

/// Control-flow signals that unwind statement execution. `Return`
/// carries the explicit result value, if the statement had one.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Option<Value>),
}

/// A lambda argument captured at its call site, invocable by builtins.
#[derive(Clone)]
pub struct LambdaValue {
    ir: Arc<LambdaIr>,
    captured: Vec<Scope>,
}

/// Execute a compiled program against `data`.
///
/// `functions` must parallel `program.slots` (the engine resolves the
/// linked slot list against its registry). Returns the value of an
/// explicit `return <expr>`, or the final `data` otherwise; the completion
/// message, if any, is left on the context.
pub fn run_program(
    program: &Program,
    functions: &[Arc<dyn ScriptFunction>],
    data: Value,
    ctx: &mut ExecutionContext,
) -> Result<Value, RuntimeError> {
    ctx.begin();
    tracing::debug!(
        statements = program.body.len(),
        functions = functions.len(),
        "execution started"
    );
    let data_binding = Binding::new(data, None);
    let mut root = Scope::new();
    root.insert(jam_compiler::validator::DATA_VARIABLE.to_string(), data_binding.clone());
    let mut machine = Machine {
        program,
        functions: functions.to_vec(),
        scopes: vec![root],
        ctx,
    };
    match machine.exec_seq(&program.body)? {
        // An explicit `return <expr>` yields that value; bare `return`
        // and normal completion yield the current `data`.
        Flow::Return(Some(value)) => Ok(value),
        _ => {
            let result = data_binding.cell.borrow().clone();
            Ok(result)
        }
    }
}

struct Machine<'p, 'c> {
    program: &'p Program,
    functions: Vec<Arc<dyn ScriptFunction>>,
    scopes: Vec<Scope>,
    ctx: &'c mut ExecutionContext,
}

impl<'p, 'c> Machine<'p, 'c> {
    fn binding(&self, name: &str) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    fn load(&self, name: &str) -> Result<Value, RuntimeError> {
        match self.binding(name) {
            Some(binding) => Ok(binding.cell.borrow().clone()),
            None => Err(RuntimeError::fault(format!(
                "variable '{name}' is not bound"
            ))),
        }
    }

    fn declare(&mut self, name: &str, value: Value, hint: Option<TypeHint>) {
        let scope = self.scopes.last_mut().expect("machine always has a scope");
        scope.insert(name.to_string(), Binding::new(value, hint));
    }

    // ── Statements ───────────────────────────────────────────────────────

    fn exec_seq(&mut self, instrs: &[Instr]) -> Result<Flow, RuntimeError> {
        for instr in instrs {
            match self.exec_instr(instr)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_block(&mut self, instrs: &[Instr]) -> Result<Flow, RuntimeError> {
        self.scopes.push(Scope::new());
        let result = self.exec_seq(instrs);
        self.scopes.pop();
        result
    }

    /// One statement: account, run, and stamp the span onto any
    /// location-less error.
    fn exec_instr(&mut self, instr: &Instr) -> Result<Flow, RuntimeError> {
        let span = instr.span();
        self.ctx.track_statement().map_err(|e| e.or_span(span))?;
        self.dispatch(instr).map_err(|e| e.or_span(span))
    }

    fn dispatch(&mut self, instr: &Instr) -> Result<Flow, RuntimeError> {
        match instr {
            Instr::Declare {
                name, hint, init, ..
            } => {
                let value = match init {
                    Some(ir) => {
                        let value = self.eval(ir)?;
                        if let Some(hint) = hint {
                            ops::coerce_to_hint(&value, *hint, name)?;
                        }
                        value
                    }
                    None => Value::Null,
                };
                self.declare(name, value, *hint);
                Ok(Flow::Normal)
            }
            Instr::Assign {
                target, op, value, ..
            } => {
                let value = match op {
                    None => self.eval(value)?,
                    Some(op) => {
                        let current = self.read_target(target)?;
                        let rhs = self.eval(value)?;
                        ops::evaluate_binary(*op, &current, &rhs)?
                    }
                };
                self.write_target(target, value)?;
                Ok(Flow::Normal)
            }
            Instr::If {
                cond,
                then_block,
                else_ifs,
                else_block,
                ..
            } => {
                if self.eval(cond)?.is_truthy() {
                    return self.exec_block(then_block);
                }
                for (elif_cond, elif_block) in else_ifs {
                    if self.eval(elif_cond)?.is_truthy() {
                        return self.exec_block(elif_block);
                    }
                }
                match else_block {
                    Some(block) => self.exec_block(block),
                    None => Ok(Flow::Normal),
                }
            }
            Instr::Switch {
                scrutinee,
                cases,
                default,
                ..
            } => {
                let subject = self.eval(scrutinee)?;
                for (comparands, body) in cases {
                    for comparand in comparands {
                        if self.eval(comparand)? == subject {
                            return self.exec_block(body);
                        }
                    }
                }
                match default {
                    Some(block) => self.exec_block(block),
                    None => Ok(Flow::Normal),
                }
            }
            Instr::While {
                cond, body, span, ..
            } => {
                loop {
                    if !self.eval(cond)?.is_truthy() {
                        break;
                    }
                    self.account_iteration(*span)?;
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Instr::For {
                var,
                start,
                end,
                step,
                descending,
                body,
                span,
            } => {
                let start = self.numeric_bound(start)?;
                let end = self.numeric_bound(end)?;
                let step = self.step_value(step)?;
                self.scopes.push(Scope::new());
                let binding = Binding::new(Value::Number(start), None);
                self.scopes
                    .last_mut()
                    .expect("scope just pushed")
                    .insert(var.clone(), binding.clone());
                let result = self.run_for(&binding, end, step, *descending, body, *span);
                self.scopes.pop();
                result
            }
            Instr::ForEach {
                var,
                collection,
                body,
                span,
            } => {
                let collection = self.eval(collection)?;
                let items = ops::to_iterable(&collection)?;
                self.scopes.push(Scope::new());
                let binding = Binding::new(Value::Null, None);
                self.scopes
                    .last_mut()
                    .expect("scope just pushed")
                    .insert(var.clone(), binding.clone());
                let result = (|| -> Result<Flow, RuntimeError> {
                    for item in items {
                        self.account_iteration(*span)?;
                        *binding.cell.borrow_mut() = item;
                        match self.exec_block(body)? {
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                    }
                    Ok(Flow::Normal)
                })();
                self.scopes.pop();
                result
            }
            Instr::Return { message, .. } => match message {
                Some(ir) => {
                    let value = self.eval(ir)?;
                    self.ctx.set_completion_message(stringify(&value));
                    Ok(Flow::Return(Some(value)))
                }
                None => Ok(Flow::Return(None)),
            },
            Instr::Fail { message, .. } => {
                let message = match message {
                    Some(ir) => {
                        let value = self.eval(ir)?;
                        stringify(&value)
                    }
                    None => "unspecified failure".to_string(),
                };
                self.ctx.set_completion_message(message.clone());
                Err(RuntimeError::new(MessageCode::ScriptFailure, vec![message]))
            }
            Instr::Break { .. } => Ok(Flow::Break),
            Instr::Continue { .. } => Ok(Flow::Continue),
            Instr::Expression { expr, .. } => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Iteration boundary: re-account the loop statement, then one
    /// iteration. This is what makes a statement budget terminate any
    /// unbounded loop.
    fn account_iteration(&mut self, span: jam_core::SourceSpan) -> Result<(), RuntimeError> {
        self.ctx.track_statement().map_err(|e| e.or_span(span))?;
        self.ctx.track_iteration().map_err(|e| e.or_span(span))
    }

    fn numeric_bound(&mut self, ir: &Ir) -> Result<f64, RuntimeError> {
        let value = self.eval(ir)?;
        value.as_number().ok_or_else(|| {
            RuntimeError::new(
                MessageCode::LoopBoundNotNumeric,
                vec![value.kind().to_string()],
            )
        })
    }

    /// The step expression is evaluated once at loop entry and must be a
    /// strictly positive integer.
    fn step_value(&mut self, step: &Option<Ir>) -> Result<f64, RuntimeError> {
        match step {
            None => Ok(1.0),
            Some(ir) => {
                let value = self.eval(ir)?;
                match value {
                    Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n > 0.0 => Ok(n),
                    other => Err(RuntimeError::new(
                        MessageCode::NonNegativeIntegerRequired,
                        vec![format!("{other}")],
                    )),
                }
            }
        }
    }

    fn run_for(
        &mut self,
        binding: &Binding,
        end: f64,
        step: f64,
        descending: bool,
        body: &[Instr],
        span: jam_core::SourceSpan,
    ) -> Result<Flow, RuntimeError> {
        loop {
            let current = match &*binding.cell.borrow() {
                Value::Number(n) => *n,
                other => {
                    return Err(RuntimeError::new(
                        MessageCode::LoopBoundNotNumeric,
                        vec![other.kind().to_string()],
                    ))
                }
            };
            let proceed = if descending {
                current >= end
            } else {
                current <= end
            };
            if !proceed {
                return Ok(Flow::Normal);
            }
            self.account_iteration(span)?;
            match self.exec_block(body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                // `continue` lands here, before the step update, so it
                // still advances the counter.
                Flow::Normal | Flow::Continue => {}
            }
            let at_update = match &*binding.cell.borrow() {
                Value::Number(n) => *n,
                other => {
                    return Err(RuntimeError::new(
                        MessageCode::LoopBoundNotNumeric,
                        vec![other.kind().to_string()],
                    ))
                }
            };
            let next = if descending {
                at_update - step
            } else {
                at_update + step
            };
            *binding.cell.borrow_mut() = Value::Number(next);
        }
    }

    // ── Assignment targets ───────────────────────────────────────────────

    fn read_target(&mut self, target: &Target) -> Result<Value, RuntimeError> {
        match target {
            Target::Variable { name } => self.load(name),
            Target::Property { object, name } => {
                let object = self.eval(object)?;
                ops::get_property(&object, name)
            }
            Target::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                ops::get_index(&object, &index)
            }
        }
    }

    fn write_target(&mut self, target: &Target, value: Value) -> Result<(), RuntimeError> {
        match target {
            Target::Variable { name } => {
                let binding = self.binding(name).ok_or_else(|| {
                    RuntimeError::fault(format!("variable '{name}' is not bound"))
                })?;
                if let Some(hint) = binding.hint {
                    ops::coerce_to_hint(&value, hint, name)?;
                }
                *binding.cell.borrow_mut() = value;
                Ok(())
            }
            Target::Property { object, name } => {
                let mut segs = Vec::new();
                let base = self.flatten_place(object, &mut segs)?;
                self.write_place(base, &segs, FinalOp::Prop(name), value)
            }
            Target::Index { object, index } => {
                let mut segs = Vec::new();
                let base = self.flatten_place(object, &mut segs)?;
                let index = self.eval(index)?;
                self.write_place(base, &segs, FinalOp::Index(&index), value)
            }
        }
    }

    /// Flatten the container expression of a write into a base place plus
    /// navigation segments, evaluating index expressions left to right.
    fn flatten_place(&mut self, ir: &Ir, segs: &mut Vec<Seg>) -> Result<PlaceBase, RuntimeError> {
        match ir {
            Ir::Local(name) => {
                let binding = self.binding(name).ok_or_else(|| {
                    RuntimeError::fault(format!("variable '{name}' is not bound"))
                })?;
                Ok(PlaceBase::Binding(binding))
            }
            Ir::Property { object, name } => {
                let base = self.flatten_place(object, segs)?;
                segs.push(Seg::Prop(name.clone()));
                Ok(base)
            }
            Ir::Index { object, index } => {
                let base = self.flatten_place(object, segs)?;
                let index = self.eval(index)?;
                segs.push(Seg::Index(index));
                Ok(base)
            }
            // A non-place base (e.g. a call result): the write happens on
            // the temporary so errors still surface.
            other => Ok(PlaceBase::Temp(self.eval(other)?)),
        }
    }

    fn write_place(
        &mut self,
        base: PlaceBase,
        segs: &[Seg],
        final_op: FinalOp<'_>,
        value: Value,
    ) -> Result<(), RuntimeError> {
        match base {
            PlaceBase::Binding(binding) => {
                place_write(&mut *binding.cell.borrow_mut(), segs, final_op, value)
            }
            PlaceBase::Temp(mut temp) => place_write(&mut temp, segs, final_op, value),
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────

    fn eval(&mut self, ir: &Ir) -> Result<Value, RuntimeError> {
        match ir {
            Ir::Const(value) => Ok(value.clone()),
            Ir::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::Array(values))
            }
            Ir::Object(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(value)?);
                }
                Ok(Value::Object(map))
            }
            Ir::Local(name) => self.load(name),
            Ir::Property { object, name } => {
                let object = self.eval(object)?;
                ops::get_property(&object, name)
            }
            Ir::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                ops::get_index(&object, &index)
            }
            Ir::Binary { op, lhs, rhs } => match op {
                // Short-circuit: the deciding operand is returned
                // unchanged, never coerced to a boolean.
                jam_core::ops::BinaryOp::And => {
                    let lhs = self.eval(lhs)?;
                    if lhs.is_truthy() {
                        self.eval(rhs)
                    } else {
                        Ok(lhs)
                    }
                }
                jam_core::ops::BinaryOp::Or => {
                    let lhs = self.eval(lhs)?;
                    if lhs.is_truthy() {
                        Ok(lhs)
                    } else {
                        self.eval(rhs)
                    }
                }
                op => {
                    let lhs = self.eval(lhs)?;
                    let rhs = self.eval(rhs)?;
                    ops::evaluate_binary(*op, &lhs, &rhs)
                }
            },
            Ir::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                ops::evaluate_unary(*op, &operand)
            }
            Ir::TypeTest { operand, hint } => {
                let operand = self.eval(operand)?;
                Ok(Value::Bool(operand.kind().matches_hint(*hint)))
            }
            Ir::Call(call) => self.eval_call(call),
        }
    }

    fn eval_call(&mut self, call: &CallIr) -> Result<Value, RuntimeError> {
        let program = self.program;
        let slot = program
            .slots
            .get(call.slot)
            .ok_or_else(|| RuntimeError::fault("call site was not linked"))?;

        let mut values = Vec::with_capacity(call.args.len());
        let mut lambdas: Vec<Option<LambdaValue>> = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            match arg {
                ArgIr::Value(ir) => {
                    values.push(self.eval(ir)?);
                    lambdas.push(None);
                }
                ArgIr::Lambda(lambda) => {
                    values.push(Value::Null);
                    lambdas.push(Some(LambdaValue {
                        ir: Arc::clone(lambda),
                        captured: self.scopes.clone(),
                    }));
                }
            }
        }

        // Evaluated arguments are checked against the slot signature; the
        // linker already fixed arity and lambda positions.
        for (i, param) in slot.signature.params.iter().enumerate() {
            if i >= values.len() || param.ty == ParameterType::Lambda {
                continue;
            }
            if !param.ty.accepts(values[i].kind()) {
                return Err(RuntimeError::new(
                    MessageCode::InvalidArgumentType,
                    vec![
                        param.name.clone(),
                        slot.name.clone(),
                        param.ty.to_string(),
                        values[i].kind().to_string(),
                    ],
                ));
            }
        }

        let function = self
            .functions
            .get(call.slot)
            .map(Arc::clone)
            .ok_or_else(|| RuntimeError::fault("call site was not bound"))?;

        self.ctx.enter_call()?;
        let mut invocation = Invocation {
            name: slot.name.as_str(),
            params: &slot.signature.params,
            values,
            lambdas,
            machine: self,
        };
        let result = function.call(&mut invocation);
        self.ctx.exit_call();
        result
    }

    /// Invoke a lambda under its captured environment. Routes through the
    /// same call-depth accounting as regular calls.
    fn invoke_lambda(
        &mut self,
        lambda: &LambdaValue,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        self.ctx.enter_call()?;
        let saved = std::mem::replace(&mut self.scopes, lambda.captured.clone());
        let mut frame = Scope::new();
        for (i, param) in lambda.ir.params.iter().enumerate() {
            frame.insert(
                param.clone(),
                Binding::new(args.get(i).cloned().unwrap_or(Value::Null), None),
            );
        }
        self.scopes.push(frame);
        let body = Arc::clone(&lambda.ir);
        let result = self.eval(&body.body);
        self.scopes = saved;
        self.ctx.exit_call();
        result
    }
}

/// Coerce a `return`/`fail` message value to text: strings verbatim,
/// everything else through the display form.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => format!("{other}"),
    }
}

// ── Write-path navigation ────────────────────────────────────────────────

enum PlaceBase {
    Binding(Binding),
    Temp(Value),
}

enum Seg {
    Prop(String),
    Index(Value),
}

enum FinalOp<'a> {
    Prop(&'a str),
    Index(&'a Value),
}

/// Navigate `segs` into `container` and apply the final write.
///
/// Intermediate navigation follows read semantics (absent properties read
/// as null, negative indices wrap); the final write is strict per
/// `set_property`/`set_index`. An absent intermediate navigates into a
/// null scratch so the eventual write fails with the right error.
fn place_write(
    container: &mut Value,
    segs: &[Seg],
    final_op: FinalOp<'_>,
    value: Value,
) -> Result<(), RuntimeError> {
    let (seg, rest) = match segs.split_first() {
        None => {
            return match final_op {
                FinalOp::Prop(name) => ops::set_property(container, name, value),
                FinalOp::Index(index) => ops::set_index(container, index, value),
            }
        }
        Some(split) => split,
    };
    match (container, seg) {
        (Value::Object(map), Seg::Prop(key)) => match map.get_mut(key.as_str()) {
            Some(inner) => place_write(inner, rest, final_op, value),
            None => place_write(&mut Value::Null, rest, final_op, value),
        },
        (Value::Null, Seg::Prop(key)) => Err(RuntimeError::new(
            MessageCode::PropertyAccessOnNull,
            vec![key.clone()],
        )),
        (other, Seg::Prop(key)) => Err(RuntimeError::new(
            MessageCode::PropertyAccessInvalidType,
            vec![key.clone(), other.kind().to_string()],
        )),
        (Value::Array(items), Seg::Index(Value::Number(n))) => {
            let idx = ops::resolve_read_index(*n, items.len())?;
            place_write(&mut items[idx], rest, final_op, value)
        }
        (Value::Object(map), Seg::Index(Value::String(key))) => match map.get_mut(key.as_str()) {
            Some(inner) => place_write(inner, rest, final_op, value),
            None => place_write(&mut Value::Null, rest, final_op, value),
        },
        (Value::String(s), Seg::Index(Value::Number(n))) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = ops::resolve_read_index(*n, chars.len())?;
            place_write(
                &mut Value::String(chars[idx].to_string()),
                rest,
                final_op,
                value,
            )
        }
        (Value::Null, Seg::Index(_)) => {
            Err(RuntimeError::new(MessageCode::IndexAccessOnNull, vec![]))
        }
        (Value::Array(_) | Value::Object(_) | Value::String(_), Seg::Index(index)) => Err(
            RuntimeError::new(MessageCode::InvalidIndexType, vec![index.kind().to_string()]),
        ),
        (other, Seg::Index(_)) => Err(RuntimeError::new(
            MessageCode::IndexAccessInvalidType,
            vec![other.kind().to_string()],
        )),
    }
}

// ── Invocation handle ────────────────────────────────────────────────────

/// What a builtin or host function receives: the evaluated argument
/// values, lambda handles, and access to the execution context.
pub struct Invocation<'m, 'p, 'c> {
    name: &'p str,
    params: &'p [Parameter],
    values: Vec<Value>,
    lambdas: Vec<Option<LambdaValue>>,
    machine: &'m mut Machine<'p, 'c>,
}

impl<'m, 'p, 'c> Invocation<'m, 'p, 'c> {
    /// Name the function was called as.
    pub fn function_name(&self) -> &str {
        self.name
    }

    /// Number of arguments supplied at the call site.
    pub fn arg_count(&self) -> usize {
        self.values.len()
    }

    /// The i-th argument value; Null when the optional argument was
    /// omitted.
    pub fn value(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&NULL)
    }

    /// The i-th argument, or `None` when it was omitted.
    pub fn opt(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Take ownership of the i-th argument value.
    pub fn take(&mut self, index: usize) -> Value {
        match self.values.get_mut(index) {
            Some(slot) => std::mem::replace(slot, Value::Null),
            None => Value::Null,
        }
    }

    fn param_name(&self, index: usize) -> String {
        self.params
            .get(index)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| (index + 1).to_string())
    }

    fn type_error(&self, index: usize, expected: &str) -> RuntimeError {
        RuntimeError::new(
            MessageCode::InvalidArgumentType,
            vec![
                self.param_name(index),
                self.name.to_string(),
                expected.to_string(),
                self.value(index).kind().to_string(),
            ],
        )
    }

    /// A JM5104 error stating what the i-th argument should have been.
    pub fn expected(&self, index: usize, expected: &str) -> RuntimeError {
        self.type_error(index, expected)
    }

    pub fn number(&self, index: usize) -> Result<f64, RuntimeError> {
        self.value(index)
            .as_number()
            .ok_or_else(|| self.type_error(index, "Number"))
    }

    /// A finite whole number, as i64.
    pub fn integer(&self, index: usize) -> Result<i64, RuntimeError> {
        match self.value(index) {
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 => Ok(*n as i64),
            _ => Err(self.type_error(index, "Number")),
        }
    }

    pub fn string(&self, index: usize) -> Result<&str, RuntimeError> {
        self.value(index)
            .as_str()
            .ok_or_else(|| self.type_error(index, "String"))
    }

    pub fn boolean(&self, index: usize) -> Result<bool, RuntimeError> {
        self.value(index)
            .as_bool()
            .ok_or_else(|| self.type_error(index, "Boolean"))
    }

    pub fn array(&self, index: usize) -> Result<&Vec<Value>, RuntimeError> {
        self.value(index)
            .as_array()
            .ok_or_else(|| self.type_error(index, "Array"))
    }

    pub fn object(&self, index: usize) -> Result<&IndexMap<String, Value>, RuntimeError> {
        self.value(index)
            .as_object()
            .ok_or_else(|| self.type_error(index, "Object"))
    }

    /// Invoke the lambda supplied as the i-th argument.
    pub fn invoke_lambda(
        &mut self,
        index: usize,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let lambda = self
            .lambdas
            .get(index)
            .and_then(|l| l.clone())
            .ok_or_else(|| {
                RuntimeError::fault(format!(
                    "argument {} of '{}' is not a lambda",
                    index + 1,
                    self.name
                ))
            })?;
        self.machine.invoke_lambda(&lambda, args)
    }

    /// The execution context: cancellation token, counters, completion
    /// message.
    pub fn context(&mut self) -> &mut ExecutionContext {
        &mut *self.machine.ctx
    }

    /// A JM5400 failure attributed to this function.
    pub fn failure(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::function_failed(self.name, message)
    }
}
