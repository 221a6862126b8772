use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use indexmap::IndexMap;

use crate::engine::{
    ast::{BinaryOp, DeclKind, Expr, ExprKind, Literal, LogicalOp, Program, Stmt, StmtKind, UnaryOp},
    environment::{AssignOutcome, Scope, ScopeRef},
    value::{ErrorValue, PromiseState, UserFunction, Value, ValueKind},
};

/// A deferred reaction enqueued during evaluation, run later by the host
/// through `Engine::run_pending_job`.
pub(crate) struct Job {
    pub callback: Value,
    pub argument: Value,
}

pub(crate) type JobQueue = Rc<RefCell<VecDeque<Job>>>;

pub(crate) struct Interp {
    env: ScopeRef,
    jobs: JobQueue,
}

enum Flow {
    Next,
    Value(Value),
    Return(Value),
    Break,
    Continue,
}

impl Interp {
    pub fn new(env: ScopeRef, jobs: JobQueue) -> Self {
        Self { env, jobs }
    }

    /// Execute a program and return its completion value (the value of the
    /// last expression statement, or undefined).
    pub fn run_program(&mut self, program: &Program) -> Result<Value, ErrorValue> {
        let mut completion = Value::undefined();
        for stmt in &program.body {
            match self.execute(stmt)? {
                Flow::Next => {}
                Flow::Value(value) => completion = value,
                Flow::Return(value) => return Ok(value),
                Flow::Break | Flow::Continue => break,
            }
        }
        Ok(completion)
    }

    fn with_scope<T>(&mut self, scope: ScopeRef, f: impl FnOnce(&mut Self) -> T) -> T {
        let prev = std::mem::replace(&mut self.env, scope);
        let result = f(self);
        self.env = prev;
        result
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow, ErrorValue> {
        match &stmt.kind {
            StmtKind::Decl {
                kind,
                name,
                initializer,
            } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::undefined(),
                };
                let mutable = *kind != DeclKind::Const;
                self.env.borrow_mut().define(name.clone(), value, mutable);
                Ok(Flow::Next)
            }
            StmtKind::Function { name, params, body } => {
                let function = UserFunction {
                    name: Some(name.clone()),
                    params: params.clone(),
                    body: body.clone(),
                    env: Rc::clone(&self.env),
                };
                self.env
                    .borrow_mut()
                    .define(name.clone(), Value::new(ValueKind::Function(function)), true);
                Ok(Flow::Next)
            }
            StmtKind::Expr(expr) => {
                let value = self.evaluate(expr)?;
                Ok(Flow::Value(value))
            }
            StmtKind::Block(statements) => self.execute_block(statements),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(branch) = else_branch {
                    self.execute(branch)
                } else {
                    Ok(Flow::Next)
                }
            }
            StmtKind::While { condition, body } => {
                loop {
                    if !self.evaluate(condition)?.is_truthy() {
                        break;
                    }
                    match self.execute(body)? {
                        Flow::Next | Flow::Value(_) => {}
                        Flow::Continue => continue,
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }
                Ok(Flow::Next)
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let scope = Scope::nested(Rc::clone(&self.env));
                self.with_scope(scope, |interp| {
                    if let Some(init) = init {
                        interp.execute(init)?;
                    }
                    loop {
                        if let Some(condition) = condition {
                            if !interp.evaluate(condition)?.is_truthy() {
                                break;
                            }
                        }
                        match interp.execute(body)? {
                            Flow::Next | Flow::Value(_) | Flow::Continue => {}
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                        }
                        if let Some(update) = update {
                            interp.evaluate(update)?;
                        }
                    }
                    Ok(Flow::Next)
                })
            }
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::undefined(),
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
        }
    }

    fn execute_block(&mut self, statements: &[Stmt]) -> Result<Flow, ErrorValue> {
        let scope = Scope::nested(Rc::clone(&self.env));
        self.with_scope(scope, |interp| {
            let mut last = None;
            for stmt in statements {
                match interp.execute(stmt)? {
                    Flow::Next => {}
                    Flow::Value(value) => last = Some(value),
                    other => return Ok(other),
                }
            }
            Ok(match last {
                Some(value) => Flow::Value(value),
                None => Flow::Next,
            })
        })
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, ErrorValue> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(literal_value(literal)),
            ExprKind::Identifier(name) => Scope::lookup(&self.env, name)
                .ok_or_else(|| ErrorValue::reference(format!("{name} is not defined"))),
            ExprKind::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(binary(*op, &left, &right))
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.evaluate(left)?;
                match op {
                    LogicalOp::And => {
                        if left.is_truthy() {
                            self.evaluate(right)
                        } else {
                            Ok(left)
                        }
                    }
                    LogicalOp::Or => {
                        if left.is_truthy() {
                            Ok(left)
                        } else {
                            self.evaluate(right)
                        }
                    }
                }
            }
            ExprKind::Unary { op, expr } => match op {
                UnaryOp::TypeOf => {
                    if let ExprKind::Identifier(name) = &expr.kind {
                        // typeof on an unresolved name yields "undefined"
                        // instead of a reference error
                        return Ok(match Scope::lookup(&self.env, name) {
                            Some(value) => Value::string(value.type_of()),
                            None => Value::string("undefined"),
                        });
                    }
                    let value = self.evaluate(expr)?;
                    Ok(Value::string(value.type_of()))
                }
                UnaryOp::Neg => {
                    let value = self.evaluate(expr)?;
                    Ok(Value::number(-value.to_number()))
                }
                UnaryOp::Not => {
                    let value = self.evaluate(expr)?;
                    Ok(Value::bool(!value.is_truthy()))
                }
            },
            ExprKind::Conditional {
                condition,
                consequent,
                alternate,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(consequent)
                } else {
                    self.evaluate(alternate)
                }
            }
            ExprKind::Assign { target, value } => {
                let value = self.evaluate(value)?;
                self.assign_target(target, value.clone())?;
                Ok(value)
            }
            ExprKind::Call { callee, args } => {
                if let ExprKind::Member { object, property } = &callee.kind {
                    let receiver = self.evaluate(object)?;
                    let values = self.evaluate_args(args)?;
                    return self.call_method(&receiver, property, &values);
                }
                let callee_value = self.evaluate(callee)?;
                let values = self.evaluate_args(args)?;
                self.call_value(&callee_value, &values)
            }
            ExprKind::Member { object, property } => {
                let object = self.evaluate(object)?;
                self.member_get(&object, property)
            }
            ExprKind::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                self.index_get(&object, &index)
            }
            ExprKind::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::array(values))
            }
            ExprKind::Object(entries) => {
                let mut map = IndexMap::new();
                for (key, value_expr) in entries {
                    let value = self.evaluate(value_expr)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::object(map))
            }
            ExprKind::Function { name, params, body } => {
                let function = UserFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    env: Rc::clone(&self.env),
                };
                Ok(Value::new(ValueKind::Function(function)))
            }
            ExprKind::Group(inner) => self.evaluate(inner),
        }
    }

    fn evaluate_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, ErrorValue> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg)?);
        }
        Ok(values)
    }

    pub fn call_value(&mut self, callee: &Value, args: &[Value]) -> Result<Value, ErrorValue> {
        match callee.kind() {
            ValueKind::Native(native) => (native.callback)(args),
            ValueKind::Function(fun) => {
                let scope = Scope::nested(Rc::clone(&fun.env));
                for (idx, param) in fun.params.iter().enumerate() {
                    let value = args.get(idx).cloned().unwrap_or_else(Value::undefined);
                    scope.borrow_mut().define(param.clone(), value, true);
                }
                self.with_scope(scope, |interp| {
                    for stmt in &fun.body {
                        match interp.execute(stmt)? {
                            Flow::Next | Flow::Value(_) => {}
                            Flow::Return(value) => return Ok(value),
                            Flow::Break | Flow::Continue => break,
                        }
                    }
                    Ok(Value::undefined())
                })
            }
            _ => Err(ErrorValue::type_error(format!(
                "{} is not a function",
                callee.type_of()
            ))),
        }
    }

    fn call_method(
        &mut self,
        receiver: &Value,
        property: &str,
        args: &[Value],
    ) -> Result<Value, ErrorValue> {
        if let ValueKind::Promise(PromiseState::Fulfilled(inner)) = receiver.kind() {
            if property == "then" {
                let callback = args.first().cloned().unwrap_or_else(Value::undefined);
                if !callback.is_callable() {
                    return Err(ErrorValue::type_error("promise reaction is not a function"));
                }
                self.jobs.borrow_mut().push_back(Job {
                    callback,
                    argument: inner.clone(),
                });
                return Ok(Value::fulfilled_promise(Value::undefined()));
            }
        }
        let method = self.member_get(receiver, property)?;
        if !method.is_callable() {
            return Err(ErrorValue::type_error(format!(
                "`{property}` is not a function"
            )));
        }
        self.call_value(&method, args)
    }

    fn member_get(&self, object: &Value, property: &str) -> Result<Value, ErrorValue> {
        match object.kind() {
            ValueKind::Undefined | ValueKind::Null => Err(ErrorValue::type_error(format!(
                "cannot read property `{property}` of {object}"
            ))),
            ValueKind::Object(map) => Ok(map
                .get(property)
                .cloned()
                .unwrap_or_else(Value::undefined)),
            ValueKind::Array(values) if property == "length" => {
                Ok(Value::number(values.len() as f64))
            }
            ValueKind::String(text) if property == "length" => {
                Ok(Value::number(text.chars().count() as f64))
            }
            _ => Ok(Value::undefined()),
        }
    }

    fn index_get(&self, object: &Value, index: &Value) -> Result<Value, ErrorValue> {
        match object.kind() {
            ValueKind::Undefined | ValueKind::Null => Err(ErrorValue::type_error(format!(
                "cannot read index of {object}"
            ))),
            ValueKind::Array(values) => {
                let idx = index.to_number();
                if idx >= 0.0 && idx.fract() == 0.0 && (idx as usize) < values.len() {
                    Ok(values[idx as usize].clone())
                } else {
                    Ok(Value::undefined())
                }
            }
            ValueKind::String(text) => {
                let idx = index.to_number();
                if idx >= 0.0 && idx.fract() == 0.0 {
                    Ok(text
                        .chars()
                        .nth(idx as usize)
                        .map(|ch| Value::string(ch.to_string()))
                        .unwrap_or_else(Value::undefined))
                } else {
                    Ok(Value::undefined())
                }
            }
            ValueKind::Object(map) => {
                let key = index.to_string();
                Ok(map.get(&key).cloned().unwrap_or_else(Value::undefined))
            }
            _ => Ok(Value::undefined()),
        }
    }

    fn assign_target(&mut self, target: &Expr, value: Value) -> Result<(), ErrorValue> {
        match &target.kind {
            ExprKind::Identifier(name) => match Scope::assign(&self.env, name, value) {
                AssignOutcome::Assigned => Ok(()),
                AssignOutcome::Undeclared => {
                    Err(ErrorValue::reference(format!("{name} is not defined")))
                }
                AssignOutcome::Immutable => {
                    Err(ErrorValue::type_error("assignment to constant variable"))
                }
            },
            ExprKind::Member { object, property } => {
                let receiver = self.evaluate(object)?;
                match receiver.kind() {
                    ValueKind::Object(map) => {
                        let mut updated = map.clone();
                        updated.insert(property.clone(), value);
                        self.assign_target(object, Value::object(updated))
                    }
                    _ => Err(ErrorValue::type_error(format!(
                        "cannot set property `{property}` on {}",
                        receiver.type_of()
                    ))),
                }
            }
            ExprKind::Index { object, index } => {
                let receiver = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                match receiver.kind() {
                    ValueKind::Array(values) => {
                        let idx = index.to_number();
                        if idx < 0.0 || idx.fract() != 0.0 {
                            return Err(ErrorValue::range("invalid array index"));
                        }
                        let idx = idx as usize;
                        let mut updated = values.clone();
                        if idx >= updated.len() {
                            updated.resize(idx + 1, Value::undefined());
                        }
                        updated[idx] = value;
                        self.assign_target(object, Value::array(updated))
                    }
                    ValueKind::Object(map) => {
                        let mut updated = map.clone();
                        updated.insert(index.to_string(), value);
                        self.assign_target(object, Value::object(updated))
                    }
                    _ => Err(ErrorValue::type_error(format!(
                        "cannot set index on {}",
                        receiver.type_of()
                    ))),
                }
            }
            _ => Err(ErrorValue::type_error("invalid assignment target")),
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Number(n) => Value::number(*n),
        Literal::String(s) => Value::string(s.clone()),
        Literal::Bool(b) => Value::bool(*b),
        Literal::Null => Value::null(),
        Literal::Undefined => Value::undefined(),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    use BinaryOp::*;
    match op {
        Add => {
            if prefers_string(left) || prefers_string(right) {
                Value::string(format!("{left}{right}"))
            } else {
                Value::number(left.to_number() + right.to_number())
            }
        }
        Sub => Value::number(left.to_number() - right.to_number()),
        Mul => Value::number(left.to_number() * right.to_number()),
        Div => Value::number(left.to_number() / right.to_number()),
        Rem => Value::number(left.to_number() % right.to_number()),
        Eq => Value::bool(left.loose_eq(right)),
        NotEq => Value::bool(!left.loose_eq(right)),
        StrictEq => Value::bool(left.strict_eq(right)),
        StrictNotEq => Value::bool(!left.strict_eq(right)),
        Less => compare(left, right, |ord| ord == std::cmp::Ordering::Less),
        LessEq => compare(left, right, |ord| ord != std::cmp::Ordering::Greater),
        Greater => compare(left, right, |ord| ord == std::cmp::Ordering::Greater),
        GreaterEq => compare(left, right, |ord| ord != std::cmp::Ordering::Less),
    }
}

fn prefers_string(value: &Value) -> bool {
    !matches!(
        value.kind(),
        ValueKind::Undefined | ValueKind::Null | ValueKind::Bool(_) | ValueKind::Number(_)
    )
}

fn compare(left: &Value, right: &Value, test: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    if let (Some(a), Some(b)) = (left.as_str(), right.as_str()) {
        return Value::bool(test(a.cmp(b)));
    }
    let a = left.to_number();
    let b = right.to_number();
    match a.partial_cmp(&b) {
        Some(ord) => Value::bool(test(ord)),
        None => Value::bool(false),
    }
}
