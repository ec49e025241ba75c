//! Scopes: chained containers of constants, variables, locals, and commands.
//!
//! Scopes are shared, counted handles. A child scope owns its own tables and
//! reads through to its parent; variable resolution can be cut off by a
//! barrier scope (used for `proc` and coroutine isolation) while command
//! resolution keeps walking the chain.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;

use crate::{
    ast::Script,
    bytecode::{CompileError, Compiler, Program},
    command::CommandRef,
    commands,
    process::Process,
    result::{EvalError, Outcome},
    selector,
    value::{ScriptValue, Value},
};

/// A shared handle to a scope.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<RefCell<ScopeData>>,
}

#[derive(Default)]
struct ScopeData {
    parent: Option<Scope>,
    /// When set, variable resolution does not continue past this scope.
    barrier: bool,
    constants: AHashMap<String, Value>,
    variables: AHashMap<String, Value>,
    locals: Option<AHashMap<String, Value>>,
    commands: AHashMap<String, CommandRef>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("Scope")
            .field("barrier", &data.barrier)
            .field("constants", &data.constants.len())
            .field("variables", &data.variables.len())
            .field("locals", &data.locals.as_ref().map(|m| m.len()))
            .field("commands", &data.commands.len())
            .field("has_parent", &data.parent.is_some())
            .finish()
    }
}

impl Scope {
    /// Creates a root scope with the core command set registered.
    pub fn new_root() -> Self {
        let scope = Self::empty(None, false);
        commands::register_core(&scope);
        scope
    }

    /// Creates a bare scope with no registered commands.
    pub fn new_bare() -> Self {
        Self::empty(None, false)
    }

    fn empty(parent: Option<Self>, barrier: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ScopeData {
                parent,
                barrier,
                ..ScopeData::default()
            })),
        }
    }

    /// Creates a transparent child scope.
    pub fn child(&self) -> Self {
        Self::empty(Some(self.clone()), false)
    }

    /// Creates a child scope with an empty local-binding table, used for
    /// callable bodies and loop iterations.
    pub fn child_with_locals(&self) -> Self {
        let child = self.child();
        child.inner.borrow_mut().locals = Some(AHashMap::new());
        child
    }

    /// Creates a barrier child: variable lookups stop here, command lookups
    /// continue to the parent chain.
    pub fn sandbox_child(&self) -> Self {
        Self::empty(Some(self.clone()), true)
    }

    pub fn parent(&self) -> Option<Self> {
        self.inner.borrow().parent.clone()
    }

    /// True if both handles designate the same scope.
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // --- variables -------------------------------------------------------

    /// Defines a constant. Fails if the name already exists in this scope as
    /// a constant or a variable.
    pub fn set_constant(&self, name: &str, value: Value) -> Result<(), EvalError> {
        let mut data = self.inner.borrow_mut();
        if data.constants.contains_key(name) {
            return Err(EvalError::message(format!("cannot redefine constant \"{name}\"")));
        }
        if data.variables.contains_key(name) {
            return Err(EvalError::message(format!(
                "cannot define constant \"{name}\": variable already exists"
            )));
        }
        data.constants.insert(name.to_owned(), value);
        Ok(())
    }

    /// Sets a variable.
    ///
    /// Assignment targets the visible binding: an existing local or variable
    /// anywhere up the chain (stopping at a barrier) is updated in place, so
    /// a macro body mutates its caller's variables while a proc body,
    /// running behind a barrier, cannot. Without an existing binding the
    /// variable is defined in this scope. A visible constant of the same
    /// name rejects the assignment.
    pub fn set_variable(&self, name: &str, value: Value) -> Result<(), EvalError> {
        let mut current = self.clone();
        loop {
            let mut data = current.inner.borrow_mut();
            if let Some(slot) = data.locals.as_mut().and_then(|locals| locals.get_mut(name)) {
                *slot = value;
                return Ok(());
            }
            if data.constants.contains_key(name) {
                return Err(EvalError::message(format!("cannot redefine constant \"{name}\"")));
            }
            if let Some(slot) = data.variables.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            if data.barrier {
                break;
            }
            let Some(parent) = data.parent.clone() else { break };
            drop(data);
            current = parent;
        }
        self.inner.borrow_mut().variables.insert(name.to_owned(), value);
        Ok(())
    }

    /// Defines an ephemeral local binding. Fails on redefinition.
    pub fn set_local(&self, name: &str, value: Value) -> Result<(), EvalError> {
        let mut data = self.inner.borrow_mut();
        let locals = data.locals.get_or_insert_with(AHashMap::new);
        if locals.contains_key(name) {
            return Err(EvalError::message(format!("cannot redefine local \"{name}\"")));
        }
        locals.insert(name.to_owned(), value);
        Ok(())
    }

    /// Removes the visible variable binding of that name.
    pub fn unset_variable(&self, name: &str) -> Result<(), EvalError> {
        let mut current = self.clone();
        loop {
            let mut data = current.inner.borrow_mut();
            if data.constants.contains_key(name) {
                return Err(EvalError::message(format!("cannot unset constant \"{name}\"")));
            }
            if data.variables.remove(name).is_some() {
                return Ok(());
            }
            if data.barrier {
                break;
            }
            let Some(parent) = data.parent.clone() else { break };
            drop(data);
            current = parent;
        }
        Err(EvalError::message(format!("no such variable \"{name}\"")))
    }

    /// Resolves a variable name: locals, then constants, then variables,
    /// then the parent chain up to the first barrier.
    pub fn resolve_variable(&self, name: &str) -> Result<Value, EvalError> {
        match self.lookup_variable(name) {
            Some(value) => Ok(value),
            None => Err(EvalError::message(format!("no such variable \"{name}\""))),
        }
    }

    /// True when a variable of that name is visible from this scope.
    pub fn variable_exists(&self, name: &str) -> bool {
        self.lookup_variable(name).is_some()
    }

    fn lookup_variable(&self, name: &str) -> Option<Value> {
        let data = self.inner.borrow();
        if let Some(locals) = &data.locals
            && let Some(value) = locals.get(name)
        {
            return Some(value.clone());
        }
        if let Some(value) = data.constants.get(name) {
            return Some(value.clone());
        }
        if let Some(value) = data.variables.get(name) {
            return Some(value.clone());
        }
        if data.barrier {
            return None;
        }
        let parent = data.parent.clone()?;
        drop(data);
        parent.lookup_variable(name)
    }

    /// Resolves a value the way `RESOLVE_VALUE` does: strings resolve as
    /// variable names, tuples resolve elementwise, qualified values resolve
    /// their source and apply their selector chain.
    pub fn resolve_value(&self, value: &Value) -> Result<Value, EvalError> {
        match value {
            Value::Tuple(elements) => {
                let mut resolved = Vec::with_capacity(elements.len());
                for element in elements.iter() {
                    resolved.push(self.resolve_value(element)?);
                }
                Ok(Value::tuple(resolved))
            }
            Value::Qualified(q) => {
                let source = self.resolve_value(&q.source)?;
                selector::resolve_chain(source, q)
            }
            _ => match value.string_repr() {
                Some(name) => self.resolve_variable(&name),
                None => Err(EvalError::message(format!(
                    "invalid variable name \"{value}\""
                ))),
            },
        }
    }

    /// Tuple destructuring for `foreach` and argument binding.
    ///
    /// A literal name binds directly; a tuple pattern binds elementwise
    /// against a tuple or list value (an empty pattern ignores the value);
    /// shape mismatches are errors.
    pub fn destructure_local(&self, pattern: &Value, value: &Value) -> Result<(), EvalError> {
        match pattern {
            Value::Tuple(names) => {
                if names.is_empty() {
                    return Ok(());
                }
                let elements: &[Value] = match value {
                    Value::Tuple(elements) | Value::List(elements) => elements,
                    _ => return Err(EvalError::message("bad value shape")),
                };
                if names.len() != elements.len() {
                    return Err(EvalError::message("bad value shape"));
                }
                for (name, element) in names.iter().zip(elements.iter()) {
                    self.destructure_local(name, element)?;
                }
                Ok(())
            }
            _ => {
                let name = pattern
                    .string_repr()
                    .ok_or_else(|| EvalError::message("bad value shape"))?;
                self.set_local(&name, value.clone())
            }
        }
    }

    // --- commands --------------------------------------------------------

    /// Registers a command under a name in this scope.
    pub fn register_named_command(&self, name: &str, command: CommandRef) {
        self.inner.borrow_mut().commands.insert(name.to_owned(), command);
    }

    /// Resolves a named command, walking the parent chain.
    pub fn resolve_named_command(&self, name: &str) -> Option<CommandRef> {
        let data = self.inner.borrow();
        if let Some(command) = data.commands.get(name) {
            return Some(command.clone());
        }
        let parent = data.parent.clone()?;
        drop(data);
        parent.resolve_named_command(name)
    }

    /// Resolves a named command without walking the parent chain.
    pub fn resolve_local_command(&self, name: &str) -> Option<CommandRef> {
        self.inner.borrow().commands.get(name).cloned()
    }

    /// Resolves a sentence head value to a command.
    ///
    /// Tuples route to the tuple command (auto-expansion), command values
    /// unwrap, numbers route to the arithmetic ensemble, and everything else
    /// resolves its string form against the named commands in scope.
    pub fn resolve_command(&self, value: &Value) -> Result<CommandRef, EvalError> {
        match value {
            Value::Tuple(_) => Ok(commands::tuple_command()),
            Value::Command(command) => Ok(command.clone()),
            Value::Int(_) | Value::Real(_) => Ok(commands::number_command()),
            // Numeric literal words dispatch to the arithmetic ensemble too.
            Value::Str(_) if commands::is_numeric(value) => Ok(commands::number_command()),
            _ => {
                let name = value
                    .string_repr()
                    .ok_or_else(|| EvalError::message("invalid command name"))?;
                self.resolve_named_command(&name)
                    .ok_or_else(|| EvalError::message(format!("cannot resolve command \"{name}\"")))
            }
        }
    }

    /// Drops this scope's command table.
    ///
    /// Command values capture scopes, which can create reference cycles
    /// through the command tables; a host discarding a scope hierarchy calls
    /// this on the root to break them before releasing its handle.
    pub fn clear_commands_for_teardown(&self) {
        self.inner.borrow_mut().commands.clear();
    }

    // --- embedding API ---------------------------------------------------

    /// Compiles a parsed script into a program.
    pub fn compile(&self, script: &Script, source: Option<Rc<str>>) -> Result<Rc<Program>, CompileError> {
        Compiler::compile_script(script, source)
    }

    /// Compiles a script value, memoizing the program in the value's cache.
    pub fn compile_script_value(&self, script: &ScriptValue) -> Result<Rc<Program>, EvalError> {
        if let Some(program) = script.cached_program() {
            return Ok(program);
        }
        let program = Compiler::compile_script(&script.script, script.source.clone())
            .map_err(|e| EvalError::message(e.to_string()))?;
        script.cache_program(Rc::clone(&program));
        Ok(program)
    }

    /// Prepares a process executing `program` in this scope.
    pub fn prepare_process(&self, program: Rc<Program>) -> Process {
        Process::new(program, self.clone())
    }

    /// Parses, compiles, and runs source text in this scope.
    ///
    /// Convenience over `parse` / `compile` / `prepare_process` for hosts
    /// that don't need to hold on to the intermediate artifacts. The
    /// returned outcome may be a YIELD, in which case the suspended process
    /// is dropped with it; hosts that resume use `prepare_process` directly.
    pub fn eval(&self, source: &str) -> Result<Outcome, crate::HelenaError> {
        let script = crate::parse::parse(source)?;
        let program = Compiler::compile_script(&script, Some(Rc::from(source)))?;
        let mut process = self.prepare_process(program);
        Ok(process.run())
    }
}
