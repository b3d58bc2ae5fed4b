// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The VM singleton and the bytecode dispatch loop (spec §3 "VM", §4.D).

use slate_vm_types::{ObjFn, ObjRef, ObjString, Opcode, Value};
use tracing::error;

use crate::class::{self, primitive_metaclass_new};
use crate::config::HeapConfig;
use crate::error::VmError;
use crate::fiber::Fiber;
use crate::heap::{CollectionStats, Heap};
use crate::object::{MethodSlot, Object, ObjClass, ObjInstance, PrimitiveFn};
use crate::symbol::{SymbolId, SymbolTable};

/// The six built-in class handles every value's `get_class` ultimately
/// bottoms out at (spec §3 "VM" / §4.A "`get_class`").
#[derive(Clone, Copy)]
pub struct BuiltinClasses {
    pub object: ObjRef,
    pub bool_class: ObjRef,
    pub null_class: ObjRef,
    pub num: ObjRef,
    pub fn_class: ObjRef,
    pub string: ObjRef,
}

/// The process-wide VM singleton (spec §3 "VM"), represented as an ordinary
/// owned value per the design note in §9 rather than a global: nothing
/// outside this struct's own methods touches process-wide state.
pub struct Vm {
    heap: Heap,
    methods: SymbolTable,
    global_symbols: SymbolTable,
    globals: Vec<Value>,
    fiber: Fiber,
    builtins: BuiltinClasses,
    new_symbol: SymbolId,
    max_frames: usize,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(HeapConfig::default())
    }

    pub fn with_config(config: HeapConfig) -> Self {
        let max_frames = config.max_frames;
        let mut heap = Heap::new(config);
        let mut methods = SymbolTable::new();
        let global_symbols = SymbolTable::new();
        let new_symbol = methods
            .ensure_symbol("new")
            .expect("an empty symbol table always has room for one symbol");

        // Built-in classes are created directly against the heap rather
        // than through the bytecode-driven "first CLASS creates Object"
        // heuristic the spec's real bootstrap relies on (that heuristic
        // only matters when `loadCore` defines Object by *running*
        // compiled bytecode, which is out of this crate's scope; see
        // `SPEC_FULL.md` §6 and `DESIGN.md`). The observable contract is
        // unchanged: `CODE_CLASS`'s implicit superclass is always this
        // `object` handle.
        let object = bootstrap_class(&mut heap, None, new_symbol);
        let bool_class = bootstrap_class(&mut heap, Some(object), new_symbol);
        let null_class = bootstrap_class(&mut heap, Some(object), new_symbol);
        let num = bootstrap_class(&mut heap, Some(object), new_symbol);
        let fn_class = bootstrap_class(&mut heap, Some(object), new_symbol);
        let string = bootstrap_class(&mut heap, Some(object), new_symbol);

        Vm {
            heap,
            methods,
            global_symbols,
            globals: Vec::new(),
            fiber: Fiber::new(max_frames),
            builtins: BuiltinClasses {
                object,
                bool_class,
                null_class,
                num,
                fn_class,
                string,
            },
            new_symbol,
            max_frames,
        }
    }

    pub fn builtin_classes(&self) -> BuiltinClasses {
        self.builtins
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn methods(&self) -> &SymbolTable {
        &self.methods
    }

    pub fn methods_mut(&mut self) -> &mut SymbolTable {
        &mut self.methods
    }

    pub fn fiber(&self) -> &Fiber {
        &self.fiber
    }

    /// Looks up a global's current value by name (spec §6 `find_global`).
    pub fn find_global(&self, name: &str) -> Option<Value> {
        let id = self.global_symbols.find_symbol(name)?;
        self.globals.get(id.to_index()).copied()
    }

    /// Interns a global's name, growing the parallel `globals` value array
    /// to match (spec §3 "Parallel array `globals[i]`"). Compiler-facing.
    pub fn ensure_global_symbol(&mut self, name: &str) -> Result<SymbolId, VmError> {
        let id = self.global_symbols.ensure_symbol(name)?;
        if self.globals.len() <= id.to_index() {
            self.globals.resize(id.to_index() + 1, Value::Null);
        }
        Ok(id)
    }

    pub fn find_global_symbol(&self, name: &str) -> Option<SymbolId> {
        self.global_symbols.find_symbol(name)
    }

    // -- Allocation (spec §4.B) --

    /// Allocates `object`, accounting its size and running a collection
    /// first if the policy calls for one (spec §4.B "Allocation policy":
    /// "Before returning memory... if totalAllocated > nextGC, run a
    /// collection"). Checking *before* insertion, rather than after, means
    /// the new object never needs to be a root of its own allocating
    /// collection.
    pub fn allocate(&mut self, object: Object) -> ObjRef {
        if self.heap.should_collect() {
            self.collect_garbage();
        }
        self.heap.insert(object)
    }

    pub fn new_string(&mut self, bytes: &[u8]) -> ObjRef {
        self.allocate(Object::String(ObjString::new(bytes.to_vec())))
    }

    pub fn new_instance(&mut self, class: ObjRef) -> ObjRef {
        self.allocate(Object::Instance(ObjInstance::new(class)))
    }

    pub fn new_function(&mut self) -> ObjRef {
        self.allocate(Object::Function(ObjFn::new()))
    }

    /// Creates a class (and its metaclass) with the default `new`
    /// constructor installed, per the class-creation quirk in spec §4.D
    /// ("`CLASS`/`SUBCLASS` unconditionally install `primitive_metaclass_new`
    /// as the `new` method"). Used both by the `CLASS`/`SUBCLASS` opcode
    /// handlers and directly by an embedder (spec §6 `new_class`).
    pub fn new_class(&mut self, superclass: Option<ObjRef>) -> Result<ObjRef, VmError> {
        let class = class::new_class(self, superclass)?;
        let metaclass = self
            .heap
            .as_class(class)
            .metaclass
            .expect("new_class always gives the class a metaclass");
        let new_symbol_index = self.new_symbol.to_index();
        self.heap.as_class_mut(metaclass).methods[new_symbol_index] =
            MethodSlot::Primitive(primitive_metaclass_new);
        Ok(class)
    }

    /// Registers a native method on `class_obj` (spec §6 "Bootstrap
    /// contract": a core-library loader "registers primitive methods on
    /// built-in classes"). This is the entire surface an out-of-tree
    /// `loadCore` needs against this crate, beyond [`Vm::builtin_classes`]
    /// and [`SymbolTable::ensure_symbol`] to mint the method's symbol id.
    pub fn bind_primitive(&mut self, class_obj: ObjRef, method: SymbolId, primitive: PrimitiveFn) {
        self.heap.as_class_mut(class_obj).methods[method.to_index()] =
            MethodSlot::Primitive(primitive);
    }

    pub fn pin(&mut self, value: Value) {
        self.heap.pin(value);
    }

    pub fn unpin(&mut self, value: Value) -> Result<(), VmError> {
        self.heap.unpin(value)
    }

    /// Runs a full mark-and-sweep now, gathering roots from every source
    /// named in spec §4.B "Mark phase": non-null globals, pinned values,
    /// each active frame's function, and the whole operand stack.
    pub fn collect_garbage(&mut self) -> CollectionStats {
        let mut roots: Vec<Value> = Vec::with_capacity(
            self.globals.len() + self.heap.pinned().len() + self.fiber.num_frames() + self.fiber.len(),
        );
        roots.extend(self.globals.iter().copied().filter(|v| !v.is_null()));
        roots.extend(self.heap.pinned().iter().copied());
        roots.extend(self.fiber.frames().iter().map(|f| Value::object(f.function)));
        roots.extend(self.fiber.stack_slice().iter().copied());
        self.heap.collect_garbage(roots)
    }

    /// The class of any value (spec §4.A "`get_class`"), the only place
    /// the built-in class handles are consulted for dispatch.
    pub fn get_class(&self, value: Value) -> ObjRef {
        match value {
            Value::True | Value::False => self.builtins.bool_class,
            Value::Null | Value::NoValue => self.builtins.null_class,
            Value::Number(_) => self.builtins.num,
            Value::Obj(r) => match self.heap.get(r) {
                Object::Function(_) => self.builtins.fn_class,
                Object::String(_) => self.builtins.string,
                Object::Instance(instance) => instance.class_obj,
                Object::Class(class) => class
                    .metaclass
                    .expect("every class has a metaclass (spec §3 'Metaclass invariant')"),
            },
        }
    }

    /// Canonical textual rendering (spec §6 `print_value`).
    pub fn print_value(&self, value: Value) -> String {
        match value {
            Value::False => "false".to_string(),
            Value::True => "true".to_string(),
            Value::Null => "null".to_string(),
            Value::NoValue => "no-value".to_string(),
            Value::Number(n) => format_number(n),
            Value::Obj(r) => match self.heap.get(r) {
                Object::String(s) => s.display().into_owned(),
                Object::Class(_) => format!("[class {}]", r.index()),
                Object::Function(_) => format!("[fn {}]", r.index()),
                Object::Instance(_) => format!("[instance {}]", r.index()),
            },
        }
    }

    /// Runs the dispatch loop to completion (spec §4.D "Entry"). Pushes the
    /// initial frame (`numArgs=0, stackStart=0`) and returns the value the
    /// outermost frame's `END` produces.
    pub fn interpret(&mut self, function: ObjRef) -> Result<Value, VmError> {
        self.fiber = Fiber::new(self.max_frames);
        if !self.fiber.push_frame(function, 0) {
            return Err(VmError::FiberFrameOverflow {
                limit: self.max_frames,
            });
        }

        loop {
            let frame = *self
                .fiber
                .current_frame()
                .expect("interpret always has at least one active frame");
            let byte = *self
                .heap
                .as_fn(frame.function)
                .bytecode()
                .get(frame.ip)
                .ok_or(VmError::InvalidOpcode {
                    byte: 0,
                    offset: frame.ip,
                })?;
            let opcode = Opcode::decode(byte).ok_or(VmError::InvalidOpcode {
                byte,
                offset: frame.ip,
            })?;
            self.fiber.current_frame_mut().unwrap().ip += 1;

            if let Some(num_args) = opcode.call_num_args() {
                let sym = self.fetch_byte()?;
                self.dispatch_call(sym, num_args)?;
                continue;
            }

            match opcode {
                Opcode::Constant => {
                    let k = self.fetch_byte()?;
                    let value = self.current_constant(k);
                    self.fiber.push(value);
                }
                Opcode::Null => self.fiber.push(Value::Null),
                Opcode::False => self.fiber.push(Value::False),
                Opcode::True => self.fiber.push(Value::True),
                Opcode::Class => {
                    let class = self.new_class(Some(self.builtins.object))?;
                    self.fiber.push(Value::object(class));
                }
                Opcode::Subclass => {
                    let superclass = self.fiber.pop().ok_or(VmError::StackUnderflow)?;
                    let class = self.new_class(Some(superclass.as_obj()))?;
                    self.fiber.push(Value::object(class));
                }
                Opcode::Metaclass => {
                    let class_val = self.fiber.peek().ok_or(VmError::StackUnderflow)?;
                    let meta = self
                        .heap
                        .as_class(class_val.as_obj())
                        .metaclass
                        .expect("every class has a metaclass");
                    self.fiber.push(Value::object(meta));
                }
                Opcode::Method => {
                    let sym = self.fetch_byte()?;
                    let k = self.fetch_byte()?;
                    let class_val = self.fiber.peek().ok_or(VmError::StackUnderflow)?;
                    let fn_value = self.current_constant(k);
                    self.heap.as_class_mut(class_val.as_obj()).methods[sym as usize] =
                        MethodSlot::Block(fn_value.as_obj());
                }
                Opcode::LoadLocal => {
                    let n = self.fetch_byte()?;
                    let frame = *self.fiber.current_frame().unwrap();
                    let value = self.fiber.get(frame.stack_start + n as usize);
                    self.fiber.push(value);
                }
                Opcode::StoreLocal => {
                    let n = self.fetch_byte()?;
                    let frame = *self.fiber.current_frame().unwrap();
                    let value = self.fiber.peek().ok_or(VmError::StackUnderflow)?;
                    self.fiber.set(frame.stack_start + n as usize, value);
                }
                Opcode::LoadGlobal => {
                    let g = self.fetch_byte()?;
                    self.fiber.push(self.globals[g as usize]);
                }
                Opcode::StoreGlobal => {
                    let g = self.fetch_byte()?;
                    let value = self.fiber.peek().ok_or(VmError::StackUnderflow)?;
                    self.globals[g as usize] = value;
                }
                Opcode::Dup => {
                    let value = self.fiber.peek().ok_or(VmError::StackUnderflow)?;
                    self.fiber.push(value);
                }
                Opcode::Pop => {
                    self.fiber.pop().ok_or(VmError::StackUnderflow)?;
                }
                Opcode::Jump => {
                    let offset = self.fetch_byte()?;
                    self.fiber.current_frame_mut().unwrap().ip += offset as usize;
                }
                Opcode::JumpIf => {
                    let offset = self.fetch_byte()?;
                    let value = self.fiber.pop().ok_or(VmError::StackUnderflow)?;
                    if matches!(value, Value::False) {
                        self.fiber.current_frame_mut().unwrap().ip += offset as usize;
                    }
                }
                Opcode::Is => {
                    let class_val = self.fiber.pop().ok_or(VmError::StackUnderflow)?;
                    let value = self.fiber.pop().ok_or(VmError::StackUnderflow)?;
                    let matches = self.get_class(value) == class_val.as_obj();
                    self.fiber.push(Value::bool_val(matches));
                }
                Opcode::End => {
                    let result = self.fiber.pop().ok_or(VmError::StackUnderflow)?;
                    let frame = self
                        .fiber
                        .pop_frame()
                        .expect("END always has an active frame to pop");
                    if self.fiber.num_frames() == 0 {
                        return Ok(result);
                    }
                    self.fiber.set(frame.stack_start, result);
                    self.fiber.truncate(frame.stack_start + 1);
                }
                // Handled by the `call_num_args` branch above.
                Opcode::Call0
                | Opcode::Call1
                | Opcode::Call2
                | Opcode::Call3
                | Opcode::Call4
                | Opcode::Call5
                | Opcode::Call6
                | Opcode::Call7
                | Opcode::Call8
                | Opcode::Call9
                | Opcode::Call10 => unreachable!("call opcodes are dispatched above"),
            }
        }
    }

    fn fetch_byte(&mut self) -> Result<u8, VmError> {
        let frame = *self
            .fiber
            .current_frame()
            .expect("fetch_byte requires an active frame");
        let byte = *self
            .heap
            .as_fn(frame.function)
            .bytecode()
            .get(frame.ip)
            .ok_or(VmError::InvalidOpcode {
                byte: 0,
                offset: frame.ip,
            })?;
        self.fiber.current_frame_mut().unwrap().ip += 1;
        Ok(byte)
    }

    fn current_constant(&self, index: u8) -> Value {
        let frame = *self
            .fiber
            .current_frame()
            .expect("current_constant requires an active frame");
        self.heap.as_fn(frame.function).constants()[index as usize]
    }

    /// Method dispatch (spec §4.D "Method dispatch"): resolves the
    /// receiver's class, looks up the slot, and applies one of the three
    /// dispatch conventions.
    fn dispatch_call(&mut self, sym: u8, num_args: u8) -> Result<(), VmError> {
        let num_args = num_args as usize;
        let receiver_idx = self
            .fiber
            .len()
            .checked_sub(num_args)
            .ok_or(VmError::StackUnderflow)?;
        let receiver = self.fiber.get(receiver_idx);
        let class_ref = self.get_class(receiver);
        let slot = self.heap.as_class(class_ref).methods[sym as usize];

        match slot {
            MethodSlot::None => {
                let selector = self.methods.get_symbol_name_by_index(sym as usize).to_string();
                error!(selector = %selector, "dispatch failure: method not implemented on receiver");
                Err(VmError::MethodNotFound { selector })
            }
            MethodSlot::Primitive(primitive) => {
                // `CALL_0..CALL_10` bound `num_args` (receiver inclusive) to
                // 11 at compile time (spec §4.D "Limits"), so the common
                // case never spills to the heap. Copying the args out first,
                // rather than holding a borrow into `self.fiber.stack_slice()`
                // across the call, is what lets `primitive` take a plain
                // `&mut Vm`: `self.fiber` stays put and fully populated for
                // the whole call, so any GC the primitive's own allocations
                // trigger still roots from the real operand stack and call
                // frames (spec §4.B invariant 2).
                let args: smallvec::SmallVec<[Value; 11]> =
                    smallvec::SmallVec::from_slice(&self.fiber.stack_slice()[receiver_idx..]);
                let result = primitive(self, &args)?;

                if !result.is_no_value() {
                    self.fiber.set(receiver_idx, result);
                    self.fiber.truncate(receiver_idx + 1);
                }
                Ok(())
            }
            MethodSlot::Block(function_ref) => {
                if self.fiber.push_frame(function_ref, receiver_idx) {
                    Ok(())
                } else {
                    Err(VmError::FiberFrameOverflow {
                        limit: self.fiber.max_frames(),
                    })
                }
            }
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn bootstrap_single_class(
    heap: &mut Heap,
    metaclass: Option<ObjRef>,
    superclass: Option<ObjRef>,
) -> ObjRef {
    heap.insert(Object::Class(ObjClass::new(
        metaclass,
        superclass,
        slate_vm_types::MAX_SYMBOLS,
    )))
}

/// Structural stand-in for the superclass-aware half of `new_class` used
/// only to seed the six built-in classes before a `Vm` fully exists (see
/// `Vm::with_config`). Mirrors `class::new_class`'s pin dance exactly.
fn bootstrap_class(heap: &mut Heap, superclass: Option<ObjRef>, new_symbol: SymbolId) -> ObjRef {
    let metaclass = bootstrap_single_class(heap, None, None);
    heap.pin(Value::object(metaclass));
    let class = bootstrap_single_class(heap, Some(metaclass), superclass);
    heap.unpin(Value::object(metaclass))
        .expect("bootstrap pin stack is balanced by construction");

    if let Some(sup) = superclass {
        let slots = heap.as_class(sup).methods.clone();
        heap.as_class_mut(class).methods = slots;
    }

    heap.as_class_mut(metaclass).methods[new_symbol.to_index()] =
        MethodSlot::Primitive(primitive_metaclass_new);
    class
}

/// Approximates C's `%g`: the shortest decimal representation, without a
/// trailing `.0` for integral values (spec §6 `print_value`: "`%g` for
/// numbers").
fn format_number(n: f64) -> String {
    if n == n.trunc() && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
