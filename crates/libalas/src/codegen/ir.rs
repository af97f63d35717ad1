//! The IR object model the code generator targets.
//!
//! The model is a small SSA-style subset of LLVM IR: typed virtual
//! registers, one entry block per function, explicit terminators, stack
//! slots via `alloca`/`load`/`store`, and calls to declared external
//! symbols for everything the runtime provides. Rendering an [`IrModule`]
//! with `Display` yields textual LLVM IR (`.ll`): integers are `i64`,
//! booleans `i1`, floats `double`, and strings and containers opaque
//! `ptr` values.
//!
//! Owning the model (rather than driving an LLVM binding) is what lets
//! the optimizer implement its passes as plain transformations over these
//! vectors; the printer is the only place LLVM syntax exists.

use std::fmt;

use strum_macros::Display;

/// The type vocabulary of the generated IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum IrType {
    #[strum(serialize = "i64")]
    I64,
    #[strum(serialize = "double")]
    F64,
    #[strum(serialize = "i1")]
    I1,
    #[strum(serialize = "ptr")]
    Ptr,
    #[strum(serialize = "void")]
    Void,
}

/// An SSA operand: a named virtual register, a global, or an immediate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A virtual register or stack slot, rendered `%name`.
    Temp(String),
    /// A global symbol, rendered `@name`.
    Global(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Operand {
    pub fn temp(name: impl Into<String>) -> Self {
        Operand::Temp(name.into())
    }

    /// True for immediates, which the constant folder can combine.
    pub fn is_const(&self) -> bool {
        matches!(self, Operand::Int(_) | Operand::Float(_) | Operand::Bool(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp(name) => write!(f, "%{name}"),
            Operand::Global(name) => write!(f, "@{name}"),
            Operand::Int(value) => write!(f, "{value}"),
            Operand::Float(value) => f.write_str(&render_double(*value)),
            Operand::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// LLVM double literals always carry a decimal point.
fn render_double(value: f64) -> String {
    let rendered = format!("{value}");
    if rendered.contains('.') {
        rendered
    } else {
        format!("{rendered}.0")
    }
}

/// Integer binary opcodes plus their floating-point counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum IrBinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    And,
    Or,
    Xor,
}

/// Signed integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum IcmpCond {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

/// Ordered floating-point comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FcmpCond {
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
}

/// One (non-terminator) instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Alloca {
        dest: Operand,
        ty: IrType,
    },
    Load {
        dest: Operand,
        ty: IrType,
        ptr: Operand,
    },
    Store {
        ty: IrType,
        value: Operand,
        ptr: Operand,
    },
    BinOp {
        dest: Operand,
        op: IrBinOp,
        ty: IrType,
        lhs: Operand,
        rhs: Operand,
    },
    ICmp {
        dest: Operand,
        cond: IcmpCond,
        ty: IrType,
        lhs: Operand,
        rhs: Operand,
    },
    FCmp {
        dest: Operand,
        cond: FcmpCond,
        lhs: Operand,
        rhs: Operand,
    },
    Call {
        /// `None` for void calls.
        dest: Option<Operand>,
        ret: IrType,
        callee: String,
        args: Vec<(IrType, Operand)>,
        /// Set by the tail-call-marking pass.
        tail: bool,
    },
    /// `sitofp i64 ... to double`, the Int-to-Float promotion.
    SiToFp {
        dest: Operand,
        value: Operand,
    },
    /// `zext i1 ... to i64`, used where a comparison feeds integer math.
    ZExt {
        dest: Operand,
        from: IrType,
        to: IrType,
        value: Operand,
    },
}

impl Instruction {
    /// The register this instruction defines, if any.
    pub fn dest(&self) -> Option<&Operand> {
        match self {
            Instruction::Alloca { dest, .. }
            | Instruction::Load { dest, .. }
            | Instruction::BinOp { dest, .. }
            | Instruction::ICmp { dest, .. }
            | Instruction::FCmp { dest, .. }
            | Instruction::SiToFp { dest, .. }
            | Instruction::ZExt { dest, .. } => Some(dest),
            Instruction::Call { dest, .. } => dest.as_ref(),
            Instruction::Store { .. } => None,
        }
    }

    /// The operands this instruction reads.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Instruction::Alloca { .. } => Vec::new(),
            Instruction::Load { ptr, .. } => vec![ptr],
            Instruction::Store { value, ptr, .. } => vec![value, ptr],
            Instruction::BinOp { lhs, rhs, .. } | Instruction::ICmp { lhs, rhs, .. } | Instruction::FCmp { lhs, rhs, .. } => {
                vec![lhs, rhs]
            }
            Instruction::Call { args, .. } => args.iter().map(|(_, operand)| operand).collect(),
            Instruction::SiToFp { value, .. } | Instruction::ZExt { value, .. } => vec![value],
        }
    }

    /// Mutable view of the operands, for substitution passes.
    pub fn operands_mut(&mut self) -> Vec<&mut Operand> {
        match self {
            Instruction::Alloca { .. } => Vec::new(),
            Instruction::Load { ptr, .. } => vec![ptr],
            Instruction::Store { value, ptr, .. } => vec![value, ptr],
            Instruction::BinOp { lhs, rhs, .. } | Instruction::ICmp { lhs, rhs, .. } | Instruction::FCmp { lhs, rhs, .. } => {
                vec![lhs, rhs]
            }
            Instruction::Call { args, .. } => args.iter_mut().map(|(_, operand)| operand).collect(),
            Instruction::SiToFp { value, .. } | Instruction::ZExt { value, .. } => vec![value],
        }
    }

    /// True when the instruction has no effect besides its result: safe
    /// to deduplicate, fold or hoist. Loads depend on memory and calls on
    /// the callee, so neither qualifies.
    pub fn is_pure(&self) -> bool {
        matches!(
            self,
            Instruction::BinOp { .. }
                | Instruction::ICmp { .. }
                | Instruction::FCmp { .. }
                | Instruction::SiToFp { .. }
                | Instruction::ZExt { .. }
        )
    }

    /// A structural key identifying the computed value, used by CSE.
    /// `None` for instructions that are not pure.
    pub fn value_key(&self) -> Option<String> {
        if !self.is_pure() {
            return None;
        }
        match self {
            Instruction::BinOp { op, ty, lhs, rhs, .. } => Some(format!("{op} {ty} {lhs}, {rhs}")),
            Instruction::ICmp { cond, ty, lhs, rhs, .. } => Some(format!("icmp {cond} {ty} {lhs}, {rhs}")),
            Instruction::FCmp { cond, lhs, rhs, .. } => Some(format!("fcmp {cond} {lhs}, {rhs}")),
            Instruction::SiToFp { value, .. } => Some(format!("sitofp {value}")),
            Instruction::ZExt { from, to, value, .. } => Some(format!("zext {from} {value} {to}")),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloca { dest, ty } => write!(f, "{dest} = alloca {ty}"),
            Instruction::Load { dest, ty, ptr } => write!(f, "{dest} = load {ty}, ptr {ptr}"),
            Instruction::Store { ty, value, ptr } => write!(f, "store {ty} {value}, ptr {ptr}"),
            Instruction::BinOp { dest, op, ty, lhs, rhs } => write!(f, "{dest} = {op} {ty} {lhs}, {rhs}"),
            Instruction::ICmp { dest, cond, ty, lhs, rhs } => {
                write!(f, "{dest} = icmp {cond} {ty} {lhs}, {rhs}")
            }
            Instruction::FCmp { dest, cond, lhs, rhs } => {
                write!(f, "{dest} = fcmp {cond} double {lhs}, {rhs}")
            }
            Instruction::Call {
                dest,
                ret,
                callee,
                args,
                tail,
            } => {
                if let Some(dest) = dest {
                    write!(f, "{dest} = ")?;
                }
                if *tail {
                    f.write_str("tail ")?;
                }
                write!(f, "call {ret} @{callee}(")?;
                for (position, (ty, operand)) in args.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty} {operand}")?;
                }
                f.write_str(")")
            }
            Instruction::SiToFp { dest, value } => write!(f, "{dest} = sitofp i64 {value} to double"),
            Instruction::ZExt { dest, from, to, value } => {
                write!(f, "{dest} = zext {from} {value} to {to}")
            }
        }
    }
}

/// A basic-block terminator.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Ret {
        ty: IrType,
        value: Option<Operand>,
    },
    Br {
        target: String,
    },
    CondBr {
        cond: Operand,
        then_target: String,
        else_target: String,
    },
    Unreachable,
}

impl Terminator {
    /// Labels this terminator can transfer control to.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Terminator::Br { target } => vec![target.as_str()],
            Terminator::CondBr {
                then_target,
                else_target,
                ..
            } => vec![then_target.as_str(), else_target.as_str()],
            Terminator::Ret { .. } | Terminator::Unreachable => Vec::new(),
        }
    }

    /// The operands this terminator reads.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Terminator::Ret { value: Some(value), .. } => vec![value],
            Terminator::CondBr { cond, .. } => vec![cond],
            _ => Vec::new(),
        }
    }

    /// Mutable view of the operands, for substitution passes.
    pub fn operands_mut(&mut self) -> Vec<&mut Operand> {
        match self {
            Terminator::Ret { value: Some(value), .. } => vec![value],
            Terminator::CondBr { cond, .. } => vec![cond],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Ret { value: Some(value), ty } => write!(f, "ret {ty} {value}"),
            Terminator::Ret { value: None, .. } => f.write_str("ret void"),
            Terminator::Br { target } => write!(f, "br label %{target}"),
            Terminator::CondBr {
                cond,
                then_target,
                else_target,
            } => write!(f, "br i1 {cond}, label %{then_target}, label %{else_target}"),
            Terminator::Unreachable => f.write_str("unreachable"),
        }
    }
}

/// A labeled basic block. The builder leaves `terminator` empty until the
/// block is sealed; a block still empty at print time renders as
/// `unreachable`, which only happens for blocks no edge leads to.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
            terminator: None,
        }
    }
}

/// A function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub params: Vec<(String, IrType)>,
    pub ret: IrType,
    pub blocks: Vec<BasicBlock>,
}

impl IrFunction {
    /// Finds a block by label.
    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|block| block.label == label)
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define {} @{}(", self.ret, self.name)?;
        for (position, (name, ty)) in self.params.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty} %{name}")?;
        }
        f.write_str(") {\n")?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for instruction in &block.instructions {
                writeln!(f, "  {instruction}")?;
            }
            match &block.terminator {
                Some(terminator) => writeln!(f, "  {terminator}")?,
                None => writeln!(f, "  unreachable")?,
            }
        }
        f.write_str("}\n")
    }
}

/// A declared external symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct IrExternal {
    pub name: String,
    pub params: Vec<IrType>,
    pub ret: IrType,
}

impl fmt::Display for IrExternal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "declare {} @{}(", self.ret, self.name)?;
        for (position, ty) in self.params.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        f.write_str(")")
    }
}

/// A private constant string global.
#[derive(Debug, Clone, PartialEq)]
pub struct IrGlobal {
    pub name: String,
    /// The bytes of the string, without the trailing NUL (added on print).
    pub content: String,
}

impl fmt::Display for IrGlobal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.content.as_bytes();
        write!(
            f,
            "@{} = private unnamed_addr constant [{} x i8] c\"",
            self.name,
            bytes.len() + 1
        )?;
        for byte in bytes {
            match byte {
                b'"' | b'\\' => write!(f, "\\{byte:02X}")?,
                0x20..=0x7e => write!(f, "{}", *byte as char)?,
                _ => write!(f, "\\{byte:02X}")?,
            }
        }
        f.write_str("\\00\"")
    }
}

/// A complete IR compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct IrModule {
    pub name: String,
    pub globals: Vec<IrGlobal>,
    pub externals: Vec<IrExternal>,
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            externals: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Declares an external symbol once; repeat declarations are merged.
    pub fn declare_external(&mut self, external: IrExternal) {
        if !self.externals.iter().any(|existing| existing.name == external.name) {
            self.externals.push(external);
        }
    }

    /// Finds a function definition by symbol name.
    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|function| function.name == name)
    }

    /// True when a symbol of this name is defined or declared.
    pub fn has_symbol(&self, name: &str) -> bool {
        self.function(name).is_some() || self.externals.iter().any(|external| external.name == name)
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        if !self.globals.is_empty() {
            writeln!(f)?;
            for global in &self.globals {
                writeln!(f, "{global}")?;
            }
        }
        if !self.externals.is_empty() {
            writeln!(f)?;
            for external in &self.externals {
                writeln!(f, "{external}")?;
            }
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}
