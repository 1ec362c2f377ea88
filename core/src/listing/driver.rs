//! Drives an [`Emitter`] from parsed listing lines.
//!
//! Each method gets its own emitter. The first error inside a method is
//! reported and the rest of that method is skipped; verification resumes
//! with the next method.

use ecow::EcoString;
use hashbrown::HashMap;
use tracing::debug;
use verasm_types::{ClassType, SemanticType};

use super::Span;
use super::error::{emit_diagnostic, resolve_diagnostic};
use super::parser::{Line, LineKind, Operand, Owner, RegionDirective, TypeExpr};
use crate::api::{Diagnostic, EmitterOptions};
use crate::emitter::{Emitter, Signature, VerifiedBody};
use crate::error::{EmitError, InvalidOperationError, VerifyError};
use crate::members::{ConstructorRef, FieldOwner, FieldRef, MethodRef};
use crate::ops::{
    AccessKind, ArrayOp, BinaryOp, BranchCondition, CompareOp, Conversion, ShiftOp, UnaryOp,
};
use crate::state::{Catch, Finally, Label, Local, Region, describe_region};
use crate::{ToString, Vec, format};

/// Why a line could not be applied.
enum Failure {
    Listing(Diagnostic),
    Emit(EmitError),
}

impl From<EmitError> for Failure {
    fn from(err: EmitError) -> Self {
        Failure::Emit(err)
    }
}

impl From<Diagnostic> for Failure {
    fn from(diagnostic: Diagnostic) -> Self {
        Failure::Listing(diagnostic)
    }
}

type LineResult<T = ()> = Result<T, Failure>;

struct LabelInfo {
    label: Label,
    /// First line that mentioned the label.
    first: Span,
}

struct RegionInfo {
    region: Region,
    opened: Span,
    catch: Option<Catch>,
    finally: Option<Finally>,
}

/// A method between its header and `end`.
struct MethodBuilder {
    emitter: Emitter,
    header: Span,
    labels: HashMap<EcoString, LabelInfo>,
    locals: Vec<(Option<EcoString>, Local)>,
    regions: HashMap<EcoString, RegionInfo>,
    /// Set after the first error; the remaining lines are skipped.
    failed: bool,
}

pub struct Driver {
    options: EmitterOptions,
    classes: HashMap<EcoString, ClassType>,
    method: Option<MethodBuilder>,
    bodies: Vec<VerifiedBody>,
    diagnostics: Vec<Diagnostic>,
}

impl Driver {
    pub fn new(options: EmitterOptions) -> Self {
        let mut classes = HashMap::new();
        for class in [
            ClassType::object(),
            ClassType::string(),
            ClassType::exception(),
            ClassType::array(),
        ] {
            classes.insert(EcoString::from(class.name()), class);
        }
        Self {
            options,
            classes,
            method: None,
            bodies: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Verifies every method and returns the bodies, or every diagnostic.
    pub fn run(mut self, lines: Vec<Line>) -> Result<Vec<VerifiedBody>, Vec<Diagnostic>> {
        for line in lines {
            self.line(line);
        }
        if let Some(method) = self.method.take() {
            self.diagnostics.push(resolve_diagnostic(
                format!("method '{}' has no matching 'end'", method.emitter.name()),
                method.header,
            ));
        }
        if self.diagnostics.is_empty() {
            Ok(self.bodies)
        } else {
            Err(self.diagnostics)
        }
    }

    fn line(&mut self, line: Line) {
        let Line { kind, span } = line;
        match kind {
            LineKind::Class { name, base } => {
                if self.method.is_some() {
                    self.report(resolve_diagnostic(
                        "classes must be declared outside methods",
                        span,
                    ));
                    return;
                }
                if let Err(diagnostic) = self.declare_class(name, base, &span) {
                    self.report(diagnostic);
                }
            }
            LineKind::Method { name, params, ret } => {
                if let Some(open) = self.method.take() {
                    self.report(resolve_diagnostic(
                        format!("method '{}' has no matching 'end'", open.emitter.name()),
                        open.header,
                    ));
                }
                self.begin_method(name, params, ret, span);
            }
            LineKind::End => self.end_method(span),
            kind => {
                let Some(mut method) = self.method.take() else {
                    self.report(resolve_diagnostic("expected a method declaration", span));
                    return;
                };
                if !method.failed {
                    if let Err(failure) = self.method_line(&mut method, kind, &span) {
                        method.failed = true;
                        let diagnostic = self.failure_diagnostic(&method, failure, span);
                        self.report(diagnostic);
                    }
                }
                self.method = Some(method);
            }
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        debug!(message = %diagnostic.message, "Listing diagnostic");
        self.diagnostics.push(diagnostic);
    }

    fn declare_class(&mut self, name: EcoString, base: Option<EcoString>, span: &Span) -> Result<(), Diagnostic> {
        if self.classes.contains_key(&name) {
            return Err(resolve_diagnostic(
                format!("class '{name}' is already declared"),
                span.clone(),
            ));
        }
        let base = match base {
            Some(base) => self.class(&base, span)?,
            None => ClassType::object(),
        };
        let class = ClassType::new(name.clone(), base);
        self.classes.insert(name, class);
        Ok(())
    }

    fn begin_method(&mut self, name: EcoString, params: Vec<TypeExpr>, ret: Option<TypeExpr>, span: Span) {
        let signature = params
            .iter()
            .map(|param| self.resolve(param, &span))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|params| {
                let ret = ret.as_ref().map(|ret| self.resolve(ret, &span)).transpose()?;
                Ok(Signature::new(params, ret))
            });
        let (signature, failed) = match signature {
            Ok(signature) => (signature, false),
            Err(diagnostic) => {
                self.report(diagnostic);
                (Signature::empty(), true)
            }
        };
        self.method = Some(MethodBuilder {
            emitter: Emitter::with_options(name, signature, self.options.clone()),
            header: span,
            labels: HashMap::new(),
            locals: Vec::new(),
            regions: HashMap::new(),
            failed,
        });
    }

    fn end_method(&mut self, span: Span) {
        let Some(method) = self.method.take() else {
            self.report(resolve_diagnostic("'end' outside of a method", span));
            return;
        };
        if method.failed {
            return;
        }
        let related = RelatedSpans::of(&method);
        match method.emitter.finalize() {
            Ok(body) => {
                debug!(method = %body.name, max_stack = body.max_stack, "Verified method");
                self.bodies.push(body);
            }
            Err(err) => {
                let diagnostic = related.attach(&err, emit_diagnostic(&err, span));
                self.report(diagnostic);
            }
        }
    }

    fn failure_diagnostic(&self, method: &MethodBuilder, failure: Failure, span: Span) -> Diagnostic {
        match failure {
            Failure::Listing(diagnostic) => diagnostic,
            Failure::Emit(err) => RelatedSpans::of(method).attach(&err, emit_diagnostic(&err, span)),
        }
    }

    // ------------------------------------------------------------------
    // Names and types
    // ------------------------------------------------------------------

    fn class(&self, name: &str, span: &Span) -> Result<ClassType, Diagnostic> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| resolve_diagnostic(format!("unknown class '{name}'"), span.clone()))
    }

    fn resolve(&self, ty: &TypeExpr, span: &Span) -> Result<SemanticType, Diagnostic> {
        Ok(match ty {
            TypeExpr::Int32 => SemanticType::Int32,
            TypeExpr::Int64 => SemanticType::Int64,
            TypeExpr::NativeInt => SemanticType::NativeInt,
            TypeExpr::Float32 => SemanticType::Float32,
            TypeExpr::Float64 => SemanticType::Float64,
            TypeExpr::Object => SemanticType::object(),
            TypeExpr::String => SemanticType::string(),
            TypeExpr::Named(name) => SemanticType::Object(self.class(name, span)?),
            TypeExpr::ValueType(name) => SemanticType::value_type(name.clone()),
            TypeExpr::Array(element) => SemanticType::array(self.resolve(element, span)?),
            TypeExpr::Pointer(target) => SemanticType::pointer(self.resolve(target, span)?),
            TypeExpr::ByRef(target) => SemanticType::by_ref(self.resolve(target, span)?),
        })
    }

    fn resolve_all(&self, types: &[TypeExpr], span: &Span) -> Result<Vec<SemanticType>, Diagnostic> {
        types.iter().map(|ty| self.resolve(ty, span)).collect()
    }

    fn field_owner(&self, owner: &Owner, span: &Span) -> Result<FieldOwner, Diagnostic> {
        match owner {
            Owner::Class(name) => Ok(FieldOwner::Class(self.class(name, span)?)),
            Owner::ValueType(name) => Ok(FieldOwner::ValueType(name.clone())),
        }
    }

    // ------------------------------------------------------------------
    // Method bodies
    // ------------------------------------------------------------------

    fn method_line(&self, method: &mut MethodBuilder, kind: LineKind, span: &Span) -> LineResult {
        match kind {
            LineKind::Local { name, ty } => {
                let ty = self.resolve(&ty, span)?;
                let local = method.emitter.declare_local(ty, Some(name.as_str()))?;
                method.locals.push((Some(name), local));
                Ok(())
            }
            LineKind::Label(name) => {
                let label = method.label(&name, span);
                Ok(method.emitter.mark_label(label)?)
            }
            LineKind::Region(directive) => self.region(method, directive, span),
            LineKind::Instruction { mnemonic, operands } => {
                self.instruction(method, &mnemonic, &operands, span)
            }
            LineKind::Class { .. } | LineKind::Method { .. } | LineKind::End => Ok(()),
        }
    }

    fn region(&self, method: &mut MethodBuilder, directive: RegionDirective, span: &Span) -> LineResult {
        match directive {
            RegionDirective::Try(name) => {
                if method.regions.contains_key(&name) {
                    return Err(resolve_diagnostic(
                        format!("exception block '{name}' is already declared"),
                        span.clone(),
                    )
                    .into());
                }
                let region = method.emitter.begin_exception_block()?;
                method.regions.insert(
                    name,
                    RegionInfo {
                        region,
                        opened: span.clone(),
                        catch: None,
                        finally: None,
                    },
                );
            }
            RegionDirective::Catch(name, ty) => {
                let ty = self.resolve(&ty, span)?;
                let info = region_info(&mut method.regions, &name, span)?;
                info.catch = Some(method.emitter.begin_catch_block(info.region, ty)?);
            }
            RegionDirective::CatchAll(name) => {
                let info = region_info(&mut method.regions, &name, span)?;
                info.catch = Some(method.emitter.begin_catch_all_block(info.region)?);
            }
            RegionDirective::EndCatch(name) => {
                let info = region_info(&mut method.regions, &name, span)?;
                let catch = info.catch.ok_or_else(|| {
                    resolve_diagnostic(format!("exception block '{name}' has no catch block"), span.clone())
                })?;
                method.emitter.end_catch_block(catch)?;
            }
            RegionDirective::Finally(name) => {
                let info = region_info(&mut method.regions, &name, span)?;
                info.finally = Some(method.emitter.begin_finally_block(info.region)?);
            }
            RegionDirective::EndFinally(name) => {
                let info = region_info(&mut method.regions, &name, span)?;
                let finally = info.finally.ok_or_else(|| {
                    resolve_diagnostic(
                        format!("exception block '{name}' has no finally block"),
                        span.clone(),
                    )
                })?;
                method.emitter.end_finally_block(finally)?;
            }
            RegionDirective::EndTry(name) => {
                let info = region_info(&mut method.regions, &name, span)?;
                method.emitter.end_exception_block(info.region)?;
            }
        }
        Ok(())
    }

    fn instruction(
        &self,
        method: &mut MethodBuilder,
        mnemonic: &str,
        operands: &[Operand],
        span: &Span,
    ) -> LineResult {
        let args = Operands {
            mnemonic,
            operands,
            span,
        };
        let e = &mut method.emitter;

        if let Some(op) = BinaryOp::ALL.into_iter().find(|op| op.mnemonic() == mnemonic) {
            args.none()?;
            return Ok(e.binary(op)?);
        }
        if let Some(op) = UnaryOp::ALL.into_iter().find(|op| op.mnemonic() == mnemonic) {
            args.none()?;
            return Ok(e.unary(op)?);
        }
        if let Some(op) = ShiftOp::ALL.into_iter().find(|op| op.mnemonic() == mnemonic) {
            args.none()?;
            return Ok(e.shift(op)?);
        }
        if let Some(op) = CompareOp::ALL.into_iter().find(|op| op.mnemonic() == mnemonic) {
            args.none()?;
            return Ok(e.compare(op)?);
        }
        if let Some(conversion) = Conversion::all().find(|c| c.mnemonic() == mnemonic) {
            args.none()?;
            return Ok(e.convert(conversion)?);
        }
        if let Some(condition) = BranchCondition::ALL
            .into_iter()
            .find(|c| c.mnemonic() == mnemonic)
        {
            let label = method.label(args.name()?, span);
            return Ok(method.emitter.branch_if(condition, label)?);
        }

        match mnemonic {
            "br" => {
                let label = method.label(args.name()?, span);
                method.emitter.branch(label)?;
            }
            "leave" => {
                let label = method.label(args.name()?, span);
                method.emitter.leave(label)?;
            }
            "ldc.i4" => {
                let value = args.integer()?;
                let value = i32::try_from(value).map_err(|_| {
                    resolve_diagnostic(format!("{value} does not fit in an int32"), span.clone())
                })?;
                e.load_constant(value)?;
            }
            "ldc.i8" => e.load_constant(args.integer()?)?,
            "ldc.r4" => e.load_constant(args.float()? as f32)?,
            "ldc.r8" => e.load_constant(args.float()?)?,
            "ldstr" => e.load_constant(args.string()?)?,
            "ldnull" => {
                args.none()?;
                e.load_null()?;
            }
            "pop" => {
                args.none()?;
                e.pop()?;
            }
            "dup" => {
                args.none()?;
                e.duplicate()?;
            }
            "initobj" => match args.ty()? {
                TypeExpr::ValueType(name) | TypeExpr::Named(name) => e.initialize_object(name.clone())?,
                _ => return Err(args.expected("a value type")),
            },
            "newarr" => e.new_array(self.resolve(args.ty()?, span)?)?,
            "ldelem" => e.load_element(self.resolve(args.ty()?, span)?)?,
            "stelem" => e.store_element(self.resolve(args.ty()?, span)?)?,
            "ldelema" => e.load_element_address(self.resolve(args.ty()?, span)?)?,
            "ldlen" => {
                args.none()?;
                e.array(ArrayOp::LoadLength)?;
            }
            "ldloc" | "stloc" | "ldloca" => {
                let local = method.local(&args)?;
                let e = &mut method.emitter;
                match mnemonic {
                    "ldloc" => e.load_local(local)?,
                    "stloc" => e.store_local(local)?,
                    _ => e.load_local_address(local)?,
                }
            }
            "ldarg" | "starg" | "ldarga" => {
                let value = args.integer()?;
                let index = u16::try_from(value).map_err(|_| {
                    resolve_diagnostic(format!("argument index {value} is out of range"), span.clone())
                })?;
                let kind = access_kind(mnemonic, "ldarg", "starg");
                e.argument(kind, index)?;
            }
            "ldfld" | "stfld" | "ldflda" | "ldsfld" | "stsfld" | "ldsflda" => {
                let Operand::Field { ty, owner, name } = args.single()? else {
                    return Err(args.expected("a field"));
                };
                let owner = self.field_owner(owner, span)?;
                let ty = self.resolve(ty, span)?;
                let field = if mnemonic.starts_with("lds") || mnemonic.starts_with("sts") {
                    FieldRef::new_static(owner, name.clone(), ty)
                } else {
                    FieldRef::instance(owner, name.clone(), ty)
                };
                let kind = match mnemonic {
                    "ldfld" | "ldsfld" => AccessKind::Load,
                    "stfld" | "stsfld" => AccessKind::Store,
                    _ => AccessKind::LoadAddress,
                };
                e.field(kind, field)?;
            }
            "call" => {
                let Operand::Method {
                    instance,
                    ret,
                    owner,
                    name,
                    params,
                } = args.single()?
                else {
                    return Err(args.expected("a method"));
                };
                let params = self.resolve_all(params, span)?;
                let ret = ret.as_ref().map(|ret| self.resolve(ret, span)).transpose()?;
                let target = match (*instance, owner) {
                    (true, Some(Owner::Class(class))) => {
                        MethodRef::new_instance(self.class(class, span)?, name.clone(), params, ret)
                    }
                    (true, _) => {
                        return Err(resolve_diagnostic(
                            "instance methods must name their declaring class",
                            span.clone(),
                        )
                        .into());
                    }
                    (false, Some(Owner::Class(owner) | Owner::ValueType(owner))) => {
                        MethodRef::new_static(format!("{owner}::{name}"), params, ret)
                    }
                    (false, None) => MethodRef::new_static(name.clone(), params, ret),
                };
                e.call(target)?;
            }
            "newobj" => {
                let Operand::Constructor {
                    owner: Owner::Class(class),
                    params,
                } = args.single()?
                else {
                    return Err(args.expected("a class constructor"));
                };
                let class = self.class(class, span)?;
                let params = self.resolve_all(params, span)?;
                e.new_object(ConstructorRef::new(class, params))?;
            }
            "ret" => {
                args.none()?;
                e.ret()?;
            }
            "throw" => {
                args.none()?;
                e.throw()?;
            }
            "rethrow" => {
                args.none()?;
                e.rethrow()?;
            }
            _ => {
                return Err(resolve_diagnostic(
                    format!("unknown instruction '{mnemonic}'"),
                    span.clone(),
                )
                .into());
            }
        }
        Ok(())
    }
}

fn region_info<'m>(
    regions: &'m mut HashMap<EcoString, RegionInfo>,
    name: &str,
    span: &Span,
) -> Result<&'m mut RegionInfo, Diagnostic> {
    regions
        .get_mut(name)
        .ok_or_else(|| resolve_diagnostic(format!("unknown exception block '{name}'"), span.clone()))
}

fn access_kind(mnemonic: &str, load: &str, store: &str) -> AccessKind {
    if mnemonic == load {
        AccessKind::Load
    } else if mnemonic == store {
        AccessKind::Store
    } else {
        AccessKind::LoadAddress
    }
}

impl MethodBuilder {
    /// The label called `name`, defined on first use.
    fn label(&mut self, name: &str, span: &Span) -> Label {
        if let Some(info) = self.labels.get(name) {
            return info.label;
        }
        let label = self.emitter.define_label(Some(name));
        self.labels.insert(
            name.into(),
            LabelInfo {
                label,
                first: span.clone(),
            },
        );
        label
    }

    /// A local by name, or by declaration index.
    fn local(&self, args: &Operands<'_>) -> LineResult<Local> {
        let (found, shown) = match args.single()? {
            Operand::Integer(index) => (
                usize::try_from(*index)
                    .ok()
                    .and_then(|index| self.locals.get(index)),
                index.to_string(),
            ),
            Operand::Type(ty) => {
                let Some(name) = ty.as_simple_name() else {
                    return Err(args.expected("a local name or index"));
                };
                // The latest declaration wins once an earlier one is released.
                let found = self
                    .locals
                    .iter()
                    .rev()
                    .find(|(local, _)| local.as_deref() == Some(name));
                (found, name.to_string())
            }
            _ => return Err(args.expected("a local name or index")),
        };
        found.map(|(_, local)| *local).ok_or_else(|| {
            resolve_diagnostic(format!("unknown local '{shown}'"), args.span.clone()).into()
        })
    }
}

/// Operands of one instruction line, checked by shape.
struct Operands<'a> {
    mnemonic: &'a str,
    operands: &'a [Operand],
    span: &'a Span,
}

impl<'a> Operands<'a> {
    fn expected(&self, what: &str) -> Failure {
        let found = match self.operands {
            [] => "nothing",
            [one] => one.describe(),
            _ => "several operands",
        };
        resolve_diagnostic(
            format!("'{}' expects {what} operand, found {found}", self.mnemonic),
            self.span.clone(),
        )
        .into()
    }

    fn none(&self) -> LineResult {
        if self.operands.is_empty() {
            Ok(())
        } else {
            Err(resolve_diagnostic(
                format!("'{}' takes no operands", self.mnemonic),
                self.span.clone(),
            )
            .into())
        }
    }

    fn single(&self) -> LineResult<&'a Operand> {
        match self.operands {
            [one] => Ok(one),
            _ => Err(self.expected("one")),
        }
    }

    fn integer(&self) -> LineResult<i64> {
        match self.single()? {
            Operand::Integer(value) => Ok(*value),
            _ => Err(self.expected("an integer")),
        }
    }

    fn float(&self) -> LineResult<f64> {
        match self.single()? {
            Operand::Float(value) => Ok(*value),
            Operand::Integer(value) => Ok(*value as f64),
            _ => Err(self.expected("a float")),
        }
    }

    fn string(&self) -> LineResult<EcoString> {
        match self.single()? {
            Operand::String(value) => Ok(value.clone()),
            _ => Err(self.expected("a string")),
        }
    }

    fn ty(&self) -> LineResult<&'a TypeExpr> {
        match self.single()? {
            Operand::Type(ty) => Ok(ty),
            _ => Err(self.expected("a type")),
        }
    }

    fn name(&self) -> LineResult<&'a str> {
        match self.single()? {
            Operand::Type(ty) => ty
                .as_simple_name()
                .ok_or_else(|| self.expected("a label")),
            _ => Err(self.expected("a label")),
        }
    }
}

/// Where the labels and blocks of a method were introduced, keyed by the
/// description errors use for them.
struct RelatedSpans {
    labels: Vec<(EcoString, Span)>,
    regions: Vec<(EcoString, Span)>,
}

impl RelatedSpans {
    fn of(method: &MethodBuilder) -> Self {
        Self {
            labels: method
                .labels
                .iter()
                .map(|(name, info)| (EcoString::from(format!("Label '{name}'")), info.first.clone()))
                .collect(),
            regions: method
                .regions
                .values()
                .map(|info| (describe_region(info.region.index() as u32), info.opened.clone()))
                .collect(),
        }
    }

    fn find(entries: &[(EcoString, Span)], key: &str) -> Option<Span> {
        entries
            .iter()
            .find(|(description, _)| description.as_str() == key)
            .map(|(_, span)| span.clone())
    }

    fn attach(&self, err: &EmitError, diagnostic: Diagnostic) -> Diagnostic {
        let related = match err {
            EmitError::Verification(VerifyError::LabelShapeMismatch { label, .. }) => {
                Self::find(&self.labels, label).map(|span| (span, "label first used here"))
            }
            EmitError::InvalidOperation(InvalidOperationError::UnmarkedLabel { label }) => {
                Self::find(&self.labels, label).map(|span| (span, "label used here"))
            }
            EmitError::InvalidOperation(
                InvalidOperationError::UnclosedRegion { region }
                | InvalidOperationError::RegionClosed { region, .. }
                | InvalidOperationError::BranchOutOfRegion { region }
                | InvalidOperationError::BranchIntoRegion { region }
                | InvalidOperationError::LabelBetweenBlocks { region, .. },
            ) => Self::find(&self.regions, region).map(|span| (span, "exception block opened here")),
            _ => None,
        };
        match related {
            Some((span, message)) => diagnostic.with_related(span, message),
            None => diagnostic,
        }
    }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;
