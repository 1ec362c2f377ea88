//! Tests for exception blocks and branches that cross them.

use super::{Emitter, Signature};
use crate::error::{EmitError, ErrorKind, InvalidOperationError, VerifyError};
use crate::members::ConstructorRef;
use crate::state::HandlerSort;
use pretty_assertions::assert_eq;
use verasm_types::{ClassType, SemanticType};

fn void_emitter() -> Emitter {
    Emitter::new("test", Signature::empty())
}

fn message(err: EmitError) -> String {
    err.to_string()
}

#[test]
fn test_try_catch_finally() {
    let mut e = Emitter::new("guarded", Signature::new([], Some(SemanticType::Int32)));
    let result = e.declare_local(SemanticType::Int32, Some("result")).unwrap();
    let done = e.define_label(Some("done"));

    let outer = e.begin_exception_block().unwrap();
    let inner = e.begin_exception_block().unwrap();
    e.load_constant(1).unwrap();
    e.store_local(result).unwrap();
    e.leave(done).unwrap();
    let finally = e.begin_finally_block(inner).unwrap();
    assert!(e.stack().is_empty());
    e.end_finally_block(finally).unwrap();
    e.end_exception_block(inner).unwrap();
    e.leave(done).unwrap();

    let catch = e.begin_catch_block(outer, SemanticType::exception()).unwrap();
    assert_eq!(e.stack(), &[SemanticType::exception()]);
    e.pop().unwrap();
    e.load_constant(-1).unwrap();
    e.store_local(result).unwrap();
    e.leave(done).unwrap();
    e.end_catch_block(catch).unwrap();
    e.end_exception_block(outer).unwrap();

    e.mark_label(done).unwrap();
    e.load_local(result).unwrap();
    e.ret().unwrap();

    let body = e.finalize().unwrap();
    assert_eq!(body.regions.len(), 2);
    assert_eq!(body.regions[1].parent, Some(0));
    assert_eq!(body.handlers.len(), 2);
    assert_eq!(body.handlers[0].sort, HandlerSort::Finally);
    assert_eq!(body.handlers[1].sort, HandlerSort::Catch(SemanticType::exception()));
}

#[test]
fn test_catch_pushes_the_declared_exception() {
    let io = ClassType::new("System.IO.IOException", ClassType::exception());
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    let catch = e
        .begin_catch_block(region, SemanticType::Object(io.clone()))
        .unwrap();
    assert_eq!(e.stack(), &[SemanticType::Object(io)]);
    e.pop().unwrap();
    e.end_catch_block(catch).unwrap();

    let catch_all = e.begin_catch_all_block(region).unwrap();
    assert_eq!(e.stack(), &[SemanticType::exception()]);
    e.pop().unwrap();
    e.end_catch_block(catch_all).unwrap();
    e.end_exception_block(region).unwrap();
    assert!(e.is_reachable());
    e.ret().unwrap();
    e.finalize().unwrap();
}

#[test]
fn test_catch_on_closed_region() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    let catch = e.begin_catch_all_block(region).unwrap();
    e.pop().unwrap();
    e.end_catch_block(catch).unwrap();
    e.end_exception_block(region).unwrap();

    let err = e
        .begin_catch_block(region, SemanticType::exception())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert_eq!(
        message(err),
        "BeginCatchBlock expects an unclosed exception block, but ExceptionBlock #0 is already closed"
    );
}

#[test]
fn test_catch_inside_open_catch() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    e.begin_catch_all_block(region).unwrap();
    e.pop().unwrap();
    let err = e.begin_catch_all_block(region).unwrap_err();
    assert_eq!(
        message(err),
        "Cannot start a new catch block, ExceptionBlock #0 already has an open catch block"
    );
}

#[test]
fn test_finally_inside_open_catch() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    e.begin_catch_all_block(region).unwrap();
    e.pop().unwrap();
    let err = e.begin_finally_block(region).unwrap_err();
    assert_eq!(
        err,
        EmitError::InvalidOperation(InvalidOperationError::HandlerAlreadyOpen {
            requested: crate::error::HandlerKind::Finally,
            region: "ExceptionBlock #0".into(),
            open: crate::error::HandlerKind::Catch,
        })
    );
}

#[test]
fn test_handler_on_outer_region_while_inner_open() {
    let mut e = void_emitter();
    let outer = e.begin_exception_block().unwrap();
    let _inner = e.begin_exception_block().unwrap();
    let err = e.begin_catch_all_block(outer).unwrap_err();
    assert_eq!(
        message(err),
        "Cannot start CatchBlock on ExceptionBlock #0 while inner ExceptionBlock #1 is still open"
    );
}

#[test]
fn test_end_handler_while_inner_region_open() {
    let mut e = void_emitter();
    let outer = e.begin_exception_block().unwrap();
    let finally = e.begin_finally_block(outer).unwrap();
    e.begin_exception_block().unwrap();
    let err = e.end_finally_block(finally).unwrap_err();
    assert_eq!(
        message(err),
        "Cannot start EndFinallyBlock on ExceptionBlock #0 while inner ExceptionBlock #1 is still open"
    );
}

#[test]
fn test_begin_region_with_values_on_stack() {
    let mut e = void_emitter();
    e.load_constant(1).unwrap();
    let err = e.begin_exception_block().unwrap_err();
    assert_eq!(
        err,
        EmitError::Verification(VerifyError::StackNotEmpty {
            operation: "BeginExceptionBlock",
            depth: 1,
        })
    );
    assert_eq!(
        message(err),
        "Stack should be empty when BeginExceptionBlock is called"
    );
}

#[test]
fn test_end_catch_with_exception_still_on_stack() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    let catch = e.begin_catch_all_block(region).unwrap();
    let err = e.end_catch_block(catch).unwrap_err();
    assert_eq!(
        message(err),
        "Stack should be empty when EndCatchBlock is called"
    );
}

#[test]
fn test_catch_of_non_exception() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    let err = e
        .begin_catch_block(region, SemanticType::string())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert_eq!(
        message(err),
        "exceptionType must derive from System.Exception; found System.String"
    );
}

#[test]
fn test_second_finally() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    let finally = e.begin_finally_block(region).unwrap();
    e.end_finally_block(finally).unwrap();
    let err = e.begin_finally_block(region).unwrap_err();
    assert_eq!(message(err), "ExceptionBlock #0 already has a finally block");
}

#[test]
fn test_end_region_without_handlers() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    let err = e.end_exception_block(region).unwrap_err();
    assert_eq!(
        message(err),
        "Cannot end ExceptionBlock #0, it has no catch or finally blocks"
    );
}

#[test]
fn test_end_region_with_open_handler() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    e.begin_finally_block(region).unwrap();
    let err = e.end_exception_block(region).unwrap_err();
    assert_eq!(
        message(err),
        "Cannot end ExceptionBlock #0, it still has an open finally block"
    );
}

#[test]
fn test_end_handler_twice() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    let catch = e.begin_catch_all_block(region).unwrap();
    e.pop().unwrap();
    e.end_catch_block(catch).unwrap();
    let err = e.end_catch_block(catch).unwrap_err();
    assert_eq!(
        message(err),
        "Cannot end CatchBlock #0, it is not the open block of its exception block"
    );
}

#[test]
fn test_unclosed_region() {
    let mut e = void_emitter();
    e.begin_exception_block().unwrap();
    let err = e.finalize().unwrap_err();
    assert_eq!(message(err), "ExceptionBlock #0 was never closed");
}

#[test]
fn test_foreign_region() {
    let mut a = void_emitter();
    let mut b = void_emitter();
    let region = a.begin_exception_block().unwrap();
    let err = b.begin_finally_block(region).unwrap_err();
    assert_eq!(
        message(err),
        "ExceptionBlock #0 is not owned by this emitter, and thus cannot be used"
    );
}

// ----------------------------------------------------------------------------
// Crossing region boundaries
// ----------------------------------------------------------------------------

#[test]
fn test_label_between_handlers() {
    let mut e = void_emitter();
    let between = e.define_label(Some("between"));
    let region = e.begin_exception_block().unwrap();
    let done = e.define_label(Some("done"));
    e.leave(done).unwrap();
    let catch = e.begin_catch_all_block(region).unwrap();
    e.pop().unwrap();
    e.leave(done).unwrap();
    e.end_catch_block(catch).unwrap();
    let err = e.mark_label(between).unwrap_err();
    assert_eq!(
        err,
        EmitError::InvalidOperation(InvalidOperationError::LabelBetweenBlocks {
            label: "Label 'between'".into(),
            region: "ExceptionBlock #0".into(),
        })
    );
    assert_eq!(
        message(err),
        "Cannot mark Label 'between' between the blocks of ExceptionBlock #0"
    );
}

#[test]
fn test_branch_out_of_try() {
    let mut e = void_emitter();
    let outside = e.define_label(Some("outside"));
    let region = e.begin_exception_block().unwrap();
    // Accepted here; the crossing is only known to be illegal once the
    // label is marked.
    e.branch(outside).unwrap();
    let catch = e.begin_catch_all_block(region).unwrap();
    e.pop().unwrap();
    e.end_catch_block(catch).unwrap();
    e.end_exception_block(region).unwrap();
    e.mark_label(outside).unwrap();
    e.ret().unwrap();

    let err = e.finalize().unwrap_err();
    assert_eq!(
        message(err),
        "Cannot branch from inside ExceptionBlock #0 to outside, exit the ExceptionBlock first"
    );
}

#[test]
fn test_branch_into_try() {
    let mut e = void_emitter();
    let inside = e.define_label(Some("inside"));
    let end = e.define_label(Some("end"));
    let region = e.begin_exception_block().unwrap();
    e.mark_label(inside).unwrap();
    e.leave(end).unwrap();
    let catch = e.begin_catch_all_block(region).unwrap();
    e.pop().unwrap();
    e.end_catch_block(catch).unwrap();
    e.end_exception_block(region).unwrap();
    e.branch(inside).unwrap();
    e.mark_label(end).unwrap();
    e.ret().unwrap();

    let err = e.finalize().unwrap_err();
    assert_eq!(message(err), "Cannot branch into ExceptionBlock #0 from outside");
}

#[test]
fn test_branch_from_catch_to_try() {
    let mut e = void_emitter();
    let retry = e.define_label(Some("retry"));
    let region = e.begin_exception_block().unwrap();
    e.mark_label(retry).unwrap();
    let catch = e.begin_catch_all_block(region).unwrap();
    e.pop().unwrap();
    e.branch(retry).unwrap();
    e.end_catch_block(catch).unwrap();
    e.end_exception_block(region).unwrap();
    e.ret().unwrap();

    let err = e.finalize().unwrap_err();
    assert_eq!(
        message(err),
        "Cannot branch from inside ExceptionBlock #0 to outside, exit the ExceptionBlock first"
    );
}

#[test]
fn test_branch_within_try() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    let top = e.define_label(None);
    let exit = e.define_label(None);
    e.mark_label(top).unwrap();
    e.load_constant(0).unwrap();
    e.branch_if(crate::ops::BranchCondition::True, top).unwrap();
    e.leave(exit).unwrap();
    let finally = e.begin_finally_block(region).unwrap();
    e.end_finally_block(finally).unwrap();
    e.end_exception_block(region).unwrap();
    e.mark_label(exit).unwrap();
    e.ret().unwrap();
    e.finalize().unwrap();
}

#[test]
fn test_leave_empties_the_stack() {
    let mut e = void_emitter();
    let exit = e.define_label(None);
    let region = e.begin_exception_block().unwrap();
    e.load_constant(1).unwrap();
    e.load_constant(2).unwrap();
    e.leave(exit).unwrap();
    assert!(!e.is_reachable());
    let finally = e.begin_finally_block(region).unwrap();
    e.end_finally_block(finally).unwrap();
    e.end_exception_block(region).unwrap();
    e.mark_label(exit).unwrap();
    assert!(e.stack().is_empty());
    e.ret().unwrap();
    e.finalize().unwrap();
}

#[test]
fn test_return_inside_region() {
    let mut e = void_emitter();
    e.begin_exception_block().unwrap();
    let err = e.ret().unwrap_err();
    assert_eq!(
        message(err),
        "Cannot Return from inside ExceptionBlock #0, leave the ExceptionBlock first"
    );
}

// ----------------------------------------------------------------------------
// Throw and rethrow
// ----------------------------------------------------------------------------

#[test]
fn test_rethrow_outside_catch() {
    let mut e = void_emitter();
    let err = e.rethrow().unwrap_err();
    assert_eq!(err, EmitError::InvalidOperation(InvalidOperationError::RethrowOutsideCatch));

    let region = e.begin_exception_block().unwrap();
    e.begin_finally_block(region).unwrap();
    let err = e.rethrow().unwrap_err();
    assert_eq!(message(err), "Rethrow is only legal inside a catch block");
}

#[test]
fn test_rethrow_inside_catch() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    let catch = e.begin_catch_all_block(region).unwrap();
    e.pop().unwrap();
    e.rethrow().unwrap();
    assert!(!e.is_reachable());
    e.end_catch_block(catch).unwrap();
    e.end_exception_block(region).unwrap();
    e.ret().unwrap();
    e.finalize().unwrap();
}

#[test]
fn test_rethrow_in_try_nested_inside_catch() {
    let mut e = void_emitter();
    let outer = e.begin_exception_block().unwrap();
    let catch = e.begin_catch_all_block(outer).unwrap();
    e.pop().unwrap();
    let inner = e.begin_exception_block().unwrap();
    e.rethrow().unwrap();
    let finally = e.begin_finally_block(inner).unwrap();
    e.end_finally_block(finally).unwrap();
    e.end_exception_block(inner).unwrap();
    e.end_catch_block(catch).unwrap();
    e.end_exception_block(outer).unwrap();
    e.ret().unwrap();
    e.finalize().unwrap();
}

#[test]
fn test_throw_inside_try() {
    let mut e = void_emitter();
    let region = e.begin_exception_block().unwrap();
    e.new_object(ConstructorRef::new(ClassType::exception(), []))
        .unwrap();
    e.throw().unwrap();
    let catch = e.begin_catch_all_block(region).unwrap();
    e.pop().unwrap();
    e.end_catch_block(catch).unwrap();
    e.end_exception_block(region).unwrap();
    e.ret().unwrap();
    let body = e.finalize().unwrap();
    assert_eq!(body.max_stack, 1);
}
