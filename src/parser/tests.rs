use super::*;
use crate::error::ErrorKind;

fn compile_ok(src: &str) -> Emitter {
    compile(src).unwrap_or_else(|e| panic!("unexpected error: {}", e))
}

fn compile_err(src: &str) -> ErrorKind {
    compile(src).expect_err("expected a compile error").kind
}

#[test]
fn empty_program_compiles_to_a_bare_main() {
    let e = compile_ok("source Empty begin relax end");
    let text = e.render();
    assert!(text.contains(".class public Empty"));
    assert!(text.contains(".method public static main()V"));
    assert!(text.contains("return"));
}

#[test]
fn put_of_a_string_literal_interns_and_prints() {
    let e = compile_ok(r#"source P begin put "hi" end"#);
    let text = e.render();
    assert!(text.contains(r#".const #0 = "hi""#));
    assert!(text.contains("invokestatic Runtime/printStr"));
}

#[test]
fn put_concatenation_chains_operands() {
    let e = compile_ok(r#"source P begin put 1 . true . "x" end"#);
    let text = e.render();
    assert!(text.contains("invokestatic Runtime/printInt"));
    assert!(text.contains("invokestatic Runtime/printBool"));
    assert!(text.contains("invokestatic Runtime/printStr"));
}

#[test]
fn vardef_then_assign_uses_declared_slot() {
    let e = compile_ok("source P begin integer x; x := 5 end");
    let text = e.render();
    assert!(text.contains("ldc 5"));
    assert!(text.contains("istore 0"));
}

#[test]
fn assign_type_mismatch_is_fatal() {
    assert!(matches!(
        compile_err("source P begin integer x; x := true end"),
        ErrorKind::IncompatibleTypes { .. }
    ));
}

#[test]
fn unknown_identifier_is_fatal() {
    assert_eq!(
        compile_err("source P begin x := 1 end"),
        ErrorKind::UnknownIdentifier("x".to_string())
    );
}

#[test]
fn relational_expression_materializes_boolean() {
    let e = compile_ok("source P begin boolean b; b := 1 < 2 end");
    let text = e.render();
    assert!(text.contains("if_icmplt"));
    assert!(text.contains("goto"));
}

#[test]
fn not_is_emitted_as_one_minus_operand() {
    let e = compile_ok("source P begin boolean b; b := not true end");
    let text = e.render();
    assert!(text.contains("ldc 1"));
    assert!(text.contains("isub"));
}

#[test]
fn while_loop_emits_head_and_exit_labels() {
    let e = compile_ok("source P begin boolean b; b := true; while b do relax end end");
    let text = e.render();
    assert!(text.contains("L0:"));
    assert!(text.contains("if_icmpeq"));
    assert!(text.contains("goto L0"));
}

#[test]
fn if_elsif_else_chain_shares_one_join_label() {
    let src = "source P begin integer x; x := 0; \
               if x = 0 then x := 1 elsif x = 1 then x := 2 else x := 3 end end";
    let e = compile_ok(src);
    let text = e.render();
    // The join label is the first one `parse_if` allocates (L0); both the
    // `if` and `elsif` branches jump to it, the trailing `else` falls through.
    assert_eq!(text.matches("goto L0\n").count(), 2);
}

#[test]
fn array_declaration_and_element_access_round_trip() {
    let src = "source P begin integer array a; a := array 10; a[0] := 5 end";
    let e = compile_ok(src);
    let text = e.render();
    assert!(text.contains("newarray int"));
    assert!(text.contains("iastore"));
}

#[test]
fn array_element_read_emits_iaload() {
    let src = "source P begin integer array a; integer x; a := array 4; x := a[1] end";
    let e = compile_ok(src);
    assert!(e.render().contains("iaload"));
}

#[test]
fn array_operation_on_non_array_variable_is_fatal() {
    assert!(matches!(
        compile_err("source P begin integer x; x := array 3 end"),
        ErrorKind::IllegalArrayOperation(_)
    ));
}

#[test]
fn function_without_leave_value_is_fatal() {
    let src = "source P function f() to integer begin relax end begin relax end";
    assert!(matches!(
        compile_err(src),
        ErrorKind::IncompatibleTypes { .. }
    ));
}

#[test]
fn function_call_checks_argument_count() {
    let src = "source P function f(integer n) to integer begin leave n end \
               begin integer x; x := f() end";
    assert_eq!(compile_err(src), ErrorKind::TooFewArguments);
}

#[test]
fn function_call_checks_argument_types() {
    let src = "source P function f(integer n) to integer begin leave n end \
               begin integer x; x := f(true) end";
    assert!(matches!(
        compile_err(src),
        ErrorKind::IncompatibleTypes { .. }
    ));
}

#[test]
fn procedure_call_emits_invokestatic_with_void_descriptor() {
    let src = "source P function p() begin relax end begin call p() end";
    let e = compile_ok(src);
    assert!(e.render().contains("invokestatic P/p()V"));
}

#[test]
fn array_returning_function_emits_areturn() {
    let src = "source P function make() to integer array begin \
               integer array a; a := array 3; leave a end \
               begin integer array a; a := make() end";
    let e = compile_ok(src);
    assert!(e.render().contains("areturn"));
}

#[test]
fn calling_a_variable_is_not_a_function_error() {
    let src = "source P begin integer x; x := 0; x := x() end";
    assert!(matches!(compile_err(src), ErrorKind::NotAFunction(_)));
}

#[test]
fn get_into_scalar_emits_read_and_store() {
    let e = compile_ok("source P begin integer x; get x end");
    let text = e.render();
    assert!(text.contains("invokestatic Runtime/readInt()I"));
    assert!(text.contains("istore 0"));
}

#[test]
fn get_into_boolean_array_element_emits_readbool_and_iastore() {
    let src = "source P begin boolean array flags; flags := array 2; get flags[0] end";
    let e = compile_ok(src);
    let text = e.render();
    assert!(text.contains("invokestatic Runtime/readBool()Z"));
    assert!(text.contains("iastore"));
}

#[test]
fn locals_outside_a_closed_subroutine_are_not_visible() {
    let src = "source P function f() begin integer y; y := 1 end begin y := 2 end";
    assert_eq!(compile_err(src), ErrorKind::UnknownIdentifier("y".to_string()));
}

#[test]
fn duplicate_parameter_names_are_fatal() {
    let src = "source P function f(integer n, integer n) begin relax end begin relax end";
    assert!(matches!(compile_err(src), ErrorKind::MultipleDefinition(_)));
}

#[test]
fn leave_with_value_inside_a_procedure_is_fatal() {
    let src = "source P function p() begin leave 1 end begin relax end";
    assert!(matches!(
        compile_err(src),
        ErrorKind::IncompatibleTypes { .. }
    ));
}
