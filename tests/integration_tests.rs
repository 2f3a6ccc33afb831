use alan2022c::error::ErrorKind;

fn compile_ok(source: &str) -> alan2022c::EmittedClass {
    alan2022c::compile(source, None).unwrap_or_else(|e| panic!("unexpected error: {}", e))
}

fn compile_err(source: &str) -> ErrorKind {
    alan2022c::compile(source, None)
        .expect_err("expected a compile error")
        .kind
}

#[test]
fn relax_program_compiles_with_empty_main() {
    let class = compile_ok("source P begin relax end");
    assert_eq!(class.class_name, "P");
    assert!(class.listing.contains(".method public static main()V"));
    assert!(class.listing.contains("return"));
}

#[test]
fn arithmetic_expression_evaluates_with_correct_precedence() {
    // x := 2 + 3 * 4, mulop binds tighter than addop.
    let class = compile_ok("source P begin integer x; x := 2 + 3 * 4 end");
    let text = class.listing;
    assert!(text.contains("ldc 2"));
    assert!(text.contains("ldc 3"));
    assert!(text.contains("ldc 4"));
    assert!(text.contains("imul"));
    assert!(text.contains("iadd"));
}

#[test]
fn boolean_assignment_type_mismatch_is_reported() {
    assert!(matches!(
        compile_err("source P begin boolean b; b := 1 end"),
        ErrorKind::IncompatibleTypes { .. }
    ));
}

#[test]
fn nested_comments_do_not_confuse_the_lexer() {
    let class = compile_ok("source P begin { outer { inner } still-outer } relax end");
    assert_eq!(class.class_name, "P");
}

#[test]
fn number_literal_overflow_is_fatal() {
    let src = "source P begin integer x; x := 2147483648 end";
    assert_eq!(compile_err(src), ErrorKind::NumberTooLarge);
}

#[test]
fn one_thousand_twenty_five_byte_string_compiles() {
    let long_string = "a".repeat(1025);
    let src = format!(r#"source P begin put "{}" end"#, long_string);
    let class = compile_ok(&src);
    assert!(class.listing.contains(&long_string));
}

#[test]
fn function_with_declared_return_missing_leave_is_fatal() {
    let src = "source P function f(integer a) to integer begin leave a + 1 end \
               begin relax end";
    // this one has the leave and should compile cleanly
    let class = compile_ok(src);
    assert!(class.listing.contains(".method public static f(I)I"));

    let missing = "source P function f() to integer begin relax end begin relax end";
    assert!(matches!(
        compile_err(missing),
        ErrorKind::IncompatibleTypes { .. }
    ));
}

#[test]
fn whole_program_with_function_array_and_loop() {
    let src = "source Sums \
               function sum_to(integer n) to integer begin \
                 integer total; integer i; \
                 total := 0; i := 1; \
                 while i <= n do total := total + i; i := i + 1 end; \
                 leave total \
               end \
               begin \
                 integer array values; integer i; integer result; \
                 values := array 5; i := 0; \
                 while i < 5 do values[i] := i * i; i := i + 1 end; \
                 result := sum_to(10); \
                 put \"sum is \" . result \
               end";
    let class = compile_ok(src);
    let text = class.listing;
    assert!(text.contains(".method public static sum_to(I)I"));
    assert!(text.contains(".method public static main()V"));
    assert!(text.contains("invokestatic Sums/sum_to(I)I"));
    assert!(text.contains("newarray int"));
    assert!(text.contains("iastore"));
}

#[test]
fn illegal_character_reports_the_offending_byte() {
    assert_eq!(
        compile_err("source P begin relax end #"),
        ErrorKind::IllegalCharacter('#')
    );
}

#[test]
fn scope_closes_after_subroutine_so_locals_do_not_leak() {
    let src = "source P function f() begin integer only_in_f; only_in_f := 1 end \
               begin only_in_f := 2 end";
    assert_eq!(
        compile_err(src),
        ErrorKind::UnknownIdentifier("only_in_f".to_string())
    );
}
