//! Unit tests for the code generator.
//!
//! Covers type translation, symbol naming, constant globals, literal
//! generation and overload selection. End-to-end module generation is
//! tested in `tests/integration_tests.rs`.

use inkwell::{
    context::Context,
    module::Linkage,
    types::{AnyType, BasicType, BasicTypeEnum},
    values::{AnyValueEnum, BasicValue, BasicValueEnum},
    AddressSpace,
};
use pretty_assertions::assert_eq;

use crate::{
    ast::{
        ast::{Expr, FunctionArena},
        expressions::{Call, IntLiteral, Radix},
        statements::Block,
        types::{Signature, Type},
    },
    errors::errors::ErrorImpl,
    Span,
};

use super::{
    compiler::{Compiler, CompilerOptions},
    expr::{gen_block, gen_int_literal},
    overload::{select_overload, ArityOnly, ExactTypes, Selection},
    scope::ScopeStack,
    types::{
        ast_type_for_backend_type, function_type_for_value, mangled_name, translate_signature,
        translate_type, type_name,
    },
};

fn literal(text: &str, radix: Radix) -> IntLiteral {
    IntLiteral::new(text, radix, Span::null())
}

#[test]
fn test_mangled_name() {
    assert_eq!(mangled_name("plain_name.1"), "plain_name.1");
    assert_eq!(mangled_name("foo-bar"), "foo$2dbar");
    assert_eq!(mangled_name("ñ"), "$c3$b1");
    assert_eq!(mangled_name("a b"), "a$20b");
}

#[test]
fn test_unique_symbol_name() {
    let context = Context::create();
    let arena = FunctionArena::new();
    let compiler = Compiler::new(&arena, &context, "test", CompilerOptions::default());

    assert_eq!(compiler.unique_symbol_name("foo"), "foo");
    assert_eq!(compiler.unique_symbol_name("foo"), "foo");

    let fn_type = context.void_type().fn_type(&[], false);
    compiler.module.add_function("foo", fn_type, None);
    assert_eq!(compiler.unique_symbol_name("foo"), "foo__1");

    compiler
        .module
        .add_global(context.i64_type(), None, "foo__1");
    assert_eq!(compiler.unique_symbol_name("foo"), "foo__2");

    assert_eq!(compiler.unique_symbol_name("foo-bar"), "foo$2dbar");
}

#[test]
fn test_translate_scalar_types() {
    let context = Context::create();

    let expected: [(Type, BasicTypeEnum); 5] = [
        (Type::Int, context.i64_type().into()),
        (Type::Float, context.f64_type().into()),
        (Type::Bool, context.bool_type().into()),
        (Type::Byte, context.i8_type().into()),
        (Type::Char, context.i32_type().into()),
    ];

    for (type_, backend_type) in expected {
        assert_eq!(translate_type(&context, &type_), Ok(backend_type));
        assert_eq!(ast_type_for_backend_type(backend_type), Some(type_));
    }
}

#[test]
fn test_translate_composite_types() {
    let context = Context::create();

    let array = translate_type(&context, &Type::Array(Box::new(Type::Byte))).unwrap();
    let element = array.into_pointer_type().get_element_type();
    assert!(element.is_struct_type());
    assert_eq!(element.into_struct_type().count_fields(), 2);
    assert!(element.into_struct_type().is_packed());

    let function = translate_type(
        &context,
        &Type::Function(Signature::new(vec![Type::Int], Type::Bool)),
    )
    .unwrap();
    assert!(function
        .into_pointer_type()
        .get_element_type()
        .is_function_type());
}

#[test]
fn test_translate_untranslatable_types() {
    let context = Context::create();

    assert_eq!(
        translate_type(&context, &Type::Unknown),
        Err(ErrorImpl::TypeTranslationFailed {
            type_: String::from("?")
        })
    );
    assert_eq!(
        translate_type(&context, &Type::Named(String::from("Point"))),
        Err(ErrorImpl::TypeTranslationFailed {
            type_: String::from("Point")
        })
    );
    assert!(translate_type(&context, &Type::Array(Box::new(Type::Unknown))).is_err());
}

#[test]
fn test_translate_signature_unknown_result_is_void() {
    let context = Context::create();

    let function_type =
        translate_signature(&context, &Signature::new(vec![Type::Int], Type::Unknown)).unwrap();
    assert_eq!(function_type.get_return_type(), None);
    assert_eq!(function_type.count_param_types(), 1);

    let function_type =
        translate_signature(&context, &Signature::new(vec![], Type::Float)).unwrap();
    assert_eq!(
        function_type.get_return_type(),
        Some(context.f64_type().as_basic_type_enum())
    );
}

#[test]
fn test_function_type_for_value() {
    let context = Context::create();
    let module = context.create_module("test");
    let fn_type = context.i64_type().fn_type(&[], false);
    let function = module.add_function("f", fn_type, None);

    assert_eq!(
        function_type_for_value(AnyValueEnum::FunctionValue(function)),
        Some(fn_type)
    );

    let pointer = fn_type.ptr_type(AddressSpace::default()).const_null();
    assert_eq!(
        function_type_for_value(AnyValueEnum::PointerValue(pointer)),
        Some(fn_type)
    );

    let int_pointer = context
        .i64_type()
        .ptr_type(AddressSpace::default())
        .const_null();
    assert_eq!(function_type_for_value(AnyValueEnum::PointerValue(int_pointer)), None);
    assert_eq!(
        function_type_for_value(AnyValueEnum::IntValue(context.i64_type().const_zero())),
        None
    );
}

#[test]
fn test_type_name() {
    let context = Context::create();

    assert_eq!(type_name(context.void_type().as_any_type_enum()), "void");
    assert_eq!(type_name(context.i64_type().as_any_type_enum()), "integer");
    assert_eq!(type_name(context.f64_type().as_any_type_enum()), "double");
    assert_eq!(type_name(context.f32_type().as_any_type_enum()), "float");
    assert_eq!(
        type_name(
            context
                .i8_type()
                .ptr_type(AddressSpace::default())
                .as_any_type_enum()
        ),
        "pointer"
    );
}

#[test]
fn test_private_constant_global() {
    let context = Context::create();
    let arena = FunctionArena::new();
    let compiler = Compiler::new(&arena, &context, "test", CompilerOptions::default());

    let value = context.i64_type().const_int(7, false).as_basic_value_enum();
    let first = compiler.create_private_constant_global(value, "seven");
    let second = compiler.create_private_constant_global(value, "seven");

    assert_eq!(first.get_linkage(), Linkage::Private);
    assert!(first.is_constant());
    assert_eq!(first.get_name().to_str().unwrap(), "seven");
    assert_eq!(second.get_name().to_str().unwrap(), "seven__1");
}

#[test]
fn test_create_array() {
    let context = Context::create();
    let arena = FunctionArena::new();
    let compiler = Compiler::new(&arena, &context, "test", CompilerOptions::default());

    let bytes = context.i8_type().const_array(&[
        context.i8_type().const_int(1, false),
        context.i8_type().const_int(2, false),
    ]);
    let global = compiler.create_array(bytes, "bytes");

    let initializer = global.get_initializer().unwrap().into_struct_value();
    assert!(initializer.get_type().is_packed());
    assert_eq!(initializer.get_type().count_fields(), 2);
}

#[test]
fn test_int_literal_widths() {
    let context = Context::create();
    let arena = FunctionArena::new();
    let compiler = Compiler::new(&arena, &context, "test", CompilerOptions::default());

    let value = gen_int_literal(&compiler, &literal("42", Radix::Decimal), None).unwrap();
    assert_eq!(value.into_int_value().get_type().get_bit_width(), 64);
    assert_eq!(value.into_int_value().get_zero_extended_constant(), Some(42));

    let value = gen_int_literal(&compiler, &literal("ff", Radix::Hexadecimal), Some(8)).unwrap();
    assert_eq!(value.into_int_value().get_type().get_bit_width(), 8);
    assert_eq!(value.into_int_value().get_zero_extended_constant(), Some(255));

    let value = gen_int_literal(&compiler, &literal("101", Radix::Binary), Some(32)).unwrap();
    assert_eq!(value.into_int_value().get_zero_extended_constant(), Some(5));
}

#[test]
fn test_int_literal_configured_width() {
    let context = Context::create();
    let arena = FunctionArena::new();
    let options = CompilerOptions {
        integer_width: 16,
        ..CompilerOptions::default()
    };
    let compiler = Compiler::new(&arena, &context, "test", options);

    let value = gen_int_literal(&compiler, &literal("17", Radix::Octal), None).unwrap();
    assert_eq!(value.into_int_value().get_type().get_bit_width(), 16);
    assert_eq!(value.into_int_value().get_zero_extended_constant(), Some(15));
}

#[test]
fn test_int_literal_invalid_digits() {
    let context = Context::create();
    let arena = FunctionArena::new();
    let compiler = Compiler::new(&arena, &context, "test", CompilerOptions::default());

    let error = gen_int_literal(&compiler, &literal("zz", Radix::Decimal), None).unwrap_err();
    assert_eq!(error.get_error_name(), "BackendRejected");
}

#[test]
fn test_int_literal_too_wide() {
    let context = Context::create();
    let arena = FunctionArena::new();
    let compiler = Compiler::new(&arena, &context, "test", CompilerOptions::default());

    let error = gen_int_literal(
        &compiler,
        &literal("99999999999999999999999", Radix::Decimal),
        None,
    )
    .unwrap_err();
    assert_eq!(error.get_error_name(), "BackendRejected");

    let error = gen_int_literal(&compiler, &literal("256", Radix::Decimal), Some(8)).unwrap_err();
    assert_eq!(error.get_error_name(), "BackendRejected");

    let error =
        gen_int_literal(&compiler, &literal("1ff", Radix::Hexadecimal), Some(8)).unwrap_err();
    assert_eq!(error.get_error_name(), "BackendRejected");

    let value = gen_int_literal(&compiler, &literal("255", Radix::Decimal), Some(8)).unwrap();
    assert_eq!(value.into_int_value().get_zero_extended_constant(), Some(255));

    let value = gen_int_literal(
        &compiler,
        &literal("18446744073709551615", Radix::Decimal),
        None,
    )
    .unwrap();
    assert_eq!(
        value.into_int_value().get_zero_extended_constant(),
        Some(u64::MAX)
    );
}

#[test]
fn test_empty_block() {
    let context = Context::create();
    let arena = FunctionArena::new();
    let mut compiler = Compiler::new(&arena, &context, "test", CompilerOptions::default());

    let block = Block::new(vec![], Span::null());
    let error = gen_block(&mut compiler, &block).unwrap_err();
    assert_eq!(error.get_kind(), &ErrorImpl::EmptyBlock);
}

#[test]
fn test_block_stops_at_first_error() {
    let context = Context::create();
    let arena = FunctionArena::new();
    let mut compiler = Compiler::new(&arena, &context, "test", CompilerOptions::default());

    let block = Block::new(
        vec![
            Expr::Call(Call::new("missing", vec![], Span::null())),
            Expr::Block(Block::new(vec![], Span::null())),
        ],
        Span::null(),
    );

    let error = gen_block(&mut compiler, &block).unwrap_err();
    assert_eq!(
        error.get_kind(),
        &ErrorImpl::UnresolvedSymbol {
            symbol: String::from("missing"),
            arguments: 0
        }
    );
    assert!(compiler.scopes.is_empty());
}

#[test]
fn test_block_value_is_last_expression() {
    let context = Context::create();
    let arena = FunctionArena::new();
    let mut compiler = Compiler::new(&arena, &context, "test", CompilerOptions::default());

    let block = Block::new(
        vec![
            Expr::IntLiteral(literal("1", Radix::Decimal)),
            Expr::IntLiteral(literal("2", Radix::Decimal)),
        ],
        Span::null(),
    );

    let value = gen_block(&mut compiler, &block).unwrap();
    assert_eq!(value.into_int_value().get_zero_extended_constant(), Some(2));
}

fn overloaded_scopes<'ctx>(
    context: &'ctx Context,
    module: &inkwell::module::Module<'ctx>,
) -> ScopeStack<'ctx> {
    let mut scopes = ScopeStack::new();
    let scope = scopes.push_scope(None);

    for parameter in [Type::Int, Type::Float] {
        let signature = Signature::new(vec![parameter], Type::Int);
        let function_type = translate_signature(context, &signature).unwrap();
        let value = module.add_function("f", function_type, None);
        scopes.register_callable(
            scope,
            "f",
            signature,
            function_type,
            AnyValueEnum::FunctionValue(value),
            None,
        );
    }

    scopes
}

#[test]
fn test_exact_types_selects_matching_overload() {
    let context = Context::create();
    let module = context.create_module("test");
    let scopes = overloaded_scopes(&context, &module);
    let candidates = scopes.resolve_callable("f");

    let arguments: Vec<BasicValueEnum> = vec![context.f64_type().const_float(1.5).into()];
    match select_overload(&context, &ExactTypes, &scopes, &candidates, &arguments) {
        Selection::Selected(target) => {
            assert_eq!(target.signature.parameters, vec![Type::Float])
        }
        other => panic!("expected a selection, got {:?}", other),
    }

    let arguments: Vec<BasicValueEnum> = vec![context.bool_type().const_zero().into()];
    assert_eq!(
        select_overload(&context, &ExactTypes, &scopes, &candidates, &arguments),
        Selection::NoMatch
    );
}

#[test]
fn test_arity_only_is_ambiguous() {
    let context = Context::create();
    let module = context.create_module("test");
    let scopes = overloaded_scopes(&context, &module);
    let candidates = scopes.resolve_callable("f");

    let arguments: Vec<BasicValueEnum> = vec![context.i64_type().const_zero().into()];
    assert_eq!(
        select_overload(&context, &ArityOnly, &scopes, &candidates, &arguments),
        Selection::Ambiguous(2)
    );
    assert_eq!(
        select_overload(&context, &ArityOnly, &scopes, &candidates, &[]),
        Selection::NoMatch
    );
}

#[test]
fn test_inner_overload_wins_tie() {
    let context = Context::create();
    let module = context.create_module("test");
    let mut scopes = overloaded_scopes(&context, &module);

    let inner = scopes.push_scope(None);
    let signature = Signature::new(vec![Type::Int], Type::Int);
    let function_type = translate_signature(&context, &signature).unwrap();
    let value = module.add_function("f", function_type, None);
    assert!(scopes.register_callable(
        inner,
        "f",
        signature,
        function_type,
        AnyValueEnum::FunctionValue(value),
        None,
    ));

    let candidates = scopes.resolve_callable("f");
    let arguments: Vec<BasicValueEnum> = vec![context.i64_type().const_zero().into()];
    match select_overload(&context, &ExactTypes, &scopes, &candidates, &arguments) {
        Selection::Selected(target) => assert_eq!(target.owning_scope, inner),
        other => panic!("expected a selection, got {:?}", other),
    }
}
