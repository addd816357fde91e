use inkwell::{
    types::StringRadix,
    values::{AnyValueEnum, BasicMetadataValueEnum, BasicValue, BasicValueEnum, CallableValue},
    AddressSpace,
};
use std::num::IntErrorKind;

use tracing::{instrument, trace};

use crate::{
    ast::{
        ast::Expr,
        expressions::{Call, FloatLiteral, IntLiteral, Radix, Symbol},
        statements::Block,
        types::{FunctionType, Type},
    },
    errors::errors::{Error, ErrorImpl},
};

use super::{
    compiler::Compiler,
    overload::{declared_result, select_overload, Selection},
    stmt::{gen_external_function, gen_function},
    types::{ast_type_for_backend_type, function_type_for_value, translate_signature, type_name},
};

/// Generates LLVM IR for the given expression.
///
/// Generation is fail-fast: the first error is returned and nothing after it
/// is generated.
pub fn gen_expression<'a, 'ctx>(
    compiler: &mut Compiler<'a, 'ctx>,
    expression: &'a Expr,
) -> Result<BasicValueEnum<'ctx>, Error> {
    match expression {
        Expr::IntLiteral(literal) => gen_int_literal(compiler, literal, None),
        Expr::FloatLiteral(literal) => gen_float_literal(compiler, literal),
        Expr::BoolLiteral(literal) => Ok(compiler
            .context
            .bool_type()
            .const_int(u64::from(literal.value), false)
            .into()),
        Expr::Block(block) => {
            let scope = compiler
                .scopes
                .push_scope(compiler.builder.get_insert_block());
            let value = gen_block(compiler, block);
            compiler.scopes.pop_expected(scope);
            value
        }
        Expr::Call(call) => gen_call(compiler, call),
        Expr::Function(id) => Ok(gen_function(compiler, *id)?
            .as_global_value()
            .as_pointer_value()
            .into()),
        Expr::ExternalFunction(external) => Ok(gen_external_function(compiler, external)?
            .as_global_value()
            .as_pointer_value()
            .into()),
        Expr::FunctionType(function_type) => gen_function_type(compiler, function_type),
        Expr::Symbol(symbol) => gen_symbol(compiler, symbol),
    }
}

/// Generates each expression of `block` in order and returns the last value.
///
/// Does not push a scope; the caller decides which scope the block runs in.
pub fn gen_block<'a, 'ctx>(
    compiler: &mut Compiler<'a, 'ctx>,
    block: &'a Block,
) -> Result<BasicValueEnum<'ctx>, Error> {
    let mut last = None;

    for expression in &block.expressions {
        last = Some(gen_expression(compiler, expression)?);
    }

    last.ok_or_else(|| compiler.error(ErrorImpl::EmptyBlock, block.span.start.clone()))
}

/// Materializes an integer literal at `fixed_width` bits, or at the
/// configured integer width.
pub fn gen_int_literal<'a, 'ctx>(
    compiler: &Compiler<'a, 'ctx>,
    literal: &IntLiteral,
    fixed_width: Option<u32>,
) -> Result<BasicValueEnum<'ctx>, Error> {
    let width = fixed_width.unwrap_or(compiler.options.integer_width);
    if !fits_in_width(literal, width) {
        return Err(compiler.backend_error(
            format!("integer {} does not fit in {} bits", literal.text, width),
            &literal.span.start,
        ));
    }

    let radix = match literal.radix {
        Radix::Binary => StringRadix::Binary,
        Radix::Octal => StringRadix::Octal,
        Radix::Decimal => StringRadix::Decimal,
        Radix::Hexadecimal => StringRadix::Hexadecimal,
    };

    compiler
        .context
        .custom_width_int_type(width)
        .const_int_from_string(&literal.text, radix)
        .map(|value| value.as_basic_value_enum())
        .ok_or_else(|| {
            compiler.backend_error(
                format!("invalid base {} integer {:?}", literal.radix.base(), literal.text),
                &literal.span.start,
            )
        })
}

/// Whether the literal's magnitude can be represented in `width` bits.
///
/// Malformed digits pass here and are rejected when the constant is built.
fn fits_in_width(literal: &IntLiteral, width: u32) -> bool {
    let digits = literal
        .text
        .strip_prefix('-')
        .or_else(|| literal.text.strip_prefix('+'))
        .unwrap_or(&literal.text);

    match u128::from_str_radix(digits, literal.radix.base()) {
        Ok(value) => width >= 128 || value >> width == 0,
        Err(e) => width > 128 || *e.kind() != IntErrorKind::PosOverflow,
    }
}

fn gen_float_literal<'a, 'ctx>(
    compiler: &Compiler<'a, 'ctx>,
    literal: &FloatLiteral,
) -> Result<BasicValueEnum<'ctx>, Error> {
    let value = literal.text.parse::<f64>().map_err(|e| {
        compiler.backend_error(
            format!("invalid float {:?}: {}", literal.text, e),
            &literal.span.start,
        )
    })?;

    Ok(compiler.context.f64_type().const_float(value).into())
}

/// A function type used as a value is the null pointer of that type.
fn gen_function_type<'a, 'ctx>(
    compiler: &Compiler<'a, 'ctx>,
    function_type: &FunctionType,
) -> Result<BasicValueEnum<'ctx>, Error> {
    let backend_type = translate_signature(compiler.context, &function_type.signature())
        .map_err(|e| compiler.error(e, function_type.span.start.clone()))?;

    Ok(backend_type
        .ptr_type(AddressSpace::default())
        .const_null()
        .into())
}

#[instrument(skip_all, fields(callee = %call.callee_name), level = "trace")]
fn gen_call<'a, 'ctx>(
    compiler: &mut Compiler<'a, 'ctx>,
    call: &'a Call,
) -> Result<BasicValueEnum<'ctx>, Error> {
    let position = call.span.start.clone();
    let unresolved = || ErrorImpl::UnresolvedSymbol {
        symbol: call.callee_name.clone(),
        arguments: call.arguments.len(),
    };

    let candidates = compiler.scopes.resolve_callable(&call.callee_name);
    if candidates.is_empty() {
        trace!(scopes = %compiler.scopes.dump(), "no callable named {}", call.callee_name);
        return Err(compiler.error(unresolved(), position));
    }

    let mut arguments = Vec::with_capacity(call.arguments.len());
    for argument in &call.arguments {
        arguments.push(gen_expression(compiler, argument)?);
    }

    let target = match select_overload(
        compiler.context,
        compiler.policy.as_ref(),
        &compiler.scopes,
        &candidates,
        &arguments,
    ) {
        Selection::Selected(target) => target,
        Selection::NoMatch => {
            trace!(scopes = %compiler.scopes.dump(), "no overload of {} accepts the arguments", call.callee_name);
            return Err(compiler.error(unresolved(), position));
        }
        Selection::Ambiguous(candidates) => {
            return Err(compiler.error(
                ErrorImpl::AmbiguousOverload {
                    symbol: call.callee_name.clone(),
                    candidates,
                },
                position,
            ))
        }
    };

    let not_callable = |value: AnyValueEnum<'ctx>| ErrorImpl::NotCallable {
        symbol: call.callee_name.clone(),
        type_name: type_name(value.get_type()).to_string(),
    };
    if function_type_for_value(target.value).is_none() {
        return Err(compiler.error(not_callable(target.value), position));
    }

    if let Some(definition) = target.definition {
        call.bind_callee(compiler.arena, definition)
            .map_err(|e| compiler.error(e, position.clone()))?;
    }

    let args = arguments
        .iter()
        .map(|argument| BasicMetadataValueEnum::from(*argument))
        .collect::<Vec<_>>();

    // Typed pointers: a pointer to a function type is directly callable
    let callable = match target.value {
        AnyValueEnum::FunctionValue(function) => CallableValue::from(function),
        AnyValueEnum::PointerValue(pointer) => CallableValue::try_from(pointer)
            .map_err(|()| compiler.error(not_callable(target.value), position.clone()))?,
        other => return Err(compiler.error(not_callable(other), position)),
    };

    let call_site = compiler
        .builder
        .build_call(callable, &args, "")
        .map_err(|e| compiler.backend_error(e, &position))?;

    let returned = call_site.try_as_basic_value().left();

    if call.result_type(compiler.arena).is_unknown() {
        let inferred = declared_result(&target)
            .or_else(|| returned.and_then(|value| ast_type_for_backend_type(value.get_type())));
        if let Some(type_) = inferred {
            call.set_result_type(compiler.arena, type_)
                .map_err(|e| compiler.error(e, position.clone()))?;
        }
    }

    // Calls to void functions still produce a value
    Ok(returned.unwrap_or_else(|| compiler.context.i64_type().const_zero().into()))
}

fn gen_symbol<'a, 'ctx>(
    compiler: &mut Compiler<'a, 'ctx>,
    symbol: &'a Symbol,
) -> Result<BasicValueEnum<'ctx>, Error> {
    let position = symbol.span.start.clone();

    if let Some(target) = compiler.scopes.lookup_value(&symbol.name).cloned() {
        let value = compiler
            .builder
            .build_load(target.slot, &symbol.name)
            .map_err(|e| compiler.backend_error(e, &position))?;
        resolve_symbol_type(compiler, symbol, target.type_)?;
        return Ok(value);
    }

    let candidates = compiler.scopes.resolve_callable(&symbol.name);
    let target = match candidates.as_slice() {
        [only] => only.clone(),
        [] => {
            trace!(scopes = %compiler.scopes.dump(), "no symbol named {}", symbol.name);
            return Err(compiler.error(
                ErrorImpl::UnresolvedSymbol {
                    symbol: symbol.name.clone(),
                    arguments: 0,
                },
                position,
            ));
        }
        many => {
            return Err(compiler.error(
                ErrorImpl::AmbiguousOverload {
                    symbol: symbol.name.clone(),
                    candidates: many.len(),
                },
                position,
            ))
        }
    };

    let value: BasicValueEnum<'ctx> = match target.value {
        AnyValueEnum::FunctionValue(function) => {
            function.as_global_value().as_pointer_value().into()
        }
        AnyValueEnum::PointerValue(pointer) => pointer.into(),
        other => {
            return Err(compiler.error(
                ErrorImpl::NotCallable {
                    symbol: symbol.name.clone(),
                    type_name: type_name(other.get_type()).to_string(),
                },
                position,
            ))
        }
    };

    resolve_symbol_type(compiler, symbol, Type::Function(target.signature))?;
    Ok(value)
}

fn resolve_symbol_type<'a, 'ctx>(
    compiler: &Compiler<'a, 'ctx>,
    symbol: &Symbol,
    type_: Type,
) -> Result<(), Error> {
    if symbol.result_type.is_unknown() && !type_.is_unknown() {
        symbol
            .result_type
            .resolve(type_)
            .map_err(|e| compiler.error(e, symbol.span.start.clone()))?;
    }

    Ok(())
}
