use inkwell::{
    module::Linkage,
    types::{AnyType, FunctionType},
    values::{AnyValue, AnyValueEnum, BasicValueEnum, FunctionValue},
};
use tracing::{debug, instrument};

use crate::{
    ast::{
        ast::{Expr, FunctionId},
        expressions::Call,
        statements::{Block, ExternalFunction, Function},
        types::{Signature, Type},
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    compiler::Compiler,
    expr::gen_block,
    overload::{declared_result, select_overload, Selection},
    scope::{FunctionSymbolTarget, ScopeId},
    types::{ast_type_for_backend_type, translate_signature, translate_type, type_name},
};

/// Generates the module entry point from `root`.
///
/// The entry function always returns a 64-bit integer: the body's value if
/// it has that type, `0` otherwise.
pub fn gen_entry_function<'a, 'ctx>(
    compiler: &mut Compiler<'a, 'ctx>,
    root: FunctionId,
) -> Result<FunctionValue<'ctx>, Error> {
    gen_function_with(compiler, root, true)
}

/// Generates a nested function definition and registers it in the current
/// scope.
pub fn gen_function<'a, 'ctx>(
    compiler: &mut Compiler<'a, 'ctx>,
    id: FunctionId,
) -> Result<FunctionValue<'ctx>, Error> {
    gen_function_with(compiler, id, false)
}

#[instrument(skip(compiler), level = "trace")]
fn gen_function_with<'a, 'ctx>(
    compiler: &mut Compiler<'a, 'ctx>,
    id: FunctionId,
    is_entry: bool,
) -> Result<FunctionValue<'ctx>, Error> {
    let function = compiler.function(id, &Position::null())?;
    let position = function.span.start.clone();

    if function.function_type.result_type_is_unknown() {
        let mut locals = parameter_locals(function);
        if let Some(inferred) = infer_block_type(compiler, &function.body, &mut locals) {
            function
                .function_type
                .result
                .resolve(inferred)
                .map_err(|e| compiler.error(e, position.clone()))?;
        }
    }

    let signature = function.function_type.signature();
    let (name, function_type, linkage) = if is_entry {
        let entry_signature = Signature::new(signature.parameters.clone(), Type::Int);
        let entry_type = translate_signature(compiler.context, &entry_signature)
            .map_err(|e| compiler.error(e, position.clone()))?;
        (compiler.options.entry_name.clone(), entry_type, Linkage::External)
    } else {
        let function_type = translate_signature(compiler.context, &signature)
            .map_err(|e| compiler.error(e, position.clone()))?;
        (
            compiler.unique_symbol_name(&function.name),
            function_type,
            Linkage::Internal,
        )
    };

    let value = compiler
        .module
        .add_function(&name, function_type, Some(linkage));

    // Registered before the body so the body and later siblings can call it
    if !is_entry {
        if let Some(scope) = compiler.scopes.current().map(|scope| scope.id()) {
            register(
                compiler,
                scope,
                &function.name,
                signature.clone(),
                function_type,
                AnyValueEnum::FunctionValue(value),
                Some(id),
                &position,
            )?;
        }
    }

    let previous_position = compiler.builder.get_insert_block();
    let entry = compiler.context.append_basic_block(value, "entry");
    compiler.builder.position_at_end(entry);

    let scope = compiler.scopes.push_scope(Some(entry));
    let body_value = bind_parameters(compiler, scope, function, value)
        .and_then(|()| gen_block(compiler, &function.body));
    compiler.scopes.pop_expected(scope);
    let body_value = body_value?;

    if is_entry {
        build_entry_return(compiler, body_value, &position)?;
    } else {
        build_return(compiler, function, &signature, function_type, body_value)?;
    }

    if let Some(block) = previous_position {
        compiler.builder.position_at_end(block);
    } else {
        compiler.builder.clear_insertion_position();
    }

    debug!(function = %function.name, symbol = %name, %signature, "generated function");
    Ok(value)
}

#[allow(clippy::too_many_arguments)]
fn register<'a, 'ctx>(
    compiler: &mut Compiler<'a, 'ctx>,
    scope: ScopeId,
    name: &str,
    signature: Signature,
    function_type: FunctionType<'ctx>,
    value: AnyValueEnum<'ctx>,
    definition: Option<FunctionId>,
    position: &Position,
) -> Result<(), Error> {
    if compiler
        .scopes
        .register_callable(scope, name, signature, function_type, value, definition)
    {
        Ok(())
    } else {
        Err(compiler.error(
            ErrorImpl::DuplicateSignature {
                function: name.to_string(),
            },
            position.clone(),
        ))
    }
}

/// Spills each parameter to a stack slot and binds its name in `scope`.
///
/// Parameters of function type are also callable by name.
fn bind_parameters<'a, 'ctx>(
    compiler: &mut Compiler<'a, 'ctx>,
    scope: ScopeId,
    function: &'a Function,
    value: FunctionValue<'ctx>,
) -> Result<(), Error> {
    let position = function.span.start.clone();

    for (i, parameter) in function.function_type.parameters.iter().enumerate() {
        let argument = value.get_nth_param(i as u32).ok_or_else(|| {
            compiler.backend_error(format!("missing parameter {}", parameter.name), &position)
        })?;

        let slot = compiler
            .builder
            .build_alloca(argument.get_type(), &parameter.name)
            .map_err(|e| compiler.backend_error(e, &position))?;
        compiler
            .builder
            .build_store(slot, argument)
            .map_err(|e| compiler.backend_error(e, &position))?;
        compiler
            .scopes
            .bind_value(scope, &parameter.name, slot, parameter.type_.clone());

        if let Type::Function(signature) = &parameter.type_ {
            let function_type = translate_signature(compiler.context, signature)
                .map_err(|e| compiler.error(e, position.clone()))?;
            register(
                compiler,
                scope,
                &parameter.name,
                signature.clone(),
                function_type,
                argument.as_any_value_enum(),
                None,
                &position,
            )?;
        }
    }

    Ok(())
}

fn build_entry_return<'a, 'ctx>(
    compiler: &Compiler<'a, 'ctx>,
    body_value: BasicValueEnum<'ctx>,
    position: &Position,
) -> Result<(), Error> {
    let i64_type = compiler.context.i64_type();

    let result = if body_value.get_type() == i64_type.into() {
        compiler.builder.build_return(Some(&body_value))
    } else {
        compiler.builder.build_return(Some(&i64_type.const_zero()))
    };

    result
        .map(|_| ())
        .map_err(|e| compiler.backend_error(e, position))
}

fn build_return<'a, 'ctx>(
    compiler: &Compiler<'a, 'ctx>,
    function: &'a Function,
    signature: &Signature,
    function_type: FunctionType<'ctx>,
    body_value: BasicValueEnum<'ctx>,
) -> Result<(), Error> {
    let position = function.span.start.clone();

    let result = match function_type.get_return_type() {
        None => compiler.builder.build_return(None),
        Some(expected) if expected == body_value.get_type() => {
            compiler.builder.build_return(Some(&body_value))
        }
        Some(_) => {
            let received = ast_type_for_backend_type(body_value.get_type())
                .map(|type_| type_.to_string())
                .unwrap_or_else(|| {
                    type_name(body_value.get_type().as_any_type_enum()).to_string()
                });
            return Err(compiler.error(
                ErrorImpl::ResultTypeMismatch {
                    function: function.name.clone(),
                    expected: signature.result.to_string(),
                    received,
                },
                position,
            ));
        }
    };

    result
        .map(|_| ())
        .map_err(|e| compiler.backend_error(e, &position))
}

/// Declares a function defined outside the module and registers it in the
/// current scope.
///
/// An unknown result type is declared as `void`.
#[instrument(skip_all, fields(name = %external.name), level = "trace")]
pub fn gen_external_function<'a, 'ctx>(
    compiler: &mut Compiler<'a, 'ctx>,
    external: &'a ExternalFunction,
) -> Result<FunctionValue<'ctx>, Error> {
    let position = external.span.start.clone();
    let signature = external.function_type.signature();
    let function_type = translate_signature(compiler.context, &signature)
        .map_err(|e| compiler.error(e, position.clone()))?;

    let value = match compiler.module.get_function(&external.name) {
        // Only an earlier external declaration of the same type can be shared
        Some(existing)
            if existing.get_type() == function_type
                && existing.get_linkage() == Linkage::External
                && existing.count_basic_blocks() == 0 =>
        {
            existing
        }
        Some(_) => {
            return Err(compiler.backend_error(
                format!("conflicting declarations of {}", external.name),
                &position,
            ))
        }
        None => compiler
            .module
            .add_function(&external.name, function_type, Some(Linkage::External)),
    };

    if let Some(scope) = compiler.scopes.current().map(|scope| scope.id()) {
        register(
            compiler,
            scope,
            &external.name,
            signature,
            function_type,
            AnyValueEnum::FunctionValue(value),
            None,
            &position,
        )?;
    }

    Ok(value)
}

/// Names visible to the expressions being inferred that are not in a scope
/// yet: parameters and earlier sibling declarations, innermost last.
type InferenceLocals = Vec<(String, Type)>;

fn parameter_locals(function: &Function) -> InferenceLocals {
    function
        .function_type
        .parameters
        .iter()
        .map(|parameter| (parameter.name.clone(), parameter.type_.clone()))
        .collect()
}

/// Type of a block's value, worked out without generating anything.
pub fn infer_block_type<'a, 'ctx>(
    compiler: &Compiler<'a, 'ctx>,
    block: &'a Block,
    locals: &mut InferenceLocals,
) -> Option<Type> {
    let mark = locals.len();
    let mut last = None;

    for expression in &block.expressions {
        last = infer_type(compiler, expression, locals);

        if let (Some(type_ @ Type::Function(_)), Some(name)) =
            (last.clone(), declared_name(compiler, expression))
        {
            locals.push((name, type_));
        }
    }

    locals.truncate(mark);
    last.filter(|type_| !type_.is_unknown())
}

fn declared_name<'a, 'ctx>(compiler: &Compiler<'a, 'ctx>, expression: &'a Expr) -> Option<String> {
    match expression {
        Expr::Function(id) => compiler.arena.get(*id).map(|function| function.name.clone()),
        Expr::ExternalFunction(external) => Some(external.name.clone()),
        _ => None,
    }
}

/// Type an expression will have once generated, if it can be told yet.
pub fn infer_type<'a, 'ctx>(
    compiler: &Compiler<'a, 'ctx>,
    expression: &'a Expr,
    locals: &mut InferenceLocals,
) -> Option<Type> {
    let arena = compiler.arena;

    let type_ = match expression {
        Expr::IntLiteral(_) | Expr::FloatLiteral(_) | Expr::BoolLiteral(_) => {
            expression.result_type(arena)
        }
        Expr::Block(block) => infer_block_type(compiler, block, locals)?,
        Expr::Function(id) => {
            let function = arena.get(*id)?;
            let mut signature = function.function_type.signature();
            if signature.result.is_unknown() {
                let mark = locals.len();
                locals.extend(parameter_locals(function));
                let result = infer_block_type(compiler, &function.body, locals);
                locals.truncate(mark);

                if let Some(result) = result {
                    signature.result = Box::new(result);
                }
            }
            Type::Function(signature)
        }
        Expr::ExternalFunction(_) | Expr::FunctionType(_) => expression.result_type(arena),
        Expr::Call(call) => {
            let known = call.result_type(arena);
            if !known.is_unknown() {
                return Some(known);
            }
            infer_call_type(compiler, call, locals)?
        }
        Expr::Symbol(symbol) => {
            if let Some((_, type_)) = locals.iter().rev().find(|(name, _)| *name == symbol.name) {
                type_.clone()
            } else if let Some(target) = compiler.scopes.lookup_value(&symbol.name) {
                target.type_.clone()
            } else {
                match compiler.scopes.resolve_callable(&symbol.name).as_slice() {
                    [only] => Type::Function(only.signature.clone()),
                    _ => return None,
                }
            }
        }
    };

    Some(type_).filter(|type_| !type_.is_unknown())
}

/// Result type of the overload a call will select, if it can be told before
/// the arguments are generated.
///
/// Argument types are inferred and run through the overload policy with
/// placeholder values. When an argument type is not known yet, every
/// candidate of the right arity must agree on the result.
fn infer_call_type<'a, 'ctx>(
    compiler: &Compiler<'a, 'ctx>,
    call: &'a Call,
    locals: &mut InferenceLocals,
) -> Option<Type> {
    let arity = call.arguments.len();

    let mut argument_types = Vec::with_capacity(arity);
    for argument in &call.arguments {
        argument_types.push(infer_type(compiler, argument, locals));
    }
    let placeholders = argument_types
        .into_iter()
        .map(|type_| {
            type_
                .and_then(|type_| translate_type(compiler.context, &type_).ok())
                .map(|backend_type| backend_type.const_zero())
        })
        .collect::<Option<Vec<BasicValueEnum<'ctx>>>>();

    let accepts = |signature: &Signature| match &placeholders {
        Some(arguments) => signature
            .parameters
            .iter()
            .map(|parameter| translate_type(compiler.context, parameter))
            .collect::<Result<Vec<_>, _>>()
            .map(|parameters| compiler.policy.rank(&parameters, arguments).is_some())
            .unwrap_or(false),
        None => signature.arity() == arity,
    };

    // Earlier siblings are not registered yet and sit closer than any scope
    let local_results = locals
        .iter()
        .filter_map(|(name, type_)| match type_ {
            Type::Function(signature) if *name == call.callee_name => Some(signature),
            _ => None,
        })
        .filter(|signature| accepts(*signature))
        .map(|signature| Some((*signature.result).clone()))
        .collect::<Vec<_>>();
    if !local_results.is_empty() {
        return agreed_result(local_results);
    }

    let candidates = compiler.scopes.resolve_callable(&call.callee_name);
    let live_result = |candidate: &FunctionSymbolTarget<'ctx>| {
        candidate
            .definition
            .and_then(|id| compiler.arena.get(id))
            .map(|function| function.function_type.result_type())
            .filter(|type_| !type_.is_unknown())
            .or_else(|| declared_result(candidate))
    };

    match &placeholders {
        Some(arguments) => match select_overload(
            compiler.context,
            compiler.policy.as_ref(),
            &compiler.scopes,
            &candidates,
            arguments,
        ) {
            Selection::Selected(target) => live_result(&target),
            Selection::NoMatch | Selection::Ambiguous(_) => None,
        },
        None => agreed_result(
            candidates
                .iter()
                .filter(|candidate| accepts(&candidate.signature))
                .map(live_result)
                .collect(),
        ),
    }
}

/// The common result of several possible targets, or `None` if any is
/// unknown or two differ.
fn agreed_result(results: Vec<Option<Type>>) -> Option<Type> {
    let mut agreed: Option<Type> = None;

    for result in results {
        let result = result.filter(|type_| !type_.is_unknown())?;
        match &agreed {
            Some(type_) if *type_ != result => return None,
            Some(_) => {}
            None => agreed = Some(result),
        }
    }

    agreed
}
