//! Mapping between AST types and LLVM types.
//!
//! Also holds the small type-introspection helpers the generator needs:
//! deciding whether a value can be the target of a call, naming a type
//! for diagnostics, and mangling source names into module symbols.

use inkwell::{
    context::Context,
    types::{AnyTypeEnum, BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType},
    values::AnyValueEnum,
    AddressSpace,
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::{
    ast::types::{Signature, Type},
    errors::errors::ErrorImpl,
};

lazy_static! {
    static ref UNMANGLED_CHARACTER: Regex = Regex::new("[^A-Za-z0-9_.]").unwrap();
}

/// Converts an AST type to an LLVM basic type.
///
/// `Unknown` and `Named` types have no representation and fail.
pub fn translate_type<'ctx>(
    context: &'ctx Context,
    type_: &Type,
) -> Result<BasicTypeEnum<'ctx>, ErrorImpl> {
    match type_ {
        Type::Int => Ok(context.i64_type().into()),
        Type::Float => Ok(context.f64_type().into()),
        Type::Bool => Ok(context.bool_type().into()),
        Type::Byte => Ok(context.i8_type().into()),
        Type::Char => Ok(context.i32_type().into()),
        // <{ i64 length, [0 x T] }>*
        Type::Array(element) => {
            let element = translate_type(context, element)?;
            Ok(context
                .struct_type(
                    &[context.i64_type().into(), element.array_type(0).into()],
                    true,
                )
                .ptr_type(AddressSpace::default())
                .into())
        }
        Type::Function(signature) => Ok(translate_signature(context, signature)?
            .ptr_type(AddressSpace::default())
            .into()),
        Type::Unknown | Type::Named(_) => Err(ErrorImpl::TypeTranslationFailed {
            type_: type_.to_string(),
        }),
    }
}

/// Converts a signature to an LLVM function type.
///
/// An unknown result type becomes `void`.
pub fn translate_signature<'ctx>(
    context: &'ctx Context,
    signature: &Signature,
) -> Result<FunctionType<'ctx>, ErrorImpl> {
    let params = signature
        .parameters
        .iter()
        .map(|parameter| translate_type(context, parameter).map(BasicMetadataTypeEnum::from))
        .collect::<Result<Vec<BasicMetadataTypeEnum<'ctx>>, ErrorImpl>>()?;

    if signature.result.is_unknown() {
        Ok(context.void_type().fn_type(&params, false))
    } else {
        Ok(translate_type(context, &signature.result)?.fn_type(&params, false))
    }
}

/// Maps scalar LLVM types back to the AST type that produces them.
pub fn ast_type_for_backend_type(type_: BasicTypeEnum<'_>) -> Option<Type> {
    match type_ {
        BasicTypeEnum::IntType(int_type) => match int_type.get_bit_width() {
            1 => Some(Type::Bool),
            8 => Some(Type::Byte),
            32 => Some(Type::Char),
            64 => Some(Type::Int),
            _ => None,
        },
        BasicTypeEnum::FloatType(float_type) => {
            if float_type == float_type.get_context().f64_type() {
                Some(Type::Float)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Returns the callable type of `value` if it can be the target of a call:
/// a function, or a pointer whose element type is a function.
pub fn function_type_for_value<'ctx>(value: AnyValueEnum<'ctx>) -> Option<FunctionType<'ctx>> {
    match value {
        AnyValueEnum::FunctionValue(function) => Some(function.get_type()),
        _ => function_type_for_type(value.get_type()),
    }
}

fn function_type_for_type(type_: AnyTypeEnum<'_>) -> Option<FunctionType<'_>> {
    match type_ {
        AnyTypeEnum::FunctionType(function_type) => Some(function_type),
        AnyTypeEnum::PointerType(pointer_type) => match pointer_type.get_element_type() {
            AnyTypeEnum::FunctionType(function_type) => Some(function_type),
            _ => None,
        },
        _ => None,
    }
}

/// Short human-readable name of an LLVM type's kind.
pub fn type_name(type_: AnyTypeEnum<'_>) -> &'static str {
    #[allow(unreachable_patterns)]
    match type_ {
        AnyTypeEnum::VoidType(_) => "void",
        AnyTypeEnum::FloatType(float_type) => {
            let context = float_type.get_context();
            if float_type == context.f16_type() {
                "half"
            } else if float_type == context.f32_type() {
                "float"
            } else if float_type == context.f64_type() {
                "double"
            } else if float_type == context.x86_f80_type() {
                "fp80"
            } else if float_type == context.f128_type() {
                "fp128-m112"
            } else if float_type == context.ppc_f128_type() {
                "fp64x2"
            } else {
                "?"
            }
        }
        AnyTypeEnum::IntType(_) => "integer",
        AnyTypeEnum::FunctionType(_) => "function",
        AnyTypeEnum::StructType(_) => "struct",
        AnyTypeEnum::ArrayType(_) => "array",
        AnyTypeEnum::PointerType(_) => "pointer",
        AnyTypeEnum::VectorType(_) => "vector",
        _ => "?",
    }
}

/// Rewrites `name` into a symbol LLVM and the system linker accept.
///
/// Every character outside `[A-Za-z0-9_.]` becomes `$` plus the hex of each
/// of its UTF-8 bytes.
pub fn mangled_name(name: &str) -> String {
    UNMANGLED_CHARACTER
        .replace_all(name, |captures: &Captures| {
            captures[0]
                .bytes()
                .map(|byte| format!("${:02x}", byte))
                .collect::<String>()
        })
        .into_owned()
}
