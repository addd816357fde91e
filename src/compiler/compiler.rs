//! Main compiler module.
//!
//! This module contains the core Compiler structure and the module-level
//! entry point. It owns the LLVM module under construction, the scope stack
//! and the builder, and provides the helpers shared by expression and
//! function generation: type conversion, unique symbol names, constant
//! globals and error reporting.

use inkwell::{
    builder::Builder,
    context::Context,
    module::{Linkage, Module},
    targets::{InitializationConfig, Target, TargetMachine},
    types::BasicTypeEnum,
    values::{ArrayValue, BasicValue, BasicValueEnum, GlobalValue},
};
use tracing::{debug, instrument};

use crate::{
    ast::{
        ast::{FunctionArena, FunctionId},
        statements::Function,
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    overload::{ExactTypes, OverloadPolicy},
    scope::ScopeStack,
    stmt::gen_entry_function,
    types::{mangled_name, translate_type},
};

/// Settings for one module generation pass.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Bit width integer literals are materialized at
    pub integer_width: u32,
    /// Run the LLVM verifier on the finished module
    pub verify: bool,
    /// Stamp the module with the host triple and data layout
    pub host_target: bool,
    /// Symbol name of the entry function
    pub entry_name: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            integer_width: 64,
            verify: true,
            host_target: false,
            entry_name: String::from("main"),
        }
    }
}

/// The state of one module generation pass.
///
/// A compiler is created per module and is not shared between passes; the
/// LLVM context is borrowed from the caller.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the AST being compiled
/// * `'ctx` - Lifetime of the LLVM context
pub struct Compiler<'a, 'ctx> {
    /// Owner of every function definition in the AST
    pub arena: &'a FunctionArena,
    /// Lexical scopes currently entered
    pub scopes: ScopeStack<'ctx>,
    /// Options for this pass
    pub options: CompilerOptions,
    /// Policy used to pick among overloads
    pub policy: Box<dyn OverloadPolicy>,

    /// Reference to the LLVM context
    pub context: &'ctx Context,
    /// The LLVM module being built
    pub module: Module<'ctx>,
    /// The LLVM IR builder
    pub builder: Builder<'ctx>,
}

impl<'a, 'ctx> Compiler<'a, 'ctx> {
    /// Creates a new Compiler with an empty module named `module_name`.
    pub fn new(
        arena: &'a FunctionArena,
        context: &'ctx Context,
        module_name: &str,
        options: CompilerOptions,
    ) -> Self {
        Compiler {
            arena,
            scopes: ScopeStack::new(),
            options,
            policy: Box::new(ExactTypes),
            module: context.create_module(module_name),
            builder: context.create_builder(),
            context,
        }
    }

    /// Replaces the overload selection policy.
    pub fn with_policy(mut self, policy: Box<dyn OverloadPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Reports a failure. Every generator error goes through here.
    pub fn error(&self, error_impl: ErrorImpl, position: Position) -> Error {
        debug!(error = %error_impl, position = position.0, file = %position.1, "code generation failed");
        Error::new(error_impl, position)
    }

    pub fn backend_error(&self, message: impl ToString, position: &Position) -> Error {
        self.error(
            ErrorImpl::BackendRejected {
                message: message.to_string(),
            },
            position.clone(),
        )
    }

    /// Looks up a function definition by id.
    pub fn function(&self, id: FunctionId, position: &Position) -> Result<&'a Function, Error> {
        self.arena.get(id).ok_or_else(|| {
            self.error(
                ErrorImpl::InvalidFunctionReference { id: id.0 },
                position.clone(),
            )
        })
    }

    /// Converts an AST type to an LLVM basic type.
    pub fn convert_type(&self, type_: &Type, position: &Position) -> Result<BasicTypeEnum<'ctx>, Error> {
        translate_type(self.context, type_).map_err(|e| self.error(e, position.clone()))
    }

    /// Returns a module-unique mangled symbol rooted in `name`.
    ///
    /// Collisions with an existing function or global get a `__N` suffix,
    /// counting up from 1 until a free name is found.
    pub fn unique_symbol_name(&self, name: &str) -> String {
        let mut i = 0;
        loop {
            let candidate = if i > 0 {
                mangled_name(&format!("{}__{}", name, i))
            } else {
                mangled_name(name)
            };

            if self.module.get_function(&candidate).is_none()
                && self.module.get_global(&candidate).is_none()
            {
                if i > 0 {
                    debug!(base = name, unique = %candidate, "renamed colliding symbol");
                }
                return candidate;
            }

            i += 1;
        }
    }

    /// Stores `constant` in a private, unnamed-address constant global.
    pub fn create_private_constant_global(
        &self,
        constant: BasicValueEnum<'ctx>,
        name: &str,
    ) -> GlobalValue<'ctx> {
        let name = self.unique_symbol_name(name);
        let global = self.module.add_global(constant.get_type(), None, &name);

        global.set_initializer(&constant);
        global.set_constant(true);
        global.set_linkage(Linkage::Private);
        global.set_unnamed_addr(true);
        global.set_alignment(1);

        global
    }

    /// Puts the constants in a packed anonymous struct global.
    pub fn create_struct(&self, constants: &[BasicValueEnum<'ctx>], name: &str) -> GlobalValue<'ctx> {
        let struct_value = self.context.const_struct(constants, true);
        self.create_private_constant_global(struct_value.as_basic_value_enum(), name)
    }

    /// Wraps a constant array in a `<{ i64 length, [T x length] }>` global.
    pub fn create_array(&self, array: ArrayValue<'ctx>, name: &str) -> GlobalValue<'ctx> {
        let length = array.get_type().len();
        let constants = [
            self.context
                .i64_type()
                .const_int(u64::from(length), false)
                .as_basic_value_enum(),
            array.as_basic_value_enum(),
        ];

        self.create_struct(&constants, name)
    }

    /// Stamps the module with the host triple and data layout.
    fn configure_host_target(&self, position: &Position) -> Result<(), Error> {
        Target::initialize_native(&InitializationConfig::default())
            .map_err(|e| self.backend_error(e, position))?;

        let target_triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&target_triple)
            .map_err(|e| self.backend_error(e, position))?;
        let target_machine = target
            .create_target_machine(
                &target_triple,
                "generic",
                "",
                inkwell::OptimizationLevel::Default,
                inkwell::targets::RelocMode::PIC,
                inkwell::targets::CodeModel::Default,
            )
            .ok_or_else(|| self.backend_error("unable to create target machine", position))?;

        self.module.set_triple(&target_triple);
        self.module
            .set_data_layout(&target_machine.get_target_data().get_data_layout());

        Ok(())
    }

    /// Generates `root` as the entry function and finishes the module.
    #[instrument(skip(self), level = "trace")]
    fn compile(&mut self, root: FunctionId) -> Result<(), Error> {
        let position = self
            .arena
            .get(root)
            .map(|function| function.span.start.clone())
            .unwrap_or_else(Position::null);

        if self.options.host_target {
            self.configure_host_target(&position)?;
        }

        gen_entry_function(self, root)?;

        if self.options.verify {
            self.module
                .verify()
                .map_err(|e| self.backend_error(e.to_string(), &position))?;
        }

        Ok(())
    }

    /// Generates `root` as the entry function and hands over the module.
    ///
    /// On failure the partially built module is dropped with the compiler.
    pub fn generate_module(mut self, root: FunctionId) -> Result<Module<'ctx>, Error> {
        self.compile(root)?;
        Ok(self.module)
    }
}

/// Generates a module whose entry function is `root`.
///
/// On failure the partially built module is discarded and the first error
/// is returned.
///
/// # Arguments
///
/// * `context` - LLVM context, owned by the caller
/// * `module_name` - Name of the generated module
/// * `arena` - Owner of every function definition in the AST
/// * `root` - Function to generate as the entry point
/// * `options` - Options for this pass
pub fn generate_module<'ctx>(
    context: &'ctx Context,
    module_name: &str,
    arena: &FunctionArena,
    root: FunctionId,
    options: CompilerOptions,
) -> Result<Module<'ctx>, Error> {
    Compiler::new(arena, context, module_name, options).generate_module(root)
}
