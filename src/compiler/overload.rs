//! Overload selection for calls.
//!
//! The scope stack hands back every callable with the called name. Selection:
//!
//! 1. Translate each candidate's parameter types; untranslatable ones drop out
//! 2. Ask the `OverloadPolicy` to rank the candidate against the arguments
//! 3. Keep the lowest rank; ties are broken by scope proximity
//! 4. Two or more best candidates from the same scope are ambiguous

use inkwell::{context::Context, types::BasicTypeEnum, values::BasicValueEnum};

use crate::ast::types::Type;

use super::{
    scope::{FunctionSymbolTarget, ScopeStack},
    types::translate_type,
};

/// Decides whether a candidate accepts a call's arguments.
///
/// Returns `None` if the candidate is not viable, otherwise a cost where
/// lower is better.
pub trait OverloadPolicy {
    fn rank<'ctx>(
        &self,
        parameters: &[BasicTypeEnum<'ctx>],
        arguments: &[BasicValueEnum<'ctx>],
    ) -> Option<u32>;
}

/// Arity must match and every argument must have the parameter's exact type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactTypes;

impl OverloadPolicy for ExactTypes {
    fn rank<'ctx>(
        &self,
        parameters: &[BasicTypeEnum<'ctx>],
        arguments: &[BasicValueEnum<'ctx>],
    ) -> Option<u32> {
        if parameters.len() != arguments.len() {
            return None;
        }

        parameters
            .iter()
            .zip(arguments)
            .all(|(parameter, argument)| *parameter == argument.get_type())
            .then_some(0)
    }
}

/// Only the number of arguments is checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArityOnly;

impl OverloadPolicy for ArityOnly {
    fn rank<'ctx>(
        &self,
        parameters: &[BasicTypeEnum<'ctx>],
        arguments: &[BasicValueEnum<'ctx>],
    ) -> Option<u32> {
        (parameters.len() == arguments.len()).then_some(0)
    }
}

/// Outcome of choosing among candidates.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'ctx> {
    Selected(FunctionSymbolTarget<'ctx>),
    NoMatch,
    /// Number of equally good candidates
    Ambiguous(usize),
}

pub fn select_overload<'ctx>(
    context: &'ctx Context,
    policy: &dyn OverloadPolicy,
    scopes: &ScopeStack<'ctx>,
    candidates: &[FunctionSymbolTarget<'ctx>],
    arguments: &[BasicValueEnum<'ctx>],
) -> Selection<'ctx> {
    // (cost, proximity, candidate)
    let mut viable = vec![];

    for candidate in candidates {
        let parameters = match candidate
            .signature
            .parameters
            .iter()
            .map(|parameter| translate_type(context, parameter))
            .collect::<Result<Vec<BasicTypeEnum<'ctx>>, _>>()
        {
            Ok(parameters) => parameters,
            Err(_) => continue,
        };

        if let Some(cost) = policy.rank(&parameters, arguments) {
            let proximity = scopes
                .proximity(candidate.owning_scope)
                .unwrap_or(usize::MAX);
            viable.push((cost, proximity, candidate));
        }
    }

    let best = match viable.iter().map(|(cost, proximity, _)| (*cost, *proximity)).min() {
        Some(best) => best,
        None => return Selection::NoMatch,
    };

    let mut winners = viable
        .into_iter()
        .filter(|(cost, proximity, _)| (*cost, *proximity) == best)
        .map(|(_, _, candidate)| candidate);

    match (winners.next(), winners.count()) {
        (Some(winner), 0) => Selection::Selected(winner.clone()),
        (Some(_), rest) => Selection::Ambiguous(rest + 1),
        (None, _) => Selection::NoMatch,
    }
}

/// Declared result type of a candidate, if it is known.
pub fn declared_result(candidate: &FunctionSymbolTarget<'_>) -> Option<Type> {
    if candidate.signature.result.is_unknown() {
        None
    } else {
        Some((*candidate.signature.result).clone())
    }
}
