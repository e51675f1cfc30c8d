use crate::kit::lexer::Coordinate;
use thiserror::Error;

/// Strict-mode type error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error("Type '{source_ty}' is not assignable to type '{target}'.")]
    NotAssignable {
        source_ty: String,
        target: String,
        location: Coordinate,
    },
    #[error("Argument of type '{source_ty}' is not assignable to parameter of type '{target}'.")]
    ArgumentMismatch {
        source_ty: String,
        target: String,
        location: Coordinate,
    },
    #[error("Expected {expected} arguments, but got {got}.")]
    ArgumentCount {
        expected: String,
        got: usize,
        location: Coordinate,
    },
    #[error("Expected at least {min} arguments, but got {got}.")]
    TooFewArguments {
        min: usize,
        got: usize,
        location: Coordinate,
    },
    #[error("Cannot find name '{name}'.")]
    CannotFindName { name: String, location: Coordinate },
    #[error("Property '{property}' does not exist on type '{ty}'.")]
    PropertyMissing {
        property: String,
        ty: String,
        location: Coordinate,
    },
    #[error("Cannot assign to '{name}' because it is a constant.")]
    ConstAssignment { name: String, location: Coordinate },
    #[error("Cannot redeclare block-scoped variable '{name}'.")]
    Redeclared { name: String, location: Coordinate },
    #[error("Parameter '{name}' implicitly has an 'any' type.")]
    ImplicitAny { name: String, location: Coordinate },
    #[error("Binding element '{name}' implicitly has an 'any' type.")]
    BindingImplicitAny { name: String, location: Coordinate },
    #[error("The left-hand side of an arithmetic operation must be of type 'any', 'number', 'bigint' or an enum type.")]
    ArithmeticLeft { location: Coordinate },
    #[error("The right-hand side of an arithmetic operation must be of type 'any', 'number', 'bigint' or an enum type.")]
    ArithmeticRight { location: Coordinate },
    #[error("An arithmetic operand must be of type 'any', 'number', 'bigint' or an enum type.")]
    ArithmeticOperand { location: Coordinate },
    #[error("Operator '{op}' cannot be applied to types '{left}' and '{right}'.")]
    OperatorMismatch {
        op: String,
        left: String,
        right: String,
        location: Coordinate,
    },
    #[error("This expression is not callable.")]
    NotCallable { ty: String, location: Coordinate },
    #[error("This expression is not constructable.")]
    NotConstructable { ty: String, location: Coordinate },
    #[error("Property '{property}' is missing in type '{source_ty}' but required in type '{target}'.")]
    MissingProperty {
        property: String,
        source_ty: String,
        target: String,
        location: Coordinate,
    },
    #[error("Object literal may only specify known properties, and '{property}' does not exist in type '{target}'.")]
    ExcessProperty {
        property: String,
        target: String,
        location: Coordinate,
    },
    #[error("Object is possibly 'undefined'.")]
    PossiblyUndefined { location: Coordinate },
    #[error("Object is possibly 'null'.")]
    PossiblyNull { location: Coordinate },
    #[error("'{name}' is possibly 'undefined'.")]
    NamePossiblyUndefined { name: String, location: Coordinate },
    #[error("'{name}' is possibly 'null'.")]
    NamePossiblyNull { name: String, location: Coordinate },
    #[error("Type '{ty}' must have a '[Symbol.iterator]()' method that returns an iterator.")]
    NotIterable { ty: String, location: Coordinate },
    #[error("Cannot invoke an object which is possibly 'undefined'.")]
    InvokePossiblyUndefined { location: Coordinate },
    #[error("'{name}' is of type 'unknown'.")]
    UnknownValue { name: String, location: Coordinate },
    #[error("Object is of type 'unknown'.")]
    UnknownObject { location: Coordinate },
}

impl TypeError {
    /// TypeScript-compatible diagnostic code
    pub fn code(&self) -> u32 {
        match self {
            TypeError::NotAssignable { .. } => 2322,
            TypeError::ArgumentMismatch { .. } => 2345,
            TypeError::ArgumentCount { .. } => 2554,
            TypeError::TooFewArguments { .. } => 2555,
            TypeError::CannotFindName { .. } => 2304,
            TypeError::PropertyMissing { .. } => 2339,
            TypeError::ConstAssignment { .. } => 2588,
            TypeError::Redeclared { .. } => 2451,
            TypeError::ImplicitAny { .. } => 7006,
            TypeError::BindingImplicitAny { .. } => 7031,
            TypeError::ArithmeticLeft { .. } => 2362,
            TypeError::ArithmeticRight { .. } => 2363,
            TypeError::ArithmeticOperand { .. } => 2356,
            TypeError::OperatorMismatch { .. } => 2365,
            TypeError::NotCallable { .. } => 2349,
            TypeError::NotConstructable { .. } => 2351,
            TypeError::MissingProperty { .. } => 2741,
            TypeError::ExcessProperty { .. } => 2353,
            TypeError::PossiblyUndefined { .. } => 2532,
            TypeError::PossiblyNull { .. } => 2531,
            TypeError::NamePossiblyUndefined { .. } => 18048,
            TypeError::NamePossiblyNull { .. } => 18047,
            TypeError::NotIterable { .. } => 2488,
            TypeError::InvokePossiblyUndefined { .. } => 2722,
            TypeError::UnknownValue { .. } => 18046,
            TypeError::UnknownObject { .. } => 2571,
        }
    }

    pub fn location(&self) -> Coordinate {
        match self {
            TypeError::NotAssignable { location, .. }
            | TypeError::ArgumentMismatch { location, .. }
            | TypeError::ArgumentCount { location, .. }
            | TypeError::TooFewArguments { location, .. }
            | TypeError::CannotFindName { location, .. }
            | TypeError::PropertyMissing { location, .. }
            | TypeError::ConstAssignment { location, .. }
            | TypeError::Redeclared { location, .. }
            | TypeError::ImplicitAny { location, .. }
            | TypeError::BindingImplicitAny { location, .. }
            | TypeError::ArithmeticLeft { location }
            | TypeError::ArithmeticRight { location }
            | TypeError::ArithmeticOperand { location }
            | TypeError::OperatorMismatch { location, .. }
            | TypeError::NotCallable { location, .. }
            | TypeError::NotConstructable { location, .. }
            | TypeError::MissingProperty { location, .. }
            | TypeError::ExcessProperty { location, .. }
            | TypeError::PossiblyUndefined { location }
            | TypeError::PossiblyNull { location }
            | TypeError::NamePossiblyUndefined { location, .. }
            | TypeError::NamePossiblyNull { location, .. }
            | TypeError::NotIterable { location, .. }
            | TypeError::InvokePossiblyUndefined { location }
            | TypeError::UnknownValue { location, .. }
            | TypeError::UnknownObject { location } => *location,
        }
    }
}

/// Type check result type
pub type TypeCheckResult<T> = Result<T, TypeError>;
