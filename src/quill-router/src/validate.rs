//! Constraint checks over resolved arguments.

use crate::argument::{Argument, Bound};
use crate::error::ValidationError;
use crate::route::Route;
use crate::value::{ArgValue, Arguments};

/// Check required arguments, bounds and choices in signature order.
///
/// Bounds are inclusive. On string arguments they limit the length in
/// characters.
pub fn validate(route: &Route, arguments: &Arguments) -> Result<(), ValidationError> {
    for argument in route.arguments() {
        let value = match arguments.get(&argument.name) {
            Some(value) if !value.is_empty() => value,
            _ if argument.required => {
                return Err(ValidationError::Required {
                    argument: argument.name.clone(),
                });
            }
            _ => continue,
        };

        check_bounds(argument, value)?;
        check_choices(argument, value)?;
    }
    Ok(())
}

fn check_bounds(argument: &Argument, value: &ArgValue) -> Result<(), ValidationError> {
    let name = || argument.name.clone();

    match value {
        ArgValue::Integer(v) => {
            if let Some(min) = argument.min
                && below(*v as f64, Some(*v), min)
            {
                return Err(ValidationError::BelowMinimum {
                    argument: name(),
                    min: min.to_string(),
                });
            }
            if let Some(max) = argument.max
                && above(*v as f64, Some(*v), max)
            {
                return Err(ValidationError::AboveMaximum {
                    argument: name(),
                    max: max.to_string(),
                });
            }
        }
        ArgValue::Float(v) => {
            if let Some(min) = argument.min
                && below(*v, None, min)
            {
                return Err(ValidationError::BelowMinimum {
                    argument: name(),
                    min: min.to_string(),
                });
            }
            if let Some(max) = argument.max
                && above(*v, None, max)
            {
                return Err(ValidationError::AboveMaximum {
                    argument: name(),
                    max: max.to_string(),
                });
            }
        }
        ArgValue::String(v) => {
            let length = v.chars().count() as i64;
            if let Some(min) = argument.min
                && below(length as f64, Some(length), min)
            {
                return Err(ValidationError::TooShort {
                    argument: name(),
                    min: min.to_string(),
                });
            }
            if let Some(max) = argument.max
                && above(length as f64, Some(length), max)
            {
                return Err(ValidationError::TooLong {
                    argument: name(),
                    max: max.to_string(),
                });
            }
        }
        _ => {}
    }
    Ok(())
}

// Integer values against integer bounds compare exactly.
fn below(value: f64, exact: Option<i64>, bound: Bound) -> bool {
    match (exact, bound) {
        (Some(v), Bound::Integer(min)) => v < min,
        _ => value < bound.as_f64(),
    }
}

fn above(value: f64, exact: Option<i64>, bound: Bound) -> bool {
    match (exact, bound) {
        (Some(v), Bound::Integer(max)) => v > max,
        _ => value > bound.as_f64(),
    }
}

fn check_choices(argument: &Argument, value: &ArgValue) -> Result<(), ValidationError> {
    if argument.choices.is_empty()
        || argument
            .choices
            .iter()
            .any(|c| value.matches_choice(&c.value))
    {
        return Ok(());
    }
    Err(ValidationError::InvalidValue {
        argument: argument.name.clone(),
        value: value.to_string(),
    })
}
