//! Declared function signatures.
//!
//! Rust offers no runtime introspection of closures, so a wrapped function
//! declares its parameters explicitly. The declaration is validated when the
//! signature is built, which is what makes invalid-shape problems fatal at
//! wrap time rather than call time.

use canopy_common::Value;

use crate::call::RESERVED_PARAMETERS;
use crate::error::ShapeError;

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct Param {
    /// The parameter name.
    pub name: String,
    /// The declared default, if any. Parameters without a default are
    /// required: a resolution failure for them is fatal.
    pub default: Option<Value>,
}

impl Param {
    /// Declares a required parameter.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Declares a parameter with a default value.
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// The declared parameter list of a wrapped function, in call order.
///
/// The first parameter designates the owning object for caching purposes.
#[derive(Debug, Clone)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    /// Builds a signature, validating its shape.
    ///
    /// Fails if no parameters are declared, a name repeats, or a name is one
    /// of the reserved control parameters.
    pub fn new(params: Vec<Param>) -> Result<Self, ShapeError> {
        if params.is_empty() {
            return Err(ShapeError::NoParameters);
        }
        for (i, param) in params.iter().enumerate() {
            if RESERVED_PARAMETERS.contains(&param.name.as_str()) {
                return Err(ShapeError::ReservedParameter {
                    parameter: param.name.clone(),
                });
            }
            if params[..i].iter().any(|p| p.name == param.name) {
                return Err(ShapeError::DuplicateParameter {
                    parameter: param.name.clone(),
                });
            }
        }
        Ok(Self { params })
    }

    /// The declared parameters, in order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// The name of the first declared parameter (the owning object).
    pub fn first_param(&self) -> &str {
        &self.params[0].name
    }

    /// Looks up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Returns `true` if the signature declares `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.param(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_signature() {
        let sig = Signature::new(vec![
            Param::required("tree"),
            Param::optional("normalize", Value::Bool(false)),
        ])
        .unwrap();
        assert_eq!(sig.first_param(), "tree");
        assert!(sig.contains("normalize"));
        assert!(!sig.contains("weights"));
        assert!(sig.param("tree").unwrap().default.is_none());
        assert_eq!(
            sig.param("normalize").unwrap().default,
            Some(Value::Bool(false))
        );
    }

    #[test]
    fn empty_signature_rejected() {
        assert!(matches!(
            Signature::new(vec![]),
            Err(ShapeError::NoParameters)
        ));
    }

    #[test]
    fn duplicate_parameter_rejected() {
        let err = Signature::new(vec![Param::required("g"), Param::required("g")]).unwrap_err();
        assert!(matches!(
            err,
            ShapeError::DuplicateParameter { parameter } if parameter == "g"
        ));
    }

    #[test]
    fn reserved_names_rejected() {
        for reserved in RESERVED_PARAMETERS {
            let err =
                Signature::new(vec![Param::required("g"), Param::required(reserved)]).unwrap_err();
            assert!(matches!(err, ShapeError::ReservedParameter { .. }));
        }
    }
}
