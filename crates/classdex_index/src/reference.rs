//! Textual references such as `Alpha`, `com.example.Alpha#run` or
//! `Alpha#overloaded(java.lang.Object, int)`.

use crate::metadata::{ClassDescriptor, JavaIndex, MethodDescriptor, ResolveError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{reference}' is not a valid class or method reference: {reason}")]
pub struct ReferenceError {
    pub reference: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolReference {
    /// Simple or fully-qualified class name.
    pub class: String,
    pub method: Option<MethodReference>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodReference {
    pub name: String,
    /// `None` when no argument list was written; `Some(vec![])` for `()`.
    pub arguments: Option<Vec<String>>,
}

impl SymbolReference {
    pub fn parse(reference: &str) -> Result<Self, ReferenceError> {
        let invalid = |reason: &'static str| ReferenceError {
            reference: reference.to_string(),
            reason,
        };

        let trimmed = reference.trim();
        let (class, member) = match trimmed.split_once('#') {
            Some((class, member)) => (class.trim(), Some(member.trim())),
            None => (trimmed, None),
        };

        if class.is_empty() {
            return Err(invalid("missing class name"));
        }
        if class.contains(['(', ')', ',']) || class.chars().any(char::is_whitespace) {
            return Err(invalid("class name contains illegal characters"));
        }

        let method = member.map(|member| parse_member(member, &invalid)).transpose()?;
        Ok(Self {
            class: class.to_string(),
            method,
        })
    }
}

fn parse_member(
    member: &str,
    invalid: &dyn Fn(&'static str) -> ReferenceError,
) -> Result<MethodReference, ReferenceError> {
    let (name, arguments) = match member.split_once('(') {
        Some((name, rest)) => {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| invalid("argument list must end with ')'"))?;
            if inner.contains(['(', ')', '#']) {
                return Err(invalid("unbalanced argument list"));
            }
            let arguments = if inner.trim().is_empty() {
                Vec::new()
            } else {
                inner
                    .split(',')
                    .map(|argument| argument.trim().to_string())
                    .collect::<Vec<_>>()
            };
            if arguments.iter().any(String::is_empty) {
                return Err(invalid("empty argument type"));
            }
            (name.trim(), Some(arguments))
        }
        None => (member, None),
    };

    if name.is_empty() {
        return Err(invalid("missing method name"));
    }
    if name.contains(['#', ')', ',']) || name.chars().any(char::is_whitespace) {
        return Err(invalid("method name contains illegal characters"));
    }

    Ok(MethodReference {
        name: name.to_string(),
        arguments,
    })
}

impl FromStr for SymbolReference {
    type Err = ReferenceError;

    fn from_str(reference: &str) -> Result<Self, Self::Err> {
        Self::parse(reference)
    }
}

impl fmt::Display for SymbolReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class)?;
        if let Some(method) = &self.method {
            write!(f, "#{}", method.name)?;
            if let Some(arguments) = &method.arguments {
                write!(f, "({})", arguments.join(","))?;
            }
        }
        Ok(())
    }
}

/// What a [`SymbolReference`] resolved to.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Class(&'a ClassDescriptor),
    Method(&'a ClassDescriptor, &'a MethodDescriptor),
}

impl<'a> Resolved<'a> {
    pub fn class(&self) -> &'a ClassDescriptor {
        match *self {
            Resolved::Class(class) | Resolved::Method(class, _) => class,
        }
    }

    pub fn method(&self) -> Option<&'a MethodDescriptor> {
        match *self {
            Resolved::Class(_) => None,
            Resolved::Method(_, method) => Some(method),
        }
    }
}

impl JavaIndex {
    pub fn lookup(&self, reference: &SymbolReference) -> Result<Resolved<'_>, ResolveError> {
        let class = self.resolve(&reference.class)?;
        let Some(method) = &reference.method else {
            return Ok(Resolved::Class(class));
        };
        let descriptor = match &method.arguments {
            Some(arguments) => {
                class.resolve_method_with_arguments(&method.name, arguments.as_slice())?
            }
            None => class.resolve_method(&method.name)?,
        };
        Ok(Resolved::Method(class, descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_class_only() {
        let reference = SymbolReference::parse("com.example.one.Alpha").unwrap();
        assert_eq!(reference.class, "com.example.one.Alpha");
        assert!(reference.method.is_none());
    }

    #[test]
    fn parses_method_without_arguments() {
        let reference: SymbolReference = "Alpha#publicMethod".parse().unwrap();
        assert_eq!(
            reference.method,
            Some(MethodReference {
                name: "publicMethod".into(),
                arguments: None,
            })
        );
    }

    #[test]
    fn parses_argument_lists() {
        let reference =
            SymbolReference::parse("Alpha#overloaded(java.lang.Object, int[])").unwrap();
        let method = reference.method.unwrap();
        assert_eq!(method.name, "overloaded");
        assert_eq!(
            method.arguments,
            Some(vec!["java.lang.Object".to_string(), "int[]".to_string()])
        );

        let empty = SymbolReference::parse("Alpha#overloaded()").unwrap();
        assert_eq!(empty.method.unwrap().arguments, Some(Vec::new()));
    }

    #[test]
    fn display_round_trips_normalised_form() {
        let reference = SymbolReference::parse(" Alpha # run ( int , long ) ").unwrap();
        assert_eq!(reference.to_string(), "Alpha#run(int,long)");
    }

    #[test]
    fn rejects_malformed_references() {
        for text in [
            "",
            "#run",
            "Alpha#",
            "Alpha#run(int",
            "Alpha#run(int))",
            "Alpha#run(int,)",
            "Alpha#run(int) extra",
            "Al pha",
        ] {
            assert!(
                SymbolReference::parse(text).is_err(),
                "{text:?} should be rejected"
            );
        }
    }
}
