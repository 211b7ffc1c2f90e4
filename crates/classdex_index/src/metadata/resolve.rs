use super::index::{ClassDescriptor, JavaIndex, MethodDescriptor};
use std::error::Error;
use std::fmt;

const INDENT: &str = "    ";

/// Outcome of a failed lookup. Every variant carries what is needed to tell
/// the user how to disambiguate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    ClassNotFound {
        name: String,
    },
    ClassAmbiguous {
        name: String,
        /// Fully-qualified names, sorted.
        candidates: Vec<String>,
    },
    MethodNotFound {
        class: String,
        name: String,
        arguments: Option<Vec<String>>,
    },
    MethodAmbiguous {
        class: String,
        name: String,
        arguments: Option<Vec<String>>,
        /// Rendered `name(arg,...)` signatures, sorted.
        signatures: Vec<String>,
    },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::ClassNotFound { name } => write!(f, "Unknown class '{name}'"),
            ResolveError::ClassAmbiguous { name, candidates } => {
                writeln!(f, "Found multiple classes named '{name}':")?;
                write_listing(f, candidates)?;
                f.write_str("Use a fully-qualified name to identify a specific class")
            }
            ResolveError::MethodNotFound {
                class,
                name,
                arguments: None,
            } => write!(f, "No method named '{name}' found on class '{class}'"),
            ResolveError::MethodNotFound {
                class,
                name,
                arguments: Some(arguments),
            } => write!(
                f,
                "No method named '{name}' with arguments {} found on class '{class}'",
                render_arguments(arguments)
            ),
            ResolveError::MethodAmbiguous {
                class,
                name,
                arguments,
                signatures,
            } => {
                write!(f, "Class '{class}' contains multiple methods named '{name}'")?;
                if let Some(arguments) = arguments {
                    write!(f, " with arguments {}", render_arguments(arguments))?;
                }
                writeln!(f, ":")?;
                write_listing(f, signatures)?;
                f.write_str("Use argument types to identify a specific method")
            }
        }
    }
}

impl Error for ResolveError {}

fn write_listing(f: &mut fmt::Formatter<'_>, lines: &[String]) -> fmt::Result {
    writeln!(f)?;
    for line in lines {
        writeln!(f, "{INDENT}{line}")?;
    }
    writeln!(f)
}

fn render_arguments(arguments: &[String]) -> String {
    format!("[{}]", arguments.join(", "))
}

impl JavaIndex {
    /// Finds a class by fully-qualified name, falling back to its simple name.
    pub fn resolve(&self, name: &str) -> Result<&ClassDescriptor, ResolveError> {
        if let Some(descriptor) = self.lookup_exact(name) {
            return Ok(descriptor);
        }

        let mut matches = self.lookup_simple(name);
        match matches.len() {
            0 => Err(ResolveError::ClassNotFound {
                name: name.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            _ => {
                let mut candidates: Vec<String> = matches
                    .iter()
                    .map(|descriptor| descriptor.name().to_string())
                    .collect();
                candidates.sort();
                Err(ResolveError::ClassAmbiguous {
                    name: name.to_string(),
                    candidates,
                })
            }
        }
    }
}

impl ClassDescriptor {
    /// Finds the single method named `name`, whatever its arguments.
    pub fn resolve_method(&self, name: &str) -> Result<&MethodDescriptor, ResolveError> {
        let matches: Vec<&MethodDescriptor> = self
            .methods()
            .iter()
            .filter(|method| method.name() == name)
            .collect();
        self.single_method(name, None, matches)
    }

    /// Finds the method named `name` whose argument types equal `argument_types`
    /// exactly and in order.
    pub fn resolve_method_with_arguments<S>(
        &self,
        name: &str,
        argument_types: &[S],
    ) -> Result<&MethodDescriptor, ResolveError>
    where
        S: AsRef<str>,
    {
        let arguments: Vec<String> = argument_types
            .iter()
            .map(|argument| argument.as_ref().to_string())
            .collect();
        let matches: Vec<&MethodDescriptor> = self
            .methods()
            .iter()
            .filter(|method| method.name() == name && method.accepts(&arguments))
            .collect();
        self.single_method(name, Some(arguments), matches)
    }

    fn single_method<'a>(
        &self,
        name: &str,
        arguments: Option<Vec<String>>,
        mut matches: Vec<&'a MethodDescriptor>,
    ) -> Result<&'a MethodDescriptor, ResolveError> {
        match matches.len() {
            0 => Err(ResolveError::MethodNotFound {
                class: self.name().to_string(),
                name: name.to_string(),
                arguments,
            }),
            1 => Ok(matches.remove(0)),
            _ => {
                let mut signatures: Vec<String> =
                    matches.iter().map(|method| method.signature()).collect();
                signatures.sort();
                Err(ResolveError::MethodAmbiguous {
                    class: self.name().to_string(),
                    name: name.to_string(),
                    arguments,
                    signatures,
                })
            }
        }
    }
}
