use super::builder::BuildReport;
use super::classfile::{ParsedClass, ParsedMethod};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Name the class-file format gives every constructor.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Immutable lookup structure over every class found under a base namespace.
///
/// Construction happens in [`JavaIndexBuilder`](super::JavaIndexBuilder); once
/// built the index is never written to again, so shared references can be
/// handed to any number of reader threads.
#[derive(Debug, Clone)]
pub struct JavaIndex {
    base_package: String,
    classes: IndexMap<String, ClassDescriptor>,
    simple_names: HashMap<String, Vec<usize>>,
    report: BuildReport,
}

impl JavaIndex {
    pub(crate) fn from_classes(
        base_package: String,
        classes: IndexMap<String, ClassDescriptor>,
        report: BuildReport,
    ) -> Self {
        let mut simple_names: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, descriptor) in classes.values().enumerate() {
            simple_names
                .entry(descriptor.simple_name().to_string())
                .or_default()
                .push(position);
        }
        Self {
            base_package,
            classes,
            simple_names,
            report,
        }
    }

    pub fn base_package(&self) -> &str {
        &self.base_package
    }

    /// Number of distinct fully-qualified classes.
    pub fn size(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Classes in discovery order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub(crate) fn lookup_exact(&self, fqcn: &str) -> Option<&ClassDescriptor> {
        self.classes.get(fqcn)
    }

    /// Every class sharing `simple_name`, in discovery order.
    pub(crate) fn lookup_simple(&self, simple_name: &str) -> Vec<&ClassDescriptor> {
        self.simple_names
            .get(simple_name)
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|position| self.classes.get_index(*position))
                    .map(|(_, descriptor)| descriptor)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    name: String,
    methods: Vec<MethodDescriptor>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>, methods: Vec<MethodDescriptor>) -> Self {
        Self {
            name: name.into(),
            methods,
        }
    }

    /// Fully-qualified, dot-separated name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Everything after the last `.`; nested classes keep their `$`.
    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(_, simple)| simple)
            .unwrap_or(&self.name)
    }

    pub fn package(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(package, _)| package)
            .unwrap_or("")
    }

    /// Methods declared directly on this class, constructors included, in
    /// declaration order. Identical signatures are kept as separate entries.
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}

impl From<ParsedClass> for ClassDescriptor {
    fn from(parsed: ParsedClass) -> Self {
        Self::new(
            parsed.fqcn,
            parsed.methods.into_iter().map(MethodDescriptor::from).collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    name: String,
    argument_types: Vec<String>,
    deprecated: bool,
    varargs: bool,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, argument_types: Vec<String>, deprecated: bool) -> Self {
        Self {
            name: name.into(),
            argument_types,
            deprecated,
            varargs: false,
        }
    }

    pub fn with_varargs(mut self, varargs: bool) -> Self {
        self.varargs = varargs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical dotted argument types, e.g. `int`, `java.lang.String[]`.
    pub fn argument_types(&self) -> &[String] {
        &self.argument_types
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    /// Whether the final parameter was declared variable-arity.
    pub fn is_varargs(&self) -> bool {
        self.varargs
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// `name(arg1,arg2)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.argument_types.join(","))
    }

    pub(crate) fn accepts(&self, argument_types: &[String]) -> bool {
        self.argument_types == argument_types
    }
}

impl From<ParsedMethod> for MethodDescriptor {
    fn from(parsed: ParsedMethod) -> Self {
        Self {
            name: parsed.name,
            argument_types: parsed.parameters.iter().map(ToString::to_string).collect(),
            deprecated: parsed.deprecated,
            varargs: parsed.varargs,
        }
    }
}
